//! Helper macro for port error enums with `impl Into` constructors.

/// Declare a `thiserror` enum plus one snake-case constructor per variant.
///
/// Struct variants get a constructor taking `impl Into<FieldType>` for every
/// field, so call sites can pass `&str` for `String` fields and a bare value
/// for `Option<T>` fields.
macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@constructor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };

    (@constructor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Build [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@constructor $variant:ident { $($field:ident : $ty:ty),* }) => {
        ::paste::paste! {
            #[doc = concat!("Build [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor generation coverage.

    define_port_error! {
        pub enum SamplePortError {
            Offline => "offline",
            Refused { message: String } => "refused: {message}",
            Status { code: u16, message: Option<String> } => "status {code}",
        }
    }

    #[test]
    fn unit_variants_get_constructors() {
        assert_eq!(SamplePortError::offline().to_string(), "offline");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = SamplePortError::refused("no route");
        assert_eq!(err.to_string(), "refused: no route");
    }

    #[test]
    fn option_fields_accept_bare_values() {
        let err = SamplePortError::status(503_u16, "maintenance".to_owned());
        assert_eq!(
            err,
            SamplePortError::Status {
                code: 503,
                message: Some("maintenance".to_owned()),
            }
        );
    }
}
