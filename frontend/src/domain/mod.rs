//! Transport-agnostic core of the console data layer.
//!
//! Slices, controllers and polling views depend only on the ports declared in
//! [`ports`]; adapters live under `outbound`.

pub mod auth;
pub mod controller;
pub mod dashboard;
mod entity_id;
pub mod error;
pub mod listing;
mod liveness;
pub mod polling;
pub mod ports;
pub mod record;
pub mod request_key;
pub mod scoped;
pub mod session;
pub mod slice;

pub use self::auth::{AuthFlow, LoginCredentials, LoginValidationError};
pub use self::controller::{ControllerPorts, FetchOutcome, ListScreen, PageController, Phase};
pub use self::dashboard::PanelState;
pub use self::entity_id::EntityId;
pub use self::error::{DataError, GENERIC_FAILURE};
pub use self::listing::{ListPage, decode_list};
pub use self::liveness::Liveness;
pub use self::polling::{PollSource, PollState, PollingView, TickOutcome};
pub use self::record::{RecordController, RecordScreen};
pub use self::request_key::{DateFilter, DateParams, DateRange, FilterSet, RequestKey};
pub use self::scoped::ScopedControllers;
pub use self::session::{
    AuthDomain, CredentialValidationError, Role, SessionCredential, SessionEvent,
    SessionProvider, token_fingerprint,
};
pub use self::slice::{Collection, DomainSlice, Record, RecordSlice, Slice};
