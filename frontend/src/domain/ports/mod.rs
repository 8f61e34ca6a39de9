//! Ports between the console domain and its adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_store;
mod notifier;
mod remote_data_client;

#[cfg(test)]
pub use credential_store::MockCredentialStore;
pub use credential_store::{
    CredentialStore, CredentialStoreError, InMemoryCredentialStore, StoredCredential,
};
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{Notifier, SilentNotifier};
#[cfg(test)]
pub use remote_data_client::MockRemoteDataClient;
pub use remote_data_client::{
    ApiRequest, FileUpload, HttpMethod, RemoteDataClient, RemoteError, RequestBody,
};
