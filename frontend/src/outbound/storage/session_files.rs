//! One JSON file per authentication domain under a capability-scoped
//! directory.
//!
//! Files are written to a hidden staging name and renamed into place, so a
//! reader never sees a half-written credential.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::AuthDomain;
use crate::domain::ports::{CredentialStore, CredentialStoreError, StoredCredential};

/// [`CredentialStore`] backed by `<domain>-session.json` files.
pub struct FileCredentialStore {
    dir: Arc<Dir>,
    root: Utf8PathBuf,
}

impl FileCredentialStore {
    /// Open (creating if needed) the session directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Io`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &Utf8Path) -> Result<Self, CredentialStoreError> {
        Dir::create_ambient_dir_all(root, ambient_authority())
            .map_err(|error| io_error(root, &error))?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())
            .map_err(|error| io_error(root, &error))?;
        Ok(Self {
            dir: Arc::new(dir),
            root: root.to_owned(),
        })
    }

    /// File name holding `domain`'s credential.
    pub fn file_name(domain: AuthDomain) -> String {
        format!("{}-session.json", domain.as_str())
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T, CredentialStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, CredentialStoreError> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || task(&dir))
            .await
            .map_err(|error| CredentialStoreError::io(format!("storage task failed: {error}")))?
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(
        &self,
        domain: AuthDomain,
    ) -> Result<Option<StoredCredential>, CredentialStoreError> {
        let name = Self::file_name(domain);
        let path = self.root.join(&name);
        self.blocking(move |dir| match dir.read(&name) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|error| CredentialStoreError::corrupt(format!("{path}: {error}"))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(&path, &error)),
        })
        .await
    }

    async fn save(
        &self,
        domain: AuthDomain,
        credential: &StoredCredential,
    ) -> Result<(), CredentialStoreError> {
        let bytes = serde_json::to_vec_pretty(credential)
            .map_err(|error| CredentialStoreError::io(error.to_string()))?;
        let name = Self::file_name(domain);
        let path = self.root.join(&name);
        self.blocking(move |dir| {
            let staging = format!(".{name}.tmp");
            dir.write(&staging, &bytes)
                .map_err(|error| io_error(&path, &error))?;
            dir.rename(&staging, dir, &name).map_err(|error| {
                let _ = dir.remove_file(&staging);
                io_error(&path, &error)
            })?;
            debug!(%path, "session file written");
            Ok(())
        })
        .await
    }

    async fn clear(&self, domain: AuthDomain) -> Result<(), CredentialStoreError> {
        let name = Self::file_name(domain);
        let path = self.root.join(&name);
        self.blocking(move |dir| match dir.remove_file(&name) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&path, &error)),
        })
        .await
    }
}

fn io_error(path: &Utf8Path, error: &io::Error) -> CredentialStoreError {
    CredentialStoreError::io(format!("{path}: {error}"))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::Role;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        root: Utf8PathBuf,
        store: FileCredentialStore,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("sessions")).expect("utf-8 path");
        let store = FileCredentialStore::open(&root).expect("open store");
        Fixture {
            _temp: temp,
            root,
            store,
        }
    }

    fn stored(token: &str) -> StoredCredential {
        StoredCredential {
            token: token.to_owned(),
            role: Role::SuperAdmin,
            username: Some("ops".to_owned()),
            principal_id: "12".to_owned(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn saved_credentials_load_per_domain(fixture: Fixture) {
        fixture
            .store
            .save(AuthDomain::Admin, &stored("tok-admin"))
            .await
            .expect("save");

        let admin = fixture.store.load(AuthDomain::Admin).await.expect("load");
        let rider = fixture.store.load(AuthDomain::Rider).await.expect("load");

        assert_eq!(admin, Some(stored("tok-admin")));
        assert_eq!(rider, None);
        assert!(fixture.root.join("admin-session.json").exists());
        assert!(!fixture.root.join(".admin-session.json.tmp").exists());
    }

    #[rstest]
    #[tokio::test]
    async fn clear_is_idempotent(fixture: Fixture) {
        fixture
            .store
            .save(AuthDomain::Rider, &stored("tok"))
            .await
            .expect("save");
        fixture.store.clear(AuthDomain::Rider).await.expect("clear");
        fixture.store.clear(AuthDomain::Rider).await.expect("clear again");
        assert_eq!(fixture.store.load(AuthDomain::Rider).await.expect("load"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn garbage_file_is_reported_corrupt(fixture: Fixture) {
        std::fs::write(fixture.root.join("rider-session.json"), b"{not json").expect("write");
        let error = fixture
            .store
            .load(AuthDomain::Rider)
            .await
            .expect_err("corrupt file");
        assert!(matches!(error, CredentialStoreError::Corrupt { .. }));
    }
}
