//! Sessions written through the login flow survive a restart and are
//! scoped per authentication domain.

use std::sync::Arc;

use camino::Utf8PathBuf;
use frontend::domain::ports::{CredentialStore, HttpMethod, RemoteDataClient};
use frontend::domain::{AuthDomain, AuthFlow, LoginCredentials, Role, SessionProvider};
use frontend::outbound::storage::FileCredentialStore;
use frontend::test_support::StubRemoteClient;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

struct SessionDir {
    _temp: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn session_dir() -> SessionDir {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().join("sessions")).expect("utf-8 path");
    SessionDir { _temp: temp, path }
}

async fn provider(dir: &SessionDir) -> Arc<SessionProvider> {
    let store = FileCredentialStore::open(&dir.path).expect("store opens");
    Arc::new(SessionProvider::rehydrate(Arc::new(store) as Arc<dyn CredentialStore>).await)
}

fn admin_login_reply(client: &StubRemoteClient) {
    client.reply(
        HttpMethod::Post,
        "/login",
        Ok(json!({ "accessToken": "admin-jwt", "role": "SUPER_ADMIN", "id": 3 })),
    );
}

#[rstest]
#[tokio::test]
async fn admin_login_is_restored_after_restart(session_dir: SessionDir) {
    let client = StubRemoteClient::new();
    admin_login_reply(&client);
    let first = provider(&session_dir).await;
    let credentials = LoginCredentials::try_from_parts("root", "s3cret").expect("valid input");

    AuthFlow::new(Arc::clone(&client) as Arc<dyn RemoteDataClient>, Arc::clone(&first))
        .login(AuthDomain::Admin, &credentials)
        .await
        .expect("login succeeds");
    drop(first);

    let restored = provider(&session_dir).await;
    assert_eq!(restored.role(AuthDomain::Admin), Some(Role::SuperAdmin));
    assert!(!restored.is_signed_in(AuthDomain::Rider));
    assert!(session_dir.path.join("admin-session.json").is_file());
    assert!(!session_dir.path.join("rider-session.json").exists());
}

#[rstest]
#[tokio::test]
async fn logout_removes_the_stored_file(session_dir: SessionDir) {
    let client = StubRemoteClient::new();
    admin_login_reply(&client);
    let session = provider(&session_dir).await;
    let flow = AuthFlow::new(Arc::clone(&client) as Arc<dyn RemoteDataClient>, Arc::clone(&session));
    let credentials = LoginCredentials::try_from_parts("root", "s3cret").expect("valid input");
    flow.login(AuthDomain::Admin, &credentials)
        .await
        .expect("login succeeds");

    flow.logout(AuthDomain::Admin).await;

    assert!(!session.is_signed_in(AuthDomain::Admin));
    assert!(!provider(&session_dir).await.is_signed_in(AuthDomain::Admin));
}

#[rstest]
#[tokio::test]
async fn rider_role_cannot_open_an_admin_session(session_dir: SessionDir) {
    let client = StubRemoteClient::new();
    client.reply(
        HttpMethod::Post,
        "/login",
        Ok(json!({ "accessToken": "rider-jwt", "role": "NORMAL_USER", "id": 9 })),
    );
    let session = provider(&session_dir).await;
    let credentials = LoginCredentials::try_from_parts("ada", "pw").expect("valid input");

    let error = AuthFlow::new(Arc::clone(&client) as Arc<dyn RemoteDataClient>, Arc::clone(&session))
        .login(AuthDomain::Admin, &credentials)
        .await
        .expect_err("role not admitted");

    assert!(!error.is_auth_expired());
    assert!(!session.is_signed_in(AuthDomain::Admin));
    assert!(!session_dir.path.join("admin-session.json").exists());
}
