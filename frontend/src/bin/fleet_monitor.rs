#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Headless fleet monitor: polls active vehicle positions with the admin
//! session and logs a summary of every snapshot.
//!
//! # Examples
//! ```sh
//! CONSOLE_RIDER_BASE_URL=https://api.example.test \
//! CONSOLE_ADMIN_BASE_URL=https://api.example.test \
//! cargo run --manifest-path frontend/Cargo.toml --bin fleet-monitor
//! ```

use std::sync::Arc;

use color_eyre::eyre::{Context, Result, bail, eyre};
use ortho_config::OrthoConfig;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use frontend::ConsoleSettings;
use frontend::domain::ports::RemoteDataClient;
use frontend::domain::{AuthDomain, AuthFlow, SessionEvent, SessionProvider};
use frontend::outbound::http::HttpRemoteClient;
use frontend::outbound::storage::FileCredentialStore;
use frontend::screens::tracking::FleetTracking;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let settings = ConsoleSettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load console settings: {error}"))?;
    let session_dir = settings.session_dir()?;
    let store = FileCredentialStore::open(&session_dir)
        .wrap_err_with(|| format!("failed to open session directory {session_dir}"))?;
    let session = Arc::new(SessionProvider::rehydrate(Arc::new(store)).await);
    let client: Arc<dyn RemoteDataClient> = Arc::new(
        HttpRemoteClient::new(
            settings.endpoints()?,
            settings.request_timeout()?,
            Arc::clone(&session),
        )
        .wrap_err("failed to build HTTP client")?,
    );

    if !session.is_signed_in(AuthDomain::Admin) {
        let Some(credentials) = settings.credentials()? else {
            bail!("no stored admin session and no CONSOLE_USERNAME/CONSOLE_PASSWORD configured");
        };
        AuthFlow::new(Arc::clone(&client), Arc::clone(&session))
            .login(AuthDomain::Admin, &credentials)
            .await
            .wrap_err("admin login failed")?;
    }

    let tracking = FleetTracking::new(
        client,
        settings.tracking_interval()?,
        settings.history_limit()?,
    );
    let outcome = monitor(&tracking, &session).await;
    tracking.unmount();
    outcome
}

async fn monitor(tracking: &FleetTracking, session: &SessionProvider) -> Result<()> {
    let mut positions = tracking.positions().subscribe();
    let mut events = session.subscribe();
    tracking.mount();
    info!("fleet monitor started");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.wrap_err("failed to listen for Ctrl-C")?;
                info!("interrupt received; stopping");
                return Ok(());
            }
            changed = positions.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = positions.borrow_and_update().clone();
                if state.is_loading {
                    continue;
                }
                match (state.latest.as_deref(), state.error.as_deref()) {
                    (_, Some(error)) => warn!(error, "fleet poll failed"),
                    (Some(fleet), None) => info!(
                        vehicles = fleet.len(),
                        polls = state.completed,
                        skipped = tracking.positions().skipped_ticks(),
                        "fleet snapshot"
                    ),
                    (None, None) => {}
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Expired { domain: AuthDomain::Admin }) => {
                    bail!("admin session expired; sign in again");
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}
