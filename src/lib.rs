pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod models;
pub mod notify;
pub mod session;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use api::ApiClient;
use auth::{Authenticator, SessionAuthority};
use config::Config;
use notify::Notifier;
use session::SessionStore;
use workspace::ProjectWorkspace;

/// Everything a command needs, wired once at startup. The session
/// authority is shared with the HTTP client so a 401 anywhere invalidates
/// the one session every component observes.
pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionAuthority>,
    pub api: Arc<ApiClient>,
    pub notices: Notifier,
    pub auth: Authenticator,
    pub workspace: ProjectWorkspace,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let store = SessionStore::open(&config.session.data_dir)?;
        let session = Arc::new(SessionAuthority::new(store));
        let api = Arc::new(ApiClient::with_timeout(
            &config.api.base_url,
            session.clone(),
            Duration::from_secs(config.api.timeout_secs),
        )?);
        let notices = Notifier::new();
        let auth = Authenticator::new(api.clone(), session.clone(), notices.clone());
        let workspace = ProjectWorkspace::new(api.clone(), notices.clone());

        Ok(Self {
            config,
            session,
            api,
            notices,
            auth,
            workspace,
        })
    }
}
