pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use focusloop_core::{Config, Database, LocalService, ProgressBackend, RemoteClient};

/// Pick the progress backend: the remote service when `[api].base_url` is
/// configured, the local store otherwise.
pub fn open_backend(config: &Config) -> Result<Box<dyn ProgressBackend>, Box<dyn std::error::Error>> {
    if config.api.base_url.is_some() {
        Ok(Box::new(RemoteClient::from_config(&config.api)?))
    } else {
        let db = Database::open()?;
        Ok(Box::new(LocalService::new(
            db,
            config.session.daily_goal_minutes,
        )))
    }
}
