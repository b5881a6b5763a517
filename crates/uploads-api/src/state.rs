//! Application state shared by every handler.

use uploads_core::Config;
use uploads_services::StorageGateway;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: StorageGateway,
}

impl AppState {
    pub fn new(config: Config, gateway: StorageGateway) -> Self {
        Self { config, gateway }
    }
}
