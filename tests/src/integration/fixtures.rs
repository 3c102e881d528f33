//! Shared wiring for the integration flows.

use parking_lot::Mutex;
use std::sync::Arc;

use sd_session::{
    MemoryStorage, Navigator, ReqwestTransport, SessionConfig, SessionService, SessionStorage,
};

/// Navigator that remembers where it was sent.
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().push(path.to_string());
    }
}

pub fn config_for(base_url: &str) -> SessionConfig {
    SessionConfig {
        api_base_url: base_url.to_string(),
        request_timeout_secs: 5,
        connect_timeout_secs: 1,
        ..SessionConfig::default()
    }
}

/// Initialized service talking to `base_url` over real HTTP.
pub fn service_with_storage(base_url: &str, storage: Arc<dyn SessionStorage>) -> SessionService {
    let config = config_for(base_url);
    config.validate().expect("valid test config");
    let transport = Arc::new(ReqwestTransport::new(&config).expect("build transport"));
    let service = SessionService::new(config, transport, storage);
    service.initialize();
    service
}

pub fn service(base_url: &str) -> SessionService {
    service_with_storage(base_url, Arc::new(MemoryStorage::new()))
}
