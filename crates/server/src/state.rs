use std::sync::Arc;
use trackdash_cache::{CacheReader, CacheStore};
use trackdash_client::RemoteReportClient;
use trackdash_config::Settings;
use trackdash_core::{Diagnostics, Result};
use trackdash_gateway::ProxyGateway;

/// Shared application state, built once at startup.
pub struct AppState {
    pub settings: Settings,
    pub client: RemoteReportClient,
    pub store: CacheStore,
    pub reader: CacheReader,
    pub gateway: ProxyGateway,
    pub diagnostics: Diagnostics,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Arc<Self>> {
        let diagnostics = Diagnostics::default();
        let client = RemoteReportClient::new(&settings, diagnostics.clone())?;
        let store = CacheStore::new(
            settings.cache_dir.clone(),
            settings.retention,
            diagnostics.clone(),
        );
        let reader = CacheReader::new(settings.cache_dir.clone());
        let gateway = ProxyGateway::new(&settings, diagnostics.clone())?;
        Ok(Arc::new(Self {
            settings,
            client,
            store,
            reader,
            gateway,
            diagnostics,
        }))
    }
}
