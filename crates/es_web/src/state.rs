use std::sync::Arc;
use es_core::CatalogStorage;
use es_scanner::ScanManager;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn CatalogStorage>,
    pub scanner: Arc<ScanManager>,
}

impl AppState {
    pub fn new(storage: Arc<dyn CatalogStorage>, scanner: ScanManager) -> Self {
        Self {
            storage,
            scanner: Arc::new(scanner),
        }
    }
}
