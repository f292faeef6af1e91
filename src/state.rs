use crate::config::{ConfigStore, Settings};
use crate::options::ReferenceData;
use crate::storage::EntryStore;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub store: EntryStore,
    pub config: ConfigStore,
    pub settings: Arc<RwLock<Settings>>,
}

impl AppState {
    pub fn new(store: EntryStore, config: ConfigStore, settings: Settings) -> Self {
        Self {
            store,
            config,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Reference lists including whatever the saved patient profile adds.
    pub async fn reference_data(&self) -> ReferenceData {
        let settings = self.settings.read().await;
        ReferenceData::for_patient(settings.patient.as_ref())
    }
}
