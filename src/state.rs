use crate::services::classifier::model_manager::ModelManager;
use crate::services::verdict::VerdictExtractor;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub models: ModelManager,
    pub extractor: Arc<VerdictExtractor>,
}
