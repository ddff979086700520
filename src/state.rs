use crate::config::Config;
use crate::services::ai::VisionModel;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when no AI credential was configured at startup.
    pub vision: Option<Arc<dyn VisionModel>>,
}

pub type SharedState = Arc<AppState>;
