//! # Web API Application State

use std::sync::Arc;

use crate::app::LabelingApp;

/// Shared state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub app: Arc<LabelingApp>,
}

impl AppState {
    pub fn new(app: Arc<LabelingApp>) -> Self {
        Self { app }
    }
}
