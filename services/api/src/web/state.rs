//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use docgen_core::ports::{ContentGenerationService, DatabaseService, DocumentExporter};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub generator: Arc<dyn ContentGenerationService>,
    pub exporter: Arc<dyn DocumentExporter>,
}
