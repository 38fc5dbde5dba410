//! Application state management
//!
//! Author: hephaex@gmail.com

use docqa_core::AppConfig;
use docqa_rag::QueryEngineProvider;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
///
/// The router holds it behind one `Arc`, so every request sees the same
/// provider and therefore the same index.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Source of query engines
    pub provider: Arc<dyn QueryEngineProvider>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create application state around an existing provider
    pub fn new(config: AppConfig, provider: Arc<dyn QueryEngineProvider>) -> Self {
        Self {
            config,
            provider,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
