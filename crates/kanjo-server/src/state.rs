//! Shared application state

use kanjo_classifiers::ModelAccessor;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Single handle to the sentiment model, constructed on first use
    pub accessor: Arc<ModelAccessor>,

    /// Prometheus handle for rendering /metrics; `None` disables the route
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(accessor: Arc<ModelAccessor>, metrics_handle: Option<PrometheusHandle>) -> Self {
        Self {
            accessor,
            metrics_handle,
        }
    }
}
