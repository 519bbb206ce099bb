use internhub::config::AppConfig;
use internhub::enrollments::JsonDocumentStore;
use internhub::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the configured document snapshot, honoring a command-line override.
pub(crate) fn open_store(
    config: &AppConfig,
    override_path: Option<PathBuf>,
) -> Result<JsonDocumentStore, AppError> {
    let path = override_path.unwrap_or_else(|| config.store.path.clone());
    Ok(JsonDocumentStore::open(path)?)
}
