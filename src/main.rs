mod api;
mod collectors;
mod config;
mod core;
mod scheduler;
mod utils;

use std::sync::Arc;

use tracing::{error, info};

use crate::collectors::aladhan::TimingsRequest;
use crate::collectors::provider::TimingsProvider;
use crate::scheduler::dispatch::{LogNotifier, NotificationService};

#[tokio::main]
async fn main() {
    utils::logging::init();

    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return;
        }
    };
    info!(addr = %cfg.addr, method = cfg.method, school = cfg.school, "salat-times starting");

    if let Err(e) = utils::db::open_or_init(&cfg.db_path) {
        error!(error = %e, path = %cfg.db_path.display(), "Failed to initialize cache database");
        return;
    }

    let request = TimingsRequest {
        base_url: cfg.api_base.clone(),
        method: cfg.method,
        school: cfg.school,
    };
    let provider = match TimingsProvider::new(request, cfg.db_path.clone(), cfg.cache_ttl_secs) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return;
        }
    };

    let state = api::server::AppState {
        provider: Arc::new(provider),
        notifications: Arc::new(NotificationService::new(Arc::new(LogNotifier), cfg.notifications_enabled)),
        utc_offset: cfg.utc_offset,
        db_path: cfg.db_path.clone(),
    };

    if let Err(e) = api::server::run_server(state, cfg.addr).await {
        error!(error = %e, "API server stopped");
    }
}
