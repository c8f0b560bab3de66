use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    allocations::{
        BACKEND_DIR_NAME, BackendPaths, RoleAllocations, SaveAllocationsRequest, SaveSummary,
        read_allocations, save_allocations,
    },
    catalog::RoleCatalog,
    error::AdminError,
    session::{
        AccessGuard, DEFAULT_ELEVATED_ROLE, DEFAULT_ROLE_HEADER, DEFAULT_USER_HEADER,
        HeaderSessionResolver, SessionResolver,
    },
};

mod handlers;

use handlers::{
    access_log_middleware, get_role_allocations_handler, healthz_handler, metrics_handler,
    save_role_allocations_handler,
};

pub const ROLE_ALLOCATIONS_PATH: &str = "/admin/role-allocations";

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub backend_root: PathBuf,
    pub elevated_role: String,
    pub session_user_header: String,
    pub session_role_header: String,
    pub role_catalog_path: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            backend_root: PathBuf::from("..").join(BACKEND_DIR_NAME),
            elevated_role: DEFAULT_ELEVATED_ROLE.to_string(),
            session_user_header: DEFAULT_USER_HEADER.to_string(),
            session_role_header: DEFAULT_ROLE_HEADER.to_string(),
            role_catalog_path: None,
        }
    }
}

#[derive(Clone)]
pub struct AdminState {
    paths: Arc<BackendPaths>,
    catalog: Arc<RoleCatalog>,
    guard: AccessGuard,
    metrics: Arc<AdminMetrics>,
}

struct AdminMetrics {
    started_at: Instant,
    reads_total: AtomicU64,
    read_failures_total: AtomicU64,
    writes_total: AtomicU64,
    write_failures_total: AtomicU64,
    denied_total: AtomicU64,
}

impl Default for AdminMetrics {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            reads_total: AtomicU64::new(0),
            read_failures_total: AtomicU64::new(0),
            writes_total: AtomicU64::new(0),
            write_failures_total: AtomicU64::new(0),
            denied_total: AtomicU64::new(0),
        }
    }
}

impl AdminState {
    /// Builds state from `config`, loading the role catalog once. Sessions
    /// come from the configured identity headers.
    pub fn new(config: AdminConfig) -> Result<Self, AdminError> {
        let resolver = HeaderSessionResolver::new(
            &config.session_user_header,
            &config.session_role_header,
        )?;
        Self::with_session_resolver(config, Arc::new(resolver))
    }

    pub fn with_session_resolver(
        config: AdminConfig,
        resolver: Arc<dyn SessionResolver>,
    ) -> Result<Self, AdminError> {
        let catalog = match config.role_catalog_path.as_deref() {
            Some(path) => {
                let catalog = RoleCatalog::load(path)?;
                info!(path = %path.display(), roles = catalog.len(), "loaded role catalog");
                catalog
            }
            None => RoleCatalog::default(),
        };
        Ok(Self {
            paths: Arc::new(BackendPaths::under(&config.backend_root)),
            catalog: Arc::new(catalog),
            guard: AccessGuard::new(config.elevated_role, resolver),
            metrics: Arc::new(AdminMetrics::default()),
        })
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), AdminError> {
        match self.guard.authorize(headers) {
            Ok(session) => {
                info!(
                    user = session.user.as_deref().unwrap_or("unknown"),
                    role = %session.role,
                    "admin access granted"
                );
                Ok(())
            }
            Err(err) => {
                self.metrics.denied_total.fetch_add(1, Ordering::Relaxed);
                warn!(required_role = %self.guard.elevated_role(), "admin access denied");
                Err(err)
            }
        }
    }

    async fn load(&self) -> Result<RoleAllocations, AdminError> {
        let paths = Arc::clone(&self.paths);
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || read_allocations(&paths, &catalog))
            .await
            .map_err(|err| AdminError::Task(err.to_string()))?
    }

    async fn save(&self, request: SaveAllocationsRequest) -> Result<SaveSummary, AdminError> {
        let paths = Arc::clone(&self.paths);
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || save_allocations(&paths, &catalog, &request))
            .await
            .map_err(|err| AdminError::Task(err.to_string()))?
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct AllocationsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub allocations: RoleAllocations,
}

#[derive(Clone, Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub data: SaveSummary,
}

pub fn build_admin_app(state: AdminState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            ROLE_ALLOCATIONS_PATH,
            get(get_role_allocations_handler).post(save_role_allocations_handler),
        )
        .layer(middleware::from_fn(access_log_middleware))
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: String, details: Option<String>) -> ApiError {
    (status, Json(ErrorResponse { error, details }))
}

fn forbidden(err: &AdminError) -> ApiError {
    error_response(StatusCode::FORBIDDEN, err.to_string(), None)
}

fn bad_request(message: String) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message, None)
}

/// Error body for a failed read: 404 when the templates file is missing,
/// otherwise 500 with the underlying message.
fn read_failure(err: &AdminError) -> ApiError {
    match err {
        AdminError::Unauthorized => forbidden(err),
        AdminError::NotFound { .. } => error_response(
            StatusCode::NOT_FOUND,
            "Template file not found".to_string(),
            None,
        ),
        _ => error_response(
            err.status(),
            format!("Failed to read templates: {err}"),
            None,
        ),
    }
}

/// Error body for a failed save. Missing files are server-side faults here,
/// so everything past validation is a 500.
fn save_failure(err: &AdminError) -> ApiError {
    match err {
        AdminError::Unauthorized => forbidden(err),
        AdminError::Validation(message) => bad_request(message.clone()),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save role allocations".to_string(),
            Some(err.to_string()),
        ),
    }
}

fn log_failure(operation: &str, err: &AdminError) {
    match err {
        AdminError::Unauthorized | AdminError::Validation(_) => {}
        _ => error!(operation, error = %err, "role allocation request failed"),
    }
}
