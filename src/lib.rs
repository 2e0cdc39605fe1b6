pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identifier;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Database;
use crate::identifier::UlidIdentifier;
use crate::repository::{FileRepository, SqliteFileRepository};
use crate::services::{
    BasicAuth, Deleter, HealthService, NewDeleterParam, NewHealthServiceParam, NewRetrieverParam,
    NewUploaderParam, Retriever, Uploader,
};
use crate::storage::{BlobStore, DailyRotate, LocalBlobStore, UploadLocation};

/// Multipart framing allowance on top of the file size limit
const FORM_OVERHEAD: usize = 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploader: Arc<Uploader>,
    pub deleter: Arc<Deleter>,
    pub retriever: Arc<Retriever>,
    pub basic_auth: BasicAuth,
    pub health: HealthService,
    pub location: Arc<dyn UploadLocation>,
}

impl AppState {
    /// Wire the services on the local blob store and the system clock
    pub fn new(config: Arc<Config>, db: Database) -> Self {
        Self::with_clock(config, db, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Arc<Config>, db: Database, clock: Arc<dyn Clock>) -> Self {
        let file_repo: Arc<dyn FileRepository> =
            Arc::new(SqliteFileRepository::new(db.clone(), clock.clone()));
        let blob_store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new());
        tracing::info!(
            storage = blob_store.storage_type(),
            upload_dir = %config.storage.upload_dir,
            "Blob store ready"
        );

        let uploader = Uploader::new(NewUploaderParam {
            file_repo: file_repo.clone(),
            blob_store: blob_store.clone(),
            identifier: Arc::new(UlidIdentifier),
        });
        let deleter = Deleter::new(NewDeleterParam {
            file_repo: file_repo.clone(),
            blob_store: blob_store.clone(),
        });
        let retriever = Retriever::new(NewRetrieverParam {
            file_repo,
            blob_store,
        });

        Self {
            uploader: Arc::new(uploader),
            deleter: Arc::new(deleter),
            retriever: Arc::new(retriever),
            basic_auth: BasicAuth::new(db.clone()),
            health: HealthService::new(NewHealthServiceParam {
                db,
                upload_dir: config.storage.upload_dir.clone().into(),
                clock: clock.clone(),
                disk_usage_threshold: config.health.disk_usage_threshold,
            }),
            location: Arc::new(DailyRotate::new(clock)),
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut file_routes = Router::new()
        .route("/file", post(handlers::file::upload_file))
        .route(
            "/file/:unique_id",
            get(handlers::file::retrieve_file).delete(handlers::file::delete_file),
        )
        .layer(DefaultBodyLimit::max(
            state.config.upload.max_form_size + FORM_OVERHEAD,
        ));

    if state.config.auth.enabled {
        file_routes = file_routes.route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::basic_auth_middleware,
        ));
    }

    Router::new()
        .route("/", get(handlers::app::root))
        .route("/health", get(handlers::app::health))
        .merge(file_routes)
        .fallback(handlers::app::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
