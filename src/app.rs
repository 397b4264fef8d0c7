use crate::config::Config;
use crate::detail::DetailView;
use crate::discovery::{CatalogQuery, DiscoveryInput, DiscoveryView};
use crate::favorites::{FavoritesEvent, FavoritesStore, FileStorage};
use crate::models::{Genre, MovieDetail, MovieId, MovieSummary, SortKey};
use crate::present::DetailDisplay;
use crate::tmdb::{CatalogApi, TmdbClient};
use crate::view::ViewState;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub favorites: Arc<Mutex<FavoritesStore>>,
    pub discovery: Arc<DiscoveryView>,
    pub detail: Arc<DetailView>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogApi>, favorites: FavoritesStore) -> Self {
        Self {
            discovery: Arc::new(DiscoveryView::new(catalog.clone())),
            detail: Arc::new(DetailView::new(catalog.clone())),
            favorites: Arc::new(Mutex::new(favorites)),
            catalog,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);
    let storage = FileStorage::new(&config.data_dir);
    info!("Favorites stored under {}", storage.dir().display());
    let favorites = FavoritesStore::initialize(Box::new(storage));
    tokio::spawn(log_favorite_changes(favorites.subscribe()));

    let app = build_router(AppState::new(catalog, favorites));

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movies", get(list_movies))
        .route("/detail", axum::routing::delete(close_detail))
        .route("/movies/:id", get(movie_detail))
        .route("/movies/:id/favorite", post(toggle_detail_favorite))
        .route("/genres", get(list_genres))
        .route("/sort-options", get(sort_options))
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/toggle", post(toggle_favorite))
        .route(
            "/favorites/:id",
            get(favorite_status).delete(remove_favorite),
        )
        .route("/notification", get(current_notification))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct MoviesParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    genre: Option<i32>,
    #[serde(default)]
    sort: Option<String>,
}

#[derive(Serialize)]
struct MoviesResponse {
    query: CatalogQuery,
    state: ViewState<Vec<MovieSummary>>,
}

async fn list_movies(State(state): State<AppState>, Query(params): Query<MoviesParams>) -> Response {
    let sort = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<SortKey>() {
            Ok(sort) => sort,
            Err(e) => {
                warn!("Rejecting request: {}", e);
                return error_response(StatusCode::BAD_REQUEST, &e.to_string());
            }
        },
        None => SortKey::default(),
    };
    let input = DiscoveryInput {
        query: params.query.unwrap_or_default(),
        genre: params.genre,
        sort,
    };

    let (query, view) = state.discovery.load(&input).await;
    let status = match &view {
        ViewState::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    (status, Json(MoviesResponse { query, state: view })).into_response()
}

#[derive(Serialize)]
struct DetailResponse {
    /// The movie `state` belongs to; a newer open can replace the requested one.
    id: Option<MovieId>,
    state: ViewState<MovieDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<DetailDisplay>,
    favorite: bool,
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<MovieId>) -> Response {
    let (shown, view) = state.detail.open(id).await;
    let favorite = match view.loaded() {
        Some(detail) => state.favorites.lock().await.is_favorite(detail.id()),
        None => false,
    };
    let status = match &view {
        ViewState::Failed(msg) if msg == crate::detail::NOT_FOUND => StatusCode::NOT_FOUND,
        ViewState::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    let display = view.loaded().map(DetailDisplay::from_detail);
    (
        status,
        Json(DetailResponse {
            id: shown,
            state: view,
            display,
            favorite,
        }),
    )
        .into_response()
}

async fn toggle_detail_favorite(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Response {
    let mut favorites = state.favorites.lock().await;
    match state.detail.toggle_favorite(id, &mut favorites).await {
        Some(favorite) => Json(json!({ "favorite": favorite })).into_response(),
        None => error_response(StatusCode::CONFLICT, "Movie is not loaded"),
    }
}

async fn close_detail(State(state): State<AppState>) -> StatusCode {
    state.detail.close().await;
    StatusCode::NO_CONTENT
}

async fn list_genres(State(state): State<AppState>) -> Json<Vec<Genre>> {
    match state.catalog.fetch_genres().await {
        Ok(genres) => Json(genres),
        Err(e) => {
            warn!("Failed to fetch genres: {}", e);
            Json(Vec::new())
        }
    }
}

#[derive(Serialize)]
struct SortOption {
    value: SortKey,
    label: &'static str,
}

async fn sort_options() -> Json<Vec<SortOption>> {
    Json(
        SortKey::ALL
            .into_iter()
            .map(|value| SortOption {
                value,
                label: value.label(),
            })
            .collect(),
    )
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<MovieSummary>> {
    Json(state.favorites.lock().await.list().to_vec())
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(movie): Json<MovieSummary>,
) -> (StatusCode, Json<serde_json::Value>) {
    let id = movie.id;
    let added = state.favorites.lock().await.add(movie);
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(json!({ "id": id, "added": added })))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Json(movie): Json<MovieSummary>,
) -> Json<serde_json::Value> {
    let favorite = state.favorites.lock().await.toggle(movie);
    Json(json!({ "favorite": favorite }))
}

async fn favorite_status(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Json<serde_json::Value> {
    let favorite = state.favorites.lock().await.is_favorite(id);
    Json(json!({ "favorite": favorite }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Json<serde_json::Value> {
    let removed = state.favorites.lock().await.remove(id);
    Json(json!({
        "removed": removed.is_some(),
        "title": removed.map(|m| m.title),
    }))
}

async fn current_notification(State(state): State<AppState>) -> Response {
    let favorites = state.favorites.lock().await;
    match favorites.notification() {
        Some(n) => Json(n.clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

async fn log_favorite_changes(mut rx: broadcast::Receiver<FavoritesEvent>) {
    loop {
        match rx.recv().await {
            Ok(FavoritesEvent::Added { id, title }) => {
                info!("Added to favorites: {} ({})", title, id)
            }
            Ok(FavoritesEvent::Removed { id, title }) => {
                info!("Removed from favorites: {} ({})", title, id)
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Favorites log skipped {} events", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
