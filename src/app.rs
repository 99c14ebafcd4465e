use crate::catalog::{self, CastMember, CatalogApi, Episode, Show, TvMazeClient};
use crate::error::ApiError;
use crate::favorites::{FavoriteSet, COOKIE_NAME};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const PORT: u16 = 3210;

/// Search queries below this length answer empty without an upstream call.
const MIN_SEARCH_CHARS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
}

pub async fn run_server() -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(TvMazeClient::from_env());
    let state = AppState { catalog };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/favorites",
            get(list_favorites)
                .post(add_favorite)
                .delete(remove_favorite_no_id),
        )
        .route("/api/favorites/:id", delete(remove_favorite))
        .route("/api/favorites/shows", get(favorite_shows))
        .route("/api/shows", get(list_shows))
        .route("/api/shows/:id", get(show_detail))
        .route("/api/shows/:id/episodes", get(show_episodes))
        .route("/api/shows/:id/cast", get(show_cast))
        .route("/api/episodes/:id", get(episode_detail))
        .route("/api/search/shows", get(search_shows))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn read_favorites(jar: &CookieJar) -> FavoriteSet {
    FavoriteSet::decode(jar.get(COOKIE_NAME).map(|cookie| cookie.value()))
}

/// Rewrites the cookie for the whole site, readable by client-side code, with
/// no explicit expiry. The cookie is rewritten on every mutation but never
/// deleted; an empty set round-trips as `[]`.
fn write_favorites(jar: CookieJar, favorites: &FavoriteSet) -> CookieJar {
    let cookie = Cookie::build((COOKIE_NAME, favorites.encode()))
        .path("/")
        .build();
    jar.add(cookie)
}

/// GET /api/favorites: the stored IDs in storage order. Absent or corrupt
/// cookies read as the empty set; this path never fails.
async fn list_favorites(jar: CookieJar) -> Json<Vec<i64>> {
    Json(read_favorites(&jar).ids().to_vec())
}

/// POST /api/favorites: append an ID unless already present.
async fn add_favorite(
    jar: CookieJar,
    Json(payload): Json<Value>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let id = payload
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(ApiError::InvalidId)?;

    let mut favorites = read_favorites(&jar);
    if favorites.add(id) {
        info!("Added show {} to favorites", id);
    }
    let body = json!({ "success": true, "favorites": favorites.ids() });
    Ok((write_favorites(jar, &favorites), Json(body)))
}

/// DELETE /api/favorites/{id}: filter the ID out. Removing an ID that was
/// never stored still succeeds.
async fn remove_favorite(
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let id: i64 = id.parse().map_err(|_| ApiError::InvalidId)?;

    let mut favorites = read_favorites(&jar);
    if favorites.remove(id) {
        info!("Removed show {} from favorites", id);
    }
    Ok((
        write_favorites(jar, &favorites),
        Json(json!({ "success": true })),
    ))
}

async fn remove_favorite_no_id() -> ApiError {
    ApiError::NoId
}

/// GET /api/favorites/shows: resolve the stored IDs to full show records.
/// IDs that fail or are gone upstream are skipped, not surfaced.
async fn favorite_shows(State(state): State<AppState>, jar: CookieJar) -> Json<Vec<Show>> {
    let favorites = read_favorites(&jar);
    let fetches = favorites
        .ids()
        .iter()
        .map(|&id| state.catalog.fetch_show(id));
    let mut shows = Vec::new();
    for (id, result) in favorites.ids().iter().zip(join_all(fetches).await) {
        match result {
            Ok(Some(show)) => shows.push(show),
            Ok(None) => warn!("Favorite show {} no longer exists upstream", id),
            Err(e) => warn!("Failed to fetch favorite show {}: {:#}", id, e),
        }
    }
    Json(shows)
}

/// GET /api/shows: rated shows, best first. Upstream trouble degrades to an
/// empty list rather than failing the request.
async fn list_shows(State(state): State<AppState>) -> Json<Vec<Show>> {
    let shows = match state.catalog.list_shows().await {
        Ok(shows) => catalog::rank_by_rating(shows),
        Err(e) => {
            warn!("Failed to fetch show list: {:#}", e);
            Vec::new()
        }
    };
    Json(shows)
}

/// GET /api/shows/{id}: detail view with the summary stripped to plain
/// text. Absent upstream (or an upstream failure) maps to not-found.
async fn show_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Show>, ApiError> {
    let show = match state.catalog.fetch_show(id).await {
        Ok(Some(show)) => show,
        Ok(None) => return Err(ApiError::NotFound(format!("Show {} not found", id))),
        Err(e) => {
            warn!("Failed to fetch show {}: {:#}", id, e);
            return Err(ApiError::NotFound(format!("Show {} not found", id)));
        }
    };
    let summary = show.summary.as_deref().map(catalog::plain_summary);
    Ok(Json(Show { summary, ..show }))
}

async fn show_episodes(State(state): State<AppState>, Path(id): Path<i64>) -> Json<Vec<Episode>> {
    let episodes = match state.catalog.fetch_episodes(id).await {
        Ok(episodes) => episodes,
        Err(e) => {
            warn!("Failed to fetch episodes for show {}: {:#}", id, e);
            Vec::new()
        }
    };
    Json(episodes)
}

async fn show_cast(State(state): State<AppState>, Path(id): Path<i64>) -> Json<Vec<CastMember>> {
    let cast = match state.catalog.fetch_cast(id).await {
        Ok(cast) => cast,
        Err(e) => {
            warn!("Failed to fetch cast for show {}: {:#}", id, e);
            Vec::new()
        }
    };
    Json(cast)
}

/// GET /api/episodes/{id}: episode detail. The summary stays an HTML
/// fragment, as the catalog returns it.
async fn episode_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Episode>, ApiError> {
    match state.catalog.fetch_episode(id).await {
        Ok(Some(episode)) => Ok(Json(episode)),
        Ok(None) => Err(ApiError::NotFound(format!("Episode {} not found", id))),
        Err(e) => {
            warn!("Failed to fetch episode {}: {:#}", id, e);
            Err(ApiError::NotFound(format!("Episode {} not found", id)))
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// GET /api/search/shows?q=: free-text show search.
async fn search_shows(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Show>> {
    if params.q.chars().count() < MIN_SEARCH_CHARS {
        return Json(Vec::new());
    }
    let shows = match state.catalog.search_shows(&params.q).await {
        Ok(hits) => hits.into_iter().map(|hit| hit.show).collect(),
        Err(e) => {
            warn!("Search for '{}' failed: {:#}", params.q, e);
            Vec::new()
        }
    };
    Json(shows)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
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
