//! Racetrack - Race simulation service
//!
//! Exposes the race registry over HTTP, one route per race operation.
//! All handlers share a single registry behind a mutex, so mutations are
//! applied one at a time.

pub mod config;
pub mod race_server;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use config::Config;
use race_server::{
    AdvanceStatus, JsonFileStore, Race, RaceError, RaceRegistry, RaceResult, RaceStore,
};

pub type Registry = RaceRegistry<Box<dyn RaceStore>>;

/// Registry shared by all request handlers
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Query parameters for creating or resetting a race
#[derive(Debug, Default, Deserialize)]
pub struct RaceParams {
    runners: Option<String>,
    distance: Option<String>,
}

impl RaceParams {
    fn parse(&self) -> RaceResult<(u32, f64)> {
        let runners = self
            .runners
            .as_deref()
            .map(str::trim)
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                RaceError::InvalidArgument("runners must be a whole number".to_string())
            })?;
        let runners = u32::try_from(runners)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                RaceError::InvalidArgument(format!(
                    "runners must be a positive integer, got {runners}"
                ))
            })?;

        let distance = self
            .distance
            .as_deref()
            .map(str::trim)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| RaceError::InvalidArgument("distance must be a number".to_string()))?;

        Ok((runners, distance))
    }
}

/// Race id taken from the path; malformed ids are rejected as structured errors
#[derive(Debug, Clone, Copy)]
pub struct RaceId(pub u32);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RaceId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| RaceError::InvalidArgument(format!("race id is unreadable: {e}")))?;
        raw.trim()
            .parse::<u32>()
            .ok()
            .filter(|&id| id > 0)
            .map(RaceId)
            .ok_or_else(|| {
                RaceError::InvalidArgument(format!(
                    "race id must be a positive integer, got {raw:?}"
                ))
                .into()
            })
    }
}

/// Race plus a human-readable summary
#[derive(Debug, Serialize)]
pub struct RaceMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdvanceStatus>,
    pub race: Race,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

/// Failure body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

/// Errors crossing the HTTP boundary
#[derive(Debug)]
pub enum ApiError {
    Race(RaceError),
    Internal(String),
}

impl From<RaceError> for ApiError {
    fn from(err: RaceError) -> Self {
        ApiError::Race(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Race(err @ (RaceError::InvalidArgument(_) | RaceError::NotFound(_))) => {
                let status = match err {
                    RaceError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                let body = ErrorBody {
                    kind: err.kind(),
                    message: err.to_string(),
                };
                (status, body)
            }
            ApiError::Race(err) => {
                log::error!("Race operation failed: {}", err);
                let body = ErrorBody {
                    kind: err.kind(),
                    message: "the race could not be processed".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            ApiError::Internal(detail) => {
                log::error!("Request handling failed: {}", detail);
                let body = ErrorBody {
                    kind: "internal",
                    message: "internal server error".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Run a registry operation off the async runtime; store I/O is blocking.
async fn with_registry<T, F>(server: SharedRegistry, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Registry) -> RaceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut registry = server
            .lock()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        op(&mut registry).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// Create a race with the requested runners and distance
async fn create_race(
    State(server): State<SharedRegistry>,
    Query(params): Query<RaceParams>,
) -> Result<Json<RaceMessage>, ApiError> {
    let (runners, distance) = params.parse()?;
    let race = with_registry(server, move |r| r.create(runners, distance)).await?;
    Ok(Json(RaceMessage {
        message: format!("Race {} started", race.id),
        status: None,
        race,
    }))
}

/// Simulate a race to its finish and report the winner
async fn simulate_race(
    State(server): State<SharedRegistry>,
    RaceId(id): RaceId,
) -> Result<Json<RaceMessage>, ApiError> {
    let advance = with_registry(server, move |r| r.advance(id)).await?;
    let race = advance.race;
    let winner = race
        .winner_id
        .map_or_else(|| "unknown".to_string(), |w| w.to_string());
    let message = match advance.status {
        AdvanceStatus::Completed => format!(
            "The race has finished after {} hours. The winner is runner {}.",
            race.elapsed_time, winner
        ),
        AdvanceStatus::AlreadyFinished => format!(
            "Race {} had already finished. The winner is runner {}.",
            race.id, winner
        ),
    };
    Ok(Json(RaceMessage {
        message,
        status: Some(advance.status),
        race,
    }))
}

/// Get current race state without advancing simulation
async fn get_race(
    State(server): State<SharedRegistry>,
    RaceId(id): RaceId,
) -> Result<Json<Race>, ApiError> {
    let race = with_registry(server, move |r| r.get(id)).await?;
    Ok(Json(race))
}

/// List every stored race
async fn list_races(State(server): State<SharedRegistry>) -> Result<Json<Vec<Race>>, ApiError> {
    let races = with_registry(server, |r| r.list()).await?;
    Ok(Json(races))
}

/// Reset a race with fresh runners
async fn reset_race(
    State(server): State<SharedRegistry>,
    RaceId(id): RaceId,
    Query(params): Query<RaceParams>,
) -> Result<Json<RaceMessage>, ApiError> {
    let (runners, distance) = params.parse()?;
    let race = with_registry(server, move |r| r.reset(id, runners, distance)).await?;
    Ok(Json(RaceMessage {
        message: format!("Race {} updated", race.id),
        status: None,
        race,
    }))
}

/// Delete a race
async fn delete_race(
    State(server): State<SharedRegistry>,
    RaceId(id): RaceId,
) -> Result<Json<Message>, ApiError> {
    with_registry(server, move |r| r.delete(id)).await?;
    Ok(Json(Message {
        message: format!("Race {id} deleted"),
    }))
}

async fn health() -> &'static str {
    "ok"
}

/// Build the router with every race route
pub fn build_router(server: SharedRegistry) -> Router {
    Router::new()
        .route("/races", get(list_races).post(create_race))
        .route(
            "/races/:id",
            get(get_race).put(reset_race).delete(delete_race),
        )
        .route("/races/:id/simulate", post(simulate_race))
        .route("/simulate/:id", get(simulate_race))
        .route("/health", get(health))
        .with_state(server)
}

/// Open the registry described by the configuration
pub fn open_registry(config: &Config) -> RaceResult<Registry> {
    let store: Box<dyn RaceStore> = Box::new(JsonFileStore::new(config.store.path.clone()));
    let registry = match config.race.seed {
        Some(seed) => RaceRegistry::open_seeded(store, seed)?,
        None => RaceRegistry::open(store)?,
    };
    Ok(registry.with_limits(config.race.limits()))
}

/// Serve the race API until the process is stopped
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let registry = open_registry(&config).with_context(|| {
        format!("Failed to open race store {}", config.store.path.display())
    })?;
    let app = build_router(Arc::new(Mutex::new(registry)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    log::info!(
        "Race server listening on {} with store {}",
        config.server.bind,
        config.store.path.display()
    );

    axum::serve(listener, app).await.context("Race server error")?;
    Ok(())
}

/// Load configuration from the environment and serve
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    serve(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use crate::race_server::MemoryStore;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store: Box<dyn RaceStore> = Box::new(MemoryStore::new());
        let registry = RaceRegistry::open_seeded(store, 21).unwrap();
        build_router(Arc::new(Mutex::new(registry)))
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app();
        let (status, _) = send(&app, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_race_lifecycle() {
        let app = test_app();

        let (status, json) = send(&app, Method::POST, "/races?runners=3&distance=30").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["race"]["id"], 1);
        assert_eq!(json["race"]["runners"].as_array().unwrap().len(), 3);
        assert!(json["race"]["winner_id"].is_null());

        let (status, json) = send(&app, Method::POST, "/races/1/simulate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["race"]["finished"], true);
        let winner = json["race"]["winner_id"].as_u64().unwrap();
        assert!((1..=3).contains(&winner));
        assert!(json["message"].as_str().unwrap().contains("hours"));

        let (status, again) = send(&app, Method::GET, "/simulate/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["status"], "already_finished");
        assert_eq!(again["race"], json["race"]);

        let (status, json) = send(&app, Method::GET, "/races").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::DELETE, "/races/1").await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, Method::GET, "/races/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_reset_endpoint() {
        let app = test_app();
        send(&app, Method::POST, "/races?runners=2&distance=15").await;
        send(&app, Method::POST, "/races/1/simulate").await;

        let (status, json) = send(&app, Method::PUT, "/races/1?runners=5&distance=20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["race"]["finished"], false);
        assert_eq!(json["race"]["elapsed_time"], 0);
        assert_eq!(json["race"]["distance"], 20.0);
        assert_eq!(json["race"]["runners"].as_array().unwrap().len(), 5);
        assert!(json["race"]["winner_id"].is_null());
    }

    #[tokio::test]
    async fn test_bad_params_are_rejected() {
        let app = test_app();

        for uri in [
            "/races?runners=abc&distance=10",
            "/races?runners=3",
            "/races?runners=-2&distance=10",
            "/races?runners=0&distance=10",
            "/races?runners=3&distance=-5",
        ] {
            let (status, json) = send(&app, Method::POST, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["kind"], "invalid_argument", "{uri}");
        }

        let (_, json) = send(&app, Method::GET, "/races").await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_race_is_not_found() {
        let app = test_app();
        for (method, uri) in [
            (Method::POST, "/races/9/simulate"),
            (Method::PUT, "/races/9?runners=2&distance=10"),
            (Method::DELETE, "/races/9"),
        ] {
            let (status, _) = send(&app, method, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_id_is_structured() {
        let app = test_app();
        send(&app, Method::POST, "/races?runners=2&distance=10").await;

        for (method, uri) in [
            (Method::GET, "/races/abc"),
            (Method::GET, "/races/-1"),
            (Method::GET, "/races/0"),
            (Method::GET, "/races/99999999999"),
            (Method::POST, "/races/abc/simulate"),
            (Method::GET, "/simulate/1.5"),
            (Method::PUT, "/races/x?runners=2&distance=10"),
            (Method::DELETE, "/races/abc"),
        ] {
            let (status, json) = send(&app, method, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["kind"], "invalid_argument", "{uri}");
            assert!(json["message"].as_str().unwrap().contains("race id"), "{uri}");
        }

        let (status, _) = send(&app, Method::GET, "/races/1").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_race_is_rejected() {
        let app = test_app();
        for uri in [
            "/races?runners=4000000000&distance=10",
            "/races?runners=3&distance=1e15",
        ] {
            let (status, json) = send(&app, Method::POST, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["kind"], "invalid_argument", "{uri}");
        }

        let (_, json) = send(&app, Method::GET, "/races").await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_open_registry_applies_config_limits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.store.path = dir.path().join("races.json");
        config.race.seed = Some(3);
        config.race.max_runners = 4;

        let mut registry = open_registry(&config).unwrap();
        assert!(registry.create(4, 10.0).is_ok());
        assert!(matches!(registry.create(5, 10.0), Err(RaceError::InvalidArgument(_))));
    }

    #[test]
    fn test_params_parse_trims_input() {
        let params = RaceParams {
            runners: Some(" 4 ".to_string()),
            distance: Some("12.5".to_string()),
        };
        assert_eq!(params.parse().unwrap(), (4, 12.5));
    }
}
