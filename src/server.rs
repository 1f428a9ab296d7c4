use crate::config::AppConfig;
use crate::controller::{ControllerError, Selection, ViewController};
use crate::engine::{CommandQueue, MapCommand};
use crate::feature;
use crate::geolocation::PositionReport;
use crate::index::HitIndex;
use crate::types::Neighborhood;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

/// One mounted page. Events must carry its token; anything else came from a
/// page that has since been replaced.
struct Session {
    token: u64,
    view: ViewController<CommandQueue>,
}

#[derive(Default)]
struct Sessions {
    last_token: u64,
    current: Option<Session>,
}

impl Sessions {
    fn view(&mut self, token: u64) -> Result<&mut ViewController<CommandQueue>, ApiError> {
        match &mut self.current {
            Some(session) if session.token == token => Ok(&mut session.view),
            Some(_) => {
                debug!(token, "event from a replaced view");
                Err(ControllerError::Detached.into())
            }
            None => Err(ApiError::NoSession),
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub neighborhoods: Arc<Vec<Neighborhood>>,
    pub index: HitIndex,
    sessions: Mutex<Sessions>,
}

impl AppState {
    pub fn new(config: AppConfig, neighborhoods: Vec<Neighborhood>) -> Self {
        let neighborhoods = Arc::new(neighborhoods);
        Self {
            config,
            index: HitIndex::build(neighborhoods.clone()),
            neighborhoods,
            sessions: Mutex::new(Sessions::default()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no view is mounted")]
    NoSession,
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NoSession => StatusCode::CONFLICT,
            ApiError::Controller(ControllerError::NotReady) => StatusCode::CONFLICT,
            ApiError::Controller(ControllerError::Detached) => StatusCode::CONFLICT,
            ApiError::Controller(ControllerError::UnknownNeighborhood(_)) => StatusCode::NOT_FOUND,
            ApiError::Controller(ControllerError::Engine(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type Commands = Result<Json<Vec<MapCommand>>, ApiError>;

#[derive(Serialize)]
pub struct ViewConfig {
    style: String,
    access_token: String,
    center: [f64; 2],
    zoom: f64,
}

#[derive(Serialize)]
pub struct SessionResponse {
    session: u64,
}

#[derive(Deserialize)]
pub struct SessionParams {
    session: u64,
}

#[derive(Deserialize)]
pub struct HoverParams {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    id: String,
    label: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.server.asset_dir);

    Router::new()
        .route("/api/config", get(config_handler))
        .route("/api/session", post(session_handler))
        .route("/api/teardown", post(teardown_handler))
        .route("/api/ready", post(ready_handler))
        .route("/api/click/:id", post(click_handler))
        .route("/api/hover", post(hover_handler))
        .route("/api/location", post(location_handler))
        .route("/api/selection", get(selection_handler))
        .route("/api/neighborhoods", get(neighborhoods_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, neighborhoods: Vec<Neighborhood>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, neighborhoods));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn drain(view: &mut ViewController<CommandQueue>) -> Commands {
    let engine = view.engine_mut().ok_or(ControllerError::Detached)?;
    Ok(Json(engine.drain()))
}

async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ViewConfig> {
    let map = &state.config.map;
    Json(ViewConfig {
        style: map.style.clone(),
        access_token: map.access_token.clone(),
        center: map.center,
        zoom: map.zoom,
    })
}

async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let mut sessions = state.sessions.lock().await;
    if let Some(mut previous) = sessions.current.take() {
        previous.view.teardown();
        info!(token = previous.token, "previous view torn down");
    }
    sessions.last_token += 1;
    let token = sessions.last_token;
    sessions.current = Some(Session {
        token,
        view: ViewController::mount(
            CommandQueue::new(),
            state.neighborhoods.clone(),
            state.config.map.default_center(),
        ),
    });
    info!(token, "view mounted");
    Json(SessionResponse { session: token })
}

async fn teardown_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.lock().await;
    sessions.view(params.session)?.teardown();
    sessions.current = None;
    info!(token = params.session, "view torn down");
    Ok(StatusCode::NO_CONTENT)
}

async fn ready_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Commands {
    let mut sessions = state.sessions.lock().await;
    let view = sessions.view(params.session)?;
    view.engine_mut()
        .ok_or(ControllerError::Detached)?
        .mark_loaded();
    view.on_ready()?;
    drain(view)
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Commands {
    let mut sessions = state.sessions.lock().await;
    let view = sessions.view(params.session)?;
    view.click(&id)?;
    drain(view)
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
    Json(hover): Json<HoverParams>,
) -> Commands {
    let mut sessions = state.sessions.lock().await;
    let view = sessions.view(params.session)?;
    view.hover(hover.id.as_deref())?;
    drain(view)
}

async fn location_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
    Json(report): Json<PositionReport>,
) -> Commands {
    let mut sessions = state.sessions.lock().await;
    let view = sessions.view(params.session)?;
    view.apply_position(report.into_result())?;
    drain(view)
}

async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<Json<Selection>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let view = sessions.view(params.session)?;
    Ok(Json(view.selection().clone()))
}

async fn neighborhoods_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(feature::neighborhood_collection(&state.neighborhoods))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(state.index.locate(params.lon, params.lat).map(|n| QueryResponse {
        id: n.id.clone(),
        label: n.label.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState::new(AppConfig::default(), data::builtin())))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn mount(app: &Router) -> u64 {
        let (status, body) = send(app, Method::POST, "/api/session", None).await;
        assert_eq!(status, StatusCode::OK);
        body["session"].as_u64().unwrap()
    }

    async fn mounted_and_ready() -> (Router, u64) {
        let app = app();
        let token = mount(&app).await;
        let (status, _) = send(&app, Method::POST, &format!("/api/ready?session={token}"), None).await;
        assert_eq!(status, StatusCode::OK);
        (app, token)
    }

    #[tokio::test]
    async fn config_exposes_default_center() {
        let (status, body) = send(&app(), Method::GET, "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["center"], json!([-74.5, 40.0]));
        assert_eq!(body["zoom"], json!(13.0));
    }

    #[tokio::test]
    async fn events_without_a_session_conflict() {
        let app = app();
        let (status, _) = send(&app, Method::POST, "/api/ready?session=1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, Method::POST, "/api/click/park-slope?session=1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn events_need_a_session_token() {
        let app = app();
        mount(&app).await;
        let (status, _) = send(&app, Method::POST, "/api/ready", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn each_mount_gets_a_new_token() {
        let app = app();
        let first = mount(&app).await;
        let second = mount(&app).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn click_before_ready_conflicts() {
        let app = app();
        let token = mount(&app).await;
        let (status, body) =
            send(&app, Method::POST, &format!("/api/click/park-slope?session={token}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], json!("map has not finished loading"));
    }

    #[tokio::test]
    async fn ready_returns_registration_then_nothing() {
        let app = app();
        let token = mount(&app).await;
        let ready = format!("/api/ready?session={token}");

        let (_, body) = send(&app, Method::POST, &ready, None).await;
        let commands = body.as_array().unwrap();
        assert_eq!(commands.len(), data::builtin().len() * 5);
        assert_eq!(commands[0]["op"], json!("addSource"));
        assert_eq!(commands[0]["source"]["type"], json!("geojson"));

        let (status, body) = send(&app, Method::POST, &ready, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn click_toggles_selection() {
        let (app, token) = mounted_and_ready().await;
        let click = |id: &str| format!("/api/click/{id}?session={token}");
        let selection = format!("/api/selection?session={token}");

        let (_, body) = send(&app, Method::POST, &click("park-slope"), None).await;
        assert!(body
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["layer"] == json!("park-slope-boundary")
                && c["name"] == json!("line-width")
                && c["value"] == json!(8.0)));
        let (_, current) = send(&app, Method::GET, &selection, None).await;
        assert_eq!(current, json!({"state": "selected", "id": "park-slope"}));

        send(&app, Method::POST, &click("gowanus"), None).await;
        let (_, current) = send(&app, Method::GET, &selection, None).await;
        assert_eq!(current, json!({"state": "selected", "id": "gowanus"}));

        send(&app, Method::POST, &click("gowanus"), None).await;
        let (_, current) = send(&app, Method::GET, &selection, None).await;
        assert_eq!(current, json!({"state": "unselected"}));
    }

    #[tokio::test]
    async fn unknown_neighborhood_is_not_found() {
        let (app, token) = mounted_and_ready().await;
        let (status, _) =
            send(&app, Method::POST, &format!("/api/click/atlantis?session={token}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn hover_sets_cursor() {
        let (app, token) = mounted_and_ready().await;
        let hover = format!("/api/hover?session={token}");
        let (_, body) = send(&app, Method::POST, &hover, Some(json!({"id": "gowanus"}))).await;
        assert_eq!(body, json!([{"op": "setCursor", "cursor": "pointer"}]));
        let (_, body) = send(&app, Method::POST, &hover, Some(json!({"id": null}))).await;
        assert_eq!(body, json!([{"op": "setCursor", "cursor": ""}]));
    }

    #[tokio::test]
    async fn location_report() {
        let (app, token) = mounted_and_ready().await;
        let location = format!("/api/location?session={token}");
        let (_, body) = send(
            &app,
            Method::POST,
            &location,
            Some(json!({"status": "error", "code": 1})),
        )
        .await;
        assert_eq!(body, json!([]));

        // Settled already; a later success is ignored.
        let (_, body) = send(
            &app,
            Method::POST,
            &location,
            Some(json!({"status": "ok", "lon": -73.98, "lat": 40.67})),
        )
        .await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn replaced_view_cannot_reach_the_new_one() {
        let app = app();
        let old = mount(&app).await;
        let new = mount(&app).await;
        send(&app, Method::POST, &format!("/api/ready?session={new}"), None).await;

        // The old page's position error and clicks arrive late.
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/location?session={old}"),
            Some(json!({"status": "error", "code": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) =
            send(&app, Method::POST, &format!("/api/click/park-slope?session={old}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, Method::POST, &format!("/api/teardown?session={old}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        // The new page still gets its own position request and selection.
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/location?session={new}"),
            Some(json!({"status": "ok", "lon": -73.98, "lat": 40.67})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"op": "setCenter", "center": [-73.98, 40.67]},
                {"op": "addMarker", "at": [-73.98, 40.67]}
            ])
        );
        let (_, current) = send(&app, Method::GET, &format!("/api/selection?session={new}"), None).await;
        assert_eq!(current, json!({"state": "unselected"}));
    }

    #[tokio::test]
    async fn new_session_starts_unselected() {
        let (app, old) = mounted_and_ready().await;
        send(&app, Method::POST, &format!("/api/click/park-slope?session={old}"), None).await;

        let new = mount(&app).await;
        let (_, current) = send(&app, Method::GET, &format!("/api/selection?session={new}"), None).await;
        assert_eq!(current, json!({"state": "unselected"}));

        // A fresh renderer needs everything registered again.
        let (_, body) = send(&app, Method::POST, &format!("/api/ready?session={new}"), None).await;
        assert!(!body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn teardown_ends_the_session() {
        let (app, token) = mounted_and_ready().await;
        let (status, _) = send(&app, Method::POST, &format!("/api/teardown?session={token}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/location?session={token}"),
            Some(json!({"status": "ok", "lon": 0.0, "lat": 0.0})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn neighborhoods_and_query() {
        let app = app();
        let (_, body) = send(&app, Method::GET, "/api/neighborhoods", None).await;
        assert_eq!(body["type"], json!("FeatureCollection"));
        assert_eq!(body["features"].as_array().unwrap().len(), data::builtin().len());

        let (_, body) = send(&app, Method::GET, "/api/query?lat=40.6707&lon=-73.9817", None).await;
        assert_eq!(body, json!({"id": "park-slope", "label": "25%"}));

        let (_, body) = send(&app, Method::GET, "/api/query?lat=40.0&lon=-74.5", None).await;
        assert_eq!(body, Value::Null);
    }
}
