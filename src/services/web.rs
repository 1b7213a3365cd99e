//! Axum-based JSON API for layout entities and track power.
//!
//! Provides REST endpoints for:
//! - GET/PUT `/api/power` - Track power state and deferred power requests
//! - GET `/api/outputs`, GET/PUT/DELETE `/api/outputs/:id`, POST `/api/outputs/:id/toggle`
//! - GET `/api/turnouts`, GET/PUT/DELETE `/api/turnouts/:id`, POST `/api/turnouts/:id/toggle`
//! - GET `/api/sensors`, GET/PUT/DELETE `/api/sensors/:id`
//! - POST `/api/estop` - Emergency stop every locomotive
//! - POST `/api/command` - Run raw DCC++ commands
//!
//! Output and sensor routes are only mounted when the feature is enabled.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::WebConfig;
use crate::entity::{
    Entity, EntityError, EntityManager, EntityView, Output, OutputConfig, Sensor, SensorConfig,
    Turnout, TurnoutConfig,
};
use crate::frame::FrameExtractor;
use crate::station::StationContext;

use super::api::{
    ApiResponse, CommandRequest, CommandResponse, OutputRequest, PowerResponse, SensorRequest,
    SetPowerRequest, TurnoutRequest,
};
use super::shared::SharedStation;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn fail<T>(status: StatusCode, message: impl Into<String>) -> Reply<T> {
    (status, Json(ApiResponse::err(message)))
}

fn not_found_entity<T>(kind: &str, id: u16) -> Reply<T> {
    fail(StatusCode::NOT_FOUND, format!("{kind} {id} not found"))
}

fn rejected<T>(err: EntityError) -> Reply<T> {
    log::warn!("[Web] {err}");
    fail(StatusCode::CONFLICT, err.to_string())
}

fn list<E: Entity>(manager: &EntityManager<E>) -> Reply<Vec<EntityView>> {
    ok(manager.views())
}

fn single<E: Entity>(manager: &EntityManager<E>, id: u16) -> Reply<EntityView> {
    match manager.get(id) {
        Some(entity) => ok(entity.view()),
        None => not_found_entity(E::KIND, id),
    }
}

fn removed<T: Entity>(ctx: &mut StationContext, found: bool, id: u16) -> Reply<()> {
    if !found {
        return not_found_entity(T::KIND, id);
    }
    ctx.mark_dirty();
    ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/power
async fn get_power(State(state): State<Arc<SharedStation>>) -> Reply<PowerResponse> {
    ok(state.with_station(|station| {
        PowerResponse::new(station.ctx.hw.track.as_ref(), station.ctx.power.pending())
    }))
}

/// PUT /api/power - Accepts JSON: `{"enabled": true}`
async fn set_power(
    State(state): State<Arc<SharedStation>>,
    Json(request): Json<SetPowerRequest>,
) -> Reply<PowerResponse> {
    ok(state.with_station(|station| {
        station.ctx.power.request(request.enabled);
        PowerResponse::new(station.ctx.hw.track.as_ref(), station.ctx.power.pending())
    }))
}

/// POST /api/estop
async fn emergency_stop(State(state): State<Arc<SharedStation>>) -> Reply<CommandResponse> {
    let response = state.dispatch("estop");
    ok(CommandResponse { response })
}

/// POST /api/command - Accepts JSON: `{"command": "Z 1 1"}` or `{"command": "<s>"}`
async fn run_command(
    State(state): State<Arc<SharedStation>>,
    Json(request): Json<CommandRequest>,
) -> Reply<CommandResponse> {
    let command = request.command.trim();
    if command.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Empty command");
    }
    let response = if command.starts_with('<') {
        let mut extractor: FrameExtractor = FrameExtractor::new();
        state.feed(&mut extractor, command.as_bytes())
    } else {
        state.dispatch(command)
    };
    ok(CommandResponse { response })
}

/// GET /api/outputs
async fn list_outputs(State(state): State<Arc<SharedStation>>) -> Reply<Vec<EntityView>> {
    state.with_station(|station| list(&station.ctx.outputs))
}

/// GET /api/outputs/:id
async fn get_output(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<EntityView> {
    state.with_station(|station| single(&station.ctx.outputs, id))
}

/// PUT /api/outputs/:id - Accepts JSON: `{"pin": 16, "inverted": false}`
async fn put_output(
    State(state): State<Arc<SharedStation>>,
    Path(id): Path<u16>,
    Json(request): Json<OutputRequest>,
) -> Reply<EntityView> {
    state.with_station(|station| {
        let ctx = &mut station.ctx;
        match ctx.create_output(id, OutputConfig::new(request.pin, request.flags())) {
            Ok(()) => single(&ctx.outputs, id),
            Err(err) => rejected(err),
        }
    })
}

/// DELETE /api/outputs/:id
async fn delete_output(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<()> {
    state.with_station(|station| {
        let found = station.ctx.outputs.remove(id);
        removed::<Output>(&mut station.ctx, found, id)
    })
}

/// POST /api/outputs/:id/toggle
async fn toggle_output(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<EntityView> {
    state.with_station(|station| {
        let ctx = &mut station.ctx;
        if ctx.outputs.toggle(id, &mut ctx.hw) {
            ctx.mark_dirty();
        }
        single(&ctx.outputs, id)
    })
}

/// GET /api/turnouts
async fn list_turnouts(State(state): State<Arc<SharedStation>>) -> Reply<Vec<EntityView>> {
    state.with_station(|station| list(&station.ctx.turnouts))
}

/// GET /api/turnouts/:id
async fn get_turnout(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<EntityView> {
    state.with_station(|station| single(&station.ctx.turnouts, id))
}

/// PUT /api/turnouts/:id - Accepts JSON: `{"address": 17, "kind": 0}`
async fn put_turnout(
    State(state): State<Arc<SharedStation>>,
    Path(id): Path<u16>,
    Json(request): Json<TurnoutRequest>,
) -> Reply<EntityView> {
    let Some(kind) = request.turnout_type() else {
        return fail(StatusCode::BAD_REQUEST, format!("Unknown turnout type {}", request.kind));
    };
    state.with_station(|station| {
        let ctx = &mut station.ctx;
        match ctx.create_turnout(id, TurnoutConfig::new(request.address, kind)) {
            Ok(()) => single(&ctx.turnouts, id),
            Err(err) => rejected(err),
        }
    })
}

/// DELETE /api/turnouts/:id
async fn delete_turnout(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<()> {
    state.with_station(|station| {
        let found = station.ctx.turnouts.remove(id);
        removed::<Turnout>(&mut station.ctx, found, id)
    })
}

/// POST /api/turnouts/:id/toggle
async fn toggle_turnout(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<EntityView> {
    state.with_station(|station| {
        let ctx = &mut station.ctx;
        if ctx.turnouts.toggle(id, &mut ctx.hw) {
            ctx.mark_dirty();
        }
        single(&ctx.turnouts, id)
    })
}

/// GET /api/sensors
async fn list_sensors(State(state): State<Arc<SharedStation>>) -> Reply<Vec<EntityView>> {
    state.with_station(|station| list(&station.ctx.sensors))
}

/// GET /api/sensors/:id
async fn get_sensor(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<EntityView> {
    state.with_station(|station| single(&station.ctx.sensors, id))
}

/// PUT /api/sensors/:id - Accepts JSON: `{"pin": 21, "pull_up": true}`
async fn put_sensor(
    State(state): State<Arc<SharedStation>>,
    Path(id): Path<u16>,
    Json(request): Json<SensorRequest>,
) -> Reply<EntityView> {
    state.with_station(|station| {
        let ctx = &mut station.ctx;
        match ctx.create_sensor(id, SensorConfig::new(request.pin, request.pull_up)) {
            Ok(()) => single(&ctx.sensors, id),
            Err(err) => rejected(err),
        }
    })
}

/// DELETE /api/sensors/:id
async fn delete_sensor(State(state): State<Arc<SharedStation>>, Path(id): Path<u16>) -> Reply<()> {
    state.with_station(|station| {
        let found = station.ctx.sensors.remove(id);
        removed::<Sensor>(&mut station.ctx, found, id)
    })
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    fail::<()>(StatusCode::NOT_FOUND, "Not found")
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            cors_permissive: true,
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from the station's [`WebConfig`]
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: Arc<SharedStation>, config: &WebServerConfig) -> Router {
    let features = state.with_station(|station| station.ctx.config.features.clone());

    let mut router = Router::new()
        .route("/api/power", get(get_power).put(set_power))
        .route("/api/estop", post(emergency_stop))
        .route("/api/command", post(run_command))
        .route("/api/turnouts", get(list_turnouts))
        .route(
            "/api/turnouts/:id",
            get(get_turnout).put(put_turnout).delete(delete_turnout),
        )
        .route("/api/turnouts/:id/toggle", post(toggle_turnout));

    if features.outputs {
        router = router
            .route("/api/outputs", get(list_outputs))
            .route(
                "/api/outputs/:id",
                get(get_output).put(put_output).delete(delete_output),
            )
            .route("/api/outputs/:id/toggle", post(toggle_output));
    }
    if features.sensors {
        router = router.route("/api/sensors", get(list_sensors)).route(
            "/api/sensors/:id",
            get(get_sensor).put(put_sensor).delete(delete_sensor),
        );
    }

    let mut router = router.fallback(not_found).with_state(state);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// Runs until the listener fails. Share `state` with the TCP listener and
/// the update loop so every surface sees the same layout.
pub async fn run_server(state: Arc<SharedStation>, config: WebServerConfig) -> std::io::Result<()> {
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("[Web] Listening on http://{}", config.addr);

    axum::serve(listener, router).await
}
