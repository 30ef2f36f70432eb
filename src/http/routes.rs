//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::render::{render_frame_svg, Viewport};
use crate::session::{check_receiver, check_speed, check_target, check_throw_time, ControlError};
use crate::sim::defense::generate_defense;
use crate::sim::formation::{default_routes, eligible_receivers, offense_for_formation};
use crate::sim::{
    set_route, Coverage, Formation, Frame, Player, PlayerId, PlaySetup, RouteAssignment, SimState,
};
use crate::util::time::{uptime_secs, FRAME_RATE};
use crate::ws::handler::ws_handler;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Frame rates accepted for headless runs
const MIN_FPS: u32 = 10;
const MAX_FPS: u32 = 120;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origins()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/formations/:formation", get(formation_handler))
        .route("/defense", post(defense_handler))
        .route("/plays/simulate", post(simulate_handler))
        .route("/plays/render", post(render_handler))
        .route("/sessions/:id/frame.svg", get(session_frame_handler))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
    })
}

// ============================================================================
// Formation and defense endpoints
// ============================================================================

#[derive(Serialize)]
struct FormationResponse {
    formation: Formation,
    offense: Vec<Player>,
    routes: Vec<RouteAssignment>,
    eligible: Vec<PlayerId>,
}

async fn formation_handler(Path(name): Path<String>) -> Result<Json<FormationResponse>, AppError> {
    let formation: Formation = name.parse().map_err(AppError::NotFound)?;
    let offense = offense_for_formation(formation);

    Ok(Json(FormationResponse {
        formation,
        eligible: eligible_receivers(&offense),
        offense,
        routes: default_routes(),
    }))
}

#[derive(Deserialize)]
struct DefenseRequest {
    formation: Formation,
    coverage: Coverage,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct DefenseResponse {
    seed: u64,
    defense: Vec<Player>,
}

async fn defense_handler(
    State(state): State<AppState>,
    Json(req): Json<DefenseRequest>,
) -> Json<DefenseResponse> {
    let seed = req
        .seed
        .or(state.config.defense_seed)
        .unwrap_or_else(rand::random);
    let offense = offense_for_formation(req.formation);
    let defense = generate_defense(req.coverage, &offense, &mut ChaCha8Rng::seed_from_u64(seed));

    Json(DefenseResponse { seed, defense })
}

// ============================================================================
// Headless play endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlayRequest {
    formation: Formation,
    coverage: Coverage,
    /// Defaults to the standard route calls
    #[serde(default)]
    routes: Option<Vec<RouteAssignment>>,
    target: PlayerId,
    #[serde(default)]
    throw_time: Option<f32>,
    #[serde(default)]
    speed: Option<f32>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    fps: Option<u32>,
}

/// A validated play ready to run
struct ResolvedPlay {
    seed: u64,
    fps: u32,
    speed: f32,
    defense: Vec<Player>,
    setup: PlaySetup,
}

impl PlayRequest {
    fn resolve(self, default_seed: Option<u64>) -> Result<ResolvedPlay, AppError> {
        check_target(self.target)?;
        check_throw_time(self.throw_time)?;

        let speed = self.speed.unwrap_or(1.0);
        check_speed(speed)?;

        let fps = self.fps.unwrap_or(FRAME_RATE);
        if !(MIN_FPS..=MAX_FPS).contains(&fps) {
            return Err(AppError::BadRequest(format!(
                "fps must be between {MIN_FPS} and {MAX_FPS}"
            )));
        }

        let routes = match self.routes {
            Some(requested) => {
                let mut routes = Vec::with_capacity(requested.len());
                for ra in requested {
                    check_receiver(ra.receiver_id)?;
                    set_route(&mut routes, ra.receiver_id, ra.route);
                }
                routes
            }
            None => default_routes(),
        };

        let seed = self.seed.or(default_seed).unwrap_or_else(rand::random);
        let offense = offense_for_formation(self.formation);
        let defense = generate_defense(self.coverage, &offense, &mut ChaCha8Rng::seed_from_u64(seed));
        let setup = PlaySetup::new(offense, routes, self.coverage, self.target, self.throw_time);

        Ok(ResolvedPlay {
            seed,
            fps,
            speed,
            defense,
            setup,
        })
    }
}

impl ResolvedPlay {
    /// The snap frame followed by every frame through completion
    fn frames(&self) -> Vec<Frame> {
        let mut sim = SimState::new(&self.setup, &self.defense);
        let mut frames = vec![sim.frame(&self.setup, 0.0, false)];
        frames.extend(sim.run_to_completion(&self.setup, self.fps, self.speed));
        frames
    }
}

#[derive(Serialize)]
struct SimulateResponse {
    seed: u64,
    throw_time: f32,
    end_time: f32,
    defense: Vec<Player>,
    frames: Vec<Frame>,
}

async fn simulate_handler(
    State(state): State<AppState>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<SimulateResponse>, AppError> {
    let play = req.resolve(state.config.defense_seed)?;
    let frames = play.frames();
    debug!(seed = play.seed, frames = frames.len(), "Simulated play");

    Ok(Json(SimulateResponse {
        seed: play.seed,
        throw_time: play.setup.throw_time,
        end_time: play.setup.end_time,
        frames,
        defense: play.defense,
    }))
}

#[derive(Deserialize)]
struct RenderRequest {
    play: PlayRequest,
    /// Simulated time to draw, clamped to the play
    #[serde(default)]
    at: f32,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

async fn render_handler(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> Result<Response, AppError> {
    if !req.at.is_finite() {
        return Err(AppError::BadRequest("at must be a number of seconds".to_string()));
    }

    let defaults = Viewport::default();
    let view = Viewport {
        width: req.width.unwrap_or(defaults.width).clamp(100, 4000),
        height: req.height.unwrap_or(defaults.height).clamp(100, 4000),
    };

    let play = req.play.resolve(state.config.defense_seed)?;
    let at = req.at.clamp(0.0, play.setup.end_time);
    let frames = play.frames();
    let frame = frames
        .iter()
        .rev()
        .find(|f| f.t <= at + 1e-6)
        .or_else(|| frames.first())
        .ok_or_else(|| AppError::Internal("Simulation produced no frames".to_string()))?;

    Ok(svg_response(render_frame_svg(&play.setup, frame, view)))
}

// ============================================================================
// Live session endpoints
// ============================================================================

async fn session_frame_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let view = state
        .sessions
        .get(&id)
        .and_then(|handle| handle.live_view())
        .ok_or_else(|| AppError::NotFound(format!("No live session {id}")))?;

    Ok(svg_response(render_frame_svg(
        &view.setup,
        &view.frame,
        Viewport::default(),
    )))
}

fn svg_response(svg: String) -> Response {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ControlError> for AppError {
    fn from(e: ControlError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
