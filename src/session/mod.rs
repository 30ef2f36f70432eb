//! Live play sessions: one frame loop per WebSocket connection

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sim::defense::generate_defense;
use crate::sim::formation::{default_routes, offense_for_formation};
use crate::sim::{
    set_route, Coverage, Formation, Frame, Player, PlayerId, PlaySetup, RouteAssignment,
    SimState,
};
use crate::util::time::{frame_interval, unix_millis, FrameTimer};
use crate::ws::protocol::{ClientMsg, RoutePath, ServerMsg, SetupInfo};

/// Playback multipliers a client may pick
pub const ALLOWED_SPEEDS: [f32; 3] = [0.5, 1.0, 2.0];

/// Longest throw-time override accepted, in seconds
pub const MAX_THROW_TIME: f32 = 10.0;

/// Target selected for a fresh session
pub const DEFAULT_TARGET: PlayerId = PlayerId::Wr3;

/// Rejected control message
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ControlError {
    #[error("{0} cannot be targeted")]
    IneligibleTarget(&'static str),

    #[error("{0} cannot run a route")]
    IneligibleReceiver(&'static str),

    #[error("Speed must be 0.5, 1 or 2")]
    InvalidSpeed,

    #[error("Throw time must be between 0 and 10 seconds")]
    InvalidThrowTime,
}

/// Selections and simulation state for one connected browser
pub struct PlaySession {
    id: Uuid,
    formation: Formation,
    coverage: Coverage,
    routes: Vec<RouteAssignment>,
    target: PlayerId,
    throw_override: Option<f32>,
    speed: f32,
    playing: bool,
    rng: ChaCha8Rng,
    /// Generated alignment before shading toward the receivers
    defense: Vec<Player>,
    setup: Arc<PlaySetup>,
    sim: SimState,
}

impl PlaySession {
    pub fn new(id: Uuid, seed: u64) -> Self {
        let formation = Formation::default();
        let coverage = Coverage::default();
        let routes = default_routes();
        let offense = offense_for_formation(formation);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let defense = generate_defense(coverage, &offense, &mut rng);
        let setup = PlaySetup::new(offense, routes.clone(), coverage, DEFAULT_TARGET, None);
        let sim = SimState::new(&setup, &defense);

        Self {
            id,
            formation,
            coverage,
            routes,
            target: DEFAULT_TARGET,
            throw_override: None,
            speed: 1.0,
            playing: false,
            rng,
            defense,
            setup: Arc::new(setup),
            sim,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn elapsed(&self) -> f32 {
        self.sim.clock.elapsed()
    }

    pub fn setup(&self) -> &Arc<PlaySetup> {
        &self.setup
    }

    pub fn setup_info(&self) -> SetupInfo {
        SetupInfo {
            formation: self.formation,
            coverage: self.coverage,
            routes: self.routes.clone(),
            target: self.target,
            throw_time: self.setup.throw_time,
            end_time: self.setup.end_time,
            speed: self.speed,
            offense: self.setup.offense.clone(),
            defense: self.sim.defense().to_vec(),
            route_paths: self
                .setup
                .route_points()
                .iter()
                .map(|(receiver_id, points)| RoutePath {
                    receiver_id: *receiver_id,
                    points: points.clone(),
                })
                .collect(),
        }
    }

    /// Apply one control message, returning what the client should hear back
    pub fn apply(&mut self, msg: ClientMsg) -> Vec<ServerMsg> {
        match self.try_apply(msg) {
            Ok(replies) => replies,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Rejected control");
                vec![ServerMsg::Error {
                    message: e.to_string(),
                }]
            }
        }
    }

    fn try_apply(&mut self, msg: ClientMsg) -> Result<Vec<ServerMsg>, ControlError> {
        match msg {
            ClientMsg::Configure {
                formation,
                coverage,
                routes,
                target,
                throw_time,
            } => {
                check_target(target)?;
                check_throw_time(throw_time)?;
                if let Some(routes) = &routes {
                    for ra in routes {
                        check_receiver(ra.receiver_id)?;
                    }
                }

                if let Some(new_routes) = routes {
                    self.routes.clear();
                    for ra in new_routes {
                        set_route(&mut self.routes, ra.receiver_id, ra.route);
                    }
                }
                self.formation = formation;
                self.coverage = coverage;
                self.target = target;
                self.throw_override = throw_time;
                self.regenerate_defense();
            }
            ClientMsg::SetFormation { formation } => {
                self.formation = formation;
                self.regenerate_defense();
            }
            ClientMsg::SetCoverage { coverage } => {
                self.coverage = coverage;
                self.regenerate_defense();
            }
            ClientMsg::NewDefense => self.regenerate_defense(),
            ClientMsg::SetRoute { receiver_id, route } => {
                check_receiver(receiver_id)?;
                set_route(&mut self.routes, receiver_id, route);
                self.rebuild();
            }
            ClientMsg::SetTarget { target } => {
                check_target(target)?;
                self.target = target;
                self.rebuild();
            }
            ClientMsg::SetThrowTime { throw_time } => {
                check_throw_time(throw_time)?;
                self.throw_override = throw_time;
                self.rebuild();
            }
            ClientMsg::SetSpeed { speed } => {
                check_speed(speed)?;
                self.speed = speed;
            }
            ClientMsg::Play => {
                self.playing = true;
                return Ok(Vec::new());
            }
            ClientMsg::Pause => {
                self.playing = false;
                return Ok(Vec::new());
            }
            ClientMsg::Toggle => {
                self.playing = !self.playing;
                return Ok(Vec::new());
            }
            ClientMsg::Reset => {
                self.playing = false;
                self.sim.reset();
                return Ok(Vec::new());
            }
            ClientMsg::Ping { t } => {
                return Ok(vec![ServerMsg::Pong {
                    t,
                    server_time: unix_millis(),
                }]);
            }
        }

        Ok(vec![ServerMsg::Setup(Box::new(self.setup_info()))])
    }

    /// Advance by `wall_dt` real seconds. The first message is always the
    /// frame; a completed play adds `play_complete` and rewinds the session.
    pub fn tick(&mut self, wall_dt: f32) -> Vec<ServerMsg> {
        let frame = self.sim.tick(&self.setup, wall_dt, self.speed, self.playing);
        let completed = frame.completed;
        let ball = frame.ball;

        let mut out = vec![ServerMsg::Frame {
            playing: self.playing,
            speed: self.speed,
            frame,
        }];

        if completed {
            info!(session_id = %self.id, target = ?self.target, "Play complete");
            out.push(ServerMsg::PlayComplete {
                target: self.target,
                ball,
            });
            self.playing = false;
            self.sim.reset();
        }
        out
    }

    /// New offense for the current formation and a fresh defensive look
    fn regenerate_defense(&mut self) {
        let offense = offense_for_formation(self.formation);
        self.defense = generate_defense(self.coverage, &offense, &mut self.rng);
        self.rebuild();
    }

    /// Recompute play timing and rewind, keeping the generated defense
    fn rebuild(&mut self) {
        let offense = offense_for_formation(self.formation);
        let setup = PlaySetup::new(
            offense,
            self.routes.clone(),
            self.coverage,
            self.target,
            self.throw_override,
        );
        self.sim = SimState::new(&setup, &self.defense);
        self.setup = Arc::new(setup);
        self.playing = false;
    }
}

/// Only eligible receivers can be thrown to
pub fn check_target(target: PlayerId) -> Result<(), ControlError> {
    if target.is_eligible() {
        Ok(())
    } else {
        Err(ControlError::IneligibleTarget(target.label()))
    }
}

pub fn check_receiver(receiver: PlayerId) -> Result<(), ControlError> {
    if receiver.is_eligible() {
        Ok(())
    } else {
        Err(ControlError::IneligibleReceiver(receiver.label()))
    }
}

pub fn check_speed(speed: f32) -> Result<(), ControlError> {
    if ALLOWED_SPEEDS.contains(&speed) {
        Ok(())
    } else {
        Err(ControlError::InvalidSpeed)
    }
}

pub fn check_throw_time(throw_time: Option<f32>) -> Result<(), ControlError> {
    match throw_time {
        Some(t) if !(t > 0.0 && t <= MAX_THROW_TIME) => Err(ControlError::InvalidThrowTime),
        _ => Ok(()),
    }
}

/// Latest frame together with the setup it was computed from
#[derive(Debug, Clone)]
pub struct LiveView {
    pub setup: Arc<PlaySetup>,
    pub frame: Frame,
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub control_tx: mpsc::Sender<ClientMsg>,
    events_tx: broadcast::Sender<ServerMsg>,
    live: Arc<RwLock<Option<LiveView>>>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    /// Most recent frame, once the loop has produced one
    pub fn live_view(&self) -> Option<LiveView> {
        self.live.read().clone()
    }
}

/// Registry of all connected sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns a session and runs its frame loop
pub struct SessionDriver {
    session: PlaySession,
    control_rx: mpsc::Receiver<ClientMsg>,
    events_tx: broadcast::Sender<ServerMsg>,
    live: Arc<RwLock<Option<LiveView>>>,
}

impl SessionDriver {
    pub fn new(id: Uuid, seed: u64) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(64);
        let (events_tx, _) = broadcast::channel(64);
        let live = Arc::new(RwLock::new(None));

        let handle = SessionHandle {
            id,
            control_tx,
            events_tx: events_tx.clone(),
            live: live.clone(),
        };

        let driver = Self {
            session: PlaySession::new(id, seed),
            control_rx,
            events_tx,
            live,
        };

        (driver, handle)
    }

    /// Run the frame loop until every control sender is dropped
    pub async fn run(mut self) {
        let id = self.session.id();
        info!(session_id = %id, "Session started");

        let _ = self
            .events_tx
            .send(ServerMsg::Setup(Box::new(self.session.setup_info())));

        let mut ticker = interval(frame_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut timer = FrameTimer::new();

        loop {
            ticker.tick().await;

            if !self.process_controls() {
                break;
            }

            for msg in self.session.tick(timer.delta()) {
                if let ServerMsg::Frame { frame, .. } = &msg {
                    *self.live.write() = Some(LiveView {
                        setup: self.session.setup().clone(),
                        frame: frame.clone(),
                    });
                }
                let _ = self.events_tx.send(msg);
            }
        }

        info!(session_id = %id, "Session ended");
    }

    /// Drain pending controls; false once the connection side is gone
    fn process_controls(&mut self) -> bool {
        loop {
            match self.control_rx.try_recv() {
                Ok(msg) => {
                    for reply in self.session.apply(msg) {
                        let _ = self.events_tx.send(reply);
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RouteType;
    use std::time::Duration;

    fn session() -> PlaySession {
        PlaySession::new(Uuid::new_v4(), 7)
    }

    fn is_error(replies: &[ServerMsg]) -> bool {
        matches!(replies, [ServerMsg::Error { .. }])
    }

    #[test]
    fn fresh_session_uses_default_selections() {
        let s = session();
        let info = s.setup_info();
        assert_eq!(info.formation, Formation::TripsRight);
        assert_eq!(info.coverage, Coverage::Cover2);
        assert_eq!(info.target, PlayerId::Wr3);
        assert_eq!(info.speed, 1.0);
        assert_eq!(info.defense.len(), 7);
        assert_eq!(info.route_paths.len(), 5);
        assert!(!s.is_playing());
    }

    #[test]
    fn quarterback_cannot_be_targeted_or_given_a_route() {
        let mut s = session();
        let before = s.setup_info();

        assert!(is_error(&s.apply(ClientMsg::SetTarget {
            target: PlayerId::Qb
        })));
        assert!(is_error(&s.apply(ClientMsg::SetRoute {
            receiver_id: PlayerId::Qb,
            route: RouteType::Go,
        })));
        assert!(is_error(&s.apply(ClientMsg::SetTarget {
            target: PlayerId::Cb1
        })));

        assert_eq!(s.setup_info(), before);
    }

    #[test]
    fn configure_is_all_or_nothing() {
        let mut s = session();
        let before = s.setup_info();
        let replies = s.apply(ClientMsg::Configure {
            formation: Formation::BunchLeft,
            coverage: Coverage::Cover1,
            routes: Some(vec![RouteAssignment {
                receiver_id: PlayerId::Qb,
                route: RouteType::Flat,
            }]),
            target: PlayerId::Te,
            throw_time: None,
        });
        assert!(is_error(&replies));
        assert_eq!(s.setup_info(), before);
    }

    #[test]
    fn speed_must_be_a_preset() {
        let mut s = session();
        assert!(is_error(&s.apply(ClientMsg::SetSpeed { speed: 3.0 })));
        let replies = s.apply(ClientMsg::SetSpeed { speed: 2.0 });
        assert!(matches!(replies.as_slice(), [ServerMsg::Setup(info)] if info.speed == 2.0));
    }

    #[test]
    fn throw_time_override_moves_the_end_time() {
        let mut s = session();
        s.apply(ClientMsg::SetThrowTime {
            throw_time: Some(1.0),
        });
        assert_eq!(s.setup().throw_time, 1.0);
        assert!((s.setup().end_time - 1.8).abs() < 1e-6);

        assert!(is_error(&s.apply(ClientMsg::SetThrowTime {
            throw_time: Some(-1.0)
        })));
        assert!(is_error(&s.apply(ClientMsg::SetThrowTime {
            throw_time: Some(f32::NAN)
        })));

        s.apply(ClientMsg::SetThrowTime { throw_time: None });
        assert_ne!(s.setup().throw_time, 1.0);
    }

    #[test]
    fn throw_time_override_is_bounded() {
        assert_eq!(check_throw_time(Some(MAX_THROW_TIME)), Ok(()));
        assert_eq!(
            check_throw_time(Some(MAX_THROW_TIME + 0.5)),
            Err(ControlError::InvalidThrowTime)
        );
        assert_eq!(check_throw_time(Some(1e18)), Err(ControlError::InvalidThrowTime));
        assert_eq!(
            check_throw_time(Some(f32::INFINITY)),
            Err(ControlError::InvalidThrowTime)
        );

        let mut s = session();
        let before = s.setup_info();
        assert!(is_error(&s.apply(ClientMsg::SetThrowTime {
            throw_time: Some(1e18)
        })));
        assert_eq!(s.setup_info(), before);
    }

    #[test]
    fn route_change_recomputes_timing_and_stops_play() {
        let mut s = session();
        s.apply(ClientMsg::Play);
        s.tick(0.1);
        assert!(s.elapsed() > 0.0);

        let before = s.setup().throw_time;
        s.apply(ClientMsg::SetRoute {
            receiver_id: PlayerId::Wr3,
            route: RouteType::Hitch,
        });
        assert!(s.setup().throw_time < before);
        assert_eq!(s.elapsed(), 0.0);
        assert!(!s.is_playing());
    }

    #[test]
    fn route_change_keeps_the_defense() {
        let mut s = session();
        let before = s.setup_info().defense;
        s.apply(ClientMsg::SetTarget {
            target: PlayerId::Rb,
        });
        assert_eq!(s.setup_info().defense, before);

        s.apply(ClientMsg::NewDefense);
        assert_ne!(s.setup_info().defense, before);
    }

    #[test]
    fn same_seed_same_defense() {
        let mut a = PlaySession::new(Uuid::new_v4(), 99);
        let mut b = PlaySession::new(Uuid::new_v4(), 99);
        for s in [&mut a, &mut b] {
            s.apply(ClientMsg::SetFormation {
                formation: Formation::Doubles2x2,
            });
            s.apply(ClientMsg::SetCoverage {
                coverage: Coverage::Quarters,
            });
        }
        assert_eq!(a.setup_info().defense, b.setup_info().defense);
    }

    #[test]
    fn completion_pauses_and_rewinds() {
        let mut s = session();
        s.apply(ClientMsg::SetThrowTime {
            throw_time: Some(1.0),
        });
        s.apply(ClientMsg::Play);

        let mut completions = 0;
        let mut last_frame_completed = false;
        for _ in 0..40 {
            let out = s.tick(0.1);
            if let ServerMsg::Frame { frame, .. } = &out[0] {
                last_frame_completed = frame.completed;
            }
            if out.iter().any(|m| matches!(m, ServerMsg::PlayComplete { .. })) {
                completions += 1;
                assert!(last_frame_completed);
                break;
            }
        }
        assert_eq!(completions, 1);
        assert!(!s.is_playing());
        assert_eq!(s.elapsed(), 0.0);

        // paused after completion: later ticks stay at the snap
        for _ in 0..5 {
            let out = s.tick(0.1);
            assert_eq!(out.len(), 1);
        }
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn toggle_and_reset() {
        let mut s = session();
        s.apply(ClientMsg::Toggle);
        assert!(s.is_playing());
        s.tick(0.2);
        s.apply(ClientMsg::Toggle);
        assert!(!s.is_playing());
        let t = s.elapsed();
        s.tick(0.2);
        assert_eq!(s.elapsed(), t);

        s.apply(ClientMsg::Reset);
        assert_eq!(s.elapsed(), 0.0);
        assert!(!s.is_playing());
    }

    #[test]
    fn ping_answers_with_pong() {
        let mut s = session();
        let replies = s.apply(ClientMsg::Ping { t: 42 });
        assert!(matches!(replies.as_slice(), [ServerMsg::Pong { t: 42, .. }]));
    }

    #[test]
    fn registry_tracks_sessions() {
        let registry = SessionRegistry::new();
        let (_driver, handle) = SessionDriver::new(Uuid::new_v4(), 1);
        let id = handle.id;

        registry.insert(handle);
        assert_eq!(registry.active_sessions(), 1);
        assert!(registry.get(&id).is_some());
        assert!(registry.remove(&id).is_some());
        assert_eq!(registry.active_sessions(), 0);
    }

    async fn next_matching(
        events: &mut broadcast::Receiver<ServerMsg>,
        pred: impl Fn(&ServerMsg) -> bool,
    ) -> ServerMsg {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(msg) if pred(&msg) => return msg,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("event stream ended: {e}"),
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn driver_streams_frames_and_stops_when_controls_close() {
        let (driver, handle) = SessionDriver::new(Uuid::new_v4(), 3);
        let mut events = handle.subscribe();
        let task = tokio::spawn(driver.run());

        let first = events.recv().await.unwrap();
        assert!(matches!(first, ServerMsg::Setup(_)));

        next_matching(&mut events, |m| matches!(m, ServerMsg::Frame { .. })).await;
        let live = handle.live_view().expect("a frame has been published");
        assert_eq!(live.frame.offense.len(), live.setup.offense.len());

        handle.control_tx.send(ClientMsg::Ping { t: 5 }).await.unwrap();
        let pong = next_matching(&mut events, |m| matches!(m, ServerMsg::Pong { .. })).await;
        assert!(matches!(pong, ServerMsg::Pong { t: 5, .. }));

        drop(handle);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
