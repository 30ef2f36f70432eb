//! Per-frame play simulation: receivers, quarterback, defenders and ball

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::coverage::{pursuit_speed, Coverage, CoverageTable, ManTuning, Scheme, ZoneTuning};
use super::geometry::{clamp01, dist, move_toward, polyline_length, position_along_polyline, Pt};
use super::routes::absolute_route_points;
use super::{find, find_mut, Player, PlayerId, RouteAssignment, SNAP_POINT};

/// Ball reaches the quarterback at this time
pub const T_SNAP: f32 = 0.25;
/// Receiver speed along the route (normalized units per second)
pub const RECEIVER_SPEED: f32 = 0.22;
/// Throw lands a bit before the route finishes
pub const ANTICIPATION: f32 = 0.7;
/// Time after the throw before the play is over
pub const LANDING_BUFFER: f32 = 0.8;
/// Fallback throw time when the target has no route
pub const DEFAULT_THROW_TIME: f32 = 1.0;
/// Defenders hold until this time
pub const REACTION_DELAY: f32 = 0.2;
/// Frame delta cap, so a stalled tab does not teleport defenders
pub const MAX_FRAME_DT: f32 = 0.05;
/// Frame delta used when the caller reports none
const DEFAULT_FRAME_DT: f32 = 0.016;
/// Max lateral slide per frame for corners
const CORNER_MAX_DX: f32 = 0.0035;
const QB_DROP: f32 = 0.04;
/// Look-ahead used to read a receiver's break direction
const BREAK_LOOKAHEAD: f32 = 0.10;
const FLIGHT_TIME_PER_UNIT: f32 = 0.9;
const MIN_FLIGHT_TIME: f32 = 0.25;
const MAX_FLIGHT_TIME: f32 = 0.65;
/// Upper bound on frames produced by a headless run
const MAX_FRAMES: usize = 20_000;

/// Phase of the play at a given simulated time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayPhase {
    PreSnap,
    RouteRunning,
    BallInFlight,
    Complete,
}

/// Everything fixed for the duration of one play
#[derive(Debug, Clone)]
pub struct PlaySetup {
    pub offense: Vec<Player>,
    pub routes: Vec<RouteAssignment>,
    pub coverage: Coverage,
    pub target: PlayerId,
    pub throw_time: f32,
    pub end_time: f32,
    table: CoverageTable,
    route_points: Vec<(PlayerId, Vec<Pt>)>,
}

impl PlaySetup {
    pub fn new(
        offense: Vec<Player>,
        routes: Vec<RouteAssignment>,
        coverage: Coverage,
        target: PlayerId,
        throw_override: Option<f32>,
    ) -> Self {
        let route_points: Vec<(PlayerId, Vec<Pt>)> = routes
            .iter()
            .filter_map(|ra| {
                find(&offense, ra.receiver_id)
                    .map(|receiver| (ra.receiver_id, absolute_route_points(receiver, ra.route)))
            })
            .collect();

        let throw_time = throw_override.unwrap_or_else(|| {
            route_points
                .iter()
                .find(|(id, _)| *id == target)
                .map(|(_, pts)| {
                    let travel = polyline_length(pts) / RECEIVER_SPEED;
                    (travel * ANTICIPATION).max(T_SNAP)
                })
                .unwrap_or(DEFAULT_THROW_TIME)
        });

        Self {
            offense,
            routes,
            coverage,
            target,
            throw_time,
            end_time: throw_time + LANDING_BUFFER,
            table: CoverageTable::for_coverage(coverage),
            route_points,
        }
    }

    pub fn table(&self) -> &CoverageTable {
        &self.table
    }

    /// Absolute route polylines, one per receiver with an assignment
    pub fn route_points(&self) -> &[(PlayerId, Vec<Pt>)] {
        &self.route_points
    }

    pub fn phase_at(&self, t: f32) -> PlayPhase {
        if t >= self.end_time {
            PlayPhase::Complete
        } else if t <= T_SNAP {
            PlayPhase::PreSnap
        } else if t < self.throw_time {
            PlayPhase::RouteRunning
        } else {
            PlayPhase::BallInFlight
        }
    }
}

/// Simulated play time
#[derive(Debug, Clone)]
pub struct PlayClock {
    elapsed: f32,
    end_time: f32,
    done: bool,
}

impl PlayClock {
    pub fn new(end_time: f32) -> Self {
        Self {
            elapsed: 0.0,
            end_time,
            done: false,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Advance by `dt` seconds of play time, capped at the end time.
    /// Returns true only on the call that completes the play.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.end_time);
        if self.elapsed >= self.end_time && !self.done {
            self.done = true;
            return true;
        }
        false
    }

    /// Jump to a point in the play without reporting completion
    #[cfg(test)]
    pub fn seek(&mut self, t: f32) {
        self.elapsed = t.clamp(0.0, self.end_time);
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.done = false;
    }
}

/// Positions of everything on the field at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub t: f32,
    pub phase: PlayPhase,
    pub offense: Vec<Player>,
    pub defense: Vec<Player>,
    pub ball: Pt,
    pub target: PlayerId,
    /// Set on exactly one frame per play
    pub completed: bool,
}

/// Cross-frame simulation state, owned by whoever drives the frame loop
#[derive(Debug, Clone)]
pub struct SimState {
    pub clock: PlayClock,
    defense: Vec<Player>,
    /// Pre-snap alignment restored on reset
    aligned: Vec<Player>,
    /// Generated alignment, reference for zone depth and corner landmarks
    initial: Vec<Player>,
    /// Smoothed man leverage keyed by receiver
    leverage: HashMap<PlayerId, f32>,
    nickel_left: bool,
}

impl SimState {
    pub fn new(setup: &PlaySetup, defense: &[Player]) -> Self {
        let aligned = super::defense::align_defense(defense, &setup.offense);
        let nickel_left = find(&setup.offense, PlayerId::Wr2).is_some_and(|wr2| wr2.x < 0.5);

        Self {
            clock: PlayClock::new(setup.end_time),
            defense: aligned.clone(),
            aligned,
            initial: defense.to_vec(),
            leverage: HashMap::new(),
            nickel_left,
        }
    }

    pub fn defense(&self) -> &[Player] {
        &self.defense
    }

    /// Rewind to the snap with the pre-snap alignment restored
    pub fn reset(&mut self) {
        self.clock.reset();
        self.defense = self.aligned.clone();
        self.leverage.clear();
    }

    /// Advance the clock when `playing`, then compute the frame.
    ///
    /// `wall_dt` is real elapsed time since the previous frame; the clock
    /// moves by `wall_dt * speed`.
    pub fn tick(&mut self, setup: &PlaySetup, wall_dt: f32, speed: f32, playing: bool) -> Frame {
        let completed = playing && self.clock.advance(wall_dt * speed);
        let mut frame = self.frame(setup, wall_dt, playing);
        frame.completed = completed;
        frame
    }

    /// Compute positions at the current clock time. Defenders only move
    /// when `active`.
    pub fn frame(&mut self, setup: &PlaySetup, wall_dt: f32, active: bool) -> Frame {
        let t = self.clock.elapsed();
        let mut offense = setup.offense.clone();

        if t <= T_SNAP {
            self.mirror_splits(&setup.offense);
        }

        let mut lateral: HashMap<PlayerId, f32> = HashMap::new();
        for (id, pts) in setup.route_points() {
            let pos = position_along_polyline(pts, RECEIVER_SPEED * t);
            let ahead = position_along_polyline(pts, RECEIVER_SPEED * (t + BREAK_LOOKAHEAD));
            lateral.insert(*id, ahead.x - pos.x);
            if let Some(p) = find_mut(&mut offense, *id) {
                p.set_pos(pos);
            }
        }

        if let Some(qb) = find_mut(&mut offense, PlayerId::Qb) {
            qb.y = clamp01(qb.y - t.min(1.0) * QB_DROP);
        }

        if active && t >= REACTION_DELAY {
            let frame_dt = if wall_dt > 0.0 {
                wall_dt.min(MAX_FRAME_DT)
            } else {
                DEFAULT_FRAME_DT
            };
            match setup.table().scheme {
                Scheme::Man(tuning) => {
                    self.pursue_man(setup.table(), &tuning, &offense, &lateral, frame_dt)
                }
                Scheme::Zone(tuning) => self.drop_zone(setup.table(), &tuning, &offense, frame_dt),
            }
        }

        Frame {
            t,
            phase: setup.phase_at(t),
            ball: ball_position(setup, &offense, t),
            offense,
            defense: self.defense.clone(),
            target: setup.target,
            completed: false,
        }
    }

    /// Before the snap the corners and nickel sit on their receivers' splits
    fn mirror_splits(&mut self, offense: &[Player]) {
        for (receiver, defender) in [
            (PlayerId::Wr1, PlayerId::Cb1),
            (PlayerId::Wr2, PlayerId::N),
            (PlayerId::Wr3, PlayerId::Cb2),
        ] {
            if let (Some(wr), Some(d)) = (find(offense, receiver), find_mut(&mut self.defense, defender)) {
                d.x = wr.x;
            }
        }
    }

    fn pursue_man(
        &mut self,
        table: &CoverageTable,
        tuning: &ManTuning,
        offense: &[Player],
        lateral: &HashMap<PlayerId, f32>,
        frame_dt: f32,
    ) {
        let assignments = man_assignments(&self.defense, offense);

        for i in 0..self.defense.len() {
            let d = self.defense[i];
            let cur = d.pos();
            let speed = pursuit_speed(d.id);

            let next = if let Some(rid) = assignments.get(&d.id).copied().flatten() {
                let Some(wr) = find(offense, rid) else {
                    continue;
                };
                let is_nickel = d.id == PlayerId::N;
                let step_scale = if is_nickel {
                    tuning.nickel_step_scale
                } else {
                    tuning.step_scale
                };
                let step = speed * frame_dt * step_scale;

                let desired = if is_nickel {
                    let inside = if wr.x < 0.5 {
                        tuning.nickel_inside_leverage
                    } else {
                        -tuning.nickel_inside_leverage
                    };
                    let dx = lateral.get(&rid).copied().unwrap_or(0.0);
                    if dx > tuning.break_threshold {
                        -inside
                    } else {
                        inside
                    }
                } else if wr.x < 0.5 {
                    -tuning.outside_leverage
                } else {
                    tuning.outside_leverage
                };

                let prev = self.leverage.get(&rid).copied().unwrap_or(0.0);
                let leverage = prev * tuning.leverage_memory + desired * (1.0 - tuning.leverage_memory);
                self.leverage.insert(rid, leverage);

                let aim = Pt::new(clamp01(wr.x + leverage), wr.y);
                let mix = if is_nickel {
                    tuning.nickel_pursuit_mix
                } else {
                    tuning.pursuit_mix
                };
                let mut lagged = cur.lerp(aim, mix);
                lagged.y = lagged.y.min(wr.y + tuning.lead_limit);

                move_toward(cur, lagged, step)
            } else if matches!(d.id, PlayerId::S1 | PlayerId::S2) {
                let initial = find(&self.initial, d.id);
                let home = table.zone_home(d.id, self.nickel_left, initial);
                let aim = if d.id == PlayerId::S2 {
                    let threat = nearest_threat(offense, home).map_or(home, |p| p.pos());
                    home.blend(threat, tuning.robber_home_weight)
                } else {
                    home
                };
                move_toward(cur, aim, speed * frame_dt)
            } else {
                continue;
            };

            apply_step(&mut self.defense[i], cur, next);
        }
    }

    fn drop_zone(
        &mut self,
        table: &CoverageTable,
        tuning: &ZoneTuning,
        offense: &[Player],
        frame_dt: f32,
    ) {
        for i in 0..self.defense.len() {
            let d = self.defense[i];
            let cur = d.pos();
            let initial = find(&self.initial, d.id);

            let mut home = table.zone_home(d.id, self.nickel_left, initial);
            if d.id.is_corner() {
                if let Some(initial) = initial {
                    home.x = initial.x;
                }
            }

            let threat = nearest_threat(offense, home).map_or(home, |p| p.pos());
            let weight = if d.id.is_corner() {
                tuning.corner_home_weight
            } else {
                tuning.home_weight
            };
            let aim = home.blend(threat, weight);
            let next = move_toward(cur, aim, pursuit_speed(d.id) * frame_dt);

            apply_step(&mut self.defense[i], cur, next);
        }
    }

    /// Run a whole play at a fixed frame rate, from the current clock to
    /// completion
    pub fn run_to_completion(&mut self, setup: &PlaySetup, fps: u32, speed: f32) -> Vec<Frame> {
        let dt = 1.0 / fps.max(1) as f32;
        let remaining = (setup.end_time - self.clock.elapsed()).max(0.0);
        let budget = ((remaining / (dt * speed.max(f32::EPSILON))).ceil() + 2.0)
            .min(MAX_FRAMES as f32) as usize;

        let mut frames = Vec::with_capacity(budget);
        for _ in 0..budget {
            let frame = self.tick(setup, dt, speed, true);
            let done = frame.completed;
            frames.push(frame);
            if done || self.clock.is_done() {
                break;
            }
        }
        frames
    }
}

/// Man matchups: defender -> receiver (None when a linebacker is left free)
fn man_assignments(defense: &[Player], offense: &[Player]) -> HashMap<PlayerId, Option<PlayerId>> {
    use PlayerId::*;

    let mut assign: HashMap<PlayerId, Option<PlayerId>> = HashMap::from([
        (Cb1, Some(Wr1)),
        (Cb2, Some(Wr3)),
        (N, Some(Wr2)),
        (Lb1, Some(Te)),
        (Lb2, Some(Rb)),
    ]);

    let lb1 = find(defense, Lb1);
    let lb2 = find(defense, Lb2);
    let te = find(offense, Te);
    let rb = find(offense, Rb);
    let dist_to = |a: Option<&Player>, b: Option<&Player>| match (a, b) {
        (Some(a), Some(b)) => dist(a.pos(), b.pos()),
        _ => f32::INFINITY,
    };

    let has_lb = lb1.is_some() || lb2.is_some();
    if lb1.is_some() && lb2.is_some() && te.is_some() && rb.is_some() {
        let straight = dist_to(lb1, te) + dist_to(lb2, rb);
        let crossed = dist_to(lb1, rb) + dist_to(lb2, te);
        if crossed < straight {
            assign.insert(Lb1, Some(Rb));
            assign.insert(Lb2, Some(Te));
        }
    } else if te.is_some() && has_lb {
        take_nearest_lb(&mut assign, Te, dist_to(lb1, te) <= dist_to(lb2, te));
    } else if rb.is_some() && has_lb {
        take_nearest_lb(&mut assign, Rb, dist_to(lb1, rb) <= dist_to(lb2, rb));
    }
    assign
}

fn take_nearest_lb(
    assign: &mut HashMap<PlayerId, Option<PlayerId>>,
    receiver: PlayerId,
    lb1_closer: bool,
) {
    let (taker, free) = if lb1_closer {
        (PlayerId::Lb1, PlayerId::Lb2)
    } else {
        (PlayerId::Lb2, PlayerId::Lb1)
    };
    assign.insert(taker, Some(receiver));
    assign.insert(free, None);
}

/// Closest non-quarterback offensive player to `point`
fn nearest_threat(offense: &[Player], point: Pt) -> Option<&Player> {
    offense
        .iter()
        .filter(|p| p.id.is_eligible())
        .min_by(|a, b| dist(a.pos(), point).total_cmp(&dist(b.pos(), point)))
}

/// Commit a defender move, limiting how fast corners slide laterally
fn apply_step(defender: &mut Player, cur: Pt, next: Pt) {
    let x = if defender.id.is_corner() {
        next.x.clamp(cur.x - CORNER_MAX_DX, cur.x + CORNER_MAX_DX)
    } else {
        next.x
    };
    defender.x = clamp01(x);
    defender.y = clamp01(next.y);
}

/// Snap, hold, then throw toward the target's live position
fn ball_position(setup: &PlaySetup, offense: &[Player], t: f32) -> Pt {
    let Some(qb) = find(offense, PlayerId::Qb).map(Player::pos) else {
        return SNAP_POINT;
    };

    if t <= T_SNAP {
        return SNAP_POINT.lerp(qb, t / T_SNAP);
    }
    if t < setup.throw_time {
        return qb;
    }
    match find(offense, setup.target) {
        Some(target) => {
            let end = target.pos();
            let flight = (dist(qb, end) * FLIGHT_TIME_PER_UNIT).clamp(MIN_FLIGHT_TIME, MAX_FLIGHT_TIME);
            let u = ((t - setup.throw_time) / flight).min(1.0);
            qb.lerp(end, u)
        }
        None => qb,
    }
}
