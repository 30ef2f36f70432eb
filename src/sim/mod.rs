//! Pass-play simulation modules

pub mod coverage;
pub mod defense;
pub mod formation;
pub mod geometry;
pub mod routes;
pub mod step;

pub use coverage::Coverage;
pub use formation::Formation;
pub use geometry::Pt;
pub use routes::RouteType;
pub use step::{Frame, PlayPhase, PlaySetup, SimState};

use serde::{Deserialize, Serialize};

/// Line of scrimmage (normalized field depth)
pub const LOS_Y: f32 = 0.2;
/// First-down marker depth
pub const FIRST_DOWN_Y: f32 = 0.45;
/// Where the ball sits before the snap
pub const SNAP_POINT: Pt = Pt { x: 0.5, y: LOS_Y };

/// Player roles on both sides of the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerId {
    Qb,
    Wr1,
    Wr2,
    Wr3,
    Te,
    Rb,
    Cb1,
    Cb2,
    S1,
    S2,
    N,
    Lb1,
    Lb2,
}

impl PlayerId {
    pub fn team(self) -> Team {
        match self {
            Self::Qb | Self::Wr1 | Self::Wr2 | Self::Wr3 | Self::Te | Self::Rb => Team::O,
            _ => Team::D,
        }
    }

    /// Offensive players other than the quarterback
    pub fn is_eligible(self) -> bool {
        self.team() == Team::O && self != Self::Qb
    }

    pub fn is_corner(self) -> bool {
        matches!(self, Self::Cb1 | Self::Cb2)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Qb => "QB",
            Self::Wr1 => "WR1",
            Self::Wr2 => "WR2",
            Self::Wr3 => "WR3",
            Self::Te => "TE",
            Self::Rb => "RB",
            Self::Cb1 => "CB1",
            Self::Cb2 => "CB2",
            Self::S1 => "S1",
            Self::S2 => "S2",
            Self::N => "N",
            Self::Lb1 => "LB1",
            Self::Lb2 => "LB2",
        }
    }
}

/// Team tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    /// Offense
    O,
    /// Defense
    D,
}

/// A player on the field, position normalized to the unit square
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub team: Team,
    pub x: f32,
    pub y: f32,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32) -> Self {
        Self {
            id,
            team: id.team(),
            x,
            y,
        }
    }

    pub fn pos(&self) -> Pt {
        Pt::new(self.x, self.y)
    }

    pub fn set_pos(&mut self, p: Pt) {
        self.x = p.x;
        self.y = p.y;
    }
}

/// Route assigned to one receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub receiver_id: PlayerId,
    pub route: RouteType,
}

/// Find a player by role
pub fn find(players: &[Player], id: PlayerId) -> Option<&Player> {
    players.iter().find(|p| p.id == id)
}

pub fn find_mut(players: &mut [Player], id: PlayerId) -> Option<&mut Player> {
    players.iter_mut().find(|p| p.id == id)
}

/// Insert or replace the route for a receiver, keeping one entry per receiver
pub fn set_route(routes: &mut Vec<RouteAssignment>, receiver_id: PlayerId, route: RouteType) {
    match routes.iter_mut().find(|r| r.receiver_id == receiver_id) {
        Some(existing) => existing.route = route,
        None => routes.push(RouteAssignment { receiver_id, route }),
    }
}
