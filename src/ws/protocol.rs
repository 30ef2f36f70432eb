//! WebSocket protocol message definitions
//! These are the wire types for browser-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sim::{Coverage, Formation, Frame, Player, PlayerId, Pt, RouteAssignment, RouteType};

/// Messages sent from the browser to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Replace every selection at once
    Configure {
        formation: Formation,
        coverage: Coverage,
        /// Keeps the current routes when absent
        #[serde(default)]
        routes: Option<Vec<RouteAssignment>>,
        target: PlayerId,
        #[serde(default)]
        throw_time: Option<f32>,
    },

    SetFormation {
        formation: Formation,
    },

    SetCoverage {
        coverage: Coverage,
    },

    SetRoute {
        receiver_id: PlayerId,
        route: RouteType,
    },

    SetTarget {
        target: PlayerId,
    },

    /// Override the computed throw time (None restores the computed one)
    SetThrowTime {
        throw_time: Option<f32>,
    },

    /// Playback speed multiplier (0.5, 1 or 2)
    SetSpeed {
        speed: f32,
    },

    Play,
    Pause,
    Toggle,
    Reset,

    /// Regenerate the defensive alignment
    NewDefense,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
    },

    /// Current selections and derived timing; sent whenever they change
    Setup(Box<SetupInfo>),

    /// One animation frame
    Frame {
        playing: bool,
        speed: f32,
        #[serde(flatten)]
        frame: Frame,
    },

    /// The play reached its end time
    PlayComplete {
        target: PlayerId,
        ball: Pt,
    },

    /// Pong response
    Pong {
        t: u64,
        server_time: u64,
    },

    /// Rejected control message
    Error {
        message: String,
    },
}

/// Snapshot of a session's selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub formation: Formation,
    pub coverage: Coverage,
    pub routes: Vec<RouteAssignment>,
    pub target: PlayerId,
    pub throw_time: f32,
    pub end_time: f32,
    pub speed: f32,
    pub offense: Vec<Player>,
    pub defense: Vec<Player>,
    /// Absolute route polylines for drawing reference lines
    pub route_paths: Vec<RoutePath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub receiver_id: PlayerId,
    pub points: Vec<Pt>,
}
