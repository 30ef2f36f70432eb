//! Coverage schemes: zone landmarks, pursuit speeds and man-coverage tuning

use serde::{Deserialize, Serialize};

use super::geometry::{clamp01, Pt};
use super::{Player, PlayerId, LOS_Y};

/// Defensive coverage call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coverage {
    /// Man-to-man with a single high safety
    #[serde(rename = "COVER_1")]
    Cover1,
    #[serde(rename = "COVER_2")]
    Cover2,
    #[serde(rename = "COVER_3")]
    Cover3,
    #[serde(rename = "QUARTERS")]
    Quarters,
}

impl Coverage {
    pub const ALL: [Coverage; 4] = [Self::Cover1, Self::Cover2, Self::Cover3, Self::Quarters];

    pub fn label(self) -> &'static str {
        match self {
            Self::Cover1 => "COVER 1",
            Self::Cover2 => "COVER 2",
            Self::Cover3 => "COVER 3",
            Self::Quarters => "QUARTERS",
        }
    }
}

impl Default for Coverage {
    fn default() -> Self {
        Self::Cover2
    }
}

/// Landmark x, either fixed or keyed to the slot (nickel) side
#[derive(Debug, Clone, Copy)]
pub enum LandmarkX {
    Fixed(f32),
    Strength { nickel_left: f32, nickel_right: f32 },
}

impl LandmarkX {
    fn resolve(self, nickel_left: bool) -> f32 {
        match self {
            Self::Fixed(x) => x,
            Self::Strength {
                nickel_left: left,
                nickel_right: right,
            } => {
                if nickel_left {
                    left
                } else {
                    right
                }
            }
        }
    }
}

/// Zone drop point: x landmark plus depth past the line of scrimmage
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub x: LandmarkX,
    pub depth: f32,
}

const fn fixed(x: f32, depth: f32) -> Landmark {
    Landmark {
        x: LandmarkX::Fixed(x),
        depth,
    }
}

const fn strength(nickel_left: f32, nickel_right: f32, depth: f32) -> Landmark {
    Landmark {
        x: LandmarkX::Strength {
            nickel_left,
            nickel_right,
        },
        depth,
    }
}

/// Man-coverage pursuit tuning
#[derive(Debug, Clone, Copy)]
pub struct ManTuning {
    /// Weight kept from last frame's leverage
    pub leverage_memory: f32,
    /// Default outside shade for corners and linebackers
    pub outside_leverage: f32,
    /// Inside shade for the nickel
    pub nickel_inside_leverage: f32,
    /// Lateral motion below this counts as "no break"
    pub break_threshold: f32,
    /// Step multiplier applied to pursuit speed
    pub step_scale: f32,
    pub nickel_step_scale: f32,
    /// How far toward the target the lagged aim point sits
    pub pursuit_mix: f32,
    pub nickel_pursuit_mix: f32,
    /// Defender may not aim deeper than receiver + this
    pub lead_limit: f32,
    /// Robber safety weight on its landmark versus the nearest threat
    pub robber_home_weight: f32,
}

impl Default for ManTuning {
    fn default() -> Self {
        Self {
            leverage_memory: 0.6,
            outside_leverage: 0.02,
            nickel_inside_leverage: 0.025,
            break_threshold: 0.0025,
            step_scale: 0.82,
            nickel_step_scale: 0.78,
            pursuit_mix: 0.65,
            nickel_pursuit_mix: 0.55,
            lead_limit: 0.01,
            robber_home_weight: 0.7,
        }
    }
}

/// Zone reaction tuning
#[derive(Debug, Clone, Copy)]
pub struct ZoneTuning {
    /// Weight on the landmark versus the nearest threat
    pub corner_home_weight: f32,
    pub home_weight: f32,
}

impl Default for ZoneTuning {
    fn default() -> Self {
        Self {
            corner_home_weight: 0.95,
            home_weight: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Scheme {
    Man(ManTuning),
    Zone(ZoneTuning),
}

/// Weight of the pre-snap depth when blending a landmark's depth
const INITIAL_DEPTH_WEIGHT: f32 = 0.6;

/// Everything a coverage needs to drive the defense
#[derive(Debug, Clone)]
pub struct CoverageTable {
    pub coverage: Coverage,
    pub scheme: Scheme,
    pub landmarks: [(PlayerId, Landmark); 7],
    /// Depth used for defenders missing from the table
    pub default_depth: f32,
    /// Keeps S2 this far to the weak side of the hook defenders
    pub weak_hook_clearance: Option<f32>,
}

impl CoverageTable {
    pub fn for_coverage(coverage: Coverage) -> Self {
        use PlayerId::*;

        match coverage {
            Coverage::Cover1 => Self {
                coverage,
                scheme: Scheme::Man(ManTuning::default()),
                landmarks: [
                    (Cb1, fixed(0.18, 0.20)),
                    (Cb2, fixed(0.82, 0.20)),
                    (N, strength(0.40, 0.60, 0.22)),
                    (Lb1, fixed(0.46, 0.24)),
                    (Lb2, fixed(0.54, 0.24)),
                    (S1, fixed(0.50, 0.52)),
                    (S2, fixed(0.60, 0.26)),
                ],
                default_depth: 0.28,
                weak_hook_clearance: None,
            },
            Coverage::Cover2 => Self {
                coverage,
                scheme: Scheme::Zone(ZoneTuning::default()),
                landmarks: [
                    (Cb1, fixed(0.15, 0.24)),
                    (Cb2, fixed(0.85, 0.24)),
                    (N, strength(0.35, 0.65, 0.26)),
                    (Lb1, fixed(0.46, 0.30)),
                    (Lb2, fixed(0.54, 0.30)),
                    (S1, fixed(0.32, 0.52)),
                    (S2, fixed(0.68, 0.52)),
                ],
                default_depth: 0.28,
                weak_hook_clearance: None,
            },
            Coverage::Cover3 => Self {
                coverage,
                scheme: Scheme::Zone(ZoneTuning::default()),
                landmarks: [
                    (Cb1, fixed(0.16, 0.52)),
                    (Cb2, fixed(0.84, 0.52)),
                    (S1, fixed(0.50, 0.56)),
                    (N, strength(0.32, 0.68, 0.28)),
                    (S2, strength(0.70, 0.30, 0.28)),
                    (Lb1, fixed(0.44, 0.32)),
                    (Lb2, fixed(0.56, 0.32)),
                ],
                default_depth: 0.30,
                weak_hook_clearance: Some(0.10),
            },
            Coverage::Quarters => Self {
                coverage,
                scheme: Scheme::Zone(ZoneTuning::default()),
                landmarks: [
                    (Cb1, fixed(0.18, 0.52)),
                    (Cb2, fixed(0.82, 0.52)),
                    (S1, fixed(0.38, 0.56)),
                    (S2, fixed(0.62, 0.56)),
                    (N, strength(0.32, 0.68, 0.26)),
                    (Lb1, fixed(0.46, 0.32)),
                    (Lb2, fixed(0.54, 0.32)),
                ],
                default_depth: 0.32,
                weak_hook_clearance: None,
            },
        }
    }

    pub fn landmark(&self, id: PlayerId) -> Option<&Landmark> {
        self.landmarks
            .iter()
            .find(|(role, _)| *role == id)
            .map(|(_, landmark)| landmark)
    }

    fn landmark_x(&self, id: PlayerId, nickel_left: bool) -> Option<f32> {
        self.landmark(id).map(|l| l.x.resolve(nickel_left))
    }

    /// Zone home for a defender. Depth leans toward the defender's pre-snap
    /// depth when `initial` is known.
    pub fn zone_home(&self, id: PlayerId, nickel_left: bool, initial: Option<&Player>) -> Pt {
        let landmark = self.landmark(id);
        let base_y = LOS_Y + landmark.map_or(self.default_depth, |l| l.depth);
        let y = match initial {
            Some(p) => p.y * INITIAL_DEPTH_WEIGHT + base_y * (1.0 - INITIAL_DEPTH_WEIGHT),
            None => base_y,
        };

        let Some(mut x) = self.landmark_x(id, nickel_left) else {
            return Pt::new(0.5, y);
        };

        if let (PlayerId::S2, Some(clearance)) = (id, self.weak_hook_clearance) {
            if nickel_left {
                let lb2 = self.landmark_x(PlayerId::Lb2, nickel_left).unwrap_or(0.56);
                x = clamp01(x.max(lb2 + clearance));
            } else {
                let lb1 = self.landmark_x(PlayerId::Lb1, nickel_left).unwrap_or(0.44);
                x = clamp01(x.min(lb1 - clearance));
            }
        }

        Pt::new(x, y)
    }
}

/// Pursuit speed (normalized units per second) by defensive role
pub fn pursuit_speed(id: PlayerId) -> f32 {
    match id {
        PlayerId::Cb1 | PlayerId::Cb2 | PlayerId::N => 0.26,
        PlayerId::S1 | PlayerId::S2 => 0.22,
        PlayerId::Lb1 | PlayerId::Lb2 => 0.20,
        _ => 0.20,
    }
}
