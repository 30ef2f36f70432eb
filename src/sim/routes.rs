//! Route templates and absolute route resolution

use serde::{Deserialize, Serialize};

use super::geometry::Pt;
use super::Player;

/// Route tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteType {
    Hitch,
    Slant,
    Out,
    Corner,
    Post,
    Go,
    Dig,
    Curl,
    Flat,
    Stick,
}

impl RouteType {
    pub const ALL: [RouteType; 10] = [
        Self::Hitch,
        Self::Slant,
        Self::Out,
        Self::Corner,
        Self::Post,
        Self::Go,
        Self::Dig,
        Self::Curl,
        Self::Flat,
        Self::Stick,
    ];
}

/// Relative waypoints for a route run by a receiver aligned at `receiver_x`.
///
/// Breaks are mirrored by field side: "inside" always points toward the
/// middle of the field.
pub fn route_template(route: RouteType, receiver_x: f32) -> Vec<Pt> {
    let inside = if receiver_x < 0.5 { 1.0 } else { -1.0 };
    let outside = -inside;
    let start = Pt::new(0.0, 0.0);

    match route {
        RouteType::Hitch => vec![start, Pt::new(0.0, 0.12)],
        RouteType::Slant => vec![start, Pt::new(0.10 * inside, 0.16)],
        RouteType::Out => vec![start, Pt::new(0.0, 0.12), Pt::new(0.14 * outside, 0.14)],
        RouteType::Corner => vec![start, Pt::new(0.0, 0.16), Pt::new(0.16 * outside, 0.28)],
        RouteType::Post => vec![start, Pt::new(0.0, 0.16), Pt::new(0.14 * inside, 0.30)],
        RouteType::Go => vec![start, Pt::new(0.0, 0.46)],
        RouteType::Dig => vec![start, Pt::new(0.0, 0.20), Pt::new(0.18 * inside, 0.21)],
        RouteType::Curl => vec![start, Pt::new(0.0, 0.22)],
        RouteType::Flat => vec![start, Pt::new(0.18 * outside, 0.02)],
        RouteType::Stick => vec![start, Pt::new(0.0, 0.10)],
    }
}

/// Route template translated to the receiver's alignment, clamped to the field
pub fn absolute_route_points(receiver: &Player, route: RouteType) -> Vec<Pt> {
    route_template(route, receiver.x)
        .into_iter()
        .map(|pt| receiver.pos().offset(pt.x, pt.y).clamped())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::PlayerId;

    #[test]
    fn go_is_straight_vertical() {
        let tpl = route_template(RouteType::Go, 0.14);
        assert!(tpl.iter().all(|p| p.x == 0.0));
        assert!(tpl.last().unwrap().y > 0.0);
    }

    #[test]
    fn slant_breaks_inside_from_either_side() {
        let left = route_template(RouteType::Slant, 0.14);
        assert!(left.last().unwrap().x > 0.0);

        let right = route_template(RouteType::Slant, 0.88);
        assert!(right.last().unwrap().x < 0.0);
    }

    #[test]
    fn out_and_flat_break_toward_sideline() {
        assert!(route_template(RouteType::Out, 0.14).last().unwrap().x < 0.0);
        assert!(route_template(RouteType::Flat, 0.68).last().unwrap().x > 0.0);
    }

    #[test]
    fn every_route_starts_at_alignment() {
        for route in RouteType::ALL {
            let tpl = route_template(route, 0.3);
            assert!(tpl.len() >= 2, "{route:?} too short");
            assert_eq!(tpl[0], Pt::new(0.0, 0.0));
        }
    }

    #[test]
    fn absolute_points_are_clamped() {
        let wide = Player::new(PlayerId::Wr3, 0.95, 0.2);
        let pts = absolute_route_points(&wide, RouteType::Corner);
        assert_eq!(pts[0], Pt::new(0.95, 0.2));
        assert!(pts.iter().all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
        assert_eq!(pts.last().unwrap().x, 1.0);
    }
}
