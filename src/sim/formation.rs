//! Offensive formations and default route calls

use serde::{Deserialize, Serialize};

use super::routes::RouteType;
use super::{Player, PlayerId, RouteAssignment};

/// Offensive formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    #[serde(rename = "TRIPS_RIGHT")]
    TripsRight,
    #[serde(rename = "DOUBLES_2x2")]
    Doubles2x2,
    #[serde(rename = "BUNCH_LEFT")]
    BunchLeft,
}

impl Default for Formation {
    fn default() -> Self {
        Self::TripsRight
    }
}

impl std::str::FromStr for Formation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRIPS_RIGHT" => Ok(Self::TripsRight),
            "DOUBLES_2x2" => Ok(Self::Doubles2x2),
            "BUNCH_LEFT" => Ok(Self::BunchLeft),
            other => Err(format!("unknown formation: {other}")),
        }
    }
}

/// Fixed alignment for a formation; the line of scrimmage is at y = 0.2
pub fn offense_for_formation(formation: Formation) -> Vec<Player> {
    use PlayerId::*;

    let qb = Player::new(Qb, 0.5, 0.12);
    let rb = Player::new(Rb, 0.44, 0.12);

    match formation {
        Formation::TripsRight => vec![
            qb,
            Player::new(Wr1, 0.14, 0.2),
            Player::new(Wr2, 0.68, 0.2),
            Player::new(Wr3, 0.88, 0.2),
            Player::new(Te, 0.60, 0.2),
            rb,
        ],
        Formation::Doubles2x2 => vec![
            qb,
            Player::new(Wr1, 0.14, 0.2),
            Player::new(Wr2, 0.32, 0.2),
            Player::new(Wr3, 0.86, 0.2),
            Player::new(Te, 0.68, 0.2),
            rb,
        ],
        Formation::BunchLeft => vec![
            qb,
            Player::new(Wr1, 0.18, 0.18),
            Player::new(Wr2, 0.22, 0.2),
            Player::new(Te, 0.26, 0.18),
            Player::new(Wr3, 0.86, 0.2),
            rb,
        ],
    }
}

/// Route calls used until the user edits them
pub fn default_routes() -> Vec<RouteAssignment> {
    [
        (PlayerId::Wr1, RouteType::Go),
        (PlayerId::Wr2, RouteType::Out),
        (PlayerId::Wr3, RouteType::Post),
        (PlayerId::Te, RouteType::Hitch),
        (PlayerId::Rb, RouteType::Flat),
    ]
    .into_iter()
    .map(|(receiver_id, route)| RouteAssignment { receiver_id, route })
    .collect()
}

/// Receivers that can be targeted or given a route
pub fn eligible_receivers(offense: &[Player]) -> Vec<PlayerId> {
    offense
        .iter()
        .map(|p| p.id)
        .filter(|id| id.is_eligible())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_formation_has_one_quarterback_and_five_eligibles() {
        for formation in [Formation::TripsRight, Formation::Doubles2x2, Formation::BunchLeft] {
            let offense = offense_for_formation(formation);
            assert_eq!(offense.iter().filter(|p| p.id == PlayerId::Qb).count(), 1);
            assert_eq!(eligible_receivers(&offense).len(), 5);
            assert!(offense.iter().all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
        }
    }

    #[test]
    fn formation_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Formation::Doubles2x2).unwrap();
        assert_eq!(json, r#""DOUBLES_2x2""#);
        assert_eq!("BUNCH_LEFT".parse::<Formation>().unwrap(), Formation::BunchLeft);
        assert!("I_FORM".parse::<Formation>().is_err());
    }

    #[test]
    fn default_routes_skip_the_quarterback() {
        let routes = default_routes();
        assert_eq!(routes.len(), 5);
        assert!(routes.iter().all(|r| r.receiver_id != PlayerId::Qb));
    }
}
