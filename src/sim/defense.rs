//! Defensive alignment generation

use rand::Rng;

use super::coverage::Coverage;
use super::geometry::clamp01;
use super::{find, find_mut, Player, PlayerId, LOS_Y};

/// Spacing kept between the two linebackers when they cross
const LB_SEPARATION: f32 = 0.025;

/// Side of the field with more eligible receivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Left,
    Right,
}

impl Strength {
    pub fn contains(self, x: f32) -> bool {
        match self {
            Self::Left => x < 0.5,
            Self::Right => x >= 0.5,
        }
    }
}

/// Strong side by receiver count; ties go right
pub fn strong_side(offense: &[Player]) -> Strength {
    let (left, right) = offense
        .iter()
        .filter(|p| p.id.is_eligible())
        .fold((0, 0), |(l, r), p| if p.x < 0.5 { (l + 1, r) } else { (l, r + 1) });

    if right >= left {
        Strength::Right
    } else {
        Strength::Left
    }
}

/// The receiver the nickel keys on: WR2, else the strong-side eligible
/// player nearest the ball, else TE, else WR1
pub fn find_slot_like(offense: &[Player]) -> Option<&Player> {
    if let Some(wr2) = find(offense, PlayerId::Wr2) {
        return Some(wr2);
    }

    let side = strong_side(offense);
    offense
        .iter()
        .filter(|p| p.id.is_eligible() && side.contains(p.x))
        .min_by(|a, b| (a.x - 0.5).abs().total_cmp(&(b.x - 0.5).abs()))
        .or_else(|| find(offense, PlayerId::Te))
        .or_else(|| find(offense, PlayerId::Wr1))
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, v: f32, amount: f32) -> f32 {
    clamp01(v + rng.gen_range(-amount..amount))
}

/// Build a seven-man defense for `coverage` against `offense`.
///
/// Alignment is keyed off the actual receiver splits and randomized by
/// `rng`; a seeded generator gives a repeatable look.
pub fn generate_defense<R: Rng + ?Sized>(
    coverage: Coverage,
    offense: &[Player],
    rng: &mut R,
) -> Vec<Player> {
    let x_receiver = find(offense, PlayerId::Wr1);
    let z_receiver = find(offense, PlayerId::Wr3);
    let slot = find_slot_like(offense);
    let te = find(offense, PlayerId::Te);
    let rb = find(offense, PlayerId::Rb);
    let strong = strong_side(offense);

    let cb1_x = x_receiver.map_or(0.16, |p| p.x);
    let cb2_x = z_receiver.map_or(0.84, |p| p.x);
    let nickel_x = slot.map_or(0.62, |p| p.x * 0.85 + 0.5 * 0.15);
    let lb_te_x = te.map_or(0.52, |p| p.x);
    let lb_rb_x = rb.map_or(0.48, |p| p.x * 0.7 + 0.5 * 0.3);

    let corner_y = LOS_Y + rng.gen_range(0.04..0.15);
    let lb_y = LOS_Y + rng.gen_range(0.11..0.16);
    let safety_y = LOS_Y + rng.gen_range(0.34..0.42);

    let mut defense = vec![
        Player::new(PlayerId::Cb1, jitter(rng, cb1_x, 0.02), jitter(rng, corner_y, 0.01)),
        Player::new(PlayerId::Cb2, jitter(rng, cb2_x, 0.02), jitter(rng, corner_y, 0.01)),
        Player::new(PlayerId::N, jitter(rng, nickel_x, 0.02), jitter(rng, corner_y + 0.02, 0.01)),
        Player::new(PlayerId::Lb1, jitter(rng, lb_te_x, 0.03), jitter(rng, lb_y, 0.02)),
        Player::new(PlayerId::Lb2, jitter(rng, lb_rb_x, 0.03), jitter(rng, lb_y, 0.02)),
        Player::new(PlayerId::S1, 0.40, safety_y),
        Player::new(PlayerId::S2, 0.60, safety_y),
    ];

    let (s1, s2) = match coverage {
        Coverage::Cover1 => ((0.50, LOS_Y + 0.42), (jitter(rng, 0.55, 0.05), LOS_Y + 0.18)),
        Coverage::Cover2 => ((0.35, LOS_Y + 0.40), (0.65, LOS_Y + 0.40)),
        Coverage::Cover3 => {
            let weak_x = match strong {
                Strength::Right => jitter(rng, 0.30, 0.04),
                Strength::Left => jitter(rng, 0.70, 0.04),
            };
            ((0.50, LOS_Y + 0.42), (weak_x, LOS_Y + 0.20))
        }
        Coverage::Quarters => ((0.32, LOS_Y + 0.38), (0.68, LOS_Y + 0.38)),
    };
    if let Some(p) = find_mut(&mut defense, PlayerId::S1) {
        (p.x, p.y) = s1;
    }
    if let Some(p) = find_mut(&mut defense, PlayerId::S2) {
        (p.x, p.y) = s2;
    }

    separate_linebackers(&mut defense);

    for p in &mut defense {
        p.x = jitter(rng, p.x, 0.01);
        p.y = jitter(rng, p.y, 0.01);
    }
    // the final jitter can re-cross a tight pair
    separate_linebackers(&mut defense);
    defense
}

/// Keep LB2 to the right of LB1
fn separate_linebackers(defense: &mut [Player]) {
    let (Some(lb1_x), Some(lb2_x)) = (
        find(defense, PlayerId::Lb1).map(|p| p.x),
        find(defense, PlayerId::Lb2).map(|p| p.x),
    ) else {
        return;
    };
    if lb2_x > lb1_x {
        return;
    }

    let mid = (lb1_x + lb2_x) / 2.0;
    if let Some(lb1) = find_mut(defense, PlayerId::Lb1) {
        lb1.x = (mid - LB_SEPARATION).max(0.0);
    }
    if let Some(lb2) = find_mut(defense, PlayerId::Lb2) {
        lb2.x = (mid + LB_SEPARATION).min(1.0);
    }
}

/// Pre-snap shade: corners and nickel lean 30% toward their receivers' splits
pub fn align_defense(defense: &[Player], offense: &[Player]) -> Vec<Player> {
    let mut next = defense.to_vec();
    for (receiver, defender) in [
        (PlayerId::Wr1, PlayerId::Cb1),
        (PlayerId::Wr2, PlayerId::N),
        (PlayerId::Wr3, PlayerId::Cb2),
    ] {
        if let (Some(wr), Some(d)) = (find(offense, receiver), find_mut(&mut next, defender)) {
            d.x = d.x * 0.7 + wr.x * 0.3;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::formation::{offense_for_formation, Formation};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    const FORMATIONS: [Formation; 3] = [
        Formation::TripsRight,
        Formation::Doubles2x2,
        Formation::BunchLeft,
    ];

    #[test]
    fn seeded_generation_is_deterministic() {
        let offense = offense_for_formation(Formation::TripsRight);
        let a = generate_defense(Coverage::Cover3, &offense, &mut ChaCha8Rng::seed_from_u64(7));
        let b = generate_defense(Coverage::Cover3, &offense, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn always_seven_unique_defenders_in_bounds() {
        for seed in 0..50u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for formation in FORMATIONS {
                let offense = offense_for_formation(formation);
                for coverage in Coverage::ALL {
                    let defense = generate_defense(coverage, &offense, &mut rng);
                    assert_eq!(defense.len(), 7);
                    let ids: HashSet<_> = defense.iter().map(|p| p.id).collect();
                    assert_eq!(ids.len(), 7);
                    assert!(defense.iter().all(|p| p.id.team() == crate::sim::Team::D));
                    assert!(defense
                        .iter()
                        .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
                }
            }
        }
    }

    #[test]
    fn separation_uncrosses_linebackers() {
        let mut defense = vec![
            Player::new(PlayerId::Lb1, 0.60, 0.33),
            Player::new(PlayerId::Lb2, 0.44, 0.33),
        ];
        separate_linebackers(&mut defense);
        let lb1 = find(&defense, PlayerId::Lb1).unwrap().x;
        let lb2 = find(&defense, PlayerId::Lb2).unwrap().x;
        assert!(lb2 > lb1);
        assert!((lb2 - lb1 - 2.0 * LB_SEPARATION).abs() < 1e-5);
    }

    #[test]
    fn linebackers_never_cross() {
        // trips and doubles put the TE right of the RB, so LB1 starts on the wrong side
        for formation in FORMATIONS {
            let offense = offense_for_formation(formation);
            for seed in 0..20u64 {
                let defense = generate_defense(
                    Coverage::Cover2,
                    &offense,
                    &mut ChaCha8Rng::seed_from_u64(seed),
                );
                let lb1 = find(&defense, PlayerId::Lb1).unwrap().x;
                let lb2 = find(&defense, PlayerId::Lb2).unwrap().x;
                assert!(lb2 > lb1, "{formation:?} seed {seed}: lb1 {lb1} lb2 {lb2}");
            }
        }
    }

    #[test]
    fn strong_side_counts_eligibles() {
        assert_eq!(strong_side(&offense_for_formation(Formation::TripsRight)), Strength::Right);
        assert_eq!(strong_side(&offense_for_formation(Formation::BunchLeft)), Strength::Left);
        assert_eq!(strong_side(&offense_for_formation(Formation::Doubles2x2)), Strength::Left);
    }

    #[test]
    fn slot_falls_back_to_strong_side_receiver() {
        let offense: Vec<Player> = offense_for_formation(Formation::TripsRight)
            .into_iter()
            .filter(|p| p.id != PlayerId::Wr2)
            .collect();
        let slot = find_slot_like(&offense).unwrap();
        assert_eq!(slot.id, PlayerId::Te);
    }

    #[test]
    fn cover_three_rotates_safety_away_from_strength() {
        let offense = offense_for_formation(Formation::TripsRight);
        let defense = generate_defense(Coverage::Cover3, &offense, &mut ChaCha8Rng::seed_from_u64(3));
        let s2 = find(&defense, PlayerId::S2).unwrap();
        assert!(s2.x < 0.5);
    }

    #[test]
    fn align_defense_shades_toward_splits() {
        let offense = offense_for_formation(Formation::TripsRight);
        let defense = vec![Player::new(PlayerId::Cb2, 0.70, 0.3)];
        let aligned = align_defense(&defense, &offense);
        let expected = 0.70 * 0.7 + 0.88 * 0.3;
        assert!((aligned[0].x - expected).abs() < 1e-5);
    }
}
