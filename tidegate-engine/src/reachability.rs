//! Depth model: how deep a player can comfortably operate given unlocked items.
use std::collections::BTreeSet;

use crate::constants::{
    BASE_BREATH_TIME, BASE_SWIM_SPEED, OXYGEN_TIER_ONE_DEPTH, OXYGEN_TIER_ONE_MULTIPLIER,
    OXYGEN_TIER_TWO_DEPTH, OXYGEN_TIER_TWO_MULTIPLIER, TRAVERSAL_AID_SPEED,
};
use crate::entity::EntityId;
use crate::numbers::floor_f64_to_i32;
use crate::progression::{LocomotionProfile, ProgressionGraph, VehicleTier};

/// Pure depth evaluator built from a progression graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityModel {
    locomotion: LocomotionProfile,
    vehicle_tiers: Vec<VehicleTier>,
    solo_cap: i32,
}

impl ReachabilityModel {
    #[must_use]
    pub fn new(graph: &ProgressionGraph, max_depth_without_vehicle: i32) -> Self {
        Self {
            locomotion: graph.locomotion.clone(),
            vehicle_tiers: graph.vehicle_tiers.clone(),
            solo_cap: max_depth_without_vehicle.max(0),
        }
    }

    /// Total reachable depth in metres for the given unlocked set.
    #[must_use]
    pub fn compute_depth(&self, unlocked: &BTreeSet<EntityId>, search_time: i32) -> i32 {
        let raw = self.raw_solo_depth(unlocked, search_time);
        let full_oxygen = self
            .locomotion
            .full_oxygen
            .as_ref()
            .is_some_and(|id| unlocked.contains(id));
        let solo = if full_oxygen {
            raw
        } else {
            apply_oxygen_penalty(raw)
        };
        let solo = floor_f64_to_i32(solo).clamp(0, self.solo_cap);
        self.vehicle_depth(unlocked).saturating_add(solo)
    }

    /// Deepest vehicle tier whose full capability set is unlocked.
    #[must_use]
    pub fn vehicle_depth(&self, unlocked: &BTreeSet<EntityId>) -> i32 {
        self.vehicle_tiers
            .iter()
            .filter(|tier| tier.requires.iter().all(|id| unlocked.contains(id)))
            .map(|tier| tier.depth)
            .max()
            .unwrap_or(0)
    }

    /// Depth reachable on one breath, before oxygen consumption penalties.
    #[must_use]
    pub fn raw_solo_depth(&self, unlocked: &BTreeSet<EntityId>, search_time: i32) -> f64 {
        let aided = self
            .locomotion
            .traversal_aid
            .as_ref()
            .is_some_and(|id| unlocked.contains(id));
        let fin_bonus = self
            .locomotion
            .fins
            .iter()
            .filter(|fin| unlocked.contains(&fin.id))
            .map(|fin| fin.speed_bonus)
            .fold(0.0_f64, f64::max);
        let search = f64::from(search_time);
        let dive = |breath: f64, penalty: f64| {
            let speed = if aided {
                TRAVERSAL_AID_SPEED
            } else {
                BASE_SWIM_SPEED + fin_bonus - penalty
            };
            ((breath - search) / 2.0 * speed).max(0.0)
        };

        self.locomotion
            .tanks
            .iter()
            .filter(|tank| unlocked.contains(&tank.id))
            .map(|tank| dive(tank.breath_time, tank.speed_penalty))
            .fold(dive(BASE_BREATH_TIME, 0.0), f64::max)
    }
}

/// Map a raw one-breath depth through the 3x/5x consumption bands.
fn apply_oxygen_penalty(raw: f64) -> f64 {
    let tier_one_span = OXYGEN_TIER_TWO_DEPTH - OXYGEN_TIER_ONE_DEPTH;
    let tier_two_start = OXYGEN_TIER_ONE_DEPTH + tier_one_span * OXYGEN_TIER_ONE_MULTIPLIER;
    if raw <= OXYGEN_TIER_ONE_DEPTH {
        raw
    } else if raw <= tier_two_start {
        OXYGEN_TIER_ONE_DEPTH + (raw - OXYGEN_TIER_ONE_DEPTH) / OXYGEN_TIER_ONE_MULTIPLIER
    } else {
        OXYGEN_TIER_TWO_DEPTH + (raw - tier_two_start) / OXYGEN_TIER_TWO_MULTIPLIER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(names: &[&str]) -> BTreeSet<EntityId> {
        names.iter().map(|name| EntityId::new(name)).collect()
    }

    fn model() -> ReachabilityModel {
        ReachabilityModel::new(&ProgressionGraph::vanilla(), 100)
    }

    #[test]
    fn bare_diver_reaches_seventy_metres() {
        // (45 - 15) / 2 * 4.7 = 70.5
        assert_eq!(model().compute_depth(&unlocked(&[]), 15), 70);
    }

    #[test]
    fn search_time_reduces_depth() {
        let m = model();
        assert!(m.compute_depth(&unlocked(&[]), 30) < m.compute_depth(&unlocked(&[]), 15));
    }

    #[test]
    fn oxygen_penalty_bands() {
        assert!((apply_oxygen_penalty(80.0) - 80.0).abs() < 1e-9);
        assert!((apply_oxygen_penalty(160.0) - 120.0).abs() < 1e-9);
        assert!((apply_oxygen_penalty(400.0) - 200.0).abs() < 1e-9);
        assert!((apply_oxygen_penalty(450.0) - 210.0).abs() < 1e-9);
    }

    #[test]
    fn tank_penalty_only_applies_unaided() {
        let m = model();
        let swim = m.raw_solo_depth(&unlocked(&["tank"]), 15);
        // (75 - 15) / 2 * (4.7 - 0.4725)
        assert!((swim - 126.825).abs() < 1e-9);
        let glide = m.raw_solo_depth(&unlocked(&["tank", "seaglide"]), 15);
        assert!((glide - 330.0).abs() < 1e-9);
    }

    #[test]
    fn best_fin_tier_wins() {
        let m = model();
        let fins = m.raw_solo_depth(&unlocked(&["fins"]), 15);
        let both = m.raw_solo_depth(&unlocked(&["fins", "ultraglidefins"]), 15);
        assert!(both > fins);
    }

    #[test]
    fn solo_depth_is_capped() {
        let m = model();
        assert_eq!(m.compute_depth(&unlocked(&["seaglide", "rebreather"]), 15), 100);
        assert_eq!(m.compute_depth(&unlocked(&["seaglide"]), 15), 100);
    }

    #[test]
    fn vehicle_tiers_require_full_capability_set() {
        let m = model();
        assert_eq!(m.vehicle_depth(&unlocked(&["vehiclehullmodule1"])), 0);
        assert_eq!(m.vehicle_depth(&unlocked(&["seamoth"])), 200);
        assert_eq!(
            m.vehicle_depth(&unlocked(&["seamoth", "vehiclehullmodule1"])),
            300
        );
        assert_eq!(
            m.compute_depth(&unlocked(&["seamoth", "seaglide", "rebreather"]), 15),
            300
        );
    }

    #[test]
    fn depth_is_monotonic_in_unlocked_set() {
        let m = model();
        let order = [
            "fins",
            "tank",
            "seaglide",
            "rebreather",
            "doubletank",
            "seamoth",
            "vehiclehullmodule1",
            "highcapacitytank",
            "vehiclehullmodule2",
            "exosuit",
        ];
        let mut set = BTreeSet::new();
        let mut last = m.compute_depth(&set, 15);
        for name in order {
            set.insert(EntityId::new(name));
            let depth = m.compute_depth(&set, 15);
            assert!(depth >= last, "depth fell after unlocking {name}");
            last = depth;
        }
        assert_eq!(last, 1000);
    }
}
