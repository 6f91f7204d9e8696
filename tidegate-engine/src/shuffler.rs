//! Location shuffling: permute which entity each world coordinate unlocks.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::TOOL_MAJORITY_THRESHOLD;
use crate::entity::EntityId;
use crate::numbers::{round_f64_to_i32, usize_to_f64};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Depth below the surface in metres.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.y.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[default]
    Databox,
    Wreck,
    Precursor,
    Other,
}

/// A world object that unlocks a blueprint when found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationItem {
    pub unlocks: EntityId,
    pub position: Position,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub needs_laser_cutter: bool,
    #[serde(default)]
    pub needs_propulsion_cannon: bool,
}

/// A coordinate (with its access requirements) and the identity it now carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAssignment {
    pub unlocks: EntityId,
    pub position: Position,
    pub kind: LocationKind,
    pub needs_laser_cutter: bool,
    pub needs_propulsion_cannon: bool,
}

impl LocationAssignment {
    fn carrying(coordinate: &LocationItem, unlocks: EntityId) -> Self {
        Self {
            unlocks,
            position: coordinate.position,
            kind: coordinate.kind,
            needs_laser_cutter: coordinate.needs_laser_cutter,
            needs_propulsion_cannon: coordinate.needs_propulsion_cannon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShuffleOutcome {
    pub assignments: Vec<LocationAssignment>,
}

/// Effective unlock requirements of a databox-gated blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedUnlock {
    pub depth: i32,
    pub needs_laser_cutter: bool,
    pub needs_propulsion_cannon: bool,
}

pub struct LocationShuffler;

impl LocationShuffler {
    /// Draw a coordinate without replacement for every identity, in input order.
    pub fn shuffle<R: Rng + ?Sized>(items: &[LocationItem], rng: &mut R) -> ShuffleOutcome {
        let mut remaining: Vec<&LocationItem> = items.iter().collect();
        let mut assignments = Vec::with_capacity(items.len());
        for item in items {
            let index = rng.gen_range(0..remaining.len());
            let coordinate = remaining.swap_remove(index);
            assignments.push(LocationAssignment::carrying(coordinate, item.unlocks.clone()));
        }
        ShuffleOutcome { assignments }
    }

    /// Every coordinate keeps its original identity.
    #[must_use]
    pub fn identity(items: &[LocationItem]) -> ShuffleOutcome {
        ShuffleOutcome {
            assignments: items
                .iter()
                .map(|item| LocationAssignment::carrying(item, item.unlocks.clone()))
                .collect(),
        }
    }

    /// Collapse assignments into per-entity unlock depth and tool requirements.
    ///
    /// Linked identities inherit the derivation of their base tier.
    #[must_use]
    pub fn derive(
        assignments: &[LocationAssignment],
        linked: &BTreeMap<EntityId, EntityId>,
    ) -> BTreeMap<EntityId, DerivedUnlock> {
        let mut grouped: BTreeMap<&EntityId, Vec<&LocationAssignment>> = BTreeMap::new();
        for assignment in assignments {
            grouped
                .entry(&assignment.unlocks)
                .or_default()
                .push(assignment);
        }

        let mut derived: BTreeMap<EntityId, DerivedUnlock> = grouped
            .into_iter()
            .map(|(id, spots)| {
                let count = usize_to_f64(spots.len());
                let mean_depth =
                    spots.iter().map(|spot| spot.position.depth()).sum::<f64>() / count;
                let majority = |flag: fn(&LocationAssignment) -> bool| {
                    let hits = spots.iter().filter(|spot| flag(spot)).count();
                    usize_to_f64(hits) / count >= TOOL_MAJORITY_THRESHOLD
                };
                let unlock = DerivedUnlock {
                    depth: round_f64_to_i32(mean_depth),
                    needs_laser_cutter: majority(|spot| spot.needs_laser_cutter),
                    needs_propulsion_cannon: majority(|spot| spot.needs_propulsion_cannon),
                };
                (id.clone(), unlock)
            })
            .collect();

        for (variant, base) in linked {
            if let Some(unlock) = derived.get(base).copied() {
                derived.insert(variant.clone(), unlock);
            }
        }
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SessionRng;

    fn item(unlocks: &str, y: f64) -> LocationItem {
        LocationItem {
            unlocks: EntityId::new(unlocks),
            position: Position::new(10.0, y, -5.0),
            kind: LocationKind::Databox,
            needs_laser_cutter: false,
            needs_propulsion_cannon: false,
        }
    }

    #[test]
    fn shuffle_is_a_bijection() {
        let items: Vec<LocationItem> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, name)| item(name, -10.0 * f64::from(u32::try_from(i).unwrap() + 1)))
            .collect();
        let mut rng = SessionRng::from_user_seed(99);
        let outcome = LocationShuffler::shuffle(&items, &mut rng);

        let mut ids: Vec<&str> = outcome
            .assignments
            .iter()
            .map(|a| a.unlocks.as_str())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);

        let mut ys: Vec<i32> = outcome
            .assignments
            .iter()
            .map(|a| round_f64_to_i32(a.position.y))
            .collect();
        ys.sort_unstable();
        assert_eq!(ys, vec![-50, -40, -30, -20, -10]);
        assert_eq!(rng.draws(), 5);
    }

    #[test]
    fn tool_flags_travel_with_coordinates() {
        let mut items = vec![item("a", -10.0), item("b", -300.0)];
        items[1].needs_laser_cutter = true;
        let mut rng = SessionRng::from_user_seed(3);
        let outcome = LocationShuffler::shuffle(&items, &mut rng);
        for assignment in &outcome.assignments {
            let deep = assignment.position.depth() > 100.0;
            assert_eq!(assignment.needs_laser_cutter, deep);
        }
    }

    #[test]
    fn derived_depth_is_rounded_mean() {
        let items = vec![item("a", -100.0), item("a", -150.0), item("a", -200.0)];
        let derived =
            LocationShuffler::derive(&LocationShuffler::identity(&items).assignments, &BTreeMap::new());
        let unlock = derived[&EntityId::new("a")];
        assert_eq!(unlock.depth, 150);
        assert!(!unlock.needs_laser_cutter);
    }

    #[test]
    fn majority_flags_and_linked_inheritance() {
        let mut items = vec![item("base", -50.0), item("base", -70.0)];
        items[0].needs_propulsion_cannon = true;
        let linked = BTreeMap::from([(EntityId::new("variant"), EntityId::new("base"))]);
        let derived = LocationShuffler::derive(&LocationShuffler::identity(&items).assignments, &linked);
        let base = derived[&EntityId::new("base")];
        assert!(base.needs_propulsion_cannon);
        assert_eq!(base.depth, 60);
        assert_eq!(derived[&EntityId::new("variant")], base);
    }
}
