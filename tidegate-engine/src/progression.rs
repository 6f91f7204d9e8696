//! Static progression graph: depth milestones, vehicle tiers, upgrade chains.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{
    DOUBLE_TANK_BREATH, DOUBLE_TANK_PENALTY, FIN_SPEED_BONUS, HIGH_CAPACITY_TANK_BREATH,
    HIGH_CAPACITY_TANK_PENALTY, PLASTEEL_TANK_BREATH, PLASTEEL_TANK_PENALTY, STANDARD_TANK_BREATH,
    STANDARD_TANK_PENALTY, ULTRA_FIN_SPEED_BONUS,
};
use crate::entity::EntityId;

/// Items that must (essential) or may (elective) resolve once a depth is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub depth: i32,
    #[serde(default)]
    pub essential: Vec<EntityId>,
    /// Exactly one member of each group is scheduled.
    #[serde(default)]
    pub elective: Vec<Vec<EntityId>>,
}

/// A set of vehicle capabilities and the depth it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleTier {
    pub requires: Vec<EntityId>,
    pub depth: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinTier {
    pub id: EntityId,
    pub speed_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankTier {
    pub id: EntityId,
    pub breath_time: f64,
    pub speed_penalty: f64,
}

/// Items feeding the solo (no vehicle) part of the depth formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocomotionProfile {
    #[serde(default)]
    pub traversal_aid: Option<EntityId>,
    #[serde(default)]
    pub fins: Vec<FinTier>,
    #[serde(default)]
    pub tanks: Vec<TankTier>,
    /// Removes depth-scaled oxygen consumption.
    #[serde(default)]
    pub full_oxygen: Option<EntityId>,
}

impl LocomotionProfile {
    fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.traversal_aid
            .iter()
            .chain(self.fins.iter().map(|fin| &fin.id))
            .chain(self.tanks.iter().map(|tank| &tank.id))
            .chain(self.full_oxygen.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgressionGraph {
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub vehicle_tiers: Vec<VehicleTier>,
    /// Upgrade id -> the tier it is built from.
    #[serde(default)]
    pub upgrade_chains: BTreeMap<EntityId, EntityId>,
    /// Tier variant -> base tier whose databox derivation it inherits.
    #[serde(default)]
    pub linked_unlocks: BTreeMap<EntityId, EntityId>,
    #[serde(default)]
    pub locomotion: LocomotionProfile,
    #[serde(default)]
    pub construction_tool: Option<EntityId>,
    #[serde(default)]
    pub laser_cutter: Option<EntityId>,
    #[serde(default)]
    pub propulsion_cannon: Option<EntityId>,
}

impl ProgressionGraph {
    /// Parse a graph from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a graph.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut graph: Self = serde_json::from_str(json)?;
        graph.normalize();
        Ok(graph)
    }

    /// Sort milestones by depth so the scheduler can walk them in order.
    pub fn normalize(&mut self) {
        self.milestones.sort_by_key(|milestone| milestone.depth);
    }

    /// Whether resolving this id can change the reachable depth.
    #[must_use]
    pub fn is_progression_item(&self, id: &EntityId) -> bool {
        self.locomotion.ids().any(|candidate| candidate == id)
            || self
                .vehicle_tiers
                .iter()
                .any(|tier| tier.requires.contains(id))
    }

    /// Every id the graph refers to, for input cross-checking.
    #[must_use]
    pub fn referenced_ids(&self) -> BTreeSet<&EntityId> {
        let mut ids: BTreeSet<&EntityId> = self.locomotion.ids().collect();
        for milestone in &self.milestones {
            ids.extend(milestone.essential.iter());
            ids.extend(milestone.elective.iter().flatten());
        }
        for tier in &self.vehicle_tiers {
            ids.extend(tier.requires.iter());
        }
        ids.extend(self.upgrade_chains.iter().flat_map(|(k, v)| [k, v]));
        ids.extend(self.linked_unlocks.iter().flat_map(|(k, v)| [k, v]));
        ids.extend(self.construction_tool.iter());
        ids.extend(self.laser_cutter.iter());
        ids.extend(self.propulsion_cannon.iter());
        ids
    }

    /// Milestones at or below `depth`, in ascending depth order.
    pub fn milestones_within(&self, depth: i32) -> impl Iterator<Item = &Milestone> {
        self.milestones
            .iter()
            .filter(move |milestone| milestone.depth <= depth)
    }

    /// The progression layout of the base game.
    #[must_use]
    pub fn vanilla() -> Self {
        fn ids(names: &[&str]) -> Vec<EntityId> {
            names.iter().map(|name| EntityId::new(name)).collect()
        }

        let mut graph = Self {
            milestones: vec![
                Milestone {
                    depth: 0,
                    essential: ids(&["scanner", "builder", "seaglide"]),
                    elective: vec![ids(&["fins", "tank"])],
                },
                Milestone {
                    depth: 100,
                    essential: ids(&["rebreather", "seamoth"]),
                    elective: vec![ids(&["doubletank", "plasteeltank"])],
                },
                Milestone {
                    depth: 200,
                    essential: ids(&["vehiclehullmodule1", "lasercutter"]),
                    elective: vec![ids(&["ultraglidefins", "highcapacitytank"])],
                },
                Milestone {
                    depth: 300,
                    essential: ids(&["vehiclehullmodule2", "propulsioncannon"]),
                    elective: Vec::new(),
                },
                Milestone {
                    depth: 500,
                    essential: Vec::new(),
                    elective: vec![ids(&["exosuit", "cyclops"])],
                },
            ],
            vehicle_tiers: vec![
                VehicleTier {
                    requires: ids(&["seamoth"]),
                    depth: 200,
                },
                VehicleTier {
                    requires: ids(&["seamoth", "vehiclehullmodule1"]),
                    depth: 300,
                },
                VehicleTier {
                    requires: ids(&["seamoth", "vehiclehullmodule1", "vehiclehullmodule2"]),
                    depth: 500,
                },
                VehicleTier {
                    requires: ids(&[
                        "seamoth",
                        "vehiclehullmodule1",
                        "vehiclehullmodule2",
                        "vehiclehullmodule3",
                    ]),
                    depth: 900,
                },
                VehicleTier {
                    requires: ids(&["cyclops"]),
                    depth: 500,
                },
                VehicleTier {
                    requires: ids(&["cyclops", "cyclopshullmodule1"]),
                    depth: 900,
                },
                VehicleTier {
                    requires: ids(&["exosuit"]),
                    depth: 900,
                },
            ],
            upgrade_chains: BTreeMap::from([
                (
                    EntityId::new("vehiclehullmodule2"),
                    EntityId::new("vehiclehullmodule1"),
                ),
                (
                    EntityId::new("vehiclehullmodule3"),
                    EntityId::new("vehiclehullmodule2"),
                ),
                (EntityId::new("ultraglidefins"), EntityId::new("fins")),
            ]),
            linked_unlocks: BTreeMap::from([(
                EntityId::new("cyclopshullmodule2"),
                EntityId::new("cyclopshullmodule1"),
            )]),
            locomotion: LocomotionProfile {
                traversal_aid: Some(EntityId::new("seaglide")),
                fins: vec![
                    FinTier {
                        id: EntityId::new("fins"),
                        speed_bonus: FIN_SPEED_BONUS,
                    },
                    FinTier {
                        id: EntityId::new("ultraglidefins"),
                        speed_bonus: ULTRA_FIN_SPEED_BONUS,
                    },
                ],
                tanks: vec![
                    TankTier {
                        id: EntityId::new("tank"),
                        breath_time: STANDARD_TANK_BREATH,
                        speed_penalty: STANDARD_TANK_PENALTY,
                    },
                    TankTier {
                        id: EntityId::new("doubletank"),
                        breath_time: DOUBLE_TANK_BREATH,
                        speed_penalty: DOUBLE_TANK_PENALTY,
                    },
                    TankTier {
                        id: EntityId::new("plasteeltank"),
                        breath_time: PLASTEEL_TANK_BREATH,
                        speed_penalty: PLASTEEL_TANK_PENALTY,
                    },
                    TankTier {
                        id: EntityId::new("highcapacitytank"),
                        breath_time: HIGH_CAPACITY_TANK_BREATH,
                        speed_penalty: HIGH_CAPACITY_TANK_PENALTY,
                    },
                ],
                full_oxygen: Some(EntityId::new("rebreather")),
            },
            construction_tool: Some(EntityId::new("builder")),
            laser_cutter: Some(EntityId::new("lasercutter")),
            propulsion_cannon: Some(EntityId::new("propulsioncannon")),
        };
        graph.normalize();
        graph
    }
}
