//! World input records and their per-record validation.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entity::{Blueprint, Category, Entity, EntityId, Ingredient, IngredientList, Recipe};
use crate::error::{InputError, RandomizerError};
use crate::progression::ProgressionGraph;
use crate::shuffler::LocationItem;
use crate::spawn::Biome;

/// One entity as it appears in the world document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub category: Category,
    /// Vanilla recipe; empty when the entity is not crafted.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default = "EntityRecord::default_one")]
    pub craft_amount: u32,
    #[serde(default)]
    pub blueprint: Option<Blueprint>,
    #[serde(default)]
    pub prerequisites: Vec<EntityId>,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub max_uses: u32,
    #[serde(default)]
    pub base_depth: i32,
    #[serde(default = "EntityRecord::default_one")]
    pub inventory_size: u32,
    #[serde(default = "EntityRecord::default_one")]
    pub spawn_variants: u32,
}

impl EntityRecord {
    const fn default_one() -> u32 {
        1
    }

    /// Check the record in isolation.
    ///
    /// # Errors
    ///
    /// Returns the first `InputError` found in the record.
    pub fn validate(&self, index: usize) -> Result<(), InputError> {
        if self.id.is_empty() {
            return Err(InputError::EmptyId { index });
        }
        let mut seen = BTreeSet::new();
        for line in &self.ingredients {
            if line.id == self.id {
                return Err(InputError::SelfReference {
                    id: self.id.clone(),
                });
            }
            if line.amount == 0 {
                return Err(InputError::ZeroAmount {
                    id: self.id.clone(),
                    ingredient: line.id.clone(),
                });
            }
            if !seen.insert(&line.id) {
                return Err(InputError::DuplicateIngredient {
                    id: self.id.clone(),
                    ingredient: line.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Ids this record depends on; all of them must exist in the world.
    pub fn references(&self) -> impl Iterator<Item = &EntityId> {
        let blueprint = self.blueprint.iter().flat_map(|blueprint| {
            blueprint
                .unlock_conditions
                .iter()
                .chain(blueprint.fragments.iter())
        });
        self.ingredients
            .iter()
            .map(|line| &line.id)
            .chain(self.prerequisites.iter())
            .chain(blueprint)
    }

    #[must_use]
    pub fn into_entity(self) -> Entity {
        let recipe = (!self.ingredients.is_empty()).then(|| {
            let ingredients: IngredientList = self.ingredients.into_iter().collect();
            Recipe {
                owner: self.id.clone(),
                ingredients,
                craft_amount: self.craft_amount,
                value: self.value,
            }
        });
        let mut entity = Entity::new(self.id, self.category);
        entity.recipe = recipe;
        entity.blueprint = self.blueprint;
        entity.prerequisites = self.prerequisites;
        entity.value = self.value;
        entity.max_uses = self.max_uses;
        entity.base_depth = self.base_depth;
        entity.inventory_size = self.inventory_size.max(1);
        entity.craft_amount = self.craft_amount.max(1);
        entity.spawn_variants = self.spawn_variants.max(1);
        entity
    }
}

/// Validated inputs ready for a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldInputs {
    pub entities: Vec<Entity>,
    pub biomes: Vec<Biome>,
    pub locations: Vec<LocationItem>,
    /// Records skipped during validation.
    pub rejected: Vec<InputError>,
}

impl WorldInputs {
    /// Cross-check the inputs against `graph`.
    ///
    /// Graph ids the world does not define are logged. A gating tool the
    /// world needs but does not define is fatal: every entity it gates would
    /// stay vetoed until the iteration cap trips.
    ///
    /// # Errors
    ///
    /// Returns `RandomizerError::MissingGateTools` naming each such tool.
    pub fn check_graph(&self, graph: &ProgressionGraph) -> Result<(), RandomizerError> {
        let known: BTreeSet<&EntityId> = self.entities.iter().map(|entity| &entity.id).collect();
        let unknown: Vec<&str> = graph
            .referenced_ids()
            .into_iter()
            .filter(|id| !known.contains(id))
            .map(EntityId::as_str)
            .collect();
        if !unknown.is_empty() {
            log::warn!(
                "progression graph references {} id(s) the world does not define: {}",
                unknown.len(),
                unknown.join(", ")
            );
        }

        let needs = [
            (
                &graph.construction_tool,
                self.entities
                    .iter()
                    .any(|entity| entity.category.is_base_piece()),
            ),
            (
                &graph.laser_cutter,
                self.locations
                    .iter()
                    .any(|location| location.needs_laser_cutter),
            ),
            (
                &graph.propulsion_cannon,
                self.locations
                    .iter()
                    .any(|location| location.needs_propulsion_cannon),
            ),
        ];
        let missing: Vec<EntityId> = needs
            .into_iter()
            .filter_map(|(tool, needed)| tool.as_ref().filter(|_| needed))
            .filter(|tool| !known.contains(tool))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RandomizerError::MissingGateTools { missing })
        }
    }
}

/// Raw world document: entities, biomes, location items, optional graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldData {
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub biomes: Vec<Biome>,
    #[serde(default)]
    pub locations: Vec<LocationItem>,
    #[serde(default)]
    pub progression: Option<ProgressionGraph>,
}

impl WorldData {
    /// Load a world document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a world document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut world: Self = serde_json::from_str(json)?;
        if let Some(graph) = world.progression.as_mut() {
            graph.normalize();
        }
        Ok(world)
    }

    /// The embedded progression graph, or the built-in one when absent.
    #[must_use]
    pub fn graph(&self) -> ProgressionGraph {
        self.progression
            .clone()
            .unwrap_or_else(ProgressionGraph::vanilla)
    }

    /// Validate every record, skipping (and logging) the malformed ones.
    ///
    /// # Errors
    ///
    /// Returns `RandomizerError::NoUsableRecords` when no entity survives validation.
    pub fn into_inputs(self) -> Result<WorldInputs, RandomizerError> {
        let mut rejected = Vec::new();
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(self.entities.len());
        for (index, record) in self.entities.into_iter().enumerate() {
            if let Err(err) = record.validate(index) {
                rejected.push(err);
                continue;
            }
            if !seen.insert(record.id.clone()) {
                rejected.push(InputError::DuplicateId { id: record.id });
                continue;
            }
            records.push(record);
        }

        // Dropping a record can orphan its dependents, so repeat until stable.
        loop {
            let known: BTreeSet<&EntityId> = records.iter().map(|record| &record.id).collect();
            let orphan = records.iter().position(|record| {
                record.references().any(|reference| !known.contains(reference))
            });
            let Some(index) = orphan else {
                break;
            };
            let record = records.remove(index);
            let known: BTreeSet<&EntityId> = records.iter().map(|record| &record.id).collect();
            let reference = record
                .references()
                .find(|reference| !known.contains(reference))
                .cloned()
                .unwrap_or_else(|| record.id.clone());
            rejected.push(InputError::UnknownReference {
                id: record.id,
                reference,
            });
        }

        if records.is_empty() {
            log_rejections(&rejected);
            return Err(RandomizerError::NoUsableRecords { kind: "entity" });
        }
        let known: BTreeSet<EntityId> = records.iter().map(|record| record.id.clone()).collect();

        let mut biomes = Vec::with_capacity(self.biomes.len());
        for (index, biome) in self.biomes.into_iter().enumerate() {
            if biome.name.trim().is_empty() {
                rejected.push(InputError::EmptyBiomeName { index });
                continue;
            }
            if let Some(rate) = biome.fragment_rate
                && (!rate.is_finite() || rate < 0.0)
            {
                rejected.push(InputError::InvalidRate {
                    name: biome.name,
                    rate,
                });
                continue;
            }
            biomes.push(Biome { used: 0, ..biome });
        }

        let mut locations = Vec::with_capacity(self.locations.len());
        for (index, location) in self.locations.into_iter().enumerate() {
            if !location.position.is_finite() {
                rejected.push(InputError::NonFiniteCoordinate { index });
                continue;
            }
            if !known.contains(&location.unlocks) {
                rejected.push(InputError::UnknownLocationTarget {
                    index,
                    id: location.unlocks,
                });
                continue;
            }
            locations.push(location);
        }

        log_rejections(&rejected);
        Ok(WorldInputs {
            entities: records.into_iter().map(EntityRecord::into_entity).collect(),
            biomes,
            locations,
            rejected,
        })
    }
}

fn log_rejections(rejected: &[InputError]) {
    for err in rejected {
        log::warn!("skipping record: {err}");
    }
}
