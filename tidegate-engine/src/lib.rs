//! Tidegate Randomization Engine
//!
//! Platform-agnostic core for shuffling crafting recipes, blueprint
//! locations and fragment spawns of an underwater survival game while
//! keeping every item reachable under a depth-based progression model.
//! This crate has no I/O of its own; callers supply world data through
//! [`DataLoader`] or construct [`WorldInputs`] directly.

pub mod balancer;
pub mod config;
pub mod constants;
pub mod data;
pub mod entity;
pub mod error;
pub mod gate;
pub mod numbers;
pub mod progression;
pub mod reachability;
pub mod result;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod shuffler;
pub mod spawn;

// Re-export commonly used types
pub use balancer::{BalanceFailure, BalancedBalancer, IngredientBalancer, RandomBalancer};
pub use config::{IngredientPolicy, RandomizerConfig, RecipeMode, ScanCountConfig};
pub use data::{EntityRecord, WorldData, WorldInputs};
pub use entity::{
    BiomePlacement, Blueprint, Category, Entity, EntityId, Ingredient, IngredientClass, Recipe,
    SpawnProfile,
};
pub use error::{ConfigError, InputError, RandomizerError};
pub use gate::{DependencyGate, GateVeto};
pub use progression::{Milestone, ProgressionGraph, VehicleTier};
pub use reachability::ReachabilityModel;
pub use result::{ResultBundle, ResultStore, RunStats, SpoilerEntry};
pub use rng::SessionRng;
pub use scheduler::{
    Checkpoint, EntityHandler, FragmentHandler, HandlerOutcome, RecipeHandler, Scheduler,
    SchedulerState, SessionHook,
};
pub use session::{ReachablePool, Session};
pub use shuffler::{
    DerivedUnlock, LocationAssignment, LocationItem, LocationKind, LocationShuffler, Position,
};
pub use spawn::{Biome, SpawnDistributor, split_rate};

/// Run one complete randomization session.
///
/// # Errors
///
/// Returns `RandomizerError::Config` for out-of-range configuration,
/// `RandomizerError::NoUsableRecords` for an empty entity set,
/// `RandomizerError::MissingGateTools` when the world lacks a tool the graph
/// gates on, and any error raised while scheduling (notably `Unsatisfiable`).
pub fn randomize(
    seed: u64,
    config: &RandomizerConfig,
    graph: &ProgressionGraph,
    inputs: WorldInputs,
) -> Result<ResultBundle, RandomizerError> {
    config.validate()?;
    if inputs.entities.is_empty() {
        return Err(RandomizerError::NoUsableRecords { kind: "entity" });
    }
    inputs.check_graph(graph)?;
    let session = Session::new(seed, config.clone(), graph.clone(), inputs);
    Scheduler::new(session).run()
}

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the entity records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be loaded.
    fn load_entities(&self) -> Result<Vec<EntityRecord>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the biome records cannot be loaded.
    fn load_biomes(&self) -> Result<Vec<Biome>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the location records cannot be loaded.
    fn load_locations(&self) -> Result<Vec<LocationItem>, Self::Error>;

    /// Custom progression graph; `None` selects the built-in one.
    ///
    /// # Errors
    ///
    /// Returns an error if a graph exists but cannot be loaded.
    fn load_progression(&self) -> Result<Option<ProgressionGraph>, Self::Error> {
        Ok(None)
    }

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Loader-backed entry point that owns where world data comes from.
pub struct Randomizer<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> Randomizer<L>
where
    L: DataLoader,
{
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Gather every record into a world document.
    ///
    /// # Errors
    ///
    /// Returns an error if any record set cannot be loaded.
    pub fn load_world(&self) -> Result<WorldData, L::Error> {
        let mut world = WorldData {
            entities: self.data_loader.load_entities()?,
            biomes: self.data_loader.load_biomes()?,
            locations: self.data_loader.load_locations()?,
            progression: self.data_loader.load_progression()?,
        };
        if let Some(graph) = world.progression.as_mut() {
            graph.normalize();
        }
        Ok(world)
    }

    /// Load the named configuration and world, then run a session.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails, the world has no usable records,
    /// or the session cannot complete.
    pub fn run(&self, seed: u64, config_name: &str) -> anyhow::Result<ResultBundle> {
        let config: RandomizerConfig = self.data_loader.load_config(config_name)?;
        let world = self.load_world()?;
        let graph = world.graph();
        let inputs = world.into_inputs()?;
        Ok(randomize(seed, &config, &graph, inputs)?)
    }
}

/// Load the three record sets on the blocking pool and join them before scheduling.
///
/// # Errors
///
/// Returns an error if any load fails or a loader task panics.
#[cfg(feature = "async")]
pub async fn load_inputs_concurrently<L>(loader: std::sync::Arc<L>) -> anyhow::Result<WorldData>
where
    L: DataLoader + Send + Sync + 'static,
{
    let entities = {
        let loader = std::sync::Arc::clone(&loader);
        tokio::task::spawn_blocking(move || loader.load_entities())
    };
    let biomes = {
        let loader = std::sync::Arc::clone(&loader);
        tokio::task::spawn_blocking(move || loader.load_biomes())
    };
    let locations = {
        let loader = std::sync::Arc::clone(&loader);
        tokio::task::spawn_blocking(move || loader.load_locations())
    };
    let (entities, biomes, locations) = tokio::try_join!(entities, biomes, locations)?;
    let mut world = WorldData {
        entities: entities?,
        biomes: biomes?,
        locations: locations?,
        progression: loader.load_progression()?,
    };
    if let Some(graph) = world.progression.as_mut() {
        graph.normalize();
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_entities(&self) -> Result<Vec<EntityRecord>, Self::Error> {
            let titanium = EntityRecord {
                id: EntityId::new("titanium"),
                category: Category::RawMaterial,
                ingredients: Vec::new(),
                craft_amount: 1,
                blueprint: None,
                prerequisites: Vec::new(),
                value: 10,
                max_uses: 0,
                base_depth: 0,
                inventory_size: 1,
                spawn_variants: 1,
            };
            let knife = EntityRecord {
                id: EntityId::new("knife"),
                category: Category::Tool,
                ingredients: vec![Ingredient::new(EntityId::new("titanium"), 1)],
                value: 25,
                ..titanium.clone()
            };
            Ok(vec![titanium, knife])
        }

        fn load_biomes(&self) -> Result<Vec<Biome>, Self::Error> {
            Ok(Vec::new())
        }

        fn load_locations(&self) -> Result<Vec<LocationItem>, Self::Error> {
            Ok(Vec::new())
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str("{}")
                .or_else(|_| serde_json::from_str("null"))
                .unwrap();
            Ok(parsed)
        }
    }

    #[test]
    fn randomizer_runs_from_loader() {
        let randomizer = Randomizer::new(FixtureLoader);
        let bundle = randomizer.run(0xABCD, "randomizer").unwrap();
        let knife = &bundle.recipes[&EntityId::new("knife")];
        assert_eq!(knife.ingredients[0].id.as_str(), "titanium");
        assert_eq!(bundle.seed, 0xABCD);
    }

    #[test]
    fn invalid_config_is_rejected_before_scheduling() {
        let world = Randomizer::new(FixtureLoader).load_world().unwrap();
        let config = RandomizerConfig {
            max_iterations: 0,
            ..RandomizerConfig::default()
        };
        let err = randomize(1, &config, &world.graph(), world.into_inputs().unwrap()).unwrap_err();
        assert!(matches!(err, RandomizerError::Config(_)));
    }

    #[test]
    fn world_without_construction_tool_fails_before_scheduling() {
        let world = WorldData::from_json(
            r#"{"entities": [
                {"id": "titanium", "category": "raw_material", "value": 5},
                {"id": "room", "category": "base_piece", "value": 40,
                 "ingredients": [{"id": "titanium", "amount": 2}]}
            ]}"#,
        )
        .unwrap();
        let err = randomize(
            1,
            &RandomizerConfig::default(),
            &world.graph(),
            world.into_inputs().unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RandomizerError::MissingGateTools {
                missing: vec![EntityId::new("builder")]
            }
        );
    }

    #[test]
    fn empty_inputs_are_fatal() {
        let err = randomize(
            1,
            &RandomizerConfig::default(),
            &ProgressionGraph::vanilla(),
            WorldInputs::default(),
        )
        .unwrap_err();
        assert_eq!(err, RandomizerError::NoUsableRecords { kind: "entity" });
    }
}
