#![cfg(feature = "async")]

use std::sync::Arc;

use tidegate_engine::{
    Biome, DataLoader, EntityRecord, LocationItem, RandomizerConfig, WorldData,
    load_inputs_concurrently, randomize,
};

const WORLD: &str = include_str!("../assets/data/world.json");

#[derive(Debug, thiserror::Error)]
#[error("fixture load failed: {0}")]
struct FixtureError(#[from] serde_json::Error);

struct JsonLoader {
    world: WorldData,
}

impl DataLoader for JsonLoader {
    type Error = FixtureError;

    fn load_entities(&self) -> Result<Vec<EntityRecord>, Self::Error> {
        Ok(self.world.entities.clone())
    }

    fn load_biomes(&self) -> Result<Vec<Biome>, Self::Error> {
        Ok(self.world.biomes.clone())
    }

    fn load_locations(&self) -> Result<Vec<LocationItem>, Self::Error> {
        Ok(self.world.locations.clone())
    }

    fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_str("{}")?)
    }
}

#[tokio::test]
async fn concurrent_loading_matches_sequential_run() {
    let world = WorldData::from_json(WORLD).unwrap();
    let loader = Arc::new(JsonLoader {
        world: world.clone(),
    });
    let loaded = load_inputs_concurrently(loader).await.unwrap();
    assert_eq!(loaded.entities.len(), world.entities.len());

    let config = RandomizerConfig::default();
    let graph = world.graph();
    let sequential = randomize(77, &config, &graph, world.into_inputs().unwrap()).unwrap();
    let concurrent = randomize(77, &config, &loaded.graph(), loaded.into_inputs().unwrap()).unwrap();
    assert_eq!(sequential.fingerprint(), concurrent.fingerprint());
}
