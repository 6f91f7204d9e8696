//! Randomizer configuration with serde defaults and range validation.
use serde::{Deserialize, Serialize};

use crate::constants::{
    CHECKPOINT_INTERVAL, DEFAULT_SCANS_TO_UNLOCK, MAX_SCHEDULER_ITERATIONS, MIN_FRAGMENT_BIOMES,
};
use crate::entity::{Category, IngredientClass};
use crate::error::ConfigError;

/// Ingredient balancing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeMode {
    Balanced,
    Random,
}

/// Whether an ingredient class may appear in recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientPolicy {
    Never,
    /// Only in recipes for vehicles and base pieces.
    TopLevelOnly,
    Always,
}

impl IngredientPolicy {
    #[must_use]
    pub const fn allows(self, owner: Category) -> bool {
        match self {
            Self::Never => false,
            Self::TopLevelOnly => owner.is_top_level(),
            Self::Always => true,
        }
    }
}

/// Fragment scan-count randomization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCountConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "ScanCountConfig::default_min")]
    pub min: u32,
    #[serde(default = "ScanCountConfig::default_max")]
    pub max: u32,
    /// Vanilla scans needed; counts above it raise spawn rates.
    #[serde(default = "ScanCountConfig::default_scans")]
    pub default_scans: u32,
}

impl ScanCountConfig {
    const fn default_min() -> u32 {
        1
    }

    const fn default_max() -> u32 {
        10
    }

    const fn default_scans() -> u32 {
        DEFAULT_SCANS_TO_UNLOCK
    }
}

impl Default for ScanCountConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min: Self::default_min(),
            max: Self::default_max(),
            default_scans: Self::default_scans(),
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomizerConfig {
    #[serde(default = "RandomizerConfig::default_recipe_mode")]
    pub recipe_mode: RecipeMode,
    #[serde(default = "RandomizerConfig::default_true")]
    pub randomise_recipes: bool,
    #[serde(default = "RandomizerConfig::default_true")]
    pub randomise_fragments: bool,
    #[serde(default = "RandomizerConfig::default_true")]
    pub randomise_databoxes: bool,
    #[serde(default)]
    pub scan_counts: ScanCountConfig,

    /// Seconds a diver spends searching at depth before heading back up.
    #[serde(default = "RandomizerConfig::default_depth_search_time")]
    pub depth_search_time: i32,
    /// Cap on how far a diver may venture beyond their vehicle.
    #[serde(default = "RandomizerConfig::default_max_depth_without_vehicle")]
    pub max_depth_without_vehicle: i32,

    #[serde(default = "RandomizerConfig::default_primary_ratio")]
    pub primary_ratio: f64,
    #[serde(default = "RandomizerConfig::default_variance")]
    pub value_variance: f64,
    #[serde(default = "RandomizerConfig::default_max_ingredients")]
    pub max_ingredients: u32,
    #[serde(default = "RandomizerConfig::default_max_amount")]
    pub max_amount_per_ingredient: u32,
    #[serde(default = "RandomizerConfig::default_max_inventory_size")]
    pub max_inventory_size: u32,
    #[serde(default = "RandomizerConfig::default_max_outpost_size")]
    pub max_outpost_size: u32,
    #[serde(default = "RandomizerConfig::default_max_eggs")]
    pub max_eggs_per_recipe: u32,
    #[serde(default = "RandomizerConfig::default_policy")]
    pub tools_as_ingredients: IngredientPolicy,
    #[serde(default = "RandomizerConfig::default_policy")]
    pub equipment_as_ingredients: IngredientPolicy,
    #[serde(default = "RandomizerConfig::default_policy")]
    pub upgrades_as_ingredients: IngredientPolicy,
    #[serde(default)]
    pub use_theme: bool,
    #[serde(default = "RandomizerConfig::default_true")]
    pub vanilla_upgrade_chains: bool,

    #[serde(default = "RandomizerConfig::default_max_biomes")]
    pub max_biomes_per_fragment: u32,
    #[serde(default = "RandomizerConfig::default_fragment_multiplier")]
    pub fragment_rate_multiplier: f64,
    #[serde(default = "RandomizerConfig::default_biome_saturation")]
    pub max_fragment_kinds_per_biome: u32,

    #[serde(default = "RandomizerConfig::default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "RandomizerConfig::default_checkpoint_interval")]
    pub checkpoint_interval: u32,
}

impl RandomizerConfig {
    const fn default_true() -> bool {
        true
    }

    const fn default_recipe_mode() -> RecipeMode {
        RecipeMode::Balanced
    }

    const fn default_depth_search_time() -> i32 {
        15
    }

    const fn default_max_depth_without_vehicle() -> i32 {
        100
    }

    const fn default_primary_ratio() -> f64 {
        0.45
    }

    const fn default_variance() -> f64 {
        0.2
    }

    const fn default_max_ingredients() -> u32 {
        7
    }

    const fn default_max_amount() -> u32 {
        5
    }

    const fn default_max_inventory_size() -> u32 {
        24
    }

    const fn default_max_outpost_size() -> u32 {
        12
    }

    const fn default_max_eggs() -> u32 {
        1
    }

    const fn default_policy() -> IngredientPolicy {
        IngredientPolicy::TopLevelOnly
    }

    const fn default_max_biomes() -> u32 {
        6
    }

    const fn default_fragment_multiplier() -> f64 {
        0.5
    }

    const fn default_biome_saturation() -> u32 {
        5
    }

    const fn default_max_iterations() -> u32 {
        MAX_SCHEDULER_ITERATIONS
    }

    const fn default_checkpoint_interval() -> u32 {
        CHECKPOINT_INTERVAL
    }

    /// Policy governing one ingredient class.
    #[must_use]
    pub const fn policy_for(&self, class: IngredientClass) -> IngredientPolicy {
        match class {
            IngredientClass::Tool => self.tools_as_ingredients,
            IngredientClass::Equipment => self.equipment_as_ingredients,
            IngredientClass::Upgrade => self.upgrades_as_ingredients,
        }
    }

    /// Validate configuration invariants before a session starts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ratios()?;
        self.validate_recipe_limits()?;
        self.validate_fragments()?;
        self.validate_scheduler()?;
        Ok(())
    }

    fn validate_ratios(&self) -> Result<(), ConfigError> {
        if !(0.05..=1.0).contains(&self.primary_ratio) {
            return Err(ConfigError::RangeViolation {
                field: "primary_ratio",
                min: 0.05,
                max: 1.0,
                value: self.primary_ratio,
            });
        }
        if !(0.0..=1.0).contains(&self.value_variance) {
            return Err(ConfigError::RangeViolation {
                field: "value_variance",
                min: 0.0,
                max: 1.0,
                value: self.value_variance,
            });
        }
        if !(0.0..=10.0).contains(&self.fragment_rate_multiplier) {
            return Err(ConfigError::RangeViolation {
                field: "fragment_rate_multiplier",
                min: 0.0,
                max: 10.0,
                value: self.fragment_rate_multiplier,
            });
        }
        if !(0..=300).contains(&self.depth_search_time) {
            return Err(ConfigError::RangeViolation {
                field: "depth_search_time",
                min: 0.0,
                max: 300.0,
                value: f64::from(self.depth_search_time),
            });
        }
        if self.max_depth_without_vehicle < 0 {
            return Err(ConfigError::MinViolation {
                field: "max_depth_without_vehicle",
                min: 0.0,
                value: f64::from(self.max_depth_without_vehicle),
            });
        }
        Ok(())
    }

    fn validate_recipe_limits(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_ingredients", self.max_ingredients),
            ("max_amount_per_ingredient", self.max_amount_per_ingredient),
            ("max_inventory_size", self.max_inventory_size),
            ("max_outpost_size", self.max_outpost_size),
        ] {
            if value == 0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value: 0.0,
                });
            }
        }
        Ok(())
    }

    fn validate_fragments(&self) -> Result<(), ConfigError> {
        if self.max_biomes_per_fragment < MIN_FRAGMENT_BIOMES {
            return Err(ConfigError::MinViolation {
                field: "max_biomes_per_fragment",
                min: f64::from(MIN_FRAGMENT_BIOMES),
                value: f64::from(self.max_biomes_per_fragment),
            });
        }
        if self.max_fragment_kinds_per_biome == 0 {
            return Err(ConfigError::MinViolation {
                field: "max_fragment_kinds_per_biome",
                min: 1.0,
                value: 0.0,
            });
        }
        let scans = &self.scan_counts;
        if scans.min == 0 {
            return Err(ConfigError::MinViolation {
                field: "scan_counts.min",
                min: 1.0,
                value: 0.0,
            });
        }
        if scans.min > scans.max {
            return Err(ConfigError::ScanBounds {
                min: scans.min,
                max: scans.max,
            });
        }
        Ok(())
    }

    fn validate_scheduler(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::MinViolation {
                field: "max_iterations",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::MinViolation {
                field: "checkpoint_interval",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            recipe_mode: Self::default_recipe_mode(),
            randomise_recipes: true,
            randomise_fragments: true,
            randomise_databoxes: true,
            scan_counts: ScanCountConfig::default(),
            depth_search_time: Self::default_depth_search_time(),
            max_depth_without_vehicle: Self::default_max_depth_without_vehicle(),
            primary_ratio: Self::default_primary_ratio(),
            value_variance: Self::default_variance(),
            max_ingredients: Self::default_max_ingredients(),
            max_amount_per_ingredient: Self::default_max_amount(),
            max_inventory_size: Self::default_max_inventory_size(),
            max_outpost_size: Self::default_max_outpost_size(),
            max_eggs_per_recipe: Self::default_max_eggs(),
            tools_as_ingredients: Self::default_policy(),
            equipment_as_ingredients: Self::default_policy(),
            upgrades_as_ingredients: Self::default_policy(),
            use_theme: false,
            vanilla_upgrade_chains: true,
            max_biomes_per_fragment: Self::default_max_biomes(),
            fragment_rate_multiplier: Self::default_fragment_multiplier(),
            max_fragment_kinds_per_biome: Self::default_biome_saturation(),
            max_iterations: Self::default_max_iterations(),
            checkpoint_interval: Self::default_checkpoint_interval(),
        }
    }
}
