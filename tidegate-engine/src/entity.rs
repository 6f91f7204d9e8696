//! Entity graph primitives shared by every engine component.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Inline capacity for ingredient lists; recipes rarely exceed eight lines.
pub type IngredientList = SmallVec<[Ingredient; 8]>;

/// Opaque, stable identity of a game entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Construct an id from a string slice, trimming whitespace.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the id has no visible characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Broad classification driving handler dispatch and ingredient rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RawMaterial,
    Fish,
    Seed,
    Egg,
    CraftedMaterial,
    Consumable,
    Tool,
    Equipment,
    Deployable,
    Upgrade,
    Vehicle,
    BasePiece,
    BaseOutpost,
    Fragment,
    #[serde(other)]
    Other,
}

/// Ingredient classes that configuration can exclude from recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientClass {
    Tool,
    Equipment,
    Upgrade,
}

impl Category {
    /// Collected from the world rather than crafted or scanned.
    #[must_use]
    pub const fn is_gathered(self) -> bool {
        matches!(self, Self::RawMaterial | Self::Fish | Self::Seed | Self::Egg)
    }

    /// Never carried in an inventory, so never usable as an ingredient.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        matches!(self, Self::Vehicle | Self::BasePiece | Self::BaseOutpost)
    }

    #[must_use]
    pub const fn is_base_piece(self) -> bool {
        matches!(self, Self::BasePiece | Self::BaseOutpost)
    }

    #[must_use]
    pub const fn can_be_ingredient(self) -> bool {
        !self.is_top_level() && !matches!(self, Self::Fragment | Self::Other)
    }

    /// Stackable items may appear with an amount above one.
    #[must_use]
    pub const fn is_stackable(self) -> bool {
        !matches!(
            self,
            Self::Tool | Self::Equipment | Self::Upgrade | Self::Vehicle
        )
    }

    #[must_use]
    pub const fn ingredient_class(self) -> Option<IngredientClass> {
        match self {
            Self::Tool => Some(IngredientClass::Tool),
            Self::Equipment => Some(IngredientClass::Equipment),
            Self::Upgrade => Some(IngredientClass::Upgrade),
            _ => None,
        }
    }
}

/// One line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: EntityId,
    pub amount: u32,
}

impl Ingredient {
    #[must_use]
    pub const fn new(id: EntityId, amount: u32) -> Self {
        Self { id, amount }
    }
}

/// Crafting recipe owned by exactly one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub owner: EntityId,
    pub ingredients: IngredientList,
    #[serde(default = "default_craft_amount")]
    pub craft_amount: u32,
    /// Summed value of all ingredient lines.
    #[serde(default)]
    pub value: u32,
}

const fn default_craft_amount() -> u32 {
    1
}

impl Recipe {
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.ingredients.iter().any(|line| &line.id == id)
    }

    /// Total inventory footprint given each ingredient's slot size.
    #[must_use]
    pub fn footprint(&self, size_of: impl Fn(&EntityId) -> u32) -> u32 {
        self.ingredients
            .iter()
            .map(|line| size_of(&line.id).saturating_mul(line.amount))
            .sum()
    }
}

/// Unlock gating metadata for a craftable entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub unlock_conditions: Vec<EntityId>,
    #[serde(default)]
    pub fragments: Vec<EntityId>,
    #[serde(default)]
    pub needs_location_item: bool,
    #[serde(default)]
    pub unlock_depth: i32,
}

/// Spawn probabilities of one fragment across its chosen biomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnProfile {
    pub fragment: EntityId,
    pub placements: Vec<BiomePlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scans_required: Option<u32>,
}

impl SpawnProfile {
    /// Sum of every variant rate across all biomes.
    #[must_use]
    pub fn total_rate(&self) -> f64 {
        self.placements
            .iter()
            .flat_map(|placement| placement.rates.iter())
            .sum()
    }
}

/// Per-biome spawn rates, one per physical spawn variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomePlacement {
    pub biome: String,
    pub rates: Vec<f64>,
}

/// A tracked game object.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub category: Category,
    pub recipe: Option<Recipe>,
    pub blueprint: Option<Blueprint>,
    pub spawn: Option<SpawnProfile>,
    pub prerequisites: Vec<EntityId>,
    pub value: u32,
    /// Maximum recipes this entity may appear in; 0 means unbounded.
    pub max_uses: u32,
    pub uses_consumed: u32,
    pub resolved: bool,
    /// Set by the scheduler once the entity becomes reachable.
    pub accessible_depth: Option<i32>,
    /// Depth at which a gathered entity can be collected.
    pub base_depth: i32,
    pub inventory_size: u32,
    pub craft_amount: u32,
    pub spawn_variants: u32,
    pub priority: bool,
}

impl Entity {
    /// Create an entity with neutral defaults for every optional field.
    #[must_use]
    pub fn new(id: EntityId, category: Category) -> Self {
        Self {
            id,
            category,
            recipe: None,
            blueprint: None,
            spawn: None,
            prerequisites: Vec::new(),
            value: 0,
            max_uses: 0,
            uses_consumed: 0,
            resolved: false,
            accessible_depth: None,
            base_depth: 0,
            inventory_size: 1,
            craft_amount: 1,
            spawn_variants: 1,
            priority: false,
        }
    }

    /// Whether the entity has a per-recipe usage cap that is now spent.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.max_uses > 0 && self.uses_consumed >= self.max_uses
    }

    /// Record one more recipe referencing this entity.
    /// Returns true when the use cap has just been reached.
    pub fn consume_use(&mut self) -> bool {
        self.uses_consumed = self.uses_consumed.saturating_add(1);
        self.is_exhausted()
    }

    /// Mark resolved; returns false when the entity had already resolved.
    pub fn mark_resolved(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }

    /// Scheduled entities are those the engine must randomize.
    #[must_use]
    pub fn needs_scheduling(&self, fragments_enabled: bool) -> bool {
        if self.category == Category::Fragment {
            return fragments_enabled;
        }
        !self.category.is_gathered() && (self.recipe.is_some() || self.blueprint.is_some())
    }

    #[must_use]
    pub fn needs_location_item(&self) -> bool {
        self.blueprint
            .as_ref()
            .is_some_and(|blueprint| blueprint.needs_location_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_rules_are_consistent() {
        assert!(Category::RawMaterial.is_gathered());
        assert!(Category::Vehicle.is_top_level());
        assert!(!Category::Vehicle.can_be_ingredient());
        assert!(!Category::Fragment.can_be_ingredient());
        assert!(!Category::Tool.is_stackable());
        assert!(Category::Egg.is_stackable());
        assert_eq!(
            Category::Upgrade.ingredient_class(),
            Some(IngredientClass::Upgrade)
        );
        assert!(Category::BaseOutpost.is_base_piece());
    }

    #[test]
    fn consume_use_reports_exhaustion() {
        let mut entity = Entity::new(EntityId::new("ruby"), Category::RawMaterial);
        entity.max_uses = 2;
        assert!(!entity.consume_use());
        assert!(entity.consume_use());
        assert!(entity.is_exhausted());

        let mut unbounded = Entity::new(EntityId::new("titanium"), Category::RawMaterial);
        for _ in 0..10 {
            assert!(!unbounded.consume_use());
        }
    }

    #[test]
    fn resolution_happens_once() {
        let mut entity = Entity::new(EntityId::new("knife"), Category::Tool);
        assert!(entity.mark_resolved());
        assert!(!entity.mark_resolved());
        assert!(entity.resolved);
    }

    #[test]
    fn scheduling_depends_on_category_and_blueprint() {
        let mut tool = Entity::new(EntityId::new("scanner"), Category::Tool);
        assert!(!tool.needs_scheduling(true));
        tool.blueprint = Some(Blueprint::default());
        assert!(tool.needs_scheduling(true));

        let fragment = Entity::new(EntityId::new("seamothfragment"), Category::Fragment);
        assert!(fragment.needs_scheduling(true));
        assert!(!fragment.needs_scheduling(false));
    }

    #[test]
    fn entity_id_trims_and_displays() {
        let id = EntityId::new("  titanium ");
        assert_eq!(id.as_str(), "titanium");
        assert_eq!(id.to_string(), "titanium");
        assert!(EntityId::new("   ").is_empty());
    }
}
