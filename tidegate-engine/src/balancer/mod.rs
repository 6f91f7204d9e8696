//! Ingredient balancing strategies.
//!
//! Both strategies pull candidates from the session's reachable pool and
//! share the same amount and footprint caps; they differ in how they pick
//! ingredients and in how far an exhausted ingredient is evicted.
mod balanced;
mod random;

pub use balanced::BalancedBalancer;
pub use random::RandomBalancer;

use thiserror::Error;

use crate::config::{RandomizerConfig, RecipeMode};
use crate::entity::{Category, Entity, EntityId, Ingredient, IngredientList, Recipe};
use crate::session::Session;

/// A recipe could not be assembled this iteration; the owner stays pending.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalanceFailure {
    #[error("unknown recipe owner {owner}")]
    UnknownOwner { owner: EntityId },
    #[error("no eligible ingredient for {owner}")]
    NoCandidates { owner: EntityId },
}

pub trait IngredientBalancer {
    fn strategy(&self) -> RecipeMode;

    /// Build a recipe for `owner` from the reachable pool.
    ///
    /// # Errors
    ///
    /// Returns `BalanceFailure` when no recipe can be assembled right now.
    fn assign(&mut self, owner: &EntityId, session: &mut Session)
    -> Result<Recipe, BalanceFailure>;
}

/// Construct the balancer for a configured strategy.
#[must_use]
pub fn for_mode(mode: RecipeMode) -> Box<dyn IngredientBalancer> {
    match mode {
        RecipeMode::Balanced => Box::new(BalancedBalancer),
        RecipeMode::Random => Box::new(RandomBalancer),
    }
}

/// Footprint budget for one recipe.
pub(crate) fn footprint_limit(owner: &Entity, config: &RandomizerConfig) -> u32 {
    if owner.category == Category::BaseOutpost {
        config.max_inventory_size.min(config.max_outpost_size)
    } else {
        config.max_inventory_size
    }
}

/// Most units of `candidate` a single recipe line may hold.
pub(crate) fn amount_cap(candidate: &Entity, config: &RandomizerConfig, footprint_left: u32) -> u32 {
    let by_kind = if !candidate.category.is_stackable() {
        1
    } else if candidate.category == Category::Egg {
        config.max_eggs_per_recipe.min(config.max_amount_per_ingredient)
    } else {
        config.max_amount_per_ingredient
    };
    by_kind.min(footprint_left / candidate.inventory_size.max(1))
}

/// Pool members eligible as the next ingredient, in pool order.
pub(crate) fn candidates<'a>(
    owner: &Entity,
    lines: &[Ingredient],
    footprint_left: u32,
    session: &'a Session,
) -> Vec<&'a Entity> {
    session
        .pool
        .iter()
        .filter(|id| **id != owner.id && !lines.iter().any(|line| &line.id == *id))
        .filter_map(|id| session.entity(id))
        .filter(|candidate| !candidate.is_exhausted())
        .filter(|candidate| {
            candidate
                .category
                .ingredient_class()
                .is_none_or(|class| session.config.policy_for(class).allows(owner.category))
        })
        .filter(|candidate| amount_cap(candidate, &session.config, footprint_left) > 0)
        .collect()
}

pub(crate) fn used_footprint(lines: &[Ingredient], session: &Session) -> u32 {
    lines
        .iter()
        .map(|line| {
            session
                .entity(&line.id)
                .map_or(1, |entity| entity.inventory_size.max(1))
                .saturating_mul(line.amount)
        })
        .sum()
}

pub(crate) fn recipe_value(lines: &[Ingredient], session: &Session) -> u32 {
    lines
        .iter()
        .map(|line| {
            session
                .entity(&line.id)
                .map_or(0, |entity| entity.value)
                .saturating_mul(line.amount)
        })
        .sum()
}

/// Charge one use to every ingredient and evict the ones that ran out.
pub(crate) fn commit_uses(lines: &[Ingredient], session: &mut Session, evict_dependents: bool) {
    for line in lines {
        let exhausted = session
            .entities
            .get_mut(&line.id)
            .is_some_and(Entity::consume_use);
        if exhausted {
            log::debug!("ingredient {} reached its use cap", line.id);
            session.evict(&line.id, evict_dependents);
        }
    }
}

pub(crate) fn finish_recipe(owner: &Entity, lines: IngredientList, session: &Session) -> Recipe {
    let value = recipe_value(&lines, session);
    Recipe {
        owner: owner.id.clone(),
        ingredients: lines,
        craft_amount: owner.craft_amount,
        value,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::RandomizerConfig;
    use crate::data::WorldInputs;
    use crate::entity::{Blueprint, Category, Entity, EntityId};
    use crate::progression::ProgressionGraph;
    use crate::session::Session;

    pub fn item(name: &str, category: Category, value: u32) -> Entity {
        let mut entity = Entity::new(EntityId::new(name), category);
        entity.value = value;
        entity
    }

    /// Session whose pool holds every non-owner entity, in the given order.
    pub fn pooled_session(seed: u64, mut owner: Entity, pool: Vec<Entity>) -> Session {
        owner.blueprint.get_or_insert_with(Blueprint::default);
        let mut entities = vec![owner];
        entities.extend(pool);
        let inputs = WorldInputs {
            entities,
            ..WorldInputs::default()
        };
        let mut session = Session::new(
            seed,
            RandomizerConfig::default(),
            ProgressionGraph::default(),
            inputs,
        );
        session.admit_reachable();
        let ids: Vec<EntityId> = session.order.iter().skip(1).cloned().collect();
        for id in ids {
            session.resolve(&id, false);
        }
        session
    }
}
