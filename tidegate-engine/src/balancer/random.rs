use rand::Rng;

use super::{
    BalanceFailure, IngredientBalancer, amount_cap, candidates, commit_uses, finish_recipe,
    footprint_limit, used_footprint,
};
use crate::config::RecipeMode;
use crate::entity::{EntityId, Ingredient, IngredientList, Recipe};
use crate::session::Session;

/// Unweighted strategy: a random number of random ingredients in random amounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomBalancer;

impl IngredientBalancer for RandomBalancer {
    fn strategy(&self) -> RecipeMode {
        RecipeMode::Random
    }

    fn assign(
        &mut self,
        owner_id: &EntityId,
        session: &mut Session,
    ) -> Result<Recipe, BalanceFailure> {
        let owner = session
            .entity(owner_id)
            .cloned()
            .ok_or_else(|| BalanceFailure::UnknownOwner {
                owner: owner_id.clone(),
            })?;
        let limit = footprint_limit(&owner, &session.config);
        let count = session
            .rng
            .gen_range(1..=session.config.max_ingredients.max(1));

        let mut lines = IngredientList::new();
        for _ in 0..count {
            let left = limit.saturating_sub(used_footprint(&lines, session));
            let options: Vec<(EntityId, u32)> = candidates(&owner, &lines, left, session)
                .into_iter()
                .map(|candidate| {
                    (
                        candidate.id.clone(),
                        amount_cap(candidate, &session.config, left),
                    )
                })
                .collect();
            if options.is_empty() {
                break;
            }
            let (id, cap) = &options[session.rng.gen_range(0..options.len())];
            let amount = session.rng.gen_range(1..=*cap);
            lines.push(Ingredient::new(id.clone(), amount));
        }

        if lines.is_empty() {
            return Err(BalanceFailure::NoCandidates {
                owner: owner_id.clone(),
            });
        }
        commit_uses(&lines, session, false);
        Ok(finish_recipe(&owner, lines, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::fixtures::{item, pooled_session};
    use crate::entity::{Category, Entity};
    use std::collections::BTreeSet;

    fn pool() -> Vec<Entity> {
        ["titanium", "copper", "quartz", "lead", "silver", "gold", "salt", "sulfur"]
            .iter()
            .map(|name| item(name, Category::RawMaterial, 10))
            .collect()
    }

    #[test]
    fn recipes_respect_caps() {
        for seed in 0..40 {
            let owner = item("battery", Category::CraftedMaterial, 30);
            let mut session = pooled_session(seed, owner, pool());
            let recipe = RandomBalancer
                .assign(&EntityId::new("battery"), &mut session)
                .unwrap();
            assert!((1..=7).contains(&recipe.ingredients.len()));
            assert!(recipe.ingredients.iter().all(|line| (1..=5).contains(&line.amount)));
            assert!(recipe.footprint(|_| 1) <= 24);
            let unique: BTreeSet<&EntityId> = recipe.ingredients.iter().map(|l| &l.id).collect();
            assert_eq!(unique.len(), recipe.ingredients.len());
        }
    }

    #[test]
    fn footprint_cap_stops_early() {
        let owner = item("battery", Category::CraftedMaterial, 30);
        let mut bulky = pool();
        for entity in &mut bulky {
            entity.inventory_size = 9;
        }
        for seed in 0..20 {
            let mut session = pooled_session(seed, owner.clone(), bulky.clone());
            let recipe = RandomBalancer
                .assign(&EntityId::new("battery"), &mut session)
                .unwrap();
            assert!(recipe.footprint(|_| 9) <= 24);
            assert!(recipe.ingredients.len() <= 2);
        }
    }

    #[test]
    fn exhaustion_evicts_only_the_ingredient() {
        let owner = item("glass", Category::CraftedMaterial, 10);
        let mut ruby = item("ruby", Category::RawMaterial, 10);
        ruby.max_uses = 1;
        let knife = item("knife", Category::Tool, 20);
        let mut session = pooled_session(2, owner, vec![ruby, knife]);
        let mut lines = IngredientList::new();
        lines.push(Ingredient::new(EntityId::new("ruby"), 1));
        session.results.register_recipe(Recipe {
            owner: EntityId::new("knife"),
            ingredients: lines,
            craft_amount: 1,
            value: 10,
        });

        let recipe = RandomBalancer
            .assign(&EntityId::new("glass"), &mut session)
            .unwrap();
        assert_eq!(recipe.ingredients.len(), 1);
        assert!(!session.pool.contains(&EntityId::new("ruby")));
        assert!(session.pool.contains(&EntityId::new("knife")));
    }
}
