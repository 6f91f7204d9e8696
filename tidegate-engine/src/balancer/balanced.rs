use rand::Rng;

use super::{
    BalanceFailure, IngredientBalancer, amount_cap, candidates, commit_uses, finish_recipe,
    footprint_limit, recipe_value, used_footprint,
};
use crate::config::RecipeMode;
use crate::constants::PRIMARY_VALUE_TOLERANCE;
use crate::entity::{Entity, EntityId, Ingredient, IngredientList, Recipe};
use crate::numbers::floor_f64_to_u32;
use crate::session::Session;

/// Value-targeting strategy: a primary ingredient near a fixed share of the
/// owner's value, topped up until the total lands inside the variance band.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedBalancer;

struct Candidate {
    id: EntityId,
    value: u32,
    cap: u32,
}

impl BalancedBalancer {
    fn pick_primary(owner: &Entity, limit: u32, session: &mut Session) -> Option<Ingredient> {
        let share = f64::from(owner.value) * session.config.primary_ratio;

        if let Some(line) = Self::override_primary(owner, limit, share, session) {
            return Some(line);
        }

        let options = Self::options(owner, &[], limit, session);
        if options.is_empty() {
            return None;
        }
        let tolerance = share * PRIMARY_VALUE_TOLERANCE;
        let window: Vec<&Candidate> = options
            .iter()
            .filter(|option| (f64::from(option.value) - share).abs() <= tolerance)
            .collect();
        if !window.is_empty() {
            let pick = window[session.rng.gen_range(0..window.len())];
            return Some(Ingredient::new(pick.id.clone(), 1));
        }
        let pick = &options[session.rng.gen_range(0..options.len())];
        Some(Ingredient::new(
            pick.id.clone(),
            scaled_amount(share, pick.value, pick.cap),
        ))
    }

    /// Upgrade-chain base first, then the theme ingredient for base pieces.
    fn override_primary(
        owner: &Entity,
        limit: u32,
        share: f64,
        session: &Session,
    ) -> Option<Ingredient> {
        let usable = |id: &EntityId| -> Option<(u32, u32)> {
            if !session.pool.contains(id) {
                return None;
            }
            let entity = session.entity(id).filter(|entity| !entity.is_exhausted())?;
            let cap = amount_cap(entity, &session.config, limit);
            (cap > 0).then_some((entity.value, cap))
        };
        if session.config.vanilla_upgrade_chains
            && let Some(base) = session.graph.upgrade_chains.get(&owner.id)
            && usable(base).is_some()
        {
            return Some(Ingredient::new(base.clone(), 1));
        }
        if owner.category.is_base_piece()
            && let Some(theme) = &session.theme
            && let Some((value, cap)) = usable(theme)
        {
            return Some(Ingredient::new(
                theme.clone(),
                scaled_amount(share, value, cap),
            ));
        }
        None
    }

    fn options(owner: &Entity, lines: &[Ingredient], limit: u32, session: &Session) -> Vec<Candidate> {
        let left = limit.saturating_sub(used_footprint(lines, session));
        candidates(owner, lines, left, session)
            .into_iter()
            .map(|candidate| Candidate {
                id: candidate.id.clone(),
                value: candidate.value,
                cap: amount_cap(candidate, &session.config, left),
            })
            .collect()
    }
}

impl IngredientBalancer for BalancedBalancer {
    fn strategy(&self) -> RecipeMode {
        RecipeMode::Balanced
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
        let target = f64::from(owner.value);
        let slack = target * session.config.value_variance / 2.0;
        let ceiling = target + slack;
        let limit = footprint_limit(&owner, &session.config);
        let max_lines = usize::try_from(session.config.max_ingredients).unwrap_or(usize::MAX);

        let primary = Self::pick_primary(&owner, limit, session).ok_or_else(|| {
            BalanceFailure::NoCandidates {
                owner: owner_id.clone(),
            }
        })?;
        let mut lines = IngredientList::new();
        lines.push(primary);

        while lines.len() < max_lines {
            let current = f64::from(recipe_value(&lines, session));
            if target - current <= slack {
                break;
            }
            let options: Vec<Candidate> = Self::options(&owner, &lines, limit, session)
                .into_iter()
                .filter_map(|option| {
                    let headroom =
                        floor_f64_to_u32((ceiling - current) / f64::from(option.value.max(1)));
                    let cap = option.cap.min(headroom);
                    (cap > 0).then_some(Candidate { cap, ..option })
                })
                .collect();
            if options.is_empty() {
                break;
            }
            let pick = &options[session.rng.gen_range(0..options.len())];
            let amount = session.rng.gen_range(1..=pick.cap);
            lines.push(Ingredient::new(pick.id.clone(), amount));
        }

        commit_uses(&lines, session, true);
        Ok(finish_recipe(&owner, lines, session))
    }
}

/// Units of an ingredient needed to approach `share`, within `[1, cap]`.
fn scaled_amount(share: f64, value: u32, cap: u32) -> u32 {
    let wanted = floor_f64_to_u32((share / f64::from(value.max(1))).round());
    wanted.clamp(1, cap.max(1))
}
