//! Dependency gate: decides whether an entity may be randomized right now.
use thiserror::Error;

use crate::entity::{Entity, EntityId};
use crate::session::Session;

/// Why the gate refused an entity this iteration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateVeto {
    #[error("construction tool {tool} is not unlocked yet")]
    ConstructionTool { tool: EntityId },
    #[error("prerequisite {prerequisite} is unresolved")]
    Prerequisite { prerequisite: EntityId },
    #[error("unlock depth {required}m exceeds reachable {depth}m")]
    TooDeep { required: i32, depth: i32 },
    #[error("location needs {tool}")]
    LocationTool { tool: EntityId },
    #[error("unlock condition {condition} is not reachable")]
    UnlockCondition { condition: EntityId },
    #[error("fragment {fragment} has no spawn yet")]
    Fragment { fragment: EntityId },
}

pub struct DependencyGate;

impl DependencyGate {
    /// Evaluate every gating rule in order. Priority dispatch and entities
    /// marked `priority` skip the depth, unlock-condition and fragment rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule that vetoes the entity.
    pub fn check(
        entity: &Entity,
        depth: i32,
        session: &Session,
        priority: bool,
    ) -> Result<(), GateVeto> {
        if entity.category.is_base_piece()
            && let Some(tool) = &session.graph.construction_tool
            && !session.is_resolved(tool)
        {
            return Err(GateVeto::ConstructionTool { tool: tool.clone() });
        }

        if let Some(prerequisite) = Self::unresolved_prerequisites(entity, session).next() {
            return Err(GateVeto::Prerequisite {
                prerequisite: prerequisite.clone(),
            });
        }

        if priority || entity.priority {
            return Ok(());
        }

        if let Some(unlock) = session.unlock_requirements(entity) {
            if unlock.depth > depth {
                return Err(GateVeto::TooDeep {
                    required: unlock.depth,
                    depth,
                });
            }
            let tools = [
                (unlock.needs_laser_cutter, &session.graph.laser_cutter),
                (
                    unlock.needs_propulsion_cannon,
                    &session.graph.propulsion_cannon,
                ),
            ];
            for (needed, tool) in tools {
                if needed
                    && let Some(tool) = tool
                    && !session.is_resolved(tool)
                {
                    return Err(GateVeto::LocationTool { tool: tool.clone() });
                }
            }
        }

        if let Some(blueprint) = &entity.blueprint {
            if let Some(condition) = blueprint
                .unlock_conditions
                .iter()
                .find(|id| !session.is_resolved(id) && !session.pool.contains(id))
            {
                return Err(GateVeto::UnlockCondition {
                    condition: condition.clone(),
                });
            }
            if let Some(fragment) = blueprint
                .fragments
                .iter()
                .find(|id| !session.is_resolved(id))
            {
                return Err(GateVeto::Fragment {
                    fragment: fragment.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_satisfied(entity: &Entity, depth: i32, session: &Session, priority: bool) -> bool {
        Self::check(entity, depth, session, priority).is_ok()
    }

    /// Explicit prerequisites plus the upgrade-chain prerequisite, unresolved ones only.
    pub fn unresolved_prerequisites<'a>(
        entity: &'a Entity,
        session: &'a Session,
    ) -> impl Iterator<Item = &'a EntityId> {
        let chained = session
            .config
            .vanilla_upgrade_chains
            .then(|| session.graph.upgrade_chains.get(&entity.id))
            .flatten();
        entity
            .prerequisites
            .iter()
            .chain(chained)
            .filter(|id| !session.is_resolved(id))
    }
}
