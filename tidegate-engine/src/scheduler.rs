//! Greedy scheduling loop driving a session to completion.
//!
//! The scheduler repeatedly picks a pending entity (priority milestone items
//! first, otherwise uniformly at random), asks the dependency gate whether it
//! may be randomized, and dispatches it to the handler registered for its
//! category. There is no backtracking: an entity that cannot be handled
//! stays pending until the iteration cap trips.
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::balancer::{self, IngredientBalancer};
use crate::entity::{Category, EntityId};
use crate::error::RandomizerError;
use crate::gate::DependencyGate;
use crate::progression::Milestone;
use crate::result::ResultBundle;
use crate::session::Session;
use crate::shuffler::LocationShuffler;
use crate::spawn::SpawnDistributor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Progress snapshot passed to the checkpoint callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub iteration: u32,
    pub pending: usize,
    pub depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Resolved,
    /// Nothing was registered; the entity stays pending.
    Deferred,
}

/// Category-specific randomization step.
pub trait EntityHandler {
    /// # Errors
    ///
    /// Returns a `RandomizerError` only for conditions that must abort the session.
    fn handle(
        &mut self,
        id: &EntityId,
        session: &mut Session,
    ) -> Result<HandlerOutcome, RandomizerError>;
}

/// Ordered extension points around a session.
pub trait SessionHook {
    fn on_setup(&mut self, _session: &mut Session) {}

    fn on_pre_loop(&mut self, _session: &mut Session) {}

    fn on_resolved(&mut self, _id: &EntityId, _session: &mut Session) {}

    fn on_complete(&mut self, _bundle: &ResultBundle) {}
}

/// Assigns recipes to craftable entities.
pub struct RecipeHandler {
    balancer: Box<dyn IngredientBalancer>,
}

impl RecipeHandler {
    #[must_use]
    pub fn new(balancer: Box<dyn IngredientBalancer>) -> Self {
        Self { balancer }
    }
}

impl EntityHandler for RecipeHandler {
    fn handle(
        &mut self,
        id: &EntityId,
        session: &mut Session,
    ) -> Result<HandlerOutcome, RandomizerError> {
        let Some(vanilla) = session.entity(id).and_then(|entity| entity.recipe.clone()) else {
            // Blueprint-only unlock: nothing to craft.
            return Ok(HandlerOutcome::Resolved);
        };

        if !session.config.randomise_recipes {
            if let Some(line) = vanilla
                .ingredients
                .iter()
                .find(|line| session.entity(&line.id).is_some_and(|e| !e.resolved))
            {
                log::debug!("{id} waits for vanilla ingredient {}", line.id);
                return Ok(HandlerOutcome::Deferred);
            }
            session.results.register_recipe(vanilla);
            return Ok(HandlerOutcome::Resolved);
        }

        match self.balancer.assign(id, session) {
            Ok(recipe) => {
                if let Some(entity) = session.entities.get_mut(id) {
                    entity.recipe = Some(recipe.clone());
                }
                session.results.register_recipe(recipe);
                Ok(HandlerOutcome::Resolved)
            }
            Err(failure) => {
                log::debug!("recipe deferred: {failure}");
                Ok(HandlerOutcome::Deferred)
            }
        }
    }
}

/// Assigns scan counts and spawn locations to fragments.
#[derive(Debug, Default)]
pub struct FragmentHandler;

impl EntityHandler for FragmentHandler {
    fn handle(
        &mut self,
        id: &EntityId,
        session: &mut Session,
    ) -> Result<HandlerOutcome, RandomizerError> {
        let scans = &session.config.scan_counts;
        let scans_needed = if scans.enabled {
            let (min, max) = (scans.min, scans.max);
            let drawn = session.rng.gen_range(min..=max);
            session.results.register_scan_count(id.clone(), drawn);
            drawn
        } else {
            scans.default_scans
        };

        let profile = SpawnDistributor::distribute(id, session.depth, scans_needed, session)?;
        if let Some(entity) = session.entities.get_mut(id) {
            entity.spawn = Some(profile.clone());
        }
        session.results.register_spawn(profile);
        Ok(HandlerOutcome::Resolved)
    }
}

type CheckpointFn = Box<dyn FnMut(&Checkpoint)>;

pub struct Scheduler {
    session: Session,
    state: SchedulerState,
    handlers: Vec<Box<dyn EntityHandler>>,
    dispatch: BTreeMap<Category, usize>,
    hooks: Vec<Box<dyn SessionHook>>,
    checkpoint: Option<CheckpointFn>,
    pending: Vec<EntityId>,
    priority: VecDeque<EntityId>,
    /// Remembered elective picks keyed by (milestone index, group index).
    electives: BTreeMap<(usize, usize), EntityId>,
}

const CRAFTED: [Category; 9] = [
    Category::CraftedMaterial,
    Category::Consumable,
    Category::Tool,
    Category::Equipment,
    Category::Deployable,
    Category::Upgrade,
    Category::Vehicle,
    Category::BasePiece,
    Category::BaseOutpost,
];

impl Scheduler {
    /// Scheduler with the default handler table for the session's recipe mode.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let recipes = RecipeHandler::new(balancer::for_mode(session.config.recipe_mode));
        Self {
            session,
            state: SchedulerState::Idle,
            handlers: Vec::new(),
            dispatch: BTreeMap::new(),
            hooks: Vec::new(),
            checkpoint: None,
            pending: Vec::new(),
            priority: VecDeque::new(),
            electives: BTreeMap::new(),
        }
        .with_handler(&CRAFTED, Box::new(recipes))
        .with_handler(&[Category::Fragment], Box::new(FragmentHandler))
    }

    /// Route `categories` to `handler`, replacing any earlier registration.
    #[must_use]
    pub fn with_handler(mut self, categories: &[Category], handler: Box<dyn EntityHandler>) -> Self {
        let index = self.handlers.len();
        self.handlers.push(handler);
        for category in categories {
            self.dispatch.insert(*category, index);
        }
        self
    }

    #[must_use]
    pub fn without_handler(mut self, category: Category) -> Self {
        self.dispatch.remove(&category);
        self
    }

    /// Append a hook; hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn SessionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, callback: impl FnMut(&Checkpoint) + 'static) -> Self {
        self.checkpoint = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Drive the session to completion. A scheduler runs once; afterwards
    /// [`Self::state`] reports whether it completed or failed.
    ///
    /// # Errors
    ///
    /// Returns `RandomizerError::Config` for out-of-range configuration,
    /// `RandomizerError::Unsatisfiable` when the iteration cap is exceeded,
    /// `RandomizerError::AlreadyRan` on a second call, or any fatal error
    /// raised by a handler.
    pub fn run(&mut self) -> Result<ResultBundle, RandomizerError> {
        if self.state != SchedulerState::Idle {
            return Err(RandomizerError::AlreadyRan);
        }
        self.state = SchedulerState::Running;
        match self.drive() {
            Ok(bundle) => {
                self.state = SchedulerState::Completed;
                Ok(bundle)
            }
            Err(err) => {
                self.state = SchedulerState::Failed;
                log::warn!("session {} failed: {err}", self.session.seed);
                Err(err)
            }
        }
    }

    fn drive(&mut self) -> Result<ResultBundle, RandomizerError> {
        self.session.config.validate()?;
        self.setup();
        self.run_loop()?;
        Ok(self.finish())
    }

    fn setup(&mut self) {
        for hook in &mut self.hooks {
            hook.on_setup(&mut self.session);
        }

        let session = &mut self.session;
        let outcome = if session.config.randomise_databoxes {
            LocationShuffler::shuffle(&session.locations, &mut session.rng)
        } else {
            LocationShuffler::identity(&session.locations)
        };
        session.derived = LocationShuffler::derive(&outcome.assignments, &session.graph.linked_unlocks);
        session.results.set_locations(outcome.assignments);

        session.depth = session.compute_depth();
        session.results.stats.depth_history.push(session.depth);
        session.admit_reachable();
        self.refresh_depth();

        self.pending = self.session.schedulable();
        if self.session.config.use_theme {
            self.session.choose_theme();
        }
        self.derive_priorities();
        log::info!(
            "session {} ready: {} pending at {}m",
            self.session.seed,
            self.pending.len(),
            self.session.depth
        );

        for hook in &mut self.hooks {
            hook.on_pre_loop(&mut self.session);
        }
    }

    fn run_loop(&mut self) -> Result<(), RandomizerError> {
        let max_iterations = self.session.config.max_iterations;
        let interval = self.session.config.checkpoint_interval.max(1);
        let mut last: Option<EntityId> = None;

        while !self.pending.is_empty() {
            self.session.iteration += 1;
            let iteration = self.session.iteration;
            if iteration > max_iterations {
                return Err(RandomizerError::Unsatisfiable {
                    iterations: iteration,
                    pending: self.pending.len(),
                    last,
                    depth: self.session.depth,
                    stuck: self.pending.clone(),
                });
            }
            if iteration % interval == 0
                && let Some(callback) = self.checkpoint.as_mut()
            {
                callback(&Checkpoint {
                    iteration,
                    pending: self.pending.len(),
                    depth: self.session.depth,
                });
            }

            let Some((id, priority)) = self.next_candidate() else {
                break;
            };
            self.attempt(&id, priority)?;
            last = Some(id);
        }
        Ok(())
    }

    fn next_candidate(&mut self) -> Option<(EntityId, bool)> {
        let pending = &self.pending;
        self.priority.retain(|id| pending.contains(id));
        if !self.priority.is_empty() {
            self.expand_priority_head();
            if let Some(id) = self.priority.pop_front() {
                return Some((id, true));
            }
        }

        while !self.pending.is_empty() {
            let index = self.session.rng.gen_range(0..self.pending.len());
            if self.session.is_resolved(&self.pending[index]) {
                self.pending.remove(index);
                continue;
            }
            return Some((self.pending[index].clone(), false));
        }
        None
    }

    /// Move unresolved pending prerequisites of the head to the front until the head is ready.
    fn expand_priority_head(&mut self) {
        let mut visited = BTreeSet::new();
        while let Some(head) = self.priority.front().cloned() {
            if !visited.insert(head.clone()) {
                break;
            }
            let Some(entity) = self.session.entity(&head) else {
                break;
            };
            let mut needs: Vec<EntityId> =
                DependencyGate::unresolved_prerequisites(entity, &self.session)
                    .cloned()
                    .collect();
            if entity.category.is_base_piece()
                && let Some(tool) = &self.session.graph.construction_tool
                && !self.session.is_resolved(tool)
            {
                needs.push(tool.clone());
            }
            let Some(next) = needs.into_iter().find(|id| self.pending.contains(id)) else {
                break;
            };
            log::debug!("{next} jumps the queue ahead of {head}");
            self.priority.retain(|id| id != &next);
            self.priority.push_front(next);
        }
    }

    fn attempt(&mut self, id: &EntityId, priority: bool) -> Result<(), RandomizerError> {
        let Some(entity) = self.session.entity(id) else {
            self.pending.retain(|pending| pending != id);
            return Ok(());
        };
        let category = entity.category;
        let priority = priority || entity.priority;
        if let Err(veto) = DependencyGate::check(entity, self.session.depth, &self.session, priority)
        {
            log::debug!(
                "iteration {}: {id} vetoed: {veto}",
                self.session.iteration
            );
            return Ok(());
        }

        let outcome = if let Some(index) = self.dispatch.get(&category).copied() {
            self.handlers[index].handle(id, &mut self.session)?
        } else {
            log::warn!("no handler registered for {id} ({category:?}); admitting as-is");
            self.session
                .results
                .stats
                .forced_admissions
                .push(id.clone());
            HandlerOutcome::Resolved
        };

        if outcome == HandlerOutcome::Resolved {
            self.complete(id, priority);
        }
        Ok(())
    }

    fn complete(&mut self, id: &EntityId, priority: bool) {
        if let Some(position) = self.pending.iter().position(|pending| pending == id) {
            self.pending.remove(position);
        }
        self.session.resolve(id, priority);
        log::debug!(
            "iteration {}: resolved {id}{}",
            self.session.iteration,
            if priority { " (priority)" } else { "" }
        );
        for hook in &mut self.hooks {
            hook.on_resolved(id, &mut self.session);
        }
        if self.session.graph.is_progression_item(id) {
            self.refresh_depth();
        }
        self.derive_priorities();
    }

    /// Raise depth until it stops changing, admitting newly reachable entities each step.
    fn refresh_depth(&mut self) -> bool {
        let mut raised = false;
        loop {
            let depth = self.session.compute_depth();
            if !self.session.raise_depth(depth) {
                break;
            }
            raised = true;
            self.session.admit_reachable();
        }
        raised
    }

    /// Rebuild the priority queue from every milestone within reach.
    fn derive_priorities(&mut self) {
        let milestones: Vec<Milestone> = self
            .session
            .graph
            .milestones_within(self.session.depth)
            .cloned()
            .collect();
        let mut queue = VecDeque::new();
        for (milestone_index, milestone) in milestones.iter().enumerate() {
            for id in &milestone.essential {
                if self.pending.contains(id) && !queue.contains(id) {
                    queue.push_back(id.clone());
                }
            }
            for (group_index, group) in milestone.elective.iter().enumerate() {
                if group.iter().any(|id| self.session.is_resolved(id)) {
                    continue;
                }
                let Some(choice) = self.elective_choice((milestone_index, group_index), group)
                else {
                    continue;
                };
                if self.pending.contains(&choice) && !queue.contains(&choice) {
                    queue.push_back(choice);
                }
            }
        }
        for id in &queue {
            if let Some(entity) = self.session.entities.get_mut(id) {
                entity.priority = true;
            }
        }
        self.priority = queue;
    }

    /// The remembered representative of an elective group, drawn on first use.
    fn elective_choice(&mut self, key: (usize, usize), group: &[EntityId]) -> Option<EntityId> {
        if let Some(choice) = self.electives.get(&key) {
            return Some(choice.clone());
        }
        let options: Vec<&EntityId> = group.iter().filter(|id| self.pending.contains(id)).collect();
        if options.is_empty() {
            return None;
        }
        let choice = options[self.session.rng.gen_range(0..options.len())].clone();
        log::debug!("elective pick: {choice}");
        self.electives.insert(key, choice.clone());
        Some(choice)
    }

    fn finish(&mut self) -> ResultBundle {
        let session = &mut self.session;
        let mut results = std::mem::take(&mut session.results);
        results.stats.iterations = session.iteration;
        results.stats.final_depth = session.depth;
        results.stats.rng_draws = session.rng.draws();
        let bundle = results.into_bundle(session.seed);
        log::info!(
            "session {} complete: {} recipes, {} spawn profiles, {} iterations, {}m",
            bundle.seed,
            bundle.recipes.len(),
            bundle.spawn_profiles.len(),
            bundle.stats.iterations,
            bundle.stats.final_depth
        );
        for hook in &mut self.hooks {
            hook.on_complete(&bundle);
        }
        bundle
    }
}
