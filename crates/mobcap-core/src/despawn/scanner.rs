//! Incremental despawn scanner
//!
//! A pass runs across several ticks:
//! `Idle -> Setup (one world per tick) -> Scanning | Classifying -> Removing -> Idle`.
//! Synchronous passes classify and remove on the tick loop within a per-tick
//! budget. Asynchronous passes classify owned snapshots on the rayon pool and
//! only send the accepted creatures back; removal still happens on the tick
//! loop. Every batch advances by at least one creature.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use ahash::AHashMap;
use mobcap_creature::{
    CallSite, Category, CreatureSnapshot, HostError, PlayerDirectory, PlayerSnapshot, ProtectorSet,
    SpeciesRegistry, WorldEngine,
};
use web_time::Instant;

use crate::config::{ScanConfig, ScanMode};
use crate::world::{WorldCensus, WorldRegistry};

use super::classifier::DespawnClassifier;
use super::cursor::ScanCursor;
use super::report::ScanReport;
use super::rules::RuleContext;
use super::view::{LiveWorldView, WorldSnapshot};

/// Everything the scanner needs from the host
pub trait ScanHost: WorldEngine + PlayerDirectory {}

impl<T: WorldEngine + PlayerDirectory + ?Sized> ScanHost for T {}

/// Borrowed engine state for one scanner tick
pub struct ScanContext<'a, H: ScanHost + ?Sized> {
    pub host: &'a mut H,
    pub worlds: &'a mut WorldRegistry,
    pub species: &'a Arc<SpeciesRegistry>,
    pub protectors: &'a ProtectorSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    Running,
    /// The pass ended this tick; see [`DespawnScanner::last_report`]
    Finished,
}

/// Worker result: only the creatures accepted for removal cross back
struct ClassifyBatch {
    scanned: u64,
    accepted: Vec<CreatureSnapshot>,
}

enum Phase {
    Idle,
    Setup { pending: VecDeque<String> },
    Scanning,
    Classifying { rx: Receiver<ClassifyBatch> },
    Removing { queue: VecDeque<CreatureSnapshot> },
}

enum Removal {
    Removed,
    Skipped,
    Failed,
}

pub struct DespawnScanner {
    running: AtomicBool,
    phase: Phase,
    cursor: ScanCursor,
    mode: ScanMode,
    tick_budget: Duration,
    classifier: Arc<DespawnClassifier>,
    report: Option<ScanReport>,
    started: Option<Instant>,
    last_report: Option<ScanReport>,
    removal_failure_logged: bool,
}

impl DespawnScanner {
    pub fn new(config: &ScanConfig, classifier: Arc<DespawnClassifier>) -> Self {
        Self {
            running: AtomicBool::new(false),
            phase: Phase::Idle,
            cursor: ScanCursor::new(),
            mode: config.mode,
            tick_budget: Duration::from_micros(config.tick_budget_micros.max(1)),
            classifier,
            report: None,
            started: None,
            last_report: None,
            removal_failure_logged: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current mode; drops to `Sync` for good after a removal failure
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn classifier(&self) -> &Arc<DespawnClassifier> {
        &self.classifier
    }

    pub fn set_tick_budget(&mut self, budget: Duration) {
        self.tick_budget = budget.max(Duration::from_micros(1));
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    /// Start a pass over `worlds`. Returns false (and does nothing) while a
    /// pass is already running.
    pub fn request_scan(&mut self, worlds: Vec<String>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("[SCAN] Scan already running, request ignored");
            return false;
        }

        log::debug!(
            "[SCAN] Starting {:?} scan of {} worlds",
            self.mode,
            worlds.len()
        );
        self.cursor.clear();
        self.phase = Phase::Setup {
            pending: worlds.into(),
        };
        self.report = Some(ScanReport::new(self.mode));
        self.started = Some(Instant::now());
        true
    }

    /// Drop in-flight work and reset the running flag
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.phase = Phase::Idle;
        self.cursor.clear();
        self.report = None;
        self.started = None;
        if was_running {
            log::info!("[SCAN] Scan stopped, in-flight work dropped");
        }
    }

    /// Advance the current pass by one tick's worth of work
    pub fn tick<H: ScanHost + ?Sized>(&mut self, ctx: &mut ScanContext<'_, H>) -> ScanStatus {
        if !self.is_running() {
            return ScanStatus::Idle;
        }
        self.report_mut().ticks += 1;

        self.phase = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Phase::Idle,
            Phase::Setup { mut pending } => {
                self.setup_next_world(&mut pending, ctx);
                if pending.is_empty() {
                    self.begin_scan(ctx)
                } else {
                    Phase::Setup { pending }
                }
            }
            Phase::Scanning => self.scan_sync(ctx),
            Phase::Classifying { rx } => self.poll_worker(rx, ctx),
            Phase::Removing { queue } => self.remove_batch(queue, ctx),
        };

        if matches!(self.phase, Phase::Idle) {
            self.finish();
            ScanStatus::Finished
        } else {
            ScanStatus::Running
        }
    }

    fn report_mut(&mut self) -> &mut ScanReport {
        let mode = self.mode;
        self.report.get_or_insert_with(|| ScanReport::new(mode))
    }

    fn setup_next_world<H: ScanHost + ?Sized>(
        &mut self,
        pending: &mut VecDeque<String>,
        ctx: &mut ScanContext<'_, H>,
    ) {
        let Some(name) = pending.pop_front() else {
            return;
        };
        let now = ctx.host.current_tick();
        let loaded = ctx.host.loaded_regions(&name);
        let entities = ctx.host.living_entities(&name);

        let state = ctx.worlds.ensure_world(&name);
        state.census.set_loaded_regions(loaded);
        state.recount(now, loaded, &entities, ctx.species);
        if !state.config().despawn.enabled {
            log::debug!("[SCAN] Despawning disabled in '{}', skipping", name);
            return;
        }

        log::debug!(
            "[SCAN] Set up '{}': {} creatures, {} regions",
            name,
            entities.len(),
            loaded
        );
        self.report_mut().worlds += 1;
        self.cursor.push_world(name, entities);
    }

    fn begin_scan<H: ScanHost + ?Sized>(&mut self, ctx: &mut ScanContext<'_, H>) -> Phase {
        log::debug!(
            "[SCAN] Setup done, {} creatures to classify",
            self.cursor.remaining()
        );
        match self.mode {
            ScanMode::Sync => Phase::Scanning,
            ScanMode::Async => self.spawn_worker(ctx),
        }
    }

    fn spawn_worker<H: ScanHost + ?Sized>(&mut self, ctx: &mut ScanContext<'_, H>) -> Phase {
        let batches = self.cursor.drain_all();
        let mut snapshots = AHashMap::new();
        for (world, _) in &batches {
            if let Some(state) = ctx.worlds.get(world) {
                snapshots.insert(
                    world.clone(),
                    WorldSnapshot::capture(state, ctx.host.players_in(world)),
                );
            }
        }

        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let species = Arc::clone(ctx.species);
        let protectors = ctx.protectors.clone();

        rayon::spawn(move || {
            let mut batch = ClassifyBatch {
                scanned: 0,
                accepted: Vec::new(),
            };
            for (world, entities) in batches {
                let Some(view) = snapshots.get(&world) else {
                    continue;
                };
                for creature in entities {
                    batch.scanned += 1;
                    let rule_ctx = RuleContext {
                        creature: &creature,
                        category: species.category_of(&creature.species),
                        world: view,
                        protectors: &protectors,
                        call_site: CallSite::Worker,
                        search_for_player: true,
                    };
                    if classifier.should_despawn(&rule_ctx) {
                        batch.accepted.push(creature);
                    }
                }
            }
            // Receiver is gone if the pass was stopped meanwhile
            let _ = tx.send(batch);
        });

        Phase::Classifying { rx }
    }

    fn poll_worker<H: ScanHost + ?Sized>(
        &mut self,
        rx: Receiver<ClassifyBatch>,
        ctx: &mut ScanContext<'_, H>,
    ) -> Phase {
        match rx.try_recv() {
            Ok(batch) => {
                log::debug!(
                    "[SCAN] Worker classified {} creatures, {} to remove",
                    batch.scanned,
                    batch.accepted.len()
                );
                self.report_mut().scanned += batch.scanned;
                self.remove_batch(batch.accepted.into(), ctx)
            }
            Err(TryRecvError::Empty) => Phase::Classifying { rx },
            Err(TryRecvError::Disconnected) => {
                log::warn!("[SCAN] Classification worker exited without a result, ending pass");
                self.report_mut().aborted = true;
                Phase::Idle
            }
        }
    }

    fn scan_sync<H: ScanHost + ?Sized>(&mut self, ctx: &mut ScanContext<'_, H>) -> Phase {
        let deadline = Instant::now() + self.tick_budget;
        let mut players: AHashMap<String, Vec<PlayerSnapshot>> = AHashMap::new();

        loop {
            let Some(creature) = self.cursor.next_entity() else {
                return Phase::Idle;
            };
            self.report_mut().scanned += 1;

            if self.classify_live(&creature, ctx, &mut players)
                && matches!(self.remove(creature, ctx, false), Removal::Failed)
            {
                return Phase::Idle;
            }
            if Instant::now() >= deadline {
                return Phase::Scanning;
            }
        }
    }

    fn classify_live<H: ScanHost + ?Sized>(
        &self,
        creature: &CreatureSnapshot,
        ctx: &ScanContext<'_, H>,
        players: &mut AHashMap<String, Vec<PlayerSnapshot>>,
    ) -> bool {
        let Some(state) = ctx.worlds.get(&creature.world) else {
            return false;
        };
        let world_players = players
            .entry(creature.world.clone())
            .or_insert_with(|| ctx.host.players_in(&creature.world));
        let view = LiveWorldView::new(state, world_players);
        self.classifier.should_despawn(&RuleContext {
            creature,
            category: ctx.species.category_of(&creature.species),
            world: &view,
            protectors: ctx.protectors,
            call_site: CallSite::MainThread,
            search_for_player: true,
        })
    }

    fn remove_batch<H: ScanHost + ?Sized>(
        &mut self,
        mut queue: VecDeque<CreatureSnapshot>,
        ctx: &mut ScanContext<'_, H>,
    ) -> Phase {
        let deadline = Instant::now() + self.tick_budget;
        while let Some(creature) = queue.pop_front() {
            if matches!(self.remove(creature, ctx, true), Removal::Failed) {
                return Phase::Idle;
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        if queue.is_empty() {
            Phase::Idle
        } else {
            Phase::Removing { queue }
        }
    }

    /// Whether a worker's verdict still holds against live state: the
    /// protectors the worker could not ask, and the villager capacity the
    /// worker only saw as of capture time
    fn still_removable<H: ScanHost + ?Sized>(
        creature: &CreatureSnapshot,
        ctx: &ScanContext<'_, H>,
    ) -> bool {
        if ctx.protectors.has_main_thread_only()
            && !ctx.protectors.can_despawn_main_thread_only(creature)
        {
            return false;
        }
        if ctx.species.category_of(&creature.species) == Some(Category::Villager) {
            return ctx
                .worlds
                .get(&creature.world)
                .is_some_and(|state| state.is_over_capacity(Category::Villager));
        }
        true
    }

    /// Remove one accepted creature on the tick loop. Creatures that died
    /// meanwhile are skipped; `from_worker` verdicts are re-checked first.
    fn remove<H: ScanHost + ?Sized>(
        &mut self,
        creature: CreatureSnapshot,
        ctx: &mut ScanContext<'_, H>,
        from_worker: bool,
    ) -> Removal {
        if !ctx.host.is_valid(creature.id)
            || (from_worker && !Self::still_removable(&creature, ctx))
        {
            self.report_mut().skipped += 1;
            return Removal::Skipped;
        }

        match ctx.host.remove(creature.id) {
            Ok(()) => {
                if let Some(state) = ctx.worlds.get_mut(&creature.world)
                    && WorldCensus::is_counted(&creature, ctx.species, state.config())
                {
                    state.decrement(&creature.species, creature.position, ctx.species);
                }
                if let Some(category) = ctx.species.category_of(&creature.species) {
                    self.report_mut().record_removal(category);
                }
                log::trace!(
                    "[SCAN] Removed {} {} in '{}'",
                    creature.species,
                    creature.id,
                    creature.world
                );
                Removal::Removed
            }
            Err(err) => {
                self.removal_failed(&err);
                Removal::Failed
            }
        }
    }

    fn removal_failed(&mut self, err: &HostError) {
        if !self.removal_failure_logged {
            self.removal_failure_logged = true;
            log::warn!(
                "[SCAN] Removal failed, ending pass and scanning synchronously from now on: {}",
                err
            );
        }
        if self.mode == ScanMode::Async {
            self.mode = ScanMode::Sync;
        }
        self.cursor.clear();
        self.report_mut().aborted = true;
    }

    fn finish(&mut self) {
        self.running.store(false, Ordering::Release);
        self.cursor.clear();
        if let Some(mut report) = self.report.take() {
            if let Some(started) = self.started.take() {
                report.elapsed = started.elapsed();
            }
            log::info!("[SCAN] {}", report);
            self.last_report = Some(report);
        }
    }
}
