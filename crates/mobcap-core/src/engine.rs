//! Population engine facade
//!
//! Owns every world's state, the species registry, the protectors and the
//! despawn scanner. The host feeds it events and calls [`PopulationEngine::tick`]
//! once per game tick; everything else is a synchronous query.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use mobcap_creature::{
    CallSite, CreatureSnapshot, PlayerDirectory, PlayerSnapshot, Protector, ProtectorSet,
    SpeciesRegistry,
};

use crate::config::{PopulationConfig, ScanMode};
use crate::despawn::{
    DespawnClassifier, DespawnScanner, KeepReason, LiveWorldView, RuleContext, ScanContext,
    ScanHost, ScanReport, ScanStatus, Verdict,
};
use crate::scheduler::{Task, TickScheduler};
use crate::spawn_gate::{self, SpawnDecision, SpawnReason};
use crate::world::{Cell, WorldCensus, WorldRegistry, WorldState};

pub struct PopulationEngine {
    worlds: WorldRegistry,
    species: Arc<SpeciesRegistry>,
    protectors: ProtectorSet,
    scheduler: TickScheduler,
    scanner: DespawnScanner,
    /// World each online player is in
    player_worlds: AHashMap<String, String>,
}

impl PopulationEngine {
    pub fn new(mut config: PopulationConfig) -> Self {
        let mut species = SpeciesRegistry::new();
        for def in &config.species {
            species.register(def.clone());
        }
        config.drop_unknown_species(&species);
        let scanner = DespawnScanner::new(&config.scan, Arc::new(DespawnClassifier::standard()));

        Self {
            worlds: WorldRegistry::new(config),
            species: Arc::new(species),
            protectors: ProtectorSet::new(),
            scheduler: TickScheduler::new(),
            scanner,
            player_worlds: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &PopulationConfig {
        self.worlds.config()
    }

    pub fn species(&self) -> &SpeciesRegistry {
        &self.species
    }

    pub fn world(&self, name: &str) -> Option<&WorldState> {
        self.worlds.get(name)
    }

    pub fn register_protector(&mut self, protector: Box<dyn Protector>) {
        self.protectors.register(protector);
    }

    pub fn protectors(&self) -> &ProtectorSet {
        &self.protectors
    }

    /// Count every loaded world, pick up online players and schedule
    /// periodic scans
    pub fn start<H: ScanHost + ?Sized>(&mut self, host: &H) {
        let now = host.current_tick();
        for name in host.worlds() {
            let loaded = host.loaded_regions(&name);
            let entities = host.living_entities(&name);
            let state = self.worlds.ensure_world(&name);
            state.census.mark_dirty();
            state.recount(now, loaded, &entities, &self.species);
        }
        for player in host.online_players() {
            self.player_joined(&player);
        }

        let scan = &self.worlds.config().scan;
        if scan.enabled {
            self.scheduler.cancel_task(Task::RequestScan);
            self.scheduler
                .schedule_repeating(now, scan.interval_ticks, scan.interval_ticks, Task::RequestScan);
        }
        log::info!(
            "[ENGINE] Started: {} worlds, {} species, {} players, scans {}",
            self.worlds.len(),
            self.species.len(),
            self.player_worlds.len(),
            if scan.enabled {
                format!("every {} ticks ({:?})", scan.interval_ticks, self.scanner.mode())
            } else {
                "disabled".to_string()
            }
        );
    }

    /// Run scheduled work due this tick
    pub fn tick<H: ScanHost + ?Sized>(&mut self, host: &mut H) {
        let now = host.current_tick();
        for task in self.scheduler.take_due(now) {
            match task {
                Task::RequestScan => {
                    self.request_scan(&*host);
                }
                Task::ScanStep => self.step_scan(host, now),
            }
        }
    }

    /// Start a despawn pass over every loaded world. No-op while one runs.
    pub fn request_scan<H: ScanHost + ?Sized>(&mut self, host: &H) -> bool {
        if !self.scanner.request_scan(host.worlds()) {
            return false;
        }
        self.scheduler
            .schedule_after(host.current_tick(), 1, Task::ScanStep);
        true
    }

    fn step_scan<H: ScanHost + ?Sized>(&mut self, host: &mut H, now: u64) {
        let mut ctx = ScanContext {
            host,
            worlds: &mut self.worlds,
            species: &self.species,
            protectors: &self.protectors,
        };
        if self.scanner.tick(&mut ctx) == ScanStatus::Running {
            self.scheduler.schedule_after(now, 1, Task::ScanStep);
        }
    }

    pub fn is_scan_running(&self) -> bool {
        self.scanner.is_running()
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scanner.mode()
    }

    pub fn last_scan_report(&self) -> Option<&ScanReport> {
        self.scanner.last_report()
    }

    /// Stop the scanner and drop all scheduled work
    pub fn shutdown(&mut self) {
        self.scanner.stop();
        let dropped = self.scheduler.cancel_task(Task::ScanStep)
            + self.scheduler.cancel_task(Task::RequestScan);
        log::info!("[ENGINE] Shut down, {} scheduled tasks dropped", dropped);
    }

    pub fn region_loaded(&mut self, world: &str, cell: Cell) {
        self.worlds.ensure_world(world).index.region_loaded(cell);
    }

    pub fn region_unloaded(&mut self, world: &str, cell: Cell) {
        if let Some(state) = self.worlds.get_mut(world) {
            state.index.region_unloaded(cell);
        }
    }

    pub fn world_unloaded(&mut self, world: &str) {
        self.worlds.world_unloaded(world);
        self.player_worlds.retain(|_, w| w != world);
    }

    pub fn player_joined(&mut self, player: &PlayerSnapshot) {
        if self.player_worlds.contains_key(&player.name) {
            self.player_moved(player);
            return;
        }
        self.worlds
            .ensure_world(&player.world)
            .index
            .player_joined(&player.name, player.position);
        self.player_worlds
            .insert(player.name.clone(), player.world.clone());
    }

    /// Position update; a changed world moves the player between indexes
    pub fn player_moved(&mut self, player: &PlayerSnapshot) {
        match self.player_worlds.get(&player.name) {
            Some(world) if *world == player.world => {
                if let Some(state) = self.worlds.get_mut(&player.world) {
                    state.index.player_moved(&player.name, player.position);
                }
            }
            Some(_) => {
                self.player_quit(&player.name);
                self.player_joined(player);
            }
            None => self.player_joined(player),
        }
    }

    pub fn player_quit(&mut self, name: &str) {
        let Some(world) = self.player_worlds.remove(name) else {
            return;
        };
        if let Some(state) = self.worlds.get_mut(&world) {
            state.index.player_left(name);
        }
    }

    /// Confirmed spawn reported by the host. Creatures that never count
    /// against a cap (tamed animals, invalid handles) are skipped.
    pub fn creature_spawned(&mut self, creature: &CreatureSnapshot) {
        let state = self.worlds.ensure_world(&creature.world);
        if WorldCensus::is_counted(creature, &self.species, state.config()) {
            state.increment(&creature.species, creature.position, &self.species);
        }
    }

    /// Confirmed death reported by the host. Removals made by the scanner are
    /// already accounted for.
    pub fn creature_died(&mut self, creature: &CreatureSnapshot) {
        if let Some(state) = self.worlds.get_mut(&creature.world)
            && WorldCensus::is_counted(creature, &self.species, state.config())
        {
            state.decrement(&creature.species, creature.position, &self.species);
        }
    }

    pub fn increment(&mut self, world: &str, species: &str, position: Vec3) {
        self.worlds
            .ensure_world(world)
            .increment(species, position, &self.species);
    }

    pub fn decrement(&mut self, world: &str, species: &str, position: Vec3) {
        if let Some(state) = self.worlds.get_mut(world) {
            state.decrement(species, position, &self.species);
        }
    }

    /// Room for one more `species` in `world`. Unknown worlds never block.
    pub fn within_limit(&self, world: &str, species: &str) -> bool {
        self.worlds
            .get(world)
            .is_none_or(|state| state.within_limit(species, &self.species))
    }

    pub fn player_near(&self, world: &str, position: Vec3, allow_flight_depth: bool) -> bool {
        self.worlds
            .get(world)
            .is_some_and(|state| state.player_near(position, allow_flight_depth))
    }

    pub fn check_spawn(
        &self,
        world: &str,
        species: &str,
        position: Vec3,
        reason: SpawnReason,
    ) -> SpawnDecision {
        let Some(state) = self.worlds.get(world) else {
            return SpawnDecision::Allow;
        };
        let decision = spawn_gate::check_spawn(state, &self.species, species, position, reason);
        if let SpawnDecision::Deny(deny) = decision {
            log::trace!(
                "[SPAWN] Denied {:?} spawn of {} in '{}': {}",
                reason,
                species,
                world,
                deny
            );
        }
        decision
    }

    /// Run the despawn rules on one creature from the tick loop
    pub fn classify<H: PlayerDirectory + ?Sized>(
        &self,
        host: &H,
        creature: &CreatureSnapshot,
        search_for_player: bool,
    ) -> Verdict {
        let Some(state) = self.worlds.get(&creature.world) else {
            return Verdict::Keep(KeepReason::Invalid);
        };
        let players = host.players_in(&creature.world);
        let view = LiveWorldView::new(state, &players);
        self.scanner.classifier().classify(&RuleContext {
            creature,
            category: self.species.category_of(&creature.species),
            world: &view,
            protectors: &self.protectors,
            call_site: CallSite::MainThread,
            search_for_player,
        })
    }

    pub fn should_despawn<H: PlayerDirectory + ?Sized>(
        &self,
        host: &H,
        creature: &CreatureSnapshot,
        search_for_player: bool,
    ) -> bool {
        self.classify(host, creature, search_for_player).is_despawn()
    }

    pub fn can_apply_abilities(&self, creature: &CreatureSnapshot) -> bool {
        self.protectors.can_apply_abilities(creature)
    }
}
