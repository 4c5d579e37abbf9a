//! Save coordinator
//!
//! Owns the live save record and funnels save requests from gameplay code
//! into a single background writer. At most one write is in flight; requests
//! that arrive meanwhile collapse into one follow-up write of the newest state.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::autosave::AutosaveTimer;
use super::error::{ReadError, WriteError};
use super::hooks::{CollectibleWorld, PlayerSnapshotSource};
use super::ledger::CollectibleLedger;
use super::prefs::{KeyValueStore, LegacyPrefsFlags};
use super::record::{ResourceCounters, SaveRecord, Vec3};
use super::store::DurableStore;
use crate::config::SaveConfig;

/// Writer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// No write in flight
    Idle,
    /// A write is running; new requests only mark it pending
    Writing,
}

/// Write counters for operators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub writes_completed: u64,
    pub writes_failed: u64,
    /// Requests folded into an already scheduled write
    pub requests_coalesced: u64,
    pub last_error: Option<WriteError>,
}

/// Where `load` got its record from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// A stored save was found
    Saved,
    /// Nothing stored; started from defaults
    NewGame,
    /// Storage could not be read; started from defaults
    ReadFailed(ReadError),
}

/// Summary of a `load` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Ids imported from legacy flags
    pub imported: usize,
    /// World objects hidden because they were already collected
    pub hidden: usize,
}

struct WriteState {
    phase: WritePhase,
    pending: bool,
    shutdown: bool,
    last_result: Result<(), WriteError>,
    stats: SaveStats,
}

/// State shared with the writer thread
struct Shared {
    store: DurableStore,
    live: Mutex<SaveRecord>,
    state: Mutex<WriteState>,
    /// Wakes the writer
    wake: Condvar,
    /// Signals a return to idle
    idle: Condvar,
}

impl Shared {
    /// Schedule a write of the live record, or fold into the one scheduled
    fn request(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        match state.phase {
            WritePhase::Writing => {
                if state.pending {
                    state.stats.requests_coalesced += 1;
                }
                state.pending = true;
                log::debug!("Save in progress; queued follow-up write");
            }
            WritePhase::Idle => {
                state.phase = WritePhase::Writing;
                self.wake.notify_one();
            }
        }
        true
    }

    fn wait_idle<'a>(&'a self, state: &mut MutexGuard<'a, WriteState>) {
        while state.phase != WritePhase::Idle {
            self.idle.wait(state);
        }
    }
}

fn run_writer(shared: Arc<Shared>) {
    let mut state = shared.state.lock();
    loop {
        while state.phase == WritePhase::Idle && !state.shutdown {
            shared.wake.wait(&mut state);
        }
        if state.phase == WritePhase::Idle {
            break;
        }

        // Requests from here on need a fresh snapshot, so they re-arm pending
        state.pending = false;
        let result = MutexGuard::unlocked(&mut state, || {
            let snapshot = shared.live.lock().clone();
            shared.store.write(&snapshot)
        });

        match &result {
            Ok(()) => state.stats.writes_completed += 1,
            Err(e) => {
                log::warn!("Save attempt failed: {}", e);
                state.stats.writes_failed += 1;
                state.stats.last_error = Some(e.clone());
            }
        }
        state.last_result = result;

        if state.pending {
            continue;
        }
        state.phase = WritePhase::Idle;
        shared.idle.notify_all();
    }
    log::debug!("Save writer stopped");
}

/// Live save state plus the coalescing writer
pub struct SaveCoordinator {
    shared: Arc<Shared>,
    writer: Option<JoinHandle<()>>,
    source: Option<Box<dyn PlayerSnapshotSource>>,
    legacy_flags: Option<Arc<dyn KeyValueStore>>,
    autosave: AutosaveTimer,
    config: SaveConfig,
    /// Live record came from storage or a confirmed first run
    loaded: bool,
    /// Live record changed since the last scheduled write
    dirty: bool,
}

impl SaveCoordinator {
    /// Create a coordinator and start its writer thread
    pub fn new(store: DurableStore, config: SaveConfig) -> std::io::Result<Self> {
        let initial = SaveRecord::fresh(
            ResourceCounters::new(config.starting_coins, config.starting_lives),
            config.default_player_name.clone(),
        );
        let shared = Arc::new(Shared {
            store,
            live: Mutex::new(initial),
            state: Mutex::new(WriteState {
                phase: WritePhase::Idle,
                pending: false,
                shutdown: false,
                last_result: Ok(()),
                stats: SaveStats::default(),
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
        });

        let writer_shared = Arc::clone(&shared);
        let writer = thread::Builder::new()
            .name("save-writer".to_string())
            .spawn(move || run_writer(writer_shared))?;

        Ok(Self {
            shared,
            writer: Some(writer),
            source: None,
            legacy_flags: None,
            autosave: AutosaveTimer::new(config.autosave_interval_secs),
            config,
            loaded: false,
            dirty: false,
        })
    }

    /// Pull position (and counters, if tracked) from this source before each save
    pub fn with_source(mut self, source: Box<dyn PlayerSnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Preference store holding `Collectible_<id>` flags from older builds
    pub fn with_legacy_flags(mut self, prefs: Arc<dyn KeyValueStore>) -> Self {
        self.legacy_flags = Some(prefs);
        self
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Seed the live record from storage, import legacy flags, and hide
    /// collected objects in the world
    pub fn load(&mut self, world: &mut dyn CollectibleWorld) -> LoadReport {
        let (record, origin) = match self.shared.store.read() {
            Ok(Some(record)) => (record, LoadSource::Saved),
            Ok(None) => (self.default_record(), LoadSource::NewGame),
            Err(e) => {
                log::error!("Failed to load game data: {}", e);
                (self.default_record(), LoadSource::ReadFailed(e))
            }
        };

        match origin {
            LoadSource::Saved => {
                if let Some(mover) = self.source.as_mut() {
                    mover.warp_to(record.position);
                }
                log::info!("Game loaded from {}", self.shared.store.location());
            }
            _ => log::info!("No save file found. Starting new game."),
        }

        *self.shared.live.lock() = record;
        // Defaults standing in for an unreadable save must not replace it at teardown
        self.loaded = !matches!(origin, LoadSource::ReadFailed(_));
        self.dirty = false;

        let imported = self.reconcile_legacy(world);
        let hidden = self.hide_collected(world);
        self.autosave.restart();

        LoadReport {
            source: origin,
            imported,
            hidden,
        }
    }

    /// Import legacy per-item flags for the world's collectibles. Saves only
    /// when something new was imported.
    pub fn reconcile_legacy(&mut self, world: &dyn CollectibleWorld) -> usize {
        let Some(prefs) = self.legacy_flags.as_ref() else {
            return 0;
        };

        let ids = world.collectible_ids();
        let flags = LegacyPrefsFlags::new(prefs.as_ref());
        let added = self
            .shared
            .live
            .lock()
            .collected
            .import_legacy(ids.iter().map(String::as_str), &flags);

        if added > 0 {
            self.dirty = true;
            self.request_save();
        }
        added
    }

    fn hide_collected(&self, world: &mut dyn CollectibleWorld) -> usize {
        let ids = world.collectible_ids();
        let mut hidden = 0;
        for id in ids {
            if self.has_collected(&id) {
                world.hide_collectible(&id);
                hidden += 1;
            }
        }
        hidden
    }

    fn default_record(&self) -> SaveRecord {
        SaveRecord::fresh(
            ResourceCounters::new(self.config.starting_coins, self.config.starting_lives),
            self.config.default_player_name.clone(),
        )
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Replace position, counters and name. In-memory only.
    pub fn update_snapshot(&mut self, position: Vec3, counters: ResourceCounters, name: &str) {
        let mut live = self.shared.live.lock();
        live.position = position;
        live.counters = counters;
        live.display_name = name.to_string();
        self.dirty = true;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.shared.live.lock().position = position;
        self.dirty = true;
    }

    pub fn set_counters(&mut self, counters: ResourceCounters) {
        self.shared.live.lock().counters = counters;
        self.dirty = true;
    }

    /// Record a collectible and request a save. Returns false when the id is
    /// blank or already collected.
    pub fn register_collectible(&mut self, id: &str) -> bool {
        if !CollectibleLedger::is_valid_id(id) {
            log::warn!("Ignoring collectible with an empty id");
            return false;
        }
        if !self.shared.live.lock().collected.insert(id) {
            return false;
        }
        log::info!("Collected {}", id);
        self.dirty = true;
        self.request_save();
        true
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn has_collected(&self, id: &str) -> bool {
        self.shared.live.lock().has_collected(id)
    }

    pub fn collected_ids(&self) -> Vec<String> {
        self.shared.live.lock().collected.ids().to_vec()
    }

    /// Copy of the live record
    pub fn record(&self) -> SaveRecord {
        self.shared.live.lock().clone()
    }

    pub fn phase(&self) -> WritePhase {
        self.shared.state.lock().phase
    }

    pub fn stats(&self) -> SaveStats {
        self.shared.state.lock().stats.clone()
    }

    // ------------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------------

    /// Ask for the current state to be written. Never blocks on I/O.
    pub fn request_save(&mut self) {
        self.refresh_from_source();
        if self.shared.request() {
            self.dirty = false;
        } else {
            log::warn!("Save requested after shutdown; ignored");
        }
    }

    /// Write the current state and wait for every scheduled write to finish.
    ///
    /// Returns the outcome of the last write.
    pub fn flush_save(&mut self) -> Result<(), WriteError> {
        self.refresh_from_source();
        if !self.shared.request() {
            let snapshot = self.record();
            let result = self.shared.store.write(&snapshot);
            if result.is_ok() {
                self.dirty = false;
            }
            return result;
        }
        self.dirty = false;
        self.settle()
    }

    /// Wait for scheduled writes and report the last outcome
    fn settle(&self) -> Result<(), WriteError> {
        let mut state = self.shared.state.lock();
        self.shared.wait_idle(&mut state);
        state.last_result.clone()
    }

    /// Block until the writer is idle without scheduling anything
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        self.shared.wait_idle(&mut state);
    }

    /// Application moved to or from the background
    pub fn on_pause(&mut self, paused: bool) {
        if paused {
            self.request_save();
        }
    }

    fn refresh_from_source(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let position = source.position();
        let counters = source.counters();

        let mut live = self.shared.live.lock();
        live.position = position;
        if let Some(counters) = counters {
            live.counters = counters;
        }
    }

    // ------------------------------------------------------------------------
    // Autosave
    // ------------------------------------------------------------------------

    /// Advance the autosave timer by a frame. Returns true when it fired.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if !self.autosave.update(delta) {
            return false;
        }
        log::debug!("Autosave");
        self.request_save();
        true
    }

    /// Change the autosave interval in seconds; 0 turns it off
    pub fn set_autosave_interval(&mut self, secs: f32) {
        self.autosave.set_interval(secs);
    }

    pub fn autosave_interval_secs(&self) -> f32 {
        self.autosave.interval_secs()
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Stop autosave, let scheduled writes finish and stop the writer.
    ///
    /// A final write happens only for a loaded record with unsaved changes
    /// (or a snapshot source whose position may have moved). A coordinator
    /// that never loaded, or whose load failed, leaves storage untouched.
    pub fn shutdown(&mut self) -> Result<(), WriteError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        self.autosave.stop();
        let result = if self.loaded && (self.dirty || self.source.is_some()) {
            self.flush_save()
        } else {
            if !self.loaded {
                log::debug!("No loaded save state; skipping final save");
            }
            self.settle()
        };

        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wake.notify_all();
        }
        if writer.join().is_err() {
            log::error!("Save writer thread panicked");
        }
        result
    }
}

impl Drop for SaveCoordinator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("Final save failed: {}", e);
        }
    }
}
