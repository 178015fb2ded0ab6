//! Saved cities, persisted to the store and mirrored to every other open
//! registry through a [`SyncBus`].
//!
//! Each mutation first applies any snapshots peers have already published,
//! then writes the whole list and broadcasts the whole list.
//! Peers replace their copy with the snapshot they receive; there is no merge,
//! so two instances mutating at once end up with whichever write arrived last.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::{
    error::{Result, ValidationError},
    model::SavedCity,
    store::{CITIES_KEY, Store},
};

pub const MAX_CITIES: usize = 5;

const BUS_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    /// Replace the local list with this snapshot.
    ReplaceCities { origin: u64, cities: Vec<SavedCity> },
}

/// Broadcast channel shared by all registries bound to the same store.
#[derive(Debug, Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<SyncMessage>,
    next_instance: Arc<AtomicU64>,
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            tx,
            next_instance: Arc::new(AtomicU64::new(1)),
        }
    }

    fn join(&self) -> (u64, broadcast::Receiver<SyncMessage>) {
        let id = self.next_instance.fetch_add(1, Ordering::Relaxed);
        (id, self.tx.subscribe())
    }

    fn publish(&self, msg: SyncMessage) {
        // No subscribers is fine: nobody else is open.
        let _ = self.tx.send(msg);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Full,
}

impl AddOutcome {
    /// Turn a refusal into the message the UI shows.
    pub fn into_result(self, name: &str) -> std::result::Result<(), ValidationError> {
        match self {
            AddOutcome::Added => Ok(()),
            AddOutcome::Duplicate => Err(ValidationError::DuplicateCity(name.to_string())),
            AddOutcome::Full => Err(ValidationError::RegistryFull(MAX_CITIES)),
        }
    }
}

#[derive(Debug)]
pub struct CityRegistry {
    id: u64,
    store: Store,
    bus: SyncBus,
    rx: broadcast::Receiver<SyncMessage>,
    cities: Vec<SavedCity>,
}

impl CityRegistry {
    /// Load the stored list (empty if absent or unreadable) and join `bus`.
    pub fn open(store: Store, bus: &SyncBus) -> Self {
        let cities = match store.get::<Vec<SavedCity>>(CITIES_KEY) {
            Ok(Some(cities)) => cities,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved cities: {}", e);
                Vec::new()
            }
        };
        let (id, rx) = bus.join();

        Self {
            id,
            store,
            bus: bus.clone(),
            rx,
            cities,
        }
    }

    /// Saved cities in insertion order.
    pub fn cities(&self) -> &[SavedCity] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.cities.len() >= MAX_CITIES
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cities.iter().any(|c| c.name == name)
    }

    /// Append `city` unless its name is taken or the list is full.
    /// Refusals leave everything untouched, including storage and peers.
    pub fn add_city(&mut self, city: SavedCity) -> Result<AddOutcome> {
        self.apply_pending();
        if self.contains(&city.name) {
            return Ok(AddOutcome::Duplicate);
        }
        if self.is_full() {
            return Ok(AddOutcome::Full);
        }

        tracing::info!("Saving city {}", city.name);
        let mut updated = self.cities.clone();
        updated.push(city);
        self.commit(updated)?;
        Ok(AddOutcome::Added)
    }

    /// Remove the city called `name`. Returns false when there was none.
    pub fn delete_city(&mut self, name: &str) -> Result<bool> {
        self.apply_pending();
        if !self.contains(name) {
            return Ok(false);
        }

        tracing::info!("Removing city {}", name);
        let updated = self.cities.iter().filter(|c| c.name != name).cloned().collect();
        self.commit(updated)?;
        Ok(true)
    }

    pub fn delete_all_cities(&mut self) -> Result<()> {
        self.apply_pending();
        tracing::info!("Removing all {} saved cities", self.cities.len());
        self.commit(Vec::new())
    }

    fn commit(&mut self, updated: Vec<SavedCity>) -> Result<()> {
        self.store.set(CITIES_KEY, &updated)?;
        self.bus.publish(SyncMessage::ReplaceCities {
            origin: self.id,
            cities: updated.clone(),
        });
        self.cities = updated;
        Ok(())
    }

    fn apply(&mut self, msg: SyncMessage) -> bool {
        match msg {
            SyncMessage::ReplaceCities { origin, .. } if origin == self.id => false,
            SyncMessage::ReplaceCities { cities, .. } => {
                tracing::debug!("Replacing saved cities from peer ({} entries)", cities.len());
                self.cities = cities;
                true
            }
        }
    }

    /// Apply every snapshot peers have published since the last call, without waiting.
    /// Returns how many were applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if self.apply(msg) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Sync receiver lagged, skipped {} snapshots", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return applied,
            }
        }
    }

    /// Wait for the next snapshot from a peer and apply it.
    pub async fn next_sync(&mut self) {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if self.apply(msg) {
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Sync receiver lagged, skipped {} snapshots", skipped);
                }
                // The registry holds a sender itself, so the channel cannot close under it.
                Err(RecvError::Closed) => return,
            }
        }
    }
}
