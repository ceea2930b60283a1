//! Idempotent script load registry.
//!
//! Keyed by absolute resource URL. A URL moves `NotLoaded -> Loading -> Loaded`
//! and is fetched at most once for the lifetime of the registry; concurrent
//! requests for a URL that is `Loading` wait on the same completion.
//!
//! A failed load returns the URL to `NotLoaded` so a later patch can retry;
//! `Loaded` is terminal.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use url::Url;

use super::host::{ScriptHost, ScriptLoadError};
use crate::debug;

type Completion = Option<Result<(), ScriptLoadError>>;

/// Observable state of one resource.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

/// How `ensure` satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// This call performed the fetch.
    Fetched,
    /// Already loaded; nothing fetched.
    Cached,
    /// Awaited a load started by someone else.
    Joined,
}

enum Slot {
    Loading(watch::Receiver<Completion>),
    Loaded,
}

enum Claim {
    Cached,
    Wait(watch::Receiver<Completion>),
    Fetch(watch::Sender<Completion>),
}

/// Page-lifetime cache of script loads.
#[derive(Default)]
pub struct ScriptLoadRegistry {
    slots: DashMap<String, Slot>,
}

impl ScriptLoadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self, url: &str) -> LoadState {
        match self.slots.get(url).as_deref() {
            None => LoadState::NotLoaded,
            Some(Slot::Loading(_)) => LoadState::Loading,
            Some(Slot::Loaded) => LoadState::Loaded,
        }
    }

    /// Make sure `url` has been executed exactly once through `host`.
    pub async fn ensure(
        &self,
        url: &Url,
        host: &dyn ScriptHost,
    ) -> Result<LoadOutcome, ScriptLoadError> {
        let key = url.as_str();

        match self.claim(key) {
            Claim::Cached => {
                debug!("activate"; "cached: {}", key);
                Ok(LoadOutcome::Cached)
            }
            Claim::Wait(mut rx) => {
                debug!("activate"; "waiting for in-flight load: {}", key);
                let result = match rx.wait_for(Option::is_some).await {
                    Ok(done) => done.clone().unwrap_or(Ok(())),
                    Err(_) => Err(ScriptLoadError::Abandoned(key.to_string())),
                };
                result.map(|()| LoadOutcome::Joined)
            }
            Claim::Fetch(tx) => {
                let mut pending = PendingLoad {
                    registry: self,
                    key,
                    tx: Some(tx),
                };
                let result = host.load(url).await;
                pending.finish(result.clone());
                result.map(|()| LoadOutcome::Fetched)
            }
        }
    }

    /// Decide under the shard lock whether this caller fetches or waits.
    fn claim(&self, key: &str) -> Claim {
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(slot) => match slot.get() {
                Slot::Loaded => Claim::Cached,
                Slot::Loading(rx) => Claim::Wait(rx.clone()),
            },
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(Slot::Loading(rx));
                Claim::Fetch(tx)
            }
        }
    }
}

/// Owner of an in-flight load. Dropping it unfinished resets the slot.
struct PendingLoad<'a> {
    registry: &'a ScriptLoadRegistry,
    key: &'a str,
    tx: Option<watch::Sender<Completion>>,
}

impl PendingLoad<'_> {
    fn finish(&mut self, result: Result<(), ScriptLoadError>) {
        if result.is_ok() {
            self.registry.slots.insert(self.key.to_string(), Slot::Loaded);
        } else {
            self.registry.slots.remove(self.key);
        }
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(result));
        }
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.registry.slots.remove(self.key);
        }
    }
}
