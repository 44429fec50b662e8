//! Session-scoped officer directory cache.
//!
//! Key properties:
//! - Single-flight: callers arriving while a fetch is running share it
//! - Only the cache's own fetch routine writes the list
//! - `refresh()` always starts a new fetch; a superseded fetch never writes
//! - Empty lists are not retained, so the next caller asks again

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Officer;
use crate::services::{OfficerDirectoryService, ServiceError};

/// Immutable officer list handed to readers.
pub type OfficerList = Arc<[Officer]>;

type SharedFetch = Shared<BoxFuture<'static, Result<OfficerList, DirectoryError>>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Officer directory unavailable: {0}")]
    Service(#[from] ServiceError),

    #[error("Internal lock error")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Cache state
// ═══════════════════════════════════════════════════════════

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    officers: Option<OfficerList>,
    in_flight: Option<InFlight>,
    generation: u64,
}

/// Officer directory shared by every consumer of a session.
///
/// Wrap in `Arc` and hand the handle to the map view and the forward dialog.
pub struct DirectoryCache {
    service: Arc<dyn OfficerDirectoryService>,
    state: Mutex<CacheState>,
}

impl DirectoryCache {
    pub fn new(service: Arc<dyn OfficerDirectoryService>) -> Self {
        Self {
            service,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Cached officers, or the result of the running fetch, or a new fetch.
    pub async fn officers(&self) -> Result<OfficerList, DirectoryError> {
        let (generation, fetch) = {
            let mut state = self.lock()?;
            if let Some(cached) = &state.officers {
                return Ok(cached.clone());
            }
            match &state.in_flight {
                Some(running) => {
                    debug!(generation = running.generation, "Joining in-flight directory fetch");
                    (running.generation, running.fetch.clone())
                }
                None => self.start_fetch(&mut state),
            }
        };
        let result = fetch.await;
        self.settle(generation, result)
    }

    /// Force a new fetch regardless of cache or running fetch.
    pub async fn refresh(&self) -> Result<OfficerList, DirectoryError> {
        let (generation, fetch) = {
            let mut state = self.lock()?;
            self.start_fetch(&mut state)
        };
        let result = fetch.await;
        self.settle(generation, result)
    }

    /// The retained list, without fetching.
    pub fn cached(&self) -> Option<OfficerList> {
        self.state.lock().ok()?.officers.clone()
    }

    /// Drop the retained list. A running fetch still completes and may
    /// repopulate it.
    pub fn invalidate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.officers = None;
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.in_flight.is_some())
            .unwrap_or(false)
    }

    // ── Internal ────────────────────────────────────────────

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, DirectoryError> {
        self.state.lock().map_err(|_| DirectoryError::LockPoisoned)
    }

    fn start_fetch(&self, state: &mut CacheState) -> (u64, SharedFetch) {
        state.generation += 1;
        let generation = state.generation;
        let service = Arc::clone(&self.service);
        let fetch = async move {
            service
                .officers()
                .await
                .map(OfficerList::from)
                .map_err(DirectoryError::from)
        }
        .boxed()
        .shared();

        debug!(generation, "Starting officer directory fetch");
        state.in_flight = Some(InFlight {
            generation,
            fetch: fetch.clone(),
        });
        (generation, fetch)
    }

    fn settle(
        &self,
        generation: u64,
        result: Result<OfficerList, DirectoryError>,
    ) -> Result<OfficerList, DirectoryError> {
        if let Ok(mut state) = self.state.lock() {
            let current = state
                .in_flight
                .as_ref()
                .is_some_and(|running| running.generation == generation);
            if current {
                state.in_flight = None;
                match &result {
                    Ok(officers) if !officers.is_empty() => {
                        info!(officers = officers.len(), "Officer directory cached");
                        state.officers = Some(officers.clone());
                    }
                    Ok(_) => debug!("Officer directory empty, not cached"),
                    Err(e) => warn!(error = %e, "Officer directory fetch failed"),
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::MockServices;

    fn officer(id: i64) -> Officer {
        Officer {
            id,
            username: format!("officer{id}"),
            email: format!("officer{id}@agri.gov.bd"),
            latitude: 23.8,
            longitude: 90.4,
        }
    }

    fn mock_with(officers: Vec<Officer>) -> Arc<MockServices> {
        Arc::new(
            MockServices::new()
                .with_officers(officers)
                .with_delay(Duration::from_millis(20)),
        )
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let mock = mock_with(vec![officer(1), officer(2)]);
        let cache = DirectoryCache::new(mock.clone());

        let (a, b, c) = tokio::join!(cache.officers(), cache.officers(), cache.officers());
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
        assert_eq!(c.unwrap().len(), 2);
        assert_eq!(mock.directory_calls(), 1);
        assert!(!cache.is_fetching());
    }

    #[tokio::test]
    async fn later_callers_read_the_cache() {
        let mock = mock_with(vec![officer(1)]);
        let cache = DirectoryCache::new(mock.clone());

        cache.officers().await.unwrap();
        cache.officers().await.unwrap();
        assert_eq!(mock.directory_calls(), 1);
        assert_eq!(cache.cached().map(|o| o.len()), Some(1));
    }

    #[tokio::test]
    async fn refresh_forces_new_fetch() {
        let mock = mock_with(vec![officer(1)]);
        let cache = DirectoryCache::new(mock.clone());

        cache.officers().await.unwrap();
        mock.set_officers(vec![officer(1), officer(2), officer(3)]);
        let refreshed = cache.refresh().await.unwrap();
        assert_eq!(refreshed.len(), 3);
        assert_eq!(mock.directory_calls(), 2);
        assert_eq!(cache.officers().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn superseded_fetch_does_not_write_cache() {
        let mock = mock_with(vec![officer(1)]);
        let cache = DirectoryCache::new(mock.clone());

        let (first, second) = tokio::join!(cache.officers(), async {
            tokio::task::yield_now().await;
            mock.set_officers(vec![officer(5), officer(6)]);
            cache.refresh().await
        });
        assert!(first.is_ok());
        assert_eq!(second.unwrap().len(), 2);
        assert_eq!(cache.cached().map(|o| o.len()), Some(2));
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let mock = Arc::new(MockServices::new().with_directory_error(ServiceError::Http {
            status: 503,
            message: "maintenance".into(),
        }));
        let cache = DirectoryCache::new(mock.clone());

        assert!(cache.officers().await.is_err());
        assert!(cache.cached().is_none());
        mock.set_officers(vec![officer(1)]);
        assert_eq!(cache.officers().await.unwrap().len(), 1);
        assert_eq!(mock.directory_calls(), 2);
    }

    #[tokio::test]
    async fn empty_list_is_fetched_again() {
        let mock = mock_with(vec![]);
        let cache = DirectoryCache::new(mock.clone());

        assert!(cache.officers().await.unwrap().is_empty());
        assert!(cache.officers().await.unwrap().is_empty());
        assert_eq!(mock.directory_calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_drops_cached_list() {
        let mock = mock_with(vec![officer(1)]);
        let cache = DirectoryCache::new(mock.clone());

        cache.officers().await.unwrap();
        cache.invalidate();
        assert!(cache.cached().is_none());
        cache.officers().await.unwrap();
        assert_eq!(mock.directory_calls(), 2);
    }
}
