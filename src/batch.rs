use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::cache::{AddressCache, CacheLookup};
use crate::config::AppConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::{AppResult, GeocodeError};
use crate::geocode::{Geocoder, NominatimClient};
use crate::model::{AddressKey, Coordinate, Property, ResolvedLocation};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolverState {
    Idle,
    Running {
        generation: u64,
        index: usize,
        total: usize,
    },
    Done {
        generation: u64,
    },
}

/// The committed output of the newest run that has finished.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSnapshot {
    pub generation: u64,
    pub total: usize,
    pub locations: Vec<ResolvedLocation>,
    pub loading: bool,
}

impl ResolutionSnapshot {
    fn empty() -> Self {
        Self {
            generation: 0,
            total: 0,
            locations: Vec::new(),
            loading: false,
        }
    }

    pub fn resolved(&self) -> usize {
        self.locations.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generation: u64,
    pub total: usize,
    pub processed: usize,
    pub resolved: usize,
    pub cache_hits: usize,
    pub lookups: usize,
    pub not_found: usize,
    pub transient: usize,
    pub duplicates: usize,
    pub superseded: bool,
    pub committed: bool,
}

/// What one `resolve_all` call produced.
///
/// `locations` is empty unless `summary.committed` is set, since a superseded run's output is
/// discarded.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub summary: RunSummary,
    pub locations: Vec<ResolvedLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionProgress {
    pub generation: u64,
    pub total: usize,
    pub processed: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone)]
pub enum ResolutionEvent {
    Located(ResolvedLocation),
    Progress(ResolutionProgress),
    Done(RunSummary),
}

pub type ResolutionObserver = Arc<dyn Fn(ResolutionEvent) + Send + Sync>;

pub struct BatchResolver {
    cache: AddressCache,
    geocoder: Arc<dyn Geocoder>,
    rate_limiter: RateLimiter,
    diagnostics: Diagnostics,
    generation: AtomicU64,
    state: Mutex<ResolverState>,
    published: Mutex<ResolutionSnapshot>,
}

impl BatchResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        cache: AddressCache,
        min_interval: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            cache,
            geocoder,
            rate_limiter: RateLimiter::new(min_interval),
            diagnostics,
            generation: AtomicU64::new(0),
            state: Mutex::new(ResolverState::Idle),
            published: Mutex::new(ResolutionSnapshot::empty()),
        }
    }

    pub fn from_config(config: &AppConfig, cache: AddressCache) -> AppResult<Self> {
        let geocoder = NominatimClient::new(config)?;
        Ok(Self::new(
            Arc::new(geocoder),
            cache,
            config.min_interval(),
            Diagnostics::new(config.diagnostics_capacity),
        ))
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn set_min_interval(&self, min_interval: Duration) {
        self.rate_limiter.set_min_interval(min_interval);
    }

    pub fn min_interval(&self) -> Duration {
        self.rate_limiter.min_interval()
    }

    pub fn state(&self) -> ResolverState {
        *self.state.lock()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state(), ResolverState::Running { .. })
    }

    pub fn snapshot(&self) -> ResolutionSnapshot {
        let mut snapshot = self.published.lock().clone();
        snapshot.loading = self.is_loading();
        snapshot
    }

    fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.latest_generation() != generation
    }

    fn set_state(&self, generation: u64, next: ResolverState) {
        let mut state = self.state.lock();
        if !self.is_superseded(generation) {
            *state = next;
        }
    }

    /// Resolves `properties` in order and commits the result if no newer run started meanwhile.
    ///
    /// Per-address failures only exclude that property. Cache hits never wait on the rate limiter.
    pub async fn resolve_all(
        &self,
        properties: &[Property],
        observer: Option<ResolutionObserver>,
    ) -> ResolutionOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let total = properties.len();
        let mut summary = RunSummary {
            generation,
            total,
            ..RunSummary::default()
        };
        let mut locations = Vec::new();
        let mut seen = HashSet::with_capacity(total);
        self.set_state(
            generation,
            ResolverState::Running {
                generation,
                index: 0,
                total,
            },
        );
        debug!(generation, total, "starting resolution run");

        for (index, property) in properties.iter().enumerate() {
            if self.is_superseded(generation) {
                summary.superseded = true;
                break;
            }
            self.set_state(
                generation,
                ResolverState::Running {
                    generation,
                    index,
                    total,
                },
            );

            if !seen.insert(property.id.as_str()) {
                debug!(generation, property_id = %property.id, "skipping duplicate property");
                summary.duplicates += 1;
            } else if let Some(coordinate) =
                self.resolve_property(generation, property, &mut summary).await
            {
                if self.is_superseded(generation) {
                    summary.superseded = true;
                    break;
                }
                let location = ResolvedLocation {
                    property: property.clone(),
                    coordinate,
                };
                trace!(generation, property_id = %property.id, ?coordinate, "property located");
                if let Some(callback) = &observer {
                    callback(ResolutionEvent::Located(location.clone()));
                }
                locations.push(location);
                summary.resolved += 1;
            }

            summary.processed += 1;
            if let Some(callback) = &observer {
                callback(ResolutionEvent::Progress(ResolutionProgress {
                    generation,
                    total,
                    processed: summary.processed,
                    resolved: summary.resolved,
                }));
            }
        }

        if !summary.superseded {
            summary.committed = self.commit(generation, total, &locations);
            summary.superseded = !summary.committed;
        }
        if summary.superseded {
            debug!(generation, "discarding output of superseded resolution run");
            locations.clear();
        } else {
            info!(
                generation,
                resolved = summary.resolved,
                total,
                lookups = summary.lookups,
                cache_hits = summary.cache_hits,
                "resolution run finished"
            );
        }

        if let Some(callback) = &observer {
            callback(ResolutionEvent::Done(summary.clone()));
        }
        ResolutionOutcome { summary, locations }
    }

    async fn resolve_property(
        &self,
        generation: u64,
        property: &Property,
        summary: &mut RunSummary,
    ) -> Option<Coordinate> {
        let key = property.address_key();
        match self.cache.lookup(&key) {
            CacheLookup::Resolved(coordinate) => {
                summary.cache_hits += 1;
                return Some(coordinate);
            }
            CacheLookup::Unresolvable => {
                summary.cache_hits += 1;
                trace!(generation, key = %key, "address cached as unresolvable");
                return None;
            }
            CacheLookup::Absent => {}
        }

        if !self
            .rate_limiter
            .acquire_if(|| !self.is_superseded(generation))
            .await
        {
            trace!(generation, key = %key, "run superseded while throttled");
            return None;
        }
        summary.lookups += 1;

        match self.geocoder.resolve(&key).await {
            Ok(coordinate) => self.settle(key, Some(coordinate)),
            Err(err) => {
                warn!(
                    generation,
                    property_id = %property.id,
                    key = %key,
                    kind = err.kind(),
                    "geocoding failed"
                );
                self.diagnostics
                    .record_failure(generation, &property.id, &key, &err);
                match err {
                    GeocodeError::NotFound => {
                        summary.not_found += 1;
                        self.settle(key, None)
                    }
                    GeocodeError::Transient(_) => {
                        summary.transient += 1;
                        None
                    }
                }
            }
        }
    }

    /// Stores a lookup outcome and returns whatever the cache holds afterwards.
    fn settle(&self, key: AddressKey, value: Option<Coordinate>) -> Option<Coordinate> {
        if self.cache.store(key.clone(), value) {
            return value;
        }
        match self.cache.lookup(&key) {
            CacheLookup::Resolved(existing) => Some(existing),
            CacheLookup::Unresolvable | CacheLookup::Absent => None,
        }
    }

    fn commit(&self, generation: u64, total: usize, locations: &[ResolvedLocation]) -> bool {
        let mut published = self.published.lock();
        if self.is_superseded(generation) || published.generation >= generation {
            return false;
        }
        *published = ResolutionSnapshot {
            generation,
            total,
            locations: locations.to_vec(),
            loading: false,
        };
        self.set_state(generation, ResolverState::Done { generation });
        true
    }
}
