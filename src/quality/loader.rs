//! Runs the assembler over the whole catalog and keeps the latest result set.
//!
//! Each refresh gets a generation number. Starting a refresh aborts the tasks of
//! the one before it, and only the newest generation may publish its results, so
//! a slow earlier batch can never overwrite a later one.

use super::{fallback_pollutants, AssembledCity, ClassificationProfile, CityAssembler, ReadingSource};
use super::{generate_history, HistoryProfile};
use crate::error::{AppError, Result};
use crate::models::{City, CityMetadata, Trend};
use crate::quality::history::round_to_u32;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinError};
use tracing::{error, info, warn};

/// Banner text shown when any city had to be synthesized.
pub const DEGRADED_DATA_WARNING: &str = "data shown may be default values";

/// One published result set.
#[derive(Debug, Clone)]
pub struct FleetSnapshot {
    /// Cities in catalog order.
    pub cities: Vec<City>,
    /// Set when at least one city needed synthesized data.
    pub error: Option<String>,
    /// Ids of the cities that were synthesized.
    pub synthesized: Vec<String>,
    pub generation: u64,
    pub completed_at: DateTime<Utc>,
}

impl FleetSnapshot {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// What a call to [`FleetLoader::refresh`] ended with.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Completed(FleetSnapshot),
    /// A newer refresh started before this one finished; nothing was published.
    Superseded { generation: u64 },
}

#[derive(Default)]
struct FleetState {
    snapshot: Option<FleetSnapshot>,
    loading: bool,
}

/// Loads every catalog city concurrently and holds the latest snapshot.
pub struct FleetLoader {
    assembler: Arc<CityAssembler>,
    catalog: Arc<Vec<CityMetadata>>,
    state: Mutex<FleetState>,
    generation: AtomicU64,
    in_flight: Mutex<Vec<AbortHandle>>,
}

impl FleetLoader {
    pub fn new(assembler: Arc<CityAssembler>, catalog: Vec<CityMetadata>) -> Self {
        Self {
            assembler,
            catalog: Arc::new(catalog),
            state: Mutex::new(FleetState::default()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog(&self) -> &[CityMetadata] {
        &self.catalog
    }

    pub fn assembler(&self) -> &Arc<CityAssembler> {
        &self.assembler
    }

    /// True while a refresh is running.
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// The latest published snapshot, if any refresh has completed.
    pub fn snapshot(&self) -> Option<FleetSnapshot> {
        self.state().snapshot.clone()
    }

    /// Cities from the latest snapshot (empty before the first refresh).
    pub fn cities(&self) -> Vec<City> {
        self.state()
            .snapshot
            .as_ref()
            .map(|s| s.cities.clone())
            .unwrap_or_default()
    }

    /// Warning from the latest snapshot.
    pub fn error(&self) -> Option<String> {
        self.state().snapshot.as_ref().and_then(|s| s.error.clone())
    }

    /// Re-runs the whole batch and replaces the previous result set.
    ///
    /// Never fails: every city ends up with a reading, live or synthesized.
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state().loading = true;
        let _batch = BatchGuard {
            loader: self,
            generation,
        };
        info!(
            "Refresh #{} started for {} cities",
            generation,
            self.catalog.len()
        );
        let purged = self.assembler.cache().purge_expired();
        if purged > 0 {
            info!("Refresh #{} dropped {} stale fallback values", generation, purged);
        }

        let handles = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = in_flight.len();
            for handle in in_flight.drain(..) {
                handle.abort();
            }
            if previous > 0 {
                info!("Refresh #{} aborting {} in-flight tasks", generation, previous);
            }

            let handles: Vec<_> = self
                .catalog
                .iter()
                .cloned()
                .map(|info| {
                    let assembler = self.assembler.clone();
                    tokio::spawn(async move { assembler.assemble(&info).await })
                })
                .collect();
            in_flight.extend(handles.iter().map(|h| h.abort_handle()));
            handles
        };

        let results = join_all(handles).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Refresh #{} superseded, discarding results", generation);
            return RefreshOutcome::Superseded { generation };
        }

        let mut cities = Vec::with_capacity(results.len());
        let mut synthesized = Vec::new();
        for (info, result) in self.catalog.iter().zip(results) {
            match flatten(result) {
                Ok(AssembledCity { city, source }) => {
                    if source == ReadingSource::Fallback {
                        synthesized.push(info.id.clone());
                    }
                    cities.push(city);
                },
                Err(e) => {
                    error!("Could not assemble {}: {}. Using minimal fallback", info.id, e);
                    synthesized.push(info.id.clone());
                    cities.push(self.minimal_fallback(info));
                },
            }
        }

        let error = if synthesized.is_empty() {
            None
        } else {
            warn!(
                "{} of {} cities synthesized: {:?}",
                synthesized.len(),
                cities.len(),
                synthesized
            );
            Some(format!(
                "{} of {} cities could not be loaded live; {}",
                synthesized.len(),
                cities.len(),
                DEGRADED_DATA_WARNING
            ))
        };

        let snapshot = FleetSnapshot {
            cities,
            error,
            synthesized,
            generation,
            completed_at: self.assembler.clock().now(),
        };

        {
            let mut state = self.state();
            // Re-check under the lock: a newer refresh may have started meanwhile.
            if self.generation.load(Ordering::SeqCst) != generation {
                info!("Refresh #{} superseded, discarding results", generation);
                return RefreshOutcome::Superseded { generation };
            }
            state.snapshot = Some(snapshot.clone());
            state.loading = false;
        }
        info!(
            "Refresh #{} completed: {} cities, {} synthesized",
            generation,
            snapshot.cities.len(),
            snapshot.synthesized.len()
        );
        RefreshOutcome::Completed(snapshot)
    }

    /// Bare-bones record used when assembly itself failed: a fresh fallback draw
    /// in `[40, 80)`, no cache interaction.
    fn minimal_fallback(&self, info: &CityMetadata) -> City {
        let random = self.assembler.random();
        let now = self.assembler.clock().now();
        let value = random.uniform(40.0, 80.0);
        let aqi = round_to_u32(value);
        let trend = if random.next_f64() > 0.5 {
            Trend::Improving
        } else {
            Trend::Stable
        };
        let history = generate_history(
            value,
            self.assembler.history_days(),
            now.date_naive(),
            &HistoryProfile::LIVE,
            random,
        );
        City {
            info: info.clone(),
            air_quality: ClassificationProfile::Fallback.classify(aqi as f64).reading(
                aqi,
                fallback_pollutants(value),
                now,
                trend,
                history,
            ),
        }
    }
}

/// Ends a batch however `refresh` exits, including when its future is dropped.
///
/// Only acts while its generation is still the newest one: clears the loading
/// flag and aborts whatever tasks of the batch are still running.
struct BatchGuard<'a> {
    loader: &'a FleetLoader,
    generation: u64,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.loader.state();
        if self.loader.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        if state.loading {
            state.loading = false;
            warn!("Refresh #{} abandoned before completing", self.generation);
        }
        drop(state);

        let mut in_flight = self
            .loader
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.loader.generation.load(Ordering::SeqCst) == self.generation {
            for handle in in_flight.drain(..) {
                handle.abort();
            }
        }
    }
}

fn flatten(result: std::result::Result<Result<AssembledCity>, JoinError>) -> Result<AssembledCity> {
    match result {
        Ok(inner) => inner,
        Err(e) if e.is_cancelled() => Err(AppError::Assembly("task cancelled".into())),
        Err(e) => Err(AppError::Assembly(format!("task panicked: {}", e))),
    }
}
