#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Keyed, single-flight cache of loaded datasets.
//!
//! Each distinct [`LoadConfig`] maps to a slot. The first requester for a
//! key holds the slot's lock while ingestion runs; anyone else asking for
//! the same key blocks on that lock and then reads the finished dataset,
//! so a key is never ingested twice concurrently. Different keys load
//! independently.
//!
//! There is no eviction. Entries live until [`DatasetCache::invalidate`]
//! or [`DatasetCache::clear`] is called or the cache is dropped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use road_safety_accident_models::Dataset;
use road_safety_ingest::{DatasetLoader, IngestError};
use road_safety_ingest_models::LoadConfig;

/// Per-key state: `None` until a load succeeds.
///
/// The mutex doubles as the in-flight marker. Holding it means a load for
/// this key is running.
type Slot = Mutex<Option<Arc<Dataset>>>;

/// Process-lifetime store of datasets keyed by load configuration.
pub struct DatasetCache {
    loader: Arc<dyn DatasetLoader>,
    slots: Mutex<BTreeMap<LoadConfig, Arc<Slot>>>,
    loads: AtomicU64,
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("keys", &self.len())
            .field("loads", &self.load_count())
            .finish_non_exhaustive()
    }
}

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// Slots only ever transition from `None` to `Some`, so a panic mid-load
/// leaves them in a valid (empty) state. Such a slot stays in the map and
/// the next request for its key loads again.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DatasetCache {
    /// Creates an empty cache that ingests through `loader`.
    #[must_use]
    pub fn new(loader: Arc<dyn DatasetLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(BTreeMap::new()),
            loads: AtomicU64::new(0),
        }
    }

    /// Returns the dataset for `config`, loading it on first request.
    ///
    /// Repeated calls with an equal config return the same [`Arc`] without
    /// touching the source. Concurrent first calls for one key run the
    /// loader once; the others wait for it.
    ///
    /// A failed load is not cached: the error goes to the caller whose
    /// attempt failed, and the next request for the key tries again.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`IngestError`] if ingestion fails.
    pub fn get_or_load(&self, config: &LoadConfig) -> Result<Arc<Dataset>, IngestError> {
        loop {
            let slot = {
                let mut slots = lock(&self.slots);
                Arc::clone(slots.entry(config.clone()).or_default())
            };

            let mut state = lock(&*slot);

            if let Some(dataset) = state.as_ref() {
                log::debug!("Dataset cache hit for {}", config.source.path.display());
                return Ok(Arc::clone(dataset));
            }

            // Retired by a failed load or an invalidation while we waited.
            if !self.is_current(config, &slot) {
                continue;
            }

            log::info!(
                "Dataset cache miss for {}, loading",
                config.source.path.display()
            );
            self.loads.fetch_add(1, Ordering::Relaxed);

            return match self.loader.load(config) {
                Ok(dataset) => {
                    let dataset = Arc::new(dataset);
                    *state = Some(Arc::clone(&dataset));
                    Ok(dataset)
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {e}", config.source.path.display());
                    self.retire(config, &slot);
                    Err(e)
                }
            };
        }
    }

    /// Returns the dataset for `config` only if it is already loaded.
    ///
    /// Blocks while a load for the key is in flight.
    #[must_use]
    pub fn get(&self, config: &LoadConfig) -> Option<Arc<Dataset>> {
        let slot = lock(&self.slots).get(config).map(Arc::clone)?;
        let state = lock(&*slot);
        state.as_ref().map(Arc::clone)
    }

    /// Forgets the entry for `config`. Returns whether an entry existed.
    ///
    /// Blocks while a load for the key is in flight and forgets its result,
    /// so a request made after this returns never overlaps that load.
    /// Callers still holding the old dataset keep it; the next request
    /// for the key loads a fresh copy.
    pub fn invalidate(&self, config: &LoadConfig) -> bool {
        let Some(slot) = lock(&self.slots).get(config).map(Arc::clone) else {
            return false;
        };
        let _state = lock(&*slot);
        self.retire(config, &slot)
    }

    /// Forgets every entry, waiting for in-flight loads like
    /// [`Self::invalidate`].
    pub fn clear(&self) {
        let slots: Vec<(LoadConfig, Arc<Slot>)> = lock(&self.slots)
            .iter()
            .map(|(config, slot)| (config.clone(), Arc::clone(slot)))
            .collect();

        for (config, slot) in slots {
            let _state = lock(&*slot);
            self.retire(&config, &slot);
        }
    }

    /// Whether `slot` is still the one stored for `config`.
    fn is_current(&self, config: &LoadConfig, slot: &Arc<Slot>) -> bool {
        lock(&self.slots)
            .get(config)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Removes `slot` from the map if it is still the one stored for
    /// `config`.
    ///
    /// Callers hold the slot's lock. The map lock is never held while
    /// waiting on a slot lock.
    fn retire(&self, config: &LoadConfig, slot: &Arc<Slot>) -> bool {
        let mut slots = lock(&self.slots);
        if slots
            .get(config)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(config);
            true
        } else {
            false
        }
    }

    /// Number of keys loaded or in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Whether no key has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the loader has been invoked.
    #[must_use]
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use road_safety_accident_models::{AccidentRecord, AccidentSeverity};
    use road_safety_ingest_models::{LoadParameters, SourceIdentity};

    /// Loader that counts invocations and can be told to fail.
    struct CountingLoader {
        calls: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
        fail_first: bool,
        delay: Duration,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_first: false,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Most loads that were ever running at the same time.
        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    impl DatasetLoader for CountingLoader {
        fn load(&self, config: &LoadConfig) -> Result<Dataset, IngestError> {
            let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(IngestError::SourceNotFound {
                    path: config.source.path.display().to_string(),
                });
            }
            let rows = usize::try_from(config.params.row_cap).unwrap();
            let records = (0..rows)
                .map(|_| {
                    AccidentRecord::new(AccidentSeverity::Minor, None, 1.0, 2.0, "Dayton", "OH")
                })
                .collect();
            Ok(Dataset::new(records, vec!["City".to_string()]))
        }
    }

    fn config(path: &str, row_cap: u64) -> LoadConfig {
        LoadConfig {
            source: SourceIdentity::csv(path),
            params: LoadParameters::new(row_cap),
        }
    }

    #[test]
    fn second_request_reuses_the_same_dataset() {
        let loader = Arc::new(CountingLoader::new());
        let cache = DatasetCache::new(loader.clone());

        let first = cache.get_or_load(&config("a.csv", 3)).unwrap();
        let second = cache.get_or_load(&config("a.csv", 3)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
        assert_eq!(loader.calls(), 1);
        assert_eq!(cache.load_count(), 1);
    }

    #[test]
    fn distinct_parameters_load_separately() {
        let loader = Arc::new(CountingLoader::new());
        let cache = DatasetCache::new(loader.clone());

        let small = cache.get_or_load(&config("a.csv", 2)).unwrap();
        let large = cache.get_or_load(&config("a.csv", 5)).unwrap();
        let other = cache.get_or_load(&config("b.csv", 2)).unwrap();

        assert_eq!(small.len(), 2);
        assert_eq!(large.len(), 5);
        assert!(!Arc::ptr_eq(&small, &other));
        assert_eq!(loader.calls(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..CountingLoader::new()
        });
        let cache = DatasetCache::new(loader.clone());

        let err = cache.get_or_load(&config("a.csv", 1)).unwrap_err();
        assert!(matches!(err, IngestError::SourceNotFound { .. }));
        assert!(cache.get(&config("a.csv", 1)).is_none());
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&config("a.csv", 1)));

        let dataset = cache.get_or_load(&config("a.csv", 1)).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(loader.calls(), 2);
    }

    #[test]
    fn concurrent_first_requests_load_once() {
        const THREADS: usize = 8;

        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(50),
            ..CountingLoader::new()
        });
        let cache = DatasetCache::new(loader.clone());
        let barrier = Barrier::new(THREADS);
        let key = config("a.csv", 4);

        let datasets: Vec<Arc<Dataset>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_or_load(&key).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(loader.calls(), 1);
        for dataset in &datasets {
            assert!(Arc::ptr_eq(dataset, &datasets[0]));
        }
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let loader = Arc::new(CountingLoader::new());
        let cache = DatasetCache::new(loader.clone());
        let key = config("a.csv", 1);

        let first = cache.get_or_load(&key).unwrap();
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        let second = cache.get_or_load(&key).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(loader.calls(), 2);
    }

    #[test]
    fn waiters_retry_after_a_failed_load() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            delay: Duration::from_millis(50),
            ..CountingLoader::new()
        });
        let cache = DatasetCache::new(loader.clone());
        let key = config("a.csv", 2);

        let (first, second) = std::thread::scope(|s| {
            let first = s.spawn(|| cache.get_or_load(&key));
            while loader.calls() == 0 {
                std::thread::yield_now();
            }
            let second = s.spawn(|| cache.get_or_load(&key));
            (first.join().unwrap(), second.join().unwrap())
        });

        assert!(first.is_err());
        let second = second.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &second));
        assert_eq!(loader.calls(), 2);
    }

    #[test]
    fn invalidate_waits_for_in_flight_load() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(100),
            ..CountingLoader::new()
        });
        let cache = DatasetCache::new(loader.clone());
        let key = config("a.csv", 1);

        let (stale, fresh) = std::thread::scope(|s| {
            let in_flight = s.spawn(|| cache.get_or_load(&key).unwrap());
            while loader.calls() == 0 {
                std::thread::yield_now();
            }

            assert!(cache.invalidate(&key));
            assert!(cache.is_empty());
            assert_eq!(loader.calls(), 1);

            let fresh = cache.get_or_load(&key).unwrap();
            (in_flight.join().unwrap(), fresh)
        });

        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(loader.calls(), 2);
        assert_eq!(loader.peak(), 1);
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn clear_waits_for_in_flight_loads() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(100),
            ..CountingLoader::new()
        });
        let cache = DatasetCache::new(loader.clone());

        std::thread::scope(|s| {
            let in_flight = s.spawn(|| cache.get_or_load(&config("a.csv", 1)).unwrap());
            while loader.calls() == 0 {
                std::thread::yield_now();
            }

            cache.clear();
            assert!(cache.is_empty());
            cache.get_or_load(&config("a.csv", 1)).unwrap();
            in_flight.join().unwrap();
        });

        assert_eq!(loader.peak(), 1);
        assert_eq!(loader.calls(), 2);
    }

    #[test]
    fn csv_loader_reads_declared_columns_from_zip_once() {
        use std::io::Write as _;

        use road_safety_accident_models::Field;
        use road_safety_ingest::CsvDatasetLoader;

        let dir = std::env::temp_dir().join("road_safety_cache_zip");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("accidents.zip");

        let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"not data").unwrap();
        writer.start_file("accidents.csv", options).unwrap();
        writer
            .write_all(
                b"ID,Severity,Start_Time,Start_Lat,Start_Lng,Description,Street,City,State,Zipcode,Weather_Condition\n\
                  A-1,2,2016-02-08 05:46:00,39.8,-84.0,Right lane blocked,I-70 E,Dayton,OH,45424,Light Rain\n\
                  A-2,3,2016-02-08 06:07:59,39.9,-82.8,Accident on Brice Rd,Brice Rd,Reynoldsburg,OH,43068,Overcast\n\
                  A-3,,2016-02-08 06:49:27,39.1,-84.0,Missing severity,State Route 32,Williamsburg,OH,45176,Overcast\n",
            )
            .unwrap();
        writer.finish().unwrap();

        let declared = [
            "Severity",
            "Start_Time",
            "Start_Lat",
            "Start_Lng",
            "City",
            "State",
            "Weather_Condition",
        ];
        let key = LoadConfig {
            source: SourceIdentity::zip(&path, Some("accidents.csv".to_string())),
            params: LoadParameters::new(100)
                .with_declared_columns(declared)
                .with_required_fields([Field::City, Field::State]),
        };

        let cache = DatasetCache::new(Arc::new(CsvDatasetLoader));
        let first = cache.get_or_load(&key).unwrap();
        let second = cache.get_or_load(&key).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 1);
        assert_eq!(first.len(), 2);
        assert_eq!(first.columns(), declared);
        assert!(!first.has_field(Field::Street));
        assert_eq!(
            first.records()[1].weather_condition.as_deref(),
            Some("Overcast")
        );
    }

    #[test]
    fn get_does_not_load() {
        let loader = Arc::new(CountingLoader::new());
        let cache = DatasetCache::new(loader.clone());

        assert!(cache.get(&config("a.csv", 1)).is_none());
        assert_eq!(loader.calls(), 0);
        assert!(cache.is_empty());

        cache.get_or_load(&config("a.csv", 1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
