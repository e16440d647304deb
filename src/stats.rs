//! Offline-state summary for display.

use crate::path_trace::PathTraceStore;
use crate::queue::OfflineQueueStore;
use crate::settings::SettingsStore;
use crate::types::OfflineStats;

#[derive(Clone)]
pub struct StatsAggregator {
    queue: OfflineQueueStore,
    path: PathTraceStore,
    settings: SettingsStore,
}

impl StatsAggregator {
    pub fn new(queue: OfflineQueueStore, path: PathTraceStore, settings: SettingsStore) -> Self {
        Self {
            queue,
            path,
            settings,
        }
    }

    /// Counts read fresh from the store on every call.
    pub fn snapshot(&self) -> OfflineStats {
        let samples = self.queue.all();
        let unsynced = samples.iter().filter(|s| !s.synced).count();

        OfflineStats {
            total_offline_locations: samples.len() as u32,
            unsynced_locations: unsynced as u32,
            synced_locations: (samples.len() - unsynced) as u32,
            path_points: self.path.len() as u32,
            settings: self.settings.get(),
        }
    }
}
