//! In-process key-value trip store

use std::collections::BTreeMap;

use super::{newest_first, TripRecord, TripStore};

/// Trips kept in memory, keyed by user. Stands in for the device local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    trips: BTreeMap<String, Vec<TripRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trips.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every trip of the user
    pub fn clear(&mut self, user_id: &str) {
        self.trips.remove(user_id);
    }
}

impl TripStore for MemoryStore {
    fn submit(&mut self, record: &TripRecord) -> Result<(), String> {
        if record.user_id.is_empty() {
            return Err("No user provided for the trip".to_string());
        }

        self.trips
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());

        Ok(())
    }

    fn trips(&mut self, user_id: Option<&str>) -> Result<Vec<TripRecord>, String> {
        let mut trips: Vec<TripRecord> = match user_id {
            Some(uid) => self.trips.get(uid).cloned().unwrap_or_default(),
            None => self.trips.values().flatten().cloned().collect(),
        };
        newest_first(&mut trips);

        Ok(trips)
    }
}
