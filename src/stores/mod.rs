//! Trip stores API

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::journey::reward::{co2_saved_for, points_for};
use crate::ProgressSnapshot;

/// A finished journey, as persisted by the stores
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Authenticated rider, opaque
    pub user_id: String,
    pub distance_km: f64,
    pub duration_seconds: u64,
    pub points: u64,
    pub co2_saved_kg: f64,
    /// Usually the destination name
    pub route_label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl TripRecord {
    /// Build the trip with the rewards over the journey progress
    pub fn from_snapshot(
        user_id: &str,
        route_label: &str,
        snapshot: &ProgressSnapshot,
        completed_at: OffsetDateTime,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            distance_km: snapshot.distance_km,
            duration_seconds: snapshot.elapsed_seconds,
            points: points_for(snapshot.distance_km),
            co2_saved_kg: co2_saved_for(snapshot.distance_km),
            route_label: route_label.to_string(),
            completed_at,
        }
    }

    pub fn average_speed_kmh(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }

        self.distance_km / (self.duration_seconds as f64 / 3600.0)
    }
}

impl fmt::Display for TripRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} km in {}:{:02}, {} points, {:.1} kg CO2 saved",
            self.distance_km,
            self.duration_seconds / 60,
            self.duration_seconds % 60,
            self.points,
            self.co2_saved_kg
        )
    }
}

/// Trip persistence backend
pub trait TripStore {
    /// Persist a finished trip
    fn submit(&mut self, record: &TripRecord) -> Result<(), String>;

    /// Stored trips, newest first, of one user or of everybody
    fn trips(&mut self, user_id: Option<&str>) -> Result<Vec<TripRecord>, String>;
}

impl<T: TripStore + ?Sized> TripStore for Box<T> {
    fn submit(&mut self, record: &TripRecord) -> Result<(), String> {
        (**self).submit(record)
    }

    fn trips(&mut self, user_id: Option<&str>) -> Result<Vec<TripRecord>, String> {
        (**self).trips(user_id)
    }
}

pub(crate) fn newest_first(trips: &mut [TripRecord]) {
    trips.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
}

mod memory;

pub use memory::MemoryStore;

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::CsvTripStore;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::MongoTripStore;
