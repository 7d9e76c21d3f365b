//! CSV file trip store

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use csv::{ReaderBuilder, WriterBuilder};

use super::{newest_first, TripRecord, TripStore};

/// Append-only CSV trip log
pub struct CsvTripStore {
    path: PathBuf,
}

impl CsvTripStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl TripStore for CsvTripStore {
    fn submit(&mut self, record: &TripRecord) -> Result<(), String> {
        let fresh = match self.path.metadata() {
            Ok(m) => m.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| format!("Failed on open the trips file: {}", e))?;

        let mut wtr = WriterBuilder::new().has_headers(fresh).from_writer(file);
        wtr.serialize(record)
            .map_err(|e| format!("Failed on write the trip: {}", e))?;
        wtr.flush()
            .map_err(|e| format!("Failed on flush the trips file: {}", e))?;

        Ok(())
    }

    fn trips(&mut self, user_id: Option<&str>) -> Result<Vec<TripRecord>, String> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file =
            File::open(&self.path).map_err(|e| format!("Failed on open the trips file: {}", e))?;
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut trips = vec![];
        for (i, row) in rdr.deserialize::<TripRecord>().enumerate() {
            let trip = row.map_err(|e| format!("Error with trip row {}: {}", i + 1, e))?;

            if user_id.map_or(true, |uid| uid == trip.user_id) {
                trips.push(trip);
            }
        }
        newest_first(&mut trips);

        Ok(trips)
    }
}
