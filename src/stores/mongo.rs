//! Mongodb trip store integration

use bson::{doc, Bson, DateTime, Document};
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::sync::Collection;
use time::format_description::well_known;
use time::OffsetDateTime;

use super::{TripRecord, TripStore};

/// MongoDB trips store
pub struct MongoTripStore {
    trips: Collection<Document>,
    users: Option<Collection<Document>>,
}

impl MongoTripStore {
    pub fn new(trips: Collection<Document>) -> Self {
        Self { trips, users: None }
    }

    /// Also keep the running totals of each user on this collection
    pub fn with_users(mut self, users: Collection<Document>) -> Self {
        self.users = Some(users);

        self
    }
}

impl TripStore for MongoTripStore {
    fn submit(&mut self, record: &TripRecord) -> Result<(), String> {
        let duration = record.duration_seconds as i64;
        let points = record.points as i64;
        let doc = doc! {
            "userId": record.user_id.clone(),
            "tripDate": DateTime::from_time_0_3(record.completed_at),
            "distanceKm": record.distance_km,
            "durationSeconds": duration,
            "points": points,
            "co2SavedKg": record.co2_saved_kg,
            "routeName": record.route_label.clone(),
            "averageSpeedKmh": record.average_speed_kmh(),
        };
        self.trips
            .insert_one(doc, None)
            .map_err(|e| format!("Failed on insert the trip: {}", e))?;

        if let Some(users) = &self.users {
            let update = doc! {
                "$inc": {
                    "totalDistanceKm": record.distance_km,
                    "totalTrips": 1_i64,
                    "totalPoints": points,
                    "co2SavedKg": record.co2_saved_kg,
                }
            };
            let options = UpdateOptions::builder().upsert(true).build();
            users
                .update_one(doc! { "_id": record.user_id.clone() }, update, options)
                .map_err(|e| format!("Failed on update the user stats: {}", e))?;
        }

        Ok(())
    }

    fn trips(&mut self, user_id: Option<&str>) -> Result<Vec<TripRecord>, String> {
        let filter = match user_id {
            Some(uid) => doc! { "userId": uid },
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "tripDate": -1 }).build();

        let cursor = self
            .trips
            .find(filter, options)
            .map_err(|e| format!("Failed on fetch the trips: {}", e))?;

        let mut trips = vec![];
        for rdoc in cursor {
            let doc = rdoc.map_err(|e| format!("Failed on read some trip: {}", e))?;

            let trip = match parse_doc(&doc) {
                Ok(t) => Ok(t),
                Err(e) => Err(format!("Error with trip {:?}: {}", doc.get("_id"), e)),
            }?;

            trips.push(trip);
        }

        Ok(trips)
    }
}

fn parse_doc(doc: &Document) -> Result<TripRecord, String> {
    let user_id = match doc.get("userId") {
        Some(Bson::String(u)) => Ok(u.clone()),
        Some(Bson::Int32(u)) => Ok(u.to_string()),
        Some(Bson::Int64(u)) => Ok(u.to_string()),
        Some(_) => Err("User field type not supported"),
        None => Err("User field not found"),
    }?;

    let distance_km = number(doc, "distanceKm")?.unwrap_or(0.0);
    let duration_seconds = number(doc, "durationSeconds")?.unwrap_or(0.0).max(0.0) as u64;

    // Older documents may miss the derived values
    let points = match number(doc, "points")? {
        Some(p) => p.max(0.0) as u64,
        None => crate::journey::reward::points_for(distance_km),
    };
    let co2_saved_kg = match number(doc, "co2SavedKg")? {
        Some(c) => c,
        None => crate::journey::reward::co2_saved_for(distance_km),
    };

    let route_label = match doc.get("routeName") {
        Some(Bson::String(r)) => r.clone(),
        _ => "Unknown".to_string(),
    };

    let completed_at = match doc.get("tripDate") {
        Some(Bson::String(tm)) => OffsetDateTime::parse(tm, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the trip date: {}", e)),
        Some(Bson::DateTime(tm)) => Ok(tm.to_time_0_3()),
        Some(Bson::Timestamp(tm)) => OffsetDateTime::from_unix_timestamp(tm.time.into())
            .map_err(|e| format!("Failed on parse the trip timestamp: {}", e)),
        Some(_) => Err("Trip date field type not supported".to_string()),
        None => Err("Trip date field not found".to_string()),
    }?;

    Ok(TripRecord {
        user_id,
        distance_km,
        duration_seconds,
        points,
        co2_saved_kg,
        route_label,
        completed_at,
    })
}

fn number(doc: &Document, field: &str) -> Result<Option<f64>, String> {
    match doc.get(field) {
        Some(Bson::Double(n)) => Ok(Some(*n)),
        Some(Bson::Int32(n)) => Ok(Some(*n as f64)),
        Some(Bson::Int64(n)) => Ok(Some(*n as f64)),
        Some(Bson::Null) | None => Ok(None),
        Some(_) => Err(format!("Invalid type of `{}`", field)),
    }
}
