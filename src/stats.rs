//! Rider totals and leaderboard

use std::collections::BTreeMap;

use serde::Serialize;

use crate::TripRecord;

/// Running totals of one rider
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_trips: u64,
    pub total_distance_km: f64,
    pub total_points: u64,
    pub co2_saved_kg: f64,
}

impl UserStats {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// Totals over the trips of `user_id`, others are skipped
    pub fn from_trips(user_id: &str, trips: &[TripRecord]) -> Self {
        let mut stats = Self::new(user_id);
        for trip in trips.iter().filter(|t| t.user_id == user_id) {
            stats.add(trip);
        }

        stats
    }

    pub fn add(&mut self, trip: &TripRecord) {
        self.total_trips += 1;
        self.total_distance_km += trip.distance_km;
        self.total_points += trip.points;
        self.co2_saved_kg += trip.co2_saved_kg;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1 is the best
    pub position: usize,
    pub stats: UserStats,
}

/// Rank the riders by points, then distance. At most `limit` entries.
pub fn leaderboard(trips: &[TripRecord], limit: usize) -> Vec<LeaderboardEntry> {
    let mut riders: BTreeMap<&str, UserStats> = BTreeMap::new();
    for trip in trips {
        riders
            .entry(trip.user_id.as_str())
            .or_insert_with(|| UserStats::new(&trip.user_id))
            .add(trip);
    }

    // BTreeMap order keeps ties sorted by user id
    let mut ranking: Vec<UserStats> = riders.into_values().collect();
    ranking.sort_by(|a, b| {
        b.total_points.cmp(&a.total_points).then_with(|| {
            b.total_distance_km
                .partial_cmp(&a.total_distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    ranking
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, stats)| LeaderboardEntry {
            position: i + 1,
            stats,
        })
        .collect()
}

/// Routes `user_id` rode the most, with their trip count. Most ridden
/// first, ties by label. At most `limit` routes.
pub fn popular_routes(trips: &[TripRecord], user_id: &str, limit: usize) -> Vec<(String, usize)> {
    let mut routes: BTreeMap<&str, usize> = BTreeMap::new();
    for trip in trips.iter().filter(|t| t.user_id == user_id) {
        *routes.entry(trip.route_label.as_str()).or_default() += 1;
    }

    let mut counted: Vec<(String, usize)> = routes
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    // stable sort, labels stay ascending within a count
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted.truncate(limit);

    counted
}
