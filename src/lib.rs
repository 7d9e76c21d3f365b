//! bikejourney - bicycle commute journey tracker

mod error;
pub mod journey;
pub mod stats;
pub mod stores;

pub use error::{JourneyError, Result};
pub use journey::feed::{JourneyFeed, LocationSender, Tick, TimerSender};
pub use journey::geo::{distance, Coordinate};
pub use journey::gpx::RouteGpx;
pub use journey::reward::{co2_saved_for, points_for};
pub use journey::session::{JourneySession, Rider};
pub use journey::tracker::{
    JourneyConfig, ProgressSnapshot, Tracker, TrackerEvent, TrackerState,
    DEFAULT_ARRIVAL_RADIUS_KM,
};
pub use stats::{leaderboard, popular_routes, LeaderboardEntry, UserStats};
pub use stores::{MemoryStore, TripRecord, TripStore};
