//! Journey tracking: distance, duration, arrival and rewards

pub mod feed;
pub mod geo;
pub mod gpx;
pub mod reward;
pub mod session;
pub mod tracker;
