//! Journey progress tracker
//!
//! Accumulates distance and active duration from the position samples and
//! timer ticks delivered while the journey is being tracked, and detects
//! the arrival at the destination.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::geo::{distance, Coordinate};
use crate::error::{InvalidConfigSnafu, InvalidStateTransitionSnafu, Result};

/// 50 meters
pub const DEFAULT_ARRIVAL_RADIUS_KM: f64 = 0.05;

/// Journey parameters, fixed once the journey starts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JourneyConfig {
    pub start: Coordinate,
    pub destination: Coordinate,
    /// Below this distance the destination is reached
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius_km: f64,
    /// Seconds added by each timer tick
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_arrival_radius() -> f64 {
    DEFAULT_ARRIVAL_RADIUS_KM
}

fn default_tick_seconds() -> u64 {
    1
}

impl JourneyConfig {
    pub fn new(start: Coordinate, destination: Coordinate) -> Self {
        Self {
            start,
            destination,
            arrival_radius_km: DEFAULT_ARRIVAL_RADIUS_KM,
            tick_seconds: default_tick_seconds(),
        }
    }

    pub fn arrival_radius(mut self, km: f64) -> Self {
        self.arrival_radius_km = km;

        self
    }

    pub fn tick(mut self, seconds: u64) -> Self {
        self.tick_seconds = seconds;

        self
    }

    fn validate(&self) -> Result<()> {
        if !self.start.is_valid() {
            return InvalidConfigSnafu {
                reason: format!("start {:?} is not a valid coordinate", self.start),
            }
            .fail();
        }
        if !self.destination.is_valid() {
            return InvalidConfigSnafu {
                reason: format!(
                    "destination {:?} is not a valid coordinate",
                    self.destination
                ),
            }
            .fail();
        }
        if self.start == self.destination {
            return InvalidConfigSnafu {
                reason: "start and destination are the same place",
            }
            .fail();
        }
        if !self.arrival_radius_km.is_finite() || self.arrival_radius_km <= 0.0 {
            return InvalidConfigSnafu {
                reason: format!("arrival radius {} km", self.arrival_radius_km),
            }
            .fail();
        }
        if self.tick_seconds == 0 {
            return InvalidConfigSnafu {
                reason: "tick of 0 seconds",
            }
            .fail();
        }

        Ok(())
    }
}

/// Lifecycle of a tracked journey
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
    Paused,
    Finished,
    Cancelled,
}

impl TrackerState {
    /// Finished and cancelled journeys never move again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackerState::Finished | TrackerState::Cancelled)
    }
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackerState::Idle => "idle",
            TrackerState::Tracking => "tracking",
            TrackerState::Paused => "paused",
            TrackerState::Finished => "finished",
            TrackerState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress of the journey so far
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub current_location: Coordinate,
    pub distance_km: f64,
    pub elapsed_seconds: u64,
    /// Only set by reaching the destination, never by a manual finish
    pub is_completed: bool,
    /// Chronological, starts with the journey start
    pub route: Vec<Coordinate>,
}

impl ProgressSnapshot {
    fn at(start: Coordinate) -> Self {
        Self {
            current_location: start,
            distance_km: 0.0,
            elapsed_seconds: 0,
            is_completed: false,
            route: vec![start],
        }
    }
}

/// Emitted by the tracker while handling a sample
#[derive(Clone, Debug, PartialEq)]
pub enum TrackerEvent {
    /// Destination reached, journey is finished
    Arrived(ProgressSnapshot),
}

pub struct Tracker {
    config: JourneyConfig,
    state: TrackerState,
    progress: ProgressSnapshot,
}

impl Tracker {
    /// Prepare a new journey, not yet tracking
    pub fn initialize(config: JourneyConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            progress: ProgressSnapshot::at(config.start),
            config,
            state: TrackerState::Idle,
        })
    }

    pub fn config(&self) -> &JourneyConfig {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.progress
    }

    /// Start or resume tracking
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            TrackerState::Idle | TrackerState::Paused => {
                self.move_to(TrackerState::Tracking);
                Ok(())
            }
            state => InvalidStateTransitionSnafu {
                operation: "start",
                state,
            }
            .fail(),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            TrackerState::Tracking => {
                self.move_to(TrackerState::Paused);
                Ok(())
            }
            state => InvalidStateTransitionSnafu {
                operation: "pause",
                state,
            }
            .fail(),
        }
    }

    /// Handle a new position, returns the arrival when the destination is reached
    pub fn on_position_sample(&mut self, coord: Coordinate) -> Option<TrackerEvent> {
        if self.state != TrackerState::Tracking {
            debug!("Discarded position sample {:?} while {}", coord, self.state);
            return None;
        }
        if !coord.latitude.is_finite() || !coord.longitude.is_finite() {
            debug!("Discarded non-finite position sample {:?}", coord);
            return None;
        }

        // The route is never empty, it starts with the journey start
        let last = self
            .progress
            .route
            .last()
            .copied()
            .unwrap_or(self.config.start);
        let segment = distance(last, coord);

        self.progress.route.push(coord);
        self.progress.current_location = coord;
        self.progress.distance_km += segment;

        let remaining = distance(coord, self.config.destination);
        if remaining < self.config.arrival_radius_km {
            info!(
                "Destination reached after {:.3} km, {} s",
                self.progress.distance_km, self.progress.elapsed_seconds
            );
            self.progress.is_completed = true;
            self.move_to(TrackerState::Finished);
            return Some(TrackerEvent::Arrived(self.progress.clone()));
        }

        None
    }

    /// Handle a timer tick
    pub fn on_tick(&mut self) {
        if self.state != TrackerState::Tracking {
            debug!("Discarded tick while {}", self.state);
            return;
        }

        self.progress.elapsed_seconds = self
            .progress
            .elapsed_seconds
            .saturating_add(self.config.tick_seconds);
    }

    /// End the journey before reaching the destination
    pub fn finish_manually(&mut self) -> Result<ProgressSnapshot> {
        match self.state {
            TrackerState::Tracking | TrackerState::Paused => {
                self.move_to(TrackerState::Finished);
                Ok(self.progress.clone())
            }
            state => InvalidStateTransitionSnafu {
                operation: "finish",
                state,
            }
            .fail(),
        }
    }

    /// Abandon the journey, its progress is dropped
    pub fn cancel(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return InvalidStateTransitionSnafu {
                operation: "cancel",
                state: self.state,
            }
            .fail();
        }

        self.progress = ProgressSnapshot::at(self.config.start);
        self.move_to(TrackerState::Cancelled);

        Ok(())
    }

    fn move_to(&mut self, state: TrackerState) {
        debug!("Journey {} -> {}", self.state, state);
        self.state = state;
    }
}
