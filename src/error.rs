//! Journey errors

use snafu::Snafu;

use crate::{TrackerState, TripRecord};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum JourneyError {
    // Rejected before tracking starts
    #[snafu(display("Invalid journey configuration: {reason}"))]
    InvalidConfig { reason: String },

    // Lifecycle misuse, caller's bug
    #[snafu(display("Cannot {operation} a journey while {state}"))]
    InvalidStateTransition {
        operation: &'static str,
        state: TrackerState,
    },

    // The trip was computed but the store refused it
    #[snafu(display("Failed on persist the trip ({record}): {reason}"))]
    PersistenceFailed {
        record: Box<TripRecord>,
        reason: String,
    },
}

impl JourneyError {
    /// Trip computed before the failure, if any
    pub fn record(&self) -> Option<&TripRecord> {
        match self {
            JourneyError::PersistenceFailed { record, .. } => Some(record),
            _ => None,
        }
    }
}

pub type Result<T, E = JourneyError> = std::result::Result<T, E>;
