//! Journey session: one tracked journey and the recording of its trip

use log::{error, info};
use time::OffsetDateTime;

use super::geo::Coordinate;
use super::tracker::{JourneyConfig, ProgressSnapshot, Tracker, TrackerEvent, TrackerState};
use crate::error::{InvalidStateTransitionSnafu, PersistenceFailedSnafu, Result};
use crate::{TripRecord, TripStore};

/// Who rides and where to
#[derive(Clone, Debug, PartialEq)]
pub struct Rider {
    /// Identity from the authentication provider
    pub user_id: String,
    /// Destination name shown in the history
    pub route_label: String,
}

impl Rider {
    pub fn new(user_id: &str, route_label: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            route_label: route_label.to_string(),
        }
    }
}

type TransitionHook = Box<dyn FnMut(TrackerState, TrackerState)>;

/// Owns the tracker of one journey and hands the finished trip to the store
pub struct JourneySession<S: TripStore> {
    tracker: Tracker,
    rider: Rider,
    store: S,
    recorded: bool,
    hook: Option<TransitionHook>,
}

impl<S: TripStore> JourneySession<S> {
    /// Initialize the journey and start tracking right away
    pub fn begin(config: JourneyConfig, rider: Rider, store: S) -> Result<Self> {
        let mut tracker = Tracker::initialize(config)?;
        tracker.start()?;

        info!(
            "Journey of `{}` to `{}` started",
            rider.user_id, rider.route_label
        );

        Ok(Self {
            tracker,
            rider,
            store,
            recorded: false,
            hook: None,
        })
    }

    /// Called on every later state change, with the previous and the new state.
    ///
    /// The owner must stop the location stream and the timer when the
    /// journey leaves `Tracking`, and restore them when it comes back.
    pub fn on_transition<F>(mut self, hook: F) -> Self
    where
        F: FnMut(TrackerState, TrackerState) + 'static,
    {
        self.hook = Some(Box::new(hook));

        self
    }

    pub fn state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        self.tracker.snapshot()
    }

    pub fn rider(&self) -> &Rider {
        &self.rider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Access to the store, eg.: to retry a failed persistence
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Release the session, giving back the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Feed a position, returns the trip when it completes the journey
    pub fn on_position_sample(&mut self, coord: Coordinate) -> Result<Option<TripRecord>> {
        let before = self.tracker.state();
        let event = self.tracker.on_position_sample(coord);
        self.notify(before);

        match event {
            Some(TrackerEvent::Arrived(snapshot)) => self.handle_arrival(&snapshot).map(Some),
            None => Ok(None),
        }
    }

    pub fn on_tick(&mut self) {
        self.tracker.on_tick();
    }

    pub fn pause(&mut self) -> Result<()> {
        let before = self.tracker.state();
        self.tracker.pause()?;
        self.notify(before);

        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        let before = self.tracker.state();
        self.tracker.start()?;
        self.notify(before);

        Ok(())
    }

    /// Record the trip of a journey that reached its destination. Only the
    /// arrival of this session's own tracker is accepted.
    pub fn handle_arrival(&mut self, snapshot: &ProgressSnapshot) -> Result<TripRecord> {
        let arrived = self.tracker.state() == TrackerState::Finished
            && self.tracker.snapshot().is_completed;
        if !arrived || snapshot != self.tracker.snapshot() {
            return InvalidStateTransitionSnafu {
                operation: "record the arrival of",
                state: self.tracker.state(),
            }
            .fail();
        }

        self.record(snapshot)
    }

    /// Finish before arriving, the rewards cover the distance ridden so far
    pub fn finish_now(&mut self) -> Result<TripRecord> {
        let before = self.tracker.state();
        let snapshot = self.tracker.finish_manually()?;
        self.notify(before);

        self.record(&snapshot)
    }

    /// Abandon the journey, nothing is recorded
    pub fn cancel(&mut self) -> Result<()> {
        let before = self.tracker.state();
        self.tracker.cancel()?;
        self.notify(before);

        info!("Journey of `{}` cancelled", self.rider.user_id);

        Ok(())
    }

    fn record(&mut self, snapshot: &ProgressSnapshot) -> Result<TripRecord> {
        if self.recorded {
            return InvalidStateTransitionSnafu {
                operation: "record",
                state: self.tracker.state(),
            }
            .fail();
        }
        self.recorded = true;

        let record = TripRecord::from_snapshot(
            &self.rider.user_id,
            &self.rider.route_label,
            snapshot,
            OffsetDateTime::now_utc(),
        );

        if let Err(reason) = self.store.submit(&record) {
            error!("Failed on save the trip of `{}`: {}", record.user_id, reason);
            return PersistenceFailedSnafu { record, reason }.fail();
        }

        info!("Trip recorded: {}", record);

        Ok(record)
    }

    fn notify(&mut self, before: TrackerState) {
        let after = self.tracker.state();
        if before == after {
            return;
        }

        if let Some(hook) = self.hook.as_mut() {
            hook(before, after);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{JourneyError, MemoryStore};

    /// Store that refuses every trip
    struct OfflineStore;

    impl TripStore for OfflineStore {
        fn submit(&mut self, _record: &TripRecord) -> std::result::Result<(), String> {
            Err("network unreachable".to_string())
        }

        fn trips(&mut self, _user_id: Option<&str>) -> std::result::Result<Vec<TripRecord>, String> {
            Ok(vec![])
        }
    }

    fn config() -> JourneyConfig {
        JourneyConfig::new(
            Coordinate::new(-6.9175, 107.6191),
            Coordinate::new(-6.9024, 107.6186),
        )
    }

    fn rider() -> Rider {
        Rider::new("uid-1", "Gedung Sate")
    }

    #[test]
    fn begin_tracks() -> Result<()> {
        let session = JourneySession::begin(config(), rider(), MemoryStore::new())?;

        assert_eq!(TrackerState::Tracking, session.state());
        assert_eq!(&rider(), session.rider());

        Ok(())
    }

    #[test]
    fn begin_rejects_config() {
        let start = Coordinate::new(-6.9175, 107.6191);

        let res = JourneySession::begin(JourneyConfig::new(start, start), rider(), MemoryStore::new());
        assert!(matches!(res, Err(JourneyError::InvalidConfig { .. })));
    }

    #[test]
    fn arrival_records_trip() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?;

        assert_eq!(None, session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?);
        session.on_tick();
        let trip = session.on_position_sample(Coordinate::new(-6.9025, 107.6186))?;

        let trip = trip.ok_or_else(|| JourneyError::InvalidConfig {
            reason: "expected the arrival".to_string(),
        })?;
        assert_eq!("uid-1", trip.user_id);
        assert_eq!("Gedung Sate", trip.route_label);
        assert_eq!(1, trip.duration_seconds);
        assert_eq!(16, trip.points);
        assert_eq!(TrackerState::Finished, session.state());
        assert!(session.snapshot().is_completed);

        assert_eq!(1, session.store().len());

        // arrival already recorded the trip
        assert!(session.finish_now().is_err());
        assert_eq!(1, session.store().len());

        Ok(())
    }

    #[test]
    fn finish_now_records_partial_trip() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?;
        session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?;
        session.pause()?;

        let trip = session.finish_now()?;
        assert_eq!(8, trip.points);
        assert!(!session.snapshot().is_completed);

        let stored = session.store_mut().trips(Some("uid-1")).map_err(|reason| {
            JourneyError::InvalidConfig { reason }
        })?;
        assert_eq!(vec![trip], stored);

        Ok(())
    }

    #[test]
    fn handle_arrival_needs_completion() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?;
        let snapshot = session.snapshot().clone();

        let res = session.handle_arrival(&snapshot);
        assert!(matches!(res, Err(JourneyError::InvalidStateTransition { .. })));
        assert!(session.store().is_empty());

        Ok(())
    }

    #[test]
    fn handle_arrival_rejects_made_up_arrival() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?;
        session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?;

        let mut made_up = session.snapshot().clone();
        made_up.is_completed = true;
        made_up.distance_km = 42.0;

        let res = session.handle_arrival(&made_up);
        assert!(matches!(res, Err(JourneyError::InvalidStateTransition { .. })));
        assert_eq!(TrackerState::Tracking, session.state());
        assert!(session.store().is_empty());

        // the real arrival is still recorded, and only once
        let trip = session.on_position_sample(Coordinate::new(-6.9025, 107.6186))?;
        assert!(trip.is_some());
        let arrival = session.snapshot().clone();
        assert!(session.handle_arrival(&arrival).is_err());
        assert_eq!(1, session.store().len());

        Ok(())
    }

    #[test]
    fn cancel_records_nothing() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?;
        session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?;

        session.cancel()?;
        assert_eq!(TrackerState::Cancelled, session.state());
        assert!(session.finish_now().is_err());
        assert!(session.cancel().is_err());

        let store = session.into_store();
        assert!(store.is_empty());

        Ok(())
    }

    #[test]
    fn persistence_failure_keeps_the_trip() -> Result<()> {
        let mut session = JourneySession::begin(config(), rider(), OfflineStore)?;
        session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?;

        match session.finish_now() {
            Err(err @ JourneyError::PersistenceFailed { .. }) => {
                let trip = err.record().ok_or_else(|| JourneyError::InvalidConfig {
                    reason: "missing record".to_string(),
                })?;
                assert_eq!(8, trip.points);
                assert_eq!("uid-1", trip.user_id);
            }
            other => panic!("unexpected {:?}", other),
        }

        // no automatic retry, the session is over
        assert_eq!(TrackerState::Finished, session.state());

        Ok(())
    }

    #[test]
    fn transition_hook() -> Result<()> {
        let seen = Rc::new(RefCell::new(vec![]));
        let log = seen.clone();

        let mut session = JourneySession::begin(config(), rider(), MemoryStore::new())?
            .on_transition(move |from, to| log.borrow_mut().push((from, to)));

        session.on_tick();
        session.pause()?;
        session.resume()?;
        session.on_position_sample(Coordinate::new(-6.9100, 107.6189))?;
        session.cancel()?;

        assert_eq!(
            vec![
                (TrackerState::Tracking, TrackerState::Paused),
                (TrackerState::Paused, TrackerState::Tracking),
                (TrackerState::Tracking, TrackerState::Cancelled),
            ],
            *seen.borrow()
        );

        Ok(())
    }
}
