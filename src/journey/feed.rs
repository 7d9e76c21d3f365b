//! Delivery of location samples and timer ticks to a journey session
//!
//! The location stream and the interval timer push their events on their
//! own channel. The session owner pumps them on its thread, so the
//! handlers never run concurrently and no lock is needed.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::debug;

use super::geo::Coordinate;
use super::session::JourneySession;
use crate::error::Result;
use crate::{TripRecord, TripStore};

/// Marker of one timer period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick;

/// Producer side of the location stream
pub type LocationSender = Sender<Coordinate>;

/// Producer side of the interval timer
pub type TimerSender = Sender<Tick>;

/// Consumer side of both streams
pub struct JourneyFeed {
    positions: Receiver<Coordinate>,
    ticks: Receiver<Tick>,
    positions_open: bool,
    ticks_open: bool,
}

impl JourneyFeed {
    pub fn new() -> (Self, LocationSender, TimerSender) {
        let (ptx, prx) = mpsc::channel();
        let (ttx, trx) = mpsc::channel();

        let feed = Self {
            positions: prx,
            ticks: trx,
            positions_open: true,
            ticks_open: true,
        };

        (feed, ptx, ttx)
    }

    /// Both producers are gone
    pub fn disconnected(&self) -> bool {
        !self.positions_open && !self.ticks_open
    }

    /// Deliver everything queued so far, ticks first then positions.
    ///
    /// The timer only runs while the journey is tracked, so every queued
    /// tick is counted before a queued position can finish the journey.
    /// Returns the trip when a position completes the journey; positions
    /// queued behind it are ignored by the finished session.
    ///
    /// The owner must pump before calling `pause`, `finish_now` or `cancel`
    /// on the session, events still queued at that point are discarded.
    pub fn pump<S: TripStore>(
        &mut self,
        session: &mut JourneySession<S>,
    ) -> Result<Option<TripRecord>> {
        while let Some(Tick) = Self::next(&self.ticks, &mut self.ticks_open, "Interval timer") {
            session.on_tick();
        }

        let mut arrived = None;
        while let Some(coord) =
            Self::next(&self.positions, &mut self.positions_open, "Location stream")
        {
            if let Some(trip) = session.on_position_sample(coord)? {
                arrived = Some(trip);
            }
        }

        Ok(arrived)
    }

    fn next<T>(rx: &Receiver<T>, open: &mut bool, name: &str) -> Option<T> {
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if *open {
                    debug!("{} closed", name);
                }
                *open = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{JourneyConfig, MemoryStore, Rider, TrackerState};

    fn session() -> Result<JourneySession<MemoryStore>> {
        let config = JourneyConfig::new(
            Coordinate::new(-6.9175, 107.6191),
            Coordinate::new(-6.9024, 107.6186),
        );
        JourneySession::begin(config, Rider::new("uid-1", "Gedung Sate"), MemoryStore::new())
    }

    #[test]
    fn pump_in_order() -> Result<()> {
        let mut session = session()?;
        let (mut feed, positions, timer) = JourneyFeed::new();

        positions.send(Coordinate::new(-6.9150, 107.6190)).ok();
        positions.send(Coordinate::new(-6.9120, 107.6189)).ok();
        for _ in 0..3 {
            timer.send(Tick).ok();
        }

        assert_eq!(None, feed.pump(&mut session)?);
        let snap = session.snapshot();
        assert_eq!(3, snap.route.len());
        assert_eq!(Coordinate::new(-6.9120, 107.6189), snap.route[2]);
        assert_eq!(3, snap.elapsed_seconds);
        assert!(!feed.disconnected());

        drop(positions);
        drop(timer);
        feed.pump(&mut session)?;
        assert!(feed.disconnected());

        Ok(())
    }

    #[test]
    fn paused_session_drops_queue() -> Result<()> {
        let mut session = session()?;
        let (mut feed, positions, timer) = JourneyFeed::new();

        session.pause()?;
        positions.send(Coordinate::new(-6.9150, 107.6190)).ok();
        timer.send(Tick).ok();
        feed.pump(&mut session)?;

        assert_eq!(1, session.snapshot().route.len());
        assert_eq!(0, session.snapshot().elapsed_seconds);

        Ok(())
    }

    #[test]
    fn producers_on_other_threads() -> Result<()> {
        let mut session = session()?;
        let (mut feed, positions, timer) = JourneyFeed::new();

        let gps = thread::spawn(move || {
            for lat in [-6.9150, -6.9100, -6.9050, -6.9025] {
                if positions.send(Coordinate::new(lat, 107.6186)).is_err() {
                    break;
                }
            }
        });
        let clock = thread::spawn(move || {
            for _ in 0..10 {
                if timer.send(Tick).is_err() {
                    break;
                }
            }
        });
        gps.join().ok();
        clock.join().ok();

        let trip = feed.pump(&mut session)?;
        assert!(trip.is_some());
        assert_eq!(TrackerState::Finished, session.state());
        assert_eq!(5, session.snapshot().route.len());
        assert_eq!(10, session.snapshot().elapsed_seconds);
        assert_eq!(Some(10), trip.map(|t| t.duration_seconds));

        Ok(())
    }

    #[test]
    fn ticks_before_arrival_are_counted() -> Result<()> {
        let mut session = session()?;
        let (mut feed, positions, timer) = JourneyFeed::new();

        for _ in 0..5 {
            timer.send(Tick).ok();
        }
        positions.send(Coordinate::new(-6.9100, 107.6189)).ok();
        for _ in 0..5 {
            timer.send(Tick).ok();
        }
        positions.send(Coordinate::new(-6.9025, 107.6186)).ok();

        let trip = feed.pump(&mut session)?;
        assert_eq!(Some(10), trip.map(|t| t.duration_seconds));
        assert_eq!(3, session.snapshot().route.len());
        assert!(session.snapshot().is_completed);

        Ok(())
    }

    #[test]
    fn pump_before_pause_keeps_queue() -> Result<()> {
        let mut session = session()?;
        let (mut feed, positions, timer) = JourneyFeed::new();

        positions.send(Coordinate::new(-6.9150, 107.6190)).ok();
        timer.send(Tick).ok();
        timer.send(Tick).ok();

        feed.pump(&mut session)?;
        session.pause()?;
        timer.send(Tick).ok();
        feed.pump(&mut session)?;

        assert_eq!(2, session.snapshot().route.len());
        assert_eq!(2, session.snapshot().elapsed_seconds);

        Ok(())
    }
}
