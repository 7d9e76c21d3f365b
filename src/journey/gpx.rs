//! Journey route export to GPX

use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use super::tracker::ProgressSnapshot;

pub struct RouteGpx {
    /// Track name, eg.: the destination
    pub name: String,
    /// Rider, goes on the track description
    pub rider: Option<String>,
}

impl RouteGpx {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rider: None,
        }
    }

    pub fn rider(&mut self, rider: &str) -> &mut Self {
        self.rider = Some(rider.to_string());

        self
    }

    /// Build the GPX document of the ridden route
    pub fn generate(&self, progress: &ProgressSnapshot) -> Result<Gpx, String> {
        if progress.route.is_empty() {
            return Err("Journey without route".to_string());
        }

        let mut segment = TrackSegment::new();
        for coord in &progress.route {
            segment.points.push(Waypoint::new((*coord).into()));
        }

        let mut track = Track::new();
        track.name = Some(self.name.clone());
        track.description = self.rider.as_ref().map(|r| format!("Ridden by `{}`", r));
        track.source = Some("bikejourney".to_string());
        track.segments.push(segment);

        let mut gpx: Gpx = Default::default();
        gpx.version = GpxVersion::Gpx11;
        gpx.creator = Some("bikejourney".to_string());
        gpx.tracks = vec![track];

        Ok(gpx)
    }
}
