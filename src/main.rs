//! bikejourney cli - replay bicycle journeys and browse the recorded trips

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use argopt::{cmd_group, subcmd};
use bson::Document;
use csv::{ReaderBuilder, Trim};
use mongodb::sync::Client;
use serde::Deserialize;
use time::macros::format_description;

use bikejourney::stores::{CsvTripStore, MongoTripStore};
use bikejourney::{
    popular_routes, Coordinate, JourneyConfig, JourneyError, JourneyFeed, JourneySession, Rider,
    RouteGpx, Tick, TrackerState, TripRecord, TripStore, UserStats,
    DEFAULT_ARRIVAL_RADIUS_KM,
};

/// Routes listed under the rider totals
const POPULAR_ROUTES: usize = 4;

/// CLI of bikejourney - Track your bicycle commutes, earn points and save CO2
#[cmd_group(commands = [ride, history, leaderboard])]
fn main() -> Result<(), String> {}

/// Replay a journey from a CSV of events (event,latitude,longitude) and record the trip
#[subcmd]
fn ride(
    /// CSV file with the position, tick, pause, resume, finish and cancel events
    events: String,
    /// Start coordinate, "lat,lng"
    start: String,
    /// Destination coordinate, "lat,lng"
    destination: String,
    /// Trips store: CSV file path or mongodb:// connection string
    trips: String,
    /// Rider id. Default: rider
    #[opt(long)]
    user: Option<String>,
    /// Destination name. Default: Unknown
    #[opt(long)]
    label: Option<String>,
    /// Also write the ridden route on this GPX file
    #[opt(long)]
    gpx: Option<String>,
    /// Journey configuration. Default: .bikejourney.yaml, ~/.bikejourney.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logger();

    let start = parse_coordinate(&start)?;
    let destination = parse_coordinate(&destination)?;
    let options = load_configs(config).journey;
    let config = options.apply(JourneyConfig::new(start, destination));

    let rider = Rider::new(
        user.as_deref().unwrap_or("rider"),
        label.as_deref().unwrap_or("Unknown"),
    );

    let events = File::open(events)
        .map_err(|e| format!("Failed on open the events file: {}", e))?;
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(events);

    let store = open_store(&trips)?;
    let mut session = JourneySession::begin(config, rider, store)
        .map_err(|e| e.to_string())?
        .on_transition(|from, to| log::info!("Journey {} -> {}", from, to));

    let (mut feed, positions, timer) = JourneyFeed::new();
    let mut outcome: Option<Result<TripRecord, JourneyError>> = None;

    for row in rdr.deserialize::<ReplayRow>() {
        let row = row.map_err(|e| format!("Failed on read some event: {}", e))?;

        match row.event.to_lowercase().as_str() {
            "position" => {
                let coord = row.coordinate()?;
                positions
                    .send(coord)
                    .map_err(|e| format!("Location stream closed: {}", e))?;
            }
            "tick" => timer
                .send(Tick)
                .map_err(|e| format!("Interval timer closed: {}", e))?,
            control => {
                // events already queued belong before the control
                match feed.pump(&mut session) {
                    Ok(Some(trip)) => {
                        outcome = Some(Ok(trip));
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        outcome = Some(Err(e));
                        break;
                    }
                }

                match control {
                    "pause" => session.pause().map_err(|e| e.to_string())?,
                    "resume" => session.resume().map_err(|e| e.to_string())?,
                    "finish" => {
                        outcome = Some(session.finish_now());
                        break;
                    }
                    "cancel" => {
                        session.cancel().map_err(|e| e.to_string())?;
                        break;
                    }
                    other => return Err(format!("Unknown event `{}`", other)),
                }
            }
        }

        match feed.pump(&mut session) {
            Ok(Some(trip)) => {
                outcome = Some(Ok(trip));
                break;
            }
            Ok(None) => {}
            Err(e) => {
                outcome = Some(Err(e));
                break;
            }
        }
    }

    // Out of events while riding: the rider stops here
    if outcome.is_none() && !session.state().is_terminal() {
        outcome = Some(session.finish_now());
    }

    if let Some(path) = gpx {
        if session.state() != TrackerState::Cancelled {
            write_gpx(&session.rider().route_label, &session.rider().user_id, &session, &path)?;
        }
    }

    match outcome {
        Some(Ok(trip)) => {
            if session.snapshot().is_completed {
                println!("Destination reached! {}", trip);
            } else {
                println!("Journey finished. {}", trip);
            }
            Ok(())
        }
        Some(Err(e)) => {
            if let Some(trip) = e.record() {
                println!("Journey finished. {}", trip);
            }
            Err(e.to_string())
        }
        None => {
            println!("Journey cancelled, nothing recorded");
            Ok(())
        }
    }
}

/// List the recorded trips, newest first
#[subcmd]
fn history(
    /// Trips store: CSV file path or mongodb:// connection string
    trips: String,
    /// Only the trips of this rider
    #[opt(long)]
    user: Option<String>,
) -> Result<(), String> {
    init_logger();

    let mut store = open_store(&trips)?;
    let trips = store.trips(user.as_deref())?;

    let day_format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    for trip in &trips {
        let day = trip
            .completed_at
            .format(day_format)
            .map_err(|e| e.to_string())?;
        println!("{} {} to {}: {}", day, trip.user_id, trip.route_label, trip);
    }

    if let Some(uid) = user {
        let stats = UserStats::from_trips(&uid, &trips);
        println!(
            "{} trips, {:.1} km, {} points, {:.1} kg CO2 saved",
            stats.total_trips, stats.total_distance_km, stats.total_points, stats.co2_saved_kg
        );

        for (route, count) in popular_routes(&trips, &uid, POPULAR_ROUTES) {
            println!("{} x {}", count, route);
        }
    }

    Ok(())
}

/// Rank the riders by points
#[subcmd]
fn leaderboard(
    /// Trips store: CSV file path or mongodb:// connection string
    trips: String,
    /// Max riders listed. Default: 10
    #[opt(long)]
    limit: Option<usize>,
) -> Result<(), String> {
    init_logger();

    let mut store = open_store(&trips)?;
    let trips = store.trips(None)?;

    for entry in bikejourney::leaderboard(&trips, limit.unwrap_or(10)) {
        println!(
            "{:>3}. {} {} points, {:.1} km",
            entry.position,
            entry.stats.user_id,
            entry.stats.total_points,
            entry.stats.total_distance_km
        );
    }

    Ok(())
}

fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

/// CSV file or MongoDB database
fn open_store(trips: &str) -> Result<Box<dyn TripStore>, String> {
    if trips.starts_with("mongodb://") || trips.starts_with("mongodb+srv://") {
        let client =
            Client::with_uri_str(trips).map_err(|e| format!("Failed on connect: {0}", e))?;
        let db = client
            .default_database()
            .ok_or("Default database not provided")?;
        let store = MongoTripStore::new(db.collection::<Document>("trips"))
            .with_users(db.collection::<Document>("users"));

        return Ok(Box::new(store));
    }

    Ok(Box::new(CsvTripStore::new(trips)))
}

fn write_gpx<S: TripStore>(
    name: &str,
    rider: &str,
    session: &JourneySession<S>,
    path: &str,
) -> Result<(), String> {
    let doc = RouteGpx::new(name).rider(rider).generate(session.snapshot())?;

    let file =
        File::create(path).map_err(|e| format!("Failed on create the GPX file: {}", e))?;
    let mut writer = BufWriter::new(file);
    gpx::write(&doc, &mut writer).map_err(|e| e.to_string())?;

    Ok(())
}

/// "lat,lng", "lat;lng" or "lat lng"
fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let separator = match raw {
        s if s.contains(',') => ",",
        s if s.contains(';') => ";",
        _ => " ",
    };
    let parts: Vec<&str> = raw
        .split(separator)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 2 {
        return Err(format!("Invalid coordinate `{}`, expected lat,lng", raw));
    }

    let latitude = parts[0]
        .parse::<f64>()
        .map_err(|e| format!("Invalid latitude format: {}", e))?;
    let longitude = parts[1]
        .parse::<f64>()
        .map_err(|e| format!("Invalid longitude format: {}", e))?;

    Ok(Coordinate::new(latitude, longitude))
}

/// One line of a replayed journey
#[derive(Debug, Deserialize)]
struct ReplayRow {
    event: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ReplayRow {
    fn coordinate(&self) -> Result<Coordinate, String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(format!("Position event without coordinates: {:?}", self)),
        }
    }
}

const CONFIG_FILE: &str = ".bikejourney.yaml";

/// Config files to try, most specific first: the provided one, the working
/// directory, then home
fn config_candidates(provided: Option<String>, home: Option<PathBuf>) -> Vec<PathBuf> {
    provided
        .map(PathBuf::from)
        .into_iter()
        .chain(Some(PathBuf::from(CONFIG_FILE)))
        .chain(home.map(|dir| dir.join(CONFIG_FILE)))
        .collect()
}

/// Settings of the first readable config file, defaults when none parses
fn load_configs(provided: Option<String>) -> Configs {
    let found = config_candidates(provided, dirs::home_dir())
        .into_iter()
        .find_map(|path| fs::read_to_string(&path).ok().map(|yaml| (path, yaml)));

    let Some((path, yaml)) = found else {
        return Configs::default();
    };

    serde_yaml::from_str(&yaml).unwrap_or_else(|e| {
        log::warn!("Ignoring the config file {}: {}", path.display(), e);
        Configs::default()
    })
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
struct Configs {
    #[serde(default)]
    pub journey: JourneyOptions,
}

/// Journey settings of the config file
#[derive(Clone, Debug, PartialEq, Deserialize)]
struct JourneyOptions {
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius_km: f64,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_arrival_radius() -> f64 {
    DEFAULT_ARRIVAL_RADIUS_KM
}

fn default_tick_seconds() -> u64 {
    1
}

impl Default for JourneyOptions {
    fn default() -> Self {
        Self {
            arrival_radius_km: default_arrival_radius(),
            tick_seconds: default_tick_seconds(),
        }
    }
}

impl JourneyOptions {
    fn apply(&self, config: JourneyConfig) -> JourneyConfig {
        config
            .arrival_radius(self.arrival_radius_km)
            .tick(self.tick_seconds)
    }
}

#[test]
fn parse_configs() -> Result<(), String> {
    let yaml = "\njourney:";

    let conf: Configs = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

    assert_eq!(
        Configs {
            journey: JourneyOptions {
                arrival_radius_km: 0.05,
                tick_seconds: 1,
            }
        },
        conf
    );

    let yaml = "\njourney:\n  arrival_radius_km: 0.1\n  tick_seconds: 5";

    let conf: Configs = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

    assert_eq!(
        Configs {
            journey: JourneyOptions {
                arrival_radius_km: 0.1,
                tick_seconds: 5,
            }
        },
        conf
    );

    let config = conf.journey.apply(JourneyConfig::new(
        Coordinate::new(-6.9175, 107.6191),
        Coordinate::new(-6.9024, 107.6186),
    ));
    assert_eq!(0.1, config.arrival_radius_km);
    assert_eq!(5, config.tick_seconds);

    Ok(())
}

#[test]
fn config_lookup_order() {
    let home = PathBuf::from("/home/rider");

    assert_eq!(
        vec![
            PathBuf::from("ride.yaml"),
            PathBuf::from(".bikejourney.yaml"),
            PathBuf::from("/home/rider/.bikejourney.yaml"),
        ],
        config_candidates(Some("ride.yaml".to_string()), Some(home))
    );
    assert_eq!(
        vec![PathBuf::from(".bikejourney.yaml")],
        config_candidates(None, None)
    );
}

#[test]
fn load_provided_config() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|e| e.to_string())?;

    let path = dir.path().join("ride.yaml");
    fs::write(&path, "journey:\n  tick_seconds: 5\n").map_err(|e| e.to_string())?;
    let conf = load_configs(path.to_str().map(String::from));
    assert_eq!(5, conf.journey.tick_seconds);
    assert_eq!(DEFAULT_ARRIVAL_RADIUS_KM, conf.journey.arrival_radius_km);

    let broken = dir.path().join("broken.yaml");
    fs::write(&broken, "journey: [").map_err(|e| e.to_string())?;
    let conf = load_configs(broken.to_str().map(String::from));
    assert_eq!(Configs::default(), conf);

    Ok(())
}

#[test]
fn parse_coordinates() -> Result<(), String> {
    assert_eq!(Coordinate::new(-6.9175, 107.6191), parse_coordinate("-6.9175,107.6191")?);
    assert_eq!(Coordinate::new(-6.9175, 107.6191), parse_coordinate("-6.9175; 107.6191")?);
    assert_eq!(Coordinate::new(-6.9175, 107.6191), parse_coordinate(" -6.9175 107.6191 ")?);

    assert!(parse_coordinate("-6.9175").is_err());
    assert!(parse_coordinate("north,107.6191").is_err());

    Ok(())
}
