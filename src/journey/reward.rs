//! Reward calculator: points and CO2 saved from a ridden distance

/// One point per 100 meters
pub const POINTS_PER_KM: f64 = 10.0;

/// Average CO2 avoided per km versus motorized transport, in kg
pub const CO2_KG_PER_KM: f64 = 0.21;

/// Points earned for a distance in km
pub fn points_for(distance_km: f64) -> u64 {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return 0;
    }

    (distance_km * POINTS_PER_KM).floor() as u64
}

/// CO2 saved, in kg, for a distance in km. Not rounded.
pub fn co2_saved_for(distance_km: f64) -> f64 {
    distance_km * CO2_KG_PER_KM
}
