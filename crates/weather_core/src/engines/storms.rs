//! Storm generation, movement and dissipation.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engines::climate::ClimateZoneRegistry;
use crate::error::WeatherError;
use crate::io::config::StormSettings;
use crate::math::{bearing, heading_vector, wrap_degrees, Vec2};
use crate::rng::WeatherRng;
use crate::signal::Signal;
use crate::types::{StormIntensity, ZoneType};

pub const STAGE: &str = "engine:storms";

const RADIUS_MIN: f32 = 5_000.0;
const RADIUS_MAX: f32 = 20_000.0;
const BASE_WIND_SPEED: f32 = 50.0;
const SPEED_MIN: f32 = 5.0;
const SPEED_MAX: f32 = 20.0;
const LIFETIME_MIN: f32 = 3_600.0;
const LIFETIME_MAX: f32 = 14_400.0;
/// Absorbs rounding left over from summing many small steps.
const LIFETIME_SLACK: f64 = 1e-4;
const WAYPOINTS_MIN: usize = 5;
const WAYPOINTS_MAX: usize = 15;
const WAYPOINT_SPREAD: f32 = 50_000.0;
const WAYPOINT_REACHED: f32 = 1_000.0;
/// Degrees per second.
const HEADING_DRIFT: f32 = 10.0;
const DISSIPATION_FACTOR: f32 = 0.95;
/// Storms dissipating ahead of their lifetime vanish below these.
const DISSIPATED_RADIUS: f32 = 500.0;
const DISSIPATED_WIND: f32 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StormSystem {
    pub id: u64,
    pub intensity: StormIntensity,
    pub center: Vec2,
    pub radius: f32,
    pub max_wind_speed: f32,
    pub movement_speed: f32,
    /// Degrees in `[0, 360)`.
    pub heading: f32,
    /// Seconds, accumulated in `f64` so per-frame steps do not drift.
    pub lifetime: f64,
    pub elapsed: f64,
    pub dissipating: bool,
    pub path: VecDeque<Vec2>,
}

impl StormSystem {
    pub fn contains(&self, location: Vec2) -> bool {
        self.center.distance(location) <= self.radius
    }

    /// Linear falloff from 1 at the eye to 0 at the rim.
    pub fn influence_at(&self, location: Vec2) -> f32 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        let distance = self.center.distance(location);
        if distance >= self.radius {
            0.0
        } else {
            1.0 - distance / self.radius
        }
    }

    fn advance(&mut self, dt: f32, rng: &mut WeatherRng) {
        let step = self.movement_speed * dt;
        if let Some(&waypoint) = self.path.front() {
            self.heading = bearing(self.center, waypoint);
            let remaining = self.center.distance(waypoint);
            if step >= remaining {
                self.center = waypoint;
            } else {
                self.center = self.center + heading_vector(self.heading).scale(step);
            }
            if self.center.distance(waypoint) <= WAYPOINT_REACHED {
                self.path.pop_front();
            }
        } else {
            self.center = self.center + heading_vector(self.heading).scale(step);
        }
        self.heading = wrap_degrees(self.heading + rng.uniform(-HEADING_DRIFT, HEADING_DRIFT) * dt);

        self.elapsed += f64::from(dt);
        if self.reached_lifetime() || self.dissipating {
            self.dissipating = true;
            self.radius *= DISSIPATION_FACTOR;
            self.max_wind_speed *= DISSIPATION_FACTOR;
        }
    }

    fn reached_lifetime(&self) -> bool {
        self.elapsed + LIFETIME_SLACK >= self.lifetime
    }

    fn is_spent(&self) -> bool {
        self.reached_lifetime()
            || (self.dissipating
                && (self.radius < DISSIPATED_RADIUS || self.max_wind_speed < DISSIPATED_WIND))
    }
}

#[derive(Clone, Debug)]
pub struct StormEngine {
    settings: StormSettings,
    storms: Vec<StormSystem>,
    next_id: u64,
    rng: WeatherRng,
    signals: Vec<Signal>,
}

impl StormEngine {
    pub fn new(settings: StormSettings, rng: WeatherRng) -> Self {
        Self {
            settings,
            storms: Vec::new(),
            next_id: 1,
            rng,
            signals: Vec::new(),
        }
    }

    /// Spawn a storm at `location`. Fails once the active list is full.
    pub fn generate_storm(
        &mut self,
        location: Vec2,
        intensity: StormIntensity,
    ) -> Result<u64, WeatherError> {
        if self.storms.len() >= self.settings.max_active_storms {
            warn!(
                max = self.settings.max_active_storms,
                "storm generation skipped at capacity"
            );
            return Err(WeatherError::StormCapacity {
                max: self.settings.max_active_storms,
            });
        }

        let scale = f32::from(intensity.category_number());
        let radius = self.rng.uniform(RADIUS_MIN, RADIUS_MAX) * (1.0 + scale * 0.5);
        let max_wind_speed = BASE_WIND_SPEED * (1.0 + scale * 0.8);
        let movement_speed = self.rng.uniform(SPEED_MIN, SPEED_MAX);
        let heading = self.rng.uniform(0.0, 360.0);
        let lifetime = f64::from(self.rng.uniform(LIFETIME_MIN, LIFETIME_MAX));
        let waypoints = self.rng.range_inclusive(WAYPOINTS_MIN, WAYPOINTS_MAX);
        let path: VecDeque<Vec2> = (0..waypoints)
            .map(|_| {
                let offset = Vec2::new(
                    self.rng.uniform(-WAYPOINT_SPREAD, WAYPOINT_SPREAD),
                    self.rng.uniform(-WAYPOINT_SPREAD, WAYPOINT_SPREAD),
                );
                location + offset
            })
            .collect();

        let id = self.next_id;
        self.next_id += 1;
        self.storms.push(StormSystem {
            id,
            intensity,
            center: location,
            radius,
            max_wind_speed,
            movement_speed,
            heading,
            lifetime,
            elapsed: 0.0,
            dissipating: false,
            path,
        });
        info!(id, %intensity, x = location.x, y = location.y, radius, "storm generated");
        self.signals.push(Signal::StormGenerated {
            id,
            intensity,
            center: location,
        });
        Ok(id)
    }

    /// Move every storm, retire spent ones, then roll for a new storm.
    pub fn update(&mut self, dt: f32, zones: &ClimateZoneRegistry) {
        let dt = dt.max(0.0);
        for storm in &mut self.storms {
            storm.advance(dt, &mut self.rng);
        }

        let signals = &mut self.signals;
        self.storms.retain(|storm| {
            if storm.is_spent() {
                debug!(id = storm.id, "storm dissipated");
                signals.push(Signal::StormDissipated { id: storm.id });
                false
            } else {
                true
            }
        });

        if self.storms.len() < self.settings.max_active_storms
            && self.rng.chance(self.settings.generation_probability)
        {
            self.spawn_random(zones);
        }
    }

    fn spawn_random(&mut self, zones: &ClimateZoneRegistry) {
        let Some(index) = self.rng.index(zones.len()) else {
            return;
        };
        let zone = &zones.zones()[index];
        let location = ClimateZoneRegistry::sample_location(&mut self.rng, zone);
        let intensity = self.calculate_storm_intensity(zones, location);
        // Capacity was checked by the caller.
        let _ = self.generate_storm(location, intensity);
    }

    /// Roll a storm intensity for `location`, weighted by its climate zone.
    pub fn calculate_storm_intensity(
        &mut self,
        zones: &ClimateZoneRegistry,
        location: Vec2,
    ) -> StormIntensity {
        let cascade: &[(StormIntensity, f32)] = match zones.zone_at(location).zone_type {
            ZoneType::Tropical => &[
                (StormIntensity::Category3, 0.1),
                (StormIntensity::Category2, 0.2),
                (StormIntensity::Category1, 0.3),
            ],
            ZoneType::Coastal => &[(StormIntensity::Category1, 0.1)],
            _ => &[(StormIntensity::Category1, 0.05)],
        };
        for &(intensity, probability) in cascade {
            if self.rng.chance(probability) {
                return intensity;
            }
        }
        StormIntensity::TropicalStorm
    }

    /// Begin early dissipation of storm `id`.
    pub fn dissipate_storm(&mut self, id: u64) -> Result<(), WeatherError> {
        match self.storms.iter_mut().find(|storm| storm.id == id) {
            Some(storm) => {
                storm.dissipating = true;
                Ok(())
            }
            None => {
                warn!(id, "dissipate requested for unknown storm");
                Err(WeatherError::UnknownStorm(id))
            }
        }
    }

    pub fn storms(&self) -> &[StormSystem] {
        &self.storms
    }

    pub fn storm(&self, id: u64) -> Option<&StormSystem> {
        self.storms.iter().find(|storm| storm.id == id)
    }

    pub fn storms_at(&self, location: Vec2) -> impl Iterator<Item = &StormSystem> {
        self.storms.iter().filter(move |storm| storm.contains(location))
    }

    pub fn is_location_in_storm(&self, location: Vec2) -> bool {
        self.storms.iter().any(|storm| storm.contains(location))
    }

    /// Strongest storm wind felt at `location`.
    pub fn wind_speed_at(&self, location: Vec2) -> f32 {
        self.storms
            .iter()
            .map(|storm| storm.max_wind_speed * storm.influence_at(location))
            .fold(0.0, f32::max)
    }

    /// Influence-weighted storm heading at `location`, normalised; zero if calm.
    pub fn wind_direction_at(&self, location: Vec2) -> Vec2 {
        self.storms
            .iter()
            .fold(Vec2::ZERO, |sum, storm| {
                sum + heading_vector(storm.heading).scale(storm.influence_at(location))
            })
            .normalize_or_zero()
    }

    pub fn max_active_storms(&self) -> usize {
        self.settings.max_active_storms
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::climate;

    fn engine(max: usize) -> StormEngine {
        StormEngine::new(
            StormSettings {
                max_active_storms: max,
                generation_probability: 0.0,
            },
            WeatherRng::from_stage(11, STAGE),
        )
    }

    fn zones() -> ClimateZoneRegistry {
        ClimateZoneRegistry::with_default_zones(86_400.0, WeatherRng::from_stage(11, climate::STAGE))
    }

    #[test]
    fn category_one_storm_has_scaled_dimensions() {
        let mut engine = engine(3);
        let id = engine.generate_storm(Vec2::ZERO, StormIntensity::Category1).unwrap();
        let storm = engine.storm(id).unwrap();
        assert!(storm.radius >= 7_500.0 && storm.radius <= 30_000.0);
        assert!((storm.max_wind_speed - 90.0).abs() < 1e-3);
        assert!((5.0..20.0).contains(&storm.movement_speed));
        assert!((3_600.0..14_400.0).contains(&storm.lifetime));
        assert!((5..=15).contains(&storm.path.len()));
        for waypoint in &storm.path {
            assert!(waypoint.x.abs() <= 50_000.0 && waypoint.y.abs() <= 50_000.0);
        }
    }

    #[test]
    fn generation_fails_at_capacity() {
        let mut engine = engine(1);
        engine.generate_storm(Vec2::ZERO, StormIntensity::TropicalStorm).unwrap();
        let err = engine
            .generate_storm(Vec2::new(1.0, 1.0), StormIntensity::Category2)
            .unwrap_err();
        assert_eq!(err, WeatherError::StormCapacity { max: 1 });
        assert_eq!(engine.storms().len(), 1);
    }

    #[test]
    fn dissipating_storm_shrinks_monotonically() {
        let mut engine = engine(2);
        let zones = zones();
        let id = engine.generate_storm(Vec2::ZERO, StormIntensity::Category3).unwrap();
        engine.dissipate_storm(id).unwrap();
        let mut last = engine.storm(id).cloned().unwrap();
        while let Some(storm) = engine.storm(id).cloned() {
            assert!(storm.radius <= last.radius);
            assert!(storm.max_wind_speed <= last.max_wind_speed);
            last = storm;
            engine.update(1.0, &zones);
        }
        assert!(engine
            .take_signals()
            .contains(&Signal::StormDissipated { id }));
    }

    #[test]
    fn unknown_storm_dissipation_is_rejected() {
        let mut engine = engine(2);
        assert_eq!(engine.dissipate_storm(42), Err(WeatherError::UnknownStorm(42)));
    }

    #[test]
    fn wind_falls_off_toward_rim() {
        let mut engine = engine(2);
        let id = engine.generate_storm(Vec2::ZERO, StormIntensity::Category1).unwrap();
        let radius = engine.storm(id).unwrap().radius;
        let eye = engine.wind_speed_at(Vec2::ZERO);
        let halfway = engine.wind_speed_at(Vec2::new(radius * 0.5, 0.0));
        let outside = engine.wind_speed_at(Vec2::new(radius * 2.0, 0.0));
        assert!((eye - 90.0).abs() < 1e-3);
        assert!((halfway - 45.0).abs() < 1e-2);
        assert_eq!(outside, 0.0);
        assert!(engine.is_location_in_storm(Vec2::new(radius * 0.5, 0.0)));
        assert!(!engine.is_location_in_storm(Vec2::new(radius * 2.0, 0.0)));
    }

    #[test]
    fn wind_direction_is_unit_or_zero() {
        let mut engine = engine(2);
        assert_eq!(engine.wind_direction_at(Vec2::ZERO), Vec2::ZERO);
        engine.generate_storm(Vec2::ZERO, StormIntensity::Category1).unwrap();
        let direction = engine.wind_direction_at(Vec2::new(10.0, 10.0));
        assert!((direction.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn tropical_cascade_never_returns_none() {
        let mut engine = engine(1);
        let zones = zones();
        for _ in 0..500 {
            let intensity = engine.calculate_storm_intensity(&zones, Vec2::ZERO);
            assert!(intensity >= StormIntensity::TropicalStorm);
            assert!(intensity <= StormIntensity::Category3);
        }
        for _ in 0..500 {
            let intensity = engine.calculate_storm_intensity(&zones, Vec2::new(0.0, 90_000.0));
            assert!(intensity <= StormIntensity::Category1);
        }
    }

    #[test]
    fn random_spawns_respect_capacity() {
        let mut engine = StormEngine::new(
            StormSettings {
                max_active_storms: 3,
                generation_probability: 1.0,
            },
            WeatherRng::from_stage(4, STAGE),
        );
        let zones = zones();
        for _ in 0..50 {
            engine.update(1.0, &zones);
            assert!(engine.storms().len() <= 3);
        }
        assert_eq!(engine.storms().len(), 3);
    }

    fn storm_at(center: Vec2, heading: f32, movement_speed: f32, path: Vec<Vec2>) -> StormSystem {
        StormSystem {
            id: 1,
            intensity: StormIntensity::Category1,
            center,
            radius: 10_000.0,
            max_wind_speed: 90.0,
            movement_speed,
            heading,
            lifetime: 10_000.0,
            elapsed: 0.0,
            dissipating: false,
            path: path.into_iter().collect(),
        }
    }

    fn rng() -> WeatherRng {
        WeatherRng::from_stage(17, STAGE)
    }

    #[test]
    fn storm_steps_toward_head_waypoint() {
        let mut storm = storm_at(Vec2::ZERO, 45.0, 10.0, vec![Vec2::new(10_000.0, 0.0)]);
        storm.advance(1.0, &mut rng());
        assert!((storm.center.x - 10.0).abs() < 1e-3);
        assert!(storm.center.y.abs() < 1e-3);
        assert_eq!(storm.path.len(), 1);
        assert!(storm.heading < HEADING_DRIFT || storm.heading > 360.0 - HEADING_DRIFT);
    }

    #[test]
    fn waypoint_within_reach_is_popped() {
        let far = Vec2::new(5_000.0, 5_000.0);
        let mut storm = storm_at(Vec2::ZERO, 0.0, 600.0, vec![Vec2::new(1_500.0, 0.0), far]);
        storm.advance(1.0, &mut rng());
        assert!((storm.center.x - 600.0).abs() < 1e-2);
        assert_eq!(storm.path.len(), 1);
        assert_eq!(storm.path.front(), Some(&far));
    }

    #[test]
    fn overshooting_step_lands_on_waypoint() {
        let mut storm = storm_at(Vec2::ZERO, 0.0, 600.0, vec![Vec2::new(400.0, 0.0)]);
        storm.advance(1.0, &mut rng());
        assert_eq!(storm.center, Vec2::new(400.0, 0.0));
        assert!(storm.path.is_empty());
    }

    #[test]
    fn empty_path_follows_heading() {
        let mut storm = storm_at(Vec2::ZERO, 90.0, 10.0, Vec::new());
        storm.advance(2.0, &mut rng());
        assert!(storm.center.x.abs() < 1e-3);
        assert!((storm.center.y - 20.0).abs() < 1e-3);
        assert!((storm.heading - 90.0).abs() <= HEADING_DRIFT * 2.0);
    }

    #[test]
    fn heading_stays_wrapped_across_updates() {
        let mut engine = engine(5);
        let zones = zones();
        for n in 0..5 {
            engine
                .generate_storm(Vec2::new(n as f32 * 10_000.0, 0.0), StormIntensity::Category1)
                .unwrap();
        }
        for _ in 0..2_000 {
            engine.update(5.0, &zones);
            for storm in engine.storms() {
                assert!((0.0..360.0).contains(&storm.heading), "heading {}", storm.heading);
            }
        }
    }

    #[test]
    fn storm_is_gone_after_frame_rate_ticks_totaling_lifetime() {
        let mut engine = engine(1);
        let zones = zones();
        let id = engine.generate_storm(Vec2::ZERO, StormIntensity::Category1).unwrap();
        let lifetime = engine.storm(id).unwrap().lifetime;
        let dt = 1.0f32 / 60.0;
        let ticks = (lifetime / f64::from(dt)).ceil() as u64;
        for tick in 1..=ticks {
            engine.update(dt, &zones);
            if tick == ticks / 2 {
                assert!(engine.storm(id).is_some());
            }
        }
        assert!(engine.storm(id).is_none());
        assert!(engine.take_signals().contains(&Signal::StormDissipated { id }));
    }

    #[test]
    fn coastal_cascade_rolls_category_one_or_tropical_storm() {
        let mut engine = engine(1);
        let zones = zones();
        let coast = Vec2::new(0.0, -30_000.0);
        assert_eq!(zones.zone_at(coast).zone_type, ZoneType::Coastal);
        let rolls: Vec<StormIntensity> = (0..2_000)
            .map(|_| engine.calculate_storm_intensity(&zones, coast))
            .collect();
        assert!(rolls
            .iter()
            .all(|i| matches!(i, StormIntensity::Category1 | StormIntensity::TropicalStorm)));
        assert!(rolls.contains(&StormIntensity::Category1));
        assert!(rolls.contains(&StormIntensity::TropicalStorm));
    }
}
