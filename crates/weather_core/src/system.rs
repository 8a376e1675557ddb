use tracing::debug;

use crate::engines::climate::{self, ClimateZone, ClimateZoneRegistry};
use crate::engines::forecast::{self, PredictionEngine};
use crate::engines::hazards::{self, NoProtection, ProtectionCheck, WeatherEvent, WeatherEventEngine};
use crate::engines::patterns::{self, PatternEngine, WeatherPattern};
use crate::engines::storms::{self, StormEngine};
use crate::error::WeatherError;
use crate::io::config::WeatherConfig;
use crate::math::Vec2;
use crate::rng::WeatherRng;
use crate::signal::{Outbox, Signal};
use crate::state::profile::ProfileTable;
use crate::state::{self, WeatherStateMachine};
use crate::types::StormIntensity;

/// Owns every weather engine, the simulated clock and the outbound signal queue.
///
/// [`WeatherSystem::tick`] advances storms, events, predictions, patterns and
/// the state machine in that order. Hosts running subsystems on separate
/// cadences can call the individual `update_*` entry points instead.
pub struct WeatherSystem {
    now: f64,
    unsafe_wind_speed: f32,
    zones: ClimateZoneRegistry,
    storms: StormEngine,
    events: WeatherEventEngine,
    predictions: PredictionEngine,
    patterns: PatternEngine,
    weather: WeatherStateMachine,
    protection: Box<dyn ProtectionCheck>,
    outbox: Outbox,
}

impl WeatherSystem {
    /// Build a system whose engine streams derive from `seed`.
    pub fn new(config: &WeatherConfig, seed: u64) -> Self {
        Self::build(config, |stage| WeatherRng::from_stage(seed, stage))
    }

    /// Build a system from a textual seed phrase.
    pub fn from_phrase(config: &WeatherConfig, phrase: &str) -> Self {
        let root = WeatherRng::from_phrase(phrase);
        Self::build(config, |stage| root.derive(stage))
    }

    fn build<F>(config: &WeatherConfig, stream: F) -> Self
    where
        F: Fn(&str) -> WeatherRng,
    {
        let zones = match &config.zones {
            Some(list) => {
                let mut zones =
                    ClimateZoneRegistry::new(config.day_length_seconds, stream(climate::STAGE));
                for zone in list {
                    // Loaded configs are validated; hand-built duplicates are logged and skipped.
                    let _ = zones.register_zone(zone.clone());
                }
                zones
            }
            None => ClimateZoneRegistry::with_default_zones(
                config.day_length_seconds,
                stream(climate::STAGE),
            ),
        };

        let mut patterns = PatternEngine::new(stream(patterns::STAGE));
        for pattern in &config.patterns {
            // Same as zones: validation rejects these for loaded configs.
            let _ = patterns.register_pattern(pattern.clone());
        }

        let weather = WeatherStateMachine::new(
            config.state_machine.clone(),
            config.presets.clone(),
            ProfileTable::with_overrides(&config.profile_overrides),
            stream(state::STAGE),
        );

        Self {
            now: 0.0,
            unsafe_wind_speed: config.unsafe_wind_speed,
            zones,
            storms: StormEngine::new(config.storms.clone(), stream(storms::STAGE)),
            events: WeatherEventEngine::new(config.events.clone(), stream(hazards::STAGE)),
            predictions: PredictionEngine::new(config.prediction.clone(), stream(forecast::STAGE)),
            patterns,
            weather,
            protection: Box::new(NoProtection),
            outbox: Outbox::default(),
        }
    }

    /// Advance the clock and every subsystem by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.advance_clock(dt);
        self.update_storms(dt);
        self.update_events();
        self.update_predictions(dt);
        self.update_patterns(dt);
        self.update_weather(dt);
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.now += f64::from(dt.max(0.0));
    }

    pub fn update_storms(&mut self, dt: f32) {
        self.storms.update(dt, &self.zones);
        self.outbox.extend(self.storms.take_signals());
    }

    pub fn update_events(&mut self) {
        self.events.update(self.now, &self.zones);
        self.outbox.extend(self.events.take_signals());
    }

    pub fn update_predictions(&mut self, dt: f32) {
        self.predictions
            .update(dt, &self.zones, &self.storms, &self.events);
        self.outbox.extend(self.predictions.take_signals());
    }

    pub fn update_patterns(&mut self, dt: f32) {
        self.patterns.update(dt);
        self.outbox.extend(self.patterns.take_signals());
    }

    pub fn update_weather(&mut self, dt: f32) {
        self.weather.update(dt);
        self.outbox.extend(self.weather.take_signals());
    }

    /// Pending signals in emission order, including those raised by direct
    /// commands since the last drain.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.outbox.extend(self.storms.take_signals());
        self.outbox.extend(self.events.take_signals());
        self.outbox.extend(self.predictions.take_signals());
        self.outbox.extend(self.patterns.take_signals());
        self.outbox.extend(self.weather.take_signals());
        self.outbox.drain()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn zones(&self) -> &ClimateZoneRegistry {
        &self.zones
    }

    pub fn storms(&self) -> &StormEngine {
        &self.storms
    }

    pub fn events(&self) -> &WeatherEventEngine {
        &self.events
    }

    pub fn predictions(&self) -> &PredictionEngine {
        &self.predictions
    }

    pub fn patterns(&self) -> &PatternEngine {
        &self.patterns
    }

    pub fn weather(&self) -> &WeatherStateMachine {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut WeatherStateMachine {
        &mut self.weather
    }

    pub fn set_protection(&mut self, protection: Box<dyn ProtectionCheck>) {
        self.protection = protection;
    }

    pub fn register_zone(&mut self, zone: ClimateZone) -> Result<(), WeatherError> {
        self.zones.register_zone(zone)
    }

    pub fn register_pattern(&mut self, pattern: WeatherPattern) -> Result<(), WeatherError> {
        self.patterns.register_pattern(pattern)
    }

    pub fn activate_pattern(&mut self, name: &str) -> Result<(), WeatherError> {
        self.patterns.activate(name)
    }

    pub fn deactivate_pattern(&mut self, name: &str) -> Result<(), WeatherError> {
        self.patterns.deactivate(name)
    }

    pub fn generate_storm(
        &mut self,
        location: Vec2,
        intensity: StormIntensity,
    ) -> Result<u64, WeatherError> {
        self.storms.generate_storm(location, intensity)
    }

    /// Spawn a storm with an intensity rolled for the local climate.
    pub fn generate_storm_for_location(&mut self, location: Vec2) -> Result<u64, WeatherError> {
        let intensity = self.storms.calculate_storm_intensity(&self.zones, location);
        self.storms.generate_storm(location, intensity)
    }

    pub fn dissipate_storm(&mut self, id: u64) -> Result<(), WeatherError> {
        self.storms.dissipate_storm(id)
    }

    /// Trigger `event` starting now.
    pub fn trigger_event(&mut self, event: WeatherEvent) -> Result<u64, WeatherError> {
        self.events.trigger_event(event, self.now)
    }

    pub fn end_event(&mut self, id: u64) -> Result<(), WeatherError> {
        self.events.end_event(id)
    }

    /// Regenerate the forecast immediately, outside the regular cadence.
    pub fn generate_predictions(&mut self, horizon_hours: f32) -> usize {
        self.predictions
            .generate_predictions(&self.zones, &self.storms, &self.events, horizon_hours)
    }

    pub fn wind_speed_at(&self, location: Vec2) -> f32 {
        self.hazard_wind_at(location)
            .max(self.weather.ambient_wind_speed())
    }

    /// Storm and event wind, ignoring the ambient breeze.
    fn hazard_wind_at(&self, location: Vec2) -> f32 {
        let event_wind = self
            .events
            .events_at(location)
            .filter_map(|event| event.parameters.get("wind_speed").copied())
            .fold(0.0, f32::max);
        self.storms.wind_speed_at(location).max(event_wind)
    }

    pub fn wind_direction_at(&self, location: Vec2) -> Vec2 {
        self.storms.wind_direction_at(location)
    }

    /// Zone temperature plus event and ambient weather offsets, in °C.
    pub fn temperature_at(&mut self, location: Vec2) -> f32 {
        self.zones.temperature_at(location, self.now)
            + self.events.temperature_delta_at(location)
            + self.weather.ambient_temperature_offset()
    }

    pub fn humidity_at(&mut self, location: Vec2) -> f32 {
        self.zones.humidity_at(location)
    }

    /// Visibility multiplier in `[0, 1]`.
    pub fn visibility_at(&self, location: Vec2) -> f32 {
        self.events.visibility_multiplier_at(location)
    }

    /// Temperature damage per second at `location`.
    pub fn damage_at(&mut self, location: Vec2) -> f32 {
        let temperature = self.temperature_at(location);
        self.events
            .damage_at(location, temperature, self.protection.as_ref())
    }

    pub fn is_safe_for_players(&self, location: Vec2) -> bool {
        self.hazard_wind_at(location) <= self.unsafe_wind_speed
            && !self
                .events
                .events_at(location)
                .any(|event| event.event_type.is_hazardous())
    }

    /// Human-readable warnings for everything threatening `location`.
    pub fn warnings_at(&self, location: Vec2) -> Vec<String> {
        let mut warnings = Vec::new();
        for storm in self.storms.storms_at(location) {
            let state = if storm.dissipating { " (weakening)" } else { "" };
            warnings.push(format!(
                "Storm warning: {} storm overhead{}",
                storm.intensity, state
            ));
        }
        for event in self.events.events_at(location) {
            let remaining = (f64::from(event.duration) - (self.now - event.start_time)).max(0.0);
            warnings.push(format!(
                "{} warning: {:.0}s remaining",
                capitalize(event.event_type.label()),
                remaining
            ));
        }
        let wind = self.hazard_wind_at(location);
        if wind > self.unsafe_wind_speed {
            warnings.push(format!("High wind warning: {:.0} units/s", wind));
        }
        debug!(count = warnings.len(), "warnings collected");
        warnings
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
