//! Short and medium term forecasts.
//!
//! The predicted weather type is drawn from the zone's common weather; only
//! the confidence depends on how far ahead the forecast looks.

use serde::Serialize;
use tracing::debug;

use crate::engines::climate::ClimateZoneRegistry;
use crate::engines::hazards::WeatherEventEngine;
use crate::engines::storms::StormEngine;
use crate::io::config::PredictionSettings;
use crate::math::{clamp_unit, Vec2};
use crate::rng::WeatherRng;
use crate::signal::Signal;
use crate::types::{WeatherType, ZoneType};

pub const STAGE: &str = "engine:forecast";

/// Forecast horizons in hours, nearest first.
pub const CHECKPOINT_HOURS: [f32; 5] = [1.0, 3.0, 6.0, 12.0, 24.0];

/// Horizon at which the time decay bottoms out.
const DECAY_HORIZON_HOURS: f32 = 48.0;
const MIN_TIME_FACTOR: f32 = 0.1;
/// Storm wind that maps to full predicted intensity.
const INTENSITY_WIND_SCALE: f32 = 100.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeatherPrediction {
    pub weather: WeatherType,
    pub hours_ahead: f32,
    pub confidence: f32,
    pub location: Vec2,
    pub zone: ZoneType,
    pub intensity: f32,
    pub details: Vec<String>,
}

/// How predictable a zone's climate is.
pub fn zone_stability(zone_type: ZoneType) -> f32 {
    match zone_type {
        ZoneType::Desert => 0.9,
        ZoneType::Polar => 0.85,
        ZoneType::Temperate => 0.8,
        ZoneType::Coastal => 0.75,
        ZoneType::Tropical => 0.7,
        ZoneType::Mountain => 0.6,
    }
}

#[derive(Clone, Debug)]
pub struct PredictionEngine {
    settings: PredictionSettings,
    predictions: Vec<WeatherPrediction>,
    since_update: f32,
    rng: WeatherRng,
    signals: Vec<Signal>,
}

impl PredictionEngine {
    pub fn new(settings: PredictionSettings, rng: WeatherRng) -> Self {
        Self {
            settings,
            predictions: Vec::new(),
            since_update: 0.0,
            rng,
            signals: Vec::new(),
        }
    }

    /// Regenerate the forecast every `interval_seconds`.
    pub fn update(
        &mut self,
        dt: f32,
        zones: &ClimateZoneRegistry,
        storms: &StormEngine,
        events: &WeatherEventEngine,
    ) {
        let interval = self.settings.interval_seconds;
        self.since_update += dt.max(0.0);
        if self.since_update < interval {
            return;
        }
        // Overshoot counts toward the next refresh.
        self.since_update = if interval > 0.0 {
            self.since_update % interval
        } else {
            0.0
        };
        let horizon = self.settings.horizon_hours;
        self.generate_predictions(zones, storms, events, horizon);
    }

    /// Replace the forecast with one prediction per zone per checkpoint up to
    /// `horizon_hours`. Returns the number of predictions produced.
    pub fn generate_predictions(
        &mut self,
        zones: &ClimateZoneRegistry,
        storms: &StormEngine,
        events: &WeatherEventEngine,
        horizon_hours: f32,
    ) -> usize {
        let mut predictions = Vec::new();
        for hours in CHECKPOINT_HOURS.into_iter().filter(|h| *h <= horizon_hours) {
            for zone in zones.zones() {
                let location = ClimateZoneRegistry::sample_location(&mut self.rng, zone);
                predictions.push(self.predict_at(zones, storms, events, location, hours));
            }
        }
        let count = predictions.len();
        self.predictions = predictions;
        debug!(count, horizon_hours, "forecast regenerated");
        self.signals.push(Signal::PredictionsUpdated { count });
        count
    }

    /// Confidence in a forecast for `location`, `hours_ahead` into the future.
    pub fn confidence_at(&self, zones: &ClimateZoneRegistry, location: Vec2, hours_ahead: f32) -> f32 {
        let time_factor =
            (1.0 - hours_ahead.max(0.0) / DECAY_HORIZON_HOURS).clamp(MIN_TIME_FACTOR, 1.0);
        let stability = zone_stability(zones.zone_at(location).zone_type);
        clamp_unit(time_factor * stability * self.settings.global_accuracy)
    }

    pub fn predict_at(
        &mut self,
        zones: &ClimateZoneRegistry,
        storms: &StormEngine,
        events: &WeatherEventEngine,
        location: Vec2,
        hours_ahead: f32,
    ) -> WeatherPrediction {
        let zone = zones.zone_at(location);
        let weather = self
            .rng
            .index(zone.common_weather.len())
            .map_or(WeatherType::Clear, |index| zone.common_weather[index].0);

        let mut details = Vec::new();
        let storm_wind = storms.wind_speed_at(location);
        for storm in storms.storms_at(location) {
            details.push(format!("{} storm passing through", storm.intensity));
        }
        let mut event_intensity: f32 = 0.0;
        for event in events.events_at(location) {
            details.push(format!("{} in effect", event.event_type));
            event_intensity = event_intensity.max(event.intensity);
        }
        let intensity = clamp_unit((storm_wind / INTENSITY_WIND_SCALE).max(event_intensity));

        WeatherPrediction {
            weather,
            hours_ahead,
            confidence: self.confidence_at(zones, location, hours_ahead),
            location,
            zone: zone.zone_type,
            intensity,
            details,
        }
    }

    pub fn predictions(&self) -> &[WeatherPrediction] {
        &self.predictions
    }

    /// Predictions whose sampled location lies within `radius` of `location`.
    pub fn predictions_near(&self, location: Vec2, radius: f32) -> impl Iterator<Item = &WeatherPrediction> {
        self.predictions
            .iter()
            .filter(move |prediction| prediction.location.distance(location) <= radius)
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{climate, hazards, storms};
    use crate::io::config::{EventSettings, StormSettings};
    use crate::types::StormIntensity;
    use proptest::prelude::*;

    struct Fixture {
        zones: ClimateZoneRegistry,
        storms: StormEngine,
        events: WeatherEventEngine,
        engine: PredictionEngine,
    }

    fn fixture(interval: f32) -> Fixture {
        Fixture {
            zones: ClimateZoneRegistry::with_default_zones(86_400.0, WeatherRng::from_stage(3, climate::STAGE)),
            storms: StormEngine::new(StormSettings::default(), WeatherRng::from_stage(3, storms::STAGE)),
            events: WeatherEventEngine::new(EventSettings::default(), WeatherRng::from_stage(3, hazards::STAGE)),
            engine: PredictionEngine::new(
                PredictionSettings {
                    interval_seconds: interval,
                    global_accuracy: 0.85,
                    horizon_hours: 24.0,
                },
                WeatherRng::from_stage(3, STAGE),
            ),
        }
    }

    const DESERT: Vec2 = Vec2::new(0.0, 30_000.0);

    #[test]
    fn near_forecasts_beat_far_ones() {
        let mut f = fixture(300.0);
        let near = f.engine.predict_at(&f.zones, &f.storms, &f.events, DESERT, 1.0);
        let far = f.engine.predict_at(&f.zones, &f.storms, &f.events, DESERT, 48.0);
        assert_eq!(near.zone, ZoneType::Desert);
        assert!(near.confidence > far.confidence);
        let expected_near = (1.0 - 1.0 / 48.0) * 0.9 * 0.85;
        assert!((near.confidence - expected_near).abs() < 1e-5);
        assert!((far.confidence - 0.1 * 0.9 * 0.85).abs() < 1e-5);
    }

    #[test]
    fn predicted_weather_comes_from_zone_table() {
        let mut f = fixture(300.0);
        let desert = f.zones.zone(ZoneType::Desert).unwrap().clone();
        for _ in 0..50 {
            let prediction = f.engine.predict_at(&f.zones, &f.storms, &f.events, DESERT, 6.0);
            assert!(desert.common_weather.iter().any(|(w, _)| *w == prediction.weather));
        }
    }

    #[test]
    fn checkpoints_respect_horizon() {
        let mut f = fixture(300.0);
        let zone_count = f.zones.len();
        assert_eq!(f.engine.generate_predictions(&f.zones, &f.storms, &f.events, 6.0), 3 * zone_count);
        assert_eq!(f.engine.generate_predictions(&f.zones, &f.storms, &f.events, 24.0), 5 * zone_count);
        assert_eq!(f.engine.generate_predictions(&f.zones, &f.storms, &f.events, 0.5), 0);
        assert!(f.engine.predictions().is_empty());
    }

    #[test]
    fn update_waits_for_interval() {
        let mut f = fixture(300.0);
        f.engine.update(299.0, &f.zones, &f.storms, &f.events);
        assert!(f.engine.take_signals().is_empty());
        f.engine.update(1.0, &f.zones, &f.storms, &f.events);
        let signals = f.engine.take_signals();
        assert_eq!(signals, vec![Signal::PredictionsUpdated { count: 5 * f.zones.len() }]);
    }

    #[test]
    fn refresh_cadence_keeps_overshoot() {
        let mut f = fixture(300.0);
        let mut refreshed_on = Vec::new();
        for step in 1..=10 {
            f.engine.update(70.0, &f.zones, &f.storms, &f.events);
            if !f.engine.take_signals().is_empty() {
                refreshed_on.push(step);
            }
        }
        // 350 s leaves 50 s toward the next refresh, which then lands at 630 s.
        assert_eq!(refreshed_on, vec![5, 9]);
    }

    #[test]
    fn storms_raise_predicted_intensity() {
        let mut f = fixture(300.0);
        f.storms.generate_storm(DESERT, StormIntensity::Category2).unwrap();
        let prediction = f.engine.predict_at(&f.zones, &f.storms, &f.events, DESERT, 1.0);
        assert!(prediction.intensity > 0.9);
        assert_eq!(prediction.details.len(), 1);
    }

    proptest! {
        #[test]
        fn confidence_is_bounded_and_decays(
            location in crate::testing::location_strategy(),
            near in 0.0f32..48.0,
            extra in 0.0f32..100.0,
        ) {
            let f = fixture(300.0);
            let a = f.engine.confidence_at(&f.zones, location, near);
            let b = f.engine.confidence_at(&f.zones, location, near + extra);
            prop_assert!((0.0..=1.0).contains(&a));
            prop_assert!((0.0..=1.0).contains(&b));
            prop_assert!(a >= b);
        }
    }
}
