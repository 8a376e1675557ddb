use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::engines::climate::{ClimateZone, Span};
use crate::engines::patterns::WeatherPattern;
use crate::error::ConfigError;
use crate::state::profile::{default_presets, WeatherPreset, WeatherProfile};
use crate::types::WeatherType;

/// Full engine configuration, usually loaded once at start-up.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Length of one simulated day in seconds.
    pub day_length_seconds: f32,
    /// Wind speed above which a location is unsafe for players.
    pub unsafe_wind_speed: f32,
    pub storms: StormSettings,
    pub events: EventSettings,
    pub prediction: PredictionSettings,
    pub state_machine: StateMachineSettings,
    pub presets: Vec<WeatherPreset>,
    /// Replaces the built-in zone set when present.
    pub zones: Option<Vec<ClimateZone>>,
    pub patterns: Vec<WeatherPattern>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub profile_overrides: BTreeMap<WeatherType, WeatherProfile>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            day_length_seconds: 86_400.0,
            unsafe_wind_speed: 100.0,
            storms: StormSettings::default(),
            events: EventSettings::default(),
            prediction: PredictionSettings::default(),
            state_machine: StateMachineSettings::default(),
            presets: default_presets(),
            zones: None,
            patterns: Vec::new(),
            profile_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StormSettings {
    pub max_active_storms: usize,
    /// Chance per storm update that a new storm spawns somewhere.
    pub generation_probability: f32,
}

impl Default for StormSettings {
    fn default() -> Self {
        Self {
            max_active_storms: 5,
            generation_probability: 0.001,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub max_active_events: usize,
    /// Chance per event update that zones roll for new events.
    pub generation_probability: f32,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            max_active_events: 10,
            generation_probability: 0.01,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSettings {
    /// Seconds between forecast regenerations.
    pub interval_seconds: f32,
    pub global_accuracy: f32,
    pub horizon_hours: f32,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 300.0,
            global_accuracy: 0.85,
            horizon_hours: 24.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMachineSettings {
    /// Seconds between automatic weather evaluations.
    pub change_interval: f32,
    pub minimum_stable_duration: f32,
    pub default_transition_duration: f32,
    pub automatic_changes: bool,
    pub initial_weather: WeatherType,
}

impl Default for StateMachineSettings {
    fn default() -> Self {
        Self {
            change_interval: 300.0,
            minimum_stable_duration: 120.0,
            default_transition_duration: 60.0,
            automatic_changes: true,
            initial_weather: WeatherType::Clear,
        }
    }
}

impl WeatherConfig {
    /// Load a configuration JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open config file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize and validate a configuration from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader).context("invalid weather config json")?;
        config.validate().context("weather config failed validation")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("day_length_seconds", self.day_length_seconds)?;
        non_negative("unsafe_wind_speed", self.unsafe_wind_speed)?;
        probability("storms.generation_probability", self.storms.generation_probability)?;
        probability("events.generation_probability", self.events.generation_probability)?;
        positive("prediction.interval_seconds", self.prediction.interval_seconds)?;
        probability("prediction.global_accuracy", self.prediction.global_accuracy)?;
        non_negative("prediction.horizon_hours", self.prediction.horizon_hours)?;
        positive("state_machine.change_interval", self.state_machine.change_interval)?;
        non_negative(
            "state_machine.minimum_stable_duration",
            self.state_machine.minimum_stable_duration,
        )?;
        non_negative(
            "state_machine.default_transition_duration",
            self.state_machine.default_transition_duration,
        )?;
        for preset in &self.presets {
            non_negative("presets.probability", preset.probability)?;
            if let Some(duration) = preset.transition_duration {
                non_negative("presets.transition_duration", duration)?;
            }
        }
        let mut zone_types = BTreeSet::new();
        for zone in self.zones.iter().flatten() {
            probability("zones.event_probability", zone.event_probability)?;
            ordered("zones.latitude", zone.latitude)?;
            ordered("zones.longitude", zone.longitude)?;
            if !zone_types.insert(zone.zone_type) {
                return Err(ConfigError::DuplicateZone(zone.zone_type));
            }
        }
        let mut pattern_names = BTreeSet::new();
        for pattern in &self.patterns {
            probability("patterns.activation_probability", pattern.activation_probability)?;
            if pattern.weather_sequence.is_empty()
                || pattern.weather_sequence.len() != pattern.durations.len()
            {
                return Err(ConfigError::MalformedPattern {
                    name: pattern.name.clone(),
                    weather: pattern.weather_sequence.len(),
                    durations: pattern.durations.len(),
                });
            }
            for &duration in &pattern.durations {
                non_negative("patterns.durations", duration)?;
            }
            if !pattern_names.insert(pattern.name.as_str()) {
                return Err(ConfigError::DuplicatePattern(pattern.name.clone()));
            }
        }
        Ok(())
    }
}

fn ordered(field: &'static str, span: Span) -> Result<(), ConfigError> {
    if span.min <= span.max {
        Ok(())
    } else {
        Err(ConfigError::InvertedSpan {
            field,
            min: span.min,
            max: span.max,
        })
    }
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneType;
    use std::path::PathBuf;

    #[test]
    fn repository_configs_deserialize() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let configs_dir = manifest_dir.join("../../testdata/configs");
        for name in ["default.json", "stormy_tropics.json"] {
            let path = configs_dir.join(name);
            let config = WeatherConfig::load_from_path(&path)
                .unwrap_or_else(|err| panic!("failed to load {:?}: {}", path, err));
            assert!(
                config.storms.max_active_storms > 0,
                "config {:?} must allow storms",
                path
            );
            assert!(!config.presets.is_empty(), "config {:?} needs presets", path);
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: WeatherConfig =
            serde_json::from_str(r#"{"storms": {"max_active_storms": 2}}"#).unwrap();
        assert_eq!(config.storms.max_active_storms, 2);
        assert_eq!(config.storms.generation_probability, 0.001);
        assert_eq!(config.state_machine.change_interval, 300.0);
        assert_eq!(config.presets.len(), default_presets().len());
    }

    #[test]
    fn profile_overrides_parse_as_pairs() {
        let json = r#"{
            "profile_overrides": [["fog", {
                "lighting_multiplier": 0.5, "wetness": 0.2, "fog_density": 0.9,
                "fog_color": [0.5, 0.5, 0.5], "cloud_coverage": 0.7, "cloud_density": 0.4,
                "sun_intensity": 0.3, "sky_light_intensity": 0.6, "precipitation": "none",
                "precipitation_intensity": 0.0, "temperature_offset": -2.0,
                "humidity": 0.95, "precipitation_rate": 0.0
            }]]
        }"#;
        let config: WeatherConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.profile_overrides[&WeatherType::Fog].fog_density, 0.9);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let json = r#"{"events": {"generation_probability": 1.5}}"#;
        let err = WeatherConfig::from_reader(json.as_bytes()).unwrap_err();
        let config_err = err
            .downcast_ref::<ConfigError>()
            .expect("validation error is preserved");
        assert_eq!(
            *config_err,
            ConfigError::ProbabilityOutOfRange {
                field: "events.generation_probability",
                value: 1.5
            }
        );
    }

    fn validation_error(json: &str) -> ConfigError {
        let err = WeatherConfig::from_reader(json.as_bytes()).unwrap_err();
        err.downcast_ref::<ConfigError>()
            .expect("validation error is preserved")
            .clone()
    }

    #[test]
    fn negative_pattern_duration_is_rejected() {
        let json = r#"{"patterns": [
            {"name": "neg", "weather_sequence": ["rain"], "durations": [-50.0]}
        ]}"#;
        assert_eq!(
            validation_error(json),
            ConfigError::Negative {
                field: "patterns.durations",
                value: -50.0
            }
        );
    }

    #[test]
    fn mismatched_pattern_lengths_are_rejected() {
        let json = r#"{"patterns": [
            {"name": "bad", "weather_sequence": ["rain", "fog"], "durations": [60.0]}
        ]}"#;
        assert_eq!(
            validation_error(json),
            ConfigError::MalformedPattern {
                name: "bad".to_string(),
                weather: 2,
                durations: 1
            }
        );
    }

    #[test]
    fn duplicate_pattern_names_are_rejected() {
        let json = r#"{"patterns": [
            {"name": "twice", "weather_sequence": ["rain"], "durations": [60.0]},
            {"name": "twice", "weather_sequence": ["fog"], "durations": [60.0]}
        ]}"#;
        assert_eq!(
            validation_error(json),
            ConfigError::DuplicatePattern("twice".to_string())
        );
    }

    fn zone_json(zone_type: &str, lat_min: f32, lat_max: f32) -> String {
        format!(
            r#"{{"zone_type": "{zone_type}",
                "latitude": {{"min": {lat_min:?}, "max": {lat_max:?}}},
                "longitude": {{"min": -10.0, "max": 10.0}},
                "base_temperature": 20.0, "temperature_variation": 5.0,
                "base_humidity": 0.5, "humidity_variation": 0.1,
                "common_weather": [["clear", 1.0]], "possible_events": [],
                "event_probability": 0.1}}"#
        )
    }

    #[test]
    fn duplicate_zone_types_are_rejected() {
        let json = format!(
            r#"{{"zones": [{}, {}]}}"#,
            zone_json("desert", 0.0, 10.0),
            zone_json("desert", 20.0, 30.0)
        );
        assert_eq!(
            validation_error(&json),
            ConfigError::DuplicateZone(ZoneType::Desert)
        );
    }

    #[test]
    fn inverted_zone_span_is_rejected() {
        let json = format!(r#"{{"zones": [{}]}}"#, zone_json("polar", 50.0, 10.0));
        assert_eq!(
            validation_error(&json),
            ConfigError::InvertedSpan {
                field: "zones.latitude",
                min: 50.0,
                max: 10.0
            }
        );
    }
}
