//! Per-weather-type environment parameters.
//!
//! Rendering and gameplay collaborators never read these tables directly;
//! the state machine blends two profiles during a transition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::WeatherType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationKind {
    #[default]
    None,
    Rain,
    Snow,
    Hail,
    Dust,
}

/// Constants describing how one weather type looks and feels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherProfile {
    pub lighting_multiplier: f32,
    pub wetness: f32,
    pub fog_density: f32,
    pub fog_color: [f32; 3],
    pub cloud_coverage: f32,
    pub cloud_density: f32,
    pub sun_intensity: f32,
    pub sky_light_intensity: f32,
    pub precipitation: PrecipitationKind,
    pub precipitation_intensity: f32,
    /// Degrees Celsius added to the zone temperature.
    pub temperature_offset: f32,
    pub humidity: f32,
    /// Millimetres per hour.
    pub precipitation_rate: f32,
}

impl WeatherProfile {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        lighting_multiplier: f32,
        wetness: f32,
        fog_density: f32,
        fog_color: [f32; 3],
        cloud_coverage: f32,
        cloud_density: f32,
        sun_intensity: f32,
        sky_light_intensity: f32,
        precipitation: PrecipitationKind,
        precipitation_intensity: f32,
        temperature_offset: f32,
        humidity: f32,
        precipitation_rate: f32,
    ) -> Self {
        Self {
            lighting_multiplier,
            wetness,
            fog_density,
            fog_color,
            cloud_coverage,
            cloud_density,
            sun_intensity,
            sky_light_intensity,
            precipitation,
            precipitation_intensity,
            temperature_offset,
            humidity,
            precipitation_rate,
        }
    }
}

const GREY: [f32; 3] = [0.6, 0.62, 0.65];
const BLUE_HAZE: [f32; 3] = [0.7, 0.8, 0.95];
const STORM_GREY: [f32; 3] = [0.35, 0.37, 0.42];
const WHITE_OUT: [f32; 3] = [0.92, 0.94, 0.97];
const DUST: [f32; 3] = [0.76, 0.6, 0.4];

use PrecipitationKind as P;

const DEFAULT_PROFILES: [(WeatherType, WeatherProfile); 14] = [
    (WeatherType::Clear, WeatherProfile::new(1.0, 0.0, 0.01, BLUE_HAZE, 0.05, 0.1, 1.0, 1.0, P::None, 0.0, 2.0, 0.35, 0.0)),
    (WeatherType::PartlyCloudy, WeatherProfile::new(0.9, 0.0, 0.02, BLUE_HAZE, 0.35, 0.3, 0.9, 0.95, P::None, 0.0, 1.0, 0.45, 0.0)),
    (WeatherType::Cloudy, WeatherProfile::new(0.75, 0.05, 0.04, GREY, 0.65, 0.5, 0.6, 0.8, P::None, 0.0, 0.0, 0.55, 0.0)),
    (WeatherType::Overcast, WeatherProfile::new(0.6, 0.1, 0.06, GREY, 0.9, 0.7, 0.35, 0.7, P::None, 0.0, -1.0, 0.65, 0.0)),
    (WeatherType::Fog, WeatherProfile::new(0.55, 0.2, 0.6, GREY, 0.7, 0.4, 0.3, 0.6, P::None, 0.0, -2.0, 0.95, 0.0)),
    (WeatherType::LightRain, WeatherProfile::new(0.65, 0.4, 0.08, GREY, 0.75, 0.6, 0.45, 0.7, P::Rain, 0.3, -2.0, 0.75, 1.5)),
    (WeatherType::Rain, WeatherProfile::new(0.5, 0.7, 0.12, GREY, 0.85, 0.75, 0.3, 0.6, P::Rain, 0.6, -3.0, 0.85, 5.0)),
    (WeatherType::HeavyRain, WeatherProfile::new(0.4, 0.9, 0.18, STORM_GREY, 0.95, 0.9, 0.2, 0.5, P::Rain, 0.9, -4.0, 0.95, 15.0)),
    (WeatherType::Thunderstorm, WeatherProfile::new(0.3, 1.0, 0.2, STORM_GREY, 1.0, 1.0, 0.1, 0.4, P::Rain, 1.0, -5.0, 0.95, 25.0)),
    (WeatherType::LightSnow, WeatherProfile::new(0.8, 0.2, 0.1, WHITE_OUT, 0.7, 0.5, 0.5, 0.85, P::Snow, 0.3, -8.0, 0.7, 0.8)),
    (WeatherType::Snow, WeatherProfile::new(0.7, 0.35, 0.2, WHITE_OUT, 0.85, 0.7, 0.35, 0.8, P::Snow, 0.6, -10.0, 0.8, 2.5)),
    (WeatherType::Blizzard, WeatherProfile::new(0.45, 0.5, 0.7, WHITE_OUT, 1.0, 1.0, 0.1, 0.6, P::Snow, 1.0, -18.0, 0.85, 6.0)),
    (WeatherType::Sandstorm, WeatherProfile::new(0.4, 0.0, 0.8, DUST, 0.6, 0.8, 0.25, 0.5, P::Dust, 0.9, 4.0, 0.1, 0.0)),
    (WeatherType::Hail, WeatherProfile::new(0.45, 0.6, 0.15, STORM_GREY, 0.95, 0.9, 0.2, 0.5, P::Hail, 0.8, -6.0, 0.8, 8.0)),
];

/// Lookup table from weather type to its profile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileTable {
    profiles: BTreeMap<WeatherType, WeatherProfile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILES.into_iter().collect(),
        }
    }
}

impl ProfileTable {
    /// Default table with the given entries replaced.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a WeatherType, &'a WeatherProfile)>,
    {
        let mut table = Self::default();
        for (weather, profile) in overrides {
            table.profiles.insert(*weather, *profile);
        }
        table
    }

    /// Profile for `weather`; unknown entries fall back to the clear-sky profile.
    pub fn get(&self, weather: WeatherType) -> WeatherProfile {
        self.profiles
            .get(&weather)
            .or_else(|| self.profiles.get(&WeatherType::Clear))
            .copied()
            .unwrap_or(DEFAULT_PROFILES[0].1)
    }
}

/// A selectable weather type with its generation weight and transition timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherPreset {
    pub weather: WeatherType,
    pub cloud_coverage: f32,
    pub precipitation_intensity: f32,
    pub wind_speed: f32,
    pub probability: f32,
    /// Seconds; falls back to the state machine default when absent.
    #[serde(default)]
    pub transition_duration: Option<f32>,
}

impl WeatherPreset {
    pub fn new(
        weather: WeatherType,
        cloud_coverage: f32,
        precipitation_intensity: f32,
        wind_speed: f32,
        probability: f32,
        transition_duration: Option<f32>,
    ) -> Self {
        Self {
            weather,
            cloud_coverage,
            precipitation_intensity,
            wind_speed,
            probability,
            transition_duration,
        }
    }
}

pub fn default_presets() -> Vec<WeatherPreset> {
    vec![
        WeatherPreset::new(WeatherType::Clear, 0.05, 0.0, 5.0, 0.35, Some(45.0)),
        WeatherPreset::new(WeatherType::PartlyCloudy, 0.35, 0.0, 8.0, 0.2, Some(45.0)),
        WeatherPreset::new(WeatherType::Cloudy, 0.65, 0.0, 10.0, 0.15, Some(60.0)),
        WeatherPreset::new(WeatherType::Rain, 0.85, 0.6, 15.0, 0.1, Some(90.0)),
        WeatherPreset::new(WeatherType::HeavyRain, 0.95, 0.9, 25.0, 0.05, Some(120.0)),
        WeatherPreset::new(WeatherType::Thunderstorm, 1.0, 1.0, 35.0, 0.05, Some(120.0)),
        WeatherPreset::new(WeatherType::Fog, 0.7, 0.0, 2.0, 0.05, Some(90.0)),
        WeatherPreset::new(WeatherType::Snow, 0.85, 0.6, 12.0, 0.05, None),
    ]
}
