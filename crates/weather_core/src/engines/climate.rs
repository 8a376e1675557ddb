//! Climate zone registry.
//!
//! Zones are flat rectangles on raw world coordinates (`y` latitude, `x`
//! longitude). Lookups scan in registration order and the first match wins.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::WeatherError;
use crate::math::Vec2;
use crate::rng::WeatherRng;
use crate::types::{WeatherEventType, WeatherType, ZoneType};

pub const STAGE: &str = "engine:climate";

/// Inclusive `[min, max]` interval on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn center(&self) -> f32 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateZone {
    pub zone_type: ZoneType,
    pub latitude: Span,
    pub longitude: Span,
    /// Degrees Celsius.
    pub base_temperature: f32,
    pub temperature_variation: f32,
    pub base_humidity: f32,
    pub humidity_variation: f32,
    /// Common weather types and their relative weights.
    pub common_weather: Vec<(WeatherType, f32)>,
    pub possible_events: Vec<WeatherEventType>,
    /// Chance per event update that this zone spawns an event.
    pub event_probability: f32,
}

impl ClimateZone {
    pub fn contains(&self, location: Vec2) -> bool {
        self.latitude.contains(location.y) && self.longitude.contains(location.x)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.longitude.center(), self.latitude.center())
    }

    /// Zone returned for locations outside every registered rectangle.
    pub fn fallback() -> Self {
        Self {
            zone_type: ZoneType::Temperate,
            latitude: Span::new(f32::MIN, f32::MAX),
            longitude: Span::new(f32::MIN, f32::MAX),
            base_temperature: 15.0,
            temperature_variation: 10.0,
            base_humidity: 0.5,
            humidity_variation: 0.2,
            common_weather: vec![
                (WeatherType::Clear, 0.4),
                (WeatherType::PartlyCloudy, 0.3),
                (WeatherType::Cloudy, 0.2),
                (WeatherType::Rain, 0.1),
            ],
            possible_events: vec![WeatherEventType::Fog, WeatherEventType::Thunderstorm],
            event_probability: 0.001,
        }
    }
}

/// Built-in planet layout: six latitude bands across a 200 000 unit square.
pub fn default_zones() -> Vec<ClimateZone> {
    let full_width = Span::new(-100_000.0, 100_000.0);
    [
        (ZoneType::Tropical, Span::new(-20_000.0, 20_000.0)),
        (ZoneType::Desert, Span::new(20_000.0, 45_000.0)),
        (ZoneType::Coastal, Span::new(-45_000.0, -20_000.0)),
        (ZoneType::Temperate, Span::new(45_000.0, 70_000.0)),
        (ZoneType::Mountain, Span::new(-100_000.0, -45_000.0)),
        (ZoneType::Polar, Span::new(70_000.0, 100_000.0)),
    ]
    .into_iter()
    .map(|(zone_type, latitude)| zone_template(zone_type, latitude, full_width))
    .collect()
}

fn zone_template(zone_type: ZoneType, latitude: Span, longitude: Span) -> ClimateZone {
    use WeatherEventType as E;
    use WeatherType as W;
    let (base_temperature, temperature_variation, base_humidity, humidity_variation) =
        match zone_type {
            ZoneType::Tropical => (30.0, 6.0, 0.8, 0.15),
            ZoneType::Desert => (38.0, 18.0, 0.15, 0.1),
            ZoneType::Temperate => (15.0, 10.0, 0.55, 0.2),
            ZoneType::Polar => (-25.0, 12.0, 0.4, 0.15),
            ZoneType::Mountain => (2.0, 14.0, 0.45, 0.2),
            ZoneType::Coastal => (20.0, 8.0, 0.7, 0.15),
        };
    let (common_weather, possible_events, event_probability) = match zone_type {
        ZoneType::Tropical => (
            vec![(W::Clear, 0.3), (W::PartlyCloudy, 0.2), (W::Rain, 0.25), (W::HeavyRain, 0.15), (W::Thunderstorm, 0.1)],
            vec![E::Thunderstorm, E::Flood, E::Heatwave],
            0.02,
        ),
        ZoneType::Desert => (
            vec![(W::Clear, 0.7), (W::PartlyCloudy, 0.2), (W::Sandstorm, 0.1)],
            vec![E::Sandstorm, E::Heatwave],
            0.015,
        ),
        ZoneType::Temperate => (
            vec![(W::Clear, 0.3), (W::PartlyCloudy, 0.25), (W::Cloudy, 0.2), (W::Rain, 0.15), (W::Fog, 0.1)],
            vec![E::Fog, E::Thunderstorm, E::Hailstorm, E::Tornado],
            0.01,
        ),
        ZoneType::Polar => (
            vec![(W::Clear, 0.3), (W::Overcast, 0.2), (W::LightSnow, 0.25), (W::Snow, 0.15), (W::Blizzard, 0.1)],
            vec![E::Blizzard, E::Coldwave],
            0.015,
        ),
        ZoneType::Mountain => (
            vec![(W::Clear, 0.25), (W::Cloudy, 0.25), (W::Fog, 0.2), (W::Snow, 0.2), (W::Hail, 0.1)],
            vec![E::Blizzard, E::Fog, E::Coldwave, E::Hailstorm],
            0.012,
        ),
        ZoneType::Coastal => (
            vec![(W::Clear, 0.3), (W::PartlyCloudy, 0.2), (W::Fog, 0.2), (W::Rain, 0.2), (W::Thunderstorm, 0.1)],
            vec![E::Fog, E::Flood, E::Thunderstorm],
            0.01,
        ),
    };
    ClimateZone {
        zone_type,
        latitude,
        longitude,
        base_temperature,
        temperature_variation,
        base_humidity,
        humidity_variation,
        common_weather,
        possible_events,
        event_probability,
    }
}

#[derive(Clone, Debug)]
pub struct ClimateZoneRegistry {
    zones: Vec<ClimateZone>,
    fallback: ClimateZone,
    day_length_seconds: f32,
    rng: WeatherRng,
}

impl ClimateZoneRegistry {
    pub fn new(day_length_seconds: f32, rng: WeatherRng) -> Self {
        Self {
            zones: Vec::new(),
            fallback: ClimateZone::fallback(),
            day_length_seconds,
            rng,
        }
    }

    /// Registry pre-populated with [`default_zones`].
    pub fn with_default_zones(day_length_seconds: f32, rng: WeatherRng) -> Self {
        let mut registry = Self::new(day_length_seconds, rng);
        registry.zones = default_zones();
        registry
    }

    /// Register `zone`. A zone type can only be registered once.
    pub fn register_zone(&mut self, zone: ClimateZone) -> Result<(), WeatherError> {
        if self.zone(zone.zone_type).is_some() {
            warn!(zone = %zone.zone_type, "climate zone already registered");
            return Err(WeatherError::DuplicateZone(zone.zone_type));
        }
        self.zones.push(zone);
        Ok(())
    }

    pub fn zone(&self, zone_type: ZoneType) -> Option<&ClimateZone> {
        self.zones.iter().find(|zone| zone.zone_type == zone_type)
    }

    pub fn zones(&self) -> &[ClimateZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First registered zone containing `location`, or the fallback zone.
    pub fn zone_at(&self, location: Vec2) -> &ClimateZone {
        self.zones
            .iter()
            .find(|zone| zone.contains(location))
            .unwrap_or(&self.fallback)
    }

    /// Temperature in degrees Celsius with a diurnal swing and noise.
    pub fn temperature_at(&mut self, location: Vec2, now: f64) -> f32 {
        let day_length = f64::from(self.day_length_seconds.max(1.0));
        let day_fraction = (now.rem_euclid(day_length) / day_length) as f32;
        let noise = self.rng.signed_unit();
        let zone = self.zone_at(location);
        zone.base_temperature
            + zone.temperature_variation * 0.5 * (TAU * day_fraction).sin()
            + zone.temperature_variation * 0.3 * noise
    }

    /// Relative humidity in `[0, 1]`.
    pub fn humidity_at(&mut self, location: Vec2) -> f32 {
        let roll = self.rng.signed_unit();
        let zone = self.zone_at(location);
        (zone.base_humidity + zone.humidity_variation * roll).clamp(0.0, 1.0)
    }

    /// Uniform point inside the zone rectangle. Unbounded spans sample their centre.
    pub fn sample_location(rng: &mut WeatherRng, zone: &ClimateZone) -> Vec2 {
        let axis = |rng: &mut WeatherRng, span: &Span| {
            if span.min == f32::MIN || span.max == f32::MAX {
                0.0
            } else {
                rng.uniform(span.min, span.max)
            }
        };
        let x = axis(rng, &zone.longitude);
        let y = axis(rng, &zone.latitude);
        Vec2::new(x, y)
    }
}
