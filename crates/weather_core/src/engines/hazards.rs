//! Discrete weather events: blizzards, heatwaves, floods and friends.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engines::climate::{ClimateZone, ClimateZoneRegistry};
use crate::error::WeatherError;
use crate::io::config::EventSettings;
use crate::math::Vec2;
use crate::rng::WeatherRng;
use crate::signal::Signal;
use crate::types::WeatherEventType;

pub const STAGE: &str = "engine:events";

const HEAT_DAMAGE_THRESHOLD_C: f32 = 40.0;
const COLD_DAMAGE_THRESHOLD_C: f32 = -10.0;
const DAMAGE_PER_DEGREE: f32 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeatherEvent {
    pub id: u64,
    pub event_type: WeatherEventType,
    pub location: Vec2,
    pub radius: f32,
    /// Seconds.
    pub duration: f32,
    pub start_time: f64,
    pub intensity: f32,
    pub active: bool,
    pub predicted: bool,
    pub parameters: BTreeMap<String, f32>,
}

impl WeatherEvent {
    /// Unstarted event; ids and start times are stamped on trigger.
    pub fn new(
        event_type: WeatherEventType,
        location: Vec2,
        radius: f32,
        duration: f32,
        intensity: f32,
    ) -> Self {
        Self {
            id: 0,
            event_type,
            location,
            radius,
            duration,
            start_time: 0.0,
            intensity,
            active: false,
            predicted: false,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: f32) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn covers(&self, location: Vec2) -> bool {
        self.active && self.location.distance(location) <= self.radius
    }

    pub fn has_expired(&self, now: f64) -> bool {
        now - self.start_time >= f64::from(self.duration)
    }

    pub fn visibility_multiplier(&self) -> f32 {
        match self.event_type {
            WeatherEventType::Blizzard | WeatherEventType::Sandstorm => 0.1,
            WeatherEventType::Fog => 0.2,
            _ => 1.0,
        }
    }
}

/// Decides whether whoever stands at a location is shielded from an event.
pub trait ProtectionCheck {
    fn is_protected(&self, location: Vec2, event_type: WeatherEventType) -> bool;
}

/// Nobody carries protective equipment yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProtection;

impl ProtectionCheck for NoProtection {
    fn is_protected(&self, _location: Vec2, _event_type: WeatherEventType) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct WeatherEventEngine {
    settings: EventSettings,
    events: Vec<WeatherEvent>,
    next_id: u64,
    rng: WeatherRng,
    signals: Vec<Signal>,
}

impl WeatherEventEngine {
    pub fn new(settings: EventSettings, rng: WeatherRng) -> Self {
        Self {
            settings,
            events: Vec::new(),
            next_id: 1,
            rng,
            signals: Vec::new(),
        }
    }

    /// Start `event` at `now`. Fails once the active list is full.
    pub fn trigger_event(&mut self, mut event: WeatherEvent, now: f64) -> Result<u64, WeatherError> {
        if self.events.len() >= self.settings.max_active_events {
            warn!(
                max = self.settings.max_active_events,
                event = %event.event_type,
                "weather event skipped at capacity"
            );
            return Err(WeatherError::EventCapacity {
                max: self.settings.max_active_events,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        event.id = id;
        event.start_time = now;
        event.active = true;
        info!(id, event = %event.event_type, x = event.location.x, y = event.location.y, "weather event triggered");
        self.signals.push(Signal::WeatherEventTriggered {
            id,
            event_type: event.event_type,
            location: event.location,
        });
        self.events.push(event);
        Ok(id)
    }

    /// Retire expired events, then roll for new ones zone by zone.
    pub fn update(&mut self, now: f64, zones: &ClimateZoneRegistry) {
        let signals = &mut self.signals;
        self.events.retain(|event| {
            if event.has_expired(now) {
                debug!(id = event.id, event = %event.event_type, "weather event ended");
                signals.push(Signal::WeatherEventEnded {
                    id: event.id,
                    event_type: event.event_type,
                });
                false
            } else {
                true
            }
        });

        if !self.rng.chance(self.settings.generation_probability) {
            return;
        }
        for zone in zones.zones() {
            if self.events.len() >= self.settings.max_active_events {
                break;
            }
            if !self.rng.chance(zone.event_probability) {
                continue;
            }
            let event = self.roll_event(zone);
            let _ = self.trigger_event(event, now);
        }
    }

    fn roll_event(&mut self, zone: &ClimateZone) -> WeatherEvent {
        let candidates: &[WeatherEventType] = if zone.possible_events.is_empty() {
            &WeatherEventType::ALL
        } else {
            &zone.possible_events
        };
        let event_type = self
            .rng
            .index(candidates.len())
            .map_or(WeatherEventType::Fog, |index| candidates[index]);
        let location = ClimateZoneRegistry::sample_location(&mut self.rng, zone);
        let radius = self.rng.uniform(2_000.0, 15_000.0);
        let duration = self.rng.uniform(600.0, 3_600.0);
        let intensity = self.rng.uniform(0.3, 1.0);
        let event = WeatherEvent::new(event_type, location, radius, duration, intensity);
        match event_type {
            WeatherEventType::Heatwave => {
                event.with_parameter("temperature_delta", 8.0 + 12.0 * intensity)
            }
            WeatherEventType::Coldwave => {
                event.with_parameter("temperature_delta", -(8.0 + 12.0 * intensity))
            }
            WeatherEventType::Sandstorm | WeatherEventType::Tornado => {
                event.with_parameter("wind_speed", 40.0 + 80.0 * intensity)
            }
            WeatherEventType::Blizzard => event
                .with_parameter("wind_speed", 30.0 + 50.0 * intensity)
                .with_parameter("snowfall_rate", 5.0 * intensity),
            WeatherEventType::Flood => event.with_parameter("water_level", 2.0 * intensity),
            _ => event,
        }
    }

    /// Cancel event `id` before its duration runs out.
    pub fn end_event(&mut self, id: u64) -> Result<(), WeatherError> {
        let Some(index) = self.events.iter().position(|event| event.id == id) else {
            warn!(id, "end requested for unknown weather event");
            return Err(WeatherError::UnknownEvent(id));
        };
        let event = self.events.remove(index);
        self.signals.push(Signal::WeatherEventEnded {
            id,
            event_type: event.event_type,
        });
        Ok(())
    }

    pub fn events(&self) -> &[WeatherEvent] {
        &self.events
    }

    pub fn event(&self, id: u64) -> Option<&WeatherEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn events_at(&self, location: Vec2) -> impl Iterator<Item = &WeatherEvent> {
        self.events.iter().filter(move |event| event.covers(location))
    }

    pub fn is_affected(&self, location: Vec2) -> bool {
        self.events_at(location).next().is_some()
    }

    /// Earliest-triggered event covering `location`.
    pub fn event_at(&self, location: Vec2) -> Option<&WeatherEvent> {
        self.events_at(location).next()
    }

    /// Product of the visibility penalties of every covering event.
    pub fn visibility_multiplier_at(&self, location: Vec2) -> f32 {
        self.events_at(location)
            .map(WeatherEvent::visibility_multiplier)
            .product()
    }

    /// Temperature damage per second for an unprotected player at `location`.
    pub fn damage_at(
        &self,
        location: Vec2,
        temperature: f32,
        protection: &dyn ProtectionCheck,
    ) -> f32 {
        self.events_at(location)
            .filter(|event| !protection.is_protected(location, event.event_type))
            .map(|event| match event.event_type {
                WeatherEventType::Heatwave if temperature > HEAT_DAMAGE_THRESHOLD_C => {
                    (temperature - HEAT_DAMAGE_THRESHOLD_C) * DAMAGE_PER_DEGREE
                }
                WeatherEventType::Coldwave if temperature < COLD_DAMAGE_THRESHOLD_C => {
                    (COLD_DAMAGE_THRESHOLD_C - temperature) * DAMAGE_PER_DEGREE
                }
                _ => 0.0,
            })
            .sum()
    }

    /// Summed `temperature_delta` of covering events.
    pub fn temperature_delta_at(&self, location: Vec2) -> f32 {
        self.events_at(location)
            .filter_map(|event| event.parameters.get("temperature_delta"))
            .sum()
    }

    pub fn max_active_events(&self) -> usize {
        self.settings.max_active_events
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}
