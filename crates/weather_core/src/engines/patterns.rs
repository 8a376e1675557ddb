//! Named, scripted weather sequences.
//!
//! Active patterns only track where they are in their script. Feeding the
//! scripted weather back into zone generation is left to callers through
//! [`PatternEngine::scripted_weather`]; nothing here overrides the baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WeatherError;
use crate::rng::WeatherRng;
use crate::signal::Signal;
use crate::types::{WeatherEventType, WeatherType, ZoneType};

pub const STAGE: &str = "engine:patterns";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherPattern {
    pub name: String,
    pub weather_sequence: Vec<WeatherType>,
    /// Seconds spent on each step of `weather_sequence`.
    pub durations: Vec<f32>,
    /// Chance per pattern update that an inactive pattern switches itself on.
    #[serde(default)]
    pub activation_probability: f32,
    #[serde(default)]
    pub zone: Option<ZoneType>,
    #[serde(default)]
    pub triggered_events: Vec<WeatherEventType>,
}

/// Position of an active pattern within its script.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternCursor {
    pub name: String,
    pub step: usize,
    pub elapsed_in_step: f64,
}

#[derive(Clone, Debug)]
pub struct PatternEngine {
    patterns: BTreeMap<String, WeatherPattern>,
    active: Vec<PatternCursor>,
    rng: WeatherRng,
    signals: Vec<Signal>,
}

impl PatternEngine {
    pub fn new(rng: WeatherRng) -> Self {
        Self {
            patterns: BTreeMap::new(),
            active: Vec::new(),
            rng,
            signals: Vec::new(),
        }
    }

    pub fn register_pattern(&mut self, pattern: WeatherPattern) -> Result<(), WeatherError> {
        if self.patterns.contains_key(&pattern.name) {
            warn!(name = %pattern.name, "weather pattern already registered");
            return Err(WeatherError::DuplicatePattern(pattern.name));
        }
        if pattern.weather_sequence.is_empty()
            || pattern.weather_sequence.len() != pattern.durations.len()
        {
            warn!(name = %pattern.name, "weather pattern sequence and durations disagree");
            return Err(WeatherError::MalformedPattern {
                weather: pattern.weather_sequence.len(),
                durations: pattern.durations.len(),
                name: pattern.name,
            });
        }
        self.patterns.insert(pattern.name.clone(), pattern);
        Ok(())
    }

    pub fn activate(&mut self, name: &str) -> Result<(), WeatherError> {
        if !self.patterns.contains_key(name) {
            warn!(name, "activate requested for unknown weather pattern");
            return Err(WeatherError::UnknownPattern(name.to_string()));
        }
        if self.is_active(name) {
            debug!(name, "weather pattern already active");
            return Ok(());
        }
        self.active.push(PatternCursor {
            name: name.to_string(),
            step: 0,
            elapsed_in_step: 0.0,
        });
        self.signals.push(Signal::PatternActivated {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn deactivate(&mut self, name: &str) -> Result<(), WeatherError> {
        if !self.patterns.contains_key(name) {
            warn!(name, "deactivate requested for unknown weather pattern");
            return Err(WeatherError::UnknownPattern(name.to_string()));
        }
        let before = self.active.len();
        self.active.retain(|cursor| cursor.name != name);
        if self.active.len() != before {
            self.signals.push(Signal::PatternDeactivated {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Advance active scripts and roll activation for idle patterns.
    pub fn update(&mut self, dt: f32) {
        let dt = f64::from(dt.max(0.0));
        let patterns = &self.patterns;
        let signals = &mut self.signals;
        self.active.retain_mut(|cursor| {
            let Some(pattern) = patterns.get(&cursor.name) else {
                return false;
            };
            cursor.elapsed_in_step += dt;
            while let Some(&duration) = pattern.durations.get(cursor.step) {
                let duration = f64::from(duration);
                if cursor.elapsed_in_step < duration {
                    return true;
                }
                cursor.elapsed_in_step -= duration;
                cursor.step += 1;
            }
            debug!(name = %cursor.name, "weather pattern finished");
            signals.push(Signal::PatternDeactivated {
                name: cursor.name.clone(),
            });
            false
        });

        let idle: Vec<String> = self
            .patterns
            .values()
            .filter(|pattern| !self.is_active(&pattern.name))
            .map(|pattern| pattern.name.clone())
            .collect();
        for name in idle {
            let probability = self.patterns[&name].activation_probability;
            if self.rng.chance(probability) {
                let _ = self.activate(&name);
            }
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|cursor| cursor.name == name)
    }

    pub fn pattern(&self, name: &str) -> Option<&WeatherPattern> {
        self.patterns.get(name)
    }

    pub fn active_patterns(&self) -> &[PatternCursor] {
        &self.active
    }

    /// Weather the named pattern currently prescribes, if it is running.
    pub fn scripted_weather(&self, name: &str) -> Option<WeatherType> {
        let cursor = self.active.iter().find(|cursor| cursor.name == name)?;
        self.patterns
            .get(name)?
            .weather_sequence
            .get(cursor.step)
            .copied()
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}
