//! Global weather state machine.
//!
//! Owns the single "current weather" value and walks it through
//! Stable → Evaluating → Transitioning → Stable. Every environment query is
//! recomputed from `(from, to, progress)` or the committed weather on demand.

pub mod profile;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::WeatherError;
use crate::io::config::StateMachineSettings;
use crate::math::{clamp_unit, lerp, lerp_rgb};
use crate::rng::WeatherRng;
use crate::signal::Signal;
use crate::types::WeatherType;

use profile::{PrecipitationKind, ProfileTable, WeatherPreset, WeatherProfile};

pub const STAGE: &str = "state:weather";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherState {
    #[default]
    Stable,
    Transitioning,
    Evaluating,
}

/// In-flight change between two weather types.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WeatherTransition {
    pub from: WeatherType,
    pub to: WeatherType,
    pub duration: f32,
    pub elapsed: f32,
    pub progress: f32,
}

impl WeatherTransition {
    fn new(from: WeatherType, to: WeatherType, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: 0.0,
            progress: 0.0,
        }
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        let raw = if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        };
        self.progress = clamp_unit(raw).max(self.progress);
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Clone, Debug)]
pub struct WeatherStateMachine {
    settings: StateMachineSettings,
    presets: Vec<WeatherPreset>,
    profiles: ProfileTable,
    current: WeatherType,
    state: WeatherState,
    transition: Option<WeatherTransition>,
    time_in_stable: f32,
    time_since_evaluation: f32,
    rng: WeatherRng,
    signals: Vec<Signal>,
}

impl WeatherStateMachine {
    pub fn new(
        settings: StateMachineSettings,
        presets: Vec<WeatherPreset>,
        profiles: ProfileTable,
        rng: WeatherRng,
    ) -> Self {
        let current = settings.initial_weather;
        Self {
            settings,
            presets,
            profiles,
            current,
            state: WeatherState::Stable,
            transition: None,
            time_in_stable: 0.0,
            time_since_evaluation: 0.0,
            rng,
            signals: Vec::new(),
        }
    }

    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.time_since_evaluation += dt;
        match self.state {
            WeatherState::Stable => {
                self.time_in_stable += dt;
                if self.settings.automatic_changes
                    && self.time_since_evaluation >= self.settings.change_interval
                {
                    self.state = WeatherState::Evaluating;
                    self.time_since_evaluation = 0.0;
                }
            }
            WeatherState::Evaluating => self.evaluate(),
            WeatherState::Transitioning => self.advance_transition(dt),
        }
    }

    fn evaluate(&mut self) {
        if self.time_in_stable < self.settings.minimum_stable_duration {
            debug!(
                time_in_stable = self.time_in_stable,
                "weather held stable below minimum duration"
            );
            self.state = WeatherState::Stable;
            return;
        }

        let picked = self
            .rng
            .weighted_index(self.presets.iter().map(|preset| preset.probability));
        let (target, duration) = match picked.and_then(|index| self.presets.get(index)) {
            Some(preset) => (
                preset.weather,
                preset
                    .transition_duration
                    .unwrap_or(self.settings.default_transition_duration),
            ),
            None => (
                WeatherType::Clear,
                self.settings.default_transition_duration,
            ),
        };

        if target == self.current {
            self.state = WeatherState::Stable;
        } else {
            self.begin_transition(target, duration);
        }
    }

    fn begin_transition(&mut self, to: WeatherType, duration: f32) {
        debug!(from = %self.current, %to, duration, "weather transition started");
        self.transition = Some(WeatherTransition::new(self.current, to, duration));
        self.state = WeatherState::Transitioning;
        self.signals.push(Signal::WeatherTransitionStarted {
            from: self.current,
            to,
            duration,
        });
    }

    fn advance_transition(&mut self, dt: f32) {
        let Some(transition) = self.transition.as_mut() else {
            self.state = WeatherState::Stable;
            return;
        };
        transition.advance(dt);
        if transition.is_complete() {
            let to = transition.to;
            self.commit(to);
        }
    }

    fn commit(&mut self, to: WeatherType) {
        let from = self.current;
        self.current = to;
        self.transition = None;
        self.state = WeatherState::Stable;
        self.time_in_stable = 0.0;
        if from != to {
            self.signals.push(Signal::WeatherChanged { from, to });
        }
    }

    /// Start a manual change toward `to`. Requesting the current weather is a no-op.
    pub fn request_transition(&mut self, to: WeatherType, duration: f32) -> Result<(), WeatherError> {
        if self.state == WeatherState::Transitioning {
            warn!(%to, "weather transition requested while another is running");
            return Err(WeatherError::TransitionInProgress);
        }
        if to == self.current {
            return Ok(());
        }
        self.begin_transition(to, duration.max(0.0));
        Ok(())
    }

    /// Commit `weather` without a transition, cancelling any in flight.
    pub fn set_weather_immediate(&mut self, weather: WeatherType) {
        self.commit(weather);
    }

    pub fn set_automatic_changes(&mut self, enabled: bool) {
        self.settings.automatic_changes = enabled;
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    pub fn state(&self) -> WeatherState {
        self.state
    }

    pub fn current_weather(&self) -> WeatherType {
        self.current
    }

    /// Destination of the running transition, or the current weather.
    pub fn target_weather(&self) -> WeatherType {
        self.transition.map_or(self.current, |t| t.to)
    }

    pub fn transition(&self) -> Option<&WeatherTransition> {
        self.transition.as_ref()
    }

    pub fn time_in_stable(&self) -> f32 {
        self.time_in_stable
    }

    pub fn time_since_evaluation(&self) -> f32 {
        self.time_since_evaluation
    }

    pub fn presets(&self) -> &[WeatherPreset] {
        &self.presets
    }

    fn preset(&self, weather: WeatherType) -> Option<&WeatherPreset> {
        self.presets.iter().find(|preset| preset.weather == weather)
    }

    fn blend<F>(&self, sample: F) -> f32
    where
        F: Fn(WeatherType) -> f32,
    {
        match &self.transition {
            Some(t) => lerp(sample(t.from), sample(t.to), t.progress),
            None => sample(self.current),
        }
    }

    fn blend_profile<F>(&self, field: F) -> f32
    where
        F: Fn(&WeatherProfile) -> f32,
    {
        self.blend(|weather| field(&self.profiles.get(weather)))
    }

    pub fn lighting_multiplier(&self) -> f32 {
        self.blend_profile(|p| p.lighting_multiplier)
    }

    pub fn wetness_amount(&self) -> f32 {
        self.blend_profile(|p| p.wetness)
    }

    pub fn fog_density(&self) -> f32 {
        self.blend_profile(|p| p.fog_density)
    }

    pub fn fog_color(&self) -> [f32; 3] {
        match &self.transition {
            Some(t) => lerp_rgb(
                self.profiles.get(t.from).fog_color,
                self.profiles.get(t.to).fog_color,
                t.progress,
            ),
            None => self.profiles.get(self.current).fog_color,
        }
    }

    /// Preset coverage wins over the profile table when both exist.
    pub fn cloud_coverage(&self) -> f32 {
        self.blend(|weather| {
            self.preset(weather)
                .map_or(self.profiles.get(weather).cloud_coverage, |p| p.cloud_coverage)
        })
    }

    pub fn cloud_density(&self) -> f32 {
        self.blend_profile(|p| p.cloud_density)
    }

    pub fn sun_intensity_multiplier(&self) -> f32 {
        self.blend_profile(|p| p.sun_intensity)
    }

    pub fn sky_light_intensity_multiplier(&self) -> f32 {
        self.blend_profile(|p| p.sky_light_intensity)
    }

    pub fn ambient_wind_speed(&self) -> f32 {
        self.blend(|weather| self.preset(weather).map_or(0.0, |p| p.wind_speed))
    }

    pub fn ambient_temperature_offset(&self) -> f32 {
        self.blend_profile(|p| p.temperature_offset)
    }

    pub fn ambient_humidity(&self) -> f32 {
        self.blend_profile(|p| p.humidity)
    }

    pub fn precipitation_rate(&self) -> f32 {
        self.blend_profile(|p| p.precipitation_rate)
    }

    fn precipitation_intensity_of(&self, weather: WeatherType) -> f32 {
        self.preset(weather).map_or(
            self.profiles.get(weather).precipitation_intensity,
            |p| p.precipitation_intensity,
        )
    }

    /// Active precipitation system and its intensity.
    ///
    /// Across a change of system the outgoing one fades out over the first
    /// half of the transition and the incoming one fades in over the second.
    pub fn precipitation(&self) -> (PrecipitationKind, f32) {
        let Some(t) = &self.transition else {
            return (
                self.profiles.get(self.current).precipitation,
                self.precipitation_intensity_of(self.current),
            );
        };
        let from_kind = self.profiles.get(t.from).precipitation;
        let to_kind = self.profiles.get(t.to).precipitation;
        let from_intensity = self.precipitation_intensity_of(t.from);
        let to_intensity = self.precipitation_intensity_of(t.to);
        if from_kind == to_kind {
            (from_kind, lerp(from_intensity, to_intensity, t.progress))
        } else if t.progress < 0.5 {
            (from_kind, from_intensity * (1.0 - t.progress * 2.0))
        } else {
            (to_kind, to_intensity * (t.progress * 2.0 - 1.0))
        }
    }
}
