use serde::Serialize;

use crate::engines::forecast::WeatherPrediction;
use crate::math::Vec2;
use crate::signal::Signal;
use crate::state::profile::PrecipitationKind;
use crate::state::WeatherState;
use crate::system::WeatherSystem;
use crate::types::{StormIntensity, WeatherEventType, WeatherType};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FrameWeather {
    pub current: WeatherType,
    pub state: WeatherState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<WeatherType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    pub lighting: f32,
    pub wetness: f32,
    pub fog_density: f32,
    pub cloud_coverage: f32,
    pub wind_speed: f32,
    pub precipitation: PrecipitationKind,
    pub precipitation_intensity: f32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FrameStorm {
    pub id: u64,
    pub intensity: StormIntensity,
    pub center: Vec2,
    pub radius: f32,
    pub max_wind_speed: f32,
    pub dissipating: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FrameEvent {
    pub id: u64,
    pub event_type: WeatherEventType,
    pub location: Vec2,
    pub radius: f32,
    pub remaining: f64,
}

/// One tick of simulation output.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub t: u64,
    pub time: f64,
    pub weather: FrameWeather,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub storms: Vec<FrameStorm>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<FrameEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub signals: Vec<Signal>,
}

/// Snapshot `system` after tick `t`, attaching the signals drained for it.
pub fn make_frame(t: u64, system: &WeatherSystem, signals: Vec<Signal>) -> Frame {
    let machine = system.weather();
    let transition = machine.transition();
    let (precipitation, precipitation_intensity) = machine.precipitation();
    let weather = FrameWeather {
        current: machine.current_weather(),
        state: machine.state(),
        target: transition.map(|transition| transition.to),
        progress: transition.map(|transition| transition.progress),
        lighting: machine.lighting_multiplier(),
        wetness: machine.wetness_amount(),
        fog_density: machine.fog_density(),
        cloud_coverage: machine.cloud_coverage(),
        wind_speed: machine.ambient_wind_speed(),
        precipitation,
        precipitation_intensity,
    };

    let storms = system
        .storms()
        .storms()
        .iter()
        .map(|storm| FrameStorm {
            id: storm.id,
            intensity: storm.intensity,
            center: storm.center,
            radius: storm.radius,
            max_wind_speed: storm.max_wind_speed,
            dissipating: storm.dissipating,
        })
        .collect();

    let now = system.now();
    let events = system
        .events()
        .events()
        .iter()
        .map(|event| FrameEvent {
            id: event.id,
            event_type: event.event_type,
            location: event.location,
            radius: event.radius,
            remaining: (f64::from(event.duration) - (now - event.start_time)).max(0.0),
        })
        .collect();

    Frame {
        t,
        time: now,
        weather,
        storms,
        events,
        signals,
    }
}

impl Frame {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Forecast line emitted alongside frames when a fresh forecast is available.
#[derive(Clone, Debug, Serialize)]
pub struct ForecastRecord<'a> {
    pub t: u64,
    pub predictions: &'a [WeatherPrediction],
}

impl ForecastRecord<'_> {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}
