use serde::Serialize;

use crate::math::Vec2;
use crate::types::{StormIntensity, WeatherEventType, WeatherType};

/// Outbound domain notification for effects, audio and UI collaborators.
///
/// Engines queue signals while they mutate; the host drains them once per tick.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    StormGenerated {
        id: u64,
        intensity: StormIntensity,
        center: Vec2,
    },
    StormDissipated {
        id: u64,
    },
    WeatherEventTriggered {
        id: u64,
        event_type: WeatherEventType,
        location: Vec2,
    },
    WeatherEventEnded {
        id: u64,
        event_type: WeatherEventType,
    },
    PredictionsUpdated {
        count: usize,
    },
    PatternActivated {
        name: String,
    },
    PatternDeactivated {
        name: String,
    },
    WeatherTransitionStarted {
        from: WeatherType,
        to: WeatherType,
        duration: f32,
    },
    WeatherChanged {
        from: WeatherType,
        to: WeatherType,
    },
}

/// Ordered queue of pending signals.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    pending: Vec<Signal>,
}

impl Outbox {
    pub fn push(&mut self, signal: Signal) {
        self.pending.push(signal);
    }

    pub fn extend<I>(&mut self, signals: I)
    where
        I: IntoIterator<Item = Signal>,
    {
        self.pending.extend(signals);
    }

    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
