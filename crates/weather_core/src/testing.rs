//! Proptest strategies shared by unit tests and downstream crates.

use proptest::prelude::*;

use crate::math::Vec2;
use crate::types::WeatherType;

/// Locations spread well beyond the default zone layout.
pub fn location_strategy() -> impl Strategy<Value = Vec2> {
    (-250_000.0f32..250_000.0, -250_000.0f32..250_000.0).prop_map(|(x, y)| Vec2::new(x, y))
}

pub fn weather_type_strategy() -> impl Strategy<Value = WeatherType> {
    proptest::sample::select(WeatherType::ALL.to_vec())
}
