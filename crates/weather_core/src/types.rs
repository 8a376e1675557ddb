use std::fmt;

use serde::{Deserialize, Serialize};

/// Ambient weather condition driven by the state machine and forecast by zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Fog,
    LightRain,
    Rain,
    HeavyRain,
    Thunderstorm,
    LightSnow,
    Snow,
    Blizzard,
    Sandstorm,
    Hail,
}

impl WeatherType {
    pub const ALL: [Self; 14] = [
        Self::Clear,
        Self::PartlyCloudy,
        Self::Cloudy,
        Self::Overcast,
        Self::Fog,
        Self::LightRain,
        Self::Rain,
        Self::HeavyRain,
        Self::Thunderstorm,
        Self::LightSnow,
        Self::Snow,
        Self::Blizzard,
        Self::Sandstorm,
        Self::Hail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Cloudy => "cloudy",
            Self::Overcast => "overcast",
            Self::Fog => "fog",
            Self::LightRain => "light_rain",
            Self::Rain => "rain",
            Self::HeavyRain => "heavy_rain",
            Self::Thunderstorm => "thunderstorm",
            Self::LightSnow => "light_snow",
            Self::Snow => "snow",
            Self::Blizzard => "blizzard",
            Self::Sandstorm => "sandstorm",
            Self::Hail => "hail",
        }
    }
}

impl fmt::Display for WeatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Storm severity, ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StormIntensity {
    #[default]
    None,
    TropicalStorm,
    Category1,
    Category2,
    Category3,
    Category4,
    Category5,
}

impl StormIntensity {
    /// Saffir-Simpson category number. Sub-hurricane intensities scale as zero.
    pub fn category_number(self) -> u8 {
        match self {
            Self::None | Self::TropicalStorm => 0,
            Self::Category1 => 1,
            Self::Category2 => 2,
            Self::Category3 => 3,
            Self::Category4 => 4,
            Self::Category5 => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TropicalStorm => "tropical storm",
            Self::Category1 => "category 1",
            Self::Category2 => "category 2",
            Self::Category3 => "category 3",
            Self::Category4 => "category 4",
            Self::Category5 => "category 5",
        }
    }
}

impl fmt::Display for StormIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Tropical,
    Desert,
    Temperate,
    Polar,
    Mountain,
    Coastal,
}

impl ZoneType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tropical => "tropical",
            Self::Desert => "desert",
            Self::Temperate => "temperate",
            Self::Polar => "polar",
            Self::Mountain => "mountain",
            Self::Coastal => "coastal",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discrete, time-bounded hazard distinct from the ambient weather type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherEventType {
    Blizzard,
    Sandstorm,
    Heatwave,
    Coldwave,
    Fog,
    Thunderstorm,
    Tornado,
    Hailstorm,
    Flood,
}

impl WeatherEventType {
    pub const ALL: [Self; 9] = [
        Self::Blizzard,
        Self::Sandstorm,
        Self::Heatwave,
        Self::Coldwave,
        Self::Fog,
        Self::Thunderstorm,
        Self::Tornado,
        Self::Hailstorm,
        Self::Flood,
    ];

    /// Events that make a location unsafe for players on foot.
    pub fn is_hazardous(self) -> bool {
        !matches!(self, Self::Fog | Self::Thunderstorm)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Blizzard => "blizzard",
            Self::Sandstorm => "sandstorm",
            Self::Heatwave => "heatwave",
            Self::Coldwave => "coldwave",
            Self::Fog => "fog",
            Self::Thunderstorm => "thunderstorm",
            Self::Tornado => "tornado",
            Self::Hailstorm => "hailstorm",
            Self::Flood => "flood",
        }
    }
}

impl fmt::Display for WeatherEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_numbers_scale_from_category_one() {
        assert_eq!(StormIntensity::None.category_number(), 0);
        assert_eq!(StormIntensity::TropicalStorm.category_number(), 0);
        assert_eq!(StormIntensity::Category1.category_number(), 1);
        assert_eq!(StormIntensity::Category5.category_number(), 5);
        assert!(StormIntensity::Category2 > StormIntensity::TropicalStorm);
    }

    #[test]
    fn weather_types_serialize_as_snake_case() {
        let json = serde_json::to_string(&WeatherType::PartlyCloudy).unwrap();
        assert_eq!(json, "\"partly_cloudy\"");
        let parsed: WeatherEventType = serde_json::from_str("\"coldwave\"").unwrap();
        assert_eq!(parsed, WeatherEventType::Coldwave);
    }
}
