use std::path::PathBuf;

use weather_core::engines::hazards::{ProtectionCheck, WeatherEvent};
use weather_core::engines::patterns::WeatherPattern;
use weather_core::{
    Signal, Vec2, WeatherConfig, WeatherError, WeatherEventType, WeatherSystem, WeatherType,
    ZoneType,
};

const DESERT: Vec2 = Vec2::new(0.0, 30_000.0);

fn quiet_config() -> WeatherConfig {
    let mut config = WeatherConfig::default();
    config.storms.generation_probability = 0.0;
    config.events.generation_probability = 0.0;
    config.state_machine.automatic_changes = false;
    config
}

fn fog_at(location: Vec2) -> WeatherEvent {
    WeatherEvent::new(WeatherEventType::Fog, location, 2_000.0, 600.0, 0.5)
}

#[test]
fn trigger_event_fails_at_capacity() {
    let mut config = quiet_config();
    config.events.max_active_events = 2;
    let mut system = WeatherSystem::new(&config, 5);
    system.trigger_event(fog_at(Vec2::ZERO)).unwrap();
    system.trigger_event(fog_at(Vec2::ZERO)).unwrap();
    assert_eq!(
        system.trigger_event(fog_at(Vec2::ZERO)),
        Err(WeatherError::EventCapacity { max: 2 })
    );
    assert_eq!(system.events().events().len(), 2);
}

#[test]
fn events_expire_on_the_system_clock() {
    let mut system = WeatherSystem::new(&quiet_config(), 5);
    system.tick(100.0);
    let id = system.trigger_event(fog_at(Vec2::ZERO)).unwrap();
    assert_eq!(system.events().event(id).map(|e| e.start_time), Some(100.0));
    for _ in 0..5 {
        system.tick(100.0);
    }
    assert!(system.events().event(id).is_some());
    system.tick(100.0);
    assert!(system.events().event(id).is_none());
    assert!(system
        .drain_signals()
        .iter()
        .any(|signal| matches!(signal, Signal::WeatherEventEnded { id: ended, .. } if *ended == id)));
}

#[test]
fn desert_forecast_confidence_decays_with_horizon() {
    let system = WeatherSystem::new(&quiet_config(), 5);
    assert_eq!(system.zones().zone_at(DESERT).zone_type, ZoneType::Desert);
    let near = system.predictions().confidence_at(system.zones(), DESERT, 1.0);
    let far = system.predictions().confidence_at(system.zones(), DESERT, 48.0);
    assert!(near > far);
    assert!((0.0..=1.0).contains(&near));
    assert!((0.0..=1.0).contains(&far));
}

#[test]
fn forecast_refreshes_on_interval() {
    let mut config = quiet_config();
    config.prediction.interval_seconds = 60.0;
    config.prediction.horizon_hours = 3.0;
    let mut system = WeatherSystem::new(&config, 5);
    let zones = system.zones().len();
    system.tick(30.0);
    assert!(system.predictions().predictions().is_empty());
    system.tick(30.0);
    assert_eq!(system.predictions().predictions().len(), 2 * zones);
    assert!(system
        .drain_signals()
        .contains(&Signal::PredictionsUpdated { count: 2 * zones }));
}

#[test]
fn capacities_hold_under_heavy_generation() {
    let mut config = WeatherConfig::default();
    config.storms.max_active_storms = 4;
    config.storms.generation_probability = 1.0;
    config.events.max_active_events = 6;
    config.events.generation_probability = 1.0;
    let mut system = WeatherSystem::new(&config, 99);
    for _ in 0..500 {
        system.tick(10.0);
        assert!(system.storms().storms().len() <= 4);
        assert!(system.events().events().len() <= 6);
        for storm in system.storms().storms() {
            assert!(storm.radius >= 0.0);
            assert!(storm.max_wind_speed >= 0.0);
        }
    }
}

#[test]
fn tick_emits_signals_in_subsystem_order() {
    let mut config = quiet_config();
    config.storms.generation_probability = 1.0;
    config.prediction.interval_seconds = 1.0;
    config.patterns = vec![WeatherPattern {
        name: "squall".to_string(),
        weather_sequence: vec![WeatherType::Rain],
        durations: vec![600.0],
        activation_probability: 1.0,
        zone: None,
        triggered_events: Vec::new(),
    }];
    let mut system = WeatherSystem::new(&config, 3);
    system
        .weather_mut()
        .request_transition(WeatherType::Fog, 0.0)
        .unwrap();
    system.drain_signals();

    system.tick(1.0);
    let kinds: Vec<&str> = system
        .drain_signals()
        .iter()
        .map(|signal| match signal {
            Signal::StormGenerated { .. } => "storm",
            Signal::PredictionsUpdated { .. } => "forecast",
            Signal::PatternActivated { .. } => "pattern",
            Signal::WeatherChanged { .. } => "weather",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["storm", "forecast", "pattern", "weather"]);
}

#[test]
fn fog_reduces_visibility_but_stays_safe() {
    let mut system = WeatherSystem::new(&quiet_config(), 5);
    system.trigger_event(fog_at(Vec2::ZERO)).unwrap();
    assert!(system.visibility_at(Vec2::ZERO) < 1.0);
    assert_eq!(system.visibility_at(Vec2::new(50_000.0, 0.0)), 1.0);
    assert!(system.is_safe_for_players(Vec2::ZERO));
    assert_eq!(system.warnings_at(Vec2::ZERO).len(), 1);
}

struct Sheltered;

impl ProtectionCheck for Sheltered {
    fn is_protected(&self, _location: Vec2, _event_type: WeatherEventType) -> bool {
        true
    }
}

#[test]
fn protection_blocks_heat_damage() {
    let mut system = WeatherSystem::new(&quiet_config(), 5);
    let heat = WeatherEvent::new(WeatherEventType::Heatwave, DESERT, 5_000.0, 600.0, 1.0)
        .with_parameter("temperature_delta", 60.0);
    system.trigger_event(heat).unwrap();
    assert!(system.damage_at(DESERT) > 0.0);
    system.set_protection(Box::new(Sheltered));
    assert_eq!(system.damage_at(DESERT), 0.0);
}

#[test]
fn repository_configs_drive_a_run() {
    let configs_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/configs");
    let config = WeatherConfig::load_from_path(&configs_dir.join("stormy_tropics.json"))
        .expect("config loads");
    let mut system = WeatherSystem::from_phrase(&config, "stormy tropics");
    assert_eq!(system.zones().len(), 2);
    assert!(system.patterns().pattern("monsoon").is_some());
    assert_eq!(system.weather().current_weather(), WeatherType::Cloudy);
    for _ in 0..600 {
        system.tick(10.0);
    }
    assert!(system.storms().storms().len() <= config.storms.max_active_storms);
    assert!(system.now() > 5_999.0);
}
