pub mod engines;
pub mod error;
pub mod io;
pub mod math;
pub mod rng;
pub mod signal;
pub mod state;
pub mod system;
pub mod types;

#[cfg(any(test, feature = "proptest-support"))]
pub mod testing;

use anyhow::Result;

pub use error::{ConfigError, WeatherError};
pub use io::config::WeatherConfig;
pub use io::frame::{make_frame, Frame};
pub use math::Vec2;
pub use signal::Signal;
pub use system::WeatherSystem;
pub use types::{StormIntensity, WeatherEventType, WeatherType, ZoneType};

/// Lazily step `system` for `ticks` fixed steps of `dt` seconds, yielding one
/// frame per tick.
///
/// Frame `t` reflects the system after the `t`-th tick and carries every
/// signal raised during it.
pub fn frames(system: &mut WeatherSystem, ticks: u64, dt: f32) -> Result<Frames<'_>> {
    anyhow::ensure!(dt.is_finite() && dt > 0.0, "tick length must be positive, got {dt}");
    Ok(Frames {
        system,
        t: 0,
        ticks,
        dt,
    })
}

/// Collect every frame of [`frames`].
pub fn run_frames(system: &mut WeatherSystem, ticks: u64, dt: f32) -> Result<Vec<Frame>> {
    Ok(frames(system, ticks, dt)?.collect())
}

/// Iterator returned by [`frames`].
pub struct Frames<'a> {
    system: &'a mut WeatherSystem,
    t: u64,
    ticks: u64,
    dt: f32,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.t >= self.ticks {
            return None;
        }
        self.t += 1;
        self.system.tick(self.dt);
        let signals = self.system.drain_signals();
        Some(make_frame(self.t, self.system, signals))
    }
}
