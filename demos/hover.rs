use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use ultrasonic_driver::{
    LoopConfig, PigpioEngine, Pin, Point3, SharedBus, Transducer, UltrasonicDriver,
};

fn focus_delay(location: &Point3, _focus: &Point3) -> f64 {
    if location.x == 0. { 0. } else { 0.000007 }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut driver = UltrasonicDriver::new(
        PigpioEngine::connect()?,
        SharedBus::default(),
        [
            Transducer::new(Point3::new(0., 0., 0.), Pin(21)),
            Transducer::new(Point3::new(0.016, 0., 0.), Pin(20)),
        ],
        focus_delay,
        LoopConfig::default(),
    )?;

    driver.recalculate()?;
    std::thread::sleep(Duration::from_secs(2));
    driver.stop()?;

    Ok(())
}
