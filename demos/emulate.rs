use anyhow::Result;
use tracing_subscriber::EnvFilter;
use ultrasonic_driver::{
    Differential, EmulatedEngine, LoopConfig, PinPair, Point3, Transducer, UltrasonicDriver,
    pins::DRIVE_PAIRS,
};

const V_SOUND: f64 = 343.;
const PITCH: f32 = 0.016;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 4x2 array, centred on the origin.
    let transducers = itertools::iproduct!(0..4, 0..2)
        .zip(DRIVE_PAIRS)
        .map(|((x, y), pair)| {
            let x = (x as f32 - 1.5) * PITCH;
            let y = (y as f32 - 0.5) * PITCH;
            Transducer::new(Point3::new(x, y, 0.), pair)
        })
        .collect::<Vec<_>>();

    let reference = 0.1;
    let delay = move |location: &Point3, focus: &Point3| {
        (reference - (location - focus).norm() as f64) / V_SOUND
    };
    let phase = |tr: &Transducer<PinPair>| if tr.id() % 2 == 0 { 0. } else { 0.5 };

    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        Differential::new(phase),
        transducers,
        delay,
        LoopConfig::default(),
    )?;
    driver.recalculate()?;

    let pins = driver.managed_pins();
    let trace = driver.engine().trace(2).expect("waveform is playing");
    let df = trace.to_dataframe(&pins)?;
    println!("{df}");

    driver.stop()?;
    Ok(())
}
