use rand::Rng;
use ultrasonic_driver::{
    EmulatedEngine, LoopConfig, Pin, Point3, SharedBus, Transducer, UltrasonicDriver,
    engine::{EngineCall, WaveId},
    pulse::Pulse,
};

fn step_delay(location: &Point3, _focus: &Point3) -> f64 {
    if location.x == 0. { 0. } else { 0.000007 }
}

fn two_transducers() -> Vec<Transducer<Pin>> {
    vec![
        Transducer::new(Point3::new(0., 0., 0.), Pin(21)),
        Transducer::new(Point3::new(0.016, 0., 0.), Pin(20)),
    ]
}

fn expected_pulses() -> Vec<Pulse> {
    vec![
        Pulse::new(1 << 21, 0, 0),
        Pulse::idle(7),
        Pulse::new(1 << 20, 0, 0),
        Pulse::idle(5),
        Pulse::new(0, 1 << 21, 0),
        Pulse::idle(7),
        Pulse::new(0, 1 << 20, 0),
        Pulse::idle(6),
    ]
}

#[test]
fn two_transducer_waveform() -> anyhow::Result<()> {
    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        SharedBus::default(),
        two_transducers(),
        step_delay,
        LoopConfig::default(),
    )?;
    driver.engine_mut().clear_calls();

    driver.recalculate()?;

    assert_eq!(
        &[
            EngineCall::ClearWaveforms,
            EngineCall::AppendPulses(expected_pulses()),
            EngineCall::CreateWaveform(WaveId(0)),
            EngineCall::SendRepeat(WaveId(0)),
            EngineCall::Write(Pin(14), true),
        ],
        driver.engine().calls().as_slice()
    );

    Ok(())
}

#[test]
fn each_pin_high_once_per_loop() -> anyhow::Result<()> {
    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        SharedBus::default(),
        two_transducers(),
        step_delay,
        LoopConfig::default(),
    )?;
    driver.recalculate()?;

    let trace = driver.engine().trace(3).unwrap();
    assert_eq!(25, trace.loop_length());
    let a = trace.levels(Pin(21));
    let b = trace.levels(Pin(20));
    (0..25).for_each(|frame| {
        assert_eq!(frame < 12, a[25 + frame]);
        assert_eq!((7..19).contains(&frame), b[25 + frame]);
    });
    [Pin(21), Pin(20)].into_iter().for_each(|pin| {
        assert_eq!(Some(1), trace.rising_edges(pin, 1));
        assert_eq!(Some(12), trace.high_frames(pin, 1));
    });

    Ok(())
}

#[test]
fn recalculate_is_idempotent() -> anyhow::Result<()> {
    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        SharedBus::default(),
        two_transducers(),
        step_delay,
        LoopConfig::default(),
    )?;
    driver.recalculate()?;
    driver.recalculate()?;

    let appended = driver
        .engine()
        .calls()
        .iter()
        .filter_map(|call| match call {
            EngineCall::AppendPulses(pulses) => Some(pulses.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(vec![expected_pulses(), expected_pulses()], appended);
    assert_eq!(
        driver.waveform()?[0].iter().copied().collect::<Vec<_>>(),
        expected_pulses()
    );

    Ok(())
}

#[test]
fn refocus() -> anyhow::Result<()> {
    const V_SOUND: f64 = 343.;
    let delay =
        |location: &Point3, focus: &Point3| (0.1 - (location - focus).norm() as f64) / V_SOUND;
    let transducers = [0., 0.016, 0.032]
        .into_iter()
        .zip([Pin(17), Pin(27), Pin(22)])
        .map(|(x, pin)| Transducer::new(Point3::new(x, 0., 0.), pin));
    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        SharedBus::default(),
        transducers,
        delay,
        LoopConfig::default(),
    )?;

    driver.recalculate()?;
    let centred = driver.waveform()?;

    driver.set_focus(Point3::new(0.032, 0., 0.050));
    assert_eq!(&Point3::new(0.032, 0., 0.050), driver.focus());
    driver.recalculate()?;
    let shifted = driver.waveform()?;

    assert_ne!(centred, shifted);
    assert_eq!(25, shifted[0].duration());

    Ok(())
}

#[test]
fn partial_frames_are_dropped() -> anyhow::Result<()> {
    let driver = UltrasonicDriver::new(
        EmulatedEngine::default(),
        SharedBus::default(),
        two_transducers(),
        |location: &Point3, _: &Point3| if location.x == 0. { 0.9e-6 } else { 7.6e-6 },
        LoopConfig::default(),
    )?;

    assert_eq!(expected_pulses(), driver.waveform()?[0].to_vec());

    Ok(())
}

#[test]
fn random_delays_fill_one_loop() -> anyhow::Result<()> {
    let mut rng = rand::rng();
    for _ in 0..32 {
        let transducers = ultrasonic_driver::pins::DRIVE_PINS
            .iter()
            .map(|&pin| {
                Transducer::new(
                    Point3::new(rng.random_range(0.0..0.1), rng.random_range(0.0..0.1), 0.),
                    pin,
                )
            })
            .collect::<Vec<_>>();
        let mut driver = UltrasonicDriver::new(
            EmulatedEngine::default(),
            SharedBus::default(),
            transducers,
            |location: &Point3, _: &Point3| (location.x + location.y) as f64 * 1e-3,
            LoopConfig::default(),
        )?;
        driver.recalculate()?;

        let waveform = driver.waveform()?;
        assert_eq!(1, waveform.len());
        assert_eq!(25, waveform[0].duration());

        let trace = driver.engine().trace(2).unwrap();
        ultrasonic_driver::pins::DRIVE_PINS
            .iter()
            .for_each(|&pin| {
                assert_eq!(Some(1), trace.rising_edges(pin, 1));
                assert_eq!(Some(12), trace.high_frames(pin, 1));
            });
    }

    Ok(())
}

#[rstest::rstest]
#[case(LoopConfig::default().with_loop_length(50).with_on_width(25).with_sample_rate(2_000_000))]
#[case(LoopConfig::default().with_on_width(1))]
#[case(LoopConfig::default().with_on_width(24))]
#[test]
fn custom_loop(#[case] config: LoopConfig) -> anyhow::Result<()> {
    let mut driver = UltrasonicDriver::new(
        EmulatedEngine::new(config.sample_rate()),
        SharedBus::default(),
        two_transducers(),
        step_delay,
        config,
    )?;
    driver.recalculate()?;

    let trace = driver.engine().trace(2).unwrap();
    assert_eq!(config.loop_length(), trace.loop_length());
    [Pin(21), Pin(20)].into_iter().for_each(|pin| {
        assert_eq!(Some(1), trace.rising_edges(pin, 1));
        assert_eq!(Some(config.on_width() as usize), trace.high_frames(pin, 1));
    });

    Ok(())
}
