//! Host runner: every demo on a fresh simulated part, with the input
//! transitions it needs scheduled up front.

use core::fmt::Write;

use bitflags::bitflags;
use drivers::hal::gpio::PinLevel;
use drivers::hal::wait::Ticks;
use drivers::hw::hc11::Port;
use drivers::platform::sim::{Pin, SimDevice, Stimulus, StimulusError};

use crate::capture::{self, Channel};
use crate::{DemoConfig, DemoError, output_compare, overflow, ports, pulse};

bitflags! {
    /// Demo selection. Flag names double as command-line names.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Demos: u32 {
        const TOGGLE = 1 << 0;
        const TOC1 = 1 << 1;
        const TOC5 = 1 << 2;
        const TIC1 = 1 << 3;
        const TIC2 = 1 << 4;
        const TIC3 = 1 << 5;
        const TIC4 = 1 << 6;
        const TOF = 1 << 7;
        const RTI = 1 << 8;
        const PAOV = 1 << 9;
        const PAI = 1 << 10;
        const PORTA = 1 << 11;
        const MIRROR = 1 << 12;
        const PORTB = 1 << 13;
        const PORTC = 1 << 14;
        const PORTC_IN = 1 << 15;
        const PORTD = 1 << 16;
        const PORTD_IN = 1 << 17;
        const PORTE = 1 << 18;
    }
}

/// PACNT preload of the overflow demo: six edges to wrap.
pub const PACNT_PRELOAD: u8 = 250;

pub const MIRROR_WINDOW: Ticks = Ticks(10_000);
pub const MONITOR_WINDOW: Ticks = Ticks(12_000);

type Script = fn(&mut SimDevice, &mut dyn Write, &DemoConfig) -> Result<(), DemoError>;

fn script(demo: Demos) -> Option<Script> {
    let scripts: [(Demos, Script); 19] = [
        (Demos::TOGGLE, |d, o, c| output_compare::toggle(d, o, c)),
        (Demos::TOC1, |d, o, c| output_compare::toc1(d, o, c)),
        (Demos::TOC5, |d, o, c| output_compare::toc5(d, o, c)),
        (Demos::TIC1, |d, o, c| capture::capture(d, o, c, Channel::Ic1)),
        (Demos::TIC2, |d, o, c| capture::capture(d, o, c, Channel::Ic2)),
        (Demos::TIC3, |d, o, c| capture::capture(d, o, c, Channel::Ic3)),
        (Demos::TIC4, |d, o, c| capture::capture(d, o, c, Channel::Ic4)),
        (Demos::TOF, |d, o, c| overflow::timer_overflow(d, o, c)),
        (Demos::RTI, |d, o, c| overflow::real_time(d, o, c)),
        (Demos::PAOV, |d, o, c| pulse::overflow_after(d, o, c, PACNT_PRELOAD)),
        (Demos::PAI, |d, o, c| pulse::edge_interrupt(d, o, c)),
        (Demos::PORTA, |d, o, _| ports::walk(d, o, Port::A)),
        (Demos::MIRROR, |d, o, _| ports::mirror(d, o, MIRROR_WINDOW)),
        (Demos::PORTB, |d, o, _| ports::walk(d, o, Port::B)),
        (Demos::PORTC, |d, o, _| ports::walk(d, o, Port::C)),
        (Demos::PORTC_IN, |d, o, _| {
            ports::monitor(d, o, Port::C, MONITOR_WINDOW).map(|_| ())
        }),
        (Demos::PORTD, |d, o, _| ports::walk(d, o, Port::D)),
        (Demos::PORTD_IN, |d, o, _| {
            ports::monitor(d, o, Port::D, MONITOR_WINDOW).map(|_| ())
        }),
        (Demos::PORTE, |d, o, _| {
            ports::monitor(d, o, Port::E, MONITOR_WINDOW).map(|_| ())
        }),
    ];
    scripts.iter().find(|(d, _)| *d == demo).map(|(_, s)| *s)
}

/// Look a demo up by its flag name, ignoring case.
pub fn demo_named(name: &str) -> Option<Demos> {
    Demos::all()
        .iter_names()
        .find(|(flag, _)| flag.eq_ignore_ascii_case(name))
        .map(|(_, demo)| demo)
}

/// Input transitions `demo` waits for.
pub fn stimulus(demo: Demos) -> Result<Stimulus, StimulusError> {
    let channel = [
        (Demos::TIC1, Channel::Ic1),
        (Demos::TIC2, Channel::Ic2),
        (Demos::TIC3, Channel::Ic3),
        (Demos::TIC4, Channel::Ic4),
    ]
    .into_iter()
    .find(|(d, _)| *d == demo);
    if let Some((_, channel)) = channel {
        return Stimulus::new().square_wave(Pin::A(channel.pin()), 2000, 3000, 12);
    }

    if demo == Demos::PAOV {
        Stimulus::new().square_wave(Pin::A(7), 1000, 500, 40)
    } else if demo == Demos::PAI {
        Stimulus::new().square_wave(Pin::A(7), 1000, 500, 4)
    } else if demo == Demos::MIRROR {
        Stimulus::new()
            .square_wave(Pin::A(0), 500, 1500, 6)?
            .square_wave(Pin::A(1), 1000, 3000, 3)
    } else if demo == Demos::PORTC_IN {
        Stimulus::new()
            .square_wave(Pin::C(0), 1000, 2000, 4)?
            .at(2500, Pin::C(3), PinLevel::High)
    } else if demo == Demos::PORTD_IN {
        Stimulus::new()
            .square_wave(Pin::D(2), 1000, 2500, 3)?
            .at(4000, Pin::D(5), PinLevel::High)
    } else if demo == Demos::PORTE {
        Stimulus::new()
            .square_wave(Pin::E(0), 1000, 2000, 4)?
            .at(2500, Pin::E(7), PinLevel::High)
    } else {
        Ok(Stimulus::new())
    }
}

/// Run one demo on a fresh simulated part and hand the part back for
/// inspection. `None` unless `demo` names exactly one demo.
pub fn run(demo: Demos, out: &mut dyn Write, cfg: &DemoConfig) -> Option<Result<SimDevice, DemoError>> {
    let script = script(demo)?;
    let result = stimulus(demo).map_err(DemoError::from).and_then(|stimulus| {
        let mut dev = SimDevice::new().with_stimulus(stimulus);
        script(&mut dev, out, cfg)?;
        log::info!("{:?} done after {} cycles", demo, dev.hardware().cycle());
        Ok(dev)
    });
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_demo_has_a_script() {
        for (name, demo) in Demos::all().iter_names() {
            assert!(script(demo).is_some(), "{name}");
            assert!(stimulus(demo).is_ok(), "{name}");
        }
    }

    #[test]
    fn names_parse_back() {
        assert_eq!(Demos::from_name("TIC4"), Some(Demos::TIC4));
        assert_eq!(Demos::from_name("tic4"), None);
        assert_eq!(demo_named("tic4"), Some(Demos::TIC4));
        assert_eq!(demo_named("PortD_In"), Some(Demos::PORTD_IN));
        assert_eq!(demo_named("portf"), None);
        assert!(script(Demos::TIC1 | Demos::TIC2).is_none());
    }

    #[test]
    fn capture_stimulus_drives_the_channel_pin() {
        let mut s = stimulus(Demos::TIC2).unwrap();
        let first = s.next_due(2000).unwrap();
        assert_eq!(first.pin, Pin::A(1));
        assert_eq!(first.level, PinLevel::High);
    }

    #[test]
    fn every_demo_runs_on_the_simulator() {
        let cfg = DemoConfig::default();
        for (name, demo) in Demos::all().iter_names() {
            let mut out = String::new();
            let result = run(demo, &mut out, &cfg).unwrap();
            assert!(result.is_ok(), "{name}: {:?}\n{out}", result.err());
            assert!(!out.is_empty(), "{name}");
        }
    }

    #[test]
    fn toc1_ends_with_pa3_and_pa7_forced_high() {
        let mut out = String::new();
        run(Demos::TOC1, &mut out, &DemoConfig::default()).unwrap().unwrap();
        assert_eq!(out.lines().filter(|l| l.starts_with("OC1 match")).count(), 5);
        assert_eq!(out.lines().filter(|l| l.starts_with("OC1 interrupt")).count(), 5);
        assert_eq!(out.lines().last(), Some("OC1 forced, PORTA 88"));
    }

    #[test]
    fn pulse_overflow_takes_one_interrupt() {
        let mut out = String::new();
        let dev = run(Demos::PAOV, &mut out, &DemoConfig::default()).unwrap().unwrap();
        assert_eq!(dev.taken(drivers::hw::hc11::Vector::PulseOverflow), 1);
        assert!(out.lines().next().unwrap().ends_with("PACNT 00"));
        assert!(out.lines().last().unwrap().ends_with("PACNT 04"));
    }

    #[test]
    fn toggle_demo_toggles_pa6_three_times() {
        let mut out = String::new();
        let dev = run(Demos::TOGGLE, &mut out, &DemoConfig::default()).unwrap().unwrap();
        let pa6 = dev.hardware().edges().iter().filter(|e| e.port == Port::A && e.bit == 6);
        assert_eq!(pa6.count(), 3);
    }

    #[test]
    fn monitor_sees_every_port_c_change() {
        let mut out = String::new();
        run(Demos::PORTC_IN, &mut out, &DemoConfig::default()).unwrap().unwrap();
        assert_eq!(out.lines().filter(|l| l.contains("is now")).count(), 5);
    }

    #[test]
    fn port_d_monitor_reports_six_bit_values() {
        let mut out = String::new();
        run(Demos::PORTD_IN, &mut out, &DemoConfig::default()).unwrap().unwrap();
        let changes: Vec<&str> = out.lines().filter(|l| l.contains("is now")).collect();
        assert_eq!(
            changes,
            ["Port D is now 04", "Port D is now 00", "Port D is now 20", "Port D is now 24"]
        );
    }

    #[test]
    fn port_e_monitor_sees_the_top_pin() {
        let mut out = String::new();
        run(Demos::PORTE, &mut out, &DemoConfig::default()).unwrap().unwrap();
        assert_eq!(out.lines().next(), Some("Port E starts at 00"));
        assert_eq!(out.lines().filter(|l| l.contains("is now")).count(), 5);
        assert_eq!(out.lines().last(), Some("Port E is now 80"));
    }

    #[test]
    fn walks_drive_every_output_pin_of_b_c_and_d() {
        for (demo, port, pins) in [
            (Demos::PORTB, Port::B, 8),
            (Demos::PORTC, Port::C, 8),
            (Demos::PORTD, Port::D, 6),
        ] {
            let mut out = String::new();
            let dev = run(demo, &mut out, &DemoConfig::default()).unwrap().unwrap();
            assert_eq!(out.lines().count(), 2 * pins, "{port:?}");
            let rises = dev.hardware().edges().iter().filter(|e| e.port == port && e.level == PinLevel::High);
            assert_eq!(rises.count(), pins, "{port:?}");
        }
    }

    #[test]
    fn toc5_handler_toggles_pa3_back_and_forth() {
        let mut out = String::new();
        run(Demos::TOC5, &mut out, &DemoConfig::default()).unwrap().unwrap();
        let taken: Vec<&str> = out.lines().filter(|l| l.starts_with("OC5 interrupt")).collect();
        assert_eq!(taken, ["OC5 interrupt, PORTA 08", "OC5 interrupt, PORTA 00"]);
    }

    #[test]
    fn large_backoff_shift_still_finishes() {
        let cfg = DemoConfig { max_backoff_shift: 40, ..DemoConfig::default() };
        let mut out = String::new();
        assert!(run(Demos::RTI, &mut out, &cfg).unwrap().is_ok(), "{out}");
    }
}
