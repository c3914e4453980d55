//! Runs the timer demos on the simulated part and prints what they see.
//!
//! ```text
//! hc11-demos [--log LEVEL] [--console] [DEMO...]
//! ```
//!
//! With no demo named every demo runs. Log records go to stderr through
//! `env_logger` unless `--console` routes them through the part's own
//! console logger, interleaved with the demo output.

use std::fmt;
use std::process::ExitCode;

use clap::{App, Arg, ArgMatches};
use demos::DemoConfig;
use demos::runner::{self, Demos};
use drivers::console;
use log::LevelFilter;

struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

fn get_cli_config<'a>() -> ArgMatches<'a> {
    App::new("hc11-demos")
        .about("68HC11 timer and port demos on a simulated part")
        .arg(
            Arg::with_name("log")
                .long("log")
                .value_name("LEVEL")
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .case_insensitive(true)
                .default_value("warn")
                .help("Log level"),
        )
        .arg(
            Arg::with_name("console")
                .long("console")
                .help("Send log records through the console logger on stdout"),
        )
        .arg(
            Arg::with_name("demo")
                .multiple(true)
                .validator(|name| match runner::demo_named(&name) {
                    Some(_) => Ok(()),
                    None => {
                        let known: Vec<&str> = Demos::all().iter_names().map(|(n, _)| n).collect();
                        Err(format!("unknown demo {:?}; known: {}", name, known.join(" ")))
                    }
                })
                .help("Demos to run, all when none is named"),
        )
        .get_matches()
}

fn init_logging(level: LevelFilter, on_console: bool) {
    if on_console {
        console::set_sink(Box::new(Stdout));
        if let Err(err) = console::init_logger(level) {
            eprintln!("logger: {}", err);
        }
    } else {
        env_logger::Builder::new().filter_level(level).init();
    }
}

fn main() -> ExitCode {
    let matches = get_cli_config();
    let level = matches
        .value_of("log")
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    init_logging(level, matches.is_present("console"));

    let selection = matches
        .values_of("demo")
        .into_iter()
        .flatten()
        .filter_map(runner::demo_named)
        .fold(Demos::empty(), |all, demo| all | demo);
    let selection = if selection.is_empty() { Demos::all() } else { selection };

    let cfg = DemoConfig::default();
    let mut failed = 0;
    for (name, demo) in selection.iter_names() {
        println!("== {} ==", name);
        match runner::run(demo, &mut Stdout, &cfg) {
            Some(Ok(dev)) => println!("-- ok, {} cycles", dev.hardware().cycle()),
            Some(Err(err)) => {
                log::error!("{} failed", name);
                println!("-- failed: {}", err);
                failed += 1;
            }
            None => {}
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
