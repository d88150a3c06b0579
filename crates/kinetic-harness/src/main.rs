#![forbid(unsafe_code)]

//! Replay a script against the demo page and print one JSON line per frame.
//!
//! # Running
//!
//! ```sh
//! cargo run -p kinetic-harness -- script.json
//! cat script.json | cargo run -p kinetic-harness -- --rate 120
//! ```
//!
//! # Options
//!
//! - `--width W`, `--height H`: viewport size (default 1440x900)
//! - `--rate HZ`: frame rate (default 60)
//! - `--coarse`: touch-only pointer, no cursor follower
//!
//! Set `KINETIC_LOG` (e.g. `debug`) with the `tracing` feature for JSON logs
//! on stderr.

use std::io::{self, Read};
use std::process::ExitCode;

use kinetic_core::Viewport;
use kinetic_core::cursor::PointerKind;
use kinetic_harness::{Harness, HarnessError, parse_script};

struct Options {
    script: Option<String>,
    viewport: Viewport,
    rate: f64,
    pointer: PointerKind,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        script: None,
        viewport: Viewport::new(1440.0, 900.0),
        rate: 60.0,
        pointer: PointerKind::Fine,
    };
    while let Some(arg) = args.next() {
        let mut number = |name: &str| -> Result<f64, String> {
            args.next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| format!("{name} expects a number"))
        };
        match arg.as_str() {
            "--width" => options.viewport.width = number("--width")?,
            "--height" => options.viewport.height = number("--height")?,
            "--rate" => options.rate = number("--rate")?,
            "--coarse" => options.pointer = PointerKind::Coarse,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            _ => options.script = Some(arg.clone()),
        }
    }
    Ok(options)
}

fn run(options: Options) -> Result<(), HarnessError> {
    let text = match &options.script {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let steps = parse_script(&text)?;
    let mut harness = Harness::demo(options.viewport, options.pointer)?.with_rate(options.rate);
    harness.run_script(&steps);
    harness.write_jsonl(&mut io::stdout().lock())
}

fn main() -> ExitCode {
    #[cfg(feature = "tracing")]
    kinetic_core::logging::init_json_subscriber();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("kinetic-harness: {msg}");
            return ExitCode::from(2);
        }
    };
    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kinetic-harness: {e}");
            ExitCode::FAILURE
        }
    }
}
