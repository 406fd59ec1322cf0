//! `gaze-sim`: drive the gaze engine through a scripted motion scenario.
//!
//! The scenario rests, wanders, shakes and rests again, with animation
//! frames at a fixed cadence in between. Every time the render-facing output
//! changes a JSON line is written to stdout.
//!
//! # Usage
//!
//! ```bash
//! gaze-sim --seed 7 --duration-ms 20000
//! gaze-sim --config eyes.json --permission granted --log-level debug
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gaze_engine::{
    BehaviorEngine, EngineConfig, EyesOutput, MotionSample, PermissionStatus, SeededRandom,
    TiltSample,
};

/// Command-line arguments for the simulator.
#[derive(Parser, Debug)]
#[command(
    name = "gaze-sim",
    version,
    about = "Scripted simulation of the animated eyes engine",
    long_about = None
)]
struct Args {
    /// Seed for every random draw the engine makes.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Length of the simulated run.
    #[arg(long, default_value_t = 15_000)]
    duration_ms: u64,

    /// Animation frame interval.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Outcome of the orientation permission prompt.
    #[arg(long, value_enum, default_value_t = PermissionArg::Prompt)]
    permission: PermissionArg,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PermissionArg {
    Prompt,
    Granted,
    Denied,
}

impl From<PermissionArg> for PermissionStatus {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Prompt => PermissionStatus::Prompt,
            PermissionArg::Granted => PermissionStatus::Granted,
            PermissionArg::Denied => PermissionStatus::Denied,
        }
    }
}

/// Sensor input at one instant of the scenario.
enum Input {
    Motion(MotionSample),
    Tilt(TiltSample),
}

/// Scripted sensor stream: rest, wander, rest, shake, rest.
fn scenario(duration_ms: u64, with_tilt: bool) -> Vec<Input> {
    const SAMPLE_MS: u64 = 20;
    let mut inputs = Vec::new();
    let mut t = 0;
    while t <= duration_ms {
        let phase = t as f32 / 1000.0;
        let accel = match t {
            // Gentle wandering: slow sway well above the movement threshold.
            2_000..=3_500 => [4.0 * (phase * 6.0).sin(), 2.0 * (phase * 4.0).cos(), 9.8],
            // Violent shake.
            6_000..=6_300 => {
                let sign = if (t / SAMPLE_MS) % 2 == 0 { 1.0 } else { -1.0 };
                [sign * 20.0, 0.0, 9.8]
            }
            _ => [0.0, 0.0, 9.8],
        };
        inputs.push(Input::Motion(MotionSample::new(t, accel[0], accel[1], accel[2])));

        if with_tilt && t % 100 == 0 {
            let gamma = 30.0 * (phase * 0.5).sin();
            inputs.push(Input::Tilt(TiltSample::new(t, 60.0, gamma)));
        }
        t += SAMPLE_MS;
    }
    inputs
}

fn emit(output: &EyesOutput) {
    match serde_json::to_string(output) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("failed to serialize output: {e}"),
    }
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gaze_engine={}", args.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match args.config.as_deref() {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            match EngineConfig::from_json_file(path) {
                Ok(c) => c,
                Err(e) => {
                    error!("failed to load configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => EngineConfig::default(),
    };

    let mut engine =
        match BehaviorEngine::with_random(config, Box::new(SeededRandom::new(args.seed)), 0) {
            Ok(engine) => engine,
            Err(e) => {
                error!("invalid configuration: {e}");
                std::process::exit(1);
            }
        };

    let permission = PermissionStatus::from(args.permission);
    engine.set_permission(permission);

    let mut last = engine.output();
    emit(&last);

    for input in scenario(args.duration_ms, permission == PermissionStatus::Granted) {
        let at = match &input {
            Input::Motion(s) => s.timestamp_ms,
            Input::Tilt(s) => s.timestamp_ms,
        };
        engine.run_until(at, args.frame_ms);
        match input {
            Input::Motion(sample) => {
                engine.on_motion(&sample);
            }
            Input::Tilt(sample) => {
                engine.on_tilt(&sample);
            }
        }

        let output = engine.output();
        if output.differs_from(&last) {
            emit(&output);
            last = output;
        }
    }

    engine.shutdown();
    let stats = engine.stats();
    info!(
        motion = stats.motion_samples,
        tilt = stats.tilt_samples,
        frames = stats.frames,
        transitions = stats.transitions,
        "simulation finished"
    );
}
