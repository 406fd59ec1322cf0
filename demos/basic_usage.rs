/// Basic usage example: feed motion samples, read the eyes' outputs
use gaze_engine::{BehaviorEngine, EngineConfig, MotionSample, SeededRandom};

fn main() {
    println!("=== Gaze Engine: Basic Example ===\n");

    // Default config: 0.5 / 25 thresholds, 1 s static timeout, 800 ms dizzy
    let mut engine =
        BehaviorEngine::with_random(EngineConfig::default(), Box::new(SeededRandom::new(42)), 0)
            .expect("default config is valid");

    // Simulated accelerometer stream: resting, nudged, then shaken
    let motion_samples = vec![
        // Resting on the table (0-100 ms)
        (0, [0.0, 0.0, 9.81]),
        (20, [0.01, 0.0, 9.81]),
        (40, [0.0, 0.01, 9.80]),
        // Picked up and tilted (200-260 ms)
        (200, [1.5, 0.4, 9.7]),
        (220, [2.8, 0.9, 9.6]),
        (240, [3.5, 1.2, 9.5]),
        (260, [3.0, 1.0, 9.6]),
        // Shaken hard (600-640 ms)
        (600, [30.0, 2.0, 9.8]),
        (620, [-28.0, -1.0, 9.8]),
        (640, [25.0, 3.0, 9.8]),
    ];

    println!("Processing {} samples...\n", motion_samples.len());

    for (timestamp, accel) in motion_samples {
        engine.run_until(timestamp, 16);
        let sample = MotionSample::new(timestamp, accel[0], accel[1], accel[2]);
        let class = engine.on_motion(&sample);
        let out = engine.output();
        println!(
            "t={:>5}ms  {:?}  state={:<7}  eye=({:>6.2}, {:>6.2})  mood={:?}",
            timestamp,
            class,
            out.state.label(),
            out.eye_offset.x,
            out.eye_offset.y,
            out.mood
        );
    }

    // Let the dizzy spell and the static timeout play out
    engine.run_until(3_000, 16);
    let out = engine.output();
    println!(
        "\nAfter settling: state={} pupil=({:.1}, {:.1}) dizzy={}",
        out.state.label(),
        out.pupil_offset.x,
        out.pupil_offset.y,
        out.is_dizzy_visual
    );

    println!("\nTransitions:");
    for t in engine.drain_transitions() {
        println!("  {:>5}ms  {} -> {}", t.at_ms, t.from.label(), t.to.label());
    }

    let stats = engine.stats();
    println!(
        "\nStats: {} samples, {} frames, {} transitions",
        stats.motion_samples, stats.frames, stats.transitions
    );
}
