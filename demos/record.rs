//! Record gaze for a second, pause, resume, then print the buffered records.
//!
//! A synthetic producer thread stands in for the tracker runtime and sweeps
//! the gaze across the screen at ~90 Hz.
//!
//! Usage: TOBII_RECORDER_LICENSE_EXPIRES=2099/01/01 cargo run --example record

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tobii_recorder::{DisplayArea, RawGaze, SessionConfig, TrackerSession, Validity};

fn record_for(session: &mut TrackerSession<tobii_recorder::ChannelBackend>, secs: u64) -> bool {
    if let Err(e) = session.start() {
        eprintln!("Error during recording: {}", e);
        return false;
    }
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(secs) {
        if let Err(e) = session.update() {
            eprintln!("Error during recording: {}", e);
            return false;
        }
    }
    true
}

fn main() {
    env_logger::init();

    let license = std::env::var("TOBII_RECORDER_LICENSE_KEY")
        .unwrap_or_else(|_| tobii_recorder::license::DEFAULT_LICENSE_KEY.into());
    let display = match DisplayArea::new(2560.0, 1440.0, 0.0) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Bad display area: {}", e);
            std::process::exit(1);
        }
    };
    let config = SessionConfig::from_env(display);

    println!("Initializing tracker session...");
    let (mut session, feed) = match TrackerSession::open(&config, license) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize tracker session: {}", e);
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let producer_running = running.clone();
    let producer = std::thread::spawn(move || {
        let epoch = Instant::now();
        let mut tick: u32 = 0;
        while producer_running.load(Ordering::Relaxed) {
            let phase = (tick % 90) as f32 / 90.0;
            let sample = RawGaze {
                x: phase,
                y: 0.5,
                validity: if tick % 30 == 29 {
                    Validity::Invalid
                } else {
                    Validity::Valid
                },
                timestamp_us: epoch.elapsed().as_micros() as i64,
            };
            if feed.push(sample).is_err() {
                break;
            }
            tick = tick.wrapping_add(1);
            std::thread::sleep(Duration::from_millis(11));
        }
    });

    println!("Starting to record for 1 second...");
    if !record_for(&mut session, 1) {
        std::process::exit(1);
    }

    println!("Pausing recording for 1 second...");
    session.pause();
    std::thread::sleep(Duration::from_secs(1));

    println!("Resuming recording for 1 more second...");
    if !record_for(&mut session, 1) {
        std::process::exit(1);
    }

    println!("Stopping recording and fetching results...");
    session.stop();
    running.store(false, Ordering::Relaxed);
    let _ = producer.join();

    match session.formatted_data() {
        Ok(records) => {
            println!("Printing {} gaze points:", records.len());
            for r in records.iter().step_by(10) {
                println!(
                    "x={:<9.2} y={:<9.2} validity={:<7} timestamp_us={}",
                    r.x, r.y, r.validity, r.timestamp_us
                );
            }
        }
        Err(e) => {
            eprintln!("Error fetching data: {}", e);
            std::process::exit(1);
        }
    }

    println!("Gaze recording session complete.");
}
