use std::path::PathBuf;

use fleetwatch_core::{
    FleetView, PlaybackSpeed, PollerPhase, RecordingConfig, SnapshotRecorder, poller,
};

pub fn run(backend: Option<&str>, interval_ms: u64, record: Option<PathBuf>, note: Option<String>) {
    let config = super::make_config(backend, interval_ms);
    let base = config.backend.clone();
    let interval = config.poll_interval;
    let client = super::make_backend(config);

    let mut recorder = record.map(|output_dir| {
        match SnapshotRecorder::new(RecordingConfig {
            output_dir,
            backend: base.clone(),
            note,
        }) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Cannot start recording: {e}");
                std::process::exit(1);
            }
        }
    });

    println!("Following {base} every {}ms", interval.as_millis());
    if let Some(r) = &recorder {
        println!("Recording to {}", r.session_dir().display());
    }
    println!("Press Ctrl+C to stop.");
    println!();

    let rt = super::runtime();
    rt.block_on(async {
        let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = stop_tx.send(true);
        }) {
            eprintln!("Error setting Ctrl+C handler: {e}");
            std::process::exit(1);
        }

        let (handle, mut channels) = poller::spawn(client, interval);
        let mut last_line = String::new();
        let mut was_failing = false;

        loop {
            tokio::select! {
                changed = channels.view.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = channels.view.borrow_and_update().clone();
                    if view.phase == PollerPhase::Polling {
                        continue;
                    }

                    let failing = view.consecutive_failures > 0;
                    if failing && !was_failing {
                        let reason = view.last_error.as_deref().unwrap_or("unknown error");
                        println!("backend unreachable: {reason} (keeping last snapshot)");
                    } else if !failing && was_failing {
                        println!("backend reachable again");
                    }
                    was_failing = failing;

                    let line = status_line(&view);
                    if view.has_data() && line != last_line {
                        println!("[poll #{}] {line}", view.polls);
                        last_line = line;
                    }

                    if let Some(r) = recorder.as_mut() {
                        if let Err(e) = r.record(&view) {
                            eprintln!("Recording stopped: {e}");
                            recorder = None;
                        }
                    }
                }
                Some(_) = channels.notifications.recv() => {
                    println!("*** simulation ended ***");
                }
                _ = stop_rx.changed() => break,
            }
        }

        handle.stop();
    });

    if let Some(r) = recorder {
        match r.finish() {
            Ok(path) => println!("Recording saved to {}", path.display()),
            Err(e) => eprintln!("Failed to finish recording: {e}"),
        }
    }
}

/// One-line fleet summary; printed only when it changes.
fn status_line(view: &FleetView) -> String {
    let snap = &view.snapshot;
    let mut line = format!(
        "{} units  {} online  {} error  sim {}  speed {}",
        view.stats.total,
        view.stats.online,
        view.stats.error,
        if snap.is_active { "running" } else { "stopped" },
        PlaybackSpeed::nearest(snap.speed)
    );
    let failing: Vec<String> = snap
        .units
        .iter()
        .filter_map(|u| u.error_details().map(|d| format!("{}: {d}", u.id)))
        .collect();
    if !failing.is_empty() {
        line.push_str("  [");
        line.push_str(&failing.join(", "));
        line.push(']');
    }
    line
}
