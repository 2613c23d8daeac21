use fleetwatch_core::Command;
use fleetwatch_core::config::DEFAULT_POLL_INTERVAL;

/// Send one operator command and report the outcome.
pub fn run(backend: Option<&str>, command: Command) {
    let config = super::make_config(backend, DEFAULT_POLL_INTERVAL.as_millis() as u64);
    let base = config.backend.clone();
    let client = super::make_backend(config);

    let rt = super::runtime();
    match rt.block_on(client.execute(&command)) {
        Ok(message) => println!("{message}"),
        Err(e) => {
            eprintln!("Failed to {} on {base}: {e}", command.label());
            std::process::exit(1);
        }
    }
}
