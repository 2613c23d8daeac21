use std::path::PathBuf;
use std::sync::Arc;

pub struct WatchCommandConfig<'a> {
    pub backend: Option<&'a str>,
    pub interval_ms: u64,
    pub upload: Option<PathBuf>,
    pub output_dir: PathBuf,
}

pub fn run(cfg: WatchCommandConfig<'_>) {
    let config = super::make_config(cfg.backend, cfg.interval_ms);
    let client = Arc::new(super::make_backend(config));

    if let Some(path) = &cfg.upload {
        if !path.is_file() {
            eprintln!("Upload file not found: {}", path.display());
            std::process::exit(1);
        }
    }

    let rt = super::runtime();
    let mut app =
        crate::tui::app::App::new(client, rt.handle().clone(), cfg.upload, cfg.output_dir);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
