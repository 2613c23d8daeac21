//! TUI application state and event loop.
//!
//! The poller runs as a task on the tokio runtime and owns all fleet state.
//! The UI thread only reads the latest committed view, lays it out, and
//! eases markers toward their new positions between polls. Operator commands
//! run as separate tasks so a slow backend never blocks drawing or polling.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::runtime::Handle;

use fleetwatch_core::{
    Command, FleetView, HttpBackend, Marker, MarkerAnimator, PlaybackSpeed, PollerChannels,
    PollerHandle, PollerPhase, RecordingConfig, SnapshotRecorder, Unit, export_snapshot, layout,
    poller,
};

/// How long an informational notice stays on screen.
const INFO_TTL: Duration = Duration::from_secs(5);
/// Oldest notices are dropped beyond this.
const MAX_NOTICES: usize = 8;
/// Input poll timeout while markers glide, and while they are at rest.
const ANIMATION_TICK: Duration = Duration::from_millis(16);
const IDLE_TICK: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Expires on its own.
    Info,
    /// Stays until dismissed.
    Error,
    /// Stays until dismissed.
    SimulationEnded,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub raised: Instant,
}

/// Newest-last queue of notices shown in the side panel.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: VecDeque<Notice>,
}

impl NoticeBoard {
    pub fn push(&mut self, kind: NoticeKind, text: impl Into<String>, now: Instant) {
        self.notices.push_back(Notice {
            kind,
            text: text.into(),
            raised: now,
        });
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    /// Drop informational notices older than their time to live.
    pub fn expire(&mut self, now: Instant) {
        self.notices.retain(|n| {
            n.kind != NoticeKind::Info || now.saturating_duration_since(n.raised) < INFO_TTL
        });
    }

    /// Remove the newest notice. Returns false when there was nothing to remove.
    pub fn dismiss(&mut self) -> bool {
        self.notices.pop_back().is_some()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

/// Move a list cursor by `delta`, clamped to `[0, len)`.
pub fn move_cursor(cursor: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

struct CommandResult {
    command: Command,
    outcome: Result<String, String>,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    backend: Arc<HttpBackend>,
    runtime: Handle,
    poller: Option<PollerHandle>,
    channels: PollerChannels,
    view: Arc<FleetView>,
    markers: Vec<Marker>,
    animator: MarkerAnimator,
    /// Redraw counter, drives the pulse of moving markers.
    frame: u64,
    running: bool,
    cursor: usize,
    notices: NoticeBoard,
    results_tx: mpsc::Sender<CommandResult>,
    results_rx: mpsc::Receiver<CommandResult>,
    /// Commands sent and not yet answered.
    pending: usize,
    /// A re-poll was requested and its result has not arrived yet.
    refresh_pending: bool,
    upload_path: Option<PathBuf>,
    output_dir: PathBuf,
    recorder: Option<SnapshotRecorder>,
    /// Directory of the active recording, or of the last finished one.
    recording_path: Option<PathBuf>,
}

impl App {
    /// Start polling `backend` on `runtime`.
    pub fn new(
        backend: Arc<HttpBackend>,
        runtime: Handle,
        upload_path: Option<PathBuf>,
        output_dir: PathBuf,
    ) -> Self {
        let config = backend.config();
        let interval = config.poll_interval;
        let transition = config.transition;

        let (poller, channels) = {
            let _guard = runtime.enter();
            poller::spawn(Arc::clone(&backend), interval)
        };
        let view = channels.view.borrow().clone();
        let (results_tx, results_rx) = mpsc::channel();

        Self {
            backend,
            runtime,
            poller: Some(poller),
            channels,
            view,
            markers: Vec::new(),
            animator: MarkerAnimator::new(transition),
            frame: 0,
            running: true,
            cursor: 0,
            notices: NoticeBoard::default(),
            results_tx,
            results_rx,
            pending: 0,
            refresh_pending: false,
            upload_path,
            output_dir,
            recorder: None,
            recording_path: None,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before printing a panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        self.shutdown();

        if let Some(path) = &self.recording_path {
            println!("Recording saved to {}", path.display());
        }

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            self.sync(Instant::now());
            terminal.draw(|f| super::ui::draw(f, self))?;
            self.frame = self.frame.wrapping_add(1);

            if event::poll(self.tick_rate(Instant::now()))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    /// Redraw faster while markers are moving between polls.
    fn tick_rate(&self, now: Instant) -> Duration {
        if self.animator.is_animating(now) {
            ANIMATION_TICK
        } else {
            IDLE_TICK
        }
    }

    /// Stop polling exactly once and close any open recording.
    fn shutdown(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if self.recorder.is_some() {
            self.stop_recording();
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = move_cursor(self.cursor, self.markers.len(), -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = move_cursor(self.cursor, self.markers.len(), 1);
            }
            KeyCode::Char('s') => self.send(Command::Start),
            KeyCode::Char('x') => self.send(Command::Stop),
            KeyCode::Char('u') => match self.upload_path.clone() {
                Some(path) => self.send(Command::Upload(path)),
                None => self.notices.push(
                    NoticeKind::Error,
                    "no upload file (start with --upload <path>)",
                    Instant::now(),
                ),
            },
            KeyCode::Char('r') => {
                if self.recorder.is_some() {
                    self.stop_recording();
                } else {
                    self.start_recording();
                }
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('d') => {
                self.notices.dismiss();
            }
            KeyCode::Char('+') => {
                let next = PlaybackSpeed::nearest(self.view.snapshot.speed).next();
                self.send(Command::SetSpeed(next));
            }
            KeyCode::Char(c) => {
                if let Some(speed) = crate::commands::speed_for_key(c) {
                    self.send(Command::SetSpeed(speed));
                }
            }
            _ => {}
        }
    }

    /// Pull the latest committed view and drain events.
    fn sync(&mut self, now: Instant) {
        let latest = self.channels.view.borrow_and_update().clone();
        if !Arc::ptr_eq(&latest, &self.view) {
            if self.refresh_pending && latest.phase == PollerPhase::Idle {
                self.refresh_pending = false;
            }
            self.view = latest;
            self.markers = layout(&self.view.snapshot, &self.view.bounds);
            self.animator.sync(self.view.polls, &self.markers, now);
            self.cursor = self.cursor.min(self.markers.len().saturating_sub(1));
            self.record_view();
        }

        while self.channels.notifications.try_recv().is_ok() {
            self.notices
                .push(NoticeKind::SimulationEnded, "Simulation ended", now);
        }

        while let Ok(result) = self.results_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            match result.outcome {
                Ok(message) => {
                    if result.command.wants_refresh() {
                        if let Some(poller) = &self.poller {
                            poller.refresh();
                            self.refresh_pending = true;
                        }
                    }
                    self.notices.push(NoticeKind::Info, message, now);
                }
                Err(e) => self.notices.push(
                    NoticeKind::Error,
                    format!("{} failed: {e}", result.command.label()),
                    now,
                ),
            }
        }

        self.notices.expire(now);
    }

    fn send(&mut self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let tx = self.results_tx.clone();
        self.pending += 1;
        self.runtime.spawn(async move {
            let outcome = backend.execute(&command).await.map_err(|e| e.to_string());
            let _ = tx.send(CommandResult { command, outcome });
        });
    }

    fn record_view(&mut self) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if let Err(e) = recorder.record(&self.view) {
            self.notices.push(
                NoticeKind::Error,
                format!("recording stopped: {e}"),
                Instant::now(),
            );
            self.stop_recording();
        }
    }

    fn start_recording(&mut self) {
        let config = RecordingConfig {
            output_dir: self.output_dir.clone(),
            backend: self.backend.config().backend.clone(),
            note: None,
        };
        match SnapshotRecorder::new(config) {
            Ok(recorder) => {
                self.recording_path = Some(recorder.session_dir().to_path_buf());
                self.recorder = Some(recorder);
                self.record_view();
            }
            Err(e) => self.notices.push(
                NoticeKind::Error,
                format!("cannot start recording: {e}"),
                Instant::now(),
            ),
        }
    }

    fn stop_recording(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        match recorder.finish() {
            Ok(path) => {
                self.notices.push(
                    NoticeKind::Info,
                    format!("recording saved to {}", path.display()),
                    Instant::now(),
                );
                self.recording_path = Some(path);
            }
            Err(e) => self.notices.push(
                NoticeKind::Error,
                format!("failed to finish recording: {e}"),
                Instant::now(),
            ),
        }
    }

    fn export(&mut self) {
        if !self.view.has_data() {
            self.notices
                .push(NoticeKind::Error, "nothing to export yet", Instant::now());
            return;
        }
        match export_snapshot(&self.output_dir, &self.view) {
            Ok(path) => self.notices.push(
                NoticeKind::Info,
                format!("snapshot exported to {}", path.display()),
                Instant::now(),
            ),
            Err(e) => self.notices.push(
                NoticeKind::Error,
                format!("export failed: {e}"),
                Instant::now(),
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors for the UI
    // -----------------------------------------------------------------------

    pub fn view(&self) -> &FleetView {
        &self.view
    }

    pub fn backend_url(&self) -> &str {
        &self.backend.config().backend
    }

    pub fn poll_interval(&self) -> Duration {
        self.backend.config().poll_interval
    }

    /// Markers at their animated positions for this frame.
    pub fn frame_markers(&self) -> Vec<Marker> {
        self.animator.frame(&self.markers, Instant::now())
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.markers.get(self.cursor).map(|m| m.id.as_str())
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.selected_id().and_then(|id| self.view.snapshot.unit(id))
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    pub fn pending_commands(&self) -> usize {
        self.pending
    }

    pub fn upload_path(&self) -> Option<&PathBuf> {
        self.upload_path.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Elapsed time and record count of the active recording.
    pub fn recording_status(&self) -> Option<(Duration, u64)> {
        self.recorder.as_ref().map(|r| (r.elapsed(), r.records()))
    }
}
