use eltraj::engine::progress::{Progress, ProgressCallback};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::warn;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

pub struct UiManager {
    bars: Arc<MultiProgress>,
    phase: PhaseState,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    anchor: ProgressBar,
}

#[derive(Default)]
struct PhaseState {
    bar: Option<ProgressBar>,
    title: String,
    started: Option<Instant>,
}

impl PhaseState {
    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.as_ref() {
            f(bar);
        }
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let bars = Arc::new(MultiProgress::new());
        bars.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let anchor = bars.add(ProgressBar::hidden());
        let manager = Self {
            bars,
            phase: PhaseState::default(),
            event_receiver,
            shutdown_receiver,
            anchor,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        // Events sent just before shutdown still get drawn.
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        self.phase.clear();
        self.anchor.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(msg) => {
                self.bars.println(msg).ok();
            }
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                self.phase.clear();

                let pb = self.bars.add(ProgressBar::new_spinner());
                pb.enable_steady_tick(Duration::from_millis(80));
                pb.set_style(Self::spinner_style());
                pb.set_message(name.clone());

                self.phase.bar = Some(pb);
                self.phase.title = name;
                self.phase.started = Some(Instant::now());
            }
            Progress::PhaseFinish => {
                self.phase.clear();
                let elapsed = self
                    .phase
                    .started
                    .take()
                    .map(|t| t.elapsed().as_secs_f64())
                    .unwrap_or_default();
                self.bars
                    .println(format!("✓ {} ({:.1}s)", self.phase.title, elapsed))
                    .ok();
                self.phase.title.clear();
            }
            Progress::TaskStart { total } => self.phase.with_bar(|bar| {
                bar.set_style(Self::bar_style());
                bar.set_length(total);
                bar.set_position(0);
                bar.disable_steady_tick();
            }),
            Progress::TaskIncrement { amount } => self.phase.with_bar(|bar| bar.inc(amount)),
            Progress::TaskFinish => self.phase.with_bar(|bar| bar.finish()),
            Progress::StatusUpdate { text } => {
                let message = format!("{} ({})", self.phase.title, text);
                self.phase.with_bar(|bar| bar.set_message(message));
            }
            Progress::Message(msg) => {
                self.bars.println(format!("  {}", msg)).ok();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }

    /// Frames and chunks are counted; the rate is shown instead of an ETA.
    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:<40} [{bar:40.cyan/blue}] {pos}/{len} ({rate}, {elapsed_precise})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("rate", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}/s", state.per_sec());
        })
        .progress_chars("━╸ ")
    }
}

#[derive(Clone)]
pub struct ProgressForwarder {
    sender: mpsc::Sender<UiEvent>,
}

impl ProgressForwarder {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Failed to send progress update to UI channel: {}", e);
            }
        })
    }

    /// Prints a line above the progress bars.
    pub fn log(&self, message: impl Into<String>) {
        if self.sender.try_send(UiEvent::Log(message.into())).is_err() {
            warn!("Failed to send log line to UI channel.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> (UiManager, mpsc::Sender<UiEvent>) {
        let (manager, sender, _shutdown) = UiManager::new();
        manager.bars.set_draw_target(ProgressDrawTarget::hidden());
        (manager, sender)
    }

    fn start_phase(manager: &mut UiManager, name: &str) {
        manager.handle_event(UiEvent::Progress(Progress::phase(name)));
    }

    #[test]
    fn phase_start_creates_spinner() {
        let (mut manager, _) = setup_manager();
        assert!(manager.phase.bar.is_none());

        start_phase(&mut manager, "Loading Trajectory");

        let bar = manager.phase.bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Loading Trajectory");
        assert_eq!(manager.phase.title, "Loading Trajectory");
    }

    #[test]
    fn phase_start_replaces_existing_bar() {
        let (mut manager, _) = setup_manager();
        start_phase(&mut manager, "Loading Trajectory");
        start_phase(&mut manager, "Assigning Molecules");

        let bar = manager.phase.bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Assigning Molecules");
        assert_eq!(manager.phase.title, "Assigning Molecules");
    }

    #[test]
    fn phase_finish_clears_bar() {
        let (mut manager, _) = setup_manager();
        start_phase(&mut manager, "Computing RDFs");
        manager.handle_event(UiEvent::Progress(Progress::PhaseFinish));

        assert!(manager.phase.bar.is_none());
        assert!(manager.phase.title.is_empty());
        assert!(manager.phase.started.is_none());
    }

    #[test]
    fn task_events_drive_the_bar() {
        let (mut manager, _) = setup_manager();
        start_phase(&mut manager, "Computing RDFs");

        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 40 }));
        let bar = manager.phase.bar.as_ref().unwrap();
        assert_eq!(bar.length(), Some(40));
        assert_eq!(bar.position(), 0);

        manager.handle_event(UiEvent::Progress(Progress::TaskIncrement { amount: 3 }));
        assert_eq!(manager.phase.bar.as_ref().unwrap().position(), 3);

        manager.handle_event(UiEvent::Progress(Progress::TaskFinish));
        assert!(manager.phase.bar.as_ref().unwrap().is_finished());
    }

    #[test]
    fn status_update_appends_to_phase_name() {
        let (mut manager, _) = setup_manager();
        start_phase(&mut manager, "Unwrapping (hybrid)");

        manager.handle_event(UiEvent::Progress(Progress::StatusUpdate {
            text: "Li".into(),
        }));

        let bar = manager.phase.bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Unwrapping (hybrid) (Li)");
    }

    #[test]
    fn messages_without_bar_are_harmless() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Log("wrote rdf.csv".to_string()));
        manager.handle_event(UiEvent::Progress(Progress::Message("3 frames".to_string())));
        manager.handle_event(UiEvent::Progress(Progress::TaskIncrement { amount: 1 }));
        assert!(manager.phase.bar.is_none());
    }

    #[tokio::test]
    async fn progress_handler_forwards_events() {
        let (sender, mut receiver) = mpsc::channel(4);
        let handler = ProgressForwarder::new(sender);
        let callback = handler.callback();

        callback(Progress::phase("Testing"));
        handler.log("done");

        match receiver.recv().await.unwrap() {
            UiEvent::Progress(Progress::PhaseStart { name }) => assert_eq!(name, "Testing"),
            other => panic!("unexpected event: {:?}", other),
        }
        match receiver.recv().await.unwrap() {
            UiEvent::Log(line) => assert_eq!(line, "done"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_exits_on_shutdown() {
        let (manager, sender, shutdown) = UiManager::new();
        manager.bars.set_draw_target(ProgressDrawTarget::hidden());
        let handle = tokio::spawn(manager.run());
        sender.send(UiEvent::Log("line".into())).await.unwrap();
        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }
}
