use fire_watch::{CycleReport, Presenter, RunSummary, SessionError, Status, Theme};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Presenter for one run: a 0..100 detection bar in pretty mode, one line per
    /// cycle otherwise.
    pub fn presenter(&self, theme: Theme) -> ConsolePresenter {
        let bar = if self.use_pretty() {
            let bar = ProgressBar::new(100);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            let template = match theme {
                Theme::Light => "{prefix:>6} [{bar:30.red/white}] {msg}",
                Theme::Dark => "{prefix:>6} [{bar:30.red/black}] {msg}",
            };
            let style = ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style.progress_chars("█░ "));
            Some(bar)
        } else {
            None
        };
        ConsolePresenter { bar }
    }
}

pub struct ConsolePresenter {
    bar: Option<ProgressBar>,
}

impl Presenter for ConsolePresenter {
    fn on_cycle(&mut self, report: &CycleReport) {
        let mut message = report.status_text().to_string();
        if report.alert {
            message.push_str(" [ALERT]");
        }
        match &self.bar {
            Some(bar) => {
                bar.set_prefix(format!("#{}", report.cycle));
                bar.set_position(u64::from(report.progress));
                bar.set_message(message);
            }
            None => {
                let marker = match report.status {
                    Status::Detected => "!!",
                    Status::Clear => "--",
                };
                eprintln!(
                    "{} {} cycle {}: {} ({} objects)",
                    marker,
                    report.event.clock_time(),
                    report.cycle,
                    message,
                    report.objects
                );
            }
        }
    }

    fn on_skipped(&mut self, cycle: u64, reason: &SessionError) {
        let line = format!("cycle {} skipped: {}", cycle, reason);
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn on_stopped(&mut self, summary: &RunSummary) {
        let message = summary.closing_message().unwrap_or("Done.");
        match &self.bar {
            Some(bar) => bar.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }

    fn on_error(&mut self, error: &SessionError) {
        match &self.bar {
            Some(bar) => bar.abandon_with_message(format!("error: {error}")),
            None => eprintln!("error: {error}"),
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
