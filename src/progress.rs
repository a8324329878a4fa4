use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct StatusState {
    stage: String,
    lines: u64,
}

/// Spinner on stderr. Display state is updated read-modify-write under a lock,
/// so a producer may bump it while output is being written.
pub struct StatusIndicator {
    bar: ProgressBar,
    state: Mutex<StatusState>,
}

impl StatusIndicator {
    pub fn spinner() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(bar)
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            state: Mutex::new(StatusState::default()),
        }
    }

    pub fn stage(&self, stage: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.stage = stage.into();
            state.lines = 0;
            self.bar.set_message(state.stage.clone());
        }
    }

    pub fn line_read(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.lines += 1;
            if state.lines % 256 == 0 {
                self.bar
                    .set_message(format!("{} ({} lines)", state.stage, state.lines));
            }
        }
    }

    pub fn lines_in_stage(&self) -> u64 {
        self.state.lock().map(|s| s.lines).unwrap_or(0)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
