use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Controls whether long waits get a spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Spinner on stderr while a wait is in flight.
    Spinner,
    /// No spinner. Used when stderr is not a terminal, and in verbose mode
    /// where log lines would interleave with the redraws.
    Plain,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    mode: OutputMode,
}

impl Progress {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn hidden() -> Self {
        Self::new(OutputMode::Plain)
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Await `fut` behind a spinner labelled `label`.
    ///
    /// The bar is cleared before returning so log lines that follow start on
    /// a clean line.
    pub async fn run<F, T>(&self, label: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        if self.mode == OutputMode::Plain {
            return fut.await;
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        let result = fut.await;

        bar.finish_and_clear();
        result
    }
}
