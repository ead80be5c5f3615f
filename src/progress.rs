//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di hashing.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar principale (un tick per video)
//! - `HashStats`: contatori cumulativi (hashati, falliti, secondi di video)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [========================>---------------] 12/20 (60%) rocket.mkv: a3f09c12e4b7d851
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(videos.len() as u64);
//! let mut stats = HashStats::new();
//!
//! stats.add_hashed(duration);
//! progress.update("rocket.mkv: a3f09c12e4b7d851");
//!
//! progress.finish(&stats.format_summary());
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a hashing run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Hidden bar, for `--json` and non-interactive runs
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Print a line above the bar without breaking it
    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for hashing results
#[derive(Debug, Default)]
pub struct HashStats {
    pub files_processed: usize,
    pub files_hashed: usize,
    pub errors: usize,
    pub total_duration: f64,
}

impl HashStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hashed(&mut self, duration: f64) {
        self.files_processed += 1;
        self.files_hashed += 1;
        self.total_duration += duration;
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Hashed: {} | Errors: {} | Video time: {:.2}s",
            self.files_processed, self.files_hashed, self.errors, self.total_duration
        )
    }
}
