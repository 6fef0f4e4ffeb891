use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::executor::ExecutionReport;

/// One-line status for a single generator run.
pub struct Spinner {
    enabled: bool,
    message: String,
    start_time: Instant,
}

impl Spinner {
    pub fn new(enabled: bool, message: &str) -> Self {
        let spinner = Self {
            enabled,
            message: message.to_string(),
            start_time: Instant::now(),
        };

        if enabled {
            print!("⏳ {}...", message);
            io::stdout().flush().unwrap_or(());
        }

        spinner
    }

    pub fn succeed(self) {
        if self.enabled {
            println!(
                "\r✅ {} completed in {:.1}s",
                self.message,
                self.start_time.elapsed().as_secs_f64()
            );
        }
    }

    pub fn fail(self) {
        if self.enabled {
            println!(
                "\r❌ {} failed after {:.1}s",
                self.message,
                self.start_time.elapsed().as_secs_f64()
            );
        }
    }
}

/// Counts finished runs of a batch, safe to bump from any task.
pub struct BatchProgress {
    enabled: bool,
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl BatchProgress {
    pub fn new(enabled: bool, total: usize) -> Self {
        if enabled {
            println!("🚀 Running {} generator {}...", total, if total == 1 { "run" } else { "runs" });
        }
        Self {
            enabled,
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, report: &ExecutionReport) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if !report.success() {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        if self.enabled {
            let icon = if report.success() { "✅" } else { "❌" };
            println!(
                "   {} [{}/{}] {} <- {} ({:.1}s)",
                icon,
                completed,
                self.total,
                report.llm_name,
                report.story_path,
                report.duration_ms as f64 / 1000.0
            );
        }

        completed
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        if self.enabled {
            println!(
                "🏁 Completed {} {} in {:.1}s ({} failed)",
                self.total,
                if self.total == 1 { "run" } else { "runs" },
                self.start_time.elapsed().as_secs_f64(),
                self.failed()
            );
        }
    }
}
