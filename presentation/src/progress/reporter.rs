//! Progress reporting for protocol runs

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use toolmesh_application::ExecutionObserver;
use toolmesh_domain::{ErrorPolicy, RunResult, ToolError};

/// Reports run progress with a single bar across all steps
pub struct ProgressReporter {
    multi: MultiProgress,
    run_bar: Mutex<Option<ProgressBar>>,
    phase: Mutex<String>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            run_bar: Mutex::new(None),
            phase: Mutex::new(String::new()),
        }
    }

    fn run_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(pb) = self.run_bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            f(pb);
        }
    }

    fn current_phase(&self) -> String {
        self.phase.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionObserver for ProgressReporter {
    fn on_run_start(&self, protocol: &str, total_steps: usize) {
        let pb = self.multi.add(ProgressBar::new(total_steps as u64));
        pb.set_style(Self::run_style());
        pb.set_prefix(protocol.to_string());
        pb.set_message("Starting...");
        pb.enable_steady_tick(Duration::from_millis(120));

        *self.run_bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn on_phase_start(&self, phase: &str, index: usize, total: usize) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase.to_string();
        self.with_bar(|pb| pb.set_message(format!("phase {}/{}: {}", index + 1, total, phase)));
    }

    fn on_step_start(&self, phase: &str, step: &str, tool: &str) {
        self.with_bar(|pb| pb.set_message(format!("{}/{} {}", phase, step, tool.dimmed())));
    }

    fn on_step_retry(&self, step: &str, retry: u32, delay: Duration, error: &ToolError) {
        self.with_bar(|pb| {
            pb.println(format!(
                "  {} {} retry {} in {} ms: {}",
                "~".yellow(),
                step,
                retry,
                delay.as_millis(),
                error
            ))
        });
    }

    fn on_step_complete(&self, step: &str) {
        let phase = self.current_phase();
        self.with_bar(|pb| {
            pb.set_message(format!("{} {}/{}", "v".green(), phase, step));
            pb.inc(1);
        });
    }

    fn on_step_failed(&self, step: &str, policy: ErrorPolicy, error: &ToolError) {
        let phase = self.current_phase();
        self.with_bar(|pb| {
            pb.println(format!(
                "  {} {}/{} ({}): {}",
                "x".red(),
                phase,
                step,
                policy,
                error
            ));
            if policy == ErrorPolicy::Continue {
                pb.inc(1);
            }
        });
    }

    fn on_run_complete(&self, result: &RunResult) {
        if let Some(pb) = self.run_bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            if result.is_success() {
                pb.finish_with_message(format!("{}", "complete!".green()));
            } else {
                pb.abandon_with_message(format!("{}", "failed".red()));
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ExecutionObserver for SimpleProgress {
    fn on_run_start(&self, protocol: &str, total_steps: usize) {
        eprintln!("{} {} ({} steps)", "=>".cyan(), protocol.bold(), total_steps);
    }

    fn on_phase_start(&self, phase: &str, index: usize, total: usize) {
        eprintln!("{} [{}/{}] {}", "->".cyan(), index + 1, total, phase.bold());
    }

    fn on_step_retry(&self, step: &str, retry: u32, delay: Duration, error: &ToolError) {
        eprintln!(
            "  {} {} retry {} in {} ms: {}",
            "~".yellow(),
            step,
            retry,
            delay.as_millis(),
            error
        );
    }

    fn on_step_complete(&self, step: &str) {
        eprintln!("  {} {}", "v".green(), step);
    }

    fn on_step_failed(&self, step: &str, policy: ErrorPolicy, error: &ToolError) {
        eprintln!("  {} {} ({}): {}", "x".red(), step, policy, error);
    }

    fn on_run_complete(&self, result: &RunResult) {
        eprintln!("{} {}", "=>".cyan(), result.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;
    use toolmesh_domain::ExecutionState;

    fn hidden_reporter() -> ProgressReporter {
        let reporter = ProgressReporter::new();
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    #[test]
    fn test_bar_tracks_completed_and_continued_steps() {
        let reporter = hidden_reporter();
        reporter.on_run_start("research", 3);
        reporter.on_phase_start("gather", 0, 1);
        reporter.on_step_start("gather", "search", "web_search");
        reporter.on_step_complete("search");
        reporter.on_step_failed(
            "fetch",
            ErrorPolicy::Continue,
            &ToolError::unknown_tool("web_fetch"),
        );

        let pb = reporter.run_bar.lock().unwrap().clone().unwrap();
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
    }

    #[test]
    fn test_run_complete_finishes_bar() {
        let reporter = hidden_reporter();
        reporter.on_run_start("research", 1);
        let pb = reporter.run_bar.lock().unwrap().clone().unwrap();

        reporter.on_run_complete(&ExecutionState::default().finish("research", None));
        assert!(reporter.run_bar.lock().unwrap().is_none());
        assert!(pb.is_finished());
    }

    #[test]
    fn test_events_without_run_are_ignored() {
        let reporter = hidden_reporter();
        reporter.on_step_complete("orphan");
        reporter.on_run_complete(&ExecutionState::default().finish("x", Some("boom".into())));
        assert!(reporter.run_bar.lock().unwrap().is_none());
    }
}
