//! Console output formatter for command results

use crate::cli::commands::OutputFormat;
use colored::Colorize;
use serde::Serialize;
use toolmesh_domain::core::string::preview;
use toolmesh_domain::{
    ProtocolDefinition, ProtocolJob, ProviderHealth, RunResult, RunStatus, ToolDescriptor,
    ToolReference,
};

/// Longest value preview printed per result key
const PREVIEW_LEN: usize = 100;

/// Formats command results as colored text or JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormatter {
    format: OutputFormat,
}

impl ConsoleFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Format a finished run
    pub fn run_result(&self, result: &RunResult) -> String {
        if self.is_json() {
            return Self::to_json(result);
        }

        let mut output = String::new();
        output.push_str(&Self::header(&format!("Protocol: {}", result.protocol)));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::status(result.status)
        ));
        output.push_str(&format!(
            "{} {} phases, {} steps\n",
            "Completed:".cyan().bold(),
            result.phases_completed,
            result.steps_completed
        ));
        if let Some(error) = &result.error {
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
        }
        Self::push_skipped(&mut output, &result.skipped_steps);
        Self::push_results(&mut output, &result.results);
        output.push_str(&Self::footer());
        output
    }

    /// Format a job snapshot
    pub fn job(&self, job: &ProtocolJob) -> String {
        if self.is_json() {
            return Self::to_json(job);
        }

        let mut output = String::new();
        output.push_str(&Self::section_header(&format!("Job {}", job.id)));
        output.push_str(&format!("{} {}\n", "Protocol:".cyan().bold(), job.protocol));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::status(job.status)
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Started:".cyan().bold(),
            job.started_at.to_rfc3339()
        ));
        if let Some(done) = job.completed_at {
            let elapsed = done.signed_duration_since(job.started_at);
            output.push_str(&format!(
                "{} {} ({} ms)\n",
                "Finished:".cyan().bold(),
                done.to_rfc3339(),
                elapsed.num_milliseconds()
            ));
        }
        if let Some(error) = &job.error {
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
        }
        Self::push_skipped(&mut output, &job.skipped_steps);
        Self::push_results(&mut output, &job.results);
        output
    }

    /// Format provider health, one line per provider
    pub fn health(&self, providers: &[ProviderHealth]) -> String {
        if self.is_json() {
            return Self::to_json(&providers);
        }
        if providers.is_empty() {
            return format!("{}\n", "No providers configured".dimmed());
        }

        let mut output = Self::section_header("Providers");
        for p in providers {
            let mark = if p.healthy {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!(
                "  {} {} {} {} tools",
                mark,
                p.name.bold(),
                format!("[{}]", p.transport).dimmed(),
                p.tool_count
            ));
            if let Some(error) = &p.last_error {
                output.push_str(&format!(" {}", format!("({})", error).red()));
            }
            output.push('\n');
        }
        output
    }

    /// Format an agent's tool catalog
    pub fn tools(&self, agent: &str, tools: &[ToolDescriptor]) -> String {
        if self.is_json() {
            return Self::to_json(&tools);
        }

        let mut output = Self::section_header(&format!("Tools for {}", agent));
        if tools.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for tool in tools {
            output.push_str(&format!("  {}", tool.name.yellow().bold()));
            if !tool.description.is_empty() {
                output.push_str(&format!("  {}", tool.description.dimmed()));
            }
            output.push('\n');
        }
        output
    }

    /// Format one resolution
    pub fn reference(&self, agent: &str, tool: &str, reference: &ToolReference) -> String {
        if self.is_json() {
            return Self::to_json(reference);
        }
        format!(
            "{} {} {} {}\n",
            agent.bold(),
            tool.yellow(),
            "->".cyan(),
            reference
        )
    }

    /// Format a successfully validated protocol
    pub fn validated(&self, protocol: &ProtocolDefinition) -> String {
        if self.is_json() {
            return Self::to_json(protocol);
        }

        let mut output = format!(
            "{} {} ({} phases, {} steps)\n",
            "valid".green().bold(),
            protocol.name().bold(),
            protocol.phases.len(),
            protocol.step_count()
        );
        for phase in &protocol.phases {
            output.push_str(&format!("  {}\n", phase.name.cyan()));
            for step in &phase.steps {
                output.push_str(&format!(
                    "    {} {} {}\n",
                    step.name,
                    "->".dimmed(),
                    step.tool.yellow()
                ));
            }
        }
        output
    }

    fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn status(status: RunStatus) -> colored::ColoredString {
        match status {
            RunStatus::Running => status.as_str().yellow().bold(),
            RunStatus::Completed => status.as_str().green().bold(),
            RunStatus::Failed => status.as_str().red().bold(),
        }
    }

    fn push_skipped(output: &mut String, skipped: &[toolmesh_domain::SkippedStep]) {
        if skipped.is_empty() {
            return;
        }
        output.push_str(&format!("\n{}\n", "Skipped steps:".yellow().bold()));
        for s in skipped {
            output.push_str(&format!("  * {}/{}: {}\n", s.phase, s.step, s.error));
        }
    }

    fn push_results(output: &mut String, results: &serde_json::Map<String, serde_json::Value>) {
        if results.is_empty() {
            return;
        }
        output.push_str(&format!("\n{}\n", "Results:".cyan().bold()));
        for (key, value) in results {
            output.push_str(&format!(
                "  {} {}\n",
                format!("{}:", key).bold(),
                preview(value, PREVIEW_LEN)
            ));
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolmesh_domain::{ExecutionState, TransportKind};

    fn plain() -> ConsoleFormatter {
        colored::control::set_override(false);
        ConsoleFormatter::new(OutputFormat::Text)
    }

    fn sample_result() -> RunResult {
        let mut state = ExecutionState::default();
        state.record_success(Some("lookup"), json!({"id": 42}));
        state.record_skip("enrich", "fetch", "Unknown tool: web_fetch");
        state.complete_phase();
        state.finish("research", None)
    }

    #[test]
    fn test_run_result_text() {
        let text = plain().run_result(&sample_result());
        assert!(text.contains("Protocol: research"));
        assert!(text.contains("Status: completed"));
        assert!(text.contains("1 phases, 1 steps"));
        assert!(text.contains("enrich/fetch: Unknown tool: web_fetch"));
        assert!(text.contains("lookup: {\"id\":42}"));
    }

    #[test]
    fn test_run_result_json() {
        let formatter = ConsoleFormatter::new(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&formatter.run_result(&sample_result())).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["results"]["lookup"]["id"], 42);
    }

    #[test]
    fn test_health_lines() {
        let providers = vec![ProviderHealth {
            name: "github".into(),
            transport: TransportKind::Sse,
            healthy: false,
            last_probe: None,
            tool_count: 0,
            last_error: Some("connection refused".into()),
        }];
        let text = plain().health(&providers);
        assert!(text.contains("x github [sse] 0 tools (connection refused)"));
        assert!(plain().health(&[]).contains("No providers configured"));
    }

    #[test]
    fn test_reference_line() {
        let text = plain().reference("planner", "github_search", &ToolReference::remote("github", "search"));
        assert_eq!(text, "planner github_search -> remote:github/search\n");
    }
}
