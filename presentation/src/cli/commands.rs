//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// CLI arguments for toolmesh
#[derive(Parser, Debug)]
#[command(name = "toolmesh")]
#[command(author, version, about = "Capability router and protocol runner for agent tool meshes")]
#[command(long_about = r#"
toolmesh routes tool calls from agents to local functions, other agents and
remote MCP providers, and runs declarative multi-phase protocols on top.

Configuration files are loaded from (in priority order):
1. TOOLMESH_* environment variables (TOOLMESH_ROUTER__MAX_DELEGATION_DEPTH=4)
2. --config <path>     Explicit config file
3. ./toolmesh.toml     Project-level config
4. ~/.config/toolmesh/config.toml   Global config

Example:
  toolmesh run protocols/research.yaml --var topic=rust
  toolmesh run research --async --agent planner
  toolmesh tools planner
  toolmesh resolve planner github_search_issues
  toolmesh health -o json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a protocol from a file path or by name from the protocols directory
    Run {
        /// Protocol file or name
        protocol: String,

        /// Variable override as key=value; JSON values are parsed (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, Value)>,

        /// Start the run as a background job and poll it to completion
        #[arg(long = "async")]
        run_async: bool,

        /// Agent identity to dispatch steps as (overrides executor.agent)
        #[arg(long, value_name = "NAME")]
        agent: Option<String>,
    },

    /// Load and validate a protocol without running it
    Validate {
        /// Protocol file or name
        protocol: String,
    },

    /// List the tools an agent may call
    Tools {
        /// Agent name
        agent: String,
    },

    /// Show how a tool name resolves for an agent
    Resolve {
        /// Agent name
        agent: String,
        /// Flat tool name
        tool: String,
    },

    /// Connect to every configured provider and report its health
    Health,

    /// Show configuration file locations and exit
    Config,
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON.
pub fn parse_var(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("topic=rust"), Ok(("topic".into(), json!("rust"))));
        assert_eq!(parse_var("depth=3"), Ok(("depth".into(), json!(3))));
        assert_eq!(
            parse_var("filter={\"lang\":\"rs\"}"),
            Ok(("filter".into(), json!({"lang": "rs"})))
        );
        assert_eq!(parse_var("q=a=b"), Ok(("q".into(), json!("a=b"))));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from([
            "toolmesh", "run", "research", "--var", "topic=rust", "--var", "depth=2", "--async",
            "-vv", "-o", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(
            cli.command,
            Command::Run {
                protocol: "research".into(),
                vars: vec![("topic".into(), json!("rust")), ("depth".into(), json!(2))],
                run_async: true,
                agent: None,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["toolmesh", "health", "--no-config", "--log-file", "x.log"])
            .unwrap();
        assert!(cli.no_config);
        assert_eq!(cli.log_file, Some(PathBuf::from("x.log")));
        assert_eq!(cli.command, Command::Health);
    }

    #[test]
    fn test_resolve_requires_both_names() {
        assert!(Cli::try_parse_from(["toolmesh", "resolve", "planner"]).is_err());
        let cli = Cli::try_parse_from(["toolmesh", "resolve", "planner", "echo"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Resolve {
                agent: "planner".into(),
                tool: "echo".into()
            }
        );
    }
}
