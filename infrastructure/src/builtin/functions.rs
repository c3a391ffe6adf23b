//! Built-in function implementations

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::time::Duration;
use toolmesh_application::LocalFunction;
use toolmesh_domain::ToolError;

pub const ECHO: &str = "echo";
pub const CURRENT_TIME: &str = "current_time";
pub const SLEEP: &str = "sleep";

/// Longest pause `sleep` accepts.
pub const MAX_SLEEP_MS: u64 = 60_000;

/// Returns its arguments unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

#[async_trait]
impl LocalFunction for Echo {
    fn name(&self) -> &str {
        ECHO
    }

    fn description(&self) -> &str {
        "Return the arguments unchanged"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "additionalProperties": true})
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        Ok(arguments)
    }
}

/// Current UTC time as RFC 3339
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTime;

#[async_trait]
impl LocalFunction for CurrentTime {
    fn name(&self) -> &str {
        CURRENT_TIME
    }

    fn description(&self) -> &str {
        "Current UTC time as an RFC 3339 timestamp"
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        let now = Utc::now();
        Ok(json!({
            "utc": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            "unix_ms": now.timestamp_millis(),
        }))
    }
}

/// Pause for `ms` milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

#[async_trait]
impl LocalFunction for Sleep {
    fn name(&self) -> &str {
        SLEEP
    }

    fn description(&self) -> &str {
        "Pause for the given number of milliseconds (at most 60000)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"ms": {"type": "integer", "minimum": 0, "maximum": MAX_SLEEP_MS}},
            "required": ["ms"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let ms = arguments
            .get("ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ToolError::invalid_arguments(SLEEP, "'ms' must be a non-negative integer")
            })?;
        if ms > MAX_SLEEP_MS {
            return Err(ToolError::invalid_arguments(
                SLEEP,
                format!("'ms' must be at most {}", MAX_SLEEP_MS),
            ));
        }

        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({"slept_ms": ms}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_echo_returns_arguments() {
        let args = json!({"nested": {"n": 1}, "list": [true]});
        assert_eq!(Echo.call(args.clone()).await.unwrap(), args);
    }

    #[tokio::test]
    async fn test_current_time_is_rfc3339() {
        let value = CurrentTime.call(json!({})).await.unwrap();
        let utc = value["utc"].as_str().unwrap();
        assert!(utc.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(utc).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_bounds() {
        assert_eq!(Sleep.call(json!({"ms": 5})).await.unwrap(), json!({"slept_ms": 5}));

        let err = Sleep.call(json!({"ms": MAX_SLEEP_MS + 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(!err.is_retryable());

        let err = Sleep.call(json!({"ms": "soon"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
