//! Folds transcript JSONL records into [`SessionMetrics`].
//!
//! Records are the coding assistant's own wire format; we only read the
//! handful of fields the dashboard charts. Unparseable lines count toward
//! `line_count` and are otherwise skipped — the transcript is the client's
//! data, not ours to police.

use std::collections::BTreeMap;

use meta_store::SessionMetrics;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Default)]
pub struct MetricsFolder {
    line_count: i64,
    message_count: i64,
    tool_use_count: i64,
    tool_counts: BTreeMap<String, i64>,
    input_tokens: i64,
    output_tokens: i64,
    first_timestamp: Option<OffsetDateTime>,
    last_timestamp: Option<OffsetDateTime>,
    model: Option<String>,
}

impl MetricsFolder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn line_count(&self) -> i64 {
        self.line_count
    }

    /// Folds one raw transcript line.
    pub fn push_line(&mut self, line: &[u8]) {
        self.line_count += 1;

        let Ok(record) = serde_json::from_slice::<serde_json::Value>(line) else {
            return;
        };

        if matches!(
            record.get("type").and_then(|v| v.as_str()),
            Some("user" | "assistant")
        ) {
            self.message_count += 1;
        }

        if let Some(timestamp) = record
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
        {
            if self.first_timestamp.is_none() {
                self.first_timestamp = Some(timestamp);
            }
            self.last_timestamp = Some(timestamp);
        }

        let Some(message) = record.get("message") else {
            return;
        };

        if let Some(model) = message.get("model").and_then(|v| v.as_str()) {
            self.model = Some(model.to_owned());
        }

        if let Some(usage) = message.get("usage") {
            self.input_tokens += usage
                .get("input_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            self.output_tokens += usage
                .get("output_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
        }

        if let Some(content) = message.get("content").and_then(|v| v.as_array()) {
            for item in content {
                if item.get("type").and_then(|v| v.as_str()) == Some("tool_use") {
                    self.tool_use_count += 1;

                    let name = item
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    *self.tool_counts.entry(name.to_owned()).or_default() += 1;
                }
            }
        }
    }

    pub fn finish(self) -> SessionMetrics {
        let duration_seconds = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) if last > first => (last - first).as_seconds_f64(),
            _ => 0.0,
        };

        SessionMetrics {
            line_count: self.line_count,
            message_count: self.message_count,
            tool_use_count: self.tool_use_count,
            tool_counts: serde_json::to_value(&self.tool_counts)
                .unwrap_or(serde_json::Value::Null),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            duration_seconds,
            model: self.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(lines: &[&str]) -> SessionMetrics {
        let mut folder = MetricsFolder::new();
        for line in lines {
            folder.push_line(line.as_bytes());
        }
        folder.finish()
    }

    #[test]
    fn counts_messages_tokens_and_tools() {
        let metrics = fold(&[
            r#"{"type":"user","timestamp":"2026-07-01T10:00:00Z","message":{"role":"user","content":"hi"}}"#,
            r#"{"type":"assistant","timestamp":"2026-07-01T10:00:30Z","message":{"role":"assistant","model":"sagehorn-2","usage":{"input_tokens":100,"output_tokens":25},"content":[{"type":"tool_use","name":"Bash"},{"type":"text","text":"done"}]}}"#,
            r#"{"type":"assistant","timestamp":"2026-07-01T10:01:00Z","message":{"role":"assistant","model":"sagehorn-2","usage":{"input_tokens":40,"output_tokens":10},"content":[{"type":"tool_use","name":"Bash"},{"type":"tool_use","name":"Edit"}]}}"#,
        ]);

        assert_eq!(metrics.line_count, 3);
        assert_eq!(metrics.message_count, 3);
        assert_eq!(metrics.tool_use_count, 3);
        assert_eq!(metrics.input_tokens, 140);
        assert_eq!(metrics.output_tokens, 35);
        assert_eq!(metrics.duration_seconds, 60.0);
        assert_eq!(metrics.model.as_deref(), Some("sagehorn-2"));
        assert_eq!(
            metrics.tool_counts,
            serde_json::json!({"Bash": 2, "Edit": 1})
        );
    }

    #[test]
    fn junk_lines_count_but_contribute_nothing_else() {
        let metrics = fold(&["not json at all", r#"{"type":"summary"}"#]);

        assert_eq!(metrics.line_count, 2);
        assert_eq!(metrics.message_count, 0);
        assert_eq!(metrics.duration_seconds, 0.0);
        assert_eq!(metrics.model, None);
    }

    #[test]
    fn single_record_has_zero_duration() {
        let metrics = fold(&[
            r#"{"type":"user","timestamp":"2026-07-01T10:00:00Z","message":{"role":"user"}}"#,
        ]);
        assert_eq!(metrics.duration_seconds, 0.0);
    }
}
