//! Aggregation & error policy for multi-tool runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use titan_common::{Finding, Insights, TitanError, TitanResult, ToolInvocationResult, ToolOutcome};

/// Combined result of a synchronous multi-tool run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub target: String,
    pub message: String,
    pub raw_output: String,
    pub findings: Vec<Finding>,
    pub summary: String,
    pub key_points: Vec<String>,
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Scan Store id, once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
}

impl AggregateReport {
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Metadata document stored next to the transcript.
    pub fn metadata(&self) -> Value {
        let mut metadata = json!({
            "findings": self.findings,
            "summary": self.summary,
            "keyPoints": self.key_points,
            "timestamp": self.timestamp.to_rfc3339(),
            "tools": self.tools,
        });
        if self.has_errors() {
            metadata["errors"] = json!(self.errors);
        }
        metadata
    }
}

/// Direct remote-mode result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZapReport {
    pub target: String,
    pub mode: String,
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

/// Folds per-tool results, in run order, into an [`AggregateReport`].
#[derive(Debug)]
pub struct AggregateBuilder {
    target: String,
    transcript: String,
    findings: Vec<Finding>,
    summaries: Vec<String>,
    key_points: Vec<String>,
    tools: Vec<String>,
    errors: Vec<String>,
}

impl AggregateBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            transcript: String::new(),
            findings: Vec::new(),
            summaries: Vec::new(),
            key_points: Vec::new(),
            tools: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record one tool. `insights` is only consulted for successes.
    pub fn push(&mut self, result: ToolInvocationResult, insights: Insights) {
        self.tools.push(result.tool.clone());
        match result.outcome {
            ToolOutcome::Output(output) => {
                self.transcript
                    .push_str(&format!("\n--- Output from {} ---\n{}\n", result.tool, output));
                self.findings.extend(insights.findings);
                if !insights.summary.trim().is_empty() {
                    self.summaries.push(insights.summary.trim().to_string());
                }
                self.key_points.extend(insights.key_points);
            }
            ToolOutcome::Failed(message) => {
                self.transcript
                    .push_str(&format!("\n--- Error from {} ---\n{}\n", result.tool, message));
                self.errors.push(format!("{}: {}", result.tool, message));
            }
        }
    }

    /// Apply the all-fail rule over the `requested` tool count.
    pub fn finish(self, requested: usize) -> TitanResult<AggregateReport> {
        if requested > 0 && self.errors.len() >= requested {
            return Err(TitanError::AllToolsFailed(self.errors));
        }
        let message = if self.errors.is_empty() {
            format!("Scans completed successfully for {}!", self.target)
        } else {
            format!("Scans completed with some errors for {}", self.target)
        };
        Ok(AggregateReport {
            target: self.target,
            message,
            raw_output: self.transcript,
            findings: self.findings,
            summary: self.summaries.join("\n"),
            key_points: self.key_points,
            tools: self.tools,
            errors: self.errors,
            timestamp: Utc::now(),
            record_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titan_common::Severity;

    fn insights(summary: &str, title: &str) -> Insights {
        Insights {
            findings: vec![Finding::new(title, Severity::High)],
            summary: summary.to_string(),
            key_points: vec![title.to_string()],
        }
    }

    #[test]
    fn partial_failure_keeps_successes() {
        let mut builder = AggregateBuilder::new("https://example.com");
        builder.push(
            ToolInvocationResult::failed("nikto", "Nikto scan produced no output"),
            Insights::default(),
        );
        builder.push(
            ToolInvocationResult::succeeded("nuclei", "[cve-2021-1] [http] [high] x".into()),
            insights("One high issue.", "cve-2021-1"),
        );

        let report = builder.finish(2).unwrap();
        assert_eq!(report.errors, vec!["nikto: Nikto scan produced no output"]);
        assert!(report.raw_output.contains("--- Error from nikto ---\nNikto scan produced no output"));
        assert!(report.raw_output.contains("--- Output from nuclei ---"));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.summary, "One high issue.");
        assert_eq!(report.message, "Scans completed with some errors for https://example.com");
        assert_eq!(report.metadata()["errors"][0], "nikto: Nikto scan produced no output");
    }

    #[test]
    fn all_failures_is_an_error_with_one_entry_per_tool() {
        let mut builder = AggregateBuilder::new("https://example.com");
        builder.push(ToolInvocationResult::failed("nikto", "a"), Insights::default());
        builder.push(ToolInvocationResult::failed("whatweb", "b"), Insights::default());

        match builder.finish(2) {
            Err(TitanError::AllToolsFailed(errors)) => {
                assert_eq!(errors, vec!["nikto: a", "whatweb: b"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn clean_run_has_no_errors_in_metadata() {
        let mut builder = AggregateBuilder::new("https://example.com");
        builder.push(
            ToolInvocationResult::succeeded("whatweb", "nginx".into()),
            insights("Tech stack identified.", "nginx"),
        );
        builder.push(
            ToolInvocationResult::succeeded("httpx", "200".into()),
            insights("Host is live.", "live"),
        );
        let report = builder.finish(2).unwrap();
        assert_eq!(report.summary, "Tech stack identified.\nHost is live.");
        assert_eq!(report.key_points, vec!["nginx", "live"]);
        assert!(report.metadata().get("errors").is_none());
        assert_eq!(report.metadata()["tools"], json!(["whatweb", "httpx"]));
    }
}
