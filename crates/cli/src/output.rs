//! Output formatting for jobs, reports and stored scans

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

use titan_common::{Finding, ProgressSnapshot, ScanRecord, ScanSummary};
use titan_orchestrator::{AggregateReport, ZapReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "json" | "j" => Format::Json,
            _ => Format::Text,
        }
    }
}

fn json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// One progress line, as printed while following a job.
pub fn render_progress(snapshot: &ProgressSnapshot) -> String {
    format!("[{:>3}%] {:<9} {}", snapshot.percent, snapshot.state, snapshot.status)
}

fn render_findings(out: &mut String, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nFindings:");
    for finding in findings {
        let _ = write!(out, "  [{}] {}", finding.severity, finding.title);
        if let Some(evidence) = &finding.evidence {
            let _ = write!(out, " ({})", evidence);
        }
        out.push('\n');
    }
}

pub fn render_job(snapshot: &ProgressSnapshot, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(snapshot);
    }
    let mut out = String::new();
    match &snapshot.error {
        Some(error) => {
            let _ = writeln!(out, "Scan failed: {}", error);
        }
        None => {
            let _ = writeln!(out, "{}", snapshot.output.trim_end());
            render_findings(&mut out, &snapshot.findings);
        }
    }
    Ok(out)
}

pub fn render_report(report: &AggregateReport, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(report);
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.message);
    if let Some(id) = report.record_id {
        let _ = writeln!(out, "Stored as scan #{}", id);
    }
    let _ = writeln!(out, "{}", report.raw_output.trim_end());
    render_findings(&mut out, &report.findings);
    if !report.summary.is_empty() {
        let _ = writeln!(out, "\nSummary:\n{}", report.summary);
    }
    if report.has_errors() {
        let _ = writeln!(out, "\nErrors:");
        for error in &report.errors {
            let _ = writeln!(out, "  {}", error);
        }
    }
    Ok(out)
}

pub fn render_zap(report: &ZapReport, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(report);
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "ZAP {} scan of {}: {} result(s)",
        report.mode,
        report.target,
        report.results.len()
    );
    for item in &report.results {
        match item.as_str() {
            Some(url) => {
                let _ = writeln!(out, "  {}", url);
            }
            None => {
                let alert = item.get("alert").and_then(|v| v.as_str()).unwrap_or("?");
                let risk = item.get("risk").and_then(|v| v.as_str()).unwrap_or("?");
                let _ = writeln!(out, "  [{}] {}", risk, alert);
            }
        }
    }
    if let Some(insights) = &report.insights {
        let _ = writeln!(out, "\n{}", insights.summary);
    }
    Ok(out)
}

pub fn render_history(history: &[ScanSummary], format: Format) -> Result<String> {
    if format == Format::Json {
        return json(&history);
    }
    if history.is_empty() {
        return Ok("No stored scans.\n".to_string());
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<26} TARGET", "ID", "CREATED");
    for scan in history {
        let _ = writeln!(
            out,
            "{:<6} {:<26} {}",
            scan.id,
            scan.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            scan.target
        );
    }
    Ok(out)
}

pub fn render_record(record: &ScanRecord, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(record);
    }
    let mut out = String::new();
    let _ = writeln!(out, "Scan #{} of {} at {}", record.id, record.target, record.created_at.to_rfc3339());
    let _ = writeln!(out, "{}", record.raw_output.trim_end());
    if let Some(summary) = record.metadata.get("summary").and_then(|v| v.as_str()) {
        if !summary.is_empty() {
            let _ = writeln!(out, "\nSummary:\n{}", summary);
        }
    }
    Ok(out)
}
