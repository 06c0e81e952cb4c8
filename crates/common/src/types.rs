//! Core data types for the Titan orchestration engine
//!
//! Jobs, their externally visible snapshots, per-tool results and the
//! structured insights extracted from raw tool output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::error::TitanError;

/// Default wall-clock limit for one local tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);
/// Default cap on captured output per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// A validated scan target (http/https URL).
///
/// Only `titan-target-resolver` should construct these from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    raw: String,
    url: Url,
}

impl ScanTarget {
    #[must_use]
    pub fn new(raw: impl Into<String>, url: Url) -> Self {
        Self { raw: raw.into(), url }
    }

    /// The target as the caller supplied it (trimmed).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Hostname without scheme or port.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    #[must_use]
    pub fn host_port(&self, port: u16) -> String {
        format!("{}:{}", self.host(), port)
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How a tool's scanning capability is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Blocking external command on this host.
    Local,
    /// Asynchronous remote scanner polled over HTTP.
    RemotePolled,
}

/// Every scanning capability the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolId {
    #[serde(rename = "nmap-sV-A-O", alias = "nmap-sV")]
    NmapServiceDetect,
    #[serde(rename = "nmap-script-vuln", alias = "nmap-vuln")]
    NmapVulnScript,
    #[serde(rename = "nikto")]
    Nikto,
    #[serde(rename = "whatweb")]
    WhatWeb,
    #[serde(rename = "nuclei")]
    Nuclei,
    #[serde(rename = "amass")]
    Amass,
    #[serde(rename = "httpx")]
    Httpx,
    #[serde(rename = "subfinder")]
    Subfinder,
    #[serde(rename = "dnsx")]
    Dnsx,
    #[serde(rename = "naabu")]
    Naabu,
    #[serde(rename = "wappalyzer")]
    Wappalyzer,
    #[serde(rename = "testssl")]
    Testssl,
    #[serde(rename = "feroxbuster")]
    Feroxbuster,
    #[serde(rename = "zap-spider")]
    ZapSpider,
    #[serde(rename = "zap-active")]
    ZapActive,
}

impl ToolId {
    pub const ALL: [ToolId; 15] = [
        ToolId::NmapServiceDetect,
        ToolId::NmapVulnScript,
        ToolId::Nikto,
        ToolId::WhatWeb,
        ToolId::Nuclei,
        ToolId::Amass,
        ToolId::Httpx,
        ToolId::Subfinder,
        ToolId::Dnsx,
        ToolId::Naabu,
        ToolId::Wappalyzer,
        ToolId::Testssl,
        ToolId::Feroxbuster,
        ToolId::ZapSpider,
        ToolId::ZapActive,
    ];

    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ToolId::NmapServiceDetect => "nmap-sV-A-O",
            ToolId::NmapVulnScript => "nmap-script-vuln",
            ToolId::Nikto => "nikto",
            ToolId::WhatWeb => "whatweb",
            ToolId::Nuclei => "nuclei",
            ToolId::Amass => "amass",
            ToolId::Httpx => "httpx",
            ToolId::Subfinder => "subfinder",
            ToolId::Dnsx => "dnsx",
            ToolId::Naabu => "naabu",
            ToolId::Wappalyzer => "wappalyzer",
            ToolId::Testssl => "testssl",
            ToolId::Feroxbuster => "feroxbuster",
            ToolId::ZapSpider => "zap-spider",
            ToolId::ZapActive => "zap-active",
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        match self {
            ToolId::ZapSpider | ToolId::ZapActive => ToolKind::RemotePolled,
            _ => ToolKind::Local,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = TitanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // short aliases accepted by the job endpoint
        match s {
            "nmap-sV" => return Ok(ToolId::NmapServiceDetect),
            "nmap-vuln" => return Ok(ToolId::NmapVulnScript),
            _ => {}
        }
        ToolId::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TitanError::UnknownTool(s.to_string()))
    }
}

/// Lifecycle states of an async job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Starting,
    Resolving,
    Running,
    Analyzing,
    Done,
    Error,
}

impl JobState {
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Starting => "starting",
            JobState::Resolving => "resolving",
            JobState::Running => "running",
            JobState::Analyzing => "analyzing",
            JobState::Done => "done",
            JobState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Finding severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Parse labels used by scanners ("critical", "High", "informational", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" => Some(Severity::Info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured finding extracted from raw tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Finding {
    #[must_use]
    pub fn new<S: Into<String>>(title: S, severity: Severity) -> Self {
        Self {
            title: title.into(),
            severity,
            evidence: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn with_evidence<S: Into<String>>(mut self, evidence: S) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    #[must_use]
    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Output of the Insight Analyzer for one piece of raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub findings: Vec<Finding>,
    pub summary: String,
    pub key_points: Vec<String>,
}

impl Insights {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.summary.is_empty() && self.key_points.is_empty()
    }
}

/// Point-in-time, externally visible projection of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub state: JobState,
    pub status: String,
    pub output: String,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressSnapshot {
    /// The snapshot installed when a job is created.
    #[must_use]
    pub fn starting() -> Self {
        Self {
            percent: 0,
            state: JobState::Starting,
            status: "Starting".to_string(),
            output: String::new(),
            findings: Vec::new(),
            error: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A tracked asynchronous scan request.
///
/// Owned by the task executing it; everyone else sees [`ProgressSnapshot`]s.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: Uuid,
    /// Tool identifier as requested; may not name a known tool.
    pub tool: String,
    pub target: ScanTarget,
    pub created_at: DateTime<Utc>,
    state: JobState,
    percent: u8,
    status: String,
    output: String,
    findings: Vec<Finding>,
    error: Option<String>,
}

impl ScanJob {
    #[must_use]
    pub fn new(tool: impl Into<String>, target: ScanTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: tool.into(),
            target,
            created_at: Utc::now(),
            state: JobState::Starting,
            percent: 0,
            status: "Starting".to_string(),
            output: String::new(),
            findings: Vec::new(),
            error: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to a non-terminal state. Refused (returns false) when the job is
    /// terminal or the percentage would go backwards.
    pub fn advance(&mut self, state: JobState, percent: u8, status: impl Into<String>) -> bool {
        let percent = percent.min(100);
        if self.is_terminal() || state.is_terminal() || percent < self.percent {
            return false;
        }
        self.state = state;
        self.percent = percent;
        self.status = status.into();
        true
    }

    /// Explicit reset to `Starting(0)`; the only way progress moves backwards.
    pub fn reset(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Starting;
        self.percent = 0;
        self.status = "Starting".to_string();
        self.output.clear();
        self.findings.clear();
        self.error = None;
        true
    }

    pub fn complete(&mut self, output: String, findings: Vec<Finding>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Done;
        self.percent = 100;
        self.status = "Done".to_string();
        self.output = output;
        self.findings = findings;
        true
    }

    /// Terminate into `Error(100)`; no output is retained.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Error;
        self.percent = 100;
        self.status = "Error".to_string();
        self.output.clear();
        self.findings.clear();
        self.error = Some(message.into());
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.percent,
            state: self.state,
            status: self.status.clone(),
            output: self.output.clone(),
            findings: self.findings.clone(),
            error: self.error.clone(),
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum ToolOutcome {
    Output(String),
    Failed(String),
}

/// One tool's result, produced exactly once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub tool: String,
    pub outcome: ToolOutcome,
}

impl ToolInvocationResult {
    #[must_use]
    pub fn succeeded(tool: impl Into<String>, output: String) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Output(output),
        }
    }

    #[must_use]
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Failed(message.into()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Output(_))
    }
}

/// Limits applied to a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeOptions {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// A fully rendered external command. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandInvocation {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(input) = &self.stdin {
            write!(f, "<stdin:{}> ", input.trim())?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A persisted aggregate scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: i64,
    pub target: String,
    pub raw_output: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// History listing entry (no raw output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub id: i64,
    pub target: String,
    pub created_at: DateTime<Utc>,
}
