//! Pattern-based finding extraction

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use titan_common::{Finding, InsightAnalyzer, Insights, Severity};

static NUCLEI_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\[(?P<template>[^\]]+)\]\s+\[(?P<proto>[^\]]+)\]\s+\[(?P<severity>critical|high|medium|low|info)\]\s+(?P<url>\S+)",
    )
    .unwrap()
});

static NMAP_STATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"State:\s+(?P<likely>LIKELY\s+)?VULNERABLE").unwrap());

static NIKTO_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\s+(?P<path>/\S*):\s+(?P<msg>.+)$").unwrap());

static CVE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bCVE-\d{4}-\d{4,7}\b").unwrap());

const MAX_KEY_POINTS: usize = 5;

/// Local, dependency-free Insight Analyzer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InsightAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, raw: &str) -> Result<Insights> {
        let findings = extract_findings(raw);
        let (summary, key_points) = summarize(&findings);
        Ok(Insights {
            findings,
            summary,
            key_points,
        })
    }
}

/// Pull every recognisable finding out of `raw`, deduplicated.
pub fn extract_findings(raw: &str) -> Vec<Finding> {
    let mut findings = zap_alerts(raw).unwrap_or_default();
    let lines: Vec<&str> = raw.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some(caps) = NUCLEI_LINE.captures(trimmed) {
            let severity = Severity::from_label(&caps["severity"]).unwrap_or(Severity::Info);
            findings.push(Finding::new(&caps["template"], severity).with_evidence(&caps["url"]));
            continue;
        }

        if let Some(caps) = NMAP_STATE.captures(trimmed) {
            let severity = if caps.name("likely").is_some() {
                Severity::Medium
            } else {
                Severity::High
            };
            let title = nmap_title(&lines[..i]).unwrap_or_else(|| "Vulnerable service".to_string());
            let mut finding = Finding::new(title, severity);
            if let Some(cve) = lines[i..].iter().take(4).find_map(|l| CVE_ID.find(l)) {
                finding = finding.with_reference(cve.as_str().to_uppercase());
            }
            findings.push(finding);
            continue;
        }

        if let Some(caps) = NIKTO_ITEM.captures(trimmed) {
            findings.push(Finding::new(caps["msg"].trim(), Severity::Low).with_evidence(&caps["path"]));
        }
    }

    // bare CVE ids not already attached to a finding
    let mut known: HashSet<String> = findings
        .iter()
        .flat_map(|f| [Some(&f.title), f.reference.as_ref(), f.evidence.as_ref()])
        .flatten()
        .flat_map(|s| CVE_ID.find_iter(s).map(|m| m.as_str().to_uppercase()).collect::<Vec<_>>())
        .collect();
    for line in &lines {
        for m in CVE_ID.find_iter(line) {
            let id = m.as_str().to_uppercase();
            if known.insert(id.clone()) {
                findings.push(
                    Finding::new(id.clone(), severity_hint(line))
                        .with_evidence(line.trim())
                        .with_reference(format!("https://nvd.nist.gov/vuln/detail/{}", id)),
                );
            }
        }
    }

    dedup(findings)
}

/// One-line summary plus the most severe distinct findings.
pub fn summarize(findings: &[Finding]) -> (String, Vec<String>) {
    if findings.is_empty() {
        return ("No notable issues identified.".to_string(), Vec::new());
    }

    let counts: Vec<String> = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ]
    .iter()
    .filter_map(|sev| {
        let n = findings.iter().filter(|f| f.severity == *sev).count();
        (n > 0).then(|| format!("{} {}", n, sev))
    })
    .collect();
    let summary = format!(
        "Identified {} potential issue(s): {}.",
        findings.len(),
        counts.join(", ")
    );

    let mut ranked: Vec<&Finding> = findings.iter().collect();
    ranked.sort_by_key(|f| f.severity);
    let mut seen = HashSet::new();
    let key_points = ranked
        .into_iter()
        .filter(|f| seen.insert(f.title.clone()))
        .take(MAX_KEY_POINTS)
        .map(|f| format!("[{}] {}", f.severity, f.title))
        .collect();

    (summary, key_points)
}

fn zap_alerts(raw: &str) -> Option<Vec<Finding>> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with('[') {
        return None;
    }
    let items: Vec<Value> = serde_json::from_str(trimmed).ok()?;
    let findings = items
        .iter()
        .filter_map(|item| {
            let title = item.get("alert").or_else(|| item.get("name"))?.as_str()?;
            let severity = item
                .get("risk")
                .and_then(Value::as_str)
                .and_then(Severity::from_label)
                .unwrap_or(Severity::Info);
            let mut finding = Finding::new(title, severity);
            if let Some(url) = item.get("url").and_then(Value::as_str) {
                finding = finding.with_evidence(url);
            }
            match item.get("cweid").and_then(Value::as_str) {
                Some(cwe) if cwe != "-1" && !cwe.is_empty() => {
                    finding = finding.with_reference(format!("CWE-{}", cwe));
                }
                _ => {}
            }
            Some(finding)
        })
        .collect();
    Some(findings)
}

/// Title of an NSE vulnerability block: nearest preceding descriptive line.
fn nmap_title(before: &[&str]) -> Option<String> {
    before
        .iter()
        .rev()
        .take(3)
        .map(|l| l.trim().trim_start_matches('|').trim_start_matches('_').trim())
        .find(|l| !l.is_empty() && !l.eq_ignore_ascii_case("VULNERABLE:") && !l.ends_with(':'))
        .map(str::to_string)
}

fn severity_hint(line: &str) -> Severity {
    let lower = line.to_ascii_lowercase();
    for (word, sev) in [
        ("critical", Severity::Critical),
        ("high", Severity::High),
        ("medium", Severity::Medium),
        ("low", Severity::Low),
    ] {
        if lower.contains(word) {
            return sev;
        }
    }
    Severity::Medium
}

fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert((f.title.clone(), f.evidence.clone())))
        .collect()
}
