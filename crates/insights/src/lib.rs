//! Insight extraction - structured findings from raw scan text
//!
//! `HeuristicAnalyzer` recognises the output shapes of the bundled tools:
//! - nuclei result lines (`[template] [proto] [severity] url`)
//! - nmap NSE `VULNERABLE` blocks
//! - nikto `+ /path: message` items
//! - ZAP alert lists (JSON)
//! - bare CVE identifiers anywhere else

mod heuristics;

pub use heuristics::{extract_findings, summarize, HeuristicAnalyzer};
