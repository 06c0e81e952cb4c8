//! Command lines for every local tool
//!
//! Adding a local tool means adding a `ToolId` variant and an entry here.

use titan_common::{ToolId, ToolKind};

use crate::adapter::{EmptyPolicy, LocalToolSpec, TargetForm};

const NMAP_NO_HOSTS: &str =
    "No hosts were found up during the scan. The target might be blocking our probes.";

/// Catalog entry for a local tool; `None` for remote-polled tools.
pub fn spec_for(tool: ToolId) -> Option<LocalToolSpec> {
    let spec = match tool {
        ToolId::NmapServiceDetect => LocalToolSpec {
            tool,
            program: "nmap",
            args: &["-Pn", "-sV", "-A", "-O", "{target}", "-T4", "--privileged"],
            stdin: None,
            target_form: TargetForm::ResolvedIp,
            privileged: true,
            empty_policy: EmptyPolicy::Fail(NMAP_NO_HOSTS),
            unreachable: Some(("0 hosts up", NMAP_NO_HOSTS)),
        },
        ToolId::NmapVulnScript => LocalToolSpec {
            tool,
            program: "nmap",
            args: &["-Pn", "-sV", "--script", "vuln", "{target}", "-T4", "--privileged"],
            stdin: None,
            target_form: TargetForm::ResolvedIp,
            privileged: true,
            empty_policy: EmptyPolicy::Fail(NMAP_NO_HOSTS),
            unreachable: Some(("0 hosts up", NMAP_NO_HOSTS)),
        },
        ToolId::Nikto => LocalToolSpec {
            tool,
            program: "nikto",
            args: &["-h", "{target}", "-Format", "txt", "-nointeractive", "-Tuning", "123bde"],
            stdin: None,
            target_form: TargetForm::Url,
            privileged: true,
            empty_policy: EmptyPolicy::Fail("Nikto scan produced no output"),
            unreachable: None,
        },
        ToolId::WhatWeb => LocalToolSpec {
            tool,
            program: "whatweb",
            args: &["-a", "3", "--no-errors", "{target}"],
            stdin: None,
            target_form: TargetForm::Url,
            privileged: true,
            empty_policy: EmptyPolicy::Fail("WhatWeb scan produced no output"),
            unreachable: None,
        },
        ToolId::Nuclei => LocalToolSpec {
            tool,
            program: "nuclei",
            args: &["-u", "{target}", "-severity", "low,medium,high,critical", "-silent", "-timeout", "5"],
            stdin: None,
            target_form: TargetForm::Url,
            privileged: true,
            empty_policy: EmptyPolicy::Benign("No vulnerabilities found by Nuclei"),
            unreachable: None,
        },
        ToolId::Amass => LocalToolSpec {
            tool,
            program: "amass",
            args: &["enum", "-passive", "-d", "{target}", "-timeout", "10"],
            stdin: None,
            target_form: TargetForm::Host,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No subdomains found by Amass"),
            unreachable: None,
        },
        ToolId::Httpx => LocalToolSpec {
            tool,
            program: "httpx",
            args: &["-title", "-tech-detect", "-status-code", "-content-length", "-timeout", "10"],
            stdin: Some("{target}\n"),
            target_form: TargetForm::Host,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No HTTP information found by httpx"),
            unreachable: None,
        },
        ToolId::Subfinder => LocalToolSpec {
            tool,
            program: "subfinder",
            args: &["-d", "{target}", "-silent", "-timeout", "10"],
            stdin: None,
            target_form: TargetForm::Host,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No subdomains found by Subfinder"),
            unreachable: None,
        },
        ToolId::Dnsx => LocalToolSpec {
            tool,
            program: "dnsx",
            args: &["-resp", "-a", "-aaaa", "-cname", "-mx", "-ns", "-txt", "-silent"],
            stdin: Some("{target}\n"),
            target_form: TargetForm::Host,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No DNS information found by dnsx"),
            unreachable: None,
        },
        ToolId::Naabu => LocalToolSpec {
            tool,
            program: "naabu",
            args: &["-host", "{target}", "-top-ports", "1000", "-silent", "-timeout", "10000"],
            stdin: None,
            target_form: TargetForm::Host,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No open ports found by naabu"),
            unreachable: None,
        },
        ToolId::Wappalyzer => LocalToolSpec {
            tool,
            program: "wappalyzer",
            args: &["{target}"],
            stdin: None,
            target_form: TargetForm::Url,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No technology stack detected by Wappalyzer"),
            unreachable: None,
        },
        ToolId::Testssl => LocalToolSpec {
            tool,
            program: "testssl.sh",
            args: &["--fast", "--parallel", "{target}"],
            stdin: None,
            target_form: TargetForm::HostPort(443),
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No SSL/TLS information found by testssl.sh"),
            unreachable: None,
        },
        ToolId::Feroxbuster => LocalToolSpec {
            tool,
            program: "feroxbuster",
            args: &[
                "-u",
                "{target}",
                "-t",
                "10",
                "-d",
                "2",
                "-w",
                "/usr/share/wordlists/dirb/common.txt",
                "--silent",
            ],
            stdin: None,
            target_form: TargetForm::Url,
            privileged: false,
            empty_policy: EmptyPolicy::Benign("No directories found by Feroxbuster"),
            unreachable: None,
        },
        ToolId::ZapSpider | ToolId::ZapActive => return None,
    };
    Some(spec)
}

/// All local tools in catalog order.
pub fn local_tools() -> impl Iterator<Item = LocalToolSpec> {
    ToolId::ALL
        .into_iter()
        .filter(|t| t.kind() == ToolKind::Local)
        .filter_map(spec_for)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_local_tool_has_an_entry() {
        for tool in ToolId::ALL {
            assert_eq!(spec_for(tool).is_some(), tool.kind() == ToolKind::Local, "{tool}");
        }
        assert_eq!(local_tools().count(), 13);
    }

    #[test]
    fn every_entry_mentions_the_target() {
        for spec in local_tools() {
            let in_args = spec.args.iter().any(|a| a.contains("{target}"));
            let in_stdin = spec.stdin.map(|s| s.contains("{target}")).unwrap_or(false);
            assert!(in_args || in_stdin, "{} never receives the target", spec.tool);
        }
    }

    #[test]
    fn liveness_tools_fail_on_empty() {
        for tool in [ToolId::NmapServiceDetect, ToolId::NmapVulnScript, ToolId::Nikto, ToolId::WhatWeb] {
            assert!(matches!(spec_for(tool).unwrap().empty_policy, EmptyPolicy::Fail(_)));
        }
        for tool in [ToolId::Nuclei, ToolId::Amass, ToolId::Subfinder, ToolId::Feroxbuster] {
            assert!(matches!(spec_for(tool).unwrap().empty_policy, EmptyPolicy::Benign(_)));
        }
    }
}
