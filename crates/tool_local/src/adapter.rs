//! Local command adapter

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use titan_common::{
    sanitize_output, CommandInvocation, CommandRunner, InvokeOptions, ScanTarget, TitanError,
    TitanResult, ToolAdapter, ToolId,
};
use titan_target_resolver::TargetResolver;

const TARGET_PLACEHOLDER: &str = "{target}";

/// Which representation of the target a tool expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetForm {
    /// Full URL as supplied.
    Url,
    /// Bare hostname.
    Host,
    /// Host resolved to an IP address.
    ResolvedIp,
    /// `host:port`.
    HostPort(u16),
}

/// What an empty output means for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Liveness-dependent tools: nothing back means the scan failed.
    Fail(&'static str),
    /// Discovery tools: nothing back is a valid "nothing found".
    Benign(&'static str),
}

/// Static description of one local tool.
#[derive(Debug, Clone)]
pub struct LocalToolSpec {
    pub tool: ToolId,
    pub program: &'static str,
    /// Arguments; `{target}` is replaced by the rendered target.
    pub args: &'static [&'static str],
    /// Optional stdin template, same placeholder.
    pub stdin: Option<&'static str>,
    pub target_form: TargetForm,
    /// Run under `sudo -n`.
    pub privileged: bool,
    pub empty_policy: EmptyPolicy,
    /// Output substring meaning "no hosts reachable", with the message to report.
    pub unreachable: Option<(&'static str, &'static str)>,
}

/// Adapter running one catalog tool through a [`CommandRunner`].
pub struct LocalCommandAdapter {
    spec: LocalToolSpec,
    runner: Arc<dyn CommandRunner>,
    use_sudo: bool,
}

impl LocalCommandAdapter {
    pub fn new(spec: LocalToolSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            spec,
            runner,
            use_sudo: true,
        }
    }

    /// Disable the `sudo -n` prefix for privileged tools (e.g. when already root).
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn spec(&self) -> &LocalToolSpec {
        &self.spec
    }

    async fn render_target(&self, target: &ScanTarget) -> TitanResult<String> {
        Ok(match self.spec.target_form {
            TargetForm::Url => target.as_str().to_string(),
            TargetForm::Host => target.host().to_string(),
            TargetForm::ResolvedIp => TargetResolver::resolve_host(target).await?.to_string(),
            TargetForm::HostPort(port) => target.host_port(port),
        })
    }

    /// Build the command line for an already rendered target.
    pub fn command_for(&self, rendered_target: &str) -> CommandInvocation {
        let fill = |template: &str| template.replace(TARGET_PLACEHOLDER, rendered_target);

        let mut command = if self.spec.privileged && self.use_sudo {
            CommandInvocation::new("sudo").arg("-n").arg(self.spec.program)
        } else {
            CommandInvocation::new(self.spec.program)
        };
        for arg in self.spec.args {
            command = command.arg(fill(arg));
        }
        if let Some(stdin) = self.spec.stdin {
            command = command.with_stdin(fill(stdin));
        }
        command
    }
}

#[async_trait]
impl ToolAdapter for LocalCommandAdapter {
    fn tool(&self) -> ToolId {
        self.spec.tool
    }

    #[instrument(skip(self, target, options), fields(tool = %self.spec.tool, scan_target = %target))]
    async fn invoke(&self, target: &ScanTarget, options: &InvokeOptions) -> TitanResult<String> {
        let rendered = self.render_target(target).await?;
        let command = self.command_for(&rendered);
        debug!(%command, "running local tool");

        let output = self.runner.run(&command, options).await?;

        if output.trim().is_empty() {
            return match self.spec.empty_policy {
                EmptyPolicy::Fail(message) => Err(TitanError::EmptyResult(message.to_string())),
                EmptyPolicy::Benign(placeholder) => Ok(placeholder.to_string()),
            };
        }
        if let Some((marker, message)) = self.spec.unreachable {
            if output.contains(marker) {
                return Err(TitanError::EmptyResult(message.to_string()));
            }
        }

        Ok(sanitize_output(&output))
    }
}
