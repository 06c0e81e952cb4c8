//! Orchestrator - job lifecycle, aggregate runs and direct remote scans

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use titan_common::{
    InsightAnalyzer, Insights, InvokeOptions, JobState, ProgressSnapshot, ScanJob, ScanRecord,
    ScanStore, ScanSummary, ScanTarget, TitanError, TitanResult, ToolAdapter, ToolId,
    ToolInvocationResult, ToolOutcome,
};
use titan_target_resolver::TargetResolver;
use titan_tool_zap::ZapMode;

use crate::aggregate::{AggregateBuilder, AggregateReport, ZapReport};
use crate::config::OrchestratorConfig;
use crate::progress::ProgressStore;
use crate::registry::ToolRegistry;

/// Coordinates scan jobs over the registered tool adapters.
///
/// Cheap to clone: every collaborator sits behind an `Arc`, and each async
/// job task holds its own clone.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    progress: Arc<ProgressStore>,
    analyzer: Arc<dyn InsightAnalyzer>,
    store: Arc<dyn ScanStore>,
    options: InvokeOptions,
}

impl Orchestrator {
    pub fn new(
        registry: ToolRegistry,
        progress: Arc<ProgressStore>,
        analyzer: Arc<dyn InsightAnalyzer>,
        store: Arc<dyn ScanStore>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            progress,
            analyzer,
            store,
            options: config.invoke_options(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn progress_store(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    /// Validate `target`, register a job and run it on a detached task.
    ///
    /// Returns as soon as the job is visible as `Starting(0)`. The tool is
    /// resolved inside the job, so an unknown tool still yields an id whose
    /// job ends in `Error`.
    #[instrument(skip(self, target), fields(scan_target = %target))]
    pub fn create_job(&self, tool: &str, target: &str) -> TitanResult<Uuid> {
        let target = TargetResolver::validate(target)?;
        let job = ScanJob::new(tool, target);
        let id = job.id;
        self.progress.create(id);
        info!(job_id = %id, "job created");

        let this = self.clone();
        tokio::spawn(async move { this.execute_job(job).await });
        Ok(id)
    }

    /// Latest snapshot for `id`; `None` is NotFound.
    pub fn progress(&self, id: Uuid) -> Option<ProgressSnapshot> {
        self.progress.read(id)
    }

    fn publish(&self, job: &ScanJob) {
        self.progress.update(job.id, job.snapshot());
    }

    fn advance(&self, job: &mut ScanJob, state: JobState, percent: u8, status: impl Into<String>) {
        if job.advance(state, percent, status) {
            self.publish(job);
        }
    }

    fn fail(&self, job: &mut ScanJob, message: String) {
        warn!(job_id = %job.id, tool = %job.tool, error = %message, "job failed");
        if job.fail(message) {
            self.publish(job);
            titan_telemetry::record_job_finished("error");
        }
    }

    async fn execute_job(&self, mut job: ScanJob) {
        self.advance(&mut job, JobState::Resolving, 10, "Resolving target");

        let (tool, adapter) = match self.registry.resolve(&job.tool) {
            Ok(found) => found,
            Err(e) => return self.fail(&mut job, e.to_string()),
        };

        self.advance(&mut job, JobState::Running, 10, format!("Running {}", tool));

        // the adapter runs on its own task so a panic still ends the job
        let target = job.target.clone();
        let options = self.options;
        let invocation = tokio::spawn(async move { adapter.invoke(&target, &options).await });
        let output = match invocation.await {
            Ok(Ok(output)) => {
                titan_telemetry::record_tool_invocation(tool.as_str(), true);
                output
            }
            Ok(Err(e)) => {
                titan_telemetry::record_tool_invocation(tool.as_str(), false);
                return self.fail(&mut job, e.to_string());
            }
            Err(e) => {
                titan_telemetry::record_tool_invocation(tool.as_str(), false);
                return self.fail(&mut job, format!("{} task aborted: {}", tool, e));
            }
        };

        self.advance(&mut job, JobState::Running, 70, "Analyzing output");
        let insights = self.analyze_or_empty(&output).await;
        self.advance(&mut job, JobState::Analyzing, 90, "Insight analysis");

        if job.complete(output, insights.findings) {
            self.publish(&job);
            titan_telemetry::record_job_finished("done");
            info!(job_id = %job.id, %tool, "job done");
        }
    }

    /// Analyzer failures degrade to empty insights; they never fail a scan.
    /// The analyzer runs on its own task, so a panic degrades the same way.
    async fn analyze_or_empty(&self, raw: &str) -> Insights {
        let analyzer = Arc::clone(&self.analyzer);
        let raw = raw.to_string();
        match tokio::spawn(async move { analyzer.analyze(&raw).await }).await {
            Ok(Ok(insights)) => insights,
            Ok(Err(e)) => {
                warn!(error = %e, "insight analysis failed, continuing without insights");
                Insights::default()
            }
            Err(e) => {
                warn!(error = %e, "insight analysis aborted, continuing without insights");
                Insights::default()
            }
        }
    }

    async fn invoke_tool(&self, name: &str, target: &ScanTarget) -> ToolInvocationResult {
        let (tool, adapter): (ToolId, Arc<dyn ToolAdapter>) = match self.registry.resolve(name) {
            Ok(found) => found,
            Err(e) => return ToolInvocationResult::failed(name, e.to_string()),
        };
        match adapter.invoke(target, &self.options).await {
            Ok(output) => {
                titan_telemetry::record_tool_invocation(tool.as_str(), true);
                ToolInvocationResult::succeeded(name, output)
            }
            Err(e) => {
                titan_telemetry::record_tool_invocation(tool.as_str(), false);
                warn!(%tool, error = %e, "tool failed");
                ToolInvocationResult::failed(name, e.to_string())
            }
        }
    }

    /// Run `tools` one after another against `target` and persist the combined result.
    #[instrument(skip(self, target, tools), fields(scan_target = %target, tools = tools.len()))]
    pub async fn run_aggregate(&self, target: &str, tools: &[String]) -> TitanResult<AggregateReport> {
        let target = TargetResolver::validate(target)?;
        if tools.is_empty() {
            return Err(TitanError::Validation(
                "Target URL and at least one tool are required".to_string(),
            ));
        }

        let mut builder = AggregateBuilder::new(target.as_str());
        for name in tools {
            let result = self.invoke_tool(name, &target).await;
            let insights = match &result.outcome {
                ToolOutcome::Output(output) => self.analyze_or_empty(output).await,
                ToolOutcome::Failed(_) => Insights::default(),
            };
            builder.push(result, insights);
        }

        let mut report = builder.finish(tools.len())?;
        let record_id = self
            .store
            .save(target.as_str(), &report.raw_output, &report.metadata())
            .await
            .map_err(|e| TitanError::Storage(e.to_string()))?;
        report.record_id = Some(record_id);

        info!(record_id, errors = report.errors.len(), "aggregate scan stored");
        Ok(report)
    }

    /// One ZAP scan, returning the raw result list.
    #[instrument(skip(self, target, mode), fields(scan_target = %target, %mode))]
    pub async fn run_zap(&self, target: &str, mode: ZapMode) -> TitanResult<ZapReport> {
        let target = TargetResolver::validate(target)?;
        let adapter = self
            .registry
            .zap_adapter(mode)
            .ok_or_else(|| TitanError::UnknownTool(mode.tool().to_string()))?;

        let results = match adapter.fetch(&target).await {
            Ok(results) => {
                titan_telemetry::record_tool_invocation(mode.tool().as_str(), true);
                results
            }
            Err(e) => {
                titan_telemetry::record_tool_invocation(mode.tool().as_str(), false);
                return Err(e);
            }
        };
        debug!(count = results.len(), "remote scan results");

        let insights = if mode == ZapMode::Active && !results.is_empty() {
            let rendered = serde_json::to_string_pretty(&results)
                .map_err(|e| TitanError::Remote(format!("cannot render ZAP results: {}", e)))?;
            Some(self.analyze_or_empty(&rendered).await)
        } else {
            None
        };

        Ok(ZapReport {
            target: target.as_str().to_string(),
            mode: mode.to_string(),
            results,
            insights,
        })
    }

    pub async fn history(&self, limit: u32) -> TitanResult<Vec<ScanSummary>> {
        self.store
            .list_history(limit)
            .await
            .map_err(|e| TitanError::Storage(e.to_string()))
    }

    pub async fn scan_record(&self, id: i64) -> TitanResult<Option<ScanRecord>> {
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| TitanError::Storage(e.to_string()))
    }
}
