use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use titan_common::{
    Finding, InsightAnalyzer, Insights, InvokeOptions, JobState, ProgressSnapshot, ScanRecord,
    ScanStore, ScanSummary, ScanTarget, Severity, TitanError, TitanResult, ToolAdapter, ToolId,
};
use titan_orchestrator::{Orchestrator, OrchestratorConfig, ProgressEvent, ProgressStore, ToolRegistry};

/// Sleeps, then returns a fixed output or fails with a fixed message.
struct ScriptedAdapter {
    tool: ToolId,
    result: Result<String, String>,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    fn ok(tool: ToolId, output: &str) -> Self {
        Self::new(tool, Ok(output.to_string()))
    }

    fn failing(tool: ToolId, message: &str) -> Self {
        Self::new(tool, Err(message.to_string()))
    }

    fn new(tool: ToolId, result: Result<String, String>) -> Self {
        Self {
            tool,
            result,
            delay: Duration::from_millis(5),
            log: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn logging_to(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl ToolAdapter for ScriptedAdapter {
    fn tool(&self) -> ToolId {
        self.tool
    }

    async fn invoke(&self, _target: &ScanTarget, _options: &InvokeOptions) -> TitanResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("{}:start", self.tool));
        tokio::time::sleep(self.delay).await;
        self.log.lock().unwrap().push(format!("{}:end", self.tool));
        self.result.clone().map_err(TitanError::EmptyResult)
    }
}

/// One finding per non-empty input.
struct OneFindingAnalyzer;

#[async_trait]
impl InsightAnalyzer for OneFindingAnalyzer {
    async fn analyze(&self, raw: &str) -> anyhow::Result<Insights> {
        Ok(Insights {
            findings: vec![Finding::new(format!("seen {} bytes", raw.len()), Severity::Info)],
            summary: "Analyzed.".to_string(),
            key_points: vec!["looked".to_string()],
        })
    }
}

struct BrokenAnalyzer;

#[async_trait]
impl InsightAnalyzer for BrokenAnalyzer {
    async fn analyze(&self, _raw: &str) -> anyhow::Result<Insights> {
        anyhow::bail!("analyzer unavailable")
    }
}

struct PanickingAnalyzer;

#[async_trait]
impl InsightAnalyzer for PanickingAnalyzer {
    async fn analyze(&self, _raw: &str) -> anyhow::Result<Insights> {
        panic!("analyzer crashed")
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn save(&self, target: &str, raw_output: &str, metadata: &Value) -> anyhow::Result<i64> {
        let mut saved = self.saved.lock().unwrap();
        saved.push((target.to_string(), raw_output.to_string(), metadata.clone()));
        Ok(saved.len() as i64)
    }

    async fn list_history(&self, limit: u32) -> anyhow::Result<Vec<ScanSummary>> {
        let saved = self.saved.lock().unwrap();
        Ok(saved
            .iter()
            .enumerate()
            .rev()
            .take(limit as usize)
            .map(|(i, (target, _, _))| ScanSummary {
                id: i as i64 + 1,
                target: target.clone(),
                created_at: chrono::Utc::now(),
            })
            .collect())
    }

    async fn get_by_id(&self, _id: i64) -> anyhow::Result<Option<ScanRecord>> {
        Ok(None)
    }
}

fn orchestrator(
    registry: ToolRegistry,
    analyzer: Arc<dyn InsightAnalyzer>,
    store: Arc<MemoryStore>,
) -> Orchestrator {
    Orchestrator::new(
        registry,
        Arc::new(ProgressStore::default()),
        analyzer,
        store,
        &OrchestratorConfig::default(),
    )
}

/// Poll until terminal, returning every distinct snapshot seen.
async fn observe(orch: &Orchestrator, id: Uuid) -> Vec<ProgressSnapshot> {
    let mut seen: Vec<ProgressSnapshot> = Vec::new();
    for _ in 0..5_000 {
        let snap = orch.progress(id).expect("job disappeared");
        if seen.last() != Some(&snap) {
            seen.push(snap.clone());
        }
        if snap.is_terminal() {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("job {id} never finished: {seen:?}");
}

/// Every snapshot the store accepted for `id`, up to and including the terminal one.
async fn recorded(events: &mut broadcast::Receiver<ProgressEvent>, id: Uuid) -> Vec<ProgressSnapshot> {
    let mut seen = Vec::new();
    loop {
        let (job, snap) = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("job never finished")
            .unwrap();
        if job != id {
            continue;
        }
        let terminal = snap.is_terminal();
        seen.push(snap);
        if terminal {
            return seen;
        }
    }
}

#[tokio::test]
async fn job_is_starting_right_after_creation() {
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::Nikto, "+ /admin/: found").delayed(Duration::from_millis(50))));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), Arc::default());

    let id = orch.create_job("nikto", "https://example.com").unwrap();
    let snap = orch.progress(id).unwrap();
    assert_eq!(snap.state, JobState::Starting);
    assert_eq!(snap.percent, 0);
}

#[tokio::test]
async fn successful_job_passes_every_checkpoint_to_done() {
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::WhatWeb, "nginx 1.25").delayed(Duration::from_millis(30))));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), Arc::default());
    let mut events = orch.progress_store().subscribe();

    let id = orch.create_job("whatweb", "https://example.com").unwrap();
    let seen = recorded(&mut events, id).await;

    let steps: Vec<(JobState, u8, &str)> = seen
        .iter()
        .map(|s| (s.state, s.percent, s.status.as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![
            (JobState::Starting, 0, "Starting"),
            (JobState::Resolving, 10, "Resolving target"),
            (JobState::Running, 10, "Running whatweb"),
            (JobState::Running, 70, "Analyzing output"),
            (JobState::Analyzing, 90, "Insight analysis"),
            (JobState::Done, 100, "Done"),
        ]
    );

    let mut percents: Vec<u8> = seen.iter().map(|s| s.percent).collect();
    percents.dedup();
    assert_eq!(percents, vec![0, 10, 70, 90, 100]);

    let done = seen.last().unwrap();
    assert_eq!(done.output, "nginx 1.25");
    assert_eq!(done.findings.len(), 1);
    assert!(done.error.is_none());
    assert_eq!(orch.progress(id).as_ref(), Some(done));
}

#[tokio::test]
async fn adapter_failure_ends_in_error_without_output() {
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(ScriptedAdapter::failing(ToolId::Nikto, "Nikto scan produced no output")));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), Arc::default());

    let id = orch.create_job("nikto", "https://example.com").unwrap();
    let last = observe(&orch, id).await.pop().unwrap();

    assert_eq!(last.state, JobState::Error);
    assert_eq!(last.percent, 100);
    assert!(last.output.is_empty());
    assert_eq!(last.error.as_deref(), Some("Nikto scan produced no output"));
}

#[tokio::test]
async fn unknown_tool_ends_in_error() {
    let orch = orchestrator(ToolRegistry::empty(), Arc::new(OneFindingAnalyzer), Arc::default());

    let id = orch.create_job("sqlmap", "https://example.com").unwrap();
    let last = observe(&orch, id).await.pop().unwrap();

    assert_eq!(last.state, JobState::Error);
    assert_eq!(last.error.as_deref(), Some("Unknown tool selected: sqlmap"));
}

#[tokio::test]
async fn analyzer_failure_still_completes_the_job() {
    let registry = ToolRegistry::empty().with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::Httpx, "200 OK")));
    let orch = orchestrator(registry, Arc::new(BrokenAnalyzer), Arc::default());

    let id = orch.create_job("httpx", "https://example.com").unwrap();
    let last = observe(&orch, id).await.pop().unwrap();

    assert_eq!(last.state, JobState::Done);
    assert_eq!(last.output, "200 OK");
    assert!(last.findings.is_empty());
}

#[tokio::test]
async fn analyzer_panic_still_completes_the_job() {
    let registry = ToolRegistry::empty().with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::Httpx, "200 OK")));
    let orch = orchestrator(registry, Arc::new(PanickingAnalyzer), Arc::default());

    let id = orch.create_job("httpx", "https://example.com").unwrap();
    let last = observe(&orch, id).await.pop().unwrap();

    assert_eq!(last.state, JobState::Done);
    assert_eq!(last.percent, 100);
    assert_eq!(last.output, "200 OK");
    assert!(last.findings.is_empty());
}

#[tokio::test]
async fn aggregate_survives_analyzer_panic() {
    let store = Arc::new(MemoryStore::default());
    let registry = ToolRegistry::empty().with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::WhatWeb, "nginx")));
    let orch = orchestrator(registry, Arc::new(PanickingAnalyzer), store.clone());

    let report = orch
        .run_aggregate("https://example.com", &["whatweb".to_string()])
        .await
        .unwrap();

    assert!(report.errors.is_empty());
    assert!(report.findings.is_empty());
    assert!(report.raw_output.contains("--- Output from whatweb ---\nnginx"));
    assert_eq!(store.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_job_id_is_not_found() {
    let orch = orchestrator(ToolRegistry::empty(), Arc::new(OneFindingAnalyzer), Arc::default());
    assert!(orch.progress(Uuid::new_v4()).is_none());
}

#[tokio::test]
async fn terminal_reads_are_stable() {
    let registry = ToolRegistry::empty().with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::Dnsx, "example.com A 93.184.216.34")));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), Arc::default());

    let id = orch.create_job("dnsx", "https://example.com").unwrap();
    let last = observe(&orch, id).await.pop().unwrap();
    for _ in 0..3 {
        assert_eq!(orch.progress(id).unwrap(), last);
    }
}

#[tokio::test]
async fn invalid_target_is_rejected_before_any_job() {
    let orch = orchestrator(ToolRegistry::empty(), Arc::new(OneFindingAnalyzer), Arc::default());
    for target in ["", "example", "http://127.0.0.1", "http://localhost:3000"] {
        let err = orch.create_job("nikto", target).unwrap_err();
        assert!(matches!(err, TitanError::Validation(_)), "{target}: {err}");
    }
    assert!(orch.progress_store().is_empty());
}

#[tokio::test]
async fn aggregate_partial_failure_is_stored_with_errors() {
    let store = Arc::new(MemoryStore::default());
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(ScriptedAdapter::failing(ToolId::Nikto, "Nikto scan produced no output")))
        .with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::WhatWeb, "nginx")));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), store.clone());

    let tools = vec!["nikto".to_string(), "whatweb".to_string()];
    let report = orch.run_aggregate("https://example.com", &tools).await.unwrap();

    assert_eq!(report.errors, vec!["nikto: Nikto scan produced no output"]);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.record_id, Some(1));
    assert!(report.raw_output.contains("--- Error from nikto ---"));
    assert!(report.raw_output.contains("--- Output from whatweb ---\nnginx"));

    let saved = store.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "https://example.com");
    assert_eq!(saved[0].2["errors"], json!(["nikto: Nikto scan produced no output"]));
}

#[tokio::test]
async fn aggregate_all_failed_reports_every_tool() {
    let store = Arc::new(MemoryStore::default());
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(ScriptedAdapter::failing(ToolId::Nikto, "no output")));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), store.clone());

    let tools = vec!["nikto".to_string(), "sqlmap".to_string()];
    match orch.run_aggregate("https://example.com", &tools).await {
        Err(TitanError::AllToolsFailed(errors)) => {
            assert_eq!(errors.len(), 2);
            assert_eq!(errors[0], "nikto: no output");
            assert_eq!(errors[1], "sqlmap: Unknown tool selected: sqlmap");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(store.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn aggregate_runs_tools_strictly_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ToolRegistry::empty()
        .with_adapter(Arc::new(
            ScriptedAdapter::ok(ToolId::Subfinder, "a.example.com")
                .delayed(Duration::from_millis(20))
                .logging_to(log.clone()),
        ))
        .with_adapter(Arc::new(
            ScriptedAdapter::ok(ToolId::Amass, "b.example.com").logging_to(log.clone()),
        ));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), Arc::default());

    let tools = vec!["subfinder".to_string(), "amass".to_string()];
    orch.run_aggregate("https://example.com", &tools).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["subfinder:start", "subfinder:end", "amass:start", "amass:end"]
    );
}

#[tokio::test]
async fn aggregate_requires_tools() {
    let orch = orchestrator(ToolRegistry::empty(), Arc::new(OneFindingAnalyzer), Arc::default());
    let err = orch.run_aggregate("https://example.com", &[]).await.unwrap_err();
    assert!(matches!(err, TitanError::Validation(_)));
}

#[tokio::test]
async fn history_passes_through_to_the_store() {
    let store = Arc::new(MemoryStore::default());
    let registry = ToolRegistry::empty().with_adapter(Arc::new(ScriptedAdapter::ok(ToolId::Naabu, "443/tcp")));
    let orch = orchestrator(registry, Arc::new(OneFindingAnalyzer), store);

    orch.run_aggregate("https://example.com", &["naabu".to_string()]).await.unwrap();
    orch.run_aggregate("https://example.org", &["naabu".to_string()]).await.unwrap();

    let history = orch.history(1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].target, "https://example.org");
    assert!(orch.scan_record(99).await.unwrap().is_none());
}
