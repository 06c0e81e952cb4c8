//! Tool registry - the single place adapters are registered

use std::collections::HashMap;
use std::sync::Arc;

use titan_common::{CommandRunner, TitanError, TitanResult, ToolAdapter, ToolId};
use titan_tool_local::{catalog, LocalCommandAdapter};
use titan_tool_zap::{ZapAdapter, ZapClient, ZapMode};

#[derive(Clone, Default)]
pub struct ToolRegistry {
    adapters: HashMap<ToolId, Arc<dyn ToolAdapter>>,
    zap: HashMap<ToolId, Arc<ZapAdapter>>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every catalog tool on `runner`, plus both ZAP modes on `zap_client`.
    pub fn standard(runner: Arc<dyn CommandRunner>, zap_client: ZapClient, use_sudo: bool) -> Self {
        let mut registry = Self::empty();
        for spec in catalog::local_tools() {
            let adapter = LocalCommandAdapter::new(spec, runner.clone()).with_sudo(use_sudo);
            registry = registry.with_adapter(Arc::new(adapter));
        }
        registry
            .with_zap(ZapAdapter::new(zap_client.clone(), ZapMode::Spider))
            .with_zap(ZapAdapter::new(zap_client, ZapMode::Active))
    }

    /// Register (or replace) the adapter for its tool.
    pub fn with_adapter(mut self, adapter: Arc<dyn ToolAdapter>) -> Self {
        let tool = adapter.tool();
        self.zap.remove(&tool);
        self.adapters.insert(tool, adapter);
        self
    }

    /// Register a ZAP adapter; also reachable through the direct remote mode.
    pub fn with_zap(mut self, adapter: ZapAdapter) -> Self {
        let adapter = Arc::new(adapter);
        let tool = adapter.mode().tool();
        self.adapters.insert(tool, adapter.clone());
        self.zap.insert(tool, adapter);
        self
    }

    #[inline]
    pub fn get(&self, tool: ToolId) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(&tool).cloned()
    }

    /// Look up a tool by its wire id.
    pub fn resolve(&self, name: &str) -> TitanResult<(ToolId, Arc<dyn ToolAdapter>)> {
        let tool: ToolId = name.parse()?;
        self.get(tool)
            .map(|adapter| (tool, adapter))
            .ok_or_else(|| TitanError::UnknownTool(name.trim().to_string()))
    }

    pub fn zap_adapter(&self, mode: ZapMode) -> Option<Arc<ZapAdapter>> {
        self.zap.get(&mode.tool()).cloned()
    }

    /// Registered tools in catalog order.
    pub fn tools(&self) -> Vec<ToolId> {
        ToolId::ALL
            .iter()
            .copied()
            .filter(|t| self.adapters.contains_key(t))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
