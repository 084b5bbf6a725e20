//! ToolExecutor implementation backed by ToolRegistry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use brain_core::{ToolContext, ToolDefinition, ToolExecutor, ToolRequest, ToolResult};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::ToolRegistry;

/// Default per-call timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Which tools may run and for how long.
#[derive(Debug, Clone, Default)]
pub struct ToolPolicy {
    /// When set, only these tools are advertised and executed.
    pub allowlist: Option<HashSet<String>>,
    pub timeout: Option<Duration>,
}

impl ToolPolicy {
    /// Policy from the environment.
    ///
    /// - `AGENT_TOOL_TIMEOUT_SECS` - per-call timeout (default: 30, `0` disables)
    pub fn from_env() -> Self {
        let secs = std::env::var("AGENT_TOOL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOOL_TIMEOUT.as_secs());

        let policy = Self::default();
        if secs == 0 {
            policy
        } else {
            policy.with_timeout(Duration::from_secs(secs))
        }
    }

    pub fn allow_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowlist = self.allowlist.get_or_insert_with(HashSet::new);
        for tool in tools {
            allowlist.insert(tool.into());
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn is_allowed(&self, tool: &str) -> bool {
        self.allowlist
            .as_ref()
            .map_or(true, |allowlist| allowlist.contains(tool))
    }
}

/// Exposes a [`ToolRegistry`] to the agent loop.
///
/// Every failure, from a policy block to a storage error, is returned as an
/// unsuccessful [`ToolResult`].
pub struct RegistryToolExecutor {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
}

impl RegistryToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_policy(registry, ToolPolicy::default())
    }

    pub fn with_policy(registry: ToolRegistry, policy: ToolPolicy) -> Self {
        Self::from_shared(Arc::new(registry), policy)
    }

    pub fn from_shared(registry: Arc<ToolRegistry>, policy: ToolPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    async fn run(&self, request: ToolRequest, context: &ToolContext) -> Result<ToolResult, ToolError> {
        if !self.policy.is_allowed(&request.name) {
            return Err(ToolError::NotAllowed(request.name));
        }

        let execute_future = self
            .registry
            .execute(&request.name, request.arguments, context);

        match self.policy.timeout {
            Some(timeout_duration) => timeout(timeout_duration, execute_future)
                .await
                .map_err(|_| ToolError::Timeout)?,
            None => execute_future.await,
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RegistryToolExecutor {
    async fn execute(&self, request: ToolRequest, context: &ToolContext) -> ToolResult {
        let name = request.name.clone();
        let call_id = request.id.clone();

        match self.run(request, context).await {
            Ok(result) => {
                info!(
                    tool = %name,
                    call_id = %call_id,
                    contact_id = context.contact.id,
                    success = result.success,
                    "Tool executed"
                );
                result
            }
            Err(error) => {
                warn!(
                    tool = %name,
                    call_id = %call_id,
                    contact_id = context.contact.id,
                    "Tool failed: {}",
                    error
                );
                error.into_result()
            }
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .definitions()
            .into_iter()
            .filter(|definition| self.policy.is_allowed(&definition.function.name))
            .collect()
    }
}
