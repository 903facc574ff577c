//! Command-backed load-test cases
//!
//! Each configured scenario becomes a catalog entry that spawns an external
//! program. The child is killed when the case context is done, so a hung
//! scenario cannot hold the suite past its deadline.

use crate::catalog::{CaseDescriptor, CaseRegistry};
use crate::config::{LoadTestConfig, ScenarioConfig};
use crate::context::ExecutionContext;
use crate::errors::{CaseError, CaseResult, LoadTestResult};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Catalog with one case per configured scenario, in configuration order
pub fn registry_from_config(cfg: &LoadTestConfig) -> LoadTestResult<CaseRegistry> {
    let mut registry = CaseRegistry::new();
    for scenario in &cfg.scenarios {
        registry.register(command_case(scenario.clone()))?;
    }
    Ok(registry)
}

/// Case that runs `scenario` as a child process
pub fn command_case(scenario: ScenarioConfig) -> CaseDescriptor {
    let scenario = Arc::new(scenario);
    let name = scenario.name.clone();

    CaseDescriptor::new(name, move |ctx: ExecutionContext, _cfg: Arc<LoadTestConfig>| {
        let scenario = scenario.clone();
        async move { run_command(&scenario, &ctx).await }
    })
}

async fn run_command(scenario: &ScenarioConfig, ctx: &ExecutionContext) -> CaseResult {
    let command_line = scenario.display_command();

    let mut command = Command::new(&scenario.command);
    command
        .args(&scenario.args)
        .envs(&scenario.env)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = &scenario.working_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| CaseError::SpawnFailed {
        command: command_line.clone(),
        reason: e.to_string(),
    })?;
    debug!(case = %scenario.name, command = %command_line, pid = ?child.id(), "Spawned scenario command");

    let waited = ctx.run(child.wait()).await;
    let status = match waited {
        Ok(status) => status.map_err(|e| CaseError::failed(format!("waiting on `{}`: {}", command_line, e)))?,
        Err(cancelled) => {
            warn!(case = %scenario.name, command = %command_line, "Killing scenario command after cancellation");
            if let Err(e) = child.kill().await {
                warn!(case = %scenario.name, error = %e, "Failed to kill scenario command");
            }
            return Err(cancelled);
        }
    };

    if !status.success() {
        return Err(CaseError::CommandExited {
            command: command_line,
            status: status.to_string(),
        });
    }

    Ok(())
}
