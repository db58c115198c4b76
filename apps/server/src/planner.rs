use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use hvac_controller::plan::{OptimizeRequest, Planner};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Runs an external planning pipeline once per request.
///
/// The request is written to the child's stdin as JSON; whatever the child
/// prints on stdout is the plan.
pub struct CommandPlanner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPlanner {
    /// `None` when `command` is empty.
    pub fn from_command(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    async fn run(&self, input: Vec<u8>) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start planner `{}`", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).await.context("Failed to send request to planner")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to collect planner output")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("planner exited with {}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Planner for CommandPlanner {
    async fn plan(&self, request: &OptimizeRequest) -> Result<String> {
        let input = serde_json::to_vec(request)?;
        info!(program = %self.program, "starting planner");
        match tokio::time::timeout(self.timeout, self.run(input)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(program = %self.program, timeout = ?self.timeout, "planner timed out");
                bail!("planner timed out after {:?}", self.timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OptimizeRequest {
        serde_json::from_value(serde_json::json!({
            "lat": 48.85,
            "lon": 2.35,
            "occupancy": vec![50.0; 24],
        }))
        .unwrap()
    }

    fn sh(script: &str, timeout: Duration) -> CommandPlanner {
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        CommandPlanner::from_command(&command, timeout).unwrap()
    }

    #[test]
    fn empty_command_disables_planner() {
        assert!(CommandPlanner::from_command(&[], Duration::from_secs(1)).is_none());
    }

    #[tokio::test]
    async fn child_receives_request_on_stdin() {
        // Echo stdin back: the plan is the request itself.
        let planner = sh("cat", Duration::from_secs(10));
        let out = planner.plan(&request()).await.unwrap();
        let echoed: OptimizeRequest = serde_json::from_str(&out).unwrap();
        assert_eq!(echoed, request());
    }

    #[tokio::test]
    async fn failing_child_reports_stderr() {
        let planner = sh("cat > /dev/null; echo 'no api key' >&2; exit 3", Duration::from_secs(10));
        let err = planner.plan(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no api key"), "{err}");
    }

    #[tokio::test]
    async fn slow_child_times_out() {
        let planner = sh("cat > /dev/null; sleep 5", Duration::from_millis(100));
        let err = planner.plan(&request()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }
}
