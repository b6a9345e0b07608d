//! Process launching.
//!
//! The host never manages the program it starts: the child is spawned with
//! its stdio detached from the protocol pipes and then disowned. The only
//! thing the host may observe is an optional short grace period in which
//! an immediate failure (missing program, shell exit 127, ...) is reported.

use crate::error::{NativeMessagingError, NativeMessagingResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A fully resolved OS process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation.
    pub fn new<P: Into<String>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Starts processes for the host.
///
/// The system implementation is [`SystemLauncher`]; tests substitute a
/// recording implementation so nothing is actually executed.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start `invocation` without waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `LaunchFailure` if the process could not be started.
    async fn launch(&self, invocation: &Invocation) -> NativeMessagingResult<()>;
}

#[async_trait]
impl<L: ProcessLauncher + ?Sized> ProcessLauncher for std::sync::Arc<L> {
    async fn launch(&self, invocation: &Invocation) -> NativeMessagingResult<()> {
        (**self).launch(invocation).await
    }
}

/// Launches processes through the operating system.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    grace_period: Duration,
}

impl SystemLauncher {
    /// Pure fire-and-forget launcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch each child for `grace_period` and report it if it has already
    /// failed by then.
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation) -> NativeMessagingResult<()> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| NativeMessagingError::launch_failure(&invocation.program, e.to_string()))?;

        tracing::info!(
            program = %invocation.program,
            pid = ?child.id(),
            "Process started"
        );

        if self.grace_period.is_zero() {
            return Ok(());
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(Ok(status)) if !status.success() => Err(NativeMessagingError::launch_failure(
                &invocation.program,
                format!("exited immediately with {}", status),
            )),
            Ok(Ok(status)) => {
                tracing::debug!(program = %invocation.program, %status, "Process finished within grace period");
                Ok(())
            }
            Ok(Err(e)) => Err(NativeMessagingError::launch_failure(&invocation.program, e.to_string())),
            Err(_) => {
                tracing::debug!(program = %invocation.program, "Process still running after grace period");
                Ok(())
            }
        }
    }
}
