//! Launcher Native Messaging Crate
//!
//! Native messaging host that lets a browser extension start a local program
//! with a URL.
//!
//! # Architecture
//!
//! The host handles exactly one request per process, as browsers start a
//! fresh host for every `sendNativeMessage` call:
//!
//! 1. [`NativeMessagingProtocol`] reads one length-prefixed JSON frame
//! 2. [`CallerPolicy`] checks the calling extension
//! 3. [`Dispatcher`] turns `{"path", "url"}` into an [`Invocation`]
//! 4. a [`ProcessLauncher`] starts it and the host exits without waiting
//!
//! No response is written back; failures surface through the exit status
//! and the log on stderr.
//!
//! # Usage
//!
//! ```rust,no_run
//! use launcher_native_messaging::{run_host, CallerInfo, NativeMessagingConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let caller = CallerInfo::from_args(&std::env::args().skip(1).collect::<Vec<_>>());
//!     run_host(NativeMessagingConfig::default(), caller).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod dispatcher;
mod error;
mod launcher;
mod protocol;
mod security;

// Re-export public API
pub use config::{
    ByteOrder, LaunchConfig, LaunchMode, NativeMessagingConfig, SecurityConfig, MAX_GRACE_PERIOD_MS,
    MAX_INCOMING_LIMIT,
};
pub use dispatcher::{escape_path, quote_url, Dispatcher, LaunchRequest};
pub use error::{NativeMessagingError, NativeMessagingResult};
pub use launcher::{Invocation, ProcessLauncher, SystemLauncher};
pub use protocol::{decode_frame, encode_frame, NativeMessagingProtocol, LENGTH_PREFIX_LEN};
pub use security::{CallerInfo, CallerPolicy};

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// What a host run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// The browser closed the pipe without sending anything
    EndOfStream,
    /// The request was dispatched and this invocation was started
    Launched(Invocation),
}

/// Native messaging host for one launch request.
pub struct NativeMessagingHost<L> {
    caller: CallerInfo,
    policy: CallerPolicy,
    dispatcher: Dispatcher,
    launcher: L,
}

impl<L: ProcessLauncher> NativeMessagingHost<L> {
    /// Create a new host.
    pub fn new(config: &NativeMessagingConfig, caller: CallerInfo, launcher: L) -> Self {
        let policy = CallerPolicy::new(&config.security);
        let dispatcher = Dispatcher::new(config.launch.clone(), policy.clone());

        Self {
            caller,
            policy,
            dispatcher,
            launcher,
        }
    }

    /// Handle one decoded message: check the caller, dispatch, launch.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the caller check, dispatch or launch.
    pub async fn process_message(&self, message: &serde_json::Value) -> NativeMessagingResult<Invocation> {
        self.policy.check_caller(&self.caller)?;

        let invocation = self.dispatcher.dispatch(message)?;
        self.launcher.launch(&invocation).await?;

        Ok(invocation)
    }

    /// Read one message from `protocol` and act on it.
    ///
    /// # Errors
    ///
    /// Returns any framing, validation, policy or launch error. Nothing is
    /// launched when an error is returned before the launch step.
    pub async fn run<R, W>(
        &self,
        protocol: &mut NativeMessagingProtocol<R, W>,
    ) -> NativeMessagingResult<HostOutcome>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let run_id = uuid::Uuid::new_v4();

        let message = match protocol.read_message().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::info!(run_id = %run_id, "Input closed before any message, nothing to launch");
                return Ok(HostOutcome::EndOfStream);
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, code = e.error_code(), error = %e, "Failed to read message");
                return Err(e);
            }
        };

        tracing::debug!(
            run_id = %run_id,
            origin = ?self.caller.origin,
            "Processing launch request"
        );

        match self.process_message(&message).await {
            Ok(invocation) => {
                tracing::info!(
                    run_id = %run_id,
                    program = %invocation.program,
                    "Launch request dispatched"
                );
                Ok(HostOutcome::Launched(invocation))
            }
            Err(e) => {
                tracing::error!(
                    run_id = %run_id,
                    code = e.error_code(),
                    client_error = e.is_client_error(),
                    error = %e,
                    "Launch request failed"
                );
                Err(e)
            }
        }
    }
}

/// Run the host on stdin/stdout with the system launcher.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the request fails.
pub async fn run_host(config: NativeMessagingConfig, caller: CallerInfo) -> NativeMessagingResult<HostOutcome> {
    config.validate()?;

    let launcher = SystemLauncher::with_grace_period(Duration::from_millis(config.launch.grace_period_ms));
    let host = NativeMessagingHost::new(&config, caller, launcher);
    let mut protocol = NativeMessagingProtocol::stdio(&config);

    host.run(&mut protocol).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<Invocation>>,
    }

    #[async_trait]
    impl ProcessLauncher for RecordingLauncher {
        async fn launch(&self, invocation: &Invocation) -> NativeMessagingResult<()> {
            self.launched.lock().unwrap().push(invocation.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_process_message_launches_once() {
        let host = NativeMessagingHost::new(
            &NativeMessagingConfig::default(),
            CallerInfo::default(),
            RecordingLauncher::default(),
        );

        let invocation = host
            .process_message(&json!({"path": "/usr/bin/firefox", "url": "https://example.com"}))
            .await
            .unwrap();

        assert_eq!(invocation.program, "/usr/bin/firefox");
        assert_eq!(host.launcher.launched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_caller_launches_nothing() {
        let mut config = NativeMessagingConfig::default();
        config.security.allowed_origins = vec!["chrome-extension://allowed/".to_string()];
        let host = NativeMessagingHost::new(
            &config,
            CallerInfo::from_args(&["chrome-extension://other/"]),
            RecordingLauncher::default(),
        );

        let err = host
            .process_message(&json!({"path": "/usr/bin/firefox", "url": "x"}))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "FORBIDDEN");
        assert!(host.launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_host_rejects_invalid_config() {
        let config = NativeMessagingConfig {
            max_message_size: 0,
            ..NativeMessagingConfig::default()
        };

        let err = run_host(config, CallerInfo::default()).await.unwrap_err();
        assert!(matches!(err, NativeMessagingError::Config(_)));
    }
}
