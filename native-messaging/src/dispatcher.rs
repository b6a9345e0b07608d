//! Launch dispatch.
//!
//! Turns one decoded message into one process [`Invocation`].
//!
//! A launch message is a JSON object with two string fields:
//!
//! ```json
//! {"path": "/usr/bin/my app", "url": "https://example.com"}
//! ```
//!
//! In [`LaunchMode::Shell`] the fields become the command line
//! `/usr/bin/my\ app 'https://example.com'`, run by the configured shell.
//! Only spaces in the path are escaped and the URL is quoted verbatim, so a
//! single quote inside the URL breaks the command. [`LaunchMode::Direct`]
//! passes the raw path and URL as an argument vector and never involves a
//! shell.

use crate::config::{LaunchConfig, LaunchMode};
use crate::error::{NativeMessagingError, NativeMessagingResult};
use crate::launcher::Invocation;
use crate::security::CallerPolicy;

/// Program path and URL extracted from a launch message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Filesystem path of the program to start
    pub path: String,
    /// Argument handed to the program
    pub url: String,
}

impl LaunchRequest {
    /// Extract the request from a decoded message.
    ///
    /// # Errors
    ///
    /// * `MissingField` - `path` or `url` is absent (or the message is not
    ///   an object at all)
    /// * `InvalidField` - a field is present but not a string
    pub fn from_message(message: &serde_json::Value) -> NativeMessagingResult<Self> {
        let path = string_field(message, "path")?;
        let url = string_field(message, "url")?;
        Ok(Self { path, url })
    }

    /// The single shell command line for this request.
    pub fn command_line(&self) -> String {
        format!("{} {}", escape_path(&self.path), quote_url(&self.url))
    }
}

fn string_field(message: &serde_json::Value, field: &str) -> NativeMessagingResult<String> {
    match message.get(field) {
        None => Err(NativeMessagingError::missing_field(field)),
        Some(serde_json::Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(NativeMessagingError::invalid_field(
            field.to_string(),
            format!("expected a string, got {}", json_type_name(other)),
        )),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Escape every space in `path` with a backslash. Nothing else is touched.
pub fn escape_path(path: &str) -> String {
    path.replace(' ', "\\ ")
}

/// Wrap `url` in single quotes, verbatim.
pub fn quote_url(url: &str) -> String {
    format!("'{}'", url)
}

/// Builds invocations from launch messages.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    launch: LaunchConfig,
    policy: CallerPolicy,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(launch: LaunchConfig, policy: CallerPolicy) -> Self {
        Self { launch, policy }
    }

    /// Resolve `message` into the invocation that should be started.
    ///
    /// # Errors
    ///
    /// * `MissingField` / `InvalidField` - see [`LaunchRequest::from_message`]
    /// * `Forbidden` - the program is not on the allow-list
    pub fn dispatch(&self, message: &serde_json::Value) -> NativeMessagingResult<Invocation> {
        let request = LaunchRequest::from_message(message)?;
        self.policy.check_program(&request.path)?;

        let invocation = match self.launch.mode {
            LaunchMode::Direct => Invocation::new(request.path.clone(), vec![request.url.clone()]),
            LaunchMode::Shell => Invocation::new(
                self.launch.shell.clone(),
                vec![self.launch.shell_arg.clone(), request.command_line()],
            ),
        };

        tracing::debug!(
            mode = ?self.launch.mode,
            command_line = %request.command_line(),
            "Resolved launch request"
        );

        Ok(invocation)
    }
}
