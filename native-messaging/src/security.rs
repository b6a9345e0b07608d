//! Caller identification and allow-lists.
//!
//! Browsers tell a native host who is calling through its command line.
//! Chromium-based browsers pass the extension origin
//! (`chrome-extension://<id>/`) as the first argument; Firefox passes the
//! path to the host manifest followed by the extension id.

use crate::config::SecurityConfig;
use crate::error::{NativeMessagingError, NativeMessagingResult};

const CHROMIUM_ORIGIN_SCHEME: &str = "chrome-extension://";

/// The extension that started this host, as far as the browser told us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerInfo {
    /// Extension origin or id, if one was passed
    pub origin: Option<String>,
}

impl CallerInfo {
    /// Identify the caller from the host's command-line arguments
    /// (program name excluded).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let origin = match args {
            [first, ..] if first.as_ref().starts_with(CHROMIUM_ORIGIN_SCHEME) => {
                Some(first.as_ref().to_string())
            }
            [_manifest, extension_id, ..] if !extension_id.as_ref().is_empty() => {
                Some(extension_id.as_ref().to_string())
            }
            _ => None,
        };

        Self { origin }
    }
}

/// Enforces [`SecurityConfig`] allow-lists.
#[derive(Debug, Clone, Default)]
pub struct CallerPolicy {
    allowed_origins: Vec<String>,
    allowed_programs: Vec<String>,
}

impl CallerPolicy {
    /// Build a policy from configuration.
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            allowed_programs: config.allowed_programs.clone(),
        }
    }

    /// Check that `caller` may use this host.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if origins are restricted and the caller is
    /// unknown or not listed.
    pub fn check_caller(&self, caller: &CallerInfo) -> NativeMessagingResult<()> {
        if self.allowed_origins.is_empty() {
            return Ok(());
        }

        match &caller.origin {
            Some(origin) if self.allowed_origins.iter().any(|o| o == origin) => Ok(()),
            Some(origin) => Err(NativeMessagingError::forbidden(format!(
                "caller origin '{}' is not allowed",
                origin
            ))),
            None => Err(NativeMessagingError::forbidden(
                "caller origin is unknown and origins are restricted",
            )),
        }
    }

    /// Check that `program` may be launched.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if programs are restricted and `program` is not
    /// listed verbatim.
    pub fn check_program(&self, program: &str) -> NativeMessagingResult<()> {
        if self.allowed_programs.is_empty() || self.allowed_programs.iter().any(|p| p == program) {
            Ok(())
        } else {
            Err(NativeMessagingError::forbidden(format!(
                "program '{}' is not allowed",
                program
            )))
        }
    }
}
