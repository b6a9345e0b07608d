//! Configuration management for the launcher host.

use crate::error::{NativeMessagingError, NativeMessagingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest message browsers deliver from an extension to a host.
pub const MAX_INCOMING_LIMIT: usize = 64 * 1024 * 1024;

/// Longest grace period the launcher may block for.
pub const MAX_GRACE_PERIOD_MS: u64 = 10_000;

/// Configuration for the native messaging host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeMessagingConfig {
    /// Maximum frame payload size in bytes, applied in both directions
    pub max_message_size: usize,

    /// Byte order of the 4-byte length prefix
    pub byte_order: ByteOrder,

    /// Log level for the host
    pub log_level: String,

    /// How the program is started
    pub launch: LaunchConfig,

    /// Caller and program allow-lists
    pub security: SecurityConfig,
}

/// Byte order of the frame length prefix.
///
/// Browsers write the prefix in the platform's native order, which is
/// little-endian on every platform they ship on. The order is spelled out
/// here so both ends of the pipe agree on it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    Little,
    /// Network byte order
    Big,
    /// Whatever the host CPU uses
    Native,
}

/// How the dispatcher turns a launch request into a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Execute the program directly with the URL as its only argument
    #[default]
    Direct,
    /// Run `<escaped-path> '<url>'` through a shell interpreter
    Shell,
}

/// Process launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Launch mode
    pub mode: LaunchMode,

    /// Shell interpreter used in shell mode
    pub shell: String,

    /// Flag that makes the shell run the next argument as a command
    pub shell_arg: String,

    /// How long to watch the child for an immediate failure (0 = don't)
    pub grace_period_ms: u64,
}

/// Security configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed caller origins, e.g. `chrome-extension://<id>/` or a
    /// Firefox extension id (empty = allow all)
    pub allowed_origins: Vec<String>,

    /// Programs that may be launched, matched verbatim (empty = allow all)
    pub allowed_programs: Vec<String>,
}

impl Default for NativeMessagingConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1_048_576, // 1MB host-to-browser limit
            byte_order: ByteOrder::default(),
            log_level: "info".to_string(),
            launch: LaunchConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("/bin/sh", "-c")
        };

        Self {
            mode: LaunchMode::default(),
            shell: shell.to_string(),
            shell_arg: shell_arg.to_string(),
            grace_period_ms: 0,
        }
    }
}

impl NativeMessagingConfig {
    /// Load configuration from a file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file (JSON or TOML)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> NativeMessagingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NativeMessagingError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&content).map_err(|e| {
                NativeMessagingError::config(format!("Invalid TOML in {}: {}", path.display(), e))
            })?
        } else {
            // Default to JSON
            serde_json::from_str(&content).map_err(|e| {
                NativeMessagingError::config(format!("Invalid JSON in {}: {}", path.display(), e))
            })?
        };

        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> NativeMessagingResult<()> {
        let path = path.as_ref();

        let content = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::to_string_pretty(self)
                .map_err(|e| NativeMessagingError::config(format!("Failed to encode TOML: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)?
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> NativeMessagingResult<()> {
        if self.max_message_size == 0 {
            return Err(NativeMessagingError::config("max_message_size must be greater than 0"));
        }

        if self.max_message_size > MAX_INCOMING_LIMIT {
            return Err(NativeMessagingError::config(format!(
                "max_message_size cannot exceed {} bytes",
                MAX_INCOMING_LIMIT
            )));
        }

        if self.launch.mode == LaunchMode::Shell && self.launch.shell.trim().is_empty() {
            return Err(NativeMessagingError::config("launch.shell is required in shell mode"));
        }

        if self.launch.grace_period_ms > MAX_GRACE_PERIOD_MS {
            return Err(NativeMessagingError::config(format!(
                "launch.grace_period_ms cannot exceed {}",
                MAX_GRACE_PERIOD_MS
            )));
        }

        if self.security.allowed_programs.iter().any(|p| p.is_empty()) {
            return Err(NativeMessagingError::config(
                "security.allowed_programs cannot contain empty entries",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NativeMessagingConfig::default();
        assert_eq!(config.max_message_size, 1_048_576);
        assert_eq!(config.byte_order, ByteOrder::Little);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.launch.mode, LaunchMode::Direct);
        assert_eq!(config.launch.grace_period_ms, 0);
        assert!(config.security.allowed_origins.is_empty());
        assert!(config.security.allowed_programs.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_default_shell_is_posix() {
        let launch = LaunchConfig::default();
        assert_eq!(launch.shell, "/bin/sh");
        assert_eq!(launch.shell_arg, "-c");
    }

    #[test]
    fn test_config_validation() {
        let mut config = NativeMessagingConfig::default();
        assert!(config.validate().is_ok());

        config.max_message_size = 0;
        assert!(config.validate().is_err());

        config.max_message_size = MAX_INCOMING_LIMIT + 1;
        assert!(config.validate().is_err());

        config.max_message_size = 1_048_576;
        config.launch.grace_period_ms = MAX_GRACE_PERIOD_MS + 1;
        assert!(config.validate().is_err());

        config.launch.grace_period_ms = 250;
        config.launch.mode = LaunchMode::Shell;
        config.launch.shell = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        config.launch.shell = "/bin/sh".to_string();
        config.security.allowed_programs = vec![String::new()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_round_trip() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let json_path = dir.path().join("launcher.json");

        let mut config = NativeMessagingConfig::default();
        config.byte_order = ByteOrder::Big;
        config.security.allowed_programs = vec!["/usr/bin/firefox".to_string()];
        config.to_file(&json_path)?;

        let loaded = NativeMessagingConfig::from_file(&json_path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let toml_path = dir.path().join("launcher.toml");
        std::fs::write(
            &toml_path,
            r#"
byte_order = "native"

[launch]
mode = "shell"
grace_period_ms = 200

[security]
allowed_origins = ["chrome-extension://abcdefghijklmnop/"]
"#,
        )?;

        let config = NativeMessagingConfig::from_file(&toml_path)?;
        assert_eq!(config.byte_order, ByteOrder::Native);
        assert_eq!(config.launch.mode, LaunchMode::Shell);
        assert_eq!(config.launch.grace_period_ms, 200);
        assert_eq!(config.launch.shell, LaunchConfig::default().shell);
        assert_eq!(config.max_message_size, 1_048_576);
        assert_eq!(config.security.allowed_origins.len(), 1);
        assert!(config.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let err = NativeMessagingConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_garbage_json_is_config_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json")?;

        let err = NativeMessagingConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, NativeMessagingError::Config(_)));
        Ok(())
    }
}
