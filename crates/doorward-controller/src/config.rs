//! Controller configuration
//!
//! Stored as TOML. Every field has a default, so a partial file (or no file
//! at all) yields a working controller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use doorward_core::{AccessPolicy, CredentialStore, PinSecret, Roster};
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ControllerError, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "DOORWARD_CONFIG";

/// Configuration file name under the config directory
const CONFIG_FILE_NAME: &str = "controller.toml";

/// Configuration directory under the platform config dir
const CONFIG_DIR_NAME: &str = "doorward";

/// PIN text from the configuration file, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct PinText(String);

impl PinText {
    pub fn new(pin: impl Into<String>) -> Self {
        Self(pin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_hashed(&self) -> bool {
        self.0.starts_with("$argon2")
    }
}

impl fmt::Debug for PinText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinText(<redacted>)")
    }
}

/// Door controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Primary PIN, plain digits or an Argon2 PHC string
    pub primary_pin: PinText,

    /// Emergency override PIN, plain digits or an Argon2 PHC string
    pub emergency_pin: PinText,

    /// Labels allowed through the door
    pub authorized: Vec<String>,

    /// Admin labels (also allowed through)
    pub admin: Vec<String>,

    /// Maximum match distance for a biometric accept
    pub acceptance_threshold: f64,

    /// Bad PINs in a row before lockout
    pub max_pin_tries: u32,

    /// Lockout length (seconds)
    pub lockout_secs: f64,

    /// Minimum spacing between attempt cycles (seconds)
    pub cooldown_secs: f64,

    /// Extra biometric attempts before PIN fallback
    pub biometric_retries: u32,

    /// Unlock actuator hold (seconds)
    pub unlock_secs: f64,

    /// CSV event log location
    pub event_log: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let policy = AccessPolicy::default();
        Self {
            primary_pin: PinText::new("1234"),
            emergency_pin: PinText::new("0000"),
            authorized: vec!["baher".into(), "seif".into(), "hamza".into()],
            admin: vec!["baher".into()],
            acceptance_threshold: policy.acceptance_threshold,
            max_pin_tries: policy.max_pin_tries,
            lockout_secs: policy.lockout_duration.as_secs_f64(),
            cooldown_secs: policy.cooldown.as_secs_f64(),
            biometric_retries: policy.biometric_retries,
            unlock_secs: policy.unlock_duration.as_secs_f64(),
            event_log: PathBuf::from("access_log.csv"),
        }
    }
}

impl ControllerConfig {
    /// Platform default location of the configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Explicit path, then `DOORWARD_CONFIG`, then the default location
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(Self::default_path)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Load the file at `path`, or write the defaults there if it is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!("Created default config at {:?}", path);
        Ok(config)
    }

    /// Load the file at `path`, or the defaults without touching disk
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        Ok(Self::default())
    }

    /// Timing and threshold parameters
    pub fn policy(&self) -> Result<AccessPolicy> {
        let policy = AccessPolicy {
            acceptance_threshold: self.acceptance_threshold,
            max_pin_tries: self.max_pin_tries,
            lockout_duration: seconds("lockout_secs", self.lockout_secs)?,
            cooldown: seconds("cooldown_secs", self.cooldown_secs)?,
            biometric_retries: self.biometric_retries,
            unlock_duration: seconds("unlock_secs", self.unlock_secs)?,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Build the immutable credential store for the orchestrator
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let roster = Roster::new(self.authorized.iter().cloned(), self.admin.iter().cloned());
        let store = CredentialStore::new(
            roster,
            PinSecret::parse(self.primary_pin.as_str())?,
            PinSecret::parse(self.emergency_pin.as_str())?,
            self.policy()?,
        )?;
        Ok(store)
    }

    /// Check that the configuration yields a usable controller
    pub fn validate(&self) -> Result<()> {
        self.credential_store().map(|_| ())
    }

    /// Copy safe to print: plain PINs are masked, hashes kept
    pub fn redacted(&self) -> Self {
        let mask = |pin: &PinText| {
            if pin.is_hashed() {
                pin.clone()
            } else {
                PinText::new("****")
            }
        };
        Self {
            primary_pin: mask(&self.primary_pin),
            emergency_pin: mask(&self.emergency_pin),
            ..self.clone()
        }
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ControllerError::ConfigParse(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, value
        ))
    })
}
