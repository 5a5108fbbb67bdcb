//! Bridge configuration and the process-wide reference mode.

use core_types::{ParseModeError, ReferenceMode};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable selecting the reference mode (`direct` or `table`).
pub const MODE_ENV: &str = "BRIDGE_REFERENCE_MODE";

/// Environment variable toggling bridge diagnostics (`1`/`0`, `true`/`false`).
pub const DIAGNOSTICS_ENV: &str = "BRIDGE_DIAGNOSTICS";

static PROCESS_MODE: OnceCell<ReferenceMode> = OnceCell::new();

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Unrecognized reference mode
    #[error(transparent)]
    InvalidMode(#[from] ParseModeError),

    /// Unrecognized boolean flag value
    #[error("invalid value `{value}` for {name}")]
    InvalidFlag {
        /// Variable name
        name: &'static str,
        /// Rejected value
        value: String,
    },

    /// The process already runs in another mode
    #[error("reference mode already selected as `{selected}`, cannot switch to `{requested}`")]
    ModeAlreadySelected {
        /// Mode in effect
        selected: ReferenceMode,
        /// Mode asked for
        requested: ReferenceMode,
    },

    /// The process reference table pins objects on a different heap
    #[error("process reference table is bound to another managed heap")]
    TableHeapMismatch,
}

/// Runtime configuration for bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How bridges hold their targets
    pub mode: ReferenceMode,
    /// Track live/detached bridge counts (debug builds only)
    pub diagnostics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: ReferenceMode::default(),
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl BridgeConfig {
    /// Returns the configuration with `mode`.
    pub fn with_mode(mut self, mode: ReferenceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the configuration with diagnostics switched on or off.
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Reads [`MODE_ENV`] and [`DIAGNOSTICS_ENV`], defaulting unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(mode) = lookup(MODE_ENV) {
            config.mode = mode.parse()?;
        }
        if let Some(flag) = lookup(DIAGNOSTICS_ENV) {
            config.diagnostics = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        name: DIAGNOSTICS_ENV,
                        value: flag,
                    })
                }
            };
        }
        Ok(config)
    }
}

/// Fixes the reference mode for the rest of the process.
///
/// Selecting the mode already in effect succeeds; switching fails.
pub fn select_process_mode(mode: ReferenceMode) -> Result<ReferenceMode, ConfigError> {
    let selected = *PROCESS_MODE.get_or_init(|| mode);
    if selected != mode {
        return Err(ConfigError::ModeAlreadySelected {
            selected,
            requested: mode,
        });
    }
    log::debug!("process reference mode: {}", selected);
    Ok(selected)
}

/// Returns the process reference mode, reading [`MODE_ENV`] on first use.
pub fn process_mode() -> Result<ReferenceMode, ConfigError> {
    PROCESS_MODE
        .get_or_try_init(|| BridgeConfig::from_env().map(|config| config.mode))
        .copied()
}
