//! Engine configuration.
//!
//! Plain serde-deserializable structs with sensible defaults; every
//! section can be overridden independently. The policy switches here
//! (`CompletionConfig`, `DispatchConfig`) make deliberately ambiguous
//! behaviors explicit instead of baking one interpretation into the code.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the ticket engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub codes: CodeConfig,
    pub completion: CompletionConfig,
    pub dispatch: DispatchConfig,
    pub monitor: MonitorConfig,
}

/// General deployment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Name of this hall/deployment, used in logs
    pub hall_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            hall_name: "tellerq".to_string(),
        }
    }
}

/// Durable store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL; `sqlite::memory:` for ephemeral deployments
    pub database_url: String,
    /// Maximum pool connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

/// Ticket code formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Minimum digits in the numeric suffix; longer sequences are never truncated
    pub min_sequence_digits: usize,
}

impl Default for CodeConfig {
    fn default() -> Self {
        CodeConfig {
            min_sequence_digits: 3,
        }
    }
}

/// Policy for `complete_ticket`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Allow serving a WAITING ticket directly, skipping CALLED.
    /// When false such calls fail with an invalid-transition conflict.
    pub allow_direct_serve: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            allow_direct_serve: true,
        }
    }
}

/// Policy for `dispatch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Refuse to dispatch to a counter that already holds a CALLED ticket.
    /// Off by default: counters may hold several called tickets at once.
    pub exclusive_called: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            exclusive_called: false,
        }
    }
}

/// Background monitoring settings for the server wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between periodic status log lines; 0 disables the monitor task
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig { interval_secs: 10 }
    }
}
