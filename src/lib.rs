//! Jocket Chat - Main Library
//!
//! Re-exports the Jocket client library and hosts the shared utilities
//! used by the binaries.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners, settings)
//! - **jocket**: Jocket client library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use jocket_chat::bin_common::{load_config_from_env, ConfigType, JocketSettings};
//!
//! let settings = JocketSettings::load(load_config_from_env(ConfigType::Client))?;
//! ```

// Re-export workspace libraries for convenience
pub use jocket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod runner;
    pub mod settings;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use logging::init_tracing;
    pub use runner::{BinaryRunner, RunConfig};
    pub use settings::{JocketSettings, ReconnectSettings, SettingsError};
}
