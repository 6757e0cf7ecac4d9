#[cfg(feature = "cli")]
pub mod cli;
pub mod session_config;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use session_config::SessionConfig;
