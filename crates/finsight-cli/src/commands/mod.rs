//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, transaction loading, JSON output) and `config`
//! - `insights` - Ranked insights across every engine
//! - `reports` - Single-engine reports (patterns, anomalies, forecast, budget)
//! - `serve` - Web server command

pub mod core;
pub mod insights;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use insights::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
