//! # custody-cli: Command-Line Driver for the Custody Ledger
//!
//! Provides the `custody` binary.
//!
//! ## Subcommands
//!
//! - `custody replay`: Apply a YAML scenario of deposits and withdrawals
//!   to a fresh pool and print a JSON report.
//! - `custody config`: Print the effective configuration as YAML.
//!
//! ```bash
//! custody replay scenarios/happy-path.yaml
//! custody -v --log-format json replay scenario.yaml --output report.json
//! CUSTODY_AUDIT_CAPACITY=64 custody config
//! ```

pub mod config;
pub mod replay;

/// Print the effective configuration as YAML.
///
/// Returns exit code 0.
pub fn run_config(config: &config::CliConfig) -> anyhow::Result<u8> {
    let yaml = serde_yaml::to_string(config)?;
    print!("{yaml}");
    Ok(0)
}
