//! # Replay Subcommand
//!
//! Runs a YAML scenario of deposits and withdrawals against a fresh pool and
//! reports the outcome of every step, the final pool snapshot, the
//! receipts still outstanding, and the hash-chained audit log.
//!
//! ```yaml
//! steps:
//!   - op: deposit
//!     label: r1
//!     depositor: alice
//!     amount: 100
//!   - op: withdraw
//!     label: r1
//!     caller: alice
//! ```
//!
//! Receipts live in the replay under their label. A withdrawal moves the
//! receipt out of that table and into the pool, so a second withdrawal of
//! the same label finds nothing to present. A rejected withdrawal puts the
//! receipt back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use custody_core::{AccountId, ContentDigest, ReceiptId};
use custody_ledger::{
    create_pool, Amount, AuditEvent, AuditLog, AuditRecord, AuditSink, Payout, PoolSnapshot,
    Receipt, TracingSink,
};

use crate::config::CliConfig;

/// Arguments for the `custody replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Write the JSON report here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// A scenario: operations applied in order to one fresh pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// The operations.
    pub steps: Vec<Step>,
}

/// One scenario operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Deposit `amount` as `depositor`; keep the receipt under `label`.
    Deposit {
        label: String,
        depositor: AccountId,
        amount: Amount,
    },
    /// Present the receipt stored under `label` as `caller`.
    Withdraw { label: String, caller: AccountId },
}

impl Step {
    fn label(&self) -> &str {
        match self {
            Self::Deposit { label, .. } | Self::Withdraw { label, .. } => label,
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Deposited {
        label: String,
        receipt_id: ReceiptId,
        sequence_number: u64,
        amount: Amount,
    },
    Withdrawn {
        label: String,
        payout: Payout,
    },
    Rejected {
        label: String,
        kind: String,
        message: String,
    },
}

impl StepOutcome {
    /// Whether the step was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    fn rejected(label: &str, kind: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            label: label.to_string(),
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

/// A receipt left unredeemed at the end of the replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingReceipt {
    pub label: String,
    pub receipt_id: ReceiptId,
    pub sequence_number: u64,
    pub owner: AccountId,
    pub amount: Amount,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    pub rejected_steps: usize,
    pub pool: PoolSnapshot,
    pub outstanding: Vec<OutstandingReceipt>,
    pub conservation_holds: bool,
    pub audit: Vec<AuditRecord>,
    pub audit_head: ContentDigest,
    pub audit_chain_valid: bool,
}

/// Apply `scenario` to a fresh pool.
pub fn replay(scenario: &Scenario, config: &CliConfig) -> ReplayReport {
    let mut pool = create_pool();
    let mut log = AuditLog::new(config.audit_capacity);
    let mut receipts: BTreeMap<String, Receipt> = BTreeMap::new();
    let mut steps = Vec::with_capacity(scenario.steps.len());

    tracing::info!(pool_id = %pool.id(), steps = scenario.steps.len(), "replaying scenario");

    {
        let emit_tracing = config.emit_tracing_events;
        let mut sink = |event: AuditEvent| {
            if emit_tracing {
                TracingSink.record(event.clone());
            }
            log.record(event);
        };

        for step in &scenario.steps {
            let outcome = match step {
                Step::Deposit {
                    label,
                    depositor,
                    amount,
                } => {
                    if receipts.contains_key(label) {
                        StepOutcome::rejected(
                            label,
                            "duplicate_label",
                            format!("label {label:?} already holds an outstanding receipt"),
                        )
                    } else {
                        match pool.deposit(*amount, depositor, &mut sink) {
                            Ok(receipt) => {
                                let outcome = StepOutcome::Deposited {
                                    label: label.clone(),
                                    receipt_id: receipt.id(),
                                    sequence_number: receipt.sequence_number(),
                                    amount: receipt.amount(),
                                };
                                receipts.insert(label.clone(), receipt);
                                outcome
                            }
                            Err(e) => StepOutcome::rejected(label, e.kind(), e.to_string()),
                        }
                    }
                }
                Step::Withdraw { label, caller } => match receipts.remove(label) {
                    None => StepOutcome::rejected(
                        label,
                        "unknown_receipt",
                        format!("no outstanding receipt under label {label:?}"),
                    ),
                    Some(receipt) => match pool.withdraw(receipt, caller, &mut sink) {
                        Ok(payout) => StepOutcome::Withdrawn {
                            label: label.clone(),
                            payout,
                        },
                        Err(e) => {
                            let outcome = StepOutcome::rejected(label, e.kind(), e.to_string());
                            receipts.insert(label.clone(), e.into_receipt());
                            outcome
                        }
                    },
                },
            };
            if outcome.is_rejected() {
                tracing::info!(label = step.label(), "step rejected");
            }
            steps.push(outcome);
        }
    }

    let conservation_holds = match pool.verify_conservation(receipts.values()) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "conservation check failed after replay");
            false
        }
    };
    let audit_chain_valid = match log.verify_chain() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "audit chain failed verification");
            false
        }
    };

    let outstanding = receipts
        .iter()
        .map(|(label, receipt)| OutstandingReceipt {
            label: label.clone(),
            receipt_id: receipt.id(),
            sequence_number: receipt.sequence_number(),
            owner: receipt.owner().clone(),
            amount: receipt.amount(),
        })
        .collect();

    let rejected_steps = steps.iter().filter(|s| s.is_rejected()).count();
    ReplayReport {
        steps,
        rejected_steps,
        pool: pool.snapshot(),
        outstanding,
        conservation_holds,
        audit_head: log.head(),
        audit: log.records().to_vec(),
        audit_chain_valid,
    }
}

/// Parse a scenario from YAML text.
pub fn parse_scenario(raw: &str) -> Result<Scenario> {
    serde_yaml::from_str(raw).context("failed to parse scenario")
}

/// Execute the replay subcommand.
///
/// Returns exit code: 0 if every step was accepted, 1 if any step was
/// rejected.
pub fn run_replay(args: &ReplayArgs, config: &CliConfig) -> Result<u8> {
    let scenario = load_scenario(&args.scenario)?;
    let report = replay(&scenario, config);
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json.as_bytes())
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    if !report.conservation_holds || !report.audit_chain_valid {
        anyhow::bail!("replay left the pool or audit log inconsistent");
    }
    Ok(if report.rejected_steps > 0 { 1 } else { 0 })
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    parse_scenario(&raw).with_context(|| format!("in {}", path.display()))
}
