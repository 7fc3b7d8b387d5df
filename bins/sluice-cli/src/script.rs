//! Replay of timed ledger operations from a JSON script.
//!
//! ```json
//! {
//!   "initial_height": 90,
//!   "steps": [
//!     { "height": 90,  "op": "deposit", "pool": 0, "account": "0xb0..", "amount": "100000000000000000000" },
//!     { "height": 101, "op": "claim", "pools": [0], "account": "0xb0.." }
//!   ]
//! }
//! ```
//!
//! Steps run in order; heights may repeat but never go back. Privileged
//! steps run with the owner's capability.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::error::LedgerError;
use sluice_core::traits::ManualHeight;
use sluice_core::types::{AccountId, Amount, AssetId, Height, PoolId, amount_serde};
use sluice_ledger::{DepositReceipt, Ledger, LedgerConfig, LedgerSnapshot, RewardPayout, WithdrawReceipt};
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
pub struct Script {
    #[serde(default)]
    pub initial_height: Height,
    pub steps: Vec<TimedStep>,
}

#[derive(Deserialize, Debug)]
pub struct TimedStep {
    pub height: Height,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        pool: PoolId,
        account: AccountId,
        #[serde(with = "amount_serde")]
        amount: Amount,
        #[serde(default)]
        referrer: Option<AccountId>,
    },
    Withdraw {
        pool: PoolId,
        account: AccountId,
        #[serde(with = "amount_serde")]
        amount: Amount,
        #[serde(default)]
        referrer: Option<AccountId>,
    },
    Claim {
        pools: Vec<PoolId>,
        account: AccountId,
    },
    EmergencyWithdraw {
        pool: PoolId,
        account: AccountId,
    },
    Unlock {
        account: AccountId,
    },
    ManualMint {
        account: AccountId,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    AddPool {
        asset: AssetId,
        weight: u64,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Claim { .. } => "claim",
            Step::EmergencyWithdraw { .. } => "emergency_withdraw",
            Step::Unlock { .. } => "unlock",
            Step::ManualMint { .. } => "manual_mint",
            Step::AddPool { .. } => "add_pool",
            Step::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid ledger config: {0}")]
    Config(#[source] LedgerError),
    #[error("step {index} goes back to height {height} (ledger at {current})")]
    HeightRegressed { index: usize, height: Height, current: Height },
    #[error("step {index} ({op}) failed at height {height}: {source}")]
    StepFailed {
        index: usize,
        op: &'static str,
        height: Height,
        #[source]
        source: LedgerError,
    },
    #[error("failed to encode result of step {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// What a successful step returned.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum StepResult {
    Deposit(DepositReceipt),
    Withdraw(WithdrawReceipt),
    Claims(Vec<PoolPayout>),
    Released(#[serde(with = "amount_serde")] Amount),
    PoolAdded(PoolId),
    Done,
}

#[derive(Serialize, Debug)]
pub struct PoolPayout {
    pub pool: PoolId,
    pub payout: RewardPayout,
}

/// Result of one step, in script order.
#[derive(Serialize, Debug)]
pub struct StepOutcome {
    pub index: usize,
    pub height: Height,
    pub op: &'static str,
    pub result: Value,
}

#[derive(Serialize, Debug)]
pub struct Report {
    pub outcomes: Vec<StepOutcome>,
    pub snapshot: LedgerSnapshot,
}

pub fn run(config: &LedgerConfig, script: &Script) -> Result<Report, ScriptError> {
    let height = Arc::new(ManualHeight::new(script.initial_height));
    let ledger = Ledger::new(config, Arc::clone(&height)).map_err(ScriptError::Config)?;
    let mut outcomes = Vec::with_capacity(script.steps.len());

    for (index, timed) in script.steps.iter().enumerate() {
        let current = ledger.current_height();
        if timed.height < current {
            return Err(ScriptError::HeightRegressed { index, height: timed.height, current });
        }
        height.advance_to(timed.height);
        let op = timed.step.name();
        let result = apply(&ledger, &timed.step).map_err(|source| ScriptError::StepFailed {
            index,
            op,
            height: timed.height,
            source,
        })?;
        let result = serde_json::to_value(result).map_err(|source| ScriptError::Encode { index, source })?;
        debug!(index, op, height = timed.height, "script: step applied");
        outcomes.push(StepOutcome { index, height: timed.height, op, result });
    }

    info!(steps = outcomes.len(), height = ledger.current_height(), "script: replay complete");
    Ok(Report { outcomes, snapshot: ledger.snapshot() })
}

fn apply(ledger: &Ledger<Arc<ManualHeight>>, step: &Step) -> Result<StepResult, LedgerError> {
    let result = match step {
        Step::Deposit { pool, account, amount, referrer } => {
            StepResult::Deposit(ledger.deposit(*pool, *account, *amount, *referrer)?)
        }
        Step::Withdraw { pool, account, amount, referrer } => {
            StepResult::Withdraw(ledger.withdraw(*pool, *account, *amount, *referrer)?)
        }
        Step::Claim { pools, account } => StepResult::Claims(
            ledger
                .claim_rewards(pools, *account)?
                .into_iter()
                .map(|(pool, payout)| PoolPayout { pool, payout })
                .collect(),
        ),
        Step::EmergencyWithdraw { pool, account } => StepResult::Withdraw(ledger.emergency_withdraw(*pool, *account)?),
        Step::Unlock { account } => StepResult::Released(ledger.unlock(*account)?),
        Step::ManualMint { account, amount } => {
            let cap = ledger.admin_cap(ledger.owner())?;
            ledger.manual_mint(&cap, *account, *amount)?;
            StepResult::Done
        }
        Step::AddPool { asset, weight } => {
            let cap = ledger.admin_cap(ledger.owner())?;
            StepResult::PoolAdded(ledger.add_pool(&cap, *asset, *weight)?)
        }
        Step::Transfer { from, to, amount } => {
            ledger.transfer(*from, *to, *amount)?;
            StepResult::Done
        }
    };
    Ok(result)
}
