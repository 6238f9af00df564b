//! Typed builders for the instruction bodies the scenarios submit.
//!
//! Each builder serializes to the same JSON document a caller would write by
//! hand; [`Instruction::at`] pins it to a point in simulated time.

use crate::error::ScenarioError;
use core_types::{SimulationInstruction, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    CreateAccount(CreateAccount),
    CreatePostingInstructionBatch(PostingInstructionBatch),
}

impl Instruction {
    pub fn at(&self, time: impl Into<Timestamp>) -> Result<SimulationInstruction, ScenarioError> {
        let body = serde_json::to_value(self)?;
        Ok(SimulationInstruction::from_value(time, body)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAccount {
    pub id: String,
    pub product_version_id: String,
    /// Sent whenever set, even if empty; accounts opened without parameters omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_param_vals: Option<BTreeMap<String, String>>,
}

impl CreateAccount {
    pub fn new(id: impl Into<String>, product_version_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_version_id: product_version_id.into(),
            instance_param_vals: None,
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.instance_param_vals = Some(params);
        self
    }
}

impl From<CreateAccount> for Instruction {
    fn from(account: CreateAccount) -> Self {
        Instruction::CreateAccount(account)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetAccount {
    pub account_id: String,
}

/// Funds moving between a customer account and an internal account in one step.
#[derive(Debug, Clone, Serialize)]
pub struct HardSettlement {
    pub amount: Decimal,
    pub denomination: String,
    pub target_account: TargetAccount,
    pub internal_account_id: String,
}

impl HardSettlement {
    pub fn new(
        amount: Decimal,
        denomination: impl Into<String>,
        account_id: impl Into<String>,
        internal_account_id: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            denomination: denomination.into(),
            target_account: TargetAccount {
                account_id: account_id.into(),
            },
            internal_account_id: internal_account_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// Money into the target account.
    InboundHardSettlement(HardSettlement),
    /// Money out of the target account.
    OutboundHardSettlement(HardSettlement),
}

#[derive(Debug, Clone, Serialize)]
pub struct PostingInstruction {
    #[serde(flatten)]
    pub settlement: Settlement,
    pub client_transaction_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pics: Vec<String>,
    pub instruction_details: BTreeMap<String, String>,
}

impl PostingInstruction {
    pub fn new(settlement: Settlement, client_transaction_id: impl Into<String>) -> Self {
        Self {
            settlement,
            client_transaction_id: client_transaction_id.into(),
            pics: Vec::new(),
            instruction_details: BTreeMap::new(),
        }
    }

    pub fn with_pics<I, S>(mut self, pics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pics = pics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.instruction_details
            .insert("description".to_string(), description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostingInstructionBatch {
    pub client_id: String,
    pub client_batch_id: String,
    pub posting_instructions: Vec<PostingInstruction>,
    pub batch_details: BTreeMap<String, String>,
    pub value_timestamp: Timestamp,
}

impl PostingInstructionBatch {
    pub fn new(
        client_id: impl Into<String>,
        client_batch_id: impl Into<String>,
        value_timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_batch_id: client_batch_id.into(),
            posting_instructions: Vec::new(),
            batch_details: BTreeMap::new(),
            value_timestamp: value_timestamp.into(),
        }
    }

    pub fn with_posting(mut self, posting: PostingInstruction) -> Self {
        self.posting_instructions.push(posting);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.batch_details
            .insert("description".to_string(), description.into());
        self
    }
}

impl From<PostingInstructionBatch> for Instruction {
    fn from(batch: PostingInstructionBatch) -> Self {
        Instruction::CreatePostingInstructionBatch(batch)
    }
}
