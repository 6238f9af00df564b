use crate::error::Fault;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const VAULT_ERROR_CODE_KEY: &str = "vault_error_code";
const MESSAGE_KEY: &str = "message";
const ERROR_KEY: &str = "error";

/// One decoded line of a simulation response.
///
/// Records are kept as raw JSON so nothing the service sends is lost; the
/// typed view over the `result` field is available through
/// [`ResponseRecord::simulation_result`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseRecord(Value);

impl ResponseRecord {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The raw `result` object of the record, if there is one.
    pub fn result(&self) -> Option<&Value> {
        self.0.get("result")
    }

    /// Deserializes the `result` object. A record without one yields an empty result.
    pub fn simulation_result(&self) -> Result<SimulationResult, serde_json::Error> {
        match self.result() {
            Some(result) => SimulationResult::deserialize(result),
            None => Ok(SimulationResult::default()),
        }
    }
}

/// Parses one response line and classifies it.
///
/// A line carrying both `vault_error_code` and `message` is a fault raised
/// inside the simulated environment; a line carrying `error` is a
/// service-level rejection. Anything else is a result record.
pub fn decode_line(line: &[u8]) -> Result<ResponseRecord, Fault> {
    let value: Value = serde_json::from_slice(line).map_err(|source| Fault::Decode {
        line: String::from_utf8_lossy(line).into_owned(),
        source,
    })?;
    classify(value)
}

pub fn classify(value: Value) -> Result<ResponseRecord, Fault> {
    if let Value::Object(fields) = &value {
        if let (Some(code), Some(message)) = (fields.get(VAULT_ERROR_CODE_KEY), fields.get(MESSAGE_KEY)) {
            return Err(Fault::Service {
                code: text_of(code),
                message: text_of(message),
            });
        }
        if let Some(error) = fields.get(ERROR_KEY) {
            return Err(Fault::Protocol {
                message: text_of(error),
            });
        }
    }
    Ok(ResponseRecord(value))
}

// Strings are taken verbatim; any other JSON value is rendered as JSON text.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// --- Typed views over a record's `result` ---

/// The state of the simulated environment reported by one record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationResult {
    #[serde(default)]
    pub posting_instruction_batches: Vec<PostingInstructionBatch>,
    /// Balances keyed by account id.
    #[serde(default)]
    pub balances: BTreeMap<String, AccountBalances>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SimulationResult {
    /// Balances for one account, empty if the record does not mention it.
    pub fn account_balances(&self, account_id: &str) -> &[Balance] {
        self.balances
            .get(account_id)
            .map(|account| account.balances.as_slice())
            .unwrap_or(&[])
    }

    /// The first balance of an account held at the given address.
    pub fn balance_at(&self, account_id: &str, account_address: &str) -> Option<&Balance> {
        self.account_balances(account_id)
            .iter()
            .find(|balance| balance.account_address == account_address)
    }

    pub fn logs_contain(&self, needle: &str) -> bool {
        self.logs.iter().any(|line| line.contains(needle))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingInstructionBatch {
    #[serde(default)]
    pub client_batch_id: Option<String>,
    #[serde(default)]
    pub posting_instructions: Vec<PostingInstruction>,
    // Fields we do not model are kept as-is.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingInstruction {
    #[serde(default)]
    pub client_transaction_id: Option<String>,
    #[serde(default)]
    pub committed_postings: Vec<CommittedPosting>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommittedPosting {
    pub amount: Decimal,
    #[serde(default)]
    pub credit: Option<bool>,
    #[serde(default)]
    pub denomination: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub account_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountBalances {
    #[serde(default)]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub amount: Decimal,
    #[serde(default)]
    pub account_address: String,
    #[serde(default)]
    pub denomination: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub phase: String,
}
