use crate::error::CoreError;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A versioned contract definition submitted alongside a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContract {
    pub smart_contract_version_id: String,
    /// Inline contract source.
    pub code: String,
    /// Template parameter values, omitted from the payload when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_contract_param_vals: Option<BTreeMap<String, String>>,
}

impl SmartContract {
    pub fn new(version_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            smart_contract_version_id: version_id.into(),
            code: code.into(),
            smart_contract_param_vals: None,
        }
    }

    /// Reads the contract source from a file on disk.
    pub fn from_file(version_id: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|source| CoreError::ContractFile {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = code.len(), "Loaded contract code.");
        Ok(Self::new(version_id, code))
    }

    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.smart_contract_param_vals = Some(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

/// One timed action for the simulated environment, e.g. creating an account
/// or posting a batch of ledger entries.
///
/// The body is kept opaque. Callers are responsible for ordering a sequence of
/// instructions by time; the order they are given in is the order they are sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationInstruction {
    time: Timestamp,
    instruction: Map<String, Value>,
}

impl SimulationInstruction {
    pub fn new(time: impl Into<Timestamp>, instruction: Map<String, Value>) -> Self {
        Self {
            time: time.into(),
            instruction,
        }
    }

    /// Like [`SimulationInstruction::new`], but accepts any JSON value and
    /// rejects bodies that are not objects.
    pub fn from_value(time: impl Into<Timestamp>, instruction: Value) -> Result<Self, CoreError> {
        match instruction {
            Value::Object(map) => Ok(Self::new(time, map)),
            other => Err(CoreError::InvalidInstruction(other.to_string())),
        }
    }

    pub fn time(&self) -> &Timestamp {
        &self.time
    }

    pub fn instruction(&self) -> &Map<String, Value> {
        &self.instruction
    }
}

/// Everything needed for one call to the simulation endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationRequest {
    #[serde(rename = "start_timestamp")]
    pub start: Timestamp,
    #[serde(rename = "end_timestamp")]
    pub end: Timestamp,
    pub smart_contracts: Vec<SmartContract>,
    #[serde(default)]
    pub instructions: Vec<SimulationInstruction>,
}

impl SimulationRequest {
    pub fn new(start: impl Into<Timestamp>, end: impl Into<Timestamp>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            smart_contracts: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn with_contracts(mut self, contracts: impl IntoIterator<Item = SmartContract>) -> Self {
        self.smart_contracts.extend(contracts);
        self
    }

    pub fn with_instructions(
        mut self,
        instructions: impl IntoIterator<Item = SimulationInstruction>,
    ) -> Self {
        self.instructions.extend(instructions);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_are_omitted_when_absent() {
        let contract = SmartContract::new("2", "api = '3.6.0'");
        let value = serde_json::to_value(&contract).unwrap();
        assert_eq!(
            value,
            json!({"smart_contract_version_id": "2", "code": "api = '3.6.0'"})
        );

        let with_params = contract.with_params([("denomination", "GBP")]);
        let value = serde_json::to_value(&with_params).unwrap();
        assert_eq!(value["smart_contract_param_vals"]["denomination"], "GBP");
    }

    #[test]
    fn instruction_body_must_be_an_object() {
        let ts: Timestamp = "2019-01-01T00:00:00Z".parse().unwrap();
        assert!(SimulationInstruction::from_value(ts, json!({"create_account": {}})).is_ok());
        assert!(matches!(
            SimulationInstruction::from_value(ts, json!(["create_account"])),
            Err(CoreError::InvalidInstruction(_))
        ));
    }

    #[test]
    fn request_document_deserializes() {
        let doc = json!({
            "start_timestamp": "2019-01-01T00:00:00+00:00",
            "end_timestamp": "2019-01-02T00:00:00+00:00",
            "smart_contracts": [
                {"smart_contract_version_id": "1", "code": "api = '3.6.0'"}
            ],
            "instructions": [
                {"time": "2019-01-01T00:00:00+00:00", "instruction": {"create_account": {"id": "1"}}}
            ]
        });
        let request: SimulationRequest = serde_json::from_value(doc).unwrap();
        assert_eq!(request.smart_contracts.len(), 1);
        assert_eq!(request.instructions.len(), 1);
        assert!(request.instructions[0].instruction().contains_key("create_account"));
    }

    #[test]
    fn naive_request_document_still_loads() {
        // Rejection happens when the request is built, not when it is read.
        let doc = json!({
            "start_timestamp": "2019-01-01T00:00:00",
            "end_timestamp": "2019-01-02T00:00:00+00:00",
            "smart_contracts": []
        });
        let request: SimulationRequest = serde_json::from_value(doc).unwrap();
        assert!(!request.start.is_timezone_aware());
        assert!(request.instructions.is_empty());
    }
}
