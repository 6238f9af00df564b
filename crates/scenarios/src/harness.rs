use crate::error::ScenarioError;
use crate::instructions::{CreateAccount, Instruction};
use api_client::{ResponseRecord, SimulationApi, SimulationResult, VaultClient};
use configuration::VaultConfig;
use core_types::{SimulationInstruction, SimulationRequest, SmartContract, Timestamp};
use std::collections::BTreeMap;

/// The customer account every tutorial scenario opens.
pub const MAIN_ACCOUNT: &str = "main_account";
/// The bank's internal account on the other side of every posting.
pub const INTERNAL_ACCOUNT: &str = "1";

const PRODUCT_VERSION_ID: &str = "1";
const INTERNAL_PRODUCT_VERSION_ID: &str = "2";
const INTERNAL_CONTRACT_CODE: &str = "api = '3.6.0'";

/// Runs scenarios against the contract under test.
///
/// Every run submits two contracts (the one under test, and a no-op contract
/// for the internal account) and opens both accounts at the start of the
/// simulation before the scenario's own instructions.
pub struct TutorialHarness<C> {
    client: C,
    contract_code: String,
}

impl TutorialHarness<VaultClient> {
    /// Builds a harness from validated configuration. `contract_path` must be set.
    pub fn from_config(config: &VaultConfig) -> Result<Self, ScenarioError> {
        config.validate()?;
        let path = config
            .contract_path
            .as_ref()
            .ok_or(ScenarioError::MissingContract)?;
        let contract = SmartContract::from_file(PRODUCT_VERSION_ID, path)?;
        let client = VaultClient::from_config(config)?;
        Ok(Self::new(client, contract.code))
    }
}

impl<C: SimulationApi> TutorialHarness<C> {
    pub fn new(client: C, contract_code: impl Into<String>) -> Self {
        Self {
            client,
            contract_code: contract_code.into(),
        }
    }

    /// Assembles the full request for a scenario.
    pub fn request(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        template_params: BTreeMap<String, String>,
        instance_params: BTreeMap<String, String>,
        instructions: Vec<SimulationInstruction>,
    ) -> Result<SimulationRequest, ScenarioError> {
        let start = start.into();
        let contracts = [
            SmartContract::new(PRODUCT_VERSION_ID, self.contract_code.clone())
                .with_params(template_params),
            SmartContract::new(INTERNAL_PRODUCT_VERSION_ID, INTERNAL_CONTRACT_CODE),
        ];
        let accounts = [
            Instruction::from(
                CreateAccount::new(MAIN_ACCOUNT, PRODUCT_VERSION_ID).with_params(instance_params),
            )
            .at(start)?,
            Instruction::from(CreateAccount::new(INTERNAL_ACCOUNT, INTERNAL_PRODUCT_VERSION_ID))
                .at(start)?,
        ];

        Ok(SimulationRequest::new(start, end)
            .with_contracts(contracts)
            .with_instructions(accounts)
            .with_instructions(instructions))
    }

    /// Submits a scenario and returns the raw records.
    pub async fn run(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        template_params: BTreeMap<String, String>,
        instance_params: BTreeMap<String, String>,
        instructions: Vec<SimulationInstruction>,
    ) -> Result<Vec<ResponseRecord>, ScenarioError> {
        let request = self.request(start, end, template_params, instance_params, instructions)?;
        tracing::debug!(instructions = request.instructions.len(), "Running scenario.");
        Ok(self.client.simulate_contracts(&request).await?)
    }

    /// Submits a scenario and returns the typed `result` of every record.
    pub async fn run_results(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        template_params: BTreeMap<String, String>,
        instance_params: BTreeMap<String, String>,
        instructions: Vec<SimulationInstruction>,
    ) -> Result<Vec<SimulationResult>, ScenarioError> {
        let records = self
            .run(start, end, template_params, instance_params, instructions)
            .await?;
        records
            .iter()
            .map(|record| record.simulation_result().map_err(ScenarioError::from))
            .collect()
    }
}

/// Collects `(key, value)` pairs into a parameter map.
pub fn params<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
