use api_client::error::SimulationFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] api_client::error::Fault),

    #[error("Invalid scenario input: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("No contract_path configured (VAULT_CONTRACT_PATH)")]
    MissingContract,

    #[error("Failed to serialize instruction: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Simulation(#[from] SimulationFailure),
}
