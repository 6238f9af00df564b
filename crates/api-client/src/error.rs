use crate::responses::ResponseRecord;
use thiserror::Error;

/// Everything that can end a simulation call.
#[derive(Error, Debug)]
pub enum Fault {
    #[error("Client configuration error: {0}")]
    Configuration(String),

    #[error("The timestamp {0} is not timezone-aware")]
    InvalidTimestamp(String),

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    /// A structured error raised inside the simulated environment.
    #[error("An exception was raised inside Vault:\nError Code: {code}\nMessage:\n{message}")]
    Service { code: String, message: String },

    /// An unstructured, service-level rejection.
    #[error("The service rejected the request: {message}")]
    Protocol { message: String },

    #[error("Failed to decode response line as JSON: {source}. Line: {line}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A failed call: the fault that ended it plus every record decoded before it,
/// in the order the server emitted them.
#[derive(Error, Debug)]
#[error("Simulation failed after {} record(s)", .partial.len())]
pub struct SimulationFailure {
    #[source]
    pub fault: Fault,
    pub partial: Vec<ResponseRecord>,
}

impl SimulationFailure {
    pub fn into_fault(self) -> Fault {
        self.fault
    }
}

impl From<Fault> for SimulationFailure {
    fn from(fault: Fault) -> Self {
        Self {
            fault,
            partial: Vec::new(),
        }
    }
}
