use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("The timestamp {0} is not timezone-aware")]
    InvalidTimestamp(String),

    #[error("Could not parse '{0}' as a timestamp")]
    UnparseableTimestamp(String),

    #[error("Instruction body must be a JSON object, got: {0}")]
    InvalidInstruction(String),

    #[error("Failed to read contract code from {path}: {source}")]
    ContractFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
