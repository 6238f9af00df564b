pub mod error;
pub mod structs;
pub mod timestamp;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use structs::{SimulationInstruction, SimulationRequest, SmartContract};
pub use timestamp::Timestamp;
