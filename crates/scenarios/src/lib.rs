//! # Tutorial scenarios
//!
//! Builders and a harness for exercising the simulation service end to end:
//! a contract under test is simulated alongside an internal account, and the
//! streamed records are inspected by the tests in `tests/`.

pub mod error;
pub mod harness;
pub mod instructions;

pub use error::ScenarioError;
pub use harness::{params, TutorialHarness, INTERNAL_ACCOUNT, MAIN_ACCOUNT};
pub use instructions::{
    CreateAccount, HardSettlement, Instruction, PostingInstruction, PostingInstructionBatch,
    Settlement,
};
