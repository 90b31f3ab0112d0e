use sbf_program::{program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestSdkError {
    #[error("account {0} is named by the instruction but was not provided")]
    MissingAccount(Pubkey),

    #[error("no program is registered at {0}")]
    UnknownProgram(Pubkey),

    #[error("program error: {0}")]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Other(#[from] anyhow::Error), // source and Display delegate to anyhow::Error
}
