//! Errors returned by programs and by the I/O boundary itself.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a program, or the boundary code running on its behalf, may fail.
///
/// Builtin variants travel to the host as a `u64` with the code in the upper
/// 32 bits; `Custom` codes travel in the lower 32 bits.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ProgramError {
    /// Allows on-chain programs to implement program-specific error types and see them returned
    /// by the runtime. A program-specific error may be any type that is represented as
    /// or serialized to a u32 integer.
    #[error("Custom program error: {0:#x}")]
    Custom(u32),
    #[error("The arguments provided to a program instruction were invalid")]
    InvalidArgument,
    #[error("An instruction's data contents was invalid")]
    InvalidInstructionData,
    #[error("An account's data contents was invalid")]
    InvalidAccountData,
    #[error("An account's data was too small")]
    AccountDataTooSmall,
    #[error("An account's balance was too small to complete the instruction")]
    InsufficientFunds,
    #[error("The account did not have the expected program id")]
    IncorrectProgramId,
    #[error("A signature was required but not found")]
    MissingRequiredSignature,
    #[error("The instruction expected additional account keys")]
    NotEnoughAccountKeys,
    #[error("Failed to borrow a reference to account data, already borrowed")]
    AccountBorrowFailed,
    #[error("Length of the seed is too long for address generation")]
    MaxSeedLengthExceeded,
    #[error("Provided seeds do not result in a valid address")]
    InvalidSeeds,
    #[error("Account data reallocation was invalid")]
    InvalidRealloc,
    #[error("Program arithmetic overflowed")]
    ArithmeticOverflow,
    #[error("The input declares more accounts than the maximum allowed")]
    MaxAccountsExceeded,
    #[error("A duplicate account marker does not reference an earlier account")]
    InvalidDuplicateIndex,
    #[error("The program heap is exhausted")]
    OutOfMemory,
    #[error("Cross-program invocation failed")]
    CrossProgramInvocationFailed,
}

/// Builtin return values occupy the upper 32 bits
const BUILTIN_BIT_SHIFT: usize = 32;
macro_rules! to_builtin {
    ($error:expr) => {
        ($error as u64) << BUILTIN_BIT_SHIFT
    };
}

pub const CUSTOM_ZERO: u64 = to_builtin!(1);
pub const INVALID_ARGUMENT: u64 = to_builtin!(2);
pub const INVALID_INSTRUCTION_DATA: u64 = to_builtin!(3);
pub const INVALID_ACCOUNT_DATA: u64 = to_builtin!(4);
pub const ACCOUNT_DATA_TOO_SMALL: u64 = to_builtin!(5);
pub const INSUFFICIENT_FUNDS: u64 = to_builtin!(6);
pub const INCORRECT_PROGRAM_ID: u64 = to_builtin!(7);
pub const MISSING_REQUIRED_SIGNATURES: u64 = to_builtin!(8);
pub const NOT_ENOUGH_ACCOUNT_KEYS: u64 = to_builtin!(11);
pub const ACCOUNT_BORROW_FAILED: u64 = to_builtin!(12);
pub const MAX_SEED_LENGTH_EXCEEDED: u64 = to_builtin!(13);
pub const INVALID_SEEDS: u64 = to_builtin!(14);
pub const INVALID_ACCOUNT_DATA_REALLOC: u64 = to_builtin!(20);
pub const ARITHMETIC_OVERFLOW: u64 = to_builtin!(24);
pub const MAX_ACCOUNTS_EXCEEDED: u64 = to_builtin!(27);
pub const INVALID_DUPLICATE_INDEX: u64 = to_builtin!(28);
pub const OUT_OF_MEMORY: u64 = to_builtin!(29);
pub const CROSS_PROGRAM_INVOCATION_FAILED: u64 = to_builtin!(30);

impl From<ProgramError> for u64 {
    fn from(error: ProgramError) -> Self {
        match error {
            ProgramError::InvalidArgument => INVALID_ARGUMENT,
            ProgramError::InvalidInstructionData => INVALID_INSTRUCTION_DATA,
            ProgramError::InvalidAccountData => INVALID_ACCOUNT_DATA,
            ProgramError::AccountDataTooSmall => ACCOUNT_DATA_TOO_SMALL,
            ProgramError::InsufficientFunds => INSUFFICIENT_FUNDS,
            ProgramError::IncorrectProgramId => INCORRECT_PROGRAM_ID,
            ProgramError::MissingRequiredSignature => MISSING_REQUIRED_SIGNATURES,
            ProgramError::NotEnoughAccountKeys => NOT_ENOUGH_ACCOUNT_KEYS,
            ProgramError::AccountBorrowFailed => ACCOUNT_BORROW_FAILED,
            ProgramError::MaxSeedLengthExceeded => MAX_SEED_LENGTH_EXCEEDED,
            ProgramError::InvalidSeeds => INVALID_SEEDS,
            ProgramError::InvalidRealloc => INVALID_ACCOUNT_DATA_REALLOC,
            ProgramError::ArithmeticOverflow => ARITHMETIC_OVERFLOW,
            ProgramError::MaxAccountsExceeded => MAX_ACCOUNTS_EXCEEDED,
            ProgramError::InvalidDuplicateIndex => INVALID_DUPLICATE_INDEX,
            ProgramError::OutOfMemory => OUT_OF_MEMORY,
            ProgramError::CrossProgramInvocationFailed => CROSS_PROGRAM_INVOCATION_FAILED,
            ProgramError::Custom(error) => {
                if error == 0 {
                    CUSTOM_ZERO
                } else {
                    error as u64
                }
            }
        }
    }
}

impl From<u64> for ProgramError {
    fn from(error: u64) -> Self {
        match error {
            CUSTOM_ZERO => Self::Custom(0),
            INVALID_ARGUMENT => Self::InvalidArgument,
            INVALID_INSTRUCTION_DATA => Self::InvalidInstructionData,
            INVALID_ACCOUNT_DATA => Self::InvalidAccountData,
            ACCOUNT_DATA_TOO_SMALL => Self::AccountDataTooSmall,
            INSUFFICIENT_FUNDS => Self::InsufficientFunds,
            INCORRECT_PROGRAM_ID => Self::IncorrectProgramId,
            MISSING_REQUIRED_SIGNATURES => Self::MissingRequiredSignature,
            NOT_ENOUGH_ACCOUNT_KEYS => Self::NotEnoughAccountKeys,
            ACCOUNT_BORROW_FAILED => Self::AccountBorrowFailed,
            MAX_SEED_LENGTH_EXCEEDED => Self::MaxSeedLengthExceeded,
            INVALID_SEEDS => Self::InvalidSeeds,
            INVALID_ACCOUNT_DATA_REALLOC => Self::InvalidRealloc,
            ARITHMETIC_OVERFLOW => Self::ArithmeticOverflow,
            MAX_ACCOUNTS_EXCEEDED => Self::MaxAccountsExceeded,
            INVALID_DUPLICATE_INDEX => Self::InvalidDuplicateIndex,
            OUT_OF_MEMORY => Self::OutOfMemory,
            CROSS_PROGRAM_INVOCATION_FAILED => Self::CrossProgramInvocationFailed,
            _ if error >> BUILTIN_BIT_SHIFT == 0 => Self::Custom(error as u32),
            _ => Self::InvalidArgument,
        }
    }
}

impl From<std::collections::TryReserveError> for ProgramError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ProgramError::OutOfMemory
    }
}
