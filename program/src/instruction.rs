//! Instructions a program builds to call another program.
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{account::AccountMeta, program_error::ProgramError, pubkey::Pubkey};

/// A directive for a single invocation of a program.
///
/// Building an `Instruction` has no side effects; nothing reaches the host
/// until it is passed to [`invoke`](crate::program::invoke) or
/// [`invoke_signed`](crate::program::invoke_signed).
#[derive(
    Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Instruction {
    /// Pubkey of the program that executes this instruction.
    pub program_id: Pubkey,
    /// Metadata describing accounts that should be passed to the program.
    pub accounts: Vec<AccountMeta>,
    /// Opaque data passed to the program for its own interpretation.
    pub data: Vec<u8>,
}

impl Instruction {
    /// Creates an instruction whose data is already encoded.
    ///
    /// # Arguments
    /// * `program_id` - The program to invoke
    /// * `data` - Raw instruction data
    /// * `accounts` - Accounts the program reads or writes, in order
    pub fn new_with_bytes(program_id: Pubkey, data: &[u8], accounts: Vec<AccountMeta>) -> Self {
        Self {
            program_id,
            accounts,
            data: data.to_vec(),
        }
    }

    /// Creates an instruction with borsh-encoded data.
    ///
    /// # Errors
    /// `InvalidInstructionData` if `data` fails to serialize.
    pub fn new_with_borsh<T: BorshSerialize>(
        program_id: Pubkey,
        data: &T,
        accounts: Vec<AccountMeta>,
    ) -> Result<Self, ProgramError> {
        let data = borsh::to_vec(data).map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok(Self {
            program_id,
            accounts,
            data,
        })
    }

    /// Creates an instruction with bincode-encoded data.
    ///
    /// # Errors
    /// `InvalidInstructionData` if `data` fails to serialize.
    pub fn new_with_bincode<T: Serialize>(
        program_id: Pubkey,
        data: &T,
        accounts: Vec<AccountMeta>,
    ) -> Result<Self, ProgramError> {
        let data = bincode::serialize(data).map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok(Self {
            program_id,
            accounts,
            data,
        })
    }
}
