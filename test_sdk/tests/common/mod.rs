#![allow(dead_code)]

use borsh::{BorshDeserialize, BorshSerialize};
use sbf_program::{
    account::{next_account_info, AccountInfo, AccountMeta},
    entrypoint::ProgramResult,
    instruction::Instruction,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};
use sbf_test_sdk::TestAccount;

pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0; 32]);

#[derive(BorshSerialize, BorshDeserialize)]
pub enum SystemInstruction {
    Transfer { lamports: u64 },
}

pub fn transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Result<Instruction, ProgramError> {
    Instruction::new_with_borsh(
        SYSTEM_PROGRAM_ID,
        &SystemInstruction::Transfer { lamports },
        vec![AccountMeta::writable_signer(*from), AccountMeta::writable(*to)],
    )
}

/// Just enough of a system program to move lamports between accounts.
pub fn system_program(
    _program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let SystemInstruction::Transfer { lamports } =
        SystemInstruction::try_from_slice(instruction_data)
            .map_err(|_| ProgramError::InvalidInstructionData)?;

    let accounts_iter = &mut accounts.iter();
    let from = next_account_info(accounts_iter)?;
    let to = next_account_info(accounts_iter)?;
    if !from.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut from_lamports = from.try_borrow_mut_lamports()?;
    if **from_lamports < lamports {
        msg!("Transfer: insufficient lamports {}, need {}", **from_lamports, lamports);
        return Err(ProgramError::InsufficientFunds);
    }
    **from_lamports -= lamports;
    **to.try_borrow_mut_lamports()? += lamports;
    Ok(())
}

pub fn system_program_account() -> TestAccount {
    let mut account = TestAccount::new(SYSTEM_PROGRAM_ID, 1, 0, Pubkey::default());
    account.executable = true;
    account
}
