//! Cross-program invocation and the return-data channel.
use std::{cmp, fmt, ops::Deref};

use crate::{
    account::AccountInfo, debug_account_data::Hex, entrypoint::ProgramResult,
    instruction::Instruction, program_error::ProgramError, pubkey::Pubkey, MAX_SEEDS, MAX_SEED_LEN,
    MAX_SIGNERS,
};

/// Maximum size that can be set using [`set_return_data`].
pub const MAX_RETURN_DATA: usize = 1024;

/// The stack height of a top-level instruction; each nested invocation adds one.
pub const TRANSACTION_LEVEL_STACK_HEIGHT: usize = 1;

/// Maximum number of account metas an invoked instruction may carry.
pub const MAX_CPI_INSTRUCTION_ACCOUNTS: usize = u8::MAX as usize;

/// Invoke a cross-program instruction.
///
/// The runtime re-enters the callee's entrypoint with the accounts named by
/// `instruction`, taken from `account_infos`. Any change the callee makes to
/// a writable account is visible through `account_infos` when this returns.
///
/// # Errors
/// * `AccountBorrowFailed` - an account the callee may write is borrowed, or
///   an account the callee may read is mutably borrowed
/// * `CrossProgramInvocationFailed` - the runtime refused the call or the
///   callee failed
pub fn invoke(instruction: &Instruction, account_infos: &[AccountInfo]) -> ProgramResult {
    invoke_signed(instruction, account_infos, &[])
}

/// Invoke a cross-program instruction but don't check borrows.
///
/// Calling this while holding a borrow of an account the callee writes lets
/// that borrow observe the write.
pub fn invoke_unchecked(instruction: &Instruction, account_infos: &[AccountInfo]) -> ProgramResult {
    invoke_signed_unchecked(instruction, account_infos, &[])
}

/// Invoke a cross-program instruction with program signatures.
///
/// Each entry of `signers_seeds` is the seed list of one program-derived
/// address of the calling program. The runtime treats accounts at those
/// addresses as signers for this call only.
///
/// # Errors
/// As [`invoke`], plus `MaxSeedLengthExceeded` when more than
/// [`MAX_SIGNERS`] signers, more than [`MAX_SEEDS`] seeds per signer or a
/// seed longer than [`MAX_SEED_LEN`] is given.
pub fn invoke_signed(
    instruction: &Instruction,
    account_infos: &[AccountInfo],
    signers_seeds: &[&[&[u8]]],
) -> ProgramResult {
    // Check that the account RefCells are consistent with the request
    for account_meta in instruction.accounts.iter() {
        for account_info in account_infos.iter() {
            if account_meta.pubkey == *account_info.key {
                if account_meta.is_writable {
                    let _ = account_info.try_borrow_mut_lamports()?;
                    let _ = account_info.try_borrow_mut_data()?;
                } else {
                    let _ = account_info.try_borrow_lamports()?;
                    let _ = account_info.try_borrow_data()?;
                }
                break;
            }
        }
    }

    invoke_signed_unchecked(instruction, account_infos, signers_seeds)
}

/// Invoke a cross-program instruction with program signatures but don't check
/// borrows.
pub fn invoke_signed_unchecked(
    instruction: &Instruction,
    account_infos: &[AccountInfo],
    signers_seeds: &[&[&[u8]]],
) -> ProgramResult {
    check_signers_seeds(signers_seeds)?;
    if instruction.accounts.len() > MAX_CPI_INSTRUCTION_ACCOUNTS {
        return Err(ProgramError::InvalidArgument);
    }

    #[cfg(target_os = "solana")]
    {
        use crate::{
            entrypoint::SUCCESS,
            stable_layout::{
                StableAccountInfo, StableAccountMeta, StableInstruction, StableSeed, StableSigner,
            },
        };

        let mut account_metas = Vec::new();
        account_metas.try_reserve_exact(instruction.accounts.len())?;
        account_metas.extend(instruction.accounts.iter().map(StableAccountMeta::from));
        let stable_instruction =
            StableInstruction::new(&instruction.program_id, &account_metas, &instruction.data);

        let mut stable_infos = Vec::new();
        stable_infos.try_reserve_exact(account_infos.len())?;
        for account_info in account_infos {
            stable_infos.push(StableAccountInfo::try_from(account_info)?);
        }

        let mut seeds = Vec::new();
        seeds.try_reserve_exact(signers_seeds.iter().map(|s| s.len()).sum())?;
        for signer_seeds in signers_seeds {
            seeds.extend(signer_seeds.iter().map(|seed| StableSeed::from(*seed)));
        }
        let mut signers = Vec::new();
        signers.try_reserve_exact(signers_seeds.len())?;
        let mut start = 0;
        for signer_seeds in signers_seeds {
            let end = start + signer_seeds.len();
            signers.push(StableSigner::from(&seeds[start..end]));
            start = end;
        }

        let result = unsafe {
            crate::syscalls::sol_invoke_signed_c(
                &stable_instruction as *const _ as *const u8,
                stable_infos.as_ptr() as *const u8,
                stable_infos.len() as u64,
                signers.as_ptr() as *const u8,
                signers.len() as u64,
            )
        };
        match result {
            SUCCESS => Ok(()),
            _ => Err(ProgramError::CrossProgramInvocationFailed),
        }
    }

    #[cfg(not(target_os = "solana"))]
    crate::program_stubs::sol_invoke_signed(instruction, account_infos, signers_seeds)
        .map_err(|_| ProgramError::CrossProgramInvocationFailed)
}

fn check_signers_seeds(signers_seeds: &[&[&[u8]]]) -> ProgramResult {
    if signers_seeds.len() > MAX_SIGNERS {
        return Err(ProgramError::MaxSeedLengthExceeded);
    }
    for seeds in signers_seeds {
        if seeds.len() > MAX_SEEDS || seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
            return Err(ProgramError::MaxSeedLengthExceeded);
        }
    }
    Ok(())
}

/// The current stack height: [`TRANSACTION_LEVEL_STACK_HEIGHT`] for a
/// top-level instruction, one more for each level of invocation.
pub fn get_stack_height() -> usize {
    #[cfg(target_os = "solana")]
    unsafe {
        crate::syscalls::sol_get_stack_height() as usize
    }

    #[cfg(not(target_os = "solana"))]
    {
        crate::program_stubs::sol_get_stack_height() as usize
    }
}

/// Return data set by the most recent invocation this program made.
#[derive(Clone, PartialEq, Eq)]
pub struct ReturnData {
    program_id: Pubkey,
    data: [u8; MAX_RETURN_DATA],
    size: usize,
}

impl ReturnData {
    /// Copies at most [`MAX_RETURN_DATA`] bytes of `data`.
    pub fn new(program_id: Pubkey, data: &[u8]) -> Self {
        let size = cmp::min(data.len(), MAX_RETURN_DATA);
        let mut buffer = [0u8; MAX_RETURN_DATA];
        buffer[..size].copy_from_slice(&data[..size]);
        Self {
            program_id,
            data: buffer,
            size,
        }
    }

    /// The program that set the data.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.size]
    }
}

impl Deref for ReturnData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for ReturnData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnData")
            .field("program_id", &self.program_id)
            .field("data", &Hex(self.as_slice()))
            .finish()
    }
}

/// Set the running program's return data.
///
/// Return data is a dedicated per-transaction buffer for data passed
/// from cross-program invoked programs back to their caller.
///
/// Data beyond the first [`MAX_RETURN_DATA`] bytes is dropped. Setting
/// empty data clears the buffer.
pub fn set_return_data(data: &[u8]) {
    let data = &data[..cmp::min(data.len(), MAX_RETURN_DATA)];

    #[cfg(target_os = "solana")]
    unsafe {
        crate::syscalls::sol_set_return_data(data.as_ptr(), data.len() as u64)
    };

    #[cfg(not(target_os = "solana"))]
    crate::program_stubs::sol_set_return_data(data);
}

/// Get the return data from an invoked program.
///
/// For every transaction there is a single buffer with maximum length
/// [`MAX_RETURN_DATA`], paired with a [`Pubkey`] representing the program ID of
/// the program that most recently set the return data. The buffer is cleared
/// each time a program is invoked.
///
/// Returns `None` when no invocation this program made has set data.
pub fn get_return_data() -> Option<ReturnData> {
    #[cfg(target_os = "solana")]
    {
        let mut data = [0u8; MAX_RETURN_DATA];
        let mut program_id = Pubkey::default();

        let size = unsafe {
            crate::syscalls::sol_get_return_data(
                data.as_mut_ptr(),
                data.len() as u64,
                &mut program_id,
            )
        };

        if size == 0 {
            None
        } else {
            Some(ReturnData {
                program_id,
                data,
                size: cmp::min(size as usize, MAX_RETURN_DATA),
            })
        }
    }

    #[cfg(not(target_os = "solana"))]
    crate::program_stubs::sol_get_return_data()
}

/// Copies the return data into `buffer`.
///
/// # Returns
/// The program that set the data and the number of bytes copied, which is
/// `min(available, buffer.len())`, or `None` when no data is set. Reserve
/// [`MAX_RETURN_DATA`] bytes to never lose any.
pub fn get_return_data_into(buffer: &mut [u8]) -> Option<(Pubkey, usize)> {
    #[cfg(target_os = "solana")]
    {
        let mut program_id = Pubkey::default();
        let size = unsafe {
            crate::syscalls::sol_get_return_data(
                buffer.as_mut_ptr(),
                buffer.len() as u64,
                &mut program_id,
            )
        };

        if size == 0 {
            None
        } else {
            Some((program_id, cmp::min(size as usize, buffer.len())))
        }
    }

    #[cfg(not(target_os = "solana"))]
    {
        let return_data = get_return_data()?;
        let copied = cmp::min(return_data.len(), buffer.len());
        buffer[..copied].copy_from_slice(&return_data[..copied]);
        Some((*return_data.program_id(), copied))
    }
}
