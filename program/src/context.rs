//! Deserialization of the loader's input buffer into a [`Context`].
//!
//! The buffer is walked once, front to back. Accounts the loader sent in
//! full become [`AccountInfo`]s borrowing straight into the buffer; accounts
//! sent as a duplicate marker become clones of the earlier `AccountInfo`, so
//! both slots share one set of cells and see each other's writes.
use std::{cell::RefCell, mem::size_of};

use crate::{
    account::{AccountData, AccountInfo},
    cursor::Cursor,
    entrypoint::{
        BPF_ALIGN_OF_U128, MAX_ACCOUNTS, MAX_PERMITTED_DATA_INCREASE, MAX_PERMITTED_DATA_LENGTH,
        NON_DUP_MARKER,
    },
    program_error::ProgramError,
    pubkey::Pubkey,
};

/// Bytes a duplicate account occupies: the marker plus padding.
const DUPLICATE_SLOT_LEN: usize = 8;

/// Heap bytes behind the two shared cells of one account that is not a
/// duplicate. Each `Rc` allocation carries a strong and a weak count.
pub const ACCOUNT_CELLS_SIZE: usize = 4 * size_of::<usize>()
    + size_of::<RefCell<&'static mut u64>>()
    + size_of::<RefCell<AccountData<'static>>>();

/// Backing store for the account handles of a [`Context`].
///
/// Storage is reserved once, up front, for the number of accounts the input
/// declares. Implementations must report exhaustion as
/// [`ProgramError::OutOfMemory`] rather than aborting.
pub trait AccountStorage<'a> {
    /// Reserves room for `additional` more accounts.
    fn try_reserve(&mut self, additional: usize) -> Result<(), ProgramError>;

    /// Accounts for the shared cells of one account that is not a duplicate,
    /// called before they are allocated.
    fn try_reserve_cells(&mut self) -> Result<(), ProgramError> {
        Ok(())
    }

    /// Appends an account handle.
    fn push(&mut self, account: AccountInfo<'a>) -> Result<(), ProgramError>;

    fn as_slice(&self) -> &[AccountInfo<'a>];
}

impl<'a> AccountStorage<'a> for Vec<AccountInfo<'a>> {
    fn try_reserve(&mut self, additional: usize) -> Result<(), ProgramError> {
        self.try_reserve_exact(additional)?;
        Ok(())
    }

    fn push(&mut self, account: AccountInfo<'a>) -> Result<(), ProgramError> {
        if self.len() == self.capacity() {
            self.try_reserve_exact(1)?;
        }
        Vec::push(self, account);
        Ok(())
    }

    fn as_slice(&self) -> &[AccountInfo<'a>] {
        self
    }
}

/// Account storage carved out of a fixed byte budget.
///
/// Behaves like the program's bump heap: reservations are charged against the
/// budget and never refunded, and a reservation the budget cannot cover fails
/// with [`ProgramError::OutOfMemory`]. Both the handles and the cells behind
/// each account that is not a duplicate ([`ACCOUNT_CELLS_SIZE`]) are charged.
#[derive(Debug)]
pub struct ScratchStorage<'a> {
    accounts: Vec<AccountInfo<'a>>,
    remaining: usize,
}

impl ScratchStorage<'_> {
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            accounts: Vec::new(),
            remaining: bytes,
        }
    }

    /// Bytes of budget not yet reserved.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn charge(&mut self, bytes: usize) -> Result<(), ProgramError> {
        self.remaining = self
            .remaining
            .checked_sub(bytes)
            .ok_or(ProgramError::OutOfMemory)?;
        Ok(())
    }
}

impl<'a> AccountStorage<'a> for ScratchStorage<'a> {
    fn try_reserve(&mut self, additional: usize) -> Result<(), ProgramError> {
        let bytes = additional
            .checked_mul(size_of::<AccountInfo>())
            .ok_or(ProgramError::OutOfMemory)?;
        self.charge(bytes)?;
        self.accounts.try_reserve_exact(additional)?;
        Ok(())
    }

    fn try_reserve_cells(&mut self) -> Result<(), ProgramError> {
        self.charge(ACCOUNT_CELLS_SIZE)
    }

    fn push(&mut self, account: AccountInfo<'a>) -> Result<(), ProgramError> {
        if self.accounts.len() == self.accounts.capacity() {
            AccountStorage::try_reserve(self, 1)?;
        }
        self.accounts.push(account);
        Ok(())
    }

    fn as_slice(&self) -> &[AccountInfo<'a>] {
        &self.accounts
    }
}

/// Everything a program learns about its invocation.
///
/// Borrows the input buffer for `'a`; nothing is copied out of it.
#[derive(Debug)]
pub struct Context<'a, S = Vec<AccountInfo<'a>>> {
    pub program_id: &'a Pubkey,
    pub instruction_data: &'a [u8],
    accounts: S,
}

impl<'a> Context<'a> {
    /// Deserializes `input` with heap-backed account storage.
    pub fn load(input: &'a mut [u8]) -> Result<Self, ProgramError> {
        Self::load_with(input, Vec::new())
    }
}

impl<'a, S: AccountStorage<'a>> Context<'a, S> {
    /// Deserializes `input`, placing the account handles in `storage`.
    ///
    /// # Errors
    /// * `MaxAccountsExceeded` - the input declares more than [`MAX_ACCOUNTS`] accounts
    /// * `InvalidDuplicateIndex` - a duplicate marker does not point at an earlier account
    /// * `OutOfMemory` - `storage` cannot hold the declared accounts or their cells
    /// * `InvalidArgument` - the input ends early or is misaligned
    ///
    /// On error `storage` is dropped along with any handles already placed in it.
    pub fn load_with(input: &'a mut [u8], mut storage: S) -> Result<Self, ProgramError> {
        let mut cursor = Cursor::new(input);

        let count = cursor.read_u64()?;
        if count > MAX_ACCOUNTS as u64 {
            return Err(ProgramError::MaxAccountsExceeded);
        }
        let count = count as usize;
        storage.try_reserve(count)?;

        for index in 0..count {
            let marker = cursor.read_u8()?;
            let account = if marker == NON_DUP_MARKER {
                storage.try_reserve_cells()?;
                deserialize_account_info(&mut cursor)?
            } else {
                let duplicate_index = usize::from(marker);
                if duplicate_index >= index {
                    return Err(ProgramError::InvalidDuplicateIndex);
                }
                cursor.skip(DUPLICATE_SLOT_LEN - 1)?;
                storage
                    .as_slice()
                    .get(duplicate_index)
                    .cloned()
                    .ok_or(ProgramError::InvalidDuplicateIndex)?
            };
            storage.push(account)?;
        }

        let instruction_data_len = usize::try_from(cursor.read_u64()?)
            .map_err(|_| ProgramError::InvalidArgument)?;
        let instruction_data: &'a [u8] = cursor.take(instruction_data_len)?;
        let program_id = pubkey_ref(cursor.take_array::<{ size_of::<Pubkey>() }>()?)?;

        Ok(Self {
            program_id,
            instruction_data,
            accounts: storage,
        })
    }

    pub fn account_count(&self) -> usize {
        self.accounts.as_slice().len()
    }

    /// The accounts in the order the instruction listed them, duplicates included.
    pub fn accounts(&self) -> &[AccountInfo<'a>] {
        self.accounts.as_slice()
    }

    pub fn into_storage(self) -> S {
        self.accounts
    }
}

fn pubkey_ref<'a>(bytes: &'a mut [u8; 32]) -> Result<&'a Pubkey, ProgramError> {
    let bytes: &'a [u8; 32] = bytes;
    bytemuck::try_from_bytes(bytes).map_err(|_| ProgramError::InvalidArgument)
}

/// Parses one non-duplicate account record, the marker already consumed.
fn deserialize_account_info<'a>(cursor: &mut Cursor<'a>) -> Result<AccountInfo<'a>, ProgramError> {
    let is_signer = cursor.read_u8()? != 0;
    let is_writable = cursor.read_u8()? != 0;
    let is_executable = cursor.read_u8()? != 0;

    // Scratch slot the program fills with the length it was handed.
    let original_data_len = cursor.take_array::<4>()?;

    let key = pubkey_ref(cursor.take_array::<{ size_of::<Pubkey>() }>()?)?;
    let owner = pubkey_ref(cursor.take_array::<{ size_of::<Pubkey>() }>()?)?;

    let lamports: &'a mut u64 = bytemuck::try_from_bytes_mut(cursor.take(size_of::<u64>())?)
        .map_err(|_| ProgramError::InvalidArgument)?;

    let data_len_field = cursor.take_array::<{ size_of::<u64>() }>()?;
    let data_len = usize::try_from(u64::from_le_bytes(*data_len_field))
        .map_err(|_| ProgramError::InvalidArgument)?;
    if data_len > MAX_PERMITTED_DATA_LENGTH {
        return Err(ProgramError::InvalidArgument);
    }
    *original_data_len = (data_len as u32).to_le_bytes();

    let region = cursor.take(data_len + MAX_PERMITTED_DATA_INCREASE)?;
    cursor.align(BPF_ALIGN_OF_U128)?;
    let rent_epoch = cursor.read_u64()?;

    Ok(AccountInfo::new(
        key,
        is_signer,
        is_writable,
        lamports,
        AccountData::new(data_len_field, region),
        owner,
        is_executable,
        rent_epoch,
    ))
}
