//! C-ABI forms of instructions, accounts and signer seeds as the host's
//! `sol_invoke_signed_c` syscall reads them.
//!
//! These structs hold raw addresses. They are built on the stack right before
//! the syscall and must not outlive the values they were built from.
use std::{marker::PhantomData, slice};

use crate::{
    account::{AccountInfo, AccountMeta},
    program_error::ProgramError,
    pubkey::Pubkey,
};

/// An account descriptor carrying only the address and the two privilege flags.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableAccountMeta<'a> {
    pub pubkey: &'a Pubkey,
    pub is_writable: bool,
    pub is_signer: bool,
}

impl<'a> From<&'a AccountMeta> for StableAccountMeta<'a> {
    fn from(meta: &'a AccountMeta) -> Self {
        Self {
            pubkey: &meta.pubkey,
            is_writable: meta.is_writable,
            is_signer: meta.is_signer,
        }
    }
}

impl From<StableAccountMeta<'_>> for AccountMeta {
    fn from(meta: StableAccountMeta<'_>) -> Self {
        Self {
            pubkey: *meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct StableInstruction<'a> {
    program_id: &'a Pubkey,
    accounts: *const StableAccountMeta<'a>,
    accounts_len: u64,
    data: *const u8,
    data_len: u64,
}

impl<'a> StableInstruction<'a> {
    pub fn new(
        program_id: &'a Pubkey,
        accounts: &'a [StableAccountMeta<'a>],
        data: &'a [u8],
    ) -> Self {
        Self {
            program_id,
            accounts: accounts.as_ptr(),
            accounts_len: accounts.len() as u64,
            data: data.as_ptr(),
            data_len: data.len() as u64,
        }
    }

    pub fn program_id(&self) -> &'a Pubkey {
        self.program_id
    }

    pub fn accounts(&self) -> &'a [StableAccountMeta<'a>] {
        // SAFETY: built from a slice borrowed for 'a in `new`.
        unsafe { slice::from_raw_parts(self.accounts, self.accounts_len as usize) }
    }

    pub fn data(&self) -> &'a [u8] {
        // SAFETY: built from a slice borrowed for 'a in `new`.
        unsafe { slice::from_raw_parts(self.data, self.data_len as usize) }
    }
}

/// The addresses of one account's fields, as the host expects them.
#[repr(C)]
#[derive(Debug)]
pub struct StableAccountInfo {
    pub key: *const Pubkey,
    pub lamports: *mut u64,
    pub data_len: u64,
    pub data: *mut u8,
    pub owner: *const Pubkey,
    pub rent_epoch: u64,
    pub is_signer: bool,
    pub is_writable: bool,
    pub executable: bool,
}

impl TryFrom<&AccountInfo<'_>> for StableAccountInfo {
    type Error = ProgramError;

    /// Takes the field addresses under a short-lived shared borrow.
    ///
    /// # Errors
    /// `AccountBorrowFailed` if the lamports or data are mutably borrowed.
    fn try_from(info: &AccountInfo<'_>) -> Result<Self, Self::Error> {
        let lamports = &**info.try_borrow_lamports()? as *const u64 as *mut u64;
        let data = info.try_borrow_data()?;
        Ok(Self {
            key: info.key,
            lamports,
            data_len: data.len() as u64,
            data: data.as_ptr() as *mut u8,
            owner: info.owner,
            rent_epoch: info.rent_epoch,
            is_signer: info.is_signer,
            is_writable: info.is_writable,
            executable: info.is_executable,
        })
    }
}

/// One seed of a program-derived signer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StableSeed<'a> {
    addr: *const u8,
    len: u64,
    _seed: PhantomData<&'a [u8]>,
}

impl<'a> From<&'a [u8]> for StableSeed<'a> {
    fn from(seed: &'a [u8]) -> Self {
        Self {
            addr: seed.as_ptr(),
            len: seed.len() as u64,
            _seed: PhantomData,
        }
    }
}

impl<'a> StableSeed<'a> {
    pub fn as_slice(&self) -> &'a [u8] {
        // SAFETY: built from a slice borrowed for 'a.
        unsafe { slice::from_raw_parts(self.addr, self.len as usize) }
    }
}

/// The seeds of one program-derived signer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StableSigner<'a, 'b> {
    addr: *const StableSeed<'a>,
    len: u64,
    _seeds: PhantomData<&'b [StableSeed<'a>]>,
}

impl<'a, 'b> From<&'b [StableSeed<'a>]> for StableSigner<'a, 'b> {
    fn from(seeds: &'b [StableSeed<'a>]) -> Self {
        Self {
            addr: seeds.as_ptr(),
            len: seeds.len() as u64,
            _seeds: PhantomData,
        }
    }
}

impl<'a, 'b> StableSigner<'a, 'b> {
    pub fn seeds(&self) -> &'b [StableSeed<'a>] {
        // SAFETY: built from a slice borrowed for 'b.
        unsafe { slice::from_raw_parts(self.addr, self.len as usize) }
    }
}
