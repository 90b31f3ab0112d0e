//! Zero-copy account views handed to programs and account descriptors for outgoing instructions.
use crate::{
    debug_account_data::debug_account_data, entrypoint::MAX_PERMITTED_DATA_INCREASE,
    program_error::ProgramError, pubkey::Pubkey,
};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use core::fmt;
use std::{
    cell::{Ref, RefCell, RefMut},
    mem::size_of,
    ops::{Deref, DerefMut},
    rc::Rc,
};

/// Account information that is passed to programs during instruction execution.
///
/// Every reference points into the input buffer the loader serialized, nothing
/// is copied out of it. Cloning an `AccountInfo` clones the `Rc`s, so the clone
/// is an alias: mutations through one are visible through the other. Duplicate
/// accounts in the input are materialized exactly this way.
#[derive(Clone)]
pub struct AccountInfo<'a> {
    pub key: &'a Pubkey,
    pub lamports: Rc<RefCell<&'a mut u64>>,
    pub data: Rc<RefCell<AccountData<'a>>>,
    pub owner: &'a Pubkey, // owner of an account is always a program
    pub rent_epoch: u64,
    pub is_signer: bool,
    pub is_writable: bool,
    pub is_executable: bool,
    original_data_len: usize,
}

/// The data region of a serialized account.
///
/// Holds the serialized `data_len` field together with the data and the
/// reserved growth padding that follows it. The visible length is always read
/// back from the serialized field, so a resize done by the host during a
/// cross-program invocation is picked up without re-parsing.
pub struct AccountData<'a> {
    len: &'a mut [u8; 8],
    region: &'a mut [u8],
}

impl<'a> AccountData<'a> {
    /// Wraps a serialized length field and the region it describes.
    ///
    /// `region` is the data plus any growth headroom; the length stored in
    /// `len` is clamped to it.
    pub fn new(len: &'a mut [u8; 8], region: &'a mut [u8]) -> Self {
        Self { len, region }
    }

    pub fn len(&self) -> usize {
        let len = u64::from_le_bytes(*self.len);
        usize::try_from(len)
            .unwrap_or(usize::MAX)
            .min(self.region.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest length the data can be resized to in place.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.region.len());
        *self.len = (new_len as u64).to_le_bytes();
    }
}

impl Deref for AccountData<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        let len = self.len();
        &self.region[..len]
    }
}

impl DerefMut for AccountData<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.region[..len]
    }
}

/// Meta information about an account used to define its role in an instruction.
/// This includes whether the account is a signer and if it's writable.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[repr(C)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// Creates a new `AccountMeta` with the given public key as a writable account.
    ///
    /// # Arguments
    /// * `pubkey` - The account's public key
    /// * `is_signer` - Whether this account is a transaction signer
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Creates a new read-only `AccountMeta` with the given public key.
    ///
    /// # Arguments
    /// * `pubkey` - The account's public key
    /// * `is_signer` - Whether this account is a transaction signer
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }

    /// A writable account that must sign.
    pub fn writable_signer(pubkey: Pubkey) -> Self {
        Self::new(pubkey, true)
    }

    /// A writable account that does not sign.
    pub fn writable(pubkey: Pubkey) -> Self {
        Self::new(pubkey, false)
    }

    /// A read-only account that must sign.
    pub fn readonly_signer(pubkey: Pubkey) -> Self {
        Self::new_readonly(pubkey, true)
    }

    /// A read-only account that does not sign.
    pub fn readonly(pubkey: Pubkey) -> Self {
        Self::new_readonly(pubkey, false)
    }

    /// Serializes the AccountMeta into a fixed-size byte array.
    ///
    /// # Returns
    /// A 34-byte array containing the serialized account metadata
    pub fn serialize(&self) -> [u8; 34] {
        let mut serialized = [0; size_of::<Pubkey>() + 2];

        serialized[..size_of::<Pubkey>()].copy_from_slice(&self.pubkey.serialize());
        serialized[size_of::<Pubkey>()] = self.is_signer as u8;
        serialized[size_of::<Pubkey>() + 1] = self.is_writable as u8;

        serialized
    }

    /// Deserializes an AccountMeta from a byte slice.
    ///
    /// Bytes past the first 34 are ignored.
    ///
    /// # Arguments
    /// * `data` - Byte slice containing serialized account metadata
    ///
    /// # Errors
    /// `InvalidArgument` if `data` is shorter than 34 bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, ProgramError> {
        let Some((pubkey, &[is_signer, is_writable, ..])) = data.split_first_chunk::<32>() else {
            return Err(ProgramError::InvalidArgument);
        };
        Ok(Self {
            pubkey: Pubkey::new_from_array(*pubkey),
            is_signer: is_signer != 0,
            is_writable: is_writable != 0,
        })
    }
}

/// Gets the next AccountInfo from an iterator, or returns a NotEnoughAccountKeys error.
///
/// # Arguments
/// * `iter` - Iterator over AccountInfo references
///
/// # Returns
/// * `Ok(AccountInfo)` - The next account info
/// * `Err(ProgramError)` - If there are no more accounts in the iterator
pub fn next_account_info<'a, 'b, I: Iterator<Item = &'a AccountInfo<'b>>>(
    iter: &mut I,
) -> Result<I::Item, ProgramError> {
    iter.next().ok_or(ProgramError::NotEnoughAccountKeys)
}

impl fmt::Debug for AccountInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("AccountInfo");

        f.field("key", &self.key)
            .field("owner", &self.owner)
            .field("is_signer", &self.is_signer)
            .field("is_writable", &self.is_writable)
            .field("is_executable", &self.is_executable)
            .field("rent_epoch", &self.rent_epoch);
        match (self.lamports.try_borrow(), self.data.try_borrow()) {
            (Ok(lamports), Ok(data)) => {
                f.field("lamports", &**lamports)
                    .field("data.len", &data.len());
                debug_account_data(&data, &mut f);
            }
            _ => {
                f.field("borrowed", &true);
            }
        }

        f.finish_non_exhaustive()
    }
}

impl<'a> AccountInfo<'a> {
    /// Creates a new AccountInfo instance.
    ///
    /// # Arguments
    /// * `key` - The account's public key
    /// * `is_signer` - Whether this account is a signer
    /// * `is_writable` - Whether this account is writable
    /// * `lamports` - The account's balance
    /// * `data` - The account's data region
    /// * `owner` - The program that owns this account
    /// * `is_executable` - Whether this account contains executable code
    /// * `rent_epoch` - The epoch at which this account will next owe rent
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: &'a Pubkey,
        is_signer: bool,
        is_writable: bool,
        lamports: &'a mut u64,
        data: AccountData<'a>,
        owner: &'a Pubkey,
        is_executable: bool,
        rent_epoch: u64,
    ) -> Self {
        let original_data_len = data.len();
        Self {
            key,
            lamports: Rc::new(RefCell::new(lamports)),
            data: Rc::new(RefCell::new(data)),
            owner,
            rent_epoch,
            is_signer,
            is_writable,
            is_executable,
            original_data_len,
        }
    }

    /// Returns true when both handles view the same serialized account.
    pub fn is_alias_of(&self, other: &AccountInfo<'a>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Returns the account's balance.
    ///
    /// # Panics
    /// Panics if the lamports are currently mutably borrowed.
    pub fn lamports(&self) -> u64 {
        **self.lamports.borrow()
    }

    pub fn try_lamports(&self) -> Result<u64, ProgramError> {
        Ok(**self.try_borrow_lamports()?)
    }

    pub fn try_borrow_lamports(&self) -> Result<Ref<&'a mut u64>, ProgramError> {
        self.lamports
            .try_borrow()
            .map_err(|_| ProgramError::AccountBorrowFailed)
    }

    pub fn try_borrow_mut_lamports(&self) -> Result<RefMut<&'a mut u64>, ProgramError> {
        self.lamports
            .try_borrow_mut()
            .map_err(|_| ProgramError::AccountBorrowFailed)
    }

    /// Returns the length of the account's data.
    ///
    /// # Returns
    /// The length of the account's data in bytes
    pub fn data_len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn try_data_len(&self) -> Result<usize, ProgramError> {
        Ok(self.try_borrow_data()?.len())
    }

    /// Checks if the account's data is empty.
    ///
    /// # Returns
    /// `true` if the account contains no data, `false` otherwise
    pub fn data_is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    /// Immutably borrows the account's data.
    ///
    /// # Returns
    /// * `Ok(Ref<[u8]>)` - A reference to the account's data
    /// * `Err(ProgramError)` - If the data is already mutably borrowed
    pub fn try_borrow_data(&self) -> Result<Ref<[u8]>, ProgramError> {
        self.data
            .try_borrow()
            .map(|data| Ref::map(data, |data| &**data))
            .map_err(|_| ProgramError::AccountBorrowFailed)
    }

    /// Mutably borrows the account's data.
    ///
    /// # Returns
    /// * `Ok(RefMut<[u8]>)` - A mutable reference to the account's data
    /// * `Err(ProgramError)` - If the data is already borrowed
    pub fn try_borrow_mut_data(&self) -> Result<RefMut<[u8]>, ProgramError> {
        self.data
            .try_borrow_mut()
            .map(|data| RefMut::map(data, |data| &mut **data))
            .map_err(|_| ProgramError::AccountBorrowFailed)
    }

    /// Return the account's original data length when it was serialized for the
    /// current program invocation.
    pub fn original_data_len(&self) -> usize {
        self.original_data_len
    }

    /// Realloc the account's data and optionally zero-initialize the new
    /// memory.
    ///
    /// Note: Account data can be increased within a single call by up to
    /// [`MAX_PERMITTED_DATA_INCREASE`] bytes.
    ///
    /// Note: Memory used to grow is already zero-initialized upon program
    /// entrypoint and re-zeroing it wastes compute units. If within the same
    /// call a program reallocs from larger to smaller and back to larger again
    /// the new space could contain stale data. Pass `true` for `zero_init` in
    /// this case, otherwise compute units will be wasted re-zero-initializing.
    pub fn realloc(&self, new_len: usize, zero_init: bool) -> Result<(), ProgramError> {
        let mut data = self
            .data
            .try_borrow_mut()
            .map_err(|_| ProgramError::AccountBorrowFailed)?;
        let old_len = data.len();

        // Return early if length hasn't changed
        if new_len == old_len {
            return Ok(());
        }

        // Return early if the length increase from the original serialized data
        // length is too large and would result in an out of bounds allocation.
        if new_len.saturating_sub(self.original_data_len) > MAX_PERMITTED_DATA_INCREASE
            || new_len > data.capacity()
        {
            return Err(ProgramError::InvalidRealloc);
        }

        data.set_len(new_len);

        if zero_init && new_len > old_len {
            data[old_len..].fill(0);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fuzz_serialize_deserialize_account_meta(
            pubkey_bytes in any::<[u8; 32]>(),
            is_signer in any::<bool>(),
            is_writable in any::<bool>()
        ) {
            let pubkey = Pubkey::from(pubkey_bytes);
            let account_meta = AccountMeta {
                pubkey,
                is_signer,
                is_writable,
            };

            let serialized = account_meta.serialize();
            let deserialized = AccountMeta::from_slice(&serialized).unwrap();

            assert_eq!(account_meta, deserialized);
        }

        #[test]
        fn fuzz_account_meta_from_short_slice(data in prop::collection::vec(any::<u8>(), 0..34)) {
            prop_assert_eq!(AccountMeta::from_slice(&data), Err(ProgramError::InvalidArgument));
        }
    }

    #[test]
    fn test_account_meta_constructors() {
        let key = Pubkey::new_unique();
        let cases = [
            (AccountMeta::writable_signer(key), true, true),
            (AccountMeta::writable(key), false, true),
            (AccountMeta::readonly_signer(key), true, false),
            (AccountMeta::readonly(key), false, false),
        ];
        for (meta, is_signer, is_writable) in cases {
            assert_eq!(meta.pubkey, key);
            assert_eq!(meta.is_signer, is_signer);
            assert_eq!(meta.is_writable, is_writable);
        }
        assert_eq!(AccountMeta::new(key, true), AccountMeta::writable_signer(key));
        assert_eq!(AccountMeta::new_readonly(key, false), AccountMeta::readonly(key));
    }

    #[test]
    fn test_borrow_rules_and_aliasing() {
        let key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mut lamports = 42u64;
        let mut len = 3u64.to_le_bytes();
        let mut region = [1u8, 2, 3, 0, 0, 0, 0, 0];
        let info = AccountInfo::new(
            &key,
            false,
            true,
            &mut lamports,
            AccountData::new(&mut len, &mut region),
            &owner,
            false,
            0,
        );
        let alias = info.clone();
        assert!(alias.is_alias_of(&info));

        {
            let data = info.try_borrow_data().unwrap();
            assert_eq!(&*data, &[1, 2, 3]);
            assert_eq!(
                alias.try_borrow_mut_data().err(),
                Some(ProgramError::AccountBorrowFailed)
            );
        }

        alias.try_borrow_mut_data().unwrap()[0] = 9;
        **alias.try_borrow_mut_lamports().unwrap() -= 2;

        assert_eq!(info.try_borrow_data().unwrap()[0], 9);
        assert_eq!(info.lamports(), 40);
        assert_eq!(info.try_lamports(), Ok(40));
    }

    #[test]
    fn test_realloc_within_headroom() {
        let key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mut lamports = 0u64;
        let mut len = 2u64.to_le_bytes();
        let mut region = vec![7u8; 2 + MAX_PERMITTED_DATA_INCREASE];
        let info = AccountInfo::new(
            &key,
            false,
            true,
            &mut lamports,
            AccountData::new(&mut len, &mut region),
            &owner,
            false,
            0,
        );

        info.realloc(10, true).unwrap();
        assert_eq!(info.data_len(), 10);
        assert_eq!(&*info.try_borrow_data().unwrap(), &[7, 7, 0, 0, 0, 0, 0, 0, 0, 0]);

        info.realloc(1, false).unwrap();
        assert_eq!(info.data_len(), 1);
        assert_eq!(info.original_data_len(), 2);

        info.realloc(2 + MAX_PERMITTED_DATA_INCREASE, false).unwrap();
        assert_eq!(
            info.realloc(3 + MAX_PERMITTED_DATA_INCREASE, false),
            Err(ProgramError::InvalidRealloc)
        );

        drop(info);
        assert_eq!(
            u64::from_le_bytes(len),
            (2 + MAX_PERMITTED_DATA_INCREASE) as u64
        );
    }

    #[test]
    fn test_next_account_info_exhausted() {
        let infos: Vec<AccountInfo> = Vec::new();
        let mut iter = infos.iter();
        assert_eq!(
            next_account_info(&mut iter).err(),
            Some(ProgramError::NotEnoughAccountKeys)
        );
    }
}
