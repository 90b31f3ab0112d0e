//! Serialization of loader input buffers.
//!
//! [`serialize_parameters`] lays out an instruction and its accounts exactly as
//! the loader hands them to a program. [`InputBuilder`] writes the same layout
//! record by record, and will also write buffers the loader never would.
use std::mem::size_of;

use sbf_program::{
    account::AccountMeta,
    context::Context,
    entrypoint::{BPF_ALIGN_OF_U128, MAX_PERMITTED_DATA_INCREASE, NON_DUP_MARKER},
    instruction::Instruction,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::TestSdkError;

/// An account as the test harness owns it between instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestAccount {
    pub key: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
    pub rent_epoch: u64,
}

impl TestAccount {
    /// Creates an account with `space` zeroed bytes of data.
    pub fn new(key: Pubkey, lamports: u64, space: usize, owner: Pubkey) -> Self {
        Self {
            key,
            owner,
            lamports,
            data: vec![0; space],
            executable: false,
            rent_epoch: 0,
        }
    }

    pub fn with_data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }
}

// Field offsets within a full account record, from its marker.
const KEY_OFFSET: usize = 8;
const LAMPORTS_OFFSET: usize = KEY_OFFSET + 2 * size_of::<Pubkey>();
const DATA_LEN_OFFSET: usize = LAMPORTS_OFFSET + size_of::<u64>();
const DATA_OFFSET: usize = DATA_LEN_OFFSET + size_of::<u64>();

/// Where a full account record was written and the data length it was
/// written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AccountRecord {
    offset: usize,
    original_len: usize,
}

/// An account as a program left it in its input buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedAccount<'a> {
    pub key: Pubkey,
    pub is_writable: bool,
    pub lamports: u64,
    pub data: &'a [u8],
}

impl AccountRecord {
    fn read<'a>(&self, bytes: &'a [u8]) -> Result<SerializedAccount<'a>, ProgramError> {
        let key = field(bytes, self.offset + KEY_OFFSET, size_of::<Pubkey>())?;
        let is_writable = *field(bytes, self.offset + 2, 1)?
            .first()
            .ok_or(ProgramError::InvalidArgument)?
            != 0;
        let lamports = read_u64(bytes, self.offset + LAMPORTS_OFFSET)?;

        let data_len = usize::try_from(read_u64(bytes, self.offset + DATA_LEN_OFFSET)?)
            .map_err(|_| ProgramError::InvalidRealloc)?;
        if data_len > self.original_len + MAX_PERMITTED_DATA_INCREASE {
            return Err(ProgramError::InvalidRealloc);
        }

        Ok(SerializedAccount {
            key: Pubkey::from_slice(key),
            is_writable,
            lamports,
            data: field(bytes, self.offset + DATA_OFFSET, data_len)?,
        })
    }
}

fn field(bytes: &[u8], start: usize, len: usize) -> Result<&[u8], ProgramError> {
    bytes
        .get(start..start + len)
        .ok_or(ProgramError::InvalidArgument)
}

fn read_u64(bytes: &[u8], start: usize) -> Result<u64, ProgramError> {
    let field: [u8; 8] = field(bytes, start, size_of::<u64>())?
        .try_into()
        .map_err(|_| ProgramError::InvalidArgument)?;
    Ok(u64::from_le_bytes(field))
}

/// An 8-byte aligned loader input buffer.
///
/// Remembers where each full account record was written, so the accounts can
/// be read back after a program resized some of them.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    words: Vec<u64>,
    len: usize,
    records: Vec<AccountRecord>,
}

impl InputBuffer {
    fn from_bytes(bytes: &[u8], records: Vec<AccountRecord>) -> Self {
        let mut words = vec![0u64; bytes.len().div_ceil(size_of::<u64>())];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            words,
            len: bytes.len(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// Deserializes the buffer as a program would see it.
    pub fn load(&mut self) -> Result<Context<'_>, ProgramError> {
        Context::load(self.as_mut_slice())
    }

    /// Reads back every account written in full, in the order written.
    ///
    /// Records are found where they were written rather than by re-parsing,
    /// so a record whose data length a program changed is read at its new
    /// length without disturbing the records after it.
    ///
    /// # Errors
    /// * `InvalidRealloc` - a data length grew past the reserved headroom
    /// * `InvalidArgument` - a record runs past the end of the buffer
    pub fn accounts(&self) -> Result<Vec<SerializedAccount<'_>>, ProgramError> {
        let bytes = self.as_slice();
        self.records.iter().map(|record| record.read(bytes)).collect()
    }
}

/// Writes loader input one record at a time.
///
/// The builder trusts its caller: counts, duplicate markers and flags are
/// written as given, so it can produce malformed input on purpose.
#[derive(Clone, Debug)]
pub struct InputBuilder {
    bytes: Vec<u8>,
    records: Vec<AccountRecord>,
}

impl InputBuilder {
    /// Starts a buffer declaring `account_count` accounts.
    pub fn new(account_count: u64) -> Self {
        Self {
            bytes: account_count.to_le_bytes().to_vec(),
            records: Vec::new(),
        }
    }

    /// Appends a full account record.
    pub fn account(mut self, account: &TestAccount, is_signer: bool, is_writable: bool) -> Self {
        self.records.push(AccountRecord {
            offset: self.bytes.len(),
            original_len: account.data.len(),
        });
        self.bytes.push(NON_DUP_MARKER);
        self.bytes.push(is_signer as u8);
        self.bytes.push(is_writable as u8);
        self.bytes.push(account.executable as u8);
        self.bytes.extend_from_slice(&[0; 4]);
        self.bytes.extend_from_slice(account.key.as_ref());
        self.bytes.extend_from_slice(account.owner.as_ref());
        self.bytes.extend_from_slice(&account.lamports.to_le_bytes());
        self.bytes
            .extend_from_slice(&(account.data.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(&account.data);
        self.bytes
            .resize(self.bytes.len() + MAX_PERMITTED_DATA_INCREASE, 0);
        self.bytes.resize(
            self.bytes.len().next_multiple_of(BPF_ALIGN_OF_U128),
            0,
        );
        self.bytes
            .extend_from_slice(&account.rent_epoch.to_le_bytes());
        self
    }

    /// Appends a duplicate marker pointing at account `index`.
    pub fn duplicate(mut self, index: u8) -> Self {
        self.bytes.push(index);
        self.bytes.extend_from_slice(&[0; 7]);
        self
    }

    pub fn finish(mut self, instruction_data: &[u8], program_id: &Pubkey) -> InputBuffer {
        self.bytes
            .extend_from_slice(&(instruction_data.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(instruction_data);
        self.bytes.extend_from_slice(program_id.as_ref());
        InputBuffer::from_bytes(&self.bytes, self.records)
    }
}

/// Serializes `instruction` and the accounts it names.
///
/// A key named more than once is written in full at its first position and as
/// a duplicate marker after that. Its signer and writable flags are the union
/// over every position that names it.
///
/// # Errors
/// * `MissingAccount` - a named key has no entry in `accounts`
/// * `Program(InvalidArgument)` - a duplicate would need an index above 255
pub fn serialize_parameters(
    instruction: &Instruction,
    accounts: &[TestAccount],
) -> Result<InputBuffer, TestSdkError> {
    let metas = &instruction.accounts;
    let mut builder = InputBuilder::new(metas.len() as u64);

    for (position, meta) in metas.iter().enumerate() {
        if let Some(first) = metas[..position]
            .iter()
            .position(|earlier| earlier.pubkey == meta.pubkey)
        {
            let index = u8::try_from(first).map_err(|_| ProgramError::InvalidArgument)?;
            builder = builder.duplicate(index);
            continue;
        }

        let account = accounts
            .iter()
            .find(|account| account.key == meta.pubkey)
            .ok_or(TestSdkError::MissingAccount(meta.pubkey))?;
        let (is_signer, is_writable) = privileges(metas, &meta.pubkey);
        builder = builder.account(account, is_signer, is_writable);
    }

    Ok(builder.finish(&instruction.data, &instruction.program_id))
}

/// Signer and writable flags of `key`, merged over every meta naming it.
pub(crate) fn privileges(metas: &[AccountMeta], key: &Pubkey) -> (bool, bool) {
    metas
        .iter()
        .filter(|meta| meta.pubkey == *key)
        .fold((false, false), |(is_signer, is_writable), meta| {
            (is_signer || meta.is_signer, is_writable || meta.is_writable)
        })
}
