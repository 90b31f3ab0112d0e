//! The program entrypoint, the default heap and panic handler, and the
//! constants describing the loader's input layout.
//!
//! An on-chain program declares its instruction processor with
//! [`entrypoint!`](crate::entrypoint!):
//!
//! ```ignore
//! use sbf_program::{
//!     account::AccountInfo, entrypoint, entrypoint::ProgramResult, msg, pubkey::Pubkey,
//! };
//!
//! entrypoint!(process_instruction);
//!
//! pub fn process_instruction(
//!     program_id: &Pubkey,
//!     accounts: &[AccountInfo],
//!     instruction_data: &[u8],
//! ) -> ProgramResult {
//!     msg!("Hello from {}", program_id);
//!     Ok(())
//! }
//! ```
use std::{
    alloc::Layout,
    mem::size_of,
    ptr::{self, null_mut},
};

use crate::{account::AccountInfo, context::Context, program_error::ProgramError, pubkey::Pubkey};

pub type ProgramResult = Result<(), ProgramError>;

/// User implemented function to process an instruction
///
/// program_id: Program ID of the currently executing program accounts: Accounts
/// passed as part of the instruction instruction_data: Instruction data
pub type ProcessInstruction = fn(&Pubkey, &[AccountInfo], &[u8]) -> ProgramResult;

/// Programs indicate success with a return value of 0
pub const SUCCESS: u64 = 0;

/// Start address of the memory region used for program heap.
pub const HEAP_START_ADDRESS: u64 = 0x300000000;
/// Length of the heap memory region used for program heap.
pub const HEAP_LENGTH: usize = 32 * 1024;

/// Value used to indicate that a serialized account is not a duplicate
pub const NON_DUP_MARKER: u8 = u8::MAX;

/// Maximum number of accounts an input buffer may carry.
pub const MAX_ACCOUNTS: usize = 64;

/// Maximum number of bytes a program may add to an account during a single realloc
pub const MAX_PERMITTED_DATA_INCREASE: usize = 1_024 * 10;

/// Maximum permitted size of account data (10 MiB).
pub const MAX_PERMITTED_DATA_LENGTH: usize = 10 * 1024 * 1024;

/// `assert_eq(std::mem::align_of::<u128>(), 8)` is true for BPF but not for some host machines
pub const BPF_ALIGN_OF_U128: usize = 8;

/// Bytes of a non-duplicate account record before its data, marker included.
const ACCOUNT_HEADER_LEN: usize = 1 + 3 + 4 + 2 * size_of::<Pubkey>() + 2 * size_of::<u64>();

/// Declare the program entrypoint and set up global handlers.
///
/// The argument is the name of a [`ProcessInstruction`] function. The
/// generated `entrypoint` symbol measures the input region, deserializes it
/// into a [`Context`] and hands the parts to that function. Deserialization
/// errors are returned to the loader without calling it.
///
/// On-chain the macro also installs [`custom_heap_default!`](crate::custom_heap_default!)
/// and [`custom_panic_default!`](crate::custom_panic_default!). A program crate
/// that declares the `custom-heap` or `custom-panic` feature and enables it
/// supplies its own.
#[macro_export]
macro_rules! entrypoint {
    ($process_instruction:ident) => {
        /// # Safety
        #[no_mangle]
        pub unsafe extern "C" fn entrypoint(input: *mut u8) -> u64 {
            let len = unsafe { $crate::entrypoint::input_len(input) };
            let input = unsafe { ::core::slice::from_raw_parts_mut(input, len) };
            $crate::entrypoint::process_entrypoint(input, $process_instruction)
        }
        $crate::custom_heap_default!();
        $crate::custom_panic_default!();
    };
}

/// Installs [`BumpAllocator`] over the program heap as the global allocator.
#[macro_export]
macro_rules! custom_heap_default {
    () => {
        #[cfg(all(not(feature = "custom-heap"), target_os = "solana"))]
        #[global_allocator]
        static A: $crate::entrypoint::BumpAllocator = $crate::entrypoint::BumpAllocator {
            start: $crate::entrypoint::HEAP_START_ADDRESS as usize,
            len: $crate::entrypoint::HEAP_LENGTH,
        };
    };
}

/// Installs a panic handler that logs the panic message.
#[macro_export]
macro_rules! custom_panic_default {
    () => {
        #[cfg(all(not(feature = "custom-panic"), target_os = "solana"))]
        #[no_mangle]
        fn custom_panic(info: &core::panic::PanicInfo<'_>) {
            $crate::msg!("{}", info);
        }
    };
}

/// Deserializes `input` and runs `process_instruction` against it.
///
/// # Returns
/// [`SUCCESS`] or the encoded [`ProgramError`].
pub fn process_entrypoint(input: &mut [u8], process_instruction: ProcessInstruction) -> u64 {
    let context = match Context::load(input) {
        Ok(context) => context,
        Err(error) => return error.into(),
    };
    match process_instruction(
        context.program_id,
        context.accounts(),
        context.instruction_data,
    ) {
        Ok(()) => SUCCESS,
        Err(error) => error.into(),
    }
}

/// Measures the input region the loader placed at `input`.
///
/// Only lengths are read; flags, markers and keys are left for
/// [`Context::load`] to validate. When a declared size is out of range the
/// walk stops early and the returned length covers what was read so far, so
/// the subsequent load fails on the same field.
///
/// # Safety
/// `input` must point at a region serialized by the loader, aligned to 8
/// bytes, and valid for reads for the whole of that region.
pub unsafe fn input_len(input: *const u8) -> usize {
    let read_u64 = |offset: usize| unsafe { ptr::read_unaligned(input.add(offset) as *const u64) };

    let mut offset = 0;
    let count = u64::from_le(read_u64(offset));
    offset += size_of::<u64>();
    if count > MAX_ACCOUNTS as u64 {
        return offset;
    }

    for _ in 0..count {
        let marker = unsafe { *input.add(offset) };
        if marker != NON_DUP_MARKER {
            offset += size_of::<u64>();
            continue;
        }
        let data_len = u64::from_le(read_u64(offset + ACCOUNT_HEADER_LEN - size_of::<u64>()));
        if data_len > MAX_PERMITTED_DATA_LENGTH as u64 {
            return offset + ACCOUNT_HEADER_LEN;
        }
        offset += ACCOUNT_HEADER_LEN + data_len as usize + MAX_PERMITTED_DATA_INCREASE;
        offset += offset.wrapping_neg() & (BPF_ALIGN_OF_U128 - 1);
        offset += size_of::<u64>();
    }

    let instruction_data_len = u64::from_le(read_u64(offset));
    offset += size_of::<u64>();
    if instruction_data_len > MAX_PERMITTED_DATA_LENGTH as u64 {
        return offset;
    }
    offset + instruction_data_len as usize + size_of::<Pubkey>()
}

/// The bump allocator used as the default rust heap when running programs.
///
/// Allocates downward from the end of the region and never frees. The first
/// word of the region holds the current position. Exhaustion returns a null
/// pointer, which fallible reservations report as an allocation error.
pub struct BumpAllocator {
    pub start: usize,
    pub len: usize,
}

/// Integer arithmetic in this global allocator implementation is safe when
/// operating on the prescribed `HEAP_START_ADDRESS` and `HEAP_LENGTH`. Any
/// other use may overflow and is thus unsupported and at one's own risk.
unsafe impl std::alloc::GlobalAlloc for BumpAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let pos_ptr = self.start as *mut usize;

        let mut pos = unsafe { *pos_ptr };
        if pos == 0 {
            // First time, set starting position
            pos = self.start + self.len;
        }
        pos = pos.saturating_sub(layout.size());
        pos &= !(layout.align().wrapping_sub(1));
        if pos < self.start + size_of::<*mut u8>() {
            return null_mut();
        }
        unsafe { *pos_ptr = pos };
        pos as *mut u8
    }

    #[inline]
    unsafe fn dealloc(&self, _: *mut u8, _: Layout) {}
}
