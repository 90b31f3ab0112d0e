//! Forward-only walk over the loader's input buffer.
use std::mem::{size_of, take};

use crate::program_error::ProgramError;

/// Zero-copy cursor over the serialized program input.
///
/// Every region handed out by [`Cursor::take`] is a disjoint `&'a mut [u8]`
/// split off the front of the remaining input, so the caller can keep
/// mutable views of several accounts alive at once without copying and
/// without raw pointers. Reads past the end of the input return
/// `InvalidArgument` instead of panicking.
#[derive(Debug)]
pub struct Cursor<'a> {
    remaining: &'a mut [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a mut [u8]) -> Self {
        Self {
            remaining: input,
            offset: 0,
        }
    }

    /// Bytes consumed since the start of the input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Splits the next `len` bytes off the input.
    pub fn take(&mut self, len: usize) -> Result<&'a mut [u8], ProgramError> {
        if len > self.remaining.len() {
            return Err(ProgramError::InvalidArgument);
        }
        let (head, tail) = take(&mut self.remaining).split_at_mut(len);
        self.remaining = tail;
        self.offset += len;
        Ok(head)
    }

    /// Splits the next `N` bytes off the input as a fixed-size array.
    pub fn take_array<const N: usize>(&mut self) -> Result<&'a mut [u8; N], ProgramError> {
        self.take(N)?
            .try_into()
            .map_err(|_| ProgramError::InvalidArgument)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ProgramError> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProgramError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, ProgramError> {
        Ok(u64::from_le_bytes(*self.take_array::<{ size_of::<u64>() }>()?))
    }

    /// Skips the padding needed to bring the offset to a multiple of `align`.
    ///
    /// Alignment is measured from the start of the input, which the loader
    /// places on an 8-byte boundary.
    pub fn align(&mut self, align: usize) -> Result<(), ProgramError> {
        debug_assert!(align.is_power_of_two());
        let padding = self.offset.wrapping_neg() & (align - 1);
        self.skip(padding)
    }

    /// Gives up the cursor, returning whatever was not consumed.
    pub fn into_remaining(self) -> &'a mut [u8] {
        self.remaining
    }
}
