//! Debug-formatting of account data.

use std::{cmp, fmt};

pub(crate) const MAX_DEBUG_ACCOUNT_DATA: usize = 64;

/// Adds a hex preview of at most the first 64 bytes of `data` to a debug struct.
pub(crate) fn debug_account_data(data: &[u8], f: &mut fmt::DebugStruct<'_, '_>) {
    let data_len = cmp::min(MAX_DEBUG_ACCOUNT_DATA, data.len());
    if data_len > 0 {
        f.field("data", &Hex(&data[..data_len]));
    }
}

pub(crate) struct Hex<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
