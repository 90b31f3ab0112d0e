#![allow(unexpected_cfgs)]
/*!
# SBF Program
A Rust library for the boundary between an on-chain program and the SBF virtual
machine that runs it. This crate turns the loader's input buffer into typed,
zero-copy views of the program's accounts, instruction data and program id, and
carries outgoing calls and small results back across the syscall boundary.
## Features
- Input deserialization with duplicate-account aliasing
- Account views over the loader's buffer, with in-place resizing
- Cross-program invocation, including program-derived signers
- A bounded return-data channel
- Program error handling
- Logging utilities
- A bump allocator for the program heap
## Usage
Add this crate to your `Cargo.toml`:
```toml
[dependencies]
sbf_program = "0.1.0"
```
Then import the modules you need in your code:
```rust
use sbf_program::account::AccountInfo;
use sbf_program::pubkey::Pubkey;
use sbf_program::instruction::Instruction;
// ... other imports as needed
```
*/

// Re-export commonly used functions
pub use program::{get_return_data, get_stack_height, invoke, invoke_signed, set_return_data};

/// Account views and account descriptors
pub mod account;
/// Input deserialization into the invocation context
pub mod context;
/// Bounds-checked walk over the input buffer
pub mod cursor;
/// Utilities for debugging account data
pub mod debug_account_data;
/// Program entrypoint definitions and processing
pub mod entrypoint;
/// Instruction definitions and processing
pub mod instruction;
/// Logging functionality for on-chain programs
pub mod log;
/// Cross-program invocation and return data
pub mod program;
/// Error types for program operations
pub mod program_error;
/// Stub implementations for program interfaces
#[cfg(not(target_os = "solana"))]
pub mod program_stubs;
/// Public key definitions and operations
pub mod pubkey;
/// Stable memory layout implementations
pub mod stable_layout;
/// System call interfaces for interacting with the runtime
#[cfg(target_os = "solana")]
pub mod syscalls;

/// Maximum number of program-derived signers per invocation.
pub const MAX_SIGNERS: usize = 16;
/// Maximum number of seeds per program-derived signer.
pub const MAX_SEEDS: usize = 16;
/// Maximum length in bytes of a single seed.
pub const MAX_SEED_LEN: usize = 32;
