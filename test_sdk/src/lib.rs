/*!
# SBF Test SDK
Host-side tooling for exercising programs built on `sbf_program` without a
validator.
## Features
- Loader input serialization, including duplicate-account markers
- A low-level input builder for malformed buffers
- A mock runtime that runs registered programs, services nested invocations,
  program-derived signers and return data, and records program logs
- `tracing` subscriber setup for tests
## Usage
```rust,ignore
use sbf_test_sdk::{input::TestAccount, runtime::MockRuntime};

let runtime = MockRuntime::default();
runtime.add_program(program_id, process_instruction);
let result = runtime.process_instruction(&instruction, &mut accounts)?;
assert!(result.is_ok());
```
*/

pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod runtime;

pub use error::TestSdkError;
pub use input::{serialize_parameters, InputBuffer, InputBuilder, SerializedAccount, TestAccount};
pub use runtime::{create_program_address, InstructionResult, MockRuntime, RuntimeGuard};
