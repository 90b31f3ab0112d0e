//! A single-threaded stand-in for the host that runs SBF programs.
//!
//! Programs are registered as plain [`ProcessInstruction`] functions and run
//! against a serialized input buffer, exactly as the entrypoint would see it
//! on-chain. While an instruction runs, the runtime is installed as the
//! thread's [`SyscallStubs`], so logs, return data and nested invocations made
//! by the program are serviced here.
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use anyhow::anyhow;
use sbf_program::{
    account::AccountInfo,
    entrypoint::{process_entrypoint, ProcessInstruction, ProgramResult, SUCCESS},
    instruction::Instruction,
    program::ReturnData,
    program_error::ProgramError,
    program_stubs::{set_syscall_stubs, SyscallStubs},
    pubkey::Pubkey,
};
use tracing::{debug, info};

use crate::{
    config::RuntimeConfig,
    error::TestSdkError,
    input::{privileges, serialize_parameters, InputBuffer, TestAccount},
};

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Outcome of a top-level instruction.
#[derive(Debug)]
pub struct InstructionResult {
    pub program_result: ProgramResult,
    /// Return data left behind by the last program that set it.
    pub return_data: Option<ReturnData>,
    /// Every log line, including the runtime's own invoke/success lines.
    pub logs: Vec<String>,
}

impl InstructionResult {
    pub fn is_ok(&self) -> bool {
        self.program_result.is_ok()
    }
}

/// Derives the address a program signs for with `seeds`.
///
/// The address is `sha256(seeds || program_id || "ProgramDerivedAddress")`.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Pubkey, TestSdkError> {
    let mut preimage = Vec::new();
    for seed in seeds {
        preimage.extend_from_slice(seed);
    }
    preimage.extend_from_slice(program_id.as_ref());
    preimage.extend_from_slice(PDA_MARKER);

    let hash = hex::decode(sha256::digest(preimage)).map_err(anyhow::Error::from)?;
    Ok(Pubkey::from_slice(&hash))
}

/// Puts the previously installed syscall stubs back when dropped.
pub struct RuntimeGuard {
    previous: Option<Rc<dyn SyscallStubs>>,
}

impl RuntimeGuard {
    pub fn install(stubs: Rc<dyn SyscallStubs>) -> Self {
        Self {
            previous: Some(set_syscall_stubs(stubs)),
        }
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_syscall_stubs(previous);
        }
    }
}

#[derive(Default)]
pub struct MockRuntime {
    state: Rc<RuntimeState>,
}

impl MockRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state: Rc::new(RuntimeState {
                config,
                ..Default::default()
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.state.config
    }

    /// Registers `entrypoint` as the program at `program_id`, replacing any
    /// program already there.
    pub fn add_program(&self, program_id: Pubkey, entrypoint: ProcessInstruction) {
        self.state
            .programs
            .borrow_mut()
            .insert(program_id, entrypoint);
    }

    /// Runs `instruction` as a top-level instruction.
    ///
    /// Changes to writable accounts are stored back into `accounts` when the
    /// program succeeds. A failed program leaves `accounts` untouched.
    ///
    /// # Errors
    /// Returns an error only when the instruction cannot be started: the
    /// program is not registered or a named account is missing. Program
    /// failures are reported in [`InstructionResult::program_result`].
    pub fn process_instruction(
        &self,
        instruction: &Instruction,
        accounts: &mut [TestAccount],
    ) -> Result<InstructionResult, TestSdkError> {
        let _guard = RuntimeGuard::install(self.state.clone());
        self.state.logs.borrow_mut().clear();
        self.state.return_data.borrow_mut().take();
        self.state.call_stack.borrow_mut().clear();

        let program_result = self.state.execute(instruction, accounts)?;

        Ok(InstructionResult {
            program_result,
            return_data: self.state.return_data.borrow().clone(),
            logs: self.state.logs.take(),
        })
    }
}

#[derive(Default)]
struct RuntimeState {
    config: RuntimeConfig,
    programs: RefCell<HashMap<Pubkey, ProcessInstruction>>,
    call_stack: RefCell<Vec<Pubkey>>,
    return_data: RefCell<Option<ReturnData>>,
    logs: RefCell<Vec<String>>,
}

impl RuntimeState {
    fn log(&self, line: String) {
        info!(target: "sbf_test_sdk::runtime", "{line}");
        self.logs.borrow_mut().push(line);
    }

    fn current_program(&self) -> Option<Pubkey> {
        self.call_stack.borrow().last().copied()
    }

    /// Runs the program `instruction` names over a fresh input buffer and
    /// stores the changes it made back into `accounts`.
    fn execute(
        &self,
        instruction: &Instruction,
        accounts: &mut [TestAccount],
    ) -> Result<ProgramResult, TestSdkError> {
        let program_id = instruction.program_id;
        let entrypoint = *self
            .programs
            .borrow()
            .get(&program_id)
            .ok_or(TestSdkError::UnknownProgram(program_id))?;
        let mut input = serialize_parameters(instruction, accounts)?;

        self.return_data.borrow_mut().take();
        let height = {
            let mut call_stack = self.call_stack.borrow_mut();
            call_stack.push(program_id);
            call_stack.len()
        };
        self.log(format!("Program {program_id} invoke [{height}]"));

        let code = process_entrypoint(input.as_mut_slice(), entrypoint);
        self.call_stack.borrow_mut().pop();

        let result = match code {
            SUCCESS => store_accounts(&input, accounts),
            code => Err(ProgramError::from(code)),
        };
        match &result {
            Ok(()) => self.log(format!("Program {program_id} success")),
            Err(error) => self.log(format!("Program {program_id} failed: {error}")),
        }
        Ok(result)
    }

    fn invoke(
        &self,
        instruction: &Instruction,
        account_infos: &[AccountInfo],
        signers_seeds: &[&[&[u8]]],
    ) -> Result<(), TestSdkError> {
        let caller = self
            .current_program()
            .ok_or_else(|| anyhow!("invoke outside of a running program"))?;

        let config = &self.config;
        let height = self.call_stack.borrow().len();
        if height >= config.max_invoke_stack_height {
            return Err(anyhow!(
                "invocation depth {} exceeds the limit of {}",
                height + 1,
                config.max_invoke_stack_height
            )
            .into());
        }
        if account_infos.len() > config.max_cpi_account_infos {
            return Err(anyhow!(
                "{} account infos exceed the limit of {}",
                account_infos.len(),
                config.max_cpi_account_infos
            )
            .into());
        }
        if instruction.data.len() > config.max_cpi_instruction_data_len {
            return Err(anyhow!(
                "instruction data of {} bytes exceeds the limit of {}",
                instruction.data.len(),
                config.max_cpi_instruction_data_len
            )
            .into());
        }

        let signers = signers_seeds
            .iter()
            .map(|seeds| create_program_address(seeds, &caller))
            .collect::<Result<Vec<_>, _>>()?;

        let mut accounts: Vec<TestAccount> = Vec::new();
        for meta in &instruction.accounts {
            let info = find_info(account_infos, &meta.pubkey)?;
            if meta.is_writable && !info.is_writable {
                return Err(anyhow!("{}'s writable privilege escalated", meta.pubkey).into());
            }
            if meta.is_signer && !info.is_signer && !signers.contains(&meta.pubkey) {
                return Err(anyhow!("{}'s signer privilege escalated", meta.pubkey).into());
            }
            if accounts.iter().any(|account| account.key == meta.pubkey) {
                continue;
            }
            accounts.push(TestAccount {
                key: *info.key,
                owner: *info.owner,
                lamports: info.try_lamports()?,
                data: info.try_borrow_data()?.to_vec(),
                executable: info.is_executable,
                rent_epoch: info.rent_epoch,
            });
        }

        self.execute(instruction, &mut accounts)??;

        for account in &accounts {
            if !privileges(&instruction.accounts, &account.key).1 {
                continue;
            }
            let info = find_info(account_infos, &account.key)?;
            **info.try_borrow_mut_lamports()? = account.lamports;
            if info.data_len() != account.data.len() {
                info.realloc(account.data.len(), false)?;
            }
            info.try_borrow_mut_data()?.copy_from_slice(&account.data);
        }
        Ok(())
    }
}

impl SyscallStubs for RuntimeState {
    fn sol_log(&self, message: &str) {
        self.log(format!("Program log: {message}"));
    }

    fn sol_log_compute_units(&self) {
        self.log("Program consumption: unmetered".to_string());
    }

    fn sol_invoke_signed(
        &self,
        instruction: &Instruction,
        account_infos: &[AccountInfo],
        signers_seeds: &[&[&[u8]]],
    ) -> ProgramResult {
        self.invoke(instruction, account_infos, signers_seeds)
            .map_err(|error| {
                debug!(target: "sbf_test_sdk::runtime", "invoke of {} failed: {error}", instruction.program_id);
                if !matches!(error, TestSdkError::Program(_)) {
                    self.log(format!("Program {} invoke refused: {error}", instruction.program_id));
                }
                ProgramError::CrossProgramInvocationFailed
            })
    }

    fn sol_set_return_data(&self, data: &[u8]) {
        let program_id = self.current_program().unwrap_or_default();
        *self.return_data.borrow_mut() =
            (!data.is_empty()).then(|| ReturnData::new(program_id, data));
    }

    fn sol_get_return_data(&self) -> Option<ReturnData> {
        self.return_data.borrow().clone()
    }

    fn sol_get_stack_height(&self) -> u64 {
        self.call_stack.borrow().len() as u64
    }
}

fn find_info<'a, 'b>(
    account_infos: &'a [AccountInfo<'b>],
    key: &Pubkey,
) -> Result<&'a AccountInfo<'b>, TestSdkError> {
    account_infos
        .iter()
        .find(|info| info.key == key)
        .ok_or(TestSdkError::MissingAccount(*key))
}

/// Copies the accounts a finished program left in `input` into `accounts`.
///
/// Nothing is stored if a read-only account was changed.
fn store_accounts(input: &InputBuffer, accounts: &mut [TestAccount]) -> ProgramResult {
    let serialized = input.accounts()?;

    for account in serialized.iter().filter(|account| !account.is_writable) {
        let stored = accounts
            .iter()
            .find(|stored| stored.key == account.key)
            .ok_or(ProgramError::NotEnoughAccountKeys)?;
        if account.lamports != stored.lamports || account.data != &stored.data[..] {
            return Err(ProgramError::InvalidAccountData);
        }
    }

    for account in serialized.iter().filter(|account| account.is_writable) {
        let stored = accounts
            .iter_mut()
            .find(|stored| stored.key == account.key)
            .ok_or(ProgramError::NotEnoughAccountKeys)?;
        stored.lamports = account.lamports;
        stored.data = account.data.to_vec();
    }
    Ok(())
}
