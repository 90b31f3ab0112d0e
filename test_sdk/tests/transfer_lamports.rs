//! A program that moves lamports by invoking a system program.
use sbf_program::{
    account::{next_account_info, AccountInfo, AccountMeta},
    entrypoint::ProgramResult,
    instruction::Instruction,
    invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
};
use sbf_test_sdk::{logging::init_logging, InstructionResult, MockRuntime, TestAccount};

mod common;
use common::{system_program, system_program_account, transfer, SYSTEM_PROGRAM_ID};

const INSTRUCTION_TRANSFER: u8 = 0;

fn transfer_program(
    _program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let (&tag, amount) = instruction_data
        .split_first()
        .ok_or(ProgramError::InvalidInstructionData)?;
    if tag != INSTRUCTION_TRANSFER {
        return Err(ProgramError::InvalidInstructionData);
    }
    let amount: [u8; 8] = amount
        .try_into()
        .map_err(|_| ProgramError::InvalidInstructionData)?;
    let lamports = u64::from_le_bytes(amount);

    let accounts_iter = &mut accounts.iter();
    let source = next_account_info(accounts_iter)?;
    let destination = next_account_info(accounts_iter)?;
    let system = next_account_info(accounts_iter)?;
    if *system.key != SYSTEM_PROGRAM_ID {
        return Err(ProgramError::IncorrectProgramId);
    }

    invoke(
        &transfer(source.key, destination.key, lamports)?,
        &[source.clone(), destination.clone()],
    )
}

fn build_transfer_data(amount: u64) -> Vec<u8> {
    let mut data = vec![INSTRUCTION_TRANSFER];
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

struct Fixture {
    runtime: MockRuntime,
    program_id: Pubkey,
    accounts: [TestAccount; 3],
}

fn setup(source_lamports: u64) -> Fixture {
    init_logging();
    let runtime = MockRuntime::default();
    let program_id = Pubkey::new_unique();
    runtime.add_program(program_id, transfer_program);
    runtime.add_program(SYSTEM_PROGRAM_ID, system_program);

    Fixture {
        runtime,
        program_id,
        accounts: [
            TestAccount::new(Pubkey::new_unique(), source_lamports, 0, SYSTEM_PROGRAM_ID),
            TestAccount::new(Pubkey::new_unique(), 0, 0, SYSTEM_PROGRAM_ID),
            system_program_account(),
        ],
    }
}

impl Fixture {
    fn transfer(&mut self, amount: u64, source_signs: bool) -> InstructionResult {
        self.run(&build_transfer_data(amount), source_signs)
    }

    fn run(&mut self, data: &[u8], source_signs: bool) -> InstructionResult {
        let instruction = Instruction::new_with_bytes(
            self.program_id,
            data,
            vec![
                AccountMeta::new(self.accounts[0].key, source_signs),
                AccountMeta::writable(self.accounts[1].key),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID),
            ],
        );
        self.runtime
            .process_instruction(&instruction, &mut self.accounts)
            .unwrap()
    }
}

#[test]
fn test_transfer_via_cpi() {
    let mut fixture = setup(10_000_000_000);
    let result = fixture.transfer(1_000_000_000, true);

    assert!(result.is_ok(), "{:?}", result.logs);
    assert_eq!(fixture.accounts[0].lamports, 9_000_000_000);
    assert_eq!(fixture.accounts[1].lamports, 1_000_000_000);

    let program_id = fixture.program_id;
    assert_eq!(
        result.logs,
        vec![
            format!("Program {program_id} invoke [1]"),
            format!("Program {SYSTEM_PROGRAM_ID} invoke [2]"),
            format!("Program {SYSTEM_PROGRAM_ID} success"),
            format!("Program {program_id} success"),
        ]
    );
}

#[test]
fn test_transfer_insufficient_funds() {
    let mut fixture = setup(500);
    let result = fixture.transfer(1_000, true);

    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    assert_eq!(fixture.accounts[0].lamports, 500);
    assert_eq!(fixture.accounts[1].lamports, 0);
    assert!(result
        .logs
        .contains(&"Program log: Transfer: insufficient lamports 500, need 1000".to_string()));
    assert!(result.logs.contains(&format!(
        "Program {SYSTEM_PROGRAM_ID} failed: {}",
        ProgramError::InsufficientFunds
    )));
}

#[test]
fn test_transfer_requires_source_signature() {
    let mut fixture = setup(10_000);
    let result = fixture.transfer(1_000, false);

    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    assert_eq!(fixture.accounts[0].lamports, 10_000);
    let escalation = format!("{}'s signer privilege escalated", fixture.accounts[0].key);
    assert!(result.logs.iter().any(|line| line.ends_with(&escalation)));
    // The callee never ran.
    assert!(!result
        .logs
        .iter()
        .any(|line| line.starts_with(&format!("Program {SYSTEM_PROGRAM_ID} invoke ["))));
}

#[test]
fn test_transfer_invalid_instruction_data() {
    let mut fixture = setup(10_000);

    for data in [vec![], vec![INSTRUCTION_TRANSFER, 1, 2], vec![7; 9]] {
        let result = fixture.run(&data, true);
        assert_eq!(
            result.program_result,
            Err(ProgramError::InvalidInstructionData)
        );
    }
    assert_eq!(fixture.accounts[0].lamports, 10_000);
}
