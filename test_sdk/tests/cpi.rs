//! Nested invocations: return data, program-derived signers, depth limits,
//! duplicate accounts and in-place resizing across the call boundary.
use borsh::{BorshDeserialize, BorshSerialize};
use sbf_program::{
    account::{next_account_info, AccountInfo, AccountMeta},
    entrypoint::{ProgramResult, MAX_PERMITTED_DATA_INCREASE},
    get_return_data, get_stack_height,
    instruction::Instruction,
    invoke, invoke_signed, msg,
    program::{get_return_data_into, MAX_RETURN_DATA},
    program_error::ProgramError,
    pubkey::Pubkey,
    set_return_data,
};
use sbf_test_sdk::{
    config::RuntimeConfig, create_program_address, logging::init_logging, InstructionResult,
    MockRuntime, TestAccount,
};

mod common;
use common::{system_program, system_program_account, transfer, SYSTEM_PROGRAM_ID};

#[derive(BorshSerialize, BorshDeserialize)]
enum Command {
    /// Invoke `callee` with `payload` and report the return data it left.
    Echo { callee: Pubkey, payload: Vec<u8> },
    /// Invoke this program again until `depth` reaches zero.
    Recurse { depth: u8 },
    /// Ask `callee` to resize the first account to `len` bytes.
    Grow { callee: Pubkey, len: u32 },
    /// Move lamports out of an address this program signs for.
    SignedTransfer { seeds: Vec<Vec<u8>>, lamports: u64 },
    /// Check aliasing of a repeated account, then pass it on twice.
    Alias { callee: Pubkey },
}

fn caller_program(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let command =
        Command::try_from_slice(instruction_data).map_err(|_| ProgramError::InvalidInstructionData)?;
    let accounts_iter = &mut accounts.iter();

    match command {
        Command::Echo { callee, payload } => {
            if get_return_data().is_some() {
                return Err(ProgramError::Custom(10));
            }
            set_return_data(b"stale");
            invoke(&Instruction::new_with_bytes(callee, &payload, vec![]), &[])?;

            match get_return_data() {
                Some(return_data) => {
                    msg!("{} bytes from {}", return_data.len(), return_data.program_id());
                    let mut head = [0u8; 4];
                    let (program_id, copied) =
                        get_return_data_into(&mut head).ok_or(ProgramError::Custom(11))?;
                    msg!("head {:?} from {}", &head[..copied], program_id);
                }
                None => msg!("no return data"),
            }
        }
        Command::Recurse { depth } => {
            msg!("height {}", get_stack_height());
            if depth > 0 {
                let next = Instruction::new_with_borsh(
                    *program_id,
                    &Command::Recurse { depth: depth - 1 },
                    vec![],
                )?;
                invoke(&next, &[])?;
            }
        }
        Command::Grow { callee, len } => {
            let account = next_account_info(accounts_iter)?;
            let grow = Instruction::new_with_bytes(
                callee,
                &len.to_le_bytes(),
                vec![AccountMeta::writable(*account.key)],
            );
            invoke(&grow, &[account.clone()])?;
            msg!("caller sees {} bytes", account.data_len());
        }
        Command::SignedTransfer { seeds, lamports } => {
            let vault = next_account_info(accounts_iter)?;
            let destination = next_account_info(accounts_iter)?;
            let seeds: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
            invoke_signed(
                &transfer(vault.key, destination.key, lamports)?,
                &[vault.clone(), destination.clone()],
                &[seeds.as_slice()],
            )?;
        }
        Command::Alias { callee } => {
            if accounts.len() != 3
                || !accounts[1].is_alias_of(&accounts[0])
                || accounts[2].is_alias_of(&accounts[0])
            {
                return Err(ProgramError::Custom(20));
            }
            accounts[1].try_borrow_mut_data()?[0] = 9;
            if accounts[0].try_borrow_data()?[0] != 9 || accounts[2].try_borrow_data()?[0] == 9 {
                return Err(ProgramError::Custom(21));
            }

            let key = *accounts[0].key;
            let inspect = Instruction::new_with_bytes(
                callee,
                &[],
                vec![AccountMeta::readonly(key), AccountMeta::writable(key)],
            );
            invoke(&inspect, &accounts[..1])?;
        }
    }
    Ok(())
}

fn echo_program(_: &Pubkey, _: &[AccountInfo], instruction_data: &[u8]) -> ProgramResult {
    msg!("echo at height {}", get_stack_height());
    set_return_data(instruction_data);
    Ok(())
}

fn grow_program(_: &Pubkey, accounts: &[AccountInfo], instruction_data: &[u8]) -> ProgramResult {
    let len: [u8; 4] = instruction_data
        .try_into()
        .map_err(|_| ProgramError::InvalidInstructionData)?;
    let account = next_account_info(&mut accounts.iter())?;
    account.realloc(u32::from_le_bytes(len) as usize, true)?;
    account.try_borrow_mut_data()?.fill(0xab);
    Ok(())
}

fn inspect_program(_: &Pubkey, accounts: &[AccountInfo], _: &[u8]) -> ProgramResult {
    if accounts.len() != 2 || !accounts[1].is_alias_of(&accounts[0]) {
        return Err(ProgramError::Custom(30));
    }
    // Flags are merged over every slot naming the account.
    if !accounts[0].is_writable {
        return Err(ProgramError::Custom(31));
    }
    accounts[0].try_borrow_mut_data()?[1] += 1;
    Ok(())
}

struct Fixture {
    runtime: MockRuntime,
    caller: Pubkey,
    echo: Pubkey,
    grow: Pubkey,
    inspect: Pubkey,
}

fn setup(config: RuntimeConfig) -> Fixture {
    init_logging();
    let runtime = MockRuntime::new(config);
    let fixture = Fixture {
        runtime,
        caller: Pubkey::new_unique(),
        echo: Pubkey::new_unique(),
        grow: Pubkey::new_unique(),
        inspect: Pubkey::new_unique(),
    };
    fixture.runtime.add_program(fixture.caller, caller_program);
    fixture.runtime.add_program(fixture.echo, echo_program);
    fixture.runtime.add_program(fixture.grow, grow_program);
    fixture.runtime.add_program(fixture.inspect, inspect_program);
    fixture.runtime.add_program(SYSTEM_PROGRAM_ID, system_program);
    fixture
}

impl Fixture {
    fn run(
        &self,
        command: &Command,
        metas: Vec<AccountMeta>,
        accounts: &mut [TestAccount],
    ) -> InstructionResult {
        let instruction = Instruction::new_with_borsh(self.caller, command, metas).unwrap();
        self.runtime
            .process_instruction(&instruction, accounts)
            .unwrap()
    }

    fn echo(&self, payload: Vec<u8>) -> InstructionResult {
        let command = Command::Echo {
            callee: self.echo,
            payload,
        };
        self.run(&command, vec![], &mut [])
    }
}

#[test]
fn test_return_data_from_callee() {
    let fixture = setup(RuntimeConfig::default());
    let result = fixture.echo(b"0123456789".to_vec());

    assert!(result.is_ok(), "{:?}", result.logs);
    let echo = fixture.echo;
    assert!(result
        .logs
        .contains(&"Program log: echo at height 2".to_string()));
    assert!(result
        .logs
        .contains(&format!("Program log: 10 bytes from {echo}")));
    assert!(result
        .logs
        .contains(&format!("Program log: head [48, 49, 50, 51] from {echo}")));

    let return_data = result.return_data.unwrap();
    assert_eq!(return_data.program_id(), &echo);
    assert_eq!(return_data.as_slice(), b"0123456789");
}

#[test]
fn test_return_data_is_truncated_across_invoke() {
    let fixture = setup(RuntimeConfig::default());
    let payload: Vec<u8> = (0..MAX_RETURN_DATA + 300).map(|i| i as u8).collect();
    let result = fixture.echo(payload.clone());

    assert!(result.is_ok(), "{:?}", result.logs);
    assert!(result
        .logs
        .contains(&format!("Program log: {MAX_RETURN_DATA} bytes from {}", fixture.echo)));
    assert_eq!(
        result.return_data.unwrap().as_slice(),
        &payload[..MAX_RETURN_DATA]
    );
}

#[test]
fn test_return_data_is_cleared_by_invoke() {
    let fixture = setup(RuntimeConfig::default());
    let result = fixture.echo(vec![]);

    assert!(result.is_ok(), "{:?}", result.logs);
    assert!(result.logs.contains(&"Program log: no return data".to_string()));
    assert!(result.return_data.is_none());
}

#[test]
fn test_instruction_data_limit() {
    let fixture = setup(RuntimeConfig::legacy().with_max_cpi_instruction_data_len(4));

    assert!(fixture.echo(vec![1; 4]).is_ok());
    let result = fixture.echo(vec![1; 5]);
    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    // The callee never started, so the caller's data is still there.
    let return_data = result.return_data.unwrap();
    assert_eq!(return_data.program_id(), &fixture.caller);
    assert_eq!(return_data.as_slice(), b"stale");
}

#[test]
fn test_invoke_unknown_program() {
    let fixture = setup(RuntimeConfig::default());
    let callee = Pubkey::new_unique();
    let command = Command::Echo {
        callee,
        payload: vec![],
    };
    let result = fixture.run(&command, vec![], &mut []);

    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    let refusal = format!("no program is registered at {callee}");
    assert!(result.logs.iter().any(|line| line.ends_with(&refusal)));
}

#[test]
fn test_stack_height_limit() {
    let config = RuntimeConfig::default();
    let max = config.max_invoke_stack_height;
    let fixture = setup(config);

    let result = fixture.run(
        &Command::Recurse {
            depth: (max - 1) as u8,
        },
        vec![],
        &mut [],
    );
    assert!(result.is_ok(), "{:?}", result.logs);
    for height in 1..=max {
        assert!(result.logs.contains(&format!("Program log: height {height}")));
    }

    let result = fixture.run(&Command::Recurse { depth: max as u8 }, vec![], &mut []);
    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    assert!(!result
        .logs
        .contains(&format!("Program log: height {}", max + 1)));
}

#[test]
fn test_callee_resize_is_visible_to_caller() {
    let fixture = setup(RuntimeConfig::default());
    let mut accounts = [TestAccount::new(Pubkey::new_unique(), 1, 4, fixture.caller)];
    let key = accounts[0].key;

    let command = Command::Grow {
        callee: fixture.grow,
        len: 100,
    };
    let result = fixture.run(&command, vec![AccountMeta::writable(key)], &mut accounts);
    assert!(result.is_ok(), "{:?}", result.logs);
    assert!(result
        .logs
        .contains(&"Program log: caller sees 100 bytes".to_string()));
    assert_eq!(accounts[0].data, vec![0xab; 100]);

    let command = Command::Grow {
        callee: fixture.grow,
        len: 10,
    };
    let result = fixture.run(&command, vec![AccountMeta::writable(key)], &mut accounts);
    assert!(result.is_ok(), "{:?}", result.logs);
    assert_eq!(accounts[0].data, vec![0xab; 10]);
}

#[test]
fn test_callee_resize_beyond_caller_headroom() {
    let fixture = setup(RuntimeConfig::default());
    let mut accounts = [TestAccount::new(Pubkey::new_unique(), 1, 0, fixture.caller)];
    let key = accounts[0].key;

    let command = Command::Grow {
        callee: fixture.grow,
        len: (MAX_PERMITTED_DATA_INCREASE + 1) as u32,
    };
    let result = fixture.run(&command, vec![AccountMeta::writable(key)], &mut accounts);
    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    assert!(accounts[0].data.is_empty());
}

#[test]
fn test_readonly_account_cannot_be_passed_writable() {
    let fixture = setup(RuntimeConfig::default());
    let original = TestAccount::new(Pubkey::new_unique(), 1, 4, fixture.caller);
    let mut accounts = [original.clone()];

    let command = Command::Grow {
        callee: fixture.grow,
        len: 8,
    };
    let result = fixture.run(
        &command,
        vec![AccountMeta::readonly(original.key)],
        &mut accounts,
    );
    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    let escalation = format!("{}'s writable privilege escalated", original.key);
    assert!(result.logs.iter().any(|line| line.ends_with(&escalation)));
    assert_eq!(accounts[0], original);
}

#[test]
fn test_program_derived_signer() {
    let fixture = setup(RuntimeConfig::default());
    let seeds = vec![b"vault".to_vec(), vec![7]];
    let seed_refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    let vault = create_program_address(&seed_refs, &fixture.caller).unwrap();

    let mut accounts = [
        TestAccount::new(vault, 1_000, 0, SYSTEM_PROGRAM_ID),
        TestAccount::new(Pubkey::new_unique(), 0, 0, SYSTEM_PROGRAM_ID),
        system_program_account(),
    ];
    let metas = vec![
        AccountMeta::writable(vault),
        AccountMeta::writable(accounts[1].key),
        AccountMeta::readonly(SYSTEM_PROGRAM_ID),
    ];

    let command = Command::SignedTransfer {
        seeds: seeds.clone(),
        lamports: 400,
    };
    let result = fixture.run(&command, metas.clone(), &mut accounts);
    assert!(result.is_ok(), "{:?}", result.logs);
    assert_eq!(accounts[0].lamports, 600);
    assert_eq!(accounts[1].lamports, 400);

    let command = Command::SignedTransfer {
        seeds: vec![b"vault".to_vec(), vec![8]],
        lamports: 400,
    };
    let result = fixture.run(&command, metas, &mut accounts);
    assert_eq!(
        result.program_result,
        Err(ProgramError::CrossProgramInvocationFailed)
    );
    assert_eq!(accounts[0].lamports, 600);
}

#[test]
fn test_duplicate_accounts_alias() {
    let fixture = setup(RuntimeConfig::default());
    let mut accounts = [
        TestAccount::new(Pubkey::new_unique(), 1, 2, fixture.caller),
        TestAccount::new(Pubkey::new_unique(), 1, 2, fixture.caller),
    ];
    let (a, b) = (accounts[0].key, accounts[1].key);

    let command = Command::Alias {
        callee: fixture.inspect,
    };
    let result = fixture.run(
        &command,
        vec![
            AccountMeta::writable(a),
            AccountMeta::readonly(a),
            AccountMeta::writable(b),
        ],
        &mut accounts,
    );

    assert!(result.is_ok(), "{:?}", result.logs);
    assert_eq!(accounts[0].data, vec![9, 1]);
    assert_eq!(accounts[1].data, vec![0, 0]);
}
