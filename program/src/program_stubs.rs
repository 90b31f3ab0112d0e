//! Host-side stand-ins for the syscalls a program makes on-chain.
//!
//! Off-chain builds route logging, cross-program invocation and return data
//! through the [`SyscallStubs`] installed on the current thread. The default
//! stubs log through `tracing`, refuse every invocation and keep return data
//! in memory; test harnesses install their own with [`set_syscall_stubs`].

use std::{cell::RefCell, rc::Rc};

use crate::{
    account::AccountInfo,
    entrypoint::ProgramResult,
    instruction::Instruction,
    program::{ReturnData, TRANSACTION_LEVEL_STACK_HEIGHT},
    program_error::ProgramError,
    pubkey::Pubkey,
};

thread_local! {
    static SYSCALL_STUBS: RefCell<Rc<dyn SyscallStubs>> =
        RefCell::new(Rc::new(DefaultSyscallStubs::default()) as Rc<dyn SyscallStubs>);
}

/// Installs `syscall_stubs` for the current thread, returning the previous ones.
pub fn set_syscall_stubs(syscall_stubs: Rc<dyn SyscallStubs>) -> Rc<dyn SyscallStubs> {
    SYSCALL_STUBS.with(|stubs| stubs.replace(syscall_stubs))
}

/// Stubs are cloned out before each call so an implementation may re-enter
/// the program (and so these functions) while servicing an invoke.
fn syscall_stubs() -> Rc<dyn SyscallStubs> {
    SYSCALL_STUBS.with(|stubs| stubs.borrow().clone())
}

pub trait SyscallStubs {
    fn sol_log(&self, message: &str) {
        tracing::info!(target: "sbf_program::log", "Program log: {message}");
    }

    fn sol_log_64(&self, arg1: u64, arg2: u64, arg3: u64, arg4: u64, arg5: u64) {
        self.sol_log(&format!(
            "{arg1:#x}, {arg2:#x}, {arg3:#x}, {arg4:#x}, {arg5:#x}"
        ));
    }

    fn sol_log_data(&self, data: &[&[u8]]) {
        let fields: Vec<String> = data.iter().map(hex::encode).collect();
        self.sol_log(&format!("data: {}", fields.join(" ")));
    }

    fn sol_log_compute_units(&self) {
        self.sol_log("SyscallStubs: sol_log_compute_units() not available");
    }

    fn sol_invoke_signed(
        &self,
        _instruction: &Instruction,
        _account_infos: &[AccountInfo],
        _signers_seeds: &[&[&[u8]]],
    ) -> ProgramResult {
        Err(ProgramError::CrossProgramInvocationFailed)
    }

    fn sol_set_return_data(&self, _data: &[u8]) {}

    fn sol_get_return_data(&self) -> Option<ReturnData> {
        None
    }

    fn sol_get_stack_height(&self) -> u64 {
        TRANSACTION_LEVEL_STACK_HEIGHT as u64
    }
}

/// The stubs every thread starts with.
#[derive(Default)]
pub struct DefaultSyscallStubs {
    return_data: RefCell<Option<ReturnData>>,
}

impl SyscallStubs for DefaultSyscallStubs {
    fn sol_set_return_data(&self, data: &[u8]) {
        *self.return_data.borrow_mut() =
            (!data.is_empty()).then(|| ReturnData::new(Pubkey::default(), data));
    }

    fn sol_get_return_data(&self) -> Option<ReturnData> {
        self.return_data.borrow().clone()
    }
}

macro_rules! define_stub {
    (fn $name:ident($($arg:ident: $typ:ty),*) -> $ret:ty) => {
        pub(crate) fn $name($($arg: $typ),*) -> $ret {
            syscall_stubs().$name($($arg),*)
        }
    };

    (fn $name:ident($($arg:ident: $typ:ty),*)) => {
        define_stub!(fn $name($($arg: $typ),*) -> ());
    };
}

define_stub!(fn sol_log(message: &str));
define_stub!(fn sol_log_64(arg1: u64, arg2: u64, arg3: u64, arg4: u64, arg5: u64));
define_stub!(fn sol_log_data(data: &[&[u8]]));
define_stub!(fn sol_log_compute_units());
define_stub!(fn sol_invoke_signed(instruction: &Instruction, account_infos: &[AccountInfo], signers_seeds: &[&[&[u8]]]) -> ProgramResult);
define_stub!(fn sol_set_return_data(data: &[u8]));
define_stub!(fn sol_get_return_data() -> Option<ReturnData>);
define_stub!(fn sol_get_stack_height() -> u64);
