//! Host syscalls available to programs running in the virtual machine.
use crate::pubkey::Pubkey;

extern "C" {
    pub fn sol_log_(message: *const u8, len: u64);
    pub fn sol_log_64_(arg1: u64, arg2: u64, arg3: u64, arg4: u64, arg5: u64);
    pub fn sol_log_data(data: *const u8, data_len: u64);
    pub fn sol_log_compute_units_();

    /// Invokes the instruction at `instruction_addr` with the C-ABI forms
    /// from [`stable_layout`](crate::stable_layout). Returns 0 on success.
    pub fn sol_invoke_signed_c(
        instruction_addr: *const u8,
        account_infos_addr: *const u8,
        account_infos_len: u64,
        signers_seeds_addr: *const u8,
        signers_seeds_len: u64,
    ) -> u64;

    pub fn sol_set_return_data(data: *const u8, length: u64);
    /// Copies up to `length` bytes of return data and returns the full size available.
    pub fn sol_get_return_data(data: *mut u8, length: u64, program_id: *mut Pubkey) -> u64;
    pub fn sol_get_stack_height() -> u64;
}
