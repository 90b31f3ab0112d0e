/// Limits the mock runtime enforces on nested invocations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Deepest call stack allowed, the top-level instruction counting as 1.
    pub max_invoke_stack_height: usize,
    /// Most account infos a program may pass to one invocation.
    pub max_cpi_account_infos: usize,
    /// Largest instruction data a program may pass to one invocation.
    pub max_cpi_instruction_data_len: usize,
}

impl RuntimeConfig {
    pub fn mainnet() -> Self {
        Self {
            max_invoke_stack_height: 5,
            max_cpi_account_infos: 128,
            max_cpi_instruction_data_len: 10 * 1024,
        }
    }

    /// Limits from before the loosened CPI rules.
    pub fn legacy() -> Self {
        Self {
            max_invoke_stack_height: 4,
            max_cpi_account_infos: 64,
            max_cpi_instruction_data_len: 1280,
        }
    }

    pub fn with_max_invoke_stack_height(mut self, height: usize) -> Self {
        self.max_invoke_stack_height = height;
        self
    }

    pub fn with_max_cpi_account_infos(mut self, count: usize) -> Self {
        self.max_cpi_account_infos = count;
        self
    }

    pub fn with_max_cpi_instruction_data_len(mut self, len: usize) -> Self {
        self.max_cpi_instruction_data_len = len;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
