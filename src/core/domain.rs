use std::{collections::BTreeMap, path::PathBuf, time::Duration};

#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub code: String,
    pub input_data: String,
    pub timeout_seconds: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionResult {
    pub output: String,
    pub error: String,
    pub execution_time: Duration,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    /// Result for a request that never reached a phase.
    pub fn rejected(error: String) -> Self {
        Self {
            output: String::new(),
            error,
            execution_time: Duration::ZERO,
            status: ExecutionStatus::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

#[derive(Clone, Debug)]
pub struct ValidationRequest {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

/// A fully resolved subprocess invocation for one phase.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub stdin: Option<String>,
    pub timeout: Duration,
    pub limits: ProcessLimits,
    pub max_output_bytes: usize,
}

/// Soft OS limits applied to the child before exec.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessLimits {
    pub address_space_bytes: Option<u64>,
    pub file_size_bytes: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    ExitedZero,
    ExitedNonZero {
        code: Option<i32>,
        signal: Option<i32>,
    },
    TimedOut,
    SpawnFailed {
        msg: String,
    },
}

impl PhaseOutcome {
    pub fn describe(&self) -> String {
        match self {
            PhaseOutcome::ExitedZero => "Process exited with status 0".to_string(),
            PhaseOutcome::ExitedNonZero {
                signal: Some(signal),
                ..
            } => format!("Process terminated by signal {}", signal),
            PhaseOutcome::ExitedNonZero { code, .. } => format!(
                "Process exited with status {}",
                code.map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            PhaseOutcome::TimedOut => "Process was killed after its deadline".to_string(),
            PhaseOutcome::SpawnFailed { msg } => msg.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhaseOutput {
    pub outcome: PhaseOutcome,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl PhaseOutput {
    pub fn spawn_failed(msg: String) -> Self {
        Self {
            outcome: PhaseOutcome::SpawnFailed { msg },
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }
}
