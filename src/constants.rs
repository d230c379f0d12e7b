use std::time::Duration;

pub const MIN_TIMEOUT_SECONDS: i64 = 1;
pub const MAX_TIMEOUT_SECONDS: i64 = 60;

pub const DEFAULT_MAX_EXECUTION_TIME_SECONDS: u64 = 30;
pub const DEFAULT_MAX_MEMORY_MB: u64 = 128;
pub const DEFAULT_MAX_CODE_SIZE_KB: u64 = 50;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_CHILD_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

pub const RUN_FILE_SIZE_LIMIT_BYTES: u64 = 16 * 1024 * 1024;

/// How long to keep draining pipes after the process group is gone.
pub const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(500);

pub const WORKSPACE_PLACEHOLDER: &str = "{workspace}";
pub const MEMORY_MB_PLACEHOLDER: &str = "{memory_mb}";

pub const INTERNAL_ERROR_MSG: &str = "Internal error while executing code";

/// Poll period while waiting for a phase to exit without reaping it.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(5);
