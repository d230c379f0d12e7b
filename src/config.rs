use std::{
    num::NonZeroUsize,
    path::PathBuf,
};

use clap::Parser;

use crate::{
    constants::{
        DEFAULT_CHILD_PATH, DEFAULT_MAX_CODE_SIZE_KB, DEFAULT_MAX_EXECUTION_TIME_SECONDS,
        DEFAULT_MAX_MEMORY_MB, DEFAULT_MAX_OUTPUT_BYTES,
    },
    languages::{Language, PhaseSettings, PipelineLimits},
};

/// Startup configuration. Read once, never changed afterwards.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Runs untrusted code snippets for one language over HTTP")]
pub struct ServiceConfig {
    /// Language served by this instance
    #[arg(long, env = "EXECUTOR_LANGUAGE", value_enum, default_value_t = Language::Python)]
    pub language: Language,

    /// Address or hostname to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Defaults to the language's conventional port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory under which per-request workspaces are created
    #[arg(long, env = "EXECUTOR_WORKSPACE_ROOT")]
    pub workspace_root: Option<PathBuf>,

    /// Default request timeout in seconds
    #[arg(
        long,
        env = "EXECUTOR_MAX_EXECUTION_TIME",
        default_value_t = DEFAULT_MAX_EXECUTION_TIME_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_execution_time: u64,

    /// Best-effort memory ceiling for the run phase
    #[arg(
        long,
        env = "EXECUTOR_MAX_MEMORY_MB",
        default_value_t = DEFAULT_MAX_MEMORY_MB,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_memory_mb: u64,

    #[arg(long, env = "EXECUTOR_MAX_CODE_SIZE_KB", default_value_t = DEFAULT_MAX_CODE_SIZE_KB)]
    pub max_code_size_kb: u64,

    /// Cap on each of stdout and stderr
    #[arg(long, env = "EXECUTOR_MAX_OUTPUT_BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    pub max_output_bytes: usize,

    /// Maximum number of requests running at once (unlimited when unset)
    #[arg(long, env = "EXECUTOR_MAX_CONCURRENCY")]
    pub max_concurrency: Option<NonZeroUsize>,

    /// PATH given to child processes
    #[arg(long, env = "EXECUTOR_CHILD_PATH")]
    pub child_path: Option<String>,
}

impl ServiceConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.language.default_port())
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port())
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("coderunner"))
    }

    pub fn pipeline_limits(&self) -> PipelineLimits {
        PipelineLimits {
            max_execution_time_seconds: self.max_execution_time,
            max_memory_mb: self.max_memory_mb,
            max_code_size_kb: self.max_code_size_kb,
        }
    }

    pub fn phase_settings(&self) -> PhaseSettings {
        let child_path = self
            .child_path
            .clone()
            .or_else(|| std::env::var("PATH").ok())
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| DEFAULT_CHILD_PATH.to_string());

        PhaseSettings {
            child_path,
            max_output_bytes: self.max_output_bytes,
        }
    }
}
