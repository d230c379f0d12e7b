//! Language strategies: how submitted text becomes a runnable program.
//!
//! Every supported language is described by one immutable
//! [`LanguagePipeline`], built once at startup. The pipeline only knows how
//! to lay out source files and which commands to run; spawning, deadlines
//! and classification live in the engine and are shared by all languages.

use std::{fmt, path::Path, time::Duration};

use itertools::Itertools;
use tokio::fs;

use crate::{
    constants::{MEMORY_MB_PLACEHOLDER, RUN_FILE_SIZE_LIMIT_BYTES},
    core::{
        domain::{PhaseCommand, ProcessLimits},
        traits::workspace::{Workspace, WorkspaceError},
    },
};

pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Language {
    Python,
    Javascript,
    Java,
    Cpp,
    Go,
    Rust,
}

impl Language {
    pub fn id(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Port the standalone executor for this language listened on.
    pub fn default_port(&self) -> u16 {
        match self {
            Language::Python => 8001,
            Language::Javascript => 8002,
            Language::Java => 8003,
            Language::Cpp => 8004,
            Language::Go => 8005,
            Language::Rust => 8006,
        }
    }

    pub fn service_name(&self) -> String {
        format!("{}-executor", self.id())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A program invocation with `{memory_mb}` and `{workspace}` placeholders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    fn render_args(&self, workspace: &Workspace, memory_mb: u64) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| workspace.expand(&arg.replace(MEMORY_MB_PLACEHOLDER, &memory_mb.to_string())))
            .collect()
    }

    pub fn command_line(&self) -> String {
        std::iter::once(&self.program).chain(&self.args).join(" ")
    }
}

/// How the memory ceiling reaches the running program. Both are soft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryCeiling {
    /// `RLIMIT_AS` on the run phase.
    AddressSpace,
    /// The runtime enforces it through a flag or env var in the run template.
    RuntimeFlag,
}

#[derive(Clone, Debug)]
pub enum LanguageStrategy {
    Interpreted {
        check: CommandTemplate,
        run: CommandTemplate,
    },
    Compiled {
        build: CommandTemplate,
        /// Cheaper syntax-only variant of `build`, used by `/validate`.
        check: Option<CommandTemplate>,
        run: CommandTemplate,
        /// Turns the submitted text into a complete program.
        wrap: fn(&str) -> String,
    },
}

impl LanguageStrategy {
    pub fn source_text(&self, code: &str) -> String {
        match self {
            LanguageStrategy::Interpreted { .. } => code.to_string(),
            LanguageStrategy::Compiled { wrap, .. } => wrap(code),
        }
    }

    pub fn build(&self) -> Option<&CommandTemplate> {
        match self {
            LanguageStrategy::Interpreted { .. } => None,
            LanguageStrategy::Compiled { build, .. } => Some(build),
        }
    }

    pub fn check(&self) -> &CommandTemplate {
        match self {
            LanguageStrategy::Interpreted { check, .. } => check,
            LanguageStrategy::Compiled { build, check, .. } => check.as_ref().unwrap_or(build),
        }
    }

    pub fn run(&self) -> &CommandTemplate {
        match self {
            LanguageStrategy::Interpreted { run, .. } | LanguageStrategy::Compiled { run, .. } => {
                run
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineLimits {
    pub max_execution_time_seconds: u64,
    pub max_memory_mb: u64,
    pub max_code_size_kb: u64,
}

/// Process-wide settings every phase command needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseSettings {
    pub child_path: String,
    pub max_output_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct LanguagePipeline {
    pub language: Language,
    pub version: &'static str,
    pub source_file_name: &'static str,
    /// Extra files written next to the source, e.g. `go.mod`.
    pub support_files: Vec<(&'static str, &'static str)>,
    pub strategy: LanguageStrategy,
    /// Variables shared by every phase of this language.
    pub env: Vec<(String, String)>,
    pub memory_ceiling: MemoryCeiling,
    pub limits: PipelineLimits,
    pub available_libraries: &'static [&'static str],
}

impl LanguagePipeline {
    pub fn for_language(language: Language, limits: PipelineLimits) -> Self {
        match language {
            Language::Python => python::pipeline(limits),
            Language::Javascript => javascript::pipeline(limits),
            Language::Java => java::pipeline(limits),
            Language::Cpp => cpp::pipeline(limits),
            Language::Go => go::pipeline(limits),
            Language::Rust => rust::pipeline(limits),
        }
    }

    pub fn language_id(&self) -> &'static str {
        self.language.id()
    }

    pub fn build_command(&self) -> Option<&CommandTemplate> {
        self.strategy.build()
    }

    pub fn run_command(&self) -> &CommandTemplate {
        self.strategy.run()
    }

    pub fn max_code_size_bytes(&self) -> u64 {
        self.limits.max_code_size_kb.saturating_mul(1024)
    }

    /// Adds what the toolchain needs from the service's own environment.
    /// Called once at startup; `var` reads a variable of the service process.
    pub fn with_host_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match self.language {
            Language::Rust => rust::toolchain_env(var),
            _ => Vec::new(),
        };
        self.env.extend(host);
        self
    }

    /// Writes the (possibly wrapped) source and support files.
    #[tracing::instrument(skip(self, code), fields(workspace = %workspace.id()))]
    pub async fn prepare(&self, workspace: &Workspace, code: &str) -> Result<(), WorkspaceError> {
        write_file(
            workspace.path(),
            self.source_file_name,
            &self.strategy.source_text(code),
        )
        .await?;
        for (name, content) in &self.support_files {
            write_file(workspace.path(), name, content).await?;
        }
        Ok(())
    }

    pub fn build_phase(
        &self,
        workspace: &Workspace,
        settings: &PhaseSettings,
        timeout: Duration,
    ) -> Option<PhaseCommand> {
        self.strategy.build().map(|build| {
            self.phase_command(build, workspace, settings, None, timeout, ProcessLimits::default())
        })
    }

    pub fn check_phase(
        &self,
        workspace: &Workspace,
        settings: &PhaseSettings,
        timeout: Duration,
    ) -> PhaseCommand {
        self.phase_command(
            self.strategy.check(),
            workspace,
            settings,
            None,
            timeout,
            ProcessLimits::default(),
        )
    }

    pub fn run_phase(
        &self,
        workspace: &Workspace,
        settings: &PhaseSettings,
        input_data: &str,
        timeout: Duration,
    ) -> PhaseCommand {
        let address_space_bytes = match self.memory_ceiling {
            MemoryCeiling::AddressSpace => {
                Some(self.limits.max_memory_mb.saturating_mul(1024 * 1024))
            }
            MemoryCeiling::RuntimeFlag => None,
        };
        let stdin = (!input_data.is_empty()).then(|| input_data.to_string());
        self.phase_command(
            self.strategy.run(),
            workspace,
            settings,
            stdin,
            timeout,
            ProcessLimits {
                address_space_bytes,
                file_size_bytes: Some(RUN_FILE_SIZE_LIMIT_BYTES),
            },
        )
    }

    fn phase_command(
        &self,
        template: &CommandTemplate,
        workspace: &Workspace,
        settings: &PhaseSettings,
        stdin: Option<String>,
        timeout: Duration,
        limits: ProcessLimits,
    ) -> PhaseCommand {
        let memory_mb = self.limits.max_memory_mb.to_string();
        let extra: Vec<(String, String)> = self
            .env
            .iter()
            .chain(&template.env)
            .map(|(k, v)| (k.clone(), v.replace(MEMORY_MB_PLACEHOLDER, &memory_mb)))
            .collect();

        PhaseCommand {
            program: template.program.clone(),
            args: template.render_args(workspace, self.limits.max_memory_mb),
            cwd: workspace.path().to_path_buf(),
            env: workspace.environment(&settings.child_path, &extra),
            stdin,
            timeout,
            limits,
            max_output_bytes: settings.max_output_bytes,
        }
    }
}

async fn write_file(dir: &Path, name: &str, content: &str) -> Result<(), WorkspaceError> {
    let path = dir.join(name);
    fs::write(&path, content)
        .await
        .map_err(|source| WorkspaceError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;

    fn limits() -> PipelineLimits {
        PipelineLimits {
            max_execution_time_seconds: 30,
            max_memory_mb: 128,
            max_code_size_kb: 50,
        }
    }

    fn settings() -> PhaseSettings {
        PhaseSettings {
            child_path: "/usr/bin:/bin".to_string(),
            max_output_bytes: 1024,
        }
    }

    fn workspace() -> Workspace {
        Workspace::new(Uuid::new_v4(), PathBuf::from("/tmp/ws"))
    }

    #[test]
    fn test_interpreted_languages_have_no_build() {
        for language in [Language::Python, Language::Javascript] {
            let pipeline = LanguagePipeline::for_language(language, limits());
            assert!(pipeline.build_command().is_none(), "{language}");
            assert!(
                pipeline
                    .build_phase(&workspace(), &settings(), Duration::from_secs(1))
                    .is_none()
            );
        }
    }

    #[test]
    fn test_compiled_languages_have_build() {
        for language in [Language::Java, Language::Cpp, Language::Go, Language::Rust] {
            let pipeline = LanguagePipeline::for_language(language, limits());
            assert!(pipeline.build_command().is_some(), "{language}");
        }
    }

    #[test]
    fn test_run_phase_carries_memory_ceiling() {
        let python = LanguagePipeline::for_language(Language::Python, limits());
        let cmd = python.run_phase(&workspace(), &settings(), "", Duration::from_secs(3));
        assert_eq!(cmd.limits.address_space_bytes, Some(128 * 1024 * 1024));
        assert_eq!(cmd.limits.file_size_bytes, Some(RUN_FILE_SIZE_LIMIT_BYTES));
        assert_eq!(cmd.stdin, None);
        assert_eq!(cmd.timeout, Duration::from_secs(3));

        let java = LanguagePipeline::for_language(Language::Java, limits());
        let cmd = java.run_phase(&workspace(), &settings(), "42\n", Duration::from_secs(3));
        assert_eq!(cmd.limits.address_space_bytes, None);
        assert!(cmd.args.contains(&"-Xmx128m".to_string()));
        assert_eq!(cmd.stdin.as_deref(), Some("42\n"));
    }

    #[test]
    fn test_phase_env_is_expanded_into_workspace() {
        let go = LanguagePipeline::for_language(Language::Go, limits());
        let ws = workspace();
        let build = go
            .build_phase(&ws, &settings(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(build.env["GOCACHE"], "/tmp/ws/.cache/go-build");
        assert_eq!(build.env["HOME"], "/tmp/ws");
        assert_eq!(build.cwd, PathBuf::from("/tmp/ws"));
        assert!(!build.env.contains_key("GOMEMLIMIT"));

        let run = go.run_phase(&ws, &settings(), "", Duration::from_secs(5));
        assert_eq!(run.env["GOMEMLIMIT"], "128MiB");
    }

    #[test]
    fn test_check_falls_back_to_build() {
        let java = LanguagePipeline::for_language(Language::Java, limits());
        assert_eq!(
            java.strategy.check(),
            java.build_command().unwrap()
        );

        let cpp = LanguagePipeline::for_language(Language::Cpp, limits());
        assert!(cpp.strategy.check().args.contains(&"-fsyntax-only".to_string()));
    }

    #[tokio::test]
    async fn test_prepare_writes_source_and_support_files() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(Uuid::new_v4(), dir.path().to_path_buf());
        let go = LanguagePipeline::for_language(Language::Go, limits());

        go.prepare(&ws, "package main\nfunc main() {}\n").await.unwrap();

        let source = std::fs::read_to_string(dir.path().join("main.go")).unwrap();
        assert_eq!(source, "package main\nfunc main() {}\n");
        assert!(dir.path().join("go.mod").exists());
    }

    #[tokio::test]
    async fn test_prepare_into_missing_workspace_fails() {
        let ws = Workspace::new(Uuid::new_v4(), PathBuf::from("/nonexistent/coderunner/ws"));
        let python = LanguagePipeline::for_language(Language::Python, limits());

        let result = python.prepare(&ws, "print(1)").await;

        assert!(matches!(result, Err(WorkspaceError::Write { .. })));
    }

    #[test]
    fn test_rust_phases_keep_host_toolchain() {
        let rust = LanguagePipeline::for_language(Language::Rust, limits()).with_host_env(|key| {
            match key {
                "HOME" => Some("/home/runner".to_string()),
                "RUSTUP_TOOLCHAIN" => Some("stable".to_string()),
                _ => None,
            }
        });
        let ws = workspace();

        let build = rust
            .build_phase(&ws, &settings(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(build.env["RUSTUP_HOME"], "/home/runner/.rustup");
        assert_eq!(build.env["RUSTUP_TOOLCHAIN"], "stable");
        assert_eq!(build.env["HOME"], "/tmp/ws");

        let check = rust.check_phase(&ws, &settings(), Duration::from_secs(5));
        assert_eq!(check.env["CARGO_HOME"], "/home/runner/.cargo");
    }

    #[test]
    fn test_host_env_is_ignored_by_other_languages() {
        let python = LanguagePipeline::for_language(Language::Python, limits())
            .with_host_env(|_| Some("/somewhere".to_string()));
        let cmd = python.run_phase(&workspace(), &settings(), "", Duration::from_secs(1));
        assert!(!cmd.env.contains_key("RUSTUP_HOME"));
    }

    #[test]
    fn test_huge_limits_saturate() {
        let mut limits = limits();
        limits.max_memory_mb = u64::MAX;
        limits.max_code_size_kb = u64::MAX;
        let cpp = LanguagePipeline::for_language(Language::Cpp, limits);

        assert_eq!(cpp.max_code_size_bytes(), u64::MAX);
        let cmd = cpp.run_phase(&workspace(), &settings(), "", Duration::from_secs(1));
        assert_eq!(cmd.limits.address_space_bytes, Some(u64::MAX));
    }

    #[test]
    fn test_command_line() {
        let cmd = CommandTemplate::new("g++", &["-o", "main", "main.cpp"]);
        assert_eq!(cmd.command_line(), "g++ -o main main.cpp");
    }
}
