//! End-to-end runs through the real process runner and workspace manager.
//! Toolchain tests return early when the toolchain is not installed.

use std::{path::Path, sync::Arc, time::Duration};

use crate::{
    constants::{
        DEFAULT_CHILD_PATH, DEFAULT_MAX_CODE_SIZE_KB, DEFAULT_MAX_EXECUTION_TIME_SECONDS,
        DEFAULT_MAX_MEMORY_MB,
    },
    core::{
        domain::{ExecutionRequest, ExecutionResult, ExecutionStatus, ValidationRequest},
        pipeline::ExecutionEngine,
    },
    languages::{
        CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling,
        PhaseSettings, PipelineLimits,
    },
    native::{runner::NativeProcessRunner, workspace::TempWorkspaceManager},
};

/// The limits a default deployment runs with.
fn limits() -> PipelineLimits {
    PipelineLimits {
        max_execution_time_seconds: DEFAULT_MAX_EXECUTION_TIME_SECONDS,
        max_memory_mb: DEFAULT_MAX_MEMORY_MB,
        max_code_size_kb: DEFAULT_MAX_CODE_SIZE_KB,
    }
}

/// A built-in pipeline set up the way `main` sets it up.
fn toolchain(language: Language) -> LanguagePipeline {
    LanguagePipeline::for_language(language, limits()).with_host_env(|key| std::env::var(key).ok())
}

fn engine_for(pipeline: LanguagePipeline, root: &Path) -> ExecutionEngine {
    ExecutionEngine::new(
        Arc::new(pipeline),
        Arc::new(NativeProcessRunner::new()),
        Arc::new(TempWorkspaceManager::new(root)),
        PhaseSettings {
            child_path: std::env::var("PATH").unwrap_or_else(|_| DEFAULT_CHILD_PATH.to_string()),
            max_output_bytes: 64 * 1024,
        },
    )
}

/// An interpreted pipeline over `/bin/sh`, available on every host.
fn shell_pipeline() -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Python,
        version: "posix",
        source_file_name: "main.sh",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Interpreted {
            check: CommandTemplate::new("/bin/sh", &["-n", "main.sh"]),
            run: CommandTemplate::new("/bin/sh", &["main.sh"]),
        },
        env: Vec::new(),
        memory_ceiling: MemoryCeiling::AddressSpace,
        limits: limits(),
        available_libraries: &[],
    }
}

fn request(code: &str, input_data: &str, timeout_seconds: Option<i64>) -> ExecutionRequest {
    ExecutionRequest {
        code: code.to_string(),
        input_data: input_data.to_string(),
        timeout_seconds,
    }
}

fn is_alive(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => {
            let state = stat.rsplit(')').next().and_then(|rest| rest.trim().chars().next());
            !matches!(state, Some('Z') | Some('X'))
        }
        Err(_) => false,
    }
}

fn assert_empty(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "workspaces left behind: {leftovers:?}");
}

fn installed(tools: &[&str]) -> bool {
    tools.iter().all(|tool| which::which(tool).is_ok())
}

#[tokio::test]
async fn test_shell_program_prints_fixed_string() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(shell_pipeline(), root.path());

    let result = engine.execute(request("echo hello world", "", Some(5))).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.output, "hello world");
    assert_eq!(result.error, "");
    assert!(result.execution_time > Duration::ZERO);
    assert_empty(root.path());
}

#[tokio::test]
async fn test_input_data_is_piped_to_stdin() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(shell_pipeline(), root.path());

    let result = engine
        .execute(request("read a b\necho $((a + b))", "3 4\n", Some(5)))
        .await;

    assert_eq!(result.output, "7");
}

#[tokio::test]
async fn test_runtime_error_reports_stderr() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(shell_pipeline(), root.path());

    let result = engine
        .execute(request("echo partial\necho boom >&2\nexit 3", "", Some(5)))
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.output, "partial");
    assert_eq!(result.error, "boom");
    assert_empty(root.path());
}

#[tokio::test]
async fn test_endless_program_times_out_and_leaves_nothing_behind() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(shell_pipeline(), root.path());
    let started = std::time::Instant::now();

    let result = engine
        .execute(request("sleep 60 &\necho $!\nwhile :; do :; done", "", Some(1)))
        .await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.error, "code execution timed out after 1s");
    assert!(started.elapsed() < Duration::from_secs(3));

    let background: i32 = result.output.parse().unwrap();
    let mut alive = is_alive(background);
    for _ in 0..50 {
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        alive = is_alive(background);
    }
    assert!(!alive, "process {background} outlived its request");
    assert_empty(root.path());
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(shell_pipeline(), root.path());
    let code = "echo $$ > mine\nsleep 0.3\nls\npwd >&2";

    let (a, b) = tokio::join!(
        engine.execute(request(code, "", Some(5))),
        engine.execute(request(code, "", Some(5))),
    );

    for result in [&a, &b] {
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.output, "main.sh\nmine\ntmp");
    }
    let (dir_a, dir_b) = (Path::new(&a.error), Path::new(&b.error));
    assert_ne!(dir_a, dir_b);
    assert!(!dir_a.starts_with(dir_b) && !dir_b.starts_with(dir_a));
    assert_empty(root.path());
}

#[tokio::test]
async fn test_oversized_code_creates_no_workspace() {
    let parent = tempfile::tempdir().unwrap();
    let root = parent.path().join("workspaces");
    let engine = engine_for(shell_pipeline(), &root);

    let result = engine
        .execute(request(&"#".repeat(200 * 1024), "", None))
        .await;

    assert_eq!(
        result,
        ExecutionResult::rejected(
            "Code size (200.0KB) exceeds maximum allowed size (50KB)".to_string()
        )
    );
    assert!(!root.exists());
}

#[tokio::test]
async fn test_shell_validation_never_runs_the_program() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let marker = scratch.path().join("ran");
    let engine = engine_for(shell_pipeline(), root.path());

    let ok = engine
        .validate(ValidationRequest {
            code: format!("touch '{}'\necho ran", marker.display()),
        })
        .await;
    assert!(ok.is_valid, "{:?}", ok.errors);
    assert!(!marker.exists());

    let bad = engine
        .validate(ValidationRequest {
            code: format!("touch '{}'\nif then fi", marker.display()),
        })
        .await;
    assert!(!bad.is_valid);
    assert_eq!(bad.errors.len(), 1);
    assert!(bad.warnings.is_empty());
    assert!(!marker.exists());
    assert_empty(root.path());
}

/// Runs `code` on a built-in pipeline and expects it to print `hi`.
async fn assert_prints_hi(language: Language, code: &str) {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(toolchain(language), root.path());

    let result = engine.execute(request(code, "", None)).await;

    assert_eq!(result.status, ExecutionStatus::Success, "{language}: {}", result.error);
    assert_eq!(result.output, "hi", "{language}");
    assert_empty(root.path());
}

#[tokio::test]
async fn test_python_hello() {
    if !installed(&["python3"]) {
        return;
    }
    assert_prints_hi(Language::Python, "print(\"hi\")").await;
}

#[tokio::test]
async fn test_javascript_hello() {
    if !installed(&["node"]) {
        return;
    }
    assert_prints_hi(Language::Javascript, "console.log(\"hi\");").await;
}

#[tokio::test]
async fn test_java_hello() {
    if !installed(&["javac", "java"]) {
        return;
    }
    assert_prints_hi(Language::Java, "System.out.println(\"hi\");").await;
}

#[tokio::test]
async fn test_cpp_hello() {
    if !installed(&["g++"]) {
        return;
    }
    assert_prints_hi(Language::Cpp, "cout << \"hi\" << endl;").await;
}

#[tokio::test]
async fn test_go_hello() {
    if !installed(&["go"]) {
        return;
    }
    assert_prints_hi(Language::Go, "fmt.Println(\"hi\")").await;
}

#[tokio::test]
async fn test_rust_hello() {
    if !installed(&["rustc"]) {
        return;
    }
    assert_prints_hi(Language::Rust, "println!(\"hi\");").await;
}

#[tokio::test]
async fn test_cpp_snippet() {
    if !installed(&["g++"]) {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(toolchain(Language::Cpp), root.path());

    let result = engine
        .execute(request("int n; cin >> n; cout << n * 2 << endl;", "21", None))
        .await;

    assert_eq!(result.status, ExecutionStatus::Success, "{}", result.error);
    assert_eq!(result.output, "42");
    assert_empty(root.path());
}

#[tokio::test]
async fn test_go_endless_loop_times_out() {
    if !installed(&["go"]) {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(toolchain(Language::Go), root.path());
    let started = std::time::Instant::now();

    let result = engine
        .execute(request("package main\n\nfunc main() {\n\tfor {\n\t}\n}\n", "", Some(1)))
        .await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_empty(root.path());
}

#[tokio::test]
async fn test_java_missing_semicolon_is_invalid() {
    if !installed(&["javac"]) {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(toolchain(Language::Java), root.path());

    let result = engine
        .validate(ValidationRequest {
            code: "int x = 1\nSystem.out.println(x);".to_string(),
        })
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("error"), "{:?}", result.errors);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_rust_full_program_with_own_imports() {
    if !installed(&["rustc"]) {
        return;
    }
    assert_prints_hi(
        Language::Rust,
        "use std::collections::HashMap;\nuse std::io;\n\nfn main() {\n    let mut m = HashMap::new();\n    m.insert(1, \"hi\");\n    let _ = io::stdout();\n    println!(\"{}\", m[&1]);\n}\n",
    )
    .await;
}
