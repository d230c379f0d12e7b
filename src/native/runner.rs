use std::{
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    task::JoinHandle,
    time::{Instant, sleep, timeout, timeout_at},
};

use crate::{
    constants::{EXIT_POLL_INTERVAL, PIPE_DRAIN_GRACE},
    core::{
        domain::{PhaseCommand, PhaseOutcome, PhaseOutput},
        traits::runner::ProcessRunner,
    },
    native::limits,
};

/// Runs phases as direct children of the service, each in its own process
/// group.
#[derive(Clone, Debug, Default)]
pub struct NativeProcessRunner;

impl NativeProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProcessRunner for NativeProcessRunner {
    #[tracing::instrument(skip_all, fields(program = %command.program))]
    async fn run(&self, command: PhaseCommand) -> PhaseOutput {
        let started = Instant::now();
        let cap = command.max_output_bytes;

        let mut cmd = Command::new(resolve_program(&command.program, &command.cwd));
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .env_clear()
            .envs(&command.env)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        limits::apply(&mut cmd, &command.limits);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to spawn {}: {}", command.program, e);
                return PhaseOutput::spawn_failed(format!(
                    "Failed to start {}: {}",
                    command.program, e
                ));
            }
        };
        // process_group(0) makes the child's pid its group id.
        let pid = child.id().map(|id| id as i32);

        let stdin_task = match (child.stdin.take(), command.stdin) {
            (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    tracing::debug!("stdin closed early: {}", e);
                }
                // dropping the pipe delivers EOF
            })),
            _ => None,
        };
        let stdout_task = child.stdout.take().map(|out| tokio::spawn(read_capped(out, cap)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(read_capped(err, cap)));

        let deadline = started + command.timeout;
        let exited = match pid {
            Some(pid) => timeout_at(deadline, wait_for_exit(pid)).await.is_ok(),
            None => false,
        };
        let elapsed = started.elapsed();

        // The leader is unreaped here, so the group id cannot have been reused.
        if let Some(pid) = pid {
            if let Err(e) = limits::kill_group(pid) {
                tracing::error!("Failed to kill process group {}: {}", pid, e);
                let _ = child.start_kill();
            }
        }

        let outcome = match child.wait().await {
            _ if !exited => PhaseOutcome::TimedOut,
            Ok(status) => outcome_from_status(status),
            Err(e) => PhaseOutcome::SpawnFailed {
                msg: format!("Failed to wait for {}: {}", command.program, e),
            },
        };

        if let Some(task) = stdin_task {
            task.abort();
        }
        let stdout = collect(stdout_task, cap).await;
        let stderr = collect(stderr_task, cap).await;

        tracing::debug!(?outcome, ?elapsed, "Phase finished");

        PhaseOutput {
            outcome,
            stdout,
            stderr,
            elapsed,
        }
    }
}

/// Relative programs such as `./main` are resolved against the workspace,
/// not the service's own working directory.
fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

async fn wait_for_exit(pid: i32) {
    while !limits::has_exited(pid) {
        sleep(EXIT_POLL_INTERVAL).await;
    }
}

fn outcome_from_status(status: ExitStatus) -> PhaseOutcome {
    if status.success() {
        PhaseOutcome::ExitedZero
    } else {
        PhaseOutcome::ExitedNonZero {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

/// Reads to EOF keeping at most `cap` bytes. Reading continues past the cap
/// so the child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if truncated {
            continue;
        }
        let remaining = cap.saturating_sub(buf.len());
        if n <= remaining {
            buf.extend_from_slice(&chunk[..n]);
        } else {
            buf.extend_from_slice(&chunk[..remaining]);
            truncated = true;
        }
    }

    (buf, truncated)
}

async fn collect(task: Option<JoinHandle<(Vec<u8>, bool)>>, cap: usize) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    // A descendant that escaped the group via setsid can hold the pipe open.
    match timeout(PIPE_DRAIN_GRACE, &mut task).await {
        Ok(Ok((buf, truncated))) => render_output(&buf, truncated, cap),
        Ok(Err(e)) => {
            tracing::error!("Output reader failed: {}", e);
            String::new()
        }
        Err(_) => {
            tracing::warn!("Output pipe still open after the process group was killed");
            task.abort();
            String::new()
        }
    }
}

fn render_output(buf: &[u8], truncated: bool, cap: usize) -> String {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim();
    if truncated {
        format!("{}\n[output truncated after {} bytes]", text, cap)
    } else {
        text.to_string()
    }
}
