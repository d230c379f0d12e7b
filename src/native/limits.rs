//! Process-level controls: rlimits applied before exec and group kills.

use std::io;

use tokio::process::Command;

use crate::core::domain::ProcessLimits;

/// Installs the rlimits as a pre-exec hook. Limits are soft controls: a
/// host that refuses one (for instance a lower hard limit) still runs the
/// child with whatever limits it already had.
pub fn apply(command: &mut Command, limits: &ProcessLimits) {
    let limits = limits.clone();
    // SAFETY: the hook only calls setrlimit, which is async-signal-safe,
    // and allocates nothing.
    unsafe {
        command.pre_exec(move || {
            set_rlimits(&limits);
            Ok(())
        });
    }
}

fn set_rlimits(limits: &ProcessLimits) {
    let none = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: plain syscalls on the calling (child) process.
    unsafe {
        libc::setrlimit(libc::RLIMIT_CORE, &none);

        if let Some(bytes) = limits.address_space_bytes {
            let rlim = libc::rlimit {
                rlim_cur: bytes as libc::rlim_t,
                rlim_max: bytes as libc::rlim_t,
            };
            libc::setrlimit(libc::RLIMIT_AS, &rlim);
        }

        if let Some(bytes) = limits.file_size_bytes {
            let rlim = libc::rlimit {
                rlim_cur: bytes as libc::rlim_t,
                rlim_max: bytes as libc::rlim_t,
            };
            libc::setrlimit(libc::RLIMIT_FSIZE, &rlim);
        }
    }
}

/// Sends SIGKILL to every process in the group. A group that is already
/// empty is not an error.
pub fn kill_group(pgid: i32) -> io::Result<()> {
    // SAFETY: killpg has no memory-safety preconditions.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

/// Reports whether the child has terminated without reaping it.
///
/// Leaving the leader as a zombie keeps its pid, and so the group id,
/// reserved until the group has been killed.
pub fn has_exited(pid: i32) -> bool {
    // SAFETY: siginfo_t is plain data and waitid only writes into it.
    unsafe {
        let mut info: libc::siginfo_t = std::mem::zeroed();
        let rc = libc::waitid(
            libc::P_PID,
            pid as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        );
        if rc != 0 {
            // ECHILD: already reaped elsewhere.
            return true;
        }
        info.si_pid() != 0
    }
}
