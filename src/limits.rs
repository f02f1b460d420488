// src/limits.rs

//! Open-file limit. Recursive watchers hold one descriptor per directory on
//! some platforms, which runs into the default soft limit on big trees.

use tracing::{debug, warn};

/// Soft limit we try to reach.
pub const DESIRED_OPEN_FILES: u64 = 10_000;

/// Raise the soft `RLIMIT_NOFILE` towards [`DESIRED_OPEN_FILES`], bounded by
/// the hard limit. Failures are logged and otherwise ignored.
#[cfg(unix)]
pub fn raise_open_file_limit() {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: getrlimit only writes into the struct we pass.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        warn!(error = %std::io::Error::last_os_error(), "getrlimit(RLIMIT_NOFILE) failed");
        return;
    }

    let target = (DESIRED_OPEN_FILES as libc::rlim_t).min(limit.rlim_max);
    if limit.rlim_cur >= target {
        debug!(current = limit.rlim_cur as u64, "open file limit already sufficient");
        return;
    }

    let raised = libc::rlimit {
        rlim_cur: target,
        rlim_max: limit.rlim_max,
    };
    // SAFETY: setrlimit only reads the struct we pass.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &raised) } != 0 {
        warn!(error = %std::io::Error::last_os_error(), "setrlimit(RLIMIT_NOFILE) failed");
        return;
    }

    debug!(from = limit.rlim_cur as u64, to = target as u64, "raised open file limit");
}

#[cfg(not(unix))]
pub fn raise_open_file_limit() {}
