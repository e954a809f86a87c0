use crate::config::Config;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Minimal process surface the limiter needs: a non-destructive liveness
/// probe and the graceful/forceful signal pair.
pub trait ProcessHandle {
    fn is_alive(&self) -> bool;
    /// Ask the process to shut down (SIGTERM).
    fn terminate(&self) -> io::Result<()>;
    /// Force it (SIGKILL).
    fn kill(&self) -> io::Result<()>;
}

/// How a tracked game session ended. The CLI only logs this; nothing is
/// surfaced to callers beyond the log file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackOutcome {
    /// The game exited on its own before the budget ran out.
    ExitedEarly,
    /// SIGTERM was enough.
    Terminated,
    /// The game survived the grace period and was SIGKILLed.
    Killed,
    /// Signal delivery failed; the game may still be running.
    SignalFailed,
}

/// Live process addressed by pid.
#[cfg(unix)]
#[derive(Clone, Copy, Debug)]
pub struct PidHandle {
    pid: i32,
}

#[cfg(unix)]
impl PidHandle {
    pub fn new(pid: i32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    fn signal(&self, sig: i32) -> io::Result<()> {
        // kill(2) with signal 0 only probes for existence
        let rc = unsafe { libc::kill(self.pid, sig) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(unix)]
impl ProcessHandle for PidHandle {
    fn is_alive(&self) -> bool {
        match self.signal(0) {
            Ok(()) => true,
            // lacking permission still proves the pid exists
            Err(err) => err.raw_os_error() == Some(libc::EPERM),
        }
    }

    fn terminate(&self) -> io::Result<()> {
        self.signal(libc::SIGTERM)
    }

    fn kill(&self) -> io::Result<()> {
        self.signal(libc::SIGKILL)
    }
}

/// Block until the process exits or `minutes` elapse, then escalate
/// SIGTERM -> grace period -> SIGKILL. Fire and forget: every outcome is
/// logged, none is returned to the shell beyond exit code 0.
pub fn track<P: ProcessHandle>(process: &P, label: &str, minutes: u64, cfg: &Config) -> TrackOutcome {
    track_for(
        process,
        label,
        Duration::from_secs(minutes * 60),
        cfg.poll_interval(),
        cfg.grace_period(),
    )
}

/// Same as [`track`] with explicit durations, so tests can run in
/// milliseconds.
pub fn track_for<P: ProcessHandle>(
    process: &P,
    label: &str,
    budget: Duration,
    poll_interval: Duration,
    grace_period: Duration,
) -> TrackOutcome {
    info!(label, budget_secs = budget.as_secs(), "started tracking game");

    let deadline = Instant::now() + budget;
    loop {
        if !process.is_alive() {
            info!(label, "game closed before time limit");
            return TrackOutcome::ExitedEarly;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(poll_interval.min(deadline - now));
    }

    info!(label, "time expired, terminating game");
    if let Err(err) = process.terminate() {
        error!(label, %err, "failed to deliver SIGTERM");
        return TrackOutcome::SignalFailed;
    }

    thread::sleep(grace_period);

    if !process.is_alive() {
        info!(label, "game terminated gracefully");
        return TrackOutcome::Terminated;
    }
    match process.kill() {
        Ok(()) => {
            info!(label, "force killed game");
            TrackOutcome::Killed
        }
        Err(err) => {
            error!(label, %err, "failed to deliver SIGKILL");
            TrackOutcome::SignalFailed
        }
    }
}
