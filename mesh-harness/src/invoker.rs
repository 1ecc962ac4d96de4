//! Remote test invocation.
//!
//! Test binaries run on the controller device and take the target's address on the
//! command line. They are normally run under gdb, which executes the binary, prints a
//! backtrace if it dies and passes the child's exit code through.

use mesh_types::{DeviceId, ExecutionResult, ExitStatus};
use std::net::Ipv4Addr;

use crate::backend::{BackendError, HomeBackend};
use crate::home::VirtualHome;

/// Prefix that runs a command under gdb and prints a backtrace on a crash.
pub const CRASH_HARNESS: &str = "gdb -return-child-result -q -ex run -ex bt --args";

const SIGNAL_MARKERS: [&str; 2] = ["Program received signal ", "Program terminated with signal "];

/// Number of output lines kept in failure diagnostics.
pub const OUTPUT_TAIL_LINES: usize = 40;

/// A test binary and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTest {
    /// Path of the binary or script on the device.
    pub program: String,
    /// Interpreter placed before the program, e.g. `python3`.
    pub interpreter: Option<String>,
    /// Value passed as `-t`.
    pub timeout_secs: u64,
    /// Wrap in the gdb crash harness.
    pub harness: bool,
}

/// Outcome of one remote test run.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command line that was executed.
    pub command: String,
    /// Raw transport result.
    pub result: ExecutionResult,
    /// Normalized exit status.
    pub status: ExitStatus,
}

impl RemoteTest {
    /// A Python test script run with `python3` under the crash harness.
    pub fn python(program: &str, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            interpreter: Some("python3".into()),
            timeout_secs,
            harness: true,
        }
    }

    /// Disable the gdb wrapper.
    pub fn without_harness(mut self) -> Self {
        self.harness = false;
        self
    }

    /// Full command line for a run against `target`.
    pub fn command_line(&self, target: Ipv4Addr) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(8);
        if self.harness {
            parts.push(CRASH_HARNESS.into());
        }
        if let Some(interpreter) = &self.interpreter {
            parts.push(interpreter.clone());
        }
        parts.push(self.program.clone());
        parts.push(format!("-t {} -a {}", self.timeout_secs, target));
        parts.join(" ")
    }

    /// Run the test once on `device` against `target`.
    ///
    /// Only transport failures are errors; a failing test is reported through
    /// [`Invocation::status`].
    pub async fn run<B: HomeBackend>(
        &self,
        home: &VirtualHome<B>,
        device: &DeviceId,
        target: Ipv4Addr,
    ) -> Result<Invocation, BackendError> {
        let command = self.command_line(target);
        let result = home.execute_device_cmd(device, &command).await?;
        let status = self.classify(&result);
        if !status.success() {
            tracing::warn!("{} ended with {}", self.program, status);
        }
        Ok(Invocation {
            command,
            result,
            status,
        })
    }

    /// Normalize a result, recognising crashes reported by the harness.
    ///
    /// A `"0"` return code is always success.
    pub fn classify(&self, result: &ExecutionResult) -> ExitStatus {
        let status = result.exit_status();
        if status.success() || !self.harness {
            return status;
        }
        match crash_signal(&result.output) {
            Some(signal) => ExitStatus::Crashed { signal },
            None => status,
        }
    }
}

impl Invocation {
    /// Last lines of the combined output.
    pub fn output_tail(&self) -> String {
        self.result.output_tail(OUTPUT_TAIL_LINES)
    }
}

/// Signal name from gdb's crash banner, if the output has one.
fn crash_signal(output: &str) -> Option<String> {
    SIGNAL_MARKERS.iter().find_map(|marker| {
        let start = output.find(marker)? + marker.len();
        output[start..]
            .split_whitespace()
            .next()
            .map(|token| token.trim_end_matches(&[',', '.'][..]).to_string())
            .filter(|signal| !signal.is_empty())
    })
}
