//! Results of commands executed on a virtual device.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Return code as the execution transport reports it.
///
/// The transport serializes codes as text, so success is the literal `"0"` rather than a
/// numeric comparison. Integer JSON values are accepted and kept in their text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReturnCode(String);

impl ReturnCode {
    /// Wrap a raw return code.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True only for the literal `"0"`.
    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    /// Integer value, when the text is one.
    pub fn code(&self) -> Option<i32> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReturnCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => ReturnCode(text),
            Repr::Int(code) => ReturnCode(code.to_string()),
        })
    }
}

/// Output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code as reported by the transport.
    pub return_code: ReturnCode,
    /// Combined stdout and stderr.
    pub output: String,
}

impl ExecutionResult {
    /// Build a result from parts.
    pub fn new(return_code: &str, output: &str) -> Self {
        Self {
            return_code: ReturnCode::new(return_code),
            output: output.into(),
        }
    }

    /// Normalized status, without crash detection.
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::from_return_code(&self.return_code)
    }

    /// Last `lines` lines of output, for diagnostics.
    pub fn output_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.output.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// How a remote process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Return code `"0"`.
    Success,
    /// Exited with a non-zero code.
    Exited(i32),
    /// Killed by a signal, as reported by the crash harness.
    Crashed {
        /// Signal name, e.g. `SIGSEGV`.
        signal: String,
    },
    /// Return code was not an integer.
    Unknown(String),
}

impl ExitStatus {
    /// Normalize a transport return code.
    pub fn from_return_code(code: &ReturnCode) -> Self {
        if code.is_zero() {
            return ExitStatus::Success;
        }
        match code.code() {
            Some(value) => ExitStatus::Exited(value),
            None => ExitStatus::Unknown(code.as_str().into()),
        }
    }

    /// True for [`ExitStatus::Success`].
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Success => write!(f, "exit 0"),
            ExitStatus::Exited(code) => write!(f, "exit {}", code),
            ExitStatus::Crashed { signal } => write!(f, "crashed ({})", signal),
            ExitStatus::Unknown(raw) => write!(f, "unknown return code {:?}", raw),
        }
    }
}
