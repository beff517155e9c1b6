//! Error types
//!
//! Defines domain-specific error types for each module of the quota manager.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Project registry errors
#[derive(Debug)]
pub enum RegistryError {
    Io(io::Error),
    MalformedLine { file: PathBuf, line: String },
    Inconsistent(String),
    IdSpaceExhausted,
    NotRegistered(PathBuf),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Io(e) => write!(f, "Registry I/O error: {}", e),
            RegistryError::MalformedLine { file, line } => {
                write!(f, "Malformed line in {}: {:?}", file.display(), line)
            }
            RegistryError::Inconsistent(detail) => {
                write!(f, "Project files disagree: {}", detail)
            }
            RegistryError::IdSpaceExhausted => {
                write!(f, "There appear to be too many assigned project ids")
            }
            RegistryError::NotRegistered(p) => {
                write!(f, "No project registered for {}", p.display())
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<io::Error> for RegistryError {
    fn from(error: io::Error) -> Self {
        RegistryError::Io(error)
    }
}

/// External command errors
#[derive(Debug)]
pub enum CommandError {
    Io(io::Error),
    NonZeroExit { program: String, code: Option<i32> },
    Timeout { program: String, secs: u64 },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Io(e) => write!(f, "Failed to run command: {}", e),
            CommandError::NonZeroExit { program, code } => match code {
                Some(code) => write!(f, "{} exited with status {}", program, code),
                None => write!(f, "{} was terminated by a signal", program),
            },
            CommandError::Timeout { program, secs } => {
                write!(f, "{} did not finish within {}s", program, secs)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<io::Error> for CommandError {
    fn from(error: io::Error) -> Self {
        CommandError::Io(error)
    }
}

/// Usage report errors
#[derive(Debug)]
pub enum ReportError {
    Command(CommandError),
    TruncatedLine(String),
    BadNumber { line: String, column: &'static str },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Command(e) => write!(f, "Usage report failed: {}", e),
            ReportError::TruncatedLine(line) => {
                write!(f, "Report line has too few columns: {:?}", line)
            }
            ReportError::BadNumber { line, column } => {
                write!(f, "Non-numeric {} column in report line {:?}", column, line)
            }
        }
    }
}

impl std::error::Error for ReportError {}

impl From<CommandError> for ReportError {
    fn from(error: CommandError) -> Self {
        ReportError::Command(error)
    }
}

/// Quota backend errors raised while executing a queued mutation.
///
/// These never reach the caller that submitted the mutation; the worker logs
/// them and the next audit pass surfaces any resulting drift.
#[derive(Debug)]
pub enum BackendError {
    Registry(RegistryError),
    Command(CommandError),
    Io(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Registry(e) => write!(f, "Registry error: {}", e),
            BackendError::Command(e) => write!(f, "Command error: {}", e),
            BackendError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<RegistryError> for BackendError {
    fn from(error: RegistryError) -> Self {
        BackendError::Registry(error)
    }
}

impl From<CommandError> for BackendError {
    fn from(error: CommandError) -> Self {
        BackendError::Command(error)
    }
}

impl From<io::Error> for BackendError {
    fn from(error: io::Error) -> Self {
        BackendError::Io(error)
    }
}

/// General service error returned by the public quota operations
#[derive(Debug)]
pub enum ServiceError {
    UnknownRootVolume(String),
    QueueFull,
    QueueClosed,
    Usage(ReportError),
    InvalidRelativePath(String),
    Io(io::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::UnknownRootVolume(name) => {
                write!(f, "Unknown root volume: {}", name)
            }
            ServiceError::QueueFull => {
                write!(f, "Quota mutation queue is full, try again later")
            }
            ServiceError::QueueClosed => write!(f, "Quota worker is not running"),
            ServiceError::Usage(e) => write!(f, "Usage query error: {}", e),
            ServiceError::InvalidRelativePath(p) => {
                write!(f, "Relative path must be <user>/<volume>: {}", p)
            }
            ServiceError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

// Implement conversions from specific errors to ServiceError
impl From<ReportError> for ServiceError {
    fn from(error: ReportError) -> Self {
        ServiceError::Usage(error)
    }
}

impl From<io::Error> for ServiceError {
    fn from(error: io::Error) -> Self {
        ServiceError::Io(error)
    }
}
