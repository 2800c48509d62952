//! Keyboard Driver Error Types
//!
//! Error taxonomy for the decode-and-dispatch pipeline and the glue around it.

use thiserror::Error;

/// Result type for keyboard driver operations
pub type Result<T> = std::result::Result<T, KbdError>;

/// Keyboard driver error types
#[derive(Error, Debug)]
pub enum KbdError {
    /// Register read or write failed on the bus
    #[error("Bus error on register 0x{register:02X}: {reason}")]
    Bus {
        /// Register address of the failed transaction
        register: u8,
        /// Underlying failure description
        reason: String,
    },

    /// Scancode has no entry in the scancode table
    #[error("Could not get keycode for scancode: [0x{0:02X}]")]
    UnmappedScancode(u8),

    /// Malformed attribute input
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Attribute does not support the requested access
    #[error("Attribute {name} is not {access}")]
    AccessDenied {
        /// Attribute name
        name: String,
        /// "readable" or "writable"
        access: &'static str,
    },

    /// Attribute name not recognised
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Event queue already holds a full bus batch
    #[error("Event queue is full ({0} entries)")]
    EventQueueFull(usize),

    /// uinput device setup or write failed
    #[error("uinput error: {0}")]
    Uinput(String),

    /// Device has been detached
    #[error("Device not attached")]
    NotAttached,

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KbdError {
    /// Build a bus error for `register`
    pub fn bus(register: u8, reason: impl Into<String>) -> Self {
        Self::Bus {
            register,
            reason: reason.into(),
        }
    }
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Bus transport errors
    Bus,
    /// Scancode translation errors
    Translation,
    /// Malformed caller input
    Parameter,
    /// Event queue errors
    EventQueue,
    /// Output device errors
    Output,
    /// Lifecycle errors
    State,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &KbdError) -> ErrorType {
    match error {
        KbdError::Bus { .. } | KbdError::Io(_) => ErrorType::Bus,

        KbdError::UnmappedScancode(_) => ErrorType::Translation,

        KbdError::InvalidParameter(_)
        | KbdError::AccessDenied { .. }
        | KbdError::UnknownAttribute(_) => ErrorType::Parameter,

        KbdError::EventQueueFull(_) => ErrorType::EventQueue,

        KbdError::Uinput(_) => ErrorType::Output,

        KbdError::NotAttached | KbdError::Config(_) => ErrorType::State,
    }
}

/// Recovery action to take after error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Abandon this poll cycle; the next scheduled cycle tries again
    SkipCycle,

    /// Drop the offending event and continue the cycle
    DropEvent,

    /// Reject the request without mutating anything
    Reject,

    /// Fail and propagate error
    Fail,
}

/// Determine recovery action for error
///
/// No error in the core is fatal: bus failures degrade to "no events this
/// cycle" and there is no retry beyond the next scheduled poll.
pub fn recovery_action(error: &KbdError) -> RecoveryAction {
    match classify_error(error) {
        ErrorType::Bus | ErrorType::EventQueue => RecoveryAction::SkipCycle,
        ErrorType::Translation => RecoveryAction::DropEvent,
        ErrorType::Parameter => RecoveryAction::Reject,
        ErrorType::Output | ErrorType::State => RecoveryAction::Fail,
    }
}
