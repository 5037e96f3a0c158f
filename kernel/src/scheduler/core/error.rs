//! Scheduler error handling
//!
//! Typed errors for ready-queue contract violations. These flag integration
//! bugs, never recoverable runtime states; the external scheduler decides
//! how to react (typically as a kernel-panic-equivalent condition).
//!
//! Out-of-range guest priorities and cores are NOT errors: guests may pass
//! sentinel values ("do not schedule" priorities, "no such core"), so every
//! queue operation treats them as deliberate no-ops.

use crate::libutils::collections::ListError;
use core::fmt;

/// Ready-queue error with operation context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The thread has no cached queue node for the core being operated on
    DetachedThread { core: i32 },

    /// A cached node handle was rejected by the ready list it should
    /// belong to (foreign or recycled node)
    InvalidNode { prio: i32, core: i32, cause: ListError },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DetachedThread { core } => {
                write!(f, "thread is not linked into a ready list on core {}", core)
            }
            Self::InvalidNode { prio, core, cause } => {
                write!(f, "ready list ({}, {}) rejected node: {}", prio, core, cause)
            }
        }
    }
}

impl SchedulerError {
    /// All queue errors are caller-contract violations; retrying cannot help.
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

/// Result type for ready-queue operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
