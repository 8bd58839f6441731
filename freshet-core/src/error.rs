// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the freshet reactive-streams library.
//!
//! All stream failures travel through the single [`FreshetError`] enum so
//! that operators can forward, accumulate and combine them without knowing
//! what produced them. User code injects its own failures through the
//! [`FreshetError::User`] variant.
//!
//! # Examples
//!
//! ```
//! use freshet_core::{FreshetError, Result};
//!
//! fn deliver() -> Result<()> {
//!     Err(FreshetError::lack_of_demand("no outstanding requests"))
//! }
//! ```

/// Root error type for all freshet stream signals.
#[derive(Debug, thiserror::Error)]
pub enum FreshetError {
    /// The subscription protocol was violated.
    ///
    /// Raised for non-positive request amounts, double subscriptions and
    /// signals emitted after a terminal event.
    #[error("Protocol violation: {context}")]
    Protocol {
        /// Description of the violated rule
        context: String,
    },

    /// A bounded hand-off queue refused an element.
    ///
    /// Emitted by async-boundary operators when the upstream outpaces the
    /// agreed prefetch.
    #[error("Queue overflow: {context}")]
    Overflow {
        /// Which queue overflowed
        context: String,
    },

    /// A value arrived while the downstream had no outstanding demand.
    ///
    /// Only raised by operators that cannot buffer, such as the multicast
    /// processor and the timer sources.
    #[error("Could not emit value due to lack of requests: {context}")]
    LackOfDemand {
        /// Which emission was refused
        context: String,
    },

    /// A scheduler refused to accept a unit of work.
    #[error("Scheduler rejected the task: {context}")]
    Rejected {
        /// Which hand-off was refused
        context: String,
    },

    /// General stream-processing failure.
    #[error("Stream processing error: {context}")]
    Stream {
        /// Description of what went wrong
        context: String,
    },

    /// Custom error from user code.
    ///
    /// Wraps errors produced by user sources and callbacks so they can be
    /// propagated through operator chains.
    #[error("User error: {0}")]
    User(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Multiple errors accumulated by a delay-errors operator.
    #[error("Multiple errors occurred: {count} errors")]
    Composite {
        /// Number of accumulated errors
        count: usize,
        /// The individual errors, in arrival order
        errors: Vec<FreshetError>,
    },
}

impl FreshetError {
    /// Create a protocol-violation error with the given context.
    pub fn protocol(context: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
        }
    }

    /// Create a queue-overflow error with the given context.
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::Overflow {
            context: context.into(),
        }
    }

    /// Create a lack-of-demand error with the given context.
    pub fn lack_of_demand(context: impl Into<String>) -> Self {
        Self::LackOfDemand {
            context: context.into(),
        }
    }

    /// Create a rejected-execution error with the given context.
    pub fn rejected(context: impl Into<String>) -> Self {
        Self::Rejected {
            context: context.into(),
        }
    }

    /// Create a general stream-processing error with the given context.
    pub fn stream(context: impl Into<String>) -> Self {
        Self::Stream {
            context: context.into(),
        }
    }

    /// Wrap a user error.
    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::User(Box::new(error))
    }

    /// Combine accumulated errors into one terminal error.
    ///
    /// A single accumulated error is returned as-is; several are wrapped in
    /// a [`FreshetError::Composite`]. An empty input is a logic error on the
    /// caller's side and maps to a generic stream error.
    #[must_use]
    pub fn composite(mut errors: Vec<FreshetError>) -> Self {
        match errors.len() {
            0 => Self::stream("no errors were accumulated"),
            1 => errors.swap_remove(0),
            count => Self::Composite { count, errors },
        }
    }

    /// Returns `true` if this is a protocol violation.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns `true` if this is a queue-overflow error.
    #[must_use]
    pub const fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }

    /// Returns `true` if this is a lack-of-demand error.
    #[must_use]
    pub const fn is_lack_of_demand(&self) -> bool {
        matches!(self, Self::LackOfDemand { .. })
    }

    /// Returns `true` if this is a rejected-execution error.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns `true` if this aggregates several errors.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }
}

/// Specialized `Result` type for freshet operations.
pub type Result<T> = std::result::Result<T, FreshetError>;

impl Clone for FreshetError {
    fn clone(&self) -> Self {
        match self {
            Self::Protocol { context } => Self::Protocol {
                context: context.clone(),
            },
            Self::Overflow { context } => Self::Overflow {
                context: context.clone(),
            },
            Self::LackOfDemand { context } => Self::LackOfDemand {
                context: context.clone(),
            },
            Self::Rejected { context } => Self::Rejected {
                context: context.clone(),
            },
            Self::Stream { context } => Self::Stream {
                context: context.clone(),
            },
            // The boxed error cannot be cloned; preserve its message
            Self::User(e) => Self::Stream {
                context: format!("User error: {e}"),
            },
            Self::Composite { count, errors } => Self::Composite {
                count: *count,
                errors: errors.clone(),
            },
        }
    }
}
