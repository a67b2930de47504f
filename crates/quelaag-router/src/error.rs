//! Dispatch errors.
//!
//! Every failure raised by a predicate, handler or observer action is wrapped
//! in a [`DispatchError`] that names the entry it came from. Errors are
//! offered to the entry's own error handler, then to the dispatcher-wide
//! catcher; whatever neither handles surfaces to the caller.

use std::fmt;
use std::sync::Arc;

use quelaag_core::{BoxError, SharedError};
use thiserror::Error;

/// The registered entry a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Endpoint at the given registration index.
    Endpoint(usize),
    /// Sub-router endpoint at the given registration index.
    SubRoute(usize),
    /// Observer at the given registration index.
    Observer(usize),
    /// The fallback handler.
    Fallback,
}

impl Target {
    /// Returns the entry kind as a metric label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Endpoint(_) => "endpoint",
            Self::SubRoute(_) => "sub_route",
            Self::Observer(_) => "observer",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(index) => write!(f, "endpoint #{index}"),
            Self::SubRoute(index) => write!(f, "sub-route #{index}"),
            Self::Observer(index) => write!(f, "observer #{index}"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// The step of an entry that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Evaluating the predicate.
    Predicate,
    /// Running the handler or action.
    Action,
    /// Running an error handler.
    Catch,
}

impl Phase {
    /// Returns the phase as a metric label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Predicate => "predicate",
            Self::Action => "action",
            Self::Catch => "catch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A panic captured from a callback, usable as an error source.
#[derive(Debug, Clone, Error)]
#[error("panicked: {0}")]
pub struct PanicError(pub String);

/// Errors raised while dispatching a request.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// A predicate returned an error or its future rejected.
    #[error("{target} predicate failed: {source}")]
    Predicate {
        /// Failing entry.
        target: Target,
        /// Underlying failure.
        #[source]
        source: SharedError,
    },

    /// A handler or action returned an error or its future rejected.
    #[error("{target} action failed: {source}")]
    Action {
        /// Failing entry.
        target: Target,
        /// Underlying failure.
        #[source]
        source: SharedError,
    },

    /// A predicate or handler panicked.
    #[error("{target} panicked during {phase}: {message}")]
    Panicked {
        /// Failing entry.
        target: Target,
        /// Step that panicked.
        phase: Phase,
        /// Panic payload rendered as text.
        message: String,
    },

    /// The entry's own error handler failed.
    #[error("error handler of {target} failed: {source}")]
    Catch {
        /// Entry whose handler failed.
        target: Target,
        /// What the handler raised.
        #[source]
        source: SharedError,
        /// The failure the handler was given.
        original: Box<DispatchError>,
    },

    /// The dispatcher-wide catcher failed.
    #[error("global error handler failed: {source}")]
    GlobalCatch {
        /// What the catcher raised.
        #[source]
        source: SharedError,
        /// The failure the catcher was given.
        original: Box<DispatchError>,
    },

    /// A background task ended without reporting (it was cancelled).
    #[error("background task of {target} did not complete: {message}")]
    Join {
        /// Entry the task belonged to.
        target: Target,
        /// Reason reported by the runtime.
        message: String,
    },
}

impl DispatchError {
    pub(crate) fn raised(target: Target, phase: Phase, source: BoxError) -> Self {
        let source = Arc::from(source);
        match phase {
            Phase::Predicate => Self::Predicate { target, source },
            Phase::Action | Phase::Catch => Self::Action { target, source },
        }
    }

    pub(crate) fn panicked(target: Target, phase: Phase, message: impl Into<String>) -> Self {
        Self::Panicked {
            target,
            phase,
            message: message.into(),
        }
    }

    /// Returns the entry the failure belongs to.
    pub fn target(&self) -> Option<Target> {
        match self {
            Self::Predicate { target, .. }
            | Self::Action { target, .. }
            | Self::Panicked { target, .. }
            | Self::Catch { target, .. }
            | Self::Join { target, .. } => Some(*target),
            Self::GlobalCatch { original, .. } => original.target(),
        }
    }

    /// Returns the step that failed.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Predicate { .. } => Phase::Predicate,
            Self::Action { .. } | Self::Join { .. } => Phase::Action,
            Self::Panicked { phase, .. } => *phase,
            Self::Catch { .. } | Self::GlobalCatch { .. } => Phase::Catch,
        }
    }

    /// Returns the innermost failure, skipping failed error handlers.
    pub fn root(&self) -> &DispatchError {
        match self {
            Self::Catch { original, .. } | Self::GlobalCatch { original, .. } => original.root(),
            other => other,
        }
    }

    /// Returns the failure raised by the user callback, when there is one.
    pub fn user_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.root() {
            Self::Predicate { source, .. } | Self::Action { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
