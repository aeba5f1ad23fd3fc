use super::HttpMethod;
use std::fmt;

/// Route registration error.
///
/// Returned by the registration API while the route table is being built.
/// None of these can occur once a [`Router`](super::Router) exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The fully-qualified template did not compile to a valid pattern
    InvalidPattern {
        /// Template after prefix concatenation
        template: String,
        /// Message from the regex compiler
        reason: String,
    },
    /// A handler is already bound for this method on the route
    DuplicateMethod {
        /// The offending method
        method: HttpMethod,
        /// Compiled pattern source of the route
        pattern: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPattern { template, reason } => {
                write!(f, "invalid route template '{}': {}", template, reason)
            }
            RouteError::DuplicateMethod { method, pattern } => {
                write!(
                    f,
                    "method '{}' is already bound to another handler on route '{}'",
                    method, pattern
                )
            }
        }
    }
}

impl std::error::Error for RouteError {}
