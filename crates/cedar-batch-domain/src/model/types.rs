//! Core type definitions for authorization requests and decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

identifier! {
    /// The entity asking for access (e.g., `User::"alice"`).
    Principal
}

identifier! {
    /// The operation being attempted (e.g., `Action::"read"`).
    Action
}

identifier! {
    /// The entity being accessed (e.g., `Document::"doc1"`).
    Resource
}

/// One authorization question: can `principal` perform `action` on `resource`?
///
/// Requests compare and hash by the full triple, which makes them usable
/// directly as keys of a batch result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub principal: Principal,
    pub action: Action,
    pub resource: Resource,
}

impl Request {
    /// Creates a new request from its three parts.
    pub fn new(
        principal: impl Into<Principal>,
        action: impl Into<Action>,
        resource: impl Into<Resource>,
    ) -> Self {
        Self {
            principal: principal.into(),
            action: action.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.principal, self.action, self.resource)
    }
}

/// Explanation of how a decision was reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Errors raised by policies during evaluation.
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    /// Ids of the policies that determined the decision, in reported order.
    #[serde(default)]
    pub reason: Vec<String>,
}

/// The outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl Decision {
    /// An allow decision with empty diagnostics.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            diagnostics: Diagnostics::default(),
        }
    }

    /// A deny decision with empty diagnostics.
    pub fn deny() -> Self {
        Self {
            allowed: false,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Appends a policy id to the decision's reasons.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.diagnostics.reason.push(reason.into());
        self
    }
}
