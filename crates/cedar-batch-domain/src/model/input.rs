//! Batch input shapes and their normalization into flat request sequences.

use std::collections::HashMap;

use super::types::{Action, Principal, Request, Resource};

/// What a caller hands to a batch check.
///
/// Both shapes normalize into the same flat `Vec<Request>` before anything
/// else happens, so the pipeline never sees the difference.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// An explicit, ordered list of requests.
    Requests(Vec<Request>),
    /// One principal and, per action, the resources to check it against.
    Grouped {
        principal: Principal,
        actions: HashMap<Action, Vec<Resource>>,
    },
}

impl BatchInput {
    /// Creates a grouped input for a single principal.
    pub fn grouped<A, R>(principal: impl Into<Principal>, actions: A) -> Self
    where
        A: IntoIterator<Item = (Action, R)>,
        R: IntoIterator<Item = Resource>,
    {
        Self::Grouped {
            principal: principal.into(),
            actions: actions
                .into_iter()
                .map(|(action, resources)| (action, resources.into_iter().collect()))
                .collect(),
        }
    }

    /// Number of requests this input expands to.
    pub fn len_hint(&self) -> usize {
        match self {
            Self::Requests(requests) => requests.len(),
            Self::Grouped { actions, .. } => actions.values().map(Vec::len).sum(),
        }
    }

    /// Flattens the input into individual requests.
    ///
    /// The list form keeps its order. The grouped form yields one request per
    /// `(action, resource)` pair; the order across actions follows map
    /// iteration and is unspecified.
    pub fn normalize(self) -> Vec<Request> {
        match self {
            Self::Requests(requests) => requests,
            Self::Grouped { principal, actions } => {
                let mut requests = Vec::with_capacity(actions.values().map(Vec::len).sum());
                for (action, resources) in actions {
                    for resource in resources {
                        requests.push(Request {
                            principal: principal.clone(),
                            action: action.clone(),
                            resource,
                        });
                    }
                }
                requests
            }
        }
    }
}

impl From<Vec<Request>> for BatchInput {
    fn from(requests: Vec<Request>) -> Self {
        Self::Requests(requests)
    }
}
