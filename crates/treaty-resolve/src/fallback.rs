//! Which failures license trying the next verb candidate.

use treaty_core::{OperationFamily, TreatyError};

/// A failure class that is fallback-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCondition {
    /// The client exposes no callable at the attempted verb.
    NoCallable,
    /// The endpoint answered with this status.
    StatusCode(u16),
}

impl FallbackCondition {
    /// Check if an error matches this condition.
    pub fn matches(&self, error: &TreatyError) -> bool {
        match (self, error) {
            (Self::NoCallable, TreatyError::NoCallable { .. }) => true,
            (Self::StatusCode(code), TreatyError::Endpoint(err)) => err.status_code() == Some(*code),
            _ => false,
        }
    }
}

/// Fallback policy for one operation family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Conditions that advance to the next candidate.
    pub fallback_on: Vec<FallbackCondition>,
}

impl FallbackPolicy {
    /// Create a policy from explicit conditions.
    pub fn new(conditions: Vec<FallbackCondition>) -> Self {
        Self {
            fallback_on: conditions,
        }
    }

    /// Create a policy that never falls back.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// The policy used for automatic resolution in `family`.
    ///
    /// Queries fall back on a missing callable or 405, mutations also on 404,
    /// subscriptions never.
    pub fn for_family(family: OperationFamily) -> Self {
        match family {
            OperationFamily::Query => Self::new(vec![
                FallbackCondition::NoCallable,
                FallbackCondition::StatusCode(405),
            ]),
            OperationFamily::Mutation => Self::new(vec![
                FallbackCondition::NoCallable,
                FallbackCondition::StatusCode(404),
                FallbackCondition::StatusCode(405),
            ]),
            OperationFamily::Subscription => Self::none(),
        }
    }

    /// Set fallback conditions.
    pub fn with_conditions(mut self, conditions: Vec<FallbackCondition>) -> Self {
        self.fallback_on = conditions;
        self
    }

    /// Check if `error` should advance to the next candidate.
    ///
    /// Cancellation always propagates.
    pub fn allows(&self, error: &TreatyError) -> bool {
        if matches!(error, TreatyError::Cancelled) {
            return false;
        }
        self.fallback_on.iter().any(|c| c.matches(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use treaty_core::EndpointError;

    fn status(code: u16) -> TreatyError {
        EndpointError::status(code, json!(null)).into()
    }

    fn no_callable() -> TreatyError {
        TreatyError::NoCallable { path: "a.get".into() }
    }

    #[test]
    fn test_query_policy() {
        let policy = FallbackPolicy::for_family(OperationFamily::Query);
        assert!(policy.allows(&status(405)));
        assert!(policy.allows(&no_callable()));
        assert!(!policy.allows(&status(404)));
        assert!(!policy.allows(&status(500)));
    }

    #[test]
    fn test_mutation_policy() {
        let policy = FallbackPolicy::for_family(OperationFamily::Mutation);
        assert!(policy.allows(&status(404)));
        assert!(policy.allows(&status(405)));
        assert!(policy.allows(&no_callable()));
        assert!(!policy.allows(&status(422)));
    }

    #[test]
    fn test_subscription_policy_never_falls_back() {
        let policy = FallbackPolicy::for_family(OperationFamily::Subscription);
        assert!(!policy.allows(&no_callable()));
    }

    #[test]
    fn test_cancellation_is_never_eligible() {
        let policy = FallbackPolicy::for_family(OperationFamily::Mutation);
        assert!(!policy.allows(&TreatyError::Cancelled));
    }

    #[test]
    fn test_transport_and_stream_errors_are_not_eligible() {
        let policy = FallbackPolicy::for_family(OperationFamily::Mutation);
        assert!(!policy.allows(&EndpointError::Transport("reset".into()).into()));
        assert!(!policy.allows(&TreatyError::Stream(EndpointError::status(405, json!(null)))));
    }
}
