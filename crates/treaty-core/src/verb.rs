//! Verbs exposed by endpoint nodes and the operation families that use them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named callable operation on an endpoint node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Connect,
    Subscribe,
}

/// Candidate order for the query family.
pub const QUERY_VERB_ORDER: [Verb; 2] = [Verb::Get, Verb::Head];

/// Candidate order for mutations on routes carrying path parameters.
pub const MUTATION_VERB_ORDER_WITH_PARAMS: [Verb; 6] = [
    Verb::Patch,
    Verb::Delete,
    Verb::Put,
    Verb::Post,
    Verb::Options,
    Verb::Connect,
];

/// Candidate order for mutations on routes without path parameters.
pub const MUTATION_VERB_ORDER_NO_PARAMS: [Verb; 6] = [
    Verb::Post,
    Verb::Put,
    Verb::Patch,
    Verb::Delete,
    Verb::Options,
    Verb::Connect,
];

/// Candidate order for the subscription family.
pub const SUBSCRIPTION_VERB_ORDER: [Verb; 1] = [Verb::Subscribe];

impl Verb {
    /// Every verb, in declaration order.
    pub const ALL: [Verb; 9] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Options,
        Verb::Connect,
        Verb::Subscribe,
    ];

    /// The client-side callable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Head => "head",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Options => "options",
            Verb::Connect => "connect",
            Verb::Subscribe => "subscribe",
        }
    }

    /// Look up a verb by its callable name.
    pub fn parse(name: &str) -> Option<Verb> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }

    /// Whether `name` is reserved for a verb and must not be called directly.
    pub fn is_reserved(name: &str) -> bool {
        Self::parse(name).is_some()
    }

    /// The family this verb belongs to.
    pub fn family(&self) -> OperationFamily {
        match self {
            Verb::Get | Verb::Head => OperationFamily::Query,
            Verb::Subscribe => OperationFamily::Subscription,
            _ => OperationFamily::Mutation,
        }
    }

    /// The utility application code should call instead of this verb.
    pub fn suggested_utility(&self) -> &'static str {
        match self.family() {
            OperationFamily::Query => ".query_options(input?, opts?)",
            OperationFamily::Subscription => ".subscription_options(input?, opts?)",
            OperationFamily::Mutation => ".mutation_options(opts?)",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = crate::TreatyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::TreatyError::UnknownVerb(s.to_string()))
    }
}

/// Operation family, selecting the candidate ordering for verb resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationFamily {
    Query,
    Mutation,
    Subscription,
}

impl OperationFamily {
    /// Fixed candidate order for automatic resolution.
    pub fn candidates(&self, has_path_params: bool) -> &'static [Verb] {
        match self {
            Self::Query => &QUERY_VERB_ORDER,
            Self::Mutation if has_path_params => &MUTATION_VERB_ORDER_WITH_PARAMS,
            Self::Mutation => &MUTATION_VERB_ORDER_NO_PARAMS,
            Self::Subscription => &SUBSCRIPTION_VERB_ORDER,
        }
    }

    /// Whether `verb` may be pinned for this family.
    pub fn accepts(&self, verb: Verb) -> bool {
        verb.family() == *self
    }

    /// Get the name of this family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trips_through_name() {
        for verb in Verb::ALL {
            assert_eq!(Verb::parse(verb.as_str()), Some(verb));
        }
        assert_eq!(Verb::parse("fetch"), None);
        assert!("GET".parse::<Verb>().is_err());
    }

    #[test]
    fn test_reserved_names() {
        assert!(Verb::is_reserved("get"));
        assert!(Verb::is_reserved("subscribe"));
        assert!(!Verb::is_reserved("queryOptions"));
        assert!(!Verb::is_reserved("users"));
    }

    #[test]
    fn test_families() {
        assert_eq!(Verb::Head.family(), OperationFamily::Query);
        assert_eq!(Verb::Connect.family(), OperationFamily::Mutation);
        assert_eq!(Verb::Subscribe.family(), OperationFamily::Subscription);
        assert!(OperationFamily::Mutation.accepts(Verb::Put));
        assert!(!OperationFamily::Mutation.accepts(Verb::Get));
    }

    #[test]
    fn test_candidate_orders() {
        assert_eq!(OperationFamily::Query.candidates(true), &[Verb::Get, Verb::Head]);
        assert_eq!(
            OperationFamily::Mutation.candidates(true)[..4],
            [Verb::Patch, Verb::Delete, Verb::Put, Verb::Post]
        );
        assert_eq!(OperationFamily::Mutation.candidates(false)[0], Verb::Post);
        assert_eq!(OperationFamily::Mutation.candidates(false).len(), 6);
        assert_eq!(OperationFamily::Subscription.candidates(false), &[Verb::Subscribe]);
    }

    #[test]
    fn test_suggested_utility() {
        assert!(Verb::Get.suggested_utility().contains("query_options"));
        assert!(Verb::Subscribe.suggested_utility().contains("subscription_options"));
        assert!(Verb::Delete.suggested_utility().contains("mutation_options"));
    }
}
