//! Strongly typed identifiers for tree nodes and their catalog counterparts.
//!
//! Tree ids (`PointId`, `ChoiceId`, ...) are only unique within one tree
//! version. Catalog ids (`PointCatalogId`, `ChoiceCatalogId`) are stable across
//! tree versions and are what monotony rules and prior agreements refer to.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a [`Group`](crate::domain::tree::Group).
    GroupId
);
numeric_id!(
    /// Identifier of a [`SubGroup`](crate::domain::tree::SubGroup).
    SubGroupId
);
numeric_id!(
    /// Identifier of a [`DecisionPoint`](crate::domain::tree::DecisionPoint),
    /// unique within one tree version.
    PointId
);
numeric_id!(
    /// Identifier of a [`Choice`](crate::domain::tree::Choice), unique within
    /// one tree version.
    ChoiceId
);
numeric_id!(
    /// Catalog identity of a decision point, stable across tree versions.
    PointCatalogId
);
numeric_id!(
    /// Catalog identity of a choice, stable across tree versions.
    ChoiceCatalogId
);
numeric_id!(
    /// Identifier of an attribute group attached to a choice.
    AttributeGroupId
);
numeric_id!(
    /// Identifier of an attribute.
    AttributeId
);
numeric_id!(
    /// Community-level identity of an attribute, used by monotony rules.
    AttributeCommunityId
);
numeric_id!(
    /// Identifier of a location group attached to a choice.
    LocationGroupId
);
numeric_id!(
    /// Identifier of a location.
    LocationId
);
numeric_id!(
    /// Identifier of a floor plan.
    PlanId
);
numeric_id!(
    /// Identifier of a lot (homesite).
    LotId
);
numeric_id!(
    /// Identifier of a lot's sales phase.
    SalesPhaseId
);
numeric_id!(
    /// Identifier of a sales program.
    SalesProgramId
);

/// Financial option number a choice maps to on a plan (for example `"80012"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(String);

impl OptionKey {
    /// Creates a new option key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OptionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OptionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A node of the tree that rules can reference or be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeRef {
    /// A decision point.
    Point(PointId),
    /// A choice.
    Choice(ChoiceId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(id) => write!(f, "point {id}"),
            Self::Choice(id) => write!(f, "choice {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ChoiceId(42)).unwrap();
        assert_eq!(json, "42");

        let key: OptionKey = serde_json::from_str("\"80012\"").unwrap();
        assert_eq!(key.as_str(), "80012");
    }

    #[test]
    fn node_refs_order_points_before_choices() {
        let mut refs = vec![NodeRef::Choice(ChoiceId(1)), NodeRef::Point(PointId(9))];
        refs.sort();
        assert_eq!(refs[0], NodeRef::Point(PointId(9)));
        assert_eq!(NodeRef::Choice(ChoiceId(1)).to_string(), "choice 1");
    }
}
