//! Attribute and location sub-selections of a choice.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ids::{AttributeCommunityId, AttributeGroupId, AttributeId, ChoiceId, LocationGroupId, LocationId},
    tree::Choice,
};

/// A selectable attribute (a color, a material, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute id.
    pub id: AttributeId,
    /// Community-level id, which is what monotony rules list.
    pub community_id: AttributeCommunityId,
    /// Display name.
    pub label: String,
    /// Set by the monotony checker when this attribute collides with a
    /// neighbouring home.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub monotony_conflict: bool,
}

impl Attribute {
    /// Creates an attribute whose community id equals its id.
    #[must_use]
    pub fn new(id: AttributeId, label: impl Into<String>) -> Self {
        Self {
            id,
            community_id: AttributeCommunityId(id.0),
            label: label.into(),
            monotony_conflict: false,
        }
    }
}

/// A named set of attributes offered on a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    /// Group id.
    pub id: AttributeGroupId,
    /// Display name.
    pub label: String,
    /// The attributes in this group.
    pub attributes: Vec<Attribute>,
}

impl AttributeGroup {
    /// Looks up an attribute of this group.
    #[must_use]
    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

/// A place a choice can be installed (a room, a wall, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Location id.
    pub id: LocationId,
    /// Display name.
    pub label: String,
}

/// A named set of locations offered on a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationGroup {
    /// Group id.
    pub id: LocationGroupId,
    /// Display name.
    pub label: String,
    /// The locations in this group.
    pub locations: Vec<Location>,
}

impl LocationGroup {
    /// Looks up a location of this group.
    #[must_use]
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

/// One sub-selection recorded on a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// An attribute chosen for the choice as a whole.
    AttributeOnly {
        /// Group the attribute belongs to.
        attribute_group: AttributeGroupId,
        /// The chosen attribute.
        attribute: AttributeId,
    },
    /// An attribute chosen for one location of the choice.
    LocationAttribute {
        /// Group the location belongs to.
        location_group: LocationGroupId,
        /// The chosen location.
        location: LocationId,
        /// How many units go in this location.
        quantity: u32,
        /// Group the attribute belongs to.
        attribute_group: AttributeGroupId,
        /// The chosen attribute.
        attribute: AttributeId,
    },
    /// A location without an attribute.
    LocationOnly {
        /// Group the location belongs to.
        location_group: LocationGroupId,
        /// The chosen location.
        location: LocationId,
        /// How many units go in this location.
        quantity: u32,
    },
}

impl Selection {
    /// The attribute this selection picks, if any.
    #[must_use]
    pub const fn attribute(&self) -> Option<(AttributeGroupId, AttributeId)> {
        match self {
            Self::AttributeOnly {
                attribute_group,
                attribute,
            }
            | Self::LocationAttribute {
                attribute_group,
                attribute,
                ..
            } => Some((*attribute_group, *attribute)),
            Self::LocationOnly { .. } => None,
        }
    }

    /// The location this selection picks, if any.
    #[must_use]
    pub const fn location(&self) -> Option<(LocationGroupId, LocationId)> {
        match self {
            Self::LocationAttribute {
                location_group,
                location,
                ..
            }
            | Self::LocationOnly {
                location_group,
                location,
                ..
            } => Some((*location_group, *location)),
            Self::AttributeOnly { .. } => None,
        }
    }

    /// Units placed by this selection; zero for attribute-only selections.
    #[must_use]
    pub const fn location_quantity(&self) -> u32 {
        match self {
            Self::LocationAttribute { quantity, .. } | Self::LocationOnly { quantity, .. } => {
                *quantity
            }
            Self::AttributeOnly { .. } => 0,
        }
    }
}

/// Errors validating the sub-selections of a choice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The attribute group is not offered on the choice.
    #[error("choice {choice} has no attribute group {group}")]
    UnknownAttributeGroup {
        /// The choice.
        choice: ChoiceId,
        /// The missing group.
        group: AttributeGroupId,
    },
    /// The attribute is not part of the group.
    #[error("attribute group {group} of choice {choice} has no attribute {attribute}")]
    UnknownAttribute {
        /// The choice.
        choice: ChoiceId,
        /// The group searched.
        group: AttributeGroupId,
        /// The missing attribute.
        attribute: AttributeId,
    },
    /// The location group is not offered on the choice.
    #[error("choice {choice} has no location group {group}")]
    UnknownLocationGroup {
        /// The choice.
        choice: ChoiceId,
        /// The missing group.
        group: LocationGroupId,
    },
    /// The location is not part of the group.
    #[error("location group {group} of choice {choice} has no location {location}")]
    UnknownLocation {
        /// The choice.
        choice: ChoiceId,
        /// The group searched.
        group: LocationGroupId,
        /// The missing location.
        location: LocationId,
    },
    /// A location was selected with a quantity of zero.
    #[error("location {location} of choice {choice} has a zero quantity")]
    ZeroLocationQuantity {
        /// The choice.
        choice: ChoiceId,
        /// The location.
        location: LocationId,
    },
    /// The location quantities add up to more than the choice allows.
    #[error("choice {choice} allows at most {max} units, {requested} placed across locations")]
    QuantityExceeded {
        /// The choice.
        choice: ChoiceId,
        /// Sum of the location quantities.
        requested: u32,
        /// The choice's maximum quantity.
        max: u32,
    },
}

/// Checks `selections` against the groups offered on `choice`.
///
/// Returns the total number of units placed across locations.
///
/// # Errors
///
/// Returns a [`SelectionError`] if a selection names a group, attribute or
/// location the choice does not offer, if a location has a zero quantity, or
/// if the location quantities add up to more than the choice's maximum.
pub fn validate_selections(choice: &Choice, selections: &[Selection]) -> Result<u32, SelectionError> {
    let mut placed: u32 = 0;

    for selection in selections {
        if let Some((group_id, attribute_id)) = selection.attribute() {
            let group = choice
                .attribute_groups
                .iter()
                .find(|g| g.id == group_id)
                .ok_or(SelectionError::UnknownAttributeGroup {
                    choice: choice.id,
                    group: group_id,
                })?;
            if group.attribute(attribute_id).is_none() {
                return Err(SelectionError::UnknownAttribute {
                    choice: choice.id,
                    group: group_id,
                    attribute: attribute_id,
                });
            }
        }

        if let Some((group_id, location_id)) = selection.location() {
            let group = choice
                .location_groups
                .iter()
                .find(|g| g.id == group_id)
                .ok_or(SelectionError::UnknownLocationGroup {
                    choice: choice.id,
                    group: group_id,
                })?;
            if group.location(location_id).is_none() {
                return Err(SelectionError::UnknownLocation {
                    choice: choice.id,
                    group: group_id,
                    location: location_id,
                });
            }
            if selection.location_quantity() == 0 {
                return Err(SelectionError::ZeroLocationQuantity {
                    choice: choice.id,
                    location: location_id,
                });
            }
            placed = placed.saturating_add(selection.location_quantity());
        }
    }

    if placed > choice.max_quantity {
        return Err(SelectionError::QuantityExceeded {
            choice: choice.id,
            requested: placed,
            max: choice.max_quantity,
        });
    }

    Ok(placed)
}
