//! Configuration records produced by a configurator session.
//!
//! A [`ConfigurationRecord`] is the customer's selection: optional dimensions
//! plus at most one part name per [`PartKind`]. Once a record is attached to a
//! cart line it is treated as an immutable value; two records are the same
//! configuration iff their canonical JSON forms are equal.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::dimensions::Dimensions;
use crate::error::CoreError;

/// Maximum length of a selected part name.
pub const MAX_PART_NAME_LENGTH: usize = 100;

/// One customization axis of a configurable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartKind {
    Frame,
    LegType,
    TabletopType,
    Finish,
    Material,
}

impl PartKind {
    /// Order in which the pricing engine applies part modifiers.
    pub const PRICING_ORDER: [Self; 5] = [
        Self::Material,
        Self::Finish,
        Self::Frame,
        Self::LegType,
        Self::TabletopType,
    ];

    /// Stable string form used in the database and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::LegType => "legType",
            Self::TabletopType => "tabletopType",
            Self::Finish => "finish",
            Self::Material => "material",
        }
    }

    /// Parse the database string form.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an unknown kind.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "frame" => Ok(Self::Frame),
            "legType" => Ok(Self::LegType),
            "tabletopType" => Ok(Self::TabletopType),
            "finish" => Ok(Self::Finish),
            "material" => Ok(Self::Material),
            other => Err(CoreError::validation(format!("unknown part kind '{other}'"))),
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The customer's configurator selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigurationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leg_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabletop_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

impl ConfigurationRecord {
    /// Set the dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Select a part name for one kind, replacing any previous selection.
    #[must_use]
    pub fn with_selection(mut self, kind: PartKind, name: impl Into<String>) -> Self {
        *self.slot_mut(kind) = Some(name.into());
        self
    }

    /// The selected part name for a kind, if any.
    #[must_use]
    pub fn selection(&self, kind: PartKind) -> Option<&str> {
        match kind {
            PartKind::Frame => self.frame_type.as_deref(),
            PartKind::LegType => self.leg_type.as_deref(),
            PartKind::TabletopType => self.tabletop_type.as_deref(),
            PartKind::Finish => self.finish.as_deref(),
            PartKind::Material => self.material.as_deref(),
        }
    }

    /// True when nothing was selected at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_none() && PartKind::PRICING_ORDER.iter().all(|k| self.selection(*k).is_none())
    }

    /// Validate and normalize a record submitted by a client.
    ///
    /// Part names are trimmed, dimensions are checked positive and stripped of
    /// trailing zeros. The result is the form that gets priced, stored and
    /// compared.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for blank or oversized part names and
    /// non-positive dimensions.
    pub fn canonicalize(mut self) -> Result<Self, CoreError> {
        if let Some(dims) = self.dimensions {
            dims.validate()?;
            self.dimensions = Some(dims.normalized());
        }

        for kind in PartKind::PRICING_ORDER {
            let slot = self.slot_mut(kind);
            if let Some(name) = slot.take() {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(CoreError::validation(format!("{kind} selection is blank")));
                }
                if trimmed.chars().count() > MAX_PART_NAME_LENGTH {
                    return Err(CoreError::validation(format!(
                        "{kind} selection must be at most {MAX_PART_NAME_LENGTH} characters"
                    )));
                }
                *slot = Some(trimmed.to_owned());
            }
        }

        Ok(self)
    }

    /// Canonical JSON form used as the cart merge key.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the record cannot be serialized.
    pub fn canonical_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::validation(format!("unserializable configuration: {e}")))
    }

    /// Merge key for an optional configuration: empty string when absent.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::canonical_json`] failures.
    pub fn merge_key(configuration: Option<&Self>) -> Result<String, CoreError> {
        configuration.map_or_else(|| Ok(String::new()), Self::canonical_json)
    }

    fn slot_mut(&mut self, kind: PartKind) -> &mut Option<String> {
        match kind {
            PartKind::Frame => &mut self.frame_type,
            PartKind::LegType => &mut self.leg_type,
            PartKind::TabletopType => &mut self.tabletop_type,
            PartKind::Finish => &mut self.finish,
            PartKind::Material => &mut self.material,
        }
    }
}
