//! Asset categories, one backing store per category.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The kind of asset a record describes. Determines which store owns it.
///
/// `Quarantine` is reserved for stale assets pulled out of circulation; it is
/// a store like any other, but never a device type.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
  Computer,
  Monitor,
  Server,
  Switch,
  Tablet,
  Quarantine,
}

impl Category {
  /// The attribute that must be supplied when filing a record under this
  /// category.
  pub fn required_attribute(self) -> AttributeField {
    match self {
      Self::Computer => AttributeField::Owner,
      Self::Monitor => AttributeField::Model,
      Self::Server | Self::Switch | Self::Tablet | Self::Quarantine => {
        AttributeField::Serial
      }
    }
  }

  pub fn is_quarantine(self) -> bool { matches!(self, Self::Quarantine) }
}

/// The category-specific attribute carried by an asset record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeField {
  Owner,
  Model,
  Serial,
}

impl AttributeField {
  /// Document field name for this attribute.
  pub fn field_name(self) -> &'static str {
    match self {
      Self::Owner => crate::asset::fields::OWNER,
      Self::Model => crate::asset::fields::MODEL,
      Self::Serial => crate::asset::fields::SERIAL,
    }
  }
}
