/// Inventory item model
///
/// An item's `timestamp` is fixed at creation. `total_surface_area` is
/// derived from `dimensions` and `quantity` and is rebuilt by the inventory
/// service on every create and update; it is never set by callers.
///
/// # Stored shape
///
/// ```json
/// {
///   "id": "018f3c2e-...",
///   "name": "Plywood",
///   "quantity": 2,
///   "dimensions": { "length": 4, "width": 2, "thickness": 0, "unit": "ft" },
///   "totalSurfaceArea": { "value": 16.0, "unit": "ft²", "formatted": "16.00 ft²" },
///   "timestamp": "2024-05-01T09:30:00Z",
///   "dateAdded": "05/01/2024, 09:30:00 AM"
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Length unit for item dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "mm")]
    Millimeter,

    #[serde(rename = "cm")]
    Centimeter,

    #[serde(rename = "m")]
    Meter,

    #[serde(rename = "in")]
    Inch,

    #[serde(rename = "ft")]
    Foot,
}

impl LengthUnit {
    /// Square feet per square unit
    pub fn square_feet_factor(self) -> f64 {
        match self {
            LengthUnit::Centimeter => 0.00107639,
            LengthUnit::Millimeter => 0.0000107639,
            LengthUnit::Inch => 0.00694444,
            LengthUnit::Meter => 10.7639,
            LengthUnit::Foot => 1.0,
        }
    }

    /// Short unit symbol as stored
    pub fn as_str(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
            LengthUnit::Inch => "in",
            LengthUnit::Foot => "ft",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a length unit symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown length unit '{0}' (expected mm, cm, m, in or ft)")]
pub struct UnknownUnit(pub String);

impl FromStr for LengthUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" => Ok(LengthUnit::Millimeter),
            "cm" => Ok(LengthUnit::Centimeter),
            "m" => Ok(LengthUnit::Meter),
            "in" => Ok(LengthUnit::Inch),
            "ft" => Ok(LengthUnit::Foot),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

/// Physical dimensions of a single item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,

    /// Zero for flat panels
    #[serde(default)]
    pub thickness: f64,

    pub unit: LengthUnit,
}

impl Dimensions {
    /// Creates dimensions in the given unit
    pub fn new(length: f64, width: f64, thickness: f64, unit: LengthUnit) -> Self {
        Dimensions {
            length,
            width,
            thickness,
            unit,
        }
    }
}

/// Item weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub value: f64,
    pub unit: String,
}

/// Derived total surface area in square feet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceArea {
    /// Area in square feet, full precision
    pub value: f64,

    /// Always `ft²`
    pub unit: String,

    /// Value rounded to two decimals with unit suffix
    pub formatted: String,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Time-ordered identifier (UUID v7)
    pub id: String,

    pub name: String,

    pub quantity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Unit price; absent is treated as zero in totals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Weight>,

    /// Present iff `dimensions.length > 0 && dimensions.width > 0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_surface_area: Option<SurfaceArea>,

    /// Creation instant, immutable
    pub timestamp: DateTime<Utc>,

    /// Human-readable creation stamp
    pub date_added: String,

    /// Human-readable stamp of the last update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl InventoryItem {
    /// `price * quantity`, zero when unpriced
    pub fn line_value(&self) -> f64 {
        self.price.unwrap_or(0.0) * f64::from(self.quantity)
    }

    /// Case-insensitive substring match over name, description and category
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);

        hit(&self.name)
            || self.description.as_deref().map_or(false, hit)
            || self.category.as_deref().map_or(false, hit)
    }
}

/// Input for adding an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    pub quantity: u32,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub dimensions: Option<Dimensions>,

    #[serde(default)]
    pub weight: Option<Weight>,
}

impl CreateItem {
    /// Minimal input: name and quantity
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        CreateItem {
            name: name.into(),
            quantity,
            ..Default::default()
        }
    }

    /// Attaches dimensions
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Attaches a unit price
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Attaches a category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attaches a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Patch for an existing item
///
/// All fields are optional. Only `Some` fields are applied; for optional
/// item fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub quantity: Option<u32>,
    pub category: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub description: Option<Option<String>>,
    pub dimensions: Option<Option<Dimensions>>,
    pub weight: Option<Option<Weight>>,
}

impl UpdateItem {
    /// Whether the patch touches a field the surface area depends on
    pub fn touches_surface_area(&self) -> bool {
        self.quantity.is_some() || self.dimensions.is_some()
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == UpdateItem::default()
    }
}
