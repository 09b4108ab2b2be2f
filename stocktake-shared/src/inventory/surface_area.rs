/// Surface-area calculator
///
/// Pure functions deriving `totalSurfaceArea` from an item's dimensions and
/// quantity:
///
/// - `thickness > 0`: closed box, `2·(L·W + L·T + W·T)`
/// - otherwise: flat panel, `L·W`
///
/// The single-item area is multiplied by the quantity and converted to
/// square feet with [`LengthUnit::square_feet_factor`]. Dimensions without a
/// positive length and width produce no area at all (not zero).
///
/// # Example
///
/// ```
/// use stocktake_shared::inventory::surface_area;
/// use stocktake_shared::models::{Dimensions, LengthUnit};
///
/// let panel = Dimensions::new(4.0, 2.0, 0.0, LengthUnit::Foot);
/// let area = surface_area::calculate(&panel, 2).unwrap();
/// assert_eq!(area.formatted, "16.00 ft²");
/// ```

use crate::models::{Dimensions, LengthUnit, SurfaceArea};

/// Unit of every computed area
pub const SQUARE_FEET: &str = "ft²";

/// Whether dimensions are usable for an area
pub fn is_valid(dimensions: &Dimensions) -> bool {
    dimensions.length.is_finite()
        && dimensions.width.is_finite()
        && dimensions.length > 0.0
        && dimensions.width > 0.0
}

/// Area of one item in the dimensions' own unit, squared
pub fn single_item_area(dimensions: &Dimensions) -> f64 {
    let Dimensions {
        length: l,
        width: w,
        thickness: t,
        ..
    } = *dimensions;

    if t > 0.0 {
        2.0 * (l * w + l * t + w * t)
    } else {
        l * w
    }
}

/// Converts a squared-unit area to square feet
pub fn to_square_feet(area: f64, unit: LengthUnit) -> f64 {
    area * unit.square_feet_factor()
}

/// Renders an area as `"<value to 2dp> ft²"`
pub fn format_area(square_feet: f64) -> String {
    format!("{:.2} {}", square_feet, SQUARE_FEET)
}

/// Total surface area for `quantity` items, `None` if the dimensions are invalid
pub fn calculate(dimensions: &Dimensions, quantity: u32) -> Option<SurfaceArea> {
    if !is_valid(dimensions) {
        return None;
    }

    let total = single_item_area(dimensions) * f64::from(quantity);
    let value = to_square_feet(total, dimensions.unit);

    Some(SurfaceArea {
        value,
        unit: SQUARE_FEET.to_string(),
        formatted: format_area(value),
    })
}

/// Area for optional dimensions
pub fn derive(dimensions: Option<&Dimensions>, quantity: u32) -> Option<SurfaceArea> {
    dimensions.and_then(|d| calculate(d, quantity))
}
