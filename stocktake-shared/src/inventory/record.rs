/// Copy-on-write item construction
///
/// [`new_item`] and [`apply_patch`] never touch storage: they validate the
/// input and build a fresh [`InventoryItem`], recomputing the derived
/// surface area from the resulting record. The service only swaps the
/// result into its collection.

use super::{surface_area, InventoryError, InventoryResult};
use crate::models::{CreateItem, Dimensions, InventoryItem, UpdateItem, Weight};
use chrono::{DateTime, Utc};
use validator::Validate;

/// Format of `dateAdded` / `lastModified`
pub const DISPLAY_STAMP_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

/// Human-readable stamp for an instant
pub fn display_stamp(at: DateTime<Utc>) -> String {
    at.format(DISPLAY_STAMP_FORMAT).to_string()
}

fn validate_name(name: &str) -> InventoryResult<()> {
    if name.trim().is_empty() {
        return Err(InventoryError::Validation("Name cannot be blank".to_string()));
    }
    if name.chars().count() > 200 {
        return Err(InventoryError::Validation(
            "Name must be 1-200 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Option<f64>) -> InventoryResult<()> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(InventoryError::Validation(
            "Price cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_dimensions(dimensions: Option<&Dimensions>) -> InventoryResult<()> {
    let Some(d) = dimensions else {
        return Ok(());
    };

    let all_usable = [d.length, d.width, d.thickness]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
    if !all_usable {
        return Err(InventoryError::Validation(
            "Dimensions must be finite and non-negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_weight(weight: Option<&Weight>) -> InventoryResult<()> {
    match weight {
        Some(w) if !w.value.is_finite() || w.value < 0.0 => Err(InventoryError::Validation(
            "Weight must be finite and non-negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Builds a new item from validated input
pub fn new_item(input: CreateItem, id: String, at: DateTime<Utc>) -> InventoryResult<InventoryItem> {
    input
        .validate()
        .map_err(|e| InventoryError::Validation(e.to_string()))?;
    validate_name(&input.name)?;
    validate_price(input.price)?;
    validate_dimensions(input.dimensions.as_ref())?;
    validate_weight(input.weight.as_ref())?;

    let total_surface_area = surface_area::derive(input.dimensions.as_ref(), input.quantity);

    Ok(InventoryItem {
        id,
        name: input.name.trim().to_string(),
        quantity: input.quantity,
        category: input.category,
        price: input.price,
        description: input.description,
        dimensions: input.dimensions,
        weight: input.weight,
        total_surface_area,
        timestamp: at,
        date_added: display_stamp(at),
        last_modified: None,
    })
}

/// Builds the patched version of `item`
///
/// `id`, `timestamp` and `dateAdded` carry over unchanged; `lastModified` is
/// stamped with `at` and the surface area is derived from the patched
/// dimensions and quantity.
pub fn apply_patch(
    item: &InventoryItem,
    patch: &UpdateItem,
    at: DateTime<Utc>,
) -> InventoryResult<InventoryItem> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(dimensions) = &patch.dimensions {
        validate_dimensions(dimensions.as_ref())?;
    }
    if let Some(weight) = &patch.weight {
        validate_weight(weight.as_ref())?;
    }

    let mut next = InventoryItem {
        name: patch
            .name
            .as_deref()
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| item.name.clone()),
        quantity: patch.quantity.unwrap_or(item.quantity),
        category: patch.category.clone().unwrap_or_else(|| item.category.clone()),
        price: patch.price.unwrap_or(item.price),
        description: patch
            .description
            .clone()
            .unwrap_or_else(|| item.description.clone()),
        dimensions: patch.dimensions.unwrap_or(item.dimensions),
        weight: patch.weight.clone().unwrap_or_else(|| item.weight.clone()),
        last_modified: Some(display_stamp(at)),
        ..item.clone()
    };
    next.total_surface_area = surface_area::derive(next.dimensions.as_ref(), next.quantity);

    Ok(next)
}
