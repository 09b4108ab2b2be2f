//! Inventory commands.
//!
//! # Usage
//!
//! ```bash
//! stocktake add -n Plywood -q 2 --length 4 --width 2 --unit ft --price 32.50
//! stocktake list
//! stocktake update <id> -q 3 --clear-price
//! stocktake search ply
//! stocktake stats
//! stocktake delete <id>
//! ```

use clap::Args;
use stocktake_shared::inventory::InventoryService;
use stocktake_shared::models::{
    CreateItem, Dimensions, InventoryItem, LengthUnit, UpdateItem, Weight,
};

/// Dimension flags shared by `add` and `update`
#[derive(Args, Debug, Clone)]
pub struct DimensionArgs {
    /// Length
    #[arg(long, requires = "width")]
    pub length: Option<f64>,

    /// Width
    #[arg(long, requires = "length")]
    pub width: Option<f64>,

    /// Thickness (0 for a flat panel)
    #[arg(long, default_value_t = 0.0)]
    pub thickness: f64,

    /// Unit of the dimensions (mm, cm, m, in, ft)
    #[arg(long, default_value = "ft")]
    pub unit: LengthUnit,
}

impl DimensionArgs {
    fn to_dimensions(&self) -> Option<Dimensions> {
        match (self.length, self.width) {
            (Some(length), Some(width)) => {
                Some(Dimensions::new(length, width, self.thickness, self.unit))
            }
            _ => None,
        }
    }
}

/// Weight flags shared by `add` and `update`
#[derive(Args, Debug, Clone)]
pub struct WeightArgs {
    /// Weight value
    #[arg(long)]
    pub weight: Option<f64>,

    /// Weight unit
    #[arg(long, default_value = "lb")]
    pub weight_unit: String,
}

impl WeightArgs {
    fn to_weight(&self) -> Option<Weight> {
        self.weight.map(|value| Weight {
            value,
            unit: self.weight_unit.clone(),
        })
    }
}

/// Fields for a new item
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Item name
    #[arg(short, long)]
    pub name: String,

    /// Quantity on hand
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u32,

    /// Category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Unit price
    #[arg(short, long)]
    pub price: Option<f64>,

    /// Free-text description
    #[arg(short, long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub dimensions: DimensionArgs,

    #[command(flatten)]
    pub weight: WeightArgs,
}

impl From<AddArgs> for CreateItem {
    fn from(args: AddArgs) -> Self {
        CreateItem {
            dimensions: args.dimensions.to_dimensions(),
            weight: args.weight.to_weight(),
            name: args.name,
            quantity: args.quantity,
            category: args.category,
            price: args.price,
            description: args.description,
        }
    }
}

/// Fields to change on an existing item
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New quantity
    #[arg(short, long)]
    pub quantity: Option<u32>,

    /// New category
    #[arg(short, long, conflicts_with = "clear_category")]
    pub category: Option<String>,

    /// Remove the category
    #[arg(long)]
    pub clear_category: bool,

    /// New unit price
    #[arg(short, long, conflicts_with = "clear_price")]
    pub price: Option<f64>,

    /// Remove the price
    #[arg(long)]
    pub clear_price: bool,

    /// New description
    #[arg(short, long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,

    #[command(flatten)]
    pub dimensions: DimensionArgs,

    /// Remove the dimensions (and the surface area)
    #[arg(long, conflicts_with = "length")]
    pub clear_dimensions: bool,

    #[command(flatten)]
    pub weight: WeightArgs,

    /// Remove the weight
    #[arg(long, conflicts_with = "weight")]
    pub clear_weight: bool,
}

/// `Some(None)` when cleared, `Some(Some(v))` when set, `None` when untouched
fn optional_field<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

impl From<UpdateArgs> for UpdateItem {
    fn from(args: UpdateArgs) -> Self {
        UpdateItem {
            dimensions: optional_field(args.dimensions.to_dimensions(), args.clear_dimensions),
            weight: optional_field(args.weight.to_weight(), args.clear_weight),
            name: args.name,
            quantity: args.quantity,
            category: optional_field(args.category, args.clear_category),
            price: optional_field(args.price, args.clear_price),
            description: optional_field(args.description, args.clear_description),
        }
    }
}

fn summary_line(item: &InventoryItem) -> String {
    let mut line = format!("{}  {} x{}", item.id, item.name, item.quantity);
    if let Some(category) = &item.category {
        line.push_str(&format!("  [{}]", category));
    }
    if let Some(price) = item.price {
        line.push_str(&format!("  ${:.2}", price));
    }
    if let Some(area) = &item.total_surface_area {
        line.push_str(&format!("  {}", area.formatted));
    }
    line
}

fn print_items(items: &[InventoryItem]) {
    if items.is_empty() {
        println!("No items");
        return;
    }
    for item in items {
        println!("{}", summary_line(item));
    }
}

/// Add an item.
pub async fn add(inventory: &dyn InventoryService, args: AddArgs) -> anyhow::Result<()> {
    let item = inventory.add(args.into()).await?;
    println!("Added {}", summary_line(&item));
    Ok(())
}

/// List every item.
pub async fn list(inventory: &dyn InventoryService) -> anyhow::Result<()> {
    print_items(&inventory.list().await);
    Ok(())
}

/// Print one item as JSON.
pub async fn show(inventory: &dyn InventoryService, id: &str) -> anyhow::Result<()> {
    match inventory.get(id).await {
        Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
        None => anyhow::bail!("No item with id {}", id),
    }
    Ok(())
}

/// Patch an item.
pub async fn update(
    inventory: &dyn InventoryService,
    id: &str,
    args: UpdateArgs,
) -> anyhow::Result<()> {
    let patch: UpdateItem = args.into();
    if patch.is_empty() {
        anyhow::bail!("Nothing to update");
    }

    match inventory.update(id, patch).await? {
        Some(item) => println!("Updated {}", summary_line(&item)),
        None => println!("No item with id {}", id),
    }
    Ok(())
}

/// Delete an item.
pub async fn delete(inventory: &dyn InventoryService, id: &str) -> anyhow::Result<()> {
    if inventory.delete(id).await? {
        println!("Deleted {}", id);
    } else {
        println!("No item with id {}", id);
    }
    Ok(())
}

/// Search by name, description or category.
pub async fn search(inventory: &dyn InventoryService, query: &str) -> anyhow::Result<()> {
    print_items(&inventory.search(query).await);
    Ok(())
}

/// Totals, optionally for one category.
pub async fn stats(inventory: &dyn InventoryService, category: Option<&str>) -> anyhow::Result<()> {
    match category {
        Some(category) => {
            let items = inventory.items_by_category(category).await;
            let count: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();
            let value: f64 = items.iter().map(InventoryItem::line_value).sum();
            println!("Category:    {}", category);
            println!("Entries:     {}", items.len());
            println!("Total items: {}", count);
            println!("Total value: ${:.2}", value);
        }
        None => {
            println!("Entries:     {}", inventory.list().await.len());
            println!("Total items: {}", inventory.total_item_count().await);
            println!("Total value: ${:.2}", inventory.total_value().await);
        }
    }
    Ok(())
}
