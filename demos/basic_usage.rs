//! Basic thingbase walkthrough on the in-memory driver
//!
//! Run with: cargo run --example basic_usage

use serde_json::json;
use std::sync::Arc;
use thingbase::prelude::*;
use thingbase::store_object::RawColumn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
    pub stock: i32,
}

impl Thing for Product {
    const TABLE: &'static str = "products";

    fn validate(&self, errors: &mut FieldErrors) {
        if self.price < 0.0 {
            errors.add("price", "Price cannot be negative");
        }
    }

    fn after_save(&self) {
        println!("   saved {} ({:?})", self.name, self.id);
    }

    fn item_extension(&mut self, metadata: &mut Metadata) {
        metadata.insert("in_stock".to_string(), json!(self.stock > 0));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🚀 thingbase basic usage\n");

    let database = Arc::new(MemoryDatabase::new());
    database.create_table(
        "products",
        vec![
            RawColumn::new("id", "bigint")
                .primary()
                .default_value("nextval('products_id_seq'::regclass)"),
            RawColumn::new("name", "text").not_null(),
            RawColumn::new("price", "double precision").not_null(),
            RawColumn::new("stock", "integer").not_null().default_value("0"),
        ],
    );

    let thingbase = ThingBase::with_database(database, CacheConfig::default());
    let products = thingbase.store::<Product>();

    println!("📝 Creating products");
    for (name, price, stock) in [("Lamp", 24.5, 3), ("Desk", 180.0, 0), ("Chair", 75.0, 12)] {
        let mut product = Entity::new(Product {
            name: name.to_string(),
            price,
            stock,
            ..Product::default()
        });
        products.save(&mut product).await?;
    }

    println!("\n❌ Saving an invalid product");
    let mut broken = Entity::new(Product {
        name: "Broken".to_string(),
        price: -1.0,
        ..Product::default()
    });
    if let Err(e) = products.save(&mut broken).await {
        println!("   {}", e);
    }

    println!("\n🔍 Finding by primary key");
    if let Some(lamp) = products.by_pk(1, true).await? {
        println!("   {} in stock: {:?}", lamp.name, lamp.metadata().get("in_stock"));
    }

    println!("\n📋 Listing products priced over 50");
    let filter: Attributes = json!({"price": ">50"})
        .as_object()
        .cloned()
        .unwrap_or_default();
    let options = ListOptions::new().order_by("price", SortOrder::Asc);
    let page = products
        .list_by_attributes(&filter, &options)
        .await?;
    for product in &page.list {
        println!("   {} costs {}", product.name, product.price);
    }
    println!("   {} match(es)", page.count);

    println!("\n✏️  Updating stock");
    if let Some(mut desk) = products.by_pk(2, false).await? {
        desk.stock = 4;
        products.save(&mut desk).await?;
    }

    println!("\n🗑️  Deleting the chair");
    if let Some(mut chair) = products.by_pk(3, false).await? {
        let removed = products.delete(&mut chair).await?;
        println!("   removed: {}", removed);
    }

    println!("\n✅ Done");
    Ok(())
}
