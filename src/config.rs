// src/config.rs

use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::{env, time::Duration};

use crate::{
    db::{PgWarehouseRepository, WarehouseRepository},
    services::{repair_service::RepairService, stock_service::StockService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub warehouse_repo: Arc<dyn WarehouseRepository>,
    pub stock_service: StockService,
    pub repair_service: RepairService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph: one repository behind the port, injected into
        // both services. Nothing else writes stock or WAC.
        let warehouse_repo: Arc<dyn WarehouseRepository> =
            Arc::new(PgWarehouseRepository::new(db_pool.clone()));
        let stock_service = StockService::new(warehouse_repo.clone());
        let repair_service =
            RepairService::new(warehouse_repo.clone(), CategoryDefaultPrices::from_env());

        Ok(Self {
            db_pool,
            warehouse_repo,
            stock_service,
            repair_service,
        })
    }
}

/// Fallback prices the repair utility applies when an item has no purchase
/// history at all. These are configuration, not business truth: the built-in
/// table is a starting guess in Rupiah, overridable per deployment via
/// `CATEGORY_DEFAULT_PRICES` (a JSON object of category -> price, with the
/// optional key "*" replacing the generic fallback).
#[derive(Debug, Clone)]
pub struct CategoryDefaultPrices {
    prices: HashMap<String, Decimal>,
    fallback: Decimal,
}

impl Default for CategoryDefaultPrices {
    fn default() -> Self {
        let table = [
            ("daging", 50_000),
            ("seafood", 40_000),
            ("sayuran", 15_000),
            ("buah", 20_000),
            ("bumbu", 10_000),
            ("minyak", 25_000),
            ("tepung", 8_000),
            ("gula", 12_000),
            ("garam", 5_000),
            ("susu", 15_000),
            ("telur", 25_000),
        ];
        Self {
            prices: table
                .into_iter()
                .map(|(category, price)| (category.to_string(), Decimal::from(price)))
                .collect(),
            fallback: Decimal::from(5_000),
        }
    }
}

impl CategoryDefaultPrices {
    pub fn from_env() -> Self {
        let mut defaults = Self::default();
        let Ok(raw) = env::var("CATEGORY_DEFAULT_PRICES") else {
            return defaults;
        };

        match serde_json::from_str::<HashMap<String, serde_json::Value>>(&raw) {
            Ok(table) => {
                for (category, value) in table {
                    let Some(price) = decimal_from_json(&value) else {
                        tracing::warn!(%category, "ignoring non-numeric default price");
                        continue;
                    };
                    if category.trim() == "*" {
                        defaults.fallback = price;
                    } else {
                        defaults
                            .prices
                            .insert(category.trim().to_lowercase(), price);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("CATEGORY_DEFAULT_PRICES is not valid JSON, using defaults: {e}");
            }
        }
        defaults
    }

    pub fn price_for(&self, category: &str) -> Decimal {
        self.prices
            .get(&category.trim().to_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
