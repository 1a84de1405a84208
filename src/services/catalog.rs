use std::sync::Arc;

use crate::errors::{BotError, BotResult};
use crate::models::Product;
use crate::services::intake::parse_decimal;
use crate::services::Database;

/// Products every fresh database starts with (kcal per 100 g).
pub const DEFAULT_PRODUCTS: &[(&str, f64)] = &[
    ("гречка", 313.0),
    ("капуста", 25.0),
    ("рис", 344.0),
    ("овсянка", 366.0),
    ("макароны", 371.0),
    ("картофель", 77.0),
    ("курица", 165.0),
    ("яйцо", 155.0),
    ("творог", 71.0),
    ("банан", 89.0),
];

pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Inserts the default products that are not in the table yet.
    /// Values an admin has overwritten are left alone.
    pub async fn seed_defaults(&self) -> BotResult<usize> {
        let mut inserted = 0;
        for (name, kcal) in DEFAULT_PRODUCTS {
            if self.db.insert_product_if_absent(&normalize_name(name), *kcal).await? {
                inserted += 1;
            }
        }
        log::info!("🥫 Default products seeded ({} new)", inserted);
        Ok(inserted)
    }

    /// Upserts a product from raw command arguments. Last write wins.
    pub async fn add_product(&self, name: &str, kcal_text: &str) -> BotResult<Product> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(BotError::validation("Название продукта не может быть пустым"));
        }

        let kcal = parse_decimal(kcal_text)
            .ok_or_else(|| BotError::validation("Калории должны быть числом"))?;
        if kcal < 0.0 {
            return Err(BotError::validation("Калории не могут быть отрицательными"));
        }

        self.db.upsert_product(&name, kcal).await?;
        log::info!("🥫 Product upserted: {} = {} kcal/100g", name, kcal);

        Ok(Product {
            name,
            kcal_per_100g: kcal,
        })
    }

    /// Exact lookup; callers pass an already normalized token.
    pub async fn kcal_for(&self, name: &str) -> BotResult<Option<f64>> {
        self.db.get_product_kcal(name).await
    }

    pub async fn products(&self) -> BotResult<Vec<Product>> {
        self.db.list_products().await
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn catalog() -> Catalog {
        Catalog::new(Arc::new(Database::in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        let catalog = catalog().await;

        assert_eq!(catalog.seed_defaults().await.unwrap(), DEFAULT_PRODUCTS.len());
        assert_eq!(catalog.seed_defaults().await.unwrap(), 0);
        assert_eq!(catalog.products().await.unwrap().len(), DEFAULT_PRODUCTS.len());
        assert_eq!(catalog.kcal_for("гречка").await.unwrap(), Some(313.0));
    }

    #[tokio::test]
    async fn test_seed_does_not_override_admin_value() {
        let catalog = catalog().await;

        catalog.add_product("Рис", "330").await.unwrap();
        catalog.seed_defaults().await.unwrap();

        assert_eq!(catalog.kcal_for("рис").await.unwrap(), Some(330.0));
    }

    #[tokio::test]
    async fn test_add_product_last_write_wins() {
        let catalog = catalog().await;

        catalog.add_product("Яблоко", "52").await.unwrap();
        let product = catalog.add_product("ЯБЛОКО", "47,5").await.unwrap();

        assert_eq!(product, Product { name: "яблоко".to_string(), kcal_per_100g: 47.5 });
        let apples: Vec<Product> = catalog
            .products()
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.name == "яблоко")
            .collect();
        assert_eq!(apples.len(), 1);
        assert_eq!(apples[0].kcal_per_100g, 47.5);
    }

    #[tokio::test]
    async fn test_add_product_rejects_bad_kcal() {
        let catalog = catalog().await;

        assert!(matches!(
            catalog.add_product("яблоко", "много").await,
            Err(BotError::Validation(_))
        ));
        assert!(matches!(
            catalog.add_product("яблоко", "-5").await,
            Err(BotError::Validation(_))
        ));
        assert!(catalog.kcal_for("яблоко").await.unwrap().is_none());
    }
}
