use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};

use crate::errors::BotResult;
use crate::models::{Product, User};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> BotResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Database { pool };
        db.init_tables().await?;
        Ok(db)
    }

    /// Private in-memory database. A single connection is kept alive for
    /// the pool's lifetime since every SQLite memory connection is its own
    /// database.
    #[cfg(test)]
    pub async fn in_memory() -> BotResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Database { pool };
        db.init_tables().await?;
        Ok(db)
    }

    async fn init_tables(&self) -> BotResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                goal REAL NOT NULL,
                eaten REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                product_name TEXT PRIMARY KEY,
                kcal REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates the user or fully overwrites an existing record; eaten starts at 0.
    pub async fn upsert_user(&self, id: i64, name: &str, goal: f64) -> BotResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users (id, name, goal, eaten)
            VALUES (?1, ?2, ?3, 0.0)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(goal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, id: i64) -> BotResult<Option<User>> {
        let user = sqlx::query("SELECT id, name, goal, eaten FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| User {
            id: row.get(0),
            name: row.get(1),
            goal: row.get(2),
            eaten: row.get(3),
        });

        Ok(user)
    }

    pub async fn user_exists(&self, id: i64) -> BotResult<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Adds to the running total in one statement, so concurrent messages
    /// from the same user cannot lose an update. Returns the rows touched.
    pub async fn add_eaten(&self, id: i64, kcal: f64) -> BotResult<u64> {
        let result = sqlx::query("UPDATE users SET eaten = eaten + ?1 WHERE id = ?2")
            .bind(kcal)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn reset_eaten(&self, id: i64) -> BotResult<u64> {
        let result = sqlx::query("UPDATE users SET eaten = 0.0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn upsert_product(&self, name: &str, kcal: f64) -> BotResult<()> {
        sqlx::query("INSERT OR REPLACE INTO products (product_name, kcal) VALUES (?1, ?2)")
            .bind(name)
            .bind(kcal)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns true when the product was inserted, false when it already existed.
    pub async fn insert_product_if_absent(&self, name: &str, kcal: f64) -> BotResult<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO products (product_name, kcal) VALUES (?1, ?2)")
                .bind(name)
                .bind(kcal)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_product_kcal(&self, name: &str) -> BotResult<Option<f64>> {
        let kcal = sqlx::query("SELECT kcal FROM products WHERE product_name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get::<f64, _>(0));

        Ok(kcal)
    }

    pub async fn list_products(&self) -> BotResult<Vec<Product>> {
        let rows = sqlx::query("SELECT product_name, kcal FROM products ORDER BY product_name")
            .fetch_all(&self.pool)
            .await?;

        let products = rows
            .into_iter()
            .map(|row| Product {
                name: row.get(0),
                kcal_per_100g: row.get(1),
            })
            .collect();

        Ok(products)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
