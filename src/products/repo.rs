use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
}

/// Product plus how many order lines reference it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PopularProduct {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub orders: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

pub const POPULAR_LIMIT: i64 = 5;

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product>;
    async fn list(&self) -> anyhow::Result<Vec<Product>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    async fn popular(&self, limit: i64) -> anyhow::Result<Vec<PopularProduct>>;
    async fn update(&self, id: Uuid, changes: ProductChanges) -> anyhow::Result<Option<Product>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgProductRepo {
    db: PgPool,
}

impl PgProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepo for PgProductRepo {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, category)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price, category
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.category)
        .fetch_one(&self.db)
        .await
        .context("could not create product")?;
        Ok(product)
    }

    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, category FROM products ORDER BY name",
        )
        .fetch_all(&self.db)
        .await
        .context("could not get products")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, category FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not get product by id: {id}"))?;
        Ok(row)
    }

    async fn popular(&self, limit: i64) -> anyhow::Result<Vec<PopularProduct>> {
        let rows = sqlx::query_as::<_, PopularProduct>(
            r#"
            SELECT p.id, p.name, p.description, p.price, p.category, COUNT(op.id) AS orders
            FROM products p
            JOIN order_products op ON p.id = op.product_id
            GROUP BY p.id
            ORDER BY orders DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("could not get popular products")?;
        Ok(rows)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name        = COALESCE($1, name),
                description = COALESCE($2, description),
                price       = COALESCE($3, price),
                category    = COALESCE($4, category)
            WHERE id = $5
            RETURNING id, name, description, price, category
            "#,
        )
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.category)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not update product by id: {id}"))?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("could not delete product by id: {id}"))?;
        Ok(())
    }
}
