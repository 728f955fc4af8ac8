use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::Product;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: i16,
}

/// Product as it appears inside an order, with the ordered quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedProduct {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub count: i32,
}

/// Order joined with its owner's email and its line items.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub status: i16,
    pub products: Json<Vec<OrderedProduct>>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub user_id: Option<Uuid>,
    pub status: Option<i16>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub count: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductList {
    pub order_id: Uuid,
    pub products: Json<Vec<OrderedProduct>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductDetails {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product: Json<Product>,
    pub count: i32,
}

#[async_trait]
pub trait OrderRepo: Send + Sync {
    async fn create(&self, user_id: Uuid) -> anyhow::Result<Order>;
    async fn list_all(&self) -> anyhow::Result<Vec<OrderDetails>>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<OrderDetails>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<OrderDetails>>;
    async fn update(&self, id: Uuid, changes: OrderChanges) -> anyhow::Result<Option<Order>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait OrderProductRepo: Send + Sync {
    async fn create(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> anyhow::Result<OrderProduct>;
    async fn list_by_order(&self, order_id: Uuid) -> anyhow::Result<Option<OrderProductList>>;
    async fn find(
        &self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<OrderProductDetails>>;
    /// Moves the line to `new_product_id` and/or sets its count; `None` keeps the stored value.
    async fn update(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        new_product_id: Option<Uuid>,
        count: Option<i32>,
    ) -> anyhow::Result<Option<OrderProduct>>;
    async fn delete(&self, order_id: Uuid, product_id: Uuid) -> anyhow::Result<()>;
}

const ORDER_DETAILS_SELECT: &str = r#"
    SELECT o.id, o.user_id, u.email, o.status,
           COALESCE(
               JSON_AGG(JSON_BUILD_OBJECT(
                   'id', p.id, 'name', p.name, 'description', p.description,
                   'category', p.category, 'price', p.price, 'count', op.count
               )) FILTER (WHERE p.id IS NOT NULL),
               '[]'
           ) AS products
    FROM orders o
    LEFT JOIN order_products op ON o.id = op.order_id
    LEFT JOIN products p ON op.product_id = p.id
    LEFT JOIN users u ON o.user_id = u.id
"#;

#[derive(Clone)]
pub struct PgOrderRepo {
    db: PgPool,
}

impl PgOrderRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepo for PgOrderRepo {
    async fn create(&self, user_id: Uuid) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id) VALUES ($1)
            RETURNING id, user_id, created_at, status
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("could not create order")?;
        Ok(order)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<OrderDetails>> {
        let sql = format!("{ORDER_DETAILS_SELECT} GROUP BY o.id, u.email ORDER BY o.created_at");
        let rows = sqlx::query_as::<_, OrderDetails>(&sql)
            .fetch_all(&self.db)
            .await
            .context("could not find all orders")?;
        Ok(rows)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<OrderDetails>> {
        let sql = format!(
            "{ORDER_DETAILS_SELECT} WHERE o.user_id = $1 GROUP BY o.id, u.email ORDER BY o.created_at"
        );
        let rows = sqlx::query_as::<_, OrderDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("could not find orders of user id: {user_id}"))?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<OrderDetails>> {
        let sql = format!("{ORDER_DETAILS_SELECT} WHERE o.id = $1 GROUP BY o.id, u.email");
        let row = sqlx::query_as::<_, OrderDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("could not find order by id: {id}"))?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: OrderChanges) -> anyhow::Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET user_id = COALESCE($1, user_id),
                status  = COALESCE($2, status)
            WHERE id = $3
            RETURNING id, user_id, created_at, status
            "#,
        )
        .bind(changes.user_id)
        .bind(changes.status)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not update order by id: {id}"))?;
        Ok(order)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("could not delete order by id: {id}"))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgOrderProductRepo {
    db: PgPool,
}

impl PgOrderProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderProductRepo for PgOrderProductRepo {
    async fn create(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> anyhow::Result<OrderProduct> {
        let row = sqlx::query_as::<_, OrderProduct>(
            r#"
            INSERT INTO order_products (order_id, product_id, count)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, product_id, count
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(count)
        .fetch_one(&self.db)
        .await
        .context("could not create order product")?;
        Ok(row)
    }

    async fn list_by_order(&self, order_id: Uuid) -> anyhow::Result<Option<OrderProductList>> {
        let row = sqlx::query_as::<_, OrderProductList>(
            r#"
            SELECT op.order_id,
                   JSON_AGG(JSON_BUILD_OBJECT(
                       'id', p.id, 'name', p.name, 'description', p.description,
                       'price', p.price, 'category', p.category, 'count', op.count
                   )) AS products
            FROM order_products op
            JOIN products p ON p.id = op.product_id
            WHERE op.order_id = $1
            GROUP BY op.order_id
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not find order products by order id: {order_id}"))?;
        Ok(row)
    }

    async fn find(
        &self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<OrderProductDetails>> {
        let row = sqlx::query_as::<_, OrderProductDetails>(
            r#"
            SELECT op.id, op.order_id, p.id AS product_id,
                   JSON_BUILD_OBJECT(
                       'id', p.id, 'name', p.name, 'description', p.description,
                       'price', p.price, 'category', p.category
                   ) AS product,
                   op.count
            FROM order_products op
            JOIN products p ON p.id = op.product_id
            WHERE op.order_id = $1 AND op.product_id = $2
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| {
            format!("could not find order product by order id: {order_id} and product id: {product_id}")
        })?;
        Ok(row)
    }

    async fn update(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        new_product_id: Option<Uuid>,
        count: Option<i32>,
    ) -> anyhow::Result<Option<OrderProduct>> {
        let row = sqlx::query_as::<_, OrderProduct>(
            r#"
            UPDATE order_products
            SET product_id = COALESCE($1, product_id),
                count      = COALESCE($2, count)
            WHERE order_id = $3 AND product_id = $4
            RETURNING id, order_id, product_id, count
            "#,
        )
        .bind(new_product_id)
        .bind(count)
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| {
            format!("could not update order product by order id: {order_id} and product id: {product_id}")
        })?;
        Ok(row)
    }

    async fn delete(&self, order_id: Uuid, product_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM order_products WHERE order_id = $1 AND product_id = $2")
            .bind(order_id)
            .bind(product_id)
            .execute(&self.db)
            .await
            .with_context(|| {
                format!("could not delete order product by order id: {order_id} and product id: {product_id}")
            })?;
        Ok(())
    }
}
