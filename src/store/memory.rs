//! In-memory implementation of every repository trait, mirroring the constraints
//! of `migrations/0001_init.sql` closely enough for handler and service tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo::{Session, SessionRepo},
    orders::repo::{
        Order, OrderChanges, OrderDetails, OrderProduct, OrderProductDetails, OrderProductList,
        OrderProductRepo, OrderRepo, OrderedProduct,
    },
    products::repo::{NewProduct, PopularProduct, Product, ProductChanges, ProductRepo},
    users::repo::{NewUser, ProfileChanges, User, UserRepo},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    products: Vec<Product>,
    orders: Vec<Order>,
    order_products: Vec<OrderProduct>,
}

impl Tables {
    fn ordered_products(&self, order_id: Uuid) -> Vec<OrderedProduct> {
        self.order_products
            .iter()
            .filter(|line| line.order_id == order_id)
            .filter_map(|line| {
                let p = self.products.iter().find(|p| p.id == line.product_id)?;
                Some(OrderedProduct {
                    id: p.id,
                    name: p.name.clone(),
                    description: p.description.clone(),
                    category: p.category.clone(),
                    price: p.price,
                    count: line.count,
                })
            })
            .collect()
    }

    fn details(&self, order: &Order) -> OrderDetails {
        OrderDetails {
            id: order.id,
            user_id: order.user_id,
            email: self
                .users
                .iter()
                .find(|u| u.id == order.user_id)
                .map(|u| u.email.clone()),
            status: order.status,
            products: Json(self.ordered_products(order.id)),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    session_lookups: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `SessionRepo::find_by_id` calls served so far.
    pub fn session_lookups(&self) -> usize {
        self.session_lookups.load(Ordering::SeqCst)
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.email == new.email) {
            anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
        }
        let user = User {
            id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password: new.password_hash,
            is_admin: new.is_admin,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn list(&self, admins_only: bool) -> anyhow::Result<Vec<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| u.is_admin || !admins_only)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let mut t = self.tables();
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| &u.email == email && u.id != id) {
                anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        Ok(Some(user.clone()))
    }

    async fn set_admin(&self, id: Uuid, admin: bool) -> anyhow::Result<Option<User>> {
        let mut t = self.tables();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.is_admin = admin;
            u.clone()
        }))
    }

    async fn update_password_by_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let mut t = self.tables();
        Ok(t.users.iter_mut().find(|u| u.email == email).map(|u| {
            u.password = password_hash.to_string();
            u.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables();
        if t.sessions.iter().any(|s| s.user_id == id) {
            anyhow::bail!("update or delete on table \"users\" violates foreign key constraint on \"sessions\"");
        }
        let orders: Vec<Uuid> = t
            .orders
            .iter()
            .filter(|o| o.user_id == id)
            .map(|o| o.id)
            .collect();
        t.order_products.retain(|l| !orders.contains(&l.order_id));
        t.orders.retain(|o| o.user_id != id);
        t.users.retain(|u| u.id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn create(&self, user_id: Uuid, token: &str) -> anyhow::Result<Session> {
        let mut t = self.tables();
        if !t.users.iter().any(|u| u.id == user_id) {
            anyhow::bail!("insert on table \"sessions\" violates foreign key constraint");
        }
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            created_at: OffsetDateTime::now_utc(),
            logged_out: false,
            logged_out_at: None,
        };
        t.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn log_out_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut touched = 0;
        let mut t = self.tables();
        for s in t
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && !s.logged_out)
        {
            s.logged_out = true;
            s.logged_out_at = Some(now);
            touched += 1;
        }
        Ok(touched)
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>> {
        Ok(self
            .tables()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut t = self.tables();
        let before = t.sessions.len();
        t.sessions.retain(|s| s.user_id != user_id);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
        };
        self.tables().products.push(product.clone());
        Ok(product)
    }

    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.tables().products.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.tables().products.iter().find(|p| p.id == id).cloned())
    }

    async fn popular(&self, limit: i64) -> anyhow::Result<Vec<PopularProduct>> {
        let t = self.tables();
        let mut rows: Vec<PopularProduct> = t
            .products
            .iter()
            .map(|p| PopularProduct {
                id: p.id,
                name: p.name.clone(),
                description: p.description.clone(),
                price: p.price,
                category: p.category.clone(),
                orders: t
                    .order_products
                    .iter()
                    .filter(|l| l.product_id == p.id)
                    .count() as i64,
            })
            .filter(|p| p.orders > 0)
            .collect();
        rows.sort_by(|a, b| b.orders.cmp(&a.orders));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> anyhow::Result<Option<Product>> {
        let mut t = self.tables();
        let Some(p) = t.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            p.name = v;
        }
        if let Some(v) = changes.description {
            p.description = v;
        }
        if let Some(v) = changes.price {
            p.price = v;
        }
        if let Some(v) = changes.category {
            p.category = v;
        }
        Ok(Some(p.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables();
        t.order_products.retain(|l| l.product_id != id);
        t.products.retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn create(&self, user_id: Uuid) -> anyhow::Result<Order> {
        let mut t = self.tables();
        if !t.users.iter().any(|u| u.id == user_id) {
            anyhow::bail!("insert on table \"orders\" violates foreign key constraint");
        }
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            status: 0,
        };
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<OrderDetails>> {
        let t = self.tables();
        Ok(t.orders.iter().map(|o| t.details(o)).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<OrderDetails>> {
        let t = self.tables();
        Ok(t
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| t.details(o))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<OrderDetails>> {
        let t = self.tables();
        Ok(t.orders.iter().find(|o| o.id == id).map(|o| t.details(o)))
    }

    async fn update(&self, id: Uuid, changes: OrderChanges) -> anyhow::Result<Option<Order>> {
        let mut t = self.tables();
        let Some(order) = t.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.user_id {
            order.user_id = v;
        }
        if let Some(v) = changes.status {
            order.status = v;
        }
        Ok(Some(order.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables();
        t.order_products.retain(|l| l.order_id != id);
        t.orders.retain(|o| o.id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderProductRepo for MemoryStore {
    async fn create(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> anyhow::Result<OrderProduct> {
        let mut t = self.tables();
        if !t.orders.iter().any(|o| o.id == order_id)
            || !t.products.iter().any(|p| p.id == product_id)
        {
            anyhow::bail!("insert on table \"order_products\" violates foreign key constraint");
        }
        if t
            .order_products
            .iter()
            .any(|l| l.order_id == order_id && l.product_id == product_id)
        {
            anyhow::bail!("duplicate key value violates unique constraint");
        }
        let line = OrderProduct {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            count,
        };
        t.order_products.push(line.clone());
        Ok(line)
    }

    async fn list_by_order(&self, order_id: Uuid) -> anyhow::Result<Option<OrderProductList>> {
        let products = self.tables().ordered_products(order_id);
        if products.is_empty() {
            return Ok(None);
        }
        Ok(Some(OrderProductList {
            order_id,
            products: Json(products),
        }))
    }

    async fn find(
        &self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<OrderProductDetails>> {
        let t = self.tables();
        let Some(line) = t
            .order_products
            .iter()
            .find(|l| l.order_id == order_id && l.product_id == product_id)
        else {
            return Ok(None);
        };
        let Some(product) = t.products.iter().find(|p| p.id == product_id) else {
            return Ok(None);
        };
        Ok(Some(OrderProductDetails {
            id: line.id,
            order_id,
            product_id,
            product: Json(product.clone()),
            count: line.count,
        }))
    }

    async fn update(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        new_product_id: Option<Uuid>,
        count: Option<i32>,
    ) -> anyhow::Result<Option<OrderProduct>> {
        let mut t = self.tables();
        if let Some(target) = new_product_id.filter(|p| *p != product_id) {
            if t
                .order_products
                .iter()
                .any(|l| l.order_id == order_id && l.product_id == target)
            {
                anyhow::bail!("duplicate key value violates unique constraint");
            }
        }
        let Some(line) = t
            .order_products
            .iter_mut()
            .find(|l| l.order_id == order_id && l.product_id == product_id)
        else {
            return Ok(None);
        };
        if let Some(v) = new_product_id {
            line.product_id = v;
        }
        if let Some(v) = count {
            line.count = v;
        }
        Ok(Some(line.clone()))
    }

    async fn delete(&self, order_id: Uuid, product_id: Uuid) -> anyhow::Result<()> {
        self.tables()
            .order_products
            .retain(|l| !(l.order_id == order_id && l.product_id == product_id));
        Ok(())
    }
}
