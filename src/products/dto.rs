use serde::Deserialize;

use super::repo::{NewProduct, ProductChanges};
use crate::response::present;

/// Body of product create and update requests.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

impl ProductRequest {
    /// Every field is required on create.
    pub fn into_new(self) -> Option<NewProduct> {
        Some(NewProduct {
            name: present(self.name)?,
            description: present(self.description)?,
            price: self.price?,
            category: present(self.category)?,
        })
    }
}

impl From<ProductRequest> for ProductChanges {
    fn from(req: ProductRequest) -> Self {
        ProductChanges {
            name: present(req.name),
            description: present(req.description),
            price: req.price,
            category: present(req.category),
        }
    }
}
