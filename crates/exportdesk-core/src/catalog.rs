//! Product catalog: public reads, admin-only writes.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use exportdesk_shared::slug::{generate_slug, unique_slug};
use exportdesk_shared::{ProductCategory, ProductId};
use exportdesk_store::{Product, Store, StoreError};

use crate::actor::Actor;
use crate::error::{CoreError, Result};
use crate::guard::require_admin;

/// Admin input for creating or replacing a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub moq: u32,
    #[serde(default)]
    pub export_highlight: String,
    #[serde(default)]
    pub payment_terms: Vec<String>,
    #[serde(default)]
    pub customization_note: String,
}

impl ProductDraft {
    fn validate(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("product name is required"));
        }
        if self.moq == 0 {
            return Err(CoreError::validation("minimum order quantity must be at least 1"));
        }
        let slug = generate_slug(name);
        if slug.is_empty() {
            return Err(CoreError::validation(
                "product name must contain at least one letter or digit",
            ));
        }
        Ok(slug)
    }

    fn into_product(self, id: ProductId, slug: String, created_at: chrono::DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name.trim().to_string(),
            slug,
            category: self.category,
            short_description: self.short_description,
            full_description: self.full_description,
            images: self
                .images
                .into_iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
            video_url: self
                .video_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            featured: self.featured,
            moq: self.moq,
            export_highlight: self.export_highlight,
            payment_terms: self.payment_terms,
            customization_note: self.customization_note,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category: Option<ProductCategory>,
    #[serde(default)]
    pub featured_only: bool,
    /// Case-insensitive match on the product name.
    #[serde(default)]
    pub search: Option<String>,
}

impl ProductFilter {
    fn matches(&self, product: &Product, needle: Option<&str>) -> bool {
        self.category.map_or(true, |c| product.category == c)
            && (!self.featured_only || product.featured)
            && needle.map_or(true, |n| product.name.to_lowercase().contains(n))
    }
}

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Products matching `filter`, newest first.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut products = self.store.list_products().await?;
        products.retain(|p| filter.matches(p, needle.as_deref()));
        debug!(count = products.len(), "products listed");
        Ok(products)
    }

    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| CoreError::not_found("product", id))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Product> {
        self.store
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| CoreError::not_found("product", slug))
    }

    async fn taken_slugs(&self, except: Option<ProductId>) -> Result<HashSet<String>> {
        Ok(self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(|p| Some(p.id) != except)
            .map(|p| p.slug)
            .collect())
    }

    /// Add a product.  The slug comes from the name, suffixed `-2`, `-3`...
    /// when another product already has it.
    #[instrument(skip(self, actor, draft), fields(actor = %actor.id, name = %draft.name))]
    pub async fn create(&self, actor: &Actor, draft: ProductDraft) -> Result<Product> {
        require_admin(actor)?;
        let base = draft.validate()?;
        let taken = self.taken_slugs(None).await?;
        let slug = unique_slug(&base, |s| taken.contains(s));

        let product = draft.into_product(ProductId::new(), slug, Utc::now());
        self.store.insert_product(&product).await?;

        info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    /// Replace a product's fields.  The slug is regenerated only when the
    /// name changes.
    #[instrument(skip(self, actor, draft), fields(actor = %actor.id))]
    pub async fn update(&self, actor: &Actor, id: ProductId, draft: ProductDraft) -> Result<Product> {
        require_admin(actor)?;
        let base = draft.validate()?;
        let existing = self.get(id).await?;

        let slug = if existing.name == draft.name.trim() {
            existing.slug.clone()
        } else {
            let taken = self.taken_slugs(Some(id)).await?;
            unique_slug(&base, |s| taken.contains(s))
        };

        let product = draft.into_product(id, slug, existing.created_at);
        self.store.update_product(&product).await?;

        info!(product_id = %id, slug = %product.slug, "product updated");
        Ok(product)
    }

    /// Remove a product.  Refused while any RFQ references it.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &Actor, id: ProductId) -> Result<()> {
        require_admin(actor)?;
        match self.store.delete_product(id).await {
            Ok(()) => {
                info!(product_id = %id, "product deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(CoreError::not_found("product", id)),
            Err(e) => Err(e.into()),
        }
    }
}
