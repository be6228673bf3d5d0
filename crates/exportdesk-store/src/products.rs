//! CRUD operations for [`Product`] records.

use rusqlite::{params, OptionalExtension};

use exportdesk_shared::{ProductCategory, ProductId};

use crate::database::{decode_ts, encode_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::Product;

const PRODUCT_COLUMNS: &str = "id, name, slug, category, short_description, full_description,
     images, video_url, featured, moq, export_highlight, payment_terms, customization_note,
     created_at, updated_at";

impl Database {
    /// Insert a new product.
    pub fn insert_product(&self, product: &Product) -> Result<()> {
        if self.get_product_by_slug(&product.slug)?.is_some() {
            return Err(StoreError::DuplicateSlug(product.slug.clone()));
        }

        self.conn().execute(
            &format!(
                "INSERT INTO products ({PRODUCT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                product.id.to_string(),
                product.name,
                product.slug,
                product.category.as_str(),
                product.short_description,
                product.full_description,
                serde_json::to_string(&product.images)?,
                product.video_url,
                product.featured,
                product.moq,
                product.export_highlight,
                serde_json::to_string(&product.payment_terms)?,
                product.customization_note,
                encode_ts(&product.created_at),
                encode_ts(&product.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Replace every mutable column of an existing product.
    pub fn update_product(&self, product: &Product) -> Result<()> {
        if let Some(other) = self.get_product_by_slug(&product.slug)? {
            if other.id != product.id {
                return Err(StoreError::DuplicateSlug(product.slug.clone()));
            }
        }

        let affected = self.conn().execute(
            "UPDATE products
             SET name = ?2, slug = ?3, category = ?4, short_description = ?5,
                 full_description = ?6, images = ?7, video_url = ?8, featured = ?9,
                 moq = ?10, export_highlight = ?11, payment_terms = ?12,
                 customization_note = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                product.id.to_string(),
                product.name,
                product.slug,
                product.category.as_str(),
                product.short_description,
                product.full_description,
                serde_json::to_string(&product.images)?,
                product.video_url,
                product.featured,
                product.moq,
                product.export_highlight,
                serde_json::to_string(&product.payment_terms)?,
                product.customization_note,
                encode_ts(&product.updated_at),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a product that no RFQ references.
    pub fn delete_product(&self, id: ProductId) -> Result<()> {
        let referencing = self.count_rfqs_for_product(id)?;
        if referencing > 0 {
            return Err(StoreError::InUse(format!(
                "product {id} is referenced by {referencing} RFQ(s)"
            )));
        }

        let affected = self
            .conn()
            .execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![id.to_string()],
                ProductRow::from_row,
            )
            .optional()?;
        row.map(ProductRow::into_product).transpose()
    }

    pub fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = ?1"),
                params![slug],
                ProductRow::from_row,
            )
            .optional()?;
        row.map(ProductRow::into_product).transpose()
    }

    pub fn product_exists(&self, id: ProductId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM products WHERE id = ?1",
                params![id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// List all products, newest first.
    pub fn list_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], ProductRow::from_row)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.into_product()?);
        }
        Ok(products)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct ProductRow {
    id: String,
    name: String,
    slug: String,
    category: String,
    short_description: String,
    full_description: String,
    images: String,
    video_url: Option<String>,
    featured: bool,
    moq: i64,
    export_highlight: String,
    payment_terms: String,
    customization_note: String,
    created_at: String,
    updated_at: String,
}

impl ProductRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            category: row.get(3)?,
            short_description: row.get(4)?,
            full_description: row.get(5)?,
            images: row.get(6)?,
            video_url: row.get(7)?,
            featured: row.get(8)?,
            moq: row.get(9)?,
            export_highlight: row.get(10)?,
            payment_terms: row.get(11)?,
            customization_note: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn into_product(self) -> Result<Product> {
        let moq = u32::try_from(self.moq)
            .map_err(|_| StoreError::Integrity(format!("product moq {}", self.moq)))?;
        let images: Vec<String> = serde_json::from_str(&self.images)
            .map_err(|e| StoreError::Integrity(format!("product images: {e}")))?;
        let payment_terms: Vec<String> = serde_json::from_str(&self.payment_terms)
            .map_err(|e| StoreError::Integrity(format!("product payment terms: {e}")))?;

        Ok(Product {
            id: self.id.parse()?,
            name: self.name,
            slug: self.slug,
            category: self.category.parse::<ProductCategory>()?,
            short_description: self.short_description,
            full_description: self.full_description,
            images,
            video_url: self.video_url,
            featured: self.featured,
            moq,
            export_highlight: self.export_highlight,
            payment_terms,
            customization_note: self.customization_note,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::now;
    use exportdesk_shared::slug::generate_slug;

    pub(crate) fn sample_product(name: &str, moq: u32) -> Product {
        let ts = now();
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            slug: generate_slug(name),
            category: ProductCategory::AgriculturalProducts,
            short_description: "Long grain".into(),
            full_description: String::new(),
            images: vec!["https://cdn.example/main.jpg".into(), "https://cdn.example/2.jpg".into()],
            video_url: None,
            featured: true,
            moq,
            export_highlight: "APEDA certified".into(),
            payment_terms: vec!["LC".into(), "TT".into()],
            customization_note: String::new(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn insert_and_fetch_by_slug() {
        let db = Database::open_in_memory().unwrap();
        let product = sample_product("Basmati Rice", 5000);
        db.insert_product(&product).unwrap();

        let fetched = db.get_product_by_slug("basmati-rice").unwrap().unwrap();
        assert_eq!(fetched, product);
        assert_eq!(fetched.main_image(), Some("https://cdn.example/main.jpg"));
    }

    #[test]
    fn duplicate_slug_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.insert_product(&sample_product("Jute Bags", 100)).unwrap();
        let err = db.insert_product(&sample_product("Jute Bags", 200)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlug(slug) if slug == "jute-bags"));
    }

    #[test]
    fn update_missing_product() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_product(&sample_product("Ghost", 1)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn delete_unreferenced_product() {
        let db = Database::open_in_memory().unwrap();
        let product = sample_product("Coir Mats", 50);
        db.insert_product(&product).unwrap();
        db.delete_product(product.id).unwrap();
        assert!(db.get_product(product.id).unwrap().is_none());
        assert!(matches!(db.delete_product(product.id), Err(StoreError::NotFound)));
    }
}
