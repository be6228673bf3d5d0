//! CRUD operations for [`Rfq`] records.

use rusqlite::{params, params_from_iter, OptionalExtension};

use exportdesk_shared::{ProductId, RfqId, RfqStatus};

use crate::database::{decode_ts, encode_ts, now, Database};
use crate::error::{Result, StoreError};
use crate::models::{NewRfq, Rfq, RfqQuery};

const RFQ_COLUMNS: &str = "id, user_id, product_id, quantity, target_price, country, message,
     status, version, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new RFQ with status `Pending` and version 1.
    pub fn insert_rfq(&self, new: &NewRfq) -> Result<Rfq> {
        if !self.product_exists(new.product_id)? {
            return Err(StoreError::MissingReference(format!(
                "product {}",
                new.product_id
            )));
        }

        let ts = now();
        let rfq = Rfq {
            id: RfqId::new(),
            user_id: new.user_id,
            product_id: new.product_id,
            quantity: new.quantity,
            target_price: new.target_price.clone(),
            country: new.country.clone(),
            message: new.message.clone(),
            status: RfqStatus::Pending,
            version: 1,
            created_at: ts,
            updated_at: ts,
        };

        self.conn().execute(
            "INSERT INTO rfqs (id, user_id, product_id, quantity, target_price, country,
                               message, status, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rfq.id.to_string(),
                rfq.user_id.to_string(),
                rfq.product_id.to_string(),
                rfq.quantity,
                rfq.target_price,
                rfq.country,
                rfq.message,
                rfq.status.as_str(),
                rfq.version as i64,
                encode_ts(&rfq.created_at),
                encode_ts(&rfq.updated_at),
            ],
        )?;
        Ok(rfq)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_rfq(&self, id: RfqId) -> Result<Option<Rfq>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {RFQ_COLUMNS} FROM rfqs WHERE id = ?1"),
                params![id.to_string()],
                RfqRow::from_row,
            )
            .optional()?;
        row.map(RfqRow::into_rfq).transpose()
    }

    /// List RFQs matching `query`, newest first.
    pub fn list_rfqs(&self, query: &RfqQuery) -> Result<Vec<Rfq>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(owner) = query.owner {
            values.push(owner.to_string());
            clauses.push(format!("user_id = ?{}", values.len()));
        }
        if let Some(status) = query.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(product) = query.product {
            values.push(product.to_string());
            clauses.push(format!("product_id = ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RFQ_COLUMNS} FROM rfqs {where_sql}
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), RfqRow::from_row)?;

        let mut rfqs = Vec::new();
        for row in rows {
            rfqs.push(row?.into_rfq()?);
        }
        Ok(rfqs)
    }

    pub fn count_rfqs_for_product(&self, product_id: ProductId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM rfqs WHERE product_id = ?1",
            params![product_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Set the status of an RFQ in a single conditional statement.
    pub fn update_rfq_status(
        &self,
        id: RfqId,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> Result<Rfq> {
        let affected = self.conn().execute(
            "UPDATE rfqs
             SET status = ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3 AND (?4 IS NULL OR version = ?4)",
            params![
                status.as_str(),
                encode_ts(&now()),
                id.to_string(),
                expected_version.map(|v| v as i64),
            ],
        )?;

        if affected == 0 {
            let current = self.get_rfq(id)?.ok_or(StoreError::NotFound)?;
            return Err(StoreError::VersionMismatch {
                expected: expected_version.unwrap_or_default(),
                actual: current.version,
            });
        }

        self.get_rfq(id)?.ok_or(StoreError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Raw column values.  Domain conversion happens outside the rusqlite row
/// callback so that bad values surface as [`StoreError::Integrity`].
struct RfqRow {
    id: String,
    user_id: String,
    product_id: String,
    quantity: i64,
    target_price: Option<String>,
    country: String,
    message: String,
    status: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl RfqRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            target_price: row.get(4)?,
            country: row.get(5)?,
            message: row.get(6)?,
            status: row.get(7)?,
            version: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_rfq(self) -> Result<Rfq> {
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| StoreError::Integrity(format!("rfq quantity {}", self.quantity)))?;
        let version = u64::try_from(self.version)
            .map_err(|_| StoreError::Integrity(format!("rfq version {}", self.version)))?;

        Ok(Rfq {
            id: self.id.parse()?,
            user_id: self.user_id.parse()?,
            product_id: self.product_id.parse()?,
            quantity,
            target_price: self.target_price,
            country: self.country,
            message: self.message,
            status: self.status.parse::<RfqStatus>()?,
            version,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
        })
    }
}
