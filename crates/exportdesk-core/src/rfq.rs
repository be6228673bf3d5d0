//! RFQ lifecycle: creation by buyers, status changes by admins, and the
//! guarded read paths both roles use.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use exportdesk_shared::{ProductId, RfqId, RfqStatus, UserId};
use exportdesk_store::{NewRfq, Rfq, RfqQuery, Store};

use crate::actor::Actor;
use crate::config::{CoreConfig, MoqPolicy, TransitionPolicy};
use crate::error::{CoreError, Result};
use crate::guard::{load_authorized_rfq, require_admin};

/// Buyer input for a new RFQ.
///
/// Carries no owner: the creating actor owns the RFQ.  Unknown JSON fields,
/// an owner among them, are dropped on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRfq {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub target_price: Option<String>,
    pub country: String,
    pub message: String,
}

/// Filter for [`RfqManager::list`] and [`RfqManager::list_summaries`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfqFilter {
    #[serde(default)]
    pub status: Option<RfqStatus>,
    /// Ignored for buyers, who only ever see their own RFQs.
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub search: Option<String>,
}

impl RfqFilter {
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Buyer columns shown next to an RFQ in the admin inquiries view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerSummary {
    pub username: String,
    pub email: String,
    pub user_code: String,
}

/// One row of the admin inquiries view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RfqSummary {
    #[serde(flatten)]
    pub rfq: Rfq,
    pub product_name: String,
    pub buyer: Option<BuyerSummary>,
}

#[derive(Clone)]
pub struct RfqManager {
    store: Arc<dyn Store>,
    config: CoreConfig,
}

impl RfqManager {
    pub fn new(store: Arc<dyn Store>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Create an RFQ owned by `actor` in status `Pending`.
    #[instrument(skip(self, actor, req), fields(actor = %actor.id, product_id = %req.product_id))]
    pub async fn create(&self, actor: &Actor, req: CreateRfq) -> Result<Rfq> {
        if req.quantity == 0 {
            return Err(CoreError::validation("quantity must be greater than zero"));
        }
        let country = req.country.trim();
        if country.is_empty() {
            return Err(CoreError::validation("destination country is required"));
        }
        let message = req.message.trim();
        if message.is_empty() {
            return Err(CoreError::validation("requirements message is required"));
        }

        let product = self
            .store
            .get_product(req.product_id)
            .await?
            .ok_or_else(|| CoreError::validation(format!("unknown product {}", req.product_id)))?;

        if req.quantity < product.moq {
            match self.config.moq_policy {
                MoqPolicy::Enforce => {
                    return Err(CoreError::validation(format!(
                        "quantity {} is below the minimum order quantity of {}",
                        req.quantity, product.moq
                    )));
                }
                MoqPolicy::Advisory => {
                    warn!(quantity = req.quantity, moq = product.moq, "rfq below moq accepted");
                }
            }
        }

        let rfq = self
            .store
            .insert_rfq(NewRfq {
                user_id: actor.id,
                product_id: product.id,
                quantity: req.quantity,
                target_price: req
                    .target_price
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
                country: country.to_string(),
                message: message.to_string(),
            })
            .await?;

        info!(rfq_id = %rfq.id, quantity = rfq.quantity, "rfq created");
        Ok(rfq)
    }

    /// Set the status of an RFQ.  Admin only.
    ///
    /// Last write wins unless the transition policy makes `Closed` terminal,
    /// in which case the write is conditional on the version the policy was
    /// checked against.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_status(&self, actor: &Actor, id: RfqId, status: RfqStatus) -> Result<Rfq> {
        require_admin(actor)?;
        let current = load_authorized_rfq(self.store.as_ref(), actor, id).await?;
        self.check_transition(&current, status)?;

        let expected = match self.config.transition_policy {
            TransitionPolicy::Free => None,
            TransitionPolicy::TerminalClosed => Some(current.version),
        };
        self.write_status(&current, status, expected).await
    }

    /// Like [`RfqManager::update_status`], failing with
    /// [`CoreError::Conflict`] if the RFQ is no longer at `expected_version`.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_status_if_version(
        &self,
        actor: &Actor,
        id: RfqId,
        status: RfqStatus,
        expected_version: u64,
    ) -> Result<Rfq> {
        require_admin(actor)?;
        let current = load_authorized_rfq(self.store.as_ref(), actor, id).await?;
        if current.version != expected_version {
            return Err(CoreError::Conflict(format!(
                "rfq {id} is at version {}, expected {expected_version}",
                current.version
            )));
        }
        self.check_transition(&current, status)?;
        self.write_status(&current, status, Some(expected_version))
            .await
    }

    /// Parse a wire status string and apply it.
    ///
    /// Anything other than the three exact status names is rejected before
    /// the store is touched.
    pub async fn update_status_from_wire(
        &self,
        actor: &Actor,
        id: RfqId,
        raw: &str,
        expected_version: Option<u64>,
    ) -> Result<Rfq> {
        require_admin(actor)?;
        let status: RfqStatus = raw.parse()?;
        match expected_version {
            Some(version) => {
                self.update_status_if_version(actor, id, status, version)
                    .await
            }
            None => self.update_status(actor, id, status).await,
        }
    }

    fn check_transition(&self, current: &Rfq, to: RfqStatus) -> Result<()> {
        if self.config.transition_policy.allows(current.status, to) {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "cannot move rfq from {} to {}",
                current.status, to
            )))
        }
    }

    async fn write_status(
        &self,
        current: &Rfq,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> Result<Rfq> {
        let updated = self
            .store
            .update_rfq_status(current.id, status, expected_version)
            .await?;
        info!(
            rfq_id = %updated.id,
            from = %current.status,
            to = %updated.status,
            version = updated.version,
            "rfq status updated"
        );
        Ok(updated)
    }

    pub async fn get(&self, actor: &Actor, id: RfqId) -> Result<Rfq> {
        let rfq = load_authorized_rfq(self.store.as_ref(), actor, id).await?;
        debug!(rfq_id = %id, actor = %actor.id, "rfq read");
        Ok(rfq)
    }

    /// RFQs visible to `actor`, newest first.
    pub async fn list(&self, actor: &Actor, filter: &RfqFilter) -> Result<Vec<Rfq>> {
        let query = RfqQuery {
            owner: if actor.is_admin() {
                filter.owner
            } else {
                Some(actor.id)
            },
            status: filter.status,
            product: None,
        };
        let mut rfqs = self.store.list_rfqs(&query).await?;

        if let Some(needle) = filter.needle() {
            rfqs.retain(|rfq| {
                rfq.message.to_lowercase().contains(&needle)
                    || rfq.country.to_lowercase().contains(&needle)
            });
        }

        debug!(actor = %actor.id, count = rfqs.len(), "rfqs listed");
        Ok(rfqs)
    }

    /// The admin inquiries view: every RFQ with its product name and buyer.
    ///
    /// Search matches product name, buyer username or buyer email, ignoring
    /// case.
    pub async fn list_summaries(&self, actor: &Actor, filter: &RfqFilter) -> Result<Vec<RfqSummary>> {
        require_admin(actor)?;

        let query = RfqQuery {
            owner: filter.owner,
            status: filter.status,
            product: None,
        };
        let rfqs = self.store.list_rfqs(&query).await?;
        let products: HashMap<_, _> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let buyers: HashMap<_, _> = self
            .store
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.user_id,
                    BuyerSummary {
                        username: p.username,
                        email: p.email,
                        user_code: p.user_code,
                    },
                )
            })
            .collect();

        let needle = filter.needle();
        let mut summaries = Vec::with_capacity(rfqs.len());
        for rfq in rfqs {
            let product_name = products.get(&rfq.product_id).cloned().ok_or_else(|| {
                CoreError::DataIntegrity(format!(
                    "rfq {} references missing product {}",
                    rfq.id, rfq.product_id
                ))
            })?;
            let buyer = buyers.get(&rfq.user_id).cloned();

            if let Some(needle) = &needle {
                let hit = product_name.to_lowercase().contains(needle)
                    || buyer.as_ref().is_some_and(|b| {
                        b.username.to_lowercase().contains(needle)
                            || b.email.to_lowercase().contains(needle)
                    });
                if !hit {
                    continue;
                }
            }

            summaries.push(RfqSummary {
                rfq,
                product_name,
                buyer,
            });
        }

        debug!(count = summaries.len(), "rfq summaries listed");
        Ok(summaries)
    }
}
