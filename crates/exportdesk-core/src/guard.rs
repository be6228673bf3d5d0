//! The authorization predicate applied before every RFQ and message
//! operation.
//!
//! An actor may access an RFQ if they are an admin or they own it.  Denials
//! are errors, never empty results.  A buyer asking for an RFQ that does not
//! exist is denied exactly like a buyer asking for someone else's, so the
//! answer reveals nothing about existence; only admins see `NotFound`.

use exportdesk_shared::RfqId;
use exportdesk_store::{Rfq, Store};
use tracing::warn;

use crate::actor::Actor;
use crate::error::{CoreError, Result};

pub fn can_access_rfq(actor: &Actor, rfq: &Rfq) -> bool {
    actor.is_admin() || actor.id == rfq.user_id
}

pub fn authorize_rfq(actor: &Actor, rfq: &Rfq) -> Result<()> {
    if can_access_rfq(actor, rfq) {
        Ok(())
    } else {
        warn!(actor = %actor.id, rfq_id = %rfq.id, "rfq access denied");
        Err(CoreError::Authorization)
    }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        warn!(actor = %actor.id, "admin-only operation denied");
        Err(CoreError::Authorization)
    }
}

/// Fetch an RFQ and check access to it in one step.
pub async fn load_authorized_rfq(store: &dyn Store, actor: &Actor, rfq_id: RfqId) -> Result<Rfq> {
    match store.get_rfq(rfq_id).await? {
        Some(rfq) => {
            authorize_rfq(actor, &rfq)?;
            Ok(rfq)
        }
        None if actor.is_admin() => Err(CoreError::not_found("RFQ", rfq_id)),
        None => {
            warn!(actor = %actor.id, rfq_id = %rfq_id, "rfq access denied");
            Err(CoreError::Authorization)
        }
    }
}
