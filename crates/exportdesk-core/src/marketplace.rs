use std::sync::Arc;

use exportdesk_store::Store;

use crate::actor::StoreIdentity;
use crate::admin::AdminConsole;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::rfq::RfqManager;
use crate::sync::ThreadSync;
use crate::thread::ThreadManager;

/// Every core service wired to one store backend.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn Store>,
    config: CoreConfig,
    rfqs: RfqManager,
    threads: ThreadManager,
    sync: ThreadSync,
    catalog: Catalog,
    admin: AdminConsole,
    identity: StoreIdentity,
}

impl Marketplace {
    pub fn new(store: Arc<dyn Store>, config: CoreConfig) -> Self {
        Self {
            rfqs: RfqManager::new(store.clone(), config),
            threads: ThreadManager::new(store.clone()),
            sync: ThreadSync::new(store.clone()),
            catalog: Catalog::new(store.clone()),
            admin: AdminConsole::new(store.clone()),
            identity: StoreIdentity::new(store.clone()),
            store,
            config,
        }
    }

    pub fn rfqs(&self) -> &RfqManager {
        &self.rfqs
    }

    pub fn threads(&self) -> &ThreadManager {
        &self.threads
    }

    pub fn sync(&self) -> &ThreadSync {
        &self.sync
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn admin(&self) -> &AdminConsole {
        &self.admin
    }

    pub fn identity(&self) -> &StoreIdentity {
        &self.identity
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
