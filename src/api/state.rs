use std::sync::Arc;

use crate::api::mirror::LocalMirror;
use crate::api::navigation::Navigator;
use crate::api::session::SessionContext;
use crate::config::Config;
use crate::services::{DocumentService, IdentityService, KeyValueStore, Notifier, ObjectStorage};

/// Everything a screen needs, injected rather than read from globals.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityService>,
    pub documents: Arc<dyn DocumentService>,
    pub storage: Arc<dyn ObjectStorage>,
    pub kv: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<Navigator>,
    pub session: SessionContext,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        documents: Arc<dyn DocumentService>,
        storage: Arc<dyn ObjectStorage>,
        kv: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        config: Arc<Config>,
    ) -> Self {
        AppState {
            session: SessionContext::new(identity.clone()),
            navigator: Arc::new(Navigator::new()),
            identity,
            documents,
            storage,
            kv,
            notifier,
            config,
        }
    }

    pub fn mirror(&self) -> LocalMirror {
        LocalMirror::new(self.kv.clone(), self.config.mirror_key.clone())
    }
}
