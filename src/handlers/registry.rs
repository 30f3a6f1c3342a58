use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::base::HandlerContext;
use super::traits::{Handler, InfoHandler, ServiceHandler};
use super::{info as info_sites, stream};
use crate::config::{Config, FetchSettings, HandlerConfig};
use crate::fetch::{FetchError, Transport};

/// The two handler families, each with its own key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Service,
    Info,
}

impl Family {
    /// Config section the family's options live under
    pub fn section(&self) -> &'static str {
        match self {
            Family::Service => "services",
            Family::Info => "info",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Builds every known handler of a family
pub type Factory<H> = fn(&HandlerContext) -> Vec<Arc<H>>;

/// Lazily built, write-once map from handler key to instance
pub struct Registry<H: ?Sized + Handler> {
    family: Family,
    context: HandlerContext,
    configs: HashMap<String, HandlerConfig>,
    factory: Factory<H>,
    handlers: OnceLock<BTreeMap<String, Arc<H>>>,
}

impl<H: ?Sized + Handler> Registry<H> {
    pub fn new(
        family: Family,
        context: HandlerContext,
        configs: HashMap<String, HandlerConfig>,
        factory: Factory<H>,
    ) -> Self {
        Self {
            family,
            context,
            configs,
            factory,
            handlers: OnceLock::new(),
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Construct and configure every handler on first use; no-op afterwards
    pub fn ensure(&self) -> &BTreeMap<String, Arc<H>> {
        self.handlers.get_or_init(|| self.build())
    }

    fn build(&self) -> BTreeMap<String, Arc<H>> {
        let mut handlers = BTreeMap::new();

        for handler in (self.factory)(&self.context) {
            let key = handler.key().to_string();
            if handlers.contains_key(&key) {
                warn!(
                    family = %self.family,
                    handler = %key,
                    "Duplicate handler key, keeping first"
                );
                continue;
            }

            let config = self.configs.get(&key).cloned().unwrap_or_default();
            if let Err(e) = handler.set_config(config) {
                warn!(
                    family = %self.family,
                    handler = %key,
                    error = %e,
                    "Config not applied"
                );
            }

            debug!(
                family = %self.family,
                handler = %key,
                name = handler.name(),
                "Handler registered"
            );
            handlers.insert(key, handler);
        }

        info!(
            family = %self.family,
            count = handlers.len(),
            "Handlers initialized"
        );
        handlers
    }

    pub fn all(&self) -> &BTreeMap<String, Arc<H>> {
        self.ensure()
    }

    /// Handler for `key`; `None` for an unknown or missing key
    pub fn get(&self, key: Option<&str>) -> Option<Arc<H>> {
        let key = key?;
        let handler = self.ensure().get(key).cloned();
        if handler.is_none() {
            debug!(family = %self.family, handler = %key, "Unknown handler key");
        }
        handler
    }

    pub fn is_initialized(&self) -> bool {
        self.handlers.get().is_some()
    }
}

/// Both handler registries, built once at process start and passed around
pub struct Handlers {
    services: Registry<dyn ServiceHandler>,
    info: Registry<dyn InfoHandler>,
}

impl Handlers {
    /// Registries over a reqwest transport configured from `config.http`
    pub fn setup(config: &Config) -> Result<Self, FetchError> {
        let context = HandlerContext::from_settings(config.http.clone())?;
        Ok(Self::with_context(context, config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self::with_context(HandlerContext::new(transport, config.http.clone()), config)
    }

    fn with_context(context: HandlerContext, config: &Config) -> Self {
        Self {
            services: Registry::new(
                Family::Service,
                context.clone(),
                config.family_configs(Family::Service).clone(),
                stream::all,
            ),
            info: Registry::new(
                Family::Info,
                context,
                config.family_configs(Family::Info).clone(),
                info_sites::all,
            ),
        }
    }

    pub fn services(&self) -> &Registry<dyn ServiceHandler> {
        &self.services
    }

    pub fn info(&self) -> &Registry<dyn InfoHandler> {
        &self.info
    }

    pub fn service(&self, key: Option<&str>) -> Option<Arc<dyn ServiceHandler>> {
        self.services.get(key)
    }

    pub fn info_handler(&self, key: Option<&str>) -> Option<Arc<dyn InfoHandler>> {
        self.info.get(key)
    }

    /// Eagerly build both families
    pub fn ensure(&self) {
        self.services.ensure();
        self.info.ensure();
    }

    pub fn settings(&self) -> &FetchSettings {
        self.services.context.settings()
    }
}
