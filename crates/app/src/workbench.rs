//! Composition root shared by the binary and its tests.

use std::sync::Arc;

use anyhow::{Context, bail};
use sosodesk_application::ports::{DebugService, EnvironmentService, InterfaceCatalogService};
use sosodesk_application::{
    CatalogPager, HydrateOutcome, InterfaceCatalog, PageOutcome, RunOutcome, SaveOutcome,
    StoreConfig, StoreDeps, TabStore,
};
use sosodesk_domain::{ClientSettings, InterfaceSummary, TabId};
use sosodesk_infrastructure::{
    InMemoryBackend, LocalCache, LoggingNotifier, SosotestClient, SystemClock, fallback_catalog,
};
use tracing::{info, warn};

/// The three backend ports, usually served by one adapter.
#[derive(Clone)]
pub struct Backend {
    /// Interface list, detail and save.
    pub catalog: Arc<dyn InterfaceCatalogService>,
    /// Debug job submit and poll.
    pub debug: Arc<dyn DebugService>,
    /// Environment lists.
    pub environments: Arc<dyn EnvironmentService>,
}

impl Backend {
    /// Uses one adapter for every port.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: InterfaceCatalogService + DebugService + EnvironmentService + 'static,
    {
        Self {
            catalog: backend.clone(),
            debug: backend.clone(),
            environments: backend,
        }
    }

    /// Live client for `settings.base_url`, or the demo data when `offline`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(settings: &ClientSettings, offline: bool) -> anyhow::Result<Self> {
        if offline {
            info!("using the in-memory demo backend");
            return Ok(Self::shared(Arc::new(InMemoryBackend::demo())));
        }
        let client = SosotestClient::new(settings)
            .with_context(|| format!("cannot create a client for {}", settings.base_url))?;
        info!(base_url = %client.base_url(), "using the sosotest backend");
        Ok(Self::shared(Arc::new(client)))
    }
}

/// Store, pager and notifier for one session.
pub struct Workbench {
    settings: ClientSettings,
    store: TabStore,
    pager: CatalogPager,
    notifier: Arc<LoggingNotifier>,
}

impl Workbench {
    /// Builds a session. The catalog falls back to the demo rows if its first
    /// page cannot be loaded.
    #[must_use]
    pub fn new(settings: ClientSettings, backend: Backend) -> Self {
        let catalog = Arc::new(InterfaceCatalog::new());
        let notifier = Arc::new(LoggingNotifier::new());
        let pager = CatalogPager::new(
            backend.catalog.clone(),
            catalog.clone(),
            settings.page_size,
            fallback_catalog(),
        );
        let deps = StoreDeps {
            catalog_service: backend.catalog,
            debug_service: backend.debug,
            environment_service: backend.environments,
            connection: notifier.clone(),
            recorder: notifier.clone(),
            clock: Arc::new(SystemClock::new()),
        };
        let store = TabStore::new(deps, StoreConfig::from(&settings), catalog);
        Self {
            settings,
            store,
            pager,
            notifier,
        }
    }

    /// The tab store.
    #[must_use]
    pub const fn store(&self) -> &TabStore {
        &self.store
    }

    /// Connection and run log.
    #[must_use]
    pub fn notifier(&self) -> &LoggingNotifier {
        &self.notifier
    }

    /// Loads up to `max_pages` catalog pages, or all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if a page after the first one fails. A failing first
    /// page installs the fallback rows instead.
    pub async fn load_catalog(
        &self,
        max_pages: Option<u32>,
    ) -> anyhow::Result<Arc<Vec<InterfaceSummary>>> {
        let mut loaded = 0;
        while self.pager.has_more() && max_pages.is_none_or(|max| loaded < max) {
            match self.pager.load_next_page().await {
                PageOutcome::Loaded { .. } => loaded += 1,
                PageOutcome::Exhausted => break,
                PageOutcome::Fallback { count } => {
                    warn!(count, "backend catalog unavailable, showing demo interfaces");
                    break;
                }
                PageOutcome::Failed(message) => bail!("loading the catalog failed: {message}"),
            }
        }
        Ok(self.store.catalog().snapshot())
    }

    /// Finds an interface, paging through the catalog as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if paging fails before the row turns up.
    pub async fn find_interface(&self, id: i64) -> anyhow::Result<Option<InterfaceSummary>> {
        loop {
            if let Some(row) = self.store.catalog().find(id) {
                return Ok(Some(row));
            }
            match self.pager.load_next_page().await {
                PageOutcome::Loaded { .. } => {}
                PageOutcome::Exhausted | PageOutcome::Fallback { .. } => {
                    return Ok(self.store.catalog().find(id));
                }
                PageOutcome::Failed(message) => bail!("loading the catalog failed: {message}"),
            }
        }
    }

    /// Opens interface `id` in a tab and loads its definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface is unknown or cannot be loaded.
    pub async fn open(&self, id: i64) -> anyhow::Result<TabId> {
        let summary = self
            .find_interface(id)
            .await?
            .with_context(|| format!("interface {id} is not in the catalog"))?;
        let tab = self.store.open_tab(&self.settings.collection_id, &summary);
        match self.store.hydrate(&tab).await {
            HydrateOutcome::Ready => Ok(tab),
            HydrateOutcome::Failed(error) => Err(error.into()),
            HydrateOutcome::Skipped(_) | HydrateOutcome::Discarded => {
                bail!("interface {id} was closed while loading")
            }
        }
    }

    /// Opens and runs interface `id`, in environment `environment` if given,
    /// otherwise in the default selection for its endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface cannot be opened or no usable
    /// environment exists.
    pub async fn run(&self, id: i64, environment: Option<&str>) -> anyhow::Result<RunOutcome> {
        self.open(id).await?;
        self.store.resolve_active_environment().await;
        let resolver = self.store.environments();
        if let Some(error) = resolver.last_error() {
            return Err(error.into());
        }
        if let Some(key) = environment
            && !resolver.select(key)
        {
            bail!("environment {key} cannot be selected");
        }
        let entry = resolver
            .selected_entry()
            .with_context(|| format!("no selectable environment for interface {id}"))?;
        info!(interface = id, environment = %entry.config_key, "running");
        Ok(self.store.run_active_request(Some(&entry)).await)
    }

    /// Opens interface `id`, points it at `url` and saves it.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface cannot be opened or edited.
    pub async fn save_url(&self, id: i64, url: &str) -> anyhow::Result<SaveOutcome> {
        let tab = self.open(id).await?;
        let mut draft = self
            .store
            .tab(&tab)
            .map(|t| t.draft)
            .with_context(|| format!("tab for interface {id} disappeared"))?;
        draft.url = url.to_string();
        if !self.store.update_draft(&tab, draft) {
            bail!("tab for interface {id} cannot be edited");
        }
        Ok(self.store.save_active_request().await)
    }

    /// Restores remembered environments from the cache.
    pub fn restore(&self, cache: &LocalCache) {
        self.store
            .environments()
            .restore_remembered(cache.remembered_environments());
    }

    /// Copies remembered environments into the cache.
    pub fn remember(&self, cache: &mut LocalCache) {
        cache.set_remembered_environments(&self.store.environments().remembered());
    }

    /// Cancels runs and stops the store.
    pub fn shutdown(&self) {
        self.store.teardown();
    }
}
