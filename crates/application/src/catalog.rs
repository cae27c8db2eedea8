//! Interface catalog and its pager.
//!
//! [`InterfaceCatalog`] is the in-memory list behind the sidebar. Writers
//! never mutate the list a reader may hold: each write builds a new vector
//! and swaps the `Arc`.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use sosodesk_domain::InterfaceSummary;
use tracing::{debug, info, warn};

use crate::ports::InterfaceCatalogService;

/// Copy-on-write list of interface summaries.
#[derive(Debug, Default)]
pub struct InterfaceCatalog {
    entries: RwLock<Arc<Vec<InterfaceSummary>>>,
}

impl InterfaceCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<InterfaceSummary>) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Returns the current list. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<Vec<InterfaceSummary>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&[InterfaceSummary]) -> Option<Vec<InterfaceSummary>>) -> bool {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match f(guard.as_slice()) {
            Some(next) => {
                *guard = Arc::new(next);
                true
            }
            None => false,
        }
    }

    /// Appends rows whose id is not listed yet. Returns how many were added.
    pub fn append(&self, rows: Vec<InterfaceSummary>) -> usize {
        let mut added = 0;
        self.update(|current| {
            let mut next = current.to_vec();
            for row in rows {
                if !next.iter().any(|e| e.id == row.id) {
                    next.push(row);
                    added += 1;
                }
            }
            Some(next)
        });
        added
    }

    /// Replaces the row with the same id. Returns false if there is none.
    pub fn replace_entry(&self, row: InterfaceSummary) -> bool {
        self.update(|current| {
            let index = current.iter().position(|e| e.id == row.id)?;
            let mut next = current.to_vec();
            next[index] = row;
            Some(next)
        })
    }

    /// Replaces the whole list.
    pub fn replace_all(&self, rows: Vec<InterfaceSummary>) {
        self.update(|_| Some(rows));
    }

    /// Looks up a row by id.
    pub fn find(&self, id: i64) -> Option<InterfaceSummary> {
        self.snapshot().iter().find(|e| e.id == id).cloned()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

/// Result of one [`CatalogPager::load_next_page`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page was fetched and merged.
    Loaded {
        /// Rows new to the catalog.
        added: usize,
        /// Whether another page follows.
        has_more: bool,
    },
    /// Nothing left to load.
    Exhausted,
    /// The first fetch failed and the fallback list was installed.
    Fallback {
        /// Rows installed.
        count: usize,
    },
    /// A fetch failed with rows already loaded; retry later.
    Failed(String),
}

#[derive(Debug)]
struct PagerState {
    next_page: u32,
    has_more: bool,
}

impl Default for PagerState {
    fn default() -> Self {
        Self {
            next_page: 1,
            has_more: true,
        }
    }
}

/// Loads catalog pages into an [`InterfaceCatalog`].
pub struct CatalogPager {
    service: Arc<dyn InterfaceCatalogService>,
    catalog: Arc<InterfaceCatalog>,
    page_size: u32,
    fallback: Vec<InterfaceSummary>,
    state: Mutex<PagerState>,
}

impl CatalogPager {
    /// Creates a pager. `fallback` is installed if the very first page fails.
    pub fn new(
        service: Arc<dyn InterfaceCatalogService>,
        catalog: Arc<InterfaceCatalog>,
        page_size: u32,
        fallback: Vec<InterfaceSummary>,
    ) -> Self {
        Self {
            service,
            catalog,
            page_size: page_size.max(1),
            fallback,
            state: Mutex::new(PagerState::default()),
        }
    }

    /// Returns true if another page may follow.
    pub fn has_more(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).has_more
    }

    /// Fetches the next page and merges it into the catalog.
    pub async fn load_next_page(&self) -> PageOutcome {
        let page = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.has_more {
                return PageOutcome::Exhausted;
            }
            state.next_page
        };

        match self.service.list_page(page, self.page_size).await {
            Ok(result) => {
                let has_more = result.has_more && !result.items.is_empty();
                let added = self.catalog.append(result.items);
                {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.next_page = page + 1;
                    state.has_more = has_more;
                }
                debug!(page, added, has_more, "catalog page loaded");
                PageOutcome::Loaded { added, has_more }
            }
            Err(error) if self.catalog.is_empty() => {
                warn!(page, error = %error, "catalog unavailable, using fallback entries");
                self.catalog.replace_all(self.fallback.clone());
                self.state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .has_more = false;
                info!(count = self.fallback.len(), "fallback catalog installed");
                PageOutcome::Fallback {
                    count: self.fallback.len(),
                }
            }
            Err(error) => {
                warn!(page, error = %error, "catalog page failed");
                PageOutcome::Failed(error.to_string())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCatalogService, summary};
    use pretty_assertions::assert_eq;
    use sosodesk_domain::InterfacePage;
    use std::sync::atomic::Ordering;

    fn page(ids: &[i64], has_more: bool) -> InterfacePage {
        InterfacePage {
            items: ids
                .iter()
                .map(|&id| summary(id, &format!("/p{id}"), "svc"))
                .collect(),
            has_more,
        }
    }

    #[test]
    fn snapshots_are_unaffected_by_later_writes() {
        let catalog = InterfaceCatalog::with_entries(vec![summary(1, "/a", "svc")]);
        let before = catalog.snapshot();

        assert!(catalog.replace_entry(summary(1, "/b", "svc")));

        assert_eq!(before[0].url, "/a");
        assert_eq!(catalog.find(1).unwrap().url, "/b");
    }

    #[test]
    fn replace_entry_of_unknown_id_is_a_no_op() {
        let catalog = InterfaceCatalog::with_entries(vec![summary(1, "/a", "svc")]);
        let before = catalog.snapshot();

        assert!(!catalog.replace_entry(summary(2, "/b", "svc")));
        assert!(Arc::ptr_eq(&before, &catalog.snapshot()));
    }

    #[test]
    fn append_skips_known_ids() {
        let catalog = InterfaceCatalog::with_entries(vec![summary(1, "/a", "svc")]);
        let added = catalog.append(vec![summary(1, "/x", "svc"), summary(2, "/b", "svc")]);
        assert_eq!(added, 1);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find(1).unwrap().url, "/a");
    }

    #[tokio::test]
    async fn pages_until_exhausted() {
        let service = Arc::new(FakeCatalogService::default());
        *service.pages.lock().unwrap() = vec![page(&[1, 2], true), page(&[3], false)];
        let catalog = Arc::new(InterfaceCatalog::new());
        let pager = CatalogPager::new(service, catalog.clone(), 2, Vec::new());

        assert_eq!(
            pager.load_next_page().await,
            PageOutcome::Loaded { added: 2, has_more: true }
        );
        assert_eq!(
            pager.load_next_page().await,
            PageOutcome::Loaded { added: 1, has_more: false }
        );
        assert_eq!(pager.load_next_page().await, PageOutcome::Exhausted);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn first_failure_installs_fallback() {
        let service = Arc::new(FakeCatalogService::default());
        service.fail_pages.store(true, Ordering::SeqCst);
        let catalog = Arc::new(InterfaceCatalog::new());
        let fallback = vec![summary(900, "/mock", "mock")];
        let pager = CatalogPager::new(service, catalog.clone(), 20, fallback);

        assert_eq!(pager.load_next_page().await, PageOutcome::Fallback { count: 1 });
        assert_eq!(catalog.find(900).unwrap().url, "/mock");
        assert!(!pager.has_more());
    }

    #[tokio::test]
    async fn later_failure_keeps_loaded_rows() {
        let service = Arc::new(FakeCatalogService::default());
        *service.pages.lock().unwrap() = vec![page(&[1], true)];
        let catalog = Arc::new(InterfaceCatalog::new());
        let fallback = vec![summary(900, "/mock", "mock")];
        let pager = CatalogPager::new(service.clone(), catalog.clone(), 1, fallback);

        pager.load_next_page().await;
        service.fail_pages.store(true, Ordering::SeqCst);

        assert!(matches!(pager.load_next_page().await, PageOutcome::Failed(_)));
        assert_eq!(catalog.len(), 1);
        assert!(pager.has_more());
    }
}
