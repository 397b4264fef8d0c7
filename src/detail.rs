use std::sync::Arc;
use tracing::info;

use crate::favorites::FavoritesStore;
use crate::models::{MovieDetail, MovieId};
use crate::tmdb::{CatalogApi, CatalogError};
use crate::view::{Emptiness, ViewSlot, ViewState};

pub const NOT_FOUND: &str = "Movie not found";
pub const LOAD_FAILED: &str = "Failed to load movie details. Please try again.";

impl Emptiness for MovieDetail {
    fn is_empty_result(&self) -> bool {
        false
    }
}

/// The movie page: one detail request per opened id.
pub struct DetailView {
    catalog: Arc<dyn CatalogApi>,
    slot: ViewSlot<MovieId, MovieDetail>,
}

impl DetailView {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            slot: ViewSlot::new(),
        }
    }

    /// Loads `id` and returns the page state with the id it belongs to.
    /// A newer `open` or a `close` wins over this one.
    pub async fn open(&self, id: MovieId) -> (Option<MovieId>, ViewState<MovieDetail>) {
        let ticket = self.slot.begin(id).await;
        info!(movie_id = id, "Loading movie details");
        let result = self.catalog.fetch_detail(id).await;
        self.slot
            .complete_with(ticket, result, |e: &CatalogError| {
                if e.is_not_found() {
                    NOT_FOUND.to_string()
                } else {
                    LOAD_FAILED.to_string()
                }
            })
            .await;
        self.slot.labeled_snapshot().await
    }

    /// Leaves the page; responses still in flight are discarded.
    pub async fn close(&self) {
        self.slot.invalidate().await;
    }

    /// The movie the page is showing or loading.
    pub async fn current_id(&self) -> Option<MovieId> {
        self.slot.labeled_snapshot().await.0
    }

    pub async fn state(&self) -> ViewState<MovieDetail> {
        self.slot.snapshot().await
    }

    /// Toggles movie `id` if it is the one loaded. `None` otherwise.
    pub async fn toggle_favorite(&self, id: MovieId, store: &mut FavoritesStore) -> Option<bool> {
        let state = self.slot.snapshot().await;
        let detail = state.loaded().filter(|d| d.id() == id)?;
        Some(store.toggle(detail.summary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::MemoryStorage;
    use crate::models::{Genre, MovieSummary, SortKey};
    use crate::tmdb::CatalogResult;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct SlowCatalog {
        gate: Notify,
    }

    #[async_trait]
    impl CatalogApi for SlowCatalog {
        async fn fetch_popular(&self) -> CatalogResult<Vec<MovieSummary>> {
            Ok(vec![])
        }
        async fn search(&self, _query: &str) -> CatalogResult<Vec<MovieSummary>> {
            Ok(vec![])
        }
        async fn discover(
            &self,
            _genre: Option<i32>,
            _sort: SortKey,
        ) -> CatalogResult<Vec<MovieSummary>> {
            Ok(vec![])
        }
        async fn fetch_detail(&self, id: MovieId) -> CatalogResult<MovieDetail> {
            if id == 404 {
                return Err(CatalogError::NotFound(id));
            }
            if id == 500 {
                return Err(CatalogError::Status {
                    url: "/movie/500".to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            if id == 1 {
                self.gate.notified().await;
            }
            Ok(MovieDetail {
                summary: MovieSummary::new(id, format!("Movie {id}")),
                runtime: Some(100),
                genres: vec![Genre {
                    id: 18,
                    name: "Drama".to_string(),
                }],
                cast: vec![],
                crew: vec![],
                imdb_id: None,
            })
        }
        async fn fetch_genres(&self) -> CatalogResult<Vec<Genre>> {
            Ok(vec![])
        }
    }

    fn view() -> Arc<DetailView> {
        Arc::new(DetailView::new(Arc::new(SlowCatalog {
            gate: Notify::new(),
        })))
    }

    #[tokio::test]
    async fn loads_detail() {
        let view = view();
        let (shown, state) = view.open(2).await;
        assert_eq!(shown, Some(2));
        assert_eq!(state.loaded().map(|d| d.id()), Some(2));
        assert_eq!(view.current_id().await, Some(2));
    }

    #[tokio::test]
    async fn not_found_and_failure_messages() {
        let view = view();
        assert_eq!(
            view.open(404).await,
            (Some(404), ViewState::Failed(NOT_FOUND.to_string()))
        );
        assert_eq!(
            view.open(500).await,
            (Some(500), ViewState::Failed(LOAD_FAILED.to_string()))
        );
    }

    #[tokio::test]
    async fn closed_view_ignores_late_response() {
        let catalog = Arc::new(SlowCatalog {
            gate: Notify::new(),
        });
        let view = Arc::new(DetailView::new(catalog.clone()));

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.open(1).await }
        });
        while !view.state().await.is_loading() {
            tokio::task::yield_now().await;
        }
        view.close().await;
        catalog.gate.notify_one();

        assert_eq!(pending.await.unwrap(), (None, ViewState::Idle));
        assert_eq!(view.state().await, ViewState::Idle);
        assert_eq!(view.current_id().await, None);
    }

    #[tokio::test]
    async fn toggles_loaded_movie() {
        let view = view();
        let mut store = FavoritesStore::initialize(Box::new(MemoryStorage::new()));
        assert_eq!(view.toggle_favorite(3, &mut store).await, None);

        view.open(3).await;
        assert_eq!(view.toggle_favorite(4, &mut store).await, None);
        assert_eq!(view.toggle_favorite(3, &mut store).await, Some(true));
        assert!(store.is_favorite(3));
        assert_eq!(store.list()[0].genre_ids, Some(vec![18]));
        assert_eq!(view.toggle_favorite(3, &mut store).await, Some(false));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn superseded_open_reports_newer_movie() {
        let catalog = Arc::new(SlowCatalog {
            gate: Notify::new(),
        });
        let view = Arc::new(DetailView::new(catalog.clone()));
        let mut store = FavoritesStore::initialize(Box::new(MemoryStorage::new()));

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.open(1).await }
        });
        while !view.state().await.is_loading() {
            tokio::task::yield_now().await;
        }
        let (shown, _) = view.open(2).await;
        assert_eq!(shown, Some(2));
        catalog.gate.notify_one();

        let (late_shown, late_state) = pending.await.unwrap();
        assert_eq!(late_shown, Some(2));
        assert_eq!(late_state.loaded().map(|d| d.id()), Some(2));
        assert_eq!(view.toggle_favorite(1, &mut store).await, None);
        assert!(store.is_empty());
    }
}
