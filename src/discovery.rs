use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::favorites::FavoritesStore;
use crate::models::{MovieId, MovieSummary, SortKey};
use crate::tmdb::{CatalogApi, CatalogResult};
use crate::view::{ViewSlot, ViewState};

pub const LOAD_FAILED: &str = "Failed to load movies. Please try again.";

/// What the user has typed or selected on the home page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscoveryInput {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub genre: Option<i32>,
    #[serde(default)]
    pub sort: SortKey,
}

/// The single catalog request an input maps to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CatalogQuery {
    Popular,
    Search { query: String },
    Discover { genre: i32, sort: SortKey },
}

impl CatalogQuery {
    /// Text wins over genre; genre wins over the popular list.
    pub fn select(input: &DiscoveryInput) -> Self {
        let query = input.query.trim();
        if !query.is_empty() {
            return CatalogQuery::Search {
                query: query.to_string(),
            };
        }
        match input.genre {
            Some(genre) => CatalogQuery::Discover {
                genre,
                sort: input.sort,
            },
            None => CatalogQuery::Popular,
        }
    }

    pub async fn run(&self, catalog: &dyn CatalogApi) -> CatalogResult<Vec<MovieSummary>> {
        match self {
            CatalogQuery::Popular => catalog.fetch_popular().await,
            CatalogQuery::Search { query } => catalog.search(query).await,
            CatalogQuery::Discover { genre, sort } => catalog.discover(Some(*genre), *sort).await,
        }
    }
}

pub struct DiscoveryView {
    catalog: Arc<dyn CatalogApi>,
    slot: ViewSlot<CatalogQuery, Vec<MovieSummary>>,
}

impl DiscoveryView {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            slot: ViewSlot::new(),
        }
    }

    /// Runs the request for `input` and returns the view state afterwards,
    /// labeled with the query that produced it.
    ///
    /// If a newer load starts while this one is waiting, this one's response
    /// is dropped and both the state and the label belong to the newer request.
    pub async fn load(&self, input: &DiscoveryInput) -> (CatalogQuery, ViewState<Vec<MovieSummary>>) {
        let query = CatalogQuery::select(input);
        let ticket = self.slot.begin(query.clone()).await;
        info!(?query, ticket = ticket.generation(), "Loading movies");
        let result = query.run(self.catalog.as_ref()).await;
        self.slot.complete(ticket, result, LOAD_FAILED).await;
        let (shown, state) = self.slot.labeled_snapshot().await;
        (shown.unwrap_or(query), state)
    }

    pub async fn state(&self) -> ViewState<Vec<MovieSummary>> {
        self.slot.snapshot().await
    }

    /// Toggles a movie from the current results. `None` if it is not shown.
    pub async fn toggle_favorite(&self, id: MovieId, store: &mut FavoritesStore) -> Option<bool> {
        let state = self.slot.snapshot().await;
        let movie = state.loaded()?.iter().find(|m| m.id == id)?.clone();
        Some(store.toggle(movie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(query: &str, genre: Option<i32>, sort: SortKey) -> DiscoveryInput {
        DiscoveryInput {
            query: query.to_string(),
            genre,
            sort,
        }
    }

    #[test]
    fn empty_input_is_popular() {
        assert_eq!(
            CatalogQuery::select(&input("   ", None, SortKey::TitleAsc)),
            CatalogQuery::Popular
        );
    }

    #[test]
    fn genre_without_text_discovers() {
        assert_eq!(
            CatalogQuery::select(&input("", Some(28), SortKey::VoteAverageDesc)),
            CatalogQuery::Discover {
                genre: 28,
                sort: SortKey::VoteAverageDesc
            }
        );
    }

    #[test]
    fn text_ignores_genre() {
        assert_eq!(
            CatalogQuery::select(&input(" wick ", Some(28), SortKey::VoteAverageDesc)),
            CatalogQuery::Search {
                query: "wick".to_string()
            }
        );
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let parsed: DiscoveryInput = serde_json::from_str(r#"{"genre": 35}"#).unwrap();
        assert_eq!(parsed, input("", Some(35), SortKey::PopularityDesc));
    }
}
