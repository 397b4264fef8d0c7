#![allow(dead_code)]

use reelbox::models::{CastMember, CrewMember, Genre, MovieDetail, MovieId, MovieSummary, SortKey};
use reelbox::tmdb::{CatalogApi, CatalogError, CatalogResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Popular,
    Search(String),
    Discover(Option<i32>, SortKey),
    Detail(MovieId),
    Genres,
}

/// Catalog double: records every call, can hold a search until released.
#[derive(Default)]
pub struct FakeCatalog {
    pub calls: Mutex<Vec<Call>>,
    pub gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub genres_fail: bool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `search(query)` wait until the returned handle is notified.
    pub fn gate(&self, query: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(query.to_string(), notify.clone());
        notify
    }

    /// Makes `fetch_detail(id)` wait until the returned handle is notified.
    pub fn gate_detail(&self, id: MovieId) -> Arc<Notify> {
        self.gate(&format!("detail:{id}"))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error(path: &str) -> CatalogError {
    CatalogError::Status {
        url: path.to_string(),
        status: 500,
        body: "upstream down".to_string(),
    }
}

pub fn movie(id: MovieId, title: &str) -> MovieSummary {
    MovieSummary {
        release_date: Some("2014-10-22".to_string()),
        poster_path: Some(format!("/{id}.jpg")),
        vote_average: Some(7.4),
        ..MovieSummary::new(id, title)
    }
}

pub fn matrix() -> MovieDetail {
    MovieDetail {
        summary: MovieSummary {
            release_date: Some("1999-03-30".to_string()),
            vote_average: Some(8.216),
            ..MovieSummary::new(603, "The Matrix")
        },
        runtime: Some(136),
        genres: vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }],
        cast: vec![CastMember {
            id: 6384,
            name: "Keanu Reeves".to_string(),
            character: Some("Neo".to_string()),
            profile_path: Some("/keanu.jpg".to_string()),
        }],
        crew: vec![CrewMember {
            id: 9339,
            name: "Lilly Wachowski".to_string(),
            job: "Director".to_string(),
            department: Some("Directing".to_string()),
        }],
        imdb_id: Some("tt0133093".to_string()),
    }
}

pub fn alien() -> MovieDetail {
    MovieDetail {
        summary: MovieSummary {
            release_date: Some("1979-05-25".to_string()),
            vote_average: Some(8.1),
            ..MovieSummary::new(348, "Alien")
        },
        runtime: Some(117),
        genres: vec![],
        cast: vec![],
        crew: vec![],
        imdb_id: Some("tt0078748".to_string()),
    }
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn fetch_popular(&self) -> CatalogResult<Vec<MovieSummary>> {
        self.record(Call::Popular);
        Ok(vec![movie(1, "Popular One"), movie(2, "Popular Two")])
    }

    async fn search(&self, query: &str) -> CatalogResult<Vec<MovieSummary>> {
        self.record(Call::Search(query.to_string()));
        let gate = self.gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match query {
            "fail" => Err(server_error("/search/movie")),
            "zzz" => Ok(vec![]),
            _ => Ok(vec![movie(
                100 + query.len() as i32,
                &format!("result for {query}"),
            )]),
        }
    }

    async fn discover(
        &self,
        genre: Option<i32>,
        sort: SortKey,
    ) -> CatalogResult<Vec<MovieSummary>> {
        self.record(Call::Discover(genre, sort));
        Ok(vec![movie(
            genre.unwrap_or_default(),
            &format!("genre {:?} by {}", genre, sort),
        )])
    }

    async fn fetch_detail(&self, id: MovieId) -> CatalogResult<MovieDetail> {
        self.record(Call::Detail(id));
        let gate = self.gates.lock().unwrap().get(&format!("detail:{id}")).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match id {
            603 => Ok(matrix()),
            348 => Ok(alien()),
            500 => Err(server_error("/movie/500")),
            _ => Err(CatalogError::NotFound(id)),
        }
    }

    async fn fetch_genres(&self) -> CatalogResult<Vec<Genre>> {
        self.record(Call::Genres);
        if self.genres_fail {
            return Err(server_error("/genre/movie/list"));
        }
        Ok(vec![
            Genre {
                id: 28,
                name: "Action".to_string(),
            },
            Genre {
                id: 35,
                name: "Comedy".to_string(),
            },
        ])
    }
}

pub async fn wait_for_calls(catalog: &FakeCatalog, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if catalog.calls.lock().unwrap().len() >= expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for {} catalog calls (got {})",
                expected,
                catalog.calls.lock().unwrap().len()
            );
        }
        tokio::task::yield_now().await;
    }
}
