use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::{CastMember, CrewMember, Genre, MovieDetail, MovieId, MovieSummary, SortKey, CREW_JOBS};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} -> {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("movie {0} not found")]
    NotFound(MovieId),
    #[error("JSON parse failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read-only access to the remote movie catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_popular(&self) -> CatalogResult<Vec<MovieSummary>>;
    async fn search(&self, query: &str) -> CatalogResult<Vec<MovieSummary>>;
    async fn discover(&self, genre: Option<i32>, sort: SortKey)
        -> CatalogResult<Vec<MovieSummary>>;
    async fn fetch_detail(&self, id: MovieId) -> CatalogResult<MovieDetail>;
    async fn fetch_genres(&self) -> CatalogResult<Vec<Genre>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let user_agent = format!("reelbox/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build TMDB HTTP client: {}", e))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language=en-US",
            self.base_url, self.api_key
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> CatalogResult<T> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: redact(url),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_page(&self, url: &str) -> CatalogResult<Vec<MovieSummary>> {
        let page: ResultsPage = self.get_json(url).await?;
        debug!(results = page.results.len(), "Catalog page received");
        Ok(page.results)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn fetch_popular(&self) -> CatalogResult<Vec<MovieSummary>> {
        let url = self.url("/movie/popular", &[]);
        self.get_page(&url).await
    }

    async fn search(&self, query: &str) -> CatalogResult<Vec<MovieSummary>> {
        let url = self.url(
            "/search/movie",
            &[
                ("query", query.to_string()),
                ("include_adult", "false".to_string()),
            ],
        );
        self.get_page(&url).await
    }

    async fn discover(
        &self,
        genre: Option<i32>,
        sort: SortKey,
    ) -> CatalogResult<Vec<MovieSummary>> {
        let mut params = vec![("sort_by", sort.as_str().to_string())];
        if let Some(genre) = genre {
            params.push(("with_genres", genre.to_string()));
        }
        let url = self.url("/discover/movie", &params);
        self.get_page(&url).await
    }

    async fn fetch_detail(&self, id: MovieId) -> CatalogResult<MovieDetail> {
        let url = self.url(
            &format!("/movie/{id}"),
            &[("append_to_response", "credits,external_ids".to_string())],
        );
        let appended: DetailAppended = match self.get_json(&url).await {
            Ok(d) => d,
            Err(CatalogError::Status { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                return Err(CatalogError::NotFound(id));
            }
            Err(e) => return Err(e),
        };
        Ok(appended.into_detail())
    }

    async fn fetch_genres(&self) -> CatalogResult<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            genres: Vec<Genre>,
        }

        let url = self.url("/genre/movie/list", &[]);
        let data: GenreList = self.get_json(&url).await?;
        Ok(data.genres)
    }
}

#[derive(Debug, Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
    #[serde(default)]
    crew: Vec<RawCrew>,
}

#[derive(Debug, Deserialize)]
struct RawCrew {
    id: i32,
    name: String,
    job: Option<String>,
    department: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailAppended {
    #[serde(flatten)]
    summary: MovieSummary,
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
    imdb_id: Option<String>,
    #[serde(default)]
    credits: Credits,
    #[serde(default)]
    external_ids: ExternalIds,
}

impl DetailAppended {
    fn into_detail(self) -> MovieDetail {
        let crew = self
            .credits
            .crew
            .into_iter()
            .filter_map(|c| {
                let job = c.job?;
                CREW_JOBS.contains(&job.as_str()).then(|| CrewMember {
                    id: c.id,
                    name: c.name,
                    job,
                    department: c.department,
                })
            })
            .collect();
        let imdb_id = self
            .imdb_id
            .or(self.external_ids.imdb_id)
            .filter(|s| !s.is_empty());

        MovieDetail {
            summary: self.summary,
            runtime: self.runtime,
            genres: self.genres,
            cast: self.credits.cast,
            crew,
            imdb_id,
        }
    }
}

/// Strip the api key from a URL before it ends up in an error message.
fn redact(url: &str) -> String {
    match url.split_once("api_key=") {
        Some((head, tail)) => {
            let rest = tail.find('&').map(|i| &tail[i..]).unwrap_or("");
            format!("{head}api_key=***{rest}")
        }
        None => url.to_string(),
    }
}
