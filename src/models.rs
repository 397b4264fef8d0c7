use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub type MovieId = i32;

/// A movie as returned by list endpoints (popular, search, discover).
///
/// Unknown fields are kept in `extra` so a favorited record is stored exactly
/// as it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_ids: Option<Vec<i32>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MovieSummary {
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            release_date: None,
            poster_path: None,
            backdrop_path: None,
            overview: None,
            vote_average: None,
            vote_count: None,
            popularity: None,
            genre_ids: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i32,
    pub name: String,
    pub job: String,
    #[serde(default)]
    pub department: Option<String>,
}

/// Crew jobs kept on a [`MovieDetail`].
pub const CREW_JOBS: [&str; 3] = ["Director", "Writer", "Producer"];

/// Full record for a single movie, fetched on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl MovieDetail {
    pub fn id(&self) -> MovieId {
        self.summary.id
    }

    /// The shape stored when a movie is favorited from its detail page.
    pub fn summary(&self) -> MovieSummary {
        let mut summary = self.summary.clone();
        if summary.genre_ids.as_ref().map_or(true, Vec::is_empty) {
            summary.genre_ids = Some(self.genres.iter().map(|g| g.id).collect());
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "popularity.desc")]
    PopularityDesc,
    #[serde(rename = "popularity.asc")]
    PopularityAsc,
    #[serde(rename = "release_date.desc")]
    ReleaseDateDesc,
    #[serde(rename = "release_date.asc")]
    ReleaseDateAsc,
    #[serde(rename = "vote_average.desc")]
    VoteAverageDesc,
    #[serde(rename = "vote_average.asc")]
    VoteAverageAsc,
    #[serde(rename = "title.asc")]
    TitleAsc,
    #[serde(rename = "title.desc")]
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::PopularityDesc,
        SortKey::PopularityAsc,
        SortKey::ReleaseDateDesc,
        SortKey::ReleaseDateAsc,
        SortKey::VoteAverageDesc,
        SortKey::VoteAverageAsc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
    ];

    /// Value sent as TMDB's `sort_by` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::PopularityDesc => "popularity.desc",
            SortKey::PopularityAsc => "popularity.asc",
            SortKey::ReleaseDateDesc => "release_date.desc",
            SortKey::ReleaseDateAsc => "release_date.asc",
            SortKey::VoteAverageDesc => "vote_average.desc",
            SortKey::VoteAverageAsc => "vote_average.asc",
            SortKey::TitleAsc => "title.asc",
            SortKey::TitleDesc => "title.desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::PopularityDesc => "Most Popular",
            SortKey::PopularityAsc => "Least Popular",
            SortKey::ReleaseDateDesc => "Newest",
            SortKey::ReleaseDateAsc => "Oldest",
            SortKey::VoteAverageDesc => "Highest Rated",
            SortKey::VoteAverageAsc => "Lowest Rated",
            SortKey::TitleAsc => "A-Z",
            SortKey::TitleDesc => "Z-A",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown sort key '{}'", s))
    }
}
