//! Display strings for movie cards and the detail page.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{CastMember, CrewMember, MovieDetail};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const NOT_AVAILABLE: &str = "N/A";
const TOP_CAST: usize = 10;
const MAX_WRITERS: usize = 3;

pub fn release_year(release_date: Option<&str>) -> String {
    release_date
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .map(|d| d.year().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn runtime(minutes: Option<u32>) -> String {
    match minutes {
        Some(m) if m > 0 => format!("{}h {}m", m / 60, m % 60),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn rating(vote_average: Option<f64>) -> String {
    match vote_average {
        Some(v) if v > 0.0 => format!("{:.1}", v),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn poster_url(path: Option<&str>) -> Option<String> {
    image_url("w500", path)
}

pub fn backdrop_url(path: Option<&str>) -> Option<String> {
    image_url("w1280", path)
}

pub fn profile_url(path: Option<&str>) -> Option<String> {
    image_url("w185", path)
}

pub fn imdb_url(imdb_id: Option<&str>) -> Option<String> {
    imdb_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("https://www.imdb.com/title/{id}"))
}

fn image_url(size: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{IMAGE_BASE}/{size}{p}"))
}

pub fn top_cast(detail: &MovieDetail) -> &[CastMember] {
    &detail.cast[..detail.cast.len().min(TOP_CAST)]
}

/// Directors first, then up to three writers.
pub fn credited_crew(detail: &MovieDetail) -> Vec<&CrewMember> {
    let directors = detail.crew.iter().filter(|c| c.job == "Director");
    let writers = detail
        .crew
        .iter()
        .filter(|c| c.job == "Writer")
        .take(MAX_WRITERS);
    directors.chain(writers).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditLine {
    pub role: String,
    pub name: String,
    pub image_url: Option<String>,
}

/// Pre-formatted fields for the movie page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailDisplay {
    pub title: String,
    pub year: String,
    pub runtime: String,
    pub rating: String,
    pub genres: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub imdb_url: Option<String>,
    pub crew: Vec<CreditLine>,
    pub cast: Vec<CreditLine>,
}

impl DetailDisplay {
    pub fn from_detail(detail: &MovieDetail) -> Self {
        let summary = &detail.summary;
        Self {
            title: summary.title.clone(),
            year: release_year(summary.release_date.as_deref()),
            runtime: runtime(detail.runtime),
            rating: rating(summary.vote_average),
            genres: detail
                .genres
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            poster_url: poster_url(summary.poster_path.as_deref()),
            backdrop_url: backdrop_url(summary.backdrop_path.as_deref()),
            imdb_url: imdb_url(detail.imdb_id.as_deref()),
            crew: credited_crew(detail)
                .into_iter()
                .map(|c| CreditLine {
                    role: c.job.clone(),
                    name: c.name.clone(),
                    image_url: None,
                })
                .collect(),
            cast: top_cast(detail)
                .iter()
                .map(|c| CreditLine {
                    role: c.character.clone().unwrap_or_default(),
                    name: c.name.clone(),
                    image_url: profile_url(c.profile_path.as_deref()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieSummary;

    #[test]
    fn formats_year_runtime_rating() {
        assert_eq!(release_year(Some("1999-03-30")), "1999");
        assert_eq!(release_year(Some("")), "N/A");
        assert_eq!(release_year(Some("soon")), "N/A");
        assert_eq!(release_year(None), "N/A");

        assert_eq!(runtime(Some(136)), "2h 16m");
        assert_eq!(runtime(Some(45)), "0h 45m");
        assert_eq!(runtime(Some(0)), "N/A");

        assert_eq!(rating(Some(8.216)), "8.2");
        assert_eq!(rating(Some(0.0)), "N/A");
        assert_eq!(rating(None), "N/A");
    }

    #[test]
    fn builds_image_urls() {
        assert_eq!(
            poster_url(Some("/p.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/p.jpg")
        );
        assert_eq!(
            backdrop_url(Some("/b.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w1280/b.jpg")
        );
        assert_eq!(
            profile_url(Some("/c.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w185/c.jpg")
        );
        assert_eq!(poster_url(Some("")), None);
        assert_eq!(
            imdb_url(Some("tt0133093")).as_deref(),
            Some("https://www.imdb.com/title/tt0133093")
        );
    }

    #[test]
    fn selects_cast_and_crew() {
        let crew = |id: i32, job: &str| CrewMember {
            id,
            name: format!("Person {id}"),
            job: job.to_string(),
            department: None,
        };
        let detail = MovieDetail {
            summary: MovieSummary::new(1, "Ensemble"),
            runtime: None,
            genres: vec![],
            cast: (0..14)
                .map(|id| CastMember {
                    id,
                    name: format!("Actor {id}"),
                    character: None,
                    profile_path: None,
                })
                .collect(),
            crew: vec![
                crew(1, "Writer"),
                crew(2, "Producer"),
                crew(3, "Director"),
                crew(4, "Writer"),
                crew(5, "Writer"),
                crew(6, "Writer"),
            ],
            imdb_id: None,
        };
        assert_eq!(top_cast(&detail).len(), 10);
        assert_eq!(top_cast(&detail)[0].id, 0);
        let ids: Vec<i32> = credited_crew(&detail).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 1, 4, 5]);

        let display = DetailDisplay::from_detail(&detail);
        assert_eq!(display.year, "N/A");
        assert_eq!(display.cast.len(), 10);
        assert_eq!(
            display.crew[0],
            CreditLine {
                role: "Director".to_string(),
                name: "Person 3".to_string(),
                image_url: None,
            }
        );
    }
}
