//! Query the movie catalog and print what the app would see.
//! Usage:
//!   cargo run --bin catalog_probe -- popular
//!   cargo run --bin catalog_probe -- search <title>
//!   cargo run --bin catalog_probe -- discover <genre_id> [sort]
//!   cargo run --bin catalog_probe -- detail <tmdb_id>
//!   cargo run --bin catalog_probe -- genres
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use reelbox::config::Config;
use reelbox::discovery::{CatalogQuery, DiscoveryInput};
use reelbox::models::{MovieSummary, SortKey};
use reelbox::present::{self, DetailDisplay};
use reelbox::tmdb::{CatalogApi, TmdbClient};
use serde_json::json;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Popular,
    Search,
    Discover,
    Detail,
    Genres,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(Command::Popular),
            "search" => Ok(Command::Search),
            "discover" => Ok(Command::Discover),
            "detail" => Ok(Command::Detail),
            "genres" => Ok(Command::Genres),
            _ => Err(anyhow::anyhow!(
                "command must be one of popular, search, discover, detail, genres"
            )),
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin catalog_probe -- popular");
    eprintln!("       cargo run --bin catalog_probe -- search <title>");
    eprintln!("       cargo run --bin catalog_probe -- discover <genre_id> [sort]");
    eprintln!("       cargo run --bin catalog_probe -- detail <tmdb_id>");
    eprintln!("       cargo run --bin catalog_probe -- genres");
    std::process::exit(1);
}

fn card(movie: &MovieSummary) -> serde_json::Value {
    json!({
        "id": movie.id,
        "title": movie.title,
        "year": present::release_year(movie.release_date.as_deref()),
        "rating": present::rating(movie.vote_average),
        "poster": present::poster_url(movie.poster_path.as_deref()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let command = Command::from_str(&args[1])?;
    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;

    let input = match command {
        Command::Popular => Some(DiscoveryInput::default()),
        Command::Search => {
            let query = args[2..].join(" ");
            if query.trim().is_empty() {
                usage();
            }
            Some(DiscoveryInput {
                query,
                ..DiscoveryInput::default()
            })
        }
        Command::Discover => {
            let genre: i32 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing genre id"))?
                .parse()
                .context("genre id must be an integer")?;
            let sort = match args.get(3) {
                Some(raw) => raw.parse::<SortKey>()?,
                None => SortKey::default(),
            };
            Some(DiscoveryInput {
                query: String::new(),
                genre: Some(genre),
                sort,
            })
        }
        Command::Detail | Command::Genres => None,
    };

    let output = match (command, input) {
        (_, Some(input)) => {
            let query = CatalogQuery::select(&input);
            let movies = query.run(&client).await?;
            json!({
                "query": query,
                "count": movies.len(),
                "results": movies.iter().map(card).collect::<Vec<_>>(),
            })
        }
        (Command::Detail, None) => {
            let id: i32 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing tmdb id"))?
                .parse()
                .context("tmdb_id must be an integer")?;
            let detail = client.fetch_detail(id).await?;
            json!({
                "id": detail.id(),
                "display": DetailDisplay::from_detail(&detail),
                "overview": detail.summary.overview,
            })
        }
        (_, None) => {
            let genres = client.fetch_genres().await?;
            json!(genres)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
