//! The user's favorite movies: an ordered list, persisted on every change.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::expiring::Expiring;
use crate::models::{MovieId, MovieSummary};

mod blob;
mod storage;

pub use blob::{BLOB_VERSION, FAVORITES_KEY};
pub use storage::{FavoritesStorage, FileStorage, MemoryStorage};

/// A favorited movie, stored exactly as it was on hand when added.
pub type FavoriteEntry = MovieSummary;

const NOTIFICATION_SECS: i64 = 2;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesEvent {
    Added { id: MovieId, title: String },
    Removed { id: MovieId, title: String },
}

pub struct FavoritesStore {
    storage: Box<dyn FavoritesStorage>,
    entries: Vec<FavoriteEntry>,
    notification: Option<Expiring<Notification>>,
    events: broadcast::Sender<FavoritesEvent>,
}

impl FavoritesStore {
    /// Loads the persisted list. Missing or unreadable data yields an empty store.
    pub fn initialize(storage: Box<dyn FavoritesStorage>) -> Self {
        let entries = match storage.read(FAVORITES_KEY) {
            Ok(Some(raw)) => match blob::decode(&raw) {
                Ok(entries) => dedupe(entries),
                Err(e) => {
                    warn!("Ignoring unreadable favorites data: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites, starting empty: {:#}", e);
                Vec::new()
            }
        };
        info!("Loaded {} favorites", entries.len());

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            entries,
            notification: None,
            events,
        }
    }

    /// Adds `movie` unless its id is already present. Returns whether it was added.
    pub fn add(&mut self, movie: MovieSummary) -> bool {
        self.add_at(movie, Utc::now())
    }

    pub fn add_at(&mut self, movie: MovieSummary, now: DateTime<Utc>) -> bool {
        if self.is_favorite(movie.id) {
            debug!("Movie {} is already a favorite", movie.id);
            return false;
        }
        let id = movie.id;
        let title = movie.title.clone();
        self.entries.push(movie);
        self.persist(now);
        self.notify(NotificationKind::Added, Some(title.clone()), now);
        let _ = self.events.send(FavoritesEvent::Added { id, title });
        true
    }

    /// Removes the entry for `movie_id`, if any.
    pub fn remove(&mut self, movie_id: MovieId) -> Option<FavoriteEntry> {
        self.remove_at(movie_id, Utc::now())
    }

    pub fn remove_at(&mut self, movie_id: MovieId, now: DateTime<Utc>) -> Option<FavoriteEntry> {
        let removed = self
            .entries
            .iter()
            .position(|m| m.id == movie_id)
            .map(|idx| self.entries.remove(idx));
        self.persist(now);
        self.notify(
            NotificationKind::Removed,
            removed.as_ref().map(|m| m.title.clone()),
            now,
        );
        if let Some(entry) = &removed {
            let _ = self.events.send(FavoritesEvent::Removed {
                id: entry.id,
                title: entry.title.clone(),
            });
        }
        removed
    }

    /// Flips the favorite state of `movie`; returns the new state.
    pub fn toggle(&mut self, movie: MovieSummary) -> bool {
        if self.is_favorite(movie.id) {
            self.remove(movie.id);
            false
        } else {
            self.add(movie)
        }
    }

    pub fn is_favorite(&self, movie_id: MovieId) -> bool {
        self.entries.iter().any(|m| m.id == movie_id)
    }

    /// Favorites in the order they were added.
    pub fn list(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification_at(Utc::now())
    }

    pub fn notification_at(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.notification.as_ref().and_then(|n| n.get(now))
    }

    pub fn notification_deadline(&self) -> Option<DateTime<Utc>> {
        self.notification.as_ref().map(|n| n.expires_at())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FavoritesEvent> {
        self.events.subscribe()
    }

    fn notify(&mut self, kind: NotificationKind, title: Option<String>, now: DateTime<Utc>) {
        self.notification = Some(Expiring::new(
            Notification { kind, title },
            Duration::seconds(NOTIFICATION_SECS),
            now,
        ));
    }

    // Best effort: memory stays authoritative when the write fails.
    fn persist(&self, now: DateTime<Utc>) {
        let result = blob::encode(&self.entries, now)
            .and_then(|raw| self.storage.write(FAVORITES_KEY, &raw));
        if let Err(e) = result {
            warn!("Failed to persist {} favorites: {:#}", self.entries.len(), e);
        }
    }
}

fn dedupe(entries: Vec<FavoriteEntry>) -> Vec<FavoriteEntry> {
    let total = entries.len();
    let mut seen = HashSet::new();
    let unique: Vec<_> = entries.into_iter().filter(|m| seen.insert(m.id)).collect();
    if unique.len() != total {
        warn!(
            "Dropped {} duplicate favorites from stored data",
            total - unique.len()
        );
    }
    unique
}
