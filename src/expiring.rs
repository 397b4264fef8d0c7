use chrono::{DateTime, Duration, Utc};

/// A value that is only visible until its deadline passes.
///
/// Nothing clears it; readers ask for it with the current time and get
/// `None` once it has expired.
#[derive(Debug, Clone, PartialEq)]
pub struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Expiring<T> {
    pub fn new(value: T, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: now + ttl,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn get(&self, now: DateTime<Utc>) -> Option<&T> {
        (!self.is_expired(now)).then_some(&self.value)
    }
}
