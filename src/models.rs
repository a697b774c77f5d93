use sqlx::FromRow;

/// A stored paste. Timestamps are epoch milliseconds.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Paste {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub remaining_views: Option<i64>,
}

impl Paste {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |expires_at| now >= expires_at)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_views.map_or(false, |remaining| remaining <= 0)
    }

    /// Whether the paste can be served at `now`.
    pub fn is_available(&self, now: i64) -> bool {
        !self.is_expired(now) && !self.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paste(expires_at: Option<i64>, remaining_views: Option<i64>) -> Paste {
        Paste {
            id: "id".to_owned(),
            content: "hello".to_owned(),
            created_at: 0,
            expires_at,
            remaining_views,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let paste = paste(Some(1_000), None);
        assert!(paste.is_available(999));
        assert!(!paste.is_available(1_000));
        assert!(!paste.is_available(1_001));
    }

    #[test]
    fn unlimited_never_exhausts() {
        assert!(paste(None, None).is_available(i64::MAX));
    }

    #[test]
    fn zero_views_is_unavailable() {
        assert!(!paste(None, Some(0)).is_available(0));
        assert!(paste(None, Some(1)).is_available(0));
    }
}
