use std::collections::HashSet;

/// Static allow-list over sender identities. Messages from anyone else are
/// dropped before staging, with no reply sent.
#[derive(Debug, Clone)]
pub struct AccessFilter {
    allowed: HashSet<String>,
}

impl AccessFilter {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn authorize(&self, sender: &str) -> bool {
        self.allowed.contains(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_is_authorized() {
        let filter = AccessFilter::new(["alice", "bob"]);
        assert!(filter.authorize("alice"));
        assert!(filter.authorize("bob"));
    }

    #[test]
    fn test_non_member_is_rejected() {
        let filter = AccessFilter::new(["alice"]);
        assert!(!filter.authorize("mallory"));
        assert!(!filter.authorize(""));
    }

    #[test]
    fn test_comparison_is_exact() {
        let filter = AccessFilter::new(["Alice"]);
        assert!(!filter.authorize("alice"));
    }
}
