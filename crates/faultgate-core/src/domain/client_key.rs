use std::fmt;

/// Identity used to partition error-tracking state.
///
/// Authenticated requests are keyed by subject so a user keeps one tracker across
/// addresses. Anonymous requests are keyed by source address, which means clients behind
/// the same NAT share a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Resolve the key for a request.
    pub fn resolve(subject: Option<&str>, address: Option<&str>) -> Self {
        if let Some(subject) = subject.filter(|s| !s.is_empty()) {
            return Self(format!("user_{}", subject));
        }

        match address.filter(|a| !a.is_empty()) {
            Some(address) => Self(format!("ip_{}", address)),
            None => Self("ip_unknown".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_wins_over_address() {
        let a = ClientKey::resolve(Some("42"), Some("10.0.0.5"));
        let b = ClientKey::resolve(Some("42"), Some("192.168.1.9"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "user_42");
    }

    #[test]
    fn test_anonymous_keyed_by_address() {
        let a = ClientKey::resolve(None, Some("10.0.0.5"));
        let b = ClientKey::resolve(None, Some("10.0.0.6"));
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "ip_10.0.0.5");
    }

    #[test]
    fn test_empty_subject_falls_back_to_address() {
        assert_eq!(
            ClientKey::resolve(Some(""), Some("::1")).as_str(),
            "ip_::1"
        );
    }

    #[test]
    fn test_unknown_address() {
        assert_eq!(ClientKey::resolve(None, None).as_str(), "ip_unknown");
        assert_eq!(ClientKey::resolve(None, Some("")).as_str(), "ip_unknown");
    }
}
