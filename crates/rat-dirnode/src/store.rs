//! In-memory identity registry.

use dashmap::DashMap;
use regex::Regex;
use thiserror::Error;

use rat_core::Identity;
use rat_crypto::VerifyingKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Identities keyed by verifying key. Last write wins.
#[derive(Default)]
pub struct Registry {
    users: DashMap<VerifyingKey, Identity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the identity for its key. Returns the previous one.
    pub fn register(&self, identity: Identity) -> Option<Identity> {
        self.users.insert(identity.verifying_key.clone(), identity)
    }

    /// Every identity whose name matches `pattern` from its first
    /// character. The match need not span the whole name.
    ///
    /// Result order follows the map's iteration order and is not stable.
    pub fn ask(&self, pattern: &str) -> Result<Vec<Identity>, StoreError> {
        let re = Regex::new(pattern)?;
        Ok(self
            .users
            .iter()
            .filter(|entry| matches_at_start(&re, &entry.value().name))
            .map(|entry| entry.value().clone())
            .collect())
    }

    pub fn get(&self, key: &VerifyingKey) -> Option<Identity> {
        self.users.get(key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// `find` returns the leftmost match, so any match at 0 shows up here.
fn matches_at_start(re: &Regex, name: &str) -> bool {
    re.find(name).map_or(false, |m| m.start() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rat_crypto::testing;

    fn user(name: &str, keys: &rat_crypto::KeyPair) -> Identity {
        Identity::new(name, keys.verifying().clone())
    }

    #[test]
    fn test_register_then_ask_by_name() {
        let reg = Registry::new();
        let alice = user("alice", &testing::alice());
        reg.register(alice.clone());
        assert_eq!(reg.ask("alice").unwrap(), vec![alice]);
    }

    #[test]
    fn test_reregistration_replaces() {
        let reg = Registry::new();
        let keys = testing::alice();
        reg.register(user("alice", &keys));
        let previous = reg.register(user("alice2", &keys).with_status("new"));

        assert_eq!(previous.unwrap().name, "alice");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(keys.verifying()).unwrap().name, "alice2");
    }

    #[test]
    fn test_match_is_anchored_at_start_only() {
        let reg = Registry::new();
        reg.register(user("alice", &testing::alice()));
        reg.register(user("malice", &testing::bob()));

        let names: Vec<_> = reg.ask("al").unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["alice"]);
        assert_eq!(reg.ask(".*").unwrap().len(), 2);
        assert_eq!(reg.ask("m.l").unwrap().len(), 1);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let reg = Registry::new();
        reg.register(user("alice", &testing::alice()));
        assert!(reg.ask("bob").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let reg = Registry::new();
        assert!(matches!(reg.ask("(unclosed"), Err(StoreError::InvalidPattern(_))));
    }

    #[test]
    fn test_alternation_with_later_branch_at_start() {
        // Leftmost-first: "b|a" on "ab" finds "a" at 0.
        let reg = Registry::new();
        reg.register(user("ab", &testing::alice()));
        assert_eq!(reg.ask("b|a").unwrap().len(), 1);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_escaped_name_finds_itself(name in "\\PC{1,24}") {
                let reg = Registry::new();
                reg.register(user(&name, &testing::alice()));
                let found = reg.ask(&regex::escape(&name)).unwrap();
                prop_assert_eq!(found.len(), 1);
                prop_assert_eq!(&found[0].name, &name);
            }
        }
    }
}
