//! Memoizing lookup of item states.

use tracing::debug;

use crate::cache::LruCache;
use crate::error::GithubError;
use crate::github::{IssueApi, ItemState};
use crate::pipeline::reference::ItemRef;

/// Number of distinct items remembered per run.
pub const CACHE_CAPACITY: usize = 128;

/// Resolves references to lifecycle states, asking the API at most once per item.
///
/// Kinds without a REST counterpart (`check-suites` and friends) resolve to
/// `None` without a request. Errors are returned as-is and never cached.
pub struct StateResolver<A> {
    api: A,
    cache: LruCache<ItemRef, Option<ItemState>>,
}

impl<A: IssueApi> StateResolver<A> {
    pub fn new(api: A) -> Self {
        Self::with_capacity(api, CACHE_CAPACITY)
    }

    pub fn with_capacity(api: A, capacity: usize) -> Self {
        Self {
            api,
            cache: LruCache::new(capacity),
        }
    }

    pub fn resolve(&mut self, item: &ItemRef) -> Result<Option<ItemState>, GithubError> {
        if let Some(state) = self.cache.get(item) {
            debug!(%item, "State cache hit");
            return Ok(state.clone());
        }

        let state = match item.kind.api_segment() {
            Some(segment) => {
                let raw = self
                    .api
                    .fetch_state(&item.owner, &item.repo, segment, &item.number)?;
                Some(ItemState::from_api(&raw))
            }
            None => {
                debug!(%item, kind = item.kind.as_str(), "Kind has no state, skipping lookup");
                None
            }
        };

        self.cache.insert(item.clone(), state.clone());
        Ok(state)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::pipeline::reference::ItemKind;

    /// Records every call and answers from a fixed table.
    #[derive(Default)]
    struct RecordingApi {
        states: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl RecordingApi {
        fn with(mut self, path: &str, state: &str) -> Self {
            self.states.insert(path.to_string(), state.to_string());
            self
        }
    }

    impl IssueApi for RecordingApi {
        fn fetch_state(
            &self,
            owner: &str,
            repo: &str,
            segment: &str,
            number: &str,
        ) -> Result<String, GithubError> {
            let path = format!("/repos/{owner}/{repo}/{segment}/{number}");
            self.calls.borrow_mut().push(path.clone());
            self.states
                .get(&path)
                .cloned()
                .ok_or(GithubError::Status { status: 404, url: path })
        }
    }

    #[test]
    fn pull_kind_uses_pulls_segment() {
        let api = RecordingApi::default().with("/repos/acme/widgets/pulls/42", "merged");
        let mut resolver = StateResolver::new(api);

        let item = ItemRef::new("acme", "widgets", ItemKind::Pull, "42");
        assert_eq!(resolver.resolve(&item).unwrap(), Some(ItemState::Merged));
        assert_eq!(*resolver.api().calls.borrow(), ["/repos/acme/widgets/pulls/42"]);
    }

    #[test]
    fn repeated_lookups_call_api_once() {
        let api = RecordingApi::default().with("/repos/acme/widgets/issues/7", "closed");
        let mut resolver = StateResolver::new(api);
        let item = ItemRef::new("acme", "widgets", ItemKind::Issues, "7");

        let first = resolver.resolve(&item).unwrap();
        let second = resolver.resolve(&item).unwrap();
        let third = resolver.resolve(&item.clone()).unwrap();

        assert_eq!(first, Some(ItemState::Closed));
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(resolver.api().calls.borrow().len(), 1);
    }

    #[test]
    fn unsupported_kind_makes_no_call() {
        let mut resolver = StateResolver::new(RecordingApi::default());
        let item = ItemRef::new("acme", "widgets", ItemKind::Other("check-suites".into()), "7");

        assert_eq!(resolver.resolve(&item).unwrap(), None);
        assert!(resolver.api().calls.borrow().is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let mut resolver = StateResolver::new(RecordingApi::default());
        let item = ItemRef::new("acme", "widgets", ItemKind::Issues, "404");

        assert!(resolver.resolve(&item).is_err());
        assert!(resolver.resolve(&item).is_err());
        assert_eq!(resolver.api().calls.borrow().len(), 2);
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn evicted_items_are_fetched_again() {
        let api = RecordingApi::default()
            .with("/repos/o/r/issues/1", "open")
            .with("/repos/o/r/issues/2", "open")
            .with("/repos/o/r/issues/3", "open");
        let mut resolver = StateResolver::with_capacity(api, 2);
        let one = ItemRef::new("o", "r", ItemKind::Issues, "1");
        let two = ItemRef::new("o", "r", ItemKind::Issues, "2");
        let three = ItemRef::new("o", "r", ItemKind::Issues, "3");

        resolver.resolve(&one).unwrap();
        resolver.resolve(&two).unwrap();
        resolver.resolve(&three).unwrap();
        resolver.resolve(&one).unwrap();

        assert_eq!(resolver.api().calls.borrow().len(), 4);
        assert_eq!(resolver.cached_len(), 2);
    }

    #[test]
    fn default_capacity_is_128() {
        let mut resolver = StateResolver::new(RecordingApi::default());
        for n in 0..200 {
            let item = ItemRef::new("o", "r", ItemKind::Other("x".into()), &n.to_string());
            resolver.resolve(&item).unwrap();
        }
        assert_eq!(resolver.cached_len(), CACHE_CAPACITY);
    }
}
