// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Concurrent package search across repositories and snapshots.

The search engine fans the Cartesian product of stores and queries out over
a bounded worker pool. One store failing does not abort the sweep: errors
are aggregated next to the partial results so callers can render both.
*/

use {
    crate::{
        cancel::CancelToken,
        client::{Repo, Snapshot},
        error::{AptlyError, Result},
        package::Package,
    },
    async_trait::async_trait,
    futures::StreamExt,
    log::{debug, warn},
    regex::Regex,
};

/// A unit of search: a local repository or a snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Store {
    Repo(Repo),
    Snapshot(Snapshot),
}

impl Store {
    /// The server-side name of the store.
    pub fn name(&self) -> &str {
        match self {
            Self::Repo(repo) => &repo.name,
            Self::Snapshot(snapshot) => &snapshot.name,
        }
    }

    /// Human-readable store kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Repo(_) => "repo",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

/// The store operations the search engine needs.
///
/// [crate::client::Client] implements this against a live server; tests
/// substitute fakes.
#[async_trait]
pub trait StoreSearch {
    /// List every store on the server, repositories first.
    async fn list_stores(&self) -> Result<Vec<Store>>;

    /// Search one store with an optional package query.
    async fn search_store(
        &self,
        store: &Store,
        query: Option<&str>,
        with_deps: bool,
        details: bool,
    ) -> Result<Vec<Package>>;
}

/// Parameters of a concurrent search.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub with_deps: bool,
    pub details: bool,
    /// Upper bound on concurrently executing store queries.
    pub max_workers: usize,
    /// Only search stores whose name matches.
    pub store_filter: Option<Regex>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            with_deps: false,
            details: false,
            max_workers: 5,
            store_filter: None,
        }
    }
}

/// Result of a concurrent search: per-store hits plus aggregated failures.
pub type SearchResults = (Vec<(Store, Vec<Package>)>, Vec<AptlyError>);

/// Search all stores for all queries concurrently.
///
/// An empty query list searches everything (one empty query). Only stores
/// with at least one hit appear in the result list; a package matched by two
/// queries in the same store appears once per query. Result ordering is
/// unspecified.
///
/// Cancellation returns what has been collected so far plus a
/// [AptlyError::Cancelled] entry in the error list; in-flight requests are
/// aborted.
pub async fn search<S: StoreSearch + Sync>(
    searcher: &S,
    queries: &[String],
    options: &SearchOptions,
    cancel: &CancelToken,
) -> Result<SearchResults> {
    let mut stores = searcher.list_stores().await?;
    if let Some(filter) = &options.store_filter {
        stores.retain(|store| filter.is_match(store.name()));
    }

    let queries = if queries.is_empty() {
        vec![String::new()]
    } else {
        queries.to_vec()
    };

    let mut tasks = vec![];
    for store in stores {
        for query in &queries {
            tasks.push((store.clone(), query.clone()));
        }
    }
    debug!("dispatching {} search tasks", tasks.len());

    let mut stream = futures::stream::iter(tasks.into_iter().map(|(store, query)| {
        let cancel = cancel.clone();
        async move {
            if cancel.is_cancelled() {
                return (store, Err(AptlyError::Cancelled));
            }

            let query = if query.is_empty() {
                None
            } else {
                Some(query.as_str())
            };
            let result = searcher
                .search_store(&store, query, options.with_deps, options.details)
                .await;

            (store, result)
        }
    }))
    .buffer_unordered(options.max_workers.max(1));

    let mut results = vec![];
    let mut errors = vec![];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                warn!("search cancelled; returning partial results");
                errors.push(AptlyError::Cancelled);
                break;
            }

            item = stream.next() => match item {
                Some((store, Ok(packages))) => {
                    if !packages.is_empty() {
                        results.push((store, packages));
                    }
                }
                // Tasks skipped due to cancellation; the cancel branch
                // records the condition once.
                Some((_, Err(AptlyError::Cancelled))) => {}
                Some((store, Err(e))) => {
                    warn!("search in {} {} failed: {}", store.kind(), store.name(), e);
                    errors.push(e);
                }
                None => break,
            }
        }
    }

    Ok((results, errors))
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{cancel::cancel_pair, error::ApiError},
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    struct FakeStoreSearch {
        stores: Vec<Store>,
        fail_stores: Vec<String>,
        empty_stores: Vec<String>,
        requests: AtomicUsize,
        block_on_cancel: Option<CancelToken>,
    }

    impl FakeStoreSearch {
        fn new(repos: &[&str], snapshots: &[&str]) -> Self {
            Self {
                stores: repos
                    .iter()
                    .map(|name| {
                        Store::Repo(Repo {
                            name: name.to_string(),
                            ..Default::default()
                        })
                    })
                    .chain(snapshots.iter().map(|name| {
                        Store::Snapshot(Snapshot {
                            name: name.to_string(),
                            ..Default::default()
                        })
                    }))
                    .collect(),
                fail_stores: vec![],
                empty_stores: vec![],
                requests: AtomicUsize::new(0),
                block_on_cancel: None,
            }
        }
    }

    #[async_trait]
    impl StoreSearch for FakeStoreSearch {
        async fn list_stores(&self) -> Result<Vec<Store>> {
            Ok(self.stores.clone())
        }

        async fn search_store(
            &self,
            store: &Store,
            _query: Option<&str>,
            _with_deps: bool,
            _details: bool,
        ) -> Result<Vec<Package>> {
            self.requests.fetch_add(1, Ordering::SeqCst);

            if let Some(cancel) = &self.block_on_cancel {
                cancel.cancelled().await;
                return Err(AptlyError::Cancelled);
            }

            if self.fail_stores.contains(&store.name().to_string()) {
                return Err(AptlyError::Api(ApiError::new(
                    500,
                    br#"{"error": "internal server error"}"#,
                )));
            }

            if self.empty_stores.contains(&store.name().to_string()) {
                return Ok(vec![]);
            }

            // Results are not deduplicated across queries, so one hit per
            // task is enough to count output entries.
            Ok(vec![Package::from_key("Pamd64 aptly 1.0 f2b5bf57981bb3d9")?])
        }
    }

    #[tokio::test]
    async fn cartesian_dispatch_and_aggregation() {
        let searcher = FakeStoreSearch::new(&["r1", "r2", "r3"], &["s1"]);
        let queries = vec!["python3.6".to_string(), "Name (% python3*)".to_string()];

        let (results, errors) = search(
            &searcher,
            &queries,
            &SearchOptions::default(),
            &CancelToken::never(),
        )
        .await
        .unwrap();

        // 4 stores x 2 queries.
        assert_eq!(searcher.requests.load(Ordering::SeqCst), 8);
        assert_eq!(results.len(), 8);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn empty_stores_are_omitted() {
        let mut searcher = FakeStoreSearch::new(&["full", "empty"], &[]);
        searcher.empty_stores = vec!["empty".to_string()];

        let (results, errors) = search(
            &searcher,
            &[String::new()],
            &SearchOptions::default(),
            &CancelToken::never(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.name(), "full");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn failures_do_not_abort_other_stores() {
        let mut searcher = FakeStoreSearch::new(&["good", "bad"], &[]);
        searcher.fail_stores = vec!["bad".to_string()];

        let (results, errors) = search(
            &searcher,
            &[String::new()],
            &SearchOptions::default(),
            &CancelToken::never(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.name(), "good");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], AptlyError::Api(api) if api.is_server_error()));
    }

    #[tokio::test]
    async fn store_filter_limits_dispatch() {
        let searcher = FakeStoreSearch::new(&["stretch_main", "buster_main"], &["stretch-snap"]);

        let options = SearchOptions {
            store_filter: Some(Regex::new("^stretch").unwrap()),
            ..Default::default()
        };
        let (results, _) = search(
            &searcher,
            &[String::new()],
            &options,
            &CancelToken::never(),
        )
        .await
        .unwrap();

        assert_eq!(searcher.requests.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_returns_partials() {
        let (handle, token) = cancel_pair();
        let mut searcher = FakeStoreSearch::new(&["r1", "r2"], &[]);
        // Workers hang until cancellation fires.
        searcher.block_on_cancel = Some(token.clone());

        let query = [String::new()];
        let options = SearchOptions::default();
        let search_fut = search(&searcher, &query, &options, &token);
        tokio::pin!(search_fut);

        // Give the workers a chance to dispatch, then cancel.
        tokio::select! {
            _ = &mut search_fut => panic!("search should still be running"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => handle.cancel(),
        }

        let (results, errors) = search_fut.await.unwrap();
        assert!(results.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], AptlyError::Cancelled));
    }
}
