// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Publishes and the publish-update orchestrator.

A publish is a signed, materialized view of local repositories or snapshots
at a `(storage, prefix, distribution)` triple. After mutating repositories,
every publish sourced from them has to be updated (and therefore re-signed)
for the change to become visible to apt clients; [update_dependent_publishes]
performs that fan-out.
*/

use {
    crate::error::{AptlyError, Result},
    async_trait::async_trait,
    log::{error, info},
    serde::{Deserialize, Deserializer, Serialize},
    serde_json::{Map, Value},
};

/// What kind of sources a publish is created from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SourceKind {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "snapshot")]
    Snapshot,
}

impl Default for SourceKind {
    fn default() -> Self {
        Self::Local
    }
}

/// One source (repo or snapshot) referenced by a publish.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl Source {
    pub fn new(name: impl ToString, component: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            component,
        }
    }
}

/// Deserialize aptly's `"yes"`-string-or-bool flags into a bool.
fn yes_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s == "yes",
        _ => false,
    })
}

/// A publish in aptly.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Publish {
    pub source_kind: SourceKind,
    pub sources: Vec<Source>,
    pub storage: String,
    pub prefix: String,
    pub distribution: String,
    pub architectures: Vec<String>,
    pub label: String,
    pub origin: String,
    #[serde(deserialize_with = "yes_bool")]
    pub not_automatic: bool,
    #[serde(deserialize_with = "yes_bool")]
    pub but_automatic_upgrades: bool,
    pub acquire_by_hash: bool,
}

impl Publish {
    /// The `storage:prefix` form identifying this publish, with an empty
    /// prefix rendered as `.`.
    pub fn full_prefix(&self) -> String {
        let prefix = if self.prefix.is_empty() {
            "."
        } else {
            self.prefix.as_str()
        };

        if self.storage.is_empty() {
            prefix.to_string()
        } else {
            format!("{}:{}", self.storage, prefix)
        }
    }

    /// The prefix form used in publish URL paths.
    ///
    /// `.` becomes `:.`; otherwise `_` doubles and `/` becomes `_` so the
    /// prefix fits in a single path segment.
    pub fn full_prefix_escaped(&self) -> String {
        escape_prefix(&self.full_prefix())
    }

    pub(crate) fn sources_json(&self) -> Value {
        serde_json::to_value(&self.sources).expect("sources serialize to JSON")
    }

    /// The request body fields for creating this publish.
    pub(crate) fn api_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(
            "SourceKind".to_string(),
            serde_json::to_value(self.source_kind).expect("source kind serializes"),
        );
        params.insert("Sources".to_string(), self.sources_json());

        if !self.distribution.is_empty() {
            params.insert(
                "Distribution".to_string(),
                Value::String(self.distribution.clone()),
            );
        }
        if !self.architectures.is_empty() {
            params.insert(
                "Architectures".to_string(),
                serde_json::to_value(&self.architectures).expect("architectures serialize"),
            );
        }
        if !self.label.is_empty() {
            params.insert("Label".to_string(), Value::String(self.label.clone()));
        }
        if !self.origin.is_empty() {
            params.insert("Origin".to_string(), Value::String(self.origin.clone()));
        }
        // Debian convention encodes these as the string "yes", not JSON true.
        if self.not_automatic {
            params.insert("NotAutomatic".to_string(), Value::String("yes".to_string()));
        }
        if self.but_automatic_upgrades {
            params.insert(
                "ButAutomaticUpgrades".to_string(),
                Value::String("yes".to_string()),
            );
        }
        if self.acquire_by_hash {
            params.insert("AcquireByHash".to_string(), Value::Bool(true));
        }

        params
    }
}

/// Escape a full prefix for use as a publish URL path segment.
pub fn escape_prefix(full_prefix: &str) -> String {
    if full_prefix == "." {
        ":.".to_string()
    } else {
        full_prefix.replace('_', "__").replace('/', "_")
    }
}

/// The publish operations needed by the orchestrator.
///
/// [crate::client::Client] implements this against a live server; tests
/// substitute fakes.
#[async_trait]
pub trait PublishOps {
    async fn publish_list(&self) -> Result<Vec<Publish>>;

    async fn publish_update(&self, publish: &Publish, force_overwrite: bool) -> Result<Publish>;
}

/// Select the publishes whose local-repo sources intersect `changed`.
pub fn dependent_publishes<'a>(publishes: &'a [Publish], changed: &[String]) -> Vec<&'a Publish> {
    publishes
        .iter()
        .filter(|publish| {
            publish.source_kind == SourceKind::Local
                && publish
                    .sources
                    .iter()
                    .any(|source| changed.contains(&source.name))
        })
        .collect()
}

/// Update every publish that sources any of the changed local repos.
///
/// Per-publish failures are collected rather than short-circuiting so that
/// unaffected publishes still get repaired. The caller decides how to react
/// to a non-empty error list.
pub async fn update_dependent_publishes<P: PublishOps + Sync>(
    ops: &P,
    changed: &[String],
    dry_run: bool,
) -> Result<Vec<AptlyError>> {
    let publishes = ops.publish_list().await?;
    let mut errors = vec![];

    for publish in dependent_publishes(&publishes, changed) {
        info!(
            "updating publish {}/{}",
            publish.full_prefix(),
            publish.distribution
        );
        if dry_run {
            continue;
        }

        match ops.publish_update(publish, false).await {
            Ok(_) => info!(
                "updated publish {}/{}",
                publish.full_prefix(),
                publish.distribution
            ),
            Err(e) => {
                error!(
                    "failed to update publish {}/{}: {}",
                    publish.full_prefix(),
                    publish.distribution,
                    e
                );
                errors.push(e);
            }
        }
    }

    Ok(errors)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        serde_json::json,
        std::sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    fn local_publish(distribution: &str, sources: &[&str]) -> Publish {
        Publish {
            source_kind: SourceKind::Local,
            sources: sources
                .iter()
                .map(|name| Source::new(name, Some("main".to_string())))
                .collect(),
            distribution: distribution.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn escape_prefix_rules() {
        assert_eq!(escape_prefix("."), ":.");
        assert_eq!(escape_prefix("a/b"), "a_b");
        assert_eq!(escape_prefix("a_b"), "a__b");
        assert_eq!(escape_prefix("a_b/c"), "a__b_c");
        assert_eq!(escape_prefix("s3:pool/main"), "s3:pool_main");
    }

    #[test]
    fn full_prefix_forms() {
        let mut publish = local_publish("stretch", &["stretch_main"]);
        assert_eq!(publish.full_prefix(), ".");
        assert_eq!(publish.full_prefix_escaped(), ":.");

        publish.prefix = "debian".to_string();
        assert_eq!(publish.full_prefix(), "debian");

        publish.storage = "s3".to_string();
        assert_eq!(publish.full_prefix(), "s3:debian");
    }

    #[test]
    fn api_params_encoding() {
        let publish = Publish {
            source_kind: SourceKind::Snapshot,
            sources: vec![Source::new("snap1", None)],
            distribution: "stretch".to_string(),
            architectures: vec!["amd64".to_string()],
            label: "label".to_string(),
            not_automatic: true,
            acquire_by_hash: true,
            ..Default::default()
        };

        let params = Value::Object(publish.api_params());
        assert_eq!(
            params,
            json!({
                "SourceKind": "snapshot",
                "Sources": [{"Name": "snap1"}],
                "Distribution": "stretch",
                "Architectures": ["amd64"],
                "Label": "label",
                "NotAutomatic": "yes",
                "AcquireByHash": true,
            })
        );
    }

    #[test]
    fn deserializes_server_flag_spellings() {
        let publish: Publish = serde_json::from_value(json!({
            "SourceKind": "local",
            "Sources": [{"Name": "stretch_main", "Component": "main"}],
            "Prefix": ".",
            "Distribution": "stretch",
            "NotAutomatic": "yes",
            "ButAutomaticUpgrades": "",
            "AcquireByHash": true,
        }))
        .unwrap();

        assert!(publish.not_automatic);
        assert!(!publish.but_automatic_upgrades);
        assert!(publish.acquire_by_hash);
        assert_eq!(publish.sources[0].component.as_deref(), Some("main"));
    }

    #[test]
    fn dependent_publish_discovery() {
        let publishes = vec![
            local_publish("stretch", &["a", "b"]),
            local_publish("buster", &["c"]),
            Publish {
                source_kind: SourceKind::Snapshot,
                sources: vec![Source::new("a", None)],
                distribution: "snapshot-dist".to_string(),
                ..Default::default()
            },
        ];

        let changed = vec!["a".to_string()];
        let hits = dependent_publishes(&publishes, &changed);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distribution, "stretch");

        let changed = vec!["b".to_string()];
        assert_eq!(dependent_publishes(&publishes, &changed).len(), 1);

        let changed = vec!["nope".to_string()];
        assert!(dependent_publishes(&publishes, &changed).is_empty());
    }

    struct FakePublishOps {
        publishes: Vec<Publish>,
        fail_distributions: Vec<String>,
        updates: AtomicUsize,
        updated: Mutex<Vec<String>>,
    }

    impl FakePublishOps {
        fn new(publishes: Vec<Publish>, fail_distributions: &[&str]) -> Self {
            Self {
                publishes,
                fail_distributions: fail_distributions.iter().map(|s| s.to_string()).collect(),
                updates: AtomicUsize::new(0),
                updated: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl PublishOps for FakePublishOps {
        async fn publish_list(&self) -> Result<Vec<Publish>> {
            Ok(self.publishes.clone())
        }

        async fn publish_update(
            &self,
            publish: &Publish,
            _force_overwrite: bool,
        ) -> Result<Publish> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_distributions.contains(&publish.distribution) {
                return Err(AptlyError::Api(crate::error::ApiError::new(
                    500,
                    br#"{"error": "publish update failed"}"#,
                )));
            }

            self.updated.lock().unwrap().push(publish.distribution.clone());
            Ok(publish.clone())
        }
    }

    #[tokio::test]
    async fn updates_only_dependents() {
        let ops = FakePublishOps::new(
            vec![
                local_publish("stretch", &["stretch_main"]),
                local_publish("buster", &["buster_main"]),
            ],
            &[],
        );

        let errors = update_dependent_publishes(&ops, &["stretch_main".to_string()], false)
            .await
            .unwrap();

        assert!(errors.is_empty());
        assert_eq!(ops.updates.load(Ordering::SeqCst), 1);
        assert_eq!(*ops.updated.lock().unwrap(), vec!["stretch".to_string()]);
    }

    #[tokio::test]
    async fn aggregates_per_publish_errors() {
        let ops = FakePublishOps::new(
            vec![
                local_publish("stretch", &["repo"]),
                local_publish("buster", &["repo"]),
            ],
            &["stretch"],
        );

        let errors = update_dependent_publishes(&ops, &["repo".to_string()], false)
            .await
            .unwrap();

        // The failure does not prevent the other publish from updating.
        assert_eq!(errors.len(), 1);
        assert_eq!(ops.updates.load(Ordering::SeqCst), 2);
        assert_eq!(*ops.updated.lock().unwrap(), vec!["buster".to_string()]);
    }

    #[tokio::test]
    async fn dry_run_skips_updates() {
        let ops = FakePublishOps::new(vec![local_publish("stretch", &["repo"])], &[]);

        let errors = update_dependent_publishes(&ops, &["repo".to_string()], true)
            .await
            .unwrap();

        assert!(errors.is_empty());
        assert_eq!(ops.updates.load(Ordering::SeqCst), 0);
    }
}
