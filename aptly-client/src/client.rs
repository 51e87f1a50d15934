// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! aptly REST API client.

[Client] is bound to a server base URL and offers typed operations over the
REST surface: upload directories, local repositories, snapshots, packages,
and publishes. All requests funnel through a single entry point which decodes
success responses as JSON and turns everything else into a structured
[crate::error::ApiError].

The client holds no mutable state; one instance (and its connection pool) is
shared by all concurrent workers.
*/

use {
    crate::{
        config::Config,
        error::{ApiError, AptlyError, Result},
        package::Package,
        publish::{Publish, PublishOps, SourceKind},
        search::{Store, StoreSearch},
        signing::SigningResolver,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    log::debug,
    reqwest::{multipart, Method},
    serde::Deserialize,
    serde_json::{json, Map, Value},
    std::{collections::HashMap, path::Path, time::Instant},
    url::Url,
};

const FILES_PATH: &str = "files";
const REPOS_PATH: &str = "repos";
const SNAPSHOTS_PATH: &str = "snapshots";
const PUBLISH_PATH: &str = "publish";
const PACKAGES_PATH: &str = "packages";

/// A local repository in aptly.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Repo {
    pub name: String,
    pub comment: String,
    pub default_distribution: String,
    pub default_component: String,
}

/// A snapshot in aptly.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Snapshot {
    pub name: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Outcome of adding uploaded files to a local repository.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilesReport {
    pub failed: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AddReport {
    #[serde(rename = "Added", default)]
    added: Vec<String>,
    #[serde(rename = "Removed", default)]
    removed: Vec<String>,
    #[serde(rename = "Warnings", default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddResponse {
    #[serde(rename = "Report", default)]
    report: AddReport,
    #[serde(rename = "FailedFiles", default)]
    failed_files: Vec<String>,
}

impl FilesReport {
    /// The server reports additions as `"{dir_ref} added"`; keep the
    /// reference only.
    pub(crate) fn from_wire(response: AddResponse) -> Self {
        Self {
            failed: response.failed_files,
            added: response
                .report
                .added
                .iter()
                .map(|entry| entry.split(' ').next().unwrap_or_default().to_string())
                .collect(),
            removed: response.report.removed,
            warnings: response.report.warnings,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiffLine {
    #[serde(rename = "Left")]
    left: Option<String>,
    #[serde(rename = "Right")]
    right: Option<String>,
}

/// Request payload flavors supported by the request entry point.
///
/// Exactly one flavor applies per call. `Query` requests carry their fields
/// in the URL query string with an empty body.
enum Payload {
    None,
    Json(Value),
    Query(Vec<(&'static str, String)>),
    Multipart(Vec<(String, Vec<u8>)>),
}

/// aptly API client.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    root_url: Url,
    signing: SigningResolver,
}

impl Client {
    /// Construct an instance from a resolved configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let root_url = Url::parse(&config.url)
            .map_err(|e| AptlyError::Config(format!("invalid server URL {}: {}", config.url, e)))?;
        if !matches!(root_url.scheme(), "http" | "https") {
            return Err(AptlyError::Config(format!(
                "server URL must be http or https: {}",
                config.url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            root_url,
            signing: SigningResolver {
                default_config: config.default_signing.clone(),
                config_map: config.signing_map.clone(),
            },
        })
    }

    /// The signing resolver in effect for this client.
    pub fn signing(&self) -> &SigningResolver {
        &self.signing
    }

    /// Build an API URL from path segments.
    ///
    /// Segments are percent-encoded individually, so package keys with
    /// spaces are safe to pass as one segment.
    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.root_url.clone();

        {
            let mut path = url
                .path_segments_mut()
                .expect("http(s) URLs always have path segments");
            path.pop_if_empty();
            path.push("api");
            path.extend(segments);
        }

        url
    }

    /// Perform a request and decode the JSON response.
    ///
    /// Responses with a 2xx status decode as JSON (an empty body decodes as
    /// `null`). Everything else becomes an [ApiError] carrying the parsed
    /// server error list. This layer never retries.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        mut url: Url,
        payload: Payload,
    ) -> Result<T> {
        let builder = match payload {
            Payload::None => {
                debug!("sending {} {}", method, url);
                self.http.request(method.clone(), url.clone())
            }
            Payload::Json(body) => {
                debug!("sending {} {} data: {}", method, url, body);
                self.http.request(method.clone(), url.clone()).json(&body)
            }
            Payload::Query(pairs) => {
                url.query_pairs_mut().extend_pairs(pairs);
                debug!("sending {} {}", method, url);
                self.http.request(method.clone(), url.clone())
            }
            Payload::Multipart(files) => {
                let mut form = multipart::Form::new();
                for (name, data) in files {
                    debug!("sending {} {} file: {} {} bytes", method, url, name, data.len());
                    form = form.part(name.clone(), multipart::Part::bytes(data).file_name(name));
                }
                self.http
                    .request(method.clone(), url.clone())
                    .multipart(form)
            }
        };

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            "response on {} {} took {:?} returned {}: {} bytes",
            method,
            url,
            start.elapsed(),
            status,
            body.len()
        );

        if !status.is_success() {
            return Err(ApiError::new(status.as_u16(), &body).into());
        }

        if body.is_empty() {
            Ok(serde_json::from_slice(b"null")?)
        } else {
            Ok(serde_json::from_slice(&body)?)
        }
    }

    /// Obtain the server version.
    pub async fn version(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct VersionResponse {
            #[serde(rename = "Version")]
            version: String,
        }

        let response: VersionResponse = self
            .request(Method::GET, self.api_url(&["version"]), Payload::None)
            .await?;

        Ok(response.version)
    }

    /// Upload local files into a server-side upload directory.
    ///
    /// Returns the remote paths of the uploaded files. Upload directories
    /// are a shared namespace; callers should use a unique name per
    /// invocation and pair every upload with [Self::files_delete_dir].
    pub async fn files_upload(
        &self,
        files: &[impl AsRef<Path>],
        directory: &str,
    ) -> Result<Vec<String>> {
        let mut parts = vec![];
        for path in files {
            let path = path.as_ref();
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    AptlyError::IoPath(
                        path.display().to_string(),
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
                    )
                })?;
            let data = tokio::fs::read(path)
                .await
                .map_err(|e| AptlyError::IoPath(path.display().to_string(), e))?;
            parts.push((filename, data));
        }

        self.request(
            Method::POST,
            self.api_url(&[FILES_PATH, directory]),
            Payload::Multipart(parts),
        )
        .await
    }

    /// List files in an upload directory.
    pub async fn files_list(&self, directory: &str) -> Result<Vec<String>> {
        self.request(
            Method::GET,
            self.api_url(&[FILES_PATH, directory]),
            Payload::None,
        )
        .await
    }

    /// List upload directories.
    pub async fn files_list_dirs(&self) -> Result<Vec<String>> {
        self.request(Method::GET, self.api_url(&[FILES_PATH]), Payload::None)
            .await
    }

    /// Delete an upload directory and everything in it.
    pub async fn files_delete_dir(&self, directory: &str) -> Result<()> {
        let _: Value = self
            .request(
                Method::DELETE,
                self.api_url(&[FILES_PATH, directory]),
                Payload::None,
            )
            .await?;

        Ok(())
    }

    /// Delete a single file in an upload directory.
    pub async fn files_delete_file(&self, directory: &str, file: &str) -> Result<()> {
        let _: Value = self
            .request(
                Method::DELETE,
                self.api_url(&[FILES_PATH, directory, file]),
                Payload::None,
            )
            .await?;

        Ok(())
    }

    fn repo_body(
        name: Option<&str>,
        comment: &str,
        default_distribution: &str,
        default_component: &str,
    ) -> Value {
        let mut body = Map::new();
        if let Some(name) = name {
            body.insert("Name".to_string(), Value::String(name.to_string()));
        }
        for (key, value) in [
            ("Comment", comment),
            ("DefaultDistribution", default_distribution),
            ("DefaultComponent", default_component),
        ] {
            if !value.is_empty() {
                body.insert(key.to_string(), Value::String(value.to_string()));
            }
        }

        Value::Object(body)
    }

    /// Create a new local repository.
    pub async fn repo_create(
        &self,
        name: &str,
        comment: &str,
        default_distribution: &str,
        default_component: &str,
    ) -> Result<Repo> {
        self.request(
            Method::POST,
            self.api_url(&[REPOS_PATH]),
            Payload::Json(Self::repo_body(
                Some(name),
                comment,
                default_distribution,
                default_component,
            )),
        )
        .await
    }

    /// Show one local repository.
    pub async fn repo_show(&self, name: &str) -> Result<Repo> {
        self.request(
            Method::GET,
            self.api_url(&[REPOS_PATH, name]),
            Payload::None,
        )
        .await
    }

    /// List all local repositories.
    pub async fn repo_list(&self) -> Result<Vec<Repo>> {
        self.request(Method::GET, self.api_url(&[REPOS_PATH]), Payload::None)
            .await
    }

    /// Edit a local repository's metadata. Empty arguments are left as-is.
    pub async fn repo_edit(
        &self,
        name: &str,
        comment: &str,
        default_distribution: &str,
        default_component: &str,
    ) -> Result<Repo> {
        self.request(
            Method::PUT,
            self.api_url(&[REPOS_PATH, name]),
            Payload::Json(Self::repo_body(
                None,
                comment,
                default_distribution,
                default_component,
            )),
        )
        .await
    }

    /// Delete a local repository.
    ///
    /// `force` deletes it even when snapshots point at it.
    pub async fn repo_delete(&self, name: &str, force: bool) -> Result<()> {
        let mut params = vec![];
        if force {
            params.push(("force", "1".to_string()));
        }

        let _: Value = self
            .request(
                Method::DELETE,
                self.api_url(&[REPOS_PATH, name]),
                Payload::Query(params),
            )
            .await?;

        Ok(())
    }

    /// Add previously-uploaded files to a local repository.
    pub async fn repo_add_packages(
        &self,
        name: &str,
        directory: &str,
        file: Option<&str>,
        no_remove: bool,
        force_replace: bool,
    ) -> Result<FilesReport> {
        let url = match file {
            Some(file) => self.api_url(&[REPOS_PATH, name, "file", directory, file]),
            None => self.api_url(&[REPOS_PATH, name, "file", directory]),
        };

        let mut params = vec![];
        if no_remove {
            params.push(("noRemove", "1".to_string()));
        }
        if force_replace {
            params.push(("forceReplace", "1".to_string()));
        }

        let response: AddResponse = self
            .request(Method::POST, url, Payload::Query(params))
            .await?;

        Ok(FilesReport::from_wire(response))
    }

    async fn search(
        &self,
        base: &str,
        name: &str,
        query: Option<&str>,
        with_deps: bool,
        details: bool,
    ) -> Result<Vec<Package>> {
        let mut params = vec![];
        if let Some(query) = query {
            params.push(("q", query.to_string()));
            if with_deps {
                params.push(("withDeps", "1".to_string()));
            }
        }
        if details {
            params.push(("format", "details".to_string()));
        }

        let url = self.api_url(&[base, name, "packages"]);

        if details {
            let response: Vec<HashMap<String, String>> = self
                .request(Method::GET, url, Payload::Query(params))
                .await?;
            response.into_iter().map(Package::from_api_response).collect()
        } else {
            let response: Vec<String> = self
                .request(Method::GET, url, Payload::Query(params))
                .await?;
            response.iter().map(|key| Package::from_key(key)).collect()
        }
    }

    /// Search packages in a local repository.
    pub async fn repo_search(
        &self,
        name: &str,
        query: Option<&str>,
        with_deps: bool,
        details: bool,
    ) -> Result<Vec<Package>> {
        self.search(REPOS_PATH, name, query, with_deps, details)
            .await
    }

    /// Search packages in a snapshot.
    pub async fn snapshot_search(
        &self,
        name: &str,
        query: Option<&str>,
        with_deps: bool,
        details: bool,
    ) -> Result<Vec<Package>> {
        self.search(SNAPSHOTS_PATH, name, query, with_deps, details)
            .await
    }

    async fn repo_change_by_key(&self, method: Method, name: &str, keys: &[String]) -> Result<Repo> {
        self.request(
            method,
            self.api_url(&[REPOS_PATH, name, "packages"]),
            Payload::Json(json!({ "PackageRefs": keys })),
        )
        .await
    }

    /// Add packages already in the pool to a local repository by key.
    pub async fn repo_add_packages_by_key(&self, name: &str, keys: &[String]) -> Result<Repo> {
        self.repo_change_by_key(Method::POST, name, keys).await
    }

    /// Remove packages from a local repository by key.
    pub async fn repo_delete_packages_by_key(&self, name: &str, keys: &[String]) -> Result<Repo> {
        self.repo_change_by_key(Method::DELETE, name, keys).await
    }

    /// Snapshot the current contents of a local repository.
    pub async fn snapshot_create_from_repo(
        &self,
        repo_name: &str,
        snapshot_name: &str,
        description: Option<&str>,
    ) -> Result<Snapshot> {
        let mut body = Map::new();
        body.insert("Name".to_string(), Value::String(snapshot_name.to_string()));
        if let Some(description) = description {
            body.insert(
                "Description".to_string(),
                Value::String(description.to_string()),
            );
        }

        self.request(
            Method::POST,
            self.api_url(&[REPOS_PATH, repo_name, "snapshots"]),
            Payload::Json(Value::Object(body)),
        )
        .await
    }

    /// Create a snapshot from an explicit list of package keys.
    pub async fn snapshot_create_from_package_keys(
        &self,
        name: &str,
        keys: &[String],
        source_snapshots: &[String],
        description: Option<&str>,
    ) -> Result<Snapshot> {
        let mut body = Map::new();
        body.insert("Name".to_string(), Value::String(name.to_string()));
        body.insert(
            "PackageRefs".to_string(),
            serde_json::to_value(keys).expect("keys serialize"),
        );
        if let Some(description) = description {
            body.insert(
                "Description".to_string(),
                Value::String(description.to_string()),
            );
        }
        if !source_snapshots.is_empty() {
            body.insert(
                "SourceSnapshots".to_string(),
                serde_json::to_value(source_snapshots).expect("snapshot names serialize"),
            );
        }

        self.request(
            Method::POST,
            self.api_url(&[SNAPSHOTS_PATH]),
            Payload::Json(Value::Object(body)),
        )
        .await
    }

    /// Show one snapshot.
    pub async fn snapshot_show(&self, name: &str) -> Result<Snapshot> {
        self.request(
            Method::GET,
            self.api_url(&[SNAPSHOTS_PATH, name]),
            Payload::None,
        )
        .await
    }

    /// List all snapshots.
    pub async fn snapshot_list(&self) -> Result<Vec<Snapshot>> {
        self.request(Method::GET, self.api_url(&[SNAPSHOTS_PATH]), Payload::None)
            .await
    }

    /// Rename a snapshot and/or replace its description.
    pub async fn snapshot_edit(
        &self,
        name: &str,
        new_name: Option<&str>,
        new_description: Option<&str>,
    ) -> Result<Snapshot> {
        let mut body = Map::new();
        if let Some(new_name) = new_name {
            body.insert("Name".to_string(), Value::String(new_name.to_string()));
        }
        if let Some(new_description) = new_description {
            body.insert(
                "Description".to_string(),
                Value::String(new_description.to_string()),
            );
        }

        self.request(
            Method::PUT,
            self.api_url(&[SNAPSHOTS_PATH, name]),
            Payload::Json(Value::Object(body)),
        )
        .await
    }

    /// Delete a snapshot.
    ///
    /// `force` deletes it even when other snapshots or publishes point at it.
    pub async fn snapshot_delete(&self, name: &str, force: bool) -> Result<()> {
        let mut params = vec![];
        if force {
            params.push(("force", "1".to_string()));
        }

        let _: Value = self
            .request(
                Method::DELETE,
                self.api_url(&[SNAPSHOTS_PATH, name]),
                Payload::Query(params),
            )
            .await?;

        Ok(())
    }

    /// Diff two snapshots as `(left, right)` package pairs.
    ///
    /// One side is `None` for packages only present in the other snapshot.
    pub async fn snapshot_diff(
        &self,
        snapshot1: &str,
        snapshot2: &str,
    ) -> Result<Vec<(Option<Package>, Option<Package>)>> {
        let lines: Vec<DiffLine> = self
            .request(
                Method::GET,
                self.api_url(&[SNAPSHOTS_PATH, snapshot1, "diff", snapshot2]),
                Payload::None,
            )
            .await?;

        lines
            .into_iter()
            .map(|line| {
                let left = line.left.as_deref().map(Package::from_key).transpose()?;
                let right = line.right.as_deref().map(Package::from_key).transpose()?;
                Ok((left, right))
            })
            .collect()
    }

    /// Create a publish.
    ///
    /// The signing configuration is resolved from the publish's full prefix
    /// and distribution and embedded in the request body.
    pub async fn publish_create(
        &self,
        publish: &Publish,
        force_overwrite: bool,
        skip_cleanup: bool,
    ) -> Result<Publish> {
        let mut body = publish.api_params();
        body.insert(
            "Signing".to_string(),
            self.signing
                .resolve(&publish.full_prefix(), &publish.distribution)
                .to_api_params(),
        );
        if force_overwrite {
            body.insert("ForceOverwrite".to_string(), Value::Bool(true));
        }
        if skip_cleanup {
            body.insert("SkipCleanup".to_string(), Value::Bool(true));
        }

        let url = if publish.full_prefix() == "." {
            self.api_url(&[PUBLISH_PATH])
        } else {
            self.api_url(&[PUBLISH_PATH, &publish.full_prefix_escaped()])
        };

        self.request(Method::POST, url, Payload::Json(Value::Object(body)))
            .await
    }

    /// Drop a publish.
    pub async fn publish_drop(
        &self,
        storage: &str,
        prefix: &str,
        distribution: &str,
        force: bool,
    ) -> Result<()> {
        let publish = Publish {
            storage: storage.to_string(),
            prefix: prefix.to_string(),
            distribution: distribution.to_string(),
            ..Default::default()
        };

        let mut params = vec![];
        if force {
            params.push(("force", "1".to_string()));
        }

        let _: Value = self
            .request(
                Method::DELETE,
                self.api_url(&[
                    PUBLISH_PATH,
                    &publish.full_prefix_escaped(),
                    &publish.distribution,
                ]),
                Payload::Query(params),
            )
            .await?;

        Ok(())
    }

    /// Show one package by its key.
    pub async fn package_show(&self, key: &str) -> Result<Package> {
        let fields: HashMap<String, String> = self
            .request(
                Method::GET,
                self.api_url(&[PACKAGES_PATH, key]),
                Payload::None,
            )
            .await?;

        Package::from_api_response(fields)
    }
}

#[async_trait]
impl PublishOps for Client {
    /// List all publishes.
    async fn publish_list(&self) -> Result<Vec<Publish>> {
        self.request(Method::GET, self.api_url(&[PUBLISH_PATH]), Payload::None)
            .await
    }

    /// Re-publish an existing publish (or switch a snapshot publish to its
    /// current sources), re-signing it with the resolved configuration.
    async fn publish_update(&self, publish: &Publish, force_overwrite: bool) -> Result<Publish> {
        let mut body = Map::new();
        body.insert(
            "Signing".to_string(),
            self.signing
                .resolve(&publish.full_prefix(), &publish.distribution)
                .to_api_params(),
        );
        if publish.acquire_by_hash {
            body.insert("AcquireByHash".to_string(), Value::Bool(true));
        }
        if force_overwrite {
            body.insert("ForceOverwrite".to_string(), Value::Bool(true));
        }
        if publish.source_kind == SourceKind::Snapshot {
            body.insert("Snapshots".to_string(), publish.sources_json());
        }

        self.request(
            Method::PUT,
            self.api_url(&[
                PUBLISH_PATH,
                &publish.full_prefix_escaped(),
                &publish.distribution,
            ]),
            Payload::Json(Value::Object(body)),
        )
        .await
    }
}

#[async_trait]
impl StoreSearch for Client {
    async fn list_stores(&self) -> Result<Vec<Store>> {
        let repos = self.repo_list().await?;
        let snapshots = self.snapshot_list().await?;

        Ok(repos
            .into_iter()
            .map(Store::Repo)
            .chain(snapshots.into_iter().map(Store::Snapshot))
            .collect())
    }

    async fn search_store(
        &self,
        store: &Store,
        query: Option<&str>,
        with_deps: bool,
        details: bool,
    ) -> Result<Vec<Package>> {
        match store {
            Store::Repo(repo) => self.repo_search(&repo.name, query, with_deps, details).await,
            Store::Snapshot(snapshot) => {
                self.snapshot_search(&snapshot.name, query, with_deps, details)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn client(url: &str) -> Client {
        Client::new(&Config {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(Client::new(&Config {
            url: "not a url".to_string(),
            ..Default::default()
        })
        .is_err());

        assert!(Client::new(&Config {
            url: "ftp://example.org".to_string(),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn api_url_joins_single_slashes() {
        let c = client("http://localhost:8090");
        assert_eq!(
            c.api_url(&[REPOS_PATH, "stretch_main", "packages"]).as_str(),
            "http://localhost:8090/api/repos/stretch_main/packages"
        );

        // Trailing slash on the base does not double up.
        let c = client("http://localhost:8090/aptly/");
        assert_eq!(
            c.api_url(&[FILES_PATH]).as_str(),
            "http://localhost:8090/aptly/api/files"
        );
    }

    #[test]
    fn api_url_encodes_segments() {
        let c = client("http://localhost:8090");
        assert_eq!(
            c.api_url(&[PACKAGES_PATH, "Pamd64 aptly 1.2.0-1 f2b5bf57981bb3d9"])
                .as_str(),
            "http://localhost:8090/api/packages/Pamd64%20aptly%201.2.0-1%20f2b5bf57981bb3d9"
        );
    }

    #[test]
    fn files_report_strips_added_suffix() {
        let response: AddResponse = serde_json::from_value(serde_json::json!({
            "Report": {
                "Added": ["aptly_0.9~dev+217+ge5d646c_i386 added"],
                "Removed": ["aptly_0.8_i386"],
                "Warnings": ["conflict warning"],
            },
            "FailedFiles": ["dir/broken.deb"],
        }))
        .unwrap();

        let report = FilesReport::from_wire(response);
        assert_eq!(report.added, vec!["aptly_0.9~dev+217+ge5d646c_i386"]);
        assert_eq!(report.removed, vec!["aptly_0.8_i386"]);
        assert_eq!(report.warnings, vec!["conflict warning"]);
        assert_eq!(report.failed, vec!["dir/broken.deb"]);
    }

    #[test]
    fn files_report_tolerates_missing_sections() {
        let response: AddResponse =
            serde_json::from_value(serde_json::json!({"FailedFiles": []})).unwrap();
        let report = FilesReport::from_wire(response);
        assert!(report.added.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn snapshot_deserializes_timestamps() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "Name": "stretch-2018",
            "Description": "Snapshot from local repo",
            "CreatedAt": "2018-05-03T13:42:52.338358Z",
        }))
        .unwrap();

        assert_eq!(snapshot.name, "stretch-2018");
        assert!(snapshot.created_at.is_some());
    }
}
