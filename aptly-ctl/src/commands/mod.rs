// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Subcommand implementations. */

use {
    crate::cli::{CtlError, Result},
    aptly_client::{
        client::Client,
        package::{DirectRef, Package},
    },
};

pub mod copy;
pub mod package;
pub mod publish;
pub mod put;
pub mod remove;
pub mod repo;
pub mod snapshot;

/// A package reference as accepted on the command line: an aptly key or a
/// direct reference, optionally prefixed with `repo/`.
///
/// Several subcommands print references wrapped in quotes for convenient
/// copy-pasting, so quotes around the input are tolerated.
#[derive(Clone, Debug)]
pub(crate) enum RefSpec {
    Key {
        repo: Option<String>,
        key: String,
    },
    Direct {
        repo: Option<String>,
        direct: DirectRef,
    },
}

impl RefSpec {
    pub(crate) fn repo(&self) -> Option<&str> {
        match self {
            Self::Key { repo, .. } => repo.as_deref(),
            Self::Direct { repo, .. } => repo.as_deref(),
        }
    }
}

pub(crate) fn parse_ref(raw: &str) -> Result<RefSpec> {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');

    let (repo, rest) = match trimmed.split_once('/') {
        Some((repo, rest)) => (Some(repo.to_string()), rest),
        None => (None, trimmed),
    };

    if let Ok(package) = Package::from_key(rest) {
        return Ok(RefSpec::Key {
            repo,
            key: package.key(),
        });
    }

    if let Ok(direct) = DirectRef::parse(rest) {
        return Ok(RefSpec::Direct { repo, direct });
    }

    Err(CtlError::Failed(format!(
        "invalid package reference: {}",
        raw
    )))
}

/// Resolve a direct reference to a full key by searching the named repo.
pub(crate) async fn resolve_key(
    client: &Client,
    repo: &str,
    direct: &DirectRef,
) -> Result<String> {
    let query = direct.to_string();
    let found = client.repo_search(repo, Some(&query), false, false).await?;

    match found.as_slice() {
        [] => Err(CtlError::Failed(format!(
            "direct reference {} not found in repo {}",
            query, repo
        ))),
        [package] => Ok(package.key()),
        many => Err(CtlError::Failed(format!(
            "direct reference {} is ambiguous in repo {}: {} matches",
            query,
            repo,
            many.len()
        ))),
    }
}

/// Parse a publish spec of the form `[[storage:]prefix/]distribution`.
pub(crate) fn parse_pub_spec(spec: &str) -> (String, String, String) {
    let (prefix_part, distribution) = match spec.rsplit_once('/') {
        Some((prefix, distribution)) => (prefix.to_string(), distribution.to_string()),
        None => (".".to_string(), spec.to_string()),
    };

    let (storage, prefix) = match prefix_part.rsplit_once(':') {
        Some((storage, prefix)) => (storage.to_string(), prefix.to_string()),
        None => (String::new(), prefix_part),
    };

    (storage, prefix, distribution)
}
