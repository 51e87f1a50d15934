// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        cli::{CtlError, Result},
        commands::{parse_ref, resolve_key, RefSpec},
    },
    aptly_client::{client::Client, publish::update_dependent_publishes},
    clap::ArgMatches,
    log::{error, info},
    std::collections::BTreeMap,
};

pub async fn run(client: &Client, args: &ArgMatches) -> Result<()> {
    let dry_run = args.is_present("dry-run");

    let mut by_repo: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for raw in args.values_of("refs").unwrap_or_default() {
        let spec = parse_ref(raw)?;
        let repo = spec.repo().map(|r| r.to_string()).ok_or_else(|| {
            CtlError::Failed(format!(
                "package reference {} needs a repo/ prefix; removal targets one repo",
                raw
            ))
        })?;

        let key = match spec {
            RefSpec::Key { key, .. } => key,
            RefSpec::Direct { direct, .. } => resolve_key(client, &repo, &direct).await?,
        };

        by_repo.entry(repo).or_default().push(key);
    }

    if by_repo.is_empty() {
        return Err(CtlError::Failed(
            "no references supplied; nothing to remove".to_string(),
        ));
    }

    let mut updated_repos = vec![];
    let mut failures = 0usize;

    for (repo, keys) in &by_repo {
        if dry_run {
            for key in keys {
                info!("would remove \"{}\" from {}", key, repo);
            }
            updated_repos.push(repo.clone());
            continue;
        }

        match client.repo_delete_packages_by_key(repo, keys).await {
            Ok(_) => {
                for key in keys {
                    info!("removed \"{}\" from {}", key, repo);
                }
                updated_repos.push(repo.clone());
            }
            Err(e) => {
                error!("failed to remove packages from {}: {}", repo, e);
                // Failed references go to stdout so they can be piped back in.
                for key in keys {
                    println!("\"{}/{}\"", repo, key);
                }
                failures += 1;
            }
        }
    }

    if updated_repos.is_empty() {
        return Err(CtlError::Failed("failed to remove anything".to_string()));
    }

    let errors = update_dependent_publishes(client, &updated_repos, dry_run).await?;

    if failures > 0 {
        Err(CtlError::Failed(format!(
            "failed to remove packages from {} repos",
            failures
        )))
    } else if !errors.is_empty() {
        Err(CtlError::Failed(format!(
            "{} publishes failed to update",
            errors.len()
        )))
    } else {
        Ok(())
    }
}
