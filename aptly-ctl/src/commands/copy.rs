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
    log::info,
};

pub async fn run(client: &Client, args: &ArgMatches) -> Result<()> {
    let target = args.value_of("target").expect("target argument is required");
    let dry_run = args.is_present("dry-run");

    let mut keys = vec![];
    for raw in args.values_of("refs").unwrap_or_default() {
        match parse_ref(raw)? {
            RefSpec::Key { key, .. } => keys.push(key),
            RefSpec::Direct {
                repo: Some(repo),
                direct,
            } => keys.push(resolve_key(client, &repo, &direct).await?),
            RefSpec::Direct { repo: None, .. } => {
                return Err(CtlError::Failed(format!(
                    "direct reference {} needs a repo/ prefix to resolve its files-hash",
                    raw
                )))
            }
        }
    }

    if keys.is_empty() {
        return Err(CtlError::Failed(
            "no references supplied; nothing to copy".to_string(),
        ));
    }

    info!("copying {} packages into {}", keys.len(), target);
    if !dry_run {
        client.repo_add_packages_by_key(target, &keys).await?;
    }

    for key in &keys {
        println!("\"{}/{}\"", target, key);
    }

    let errors = update_dependent_publishes(client, &[target.to_string()], dry_run).await?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CtlError::Failed(format!(
            "{} publishes failed to update",
            errors.len()
        )))
    }
}
