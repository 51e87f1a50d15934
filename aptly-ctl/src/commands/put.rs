// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::cli::{CtlError, Result},
    aptly_client::{
        cancel::CancelToken,
        client::Client,
        error::AptlyError,
        package::Package,
        publish::update_dependent_publishes,
    },
    clap::ArgMatches,
    log::{info, warn},
    std::{
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    },
};

/// Upload directory names are a shared namespace on the server; embed the
/// timestamp and pid so concurrent invocations cannot collide.
fn upload_directory_name(repo: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    format!("aptly_ctl_put_{}_{}_{}", repo, timestamp, std::process::id())
}

pub async fn run(client: &Client, token: &CancelToken, args: &ArgMatches) -> Result<()> {
    let repo = args.value_of("repo").expect("repo argument is required");
    let force_replace = args.is_present("force-replace");
    let paths = args
        .values_of("packages")
        .expect("packages argument is required")
        .map(PathBuf::from)
        .collect::<Vec<_>>();

    // Fail before uploading anything if the repo does not exist.
    client.repo_show(repo).await.map_err(|e| {
        if e.is_not_found() {
            CtlError::Failed(format!("local repo {} not found", repo))
        } else {
            CtlError::Aptly(e)
        }
    })?;

    // Derive local identities first; hashing is synchronous and runs off the
    // async pool.
    let mut packages = vec![];
    for path in &paths {
        let path = path.clone();
        let package = tokio::task::spawn_blocking(move || Package::from_file(&path))
            .await
            .map_err(|e| CtlError::Failed(format!("hashing task failed: {}", e)))??;
        info!("loaded {} from {}", package.dir_ref(), path_of(&package));
        packages.push(package);
    }

    let directory = upload_directory_name(repo);
    info!("uploading {} packages to directory {}", paths.len(), directory);

    // The upload directory is deleted on every path out of this block.
    let report = {
        let upload = client.files_upload(&paths, &directory).await;

        let add = match upload {
            Ok(_) if token.is_cancelled() => Err(AptlyError::Cancelled),
            Ok(_) => {
                client
                    .repo_add_packages(repo, &directory, None, false, force_replace)
                    .await
            }
            Err(e) => Err(e),
        };

        info!("deleting upload directory {}", directory);
        if let Err(e) = client.files_delete_dir(&directory).await {
            warn!("failed to delete upload directory {}: {}", directory, e);
        }

        add?
    };

    for failed in &report.failed {
        warn!("failed to add file {}", failed);
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    for removed in &report.removed {
        info!("removed {}", removed);
    }
    for added in &report.added {
        println!("\"{}/{}\"", repo, added);
    }

    if report.added.is_empty() && report.removed.is_empty() {
        return Err(CtlError::Failed(
            "nothing added or removed; skipping publish update".to_string(),
        ));
    }

    let errors = update_dependent_publishes(client, &[repo.to_string()], false).await?;

    if !report.failed.is_empty() {
        Err(CtlError::Failed(format!(
            "{} files failed to add",
            report.failed.len()
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

fn path_of(package: &Package) -> String {
    package
        .file
        .as_ref()
        .map(|f| f.orig_path.clone())
        .unwrap_or_default()
}
