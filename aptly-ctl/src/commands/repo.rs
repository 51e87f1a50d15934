// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{cli::Result, table::print_table},
    aptly_client::client::{Client, Repo},
    clap::ArgMatches,
};

fn print_repo(repo: &Repo) {
    println!("{}", repo.name);
    println!("    Comment: {}", repo.comment);
    println!("    Default distribution: {}", repo.default_distribution);
    println!("    Default component: {}", repo.default_component);
}

pub async fn run(client: &Client, sub: &ArgMatches) -> Result<()> {
    match sub.subcommand() {
        Some(("create", args)) => {
            let repo = client
                .repo_create(
                    args.value_of("name").expect("name argument is required"),
                    args.value_of("comment").unwrap_or(""),
                    args.value_of("distribution").unwrap_or(""),
                    args.value_of("component").unwrap_or(""),
                )
                .await?;
            print_repo(&repo);
        }
        Some(("show", args)) => {
            let repo = client
                .repo_show(args.value_of("name").expect("name argument is required"))
                .await?;
            print_repo(&repo);
        }
        Some(("list", _)) => {
            let mut repos = client.repo_list().await?;
            repos.sort_by(|a, b| a.name.cmp(&b.name));

            let rows = repos
                .iter()
                .map(|repo| {
                    vec![
                        repo.name.clone(),
                        repo.default_distribution.clone(),
                        repo.default_component.clone(),
                        repo.comment.clone(),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["Name", "Distribution", "Component", "Comment"], &rows);
        }
        Some(("edit", args)) => {
            let repo = client
                .repo_edit(
                    args.value_of("name").expect("name argument is required"),
                    args.value_of("comment").unwrap_or(""),
                    args.value_of("distribution").unwrap_or(""),
                    args.value_of("component").unwrap_or(""),
                )
                .await?;
            print_repo(&repo);
        }
        Some(("delete", args)) => {
            client
                .repo_delete(
                    args.value_of("name").expect("name argument is required"),
                    args.is_present("force"),
                )
                .await?;
        }
        _ => unreachable!("clap enforces a repo action"),
    }

    Ok(())
}
