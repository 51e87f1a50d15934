// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{cli::Result, table::print_table},
    aptly_client::client::{Client, Snapshot},
    clap::ArgMatches,
};

fn print_snapshot(snapshot: &Snapshot) {
    println!("{}", snapshot.name);
    println!("    Description: {}", snapshot.description);
    println!(
        "    Created at: {}",
        snapshot
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    );
}

pub async fn run(client: &Client, sub: &ArgMatches) -> Result<()> {
    match sub.subcommand() {
        Some(("create", args)) => {
            let snapshot = client
                .snapshot_create_from_repo(
                    args.value_of("repo").expect("repo argument is required"),
                    args.value_of("name").expect("name argument is required"),
                    args.value_of("description"),
                )
                .await?;
            print_snapshot(&snapshot);
        }
        Some(("show", args)) => {
            let snapshot = client
                .snapshot_show(args.value_of("name").expect("name argument is required"))
                .await?;
            print_snapshot(&snapshot);
        }
        Some(("list", _)) => {
            let mut snapshots = client.snapshot_list().await?;
            snapshots.sort_by(|a, b| a.name.cmp(&b.name));

            let rows = snapshots
                .iter()
                .map(|snapshot| {
                    vec![
                        snapshot.name.clone(),
                        snapshot
                            .created_at
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                        snapshot.description.clone(),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["Name", "Created", "Description"], &rows);
        }
        Some(("edit", args)) => {
            let snapshot = client
                .snapshot_edit(
                    args.value_of("name").expect("name argument is required"),
                    args.value_of("new-name"),
                    args.value_of("description"),
                )
                .await?;
            print_snapshot(&snapshot);
        }
        Some(("delete", args)) => {
            client
                .snapshot_delete(
                    args.value_of("name").expect("name argument is required"),
                    args.is_present("force"),
                )
                .await?;
        }
        Some(("diff", args)) => {
            let diff = client
                .snapshot_diff(
                    args.value_of("snapshot1").expect("snapshot1 is required"),
                    args.value_of("snapshot2").expect("snapshot2 is required"),
                )
                .await?;

            let rows = diff
                .iter()
                .map(|(left, right)| {
                    vec![
                        left.as_ref().map(|p| p.key()).unwrap_or_else(|| "-".to_string()),
                        right
                            .as_ref()
                            .map(|p| p.key())
                            .unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["Left", "Right"], &rows);
        }
        _ => unreachable!("clap enforces a snapshot action"),
    }

    Ok(())
}
