// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        cli::{CtlError, Result},
        commands::parse_pub_spec,
        table::print_table,
    },
    aptly_client::{
        client::Client,
        publish::{Publish, PublishOps, Source, SourceKind},
    },
    clap::ArgMatches,
};

fn print_publish(publish: &Publish) {
    println!("{}/{}", publish.full_prefix(), publish.distribution);
    println!(
        "    Source kind: {}",
        match publish.source_kind {
            SourceKind::Local => "local",
            SourceKind::Snapshot => "snapshot",
        }
    );
    println!("    Storage: {}", publish.storage);
    println!("    Prefix: {}", publish.prefix);
    println!("    Distribution: {}", publish.distribution);
    println!("    Label: {}", publish.label);
    println!("    Origin: {}", publish.origin);
    println!("    Architectures: {}", publish.architectures.join(", "));
    println!("    Sources:");
    for source in &publish.sources {
        println!(
            "        {} ({})",
            source.name,
            source.component.as_deref().unwrap_or("")
        );
    }
}

fn parse_sources(args: &ArgMatches) -> Vec<Source> {
    args.values_of("sources")
        .unwrap_or_default()
        .map(|raw| match raw.split_once('=') {
            Some((name, component)) => Source::new(name, Some(component.to_string())),
            None => Source::new(raw, None),
        })
        .collect()
}

/// Find an existing publish by its `(storage, prefix, distribution)` triple.
async fn lookup_publish(
    client: &Client,
    storage: &str,
    prefix: &str,
    distribution: &str,
) -> Result<Publish> {
    let normalize = |p: &str| {
        if p.is_empty() {
            ".".to_string()
        } else {
            p.to_string()
        }
    };

    client
        .publish_list()
        .await?
        .into_iter()
        .find(|publish| {
            publish.storage == storage
                && normalize(&publish.prefix) == normalize(prefix)
                && publish.distribution == distribution
        })
        .ok_or_else(|| {
            CtlError::Failed(format!(
                "publish {}/{} not found",
                normalize(prefix),
                distribution
            ))
        })
}

pub async fn run(client: &Client, sub: &ArgMatches) -> Result<()> {
    match sub.subcommand() {
        Some(("list", args)) => {
            let mut publishes = client.publish_list().await?;
            publishes.sort_by(|a, b| {
                (a.full_prefix(), a.distribution.clone())
                    .cmp(&(b.full_prefix(), b.distribution.clone()))
            });

            if args.is_present("detail") {
                for publish in &publishes {
                    print_publish(publish);
                }
            } else {
                let rows = publishes
                    .iter()
                    .map(|publish| {
                        vec![
                            format!("{}/{}", publish.full_prefix(), publish.distribution),
                            match publish.source_kind {
                                SourceKind::Local => "local".to_string(),
                                SourceKind::Snapshot => "snapshot".to_string(),
                            },
                            publish
                                .sources
                                .iter()
                                .map(|s| s.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", "),
                        ]
                    })
                    .collect::<Vec<_>>();
                print_table(&["Publish", "Kind", "Sources"], &rows);
            }
        }
        Some(("create", args)) => {
            let (storage, prefix, distribution) =
                parse_pub_spec(args.value_of("spec").expect("spec argument is required"));

            let source_kind = match args.value_of("source-kind") {
                Some("snapshot") => SourceKind::Snapshot,
                _ => SourceKind::Local,
            };

            let architectures = args
                .value_of("architectures")
                .map(|list| {
                    list.split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default();

            let publish = Publish {
                source_kind,
                sources: parse_sources(args),
                storage,
                prefix: if prefix == "." { String::new() } else { prefix },
                distribution,
                architectures,
                label: args.value_of("label").unwrap_or("").to_string(),
                origin: args.value_of("origin").unwrap_or("").to_string(),
                not_automatic: args.is_present("not-automatic"),
                but_automatic_upgrades: args.is_present("but-automatic-upgrades"),
                acquire_by_hash: args.is_present("acquire-by-hash"),
            };

            let created = client
                .publish_create(
                    &publish,
                    args.is_present("force"),
                    args.is_present("skip-cleanup"),
                )
                .await?;
            print_publish(&created);
        }
        Some(("update", args)) => {
            let (storage, prefix, distribution) =
                parse_pub_spec(args.value_of("spec").expect("spec argument is required"));

            let publish = lookup_publish(client, &storage, &prefix, &distribution).await?;
            let updated = client
                .publish_update(&publish, args.is_present("force"))
                .await?;
            print_publish(&updated);
        }
        Some(("drop", args)) => {
            let (storage, prefix, distribution) =
                parse_pub_spec(args.value_of("spec").expect("spec argument is required"));

            client
                .publish_drop(&storage, &prefix, &distribution, args.is_present("force"))
                .await?;
        }
        _ => unreachable!("clap enforces a publish action"),
    }

    Ok(())
}
