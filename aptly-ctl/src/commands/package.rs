// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        cli::{CtlError, Result},
        table::print_table,
    },
    aptly_client::{
        cancel::CancelToken,
        client::Client,
        config::Config,
        package::Package,
        rotate::rotate_packages,
        search::{search, SearchOptions, Store},
    },
    clap::ArgMatches,
    log::error,
    regex::Regex,
    std::collections::HashMap,
};

const FIRST_FIELDS: [&str; 3] = ["Package", "Version", "Architecture"];
const LAST_FIELDS: [&str; 1] = ["Description"];
const SKIP_FIELDS: [&str; 6] = [
    "Package",
    "Version",
    "Architecture",
    "Description",
    "Key",
    "ShortKey",
];

fn print_package_fields(package: &Package, indent: &str) {
    let empty = HashMap::new();
    let fields = package.fields.as_ref().unwrap_or(&empty);

    for name in FIRST_FIELDS {
        if let Some(value) = fields.get(name) {
            println!("{}{}: {}", indent, name, value);
        }
    }

    let mut names = fields
        .keys()
        .filter(|name| !SKIP_FIELDS.contains(&name.as_str()))
        .collect::<Vec<_>>();
    names.sort();
    for name in names {
        println!("{}{}: {}", indent, name, fields[name]);
    }

    for name in LAST_FIELDS {
        if let Some(value) = fields.get(name) {
            println!("{}{}: {}", indent, name, value);
        }
    }
}

pub async fn show(client: &Client, args: &ArgMatches) -> Result<()> {
    for key in args.values_of("keys").unwrap_or_default() {
        let key = key.trim().trim_matches('"');
        let package = client.package_show(key).await?;

        println!("\"{}\"", package.key());
        print_package_fields(&package, "    ");
    }

    Ok(())
}

pub async fn search_cmd(
    client: &Client,
    config: &Config,
    token: &CancelToken,
    args: &ArgMatches,
) -> Result<()> {
    let queries = args
        .values_of("queries")
        .map(|values| values.map(|s| s.to_string()).collect::<Vec<_>>())
        .unwrap_or_default();

    let store_filter = args
        .value_of("store-filter")
        .map(Regex::new)
        .transpose()
        .map_err(|e| CtlError::Failed(format!("invalid store filter: {}", e)))?;

    let rotate_n = if args.is_present("rotate") {
        Some(args.value_of_t::<i64>("rotate")?)
    } else {
        None
    };

    let details = args.is_present("details");
    let options = SearchOptions {
        with_deps: args.is_present("with-deps"),
        details,
        max_workers: config.max_workers,
        store_filter,
    };

    let (mut results, errors) = search(client, &queries, &options, token).await?;

    if let Some(n) = rotate_n {
        results = results
            .into_iter()
            .map(|(store, packages)| (store, rotate_packages(packages, n)))
            .filter(|(_, packages)| !packages.is_empty())
            .collect();
    }

    results.sort_by(|a, b| (a.0.kind(), a.0.name()).cmp(&(b.0.kind(), b.0.name())));

    if details {
        for (store, mut packages) in results {
            packages.sort();
            for package in packages {
                println!("\"{}/{}\"", store.name(), package.key());
                print_package_fields(&package, "    ");
            }
        }
    } else {
        let mut rows = vec![];
        for (store, mut packages) in results {
            packages.sort();
            for package in packages {
                rows.push(store_row(&store, &package));
            }
        }
        print_table(&["Kind", "Store", "Name", "Version", "Key"], &rows);
    }

    for error in &errors {
        error!("{}", error);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CtlError::Failed(format!(
            "{} searches failed",
            errors.len()
        )))
    }
}

fn store_row(store: &Store, package: &Package) -> Vec<String> {
    vec![
        store.kind().to_string(),
        store.name().to_string(),
        package.name.clone(),
        package.version.to_string(),
        format!("\"{}\"", package.key()),
    ]
}
