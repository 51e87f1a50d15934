// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::commands,
    aptly_client::{
        cancel::{cancel_pair, CancelToken},
        client::Client,
        config::Config,
        error::AptlyError,
    },
    clap::{Arg, ArgMatches, Command},
    log::warn,
    std::path::Path,
    thiserror::Error,
};

const QUERY_HELP: &str = "package query. Multiple queries are ORed. For query syntax \
                          see https://www.aptly.info/doc/feature/query/";

#[derive(Debug, Error)]
pub enum CtlError {
    #[error("argument parsing error: {0}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    Aptly(#[from] AptlyError),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

impl CtlError {
    /// Exit code policy: 2 for argument and configuration problems, 1 for
    /// any domain failure after setup.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Clap(_) => 2,
            Self::Aptly(AptlyError::Config(_)) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CtlError>;

fn app() -> Command<'static> {
    Command::new("aptly-ctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manage Debian package repositories served by aptly")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .global(true)
                .help("Increase verbosity. Repeat for even more"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .takes_value(true)
                .global(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .takes_value(true)
                .default_value("")
                .global(true)
                .help("Profile from the configuration file. The first one is used by default"),
        )
        .arg(
            Arg::new("config-keys")
                .short('C')
                .long("config-key")
                .takes_value(true)
                .multiple_occurrences(true)
                .value_name("KEY=VALUE")
                .global(true)
                .help(
                    "Override a configuration value. Takes precedence over the \
                     configuration file. Use dots for nested keys, e.g. signing.gpgkey=KEY",
                ),
        )
        .arg(
            Arg::new("max-workers")
                .long("max-workers")
                .takes_value(true)
                .global(true)
                .help("Number of concurrent workers for fan-out requests"),
        )
        .subcommand(Command::new("version").about("Show aptly server version"))
        .subcommand(
            Command::new("package")
                .about("Search packages and show info about them")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show").about("Show package info").arg(
                        Arg::new("keys")
                            .required(true)
                            .multiple_values(true)
                            .value_name("key")
                            .help("package key"),
                    ),
                )
                .subcommand(
                    Command::new("search")
                        .about("Search packages in all repos and snapshots")
                        .arg(
                            Arg::new("queries")
                                .multiple_values(true)
                                .value_name("query")
                                .help(QUERY_HELP),
                        )
                        .arg(
                            Arg::new("with-deps")
                                .long("with-deps")
                                .help("Include dependencies when evaluating package queries"),
                        )
                        .arg(
                            Arg::new("details")
                                .long("details")
                                .help("Fetch and print full package fields"),
                        )
                        .arg(
                            Arg::new("store-filter")
                                .short('f')
                                .long("store-filter")
                                .takes_value(true)
                                .value_name("REGEXP")
                                .help("Only search repos and snapshots whose name matches"),
                        )
                        .arg(
                            Arg::new("rotate")
                                .long("rotate")
                                .takes_value(true)
                                .allow_hyphen_values(true)
                                .value_name("N")
                                .help(
                                    "Omit the newest N versions per (prefix, arch, name) \
                                     bucket from the output. Negative N shows the newest N \
                                     instead. Pipe to the remove subcommand to delete old \
                                     versions",
                                ),
                        ),
                ),
        )
        .subcommand(
            Command::new("put")
                .about("Upload packages into a local repo and update dependent publishes")
                .arg(Arg::new("repo").required(true).help("destination repository name"))
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .multiple_values(true)
                        .value_name("package")
                        .help("package files to upload"),
                )
                .arg(
                    Arg::new("force-replace")
                        .short('f')
                        .long("force-replace")
                        .help("Remove packages conflicting with the packages being added"),
                ),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy packages between local repos and update dependent publishes")
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .takes_value(true)
                        .required(true)
                        .help("target repo name"),
                )
                .arg(
                    Arg::new("refs")
                        .required(true)
                        .multiple_values(true)
                        .value_name("package_reference")
                        .help("package key or repo/direct reference to copy"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Only show what would be copied"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove packages from local repos and update dependent publishes")
                .arg(
                    Arg::new("refs")
                        .required(true)
                        .multiple_values(true)
                        .value_name("package_reference")
                        .help("repo/key or repo/direct reference to remove"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Only show what would be removed"),
                ),
        )
        .subcommand(
            Command::new("repo")
                .about("Administer local repos")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("create")
                        .about("Create a local repo")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("comment").long("comment").takes_value(true))
                        .arg(
                            Arg::new("distribution")
                                .long("distribution")
                                .takes_value(true)
                                .help("default distribution for publishes from this repo"),
                        )
                        .arg(
                            Arg::new("component")
                                .long("component")
                                .takes_value(true)
                                .help("default component for publishes from this repo"),
                        ),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show a local repo")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(Command::new("list").about("List local repos"))
                .subcommand(
                    Command::new("edit")
                        .about("Edit a local repo")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("comment").long("comment").takes_value(true))
                        .arg(Arg::new("distribution").long("distribution").takes_value(true))
                        .arg(Arg::new("component").long("component").takes_value(true)),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a local repo")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Delete the repo even if snapshots point at it"),
                        ),
                ),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Administer snapshots")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("create")
                        .about("Snapshot the current contents of a local repo")
                        .arg(Arg::new("repo").required(true).help("repo to snapshot"))
                        .arg(Arg::new("name").required(true).help("new snapshot name"))
                        .arg(
                            Arg::new("description")
                                .short('d')
                                .long("description")
                                .takes_value(true),
                        ),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show a snapshot")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(Command::new("list").about("List snapshots"))
                .subcommand(
                    Command::new("edit")
                        .about("Rename a snapshot or change its description")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("new-name").long("new-name").takes_value(true))
                        .arg(
                            Arg::new("description")
                                .short('d')
                                .long("description")
                                .takes_value(true),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a snapshot")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Delete the snapshot even if it is referenced"),
                        ),
                )
                .subcommand(
                    Command::new("diff")
                        .about("Show the package difference between two snapshots")
                        .arg(Arg::new("snapshot1").required(true))
                        .arg(Arg::new("snapshot2").required(true)),
                ),
        )
        .subcommand(
            Command::new("publish")
                .about("Administer publishes")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("list")
                        .about("List publishes")
                        .arg(Arg::new("detail").long("detail").help("Print source details")),
                )
                .subcommand(
                    Command::new("create")
                        .about("Publish local repos or snapshots")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .value_name("PUB_SPEC")
                                .help("publish to create, as [[storage:]prefix/]distribution"),
                        )
                        .arg(
                            Arg::new("source-kind")
                                .short('s')
                                .long("source-kind")
                                .takes_value(true)
                                .possible_values(["local", "snapshot"])
                                .required(true)
                                .help("publish from local repos or from snapshots"),
                        )
                        .arg(
                            Arg::new("sources")
                                .required(true)
                                .multiple_values(true)
                                .value_name("source")
                                .help(
                                    "repo or snapshot to publish, as name=component; \
                                     component may be omitted",
                                ),
                        )
                        .arg(
                            Arg::new("architectures")
                                .long("architectures")
                                .takes_value(true)
                                .help("comma separated list of architectures to publish"),
                        )
                        .arg(Arg::new("label").long("label").takes_value(true))
                        .arg(Arg::new("origin").long("origin").takes_value(true))
                        .arg(
                            Arg::new("not-automatic")
                                .long("not-automatic")
                                .help("Mark the publish NotAutomatic for package managers"),
                        )
                        .arg(
                            Arg::new("but-automatic-upgrades")
                                .long("but-automatic-upgrades")
                                .help("Exclude upgrades from the NotAutomatic setting"),
                        )
                        .arg(
                            Arg::new("acquire-by-hash")
                                .long("acquire-by-hash")
                                .help("Provide index files by their hash"),
                        )
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite files in the pool/ directory without notice"),
                        )
                        .arg(
                            Arg::new("skip-cleanup")
                                .long("skip-cleanup")
                                .help("Don't remove unreferenced files in prefix/component"),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .about("Update a published local repo or switch a published snapshot")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .value_name("PUB_SPEC")
                                .help("publish to update, as [[storage:]prefix/]distribution"),
                        )
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite files in the pool/ directory without notice"),
                        ),
                )
                .subcommand(
                    Command::new("drop")
                        .about("Drop a publish")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .value_name("PUB_SPEC")
                                .help("publish to drop, as [[storage:]prefix/]distribution"),
                        )
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Drop the publish even if it has snapshots"),
                        ),
                ),
        )
}

fn init_logging(verbose: u64) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn load_config(args: &ArgMatches) -> Result<Config> {
    let overrides = args
        .values_of("config-keys")
        .map(|values| values.map(|s| s.to_string()).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut config = Config::load(
        args.value_of("config").map(Path::new),
        args.value_of("profile").unwrap_or(""),
        &overrides,
    )?;

    if args.is_present("max-workers") {
        config.max_workers = args.value_of_t("max-workers")?;
    }

    Ok(config)
}

pub async fn run_cli() -> Result<()> {
    let matches = app().get_matches();

    init_logging(matches.occurrences_of("verbose"));

    let config = load_config(&matches)?;
    let client = Client::new(&config)?;

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling in-flight work");
            handle.cancel();
        }
    });

    dispatch(&client, &config, &token, &matches).await
}

async fn dispatch(
    client: &Client,
    config: &Config,
    token: &CancelToken,
    matches: &ArgMatches,
) -> Result<()> {
    match matches.subcommand() {
        Some(("version", _)) => {
            println!("{}", client.version().await?);
            Ok(())
        }
        Some(("package", sub)) => match sub.subcommand() {
            Some(("show", args)) => commands::package::show(client, args).await,
            Some(("search", args)) => {
                commands::package::search_cmd(client, config, token, args).await
            }
            _ => unreachable!("clap enforces a package action"),
        },
        Some(("put", args)) => commands::put::run(client, token, args).await,
        Some(("copy", args)) => commands::copy::run(client, args).await,
        Some(("remove", args)) => commands::remove::run(client, args).await,
        Some(("repo", sub)) => commands::repo::run(client, sub).await,
        Some(("snapshot", sub)) => commands::snapshot::run(client, sub).await,
        Some(("publish", sub)) => commands::publish::run(client, sub).await,
        _ => unreachable!("clap enforces a subcommand"),
    }
}
