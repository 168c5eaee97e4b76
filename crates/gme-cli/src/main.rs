//! `gme` command line

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use gme_cli::{load_config, parse_header, parse_mapping, parse_value, ImportRequest, Workspace};
use gme_core::ImportOptions;
use gme_graph::MappingKind;
use gme_model::{EntityHeader, EntityId, EntityKind};

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Cluster snapshot (JSON)")
}

fn bundle_arg() -> Arg {
    Arg::new("bundle")
        .long("bundle")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Bundle file produced by `export`")
}

fn headers_arg() -> Arg {
    Arg::new("headers")
        .required(true)
        .num_args(1..)
        .value_parser(parse_header)
        .help("Entities as KIND:ID, e.g. POLICY:p1")
}

fn cli() -> Command {
    Command::new("gme")
        .version(gme_cli::VERSION)
        .about("Gateway configuration migration")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine settings (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .subcommand(
            Command::new("list")
                .about("List entities of one kind")
                .arg(store_arg())
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<EntityKind>())
                        .help("Entity kind, e.g. POLICY"),
                ),
        )
        .subcommand(
            Command::new("deps")
                .about("Show the dependency graph below some entities")
                .arg(store_arg())
                .arg(headers_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("Export entities and their dependencies to a bundle")
                .arg(store_arg())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Bundle file to write"),
                )
                .arg(headers_arg()),
        )
        .subcommand(
            Command::new("candidates")
                .about("List target entities the bundle's unexported dependencies could map onto")
                .arg(store_arg())
                .arg(bundle_arg())
                .arg(
                    Arg::new("scope")
                        .long("scope")
                        .help("Restrict folder-bound kinds to this folder id"),
                )
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .action(ArgAction::Append)
                        .value_parser(parse_value)
                        .help("Attribute filter as KEY=VALUE"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import a bundle into a cluster snapshot")
                .arg(store_arg())
                .arg(bundle_arg())
                .arg(
                    Arg::new("target-folder")
                        .long("target-folder")
                        .help("Folder id to import into, the root folder by default"),
                )
                .arg(
                    Arg::new("flatten")
                        .long("flatten")
                        .action(ArgAction::SetTrue)
                        .help("Place everything directly in the target folder"),
                )
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .action(ArgAction::SetTrue)
                        .help("Overwrite target entities the bundle was copied onto"),
                )
                .arg(
                    Arg::new("enable-services")
                        .long("enable-services")
                        .action(ArgAction::SetTrue)
                        .help("Leave newly created services enabled"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Plan and report without writing"),
                )
                .arg(
                    Arg::new("map")
                        .long("map")
                        .action(ArgAction::Append)
                        .value_parser(parse_mapping)
                        .help("Use an existing target entity, KIND:SOURCE=TARGET"),
                )
                .arg(
                    Arg::new("copy")
                        .long("copy")
                        .action(ArgAction::Append)
                        .value_parser(parse_mapping)
                        .help("Copy the bundle value onto a target entity, KIND:SOURCE=TARGET"),
                )
                .arg(
                    Arg::new("value")
                        .long("value")
                        .action(ArgAction::Append)
                        .value_parser(parse_value)
                        .help("Replace an exported value, VALUE_REFERENCE_ID=VALUE"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("GME_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open(args: &ArgMatches) -> Result<Workspace> {
    let config = load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("unable to load configuration")?;
    let store = args
        .get_one::<PathBuf>("store")
        .context("--store is required")?;
    Workspace::open(store, config)
}

fn headers(args: &ArgMatches) -> Vec<EntityHeader> {
    args.get_many::<EntityHeader>("headers")
        .map(|headers| headers.cloned().collect())
        .unwrap_or_default()
}

fn mappings(args: &ArgMatches, id: &str, kind: MappingKind) -> Vec<(EntityHeader, EntityHeader, MappingKind)> {
    args.get_many::<(EntityHeader, EntityHeader)>(id)
        .map(|pairs| {
            pairs
                .map(|(source, target)| (source.clone(), target.clone(), kind))
                .collect()
        })
        .unwrap_or_default()
}

fn pairs(args: &ArgMatches, id: &str) -> Vec<(String, String)> {
    args.get_many::<(String, String)>(id)
        .map(|pairs| pairs.cloned().collect())
        .unwrap_or_default()
}

fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("list", args)) => {
            let kind = *args.get_one::<EntityKind>("kind").context("--kind is required")?;
            open(args)?.list(kind)
        }
        Some(("deps", args)) => open(args)?.dependencies(&headers(args)),
        Some(("export", args)) => {
            let out = args.get_one::<PathBuf>("out").context("--out is required")?;
            open(args)?.export(&headers(args), out)
        }
        Some(("candidates", args)) => {
            let bundle = args.get_one::<PathBuf>("bundle").context("--bundle is required")?;
            let scope = args.get_one::<String>("scope").map(|id| EntityId::new(id.as_str()));
            let filters: BTreeMap<String, String> = pairs(args, "filter").into_iter().collect();
            open(args)?.candidates(bundle, scope.as_ref(), &filters)
        }
        Some(("import", args)) => {
            let bundle = args.get_one::<PathBuf>("bundle").context("--bundle is required")?;
            let mut options = ImportOptions::new()
                .with_flatten_folders(args.get_flag("flatten"))
                .with_overwrite_existing(args.get_flag("overwrite"))
                .with_enable_services(args.get_flag("enable-services"))
                .with_dry_run(args.get_flag("dry-run"));
            if let Some(folder) = args.get_one::<String>("target-folder") {
                options = options.with_target_folder(EntityHeader::new(EntityKind::Folder, folder.as_str()));
            }
            let mut request = ImportRequest {
                options,
                mappings: mappings(args, "map", MappingKind::Mapped),
                values: pairs(args, "value"),
            };
            request
                .mappings
                .extend(mappings(args, "copy", MappingKind::Copied));
            open(args)?.import(bundle, &request)
        }
        _ => bail!("no command given"),
    }
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(report) => print!("{report}"),
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    }
}
