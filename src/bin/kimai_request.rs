//! kimai-request: issue one Kimai API request through the orchestration layer
//!
//! Usage:
//!   kimai-request [OPTIONS] <METHOD> <PATH> [JSON_BODY]
//!
//! Connection settings given as options are stored and reused next time.

use anyhow::{bail, Context};
use kimai_client::persist::FileStorage;
use kimai_client::{
    ClientFactoryBuilder, LoadingOverride, MemoryStore, Mutation, Settings, StatePersister,
    StateStore,
};
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!(
        r#"kimai-request - Kimai API request tool

USAGE:
    kimai-request [OPTIONS] <METHOD> <PATH> [JSON_BODY]

OPTIONS:
    --config <file>       YAML settings file
    --host <url>          Kimai host, e.g. https://kimai.example.com
    --user <name>         API user (X-AUTH-USER)
    --token <token>       API token (X-AUTH-TOKEN)
    --language <code>     Language of error messages
    --no-loader           Do not drive the loading signal
    -h, --help            Show this help message

ENVIRONMENT:
    KIMAI_LOCALE_DIR, KIMAI_STORAGE_DIR, KIMAI_LOADING_MODE, KIMAI_PROXY_URL
    RUST_LOG              Log filter (default: warn)"#
    );
}

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    mutations: Vec<Mutation>,
    hide_loader: bool,
    positional: Vec<String>,
}

fn parse_args(raw: &[String]) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--host" => args.mutations.push(Mutation::SetHost(value("--host")?)),
            "--user" => args.mutations.push(Mutation::SetUsername(value("--user")?)),
            "--token" => args.mutations.push(Mutation::SetApiKey(value("--token")?)),
            "--language" => args.mutations.push(Mutation::SetLanguage(value("--language")?)),
            "--no-loader" => args.hide_loader = true,
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => args.positional.push(other.to_string()),
        }
    }
    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&raw)? else {
        print_usage();
        return Ok(());
    };
    if args.positional.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let settings = match &args.config {
        Some(path) => Settings::from_yaml_file(path)
            .with_context(|| format!("reading settings from {}", path.display()))?,
        None => Settings::default(),
    }
    .with_env_overrides()?;

    let storage_dir = settings
        .storage_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".kimai"));
    let storage = Arc::new(FileStorage::new(storage_dir));

    let store = Arc::new(MemoryStore::new());
    if let Some(snapshot) = StatePersister::restore(storage.as_ref()).context("restoring state")? {
        store.commit(Mutation::Initialize(snapshot));
    }
    store.subscribe(Arc::new(StatePersister::new(storage)));
    for mutation in args.mutations {
        store.commit(mutation);
    }

    let factory = ClientFactoryBuilder::new(store.clone())
        .settings(&settings)?
        .build()?;
    let options = LoadingOverride {
        hide_loader: Some(args.hide_loader),
        show_loader: None,
    };
    let client = factory.create_client(options)?;

    let method = Method::from_bytes(args.positional[0].to_uppercase().as_bytes())
        .with_context(|| format!("invalid method {}", args.positional[0]))?;
    let path = &args.positional[1];
    let body = match args.positional.get(2) {
        Some(json) => Some(serde_json::from_str::<serde_json::Value>(json).context("parsing JSON body")?),
        None => None,
    };

    match client.send(method, path, body.as_ref()).await {
        Some(resp) => {
            println!("{}", resp.status());
            let text = resp.text().await.context("reading response body")?;
            if !text.is_empty() {
                println!("{text}");
            }
            Ok(())
        }
        None => {
            for notification in store.state().notifications {
                eprintln!("{}", notification.text);
            }
            std::process::exit(1);
        }
    }
}
