mod cli;

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, LinkTargetArgs};

use lc_core::config::Config;
use lc_core::link::{self, LinkTarget, ShareLinks};
use lc_core::{AttachmentKind, ContainerRef};
use lc_upstream::LocalRepository;

/// Config file, then environment, then CLI flags.
fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path);
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting linkcast server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    lc_server::start(config).await?;
    Ok(())
}

fn print_link(target: &LinkTarget, base_url: &str) {
    let deep_link = target.to_link();
    let share = ShareLinks::new(base_url, &deep_link);
    println!("Link:     {deep_link}");
    println!("Watch:    {}", share.watch_url);
    println!("Download: {}", share.download_url);
}

fn make_link(target: LinkTargetArgs, object_id: u64, config_path: Option<&Path>) -> Result<()> {
    let target = match (target.private, target.public, target.direct) {
        (Some(container_suffix), _, _) => LinkTarget::PrivateContainer {
            container_suffix,
            object_id,
        },
        (_, Some(handle), _) => LinkTarget::PublicContainer { handle, object_id },
        (_, _, Some(owner_id)) => LinkTarget::DirectObject {
            owner_id,
            object_id,
        },
        _ => bail!("one of --private, --public or --direct is required"),
    };

    // A target that does not survive decoding would give a dead link.
    let link = target.to_link();
    if link::decode(link.as_str()).ok().as_ref() != Some(&target) {
        bail!("{link} does not decode back to the requested target");
    }

    let config = load_config(config_path);
    print_link(&target, &config.server.base_url);
    Ok(())
}

fn parse_link(raw: &str) -> Result<()> {
    let target = link::decode(raw)?;
    match &target {
        LinkTarget::PrivateContainer {
            container_suffix,
            object_id,
        } => {
            println!("Form:      private container");
            println!("Suffix:    {container_suffix}");
            println!("Object:    {object_id}");
        }
        LinkTarget::PublicContainer { handle, object_id } => {
            println!("Form:      public container");
            println!("Handle:    {handle}");
            println!("Object:    {object_id}");
        }
        LinkTarget::DirectObject {
            owner_id,
            object_id,
        } => {
            println!("Form:      direct object");
            println!("Owner:     {owner_id}");
            println!("Object:    {object_id}");
        }
    }
    println!("Container: {}", target.container()?);
    println!("Canonical: {}", target.to_link());
    Ok(())
}

async fn register_file(
    file: &Path,
    owner: u64,
    kind: &str,
    name: Option<&str>,
    mime: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path);
    let kind = AttachmentKind::from_str(kind)?;
    let container = ContainerRef::Id(
        i64::try_from(owner).with_context(|| format!("owner id {owner} is out of range"))?,
    );

    let repo = LocalRepository::new(&config.upstream.root, config.upstream.effective_chunk_size());
    let object_id = repo
        .register(&container, file, kind, name, mime)
        .await
        .with_context(|| format!("Failed to register {}", file.display()))?;

    println!("Registered {} as object {object_id}", file.display());
    print_link(
        &LinkTarget::DirectObject {
            owner_id: owner,
            object_id,
        },
        &config.server.base_url,
    );
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Base URL: {}", config.server.base_url);
    println!("  Upstream: {:?} at {}", config.upstream.backend, config.upstream.root.display());
    println!("  Chunk size: {}", config.upstream.effective_chunk_size());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "linkcast=trace,lc_server=trace,lc_upstream=debug,lc_core=debug,tower_http=debug"
                .to_string()
        } else {
            "linkcast=debug,lc_server=debug,lc_upstream=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Link { target, object } => make_link(target, object, cli.config.as_deref()),
        Commands::Parse { link } => parse_link(&link),
        Commands::Register {
            file,
            owner,
            kind,
            name,
            mime,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(register_file(
                &file,
                owner,
                &kind,
                name.as_deref(),
                mime.as_deref(),
                cli.config.as_deref(),
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("linkcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
