//! Language server for RPM spec files
//!
//! Usage:
//!   rpmspec-lsp --stdio                    - Serve one editor over stdin/stdout
//!   rpmspec-lsp [--host <host>] [--port <port>]   - Serve editors connecting over TCP

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rpmspec_analysis::{FsMacroFileReader, LocalExpander, MacroResolver, ResolverSettings};
use rpmspec_config::{user_config_path, ConfigError, ExpanderKind, Loader, RpmSpecConfig};
use rpmspec_lsp::{logging, DefaultFeatureProvider, RpmCli, RpmError, RpmSpecLanguageServer};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

#[derive(Debug, Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot set up logging: {0}")]
    Logging(#[source] io::Error),
    #[error(transparent)]
    Rpm(#[from] RpmError),
    #[error("cannot listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: io::Error,
    },
}

fn cli() -> Command {
    Command::new("rpmspec-lsp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Language server for RPM spec files")
        .arg(
            Arg::new("stdio")
                .long("stdio")
                .help("Serve over stdin/stdout instead of TCP")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .help("Address to listen on (default from configuration: 127.0.0.1)"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("TCP port to listen on (default from configuration: 2087)")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the defaults")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write logs to this file instead of stderr")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("More logging; repeat for debug output")
                .action(ArgAction::Count),
        )
}

fn load_config(matches: &ArgMatches) -> Result<RpmSpecConfig, ConfigError> {
    let mut loader = Loader::new();
    if let Some(path) = user_config_path() {
        loader = loader.with_optional_file(path);
    }
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }
    loader = loader.with_env();

    if let Some(host) = matches.get_one::<String>("host") {
        loader = loader.set_override("server.host", host.as_str())?;
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        loader = loader.set_override("server.port", i64::from(*port))?;
    }
    if let Some(path) = matches.get_one::<PathBuf>("log-file") {
        loader = loader.set_override("logging.file", path.display().to_string())?;
    }
    loader.build()
}

fn feature_provider(config: &RpmSpecConfig) -> Result<DefaultFeatureProvider, RpmError> {
    let rpm = RpmCli::new(&config.macros.rpm_binary);
    let session = Arc::new(rpm.load_macro_table()?);
    let resolver = MacroResolver::new(
        Arc::clone(&session),
        rpm.clone(),
        FsMacroFileReader,
        ResolverSettings {
            macro_dir: config.macros.macro_dir.clone(),
            builtin_macro_file: config.macros.builtin_macro_file.clone(),
        },
    );
    Ok(match config.macros.expander {
        ExpanderKind::Rpm => DefaultFeatureProvider::new(resolver, rpm),
        ExpanderKind::Local => DefaultFeatureProvider::new(resolver, LocalExpander::new(session)),
    })
}

async fn run(matches: ArgMatches) -> Result<(), StartupError> {
    let config = load_config(&matches)?;
    let level = logging::level_for(&config.logging.level, matches.get_count("verbose"));
    logging::init(level, config.logging.file.as_deref()).map_err(StartupError::Logging)?;

    let features = Arc::new(feature_provider(&config)?);
    let completion = config.completion.clone();
    let concurrency = config.server.concurrency.max(1);

    if matches.get_flag("stdio") {
        tracing::info!("serving over stdio");
        let (service, socket) = LspService::new(move |client| {
            RpmSpecLanguageServer::with_features(client, features).with_completion_config(completion)
        });
        Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
            .concurrency_level(concurrency)
            .serve(service)
            .await;
        return Ok(());
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Listen {
            address: address.clone(),
            source,
        })?;
    tracing::info!(%address, "listening for clients");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::warn!(%err, "failed to accept connection");
                continue;
            }
        };
        tracing::info!(%peer, "client connected");
        let features = Arc::clone(&features);
        let completion = completion.clone();
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            let (service, socket) = LspService::new(move |client| {
                RpmSpecLanguageServer::with_features(client, features)
                    .with_completion_config(completion)
            });
            Server::new(read, write, socket)
                .concurrency_level(concurrency)
                .serve(service)
                .await;
            tracing::info!(%peer, "client disconnected");
        });
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rpmspec-lsp: {err}");
            ExitCode::FAILURE
        }
    }
}
