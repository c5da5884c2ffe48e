use clap::{Arg, Command};
use log::LevelFilter;
use spamgate::config::Config;
use spamgate::events::LogSink;
use spamgate::pipeline::Gateway;
use spamgate::protocol::{KeyStatus, OriginContext, Verdict};
use spamgate::store::{CommentRecord, ContentItem};
use spamgate::transport::HttpClient;
use spamgate::verifier::KeyVerifier;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Offline comment fixture for `--check-comment`.
#[derive(serde::Deserialize)]
struct CommentFixture {
    record: CommentRecord,
    #[serde(default)]
    post: Option<ContentItem>,
    #[serde(default)]
    origin: OriginContext,
}

#[tokio::main]
async fn main() {
    let matches = Command::new("spamgate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Spam-classification gateway for user comments")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/spamgate.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write a default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verify-key")
                .long("verify-key")
                .help("Verify the configured credential against the service")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-comment")
                .long("check-comment")
                .value_name("FILE")
                .help("Classify a comment fixture file against the live service")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = Config::default().to_file(path) {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
        println!("Default configuration written to {path}");
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration from {config_path}: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        match config.validate() {
            Ok(()) => {
                println!("Configuration is valid.");
                if config.api_key.is_none() {
                    println!("Note: no credential configured; the pipeline will not run.");
                }
            }
            Err(e) => {
                eprintln!("Configuration invalid: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let transport = Arc::new(HttpClient::new(
        config.service_port,
        Duration::from_secs(config.connect_timeout_secs),
        config.user_agent(),
        config.site_charset.clone(),
    ));

    if matches.get_flag("verify-key") {
        verify_key(config, config_path, transport).await;
        return;
    }

    if let Some(fixture_path) = matches.get_one::<String>("check-comment") {
        check_comment(config, fixture_path, transport).await;
        return;
    }

    eprintln!("Nothing to do. See --help for available operations.");
    process::exit(2);
}

async fn verify_key(mut config: Config, config_path: &str, transport: Arc<HttpClient>) {
    let verifier = KeyVerifier::new(&config, transport);
    match verifier.verify_stored(&mut config).await {
        Some(KeyStatus::Valid) => println!("Credential verified."),
        Some(KeyStatus::Invalid) => {
            // verify_stored already cleared the key; persist that.
            if let Err(e) = config.to_file(config_path) {
                eprintln!("Failed to update {config_path}: {e}");
            }
            eprintln!("The credential was rejected by the service and has been cleared.");
            process::exit(1);
        }
        Some(KeyStatus::Failed) => {
            eprintln!(
                "The credential could not be verified: no connection to {}. \
                 This is a connectivity problem, not a statement about the key.",
                config.service_host
            );
            process::exit(1);
        }
        None => {
            if verifier.probe().await {
                eprintln!("No credential configured. Obtain one and set api_key.");
            } else {
                eprintln!(
                    "No credential configured, and {} is unreachable. \
                     Check the network before entering a key.",
                    config.service_host
                );
            }
            process::exit(1);
        }
    }
}

async fn check_comment(config: Config, fixture_path: &str, transport: Arc<HttpClient>) {
    let fixture: CommentFixture = match std::fs::read_to_string(fixture_path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_yaml::from_str(&text).map_err(anyhow::Error::from))
    {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("Error reading fixture {fixture_path}: {e}");
            process::exit(1);
        }
    };

    let gateway = match Gateway::new(config, transport, Arc::new(LogSink)) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let verdict = gateway
        .check(&fixture.record, fixture.post.as_ref(), &fixture.origin)
        .await;
    match verdict {
        Verdict::Spam => println!("spam"),
        Verdict::Ham => println!("ham"),
        Verdict::Unknown => println!("unknown"),
        Verdict::Unreachable => {
            eprintln!("unreachable (the comment would be accepted unclassified)");
            process::exit(1);
        }
    }
}
