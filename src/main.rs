//! # Live Serve Main Application Entry Point
//!
//! This is the main executable for the live-serve development file server.
//! It handles command-line argument parsing, tracing initialization, and
//! server startup.
//!
//! ## Example Usage
//!
//! ```bash
//! # Serve the current directory on port 8080 with live reload
//! cargo run
//!
//! # Serve ./public on port 3000 without watching
//! cargo run -- --port 3000 --dir public --watch false
//!
//! # Read defaults from a JSON5 file, overriding the port
//! cargo run -- --config live-serve.json5 --port 9000
//! ```
//!
//! Log levels can be controlled through the `RUST_LOG` environment variable.

use clap::{ArgAction, Parser};
use live_serve::config::ServerConfig;
use live_serve::error::LiveServeError;
use live_serve::server;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Local development file server with live reload
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Port to run the file server on [default: 8080]
    #[arg(long)]
    port: Option<u16>,

    /// Enable file watching and auto-reload [default: true]
    #[arg(long, action = ArgAction::Set)]
    watch: Option<bool>,

    /// Directory to serve files from [default: .]
    #[arg(long)]
    dir: Option<PathBuf>,

    /// JSON5 file with server settings
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Settings from the config file (or defaults), with flags taking precedence
    fn into_config(self) -> Result<ServerConfig, LiveServeError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(watch) = self.watch {
            config.watch = watch;
        }
        if let Some(dir) = self.dir {
            config.dir = dir;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), LiveServeError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config()?;

    tracing::info!("Starting live-serve");
    tracing::debug!("Configuration: {config:?}");

    server::run(config, CancellationToken::new()).await?;

    tracing::info!("live-serve shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["live-serve"]).unwrap();
        assert_eq!(args.into_config().unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "live-serve",
            "--port",
            "3000",
            "--watch",
            "false",
            "--dir",
            "public",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.port, 3000);
        assert!(!config.watch);
        assert_eq!(config.dir, PathBuf::from("public"));
        assert_eq!(config.debounce_ms, 200);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ port: 9000, dir: 'site', debounce_ms: 50 }").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args =
            Args::try_parse_from(["live-serve", "--config", path.as_str(), "--port", "4000"])
                .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.dir, PathBuf::from("site"));
        assert_eq!(config.debounce_ms, 50);
        assert!(config.watch);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Args::try_parse_from(["live-serve", "--port", "http"]).is_err());
    }
}
