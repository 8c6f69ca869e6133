use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use objstore_client::TransportConfig;
use std::{env, path::PathBuf, time::Duration};

/// Centralized client configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_url: String,
    pub auth_token: Option<String>,
    pub container: String,
    pub cdn_url: Option<String>,
    pub timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and transfer objects in a storage container")]
pub struct Args {
    /// Account storage URL (overrides OBJSTORE_STORAGE_URL)
    #[arg(long)]
    pub storage_url: Option<String>,

    /// Session token sent as X-Auth-Token (overrides OBJSTORE_AUTH_TOKEN)
    #[arg(long)]
    pub auth_token: Option<String>,

    /// Container holding the objects (overrides OBJSTORE_CONTAINER)
    #[arg(long)]
    pub container: Option<String>,

    /// CDN base URL; marks the container public (overrides OBJSTORE_CDN_URL)
    #[arg(long)]
    pub cdn_url: Option<String>,

    /// Request timeout in seconds (overrides OBJSTORE_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the object's attributes as JSON
    Head { object: String },
    /// Download the object to stdout or a file
    Get {
        object: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upload a local file
    Put {
        object: String,
        file: PathBuf,
        /// Explicit content type instead of the inferred one
        #[arg(long)]
        content_type: Option<String>,
        /// Send the MD5 of the file so the service verifies the upload
        #[arg(long)]
        verify: bool,
        /// Create directory markers for parent paths
        #[arg(long)]
        make_path: bool,
    },
    /// Print the decoded user metadata
    Meta { object: String },
    /// Replace the user metadata with KEY=VALUE pairs
    SetMeta {
        object: String,
        #[arg(value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
    /// Print the public CDN URL, if any
    Url { object: String },
    /// Server-side copy into another (or the same) container
    Copy {
        object: String,
        new_name: String,
        #[arg(long)]
        to_container: Option<String>,
    },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_timeout = match env::var("OBJSTORE_TIMEOUT_SECS") {
            Ok(value) => Some(
                value
                    .parse::<u64>()
                    .with_context(|| format!("parsing OBJSTORE_TIMEOUT_SECS value `{}`", value))?,
            ),
            Err(env::VarError::NotPresent) => None,
            Err(err) => return Err(err).context("reading OBJSTORE_TIMEOUT_SECS"),
        };

        // --- Merge ---
        let storage_url = args
            .storage_url
            .or_else(|| env::var("OBJSTORE_STORAGE_URL").ok())
            .ok_or_else(|| {
                anyhow!("no storage URL: pass --storage-url or set OBJSTORE_STORAGE_URL")
            })?;
        let container = args
            .container
            .or_else(|| env::var("OBJSTORE_CONTAINER").ok())
            .ok_or_else(|| anyhow!("no container: pass --container or set OBJSTORE_CONTAINER"))?;

        let cfg = Self {
            storage_url,
            auth_token: args.auth_token.or_else(|| env::var("OBJSTORE_AUTH_TOKEN").ok()),
            container,
            cdn_url: args.cdn_url.or_else(|| env::var("OBJSTORE_CDN_URL").ok()),
            timeout: args.timeout_secs.or(env_timeout).map(Duration::from_secs),
        };

        Ok((cfg, args.command))
    }

    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new(self.storage_url.clone());
        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(token.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_request_timeout(timeout);
        }
        config
    }
}

/// Split `key=value`; the value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", raw)),
    }
}
