use anyhow::{Context, Result};
use http::{HeaderMap, HeaderValue, header};
use objstore_client::{
    Container, Payload, RemoteContainer, ReqwestTransport, Transport, content_etag,
};
use std::{io::Write, sync::Arc};
use tracing_subscriber::EnvFilter;

mod config;

use config::{AppConfig, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;
    tracing::debug!("Starting objstore with config: {:?}", cfg);

    // --- Wire collaborators ---
    let transport: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::new(cfg.transport_config()).context("building HTTP transport")?,
    );
    let container = Arc::new(
        RemoteContainer::new(cfg.container.clone(), transport.clone())
            .with_cdn(cfg.cdn_url.clone()),
    );

    match command {
        Command::Head { object } => {
            let handle = container.object(&object).await?;
            match handle.attributes() {
                Some(attributes) => println!("{}", serde_json::to_string_pretty(attributes)?),
                None => anyhow::bail!("object `{}` does not exist", handle),
            }
        }
        Command::Get { object, output } => {
            let handle = container.object(&object).await?;
            match output {
                Some(path) => {
                    let written = handle.save_to_path(&path).await?;
                    tracing::info!("wrote {} bytes to {}", written, path.display());
                }
                None => {
                    let data = handle.read_all(HeaderMap::new()).await?;
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&data)?;
                    stdout.flush()?;
                }
            }
        }
        Command::Put {
            object,
            file,
            content_type,
            verify,
            make_path,
        } => {
            let mut handle = container.object(&object).await?.with_make_path(make_path);
            if content_type.is_none() && !verify {
                handle.load_from_path(&file).await?;
            } else {
                // Explicit headers need the file buffered; --verify needs its digest anyway.
                let data = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?;
                let mut headers = HeaderMap::new();
                if let Some(content_type) = content_type {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_str(&content_type).context("invalid content type")?,
                    );
                }
                if verify {
                    headers.insert(header::ETAG, HeaderValue::from_str(&content_etag(&data))?);
                }
                handle.write(Some(Payload::from(data)), headers).await?;
            }
            println!(
                "{} ({} bytes, etag {})",
                handle,
                handle.size_bytes().unwrap_or_default(),
                handle.etag().unwrap_or("-")
            );
        }
        Command::Meta { object } => {
            let handle = container.object(&object).await?;
            println!("{}", serde_json::to_string_pretty(&handle.metadata())?);
        }
        Command::SetMeta { object, pairs } => {
            let handle = container.object(&object).await?;
            handle.set_metadata(pairs).await?;
            tracing::info!("metadata replaced on {}", handle);
        }
        Command::Url { object } => {
            let handle = container.object(&object).await?;
            match handle.public_url() {
                Some(url) => println!("{}", url),
                None => anyhow::bail!("container `{}` is not public", container.name()),
            }
        }
        Command::Copy {
            object,
            new_name,
            to_container,
        } => {
            let handle = container.object(&object).await?;
            let target: Arc<dyn Container> = match to_container {
                Some(name) => Arc::new(RemoteContainer::new(name, transport.clone())),
                None => container.clone(),
            };
            let copy = handle.copy_to(target, new_name, HeaderMap::new()).await?;
            println!("{}/{}", copy.container_name(), copy);
        }
    }

    Ok(())
}
