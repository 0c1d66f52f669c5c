use anyhow::Context;
use skystash::{Credentials, Retry, StorageClientBuilder};
use skystash_server::{app, AppState};
use std::env;
use std::sync::Arc;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORAGE_URL: &str = "https://storage.skystash.dev";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let bucket = env::var("SKYSTASH_STORAGE_BUCKET")
        .context("SKYSTASH_STORAGE_BUCKET is not set")?;
    let storage_url =
        env::var("SKYSTASH_STORAGE_URL").unwrap_or_else(|_| DEFAULT_STORAGE_URL.to_owned());

    let mut builder = StorageClientBuilder::new(&storage_url).bucket(&bucket);
    match Credentials::from_env() {
        Ok(credentials) => {
            builder = builder.credentials(credentials);
        }
        Err(err) => {
            log::warn!(
                "no privileged storage credentials ({}); falling back to proxy downloads",
                err
            );
        }
    }
    let client = builder.build()?;

    let state = AppState {
        store: Arc::new(client),
        retry: Retry::default(),
    };

    let addr = env::var("SKYSTASH_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_owned());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    log::info!("listening on {}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
