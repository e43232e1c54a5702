use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::envelope::JsonLimits;
use api_rest::{ApiConfig, AppState, router};
use webmod_files::{
    UploadConfig, allowed_types_from_env_value, max_bytes_from_env_value, rename_from_env_value,
};

/// Main entry point for the webmod server
///
/// Resolves the configuration once from the environment and serves the REST API.
///
/// # Environment Variables
/// - `WEBMOD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WEBMOD_UPLOAD_DIR`: Destination directory for uploads (default: "uploads")
/// - `WEBMOD_DOWNLOAD_DIR`: Directory served by the download endpoint (default: "static")
/// - `WEBMOD_MAX_UPLOAD_BYTES`: Upper bound for a multipart body (default: 1 GiB)
/// - `WEBMOD_ALLOWED_TYPES`: Comma-separated media type allow-list (default: any type)
/// - `WEBMOD_RENAME_UPLOADS`: Store uploads under random names by default (default: true)
/// - `WEBMOD_MAX_JSON_BYTES`: Upper bound for JSON request bodies (default: 1 MiB)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("webmod=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WEBMOD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = api_config_from_env()?;

    tracing::info!("++ Upload directory: {}", cfg.upload_dir().display());
    tracing::info!("++ Download directory: {}", cfg.download_dir().display());
    tracing::info!("++ Starting webmod REST on {}", rest_addr);

    let app = router(AppState::new(cfg));

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("failed to bind {rest_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn api_config_from_env() -> anyhow::Result<ApiConfig> {
    let upload_dir = env_value("WEBMOD_UPLOAD_DIR").unwrap_or_else(|| "uploads".into());
    let download_dir = env_value("WEBMOD_DOWNLOAD_DIR").unwrap_or_else(|| "static".into());

    let max_total_bytes = max_bytes_from_env_value(env_value("WEBMOD_MAX_UPLOAD_BYTES"))
        .context("WEBMOD_MAX_UPLOAD_BYTES")?;
    let allowed = allowed_types_from_env_value(env_value("WEBMOD_ALLOWED_TYPES"));
    let rename_by_default = rename_from_env_value(env_value("WEBMOD_RENAME_UPLOADS"))
        .context("WEBMOD_RENAME_UPLOADS")?;
    let max_json_bytes = max_json_bytes_from_env_value(env_value("WEBMOD_MAX_JSON_BYTES"))?;

    if allowed.is_empty() {
        tracing::warn!("WEBMOD_ALLOWED_TYPES is empty, every media type is accepted");
    }

    Ok(ApiConfig::new(
        PathBuf::from(upload_dir),
        PathBuf::from(download_dir),
        UploadConfig::new(Some(max_total_bytes), allowed),
        rename_by_default,
        JsonLimits::new(max_json_bytes),
    ))
}

fn max_json_bytes_from_env_value(value: Option<String>) -> anyhow::Result<Option<usize>> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .with_context(|| format!("invalid WEBMOD_MAX_JSON_BYTES {v:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_json_bytes_from_env_value() {
        assert_eq!(max_json_bytes_from_env_value(None).unwrap(), None);
        assert_eq!(max_json_bytes_from_env_value(Some(" ".into())).unwrap(), None);
        assert_eq!(
            max_json_bytes_from_env_value(Some("2048".into())).unwrap(),
            Some(2048)
        );
        assert!(max_json_bytes_from_env_value(Some("lots".into())).is_err());
    }
}
