use std::{env, net::SocketAddr, path::PathBuf};

use roleplan_admin::{AdminConfig, AdminState, build_admin_app};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if wants_version_flag() {
        println!("{}", binary_version_text());
        return Ok(());
    }

    init_logging();
    info!("{}", binary_version_text());

    let defaults = AdminConfig::default();
    let addr = parse_addr("ROLEPLAN_ADDR", "0.0.0.0:9200")?;
    let config = AdminConfig {
        backend_root: parse_path("ROLEPLAN_BACKEND_ROOT").unwrap_or(defaults.backend_root),
        elevated_role: parse_string("ROLEPLAN_ELEVATED_ROLE", &defaults.elevated_role),
        session_user_header: parse_string(
            "ROLEPLAN_SESSION_USER_HEADER",
            &defaults.session_user_header,
        ),
        session_role_header: parse_string(
            "ROLEPLAN_SESSION_ROLE_HEADER",
            &defaults.session_role_header,
        ),
        role_catalog_path: parse_path("ROLEPLAN_ROLE_CATALOG"),
    };
    info!(
        backend_root = %config.backend_root.display(),
        elevated_role = %config.elevated_role,
        "admin configuration loaded"
    );

    let state = AdminState::new(config)?;
    let app = build_admin_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("role allocation admin listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_logging() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn parse_addr(key: &str, default: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    Ok(value.parse()?)
}

fn parse_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_path(key: &str) -> Option<PathBuf> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn wants_version_flag() -> bool {
    env::args()
        .skip(1)
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
}

fn binary_version_text() -> String {
    version_text(
        env!("CARGO_PKG_NAME"),
        option_env!("ROLEPLAN_BUILD_GIT_TAG").unwrap_or("untagged"),
        option_env!("ROLEPLAN_BUILD_GIT_COMMIT").unwrap_or("unknown"),
        option_env!("ROLEPLAN_BUILD_GIT_DIRTY").unwrap_or("false"),
    )
}

fn version_text(binary: &str, git_tag: &str, git_commit: &str, git_dirty: &str) -> String {
    let dirty = matches!(git_dirty, "true" | "1" | "yes" | "dirty");
    let suffix = if dirty { ", dirty" } else { "" };
    format!("{binary} {git_tag} (commit {git_commit}{suffix})")
}
