//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Trackify web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Per-user API keys from environment (comma-separated "user:key" pairs)
    let api_keys =
        trackify_server::parse_api_keys(&std::env::var("TRACKIFY_API_KEYS").unwrap_or_default());

    if no_auth {
        println!();
        println!(
            "   ⚠️  Authentication DISABLED - requests act as '{}'",
            trackify_server::LOCAL_DEV_USER
        );
        println!("      Do not expose to network!");
    } else {
        println!("   🔒 Authentication: Cloudflare Access (header only)");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (TRACKIFY_API_KEYS)",
                api_keys.len()
            );
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = trackify_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("Static directory path must be valid UTF-8"))
        .transpose()?;
    trackify_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
