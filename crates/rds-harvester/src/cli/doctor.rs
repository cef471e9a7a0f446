//! Environment readiness check.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use crate::config::{REGISTRY_ORIGIN, SEARCH_ENDPOINT};
use crate::renderer::chromium::find_chromium;
use crate::session::validate_token;

/// Check Chromium availability and any token in the environment.
pub async fn run(chromium: Option<PathBuf>) -> Result<()> {
    println!("RDS Harvester Doctor");
    println!("====================");
    println!();

    println!("OS:       {}", std::env::consts::OS);
    println!("Arch:     {}", std::env::consts::ARCH);
    println!("Registry: {REGISTRY_ORIGIN}");
    println!("Search:   {SEARCH_ENDPOINT}");
    println!();

    let chromium_path = find_chromium(chromium.as_ref());
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set RDS_CHROMIUM_PATH."
        ),
    }

    match std::env::var("RDS_TOKEN") {
        Ok(token) if !token.trim().is_empty() => match validate_token(&token, Utc::now()) {
            Ok(expires_at) => println!("[OK] RDS_TOKEN valid until {expires_at}"),
            Err(e) => println!("[!!] RDS_TOKEN unusable: {e}"),
        },
        _ => println!("[--] RDS_TOKEN not set; the token will be read through the browser"),
    }

    match std::env::var("RDS_PROXY") {
        Ok(proxy) if !proxy.trim().is_empty() => println!("[OK] Proxy: {proxy}"),
        _ => println!("[--] No proxy configured"),
    }

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  A browser is required for token extraction and contact enrichment.");
    }

    Ok(())
}
