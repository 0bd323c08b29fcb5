//! `cwdl resolve` – resolve one viewer link.

use anyhow::{Context, Result};
use cwdl_core::config::CwdlConfig;
use cwdl_core::Resolver;

pub async fn run_resolve(cfg: &CwdlConfig, url: &str, json: bool) -> Result<()> {
    let resolver = Resolver::with_http_options(cfg.probe_options());
    let link = resolver
        .resolve(url)
        .await
        .with_context(|| format!("resolve {}", url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&link)?);
        return Ok(());
    }
    println!("url:      {}", link.url);
    println!("filename: {}", link.filename);
    if link.unresolved {
        println!("note:     no known link pattern matched; URL kept as returned by the viewer");
    }
    for param in &link.warnings {
        println!("warning:  unrecognised signing parameter {}", param);
    }
    Ok(())
}
