//! `cwdl scan` – list viewer links in a saved page.

use anyhow::{Context, Result};
use cwdl_core::scan::{scan_viewer_links, viewer_link_label};
use std::fs;
use std::path::Path;

pub fn run_scan(path: &Path) -> Result<()> {
    let page = fs::read_to_string(path).with_context(|| format!("read page: {}", path.display()))?;
    let links = scan_viewer_links(&page);
    if links.is_empty() {
        println!("No viewer links found.");
        return Ok(());
    }
    for (i, link) in links.iter().enumerate() {
        match viewer_link_label(link) {
            Some(label) => println!("{:>3}  {}\n     {}", i + 1, label, link),
            None => println!("{:>3}  {}", i + 1, link),
        }
    }
    Ok(())
}
