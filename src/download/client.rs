use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::cache::GeodataCache;
use crate::boundary::{BoundaryPass, BOUNDARY_PASSES};
use crate::ui::Reporter;

const BASE_URL: &str = "https://github.com/wmgeolab/geoBoundaries/raw/main/releaseData/gbOpen/BGD";

/// Simplified geoBoundaries file for a pass
pub fn boundary_url(pass: &BoundaryPass) -> String {
    format!(
        "{base}/{level}/geoBoundaries-BGD-{level}_simplified.geojson",
        base = BASE_URL,
        level = pass.admin_level
    )
}

pub struct BoundaryClient {
    client: Client,
}

impl BoundaryClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("qos-poc-loader/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Download one boundary file.
    ///
    /// Bytes go to a `.part` file that is renamed into place once complete.
    pub fn download(&self, url: &str, dest: &Path, reporter: &mut impl Reporter) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download {}", url))?;

        let total_size = response.content_length().unwrap_or(0);
        let part = dest.with_extension("part");
        let mut file = File::create(&part).context("Failed to create destination file")?;

        let mut downloaded: u64 = 0;
        let mut buffer = [0u8; 8192];
        let mut reader = response;

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .context("Failed to read from response")?;

            if bytes_read == 0 {
                break;
            }

            file.write_all(&buffer[..bytes_read])
                .context("Failed to write to file")?;

            downloaded += bytes_read as u64;
            reporter.set_progress(downloaded, total_size, "download");
        }
        reporter.clear_progress();

        file.flush().context("Failed to write to file")?;
        fs::rename(&part, dest).with_context(|| format!("Failed to move {:?} into place", part))?;

        reporter.log(format!("  {} -> {:?}", format_bytes(downloaded, total_size), dest));
        Ok(downloaded)
    }
}

/// Make sure every boundary file is present, fetching what is missing
pub fn ensure_boundaries(
    cache: &GeodataCache,
    force: bool,
    reporter: &mut impl Reporter,
) -> Result<Vec<PathBuf>> {
    let mut client: Option<BoundaryClient> = None;
    let mut paths = Vec::new();

    for pass in BOUNDARY_PASSES {
        let path = cache.path_for(pass);

        if cache.is_cached(pass) && !force {
            reporter.log(format!("Using cached {} boundaries: {:?}", pass.label, path));
        } else {
            reporter.log(format!("Downloading {} boundaries ({})...", pass.label, pass.admin_level));
            if client.is_none() {
                client = Some(BoundaryClient::new()?);
            }
            if let Some(client) = &client {
                client.download(&boundary_url(pass), &path, reporter)?;
            }
        }

        paths.push(path);
    }

    Ok(paths)
}

/// Format bytes as human-readable string
fn format_bytes(current: u64, total: u64) -> String {
    fn fmt(bytes: u64) -> String {
        if bytes >= 1_000_000_000 {
            format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
        } else if bytes >= 1_000_000 {
            format!("{:.1} MB", bytes as f64 / 1_000_000.0)
        } else if bytes >= 1_000 {
            format!("{:.1} KB", bytes as f64 / 1_000.0)
        } else {
            format!("{} B", bytes)
        }
    }
    if total == 0 {
        return fmt(current);
    }
    format!("{} / {}", fmt(current), fmt(total))
}
