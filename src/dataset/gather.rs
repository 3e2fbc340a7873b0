use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{error, info};

use crate::error::{DataVersionError, Result};

/// Download `url` to `output_path`, creating parent directories.
///
/// Non-2xx responses are errors. The body is streamed to disk.
///
/// # Returns
/// * `Ok(bytes)` - Number of bytes written
pub fn download(url: &str, output_path: &Path) -> Result<u64> {
    if url.trim().is_empty() {
        return Err(DataVersionError::config("data_url is not set"));
    }

    match fetch_to_file(url, output_path) {
        Ok(bytes) => {
            info!(url, path = %output_path.display(), bytes, "data downloaded");
            Ok(bytes)
        }
        Err(e) => {
            error!(url, error = %e, "error downloading data");
            Err(e)
        }
    }
}

fn fetch_to_file(url: &str, output_path: &Path) -> Result<u64> {
    let mut response = reqwest::blocking::get(url)?.error_for_status()?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(output_path)?);
    let bytes = response.copy_to(&mut writer)?;
    writer.flush()?;
    Ok(bytes)
}
