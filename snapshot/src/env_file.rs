//! Optional `KEY=VALUE` environment file for collector processes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Load extra collector environment from a `KEY=VALUE` file.
///
/// A missing file is not an error: scheduled runs work without one, so the
/// lookup yields an empty map. Blank lines and `#` comments are skipped,
/// malformed lines are reported and skipped, and values may be wrapped in
/// single or double quotes. Keys and values are otherwise opaque.
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "env file missing, skipping");
        return Ok(BTreeMap::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read env file {}", path.display()))?;

    let mut vars = BTreeMap::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(path = %path.display(), line = index + 1, "ignoring env line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            warn!(path = %path.display(), line = index + 1, "ignoring env line with empty key");
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    debug!(path = %path.display(), count = vars.len(), "env file loaded");
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
