use crate::error::LauncherError;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

// Settings the application refuses to start without.
pub const REQUIRED_KEYS: [&str; 3] = [
    "CONFLUENCE_URL",
    "CONFLUENCE_USERNAME",
    "CONFLUENCE_API_TOKEN",
];

const PLACEHOLDER_PREFIX: &str = "your-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileState {
    Existing,
    Created,
}

// Make sure the working environment file exists, seeding it from the template once.
pub fn ensure_env_file(env_file: &Path, template: &Path) -> Result<EnvFileState> {
    if env_file.exists() {
        return Ok(EnvFileState::Existing);
    }
    if !template.is_file() {
        return Err(LauncherError::MissingFile {
            what: "environment template",
            path: template.to_path_buf(),
        }
        .into());
    }

    let mut source = File::open(template)
        .with_context(|| format!("opening environment template failed: {}", template.display()))?;

    // create_new: a concurrent launcher that got here first wins and we keep its copy.
    let mut dest = match OpenOptions::new().write(true).create_new(true).open(env_file) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(EnvFileState::Existing);
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("creating environment file failed: {}", env_file.display())
            });
        }
    };

    io::copy(&mut source, &mut dest).with_context(|| {
        format!(
            "copying environment template failed: {} -> {}",
            template.display(),
            env_file.display()
        )
    })?;
    Ok(EnvFileState::Created)
}

// Parse dotenv-style `KEY=VALUE` lines. Later keys override earlier ones.
pub fn parse_env(contents: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        values.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    values
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    // Unquoted values may carry a trailing comment.
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

// Required keys that are absent, empty, or still hold the template placeholder.
pub fn unset_required_keys(values: &BTreeMap<String, String>) -> Vec<&'static str> {
    REQUIRED_KEYS
        .into_iter()
        .filter(|key| {
            values
                .get(*key)
                .is_none_or(|value| value.is_empty() || value.starts_with(PLACEHOLDER_PREFIX))
        })
        .collect()
}

// Values are not validated beyond the required keys, so bytes that are not UTF-8 are replaced.
pub fn load_unset_required_keys(env_file: &Path) -> Result<Vec<&'static str>> {
    let bytes = fs::read(env_file)
        .with_context(|| format!("reading environment file failed: {}", env_file.display()))?;
    Ok(unset_required_keys(&parse_env(&String::from_utf8_lossy(&bytes))))
}
