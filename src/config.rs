// Configuration module: the `.canvas` JSON file holding the Canvas URL, the
// API token and the course the other commands operate on. The file format is
// shared with earlier versions of the tool, so field names stay as they are.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = ".canvas";

/// Persistent settings read from `.canvas`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub current_course_id: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: "https://your-institution.instructure.com".into(),
            api_key: "your-token".into(),
            current_course_id: None,
        }
    }
}

impl Config {
    /// Load the config at `path`. A missing file, or one that is not JSON at
    /// all, is replaced by the default config, which is written back so the
    /// user can edit it. JSON that does not fit the config shape is an error
    /// and the file is left untouched.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::write_default(path),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()))
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&data) {
            Ok(value) => value,
            Err(_) => return Self::write_default(path),
        };
        let config = serde_json::from_value(value)
            .with_context(|| format!("Invalid settings in config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn write_default(path: &Path) -> Result<Self> {
        warn!(path = %path.display(), "no usable config found, writing defaults");
        let config = Config::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Write the config as four-space indented JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser).context("Serializing config")?;
        std::fs::write(path, out)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// The course every course-scoped command works on.
    pub fn require_course(&self) -> Result<u64> {
        self.current_course_id
            .context("No course is currently set; run `canvas set course <id>` first")
    }

    /// URL and key after applying `CANVAS_API_URL` / `CANVAS_API_KEY`.
    pub fn credentials(&self) -> (String, String) {
        let url = std::env::var("CANVAS_API_URL").unwrap_or_else(|_| self.api_url.clone());
        let key = std::env::var("CANVAS_API_KEY").unwrap_or_else(|_| self.api_key.clone());
        (url, key)
    }
}

/// Where the config lives: `$CANVAS_CONFIG`, then `./.canvas`, then
/// `~/.canvas`. New files are created in the working directory.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CANVAS_CONFIG") {
        return PathBuf::from(path);
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    match dirs::home_dir().map(|home| home.join(CONFIG_FILE)) {
        Some(global) if global.exists() => global,
        _ => local,
    }
}

/// Show only the ends of an API key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}
