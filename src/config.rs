//! Archive configuration.
//!
//! An archive may carry an optional `mediavault.toml` at its root. Every
//! field has a default, so a missing file or a partial one is fine:
//!
//! ```toml
//! [ingest]
//! relaxed = false
//! hash_chunk_size = 65536
//!
//! [server]
//! port = 8400
//! bind = "127.0.0.1"
//!
//! [probe]
//! enabled = true
//! ffprobe = "ffprobe"
//! ffmpeg = "ffmpeg"
//! identify = "identify"
//! convert = "convert"
//! timeout_secs = 30
//! thumb_size = 128
//! ```
//!
//! Command-line flags override values loaded from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root of `mediavault.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub ingest: IngestConfig,
    pub server: ServerConfig,
    pub probe: ProbeConfig,
}

/// Ingestion behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Record entries without copying bytes into the store.
    pub dry_run: bool,
    /// Skip hashing when path, mtime and size match an existing entry.
    pub relaxed: bool,
    /// Read buffer size used while hashing.
    pub hash_chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            relaxed: false,
            hash_chunk_size: constants::HASH_CHUNK_SIZE,
        }
    }
}

/// Range server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
            bind: constants::DEFAULT_BIND.to_string(),
        }
    }
}

/// External probe tools and their limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Run probers at all. When off, entries get no media attributes or
    /// thumbnails.
    pub enabled: bool,
    pub ffprobe: String,
    pub ffmpeg: String,
    pub identify: String,
    pub convert: String,
    /// Upper bound on each probe subprocess.
    pub timeout_secs: u64,
    /// Thumbnail bounding box edge, in pixels.
    pub thumb_size: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            identify: "identify".to_string(),
            convert: "convert".to_string(),
            timeout_secs: constants::DEFAULT_PROBE_TIMEOUT_SECS,
            thumb_size: constants::DEFAULT_THUMB_SIZE,
        }
    }
}

impl ArchiveConfig {
    /// Load `mediavault.toml` from the archive root, or defaults if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_for_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        let path = root.as_ref().join(constants::CONFIG_FILE);
        if path.is_file() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A field has an invalid type
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ArchiveConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Zero port, chunk size, timeout or thumbnail size
    /// - Bind address that is not an IP address
    /// - Empty tool name
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Ingest
        if self.ingest.hash_chunk_size == 0 {
            errors.push("ingest.hash_chunk_size cannot be 0".to_string());
        }
        if self.ingest.relaxed {
            warnings.push(
                "ingest.relaxed is on: files matching an archived path, mtime and size \
                 are skipped without hashing, even if their content changed"
                    .to_string(),
            );
        }

        // 2. Server
        if self.server.port == 0 {
            errors.push(
                "Server port cannot be 0. Use a valid port number (1-65535)".to_string(),
            );
        }
        if self.server.port < 1024 && self.server.port > 0 {
            warnings.push(format!(
                "Server port {} is a system/privileged port (< 1024)\n  \
                 Recommendation: Use ports >= 1024 to avoid permission issues",
                self.server.port
            ));
        }
        match self.server.bind.parse::<IpAddr>() {
            Ok(ip) if !ip.is_loopback() => warnings.push(format!(
                "Server binds to {ip}: the archive will be reachable from other hosts"
            )),
            Ok(_) => {},
            Err(_) => errors.push(format!(
                "server.bind must be an IP address (got: '{}')",
                self.server.bind
            )),
        }

        // 3. Probe
        if self.probe.timeout_secs == 0 {
            errors.push("probe.timeout_secs cannot be 0".to_string());
        }
        if self.probe.thumb_size == 0 {
            errors.push("probe.thumb_size cannot be 0".to_string());
        }
        for (field, tool) in [
            ("ffprobe", &self.probe.ffprobe),
            ("ffmpeg", &self.probe.ffmpeg),
            ("identify", &self.probe.identify),
            ("convert", &self.probe.convert),
        ] {
            if tool.trim().is_empty() {
                errors.push(format!("probe.{field} cannot be empty"));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
