//! Media probing: attribute extraction and thumbnail generation.
//!
//! Probers never fail. A file they cannot parse, a missing tool or a
//! subprocess that runs past its timeout all produce an empty
//! [`ProbeResult`], which the ingest pipeline treats as "no extra metadata".
//!
//! The default implementation, [`ToolProber`], shells out to `ffprobe`/
//! `ffmpeg` for audio and video and to ImageMagick for still images.

mod image;
mod tool;
mod video;

pub use image::parse_identify;
pub use video::parse_ffprobe;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::catalog::Attribute;
use crate::config::ProbeConfig;

/// Coarse media kind selecting which toolkit probes a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video or audio stream.
    Video,
}

impl MediaKind {
    /// Classify a MIME type; `None` means the file is not probed.
    pub fn from_mime(mime: Option<&str>) -> Option<Self> {
        let mime = mime?;
        if mime.starts_with("video/") || mime.starts_with("audio/") {
            Some(Self::Video)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// Attributes and optional thumbnail extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Extracted attributes, in the order the prober found them.
    pub attributes: Vec<Attribute>,
    /// Encoded JPEG thumbnail.
    pub thumbnail: Option<Vec<u8>>,
}

impl ProbeResult {
    /// A result carrying nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Extracts metadata from a media file.
///
/// Implementations must be read-only with respect to the archive and must
/// not return errors: failures become an empty result.
#[async_trait]
pub trait MediaProber: Send + Sync + 'static {
    /// Probe `path`, which is known to be of `kind`.
    async fn probe(&self, path: &Path, kind: MediaKind) -> ProbeResult;
}

/// Prober that never finds anything. Used when probing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProber;

#[async_trait]
impl MediaProber for NullProber {
    async fn probe(&self, _path: &Path, _kind: MediaKind) -> ProbeResult {
        ProbeResult::empty()
    }
}

/// Prober backed by external toolkits run as subprocesses.
///
/// Every subprocess is bounded by the configured timeout and killed if it
/// overruns.
#[derive(Debug, Clone)]
pub struct ToolProber {
    config: ProbeConfig,
}

impl ToolProber {
    /// Create a prober using the given tool paths and limits.
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl MediaProber for ToolProber {
    async fn probe(&self, path: &Path, kind: MediaKind) -> ProbeResult {
        let result = match kind {
            MediaKind::Video => video::probe(&self.config, path, self.timeout()).await,
            MediaKind::Image => image::probe(&self.config, path, self.timeout()).await,
        };
        debug!(
            path = %path.display(),
            ?kind,
            attributes = result.attributes.len(),
            thumbnail = result.thumbnail.is_some(),
            "Probed media"
        );
        result
    }
}
