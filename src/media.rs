//! Per-asset description used when an operation needs attributes of each
//! input rather than one shared parameter.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    pub format: Option<String>,
    pub mime_type: Option<String>,

    pub width: Option<u32>,
    pub height: Option<u32>,

    pub video_codec: Option<String>,
    pub video_fps: Option<String>,
    pub video_bitrate: Option<u32>,
    pub video_bitstream_filter: Option<String>,

    pub audio_codec: Option<String>,
    pub audio_channels: Option<u32>,
    pub audio_bitrate: Option<u32>,
    pub audio_quality: Option<String>,
    /// Multiplier applied to this asset when mixing or combining.
    pub audio_volume: f32,
    pub audio_bitstream_filter: Option<String>,

    /// `HH:MM:SS` or plain seconds.
    pub start_time: Option<String>,
    pub duration: Option<String>,

    pub video_filter: Option<String>,
    pub audio_filter: Option<String>,

    pub qscale: Option<String>,
    pub aspect: Option<String>,
    pub pass_count: u32,
}

impl MediaDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.audio_volume = volume;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_audio(&self) -> bool {
        self.mime_starts_with("audio")
    }

    pub fn is_video(&self) -> bool {
        self.mime_starts_with("video")
    }

    pub fn is_image(&self) -> bool {
        self.mime_starts_with("image")
    }

    fn mime_starts_with(&self, kind: &str) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.starts_with(kind))
            .unwrap_or(false)
    }
}

impl Default for MediaDescriptor {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            format: None,
            mime_type: None,
            width: None,
            height: None,
            video_codec: None,
            video_fps: None,
            video_bitrate: None,
            video_bitstream_filter: None,
            audio_codec: None,
            audio_channels: None,
            audio_bitrate: None,
            audio_quality: None,
            audio_volume: 1.0,
            audio_bitstream_filter: None,
            start_time: None,
            duration: None,
            video_filter: None,
            audio_filter: None,
            qscale: None,
            aspect: None,
            pass_count: 1,
        }
    }
}
