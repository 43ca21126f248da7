//! Supported transformations and the parameters each one takes.

use crate::error::SoxError;
use crate::media::MediaDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Placeholder callers use for "not set" on optional numeric parameters.
pub const UNSET: f64 = -1.0;

/// Map the `UNSET` sentinel onto `None`.
pub fn optional(value: f64) -> Option<f64> {
    if value == UNSET {
        None
    } else {
        Some(value)
    }
}

/// Fade envelope shapes understood by the engine's `fade` effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FadeCurve {
    QuarterSine,
    HalfSine,
    Linear,
    Logarithmic,
    InvertedParabola,
}

impl FadeCurve {
    pub const ALL: [FadeCurve; 5] = [
        FadeCurve::QuarterSine,
        FadeCurve::HalfSine,
        FadeCurve::Linear,
        FadeCurve::Logarithmic,
        FadeCurve::InvertedParabola,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::QuarterSine => "q",
            FadeCurve::HalfSine => "h",
            FadeCurve::Linear => "t",
            FadeCurve::Logarithmic => "l",
            FadeCurve::InvertedParabola => "p",
        }
    }
}

impl FromStr for FadeCurve {
    type Err = SoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FadeCurve::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SoxError::InvalidFadeCurve(s.to_string()))
    }
}

impl TryFrom<String> for FadeCurve {
    type Error = SoxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FadeCurve> for String {
    fn from(curve: FadeCurve) -> Self {
        curve.as_str().to_string()
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a trim writes its result.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutput {
    /// Output path derived from the input (`<input>_trimmed.wav`), with a
    /// volume multiplier applied on the way.
    Derived { volume: f32 },
    /// Caller-supplied output path; `strict_rate` adds the `-r` pair.
    Explicit { output: PathBuf, strict_rate: bool },
}

/// Volume handling for a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixVolume {
    /// Every input at unity gain.
    Uniform,
    /// Each input at its descriptor's `audio_volume`.
    PerFile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ProbeLength {
        input: PathBuf,
    },
    SetVolume {
        input: PathBuf,
        volume: f32,
        output: PathBuf,
    },
    Trim {
        input: PathBuf,
        start: f64,
        length: Option<f64>,
        output: TrimOutput,
    },
    StrictSampleRate {
        input: PathBuf,
        output: PathBuf,
    },
    ConvertFormat {
        input: PathBuf,
        output: PathBuf,
    },
    Pad {
        input: PathBuf,
        output: PathBuf,
        seconds: f64,
    },
    Mix {
        inputs: Vec<MediaDescriptor>,
        output: PathBuf,
        volume: MixVolume,
    },
    Combine {
        inputs: Vec<MediaDescriptor>,
        output: PathBuf,
    },
    ChangeChannels {
        input: PathBuf,
        channels: u32,
        output: PathBuf,
    },
    AdjustVolume {
        input: PathBuf,
        value: f64,
        output: PathBuf,
    },
    /// Negative `start` becomes leading silence of `|start|` seconds on both
    /// channels; any other value delays by zero.
    Delay {
        input: PathBuf,
        start: f64,
    },
    Fade {
        input: PathBuf,
        curve: FadeCurve,
        fade_in: f64,
        stop: Option<f64>,
        fade_out: Option<f64>,
    },
}

impl Operation {
    /// Short stable name, used for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ProbeLength { .. } => "length",
            Operation::SetVolume { .. } => "volume",
            Operation::Trim { .. } => "trim",
            Operation::StrictSampleRate { .. } => "resample",
            Operation::ConvertFormat { .. } => "convert",
            Operation::Pad { .. } => "pad",
            Operation::Mix { .. } => "mix",
            Operation::Combine { .. } => "combine",
            Operation::ChangeChannels { .. } => "channels",
            Operation::AdjustVolume { .. } => "adjust_volume",
            Operation::Delay { .. } => "delay",
            Operation::Fade { .. } => "fade",
        }
    }

    /// Every path the operation reads or names explicitly.
    pub fn paths(&self) -> Vec<&PathBuf> {
        match self {
            Operation::ProbeLength { input }
            | Operation::Delay { input, .. }
            | Operation::Fade { input, .. } => vec![input],
            Operation::Trim { input, output, .. } => match output {
                TrimOutput::Derived { .. } => vec![input],
                TrimOutput::Explicit { output, .. } => vec![input, output],
            },
            Operation::SetVolume { input, output, .. }
            | Operation::StrictSampleRate { input, output }
            | Operation::ConvertFormat { input, output }
            | Operation::Pad { input, output, .. }
            | Operation::ChangeChannels { input, output, .. }
            | Operation::AdjustVolume { input, output, .. } => vec![input, output],
            Operation::Mix { inputs, output, .. } | Operation::Combine { inputs, output } => inputs
                .iter()
                .map(|d| &d.path)
                .chain(std::iter::once(output))
                .collect(),
        }
    }
}
