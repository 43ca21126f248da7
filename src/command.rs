//! Token sequences for the sox engine.
//!
//! The engine reads its arguments positionally, so each operation has one
//! exact shape:
//!
//! ```text
//! length     sox <in> -n stat
//! volume     sox -v <vol> <in> <out>
//! trim       sox -v <vol> <in> -e signed-integer -b 16 <in>_trimmed.wav trim <start> [<len>]
//! trim (to)  sox <in> [-r <rate>] -e signed-integer -b 16 <out> trim <start> [<len>]
//! resample   sox <in> -r <rate> <out>
//! convert    sox <in> <out>
//! pad        sox <in> <out> pad <secs>
//! mix        sox -m (-v <vol> <file>)... <out>
//! combine    sox (-v <vol> <file>)... <out>
//! channels   sox <in> -c <n> <out>
//! adjust     sox -v <value> <in> <out>
//! delay      sox <in> -e signed-integer -b 16 <in>_delayed.wav delay <d> <d>
//! fade       sox <in> <in>_faded.wav fade <curve> <in-len> [<stop>] [<out-len>]
//! ```
//!
//! The sequence is later joined with single spaces and handed over without
//! quoting, which is why every path is checked for whitespace before the
//! first token is produced.

use crate::catalog::{optional, MixVolume, Operation, TrimOutput};
use crate::config::SoxConfig;
use crate::error::{Result, SoxError};
use crate::format;
use std::fmt;
use std::path::{Path, PathBuf};

pub const TRIMMED_SUFFIX: &str = "_trimmed.wav";
pub const DELAYED_SUFFIX: &str = "_delayed.wav";
pub const FADED_SUFFIX: &str = "_faded.wav";

const UNITY_VOLUME: &str = "1.0";

/// An immutable, fully built engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoxCommand {
    tokens: Vec<String>,
    output: Option<PathBuf>,
}

impl SoxCommand {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Artifact the run is expected to produce, if any.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Tokens joined by single spaces, the engine's native invocation form.
    pub fn invocation(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for SoxCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.invocation())
    }
}

/// Accumulates tokens in order. Paths must already be validated.
struct CommandBuilder {
    tokens: Vec<String>,
    output: Option<PathBuf>,
}

impl CommandBuilder {
    fn new(binary: &str) -> Self {
        Self {
            tokens: vec![binary.to_string()],
            output: None,
        }
    }

    fn arg(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    fn args(mut self, tokens: &[&str]) -> Self {
        self.tokens.extend(tokens.iter().map(|s| s.to_string()));
        self
    }

    fn path(mut self, path: &Path) -> Self {
        self.tokens.push(path.to_string_lossy().into_owned());
        self
    }

    fn seconds(self, value: f64) -> Self {
        self.arg(format::seconds(value))
    }

    /// Skip the token when the value is absent or the `-1` sentinel.
    fn optional_seconds(self, value: Option<f64>) -> Self {
        match value.and_then(optional) {
            Some(v) => self.seconds(v),
            None => self,
        }
    }

    fn volume_flag(self, volume: &str) -> Self {
        self.arg("-v").arg(volume)
    }

    fn sixteen_bit_signed(self) -> Self {
        self.args(&["-e", "signed-integer", "-b", "16"])
    }

    /// Append the output path token and record it as the expected artifact.
    fn output(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self.path(path)
    }

    fn build(self) -> SoxCommand {
        SoxCommand {
            tokens: self.tokens,
            output: self.output,
        }
    }
}

/// Reject paths the space-joined invocation cannot carry.
pub fn validate_path(path: &Path) -> Result<()> {
    let s = path
        .to_str()
        .ok_or_else(|| SoxError::InvalidPath(path.to_string_lossy().into_owned()))?;
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return Err(SoxError::InvalidPath(s.to_string()));
    }
    Ok(())
}

/// `<input><suffix>`, keeping the input exactly as given.
pub fn derived_output(input: &Path, suffix: &str) -> PathBuf {
    let mut s = input.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Validate `op` and produce its token sequence.
pub fn build(config: &SoxConfig, op: &Operation) -> Result<SoxCommand> {
    validate_path(Path::new(&config.binary))?;
    for path in op.paths() {
        validate_path(path)?;
    }
    validate_parameters(op)?;

    let rate = config.strict_sample_rate.to_string();
    let cmd = CommandBuilder::new(&config.binary);

    let cmd = match op {
        Operation::ProbeLength { input } => cmd.path(input).args(&["-n", "stat"]),

        Operation::SetVolume {
            input,
            volume,
            output,
        } => cmd
            .volume_flag(&format::volume(*volume))
            .path(input)
            .output(output),

        Operation::Trim {
            input,
            start,
            length,
            output: TrimOutput::Derived { volume },
        } => cmd
            .volume_flag(&format::volume(*volume))
            .path(input)
            .sixteen_bit_signed()
            .output(&derived_output(input, TRIMMED_SUFFIX))
            .arg("trim")
            .seconds(*start)
            .optional_seconds(*length),

        Operation::Trim {
            input,
            start,
            length,
            output:
                TrimOutput::Explicit {
                    output,
                    strict_rate,
                },
        } => {
            let cmd = cmd.path(input);
            let cmd = if *strict_rate {
                cmd.args(&["-r", &rate])
            } else {
                cmd
            };
            cmd.sixteen_bit_signed()
                .output(output)
                .arg("trim")
                .seconds(*start)
                .optional_seconds(*length)
        }

        Operation::StrictSampleRate { input, output } => {
            cmd.path(input).args(&["-r", &rate]).output(output)
        }

        Operation::ConvertFormat { input, output } => cmd.path(input).output(output),

        Operation::Pad {
            input,
            output,
            seconds,
        } => cmd.path(input).output(output).arg("pad").seconds(*seconds),

        Operation::Mix {
            inputs,
            output,
            volume,
        } => inputs
            .iter()
            .fold(cmd.arg("-m"), |cmd, file| {
                let vol = match volume {
                    MixVolume::Uniform => UNITY_VOLUME.to_string(),
                    MixVolume::PerFile => format::volume(file.audio_volume),
                };
                cmd.volume_flag(&vol).path(&file.path)
            })
            .output(output),

        Operation::Combine { inputs, output } => inputs
            .iter()
            .fold(cmd, |cmd, file| {
                cmd.volume_flag(&format::volume(file.audio_volume))
                    .path(&file.path)
            })
            .output(output),

        Operation::ChangeChannels {
            input,
            channels,
            output,
        } => cmd
            .path(input)
            .arg("-c")
            .arg(channels.to_string())
            .output(output),

        Operation::AdjustVolume {
            input,
            value,
            output,
        } => cmd
            .volume_flag(&format::seconds(*value))
            .path(input)
            .output(output),

        Operation::Delay { input, start } => {
            let delay = if *start < 0.0 { start.abs() } else { 0.0 };
            // left channel, then right
            cmd.path(input)
                .sixteen_bit_signed()
                .output(&derived_output(input, DELAYED_SUFFIX))
                .arg("delay")
                .seconds(delay)
                .seconds(delay)
        }

        Operation::Fade {
            input,
            curve,
            fade_in,
            stop,
            fade_out,
        } => cmd
            .path(input)
            .output(&derived_output(input, FADED_SUFFIX))
            .arg("fade")
            .arg(curve.as_str())
            .seconds(*fade_in)
            .optional_seconds(*stop)
            .optional_seconds(*fade_out),
    };

    Ok(cmd.build())
}

fn validate_parameters(op: &Operation) -> Result<()> {
    match op {
        Operation::Mix { inputs, .. } | Operation::Combine { inputs, .. } if inputs.is_empty() => {
            Err(SoxError::InvalidParameter(format!(
                "{} needs at least one input",
                op.name()
            )))
        }
        Operation::ChangeChannels { channels: 0, .. } => Err(SoxError::InvalidParameter(
            "channel count must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{optional, FadeCurve, UNSET};
    use crate::media::MediaDescriptor;

    fn tokens(op: &Operation) -> Vec<String> {
        build(&SoxConfig::default(), op).unwrap().tokens().to_vec()
    }

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_probe_length() {
        let op = Operation::ProbeLength { input: p("a.wav") };
        assert_eq!(tokens(&op), ["sox", "a.wav", "-n", "stat"]);
        assert!(build(&SoxConfig::default(), &op).unwrap().output().is_none());
    }

    #[test]
    fn test_set_volume() {
        let op = Operation::SetVolume {
            input: p("a.wav"),
            volume: 0.5,
            output: p("b.wav"),
        };
        assert_eq!(tokens(&op), ["sox", "-v", "0.5", "a.wav", "b.wav"]);
    }

    #[test]
    fn test_trim_derived_without_length() {
        let op = Operation::Trim {
            input: p("a.wav"),
            start: 1.5,
            length: optional(UNSET),
            output: TrimOutput::Derived { volume: 1.0 },
        };
        assert_eq!(
            tokens(&op),
            [
                "sox",
                "-v",
                "1.0",
                "a.wav",
                "-e",
                "signed-integer",
                "-b",
                "16",
                "a.wav_trimmed.wav",
                "trim",
                "1.5"
            ]
        );
    }

    #[test]
    fn test_trim_derived_with_length() {
        let op = Operation::Trim {
            input: p("a.wav"),
            start: 0.25,
            length: Some(3.0),
            output: TrimOutput::Derived { volume: 2.0 },
        };
        let t = tokens(&op);
        assert_eq!(&t[1..3], ["-v", "2.0"]);
        assert_eq!(&t[t.len() - 3..], ["trim", "0.25", "3"]);
    }

    #[test]
    fn test_trim_explicit_strict_rate_toggle() {
        let mut op = Operation::Trim {
            input: p("a.wav"),
            start: 1.0,
            length: Some(2.5),
            output: TrimOutput::Explicit {
                output: p("out.wav"),
                strict_rate: true,
            },
        };
        assert_eq!(
            tokens(&op),
            [
                "sox",
                "a.wav",
                "-r",
                "44100",
                "-e",
                "signed-integer",
                "-b",
                "16",
                "out.wav",
                "trim",
                "1",
                "2.5"
            ]
        );

        if let Operation::Trim {
            output: TrimOutput::Explicit { strict_rate, .. },
            length,
            ..
        } = &mut op
        {
            *strict_rate = false;
            *length = None;
        }
        assert_eq!(
            tokens(&op),
            ["sox", "a.wav", "-e", "signed-integer", "-b", "16", "out.wav", "trim", "1"]
        );
    }

    #[test]
    fn test_strict_sample_rate_and_convert() {
        let op = Operation::StrictSampleRate {
            input: p("a.wav"),
            output: p("b.wav"),
        };
        assert_eq!(tokens(&op), ["sox", "a.wav", "-r", "44100", "b.wav"]);

        let op = Operation::ConvertFormat {
            input: p("a.mp3"),
            output: p("a.wav"),
        };
        assert_eq!(tokens(&op), ["sox", "a.mp3", "a.wav"]);
    }

    #[test]
    fn test_pad() {
        let op = Operation::Pad {
            input: p("short.ogg"),
            output: p("delayed.ogg"),
            seconds: 6.0,
        };
        assert_eq!(tokens(&op), ["sox", "short.ogg", "delayed.ogg", "pad", "6"]);
    }

    #[test]
    fn test_mix_uniform_preserves_order() {
        let op = Operation::Mix {
            inputs: vec![
                MediaDescriptor::new("c.wav").with_volume(0.2),
                MediaDescriptor::new("a.wav"),
                MediaDescriptor::new("b.wav"),
            ],
            output: p("out.wav"),
            volume: MixVolume::Uniform,
        };
        assert_eq!(
            tokens(&op),
            [
                "sox", "-m", "-v", "1.0", "c.wav", "-v", "1.0", "a.wav", "-v", "1.0", "b.wav",
                "out.wav"
            ]
        );
    }

    #[test]
    fn test_mix_per_file_volume() {
        let op = Operation::Mix {
            inputs: vec![
                MediaDescriptor::new("a.wav").with_volume(0.5),
                MediaDescriptor::new("b.wav").with_volume(1.5),
            ],
            output: p("out.wav"),
            volume: MixVolume::PerFile,
        };
        let t = tokens(&op);
        assert_eq!(t.iter().filter(|s| *s == "-m").count(), 1);
        assert_eq!(
            t,
            ["sox", "-m", "-v", "0.5", "a.wav", "-v", "1.5", "b.wav", "out.wav"]
        );
    }

    #[test]
    fn test_combine_has_no_mix_flag() {
        let op = Operation::Combine {
            inputs: vec![
                MediaDescriptor::new("a.wav"),
                MediaDescriptor::new("b.wav").with_volume(0.8),
            ],
            output: p("out.wav"),
        };
        assert_eq!(
            tokens(&op),
            ["sox", "-v", "1.0", "a.wav", "-v", "0.8", "b.wav", "out.wav"]
        );
    }

    #[test]
    fn test_change_channels_and_adjust_volume() {
        let op = Operation::ChangeChannels {
            input: p("mono.wav"),
            channels: 2,
            output: p("stereo.wav"),
        };
        assert_eq!(tokens(&op), ["sox", "mono.wav", "-c", "2", "stereo.wav"]);

        let op = Operation::AdjustVolume {
            input: p("a.wav"),
            value: 0.25,
            output: p("b.wav"),
        };
        assert_eq!(tokens(&op), ["sox", "-v", "0.25", "a.wav", "b.wav"]);
    }

    #[test]
    fn test_delay_negative_start_is_duplicated() {
        let op = Operation::Delay {
            input: p("a.wav"),
            start: -2.0,
        };
        let t = tokens(&op);
        assert_eq!(&t[t.len() - 3..], ["delay", "2", "2"]);
        assert_eq!(t[6], "a.wav_delayed.wav");
    }

    #[test]
    fn test_delay_positive_start_is_zero() {
        let op = Operation::Delay {
            input: p("a.wav"),
            start: 3.0,
        };
        let t = tokens(&op);
        assert_eq!(&t[t.len() - 3..], ["delay", "0", "0"]);
    }

    #[test]
    fn test_fade_omits_unset_values() {
        let op = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::Linear,
            fade_in: 0.5,
            stop: None,
            fade_out: None,
        };
        assert_eq!(
            tokens(&op),
            ["sox", "a.wav", "a.wav_faded.wav", "fade", "t", "0.5"]
        );

        let op = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::QuarterSine,
            fade_in: 0.0,
            stop: Some(10.0),
            fade_out: Some(1.25),
        };
        assert_eq!(
            tokens(&op),
            ["sox", "a.wav", "a.wav_faded.wav", "fade", "q", "0", "10", "1.25"]
        );
    }

    #[test]
    fn test_fade_with_one_trailing_value() {
        let op = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::Logarithmic,
            fade_in: 1.0,
            stop: Some(4.0),
            fade_out: None,
        };
        assert_eq!(
            tokens(&op),
            ["sox", "a.wav", "a.wav_faded.wav", "fade", "l", "1", "4"]
        );

        let op = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::InvertedParabola,
            fade_in: 1.0,
            stop: None,
            fade_out: Some(0.5),
        };
        assert_eq!(
            tokens(&op),
            ["sox", "a.wav", "a.wav_faded.wav", "fade", "p", "1", "0.5"]
        );
    }

    #[test]
    fn test_sentinel_values_never_reach_tokens() {
        let trim = Operation::Trim {
            input: p("a.wav"),
            start: 1.5,
            length: Some(UNSET),
            output: TrimOutput::Explicit {
                output: p("b.wav"),
                strict_rate: false,
            },
        };
        let t = tokens(&trim);
        assert!(!t.iter().any(|s| s == "-1"));
        assert_eq!(&t[t.len() - 2..], ["trim", "1.5"]);

        let fade = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::Linear,
            fade_in: 1.0,
            stop: Some(UNSET),
            fade_out: Some(UNSET),
        };
        assert_eq!(
            tokens(&fade),
            ["sox", "a.wav", "a.wav_faded.wav", "fade", "t", "1"]
        );
    }

    #[test]
    fn test_binary_with_whitespace_rejected() {
        let config = SoxConfig {
            binary: "/opt/my sox/sox".to_string(),
            ..SoxConfig::default()
        };
        let op = Operation::ProbeLength { input: p("a.wav") };
        assert!(matches!(build(&config, &op), Err(SoxError::InvalidPath(_))));
    }

    #[test]
    fn test_whitespace_paths_rejected() {
        let config = SoxConfig::default();
        let ops = vec![
            Operation::ProbeLength { input: p("my file.wav") },
            Operation::SetVolume {
                input: p("a.wav"),
                volume: 1.0,
                output: p("out put.wav"),
            },
            Operation::Mix {
                inputs: vec![MediaDescriptor::new("a.wav"), MediaDescriptor::new("b\tc.wav")],
                output: p("out.wav"),
                volume: MixVolume::Uniform,
            },
            Operation::Trim {
                input: p("a.wav"),
                start: 0.0,
                length: None,
                output: TrimOutput::Explicit {
                    output: p("x y.wav"),
                    strict_rate: false,
                },
            },
            Operation::Fade {
                input: p(" a.wav"),
                curve: FadeCurve::HalfSine,
                fade_in: 1.0,
                stop: None,
                fade_out: None,
            },
        ];
        for op in &ops {
            assert!(
                matches!(build(&config, op), Err(SoxError::InvalidPath(_))),
                "{} should reject whitespace",
                op.name()
            );
        }
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let op = Operation::Combine {
            inputs: vec![],
            output: p("out.wav"),
        };
        assert!(matches!(
            build(&SoxConfig::default(), &op),
            Err(SoxError::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_path(Path::new("")),
            Err(SoxError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_build_is_deterministic() {
        let op = Operation::Fade {
            input: p("a.wav"),
            curve: FadeCurve::Logarithmic,
            fade_in: 1.0,
            stop: Some(4.0),
            fade_out: None,
        };
        let config = SoxConfig::default();
        assert_eq!(build(&config, &op).unwrap(), build(&config, &op).unwrap());
    }

    #[test]
    fn test_binary_override_and_invocation() {
        let config = SoxConfig {
            binary: "/opt/sox/bin/sox".to_string(),
            ..SoxConfig::default()
        };
        let cmd = build(&config, &Operation::ProbeLength { input: p("a.wav") }).unwrap();
        assert_eq!(cmd.invocation(), "/opt/sox/bin/sox a.wav -n stat");
        assert_eq!(cmd.to_string(), cmd.invocation());
    }
}
