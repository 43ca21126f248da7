//! The controller: validate, build, run, interpret.

use crate::catalog::{FadeCurve, MixVolume, Operation, TrimOutput};
use crate::command;
use crate::config::SoxConfig;
use crate::error::{Result, SoxError};
use crate::exec::{self, ProcessLauncher, StreamCallback, SystemLauncher};
use crate::media::MediaDescriptor;
use crate::parser::LengthParser;
use crate::result::{map_result, ExecutionResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type UserCallback = Box<dyn StreamCallback + Send>;

/// Drives one engine run at a time.
///
/// Every operation takes `&mut self` and blocks until the engine exits, so a
/// controller never has two runs in flight. Separate controllers share
/// nothing and may be used from different threads.
pub struct SoxController<L = SystemLauncher> {
    config: SoxConfig,
    launcher: L,
    callback: Option<UserCallback>,
}

impl SoxController<SystemLauncher> {
    pub fn new(config: SoxConfig) -> Self {
        Self::with_launcher(config, SystemLauncher::new())
    }

    pub fn from_env() -> Self {
        Self::new(SoxConfig::from_env())
    }
}

impl Default for SoxController<SystemLauncher> {
    fn default() -> Self {
        Self::new(SoxConfig::default())
    }
}

impl<L: ProcessLauncher> SoxController<L> {
    pub fn with_launcher(config: SoxConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            callback: None,
        }
    }

    /// Receive every engine output line and completion notice from now on.
    pub fn set_callback(&mut self, callback: impl StreamCallback + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub fn config(&self) -> &SoxConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    /// Run one operation.
    ///
    /// Validation problems and launch failures are errors; everything the
    /// engine itself decides (exit status, missing output) is reported in the
    /// returned [`ExecutionResult`].
    pub fn run(&mut self, op: &Operation) -> Result<ExecutionResult> {
        let command = command::build(&self.config, op)?;
        debug!("{}: {} tokens", op.name(), command.tokens().len());

        let result = match op {
            Operation::ProbeLength { .. } => {
                let mut parser = LengthParser::new();
                let exit_code = {
                    let mut tee = Tee {
                        parser: &mut parser,
                        user: self.callback.as_deref_mut(),
                    };
                    exec::execute(&mut self.launcher, &command, Some(&mut tee))?
                };
                map_result(exit_code, parser.length(), None)
            }
            _ => {
                let user = self
                    .callback
                    .as_deref_mut()
                    .map(|cb| cb as &mut dyn StreamCallback);
                let exit_code = exec::execute(&mut self.launcher, &command, user)?;
                map_result(exit_code, None, command.output())
            }
        };

        if !result.is_success() {
            warn!("{} failed: {:?}", op.name(), result.failure);
        }
        Ok(result)
    }

    /// Duration of `input` in seconds, `None` when the engine printed no
    /// usable `Length` line.
    pub fn probe_length(&mut self, input: impl AsRef<Path>) -> Result<Option<f64>> {
        let op = Operation::ProbeLength {
            input: input.as_ref().to_path_buf(),
        };
        Ok(self.run(&op)?.into_result()?.value)
    }

    pub fn set_volume(
        &mut self,
        input: impl AsRef<Path>,
        volume: f32,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::SetVolume {
            input: input.as_ref().to_path_buf(),
            volume,
            output: output.as_ref().to_path_buf(),
        })
    }

    /// Trim into `<input>_trimmed.wav`, scaling by `volume` on the way.
    pub fn trim(
        &mut self,
        input: impl AsRef<Path>,
        start: f64,
        length: Option<f64>,
        volume: f32,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::Trim {
            input: input.as_ref().to_path_buf(),
            start,
            length,
            output: TrimOutput::Derived { volume },
        })
    }

    /// Trim into `output`, optionally forcing the strict sample rate.
    pub fn trim_to(
        &mut self,
        input: impl AsRef<Path>,
        start: f64,
        length: Option<f64>,
        strict_rate: bool,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::Trim {
            input: input.as_ref().to_path_buf(),
            start,
            length,
            output: TrimOutput::Explicit {
                output: output.as_ref().to_path_buf(),
                strict_rate,
            },
        })
    }

    pub fn set_strict_sample_rate(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::StrictSampleRate {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
        })
    }

    /// Conversion is inferred by the engine from the file extensions.
    pub fn convert_format(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::ConvertFormat {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
        })
    }

    /// Prepend `seconds` of silence.
    pub fn pad_start(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        seconds: f64,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::Pad {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            seconds,
        })
    }

    /// Mix `files` at unity gain.
    pub fn mix<P: AsRef<Path>>(&mut self, files: &[P], output: impl AsRef<Path>) -> Result<PathBuf> {
        self.run_for_output(Operation::Mix {
            inputs: files.iter().map(|f| MediaDescriptor::new(f.as_ref())).collect(),
            output: output.as_ref().to_path_buf(),
            volume: MixVolume::Uniform,
        })
    }

    /// Mix `files`, each at its own `audio_volume`.
    pub fn mix_descriptors(
        &mut self,
        files: &[MediaDescriptor],
        output: &MediaDescriptor,
    ) -> Result<MediaDescriptor> {
        self.run_for_output(Operation::Mix {
            inputs: files.to_vec(),
            output: output.path.clone(),
            volume: MixVolume::PerFile,
        })?;
        Ok(output.clone())
    }

    /// Concatenate `files` in order.
    pub fn combine(
        &mut self,
        files: &[MediaDescriptor],
        output: &MediaDescriptor,
    ) -> Result<MediaDescriptor> {
        self.run_for_output(Operation::Combine {
            inputs: files.to_vec(),
            output: output.path.clone(),
        })?;
        Ok(output.clone())
    }

    pub fn change_channels(
        &mut self,
        input: impl AsRef<Path>,
        channels: u32,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::ChangeChannels {
            input: input.as_ref().to_path_buf(),
            channels,
            output: output.as_ref().to_path_buf(),
        })
    }

    pub fn adjust_volume(
        &mut self,
        input: impl AsRef<Path>,
        value: f64,
        output: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.run_for_output(Operation::AdjustVolume {
            input: input.as_ref().to_path_buf(),
            value,
            output: output.as_ref().to_path_buf(),
        })
    }

    /// Delay into `<input>_delayed.wav`; a negative `start` is the amount of
    /// silence to insert.
    pub fn delay(&mut self, input: impl AsRef<Path>, start: f64) -> Result<PathBuf> {
        self.run_for_output(Operation::Delay {
            input: input.as_ref().to_path_buf(),
            start,
        })
    }

    /// Fade into `<input>_faded.wav`. `curve` must be one of `q h t l p`.
    pub fn fade(
        &mut self,
        input: impl AsRef<Path>,
        curve: &str,
        fade_in: f64,
        stop: Option<f64>,
        fade_out: Option<f64>,
    ) -> Result<PathBuf> {
        let input = input.as_ref();
        command::validate_path(input)?;
        let curve: FadeCurve = curve.parse().map_err(|e| {
            warn!("fade: rejected curve {:?}", curve);
            e
        })?;
        self.run_for_output(Operation::Fade {
            input: input.to_path_buf(),
            curve,
            fade_in,
            stop,
            fade_out,
        })
    }

    fn run_for_output(&mut self, op: Operation) -> Result<PathBuf> {
        let result = self.run(&op)?.into_result()?;
        result.output.ok_or_else(|| {
            SoxError::InvalidParameter(format!("{} does not produce an output file", op.name()))
        })
    }
}

/// Feeds the length parser and, if present, the caller's callback.
struct Tee<'a> {
    parser: &'a mut LengthParser,
    user: Option<&'a mut (dyn StreamCallback + Send + 'static)>,
}

impl StreamCallback for Tee<'_> {
    fn shell_out(&mut self, line: &str) {
        self.parser.shell_out(line);
        if let Some(user) = self.user.as_mut() {
            user.shell_out(line);
        }
    }

    fn process_complete(&mut self, exit_code: i32) {
        self.parser.process_complete(exit_code);
        if let Some(user) = self.user.as_mut() {
            user.process_complete(exit_code);
        }
    }
}
