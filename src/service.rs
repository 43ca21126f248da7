//! JSON request front end for the controller.
//!
//! A [`Request`] names an operation and carries its parameters as a JSON
//! object. The service checks the object against the operation's schema
//! from the capability card, converts it into an [`Operation`], runs it and
//! wraps the outcome in a [`Response`].
//!
//! ## Operations
//!
//! 1. `audio.length` - probe duration
//! 2. `audio.volume` - set volume
//! 3. `audio.trim` - trim (derived or explicit output)
//! 4. `audio.resample` - force the strict sample rate
//! 5. `audio.convert` - format conversion by extension
//! 6. `audio.pad` - leading silence
//! 7. `audio.mix` - mix inputs
//! 8. `audio.combine` - concatenate inputs
//! 9. `audio.channels` - change channel count
//! 10. `audio.adjust_volume` - ad hoc volume change
//! 11. `audio.delay` - delay both channels
//! 12. `audio.fade` - fade in/out
//! 13. `sox.capabilities` - capability card
//! 14. `metrics` - request counters
//!
//! ## Example
//!
//! ```rust,no_run
//! use sox_controller::service::{Request, SoxService};
//! use sox_controller::SoxConfig;
//! use serde_json::json;
//!
//! let mut service = SoxService::new(SoxConfig::default());
//! let response = service.handle(Request::new(
//!     "audio.trim",
//!     json!({"input_path": "a.wav", "start": 1.5}),
//! ));
//! println!("{}", response.output);
//! ```

use crate::catalog::{optional, FadeCurve, MixVolume, Operation, TrimOutput};
use crate::command::validate_path;
use crate::config::SoxConfig;
use crate::controller::SoxController;
use crate::error::SoxError;
use crate::exec::{ProcessLauncher, SystemLauncher};
use crate::media::MediaDescriptor;
use crate::metrics::{Metrics, Timer};
use crate::result::ExecutionResult;
use crate::validation::validate_input;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl Request {
    pub fn new(op: impl Into<String>, input: Value) -> Self {
        Self {
            op: op.into(),
            input,
            context: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub output: Value,
    pub latency_ms: u64,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sox(#[from] SoxError),
}

impl ServiceError {
    fn kind(&self) -> &'static str {
        match self {
            ServiceError::UnsupportedOperation(_) => "UnsupportedOperation",
            ServiceError::InvalidInput(_) | ServiceError::Serialization(_) => "InvalidInput",
            ServiceError::Sox(e) if e.is_validation() => "ValidationError",
            ServiceError::Sox(SoxError::Launch { .. }) => "LaunchError",
            ServiceError::Sox(SoxError::EngineFailed { .. }) => "EngineExecutionError",
            ServiceError::Sox(SoxError::ArtifactMissing(_)) => "ArtifactMissingError",
            ServiceError::Sox(_) => "SoxError",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityCard {
    pub name: String,
    pub version: String,
    pub description: String,
    pub engine: String,
    pub tags: Vec<String>,
    pub functions: Vec<FunctionCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCard {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub idempotent: bool,
    pub side_effects: Vec<String>,
    pub input_schema: Option<Value>,
}

pub struct SoxService<L = SystemLauncher> {
    controller: SoxController<L>,
    metrics: Arc<Metrics>,
}

impl SoxService<SystemLauncher> {
    pub fn new(config: SoxConfig) -> Self {
        Self::with_controller(SoxController::new(config))
    }
}

impl<L: ProcessLauncher> SoxService<L> {
    pub fn with_controller(controller: SoxController<L>) -> Self {
        Self {
            controller,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn controller(&self) -> &SoxController<L> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SoxController<L> {
        &mut self.controller
    }

    /// Handle one request. Never panics on bad input; every problem comes
    /// back as `ok: false` with an `error` kind and a `message`.
    pub fn handle(&mut self, request: Request) -> Response {
        let timer = Timer::new();
        debug!("Received: op={}", request.op);

        let (ok, output) = match self.dispatch(&request.op, &request.input) {
            Ok((ok, output)) => (ok, output),
            Err(e) => {
                warn!("{} rejected: {}", request.op, e);
                (
                    false,
                    json!({
                        "error": e.kind(),
                        "message": e.to_string(),
                        "op": request.op,
                    }),
                )
            }
        };

        let latency_ms = timer.elapsed_ms();
        self.metrics.record_request(&request.op, ok, latency_ms);

        Response {
            ok,
            output,
            latency_ms,
        }
    }

    fn dispatch(&mut self, op: &str, input: &Value) -> Result<(bool, Value), ServiceError> {
        match op {
            "sox.capabilities" => return Ok((true, serde_json::to_value(self.describe())?)),
            "metrics" => return Ok((true, serde_json::to_value(self.metrics.snapshot())?)),
            _ => {}
        }

        let card = self.describe();
        let function = card
            .functions
            .iter()
            .find(|f| f.name == op)
            .ok_or_else(|| ServiceError::UnsupportedOperation(op.to_string()))?;
        if let Some(schema) = &function.input_schema {
            validate_input(input, schema)?;
        }

        let operation = parse_operation(op, input)?;
        let result = self.controller.run(&operation)?;
        Ok((result.is_success(), result_json(&result)))
    }

    pub fn describe(&self) -> CapabilityCard {
        let curve_names: Vec<&str> = FadeCurve::ALL.iter().map(|c| c.as_str()).collect();
        let curve_help = format!("One of {}", curve_names.join(", "));
        let paths = |extra: Value| -> Value {
            let mut schema = json!({
                "type": "object",
                "properties": {
                    "input_path": { "type": "string", "description": "Input audio file (no whitespace)" },
                    "output_path": { "type": "string", "description": "Output audio file (no whitespace)" }
                },
                "required": ["input_path", "output_path"]
            });
            if let (Some(props), Some(extra)) = (schema["properties"].as_object_mut(), extra.as_object()) {
                props.extend(extra.clone());
            }
            schema
        };
        let inputs_schema = json!({
            "type": "object",
            "properties": {
                "inputs": { "type": "array", "description": "Paths or media descriptors, in order" },
                "output_path": { "type": "string" },
                "per_file_volume": { "type": "boolean", "description": "Use each descriptor's audio_volume (default: false)" }
            },
            "required": ["inputs", "output_path"]
        });

        CapabilityCard {
            name: "sox_controller".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Builds and runs sox command lines for common audio edits".to_string(),
            engine: self.controller.config().binary.clone(),
            tags: ["audio", "sox", "editing", "conversion"].map(String::from).to_vec(),
            functions: vec![
                function(
                    "audio.length",
                    "Probe the duration of an audio file in seconds",
                    &["probe", "duration"],
                    false,
                    Some(json!({
                        "type": "object",
                        "properties": { "input_path": { "type": "string" } },
                        "required": ["input_path"]
                    })),
                ),
                function(
                    "audio.volume",
                    "Write a copy scaled by a volume multiplier",
                    &["volume"],
                    true,
                    Some(paths(json!({ "volume": { "type": "number" } }))),
                )
                .require("volume"),
                function(
                    "audio.trim",
                    "Keep audio from start for length seconds (to the end when length is unset)",
                    &["trim"],
                    true,
                    Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string" },
                            "output_path": { "type": "string", "description": "Omit to write <input>_trimmed.wav" },
                            "start": { "type": "number" },
                            "length": { "type": "number", "description": "-1 or omitted for until the end" },
                            "volume": { "type": "number", "description": "Derived output only (default: 1.0)" },
                            "strict_rate": { "type": "boolean", "description": "Explicit output only (default: false)" }
                        },
                        "required": ["input_path", "start"]
                    })),
                ),
                function(
                    "audio.resample",
                    "Resample to the strict sample rate",
                    &["resample"],
                    true,
                    Some(paths(json!({}))),
                ),
                function(
                    "audio.convert",
                    "Convert between formats inferred from the file extensions",
                    &["conversion"],
                    true,
                    Some(paths(json!({}))),
                ),
                function(
                    "audio.pad",
                    "Prepend seconds of silence",
                    &["pad", "silence"],
                    true,
                    Some(paths(json!({ "seconds": { "type": "number" } }))),
                )
                .require("seconds"),
                function(
                    "audio.mix",
                    "Mix inputs into one file",
                    &["mix"],
                    true,
                    Some(inputs_schema.clone()),
                ),
                function(
                    "audio.combine",
                    "Concatenate inputs into one file",
                    &["combine", "concatenate"],
                    true,
                    Some(inputs_schema),
                ),
                function(
                    "audio.channels",
                    "Change the channel count (e.g. mono to stereo)",
                    &["channels"],
                    true,
                    Some(paths(json!({ "channels": { "type": "integer" } }))),
                )
                .require("channels"),
                function(
                    "audio.adjust_volume",
                    "Write a copy scaled by an arbitrary volume value",
                    &["volume"],
                    true,
                    Some(paths(json!({ "value": { "type": "number" } }))),
                )
                .require("value"),
                function(
                    "audio.delay",
                    "Delay both channels by |start| when start is negative, writing <input>_delayed.wav",
                    &["delay"],
                    true,
                    Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string" },
                            "start": { "type": "number" }
                        },
                        "required": ["input_path", "start"]
                    })),
                ),
                function(
                    "audio.fade",
                    "Fade in and optionally out, writing <input>_faded.wav",
                    &["fade"],
                    true,
                    Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string" },
                            "curve": { "type": "string", "description": curve_help },
                            "fade_in": { "type": "number" },
                            "stop": { "type": "number", "description": "-1 or omitted for unset" },
                            "fade_out": { "type": "number", "description": "-1 or omitted for unset" }
                        },
                        "required": ["input_path", "curve", "fade_in"]
                    })),
                ),
                function(
                    "sox.capabilities",
                    "Return this capability card",
                    &["metadata", "discovery"],
                    false,
                    None,
                ),
                function(
                    "metrics",
                    "Return request counters",
                    &["metadata"],
                    false,
                    None,
                ),
            ],
        }
    }
}

fn function(
    name: &str,
    description: &str,
    tags: &[&str],
    writes: bool,
    input_schema: Option<Value>,
) -> FunctionCard {
    let mut side_effects = vec!["invokes sox".to_string()];
    if writes {
        side_effects.push("writes audio file".to_string());
    }
    if input_schema.is_none() {
        side_effects.clear();
    }
    FunctionCard {
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        idempotent: true,
        side_effects,
        input_schema,
    }
}

impl FunctionCard {
    fn require(mut self, field: &str) -> Self {
        if let Some(required) = self
            .input_schema
            .as_mut()
            .and_then(|s| s.get_mut("required"))
            .and_then(Value::as_array_mut)
        {
            required.push(Value::from(field));
        }
        self
    }
}

fn result_json(result: &ExecutionResult) -> Value {
    json!({
        "success": result.is_success(),
        "exit_code": result.exit_code,
        "value": result.value,
        "output_path": result.output,
        "failure": result.failure,
    })
}

fn path_field(input: &Value, key: &str) -> Result<PathBuf, ServiceError> {
    input[key]
        .as_str()
        .map(PathBuf::from)
        .ok_or_else(|| ServiceError::InvalidInput(format!("Missing {}", key)))
}

fn number_field(input: &Value, key: &str) -> Result<f64, ServiceError> {
    input[key]
        .as_f64()
        .ok_or_else(|| ServiceError::InvalidInput(format!("Missing {}", key)))
}

/// Absent, null and the `-1` sentinel all mean unset.
fn optional_number(input: &Value, key: &str) -> Option<f64> {
    input[key].as_f64().and_then(optional)
}

fn descriptors(input: &Value, key: &str) -> Result<Vec<MediaDescriptor>, ServiceError> {
    let items = input[key]
        .as_array()
        .ok_or_else(|| ServiceError::InvalidInput(format!("Missing {}", key)))?;
    items
        .iter()
        .map(|item| -> Result<MediaDescriptor, ServiceError> {
            match item {
                Value::String(path) => Ok(MediaDescriptor::new(path)),
                Value::Object(_) => Ok(serde_json::from_value(item.clone())?),
                other => Err(ServiceError::InvalidInput(format!(
                    "{} entries must be paths or descriptors, got {}",
                    key, other
                ))),
            }
        })
        .collect()
}

/// Convert a validated request input into an [`Operation`].
pub fn parse_operation(op: &str, input: &Value) -> Result<Operation, ServiceError> {
    let operation = match op {
        "audio.length" => Operation::ProbeLength {
            input: path_field(input, "input_path")?,
        },
        "audio.volume" => Operation::SetVolume {
            input: path_field(input, "input_path")?,
            volume: number_field(input, "volume")? as f32,
            output: path_field(input, "output_path")?,
        },
        "audio.trim" => {
            let output = match input["output_path"].as_str() {
                Some(path) => TrimOutput::Explicit {
                    output: PathBuf::from(path),
                    strict_rate: input["strict_rate"].as_bool().unwrap_or(false),
                },
                None => TrimOutput::Derived {
                    volume: input["volume"].as_f64().unwrap_or(1.0) as f32,
                },
            };
            Operation::Trim {
                input: path_field(input, "input_path")?,
                start: number_field(input, "start")?,
                length: optional_number(input, "length"),
                output,
            }
        }
        "audio.resample" => Operation::StrictSampleRate {
            input: path_field(input, "input_path")?,
            output: path_field(input, "output_path")?,
        },
        "audio.convert" => Operation::ConvertFormat {
            input: path_field(input, "input_path")?,
            output: path_field(input, "output_path")?,
        },
        "audio.pad" => Operation::Pad {
            input: path_field(input, "input_path")?,
            output: path_field(input, "output_path")?,
            seconds: number_field(input, "seconds")?,
        },
        "audio.mix" => Operation::Mix {
            inputs: descriptors(input, "inputs")?,
            output: path_field(input, "output_path")?,
            volume: if input["per_file_volume"].as_bool().unwrap_or(false) {
                MixVolume::PerFile
            } else {
                MixVolume::Uniform
            },
        },
        "audio.combine" => Operation::Combine {
            inputs: descriptors(input, "inputs")?,
            output: path_field(input, "output_path")?,
        },
        "audio.channels" => {
            let channels = input["channels"]
                .as_u64()
                .and_then(|c| u32::try_from(c).ok())
                .ok_or_else(|| ServiceError::InvalidInput("Missing channels".to_string()))?;
            Operation::ChangeChannels {
                input: path_field(input, "input_path")?,
                channels,
                output: path_field(input, "output_path")?,
            }
        }
        "audio.adjust_volume" => Operation::AdjustVolume {
            input: path_field(input, "input_path")?,
            value: number_field(input, "value")?,
            output: path_field(input, "output_path")?,
        },
        "audio.delay" => Operation::Delay {
            input: path_field(input, "input_path")?,
            start: number_field(input, "start")?,
        },
        "audio.fade" => {
            // the path is checked before the curve
            let path = path_field(input, "input_path")?;
            validate_path(&path)?;
            let curve = input["curve"]
                .as_str()
                .ok_or_else(|| ServiceError::InvalidInput("Missing curve".to_string()))?
                .parse::<FadeCurve>()?;
            Operation::Fade {
                input: path,
                curve,
                fade_in: number_field(input, "fade_in")?,
                stop: optional_number(input, "stop"),
                fade_out: optional_number(input, "fade_out"),
            }
        }
        other => return Err(ServiceError::UnsupportedOperation(other.to_string())),
    };
    Ok(operation)
}
