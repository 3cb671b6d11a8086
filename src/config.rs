use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::{CameraConfig, ImageInput, Origin, SourceInput, VideoConfig};
use crate::session::{Controls, Theme, DEFAULT_CYCLE_DELAY, DEFAULT_THRESHOLD};

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;

/// Which detector backend drives `ModelDetector`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Color heuristic, no model file.
    #[default]
    Stub,
    /// ONNX model through tract (feature: backend-tract).
    Tract,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Stub => "stub",
            BackendKind::Tract => "tract",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "tract" => Ok(BackendKind::Tract),
            other => Err(anyhow!("unknown backend '{}' (expected stub or tract)", other)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FireWatchConfigFile {
    source: Option<String>,
    input: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    controls: Option<ControlsConfigFile>,
    detector: Option<DetectorConfigFile>,
    export_path: Option<PathBuf>,
    cycle_delay_ms: Option<u64>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ControlsConfigFile {
    threshold: Option<f32>,
    alert_enabled: Option<bool>,
    show_log: Option<bool>,
    theme: Option<Theme>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct FireWatchConfig {
    pub origin: Origin,
    /// Image or video file for non-camera origins. `stub://` names select synthetic clips.
    pub input: Option<PathBuf>,
    pub camera: CameraConfig,
    pub controls: Controls,
    pub detector: DetectorSettings,
    /// Where the CSV log export is written after a run, if anywhere.
    pub export_path: Option<PathBuf>,
    pub cycle_delay: Duration,
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
}

/// Command-line overrides, applied on top of file + env config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub origin: Option<Origin>,
    pub input: Option<PathBuf>,
    pub camera: Option<String>,
    pub threshold: Option<f32>,
    pub no_alert: bool,
    pub hide_log: bool,
    pub theme: Option<Theme>,
    pub backend: Option<BackendKind>,
    pub model: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub cycle_delay_ms: Option<u64>,
    pub max_frames: Option<u64>,
}

impl Default for FireWatchConfig {
    fn default() -> Self {
        Self {
            origin: Origin::Camera,
            input: None,
            camera: CameraConfig {
                device: DEFAULT_CAMERA_DEVICE.to_string(),
                target_fps: DEFAULT_CAMERA_FPS,
                width: DEFAULT_CAMERA_WIDTH,
                height: DEFAULT_CAMERA_HEIGHT,
            },
            controls: Controls::default(),
            detector: DetectorSettings {
                backend: BackendKind::Stub,
                model_path: None,
                input_size: DEFAULT_MODEL_INPUT_SIZE,
            },
            export_path: None,
            cycle_delay: DEFAULT_CYCLE_DELAY,
            max_frames: None,
        }
    }
}

impl FireWatchConfig {
    /// File + env config, validated.
    pub fn load() -> Result<Self> {
        let cfg = Self::from_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// File + env config without validation, for callers that layer further
    /// overrides (CLI flags) and call `validate()` themselves.
    pub fn from_env() -> Result<Self> {
        let config_path = std::env::var("FIRE_WATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(origin) = overrides.origin {
            self.origin = origin;
        }
        if let Some(input) = &overrides.input {
            self.input = Some(input.clone());
        }
        if let Some(device) = &overrides.camera {
            self.camera.device = device.clone();
        }
        if let Some(threshold) = overrides.threshold {
            self.controls.threshold = threshold;
        }
        if overrides.no_alert {
            self.controls.alert_enabled = false;
        }
        if overrides.hide_log {
            self.controls.show_log = false;
        }
        if let Some(theme) = overrides.theme {
            self.controls.theme = theme;
        }
        if let Some(backend) = overrides.backend {
            self.detector.backend = backend;
        }
        if let Some(model) = &overrides.model {
            self.detector.model_path = Some(model.clone());
        }
        if let Some(export) = &overrides.export {
            self.export_path = Some(export.clone());
        }
        if let Some(ms) = overrides.cycle_delay_ms {
            self.cycle_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = overrides.max_frames {
            self.max_frames = Some(limit);
        }
    }

    fn from_file(file: FireWatchConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let origin = match file.source.as_deref() {
            Some(source) => source.parse()?,
            None => defaults.origin,
        };
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file.device.unwrap_or(defaults.camera.device),
            target_fps: camera_file.target_fps.unwrap_or(defaults.camera.target_fps),
            width: camera_file.width.unwrap_or(defaults.camera.width),
            height: camera_file.height.unwrap_or(defaults.camera.height),
        };
        let controls_file = file.controls.unwrap_or_default();
        let controls = Controls {
            threshold: controls_file.threshold.unwrap_or(DEFAULT_THRESHOLD),
            alert_enabled: controls_file
                .alert_enabled
                .unwrap_or(defaults.controls.alert_enabled),
            show_log: controls_file.show_log.unwrap_or(defaults.controls.show_log),
            theme: controls_file.theme.unwrap_or_default(),
        };
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or_default(),
            model_path: detector_file.model_path,
            input_size: detector_file
                .input_size
                .unwrap_or(defaults.detector.input_size),
        };
        let cycle_delay = file
            .cycle_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.cycle_delay);
        Ok(Self {
            origin,
            input: file.input,
            camera,
            controls,
            detector,
            export_path: file.export_path,
            cycle_delay,
            max_frames: file.max_frames,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(source) = env_value("FIRE_WATCH_SOURCE") {
            self.origin = source.parse()?;
        }
        if let Some(input) = env_value("FIRE_WATCH_INPUT") {
            self.input = Some(PathBuf::from(input));
        }
        if let Some(device) = env_value("FIRE_WATCH_CAMERA") {
            self.camera.device = device;
        }
        if let Some(threshold) = env_value("FIRE_WATCH_THRESHOLD") {
            self.controls.threshold = threshold
                .parse()
                .map_err(|_| anyhow!("FIRE_WATCH_THRESHOLD must be a number"))?;
        }
        if let Some(alerts) = env_value("FIRE_WATCH_ALERTS") {
            self.controls.alert_enabled = parse_bool("FIRE_WATCH_ALERTS", &alerts)?;
        }
        if let Some(show) = env_value("FIRE_WATCH_SHOW_LOG") {
            self.controls.show_log = parse_bool("FIRE_WATCH_SHOW_LOG", &show)?;
        }
        if let Some(backend) = env_value("FIRE_WATCH_BACKEND") {
            self.detector.backend = backend.parse()?;
        }
        if let Some(model) = env_value("FIRE_WATCH_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(export) = env_value("FIRE_WATCH_EXPORT") {
            self.export_path = Some(PathBuf::from(export));
        }
        Ok(())
    }

    /// Check the assembled config. Called again by the CLI after flag overrides.
    pub fn validate(&self) -> Result<()> {
        self.controls.validate()?;
        if self.detector.backend == BackendKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!("the tract backend requires a model path"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if self.origin != Origin::Camera && self.input.is_none() {
            return Err(anyhow!("{} source requires an input path", self.origin));
        }
        Ok(())
    }

    /// Source input for the configured origin.
    pub fn source_input(&self) -> Result<SourceInput> {
        match self.origin {
            Origin::Camera => Ok(SourceInput::Camera(self.camera.clone())),
            Origin::Image => {
                let path = self.require_input()?;
                Ok(SourceInput::Image(ImageInput::Path(path)))
            }
            Origin::Video => {
                let mut video = VideoConfig::from_path(self.require_input()?);
                if let Some(limit) = self.max_frames {
                    video = video.with_max_frames(limit);
                }
                Ok(SourceInput::Video(video))
            }
        }
    }

    fn require_input(&self) -> Result<PathBuf> {
        self.input
            .clone()
            .ok_or_else(|| anyhow!("{} source requires an input path", self.origin))
    }
}

fn read_config_file(path: &Path) -> Result<FireWatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be a boolean (true/false)", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() -> Result<()> {
        let cfg = FireWatchConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.controls.threshold, 0.6);
        assert!(cfg.controls.alert_enabled);
        assert!(cfg.controls.show_log);
        assert_eq!(cfg.detector.backend, BackendKind::Stub);
        Ok(())
    }

    #[test]
    fn empty_file_fills_defaults() -> Result<()> {
        let cfg = FireWatchConfig::from_file(serde_json::from_str("{}")?)?;
        assert_eq!(cfg.origin, Origin::Camera);
        assert_eq!(cfg.camera.device, DEFAULT_CAMERA_DEVICE);
        assert_eq!(cfg.cycle_delay, DEFAULT_CYCLE_DELAY);
        Ok(())
    }

    #[test]
    fn tract_needs_model_path() {
        let mut cfg = FireWatchConfig::default();
        cfg.detector.backend = BackendKind::Tract;
        assert!(cfg.validate().is_err());
        cfg.detector.model_path = Some(PathBuf::from("fire.onnx"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn file_inputs_need_a_path() -> Result<()> {
        let mut cfg = FireWatchConfig {
            origin: Origin::Video,
            ..FireWatchConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.input = Some(PathBuf::from("stub://clip"));
        cfg.max_frames = Some(5);
        match cfg.source_input()? {
            SourceInput::Video(video) => assert_eq!(video.max_frames, Some(5)),
            other => panic!("unexpected input {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn threshold_range_enforced() {
        let mut cfg = FireWatchConfig::default();
        cfg.controls.threshold = 0.05;
        assert!(cfg.validate().is_err());
        cfg.controls.threshold = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bools_accept_common_spellings() -> Result<()> {
        assert!(parse_bool("X", "on")?);
        assert!(!parse_bool("X", "0")?);
        assert!(parse_bool("X", "maybe").is_err());
        Ok(())
    }
}
