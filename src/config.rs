// ==============================================================================
// config.rs — SERVER / VEHICLE / AUDIO SETTINGS
// ------------------------------------------------------------------------------
// Everything is serde-loadable from one JSON document and every field has a
// default, so a partial file only overrides what it names. Defaults reproduce
// the stock arcade car. validate() enforces the tuning ranges; values outside
// them are rejected at startup instead of being clamped silently.
// ==============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::input::TouchButton;
use crate::wheels::WheelPos;

pub const CONFIG_ENV: &str = "DRIVETRAIN_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub physics_hz: f32,
    pub frame_hz: f32,
    pub audio_service: AudioServiceConfig,
    pub vehicle: VehicleConfig,
    pub audio: AudioConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9001".to_string(),
            physics_hz: 60.0,
            frame_hz: 120.0,
            audio_service: AudioServiceConfig::default(),
            vehicle: VehicleConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub max_speed: f32,               // km/h
    pub max_reverse_speed: f32,       // km/h
    pub acceleration_multiplier: f32, // motor torque = multiplier * 50
    pub max_steering_angle: f32,      // degrees
    pub steering_speed: f32,
    pub brake_force: f32,   // N*m per wheel before speed banding
    pub coasting_drag: f32, // per decay step: v *= 1 / (1 + drag)
    pub surfaces: SurfaceConfig,
    pub reference_wheel: WheelPos,
    pub use_effects: bool,
    pub use_ui: bool,
    pub touch: TouchConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: 320.0,
            max_reverse_speed: 45.0,
            acceleration_multiplier: 4.0,
            max_steering_angle: 27.0,
            steering_speed: 0.5,
            brake_force: 350.0,
            coasting_drag: 0.05,
            surfaces: SurfaceConfig::default(),
            reference_wheel: WheelPos::RearLeft,
            use_effects: true,
            use_ui: true,
            touch: TouchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub asphalt_grip: f32,
    pub grass_grip: f32,
    pub grass_tag: String,
    pub grass_coasting_multiplier: f32,
    pub grass_max_speed_multiplier: f32,
    pub gravel_tag: String,
    pub gravel_coasting_multiplier: f32,
    pub gravel_max_speed_multiplier: f32,
    pub border_tag: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            asphalt_grip: 10.0,
            grass_grip: 0.6,
            grass_tag: "Grass".to_string(),
            grass_coasting_multiplier: 1.0,
            grass_max_speed_multiplier: 0.5,
            gravel_tag: "Gravel".to_string(),
            gravel_coasting_multiplier: 4.0,
            gravel_max_speed_multiplier: 0.1,
            border_tag: "Border".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub enabled: bool,
    pub wired: Vec<TouchButton>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub use_sounds: bool,
    pub engine_clips: Vec<String>, // ordered low to high RPM
    pub tire_screech_clip: Option<String>,
    pub collision_clip: Option<String>,
    pub collision_volume: f32,
    pub number_of_gears: usize,
    pub rev_up_speed: f32,
    pub rev_down_speed: f32,
    pub idle_rpm: f32, // normalized 0..1
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            use_sounds: true,
            engine_clips: vec![
                "engine_idle".to_string(),
                "engine_low".to_string(),
                "engine_mid".to_string(),
                "engine_high".to_string(),
            ],
            tire_screech_clip: Some("tire_screech".to_string()),
            collision_clip: Some("border_hit".to_string()),
            collision_volume: 1.0,
            number_of_gears: 8,
            rev_up_speed: 5.0,
            rev_down_speed: 2.5,
            idle_rpm: 0.20,
        }
    }
}

/// Clip catalog for the process-wide audio service. `enabled = false` runs the
/// server without any audio output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioServiceConfig {
    pub enabled: bool,
    pub catalog: Vec<String>,
}

impl Default for AudioServiceConfig {
    fn default() -> Self {
        let audio = AudioConfig::default();
        let mut catalog = audio.engine_clips;
        catalog.extend(audio.tire_screech_clip);
        catalog.extend(audio.collision_clip);
        Self {
            enabled: true,
            catalog,
        }
    }
}

fn check(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl ServerConfig {
    /// Load from the first CLI argument, else from `$DRIVETRAIN_CONFIG`, else
    /// built-in defaults.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from);

        match path {
            Some(path) => Self::load(&path),
            None => {
                info!("no config file given, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check("physics_hz", self.physics_hz, 10.0, 1000.0)?;
        check("frame_hz", self.frame_hz, 10.0, 1000.0)?;
        self.vehicle.validate()?;
        self.audio.validate()
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("max_speed", self.max_speed, 100.0, 380.0)?;
        check("max_reverse_speed", self.max_reverse_speed, 10.0, 120.0)?;
        check("acceleration_multiplier", self.acceleration_multiplier, 4.0, 16.0)?;
        check("max_steering_angle", self.max_steering_angle, 10.0, 50.0)?;
        check("steering_speed", self.steering_speed, 0.1, 1.0)?;
        check("brake_force", self.brake_force, 100.0, 1000.0)?;
        check("coasting_drag", self.coasting_drag, 0.01, 1.0)?;
        self.surfaces.validate()
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("asphalt_grip", self.asphalt_grip, 1.0, 10.0)?;
        check("grass_grip", self.grass_grip, 0.1, 1.0)?;
        check("grass_coasting_multiplier", self.grass_coasting_multiplier, 1.0, 5.0)?;
        check("grass_max_speed_multiplier", self.grass_max_speed_multiplier, 0.1, 1.0)?;
        check("gravel_coasting_multiplier", self.gravel_coasting_multiplier, 1.0, 5.0)?;
        check("gravel_max_speed_multiplier", self.gravel_max_speed_multiplier, 0.1, 1.0)?;
        if self.grass_tag.is_empty() {
            return Err(ConfigError::Empty("grass_tag"));
        }
        if self.gravel_tag.is_empty() {
            return Err(ConfigError::Empty("gravel_tag"));
        }
        Ok(())
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("number_of_gears", self.number_of_gears as f32, 4.0, 8.0)?;
        check("rev_up_speed", self.rev_up_speed, 1.0, 20.0)?;
        check("rev_down_speed", self.rev_down_speed, 0.5, 10.0)?;
        check("idle_rpm", self.idle_rpm, 0.0, 0.9)?;
        check("collision_volume", self.collision_volume, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{ "vehicle": { "max_speed": 200 } }"#).unwrap();
        assert_eq!(cfg.vehicle.max_speed, 200.0);
        assert_eq!(cfg.vehicle.max_reverse_speed, 45.0);
        assert_eq!(cfg.vehicle.surfaces.grass_tag, "Grass");
        assert_eq!(cfg.audio.number_of_gears, 8);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut cfg = ServerConfig::default();
        cfg.audio.number_of_gears = 12;
        match cfg.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "number_of_gears"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nan_is_rejected() {
        let mut cfg = VehicleConfig::default();
        cfg.coasting_drag = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ServerConfig::load(Path::new("/nonexistent/drivetrain.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/drivetrain.json"));
    }

    #[test]
    fn default_catalog_covers_default_clips() {
        let svc = AudioServiceConfig::default();
        let audio = AudioConfig::default();
        for clip in &audio.engine_clips {
            assert!(svc.catalog.contains(clip));
        }
        assert!(svc.catalog.contains(&"tire_screech".to_string()));
    }
}
