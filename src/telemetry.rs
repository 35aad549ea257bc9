//! Cosmetic outputs: drift particles, skid trails and the speed/gear readout.

use serde::Serialize;

use crate::config::VehicleConfig;
use crate::drive::{DriveMode, VehicleState};
use crate::schedule::TaskSlot;
use crate::surface::SurfaceClass;

const UI_PERIOD: f32 = 0.1;
const SKID_LATERAL_VELOCITY: f32 = 5.0; // m/s
const SKID_MIN_SPEED: f32 = 12.0; // km/h

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Effects {
    pub drift_particles: bool,
    pub skid_trails: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UiReadout {
    pub speed: i32, // km/h, rounded magnitude
    pub gear: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryFrame {
    pub ui: Option<UiReadout>,
    pub is_drifting: bool,
    pub is_traction_locked: bool,
    pub effects: Effects,
    pub surface: SurfaceClass,
    pub mode: DriveMode,
    pub throttle_axis: f32,
    pub steering_axis: f32,
    pub drift_axis: f32,
}

#[derive(Debug)]
pub struct TelemetrySink {
    use_effects: bool,
    effects: Effects,
    ui: Option<UiReadout>,
    ui_refresh: TaskSlot,
}

impl TelemetrySink {
    pub fn new(config: &VehicleConfig) -> Self {
        let mut ui_refresh = TaskSlot::new();
        let ui = if config.use_ui {
            ui_refresh.start(0.0, UI_PERIOD);
            Some(UiReadout::default())
        } else {
            None
        };
        Self {
            use_effects: config.use_effects,
            effects: Effects::default(),
            ui,
            ui_refresh,
        }
    }

    pub fn effects(&self) -> Effects {
        self.effects
    }

    pub fn ui(&self) -> Option<UiReadout> {
        self.ui
    }

    /// Called whenever the drive layer re-evaluated the drift flag.
    pub fn refresh_effects(&mut self, state: &VehicleState) {
        if !self.use_effects {
            return;
        }
        self.effects = Effects {
            drift_particles: state.is_drifting,
            skid_trails: (state.is_traction_locked
                || state.local_velocity.lateral.abs() > SKID_LATERAL_VELOCITY)
                && state.speed.abs() > SKID_MIN_SPEED,
        };
    }

    pub fn tick(&mut self, state: &VehicleState, gear: usize, dt: f32) {
        if self.ui_refresh.advance(dt) == 0 {
            return;
        }
        if let Some(ui) = self.ui.as_mut() {
            ui.speed = state.speed.abs().round() as i32;
            ui.gear = gear;
        }
    }

    pub fn frame(&self, state: &VehicleState, surface: SurfaceClass, mode: DriveMode) -> TelemetryFrame {
        TelemetryFrame {
            ui: self.ui,
            is_drifting: state.is_drifting,
            is_traction_locked: state.is_traction_locked,
            effects: self.effects,
            surface,
            mode,
            throttle_axis: state.throttle_axis,
            steering_axis: state.steering_axis,
            drift_axis: state.drift_axis,
        }
    }
}
