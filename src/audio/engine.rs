// ==============================================================================
// engine.rs — VIRTUAL GEAR / RPM / LOAD MODEL
// ------------------------------------------------------------------------------
// gear        = first boundary above |speed| (top gear past the last one)
// speed rpm   = lerp(idle, 1, progress through the current gear)
// target      = pressed  → speed rpm
//               released → max(0.6 * speed rpm, idle)
//               |speed| < 2 km/h → idle
// rpm         = exponential approach at rev-up (pressed) / rev-down (released),
//               then floored at idle
// adjusted    = (rpm - idle) / (1 - idle), the position on the clip axis
// ==============================================================================

use crate::ease::{approach, inverse_lerp, lerp};
use crate::gearbox::GearTable;

const PEDAL_THRESHOLD: f32 = 0.1;
const LOAD_RISE_RATE: f32 = 5.0;
const LOAD_FALL_RATE: f32 = 3.0;
const OFF_THROTTLE_RPM_FACTOR: f32 = 0.6;
const IDLE_SPEED: f32 = 2.0; // km/h

#[derive(Debug, Clone, Copy)]
pub struct EngineTuning {
    pub rev_up_speed: f32,
    pub rev_down_speed: f32,
    pub idle_rpm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EngineAudioState {
    pub gear: usize,
    pub rpm: f32,
    pub target_rpm: f32,
    pub load: f32,
}

impl EngineAudioState {
    pub fn new(idle_rpm: f32) -> Self {
        Self {
            gear: 1,
            rpm: idle_rpm,
            target_rpm: idle_rpm,
            load: 0.0,
        }
    }

    /// Advance one frame and return the adjusted RPM in [0, 1].
    pub fn step(
        &mut self,
        gears: &GearTable,
        tuning: &EngineTuning,
        speed: f32,
        throttle_axis: f32,
        dt: f32,
    ) -> f32 {
        let idle = tuning.idle_rpm;
        let speed = speed.abs();
        let pressed = throttle_axis.abs() > PEDAL_THRESHOLD;

        self.gear = gears.gear_for(speed);
        let (lo, hi) = gears.bounds(self.gear);
        let speed_rpm = lerp(idle, 1.0, inverse_lerp(lo, hi, speed));

        if pressed {
            self.target_rpm = speed_rpm;
            self.load = approach(self.load, 1.0, LOAD_RISE_RATE, dt);
        } else {
            self.target_rpm = (speed_rpm * OFF_THROTTLE_RPM_FACTOR).max(idle);
            self.load = approach(self.load, 0.0, LOAD_FALL_RATE, dt);
        }
        if speed < IDLE_SPEED {
            self.target_rpm = idle;
        }

        let inertia = if pressed {
            tuning.rev_up_speed
        } else {
            tuning.rev_down_speed
        };
        self.rpm = approach(self.rpm, self.target_rpm, inertia, dt).max(idle);

        self.adjusted(idle)
    }

    pub fn adjusted(&self, idle_rpm: f32) -> f32 {
        ((self.rpm - idle_rpm) / (1.0 - idle_rpm)).clamp(0.0, 1.0)
    }
}

/// Two neighbouring clips around `adjusted` on a `clips`-long axis and the
/// blend toward the upper one.
pub fn clip_blend(adjusted: f32, clips: usize) -> (usize, usize, f32) {
    let last = clips.saturating_sub(1);
    let exact = adjusted.clamp(0.0, 1.0) * last as f32;
    let a = (exact.floor() as usize).min(last);
    let b = (exact.ceil() as usize).min(last);
    (a, b, exact - a as f32)
}
