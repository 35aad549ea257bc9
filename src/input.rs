// ==============================================================================
// input.rs — RAW DEVICE STATE → ONE DriverInput PER FRAME
// ------------------------------------------------------------------------------
// Steering source:
//   steer keys held → keyboard (raw horizontal, digital)
//   else            → gamepad stick (analog, shaped later by the drive layer)
//   touch left/right (when enabled) override both
//
// Throttle:
//   RT - LT if |RT - LT| > 0.05, else the keyboard vertical axis
//   touch throttle/reverse (when enabled) override both
//
// Handbrake: key or touch button. The release edge is reported for exactly one
// frame so the drive layer can start traction recovery.
// ==============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TouchConfig;
use crate::error::InputError;

const TRIGGER_DEADZONE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchButton {
    Throttle,
    Reverse,
    Left,
    Right,
    Handbrake,
}

impl TouchButton {
    pub const ALL: [TouchButton; 5] = [
        TouchButton::Throttle,
        TouchButton::Reverse,
        TouchButton::Left,
        TouchButton::Right,
        TouchButton::Handbrake,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TouchState {
    pub throttle: bool,
    pub reverse: bool,
    pub left: bool,
    pub right: bool,
    pub handbrake: bool,
}

/// Device state as pushed by a client. Missing fields read as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawInput {
    pub vertical: f32,   // keyboard, -1..1
    pub horizontal: f32, // keyboard, -1..1
    pub steer_keys_held: bool,
    pub stick_x: f32, // gamepad, -1..1
    pub rt: f32,      // 0..1
    pub lt: f32,      // 0..1
    pub handbrake: bool,
    pub touch: TouchState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SteeringSource {
    #[default]
    Keyboard,
    Gamepad,
    Touch,
}

impl SteeringSource {
    /// Analog sources get the response curve and speed gating.
    pub fn is_analog(self) -> bool {
        self == SteeringSource::Gamepad
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverInput {
    pub throttle: f32,
    pub steer: f32,
    pub source: SteeringSource,
    pub handbrake_held: bool,
    pub handbrake_released: bool,
}

/// Every touch button must be wired before touch input is honored.
pub fn check_touch_wiring(config: &TouchConfig) -> Result<(), InputError> {
    let missing: Vec<TouchButton> = TouchButton::ALL
        .into_iter()
        .filter(|b| !config.wired.contains(b))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InputError::TouchNotWired(missing))
    }
}

#[derive(Debug, Default)]
pub struct InputSampler {
    touch_enabled: bool,
    handbrake_was_held: bool,
}

impl InputSampler {
    pub fn new(touch: &TouchConfig) -> Self {
        let touch_enabled = touch.enabled
            && match check_touch_wiring(touch) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "touch controls disabled");
                    false
                }
            };

        Self {
            touch_enabled,
            handbrake_was_held: false,
        }
    }

    pub fn touch_enabled(&self) -> bool {
        self.touch_enabled
    }

    pub fn sample(&mut self, raw: &RawInput) -> DriverInput {
        let (mut steer, mut source) = if raw.steer_keys_held {
            (axis(raw.horizontal), SteeringSource::Keyboard)
        } else {
            (axis(raw.stick_x), SteeringSource::Gamepad)
        };

        let triggers = axis(unit(raw.rt) - unit(raw.lt));
        let mut throttle = if triggers.abs() > TRIGGER_DEADZONE {
            triggers
        } else {
            axis(raw.vertical)
        };

        let mut handbrake_held = raw.handbrake;

        if self.touch_enabled {
            let t = raw.touch;
            if t.throttle {
                throttle = 1.0;
            } else if t.reverse {
                throttle = -1.0;
            }
            if t.right {
                steer = 1.0;
                source = SteeringSource::Touch;
            } else if t.left {
                steer = -1.0;
                source = SteeringSource::Touch;
            }
            handbrake_held |= t.handbrake;
        }

        let handbrake_released = self.handbrake_was_held && !handbrake_held;
        if handbrake_held != self.handbrake_was_held {
            debug!(held = handbrake_held, "handbrake");
        }
        self.handbrake_was_held = handbrake_held;

        DriverInput {
            throttle,
            steer,
            source,
            handbrake_held,
            handbrake_released,
        }
    }
}

fn axis(v: f32) -> f32 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
