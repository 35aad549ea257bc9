// ==============================================================================
// wheels.rs — WHEEL IDENTITY + PER-WHEEL COLLIDER STATE
// ------------------------------------------------------------------------------
// The four wheels are always handled as one fixed-size set indexed by position.
// Controller code never names a single wheel field; it iterates WheelPos::ALL
// (or the front pair) so the wheels cannot diverge in behavior.
//
// WheelCollider is the contract with the physics collaborator:
// - written by the controller: motor_torque, brake_torque, steer_angle,
//   sideways_friction, forward_friction
// - written by the physics rig: rpm, ground
// ==============================================================================

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelPos {
    #[serde(rename = "FL")]
    FrontLeft,
    #[serde(rename = "FR")]
    FrontRight,
    #[serde(rename = "RL")]
    RearLeft,
    #[serde(rename = "RR")]
    RearRight,
}

impl WheelPos {
    pub const ALL: [WheelPos; 4] = [
        WheelPos::FrontLeft,
        WheelPos::FrontRight,
        WheelPos::RearLeft,
        WheelPos::RearRight,
    ];

    pub const FRONT: [WheelPos; 2] = [WheelPos::FrontLeft, WheelPos::FrontRight];

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelPos::FrontLeft => "FL",
            WheelPos::FrontRight => "FR",
            WheelPos::RearLeft => "RL",
            WheelPos::RearRight => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelPos::FrontLeft | WheelPos::FrontRight)
    }

    fn index(self) -> usize {
        match self {
            WheelPos::FrontLeft => 0,
            WheelPos::FrontRight => 1,
            WheelPos::RearLeft => 2,
            WheelPos::RearRight => 3,
        }
    }
}

impl fmt::Display for WheelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wheel-collider style friction curve. Only `stiffness` is modulated at
/// runtime; the slip/value points stay as configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrictionCurve {
    pub extremum_slip: f32,
    pub extremum_value: f32,
    pub asymptote_slip: f32,
    pub asymptote_value: f32,
    pub stiffness: f32,
}

impl FrictionCurve {
    pub fn with_stiffness(self, stiffness: f32) -> Self {
        Self { stiffness, ..self }
    }
}

impl Default for FrictionCurve {
    fn default() -> Self {
        Self {
            extremum_slip: 0.2,
            extremum_value: 1.0,
            asymptote_slip: 0.5,
            asymptote_value: 0.75,
            stiffness: 1.0,
        }
    }
}

/// Ground contact reported by the physics rig for one wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundHit {
    pub point: [f32; 3],
    pub tag: Option<String>,
}

impl GroundHit {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// Per-tick output of the drive layer for one wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelCommand {
    pub motor_torque: f32, // N*m
    pub brake_torque: f32, // N*m
    pub steer_angle: f32,  // degrees, front wheels only
}

#[derive(Debug, Clone)]
pub struct WheelCollider {
    pub radius: f32, // m
    pub rpm: f32,    // rev/min, signed

    pub motor_torque: f32,
    pub brake_torque: f32,
    pub steer_angle: f32, // degrees

    pub forward_friction: FrictionCurve,
    pub sideways_friction: FrictionCurve,

    pub ground: Option<GroundHit>,
}

impl WheelCollider {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            rpm: 0.0,
            motor_torque: 0.0,
            brake_torque: 0.0,
            steer_angle: 0.0,
            forward_friction: FrictionCurve::default(),
            sideways_friction: FrictionCurve::default(),
            ground: None,
        }
    }

    pub fn command(&self) -> WheelCommand {
        WheelCommand {
            motor_torque: self.motor_torque,
            brake_torque: self.brake_torque,
            steer_angle: self.steer_angle,
        }
    }

    /// Ground speed implied by wheel spin, km/h.
    pub fn speed_kmh(&self) -> f32 {
        (2.0 * std::f32::consts::PI * self.radius * self.rpm * 60.0) / 1000.0
    }
}

#[derive(Debug, Clone)]
pub struct WheelSet([WheelCollider; 4]);

impl WheelSet {
    pub fn uniform(radius: f32) -> Self {
        Self(std::array::from_fn(|_| WheelCollider::new(radius)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WheelPos, &WheelCollider)> {
        WheelPos::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WheelPos, &mut WheelCollider)> {
        WheelPos::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn set_motor_torque(&mut self, torque: f32) {
        for w in self.0.iter_mut() {
            w.motor_torque = torque;
        }
    }

    pub fn set_brake_torque(&mut self, torque: f32) {
        for w in self.0.iter_mut() {
            w.brake_torque = torque;
        }
    }

    pub fn commands(&self) -> [(WheelPos, WheelCommand); 4] {
        std::array::from_fn(|i| (WheelPos::ALL[i], self.0[i].command()))
    }
}

impl Index<WheelPos> for WheelSet {
    type Output = WheelCollider;

    fn index(&self, pos: WheelPos) -> &WheelCollider {
        &self.0[pos.index()]
    }
}

impl IndexMut<WheelPos> for WheelSet {
    fn index_mut(&mut self, pos: WheelPos) -> &mut WheelCollider {
        &mut self.0[pos.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_pair_is_front() {
        assert!(WheelPos::FRONT.iter().all(|w| w.is_front()));
        assert_eq!(WheelPos::ALL.iter().filter(|w| w.is_front()).count(), 2);
    }

    #[test]
    fn speed_from_rpm() {
        let mut w = WheelCollider::new(0.35);
        w.rpm = 1000.0;
        // 2*pi*0.35*1000*60/1000 = 131.95 km/h
        assert!((w.speed_kmh() - 131.946).abs() < 0.01);
    }

    #[test]
    fn set_torque_reaches_every_wheel() {
        let mut set = WheelSet::uniform(0.3);
        set.set_motor_torque(120.0);
        set.set_brake_torque(5.0);
        for (_, w) in set.iter() {
            assert_eq!(w.motor_torque, 120.0);
            assert_eq!(w.brake_torque, 5.0);
        }
    }

    #[test]
    fn index_by_position() {
        let mut set = WheelSet::uniform(0.3);
        set[WheelPos::RearRight].rpm = 42.0;
        assert_eq!(set[WheelPos::RearRight].rpm, 42.0);
        assert_eq!(set[WheelPos::FrontLeft].rpm, 0.0);
    }

    #[test]
    fn serializes_short_ids() {
        let s = serde_json::to_string(&WheelPos::FrontRight).unwrap();
        assert_eq!(s, "\"FR\"");
    }
}
