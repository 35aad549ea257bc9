//! Interface to the physics collaborator.
//!
//! The controller never talks to rapier directly: it reads and writes a
//! [`WheelSet`] and a handful of chassis operations through [`WheelRig`].

use crate::wheels::{WheelPos, WheelSet};

/// Chassis velocity expressed in the vehicle's local frame, m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalVelocity {
    pub lateral: f32,      // +x right
    pub longitudinal: f32, // +z forward
}

pub trait WheelRig {
    fn wheels(&self) -> &WheelSet;
    fn wheels_mut(&mut self) -> &mut WheelSet;

    fn local_velocity(&self) -> LocalVelocity;

    /// Magnitude of the chassis linear velocity, m/s.
    fn linear_speed(&self) -> f32;

    /// Multiply the chassis linear velocity by `factor`.
    fn scale_velocity(&mut self, factor: f32);

    /// Zero linear velocity only.
    fn stop_linear(&mut self);

    /// Zero linear and angular velocity.
    fn halt(&mut self);

    /// Signed ground speed derived from front-left wheel spin, km/h.
    fn speed_kmh(&self) -> f32 {
        self.wheels()[WheelPos::FrontLeft].speed_kmh()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::wheels::GroundHit;

    /// Point-mass rig: torque / radius pushes the chassis, brakes oppose motion,
    /// wheel rpm follows ground speed.
    pub struct FakeRig {
        pub wheels: WheelSet,
        pub velocity: LocalVelocity,
        pub angular: f32,
        pub mass: f32,
    }

    impl FakeRig {
        pub fn new() -> Self {
            let mut rig = Self {
                wheels: WheelSet::uniform(0.35),
                velocity: LocalVelocity::default(),
                angular: 0.0,
                mass: 400.0,
            };
            rig.set_ground(Some("Asphalt"));
            rig
        }

        pub fn with_longitudinal(mut self, v: f32) -> Self {
            self.set_longitudinal(v);
            self
        }

        pub fn set_longitudinal(&mut self, v: f32) {
            self.velocity.longitudinal = v;
            self.sync_rpm();
        }

        pub fn set_ground(&mut self, tag: Option<&str>) {
            for (_, w) in self.wheels.iter_mut() {
                w.ground = Some(GroundHit {
                    point: [0.0; 3],
                    tag: tag.map(str::to_string),
                });
            }
        }

        pub fn set_wheel_ground(&mut self, pos: WheelPos, ground: Option<GroundHit>) {
            self.wheels[pos].ground = ground;
        }

        pub fn step(&mut self, dt: f32) {
            let mut force = 0.0;
            for (_, w) in self.wheels.iter() {
                force += w.motor_torque / w.radius;
            }
            let v = self.velocity.longitudinal;
            let mut dv = force / self.mass * dt;

            let brake: f32 = self.wheels.iter().map(|(_, w)| w.brake_torque / w.radius).sum();
            if brake > 0.0 && v.abs() > 0.0 {
                let stop = (brake / self.mass * dt).min(v.abs());
                dv -= stop * v.signum();
            }
            self.velocity.longitudinal = v + dv;
            self.sync_rpm();
        }

        fn sync_rpm(&mut self) {
            let v = self.velocity.longitudinal;
            for (_, w) in self.wheels.iter_mut() {
                w.rpm = v / (2.0 * std::f32::consts::PI * w.radius) * 60.0;
            }
        }
    }

    impl WheelRig for FakeRig {
        fn wheels(&self) -> &WheelSet {
            &self.wheels
        }

        fn wheels_mut(&mut self) -> &mut WheelSet {
            &mut self.wheels
        }

        fn local_velocity(&self) -> LocalVelocity {
            self.velocity
        }

        fn linear_speed(&self) -> f32 {
            let v = self.velocity;
            (v.lateral * v.lateral + v.longitudinal * v.longitudinal).sqrt()
        }

        fn scale_velocity(&mut self, factor: f32) {
            self.velocity.lateral *= factor;
            self.velocity.longitudinal *= factor;
            self.sync_rpm();
        }

        fn stop_linear(&mut self) {
            self.velocity = LocalVelocity::default();
            self.sync_rpm();
        }

        fn halt(&mut self) {
            self.stop_linear();
            self.angular = 0.0;
        }
    }
}
