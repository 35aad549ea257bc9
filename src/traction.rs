// ==============================================================================
// traction.rs — SURFACE + HANDBRAKE → GRIP / DRAG / TOP SPEED
// ------------------------------------------------------------------------------
// Lateral:
//   handbrake            → grass_grip * 0.5
//   grass                → grass_grip
//   asphalt / gravel     → asphalt_grip
//   applied as a stiffness multiplier on each wheel's CAPTURED sideways curve,
//   never on the curve written last tick.
//
// Longitudinal (every tick, handbrake or not):
//   gravel → drag * gravel_coasting, top * gravel_max_speed
//   grass  → drag * grass_coasting,  top * grass_max_speed
//   else   → exact base values
//
// A TractionModel only exists after capture(), so the captured curves are
// always there when update() runs.
// ==============================================================================

use tracing::debug;

use crate::config::{SurfaceConfig, VehicleConfig};
use crate::rig::WheelRig;
use crate::surface::SurfaceSample;
use crate::wheels::{FrictionCurve, WheelPos};

const FORWARD_STIFFNESS: f32 = 2.0;
const HANDBRAKE_GRIP_FACTOR: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TractionParameters {
    pub grip: f32,
    pub coasting_drag: f32,
    pub top_speed: f32,         // km/h
    pub reverse_top_speed: f32, // km/h
}

#[derive(Debug, Clone)]
pub struct TractionModel {
    base_sideways: [(WheelPos, FrictionCurve); 4],
    base: TractionParameters,
    surfaces: SurfaceConfig,
    current: TractionParameters,
}

impl TractionModel {
    /// Firm up forward friction for braking and capture the default sideways
    /// curve of every wheel.
    pub fn capture(rig: &mut dyn WheelRig, config: &VehicleConfig) -> Self {
        for (_, wheel) in rig.wheels_mut().iter_mut() {
            wheel.forward_friction = wheel.forward_friction.with_stiffness(FORWARD_STIFFNESS);
        }

        let wheels = rig.wheels();
        let base_sideways = WheelPos::ALL.map(|pos| (pos, wheels[pos].sideways_friction));

        let base = TractionParameters {
            grip: config.surfaces.asphalt_grip,
            coasting_drag: config.coasting_drag,
            top_speed: config.max_speed,
            reverse_top_speed: config.max_reverse_speed,
        };

        Self {
            base_sideways,
            base,
            surfaces: config.surfaces.clone(),
            current: base,
        }
    }

    pub fn params(&self) -> TractionParameters {
        self.current
    }

    pub fn update(
        &mut self,
        sample: SurfaceSample,
        handbrake: bool,
        rig: &mut dyn WheelRig,
    ) -> TractionParameters {
        let s = &self.surfaces;

        let grip = if handbrake {
            s.grass_grip * HANDBRAKE_GRIP_FACTOR
        } else if sample.on_grass {
            s.grass_grip
        } else {
            s.asphalt_grip
        };
        self.apply_grip(grip, rig);

        let (drag_mult, speed_mult) = if sample.on_gravel {
            (s.gravel_coasting_multiplier, s.gravel_max_speed_multiplier)
        } else if sample.on_grass {
            (s.grass_coasting_multiplier, s.grass_max_speed_multiplier)
        } else {
            (1.0, 1.0)
        };

        let next = if sample.on_gravel || sample.on_grass {
            TractionParameters {
                grip,
                coasting_drag: self.base.coasting_drag * drag_mult,
                top_speed: (self.base.top_speed * speed_mult).round(),
                ..self.base
            }
        } else {
            TractionParameters { grip, ..self.base }
        };

        if next != self.current {
            debug!(
                surface = ?sample.class,
                handbrake,
                grip = next.grip,
                drag = next.coasting_drag,
                top_speed = next.top_speed,
                "traction changed"
            );
        }
        self.current = next;
        next
    }

    fn apply_grip(&self, multiplier: f32, rig: &mut dyn WheelRig) {
        let wheels = rig.wheels_mut();
        for (pos, base) in self.base_sideways {
            wheels[pos].sideways_friction = base.with_stiffness(base.stiffness * multiplier);
        }
    }
}
