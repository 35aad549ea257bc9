// ==============================================================================
// suspension.rs — RAYCAST SUSPENSION + CONTACT KINEMATICS
// ------------------------------------------------------------------------------
// One ray per wheel, cast straight down from the mount point. A hit inside the
// suspension travel yields a SuspensionContact:
// - geometry: hit point, application point, ground collider
// - suspension: normal force (spring+damper) from compression and its rate
// - kinematics: wheel basis (forward/side after steering),
//   slip components v_long / v_lat
//
// This file does NOT apply impulses. physics.rs turns contacts into forces.
// Ground normal is assumed flat-up.
// ==============================================================================

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use crate::wheels::WheelPos;

const DAMPER_DEADZONE: f32 = 0.05; // m/s
const REBOUND_FACTOR: f32 = 0.4;
const DAMPER_CLAMP: f32 = 0.6; // fraction of spring force

#[derive(Debug, Clone, Copy)]
pub struct WheelMount {
    pub pos: WheelPos,
    pub offset: Point<Real>, // chassis local
    pub rest_length: Real,
    pub max_length: Real,
    pub radius: Real,
    pub stiffness: Real, // N/m
    pub damping: Real,   // N*s/m
}

#[derive(Debug, Clone)]
pub struct SuspensionContact {
    pub collider: ColliderHandle,

    pub hit_point: Point<Real>,
    pub apply_point: Point<Real>,

    pub normal_force: f32,

    pub forward: Vector<Real>,
    pub side: Vector<Real>,
    pub v_long: f32,
    pub v_lat: f32,
}

pub(crate) fn compute_suspension_force(compression: f32, suspension_vel: f32, k: f32, c: f32) -> f32 {
    let v = if suspension_vel.abs() < DAMPER_DEADZONE {
        0.0
    } else {
        suspension_vel
    };

    // one-way damper
    let v = if v > 0.0 { v * REBOUND_FACTOR } else { v };

    let spring = k * compression;
    let damper = (-c * v).clamp(-spring * DAMPER_CLAMP, spring * DAMPER_CLAMP);

    (spring + damper).max(0.0)
}

/// Spring and damper constants that settle `mass` on `wheels` springs at
/// `sag_m` of compression with damping ratio `zeta`.
pub fn suspension_from_sag(mass: f32, wheels: usize, sag_m: f32, zeta: f32) -> (f32, f32) {
    let m = mass / wheels.max(1) as f32;
    let f_static = m * 9.81;
    let k = f_static / sag_m.max(1e-3);
    let c = 2.0 * zeta * (k * m).sqrt();
    (k, c)
}

pub fn build_suspension_contact(
    mount: &WheelMount,
    steer_deg: f32,
    body: &RigidBody,
    handle: RigidBodyHandle,
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
) -> Option<SuspensionContact> {
    let pos = body.position();
    let rot = pos.rotation;
    let linvel = *body.linvel();
    let angvel = *body.angvel();
    let com = *body.center_of_mass();

    let origin = pos * mount.offset;
    let dir = vector![0.0, -1.0, 0.0];
    let ground_n = vector![0.0, 1.0, 0.0];

    let ray = Ray::new(origin, dir);
    let max_dist = mount.rest_length + mount.max_length + mount.radius;
    let filter = QueryFilter::default().exclude_rigid_body(handle);

    let (collider, toi) = query.cast_ray(bodies, colliders, &ray, max_dist, true, filter)?;
    if toi <= mount.radius {
        return None;
    }

    let hit_point = origin + dir * toi;
    let suspension_length = toi - mount.radius;
    let compression = (mount.rest_length - suspension_length).clamp(0.0, mount.max_length);
    if compression <= 0.0 {
        return None;
    }

    let r = hit_point.coords - com.coords;
    let point_vel = linvel + angvel.cross(&r);
    let suspension_vel = point_vel.dot(&ground_n);

    let normal_force =
        compute_suspension_force(compression, suspension_vel, mount.stiffness, mount.damping);

    let steer = if mount.pos.is_front() {
        steer_deg.to_radians()
    } else {
        0.0
    };
    let steer_rot = UnitQuaternion::from_axis_angle(&Vector::y_axis(), steer);
    let (forward, side) = wheel_basis(rot * (steer_rot * vector![0.0, 0.0, 1.0]), ground_n);

    Some(SuspensionContact {
        collider,
        hit_point,
        apply_point: hit_point + ground_n * (mount.radius * 0.25),
        normal_force,
        forward,
        side,
        v_long: point_vel.dot(&forward),
        v_lat: point_vel.dot(&side),
    })
}

/// Forward projected onto the ground plane, and the lateral axis (+x side of
/// the chassis for an unsteered wheel).
fn wheel_basis(forward: Vector<Real>, ground_n: Vector<Real>) -> (Vector<Real>, Vector<Real>) {
    let flat = forward - ground_n * forward.dot(&ground_n);
    let forward = if flat.magnitude() > 1e-6 {
        flat.normalize()
    } else {
        vector![0.0, 0.0, 1.0]
    };
    let side = ground_n.cross(&forward);
    (forward, side)
}
