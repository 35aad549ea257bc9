// src/physics.rs
//
// Rapier world standing in for the wheel-collider physics: a flat asphalt
// ground with tagged grass/gravel patches and border walls, plus raycast
// suspension cars whose wheels read their commands from a WheelSet.

use std::collections::{HashMap, HashSet};

use rapier3d::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SurfaceConfig;
use crate::rig::{LocalVelocity, WheelRig};
use crate::suspension::{WheelMount, build_suspension_contact, suspension_from_sag};
use crate::wheels::{GroundHit, WheelPos, WheelSet};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);
const GROUP_BORDER: Group = Group::from_bits_truncate(0b0100);

const LATERAL_RELAXATION: f32 = 0.8;
const AIR_SPIN_DECAY: f32 = 0.98;
const MAX_NORMAL_FORCE: f32 = 25_000.0;
const WORLD_LIMIT: f32 = 1_000.0;

pub struct ChassisConfig {
    pub mass: f32, // kg
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub half_extents: [f32; 3],
    pub com_offset: [f32; 3],
    pub wheel_radius: f32,
    pub rest_length: f32,
    pub max_length: f32,
    pub sag: f32, // m of static compression
    pub zeta: f32,
    pub wheel_offsets: [(WheelPos, [f32; 3]); 4],
}

pub const ARCADE_CAR: ChassisConfig = ChassisConfig {
    mass: 900.0,
    linear_damping: 0.0, // coasting drag is the controller's job
    angular_damping: 0.1,
    half_extents: [1.0, 0.35, 2.1],
    com_offset: [0.0, -0.15, 0.0],
    wheel_radius: 0.35,
    rest_length: 0.5,
    max_length: 0.4,
    sag: 0.05,
    zeta: 0.9,
    wheel_offsets: [
        (WheelPos::FrontLeft, [-0.8, -0.3, 1.5]),
        (WheelPos::FrontRight, [0.8, -0.3, 1.5]),
        (WheelPos::RearLeft, [-0.8, -0.3, -1.5]),
        (WheelPos::RearRight, [0.8, -0.3, -1.5]),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Grass,
    Gravel,
    Border,
}

pub struct TrackPiece {
    pub kind: PieceKind,
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

pub const ARENA_HALF: f32 = 150.0;

pub const TRACK: [TrackPiece; 6] = [
    TrackPiece { kind: PieceKind::Grass, center: [-40.0, 0.0, 0.0], half_extents: [15.0, 0.01, 60.0] },
    TrackPiece { kind: PieceKind::Gravel, center: [40.0, 0.0, 0.0], half_extents: [15.0, 0.01, 60.0] },
    TrackPiece { kind: PieceKind::Border, center: [0.0, 1.0, ARENA_HALF], half_extents: [ARENA_HALF, 1.0, 0.5] },
    TrackPiece { kind: PieceKind::Border, center: [0.0, 1.0, -ARENA_HALF], half_extents: [ARENA_HALF, 1.0, 0.5] },
    TrackPiece { kind: PieceKind::Border, center: [ARENA_HALF, 1.0, 0.0], half_extents: [0.5, 1.0, ARENA_HALF] },
    TrackPiece { kind: PieceKind::Border, center: [-ARENA_HALF, 1.0, 0.0], half_extents: [0.5, 1.0, ARENA_HALF] },
];

#[inline]
fn p3(p: Point<Real>) -> [f32; 3] {
    [p.x, p.y, p.z]
}

pub struct Car {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub wheels: WheelSet,
    mounts: [WheelMount; 4],
    touching: HashSet<ColliderHandle>,
}

/// A contact that began during the last step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactStart {
    pub car: RigidBodyHandle,
    pub tag: Option<String>,
    pub point: [f32; 3],
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    pub tags: HashMap<ColliderHandle, String>, // collider → surface / border tag
    pub cars: HashMap<RigidBodyHandle, Car>,
}

impl PhysicsWorld {
    pub fn new(surfaces: &SurfaceConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut tags = HashMap::new();

        // Ground box, top surface exactly at y = 0. Untagged, so asphalt.
        let ground = bodies.insert(RigidBodyBuilder::fixed().translation(vector![0.0, -1.0, 0.0]).build());
        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        for piece in &TRACK {
            let [hx, hy, hz] = piece.half_extents;
            let [x, y, z] = piece.center;
            let builder = ColliderBuilder::cuboid(hx, hy, hz).translation(vector![x, y, z]);

            // Patches are sensors: rays see them, the chassis drives over them.
            let (collider, tag) = match piece.kind {
                PieceKind::Grass => (
                    builder
                        .sensor(true)
                        .collision_groups(InteractionGroups::new(GROUP_GROUND, Group::NONE)),
                    &surfaces.grass_tag,
                ),
                PieceKind::Gravel => (
                    builder
                        .sensor(true)
                        .collision_groups(InteractionGroups::new(GROUP_GROUND, Group::NONE)),
                    &surfaces.gravel_tag,
                ),
                PieceKind::Border => (
                    builder
                        .collision_groups(InteractionGroups::new(GROUP_BORDER, GROUP_CHASSIS))
                        .friction(0.3)
                        .restitution(0.2),
                    &surfaces.border_tag,
                ),
            };
            let handle = colliders.insert(collider.build());
            tags.insert(handle, tag.clone());
        }

        info!(colliders = colliders.len(), tagged = tags.len(), "track built");

        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            tags,
            cars: HashMap::new(),
        }
    }

    /// Drop a car slightly above `position` (x, z used; y fixed) so it
    /// settles onto its springs.
    pub fn spawn_car(&mut self, position: [f32; 3]) -> RigidBodyHandle {
        let cfg = &ARCADE_CAR;
        let [hx, hy, hz] = cfg.half_extents;
        let [cx, cy, cz] = cfg.com_offset;
        let density = cfg.mass / (8.0 * hx * hy * hz);

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], 1.3, position[2]])
            .linear_damping(cfg.linear_damping)
            .angular_damping(cfg.angular_damping)
            .ccd_enabled(true)
            .build();
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_BORDER))
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let body = self.bodies.insert(rb);
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        let (k, c) = suspension_from_sag(cfg.mass, 4, cfg.sag, cfg.zeta);
        let mounts = cfg.wheel_offsets.map(|(pos, [x, y, z])| WheelMount {
            pos,
            offset: point![x, y, z],
            rest_length: cfg.rest_length,
            max_length: cfg.max_length,
            radius: cfg.wheel_radius,
            stiffness: k,
            damping: c,
        });

        self.cars.insert(
            body,
            Car {
                body,
                collider,
                wheels: WheelSet::uniform(cfg.wheel_radius),
                mounts,
                touching: HashSet::new(),
            },
        );
        debug!(?body, ?position, k, c, "car spawned");
        body
    }

    pub fn remove_car(&mut self, body: RigidBodyHandle) {
        if self.cars.remove(&body).is_some() {
            self.bodies.remove(
                body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
            debug!(?body, "car removed");
        }
    }

    pub fn rig(&mut self, body: RigidBodyHandle) -> Option<ChassisRig<'_>> {
        let car = self.cars.get_mut(&body)?;
        let chassis = self.bodies.get_mut(body)?;
        Some(ChassisRig {
            body: chassis,
            wheels: &mut car.wheels,
        })
    }

    pub fn car_pose(&self, body: RigidBodyHandle) -> Option<([f32; 3], [f32; 4])> {
        let b = self.bodies.get(body)?;
        let t = b.translation();
        let r = b.rotation();
        Some(([t.x, t.y, t.z], [r.i, r.j, r.k, r.w]))
    }

    /// Raycast every wheel, write ground hits and rpm back into the WheelSet,
    /// and turn the wheel commands into impulses.
    fn apply_wheels(&mut self, dt: Real) {
        self.query_pipeline.update(&self.colliders);

        let mut impulses: Vec<(RigidBodyHandle, Vector<Real>, Point<Real>)> = Vec::new();

        for (&handle, car) in self.cars.iter_mut() {
            let Some(body) = self.bodies.get(handle) else { continue };
            let wheel_mass = body.mass() / car.mounts.len() as f32;

            for mount in &car.mounts {
                let wheel = &mut car.wheels[mount.pos];
                let contact = build_suspension_contact(
                    mount,
                    wheel.steer_angle,
                    body,
                    handle,
                    &self.query_pipeline,
                    &self.bodies,
                    &self.colliders,
                );

                let Some(contact) = contact else {
                    wheel.ground = None;
                    wheel.rpm *= AIR_SPIN_DECAY;
                    continue;
                };

                wheel.ground = Some(GroundHit {
                    point: p3(contact.hit_point),
                    tag: self.tags.get(&contact.collider).cloned(),
                });
                wheel.rpm = contact.v_long / (2.0 * std::f32::consts::PI * wheel.radius) * 60.0;

                let normal_force = contact.normal_force.min(MAX_NORMAL_FORCE);
                impulses.push((handle, vector![0.0, 1.0, 0.0] * (normal_force * dt), contact.hit_point));

                // longitudinal: drive minus brake, limited by forward grip
                let drive = wheel.motor_torque / wheel.radius * dt;
                let brake_cap = wheel.brake_torque / wheel.radius * dt;
                let to_stop = contact.v_long.abs() * wheel_mass;
                let brake = -contact.v_long.signum() * brake_cap.min(to_stop);
                let f = wheel.forward_friction;
                let long_cap = f.extremum_value * f.stiffness * normal_force * dt;
                let j_long = (drive + brake).clamp(-long_cap, long_cap);

                // lateral: cancel slip, limited by sideways grip
                let s = wheel.sideways_friction;
                let lat_cap = s.extremum_value * s.stiffness * normal_force * dt;
                let j_lat = (-contact.v_lat * wheel_mass * LATERAL_RELAXATION).clamp(-lat_cap, lat_cap);

                let j = contact.forward * j_long + contact.side * j_lat;
                impulses.push((handle, j, contact.apply_point));
            }
        }

        for (handle, impulse, point) in impulses {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.apply_impulse_at_point(impulse, point, true);
            }
        }
    }

    /// Contacts between a car chassis and anything else that started during
    /// the last step.
    pub fn take_contact_starts(&mut self) -> Vec<ContactStart> {
        let mut out = Vec::new();

        for car in self.cars.values_mut() {
            let mut now = HashSet::new();
            for pair in self.narrow_phase.contact_pairs_with(car.collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let other = if pair.collider1 == car.collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                now.insert(other);
                if car.touching.contains(&other) {
                    continue;
                }

                let point = pair
                    .manifolds
                    .iter()
                    .flat_map(|m| m.data.solver_contacts.iter())
                    .map(|c| p3(c.point))
                    .next()
                    .or_else(|| self.bodies.get(car.body).map(|b| p3((*b.translation()).into())))
                    .unwrap_or_default();

                out.push(ContactStart {
                    car: car.body,
                    tag: self.tags.get(&other).cloned(),
                    point,
                });
            }
            car.touching = now;
        }
        out
    }

    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let events = ();

        self.apply_wheels(dt);

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // Safety: prevent bodies from exploding to insane coordinates
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > WORLD_LIMIT
                || pos.y.abs() > WORLD_LIMIT
                || pos.z.abs() > WORLD_LIMIT;

            if bad {
                body.set_translation(vector![0.0, 1.3, 0.0], true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                warn!(?handle, "reset exploding body");
            }
        }
    }
}

/// One car's chassis + wheels, borrowed out of the world for a controller pass.
pub struct ChassisRig<'a> {
    body: &'a mut RigidBody,
    wheels: &'a mut WheelSet,
}

impl WheelRig for ChassisRig<'_> {
    fn wheels(&self) -> &WheelSet {
        self.wheels
    }

    fn wheels_mut(&mut self) -> &mut WheelSet {
        self.wheels
    }

    fn local_velocity(&self) -> LocalVelocity {
        let local = self.body.rotation().inverse_transform_vector(self.body.linvel());
        LocalVelocity {
            lateral: local.x,
            longitudinal: local.z,
        }
    }

    fn linear_speed(&self) -> f32 {
        self.body.linvel().magnitude()
    }

    fn scale_velocity(&mut self, factor: f32) {
        let v = *self.body.linvel() * factor;
        self.body.set_linvel(v, true);
    }

    fn stop_linear(&mut self) {
        self.body.set_linvel(vector![0.0, 0.0, 0.0], true);
    }

    fn halt(&mut self) {
        self.stop_linear();
        self.body.set_angvel(vector![0.0, 0.0, 0.0], true);
    }
}
