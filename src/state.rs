use std::collections::HashMap;

use rapier3d::prelude::RigidBodyHandle;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::audio::engine::EngineAudioState;
use crate::audio::service::{AudioService, SoundEvent};
use crate::audio::voices::SoundSlot;
use crate::config::ServerConfig;
use crate::input::RawInput;
use crate::physics::{ContactStart, PhysicsWorld};
use crate::telemetry::TelemetryFrame;
use crate::vehicle::Vehicle;
use crate::wheels::{WheelCommand, WheelPos};

const GRID_COLUMNS: usize = 5;
const GRID_SPACING: [f32; 2] = [4.0, 6.0]; // m, x then z

pub struct Player {
    pub id: String,
    pub slot: usize,
    pub body: RigidBodyHandle,
    pub vehicle: Vehicle,
    pub last_input: RawInput,
}

#[derive(Serialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub telemetry: TelemetryFrame,
    pub engine: EngineAudioState,
    pub voices: Vec<SoundSlot>,
    pub tire: Option<SoundSlot>,
    pub wheels: [(WheelPos, WheelCommand); 4],
}

#[derive(Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub sounds: Vec<SoundEvent>,
}

pub struct SharedGameState {
    pub tick: u64,
    pub config: ServerConfig,
    pub audio: Option<AudioService>,
    pub clients: HashMap<String, UnboundedSender<String>>,
    pub players: HashMap<String, Player>,
}

impl SharedGameState {
    pub fn new(config: ServerConfig) -> Self {
        let audio = AudioService::from_config(&config.audio_service);
        Self {
            tick: 0,
            config,
            audio,
            clients: HashMap::new(),
            players: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, id: &str, tx: UnboundedSender<String>) {
        self.clients.insert(id.to_string(), tx);
    }

    /// Spawn a car body and its controller for a newly connected player.
    pub fn add_player(&mut self, id: &str, phys: &mut PhysicsWorld) -> Option<RigidBodyHandle> {
        let slot = self.free_slot();
        let body = phys.spawn_car(spawn_position(slot));
        let mut rig = phys.rig(body)?;

        let vehicle = Vehicle::new(
            &self.config.vehicle,
            &self.config.audio,
            &mut rig,
            self.audio.as_mut(),
        );

        self.players.insert(
            id.to_string(),
            Player {
                id: id.to_string(),
                slot,
                body,
                vehicle,
                last_input: RawInput::default(),
            },
        );
        Some(body)
    }

    /// Lowest grid slot no connected player occupies.
    fn free_slot(&self) -> usize {
        (0..)
            .find(|slot| self.players.values().all(|p| p.slot != *slot))
            .unwrap_or_default()
    }

    pub fn update_input(&mut self, id: &str, input: RawInput) {
        if let Some(player) = self.players.get_mut(id) {
            player.last_input = input;
        }
    }

    pub fn remove_player(&mut self, id: &str, phys: &mut PhysicsWorld) {
        self.clients.remove(id);
        if let Some(player) = self.players.remove(id) {
            phys.remove_car(player.body);
        }
    }

    /// Physics clock: surface / traction pass, the world step, then contact
    /// sounds for collisions that began during the step.
    pub fn fixed_update(&mut self, phys: &mut PhysicsWorld, dt: f32) {
        for player in self.players.values_mut() {
            if let Some(mut rig) = phys.rig(player.body) {
                player.vehicle.fixed_update(&mut rig);
            }
        }

        phys.step(dt);

        for ContactStart { car, tag, point } in phys.take_contact_starts() {
            let Some(player) = self.players.values().find(|p| p.body == car) else {
                continue;
            };
            debug!(player = %player.id, ?tag, "contact");
            player
                .vehicle
                .on_contact(tag.as_deref(), point, self.audio.as_mut());
        }
    }

    /// Frame clock: input, drive machine, audio and telemetry.
    pub fn frame_update(&mut self, phys: &mut PhysicsWorld, dt: f32) {
        for player in self.players.values_mut() {
            if let Some(mut rig) = phys.rig(player.body) {
                player.vehicle.update(&mut rig, &player.last_input, dt);
            }
        }
        self.tick += 1;
    }

    /// Build and send a snapshot of all players to all clients.
    pub fn broadcast_snapshot(&mut self, phys: &mut PhysicsWorld) {
        let mut players = Vec::with_capacity(self.players.len());

        for player in self.players.values() {
            let Some((position, rotation)) = phys.car_pose(player.body) else {
                continue;
            };
            let Some(rig) = phys.rig(player.body) else {
                continue;
            };
            let audio = player.vehicle.audio();
            players.push(PlayerSnapshot {
                id: player.id.clone(),
                position,
                rotation,
                telemetry: player.vehicle.telemetry(),
                engine: *audio.engine(),
                voices: audio.engine_voices().to_vec(),
                tire: audio.tire_voice().cloned(),
                wheels: player.vehicle.commands(&rig),
            });
        }

        let sounds = self
            .audio
            .as_mut()
            .map(AudioService::drain_events)
            .unwrap_or_default();

        let json = match serde_json::to_string(&Snapshot {
            kind: "snapshot",
            tick: self.tick,
            players,
            sounds,
        }) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "snapshot serialization failed");
                return;
            }
        };

        for tx in self.clients.values() {
            let _ = tx.send(json.clone());
        }
    }
}

fn spawn_position(slot: usize) -> [f32; 3] {
    let col = (slot % GRID_COLUMNS) as f32 - (GRID_COLUMNS / 2) as f32;
    let row = (slot / GRID_COLUMNS) as f32;
    [col * GRID_SPACING[0], 0.0, row * GRID_SPACING[1]]
}
