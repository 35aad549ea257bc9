// ==============================================================================
// audio — PROCEDURAL ENGINE SOUND
// ------------------------------------------------------------------------------
// engine.rs   gear / RPM / load model
// voices.rs   looping voice slots + the 3-voice engine pool
// service.rs  process-wide clip catalog and one-shot queue
//
// EngineAudio blends two neighbouring engine clips picked from the adjusted
// RPM, plus one tire-screech voice. Missing pieces degrade instead of failing:
//   use_sounds without a service → sound off for the vehicle's lifetime
//   no engine clips              → no engine voices
//   bad gear table               → no gear / RPM tracking
// ==============================================================================

pub mod engine;
pub mod service;
pub mod voices;

use tracing::{error, warn};

use crate::config::AudioConfig;
use crate::ease::lerp;
use crate::error::AudioError;
use crate::gearbox::GearTable;

use self::engine::{EngineAudioState, EngineTuning, clip_blend};
use self::service::AudioService;
use self::voices::{ENGINE_VOICES, SoundSlot, VoicePool};

const SCREECH_SPEED: f32 = 12.0; // km/h

/// What the synthesizer reads from the drive layer each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioInput {
    pub speed: f32,
    pub throttle_axis: f32,
    pub is_drifting: bool,
    pub is_traction_locked: bool,
}

#[derive(Debug)]
pub struct EngineAudio {
    sounds: bool,
    clips: Vec<String>,
    tuning: EngineTuning,
    gears: Option<GearTable>,
    engine: EngineAudioState,
    pool: Option<VoicePool>,
    tire: Option<SoundSlot>,
    collision: Option<(String, f32)>,
}

impl EngineAudio {
    pub fn new(config: &AudioConfig, top_speed: f32, service: Option<&mut AudioService>) -> Self {
        let tuning = EngineTuning {
            rev_up_speed: config.rev_up_speed,
            rev_down_speed: config.rev_down_speed,
            idle_rpm: config.idle_rpm,
        };

        let gears = match GearTable::new(config.number_of_gears, top_speed) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!(error = %e, "gear tracking disabled");
                None
            }
        };

        let mut audio = Self {
            sounds: false,
            clips: config.engine_clips.clone(),
            tuning,
            gears,
            engine: EngineAudioState::new(config.idle_rpm),
            pool: None,
            tire: None,
            collision: None,
        };

        if !config.use_sounds {
            return audio;
        }
        let Some(service) = service else {
            error!(error = %AudioError::NoService, "sound disabled for this vehicle");
            return audio;
        };
        audio.sounds = true;

        if let Some(first) = config.engine_clips.first() {
            let voices: Result<Vec<SoundSlot>, AudioError> = (0..ENGINE_VOICES)
                .map(|_| service.create_looping_voice(first, 0.0))
                .collect();
            let unknown = config.engine_clips.iter().find(|c| !service.has_clip(c));
            match (voices, unknown) {
                (Ok(v), None) => audio.pool = Some(VoicePool::new(v)),
                (Err(e), _) => warn!(error = %e, "engine voices disabled"),
                (_, Some(clip)) => {
                    warn!(error = %AudioError::UnknownClip(clip.clone()), "engine voices disabled")
                }
            }
        }

        if let Some(clip) = &config.tire_screech_clip {
            match service.create_looping_voice(clip, 0.0) {
                Ok(v) => audio.tire = Some(v),
                Err(e) => warn!(error = %e, "tire voice disabled"),
            }
        }

        audio.collision = config
            .collision_clip
            .clone()
            .map(|clip| (clip, config.collision_volume));

        audio
    }

    pub fn sounds_enabled(&self) -> bool {
        self.sounds
    }

    pub fn gear(&self) -> usize {
        self.engine.gear
    }

    pub fn engine(&self) -> &EngineAudioState {
        &self.engine
    }

    pub fn engine_voices(&self) -> &[SoundSlot] {
        self.pool.as_ref().map(VoicePool::slots).unwrap_or_default()
    }

    pub fn tire_voice(&self) -> Option<&SoundSlot> {
        self.tire.as_ref()
    }

    /// Keep the gear boundaries on the effective top speed.
    pub fn retarget(&mut self, top_speed: f32) {
        if let Some(gears) = self.gears.as_mut() {
            gears.retarget(top_speed);
        }
    }

    pub fn update(&mut self, input: AudioInput, dt: f32) {
        let Some(gears) = self.gears.as_ref() else {
            return;
        };
        let adjusted = self.engine.step(gears, &self.tuning, input.speed, input.throttle_axis, dt);

        if !self.sounds {
            return;
        }

        if let Some(pool) = self.pool.as_mut() {
            mix_engine(pool, &self.clips, adjusted, self.engine.load, dt);
        }

        if let Some(tire) = self.tire.as_mut() {
            let screeching = input.is_drifting
                || (input.is_traction_locked && input.speed.abs() > SCREECH_SPEED);
            tire.ease_volume(if screeching { 1.0 } else { 0.0 }, dt);
        }
    }

    /// One-shot for hitting a track border.
    pub fn border_hit(&self, point: [f32; 3], service: Option<&mut AudioService>) {
        if !self.sounds {
            return;
        }
        let (Some((clip, volume)), Some(service)) = (self.collision.as_ref(), service) else {
            return;
        };
        if let Err(e) = service.play_sound_3d(clip, point, *volume) {
            warn!(error = %e, "collision sound dropped");
        }
    }
}

fn mix_engine(pool: &mut VoicePool, clips: &[String], adjusted: f32, load: f32, dt: f32) {
    if clips.is_empty() {
        return;
    }
    let (ia, ib, blend) = clip_blend(adjusted, clips.len());

    let pitch_factor = lerp(0.85, 1.0, load);
    let master = lerp(0.4, 1.0, adjusted) * lerp(0.5, 1.0, load);

    let Some(a) = pool.acquire(&clips[ia], None) else {
        return;
    };
    let mut active = vec![a];

    if ia == ib {
        if let Some(slot) = pool.slot_mut(a) {
            slot.ease(master, pitch_factor, dt);
        }
    } else {
        if let Some(slot) = pool.slot_mut(a) {
            slot.ease((1.0 - blend) * master, (1.0 + 0.1 * blend) * pitch_factor, dt);
        }
        if let Some(b) = pool.acquire(&clips[ib], Some(a)) {
            if let Some(slot) = pool.slot_mut(b) {
                slot.ease(blend * master, (0.9 + 0.1 * blend) * pitch_factor, dt);
            }
            active.push(b);
        }
    }

    pool.fade_unused(&active, dt);
}
