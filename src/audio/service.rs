//! Process-wide audio output: clip catalog, looping voice creation and the
//! queue of one-shot sounds waiting to be broadcast.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::audio::voices::SoundSlot;
use crate::config::AudioServiceConfig;
use crate::error::AudioError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundEvent {
    pub clip: String,
    pub position: [f32; 3],
    pub volume: f32,
}

#[derive(Debug, Default)]
pub struct AudioService {
    catalog: HashSet<String>,
    pending: Vec<SoundEvent>,
}

impl AudioService {
    /// `None` when audio output is disabled in the config.
    pub fn from_config(config: &AudioServiceConfig) -> Option<Self> {
        if !config.enabled {
            info!("audio service disabled");
            return None;
        }
        info!(clips = config.catalog.len(), "audio service ready");
        Some(Self {
            catalog: config.catalog.iter().cloned().collect(),
            pending: Vec::new(),
        })
    }

    pub fn has_clip(&self, clip: &str) -> bool {
        self.catalog.contains(clip)
    }

    fn known(&self, clip: &str) -> Result<(), AudioError> {
        if self.has_clip(clip) {
            Ok(())
        } else {
            Err(AudioError::UnknownClip(clip.to_string()))
        }
    }

    pub fn create_looping_voice(&mut self, clip: &str, start_volume: f32) -> Result<SoundSlot, AudioError> {
        self.known(clip)?;
        Ok(SoundSlot::new(clip, start_volume))
    }

    pub fn play_sound_3d(&mut self, clip: &str, position: [f32; 3], volume: f32) -> Result<(), AudioError> {
        self.known(clip)?;
        debug!(clip, ?position, volume, "one-shot 3d");
        self.pending.push(SoundEvent {
            clip: clip.to_string(),
            position,
            volume: volume.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Take every one-shot queued since the last call.
    pub fn drain_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_yields_no_service() {
        let cfg = AudioServiceConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(AudioService::from_config(&cfg).is_none());
    }

    #[test]
    fn unknown_clip_is_rejected() {
        let mut svc = AudioService::from_config(&AudioServiceConfig::default()).unwrap();
        assert_eq!(
            svc.create_looping_voice("kazoo", 0.0),
            Err(AudioError::UnknownClip("kazoo".into()))
        );
        assert!(svc.play_sound_3d("kazoo", [0.0; 3], 1.0).is_err());
        assert!(svc.drain_events().is_empty());
    }

    #[test]
    fn one_shots_drain_once() {
        let mut svc = AudioService::from_config(&AudioServiceConfig::default()).unwrap();
        svc.play_sound_3d("border_hit", [1.0, 0.0, 2.0], 1.5).unwrap();
        svc.play_sound_3d("border_hit", [0.0; 3], 0.3).unwrap();
        let events = svc.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].position, [1.0, 0.0, 2.0]);
        assert_eq!(events[0].volume, 1.0);
        assert_eq!(events[1].volume, 0.3);
        assert!(svc.drain_events().is_empty());
    }

    #[test]
    fn looping_voice_starts_playing_at_requested_volume() {
        let mut svc = AudioService::from_config(&AudioServiceConfig::default()).unwrap();
        let v = svc.create_looping_voice("engine_idle", 0.0).unwrap();
        assert!(v.playing);
        assert_eq!(v.volume, 0.0);
        assert_eq!(v.clip, "engine_idle");
    }
}
