//! Looping voices and the three-slot engine voice pool.

use serde::Serialize;

use crate::ease::approach;

pub const ENGINE_VOICES: usize = 3;

const FADE_RATE: f32 = 10.0;
const STOP_VOLUME: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundSlot {
    pub clip: String,
    pub volume: f32,
    pub pitch: f32,
    pub playing: bool,
}

impl SoundSlot {
    pub fn new(clip: &str, volume: f32) -> Self {
        Self {
            clip: clip.to_string(),
            volume: volume.clamp(0.0, 1.0),
            pitch: 1.0,
            playing: true,
        }
    }

    /// Put a new clip on this slot. It restarts silent.
    pub fn assign(&mut self, clip: &str) {
        if self.clip != clip {
            self.clip.clear();
            self.clip.push_str(clip);
        }
        self.volume = 0.0;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn ease(&mut self, volume: f32, pitch: f32, dt: f32) {
        self.volume = approach(self.volume, volume.clamp(0.0, 1.0), FADE_RATE, dt);
        self.pitch = approach(self.pitch, pitch, FADE_RATE, dt);
    }

    pub fn ease_volume(&mut self, volume: f32, dt: f32) {
        self.volume = approach(self.volume, volume.clamp(0.0, 1.0), FADE_RATE, dt);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoicePool {
    slots: Vec<SoundSlot>,
}

impl VoicePool {
    pub fn new(slots: Vec<SoundSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[SoundSlot] {
        &self.slots
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut SoundSlot> {
        self.slots.get_mut(index)
    }

    /// Slot index for `clip`: a slot already playing it, else the first idle
    /// slot, else the quietest one (which is reassigned and restarts silent).
    /// `claimed` is never handed out again in the same frame.
    pub fn acquire(&mut self, clip: &str, claimed: Option<usize>) -> Option<usize> {
        let free = |i: &usize| Some(*i) != claimed;

        if let Some(i) = (0..self.slots.len())
            .filter(free)
            .find(|&i| self.slots[i].playing && self.slots[i].clip == clip)
        {
            return Some(i);
        }

        let candidate = (0..self.slots.len())
            .filter(free)
            .find(|&i| !self.slots[i].playing)
            .or_else(|| {
                (0..self.slots.len())
                    .filter(free)
                    .min_by(|&a, &b| self.slots[a].volume.total_cmp(&self.slots[b].volume))
            })?;

        self.slots[candidate].assign(clip);
        Some(candidate)
    }

    /// Fade every slot not in `active` and stop it once inaudible.
    pub fn fade_unused(&mut self, active: &[usize], dt: f32) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if active.contains(&i) {
                continue;
            }
            slot.ease_volume(0.0, dt);
            if slot.volume < STOP_VOLUME && slot.playing {
                slot.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> VoicePool {
        VoicePool::new((0..ENGINE_VOICES).map(|_| SoundSlot::new("idle", 0.0)).collect())
    }

    #[test]
    fn reuses_slot_already_playing_clip() {
        let mut p = pool();
        p.slots[1].clip = "mid".into();
        p.slots[1].volume = 0.7;
        assert_eq!(p.acquire("mid", None), Some(1));
        assert_eq!(p.slots[1].volume, 0.7);
    }

    #[test]
    fn prefers_idle_slot_then_quietest() {
        let mut p = pool();
        p.slots[0].volume = 0.5;
        p.slots[1].volume = 0.2;
        p.slots[2].stop();
        assert_eq!(p.acquire("high", None), Some(2));
        assert_eq!(p.slots[2].clip, "high");
        assert!(p.slots[2].playing);

        p.slots[2].volume = 0.9;
        assert_eq!(p.acquire("low", None), Some(1));
        assert_eq!(p.slots[1].volume, 0.0);
    }

    #[test]
    fn claimed_slot_is_not_stolen() {
        let mut p = pool();
        let a = p.acquire("low", None).unwrap();
        let b = p.acquire("mid", Some(a)).unwrap();
        assert_ne!(a, b);
        assert_eq!(p.slots[a].clip, "low");
        assert_eq!(p.slots[b].clip, "mid");
    }

    #[test]
    fn unused_slots_fade_and_stop() {
        let mut p = pool();
        for s in p.slots.iter_mut() {
            s.volume = 1.0;
        }
        for _ in 0..120 {
            p.fade_unused(&[0], 1.0 / 60.0);
        }
        assert_eq!(p.slots[0].volume, 1.0);
        assert!(p.slots[0].playing);
        assert!(!p.slots[1].playing && !p.slots[2].playing);
        assert!(p.slots[1].volume < STOP_VOLUME);
    }
}
