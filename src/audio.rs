//! Fire-and-forget sound effects.

use std::io::Write;
use strum::{Display, EnumIter};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SoundEffect {
    Shoot,
    EnemyShoot,
    Hit,
    PotionPickup,
    PotionUse,
}

/// Anything that can play a sound effect. Playback never reports back.
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
}

/// Silent sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _effect: SoundEffect) {}
}

/// Rings the terminal bell when something gets hit
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> AudioSink for TerminalBell<W> {
    fn play(&mut self, effect: SoundEffect) {
        if effect != SoundEffect::Hit {
            return;
        }
        if let Err(err) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
            debug!(%err, "terminal bell unavailable");
        }
    }
}

/// Keeps every effect it is asked to play
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    pub played: Vec<SoundEffect>,
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, effect: SoundEffect) {
        self.played.push(effect);
    }
}
