//! Audio sinks
//!
//! The browser build synthesizes every effect with Web Audio oscillators, so
//! there are no sound files to fetch. The native build records and logs what
//! would have played.

use crate::platform::AudioSink;
use crate::sounds;

pub fn is_known_sound(id: &str) -> bool {
    sounds::ALL.contains(&id)
}

/// Headless sink: logs each sound and keeps a history
#[derive(Debug, Clone, Default)]
pub struct LogAudio {
    played: Vec<String>,
    muted: bool,
}

impl LogAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl AudioSink for LogAudio {
    fn play_sound(&mut self, id: &str) {
        if !is_known_sound(id) {
            log::warn!("Unknown sound `{}` ignored", id);
            return;
        }
        if self.muted {
            return;
        }
        log::debug!("Sound: {}", id);
        self.played.push(id.to_string());
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::is_known_sound;
    use crate::platform::AudioSink;
    use crate::sounds;

    pub struct WebAudio {
        ctx: Option<AudioContext>,
        master_volume: f32,
        sfx_volume: f32,
        muted: bool,
    }

    impl WebAudio {
        pub fn new(master_volume: f32, sfx_volume: f32, muted: bool) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: master_volume.clamp(0.0, 1.0),
                sfx_volume: sfx_volume.clamp(0.0, 1.0),
                muted,
            }
        }

        pub fn is_available(&self) -> bool {
            self.ctx.is_some()
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn effective_volume(&self) -> f32 {
            if self.muted {
                0.0
            } else {
                self.master_volume * self.sfx_volume
            }
        }

        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Single oscillator sweeping `from` -> `to` Hz over `len` seconds
        fn sweep(
            &self,
            ctx: &AudioContext,
            osc_type: OscillatorType,
            from: f32,
            to: f32,
            len: f64,
            vol: f32,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
                return;
            };
            let t = ctx.current_time();
            gain.gain().set_value_at_time(vol, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + len)
                .ok();
            osc.frequency().set_value_at_time(from, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(to, t + len)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + len + 0.05).ok();
        }

        /// Notes played one after another, `gap` seconds apart
        fn arpeggio(
            &self,
            ctx: &AudioContext,
            osc_type: OscillatorType,
            notes: &[f32],
            gap: f64,
            vol: f32,
        ) {
            for (i, freq) in notes.iter().enumerate() {
                if let Some((osc, gain)) = self.create_osc(ctx, *freq, osc_type) {
                    let t = ctx.current_time() + i as f64 * gap;
                    gain.gain().set_value_at_time(vol, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, t + gap * 2.0)
                        .ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + gap * 2.5).ok();
                }
            }
        }
    }

    impl AudioSink for WebAudio {
        fn play_sound(&mut self, id: &str) {
            if !is_known_sound(id) {
                log::warn!("Unknown sound `{}` ignored", id);
                return;
            }
            let vol = self.effective_volume();
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match id {
                sounds::SHOOT => {
                    self.sweep(ctx, OscillatorType::Square, 880.0, 440.0, 0.06, vol * 0.15)
                }
                sounds::ENEMY_SHOOT => {
                    self.sweep(ctx, OscillatorType::Triangle, 300.0, 180.0, 0.08, vol * 0.15)
                }
                sounds::EXPLOSION => {
                    self.sweep(ctx, OscillatorType::Sawtooth, 100.0, 30.0, 0.4, vol * 0.5);
                    self.sweep(ctx, OscillatorType::Square, 1500.0, 800.0, 0.1, vol * 0.2);
                }
                sounds::PLAYER_HIT => {
                    self.sweep(ctx, OscillatorType::Sawtooth, 300.0, 20.0, 0.8, vol * 0.4)
                }
                sounds::WAVE_CLEAR => self.arpeggio(
                    ctx,
                    OscillatorType::Triangle,
                    &[400.0, 500.0, 600.0, 800.0],
                    0.1,
                    vol * 0.3,
                ),
                sounds::GAME_OVER => self.arpeggio(
                    ctx,
                    OscillatorType::Sine,
                    &[400.0, 350.0, 300.0, 200.0],
                    0.2,
                    vol * 0.3,
                ),
                sounds::VICTORY => self.arpeggio(
                    ctx,
                    OscillatorType::Triangle,
                    &[500.0, 600.0, 700.0, 800.0, 1000.0],
                    0.08,
                    vol * 0.25,
                ),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sound_is_ignored() {
        let mut audio = LogAudio::new();
        audio.play_sound(sounds::EXPLOSION);
        audio.play_sound("kazoo");
        assert_eq!(audio.played(), &[sounds::EXPLOSION.to_string()]);
    }

    #[test]
    fn test_muted_plays_nothing() {
        let mut audio = LogAudio::new();
        audio.set_muted(true);
        audio.play_sound(sounds::SHOOT);
        assert!(audio.played().is_empty());
    }
}
