//! Fire-and-forget audio playback

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use base64::Engine;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate of decoded TTS output
const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Output sink for synthesized speech
///
/// `play` is a handoff only: the pipeline never waits for playback to
/// finish, and playback trouble must never block a turn.
pub trait Playback: Send + Sync {
    /// Hand off MP3 bytes for playback
    ///
    /// # Errors
    ///
    /// Returns error only if the handoff itself fails; anything that
    /// goes wrong after handoff is logged, not surfaced.
    fn play(&self, audio: Vec<u8>) -> Result<()>;
}

/// Plays audio on the default output device
///
/// Each handoff spawns a detached thread that decodes and streams the
/// clip, so the caller returns immediately.
pub struct DevicePlayback;

impl DevicePlayback {
    /// Create a playback instance, verifying an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        host.default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;
        Ok(Self)
    }

    /// Play a clip and wait for it to finish
    ///
    /// For CLI checks only; the pipeline itself always goes through the
    /// non-blocking [`Playback::play`] handoff.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_blocking(&self, audio: &[u8]) -> Result<()> {
        play_mp3_blocking(audio)
    }
}

impl Playback for DevicePlayback {
    fn play(&self, audio: Vec<u8>) -> Result<()> {
        std::thread::Builder::new()
            .name("agrivoice-playback".to_string())
            .spawn(move || {
                if let Err(e) = play_mp3_blocking(&audio) {
                    tracing::warn!(error = %e, "playback failed");
                }
            })
            .map_err(|e| Error::Audio(format!("failed to spawn playback thread: {e}")))?;
        Ok(())
    }
}

/// Discards audio; for headless hosts without audio hardware
pub struct NullPlayback;

impl Playback for NullPlayback {
    fn play(&self, audio: Vec<u8>) -> Result<()> {
        tracing::debug!(audio_bytes = audio.len(), "playback muted, dropping audio");
        Ok(())
    }
}

/// Decode an MP3 clip and stream it to the default output device,
/// blocking until it finishes
fn play_mp3_blocking(mp3_data: &[u8]) -> Result<()> {
    let samples = decode_mp3(mp3_data)?;
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let sample_count = samples.len();
    let done = Arc::new(AtomicBool::new(false));
    let done_cb = Arc::clone(&done);
    let mut pos = 0usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = samples.get(pos).copied().unwrap_or_else(|| {
                        done_cb.store(true, Ordering::Relaxed);
                        0.0
                    });
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                    if pos < sample_count {
                        pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio output error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

    while !done.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    // Let the tail of the buffer drain
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

/// Render an autoplaying HTML `<audio>` tag embedding the clip as a
/// base64 data URL, for web render sinks
#[must_use]
pub fn html_audio_tag(audio: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(audio);
    format!(
        "<audio autoplay>\n<source src=\"data:audio/mp3;base64,{b64}\" type=\"audio/mp3\">\n</audio>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_playback_accepts_audio() {
        let playback = NullPlayback;
        assert!(playback.play(vec![0u8; 128]).is_ok());
    }

    #[test]
    fn html_audio_tag_embeds_data_url() {
        let tag = html_audio_tag(&[1, 2, 3]);
        assert!(tag.starts_with("<audio autoplay>"));
        assert!(tag.contains("data:audio/mp3;base64,AQID"));
        assert!(tag.ends_with("</audio>"));
    }

    #[test]
    fn decode_mp3_yields_no_samples_for_garbage() {
        // Not a valid MP3 stream; the decoder hits EOF without frames
        let samples = decode_mp3(&[0u8; 16]).unwrap();
        assert!(samples.is_empty());
    }
}
