//! Voice processing module
//!
//! Audio capture, transcription and synthesis adapters, scratch buffer
//! lifetimes, and fire-and-forget playback.

mod capture;
mod playback;
mod scratch;
pub mod stt;
pub mod tts;

pub use capture::{AudioBuffer, AudioRecorder, SAMPLE_RATE, encode_wav};
pub use playback::{DevicePlayback, NullPlayback, Playback, html_audio_tag};
pub use scratch::{Scratch, ScratchHandle};
pub use stt::{SpeechToText, Transcriber, Transcript};
pub use tts::{Synthesizer, TextToSpeech};
