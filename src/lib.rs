//! Agrivoice - voice-driven farming assistant pipeline
//!
//! A user speaks a question; the pipeline transcribes it, asks a chat
//! model for an answer over the full conversation history, synthesizes
//! the answer as speech, and hands it to playback, while maintaining an
//! append-only conversation transcript.
//!
//! # Architecture
//!
//! ```text
//! capture ──▶ TurnPipeline::process (one pass per event)
//!              │  dedup gate (fingerprint)
//!              ├─ Transcriber  (speech → text)
//!              ├─ ConversationStore (append user turn)
//!              ├─ Responder    (history → reply)
//!              ├─ ConversationStore (append assistant turn)
//!              └─ Synthesizer → Playback (fire-and-forget)
//! ```
//!
//! Adapter failures never corrupt the store: a transcription failure
//! leaves it untouched, an answer failure leaves a resumable unanswered
//! user turn, and a synthesis failure never rolls back the text reply.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod voice;

pub use config::Config;
pub use conversation::{ConversationStore, Speaker, Turn};
pub use error::{Error, Result};
pub use llm::{ChatCompletions, Responder};
pub use pipeline::{DedupPolicy, PassOutcome, PassState, TurnPipeline};
pub use voice::{
    AudioBuffer, AudioRecorder, DevicePlayback, NullPlayback, Playback, SpeechToText,
    Synthesizer, TextToSpeech, Transcriber, Transcript,
};
