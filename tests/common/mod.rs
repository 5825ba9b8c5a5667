//! Shared test doubles for the turn pipeline
//!
//! Scripted adapters pop pre-loaded results in order and count their
//! calls, so tests can assert exactly which stages ran.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agrivoice::{
    Error, Playback, Responder, Result, Synthesizer, Transcriber, Transcript, Turn, TurnPipeline,
};

pub struct ScriptedTranscriber {
    responses: Mutex<VecDeque<Result<Transcript>>>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn with(responses: Vec<Result<Transcript>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transcription("script exhausted".to_string())))
    }
}

pub struct ScriptedResponder {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
    /// Every history the responder was handed, in call order
    pub seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedResponder {
    pub fn with(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn answer(&self, history: &[Turn]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(history.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Answer("script exhausted".to_string())))
    }
}

pub struct ScriptedSynthesizer {
    responses: Mutex<VecDeque<Result<Vec<u8>>>>,
    calls: AtomicUsize,
}

impl ScriptedSynthesizer {
    pub fn with(responses: Vec<Result<Vec<u8>>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// A synthesizer that always returns the same small clip
    pub fn always_ok() -> Arc<Self> {
        Self::with(vec![
            Ok(b"mp3".to_vec()),
            Ok(b"mp3".to_vec()),
            Ok(b"mp3".to_vec()),
            Ok(b"mp3".to_vec()),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Synthesis("script exhausted".to_string())))
    }
}

/// Records every clip handed off; optionally fails the handoff
pub struct RecordingPlayback {
    pub played: Mutex<Vec<Vec<u8>>>,
    fail: bool,
}

impl RecordingPlayback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            played: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            played: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

impl Playback for RecordingPlayback {
    fn play(&self, audio: Vec<u8>) -> Result<()> {
        if self.fail {
            return Err(Error::Audio("handoff refused".to_string()));
        }
        self.played.lock().unwrap().push(audio);
        Ok(())
    }
}

/// Assemble a pipeline over the given doubles
pub fn pipeline_with(
    stt: &Arc<ScriptedTranscriber>,
    llm: &Arc<ScriptedResponder>,
    tts: &Arc<ScriptedSynthesizer>,
    playback: &Arc<RecordingPlayback>,
) -> TurnPipeline {
    TurnPipeline::new(
        Arc::clone(stt) as Arc<dyn Transcriber>,
        Arc::clone(llm) as Arc<dyn Responder>,
        Arc::clone(tts) as Arc<dyn Synthesizer>,
        Arc::clone(playback) as Arc<dyn Playback>,
    )
    .expect("failed to build test pipeline")
}
