//! Voice turn orchestration
//!
//! Drives one full voice turn per pass: dedup gate, transcription,
//! answer generation, speech synthesis, playback handoff. One pass runs
//! to completion per triggering event; there are no internal retries and
//! no overlapping passes for a session. Recovery from a failed pass is
//! driven by the store itself: an unanswered user turn re-enters the
//! pipeline at the answer stage on the next pass.

use std::sync::Arc;

use crate::conversation::{ConversationStore, Turn};
use crate::llm::Responder;
use crate::voice::{AudioBuffer, Playback, Scratch, Synthesizer, Transcriber, Transcript};
use crate::Result;

/// Where the pipeline currently is within a pass
///
/// Reset to `Idle` on every exit path; the value never persists beyond
/// a single pass. A render sink may poll it for a "processing" hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Idle,
    Transcribing,
    Answering,
    Synthesizing,
}

/// What a completed pass did to the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No new audio, or a duplicate of the last transcribed buffer
    Idle,
    /// The recording contained no usable speech; nothing appended
    NoSpeech,
    /// A user turn and its answer were appended
    Answered,
    /// An unanswered user turn from a prior pass received its answer
    Resumed,
}

/// Policy for the dedup fingerprint when a pass arrives with no audio
///
/// Clearing the fingerprint whenever a cycle carries no audio lets an
/// already-processed buffer be accepted again if the capture source
/// re-submits it. That is surprising enough to be opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Keep the fingerprint until a different buffer is transcribed
    #[default]
    Keep,
    /// Clear the fingerprint on an audio-less pass, so a previously
    /// processed buffer is accepted again if re-submitted
    ResetOnIdle,
}

/// Orchestrates one voice turn per pass over a conversation store
pub struct TurnPipeline {
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<dyn Synthesizer>,
    playback: Arc<dyn Playback>,
    scratch: Scratch,
    last_fingerprint: Option<String>,
    dedup_policy: DedupPolicy,
    state: PassState,
}

impl TurnPipeline {
    /// Create a pipeline over the given adapters
    ///
    /// # Errors
    ///
    /// Returns error if the scratch directory cannot be created
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        playback: Arc<dyn Playback>,
    ) -> Result<Self> {
        Ok(Self {
            transcriber,
            responder,
            synthesizer,
            playback,
            scratch: Scratch::new()?,
            last_fingerprint: None,
            dedup_policy: DedupPolicy::default(),
            state: PassState::Idle,
        })
    }

    /// Set the fingerprint policy for audio-less passes
    #[must_use]
    pub const fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    /// Current position within a pass
    #[must_use]
    pub const fn state(&self) -> PassState {
        self.state
    }

    /// Fingerprint of the most recently transcribed buffer, if any
    #[must_use]
    pub fn last_fingerprint(&self) -> Option<&str> {
        self.last_fingerprint.as_deref()
    }

    /// Scratch handles not yet released; zero between passes
    #[must_use]
    pub fn outstanding_clips(&self) -> usize {
        self.scratch.outstanding()
    }

    /// Run one orchestration pass
    ///
    /// Appends at most one user turn and one assistant turn to `store`.
    /// Transcription and answer failures abort the pass and surface as
    /// errors while leaving the store in a resumable state; synthesis
    /// and playback failures are swallowed, since the text reply has
    /// already been delivered.
    ///
    /// # Errors
    ///
    /// Returns an adapter error when transcription or answering fails
    pub async fn process(
        &mut self,
        captured: Option<AudioBuffer>,
        store: &mut ConversationStore,
    ) -> Result<PassOutcome> {
        let outcome = self.run_pass(captured, store).await;
        self.state = PassState::Idle;
        outcome
    }

    async fn run_pass(
        &mut self,
        captured: Option<AudioBuffer>,
        store: &mut ConversationStore,
    ) -> Result<PassOutcome> {
        // A prior pass appended a user turn but never got its answer.
        // Re-enter at the answer stage; any captured buffer is left for
        // the next pass (its fingerprint stays unrecorded).
        if store.needs_answer() {
            tracing::debug!("unanswered user turn found, resuming at answer stage");
            self.answer_and_speak(store).await?;
            return Ok(PassOutcome::Resumed);
        }

        let Some(audio) = captured else {
            if self.dedup_policy == DedupPolicy::ResetOnIdle {
                self.last_fingerprint = None;
            }
            return Ok(PassOutcome::Idle);
        };

        if self.last_fingerprint.as_deref() == Some(audio.fingerprint()) {
            tracing::debug!(fingerprint = audio.fingerprint(), "duplicate buffer, skipping");
            return Ok(PassOutcome::Idle);
        }

        let fingerprint = audio.fingerprint().to_string();

        // Materialize the recording; the handle is released on every
        // exit path below, via release or drop.
        let mut clip = self.scratch.acquire(audio.bytes())?;

        self.state = PassState::Transcribing;
        let bytes = clip.read()?;
        let transcript = self.transcriber.transcribe(&bytes).await;
        clip.release();

        // Record the fingerprint only once the buffer has actually been
        // transcribed: a hard STT failure leaves it unrecorded so the
        // same recording is retried on the next pass, while a no-speech
        // result is final and must not be transcribed again each cycle.
        let transcript = transcript?;
        self.last_fingerprint = Some(fingerprint);

        let text = match transcript {
            Transcript::Text(text) => text,
            Transcript::NoSpeech => return Ok(PassOutcome::NoSpeech),
        };

        store.append(Turn::user(text));

        self.answer_and_speak(store).await?;
        Ok(PassOutcome::Answered)
    }

    /// Answer the pending user turn, then synthesize and hand off the
    /// reply audio
    async fn answer_and_speak(&mut self, store: &mut ConversationStore) -> Result<()> {
        self.state = PassState::Answering;
        let reply = self.responder.answer(store.snapshot()).await?;
        store.append(Turn::assistant(reply.clone()));

        // Voice output is an enhancement on top of the text reply; a
        // failure here must not roll back the assistant turn.
        self.state = PassState::Synthesizing;
        if let Err(e) = self.speak(&reply).await {
            tracing::warn!(error = %e, "voice output failed, text reply stands");
        }

        Ok(())
    }

    async fn speak(&mut self, text: &str) -> Result<()> {
        let audio = self.synthesizer.synthesize(text).await?;

        let mut clip = self.scratch.acquire(&audio)?;
        let bytes = clip.read()?;
        // Handoff only: playback completion is never awaited
        self.playback.play(bytes)?;
        clip.release();

        Ok(())
    }
}
