use crate::error::VoiceError;
use crate::generation::AnswerGenerator;
use crate::models::QueryAnswer;
use crate::query::{QueryEngine, DEFAULT_TOP_K};
use crate::store::VectorStore;
use async_trait::async_trait;
use tracing::{debug, info};

#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>, VoiceError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

#[derive(Debug)]
pub enum TurnOutcome {
    NoSpeech,
    Answered {
        transcript: String,
        answer: QueryAnswer,
        audio: Vec<u8>,
    },
}

pub struct ConversationDriver<T, Y, S, G> {
    transcriber: T,
    synthesizer: Y,
    engine: QueryEngine<S, G>,
    top_k: usize,
}

impl<T, Y, S, G> ConversationDriver<T, Y, S, G>
where
    T: SpeechTranscriber,
    Y: SpeechSynthesizer,
    S: VectorStore,
    G: AnswerGenerator,
{
    pub fn new(transcriber: T, synthesizer: Y, engine: QueryEngine<S, G>) -> Self {
        Self {
            transcriber,
            synthesizer,
            engine,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub async fn run_turn(&self, audio: &[u8]) -> Result<TurnOutcome, VoiceError> {
        let transcript = match self.transcriber.transcribe(audio).await? {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                debug!("no speech detected, skipping the turn");
                return Ok(TurnOutcome::NoSpeech);
            }
        };

        info!(transcript_chars = transcript.len(), "answering spoken question");
        let answer = self.engine.answer(&transcript, self.top_k).await?;
        let audio = self.synthesizer.synthesize(&answer.answer_text).await?;

        Ok(TurnOutcome::Answered {
            transcript,
            answer,
            audio,
        })
    }
}
