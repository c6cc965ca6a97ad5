//! Cue renderers
//!
//! A renderer plays one cue to completion. Failures are reported but the
//! queue treats them as completion.

use super::NotificationCue;
use crate::config::{SpeechConfig, ToneConfig};
use async_trait::async_trait;
use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Speech engine error: {0}")]
    Engine(String),
}

/// Plays a single cue
#[async_trait]
pub trait CueRenderer: Send + Sync {
    /// Render `cue`, resolving once it has finished playing
    async fn render(&self, cue: &NotificationCue) -> Result<(), RenderError>;

    /// Stop engine-side playback. Called after the render future was dropped.
    fn cancel(&self) {}
}

/// Renderer that logs each cue and waits for its nominal duration
pub struct PacedRenderer {
    tone: ToneConfig,
    speech: SpeechConfig,
}

impl PacedRenderer {
    pub fn new(tone: ToneConfig, speech: SpeechConfig) -> Self {
        Self { tone, speech }
    }
}

#[async_trait]
impl CueRenderer for PacedRenderer {
    async fn render(&self, cue: &NotificationCue) -> Result<(), RenderError> {
        match cue {
            NotificationCue::Tone => {
                tracing::info!("Tone {} Hz", self.tone.frequency_hz);
                tokio::time::sleep(self.tone.duration()).await;
            }
            NotificationCue::Speech(text) => {
                tracing::info!("Speech: {}", text);
                tokio::time::sleep(self.speech.estimate_duration(text)).await;
            }
        }
        Ok(())
    }
}

/// Renderer that speaks through an external text-to-speech program.
///
/// Every `{text}` in the configured arguments is replaced by the phrase.
/// The child is killed when the render future is dropped.
pub struct CommandRenderer {
    tone: ToneConfig,
    speech: SpeechConfig,
    program: String,
}

impl CommandRenderer {
    pub fn new(tone: ToneConfig, speech: SpeechConfig, program: impl Into<String>) -> Self {
        Self {
            tone,
            speech,
            program: program.into(),
        }
    }

    fn speech_args(&self, text: &str) -> Vec<String> {
        if self.speech.args.is_empty() {
            return vec![text.to_string()];
        }
        self.speech
            .args
            .iter()
            .map(|arg| arg.replace("{text}", text))
            .collect()
    }
}

#[async_trait]
impl CueRenderer for CommandRenderer {
    async fn render(&self, cue: &NotificationCue) -> Result<(), RenderError> {
        let text = match cue {
            NotificationCue::Tone => {
                // Terminal bell, then hold for the pulse length
                let mut stdout = std::io::stdout();
                if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
                    tracing::debug!("Failed to ring terminal bell: {}", e);
                }
                tokio::time::sleep(self.tone.duration()).await;
                return Ok(());
            }
            NotificationCue::Speech(text) => text,
        };

        let status = Command::new(&self.program)
            .args(self.speech_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(RenderError::Engine(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }

    fn cancel(&self) {
        tracing::debug!("Speech via {} cancelled", self.program);
    }
}

/// Pick a renderer for the given configuration
pub fn renderer_for(tone: &ToneConfig, speech: &SpeechConfig) -> Arc<dyn CueRenderer> {
    match &speech.program {
        Some(program) => Arc::new(CommandRenderer::new(
            tone.clone(),
            speech.clone(),
            program.clone(),
        )),
        None => Arc::new(PacedRenderer::new(tone.clone(), speech.clone())),
    }
}
