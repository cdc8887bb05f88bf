//! Live voice session: wire messages, session state and transcript.
//!
//! Messages are camelCase JSON over a duplex socket. Outbound audio is
//! 16 kHz PCM16, inbound audio is 24 kHz PCM16, both base64 inside JSON.

use crate::constants::{CAPTURE_BLOCK_FRAMES, CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE};
use crate::error::Result;
use crate::pcm;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are the Voice of Limitless Potential. Speak with wisdom and power.";
pub const TRANSCRIPT_SPEAKER: &str = "Oracle";

/// Session configuration.
///
/// - `endpoint`: socket URL of the remote voice service (including any key)
/// - `capture_block`: frames per captured block handed to the encoder
/// - `max_backlog_sec`: optional cap on queued playback; `None` keeps the
///   best-effort behavior of accepting every inbound chunk
#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub endpoint: String,
    pub model: String,
    pub system_instruction: String,
    pub capture_rate: u32,
    pub playback_rate: u32,
    pub capture_block: u32,
    pub max_backlog_sec: Option<f64>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            capture_rate: CAPTURE_SAMPLE_RATE,
            playback_rate: PLAYBACK_SAMPLE_RATE,
            capture_block: CAPTURE_BLOCK_FRAMES,
            max_backlog_sec: None,
        }
    }
}

impl VoiceConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Empty {}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub data: String,
    #[serde(default)]
    pub mime_type: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub output_audio_transcription: Empty,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RealtimeInput {
    pub media: Blob,
}

/// Client → server messages.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

impl ClientMessage {
    pub fn setup(config: &VoiceConfig) -> Self {
        ClientMessage::Setup(Setup {
            model: config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
            },
            system_instruction: Content {
                parts: vec![Part {
                    text: Some(config.system_instruction.clone()),
                    inline_data: None,
                }],
            },
            output_audio_transcription: Empty {},
        })
    }

    /// Encode one captured block as a realtime input message.
    pub fn audio(samples: &[f32], rate: u32) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media: Blob {
                data: pcm::encode_frame(samples),
                mime_type: pcm::mime_type(rate),
            },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
}

/// Server → client message. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<Empty>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

/// What one inbound message carries, decoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InboundFrame {
    pub setup_complete: bool,
    pub transcript: Option<String>,
    pub audio: Option<Vec<f32>>,
    pub turn_complete: bool,
}

pub fn parse_server_message(text: &str) -> Result<InboundFrame> {
    let msg: ServerMessage = serde_json::from_str(text)?;
    let mut frame = InboundFrame {
        setup_complete: msg.setup_complete.is_some(),
        ..InboundFrame::default()
    };
    if let Some(content) = msg.server_content {
        frame.turn_complete = content.turn_complete;
        frame.transcript = content
            .output_transcription
            .map(|t| t.text)
            .filter(|t| !t.is_empty());
        let audio = content
            .model_turn
            .and_then(|turn| turn.parts.into_iter().next())
            .and_then(|part| part.inline_data)
            .filter(|blob| !blob.data.is_empty());
        if let Some(blob) = audio {
            frame.audio = Some(pcm::decode_frame(&blob.data)?);
        }
    }
    Ok(frame)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    StartRequested,
    /// Remote confirmed open and local capture is wired.
    Opened,
    StopRequested,
    RemoteClosed,
    RemoteError,
    CaptureFailed,
}

/// Side effect the owner must perform after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionAction {
    None,
    Connect,
    Activated,
    Teardown,
}

impl SessionState {
    /// Every failure or close collapses to `Idle` with a teardown; there is
    /// no reconnect.
    pub fn on(self, event: SessionEvent) -> (SessionState, SessionAction) {
        use SessionEvent::*;
        use SessionState::*;
        match (self, event) {
            (Idle, StartRequested) => (Connecting, SessionAction::Connect),
            (Connecting, Opened) => (Active, SessionAction::Activated),
            (Connecting | Active, StopRequested | RemoteClosed | RemoteError | CaptureFailed) => {
                (Idle, SessionAction::Teardown)
            }
            (state, _) => (state, SessionAction::None),
        }
    }

    pub fn is_active(self) -> bool {
        self == SessionState::Active
    }
}

/// Running log of transcript fragments across sessions.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn push_fragment(&mut self, text: &str) {
        self.lines.push(format!("{}: {}", TRANSCRIPT_SPEAKER, text));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
