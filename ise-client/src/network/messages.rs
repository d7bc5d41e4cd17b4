/// Frame types for the streaming assessment protocol
///
/// This module defines every JSON frame exchanged with the assessment
/// service: one control frame that opens the session, a sequence of audio
/// frames, and the status-tagged result frames sent back by the server.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::network::error::{NetworkError, NetworkResult};

/// Byte-order marker prepended to the reference text
pub const TEXT_BOM: char = '\u{FEFF}';

/// `data.status` value carried by the control frame
pub const STATUS_BEGIN: u8 = 0;

/// `data.status` value for intermediate audio and result frames
pub const STATUS_CONTINUE: u8 = 1;

/// `data.status` value marking the last audio frame / final result frame
pub const STATUS_FINAL: u8 = 2;

// ============================================================================
// Client -> Server Frames
// ============================================================================

/// `common` block of the control frame
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommonParams {
    /// Application id issued by the service console
    pub app_id: String,
}

/// `business` block of the control frame
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ControlParams {
    /// Assessment category (e.g. "read_sentence")
    pub category: String,
    /// Result charset
    pub rstcd: &'static str,
    /// Audio encoding
    pub aue: &'static str,
    /// Audio format
    pub auf: &'static str,
    /// Service type
    pub sub: &'static str,
    /// Language entity ("cn_vip" / "en_vip")
    pub ent: String,
    /// Command ("ssb" = session start)
    pub cmd: &'static str,
    /// Reference text, BOM-prefixed
    pub text: String,
    /// Text encoding
    pub tte: &'static str,
    /// Skip the text-processing stage
    pub ttp_skip: bool,
    /// Request multi-dimensional scoring
    pub extra_ability: &'static str,
}

/// `data` block of frames that carry only a status
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusOnly {
    /// Frame status
    pub status: u8,
}

/// First frame of every session
///
/// # Example
/// ```
/// use ise_client::network::messages::ControlFrame;
///
/// let frame = ControlFrame::new("app-id", "read_sentence", "cn_vip", "今天天气真不错");
/// let json = serde_json::to_string(&frame).unwrap();
/// assert!(json.contains("\"cmd\":\"ssb\""));
/// ```
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ControlFrame {
    /// Common parameters
    pub common: CommonParams,
    /// Business parameters
    pub business: ControlParams,
    /// Status block (always `STATUS_BEGIN`)
    pub data: StatusOnly,
}

impl ControlFrame {
    /// Create a control frame for the given category and language entity
    ///
    /// # Arguments
    /// * `app_id` - Application id
    /// * `category` - Assessment category wire name
    /// * `entity` - Language entity code
    /// * `reference_text` - Text the speaker reads; the BOM is added here
    pub fn new(
        app_id: impl Into<String>,
        category: impl Into<String>,
        entity: impl Into<String>,
        reference_text: &str,
    ) -> Self {
        Self {
            common: CommonParams {
                app_id: app_id.into(),
            },
            business: ControlParams {
                category: category.into(),
                rstcd: "utf8",
                aue: "raw",
                auf: "audio/L16;rate=16000",
                sub: "ise",
                ent: entity.into(),
                cmd: "ssb",
                text: prepare_text(reference_text),
                tte: "utf-8",
                ttp_skip: true,
                extra_ability: "multi_dimension",
            },
            data: StatusOnly {
                status: STATUS_BEGIN,
            },
        }
    }
}

/// Prefix the reference text with the byte-order marker
pub fn prepare_text(text: &str) -> String {
    let mut prepared = String::with_capacity(text.len() + TEXT_BOM.len_utf8());
    prepared.push(TEXT_BOM);
    prepared.push_str(text);
    prepared
}

/// Position of an audio frame within the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRole {
    /// First frame of a multi-frame stream
    First,
    /// Interior frame
    Continue,
    /// Last frame (also used when the whole buffer fits in one frame)
    Last,
}

impl AudioRole {
    /// Wire value of `business.aus`
    pub fn aus(&self) -> u8 {
        match self {
            AudioRole::First => 1,
            AudioRole::Continue => 2,
            AudioRole::Last => 4,
        }
    }

    /// Wire value of `data.status`
    pub fn status(&self) -> u8 {
        match self {
            AudioRole::First | AudioRole::Continue => STATUS_CONTINUE,
            AudioRole::Last => STATUS_FINAL,
        }
    }
}

/// `business` block of an audio frame
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AudioParams {
    /// Command ("auw" = audio write)
    pub cmd: &'static str,
    /// Audio sequence marker
    pub aus: u8,
}

/// `data` block of an audio frame
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AudioPayload {
    /// Frame status
    pub status: u8,
    /// Base64-encoded PCM chunk
    pub data: String,
}

/// One slice of the recording on the wire
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Business parameters
    pub business: AudioParams,
    /// Audio payload
    pub data: AudioPayload,
}

impl AudioFrame {
    /// Encode a chunk with the given role
    pub fn new(role: AudioRole, chunk: &[u8]) -> Self {
        Self {
            business: AudioParams {
                cmd: "auw",
                aus: role.aus(),
            },
            data: AudioPayload {
                status: role.status(),
                data: STANDARD.encode(chunk),
            },
        }
    }
}

/// A chunk of the audio buffer with its position flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioChunk<'a> {
    /// Raw PCM bytes
    pub bytes: &'a [u8],
    /// Whether this is the first chunk
    pub first: bool,
    /// Whether this is the last chunk
    pub last: bool,
}

impl AudioChunk<'_> {
    /// Wire role for this chunk; a chunk that is both first and last is sent as `Last`
    pub fn role(&self) -> AudioRole {
        if self.last {
            AudioRole::Last
        } else if self.first {
            AudioRole::First
        } else {
            AudioRole::Continue
        }
    }

    /// Build the frame for this chunk
    pub fn to_frame(&self) -> AudioFrame {
        AudioFrame::new(self.role(), self.bytes)
    }
}

/// Split an audio buffer into fixed-size chunks
///
/// Produces `ceil(len / frame_size)` chunks; exactly one is flagged `first`
/// and exactly one (possibly the same) is flagged `last`.
///
/// # Errors
/// Returns `NetworkError::InvalidConfig` if `frame_size` is zero
pub fn chunk_audio(audio: &[u8], frame_size: usize) -> NetworkResult<Vec<AudioChunk<'_>>> {
    if frame_size == 0 {
        return Err(NetworkError::InvalidConfig(
            "audio frame size must be non-zero".to_string(),
        ));
    }

    let total = audio.len().div_ceil(frame_size);
    Ok(audio
        .chunks(frame_size)
        .enumerate()
        .map(|(index, bytes)| AudioChunk {
            bytes,
            first: index == 0,
            last: index + 1 == total,
        })
        .collect())
}

// ============================================================================
// Server -> Client Frames
// ============================================================================

/// `data` block of a result frame
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ResultData {
    /// 0 / 1 = intermediate, 2 = final; anything else is intermediate
    #[serde(default)]
    pub status: i64,

    /// Base64-encoded result markup, present only on the final frame
    #[serde(default)]
    pub data: Option<String>,
}

/// Frame received from the service
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ResultFrame {
    /// Response code; anything other than 0 is a hard failure
    pub code: i64,

    /// Human-readable status message
    #[serde(default)]
    pub message: String,

    /// Server-side session id
    #[serde(default)]
    pub sid: Option<String>,

    /// Status and optional payload (absent on some error frames)
    #[serde(default)]
    pub data: Option<ResultData>,
}

/// Fields every frame carries, whatever shape its `data` block has
#[derive(Deserialize)]
struct FrameHeader {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    sid: Option<String>,
}

/// What a result frame means for the session
#[derive(Debug, Clone, PartialEq)]
pub enum FrameVerdict {
    /// Intermediate frame with the given status
    Pending(i64),
    /// Final frame; carries the decoded result markup
    Final(String),
    /// Non-zero response code
    Rejected {
        /// Response code
        code: i64,
        /// Response message
        message: String,
    },
}

impl ResultFrame {
    /// Parse a text frame
    ///
    /// An error frame (`code != 0`) is kept even when its `data` block is
    /// malformed; the block is dropped in that case.
    ///
    /// # Errors
    /// Returns `NetworkError::SerializationError` on malformed JSON, or on a
    /// success frame whose `data` block does not decode
    pub fn decode(text: &str) -> NetworkResult<Self> {
        let err = match serde_json::from_str(text) {
            Ok(frame) => return Ok(frame),
            Err(err) => err,
        };

        match serde_json::from_str::<FrameHeader>(text) {
            Ok(header) if header.code != 0 => {
                debug!(code = header.code, "Error frame with unreadable data block: {}", err);
                Ok(Self {
                    code: header.code,
                    message: header.message,
                    sid: header.sid,
                    data: None,
                })
            }
            _ => Err(err.into()),
        }
    }

    /// Status of the frame, if it carries one
    pub fn status(&self) -> Option<i64> {
        self.data.as_ref().map(|d| d.status)
    }

    /// Check if the service rejected the session
    pub fn is_failure(&self) -> bool {
        self.code != 0
    }

    /// Check if this frame carries the final result
    pub fn is_final(&self) -> bool {
        !self.is_failure() && self.status() == Some(i64::from(STATUS_FINAL))
    }

    /// Classify the frame, decoding the final payload
    ///
    /// # Errors
    /// Returns `NetworkError::ProtocolError` if a final frame has no payload
    /// or the payload is not base64-encoded UTF-8
    pub fn verdict(&self) -> NetworkResult<FrameVerdict> {
        if self.is_failure() {
            return Ok(FrameVerdict::Rejected {
                code: self.code,
                message: self.message.clone(),
            });
        }

        let Some(data) = &self.data else {
            return Ok(FrameVerdict::Pending(i64::from(STATUS_CONTINUE)));
        };

        if data.status != i64::from(STATUS_FINAL) {
            return Ok(FrameVerdict::Pending(data.status));
        }

        let encoded = data.data.as_deref().ok_or_else(|| {
            NetworkError::ProtocolError("final frame carries no payload".to_string())
        })?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| NetworkError::ProtocolError(format!("payload is not base64: {}", e)))?;
        let markup = String::from_utf8(bytes)
            .map_err(|e| NetworkError::ProtocolError(format!("payload is not UTF-8: {}", e)))?;

        Ok(FrameVerdict::Final(markup))
    }
}
