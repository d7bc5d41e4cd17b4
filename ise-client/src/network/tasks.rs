/// Async tasks for the send and receive sides of a session
///
/// The sender emits the control frame and the paced audio frames in strict
/// order. The receiver reads result frames, keeps them in arrival order and
/// hands exactly one terminal event to the driver through a oneshot channel.

use std::time::Duration;

use crate::network::connection::{FrameWriter, WsReader};
use crate::network::error::{NetworkError, NetworkResult};
use crate::network::messages::{AudioChunk, ControlFrame, FrameVerdict, ResultFrame};
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// The single event that ends the waiting phase of a session
#[derive(Debug)]
pub enum TerminalEvent {
    /// Final frame arrived; carries the decoded result markup
    Completed(String),

    /// Service answered with a non-zero code
    Rejected {
        /// Response code
        code: i64,
        /// Response message
        message: String,
    },

    /// Transport failed, the stream ended early, or the final frame was unusable
    Failed(NetworkError),
}

/// Send the control frame followed by the audio frames
///
/// Audio frames are spaced by `interval` to emulate live capture. There is
/// no delay after the last frame.
///
/// # Arguments
/// * `writer` - The write half of the channel
/// * `control` - Session-opening frame
/// * `chunks` - Audio chunks from [`crate::network::messages::chunk_audio`]
/// * `interval` - Delay between consecutive audio frames
///
/// # Returns
/// Total number of frames sent, control frame included
pub async fn send_frames(
    writer: &mut FrameWriter,
    control: &ControlFrame,
    chunks: &[AudioChunk<'_>],
    interval: Duration,
) -> NetworkResult<usize> {
    info!("Sender started: 1 control frame + {} audio frames", chunks.len());

    writer.send(control).await?;

    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(interval).await;
        }

        writer.send(&chunk.to_frame()).await?;
        debug!(
            "Audio frame #{} sent ({:?}, {} bytes)",
            index + 1,
            chunk.role(),
            chunk.bytes.len()
        );
    }

    info!("Sender completed: {} frames sent", writer.frames_sent());
    Ok(writer.frames_sent())
}

/// Receiver task that logs result frames and signals the terminal event
///
/// Runs until a terminal frame arrives, the stream ends, a transport error
/// occurs, or `stop_rx` fires (or its sender is dropped). After the terminal
/// event has been sent no further frames are read.
///
/// # Arguments
/// * `ws_reader` - The read half of the channel
/// * `terminal_tx` - Receives exactly one [`TerminalEvent`] unless the task is stopped first
/// * `stop_rx` - Stop signal from the driver (timeout or teardown)
///
/// # Returns
/// Every well-formed result frame received, in arrival order
pub async fn receiver_task(
    mut ws_reader: WsReader,
    terminal_tx: oneshot::Sender<TerminalEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<ResultFrame> {
    info!("Receiver task started");

    let mut frames = Vec::new();
    let mut terminal_tx = Some(terminal_tx);

    loop {
        let next = tokio::select! {
            _ = &mut stop_rx => {
                debug!("Receiver stopped by driver");
                return frames;
            }
            next = ws_reader.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                let frame = match ResultFrame::decode(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Skipping malformed result frame: {}", e);
                        continue;
                    }
                };

                let verdict = frame.verdict();
                frames.push(frame);

                let event = match verdict {
                    Ok(FrameVerdict::Pending(status)) => {
                        debug!(status, "Intermediate result frame #{}", frames.len());
                        continue;
                    }
                    Ok(FrameVerdict::Final(markup)) => {
                        info!("Final result received ({} bytes)", markup.len());
                        TerminalEvent::Completed(markup)
                    }
                    Ok(FrameVerdict::Rejected { code, message }) => {
                        error!(code, "Assessment rejected by service: {}", message);
                        TerminalEvent::Rejected { code, message }
                    }
                    Err(e) => {
                        error!("Unusable final frame: {}", e);
                        TerminalEvent::Failed(e)
                    }
                };

                signal(&mut terminal_tx, event);
                break;
            }
            Some(Ok(Message::Close(frame))) => {
                info!("Received close frame: {:?}", frame);
                break;
            }
            Some(Ok(Message::Ping(data))) => {
                debug!("Received ping, length: {} bytes", data.len());
            }
            Some(Ok(Message::Pong(_))) => {
                debug!("Received pong");
            }
            Some(Ok(Message::Binary(data))) => {
                warn!("Received unexpected binary message: {} bytes", data.len());
            }
            Some(Ok(Message::Frame(_))) => {
                debug!("Received raw frame");
            }
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                signal(&mut terminal_tx, TerminalEvent::Failed(e.into()));
                break;
            }
            None => {
                info!("WebSocket stream ended");
                break;
            }
        }
    }

    // No-op when a terminal event was already delivered
    signal(
        &mut terminal_tx,
        TerminalEvent::Failed(NetworkError::ConnectionClosed),
    );

    info!("Receiver task completed: {} frames received", frames.len());
    frames
}

/// Deliver the terminal event once; later calls are no-ops
fn signal(terminal_tx: &mut Option<oneshot::Sender<TerminalEvent>>, event: TerminalEvent) {
    if let Some(tx) = terminal_tx.take() {
        if tx.send(event).is_err() {
            debug!("Driver no longer waiting for terminal event");
        }
    }
}
