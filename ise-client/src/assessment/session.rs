//! 单次评测会话
//!
//! 会话驱动方负责连接、按节奏发送帧并等待终止事件；
//! 接收任务在后台运行，通过 oneshot 通道交付唯一的终止事件。
//! 整个会话受一个总超时约束，超时从进入 `Connecting` 开始计算。

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::assessment::category::{Category, Language};
use crate::assessment::error::{AssessmentError, AssessmentResult};
use crate::assessment::state::{SessionState, SessionStateMachine};
use crate::network::tasks::{receiver_task, send_frames};
use crate::network::{
    ControlFrame, Credentials, IseConnection, NetworkResult, ResultFrame, ServiceEndpoint,
    TerminalEvent, chunk_audio, sign_now,
};

/// 默认帧大小：16 kHz 16-bit 单声道 40 ms
pub const DEFAULT_FRAME_SIZE: usize = 1280;

/// 默认帧间隔
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// 默认握手超时（毫秒）
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// 默认会话超时
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15);

/// 关闭连接的最长等待时间
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// 等待接收任务退出的最长时间
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// 音频流发送参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// 每个音频帧的字节数
    pub frame_size: usize,

    /// 相邻音频帧之间的间隔
    pub frame_interval: Duration,

    /// 握手超时（毫秒）
    pub connect_timeout_ms: u64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// 一次评测请求
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRequest {
    /// 参考文本
    pub reference_text: String,

    /// 16 kHz 16-bit 单声道 PCM
    pub audio: Vec<u8>,

    /// 题型
    pub category: Category,

    /// 语种
    pub language: Language,

    /// 会话总超时
    pub timeout: Duration,
}

impl AssessmentRequest {
    /// 使用默认题型、语种和超时创建请求
    pub fn new(reference_text: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            reference_text: reference_text.into(),
            audio,
            category: Category::default(),
            language: Language::default(),
            timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// 设置评测题型，默认为 `read_sentence`
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// 设置评测语种
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// 设置整个会话的超时
    ///
    /// 超时必须大于零，且从当前时刻起不能溢出时钟，否则 [`validate`](Self::validate) 会拒绝该请求。
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 在建立连接之前检查请求
    ///
    /// # Errors
    ///
    /// 音频为空、超时为零或过大，以及题型不被当前语种支持时返回 [`AssessmentError::InvalidInput`]
    pub fn validate(&self) -> AssessmentResult<()> {
        if self.audio.is_empty() {
            return Err(AssessmentError::InvalidInput(
                "audio buffer is empty".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(AssessmentError::InvalidInput(
                "timeout must be greater than zero".to_string(),
            ));
        }

        if Instant::now().checked_add(self.timeout).is_none() {
            return Err(AssessmentError::InvalidInput(format!(
                "timeout {:?} is too large",
                self.timeout
            )));
        }

        if !self.language.supports(self.category) {
            return Err(AssessmentError::InvalidInput(format!(
                "category '{}' is not supported for language '{}'",
                self.category, self.language
            )));
        }

        Ok(())
    }
}

/// 会话结束后的完整记录
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// 最终状态
    pub state: SessionState,

    /// 状态转换历史
    pub history: Vec<SessionState>,

    /// 按到达顺序记录的结果帧
    pub frames: Vec<ResultFrame>,

    /// 已发送的帧数（含控制帧）
    pub frames_sent: usize,

    /// 原始结果标记或错误
    pub result: AssessmentResult<String>,
}

impl SessionOutcome {
    fn new(
        machine: SessionStateMachine,
        frames: Vec<ResultFrame>,
        frames_sent: usize,
        result: AssessmentResult<String>,
    ) -> Self {
        Self {
            state: machine.current().clone(),
            history: machine.into_history(),
            frames,
            frames_sent,
            result,
        }
    }

    /// 检查会话是否成功完成
    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// 原始结果（仅在成功时存在）
    pub fn raw(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    /// 错误（仅在失败时存在）
    pub fn error(&self) -> Option<&AssessmentError> {
        self.result.as_ref().err()
    }

    /// 取出原始结果
    pub fn into_result(self) -> AssessmentResult<String> {
        self.result
    }
}

/// 发送阶段的结束方式
enum SendPhase {
    /// 接收任务先交付了终止事件
    Terminal(Result<TerminalEvent, oneshot::error::RecvError>),

    /// 所有帧已发送（或发送失败）
    Sent(NetworkResult<usize>),

    /// 总超时已到
    Expired,
}

/// 单次评测会话
///
/// 每个会话独占一个连接，运行一次后即被消耗
///
/// # Examples
///
/// ```no_run
/// use ise_client::assessment::{AssessmentRequest, AssessmentSession, StreamOptions};
/// use ise_client::network::{Credentials, ServiceEndpoint};
///
/// #[tokio::main]
/// async fn main() {
///     let creds = Credentials::new("app-id", "api-key", "api-secret");
///     let request = AssessmentRequest::new("今天天气怎么样", vec![0u8; 32_000]);
///
///     let outcome = AssessmentSession::new(
///         creds,
///         ServiceEndpoint::default(),
///         StreamOptions::default(),
///         request,
///     )
///     .run()
///     .await;
///
///     println!("{} -> {:?}", outcome.state.name(), outcome.raw());
/// }
/// ```
pub struct AssessmentSession {
    credentials: Credentials,
    endpoint: ServiceEndpoint,
    options: StreamOptions,
    request: AssessmentRequest,
}

impl AssessmentSession {
    /// 创建会话
    pub fn new(
        credentials: Credentials,
        endpoint: ServiceEndpoint,
        options: StreamOptions,
        request: AssessmentRequest,
    ) -> Self {
        Self {
            credentials,
            endpoint,
            options,
            request,
        }
    }

    /// 运行会话直到完成、失败或超时
    ///
    /// 该方法总会返回，最长阻塞时间约为请求的超时加上连接关闭的宽限时间。
    /// 输入不合法时不会建立连接，会话保持 `Idle`。
    pub async fn run(self) -> SessionOutcome {
        let mut machine = SessionStateMachine::new();

        if let Err(e) = self.request.validate() {
            warn!("Assessment request rejected before connecting: {}", e);
            return SessionOutcome::new(machine, Vec::new(), 0, Err(e));
        }

        let chunks = match chunk_audio(&self.request.audio, self.options.frame_size) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Cannot split audio into frames: {}", e);
                return SessionOutcome::new(machine, Vec::new(), 0, Err(e.into()));
            }
        };

        let timeout = self.request.timeout;
        let started = Instant::now();
        let Some(deadline) = started.checked_add(timeout) else {
            let e = AssessmentError::InvalidInput(format!("timeout {:?} is too large", timeout));
            warn!("Assessment request rejected before connecting: {}", e);
            return SessionOutcome::new(machine, Vec::new(), 0, Err(e));
        };

        info!(
            category = %self.request.category,
            language = %self.request.language,
            audio_bytes = self.request.audio.len(),
            frames = chunks.len(),
            "Starting assessment session (timeout {:?})",
            timeout
        );

        advance(&mut machine, SessionState::Connecting);

        // 1. 签名并建立连接
        let url = match sign_now(&self.credentials, &self.endpoint) {
            Ok(url) => url,
            Err(e) => {
                error!("Failed to sign request: {}", e);
                return finish(machine, Vec::new(), 0, Err(e.into()), started);
            }
        };

        let connect = IseConnection::connect(&url, self.options.connect_timeout_ms);
        let connection = match tokio::time::timeout_at(deadline, connect).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                error!("Handshake failed: {}", e);
                return finish(machine, Vec::new(), 0, Err(e.into()), started);
            }
            Err(_) => {
                warn!("Session timed out during handshake");
                return finish(
                    machine,
                    Vec::new(),
                    0,
                    Err(AssessmentError::Timeout(timeout)),
                    started,
                );
            }
        };

        advance(&mut machine, SessionState::Open);

        // 2. 拆分连接并启动接收任务
        let (mut writer, reader) = connection.split();
        let (terminal_tx, mut terminal_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let mut receiver_handle = tokio::spawn(receiver_task(reader, terminal_tx, stop_rx));

        // 3. 发送控制帧和音频帧，同时监听终止事件
        advance(&mut machine, SessionState::Sending);

        let control = ControlFrame::new(
            self.credentials.app_id(),
            self.request.category.as_str(),
            self.request.language.entity(),
            &self.request.reference_text,
        );

        let phase = {
            let send = send_frames(&mut writer, &control, &chunks, self.options.frame_interval);
            tokio::pin!(send);

            tokio::select! {
                biased;

                event = &mut terminal_rx => SendPhase::Terminal(event),
                sent = &mut send => SendPhase::Sent(sent),
                _ = tokio::time::sleep_until(deadline) => SendPhase::Expired,
            }
        };

        // 4. 等待终止事件
        let result = match phase {
            SendPhase::Terminal(event) => {
                debug!("Terminal event arrived while sending");
                resolve(event)
            }
            SendPhase::Sent(Ok(count)) => {
                debug!("All {} frames sent, awaiting result", count);
                advance(&mut machine, SessionState::AwaitingResult);

                match tokio::time::timeout_at(deadline, &mut terminal_rx).await {
                    Ok(event) => resolve(event),
                    Err(_) => Err(AssessmentError::Timeout(timeout)),
                }
            }
            SendPhase::Sent(Err(send_error)) => {
                warn!("Sending stopped: {}", send_error);

                // 服务端可能已经给出了拒绝原因，优先使用它
                match tokio::time::timeout_at(deadline, &mut terminal_rx).await {
                    Ok(Ok(TerminalEvent::Failed(_))) | Ok(Err(_)) => Err(send_error.into()),
                    Ok(event) => resolve(event),
                    Err(_) => Err(AssessmentError::Timeout(timeout)),
                }
            }
            SendPhase::Expired => Err(AssessmentError::Timeout(timeout)),
        };

        // 5. 关闭连接并回收帧记录
        if tokio::time::timeout(CLOSE_GRACE, writer.close()).await.is_err() {
            warn!("Closing the channel took longer than {:?}", CLOSE_GRACE);
        }

        if stop_tx.send(()).is_err() {
            debug!("Receiver task already finished");
        }

        let frames = match tokio::time::timeout(DRAIN_GRACE, &mut receiver_handle).await {
            Ok(Ok(frames)) => frames,
            Ok(Err(e)) => {
                error!("Receiver task panicked: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Receiver task did not stop in time, aborting");
                receiver_handle.abort();
                Vec::new()
            }
        };

        finish(machine, frames, writer.frames_sent(), result, started)
    }
}

/// 把接收任务交付的事件转换为会话结果
fn resolve(event: Result<TerminalEvent, oneshot::error::RecvError>) -> AssessmentResult<String> {
    match event {
        Ok(TerminalEvent::Completed(markup)) => Ok(markup),
        Ok(TerminalEvent::Rejected { code, message }) => {
            Err(AssessmentError::Service { code, message })
        }
        Ok(TerminalEvent::Failed(e)) => Err(e.into()),
        Err(_) => Err(AssessmentError::Connection(
            "receiver ended without a terminal event".to_string(),
        )),
    }
}

/// 结果对应的终态
fn terminal_state(result: &AssessmentResult<String>) -> SessionState {
    match result {
        Ok(_) => SessionState::Completed,
        Err(AssessmentError::Timeout(_)) => SessionState::TimedOut,
        Err(e) => SessionState::failed(e.to_string()),
    }
}

/// 状态转换由驱动方按固定顺序发起，失败只可能是内部错误
fn advance(machine: &mut SessionStateMachine, state: SessionState) {
    if let Err(e) = machine.transition(state) {
        error!("{}", e);
    }
}

fn finish(
    mut machine: SessionStateMachine,
    frames: Vec<ResultFrame>,
    frames_sent: usize,
    result: AssessmentResult<String>,
    started: Instant,
) -> SessionOutcome {
    advance(&mut machine, terminal_state(&result));

    info!(
        state = machine.current().name(),
        frames_sent,
        frames_received = frames.len(),
        "Assessment session finished in {:?}",
        started.elapsed()
    );

    SessionOutcome::new(machine, frames, frames_sent, result)
}
