//! 评测流程
//!
//! 一轮评测：读取录音 → （可选）语音识别 → 发音评测 → 提取分数 →
//! 生成反馈 → （可选）语音合成 → 推送到展示端。
//!
//! 每轮开始时读取一次全局配置快照，配置变更从下一轮生效。

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assessment::{AssessmentError, Category, IseClient};
use crate::config::GlobalConfig;
use crate::pipeline::providers::{
    AudioSource, FeedbackGenerator, PresentationEvent, Presenter, Synthesizer, Transcriber,
};
use crate::scoring::ScoreReport;
use crate::utils::error::{AppError, AppResult};

/// 一轮评测的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    /// 服务返回的原始结果标记
    pub raw: String,
    /// 分数
    pub scores: ScoreReport,
    /// 反馈文本
    pub feedback: String,
    /// 识别文本（配置了识别器时存在）
    pub transcript: Option<String>,
}

/// 评测流程
///
/// 反馈生成器和展示端必须提供，识别器和合成器可选
pub struct AssessmentPipeline {
    config: Arc<GlobalConfig>,
    feedback: Arc<dyn FeedbackGenerator>,
    presenter: Arc<dyn Presenter>,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl AssessmentPipeline {
    /// 创建评测流程
    pub fn new(
        config: Arc<GlobalConfig>,
        feedback: Arc<dyn FeedbackGenerator>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            config,
            feedback,
            presenter,
            transcriber: None,
            synthesizer: None,
        }
    }

    /// 在评测前先做语音识别
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// 把反馈合成为语音
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// 运行一轮评测
    ///
    /// `category` 为 `None` 时使用句子朗读；不被当前语种支持的题型会被忽略。
    ///
    /// # Errors
    ///
    /// - 凭证缺失：[`AppError::Config`]
    /// - 录音为空或无效：[`AppError::Assessment`]（`InvalidInput`），不会连接服务
    /// - 录音或识别失败、反馈生成失败：[`AppError::Collaborator`]
    /// - 会话失败或超时：[`AppError::Assessment`]
    ///
    /// 合成和推送失败只记录日志
    pub async fn run(
        &self,
        reference_text: &str,
        source: &dyn AudioSource,
        category: Option<Category>,
    ) -> AppResult<AssessmentReport> {
        let snapshot = self.config.get();

        // 1. 按当前配置创建客户端
        let mut client = IseClient::from_config(&snapshot)?;

        // 2. 设置题型
        let category = category.unwrap_or(Category::ReadSentence);
        if let Err(e) = client.set_category(category) {
            debug!("Keeping category {}: {}", client.category(), e);
        }

        info!(
            category = %client.category(),
            language = %client.language(),
            "Starting assessment round: {}",
            reference_text
        );

        // 3. 读取录音
        let audio = source.capture().await.map_err(capture_error)?;
        if audio.is_empty() {
            return Err(AssessmentError::InvalidInput("captured audio is empty".to_string()).into());
        }

        // 4. 语音识别
        let transcript = match &self.transcriber {
            Some(transcriber) => {
                let transcription = transcriber
                    .transcribe(&audio)
                    .await
                    .map_err(|e| AppError::Collaborator(format!("transcription failed: {:#}", e)))?;

                if !transcription.success {
                    return Err(AppError::Collaborator(
                        "transcription recognized nothing".to_string(),
                    ));
                }

                info!("Transcript: {}", transcription.text);
                Some(transcription.text)
            }
            None => None,
        };

        // 5. 发音评测
        let outcome = client
            .assess(reference_text, audio, None, snapshot.assessment.timeout())
            .await;
        let raw = outcome.into_result()?;

        // 6. 提取分数
        let scores = client.extract_scores(Some(&raw));
        info!("Scores: {}", scores);

        // 7. 生成反馈
        let feedback = self
            .feedback
            .feedback(reference_text, &raw)
            .await
            .map_err(|e| AppError::Collaborator(format!("feedback generation failed: {:#}", e)))?;

        // 8. 语音合成
        if let Some(synthesizer) = &self.synthesizer {
            let output = &snapshot.pipeline.feedback_audio_path;
            match synthesizer.synthesize(&feedback, output).await {
                Ok(true) => info!(path = %output.display(), "Feedback synthesized"),
                Ok(false) => warn!("Synthesizer declined the feedback text"),
                Err(e) => warn!("Feedback synthesis failed: {:#}", e),
            }
        }

        // 9. 推送到展示端
        let event = PresentationEvent::AssessmentResult {
            scores: scores.clone(),
            feedback: feedback.clone(),
        };
        if let Err(e) = self.presenter.present(&event).await {
            warn!("Failed to push assessment result: {:#}", e);
        }

        Ok(AssessmentReport {
            raw,
            scores,
            feedback,
            transcript,
        })
    }
}

/// 录音失败：评测输入错误保持原样，其余视为协作方错误
fn capture_error(err: anyhow::Error) -> AppError {
    match err.downcast::<AssessmentError>() {
        Ok(assessment) => AppError::Assessment(assessment),
        Err(other) => AppError::Collaborator(format!("audio capture failed: {:#}", other)),
    }
}
