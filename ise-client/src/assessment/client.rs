//! 评测客户端
//!
//! 持有凭证、服务地址、发送参数和当前题型，每次 `assess` 创建一个新的会话。

use std::time::Duration;

use tracing::info;

use crate::assessment::category::{Category, CategoryError, CategorySelector, Language};
use crate::assessment::session::{
    AssessmentRequest, AssessmentSession, SessionOutcome, StreamOptions,
};
use crate::config::{AppConfig, ConfigError};
use crate::network::{Credentials, ServiceEndpoint};
use crate::scoring::{ScoreExtractor, ScoreReport};

/// 评测客户端
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use ise_client::assessment::{IseClient, Language};
/// use ise_client::network::Credentials;
///
/// #[tokio::main]
/// async fn main() {
///     let mut client = IseClient::new(Credentials::new("app", "key", "secret"), Language::Cn);
///     client.set_category_str("read_word").unwrap();
///
///     let audio = std::fs::read("sample.pcm").unwrap();
///     let outcome = client
///         .assess("你好", audio, None, Duration::from_secs(15))
///         .await;
///
///     let report = client.extract_scores(outcome.raw());
///     println!("{}", report);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct IseClient {
    credentials: Credentials,
    endpoint: ServiceEndpoint,
    options: StreamOptions,
    selector: CategorySelector,
}

impl IseClient {
    /// 创建客户端，使用默认服务地址和发送参数
    pub fn new(credentials: Credentials, language: Language) -> Self {
        Self {
            credentials,
            endpoint: ServiceEndpoint::default(),
            options: StreamOptions::default(),
            selector: CategorySelector::new(language),
        }
    }

    /// 根据应用配置创建客户端
    ///
    /// 配置中的题型不被语种支持时保留默认题型
    ///
    /// # Errors
    ///
    /// 凭证不完整时返回 [`ConfigError::MissingCredentials`]
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let assessment = &config.assessment;
        let mut client = Self::new(config.api.credentials()?, assessment.language)
            .with_endpoint(config.api.endpoint())
            .with_options(assessment.stream_options());

        // 不支持时已记录警告，保持默认题型
        let _ = client.set_category(assessment.category);

        Ok(client)
    }

    /// 使用指定的服务端点
    pub fn with_endpoint(mut self, endpoint: ServiceEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// 使用指定的分帧与连接参数
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// 当前语种
    pub fn language(&self) -> Language {
        self.selector.language()
    }

    /// 当前题型
    pub fn category(&self) -> Category {
        self.selector.current()
    }

    /// 当前服务端点
    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// 当前分帧与连接参数
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// 设置题型
    ///
    /// # Errors
    ///
    /// 当前语种不支持时返回错误，题型保持不变
    pub fn set_category(&mut self, category: Category) -> Result<(), CategoryError> {
        self.selector.set(category)
    }

    /// 按名称设置题型
    ///
    /// # Errors
    ///
    /// 名称未知或当前语种不支持时返回错误，题型保持不变
    pub fn set_category_str(&mut self, name: &str) -> Result<(), CategoryError> {
        self.selector.set_str(name)
    }

    /// 评测一段音频
    ///
    /// `category` 为 `Some` 时先切换题型（与 [`IseClient::set_category`] 相同的校验），
    /// 切换失败则沿用当前题型。
    pub async fn assess(
        &mut self,
        reference_text: &str,
        audio: Vec<u8>,
        category: Option<Category>,
        timeout: Duration,
    ) -> SessionOutcome {
        if let Some(category) = category {
            // 不支持时已记录警告
            let _ = self.set_category(category);
        }

        info!(
            category = %self.category(),
            language = %self.language(),
            "Assessing {} bytes of audio",
            audio.len()
        );

        let request = AssessmentRequest::new(reference_text, audio)
            .with_category(self.category())
            .with_language(self.language())
            .with_timeout(timeout);

        AssessmentSession::new(
            self.credentials.clone(),
            self.endpoint.clone(),
            self.options.clone(),
            request,
        )
        .run()
        .await
    }

    /// 从原始结果中提取分数，使用当前题型
    pub fn extract_scores(&self, raw: Option<&str>) -> ScoreReport {
        ScoreExtractor::new(self.category()).extract(raw)
    }
}
