//! 评测语种与题型
//!
//! 每种语种只支持部分题型，切换到不支持的题型时保持当前题型不变，
//! 并通过 `Result` 告知调用方。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 评测语种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// 中文
    #[default]
    Cn,
    /// 英文
    En,
}

impl Language {
    /// 线协议中的语种实体（`ent` 字段）
    pub fn entity(&self) -> &'static str {
        match self {
            Language::Cn => "cn_vip",
            Language::En => "en_vip",
        }
    }

    /// 语种代码
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cn => "cn",
            Language::En => "en",
        }
    }

    /// 该语种支持的题型
    pub fn categories(&self) -> &'static [Category] {
        use Category::*;

        match self {
            Language::Cn => &[ReadSyllable, ReadWord, ReadSentence, ReadChapter],
            Language::En => &[
                ReadWord,
                ReadSentence,
                ReadChapter,
                SimpleExpression,
                ReadChoice,
                Topic,
                Retell,
                PictureTalk,
                OralTranslation,
            ],
        }
    }

    /// 检查是否支持某题型
    pub fn supports(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cn" | "zh" => Ok(Language::Cn),
            "en" => Ok(Language::En),
            other => Err(CategoryError::UnknownLanguage(other.to_string())),
        }
    }
}

/// 评测题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 单字朗读（仅中文）
    ReadSyllable,
    /// 词语朗读
    ReadWord,
    /// 句子朗读
    #[default]
    ReadSentence,
    /// 篇章朗读
    ReadChapter,
    /// 情景反应（仅英文）
    SimpleExpression,
    /// 选择题（仅英文）
    ReadChoice,
    /// 话题简述（仅英文）
    Topic,
    /// 复述（仅英文）
    Retell,
    /// 看图说话（仅英文）
    PictureTalk,
    /// 口头翻译（仅英文）
    OralTranslation,
}

impl Category {
    /// 线协议中的题型名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ReadSyllable => "read_syllable",
            Category::ReadWord => "read_word",
            Category::ReadSentence => "read_sentence",
            Category::ReadChapter => "read_chapter",
            Category::SimpleExpression => "simple_expression",
            Category::ReadChoice => "read_choice",
            Category::Topic => "topic",
            Category::Retell => "retell",
            Category::PictureTalk => "picture_talk",
            Category::OralTranslation => "oral_translation",
        }
    }

    /// 所有题型
    pub fn all() -> &'static [Category] {
        use Category::*;

        &[
            ReadSyllable,
            ReadWord,
            ReadSentence,
            ReadChapter,
            SimpleExpression,
            ReadChoice,
            Topic,
            Retell,
            PictureTalk,
            OralTranslation,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| CategoryError::UnknownCategory(name.to_string()))
    }
}

/// 题型相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// 当前语种不支持该题型
    #[error("Category '{category}' is not supported for language '{language}'")]
    Unsupported {
        category: Category,
        language: Language,
    },

    /// 未知题型名称
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// 未知语种代码
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
}

/// 题型选择器
///
/// 绑定一个语种，只接受该语种支持的题型
///
/// # Examples
///
/// ```
/// use ise_client::assessment::{Category, CategorySelector, Language};
///
/// let mut selector = CategorySelector::new(Language::Cn);
/// assert!(selector.set(Category::ReadWord).is_ok());
///
/// // 中文不支持口头翻译，题型保持不变
/// assert!(selector.set(Category::OralTranslation).is_err());
/// assert_eq!(selector.current(), Category::ReadWord);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySelector {
    language: Language,
    current: Category,
}

impl CategorySelector {
    /// 创建选择器，默认题型为句子朗读
    pub fn new(language: Language) -> Self {
        Self {
            language,
            current: Category::default(),
        }
    }

    /// 当前语种
    pub fn language(&self) -> Language {
        self.language
    }

    /// 当前题型
    pub fn current(&self) -> Category {
        self.current
    }

    /// 设置题型
    ///
    /// # Errors
    ///
    /// 当前语种不支持时返回 [`CategoryError::Unsupported`]，题型保持不变
    pub fn set(&mut self, category: Category) -> Result<(), CategoryError> {
        if !self.language.supports(category) {
            tracing::warn!(
                category = %category,
                language = %self.language,
                current = %self.current,
                "Unsupported category ignored"
            );
            return Err(CategoryError::Unsupported {
                category,
                language: self.language,
            });
        }

        self.current = category;
        tracing::debug!(category = %category, "Category set");
        Ok(())
    }

    /// 按名称设置题型
    ///
    /// # Errors
    ///
    /// 名称未知或当前语种不支持时返回错误，题型保持不变
    pub fn set_str(&mut self, name: &str) -> Result<(), CategoryError> {
        let category = name.parse::<Category>().inspect_err(|_| {
            tracing::warn!(name, current = %self.current, "Unknown category ignored");
        })?;
        self.set(category)
    }
}
