//! 评测流程与外部协作方
//!
//! - `providers` - 录音、识别、合成、反馈和展示的接口
//! - `audio_file` - 从文件读取录音
//! - `round` - 一轮完整的评测流程

pub mod audio_file;
pub mod providers;
pub mod round;

pub use audio_file::FileAudioSource;
pub use providers::{
    AudioSource, FeedbackGenerator, LogPresenter, PresentationEvent, Presenter, Synthesizer,
    Transcriber, Transcription,
};
pub use round::{AssessmentPipeline, AssessmentReport};
