use thiserror::Error;

/// 阶段错误的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 模型响应格式不符合预期（JSON 解析失败、缺少字段等）
    SchemaOrParse,
    /// 模型声称成功，但没有返回可用的产物（图片、视频链接、编辑提示词）
    MissingAsset,
    /// 网络/下载错误
    Transport,
}

/// 各生成阶段在边界处返回的具体错误
#[derive(Debug, Error)]
pub enum StageError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("remote service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("could not parse model response: {0}")]
    Parse(String),

    #[error("model response contained no text")]
    EmptyResponse,

    #[error("model did not return a keyframe edit prompt")]
    MissingEditPrompt,

    #[error("model did not return an image")]
    KeyframeEditFailed,

    #[error("image synthesis returned no generated image")]
    KeyframeSynthesisFailed,

    #[error("video operation failed (code {code}): {message}")]
    OperationFailed { code: i32, message: String },

    #[error("video operation still running after {polls} polls")]
    PollLimitReached { polls: u32 },

    #[error("video generation did not produce a download link")]
    VideoLinkMissing,

    #[error("failed to download video: status {status}")]
    VideoDownloadFailed { status: u16 },
}

impl StageError {
    /// 错误所属的分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) | Self::EmptyResponse => ErrorKind::SchemaOrParse,
            Self::MissingEditPrompt
            | Self::KeyframeEditFailed
            | Self::KeyframeSynthesisFailed
            | Self::OperationFailed { .. }
            | Self::VideoLinkMissing => ErrorKind::MissingAsset,
            Self::Transport(_)
            | Self::Http { .. }
            | Self::PollLimitReached { .. }
            | Self::VideoDownloadFailed { .. } => ErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for StageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// 脚本生成失败
#[derive(Debug, Error)]
#[error("Failed to generate scripts from the idea.")]
pub struct ScriptGenerationError {
    #[source]
    pub cause: StageError,
}

/// 视频流水线对外暴露的唯一错误，具体原因只记录在日志中
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Failed to generate the final video.")]
pub struct PipelineError;

/// 状态机非法转换
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal pipeline transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: crate::pipeline::PipelineState,
    pub to: crate::pipeline::PipelineState,
}
