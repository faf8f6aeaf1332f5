//! 三类生成模型能力的抽象：文本、图片、视频
//!
//! 流水线只依赖这些 trait，具体实现见 [`crate::genai_client::GeminiClient`]。

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::brief::AspectRatio;
use crate::error::StageError;

/// 文本生成请求
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    /// 严格输出格式；为 None 时返回自由文本
    pub schema: Option<Value>,
}

impl TextRequest {
    pub fn free_text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), schema: None }
    }

    pub fn with_schema(prompt: impl Into<String>, schema: Value) -> Self {
        Self { prompt: prompt.into(), schema: Some(schema) }
    }
}

/// base64 编码的内联图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub data: String,
    pub media_type: String,
}

/// 图片编辑响应中的一个片段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_image: Option<InlineImage>,
}

/// 图片生成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub count: u32,
    pub output_mime_type: String,
    pub aspect_ratio: AspectRatio,
}

/// 生成的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// base64 编码的图片内容
    pub data: String,
}

/// 视频生成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    /// 作为首帧条件的关键帧
    pub image: InlineImage,
    pub count: u32,
}

/// 远端操作返回的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub code: i32,
    pub message: String,
}

/// 长时间运行的远端操作
///
/// 只能由提交调用创建、由轮询调用刷新。`done` 为 true 之前 `video_uris`
/// 没有意义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRunningOperation {
    pub name: String,
    pub done: bool,
    pub video_uris: Vec<String>,
    pub error: Option<OperationError>,
}

impl LongRunningOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            video_uris: Vec::new(),
            error: None,
        }
    }
}

#[async_trait]
pub trait TextModel: Send + Sync {
    /// 返回模型的原始文本；请求了 schema 时由调用方解析 JSON
    async fn generate_text(&self, request: TextRequest) -> Result<String, StageError>;
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    /// 以图片 + 文字指令编辑图片，返回有序的响应片段
    async fn edit_image(
        &self,
        base: &InlineImage,
        prompt: &str,
    ) -> Result<Vec<ResponsePart>, StageError>;

    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>, StageError>;
}

#[async_trait]
pub trait VideoModel: Send + Sync {
    async fn submit_video(&self, request: VideoRequest) -> Result<LongRunningOperation, StageError>;

    async fn poll_operation(
        &self,
        operation: &LongRunningOperation,
    ) -> Result<LongRunningOperation, StageError>;

    /// 下载生成的视频（下载地址需要凭证）
    async fn download_video(&self, locator: &str) -> Result<Vec<u8>, StageError>;
}

/// 一次流水线运行用到的全部模型
#[derive(Clone)]
pub struct ModelSuite {
    pub text: Arc<dyn TextModel>,
    pub image: Arc<dyn ImageModel>,
    pub video: Arc<dyn VideoModel>,
}

impl ModelSuite {
    /// 三种能力都由同一个客户端提供
    pub fn from_client<C>(client: C) -> Self
    where
        C: TextModel + ImageModel + VideoModel + 'static,
    {
        let client = Arc::new(client);
        Self {
            text: client.clone(),
            image: client.clone(),
            video: client,
        }
    }
}
