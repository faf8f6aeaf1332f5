use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{InlineImage, LongRunningOperation, OperationError, ResponsePart};

/// generateContent 请求体
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// 一轮对话内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

/// 内容片段：文字或内联数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(
        rename = "inlineData",
        alias = "inline_data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(image: &InlineImage) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.media_type.clone(),
                data: image.data.clone(),
            }),
        }
    }
}

/// 内联数据（base64）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    pub mime_type: String,

    #[serde(default)]
    pub data: String,
}

/// 生成参数
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,

    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

/// generateContent 响应
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    /// 拼接所有文字片段
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 按原始顺序转换为响应片段
    pub fn into_response_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| ResponsePart {
                text: p.text,
                inline_image: p
                    .inline_data
                    .filter(|d| !d.data.is_empty())
                    .map(|d| InlineImage { data: d.data, media_type: d.mime_type }),
            })
            .collect()
    }
}

/// 图片生成（predict）请求体
#[derive(Debug, Clone, Serialize)]
pub struct ImagePredictRequest {
    pub instances: Vec<PromptInstance>,
    pub parameters: ImageParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageParameters {
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,

    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,

    #[serde(rename = "outputMimeType")]
    pub output_mime_type: String,
}

/// 图片生成（predict）响应
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePredictResponse {
    #[serde(default)]
    pub predictions: Vec<ImagePrediction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePrediction {
    #[serde(rename = "bytesBase64Encoded", default)]
    pub bytes_base64_encoded: Option<String>,
}

/// 视频生成（predictLongRunning）请求体
#[derive(Debug, Clone, Serialize)]
pub struct VideoPredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoInstance {
    pub prompt: String,
    pub image: ImageInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInput {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64_encoded: String,

    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoParameters {
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,
}

/// 长时间运行操作的状态
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub name: String,

    #[serde(default)]
    pub done: Option<bool>,

    #[serde(default)]
    pub response: Option<OperationResult>,

    #[serde(default)]
    pub error: Option<OperationErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationResult {
    #[serde(rename = "generateVideoResponse", default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    pub generated_samples: Option<Vec<GeneratedSample>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRef {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationErrorBody {
    #[serde(default)]
    pub code: i32,

    #[serde(default)]
    pub message: String,
}

impl From<OperationStatus> for LongRunningOperation {
    fn from(status: OperationStatus) -> Self {
        let video_uris = status
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.video.and_then(|v| v.uri))
            .collect();

        LongRunningOperation {
            name: status.name,
            done: status.done.unwrap_or(false),
            video_uris,
            error: status.error.map(|e| OperationError { code: e.code, message: e.message }),
        }
    }
}
