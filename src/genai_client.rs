use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::capability::{
    GeneratedImage, ImageModel, ImageRequest, InlineImage, LongRunningOperation, ResponsePart,
    TextModel, TextRequest, VideoModel, VideoRequest,
};
use crate::config::GenAiConfig;
use crate::error::StageError;
use crate::genai_types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageInput,
    ImageParameters, ImagePredictRequest, ImagePredictResponse, OperationStatus, Part,
    PromptInstance, VideoInstance, VideoParameters, VideoPredictRequest,
};

/// Generative Language API 客户端
///
/// 同时实现文本、图片、视频三种能力。所有请求都通过 `key` 查询参数鉴权，
/// 生成视频的下载地址同样需要附加该参数。
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    config: GenAiConfig,
}

impl GeminiClient {
    /// 创建新的客户端，API Key 缺失时返回错误
    pub fn new(config: GenAiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, api_key, config })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:{}", self.config.api_base, model_path, method)
    }

    /// 发送 POST 请求并解析 JSON 响应
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, StageError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, StageError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StageError::Http { status: status.as_u16(), body: text });
        }
        serde_json::from_str(&text).map_err(StageError::from)
    }

    /// 下载地址附加 API Key
    fn authenticated_download_url(&self, locator: &str) -> Result<reqwest::Url, StageError> {
        let mut url = reqwest::Url::parse(locator)
            .map_err(|e| StageError::Transport(format!("invalid video locator {}: {}", locator, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate_text(&self, request: TextRequest) -> Result<String, StageError> {
        let generation_config = request.schema.map(|schema| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Default::default()
        });

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(request.prompt)],
            }],
            generation_config,
        };

        let url = self.model_url(&self.config.text_model, "generateContent");
        let response: GenerateContentResponse = self.post_json(&url, &body).await?;
        response.text().ok_or(StageError::EmptyResponse)
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn edit_image(
        &self,
        base: &InlineImage,
        prompt: &str,
    ) -> Result<Vec<ResponsePart>, StageError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::inline(base), Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
                ..Default::default()
            }),
        };

        let url = self.model_url(&self.config.image_edit_model, "generateContent");
        let response: GenerateContentResponse = self.post_json(&url, &body).await?;
        Ok(response.into_response_parts())
    }

    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>, StageError> {
        let body = ImagePredictRequest {
            instances: vec![PromptInstance { prompt: request.prompt }],
            parameters: ImageParameters {
                sample_count: request.count,
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                output_mime_type: request.output_mime_type,
            },
        };

        let url = self.model_url(&self.config.image_model, "predict");
        let response: ImagePredictResponse = self.post_json(&url, &body).await?;

        Ok(response
            .predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded)
            .filter(|data| !data.is_empty())
            .map(|data| GeneratedImage { data })
            .collect())
    }
}

#[async_trait]
impl VideoModel for GeminiClient {
    async fn submit_video(&self, request: VideoRequest) -> Result<LongRunningOperation, StageError> {
        let body = VideoPredictRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt,
                image: ImageInput {
                    bytes_base64_encoded: request.image.data,
                    mime_type: request.image.media_type,
                },
            }],
            parameters: VideoParameters { sample_count: request.count },
        };

        let url = self.model_url(&self.config.video_model, "predictLongRunning");
        let status: OperationStatus = self.post_json(&url, &body).await?;
        info!("视频任务已提交: {}", status.name);
        Ok(status.into())
    }

    async fn poll_operation(
        &self,
        operation: &LongRunningOperation,
    ) -> Result<LongRunningOperation, StageError> {
        let url = format!("{}/{}", self.config.api_base, operation.name);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status: OperationStatus = Self::read_json(response).await?;
        Ok(status.into())
    }

    async fn download_video(&self, locator: &str) -> Result<Vec<u8>, StageError> {
        let url = self.authenticated_download_url(locator)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::VideoDownloadFailed { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        info!("视频已下载: {} 字节", bytes.len());
        Ok(bytes.to_vec())
    }
}
