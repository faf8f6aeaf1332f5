use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::brief::{CreativeBrief, ScriptCandidate};
use crate::capability::ModelSuite;
use crate::config::ExtendedConfig;
use crate::files::{request_dir, write_video};
use crate::pipeline::{progress_channel, run_pipeline, ProgressEvent};
use crate::script_generator::generate_scripts;
use crate::webhook::notify_completion;

type HandlerError = (StatusCode, String);

/// 服务启动时加载一次的配置和模型，所有请求共享
#[derive(Clone)]
pub struct AppState {
    pub config: ExtendedConfig,
    pub models: ModelSuite,
}

/// 生成候选脚本请求
#[derive(Debug, Deserialize)]
pub struct ScriptsRequest {
    pub brief: CreativeBrief,
}

/// 生成候选脚本响应
#[derive(Debug, Serialize)]
pub struct ScriptsResponse {
    pub success: bool,
    pub message: String,
    pub scripts: Vec<ScriptCandidate>,
}

/// 生成视频请求
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub brief: CreativeBrief,
    pub script: ScriptCandidate,
}

/// 生成视频响应（失败时直接返回 500 和错误信息）
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub result: GenerateResult,
}

/// 生成结果
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    /// 视频远端地址
    pub video_locator: String,
    /// 本地保存的视频文件
    pub video_file: String,
    /// 关键帧 data URL
    pub keyframe_data_url: String,
    /// 脚本标题
    pub script_title: String,
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/scripts", post(handle_generate_scripts))
        .route("/generate", post(handle_generate_video))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

fn log_progress(event: &ProgressEvent) {
    info!("📣 [进度] {:?} / {:?}: {}", event.branch, event.state, event.message);
}

/// 根据创意简报生成候选脚本
pub async fn handle_generate_scripts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScriptsRequest>,
) -> Result<ResponseJson<ScriptsResponse>, HandlerError> {
    info!("收到脚本生成请求: {}", request.brief.idea);

    let scripts = generate_scripts(state.models.text.as_ref(), &request.brief)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let message = if scripts.is_empty() {
        "No scripts were generated. Try adjusting your inputs.".to_string()
    } else {
        format!("Generated {} scripts.", scripts.len())
    };

    Ok(ResponseJson(ScriptsResponse {
        success: true,
        message,
        scripts,
    }))
}

/// 为选定的脚本生成视频
pub async fn handle_generate_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<ResponseJson<GenerateResponse>, HandlerError> {
    info!("收到视频生成请求: {}", request.script.title);

    let (reporter, mut events) = progress_channel();
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_progress(&event);
        }
    });

    let outcome = run_pipeline(
        &state.models,
        &request.script,
        &request.brief,
        reporter,
        state.config.pipeline.poll_policy(),
    )
    .await;
    // 流水线结束后发送端已被丢弃，日志任务会自行退出
    let _ = drain.await;

    let result = outcome.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let output_dir = request_dir(state.config.output_path.as_deref());
    let video_path = write_video(&result, &output_dir).map_err(|e| {
        error!("保存视频失败: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("保存视频失败: {}", e))
    })?;

    notify_completion(state.config.pipeline.webhook_url.as_deref(), &result, Some(&video_path)).await;

    Ok(ResponseJson(GenerateResponse {
        success: true,
        message: "Video ready.".to_string(),
        result: GenerateResult {
            video_locator: result.video.locator,
            video_file: video_path.to_string_lossy().to_string(),
            keyframe_data_url: result.keyframe_data_url,
            script_title: result.script.title,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        GeneratedImage, ImageModel, ImageRequest, InlineImage, LongRunningOperation, ResponsePart,
        TextModel, TextRequest, VideoModel, VideoRequest,
    };
    use crate::error::StageError;
    use async_trait::async_trait;

    /// 立即完成的模型组合，`download_status` 非 200 时下载失败
    struct InstantModels {
        download_status: u16,
    }

    #[async_trait]
    impl TextModel for InstantModels {
        async fn generate_text(&self, request: TextRequest) -> Result<String, StageError> {
            match request.schema {
                Some(schema) if schema["properties"].get("scripts").is_some() => {
                    Ok(r#"{"scripts": []}"#.to_string())
                }
                Some(_) => Ok(r#"{"videoPrompt": "slow dolly"}"#.to_string()),
                None => Ok("a harbor at dusk".to_string()),
            }
        }
    }

    #[async_trait]
    impl ImageModel for InstantModels {
        async fn edit_image(&self, _base: &InlineImage, _prompt: &str) -> Result<Vec<ResponsePart>, StageError> {
            Ok(Vec::new())
        }

        async fn generate_images(&self, _request: ImageRequest) -> Result<Vec<GeneratedImage>, StageError> {
            Ok(vec![GeneratedImage { data: "cG5n".to_string() }])
        }
    }

    #[async_trait]
    impl VideoModel for InstantModels {
        async fn submit_video(&self, _request: VideoRequest) -> Result<LongRunningOperation, StageError> {
            Ok(LongRunningOperation {
                name: "operations/instant".to_string(),
                done: true,
                video_uris: vec!["https://example.com/files/v.mp4".to_string()],
                error: None,
            })
        }

        async fn poll_operation(&self, operation: &LongRunningOperation) -> Result<LongRunningOperation, StageError> {
            Ok(operation.clone())
        }

        async fn download_video(&self, _locator: &str) -> Result<Vec<u8>, StageError> {
            if self.download_status == 200 {
                Ok(b"mp4".to_vec())
            } else {
                Err(StageError::VideoDownloadFailed { status: self.download_status })
            }
        }
    }

    fn state(output: &std::path::Path, download_status: u16) -> Arc<AppState> {
        let mut config = ExtendedConfig::default();
        config.output_path = Some(output.to_path_buf());
        Arc::new(AppState {
            config,
            models: ModelSuite::from_client(InstantModels { download_status }),
        })
    }

    fn generate_request() -> GenerateRequest {
        serde_json::from_str(
            r#"{
                "brief": {"idea": "a whale", "aspect_ratio": "16:9"},
                "script": {"title": "Harbor Light", "logline": "l", "fullScript": "s"}
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn generate_request_accepts_wire_field_names() {
        let request = generate_request();
        assert_eq!(request.brief.idea, "a whale");
        assert_eq!(request.script.full_script, "s");
        assert!(request.brief.inspiration_images.is_empty());
    }

    #[tokio::test]
    async fn scripts_use_models_from_shared_state() {
        let dir = tempfile::tempdir().unwrap();
        let request = ScriptsRequest { brief: generate_request().brief };

        let ResponseJson(response) = handle_generate_scripts(State(state(dir.path(), 200)), Json(request))
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.scripts.is_empty());
        assert_eq!(response.message, "No scripts were generated. Try adjusting your inputs.");
    }

    #[tokio::test]
    async fn each_generate_call_writes_its_own_video() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), 200);

        let ResponseJson(first) = handle_generate_video(State(state.clone()), Json(generate_request()))
            .await
            .unwrap();
        let ResponseJson(second) = handle_generate_video(State(state), Json(generate_request()))
            .await
            .unwrap();

        assert_eq!(first.result.script_title, "Harbor Light");
        assert!(first.result.keyframe_data_url.starts_with("data:image/png;base64,"));
        assert_ne!(first.result.video_file, second.result.video_file);
        for file in [&first.result.video_file, &second.result.video_file] {
            assert!(std::path::Path::new(file).starts_with(dir.path()));
            assert_eq!(std::fs::read(file).unwrap(), b"mp4");
        }
    }

    #[tokio::test]
    async fn router_serves_scripts_with_state_from_startup() {
        let dir = tempfile::tempdir().unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state(dir.path(), 200))).await.unwrap();
        });

        let response = reqwest::Client::new()
            .post(format!("http://{}/scripts", addr))
            .json(&serde_json::json!({"brief": {"idea": "a whale"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["scripts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn failed_download_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let (status, message) = handle_generate_video(State(state(dir.path(), 403)), Json(generate_request()))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Failed to generate the final video.");
        assert!(!dir.path().join("video-forge").exists());
    }
}
