use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

use crate::pipeline::PipelineResult;

/// Webhook 回调数据结构
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    /// 处理状态
    pub status: String,
    /// 脚本标题
    pub script_title: String,
    /// 视频远端地址
    pub video_locator: String,
    /// 本地保存的视频文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_file: Option<String>,
    /// 关键帧媒体类型
    pub keyframe_media_type: String,
    /// 处理时间戳
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn success(result: &PipelineResult, video_file: Option<&Path>) -> Self {
        Self {
            status: "success".to_string(),
            script_title: result.script.title.clone(),
            video_locator: result.video.locator.clone(),
            video_file: video_file.map(|p| p.to_string_lossy().to_string()),
            keyframe_media_type: result.keyframe.media_type.clone(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// 调用 webhook 回调
pub async fn call_webhook(webhook_url: &str, payload: &WebhookPayload) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .post(webhook_url)
        .json(payload)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("Webhook 请求失败")?;

    let status = response.status();
    if status.is_success() {
        tracing::info!("Webhook 回调成功: {}", webhook_url);
    } else {
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!("Webhook 回调返回错误状态: {} - {}", status, error_text);
        return Err(anyhow::anyhow!("Webhook 返回错误状态: {}", status));
    }

    Ok(())
}

/// 生成完成后通知 webhook（如果配置了），失败只记录警告
pub async fn notify_completion(
    webhook_url: Option<&str>,
    result: &PipelineResult,
    video_file: Option<&Path>,
) {
    let Some(url) = webhook_url else {
        return;
    };

    tracing::info!("⏳ [Webhook] 正在调用 Webhook 回调...");
    let payload = WebhookPayload::success(result, video_file);
    if let Err(e) = call_webhook(url, &payload).await {
        tracing::warn!("⚠️  [Webhook] Webhook 回调失败: {}", e);
    }
}
