use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::brief::Keyframe;
use crate::capability::{InlineImage, VideoModel, VideoRequest};
use crate::error::StageError;

/// 轮询策略
///
/// 间隔固定，不做退避。`max_polls` 为 None 时一直等到操作完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: None,
        }
    }
}

/// 提交视频生成任务并等待完成，返回视频下载地址
pub async fn synthesize_video(
    video_model: &dyn VideoModel,
    video_prompt: &str,
    keyframe: &Keyframe,
    policy: PollPolicy,
) -> Result<String, StageError> {
    let start = Instant::now();
    info!("⏳ [视频生成] 正在提交视频生成任务...");

    let mut operation = video_model
        .submit_video(VideoRequest {
            prompt: video_prompt.to_string(),
            image: InlineImage {
                data: keyframe.data.clone(),
                media_type: keyframe.media_type.clone(),
            },
            count: 1,
        })
        .await?;

    let mut polls: u32 = 0;
    while !operation.done {
        if policy.max_polls.is_some_and(|max| polls >= max) {
            return Err(StageError::PollLimitReached { polls });
        }

        debug!("视频尚未生成完成，{} 秒后再次查询...", policy.interval.as_secs());
        tokio::time::sleep(policy.interval).await;
        operation = video_model.poll_operation(&operation).await?;
        polls += 1;
    }

    if let Some(error) = operation.error {
        return Err(StageError::OperationFailed { code: error.code, message: error.message });
    }

    let locator = operation
        .video_uris
        .into_iter()
        .next()
        .filter(|uri| !uri.trim().is_empty())
        .ok_or(StageError::VideoLinkMissing)?;

    info!(
        "✅ [视频生成] 完成，轮询 {} 次，耗时: {:.2}秒",
        polls,
        start.elapsed().as_secs_f64()
    );
    Ok(locator)
}
