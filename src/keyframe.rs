use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::brief::{AspectRatio, CreativeBrief, InspirationAsset, Keyframe, ScriptCandidate};
use crate::capability::{ImageModel, ImageRequest, InlineImage, TextModel, TextRequest};
use crate::error::StageError;

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// 关键帧的生成路径，两者互斥
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyframeBranch {
    /// 编辑用户提供的第一张灵感图片
    EditInspiration,
    /// 仅根据脚本生成新图片
    SynthesizeFromScript,
}

impl KeyframeBranch {
    /// 有灵感图片时走编辑路径；灵感视频和音频不影响选择
    pub fn for_brief(brief: &CreativeBrief) -> Self {
        if brief.inspiration_images.is_empty() {
            KeyframeBranch::SynthesizeFromScript
        } else {
            KeyframeBranch::EditInspiration
        }
    }

    pub fn needs_edit_prompt(&self) -> bool {
        matches!(self, KeyframeBranch::EditInspiration)
    }
}

/// 编辑路径：在灵感图片基础上按编辑提示词修改
///
/// 结果沿用原图的媒体类型。
pub async fn edit_keyframe(
    image_model: &dyn ImageModel,
    inspiration: &InspirationAsset,
    edit_prompt: &str,
) -> Result<Keyframe, StageError> {
    let start = Instant::now();
    info!("⏳ [关键帧] 正在编辑灵感图片: {}", inspiration.name);

    let base = InlineImage {
        data: inspiration.data.clone(),
        media_type: inspiration.media_type.clone(),
    };
    let parts = image_model.edit_image(&base, edit_prompt).await?;

    let image = parts
        .into_iter()
        .find_map(|part| part.inline_image)
        .ok_or(StageError::KeyframeEditFailed)?;

    info!("✅ [关键帧] 图片编辑完成，耗时: {:.2}秒", start.elapsed().as_secs_f64());
    Ok(Keyframe {
        data: image.data,
        media_type: inspiration.media_type.clone(),
    })
}

fn image_prompt_request(script: &ScriptCandidate, aspect_ratio: AspectRatio) -> String {
    format!(
        "Write one prompt for an image generation model. The image will be the \
         opening keyframe of a video based on the script below, so capture the \
         script's visual essence: subject, setting, lighting, color palette and \
         composition. The image must be framed for a {} aspect ratio.\n\
         Respond with the prompt text only.\n\n\
         TITLE: {}\nLOGLINE: {}\nSCRIPT:\n{}",
        aspect_ratio, script.title, script.logline, script.full_script
    )
}

/// 合成路径：先让文本模型写图片提示词，再生成一张 PNG
pub async fn synthesize_keyframe(
    text_model: &dyn TextModel,
    image_model: &dyn ImageModel,
    script: &ScriptCandidate,
    aspect_ratio: &str,
) -> Result<Keyframe, StageError> {
    let start = Instant::now();

    // 提示词和生成的图片使用同一个比例
    let ratio = AspectRatio::coerce(aspect_ratio);
    if ratio.as_str() != aspect_ratio.trim() {
        warn!("⚠️  [关键帧] 不支持的画面比例 \"{}\"，使用 {}", aspect_ratio, ratio);
    }

    info!("⏳ [关键帧] 正在根据脚本生成图片提示词...");
    let raw = text_model
        .generate_text(TextRequest::free_text(image_prompt_request(script, ratio)))
        .await?;
    let image_prompt = raw.trim().to_string();
    if image_prompt.is_empty() {
        return Err(StageError::EmptyResponse);
    }

    info!("⏳ [关键帧] 正在生成图片 (比例: {})...", ratio);
    let images = image_model
        .generate_images(ImageRequest {
            prompt: image_prompt,
            count: 1,
            output_mime_type: PNG_MEDIA_TYPE.to_string(),
            aspect_ratio: ratio,
        })
        .await?;

    let image = images
        .into_iter()
        .next()
        .ok_or(StageError::KeyframeSynthesisFailed)?;

    info!("✅ [关键帧] 图片生成完成，耗时: {:.2}秒", start.elapsed().as_secs_f64());
    Ok(Keyframe {
        data: image.data,
        media_type: PNG_MEDIA_TYPE.to_string(),
    })
}
