use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, info};

use crate::brief::{CreativeBrief, InspirationAsset, ScriptCandidate};
use crate::capability::{TextModel, TextRequest};
use crate::error::{ScriptGenerationError, StageError};

#[derive(Debug, Deserialize)]
struct ScriptBatch {
    scripts: Vec<ScriptCandidate>,
}

/// 请求候选脚本时使用的输出格式
pub fn script_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "scripts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "logline": { "type": "STRING" },
                        "fullScript": { "type": "STRING" }
                    },
                    "required": ["title", "logline", "fullScript"]
                }
            }
        },
        "required": ["scripts"]
    })
}

fn summarize_assets(assets: &[InspirationAsset]) -> String {
    assets
        .iter()
        .map(|asset| {
            let description = asset.description.trim();
            if description.is_empty() {
                asset.name.clone()
            } else {
                format!("{}: {}", asset.name, description)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 把创意简报整理成一段自然语言描述
///
/// 音频只提及文件名作为基调参考，音频内容不会发送给文本模型。
pub fn describe_brief(brief: &CreativeBrief) -> String {
    let mut lines = vec![format!("Core idea: {}", brief.idea.trim())];

    let fields = [
        ("Target duration (seconds)", &brief.duration),
        ("Mood / style", &brief.mood),
        ("Aspect ratio", &brief.aspect_ratio),
        ("Target audience", &brief.audience),
    ];
    for (label, value) in fields {
        if !value.trim().is_empty() {
            lines.push(format!("{}: {}", label, value.trim()));
        }
    }

    if !brief.inspiration_images.is_empty() {
        lines.push(format!(
            "Inspiration images: {}",
            summarize_assets(&brief.inspiration_images)
        ));
    }
    if !brief.inspiration_videos.is_empty() {
        lines.push(format!(
            "Inspiration videos: {}",
            summarize_assets(&brief.inspiration_videos)
        ));
    }
    if let Some(audio) = &brief.inspiration_audio {
        lines.push(format!(
            "An audio file named \"{}\" was provided; let it guide the tone and pacing.",
            audio.name
        ));
    }

    lines.join("\n")
}

fn script_prompt(brief: &CreativeBrief) -> String {
    format!(
        "You are a creative director writing scripts for short-form video.\n\
         Based on the creative brief below, write three distinct script options. \
         Each option needs a title, a one or two sentence logline, and a full \
         scene-by-scene script with visual directions.\n\n\
         CREATIVE BRIEF\n{}",
        describe_brief(brief)
    )
}

fn parse_scripts(raw: &str) -> Result<Vec<ScriptCandidate>, StageError> {
    let batch: ScriptBatch = serde_json::from_str(raw.trim())?;

    if let Some(blank) = batch.scripts.iter().position(|s| {
        s.title.trim().is_empty() || s.logline.trim().is_empty() || s.full_script.trim().is_empty()
    }) {
        return Err(StageError::Parse(format!("script #{} has an empty required field", blank)));
    }

    Ok(batch.scripts)
}

/// 根据创意简报生成候选脚本
///
/// 返回空列表不是错误，调用方需要提示用户调整输入。
pub async fn generate_scripts(
    text_model: &dyn TextModel,
    brief: &CreativeBrief,
) -> Result<Vec<ScriptCandidate>, ScriptGenerationError> {
    let start = Instant::now();
    info!("⏳ [脚本生成] 正在根据创意生成候选脚本...");

    let request = TextRequest::with_schema(script_prompt(brief), script_schema());
    let result = match text_model.generate_text(request).await {
        Ok(raw) => parse_scripts(&raw),
        Err(e) => Err(e),
    };

    match result {
        Ok(scripts) => {
            info!(
                "✅ [脚本生成] 完成，共 {} 个候选脚本，耗时: {:.2}秒",
                scripts.len(),
                start.elapsed().as_secs_f64()
            );
            Ok(scripts)
        }
        Err(cause) => {
            error!("❌ [脚本生成] 失败 ({:?}): {}", cause.kind(), cause);
            Err(ScriptGenerationError { cause })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, description: &str) -> InspirationAsset {
        InspirationAsset {
            data: String::new(),
            media_type: "image/png".to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn description_lists_assets_by_name() {
        let brief = CreativeBrief {
            idea: "A lighthouse keeper befriends a whale".to_string(),
            mood: "Nostalgic".to_string(),
            inspiration_images: vec![asset("sunset.png", "warm sunset tones"), asset("sea.jpg", "")],
            inspiration_videos: vec![asset("waves.mp4", "slow pans")],
            inspiration_audio: Some(InspirationAsset {
                data: "c2VjcmV0LWF1ZGlv".to_string(),
                media_type: "audio/mpeg".to_string(),
                name: "theme.mp3".to_string(),
                description: String::new(),
            }),
            ..Default::default()
        };

        let text = describe_brief(&brief);
        assert!(text.contains("Core idea: A lighthouse keeper befriends a whale"));
        assert!(text.contains("Mood / style: Nostalgic"));
        assert!(text.contains("Inspiration images: sunset.png: warm sunset tones; sea.jpg"));
        assert!(text.contains("Inspiration videos: waves.mp4: slow pans"));
        assert!(text.contains("theme.mp3"));
        assert!(!text.contains("c2VjcmV0LWF1ZGlv"));
        assert!(!text.contains("Aspect ratio"));
    }

    #[test]
    fn schema_requires_all_script_fields() {
        let schema = script_schema();
        let required = &schema["properties"]["scripts"]["items"]["required"];
        assert_eq!(required, &json!(["title", "logline", "fullScript"]));
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(parse_scripts(r#"{"scripts": []}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_field_is_a_parse_failure() {
        let err = parse_scripts(r#"{"scripts": [{"title": "T", "logline": "L"}]}"#).unwrap_err();
        assert!(matches!(err, StageError::Parse(_)));
    }

    #[test]
    fn blank_field_is_a_parse_failure() {
        let err =
            parse_scripts(r#"{"scripts": [{"title": " ", "logline": "L", "fullScript": "S"}]}"#)
                .unwrap_err();
        assert!(matches!(err, StageError::Parse(_)));
    }
}
