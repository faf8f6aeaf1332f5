use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::brief::{ScriptCandidate, SynthesisPrompts};
use crate::capability::{TextModel, TextRequest};
use crate::error::StageError;

#[derive(Debug, Deserialize)]
struct DerivedPrompts {
    #[serde(rename = "videoPrompt")]
    video_prompt: String,

    #[serde(rename = "keyframeEditPrompt", default)]
    keyframe_edit_prompt: Option<String>,
}

/// 构建输出格式：只有需要编辑图片时才包含 keyframeEditPrompt
pub fn prompt_schema(needs_edit_prompt: bool) -> Value {
    let mut properties = Map::new();
    properties.insert("videoPrompt".to_string(), json!({ "type": "STRING" }));
    let mut required = vec![json!("videoPrompt")];

    if needs_edit_prompt {
        properties.insert("keyframeEditPrompt".to_string(), json!({ "type": "STRING" }));
        required.push(json!("keyframeEditPrompt"));
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

fn derive_prompt_text(script: &ScriptCandidate, needs_edit_prompt: bool) -> String {
    let mut prompt = String::from(
        "You are a cinematographer preparing a short video shoot.\n\
         Read the script below and write `videoPrompt`: a single rich paragraph \
         describing the motion, camera work, lighting and atmosphere of the video.\n",
    );
    if needs_edit_prompt {
        prompt.push_str(
            "Also write `keyframeEditPrompt`: an instruction for editing the user's \
             inspiration image so it becomes the opening frame of this video, keeping \
             its composition but matching the script's style and subject.\n",
        );
    }
    prompt.push_str(&format!(
        "\nTITLE: {}\nLOGLINE: {}\nSCRIPT:\n{}",
        script.title, script.logline, script.full_script
    ));
    prompt
}

/// 为选定脚本生成视频提示词（以及可选的关键帧编辑提示词）
///
/// `needs_edit_prompt` 为 true 时缺少编辑提示词是致命错误。
pub async fn derive_prompts(
    text_model: &dyn TextModel,
    script: &ScriptCandidate,
    needs_edit_prompt: bool,
) -> Result<SynthesisPrompts, StageError> {
    info!("⏳ [提示词] 正在为脚本「{}」生成提示词 (编辑提示词: {})", script.title, needs_edit_prompt);

    let request = TextRequest::with_schema(
        derive_prompt_text(script, needs_edit_prompt),
        prompt_schema(needs_edit_prompt),
    );
    let raw = text_model.generate_text(request).await?;
    let derived: DerivedPrompts = serde_json::from_str(raw.trim())?;

    if derived.video_prompt.trim().is_empty() {
        return Err(StageError::Parse("videoPrompt is empty".to_string()));
    }

    let keyframe_edit_prompt = if needs_edit_prompt {
        match derived.keyframe_edit_prompt {
            Some(p) if !p.trim().is_empty() => Some(p),
            _ => return Err(StageError::MissingEditPrompt),
        }
    } else {
        None
    };

    debug!("视频提示词: {}", derived.video_prompt);
    Ok(SynthesisPrompts {
        video_prompt: derived.video_prompt,
        keyframe_edit_prompt,
    })
}
