use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 用户上传的灵感素材（图片、视频或音频）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InspirationAsset {
    /// base64 编码后的文件内容
    pub data: String,
    /// 媒体类型，例如 image/jpeg
    pub media_type: String,
    /// 原始文件名
    pub name: String,
    /// 用户对素材的描述（可以为空）
    #[serde(default)]
    pub description: String,
}

/// 创意简报：一次生成所需的全部输入
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreativeBrief {
    /// 核心创意
    pub idea: String,
    /// 灵感图片，第一张会在编辑路径中作为关键帧底图
    #[serde(default)]
    pub inspiration_images: Vec<InspirationAsset>,
    /// 灵感视频（只以文字描述的形式参与生成）
    #[serde(default)]
    pub inspiration_videos: Vec<InspirationAsset>,
    /// 灵感音频（只提及文件名）
    #[serde(default)]
    pub inspiration_audio: Option<InspirationAsset>,
    /// 目标时长（秒）
    #[serde(default)]
    pub duration: String,
    /// 风格/情绪
    #[serde(default)]
    pub mood: String,
    /// 画面比例，非法值在生成关键帧时回退为 16:9
    #[serde(default)]
    pub aspect_ratio: String,
    /// 目标受众
    #[serde(default)]
    pub audience: String,
}

/// 候选脚本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptCandidate {
    /// 标题
    pub title: String,
    /// 一两句话的梗概
    pub logline: String,
    /// 分镜完整脚本
    #[serde(rename = "fullScript")]
    pub full_script: String,
}

/// 由脚本派生出的生成提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPrompts {
    pub video_prompt: String,
    /// 只有在编辑灵感图片时才存在
    pub keyframe_edit_prompt: Option<String>,
}

/// 关键帧：视频生成的起始画面
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Keyframe {
    /// base64 编码的图片
    pub data: String,
    pub media_type: String,
}

impl Keyframe {
    /// 可直接渲染的 data URL
    pub fn data_url(&self) -> String {
        crate::encoding::data_url(&self.media_type, &self.data)
    }
}

/// 图片生成支持的画面比例
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }

    /// 不在允许列表中的比例一律回退为 16:9，不报错
    pub fn coerce(value: &str) -> Self {
        value.parse().unwrap_or(AspectRatio::Landscape16x9)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Landscape16x9
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| format!("unsupported aspect ratio: {}", s))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_listed_ratios_parse() {
        for ratio in AspectRatio::ALL {
            assert_eq!(AspectRatio::coerce(ratio.as_str()), ratio);
        }
        assert_eq!(AspectRatio::coerce(" 9:16 "), AspectRatio::Portrait9x16);
    }

    #[test]
    fn unknown_ratio_falls_back_to_landscape() {
        assert_eq!(AspectRatio::coerce("7:3"), AspectRatio::Landscape16x9);
        assert_eq!(AspectRatio::coerce(""), AspectRatio::Landscape16x9);
        assert_eq!(AspectRatio::coerce("portrait"), AspectRatio::Landscape16x9);
    }

    #[test]
    fn script_candidate_uses_camel_case_script_field() {
        let json = r#"{"title":"T","logline":"L","fullScript":"S"}"#;
        let script: ScriptCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(script.full_script, "S");
    }

    #[test]
    fn brief_optional_fields_default() {
        let brief: CreativeBrief = serde_json::from_str(r#"{"idea":"a lighthouse"}"#).unwrap();
        assert!(brief.inspiration_images.is_empty());
        assert!(brief.inspiration_audio.is_none());
        assert_eq!(brief.aspect_ratio, "");
    }
}
