use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::brief::{CreativeBrief, ScriptCandidate};
use crate::encoding::{decode_base64, extension_for, load_asset};
use crate::pipeline::PipelineResult;

/// 简报文件中引用的本地素材
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRef {
    pub path: PathBuf,
    #[serde(default)]
    pub description: String,
}

/// 本地简报文件（JSON），素材以路径形式给出
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BriefManifest {
    pub idea: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub images: Vec<AssetRef>,
    #[serde(default)]
    pub videos: Vec<AssetRef>,
    #[serde(default)]
    pub audio: Option<AssetRef>,
}

impl BriefManifest {
    /// 读取素材文件并转换为创意简报；相对路径以简报文件所在目录为基准
    pub fn into_brief(self, base_dir: &Path) -> Result<CreativeBrief> {
        let load = |asset: &AssetRef| {
            let path = if asset.path.is_absolute() {
                asset.path.clone()
            } else {
                base_dir.join(&asset.path)
            };
            load_asset(&path, asset.description.clone())
        };

        Ok(CreativeBrief {
            idea: self.idea,
            inspiration_images: self.images.iter().map(load).collect::<Result<_>>()?,
            inspiration_videos: self.videos.iter().map(load).collect::<Result<_>>()?,
            inspiration_audio: self.audio.as_ref().map(load).transpose()?,
            duration: self.duration,
            mood: self.mood,
            aspect_ratio: self.aspect_ratio,
            audience: self.audience,
        })
    }
}

/// 读取简报文件
pub fn load_brief(path: impl AsRef<Path>) -> Result<CreativeBrief> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取简报文件失败: {}", path.display()))?;
    let manifest: BriefManifest = serde_json::from_str(&content)
        .with_context(|| format!("解析简报文件失败: {}", path.display()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.into_brief(base_dir)
}

/// 读取 scripts 命令保存的候选脚本
pub fn load_scripts(path: impl AsRef<Path>) -> Result<Vec<ScriptCandidate>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取脚本文件失败: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("解析脚本文件失败: {}", path.display()))
}

/// 保存候选脚本
pub fn write_scripts(scripts: &[ScriptCandidate], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).context("创建输出目录失败")?;
    let path = output_dir.join("scripts.json");
    let json = serde_json::to_string_pretty(scripts).context("序列化脚本失败")?;
    std::fs::write(&path, json).context("写入脚本文件失败")?;
    Ok(path)
}

/// 本次请求的工作目录：`<base>/video-forge/<时间戳>_<uuid>`
///
/// 每次调用都生成新的目录名，并发请求之间互不覆盖。
pub fn request_dir(base: Option<&Path>) -> PathBuf {
    let request_id = format!("{}_{}", chrono::Utc::now().timestamp(), uuid::Uuid::new_v4());
    base.map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir)
        .join("video-forge")
        .join(request_id)
}

/// 写入视频文件
pub fn write_video(result: &PipelineResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).context("创建输出目录失败")?;
    let path = output_dir.join("video.mp4");
    std::fs::write(&path, &result.video.bytes).context("写入视频文件失败")?;
    info!("✅ [输出] 视频已保存: {}", path.display());
    Ok(path)
}

/// 写入关键帧图片，扩展名由媒体类型决定
pub fn write_keyframe(result: &PipelineResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).context("创建输出目录失败")?;
    let bytes = decode_base64(&result.keyframe.data)?;
    let path = output_dir.join(format!("keyframe.{}", extension_for(&result.keyframe.media_type)));
    std::fs::write(&path, bytes).context("写入关键帧失败")?;
    Ok(path)
}

/// 生成结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub script_title: String,
    pub video_locator: String,
    pub video_file: Option<String>,
    pub keyframe_file: Option<String>,
    pub keyframe_media_type: String,
}

/// 写入 result.json
pub fn write_summary(summary: &ResultSummary, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join("result.json");
    let json = serde_json::to_string_pretty(summary).context("序列化结果失败")?;
    std::fs::write(&path, json).context("写入结果文件失败")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::Keyframe;
    use crate::pipeline::GeneratedVideo;

    #[test]
    fn brief_manifest_loads_relative_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sunset.jpg"), b"jpeg-bytes").unwrap();
        std::fs::write(dir.path().join("theme.mp3"), b"mp3-bytes").unwrap();
        let brief_path = dir.path().join("brief.json");
        std::fs::write(
            &brief_path,
            r#"{
                "idea": "A lighthouse keeper befriends a whale",
                "mood": "Nostalgic",
                "aspect_ratio": "9:16",
                "images": [{"path": "sunset.jpg", "description": "warm sunset tones"}],
                "audio": {"path": "theme.mp3"}
            }"#,
        )
        .unwrap();

        let brief = load_brief(&brief_path).unwrap();
        assert_eq!(brief.idea, "A lighthouse keeper befriends a whale");
        assert_eq!(brief.aspect_ratio, "9:16");
        assert_eq!(brief.inspiration_images.len(), 1);
        assert_eq!(brief.inspiration_images[0].media_type, "image/jpeg");
        assert_eq!(brief.inspiration_images[0].description, "warm sunset tones");
        assert_eq!(brief.inspiration_audio.as_ref().unwrap().name, "theme.mp3");
        assert!(brief.inspiration_videos.is_empty());
    }

    #[test]
    fn missing_asset_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let brief_path = dir.path().join("brief.json");
        std::fs::write(&brief_path, r#"{"idea": "x", "images": [{"path": "nope.png"}]}"#).unwrap();
        assert!(load_brief(&brief_path).is_err());
    }

    #[test]
    fn scripts_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = vec![ScriptCandidate {
            title: "Harbor Light".to_string(),
            logline: "A keeper and a whale.".to_string(),
            full_script: "SCENE 1".to_string(),
        }];
        let path = write_scripts(&scripts, dir.path()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("fullScript"));
        assert_eq!(load_scripts(&path).unwrap(), scripts);
    }

    #[test]
    fn request_dir_is_under_base() {
        let base = Path::new("/data/out");
        let dir = request_dir(Some(base));
        assert!(dir.starts_with("/data/out/video-forge"));
    }

    #[test]
    fn each_request_gets_its_own_dir() {
        // 进程级环境变量不参与目录命名
        std::env::set_var("FC_REQUEST_ID", "fixed-at-process-start");
        let base = Path::new("/data/out");
        assert_ne!(request_dir(Some(base)), request_dir(Some(base)));
        assert_ne!(request_dir(None), request_dir(None));
    }

    #[test]
    fn writes_video_and_keyframe() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineResult {
            video: GeneratedVideo {
                locator: "https://example.com/v.mp4".to_string(),
                bytes: b"mp4".to_vec(),
                media_type: "video/mp4".to_string(),
            },
            keyframe: Keyframe { data: "aGVsbG8=".to_string(), media_type: "image/jpeg".to_string() },
            keyframe_data_url: String::new(),
            script: ScriptCandidate {
                title: "t".to_string(),
                logline: "l".to_string(),
                full_script: "s".to_string(),
            },
        };

        let video = write_video(&result, dir.path()).unwrap();
        assert_eq!(std::fs::read(video).unwrap(), b"mp4");
        let keyframe = write_keyframe(&result, dir.path()).unwrap();
        assert_eq!(keyframe.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(keyframe).unwrap(), b"hello");
    }
}
