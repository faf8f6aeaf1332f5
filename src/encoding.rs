use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;

use crate::brief::InspirationAsset;

/// 将原始字节编码为 base64 字符串
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// 解码 base64 字符串
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.trim().as_bytes())
        .context("base64 解码失败")
}

/// 构建可以直接渲染的 data URL
pub fn data_url(media_type: &str, data: &str) -> String {
    format!("data:{};base64,{}", media_type, data)
}

/// 根据文件扩展名猜测媒体类型
pub fn guess_media_type(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// 媒体类型对应的文件扩展名（用于保存关键帧）
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

/// 读取本地文件并编码为灵感素材
pub fn load_asset(path: impl AsRef<Path>, description: impl Into<String>) -> Result<InspirationAsset> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("读取素材文件失败: {}", path.display()))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("asset")
        .to_string();

    tracing::debug!("已加载素材: {} ({} 字节)", path.display(), bytes.len());

    Ok(InspirationAsset {
        data: encode_base64(&bytes),
        media_type: guess_media_type(path).to_string(),
        name,
        description: description.into(),
    })
}
