use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::video_synthesizer::PollPolicy;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// 模型服务配置
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// API Key（视频下载时也作为查询参数附加）
    pub api_key: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub image_edit_model: String,
    pub image_model: String,
    pub video_model: String,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_edit_model: DEFAULT_IMAGE_EDIT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
        }
    }
}

impl GenAiConfig {
    /// 构建客户端时 API Key 必须存在
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("未配置 API Key（GEMINI_API_KEY 环境变量或配置文件 [genai] api_key）")
    }
}

/// 流水线配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 视频操作轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 最大轮询次数，None 表示一直等待
    pub max_polls: Option<u32>,
    /// Webhook URL（生成完成后回调）
    pub webhook_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_polls: None,
            webhook_url: None,
        }
    }
}

impl PipelineConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone)]
pub struct ExtendedConfig {
    pub genai: GenAiConfig,
    pub pipeline: PipelineConfig,
    /// 输出路径（可选，如果未设置则使用临时目录）
    pub output_path: Option<PathBuf>,
    /// 日志级别（trace, debug, info, warn, error）
    pub log_level: String,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            genai: GenAiConfig::default(),
            pipeline: PipelineConfig::default(),
            output_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// 单个配置来源读到的值（未设置的项为 None）
#[derive(Debug, Clone, Default)]
struct ConfigLayer {
    api_key: Option<String>,
    api_base: Option<String>,
    text_model: Option<String>,
    image_edit_model: Option<String>,
    image_model: Option<String>,
    video_model: Option<String>,
    poll_interval_secs: Option<u64>,
    max_polls: Option<u32>,
    webhook_url: Option<String>,
    output_path: Option<PathBuf>,
    log_level: Option<String>,
}

/// 命令行传入的覆盖项
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_polls: Option<u32>,
    pub output_path: Option<PathBuf>,
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从多个源加载配置，优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    pub fn load_config(config_file: Option<&Path>, cli: CliOverrides) -> Result<ExtendedConfig> {
        // 1. 显式指定的配置文件必须能读取，默认位置的配置文件可以不存在
        let file = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_from_default_locations().unwrap_or_default(),
        };

        // 2. 加载环境变量
        let env = Self::load_from_env();

        // 3. 合并配置
        let defaults = ExtendedConfig::default();
        let genai = GenAiConfig {
            api_key: cli.api_key.or(env.api_key).or(file.api_key),
            api_base: env
                .api_base
                .or(file.api_base)
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.genai.api_base),
            text_model: env.text_model.or(file.text_model).unwrap_or(defaults.genai.text_model),
            image_edit_model: env
                .image_edit_model
                .or(file.image_edit_model)
                .unwrap_or(defaults.genai.image_edit_model),
            image_model: env.image_model.or(file.image_model).unwrap_or(defaults.genai.image_model),
            video_model: env.video_model.or(file.video_model).unwrap_or(defaults.genai.video_model),
        };

        let mut poll_interval_secs = cli
            .poll_interval_secs
            .or(env.poll_interval_secs)
            .or(file.poll_interval_secs)
            .unwrap_or(defaults.pipeline.poll_interval_secs);
        if poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            tracing::warn!(
                "⚠️  [配置] 轮询间隔 {} 秒过小，使用 {} 秒",
                poll_interval_secs,
                MIN_POLL_INTERVAL_SECS
            );
            poll_interval_secs = MIN_POLL_INTERVAL_SECS;
        }

        let pipeline = PipelineConfig {
            poll_interval_secs,
            max_polls: cli.max_polls.or(env.max_polls).or(file.max_polls),
            webhook_url: env.webhook_url.or(file.webhook_url),
        };

        Ok(ExtendedConfig {
            genai,
            pipeline,
            output_path: cli.output_path.or(env.output_path).or(file.output_path),
            log_level: env.log_level.or(file.log_level).unwrap_or(defaults.log_level),
        })
    }

    /// 从环境变量加载配置
    fn load_from_env() -> ConfigLayer {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

        ConfigLayer {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            api_base: var("VIDEO_FORGE_API_BASE"),
            text_model: var("VIDEO_FORGE_TEXT_MODEL"),
            image_edit_model: var("VIDEO_FORGE_IMAGE_EDIT_MODEL"),
            image_model: var("VIDEO_FORGE_IMAGE_MODEL"),
            video_model: var("VIDEO_FORGE_VIDEO_MODEL"),
            poll_interval_secs: var("VIDEO_FORGE_POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()),
            max_polls: var("VIDEO_FORGE_MAX_POLLS").and_then(|v| v.parse().ok()),
            webhook_url: var("VIDEO_FORGE_WEBHOOK_URL"),
            output_path: var("OUTPUT_PATH").map(PathBuf::from),
            log_level: var("LOG_LEVEL"),
        }
    }

    /// 从INI配置文件加载配置
    fn load_from_file(config_path: &Path) -> Result<ConfigLayer> {
        if !config_path.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", config_path.display()));
        }

        let mut ini = configparser::ini::Ini::new();
        ini.load(config_path)
            .map_err(|e| anyhow::anyhow!("读取配置文件失败: {}: {}", config_path.display(), e))?;

        let get = |section: &str, key: &str| ini.get(section, key).filter(|v| !v.trim().is_empty());

        Ok(ConfigLayer {
            api_key: get("genai", "api_key"),
            api_base: get("genai", "api_base"),
            text_model: get("genai", "text_model"),
            image_edit_model: get("genai", "image_edit_model"),
            image_model: get("genai", "image_model"),
            video_model: get("genai", "video_model"),
            poll_interval_secs: get("pipeline", "poll_interval_secs").and_then(|v| v.parse().ok()),
            max_polls: get("pipeline", "max_polls").and_then(|v| v.parse().ok()),
            webhook_url: get("pipeline", "webhook_url"),
            output_path: get("pipeline", "output_path").map(PathBuf::from),
            log_level: get("logging", "level"),
        })
    }

    /// 从默认位置加载配置文件
    fn load_from_default_locations() -> Result<ConfigLayer> {
        let mut candidates = vec![
            PathBuf::from("video-forge.ini"),
            PathBuf::from(".video-forge.ini"),
        ];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".video-forge.ini"));
        }
        candidates.push(PathBuf::from("/etc/video-forge.ini"));

        for path in candidates {
            if path.exists() {
                tracing::debug!("使用配置文件: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        Err(anyhow::anyhow!("未找到配置文件"))
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let mut ini = configparser::ini::Ini::new();
        ini.set("genai", "api_key", Some(String::new()));
        ini.set("genai", "api_base", Some(DEFAULT_API_BASE.to_string()));
        ini.set("genai", "text_model", Some(DEFAULT_TEXT_MODEL.to_string()));
        ini.set("genai", "image_edit_model", Some(DEFAULT_IMAGE_EDIT_MODEL.to_string()));
        ini.set("genai", "image_model", Some(DEFAULT_IMAGE_MODEL.to_string()));
        ini.set("genai", "video_model", Some(DEFAULT_VIDEO_MODEL.to_string()));
        ini.set("pipeline", "poll_interval_secs", Some(DEFAULT_POLL_INTERVAL_SECS.to_string()));
        ini.set("pipeline", "max_polls", Some(String::new()));
        ini.set("pipeline", "webhook_url", Some(String::new()));
        ini.set("pipeline", "output_path", Some(String::new()));
        ini.set("logging", "level", Some("info".to_string()));

        ini.write(config_path)
            .map_err(|e| anyhow::anyhow!("写入配置文件失败: {}: {}", config_path.display(), e))?;

        Ok(())
    }
}
