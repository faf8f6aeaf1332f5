use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use video_forge::config::{CliOverrides, ConfigLoader, ExtendedConfig};
use video_forge::files::{self, ResultSummary};
use video_forge::handler::{self, AppState};
use video_forge::webhook::notify_completion;
use video_forge::{generate_scripts, progress_channel, run_pipeline, GeminiClient, ModelSuite};

/// 创意视频生成工具 - 从创意简报生成候选脚本，再为选定脚本生成短视频
#[derive(Parser, Debug)]
#[command(name = "video-forge")]
#[command(about = "创意视频生成工具：生成候选脚本、关键帧和最终视频", long_about = None)]
struct Args {
    /// 配置文件路径（可选，支持 .ini 格式）
    /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API Key，也可通过环境变量 GEMINI_API_KEY 设置
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 根据创意简报生成候选脚本
    Scripts {
        /// 简报文件路径（JSON）
        #[arg(short, long)]
        brief: PathBuf,

        /// 输出目录
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },
    /// 为选定的候选脚本生成视频
    Generate {
        /// 简报文件路径（JSON）
        #[arg(short, long)]
        brief: PathBuf,

        /// scripts 命令生成的 scripts.json
        #[arg(short, long)]
        scripts: PathBuf,

        /// 选用第几个脚本（从 1 开始）
        #[arg(long, default_value_t = 1)]
        pick: usize,

        /// 输出目录
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// 视频操作轮询间隔（秒）
        /// 可通过环境变量 VIDEO_FORGE_POLL_INTERVAL_SECS 或配置文件设置
        #[arg(long)]
        poll_interval: Option<u64>,

        /// 最大轮询次数，不设置则一直等待
        /// 可通过环境变量 VIDEO_FORGE_MAX_POLLS 或配置文件设置
        #[arg(long)]
        max_polls: Option<u32>,
    },
    /// Web 服务模式：启动 HTTP 服务器
    Serve {
        /// 监听地址（默认从环境变量 FC_SERVER_PORT 读取，如果不存在则使用 0.0.0.0:9000）
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// 生成默认配置文件
    InitConfig {
        /// 配置文件路径
        #[arg(short, long, default_value = "video-forge.ini")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (poll_interval_secs, max_polls) = match &args.command {
        Commands::Generate { poll_interval, max_polls, .. } => (*poll_interval, *max_polls),
        _ => (None, None),
    };
    let config = ConfigLoader::load_config(
        args.config.as_deref(),
        CliOverrides {
            api_key: args.api_key.clone(),
            poll_interval_secs,
            max_polls,
            output_path: None,
        },
    )
    .context("加载配置失败")?;

    // 初始化日志
    let level = config.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    match args.command {
        Commands::Scripts { brief, output } => {
            let models = build_models(&config)?;
            let brief = files::load_brief(&brief)?;

            let scripts = generate_scripts(models.text.as_ref(), &brief).await?;
            if scripts.is_empty() {
                println!("No scripts were generated. Try adjusting your inputs.");
                return Ok(());
            }

            for (i, script) in scripts.iter().enumerate() {
                println!("[{}] {}", i + 1, script.title);
                println!("    {}", script.logline);
            }
            let path = files::write_scripts(&scripts, &output)?;
            println!("候选脚本已保存: {}", path.display());
        }
        Commands::Generate { brief, scripts, pick, output, .. } => {
            let models = build_models(&config)?;
            let brief = files::load_brief(&brief)?;
            let candidates = files::load_scripts(&scripts)?;
            let script = pick
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .with_context(|| format!("没有第 {} 个脚本（共 {} 个）", pick, candidates.len()))?;

            println!(
                "使用配置: poll_interval={}s, max_polls={}",
                config.pipeline.poll_interval_secs,
                config
                    .pipeline
                    .max_polls
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "不限".to_string())
            );

            let (reporter, mut events) = progress_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    println!("» {}", event.message);
                }
            });

            let outcome = run_pipeline(&models, script, &brief, reporter, config.pipeline.poll_policy()).await;
            let _ = printer.await;
            let result = outcome?;

            let video_path = files::write_video(&result, &output)?;
            let keyframe_path = files::write_keyframe(&result, &output)?;
            let summary = ResultSummary {
                script_title: result.script.title.clone(),
                video_locator: result.video.locator.clone(),
                video_file: Some(video_path.to_string_lossy().to_string()),
                keyframe_file: Some(keyframe_path.to_string_lossy().to_string()),
                keyframe_media_type: result.keyframe.media_type.clone(),
            };
            let summary_path = files::write_summary(&summary, &output)?;

            notify_completion(config.pipeline.webhook_url.as_deref(), &result, Some(&video_path)).await;

            println!("视频已保存: {}", video_path.display());
            println!("结果摘要: {}", summary_path.display());
        }
        Commands::Serve { bind } => {
            // 优先使用命令行参数，其次使用环境变量 FC_SERVER_PORT，最后使用默认值 9000
            let bind_addr = bind.unwrap_or_else(|| {
                std::env::var("FC_SERVER_PORT")
                    .map(|port| format!("0.0.0.0:{}", port))
                    .unwrap_or_else(|_| "0.0.0.0:9000".to_string())
            });
            let models = build_models(&config)?;
            start_web_server(&bind_addr, AppState { config, models }).await?;
        }
        Commands::InitConfig { path } => {
            ConfigLoader::create_default_config(&path)?;
            println!("已生成配置文件: {}", path.display());
        }
    }

    Ok(())
}

fn build_models(config: &ExtendedConfig) -> Result<ModelSuite> {
    let client = GeminiClient::new(config.genai.clone()).context("创建模型客户端失败")?;
    Ok(ModelSuite::from_client(client))
}

async fn start_web_server(bind: &str, state: AppState) -> Result<()> {
    let app = handler::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("绑定地址失败: {}", bind))?;

    tracing::info!("Web 服务器启动在: http://{}", bind);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("可用端点:");
    tracing::info!("  • 健康检查: GET  http://{}/health", bind);
    tracing::info!("  • 生成脚本: POST http://{}/scripts", bind);
    tracing::info!("  • 生成视频: POST http://{}/generate", bind);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    axum::serve(listener, app)
        .await
        .context("启动服务器失败")?;

    Ok(())
}
