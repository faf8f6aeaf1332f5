use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::brief::{CreativeBrief, Keyframe, ScriptCandidate, SynthesisPrompts};
use crate::capability::ModelSuite;
use crate::error::{IllegalTransition, PipelineError, StageError};
use crate::keyframe::{edit_keyframe, synthesize_keyframe, KeyframeBranch};
use crate::prompt_deriver::derive_prompts;
use crate::video_synthesizer::{synthesize_video, PollPolicy};

pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    DerivingPrompts,
    SynthesizingKeyframe,
    SynthesizingVideo,
    Downloading,
    Complete,
    Failed,
}

/// 给定状态允许进入的下一个状态
pub fn allowed_transitions(from: PipelineState) -> Vec<PipelineState> {
    use PipelineState::*;
    match from {
        Idle => vec![DerivingPrompts, SynthesizingKeyframe, Failed],
        DerivingPrompts => vec![SynthesizingKeyframe, SynthesizingVideo, Failed],
        SynthesizingKeyframe => vec![DerivingPrompts, SynthesizingVideo, Failed],
        SynthesizingVideo => vec![Downloading, Failed],
        Downloading => vec![Complete, Failed],
        Complete => vec![],
        Failed => vec![],
    }
}

pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// 阶段进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub state: PipelineState,
    pub branch: KeyframeBranch,
    pub message: &'static str,
}

/// 进度事件的发送端；接收端被丢弃后发送会被静默忽略
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// 不关心进度时使用
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

/// 每次运行创建一对新的进度通道
pub fn progress_channel() -> (ProgressReporter, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ProgressReporter { sender: Some(sender) }, receiver)
}

/// 一次运行的状态：分支在进入时确定，之后不再重新推导
#[derive(Debug)]
pub struct PipelineRun {
    branch: KeyframeBranch,
    state: PipelineState,
    reporter: ProgressReporter,
}

impl PipelineRun {
    pub fn new(branch: KeyframeBranch, reporter: ProgressReporter) -> Self {
        Self { branch, state: PipelineState::Idle, reporter }
    }

    pub fn branch(&self) -> KeyframeBranch {
        self.branch
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 进入下一个状态并通知调用方
    fn advance(&mut self, next: PipelineState, message: &'static str) {
        if let Err(e) = validate_transition(self.state, next) {
            // 状态顺序由 run_stages 固定，出现非法转换说明代码有误
            warn!("⚠️  [流水线] {}", e);
        }
        self.state = next;
        info!("🎬 [流水线] {}", message);
        self.reporter.emit(ProgressEvent { state: next, branch: self.branch, message });
    }
}

/// 下载得到的视频
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    /// 远端下载地址（不含凭证）
    pub locator: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// 流水线的最终产物，所有权交给调用方
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub video: GeneratedVideo,
    pub keyframe: Keyframe,
    /// 可直接渲染的关键帧 data URL
    pub keyframe_data_url: String,
    pub script: ScriptCandidate,
}

async fn run_stages(
    run: &mut PipelineRun,
    models: &ModelSuite,
    script: &ScriptCandidate,
    brief: &CreativeBrief,
    poll_policy: PollPolicy,
) -> Result<PipelineResult, StageError> {
    let (prompts, keyframe): (SynthesisPrompts, Keyframe) = match run.branch() {
        KeyframeBranch::EditInspiration => {
            run.advance(PipelineState::DerivingPrompts, "Developing creative prompts...");
            let prompts = derive_prompts(models.text.as_ref(), script, true).await?;
            let edit_prompt = prompts
                .keyframe_edit_prompt
                .as_deref()
                .ok_or(StageError::MissingEditPrompt)?;

            run.advance(PipelineState::SynthesizingKeyframe, "Editing inspiration image...");
            // 多张图片时只使用第一张
            let inspiration = brief
                .inspiration_images
                .first()
                .ok_or(StageError::KeyframeEditFailed)?;
            let keyframe = edit_keyframe(models.image.as_ref(), inspiration, edit_prompt).await?;
            (prompts, keyframe)
        }
        KeyframeBranch::SynthesizeFromScript => {
            run.advance(PipelineState::SynthesizingKeyframe, "Generating keyframe from script...");
            let keyframe = synthesize_keyframe(
                models.text.as_ref(),
                models.image.as_ref(),
                script,
                &brief.aspect_ratio,
            )
            .await?;

            run.advance(PipelineState::DerivingPrompts, "Developing video prompt...");
            let prompts = derive_prompts(models.text.as_ref(), script, false).await?;
            (prompts, keyframe)
        }
    };

    run.advance(
        PipelineState::SynthesizingVideo,
        "Generating video (this may take a few minutes)...",
    );
    let locator =
        synthesize_video(models.video.as_ref(), &prompts.video_prompt, &keyframe, poll_policy).await?;

    run.advance(PipelineState::Downloading, "Downloading video...");
    let bytes = models.video.download_video(&locator).await?;

    let keyframe_data_url = keyframe.data_url();
    Ok(PipelineResult {
        video: GeneratedVideo {
            locator,
            bytes,
            media_type: VIDEO_MEDIA_TYPE.to_string(),
        },
        keyframe,
        keyframe_data_url,
        script: script.clone(),
    })
}

/// 为选定的脚本生成最终视频
///
/// 任何阶段失败都只记录具体原因，对外统一返回 [`PipelineError`]，
/// 不返回任何中间产物。
pub async fn run_pipeline(
    models: &ModelSuite,
    script: &ScriptCandidate,
    brief: &CreativeBrief,
    progress: ProgressReporter,
    poll_policy: PollPolicy,
) -> Result<PipelineResult, PipelineError> {
    let start = Instant::now();
    let branch = KeyframeBranch::for_brief(brief);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🎬 [流水线] 开始生成视频: 「{}」 (分支: {:?})", script.title, branch);

    let mut run = PipelineRun::new(branch, progress);
    match run_stages(&mut run, models, script, brief, poll_policy).await {
        Ok(result) => {
            run.advance(PipelineState::Complete, "Video ready.");
            info!(
                "🎉 [流水线] 完成！总耗时: {:.2}秒，视频大小: {} 字节",
                start.elapsed().as_secs_f64(),
                result.video.bytes.len()
            );
            info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            Ok(result)
        }
        Err(cause) => {
            error!(
                "❌ [流水线] 在 {:?} 阶段失败 ({:?}): {}",
                run.state(),
                cause.kind(),
                cause
            );
            run.advance(PipelineState::Failed, "Video generation failed.");
            Err(PipelineError)
        }
    }
}
