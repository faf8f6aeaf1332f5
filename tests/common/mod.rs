#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use video_forge::capability::{
    GeneratedImage, ImageModel, ImageRequest, InlineImage, LongRunningOperation, ModelSuite,
    ResponsePart, TextModel, TextRequest, VideoModel, VideoRequest,
};
use video_forge::{CreativeBrief, InspirationAsset, ScriptCandidate, StageError};

/// 按请求类型返回预设回复的文本模型
pub struct FakeText {
    pub scripts_reply: Result<String, String>,
    pub prompts_reply: String,
    pub image_prompt_reply: String,
    pub requests: Mutex<Vec<TextRequest>>,
}

impl Default for FakeText {
    fn default() -> Self {
        Self {
            scripts_reply: Ok(r#"{"scripts": []}"#.to_string()),
            prompts_reply: r#"{"videoPrompt": "slow dolly along the pier", "keyframeEditPrompt": "add drifting fog"}"#
                .to_string(),
            image_prompt_reply: "a lighthouse at dusk, wide shot".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextModel for FakeText {
    async fn generate_text(&self, request: TextRequest) -> Result<String, StageError> {
        let reply = match &request.schema {
            Some(schema) if schema["properties"].get("scripts").is_some() => self
                .scripts_reply
                .clone()
                .map_err(StageError::Transport),
            Some(_) => Ok(self.prompts_reply.clone()),
            None => Ok(self.image_prompt_reply.clone()),
        };
        self.requests.lock().unwrap().push(request);
        reply
    }
}

/// 图片模型：编辑返回预设片段，生成返回预设图片
pub struct FakeImage {
    pub edit_parts: Vec<ResponsePart>,
    pub generated: Vec<GeneratedImage>,
    pub edits: AtomicU32,
    pub generate_requests: Mutex<Vec<ImageRequest>>,
}

impl Default for FakeImage {
    fn default() -> Self {
        Self {
            edit_parts: vec![
                ResponsePart { text: Some("Here is the edited frame.".to_string()), inline_image: None },
                ResponsePart {
                    text: None,
                    inline_image: Some(InlineImage {
                        data: "ZWRpdGVkLWZyYW1l".to_string(),
                        media_type: "image/png".to_string(),
                    }),
                },
            ],
            generated: vec![GeneratedImage { data: "Z2VuZXJhdGVkLWZyYW1l".to_string() }],
            edits: AtomicU32::new(0),
            generate_requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageModel for FakeImage {
    async fn edit_image(&self, _base: &InlineImage, _prompt: &str) -> Result<Vec<ResponsePart>, StageError> {
        self.edits.fetch_add(1, Ordering::SeqCst);
        Ok(self.edit_parts.clone())
    }

    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>, StageError> {
        self.generate_requests.lock().unwrap().push(request);
        Ok(self.generated.clone())
    }
}

/// 视频模型：轮询若干次后完成
pub struct FakeVideo {
    pub ready_after: u32,
    /// 设置后下载返回该 HTTP 状态的失败
    pub download_failure: Option<u16>,
    pub polls: AtomicU32,
    pub submissions: Mutex<Vec<VideoRequest>>,
    pub downloads: AtomicU32,
}

impl FakeVideo {
    pub fn ready_after(polls: u32) -> Self {
        Self {
            ready_after: polls,
            download_failure: None,
            polls: AtomicU32::new(0),
            submissions: Mutex::new(Vec::new()),
            downloads: AtomicU32::new(0),
        }
    }

    fn finished() -> LongRunningOperation {
        LongRunningOperation {
            name: "operations/fake".to_string(),
            done: true,
            video_uris: vec!["https://example.com/files/video.mp4".to_string()],
            error: None,
        }
    }
}

#[async_trait]
impl VideoModel for FakeVideo {
    async fn submit_video(&self, request: VideoRequest) -> Result<LongRunningOperation, StageError> {
        self.submissions.lock().unwrap().push(request);
        Ok(LongRunningOperation::pending("operations/fake"))
    }

    async fn poll_operation(&self, operation: &LongRunningOperation) -> Result<LongRunningOperation, StageError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.ready_after {
            Ok(Self::finished())
        } else {
            Ok(LongRunningOperation::pending(operation.name.clone()))
        }
    }

    async fn download_video(&self, _locator: &str) -> Result<Vec<u8>, StageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match self.download_failure {
            Some(status) => Err(StageError::VideoDownloadFailed { status }),
            None => Ok(b"fake-mp4-bytes".to_vec()),
        }
    }
}

pub struct Fakes {
    pub text: Arc<FakeText>,
    pub image: Arc<FakeImage>,
    pub video: Arc<FakeVideo>,
}

impl Fakes {
    pub fn new(text: FakeText, image: FakeImage, video: FakeVideo) -> Self {
        Self { text: Arc::new(text), image: Arc::new(image), video: Arc::new(video) }
    }

    pub fn suite(&self) -> ModelSuite {
        ModelSuite {
            text: self.text.clone(),
            image: self.image.clone(),
            video: self.video.clone(),
        }
    }
}

pub fn script() -> ScriptCandidate {
    ScriptCandidate {
        title: "The Keeper's Song".to_string(),
        logline: "A lonely lighthouse keeper befriends a whale.".to_string(),
        full_script: "SCENE 1: Dusk. The keeper hums; a whale answers.".to_string(),
    }
}

pub fn sunset_image() -> InspirationAsset {
    InspirationAsset {
        data: "anBlZy1ieXRlcw==".to_string(),
        media_type: "image/jpeg".to_string(),
        name: "sunset.jpg".to_string(),
        description: "warm sunset tones".to_string(),
    }
}

pub fn brief(aspect_ratio: &str) -> CreativeBrief {
    CreativeBrief {
        idea: "A lighthouse keeper befriends a whale".to_string(),
        duration: "8".to_string(),
        mood: "Nostalgic".to_string(),
        aspect_ratio: aspect_ratio.to_string(),
        ..Default::default()
    }
}
