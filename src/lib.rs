pub mod brief;
pub mod capability;
pub mod config;
pub mod encoding;
pub mod error;
pub mod files;
pub mod genai_client;
pub mod genai_types;
pub mod handler;
pub mod keyframe;
pub mod pipeline;
pub mod prompt_deriver;
pub mod script_generator;
pub mod video_synthesizer;
pub mod webhook;

pub use brief::{AspectRatio, CreativeBrief, InspirationAsset, Keyframe, ScriptCandidate, SynthesisPrompts};
pub use capability::{ImageModel, ModelSuite, TextModel, VideoModel};
pub use config::{ConfigLoader, ExtendedConfig};
pub use error::{ErrorKind, PipelineError, ScriptGenerationError, StageError};
pub use genai_client::GeminiClient;
pub use keyframe::KeyframeBranch;
pub use pipeline::{progress_channel, run_pipeline, PipelineResult, PipelineState, ProgressEvent, ProgressReporter};
pub use script_generator::generate_scripts;
pub use video_synthesizer::PollPolicy;
