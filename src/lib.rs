//! # Overlayer
//!
//! **Overlay lifecycle and frame scheduling for immersive scenes.**
//!
//! Images, animated GIFs, a looping video and a speech caption fade in and out
//! of a 3D scene, while the render camera is offset per eye for stereo output.
//! Everything runs on the render thread; other threads talk to it through a
//! cloneable handle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use overlayer::*;
//!
//! let mut engine = OverlayEngine::new(WorldScene::new(), OverlayConfig::default());
//! let loader = AssetLoader::new(FileFetcher::new(), ImageDecoder::default());
//!
//! // From any thread:
//! loader.load_sequence("wave.gif", Placement::new(Vec2::new(0.4, 0.4)), &engine.handle());
//! engine.handle().show_caption("Hello!", Vec3::new(0.0, -0.3, -1.0));
//!
//! // Every frame, on the render thread:
//! loop {
//!     engine.frame(1.0 / 90.0, Eye::Left);
//!     // ... render the left eye ...
//!     engine.adjust_view(Eye::Right);
//!     // ... render the right eye ...
//! }
//! ```
//!
//! ## Philosophy
//!
//! - **One owner**: The engine owns all overlay state. Worker threads only fetch and decode.
//! - **Fade before removal**: Nothing leaves the scene until its fade-out has finished.
//! - **Bring your own renderer**: Implement [`SceneGraph`] for your engine, or draw straight from [`WorldScene`].

mod assets;
mod camera;
mod caption;
mod config;
mod ecs;
mod engine;
mod error;
mod fade;
mod frame_clock;
mod registry;
mod scene_graph;
mod scheduler;
mod stereo;
mod transform;
mod video;

pub use assets::{AssetFetcher, AssetLoader, DecodedSequence, Decoder, FileFetcher, ImageDecoder};
#[cfg(feature = "http")]
pub use assets::HttpFetcher;
pub use camera::Camera;
pub use caption::{CaptionAction, CaptionOverlay, CaptionRequest};
pub use config::OverlayConfig;
pub use ecs::{Opacity, Quad, WorldScene};
pub use engine::{Command, Completion, OverlayEngine, OverlayHandle, OverlayId, OverlayState};
pub use error::{DecodeError, OverlayError, OverlayResult};
pub use fade::{Easing, FadeController, FadeDirection, FadeEvent, FadeTransition};
pub use frame_clock::FrameAnimationClock;
pub use registry::{OverlayRegistry, RemoveAll};
pub use scene_graph::{FrameImage, Material, SceneGraph, Surface, SurfaceId};
pub use scheduler::{FrameScheduler, TickHandle};
pub use stereo::{Eye, StereoViewAdjuster};
pub use transform::{Placement, Transform};
pub use video::{Playback, StreamPlayer, StreamSource, VideoOverlayController};

// Re-export commonly used types from dependencies
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
