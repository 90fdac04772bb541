//! Asset acquisition: fetching bytes and decoding them into frame sequences.
//!
//! Both steps run off the render thread. [`AssetLoader`] spawns a worker that
//! fetches and decodes, and only on complete success hands the finished
//! [`DecodedSequence`] to the engine through an [`OverlayHandle`]. A failed
//! load is logged and leaves no trace in the scene.
//!
//! # Example
//!
//! ```no_run
//! use overlayer::*;
//!
//! let mut engine = OverlayEngine::new(WorldScene::new(), OverlayConfig::default());
//! let loader = AssetLoader::new(FileFetcher::new(), ImageDecoder::default());
//!
//! loader.load_sequence("assets/wave.gif", Placement::default(), &engine.handle());
//!
//! // Later, on the render thread:
//! engine.tick(1.0 / 60.0);
//! ```

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};
use tracing::{debug, warn};

use crate::engine::OverlayHandle;
use crate::error::{DecodeError, OverlayError, OverlayResult};
use crate::scene_graph::FrameImage;
use crate::transform::Placement;

/// Decoded frames with their display durations, in seconds.
#[derive(Clone, Debug, Default)]
pub struct DecodedSequence {
    pub frames: Vec<FrameImage>,
    pub durations: Vec<f32>,
}

impl DecodedSequence {
    pub fn new(frames: Vec<FrameImage>, durations: Vec<f32>) -> Self {
        Self { frames, durations }
    }

    /// A one-frame sequence for a still image.
    pub fn still(image: FrameImage, duration: f32) -> Self {
        Self::new(vec![image], vec![duration])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Reject sequences that must never be animated.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.frames.is_empty() {
            return Err(DecodeError::Empty);
        }
        if self.frames.len() != self.durations.len() {
            return Err(DecodeError::LengthMismatch {
                frames: self.frames.len(),
                durations: self.durations.len(),
            });
        }
        Ok(())
    }
}

/// Turns raw bytes into a frame sequence.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSequence, DecodeError>;
}

/// [`Decoder`] built on the `image` crate.
///
/// Animated GIFs decode frame by frame with their own delays; any other
/// supported format decodes as a single still frame.
#[derive(Clone, Debug)]
pub struct ImageDecoder {
    /// Used when a frame carries no usable delay, in seconds.
    pub default_frame_duration: f32,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self {
            default_frame_duration: 0.1,
        }
    }
}

impl ImageDecoder {
    pub fn new(default_frame_duration: f32) -> Self {
        Self {
            default_frame_duration,
        }
    }

    fn decode_gif(&self, bytes: &[u8]) -> Result<DecodedSequence, DecodeError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder.into_frames().collect_frames()?;

        let mut sequence = DecodedSequence::default();
        for frame in frames {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let seconds = if denom == 0 {
                0.0
            } else {
                numer as f32 / denom as f32 / 1000.0
            };
            sequence.durations.push(if seconds > 0.0 {
                seconds
            } else {
                self.default_frame_duration
            });
            sequence.frames.push(Arc::new(frame.into_buffer()));
        }
        Ok(sequence)
    }
}

impl Decoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSequence, DecodeError> {
        let format = image::guess_format(bytes)?;
        let sequence = match format {
            ImageFormat::Gif => self.decode_gif(bytes)?,
            _ => {
                let image = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
                DecodedSequence::still(Arc::new(image), self.default_frame_duration)
            }
        };
        sequence.validate()?;
        Ok(sequence)
    }
}

/// Fetches raw asset bytes. Called from worker threads and allowed to block.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, location: &str) -> OverlayResult<Vec<u8>>;
}

/// Reads assets from the local filesystem, optionally relative to a root.
#[derive(Clone, Debug, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(&self, location: &str) -> OverlayResult<Vec<u8>> {
        let path = match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        };
        std::fs::read(&path).map_err(|e| OverlayError::fetch(location, e))
    }
}

/// Fetches assets over HTTP(S) with a blocking client.
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "http")]
impl AssetFetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> OverlayResult<Vec<u8>> {
        let response = self
            .client
            .get(location)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| OverlayError::fetch(location, e))?;
        let bytes = response
            .bytes()
            .map_err(|e| OverlayError::fetch(location, e))?;
        Ok(bytes.to_vec())
    }
}

/// Runs fetch and decode on worker threads.
#[derive(Clone)]
pub struct AssetLoader {
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn Decoder>,
}

impl AssetLoader {
    pub fn new(fetcher: impl AssetFetcher + 'static, decoder: impl Decoder + 'static) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            decoder: Arc::new(decoder),
        }
    }

    /// Fetch and decode on the calling thread.
    pub fn load(&self, location: &str) -> OverlayResult<DecodedSequence> {
        let bytes = self.fetcher.fetch(location)?;
        let sequence = self.decoder.decode(&bytes)?;
        Ok(sequence)
    }

    /// Load `location` on a worker thread and queue it for display.
    ///
    /// The returned handle only matters to callers that want to wait for the
    /// worker; the overlay appears on the render tick after it finishes.
    pub fn load_sequence(
        &self,
        location: impl Into<String>,
        placement: Placement,
        handle: &OverlayHandle,
    ) -> JoinHandle<()> {
        let location = location.into();
        let loader = self.clone();
        let handle = handle.clone();

        std::thread::spawn(move || match loader.load(&location) {
            Ok(sequence) => {
                debug!(%location, frames = sequence.len(), "asset decoded");
                if !handle.show_sequence(sequence, placement) {
                    debug!(%location, "engine gone before asset arrived");
                }
            }
            Err(e) => warn!(%location, error = %e, "asset load failed"),
        })
    }
}
