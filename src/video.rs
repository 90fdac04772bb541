//! Single-instance looping video overlay.
//!
//! Decoding and presenting video frames belongs to a [`StreamPlayer`]; this
//! module only decides when a stream is opened, restarted, stopped and
//! detached, and guarantees that at most one video surface exists at a time.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};
use url::Url;

use crate::error::{OverlayError, OverlayResult};
use crate::scene_graph::{Material, SceneGraph, Surface, SurfaceId};
use crate::transform::Placement;

/// Where a video stream comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamSource {
    /// A local file.
    File(PathBuf),
    /// A remote stream.
    Url(Url),
}

impl StreamSource {
    /// Parse a user-supplied source reference.
    ///
    /// Anything that starts with a scheme (`rtsp:`, `https://...`) must be a
    /// valid URL with a host; `file:` URLs become [`StreamSource::File`].
    /// Everything else, including `C:\...` drive paths, is taken as a path.
    pub fn parse(reference: &str) -> OverlayResult<Self> {
        let trimmed = reference.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
            return Err(OverlayError::InvalidSource(reference.to_string()));
        }

        if !trimmed.contains("://") && !has_scheme(trimmed) {
            return Ok(StreamSource::File(PathBuf::from(trimmed)));
        }

        let invalid = || OverlayError::InvalidSource(reference.to_string());
        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if url.scheme() == "file" {
            return url.to_file_path().map(StreamSource::File).map_err(|_| invalid());
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }
        Ok(StreamSource::Url(url))
    }
}

/// `scheme:` prefix of at least two characters. Single letters are drive
/// letters.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    scheme.len() >= 2
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::File(path) => write!(f, "{}", path.display()),
            StreamSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// A playing stream, as handed out by a [`StreamPlayer`].
pub trait Playback {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to_start(&mut self);
    /// Consume a pending end-of-stream signal, if one arrived since the last
    /// call.
    fn take_end_of_stream(&mut self) -> bool;
    fn is_playing(&self) -> bool;
}

/// Opens stream sources for playback.
pub trait StreamPlayer {
    fn open(&mut self, source: &StreamSource) -> OverlayResult<Box<dyn Playback>>;
}

struct ActiveVideo {
    surface: SurfaceId,
    source: StreamSource,
    playback: Box<dyn Playback>,
    looping: bool,
    end_of_stream_subscribed: bool,
    generation: u64,
    hiding: bool,
}

impl ActiveVideo {
    fn stop(&mut self) {
        self.playback.pause();
        self.end_of_stream_subscribed = false;
    }
}

/// Owns at most one looping video overlay.
///
/// Dropping the controller stops any active stream. Its surface is left to the
/// scene, which is usually being dropped alongside it.
#[derive(Default)]
pub struct VideoOverlayController {
    active: Option<ActiveVideo>,
    generation: u64,
}

impl VideoOverlayController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Surface of the active video, if any.
    pub fn surface(&self) -> Option<SurfaceId> {
        self.active.as_ref().map(|v| v.surface)
    }

    pub fn source(&self) -> Option<&StreamSource> {
        self.active.as_ref().map(|v| &v.source)
    }

    /// Whether a fade-out is running on the active video.
    pub fn is_hiding(&self) -> bool {
        self.active.as_ref().is_some_and(|v| v.hiding)
    }

    /// Replace whatever video is showing with `source`.
    ///
    /// The previous video is torn down before the new stream is opened. On
    /// success the new surface is inserted fully transparent and returned so
    /// the caller can fade it in. If the stream cannot be opened nothing is
    /// inserted.
    pub fn show<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        player: &mut dyn StreamPlayer,
        source: StreamSource,
        placement: Placement,
    ) -> OverlayResult<SurfaceId> {
        self.teardown(scene);

        let mut playback = player.open(&source)?;
        let surface = scene.insert(Surface::new(
            placement.size,
            placement.transform(),
            Material::Stream(source.clone()),
        ));
        playback.play();

        self.generation += 1;
        info!(%source, ?surface, "video overlay started");
        self.active = Some(ActiveVideo {
            surface,
            source,
            playback,
            looping: true,
            end_of_stream_subscribed: true,
            generation: self.generation,
            hiding: false,
        });
        Ok(surface)
    }

    /// Restart the stream if it signalled end-of-stream. Returns `true` when
    /// playback was looped on this call.
    pub fn poll(&mut self) -> bool {
        let Some(video) = self.active.as_mut() else {
            return false;
        };
        if !video.end_of_stream_subscribed || !video.playback.take_end_of_stream() {
            return false;
        }
        if !video.looping {
            return false;
        }

        video.playback.seek_to_start();
        video.playback.play();
        debug!(source = %video.source, "video looped");
        true
    }

    /// Mark the active video as fading out. Returns its surface and a token
    /// for [`finish_hide`](Self::finish_hide).
    pub fn begin_hide(&mut self) -> Option<(SurfaceId, u64)> {
        let video = self.active.as_mut()?;
        video.hiding = true;
        Some((video.surface, video.generation))
    }

    /// Complete a hide started with [`begin_hide`](Self::begin_hide).
    ///
    /// Does nothing if that video has since been replaced or torn down, so a
    /// late fade completion can never remove a newer video.
    pub fn finish_hide<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, generation: u64) -> bool {
        if self.active.as_ref().map(|v| v.generation) != Some(generation) {
            return false;
        }
        self.teardown(scene).is_some()
    }

    /// Stop playback, drop the end-of-stream subscription, and detach the
    /// stream and surface immediately. Returns the detached surface.
    pub fn teardown<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> Option<SurfaceId> {
        let mut video = self.active.take()?;

        video.stop();
        scene.set_material(video.surface, Material::Empty);
        scene.detach(video.surface);

        info!(source = %video.source, surface = ?video.surface, "video overlay removed");
        Some(video.surface)
    }
}

impl Drop for VideoOverlayController {
    fn drop(&mut self) {
        if let Some(video) = self.active.as_mut() {
            video.stop();
            debug!(source = %video.source, "video stopped on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::WorldScene;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        playing: bool,
        seeks: u32,
        eos: bool,
    }

    struct FakePlayback(Rc<RefCell<Log>>);

    impl Playback for FakePlayback {
        fn play(&mut self) {
            self.0.borrow_mut().playing = true;
        }
        fn pause(&mut self) {
            self.0.borrow_mut().playing = false;
        }
        fn seek_to_start(&mut self) {
            self.0.borrow_mut().seeks += 1;
        }
        fn take_end_of_stream(&mut self) -> bool {
            std::mem::take(&mut self.0.borrow_mut().eos)
        }
        fn is_playing(&self) -> bool {
            self.0.borrow().playing
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        opened: Vec<Rc<RefCell<Log>>>,
    }

    impl StreamPlayer for FakePlayer {
        fn open(&mut self, source: &StreamSource) -> OverlayResult<Box<dyn Playback>> {
            if source.to_string().contains("broken") {
                return Err(OverlayError::playback("cannot open"));
            }
            let log = Rc::new(RefCell::new(Log::default()));
            self.opened.push(log.clone());
            Ok(Box::new(FakePlayback(log)))
        }
    }

    fn source(s: &str) -> StreamSource {
        StreamSource::parse(s).unwrap()
    }

    #[test]
    fn parse_accepts_paths_and_urls() {
        assert_eq!(source("clip.mp4"), StreamSource::File("clip.mp4".into()));
        assert!(matches!(source("https://example.com/a.mp4"), StreamSource::Url(_)));
        assert_eq!(
            source("file:///tmp/clip.mp4"),
            StreamSource::File("/tmp/clip.mp4".into())
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        let garbage = [
            "", "   ", "http://", "bad\u{0}name", "ht tp://x", "http:", "https:", "rtsp:",
        ];
        for bad in garbage {
            assert!(
                matches!(StreamSource::parse(bad), Err(OverlayError::InvalidSource(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn drive_letter_paths_stay_files() {
        assert_eq!(
            source(r"C:\clips\a.mp4"),
            StreamSource::File(r"C:\clips\a.mp4".into())
        );
        assert!(matches!(source("rtsp://camera.local/live"), StreamSource::Url(_)));
    }

    #[test]
    fn dropping_the_controller_stops_playback() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();
        video
            .show(&mut scene, &mut player, source("a.mp4"), Placement::default())
            .unwrap();
        assert!(player.opened[0].borrow().playing);

        drop(video);
        assert!(!player.opened[0].borrow().playing);
    }

    #[test]
    fn second_show_tears_down_the_first() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();

        let first = video
            .show(&mut scene, &mut player, source("a.mp4"), Placement::default())
            .unwrap();
        let second = video
            .show(&mut scene, &mut player, source("b.mp4"), Placement::default())
            .unwrap();

        assert!(!scene.contains(first));
        assert!(scene.contains(second));
        assert_eq!(scene.surface_count(), 1);
        assert!(!player.opened[0].borrow().playing);
        assert!(player.opened[1].borrow().playing);
    }

    #[test]
    fn end_of_stream_restarts_from_the_beginning() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();
        video
            .show(&mut scene, &mut player, source("a.mp4"), Placement::default())
            .unwrap();

        assert!(!video.poll());
        player.opened[0].borrow_mut().eos = true;
        assert!(video.poll());
        assert_eq!(player.opened[0].borrow().seeks, 1);
        assert!(player.opened[0].borrow().playing);
        assert!(!video.poll());
    }

    #[test]
    fn teardown_stops_and_unsubscribes() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();
        let surface = video
            .show(&mut scene, &mut player, source("a.mp4"), Placement::default())
            .unwrap();

        assert_eq!(video.teardown(&mut scene), Some(surface));
        assert!(!scene.contains(surface));
        assert!(!player.opened[0].borrow().playing);

        player.opened[0].borrow_mut().eos = true;
        assert!(!video.poll());
        assert_eq!(player.opened[0].borrow().seeks, 0);
    }

    #[test]
    fn stale_hide_does_not_remove_newer_video() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();
        video
            .show(&mut scene, &mut player, source("a.mp4"), Placement::default())
            .unwrap();
        let (_, token) = video.begin_hide().unwrap();

        let newer = video
            .show(&mut scene, &mut player, source("b.mp4"), Placement::default())
            .unwrap();
        assert!(!video.finish_hide(&mut scene, token));
        assert!(scene.contains(newer));
        assert!(video.is_active());
    }

    #[test]
    fn failed_open_inserts_nothing() {
        let mut scene = WorldScene::new();
        let mut player = FakePlayer::default();
        let mut video = VideoOverlayController::new();
        let result = video.show(
            &mut scene,
            &mut player,
            source("broken.mp4"),
            Placement::new(Vec2::ONE),
        );
        assert!(matches!(result, Err(OverlayError::Playback(_))));
        assert_eq!(scene.surface_count(), 0);
        assert!(!video.is_active());
    }
}
