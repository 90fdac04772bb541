//! The render-thread owner of every overlay.
//!
//! [`OverlayEngine`] ties the fade controller, frame clocks, registry, video
//! controller, caption and stereo adjuster to one [`SceneGraph`]. The render
//! loop calls [`tick`](OverlayEngine::tick) once per frame and
//! [`adjust_view`](OverlayEngine::adjust_view) after its own camera update.
//! Other threads never touch engine state: they send [`Command`]s through an
//! [`OverlayHandle`], which are applied at the start of the next tick.
//!
//! # Example
//!
//! ```
//! use overlayer::*;
//! use std::sync::Arc;
//!
//! let mut engine = OverlayEngine::new(WorldScene::new(), OverlayConfig::default());
//! let image = Arc::new(image::RgbaImage::new(8, 8));
//! let id = engine.show_image(image, Placement::new(Vec2::new(0.5, 0.5)));
//!
//! for _ in 0..30 {
//!     engine.frame(1.0 / 60.0, Eye::Left);
//! }
//! assert_eq!(engine.overlay_state(id), Some(OverlayState::Visible));
//!
//! engine.remove_all(|engine| assert_eq!(engine.overlay_count(), 0));
//! for _ in 0..30 {
//!     engine.frame(1.0 / 60.0, Eye::Left);
//! }
//! assert_eq!(engine.overlay_state(id), Some(OverlayState::Removed));
//! ```

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::assets::DecodedSequence;
use crate::caption::{CaptionAction, CaptionOverlay, CaptionRequest};
use crate::config::OverlayConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::fade::{FadeController, FadeEvent};
use crate::frame_clock::FrameAnimationClock;
use crate::registry::{OverlayRegistry, RemoveAll};
use crate::scene_graph::{FrameImage, Material, SceneGraph, Surface, SurfaceId};
use crate::scheduler::{FrameScheduler, TickHandle};
use crate::stereo::{Eye, StereoViewAdjuster};
use crate::transform::{Placement, Transform};
use crate::video::{StreamPlayer, StreamSource, VideoOverlayController};

/// Identifies an image or animated-sequence overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(u64);

impl OverlayId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Lifecycle of an image or sequence overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayState {
    FadingIn,
    Visible,
    FadingOut,
    Removed,
}

/// A one-shot callback run on the render thread with full engine access.
pub type Completion<S> = Box<dyn FnOnce(&mut OverlayEngine<S>)>;

/// Work handed to the render thread from elsewhere.
#[derive(Debug)]
pub enum Command {
    ShowImage {
        image: FrameImage,
        placement: Placement,
    },
    ShowSequence {
        sequence: DecodedSequence,
        placement: Placement,
    },
    ShowVideo {
        source: String,
        placement: Placement,
    },
    HideVideo {
        done: Option<Sender<()>>,
    },
    RemoveAll {
        done: Option<Sender<()>>,
    },
    ShowCaption {
        text: String,
        position: Vec3,
    },
}

/// Cloneable, `Send` entry point for requests from other threads.
///
/// Every method returns immediately. Methods returning `bool` report whether
/// the engine was still alive to receive the request.
#[derive(Clone, Debug)]
pub struct OverlayHandle {
    tx: Sender<Command>,
}

impl OverlayHandle {
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn show_image(&self, image: FrameImage, placement: Placement) -> bool {
        self.send(Command::ShowImage { image, placement })
    }

    pub fn show_sequence(&self, sequence: DecodedSequence, placement: Placement) -> bool {
        self.send(Command::ShowSequence {
            sequence,
            placement,
        })
    }

    pub fn show_video(&self, source: impl Into<String>, placement: Placement) -> bool {
        self.send(Command::ShowVideo {
            source: source.into(),
            placement,
        })
    }

    pub fn show_caption(&self, text: impl Into<String>, position: Vec3) -> bool {
        self.send(Command::ShowCaption {
            text: text.into(),
            position,
        })
    }

    /// Fade out the video. The receiver is signalled once it is gone.
    pub fn hide_video(&self) -> Receiver<()> {
        let (done, rx) = mpsc::channel();
        self.send(Command::HideVideo { done: Some(done) });
        rx
    }

    /// Fade out every tracked overlay. The receiver is signalled once all of
    /// them are gone.
    pub fn remove_all(&self) -> Receiver<()> {
        let (done, rx) = mpsc::channel();
        self.send(Command::RemoveAll { done: Some(done) });
        rx
    }
}

/// Frame state of an animated overlay, advanced only while subscribed.
struct AnimatedSequence {
    clock: FrameAnimationClock<FrameImage>,
    subscription: Option<TickHandle>,
}

enum OverlayKind {
    StaticImage,
    Animated(AnimatedSequence),
}

struct OverlayEntry {
    surface: SurfaceId,
    kind: OverlayKind,
    state: OverlayState,
}

/// Owns all overlay state on the render thread.
pub struct OverlayEngine<S: SceneGraph + 'static> {
    scene: S,
    config: OverlayConfig,
    fades: FadeController<Completion<S>>,
    scheduler: FrameScheduler,
    overlays: BTreeMap<OverlayId, OverlayEntry>,
    registry: OverlayRegistry<Completion<S>>,
    video: VideoOverlayController,
    player: Option<Box<dyn StreamPlayer>>,
    caption: CaptionOverlay,
    stereo: StereoViewAdjuster,
    next_id: u64,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
}

impl<S: SceneGraph + 'static> OverlayEngine<S> {
    pub fn new(scene: S, config: OverlayConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel();
        Self {
            scene,
            fades: FadeController::new(config.fade_duration, config.fade_easing),
            config,
            scheduler: FrameScheduler::new(),
            overlays: BTreeMap::new(),
            registry: OverlayRegistry::new(),
            video: VideoOverlayController::new(),
            player: None,
            caption: CaptionOverlay::new(),
            stereo: StereoViewAdjuster::new(),
            next_id: 0,
            commands_tx,
            commands_rx,
        }
    }

    /// Attach the stream player used for video overlays.
    pub fn with_player(mut self, player: impl StreamPlayer + 'static) -> Self {
        self.player = Some(Box::new(player));
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// A sender for requests from other threads.
    pub fn handle(&self) -> OverlayHandle {
        OverlayHandle {
            tx: self.commands_tx.clone(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Lifecycle state of an overlay this engine created.
    pub fn overlay_state(&self, id: OverlayId) -> Option<OverlayState> {
        match self.overlays.get(&id) {
            Some(entry) => Some(entry.state),
            None if id.0 >= 1 && id.0 <= self.next_id => Some(OverlayState::Removed),
            None => None,
        }
    }

    pub fn overlay_surface(&self, id: OverlayId) -> Option<SurfaceId> {
        self.overlays.get(&id).map(|e| e.surface)
    }

    /// Frame currently shown by an animated overlay.
    pub fn current_frame_index(&self, id: OverlayId) -> Option<usize> {
        match &self.overlays.get(&id)?.kind {
            OverlayKind::Animated(sequence) => Some(sequence.clock.current_index()),
            OverlayKind::StaticImage => None,
        }
    }

    /// Image and sequence overlays not yet removed.
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Overlays a [`remove_all`](Self::remove_all) would take right now.
    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    pub fn video_active(&self) -> bool {
        self.video.is_active()
    }

    pub fn video_surface(&self) -> Option<SurfaceId> {
        self.video.surface()
    }

    pub fn caption_text(&self) -> Option<&str> {
        self.caption.text()
    }

    pub fn caption_surface(&self) -> Option<SurfaceId> {
        self.caption.surface()
    }

    // ========================================================================
    // Images and sequences
    // ========================================================================

    /// Insert a still image and fade it in.
    pub fn show_image(&mut self, image: FrameImage, placement: Placement) -> OverlayId {
        let surface = self.insert_surface(placement, Material::Image(image));
        let id = self.track(surface, OverlayKind::StaticImage);
        debug!(?id, ?surface, "image overlay created");
        id
    }

    /// Insert an animated sequence and fade it in.
    ///
    /// The sequence is validated and its clock built before anything touches
    /// the scene, so a bad sequence leaves no node behind.
    #[tracing::instrument(level = "debug", skip(self, sequence), fields(frames = sequence.len()))]
    pub fn show_sequence(
        &mut self,
        sequence: DecodedSequence,
        placement: Placement,
    ) -> OverlayResult<OverlayId> {
        let clock = FrameAnimationClock::new(
            sequence.frames,
            sequence.durations,
            self.config.min_frame_duration,
        )?;

        let first = Material::Image(clock.current_frame().clone());
        let surface = self.insert_surface(placement, first);
        let subscription = Some(self.scheduler.subscribe());
        let id = self.track(
            surface,
            OverlayKind::Animated(AnimatedSequence {
                clock,
                subscription,
            }),
        );
        debug!(?id, ?surface, "sequence overlay created");
        Ok(id)
    }

    /// Fade out a single overlay, remove it, then run `on_complete`.
    ///
    /// Returns `false` (and drops `on_complete`) if the overlay is unknown or
    /// already removed.
    pub fn remove_overlay(
        &mut self,
        id: OverlayId,
        on_complete: impl FnOnce(&mut Self) + 'static,
    ) -> bool {
        let Some(entry) = self.overlays.get_mut(&id) else {
            return false;
        };
        entry.state = OverlayState::FadingOut;
        let surface = entry.surface;

        self.registry.untrack(id);
        self.fades.fade_out(
            &self.scene,
            surface,
            Box::new(move |engine: &mut Self| {
                engine.finish_removal(id);
                on_complete(engine);
            }),
        );
        true
    }

    /// Fade out every tracked overlay at once and run `on_complete` after the
    /// last one is gone. With nothing tracked, `on_complete` runs right away.
    pub fn remove_all(&mut self, on_complete: impl FnOnce(&mut Self) + 'static) {
        match self.registry.begin_remove_all(Box::new(on_complete)) {
            RemoveAll::Complete(on_complete) => on_complete(self),
            RemoveAll::Pending(ids) => {
                info!(count = ids.len(), "removing all overlays");
                for id in ids {
                    let Some(entry) = self.overlays.get_mut(&id) else {
                        continue;
                    };
                    entry.state = OverlayState::FadingOut;
                    let surface = entry.surface;
                    self.fades.fade_out(
                        &self.scene,
                        surface,
                        Box::new(move |engine: &mut Self| engine.finish_removal(id)),
                    );
                }
            }
        }
    }

    fn insert_surface(&mut self, placement: Placement, material: Material) -> SurfaceId {
        let surface = self
            .scene
            .insert(Surface::new(placement.size, placement.transform(), material));
        self.fades.fade_in(&mut self.scene, surface);
        surface
    }

    fn track(&mut self, surface: SurfaceId, kind: OverlayKind) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.overlays.insert(
            id,
            OverlayEntry {
                surface,
                kind,
                state: OverlayState::FadingIn,
            },
        );
        self.registry.add(id);
        id
    }

    /// Unsubscribe, detach, and settle any barrier waiting on `id`. Safe to
    /// call more than once.
    fn finish_removal(&mut self, id: OverlayId) {
        if let Some(mut entry) = self.overlays.remove(&id) {
            if let OverlayKind::Animated(sequence) = &mut entry.kind {
                if let Some(handle) = sequence.subscription.take() {
                    self.scheduler.unsubscribe(handle);
                }
            }
            self.scene.detach(entry.surface);
            debug!(?id, surface = ?entry.surface, "overlay removed");
        }

        for on_complete in self.registry.settle(id) {
            on_complete(self);
        }
    }

    // ========================================================================
    // Video
    // ========================================================================

    /// Replace any video overlay with a looping stream from `source`.
    pub fn show_video(&mut self, source: &str, placement: Placement) -> OverlayResult<SurfaceId> {
        let source = StreamSource::parse(source)?;
        let Some(player) = self.player.as_deref_mut() else {
            return Err(OverlayError::NoPlayer);
        };

        let surface = self.video.show(&mut self.scene, player, source, placement)?;
        self.fades.fade_in(&mut self.scene, surface);
        Ok(surface)
    }

    /// Fade the video out, stop and detach it, then run `on_complete`.
    pub fn hide_video(&mut self, on_complete: impl FnOnce(&mut Self) + 'static) {
        let Some((surface, generation)) = self.video.begin_hide() else {
            on_complete(self);
            return;
        };

        self.fades.fade_out(
            &self.scene,
            surface,
            Box::new(move |engine: &mut Self| {
                engine.video.finish_hide(&mut engine.scene, generation);
                on_complete(engine);
            }),
        );
    }

    /// Stop and detach the video immediately, without a fade.
    pub fn teardown_video(&mut self) {
        if let Some(surface) = self.video.teardown(&mut self.scene) {
            for on_complete in self.fades.cancel(surface) {
                on_complete(self);
            }
        }
    }

    // ========================================================================
    // Caption
    // ========================================================================

    /// Show `text` as the caption, replacing any current one. Empty text
    /// clears the caption.
    pub fn show_caption(&mut self, text: impl Into<String>, position: Vec3) {
        match self.caption.request(text, position) {
            CaptionAction::Create(request) => self.create_caption(request),
            CaptionAction::FadeOut(surface) => self.fades.fade_out(
                &self.scene,
                surface,
                Box::new(move |engine: &mut Self| engine.finish_caption(surface)),
            ),
            CaptionAction::Wait | CaptionAction::Nothing => {}
        }
    }

    fn create_caption(&mut self, request: CaptionRequest) {
        let surface = self.scene.insert(Surface::new(
            self.config.caption_size,
            Transform::from_position(request.position),
            Material::Text(request.text.clone()),
        ));
        self.fades.fade_in(&mut self.scene, surface);
        debug!(?surface, text = %request.text, "caption created");
        self.caption.created(surface, request.text);
    }

    fn finish_caption(&mut self, surface: SurfaceId) {
        self.scene.detach(surface);
        if let Some(next) = self.caption.faded_out(surface) {
            self.create_caption(next);
        }
    }

    // ========================================================================
    // Per-frame
    // ========================================================================

    /// Advance everything by `dt` seconds: queued requests, fades and their
    /// completions, frame clocks, and video looping. Never blocks.
    pub fn tick(&mut self, dt: f32) {
        while let Ok(command) = self.commands_rx.try_recv() {
            self.apply(command);
        }

        for event in self.fades.tick(dt, &mut self.scene) {
            match event {
                FadeEvent::FadedIn(surface) => self.mark_visible(surface),
                FadeEvent::FadedOut { completions, .. } => {
                    for on_complete in completions {
                        on_complete(self);
                    }
                }
            }
        }

        for entry in self.overlays.values_mut() {
            let OverlayKind::Animated(sequence) = &mut entry.kind else {
                continue;
            };
            let subscribed = sequence
                .subscription
                .is_some_and(|handle| self.scheduler.is_subscribed(handle));
            if !subscribed {
                continue;
            }
            if let Some(frame) = sequence.clock.advance(dt) {
                self.scene
                    .set_material(entry.surface, Material::Image(frame.clone()));
            }
        }

        self.video.poll();
    }

    /// Offset the render camera for `eye`. Call after the camera-follow
    /// update and before submitting the frame.
    pub fn adjust_view(&mut self, eye: Eye) {
        self.stereo
            .apply(&mut self.scene, eye, self.config.interpupillary_distance);
    }

    /// [`tick`](Self::tick) then [`adjust_view`](Self::adjust_view).
    pub fn frame(&mut self, dt: f32, eye: Eye) {
        self.tick(dt);
        self.adjust_view(eye);
    }

    fn mark_visible(&mut self, surface: SurfaceId) {
        if let Some(entry) = self
            .overlays
            .values_mut()
            .find(|e| e.surface == surface && e.state == OverlayState::FadingIn)
        {
            entry.state = OverlayState::Visible;
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::ShowImage { image, placement } => {
                self.show_image(image, placement);
            }
            Command::ShowSequence {
                sequence,
                placement,
            } => {
                if let Err(e) = self.show_sequence(sequence, placement) {
                    warn!(error = %e, "sequence rejected");
                }
            }
            Command::ShowVideo { source, placement } => {
                if let Err(e) = self.show_video(&source, placement) {
                    warn!(%source, error = %e, "video request ignored");
                }
            }
            Command::HideVideo { done } => self.hide_video(move |_| notify(done)),
            Command::RemoveAll { done } => self.remove_all(move |_| notify(done)),
            Command::ShowCaption { text, position } => self.show_caption(text, position),
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Remove everything immediately, without fades. Pending completions
    /// still run exactly once.
    pub fn shutdown(&mut self) {
        self.teardown_video();

        if let Some(surface) = self.caption.clear() {
            self.scene.detach(surface);
        }

        let ids: Vec<OverlayId> = self.overlays.keys().copied().collect();
        for id in ids {
            self.finish_removal(id);
        }

        for on_complete in self.fades.drain() {
            on_complete(self);
        }
        for on_complete in self.registry.clear() {
            on_complete(self);
        }
        info!("overlay engine shut down");
    }
}

fn notify(done: Option<Sender<()>>) {
    if let Some(done) = done {
        let _ = done.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::WorldScene;
    use glam::Vec2;
    use image::RgbaImage;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    const DT: f32 = 0.05;

    fn engine() -> OverlayEngine<WorldScene> {
        OverlayEngine::new(WorldScene::new(), OverlayConfig::default())
    }

    fn image() -> FrameImage {
        Arc::new(RgbaImage::new(2, 2))
    }

    fn settle(engine: &mut OverlayEngine<WorldScene>) {
        for _ in 0..10 {
            engine.tick(DT);
        }
    }

    #[test]
    fn image_fades_in_to_visible() {
        let mut engine = engine();
        let id = engine.show_image(image(), Placement::default());
        let surface = engine.overlay_surface(id).unwrap();
        assert_eq!(engine.overlay_state(id), Some(OverlayState::FadingIn));
        assert_eq!(engine.scene().opacity(surface), Some(0.0));

        settle(&mut engine);
        assert_eq!(engine.overlay_state(id), Some(OverlayState::Visible));
        assert_eq!(engine.scene().opacity(surface), Some(1.0));
    }

    #[test]
    fn bad_sequence_never_touches_the_scene() {
        let mut engine = engine();
        let result = engine.show_sequence(
            DecodedSequence::new(vec![image(), image()], vec![0.1]),
            Placement::default(),
        );
        assert!(matches!(result, Err(OverlayError::Decode(_))));
        assert_eq!(engine.scene().surface_count(), 0);
        assert_eq!(engine.overlay_count(), 0);
    }

    #[test]
    fn remove_overlay_detaches_after_fade() {
        let mut engine = engine();
        let id = engine.show_image(image(), Placement::default());
        settle(&mut engine);

        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        assert!(engine.remove_overlay(id, move |_| counter.set(counter.get() + 1)));
        assert_eq!(engine.overlay_state(id), Some(OverlayState::FadingOut));

        settle(&mut engine);
        assert_eq!(fired.get(), 1);
        assert_eq!(engine.overlay_state(id), Some(OverlayState::Removed));
        assert_eq!(engine.scene().surface_count(), 0);
        assert!(!engine.remove_overlay(id, |_| {}));
    }

    #[test]
    fn removed_sequence_stops_advancing() {
        let mut engine = engine();
        let sequence = DecodedSequence::new(vec![image(), image()], vec![0.01, 0.01]);
        let id = engine.show_sequence(sequence, Placement::default()).unwrap();
        engine.tick(DT);
        assert_eq!(engine.current_frame_index(id), Some(1));

        engine.remove_overlay(id, |_| {});
        settle(&mut engine);
        assert_eq!(engine.current_frame_index(id), None);
        assert!(engine.scheduler.is_empty());
    }

    #[test]
    fn empty_caption_request_creates_nothing() {
        let mut engine = engine();
        engine.show_caption("", Vec3::ZERO);
        assert_eq!(engine.scene().surface_count(), 0);
        assert_eq!(engine.caption_text(), None);
    }

    #[test]
    fn video_without_player_is_refused() {
        let mut engine = engine();
        let err = engine.show_video("clip.mp4", Placement::new(Vec2::ONE));
        assert!(matches!(err, Err(OverlayError::NoPlayer)));
        assert_eq!(engine.scene().surface_count(), 0);
    }

    #[test]
    fn invalid_video_source_is_refused() {
        let mut engine = engine();
        let err = engine.show_video("  ", Placement::default());
        assert!(matches!(err, Err(OverlayError::InvalidSource(_))));
    }

    #[test]
    fn hide_video_without_video_completes_immediately() {
        let mut engine = engine();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        engine.hide_video(move |_| flag.set(true));
        assert!(fired.get());
    }

    #[test]
    fn shutdown_clears_everything_and_runs_completions() {
        let mut engine = engine();
        engine.show_image(image(), Placement::default());
        engine.show_image(image(), Placement::default());
        engine.show_caption("bye", Vec3::ZERO);

        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        engine.remove_all(move |_| counter.set(counter.get() + 1));

        engine.shutdown();
        assert_eq!(fired.get(), 1);
        assert_eq!(engine.scene().surface_count(), 0);
        assert_eq!(engine.overlay_count(), 0);
        assert_eq!(engine.caption_text(), None);

        settle(&mut engine);
        assert_eq!(fired.get(), 1);
    }
}
