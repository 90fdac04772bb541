//! Opacity transitions for overlay appearance and disappearance.
//!
//! [`FadeController`] runs one [`FadeTransition`] per surface and reports
//! finished fades as [`FadeEvent`]s. Fade-outs carry their completion values
//! with them so the caller can run removal logic once the ramp has actually
//! reached zero. The controller never detaches anything itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scene_graph::{SceneGraph, SurfaceId};

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of fade animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed throughout.
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    #[default]
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Which way a fade is ramping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeDirection {
    /// Opacity ramps up to 1.
    In,
    /// Opacity ramps down to 0.
    Out,
}

impl FadeDirection {
    fn target(self) -> f32 {
        match self {
            FadeDirection::In => 1.0,
            FadeDirection::Out => 0.0,
        }
    }
}

/// A single eased opacity ramp.
///
/// The ramp's length scales with the distance it has to cover, so a fade-out
/// that interrupts a half-finished fade-in takes half the configured time.
#[derive(Clone, Debug)]
pub struct FadeTransition {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    easing: Easing,
}

impl FadeTransition {
    /// Ramp from `from` to `to`, taking `full_duration` for a complete 0↔1 swing.
    pub fn new(from: f32, to: f32, full_duration: f32, easing: Easing) -> Self {
        let from = from.clamp(0.0, 1.0);
        let to = to.clamp(0.0, 1.0);
        Self {
            from,
            to,
            duration: full_duration.max(0.0) * (to - from).abs(),
            elapsed: 0.0,
            easing,
        }
    }

    /// Linear progress through the ramp (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Opacity at the current point of the ramp.
    pub fn opacity(&self) -> f32 {
        self.from + (self.to - self.from) * self.easing.apply(self.progress())
    }

    /// Advance by `dt` seconds and return the new opacity.
    pub fn step(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        self.opacity()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// A finished fade, reported by [`FadeController::tick`].
#[derive(Debug)]
pub enum FadeEvent<C> {
    /// The surface reached full opacity.
    FadedIn(SurfaceId),
    /// The surface reached zero opacity, or vanished from the scene while
    /// fading. Each completion is handed out exactly once.
    FadedOut {
        surface: SurfaceId,
        completions: Vec<C>,
        interrupted: bool,
    },
}

struct ActiveFade<C> {
    surface: SurfaceId,
    direction: FadeDirection,
    transition: FadeTransition,
    completions: Vec<C>,
    fired: bool,
}

impl<C> ActiveFade<C> {
    /// Hand the completions out once; later calls yield nothing.
    fn fire(&mut self, interrupted: bool) -> Option<FadeEvent<C>> {
        if self.fired {
            return None;
        }
        self.fired = true;
        match self.direction {
            FadeDirection::In if interrupted => None,
            FadeDirection::In => Some(FadeEvent::FadedIn(self.surface)),
            FadeDirection::Out => Some(FadeEvent::FadedOut {
                surface: self.surface,
                completions: std::mem::take(&mut self.completions),
                interrupted,
            }),
        }
    }
}

/// Drives fade-in and fade-out ramps for any number of surfaces.
///
/// `C` is whatever the caller wants back when a fade-out finishes; the engine
/// uses boxed closures, tests use plain values.
pub struct FadeController<C> {
    fades: Vec<ActiveFade<C>>,
    duration: f32,
    easing: Easing,
}

impl<C> FadeController<C> {
    pub fn new(duration: f32, easing: Easing) -> Self {
        Self {
            fades: Vec::new(),
            duration,
            easing,
        }
    }

    /// Number of fades in flight.
    pub fn len(&self) -> usize {
        self.fades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fades.is_empty()
    }

    /// Direction of the fade currently running on `surface`, if any.
    pub fn direction(&self, surface: SurfaceId) -> Option<FadeDirection> {
        self.find(surface).map(|f| f.direction)
    }

    /// Start ramping `surface` up to full opacity.
    ///
    /// Returns `false` when the surface is already fading out: a committed
    /// fade-out is never reversed.
    pub fn fade_in<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, surface: SurfaceId) -> bool {
        match self.direction(surface) {
            Some(FadeDirection::Out) => {
                debug!(?surface, "fade-in ignored, surface is fading out");
                false
            }
            Some(FadeDirection::In) => true,
            None => {
                let from = scene.opacity(surface).unwrap_or(0.0);
                scene.set_opacity(surface, from);
                self.start(surface, FadeDirection::In, from, Vec::new());
                true
            }
        }
    }

    /// Start ramping `surface` down to zero and hand `on_complete` back once
    /// it gets there.
    ///
    /// A fade-out over a running fade-in continues from the current opacity.
    /// A second fade-out on the same surface joins the first and both
    /// completions are returned together.
    pub fn fade_out<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &S,
        surface: SurfaceId,
        on_complete: C,
    ) {
        if let Some(index) = self.position(surface) {
            let fade = &mut self.fades[index];
            if fade.direction == FadeDirection::Out {
                fade.completions.push(on_complete);
                return;
            }
            let from = fade.transition.opacity();
            self.fades.remove(index);
            self.start(surface, FadeDirection::Out, from, vec![on_complete]);
            return;
        }

        let from = scene.opacity(surface).unwrap_or(1.0);
        self.start(surface, FadeDirection::Out, from, vec![on_complete]);
    }

    /// Drop the fade on `surface` without waiting for it to finish.
    ///
    /// Pending fade-out completions are returned so the caller can still
    /// honour them; the fade will never report again.
    pub fn cancel(&mut self, surface: SurfaceId) -> Vec<C> {
        match self.position(surface) {
            Some(index) => {
                let mut fade = self.fades.remove(index);
                fade.fired = true;
                std::mem::take(&mut fade.completions)
            }
            None => Vec::new(),
        }
    }

    /// Drop every fade, returning all pending fade-out completions.
    pub fn drain(&mut self) -> Vec<C> {
        self.fades
            .drain(..)
            .filter(|f| !f.fired)
            .flat_map(|f| f.completions)
            .collect()
    }

    /// Advance every fade by `dt`, push opacities into the scene, and return
    /// the fades that finished on this tick.
    pub fn tick<S: SceneGraph + ?Sized>(&mut self, dt: f32, scene: &mut S) -> Vec<FadeEvent<C>> {
        let mut events = Vec::new();

        for fade in &mut self.fades {
            if !scene.contains(fade.surface) {
                debug!(surface = ?fade.surface, "surface detached mid-fade");
                events.extend(fade.fire(true));
                continue;
            }

            let opacity = fade.transition.step(dt);
            scene.set_opacity(fade.surface, opacity);

            if fade.transition.is_finished() {
                events.extend(fade.fire(false));
            }
        }

        self.fades.retain(|f| !f.fired);
        events
    }

    fn start(&mut self, surface: SurfaceId, direction: FadeDirection, from: f32, completions: Vec<C>) {
        self.fades.push(ActiveFade {
            surface,
            direction,
            transition: FadeTransition::new(from, direction.target(), self.duration, self.easing),
            completions,
            fired: false,
        });
    }

    fn find(&self, surface: SurfaceId) -> Option<&ActiveFade<C>> {
        self.fades.iter().find(|f| f.surface == surface)
    }

    fn position(&self, surface: SurfaceId) -> Option<usize> {
        self.fades.iter().position(|f| f.surface == surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::WorldScene;
    use crate::scene_graph::{Material, Surface};
    use crate::transform::Transform;
    use glam::Vec2;

    fn scene_with_surface(opacity: f32) -> (WorldScene, SurfaceId) {
        let mut scene = WorldScene::new();
        let mut surface = Surface::new(Vec2::ONE, Transform::new(), Material::Empty);
        surface.opacity = opacity;
        let id = scene.insert(surface);
        (scene, id)
    }

    fn completions(events: Vec<FadeEvent<u32>>) -> Vec<u32> {
        events
            .into_iter()
            .flat_map(|e| match e {
                FadeEvent::FadedOut { completions, .. } => completions,
                FadeEvent::FadedIn(_) => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::EaseInOut.apply(0.5), 0.5);
    }

    #[test]
    fn fade_in_reaches_full_opacity() {
        let (mut scene, id) = scene_with_surface(0.0);
        let mut fades: FadeController<u32> = FadeController::new(0.2, Easing::EaseInOut);
        assert!(fades.fade_in(&mut scene, id));

        let events = fades.tick(0.1, &mut scene);
        assert!(events.is_empty());
        let mid = scene.opacity(id).unwrap();
        assert!(mid > 0.0 && mid < 1.0);

        let events = fades.tick(0.1, &mut scene);
        assert!(matches!(events.as_slice(), [FadeEvent::FadedIn(s)] if *s == id));
        assert_eq!(scene.opacity(id), Some(1.0));
        assert!(fades.is_empty());
    }

    #[test]
    fn fade_out_completes_once_after_reaching_zero() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.2, Easing::EaseInOut);
        fades.fade_out(&scene, id, 7u32);

        assert!(completions(fades.tick(0.15, &mut scene)).is_empty());
        assert!(scene.opacity(id).unwrap() > 0.0);

        assert_eq!(completions(fades.tick(0.1, &mut scene)), vec![7]);
        assert_eq!(scene.opacity(id), Some(0.0));

        assert!(completions(fades.tick(0.1, &mut scene)).is_empty());
    }

    #[test]
    fn external_detach_fires_completion_exactly_once() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_out(&scene, id, 1u32);
        fades.tick(0.05, &mut scene);

        scene.detach(id);
        let events = fades.tick(0.05, &mut scene);
        assert!(matches!(
            events.as_slice(),
            [FadeEvent::FadedOut { interrupted: true, .. }]
        ));
        assert_eq!(completions(events), vec![1]);

        for _ in 0..10 {
            assert!(completions(fades.tick(0.05, &mut scene)).is_empty());
        }
    }

    #[test]
    fn second_fade_out_joins_the_first() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_out(&scene, id, 1u32);
        fades.tick(0.1, &mut scene);
        fades.fade_out(&scene, id, 2u32);

        assert_eq!(fades.len(), 1);
        assert_eq!(completions(fades.tick(0.1, &mut scene)), vec![1, 2]);
    }

    #[test]
    fn fade_out_interrupts_fade_in_from_current_opacity() {
        let (mut scene, id) = scene_with_surface(0.0);
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_in(&mut scene, id);
        fades.tick(0.1, &mut scene);
        let halfway = scene.opacity(id).unwrap();
        assert!((halfway - 0.5).abs() < 1e-5);

        fades.fade_out(&scene, id, 3u32);
        assert_eq!(fades.direction(id), Some(FadeDirection::Out));

        // Half the distance left, so half the configured duration.
        assert_eq!(completions(fades.tick(0.1, &mut scene)), vec![3]);
        assert_eq!(scene.opacity(id), Some(0.0));
    }

    #[test]
    fn fade_in_does_not_reverse_fade_out() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_out(&scene, id, 1u32);
        assert!(!fades.fade_in(&mut scene, id));
        assert_eq!(fades.direction(id), Some(FadeDirection::Out));
    }

    #[test]
    fn cancel_returns_pending_completions() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_out(&scene, id, 9u32);
        assert_eq!(fades.cancel(id), vec![9]);
        assert!(fades.tick(1.0, &mut scene).is_empty());
    }

    #[test]
    fn drain_hands_back_everything_pending() {
        let (mut scene, id) = scene_with_surface(1.0);
        let other = scene.insert(Surface::new(Vec2::ONE, Transform::new(), Material::Empty));
        let mut fades = FadeController::new(0.2, Easing::Linear);
        fades.fade_out(&scene, id, 1u32);
        fades.fade_out(&scene, id, 2u32);
        fades.fade_in(&mut scene, other);

        assert_eq!(fades.drain(), vec![1, 2]);
        assert!(fades.is_empty());
    }

    #[test]
    fn zero_duration_finishes_on_first_tick() {
        let (mut scene, id) = scene_with_surface(1.0);
        let mut fades = FadeController::new(0.0, Easing::Linear);
        fades.fade_out(&scene, id, 5u32);
        assert_eq!(completions(fades.tick(0.0, &mut scene)), vec![5]);
    }
}
