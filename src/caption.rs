//! Speech caption: a single text overlay that is swapped, never stacked.
//!
//! [`CaptionOverlay`] is a small state machine. It tells the engine what to do
//! with each request ([`CaptionAction`]) and is told back when a node was
//! created or finished fading out. Replacement is strictly sequential: the old
//! caption's fade-out completes before the new one is created.

use glam::Vec3;

use crate::scene_graph::SurfaceId;

/// A caption the engine has been asked to show.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionRequest {
    pub text: String,
    pub position: Vec3,
}

/// What the engine must do in response to [`CaptionOverlay::request`].
#[derive(Clone, Debug, PartialEq)]
pub enum CaptionAction {
    /// No caption is live; create and fade in this one now.
    Create(CaptionRequest),
    /// Start fading out the live caption; the replacement follows later.
    FadeOut(SurfaceId),
    /// A fade-out is already running; the request was queued behind it.
    Wait,
    /// Empty text with nothing showing.
    Nothing,
}

#[derive(Clone, Debug)]
struct LiveCaption {
    surface: SurfaceId,
    text: String,
}

/// At-most-one caption state.
#[derive(Debug, Default)]
pub struct CaptionOverlay {
    live: Option<LiveCaption>,
    pending: Option<CaptionRequest>,
    fading_out: bool,
}

impl CaptionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the caption node currently in the scene.
    pub fn text(&self) -> Option<&str> {
        self.live.as_ref().map(|c| c.text.as_str())
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.live.as_ref().map(|c| c.surface)
    }

    pub fn is_fading_out(&self) -> bool {
        self.fading_out
    }

    /// Ask for `text` to be the visible caption. Empty text means "no
    /// caption". The same text as the live caption still cycles the fade.
    pub fn request(&mut self, text: impl Into<String>, position: Vec3) -> CaptionAction {
        let request = CaptionRequest {
            text: text.into(),
            position,
        };

        let Some(live) = &self.live else {
            return if request.text.is_empty() {
                CaptionAction::Nothing
            } else {
                CaptionAction::Create(request)
            };
        };

        self.pending = Some(request);
        if self.fading_out {
            CaptionAction::Wait
        } else {
            self.fading_out = true;
            CaptionAction::FadeOut(live.surface)
        }
    }

    /// Record that the engine inserted a caption node.
    pub fn created(&mut self, surface: SurfaceId, text: impl Into<String>) {
        self.live = Some(LiveCaption {
            surface,
            text: text.into(),
        });
        self.fading_out = false;
    }

    /// Record that `surface` finished fading out and was detached. Returns
    /// the queued replacement, if it has any text to show.
    pub fn faded_out(&mut self, surface: SurfaceId) -> Option<CaptionRequest> {
        if self.surface() != Some(surface) {
            return None;
        }
        self.live = None;
        self.fading_out = false;
        self.pending.take().filter(|r| !r.text.is_empty())
    }

    /// Forget all state, returning the live surface for detachment.
    pub fn clear(&mut self) -> Option<SurfaceId> {
        self.pending = None;
        self.fading_out = false;
        self.live.take().map(|c| c.surface)
    }
}
