//! Headless walkthrough of the overlay engine.
//!
//! ```text
//! overlayer-demo [IMAGE_OR_GIF] [CONFIG_JSON]
//! ```
//!
//! Set `RUST_LOG=overlayer=debug` to watch every fade and frame change.

use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use overlayer::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DT: f32 = 1.0 / 60.0;

/// Pretends every stream is one second long.
struct TimedPlayer;

struct TimedPlayback {
    playing: bool,
    position: f32,
}

impl Playback for TimedPlayback {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek_to_start(&mut self) {
        self.position = 0.0;
    }

    fn take_end_of_stream(&mut self) -> bool {
        if self.playing {
            self.position += DT;
        }
        self.position >= 1.0
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl StreamPlayer for TimedPlayer {
    fn open(&mut self, source: &StreamSource) -> OverlayResult<Box<dyn Playback>> {
        info!(%source, "opening stream");
        Ok(Box::new(TimedPlayback {
            playing: false,
            position: 0.0,
        }))
    }
}

fn synthetic_sequence() -> DecodedSequence {
    let red = Arc::new(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255])));
    let blue = Arc::new(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255])));
    DecodedSequence::new(vec![red, blue], vec![0.25, 0.5])
}

fn run_for(engine: &mut OverlayEngine<WorldScene>, seconds: f32) {
    let ticks = (seconds / DT).ceil() as usize;
    for i in 0..ticks {
        let eye = if i % 2 == 0 { Eye::Left } else { Eye::Right };
        engine.frame(DT, eye);
    }
}

fn main() -> OverlayResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let asset = args.next();
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| OverlayError::fetch(&path, e))?;
            OverlayConfig::from_json(&json)?
        }
        None => OverlayConfig::default(),
    };

    let mut engine =
        OverlayEngine::new(WorldScene::new(), config.clone()).with_player(TimedPlayer);
    let handle = engine.handle();
    let placement = Placement::new(Vec2::new(0.4, 0.4)).at(Vec3::new(0.0, 0.0, -1.5));

    match asset {
        Some(location) => {
            let loader = AssetLoader::new(
                FileFetcher::new(),
                ImageDecoder::new(config.default_frame_duration),
            );
            let worker = loader.load_sequence(location, placement, &handle);
            let _ = worker.join();
        }
        None => {
            handle.show_sequence(synthetic_sequence(), placement);
        }
    }
    handle.show_caption("Welcome", Vec3::new(0.0, -0.4, -1.2));
    handle.show_video(
        "demo://loop",
        Placement::new(Vec2::new(0.6, 0.34)).at(Vec3::new(0.6, 0.0, -1.5)),
    );

    run_for(&mut engine, 1.5);
    info!(
        overlays = engine.overlay_count(),
        video = engine.video_active(),
        caption = engine.caption_text().unwrap_or(""),
        "scene populated"
    );

    engine.show_caption("Goodbye", Vec3::new(0.0, -0.4, -1.2));
    let hidden = handle.hide_video();
    let removed = handle.remove_all();
    run_for(&mut engine, 1.0);

    let timeout = Duration::from_millis(10);
    info!(
        video_hidden = hidden.recv_timeout(timeout).is_ok(),
        overlays_removed = removed.recv_timeout(timeout).is_ok(),
        caption = engine.caption_text().unwrap_or(""),
        "teardown finished"
    );

    engine.shutdown();
    info!(surfaces = engine.scene().surface_count(), "done");
    Ok(())
}
