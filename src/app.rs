//! The app aggregate: owns the GPU and every GPU resource, and drives
//! ticks.

use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::RendererConfig;
use crate::context::RenderContext;
use crate::driver::{FpsCounter, FrameClock};
use crate::error::Result;
use crate::filter::FilterName;
use crate::gpu::Gpu;
use crate::library::{ShaderLibrary, ShaderSources, SourceFetcher};
use crate::mesh::QuadMesh;
use crate::renderer::{FilterRenderer, RenderState};
use crate::texture::VideoTexture;
use crate::video::VideoSource;

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Resources are not loaded yet; no GPU call was made.
    Skipped,
    /// A frame was drawn.
    Rendered,
}

/// Everything that only exists once loading succeeded.
struct Loaded<G: Gpu> {
    library: ShaderLibrary<G>,
    mesh: QuadMesh<G>,
    texture: VideoTexture<G>,
}

impl<G: Gpu> Loaded<G> {
    fn destroy(self, gpu: &G) {
        self.library.destroy(gpu);
        self.mesh.destroy(gpu);
        self.texture.destroy(gpu);
    }
}

/// A video filter app drawing into one fixed-size GL drawing buffer.
///
/// # Example
///
/// ```no_run
/// # use glow_video_filters::{DirectoryFetcher, FilterApp, FilterName, GlowGpu, IntervalClock,
/// #     RendererConfig};
/// # fn example(gl: std::sync::Arc<glow::Context>, frame: image::RgbaImage)
/// #     -> glow_video_filters::Result<()> {
/// let config = RendererConfig::load("filters.yaml")?;
/// // With the GL context current on this thread:
/// let gpu = unsafe { GlowGpu::new(gl) };
/// let mut app = FilterApp::from_config(gpu, &config)?;
/// app.load_blocking(&config.shader_sources(), &DirectoryFetcher::new("."))?;
/// app.set_video_ready();
/// app.set_filter(FilterName::Toon);
/// app.run(IntervalClock::with_rate(60), &frame)?;
/// app.destroy();
/// # Ok(())
/// # }
/// ```
pub struct FilterApp<G: Gpu> {
    gpu: G,
    context: RenderContext,
    loaded: Option<Loaded<G>>,
    renderer: FilterRenderer,
    start: Instant,
    video_ready: bool,
    fps: FpsCounter,
}

impl<G: Gpu> FilterApp<G> {
    /// Take ownership of `gpu` and configure its context. Shaders are not
    /// loaded yet; ticks are skipped until [`load`](Self::load) succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextInit`](crate::Error::ContextInit) if the
    /// context is unusable.
    pub fn new(gpu: G, width: u32, height: u32, initial_filter: FilterName) -> Result<Self> {
        let context = RenderContext::initialize(&gpu, width, height)
            .inspect_err(|err| error!("Unable to initialize: {err}"))?;
        Ok(Self {
            gpu,
            context,
            loaded: None,
            renderer: FilterRenderer::new(initial_filter),
            start: Instant::now(),
            video_ready: false,
            fps: FpsCounter::default(),
        })
    }

    /// [`new`](Self::new) with the size and initial filter from `config`.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn from_config(gpu: G, config: &RendererConfig) -> Result<Self> {
        Self::new(gpu, config.width, config.height, config.initial_filter)
    }

    /// Fetch and build every program in `sources`, then create the quad and
    /// the placeholder texture. On success the app is ready to render.
    ///
    /// Calling this again replaces previously loaded resources once the new
    /// ones are complete.
    ///
    /// # Errors
    ///
    /// Any load error from [`ShaderLibrary::load_all`], or
    /// [`Error::Gpu`](crate::Error::Gpu) if the mesh or texture cannot be
    /// created. Nothing is left allocated on failure and the app stays as
    /// it was.
    pub async fn load<F: SourceFetcher>(
        &mut self,
        sources: &ShaderSources,
        fetcher: &F,
    ) -> Result<()> {
        let loaded = self
            .build(sources, fetcher)
            .await
            .inspect_err(|err| error!("Unable to initialize the shader program: {err}"))?;

        if let Some(previous) = self.loaded.replace(loaded) {
            previous.destroy(&self.gpu);
        }
        self.renderer.mark_ready();
        Ok(())
    }

    async fn build<F: SourceFetcher>(
        &self,
        sources: &ShaderSources,
        fetcher: &F,
    ) -> Result<Loaded<G>> {
        let library = ShaderLibrary::load_all(&self.gpu, sources, fetcher).await?;
        let mesh = match QuadMesh::create(&self.gpu) {
            Ok(mesh) => mesh,
            Err(err) => {
                library.destroy(&self.gpu);
                return Err(err);
            }
        };
        let texture = match VideoTexture::initialize_placeholder(&self.gpu) {
            Ok(texture) => texture,
            Err(err) => {
                library.destroy(&self.gpu);
                mesh.destroy(&self.gpu);
                return Err(err);
            }
        };
        Ok(Loaded {
            library,
            mesh,
            texture,
        })
    }

    /// [`load`](Self::load) for hosts without an async executor.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load).
    pub fn load_blocking<F: SourceFetcher>(
        &mut self,
        sources: &ShaderSources,
        fetcher: &F,
    ) -> Result<()> {
        pollster::block_on(self.load(sources, fetcher))
    }

    /// Select the filter for subsequent frames.
    pub fn set_filter(&mut self, filter: FilterName) {
        self.renderer.set_filter(filter);
    }

    /// Signal that the video source now produces frames. Until then the
    /// placeholder is shown and the source is never read.
    pub fn set_video_ready(&mut self) {
        if !self.video_ready {
            info!("Video ready; streaming frames into the texture");
            self.video_ready = true;
        }
    }

    /// Draw one frame at `now`: upload the current video frame if video is
    /// ready, then render with the active filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameSize`](crate::Error::FrameSize) for a malformed
    /// video frame, or any render error from
    /// [`render_frame`](Self::render_frame).
    pub fn tick<V: VideoSource + ?Sized>(&mut self, now: Instant, video: &V) -> Result<TickOutcome> {
        let Some(loaded) = &mut self.loaded else {
            return Ok(TickOutcome::Skipped);
        };
        if self.video_ready {
            loaded
                .texture
                .refresh(&self.gpu, video)
                .inspect_err(|err| error!("Unable to update the video texture: {err}"))?;
        }

        let time_ms = now.saturating_duration_since(self.start).as_secs_f32() * 1000.0;
        let outcome = self.render_frame(time_ms)?;
        if let Some(fps) = self.fps.update(now) {
            debug!("{fps:.1} fps");
        }
        Ok(outcome)
    }

    /// Draw one frame with the texture as it is, `time_ms` after startup.
    ///
    /// The texture is not refreshed here, so the custom filter's `width` and
    /// `height` are those of the last uploaded frame. Before the first
    /// [`tick`](Self::tick) with video ready that is the 3x2 placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFilter`](crate::Error::UnknownFilter) if the
    /// active filter was not loaded.
    pub fn render_frame(&mut self, time_ms: f32) -> Result<TickOutcome> {
        let Some(loaded) = &self.loaded else {
            return Ok(TickOutcome::Skipped);
        };
        self.renderer
            .render_frame(
                &self.gpu,
                &loaded.library,
                &loaded.mesh,
                &loaded.texture,
                time_ms,
            )
            .inspect_err(|err| error!("Unable to render frame: {err}"))?;
        Ok(TickOutcome::Rendered)
    }

    /// Tick once per frame from `clock` until it stops or a tick fails.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// The first tick error, which also ends the loop.
    pub fn run<C, V>(&mut self, mut clock: C, video: &V) -> Result<u64>
    where
        C: FrameClock,
        V: VideoSource + ?Sized,
    {
        let mut ticks = 0;
        while let Some(now) = clock.next_frame() {
            self.tick(now, video)?;
            ticks += 1;
        }
        info!("Frame loop stopped after {ticks} ticks");
        Ok(ticks)
    }

    /// Instant that frame times are measured from.
    #[must_use]
    pub fn start_time(&self) -> Instant {
        self.start
    }

    /// Renderer lifecycle state.
    #[must_use]
    pub fn state(&self) -> RenderState {
        self.renderer.state()
    }

    /// The filter the next frame will use.
    #[must_use]
    pub fn filter(&self) -> FilterName {
        self.renderer.filter()
    }

    /// The drawing-buffer configuration.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The loaded programs, if loading has succeeded.
    #[must_use]
    pub fn library(&self) -> Option<&ShaderLibrary<G>> {
        self.loaded.as_ref().map(|loaded| &loaded.library)
    }

    /// The GPU backend.
    #[must_use]
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Delete every GPU object and hand back the backend.
    pub fn destroy(mut self) -> G {
        if let Some(loaded) = self.loaded.take() {
            loaded.destroy(&self.gpu);
        }
        self.renderer.reset();
        self.gpu
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::time::Duration;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::error::Error;
    use crate::gpu::recording::{Call, RecordingGpu};
    use crate::gpu::ApiVersion;
    use crate::library::tests::embedded_sources;
    use crate::library::ShaderLayout;
    use crate::program::ShaderStage;

    /// Replays fixed timestamps.
    struct Replay(std::vec::IntoIter<Instant>);

    impl FrameClock for Replay {
        fn next_frame(&mut self) -> Option<Instant> {
            self.0.next()
        }
    }

    fn app(filter: FilterName) -> FilterApp<RecordingGpu> {
        FilterApp::new(RecordingGpu::default(), 320, 240, filter).unwrap()
    }

    fn loaded(filter: FilterName) -> FilterApp<RecordingGpu> {
        let mut app = app(filter);
        let sources = ShaderSources::all(&ShaderLayout::default());
        app.load_blocking(&sources, &embedded_sources()).unwrap();
        app.gpu().clear_calls();
        app
    }

    fn frame() -> RgbaImage {
        RgbaImage::from_pixel(16, 9, Rgba([200, 100, 50, 255]))
    }

    fn draws(calls: &[Call]) -> usize {
        calls.iter().filter(|c| matches!(c, Call::DrawElements(..))).count()
    }

    #[test]
    fn new_configures_the_context() {
        let app = app(FilterName::Normal);
        let calls = app.gpu().calls();
        assert_eq!(calls[0], Call::Viewport(0, 0, 320, 240));
        assert!(calls.contains(&Call::Enable(glow::DEPTH_TEST)));
        assert_eq!(app.state(), RenderState::Uninitialized);
    }

    #[test]
    fn old_context_is_rejected() {
        let gpu = RecordingGpu::with_version(ApiVersion {
            major: 2,
            minor: 1,
            embedded: false,
        });
        let err = FilterApp::new(gpu, 320, 240, FilterName::Normal).err().unwrap();
        assert!(matches!(err, Error::ContextInit(_)));
    }

    #[test]
    fn ticks_are_skipped_until_loaded() {
        let mut app = app(FilterName::Normal);
        app.gpu().clear_calls();
        app.set_video_ready();

        let outcome = app.tick(Instant::now(), &frame()).unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);
        assert!(app.gpu().calls().is_empty());
    }

    #[test]
    fn failed_load_leaves_app_uninitialized() {
        let mut app = app(FilterName::Normal);
        let mut sources = embedded_sources();
        sources.remove(&ShaderLayout::default().path(FilterName::Toon, ShaderStage::Vertex));

        let err = app
            .load_blocking(&ShaderSources::all(&ShaderLayout::default()), &sources)
            .unwrap_err();
        assert!(matches!(err, Error::ShaderLoad { filter: FilterName::Toon, .. }));
        assert_eq!(app.state(), RenderState::Uninitialized);
        assert!(app.library().is_none());
        assert!(!app.gpu().calls().iter().any(|c| matches!(c, Call::CreateProgram(_))));

        assert_eq!(app.tick(Instant::now(), &frame()).unwrap(), TickOutcome::Skipped);
        assert_eq!(draws(&app.gpu().calls()), 0);
    }

    #[test]
    fn first_tick_renders_placeholder_until_video_ready() {
        let mut app = loaded(FilterName::Normal);
        assert_eq!(app.state(), RenderState::Ready);

        let outcome = app.tick(Instant::now(), &frame()).unwrap();
        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(app.state(), RenderState::Rendering);
        let calls = app.gpu().calls();
        assert_eq!(draws(&calls), 1);
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::TexImage2d(..) | Call::TexSubImage2d(..))));
    }

    #[test]
    fn ready_video_is_uploaded_every_tick() {
        let mut app = loaded(FilterName::Custom);
        app.set_video_ready();
        let video = frame();
        app.tick(Instant::now(), &video).unwrap();
        app.tick(Instant::now(), &video).unwrap();

        let calls = app.gpu().calls();
        assert!(calls.contains(&Call::TexImage2d(16, 9, 16 * 9 * 4)));
        assert!(calls.contains(&Call::TexSubImage2d(16, 9, 16 * 9 * 4)));
        let sizes = app.gpu().uploaded_f32();
        assert_eq!(sizes[..2], [("width".to_owned(), 16.0), ("height".to_owned(), 9.0)]);
    }

    #[test]
    fn render_frame_without_video_reports_placeholder_size() {
        let mut app = loaded(FilterName::Custom);
        assert_eq!(app.render_frame(0.0).unwrap(), TickOutcome::Rendered);

        assert_eq!(
            app.gpu().uploaded_f32(),
            vec![("width".to_owned(), 3.0), ("height".to_owned(), 2.0)]
        );
    }

    #[test]
    fn ripple_time_is_measured_from_start() {
        let mut app = loaded(FilterName::Ripple);
        let now = app.start_time() + Duration::from_millis(1500);
        app.tick(now, &frame()).unwrap();

        assert_eq!(app.gpu().uploaded_f32(), vec![("time".to_owned(), 1.5)]);
    }

    #[test]
    fn run_ticks_until_clock_stops() {
        let mut app = loaded(FilterName::Toon);
        let start = app.start_time();
        let clock = Replay(
            (0..4)
                .map(|i| start + Duration::from_millis(i * 16))
                .collect::<Vec<_>>()
                .into_iter(),
        );

        assert_eq!(app.run(clock, &frame()).unwrap(), 4);
        assert_eq!(draws(&app.gpu().calls()), 4);
    }

    #[test]
    fn unknown_filter_stops_the_loop() {
        let mut app = app(FilterName::Normal);
        let sources = ShaderSources::conventional(&ShaderLayout::default(), &[FilterName::Normal]);
        app.load_blocking(&sources, &embedded_sources()).unwrap();
        app.tick(Instant::now(), &frame()).unwrap();
        app.set_filter(FilterName::FishEye);
        app.gpu().clear_calls();

        let start = app.start_time();
        let clock = Replay(vec![start, start, start].into_iter());
        let err = app.run(clock, &frame()).unwrap_err();

        assert!(matches!(err, Error::UnknownFilter(_)));
        assert_eq!(draws(&app.gpu().calls()), 0);
        let clears = app
            .gpu()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Clear(_)))
            .count();
        assert_eq!(clears, 1, "loop must stop at the first failing tick");
    }

    #[test]
    fn reload_replaces_previous_programs() {
        let mut app = loaded(FilterName::Normal);
        let sources = ShaderSources::all(&ShaderLayout::default());
        app.load_blocking(&sources, &embedded_sources()).unwrap();
        assert_eq!(app.gpu().live_programs(), 6);
        assert_eq!(app.library().unwrap().len(), 6);
    }

    #[test]
    fn destroy_releases_everything() {
        let mut app = loaded(FilterName::Normal);
        app.tick(Instant::now(), &frame()).unwrap();
        let gpu = app.destroy();

        assert_eq!(gpu.live_programs(), 0);
        let calls = gpu.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::DeleteVertexArray(_))));
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::DeleteBuffer(_))).count(),
            3
        );
        assert!(calls.iter().any(|c| matches!(c, Call::DeleteTexture(_))));
    }

    #[test]
    fn from_config_uses_size_and_initial_filter() {
        let config = RendererConfig::from_yaml_str("width: 64\nheight: 32\ninitial_filter: toon")
            .unwrap();
        let app = FilterApp::from_config(RecordingGpu::default(), &config).unwrap();
        assert_eq!(app.filter(), FilterName::Toon);
        assert_eq!((app.context().width(), app.context().height()), (64, 32));
    }
}
