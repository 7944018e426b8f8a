//! # Streaming Engine Adapter
//!
//! Owns at most one adaptive streaming engine instance at a time and mirrors
//! its quality state.
//!
//! Every acquisition bumps a generation counter. Engine notifications are
//! tagged by the host with the generation they belong to; anything not from
//! the live instance is stale and must be dropped by the caller.

use std::sync::Arc;

use bridge_traits::{
    EngineOptions, MediaTarget, QualityLevel, StreamingEngine, StreamingEngineFactory,
};
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};

/// Identifies one engine instance.
pub type EngineGeneration = u64;

pub struct StreamingEngineAdapter {
    factory: Option<Arc<dyn StreamingEngineFactory>>,
    options: EngineOptions,
    engine: Option<Box<dyn StreamingEngine>>,
    generation: EngineGeneration,
    levels: Vec<QualityLevel>,
    /// Explicit choice; `None` is automatic selection.
    selected_level: Option<usize>,
    /// Level the engine last reported switching to.
    active_level: Option<usize>,
}

impl StreamingEngineAdapter {
    pub fn new(factory: Option<Arc<dyn StreamingEngineFactory>>, options: EngineOptions) -> Self {
        Self {
            factory,
            options,
            engine: None,
            generation: 0,
            levels: Vec::new(),
            selected_level: None,
            active_level: None,
        }
    }

    /// Whether adaptive streaming is available on this host.
    pub fn is_supported(&self) -> bool {
        self.factory
            .as_ref()
            .map_or(false, |factory| factory.is_supported())
    }

    /// Release any live engine, then create, load and attach a new one.
    ///
    /// On failure the half-built instance is destroyed before returning.
    pub fn acquire(&mut self, url: &str, target: &MediaTarget) -> Result<EngineGeneration> {
        self.release();
        self.generation += 1;

        let factory = self.factory.as_ref().ok_or_else(|| PlaybackError::CapabilityMissing {
            capability: "StreamingEngineFactory".to_string(),
            message: "No streaming engine factory was provided".to_string(),
        })?;

        let mut engine = factory.create(&self.options)?;

        if let Err(e) = engine.load(url).and_then(|()| engine.attach(target)) {
            warn!(error = %e, generation = self.generation, "Engine setup failed");
            engine.destroy();
            return Err(e.into());
        }

        info!(
            generation = self.generation,
            target = target.as_str(),
            "Streaming engine attached"
        );
        self.engine = Some(engine);
        Ok(self.generation)
    }

    /// Destroy the live engine, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            debug!(generation = self.generation, "Streaming engine destroyed");
        }
        self.levels.clear();
        self.selected_level = None;
        self.active_level = None;
    }

    pub fn is_attached(&self) -> bool {
        self.engine.is_some()
    }

    pub fn generation(&self) -> EngineGeneration {
        self.generation
    }

    /// Whether `generation` names the live instance.
    pub fn is_current(&self, generation: EngineGeneration) -> bool {
        self.engine.is_some() && generation == self.generation
    }

    /// Record the levels from a parsed manifest.
    pub fn set_levels(&mut self, levels: Vec<QualityLevel>) {
        debug!(count = levels.len(), "Quality levels available");
        self.levels = levels;
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&QualityLevel> {
        self.levels.get(index)
    }

    /// Select a quality level, or automatic selection with `None`.
    pub fn set_level(&mut self, level: Option<usize>) -> Result<()> {
        if let Some(index) = level {
            if index >= self.levels.len() {
                return Err(PlaybackError::InvalidQuality {
                    index,
                    available: self.levels.len(),
                });
            }
        }

        let engine = self.engine.as_mut().ok_or(PlaybackError::NotReady)?;
        engine.set_current_level(level);
        self.selected_level = level;
        if level.is_some() {
            self.active_level = level;
        }
        Ok(())
    }

    /// Mirror a level switch reported by the engine.
    pub fn on_level_switched(&mut self, index: usize) {
        self.active_level = Some(index);
    }

    pub fn selected_level(&self) -> Option<usize> {
        self.selected_level
    }

    /// Level currently playing: the last reported switch, or the engine's
    /// own answer when none was reported yet.
    pub fn current_level(&self) -> Option<usize> {
        self.active_level
            .or_else(|| self.engine.as_ref().and_then(|engine| engine.current_level()))
    }
}

impl Drop for StreamingEngineAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StreamingEngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingEngineAdapter")
            .field("supported", &self.is_supported())
            .field("attached", &self.is_attached())
            .field("generation", &self.generation)
            .field("levels", &self.levels.len())
            .field("selected_level", &self.selected_level)
            .field("active_level", &self.active_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Engine {}

        impl StreamingEngine for Engine {
            fn load(&mut self, url: &str) -> BridgeResult<()>;
            fn attach(&mut self, target: &MediaTarget) -> BridgeResult<()>;
            fn current_level(&self) -> Option<usize>;
            fn set_current_level(&mut self, level: Option<usize>);
            fn destroy(&mut self);
        }
    }

    mock! {
        EngineFactory {}

        impl StreamingEngineFactory for EngineFactory {
            fn is_supported(&self) -> bool;
            fn create(&self, options: &EngineOptions) -> BridgeResult<Box<dyn StreamingEngine>>;
        }
    }

    fn healthy_engine() -> MockEngine {
        let mut engine = MockEngine::new();
        engine
            .expect_load()
            .with(eq("https://cdn.example.com/a/master.m3u8"))
            .times(1)
            .returning(|_| Ok(()));
        engine.expect_attach().times(1).returning(|_| Ok(()));
        engine
    }

    fn factory_with(engine: MockEngine) -> Arc<dyn StreamingEngineFactory> {
        let mut factory = MockEngineFactory::new();
        factory.expect_is_supported().return_const(true);
        factory
            .expect_create()
            .times(1)
            .return_once(move |_| Ok(Box::new(engine) as Box<dyn StreamingEngine>));
        Arc::new(factory)
    }

    fn levels() -> Vec<QualityLevel> {
        vec![
            QualityLevel::new(0, 640, 360, 800_000),
            QualityLevel::new(1, 1280, 720, 2_500_000),
        ]
    }

    #[test]
    fn test_acquire_and_release() {
        let mut engine = healthy_engine();
        engine.expect_destroy().times(1).return_const(());

        let mut adapter = StreamingEngineAdapter::new(Some(factory_with(engine)), EngineOptions::default());
        assert!(adapter.is_supported());

        let generation = adapter
            .acquire("https://cdn.example.com/a/master.m3u8", &MediaTarget::new("video-1"))
            .unwrap();
        assert_eq!(generation, 1);
        assert!(adapter.is_current(generation));
        assert!(!adapter.is_current(0));

        adapter.release();
        adapter.release();
        assert!(!adapter.is_attached());
        assert!(!adapter.is_current(generation));
    }

    #[test]
    fn test_failed_attach_destroys_engine() {
        let mut engine = MockEngine::new();
        engine.expect_load().returning(|_| Ok(()));
        engine
            .expect_attach()
            .returning(|_| Err(BridgeError::MediaRejected("detached element".to_string())));
        engine.expect_destroy().times(1).return_const(());

        let mut adapter = StreamingEngineAdapter::new(Some(factory_with(engine)), EngineOptions::default());
        let result = adapter.acquire("https://cdn.example.com/a/master.m3u8", &MediaTarget::new("v"));

        assert!(matches!(result, Err(PlaybackError::Bridge(_))));
        assert!(!adapter.is_attached());
        assert_eq!(adapter.generation(), 1);
    }

    #[test]
    fn test_missing_factory() {
        let mut adapter = StreamingEngineAdapter::new(None, EngineOptions::default());
        assert!(!adapter.is_supported());
        assert!(matches!(
            adapter.acquire("x.m3u8", &MediaTarget::new("v")),
            Err(PlaybackError::CapabilityMissing { .. })
        ));
    }

    #[test]
    fn test_set_level_validates_and_mirrors() {
        let mut engine = healthy_engine();
        engine
            .expect_set_current_level()
            .with(eq(Some(1)))
            .times(1)
            .return_const(());
        engine
            .expect_set_current_level()
            .with(eq(None))
            .times(1)
            .return_const(());
        engine.expect_destroy().return_const(());

        let mut adapter = StreamingEngineAdapter::new(Some(factory_with(engine)), EngineOptions::default());
        adapter
            .acquire("https://cdn.example.com/a/master.m3u8", &MediaTarget::new("v"))
            .unwrap();
        adapter.set_levels(levels());

        assert!(matches!(
            adapter.set_level(Some(2)),
            Err(PlaybackError::InvalidQuality { index: 2, available: 2 })
        ));

        adapter.set_level(Some(1)).unwrap();
        assert_eq!(adapter.selected_level(), Some(1));
        assert_eq!(adapter.current_level(), Some(1));

        adapter.set_level(None).unwrap();
        assert_eq!(adapter.selected_level(), None);

        adapter.on_level_switched(0);
        assert_eq!(adapter.current_level(), Some(0));
        assert_eq!(adapter.level(0).map(|l| l.display_name()), Some("360p (800kbps)".to_string()));
    }

    #[test]
    fn test_set_level_without_engine() {
        let mut adapter = StreamingEngineAdapter::new(None, EngineOptions::default());
        assert!(matches!(adapter.set_level(None), Err(PlaybackError::NotReady)));
    }

    #[test]
    fn test_drop_releases_engine() {
        let mut engine = healthy_engine();
        engine.expect_destroy().times(1).return_const(());

        let mut adapter = StreamingEngineAdapter::new(Some(factory_with(engine)), EngineOptions::default());
        adapter
            .acquire("https://cdn.example.com/a/master.m3u8", &MediaTarget::new("v"))
            .unwrap();
        drop(adapter);
    }
}
