//! The configurator context owns the long-lived parts of the system: the frame
//! loop animations are paced by, the environment cache shared by all loads,
//! the asset loader, and the selection channel the color changer listens on.

use std::{fmt::Debug, rc::Rc};

use instant::Duration;

use crate::{
    animation::color::{ColorChangeEvent, MaterialColorChanger},
    config::Config,
    data_structures::product::ProductItem,
    error::Result,
    events::SelectionChannel,
    flow::{Clock, FrameLoop, FrameScheduler, InstantClock},
    resources::{
        environment::EnvironmentCache, io::AssetSource, AssetLoader, LoadedAssetResult,
        ModelDescriptor,
    },
};

pub struct Context<C: Clock = InstantClock> {
    pub config: Config,
    frames: Rc<FrameLoop<C>>,
    environment: Rc<EnvironmentCache>,
    loader: AssetLoader,
    selection: SelectionChannel<ColorChangeEvent>,
    color_changer: Rc<MaterialColorChanger>,
}

impl Context<InstantClock> {
    /// A context reading assets from `config.asset_root` with the wall clock.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let source: Rc<dyn AssetSource> =
            Rc::new(crate::resources::io::FileSource::new(config.asset_root.clone()));
        #[cfg(target_arch = "wasm32")]
        let source: Rc<dyn AssetSource> = Rc::new(crate::resources::io::HttpSource::from_origin(
            &config.asset_root.to_string_lossy(),
        )?);

        Ok(Self::with_source(config, source, InstantClock::new()))
    }
}

impl<C: Clock + 'static> Context<C> {
    pub fn with_source(config: Config, source: Rc<dyn AssetSource>, clock: C) -> Self {
        let frames = Rc::new(FrameLoop::new(clock));
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        let environment = Rc::new(EnvironmentCache::new(source.clone()));
        let loader = AssetLoader::new(
            source,
            environment.clone(),
            &config.environment_url,
            config.environment_intensity,
        );
        let color_changer = Rc::new(MaterialColorChanger::new(
            scheduler,
            Duration::from_millis(config.linear_duration_millis),
        ));
        let selection = SelectionChannel::new();
        color_changer.subscribe(&selection);
        log::debug!("Configurator context created with {:?}", config);

        Self {
            config,
            frames,
            environment,
            loader,
            selection,
            color_changer,
        }
    }

    pub fn frames(&self) -> &Rc<FrameLoop<C>> {
        &self.frames
    }

    pub fn scheduler(&self) -> Rc<dyn FrameScheduler> {
        self.frames.clone()
    }

    /// Advance all running animations by one frame.
    pub fn run_frame(&self) -> usize {
        self.frames.run_frame()
    }

    pub fn environment(&self) -> &Rc<EnvironmentCache> {
        &self.environment
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn color_changer(&self) -> &Rc<MaterialColorChanger> {
        &self.color_changer
    }

    pub fn selection(&self) -> &SelectionChannel<ColorChangeEvent> {
        &self.selection
    }

    pub async fn load_asset(&self, descriptor: &ModelDescriptor) -> Result<LoadedAssetResult> {
        self.loader.load_asset(descriptor).await
    }

    /// Load all `descriptors` concurrently and add them to `product`.
    ///
    /// Nothing is added unless every load succeeds.
    pub async fn load_product(
        &self,
        product: &mut ProductItem,
        descriptors: &[ModelDescriptor],
    ) -> Result<()> {
        let assets = futures::future::try_join_all(
            descriptors
                .iter()
                .map(|descriptor| self.loader.load_asset(descriptor)),
        )
        .await?;
        log::info!("Loaded {} asset(s) for {}", assets.len(), product.name);
        for asset in assets {
            product.add_asset(asset);
        }
        Ok(())
    }

    /// Publish a color selection. The color changer receives it before this
    /// returns.
    pub fn select_color(&self, event: &ColorChangeEvent) -> usize {
        self.selection.publish(event)
    }
}

impl<C: Clock> Debug for Context<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("frames", &self.frames)
            .field("environment", &self.environment)
            .field("selection", &self.selection)
            .finish()
    }
}
