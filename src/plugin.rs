//! Plugin exposing build settings and scratch memory as resources.
use std::marker::PhantomData;

use bevy::prelude::*;

use crate::build::{BuildScratch, BuildSettings};
use crate::mesh::MaterialKey;

/// Plugin that prepares an app for baking tile systems.
///
/// This plugin registers:
/// - [`BuildSettings`] as the default settings for new tile systems
/// - [`BuildScratch`] so systems can build without reallocating
///
/// `M` is the material reference type carried by tile meshes.
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_tile_baker::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(TileBakePlugin::<Handle<StandardMaterial>>::default())
///     .run();
/// ```
pub struct TileBakePlugin<M> {
    pub settings: BuildSettings,
    _material: PhantomData<fn() -> M>,
}

impl<M> Default for TileBakePlugin<M> {
    fn default() -> Self {
        Self::new(BuildSettings::default())
    }
}

impl<M> TileBakePlugin<M> {
    pub fn new(settings: BuildSettings) -> Self {
        Self {
            settings,
            _material: PhantomData,
        }
    }
}

impl<M: MaterialKey> Plugin for TileBakePlugin<M> {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .init_resource::<BuildScratch<M>>();
    }
}
