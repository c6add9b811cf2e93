//! Host-supplied description of a tile system.

use bevy::math::Mat4;

use super::{BuildError, BuildSettings, ProceduralTile};
use crate::grid::{GridGeometry, TileCoord};
use crate::mesh::{MaterialKey, SourceMesh};

/// One rendered sub-object of a tile.
#[derive(Clone, Debug)]
pub struct TileMeshPart<M> {
    pub mesh: SourceMesh,
    /// Material of each submesh. Submeshes without an entry are not drawn.
    pub materials: Vec<M>,
    /// Placement of the part in world space. Merged chunks are brought back
    /// into tile-system space by [`TileSystem::world_to_local`].
    pub local_to_world: Mat4,
}

impl<M> TileMeshPart<M> {
    pub fn new(mesh: SourceMesh, materials: Vec<M>) -> Self {
        Self {
            mesh,
            materials,
            local_to_world: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, local_to_world: Mat4) -> Self {
        self.local_to_world = local_to_world;
        self
    }
}

/// Build-relevant data of one occupied cell.
#[derive(Clone, Debug)]
pub struct TileInput<M> {
    pub parts: Vec<TileMeshPart<M>>,
    /// Blend normals with neighboring smooth tiles.
    pub smooth: bool,
    /// Non-static tiles keep their own objects and are never merged.
    pub is_static: bool,
    pub procedural: Option<ProceduralTile<M>>,
    /// The tile carries a box collider that may be reduced.
    pub box_collider: bool,
}

impl<M> Default for TileInput<M> {
    fn default() -> Self {
        Self {
            parts: Vec::new(),
            smooth: false,
            is_static: true,
            procedural: None,
            box_collider: false,
        }
    }
}

impl<M> TileInput<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_part(mut self, part: TileMeshPart<M>) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_procedural(mut self, procedural: ProceduralTile<M>) -> Self {
        self.procedural = Some(procedural);
        self
    }

    pub fn with_box_collider(mut self, box_collider: bool) -> Self {
        self.box_collider = box_collider;
        self
    }

    /// Whether the tile's parts are merged into chunk meshes.
    pub fn contributes_mesh(&self) -> bool {
        self.is_static && !self.parts.is_empty()
    }
}

/// A grid of tiles plus the settings to build it with.
#[derive(Clone, Debug)]
pub struct TileSystem<M> {
    pub name: String,
    pub grid: GridGeometry,
    /// Correction applied once to every merged chunk.
    pub world_to_local: Mat4,
    pub settings: BuildSettings,
    /// Row-major, one slot per cell.
    pub tiles: Vec<Option<TileInput<M>>>,
    /// Set once a build completes.
    pub is_built: bool,
}

impl<M: MaterialKey> TileSystem<M> {
    /// Create an empty tile system over `grid`.
    pub fn new(name: impl Into<String>, grid: GridGeometry) -> Self {
        let tiles = (0..grid.tile_count()).map(|_| None).collect();
        Self {
            name: name.into(),
            grid,
            world_to_local: Mat4::IDENTITY,
            settings: BuildSettings::default(),
            tiles,
            is_built: false,
        }
    }

    pub fn with_settings(mut self, settings: BuildSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_world_to_local(mut self, world_to_local: Mat4) -> Self {
        self.world_to_local = world_to_local;
        self
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&TileInput<M>> {
        if !self.grid.contains(coord) {
            return None;
        }
        self.tiles
            .get(self.grid.index_of(coord))
            .and_then(Option::as_ref)
    }

    /// Place a tile.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is outside the grid.
    pub fn set_tile(&mut self, coord: TileCoord, tile: TileInput<M>) {
        assert!(
            self.grid.contains(coord),
            "Tile {} is outside the {}x{} grid",
            coord,
            self.grid.row_count,
            self.grid.column_count
        );
        let index = self.grid.index_of(coord);
        self.tiles[index] = Some(tile);
    }

    pub fn clear_tile(&mut self, coord: TileCoord) -> Option<TileInput<M>> {
        if !self.grid.contains(coord) {
            return None;
        }
        let index = self.grid.index_of(coord);
        self.tiles[index].take()
    }

    /// Occupied cells in row-major order.
    pub fn occupied_tiles(&self) -> impl Iterator<Item = (TileCoord, &TileInput<M>)> {
        let grid = &self.grid;
        self.tiles
            .iter()
            .enumerate()
            .filter_map(move |(index, tile)| tile.as_ref().map(|tile| (grid.coord_of(index), tile)))
    }

    /// Checks that the grid and tile array are consistent.
    pub fn validate_grid(&self) -> Result<(), BuildError> {
        let grid = &self.grid;
        if grid.chunk_width == 0 || grid.chunk_height == 0 {
            return Err(BuildError::InvalidGrid {
                reason: format!(
                    "storage chunk size {}x{} must be non-zero",
                    grid.chunk_width, grid.chunk_height
                ),
            });
        }
        if self.tiles.len() != grid.tile_count() {
            return Err(BuildError::InvalidGrid {
                reason: format!(
                    "{} tile slots for a {}x{} grid",
                    self.tiles.len(),
                    grid.row_count,
                    grid.column_count
                ),
            });
        }
        Ok(())
    }
}
