//! The build state machine.

use std::collections::HashSet;
use std::fmt;

use bevy::log::{debug, error, info, warn};

use super::chunks::{ChunkEmit, merge_chunk};
use super::colliders::reduce_box_colliders;
use super::extract::extract_row;
use super::procedural::{generate_procedural_meshes, procedural_tile_count};
use super::progress::ProgressTracker;
use super::stripping::plan_stripping;
use super::{
    BuildError, BuildNotice, BuildOutput, BuildProgress, BuildScratch, ProceduralRenderer,
    RendererContainer, TileSystem,
};
use crate::grid::{CombinePlan, TileMeshMap};
use crate::mesh::MaterialKey;
use crate::snap::snap_and_smooth_row;

/// Steps of a build, in the order they run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BuildState {
    #[default]
    Idle,
    ReduceColliders,
    ExtractTileMeshes,
    SnapAndSmooth,
    MergeIntoChunks,
    HandleProceduralMeshes,
    ApplyStrippingRules,
    Built,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ReduceColliders => "reduce colliders",
            Self::ExtractTileMeshes => "extract tile meshes",
            Self::SnapAndSmooth => "snap and smooth",
            Self::MergeIntoChunks => "merge into chunks",
            Self::HandleProceduralMeshes => "handle procedural meshes",
            Self::ApplyStrippingRules => "apply stripping rules",
            Self::Built => "built",
        };
        f.write_str(name)
    }
}

/// Builds one tile system.
///
/// ```ignore
/// let mut builder = TileSystemBuilder::new(&mut system, &mut scratch);
/// let result = builder.build(&mut |_: &str, message: &str, fraction: f32| {
///     info!("{message} ({:.0}%)", fraction * 100.0);
///     false
/// });
/// if result.is_err() {
///     warn!("build stopped during {}", builder.state());
/// }
/// ```
///
/// A failed or cancelled build is not rolled back: the tile system keeps
/// `is_built == false` and may be built again.
pub struct TileSystemBuilder<'a, M: MaterialKey> {
    system: &'a mut TileSystem<M>,
    scratch: &'a mut BuildScratch<M>,
    plan: Option<CombinePlan>,
    state: BuildState,
}

impl<'a, M: MaterialKey> TileSystemBuilder<'a, M> {
    pub fn new(system: &'a mut TileSystem<M>, scratch: &'a mut BuildScratch<M>) -> Self {
        let settings = &system.settings;
        let plan = CombinePlan::new(
            settings.combine_method,
            &system.grid,
            settings.combine_chunk_width,
            settings.combine_chunk_height,
        );
        Self {
            system,
            scratch,
            plan,
            state: BuildState::Idle,
        }
    }

    /// Current state. After a failed build this is the state it stopped in.
    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn combine_plan(&self) -> Option<&CombinePlan> {
        self.plan.as_ref()
    }

    /// Number of progress steps a build reports.
    pub fn total_tasks(&self) -> usize {
        let colliders = usize::from(self.system.settings.reduce_box_colliders);
        let merging = self
            .plan
            .map_or(0, |plan| 2 * self.system.grid.row_count + plan.chunk_count());
        colliders + merging + 2
    }

    /// Runs every step and returns what the host needs to apply.
    pub fn build(&mut self, progress: &mut dyn BuildProgress) -> Result<BuildOutput<M>, BuildError> {
        if self.system.is_built {
            return Err(BuildError::AlreadyBuilt);
        }
        self.system.validate_grid()?;

        info!(
            "Building tile system '{}' ({}x{} tiles)",
            self.system.name, self.system.grid.row_count, self.system.grid.column_count
        );

        let total = self.total_tasks();
        let title = format!("Building {}", self.system.name);
        let mut tracker = ProgressTracker::new(progress, title, total);
        let mut output = BuildOutput::default();
        self.scratch.assembler.reset();

        if self.system.settings.reduce_box_colliders {
            self.enter(BuildState::ReduceColliders);
            tracker.step(self.state, "Reducing box colliders")?;
            let (colliders, replaced) = reduce_box_colliders(self.system);
            debug!(
                "{}: {} box colliders reduced to {}",
                self.system.name,
                replaced.len(),
                colliders.len()
            );
            output.reduced_colliders = colliders;
            output.replaced_colliders = replaced;
        }

        if let Some(plan) = self.plan {
            self.merge_tiles(&plan, &mut tracker, &mut output)?;
        }

        self.enter(BuildState::HandleProceduralMeshes);
        tracker.step(self.state, "Handling procedural meshes")?;
        let mut stripping = self.system.settings.stripping.normalized();
        let procedural = procedural_tile_count(self.system);
        if procedural > 0 {
            if self.system.settings.pre_generate_procedural {
                for baked in generate_procedural_meshes(self.system)? {
                    output.procedural_renderers.push(ProceduralRenderer {
                        chunk: baked.chunk,
                        mesh: output.meshes.len(),
                        materials: baked.mesh.materials().cloned().collect(),
                    });
                    output.meshes.push(baked.mesh);
                }
            } else {
                let (retained, changed) = stripping.retain_procedural_data();
                if changed {
                    let notice = BuildNotice::ProceduralDataRetained {
                        tile_count: procedural,
                        requested: stripping,
                        effective: retained,
                    };
                    warn!("{}: {}", self.system.name, notice);
                    output.notices.push(notice);
                }
                stripping = retained;
            }
        }

        self.enter(BuildState::ApplyStrippingRules);
        tracker.step(self.state, "Applying stripping rules")?;
        let containers: HashSet<_> = output
            .renderers
            .iter()
            .filter_map(|renderer| match renderer.container {
                RendererContainer::StorageChunk(coord) => Some(coord),
                RendererContainer::New { .. } => None,
            })
            .collect();
        output.stripping = plan_stripping(
            stripping,
            self.system,
            &output.merged_tiles,
            self.system.settings.reduce_box_colliders,
            &containers,
        );

        debug_assert_eq!(tracker.done(), total);

        self.enter(BuildState::Built);
        self.system.is_built = true;
        info!(
            "Built tile system '{}': {} renderers, {} triangles, {} tiles merged",
            self.system.name,
            output.renderers.len(),
            output.triangle_count(),
            output.merged_tiles.len()
        );

        Ok(output)
    }

    /// Extraction, snapping and chunk merging.
    fn merge_tiles(
        &mut self,
        plan: &CombinePlan,
        tracker: &mut ProgressTracker<'_>,
        output: &mut BuildOutput<M>,
    ) -> Result<(), BuildError> {
        let rows = self.system.grid.row_count;
        let mut map = TileMeshMap::for_grid(&self.system.grid);

        self.enter(BuildState::ExtractTileMeshes);
        for row in 0..rows {
            tracker.step(self.state, &format!("Extracting row {} of {}", row + 1, rows))?;
            extract_row(
                self.system,
                row,
                &mut map,
                &mut self.scratch.assembler,
                &mut output.merged_tiles,
            )?;
        }

        self.enter(BuildState::SnapAndSmooth);
        let snap = self.system.settings.snap_settings();
        for row in 0..rows {
            tracker.step(self.state, &format!("Snapping row {} of {}", row + 1, rows))?;
            snap_and_smooth_row(&mut map, row, &snap, &mut self.scratch.cluster);
        }

        self.enter(BuildState::MergeIntoChunks);
        let emit = ChunkEmit {
            system_name: &self.system.name,
            world_to_local: &self.system.world_to_local,
            combine_into_submeshes: self.system.settings.combine_into_submeshes,
            reuse_storage_container: plan.can_reuse_storage_container,
        };
        for chunk in plan.chunks(&self.system.grid) {
            tracker.step(self.state, &format!("Merging chunk {}", chunk.coord))?;
            merge_chunk(&chunk, &map, &mut self.scratch.assembler, emit, output);
        }

        Ok(())
    }

    fn enter(&mut self, state: BuildState) {
        debug!("{}: {} -> {}", self.system.name, self.state, state);
        self.state = state;
    }
}

/// Builds several tile systems in order.
///
/// A failed system is logged and skipped. Cancellation stops the batch; the
/// cancelled system is the last entry of the result.
pub fn build_tile_systems<M: MaterialKey>(
    systems: &mut [TileSystem<M>],
    scratch: &mut BuildScratch<M>,
    progress: &mut dyn BuildProgress,
) -> Vec<(String, Result<BuildOutput<M>, BuildError>)> {
    let mut results = Vec::with_capacity(systems.len());

    for system in systems.iter_mut() {
        let name = system.name.clone();
        let result = TileSystemBuilder::new(system, scratch).build(progress);

        let cancelled = match &result {
            Err(err) if err.is_cancelled() => {
                info!("Build of tile system '{}' cancelled", name);
                true
            }
            Err(err) => {
                error!("Failed to build tile system '{}': {}", name, err);
                false
            }
            Ok(_) => false,
        };

        results.push((name, result));
        if cancelled {
            break;
        }
    }

    results
}
