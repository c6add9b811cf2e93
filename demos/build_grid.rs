//! Bakes a painted grid of tiles into chunk meshes and renders the result.
//!
//! Tiles are authored slightly apart; building snaps them back together and
//! the smooth region in the middle gets blended normals.

use bevy::prelude::*;
use bevy_tile_baker::prelude::*;

const ROWS: usize = 12;
const COLUMNS: usize = 12;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(TileBakePlugin::<Handle<StandardMaterial>>::new(
            BuildSettings::default()
                .with_combine_method(CombineMethod::CustomChunkInTiles)
                .with_combine_chunk_size(6, 6)
                .with_vertex_snapping(true, 0.002),
        ))
        .add_systems(Startup, setup)
        .run();
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<BuildSettings>,
    mut scratch: ResMut<BuildScratch<Handle<StandardMaterial>>>,
) {
    let grass = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.6, 0.25),
        ..default()
    });
    let stone = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.55, 0.6),
        ..default()
    });

    let tile_mesh = match SourceMesh::try_from(&Mesh::from(Rectangle::new(1.0, 1.0))) {
        Ok(mesh) => mesh,
        Err(err) => {
            error!("Tile mesh is not usable: {err}");
            return;
        }
    };

    let grid = GridGeometry::new(ROWS, COLUMNS).with_chunk_size(4, 4);
    let mut system = TileSystem::new("demo", grid).with_settings(settings.clone());

    for row in 0..ROWS {
        for column in 0..COLUMNS {
            let coord = TileCoord::new(row, column);
            let material = if (row / 3 + column / 3) % 2 == 0 {
                grass.clone()
            } else {
                stone.clone()
            };

            // Sub-threshold gaps between neighbors, closed again by snapping.
            let jitter = Vec3::new(0.0005 * (row % 2) as f32, 0.0005 * (column % 2) as f32, 0.0);
            let placement = Mat4::from_translation(system.grid.cell_center(coord) + jitter);

            let smooth = (4..8).contains(&row) && (4..8).contains(&column);
            system.set_tile(
                coord,
                TileInput::new()
                    .with_part(TileMeshPart::new(tile_mesh.clone(), vec![material]).with_transform(placement))
                    .with_smooth(smooth),
            );
        }
    }

    let output = match TileSystemBuilder::new(&mut system, &mut scratch).build(&mut NoProgress) {
        Ok(output) => output,
        Err(err) => {
            error!("Failed to bake the demo grid: {err}");
            return;
        }
    };
    info!(
        "Baked {} tiles into {} renderers ({} triangles)",
        output.merged_tiles.len(),
        output.renderers.len(),
        output.triangle_count()
    );

    // Tiles are laid out in the XY plane; lay the grid flat and center it.
    let root = commands
        .spawn((
            Transform::from_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2))
                .with_translation(Vec3::new(-(COLUMNS as f32) * 0.5, 0.0, -(ROWS as f32) * 0.5)),
            Visibility::default(),
        ))
        .id();

    for renderer in &output.renderers {
        let combined = &output.meshes[renderer.mesh];
        for (material, mesh) in combined.to_submesh_meshes() {
            commands.spawn((
                Mesh3d(meshes.add(mesh)),
                MeshMaterial3d(material.clone()),
                renderer.local_transform,
                ChildOf(root),
            ));
        }
    }

    // Add a light
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Spawn camera
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 12.0, 14.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
