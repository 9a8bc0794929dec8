//! glTF / GLB mesh extraction
//!
//! Only what the sampler needs is read: the first mesh node of the default
//! scene (depth-first), its first triangle primitive, morph-target position
//! deltas, and the first animation's morph-weight channel for that node.

use super::SurfaceAsset;
use crate::animation::{Interpolation, MorphClip};
use crate::error::{Result, SpiritError};
use crate::mesh::MeshSource;
use glam::{Mat4, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Property;
use gltf::mesh::Mode;
use std::path::Path;

/// Load a `.gltf` or `.glb` file
pub fn load_gltf(path: impl AsRef<Path>) -> Result<SurfaceAsset> {
    let path = path.as_ref();
    tracing::info!("Loading mesh asset from {}", path.display());
    let (document, buffers, _) = gltf::import(path)
        .map_err(|e| SpiritError::Asset(format!("{}: {}", path.display(), e)))?;
    extract(&document, &buffers)
}

/// Load a GLB (or embedded glTF) from memory
pub fn load_gltf_slice(bytes: &[u8]) -> Result<SurfaceAsset> {
    let (document, buffers, _) =
        gltf::import_slice(bytes).map_err(|e| SpiritError::Asset(e.to_string()))?;
    extract(&document, &buffers)
}

fn extract(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<SurfaceAsset> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| SpiritError::Asset("no mesh found".into()))?;

    let (node, world) = scene
        .nodes()
        .find_map(|root| find_mesh_node(root, Mat4::IDENTITY))
        .ok_or_else(|| SpiritError::Asset("no mesh found".into()))?;

    // find_mesh_node only returns nodes with a mesh
    let Some(mesh) = node.mesh() else {
        return Err(SpiritError::Asset("no mesh found".into()));
    };

    let primitive = mesh
        .primitives()
        .find(|p| p.mode() == Mode::Triangles)
        .ok_or_else(|| {
            SpiritError::InvalidMesh(format!(
                "mesh '{}' has no triangle primitive",
                mesh.name().unwrap_or("unnamed")
            ))
        })?;

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| SpiritError::InvalidMesh("primitive has no POSITION attribute".into()))?
        .map(Vec3::from)
        .collect();

    let name = node
        .name()
        .or_else(|| mesh.name())
        .unwrap_or("mesh")
        .to_string();

    let mut source = MeshSource::new(positions).with_name(name).with_transform(world);
    if let Some(indices) = reader.read_indices() {
        source = source.with_indices(indices.into_u32().collect());
    }

    for (target, (deltas, _, _)) in reader.read_morph_targets().enumerate() {
        let deltas: Vec<Vec3> = match deltas {
            Some(deltas) => deltas.map(Vec3::from).collect(),
            None => {
                tracing::debug!("Morph target {} has no position deltas", target);
                vec![Vec3::ZERO; source.vertex_count()]
            }
        };
        source = source.with_morph_target(deltas);
    }

    if let Some(weights) = node.weights().or_else(|| mesh.weights()) {
        source.set_influences(weights);
    }
    source.validate()?;

    tracing::info!(
        "Mesh '{}': {} vertices, {} triangles, {} morph targets",
        source.name,
        source.vertex_count(),
        source.triangle_count(),
        source.morph_target_count()
    );

    let clip = read_morph_clip(document, buffers, node.index(), source.morph_target_count())?;
    if let Some(clip) = &clip {
        tracing::info!(
            "Animation '{}': {} keyframes over {:.3}s",
            clip.name,
            clip.keyframe_count(),
            clip.duration()
        );
    }

    Ok(SurfaceAsset { mesh: source, clip })
}

/// Depth-first search for the first node carrying a mesh, with its world matrix
fn find_mesh_node(node: gltf::Node<'_>, parent: Mat4) -> Option<(gltf::Node<'_>, Mat4)> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if node.mesh().is_some() {
        return Some((node, world));
    }
    node.children().find_map(|child| find_mesh_node(child, world))
}

/// Morph weights channel of animation 0 targeting `node_index`
fn read_morph_clip(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    node_index: usize,
    target_count: usize,
) -> Result<Option<MorphClip>> {
    let Some(animation) = document.animations().next() else {
        return Ok(None);
    };
    if target_count == 0 {
        tracing::warn!("Animation present but the mesh has no morph targets");
        return Ok(None);
    }

    let channel = animation.channels().find(|channel| {
        let target = channel.target();
        target.node().index() == node_index && target.property() == Property::MorphTargetWeights
    });
    let Some(channel) = channel else {
        tracing::warn!("First animation does not drive the mesh's morph weights");
        return Ok(None);
    };

    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
    let times: Vec<f32> = reader
        .read_inputs()
        .ok_or_else(|| SpiritError::Asset("animation sampler has no input times".into()))?
        .collect();
    let values: Vec<f32> = match reader.read_outputs() {
        Some(ReadOutputs::MorphTargetWeights(weights)) => weights.into_f32().collect(),
        _ => {
            return Err(SpiritError::Asset(
                "morph weight channel has no weight output".into(),
            ))
        }
    };

    let interpolation = match channel.sampler().interpolation() {
        gltf::animation::Interpolation::Step => Interpolation::Step,
        gltf::animation::Interpolation::Linear => Interpolation::Linear,
        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
    };

    let name = animation.name().unwrap_or("animation 0");
    MorphClip::new(name, times, values, target_count, interpolation).map(Some)
}
