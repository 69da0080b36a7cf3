//! Flat mesh and material records loaded from OBJ files.

use std::io::BufRead;
use std::path::Path;

use bevy_math::Vec2;
use bevy_math::Vec3;
use bytemuck::Pod;
use bytemuck::Zeroable;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Vertex layout shared by every loaded mesh: `POSITION`, `NORMAL`,
/// `TEXCOORD`, `TANGENT`, tightly packed.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tangent: [f32; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub alpha: f32,
    pub shininess: f32,
    /// Path of the diffuse texture as written in the material file.
    pub diffuse_map: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: [0.5, 0.5, 0.5],
            specular: [0.0, 0.0, 0.0],
            alpha: 1.0,
            shininess: 0.0,
            diffuse_map: None,
        }
    }
}

impl From<&tobj::Material> for Material {
    fn from(source: &tobj::Material) -> Self {
        let defaults = Material::default();
        Self {
            diffuse: source.diffuse.unwrap_or(defaults.diffuse),
            specular: source.specular.unwrap_or(defaults.specular),
            alpha: source.dissolve.unwrap_or(defaults.alpha),
            shininess: source.shininess.unwrap_or(defaults.shininess),
            diffuse_map: source.diffuse_texture.clone().filter(|path| !path.is_empty()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub material_id: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MeshLoadError {
    #[error("unsupported mesh format {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to parse OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("no mesh data found")]
    NoMeshData,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Loads every mesh and material of the file at `path`.
pub fn load_mesh(path: &Path) -> Result<(Vec<Mesh>, Vec<Material>), MeshLoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();
    if extension != "obj" {
        return Err(MeshLoadError::UnsupportedFormat(extension));
    }

    info!(?path, "loading mesh");
    let (models, materials) = tobj::load_obj(path, &load_options())?;
    convert(models, materials)
}

/// Loads an OBJ from `reader`, resolving `mtllib` statements with
/// `material_loader`.
pub fn load_mesh_buf<B, ML>(
    reader: &mut B,
    material_loader: ML,
) -> Result<(Vec<Mesh>, Vec<Material>), MeshLoadError>
where
    B: BufRead,
    ML: Fn(&Path) -> tobj::MTLLoadResult,
{
    let (models, materials) = tobj::load_obj_buf(reader, &load_options(), material_loader)?;
    convert(models, materials)
}

fn convert(
    models: Vec<tobj::Model>,
    materials: Result<Vec<tobj::Material>, tobj::LoadError>,
) -> Result<(Vec<Mesh>, Vec<Material>), MeshLoadError> {
    if models.is_empty() {
        return Err(MeshLoadError::NoMeshData);
    }

    let mut materials: Vec<Material> = match materials {
        Ok(materials) => materials.iter().map(Material::from).collect(),
        Err(e) => {
            warn!("material library unavailable, using default material: {e}");
            Vec::new()
        }
    };

    let mut default_material = None;
    let mut meshes = Vec::with_capacity(models.len());
    for model in &models {
        let mut mesh = parse_mesh(&model.mesh, 0);
        // Point and line objects, or faces with out-of-range indices.
        if mesh.indices.is_empty() {
            warn!(name = %model.name, "skipping object without triangles");
            continue;
        }
        mesh.material_id = match model.mesh.material_id {
            Some(id) if id < materials.len() => id,
            _ => *default_material.get_or_insert_with(|| {
                materials.push(Material::default());
                materials.len() - 1
            }),
        };
        let material_id = mesh.material_id;
        debug!(
            name = %model.name,
            vertices = mesh.vertices.len(),
            indices = mesh.indices.len(),
            material_id,
            "parsed mesh"
        );
        meshes.push(mesh);
    }

    if meshes.is_empty() {
        return Err(MeshLoadError::NoMeshData);
    }
    Ok((meshes, materials))
}

fn parse_mesh(source: &tobj::Mesh, material_id: usize) -> Mesh {
    let vertex_count = source.positions.len() / 3;
    let has_normals = source.normals.len() == source.positions.len();
    let has_tex_coords = source.texcoords.len() / 2 == vertex_count;

    let mut vertices: Vec<MeshVertex> = (0..vertex_count)
        .map(|i| MeshVertex {
            position: [
                source.positions[i * 3],
                source.positions[i * 3 + 1],
                source.positions[i * 3 + 2],
            ],
            normal: if has_normals {
                [
                    source.normals[i * 3],
                    source.normals[i * 3 + 1],
                    source.normals[i * 3 + 2],
                ]
            } else {
                [0.0; 3]
            },
            tex_coord: if has_tex_coords {
                [source.texcoords[i * 2], source.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            },
            tangent: [0.0; 3],
        })
        .collect();

    let indices: Vec<u32> = source
        .indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
        .flatten()
        .copied()
        .collect();

    if !has_normals {
        compute_smooth_normals(&mut vertices, &indices);
    }
    compute_tangents(&mut vertices, &indices);

    Mesh {
        vertices,
        indices,
        material_id,
    }
}

fn triangles(indices: &[u32]) -> impl Iterator<Item = [usize; 3]> + '_ {
    indices
        .chunks_exact(3)
        .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
}

/// Area-weighted vertex normals from face geometry.
pub fn compute_smooth_normals(vertices: &mut [MeshVertex], indices: &[u32]) {
    let mut accumulated = vec![Vec3::ZERO; vertices.len()];
    for [i0, i1, i2] in triangles(indices) {
        let p0 = Vec3::from(vertices[i0].position);
        let p1 = Vec3::from(vertices[i1].position);
        let p2 = Vec3::from(vertices[i2].position);
        let face_normal = (p1 - p0).cross(p2 - p0);
        for i in [i0, i1, i2] {
            accumulated[i] += face_normal;
        }
    }
    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = normal.try_normalize().unwrap_or(Vec3::Y).to_array();
    }
}

/// Per-vertex tangents from UV gradients, made orthogonal to the normal.
pub fn compute_tangents(vertices: &mut [MeshVertex], indices: &[u32]) {
    let mut accumulated = vec![Vec3::ZERO; vertices.len()];
    for [i0, i1, i2] in triangles(indices) {
        let p0 = Vec3::from(vertices[i0].position);
        let edge1 = Vec3::from(vertices[i1].position) - p0;
        let edge2 = Vec3::from(vertices[i2].position) - p0;
        let uv0 = Vec2::from(vertices[i0].tex_coord);
        let duv1 = Vec2::from(vertices[i1].tex_coord) - uv0;
        let duv2 = Vec2::from(vertices[i2].tex_coord) - uv0;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
        for i in [i0, i1, i2] {
            accumulated[i] += tangent;
        }
    }
    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let normal = Vec3::from(vertex.normal);
        let tangent = (tangent - normal * normal.dot(tangent))
            .try_normalize()
            .unwrap_or_else(|| normal.any_orthonormal_vector());
        vertex.tangent = tangent.to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const QUAD_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
Ks 0.5 0.5 0.5
Ns 32
d 0.75
map_Kd red.png
";

    fn no_materials(_: &Path) -> tobj::MTLLoadResult {
        Err(tobj::LoadError::OpenFileFailed)
    }

    fn approx_eq(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 44);
    }

    #[test]
    fn quad_is_triangulated_with_material() {
        let (meshes, materials) = load_mesh_buf(&mut QUAD_OBJ.as_bytes(), |_| {
            tobj::load_mtl_buf(&mut QUAD_MTL.as_bytes())
        })
        .unwrap();

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.material_id, 0);

        assert_eq!(materials.len(), 1);
        let material = &materials[0];
        assert_eq!(material.diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(material.specular, [0.5, 0.5, 0.5]);
        assert_eq!(material.shininess, 32.0);
        assert_eq!(material.alpha, 0.75);
        assert_eq!(material.diffuse_map.as_deref(), Some("red.png"));
    }

    #[test]
    fn tangents_follow_u_direction() {
        let (meshes, _) = load_mesh_buf(&mut QUAD_OBJ.as_bytes(), no_materials).unwrap();
        for vertex in &meshes[0].vertices {
            assert!(approx_eq(vertex.normal, [0.0, 0.0, 1.0]));
            assert!(approx_eq(vertex.tangent, [1.0, 0.0, 0.0]), "{:?}", vertex.tangent);
        }
    }

    #[test]
    fn missing_material_library_falls_back_to_default() {
        let (meshes, materials) = load_mesh_buf(&mut QUAD_OBJ.as_bytes(), no_materials).unwrap();
        assert_eq!(materials, vec![Material::default()]);
        assert_eq!(meshes[0].material_id, 0);
        assert_eq!(materials[0].diffuse, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn normals_are_generated_when_absent() {
        let obj = "\
o tri
v 0 0 0
v 1 0 0
v 0 0 -1
f 1 2 3
";
        let (meshes, _) = load_mesh_buf(&mut obj.as_bytes(), no_materials).unwrap();
        let mesh = &meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        for vertex in &mesh.vertices {
            assert!(approx_eq(vertex.normal, [0.0, 1.0, 0.0]), "{:?}", vertex.normal);
            assert_eq!(vertex.tex_coord, [0.0, 0.0]);
            let tangent = Vec3::from(vertex.tangent);
            assert!((tangent.length() - 1.0).abs() < 1e-5);
            assert!(tangent.dot(Vec3::from(vertex.normal)).abs() < 1e-5);
        }
    }

    #[test]
    fn each_object_becomes_a_mesh() {
        let obj = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let (meshes, materials) = load_mesh_buf(&mut obj.as_bytes(), no_materials).unwrap();
        assert_eq!(meshes.len(), 2);
        assert!(meshes.iter().all(|m| m.indices.len() == 3 && m.material_id == 0));
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn empty_input_has_no_mesh_data() {
        let result = load_mesh_buf(&mut "# nothing\n".as_bytes(), no_materials);
        assert!(matches!(result, Err(MeshLoadError::NoMeshData)));
    }

    #[test]
    fn objects_without_triangles_are_skipped() {
        let obj = "\
o wire
v 0 0 0
v 1 0 0
v 1 1 0
l 1 2 3
o tri
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let (meshes, materials) = load_mesh_buf(&mut obj.as_bytes(), no_materials).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].indices.len(), 3);
        assert_eq!(meshes[0].material_id, 0);
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn points_only_has_no_mesh_data() {
        let obj = "\
v 0 0 0
v 1 0 0
p 1 2
";
        let result = load_mesh_buf(&mut obj.as_bytes(), no_materials);
        assert!(matches!(result, Err(MeshLoadError::NoMeshData)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = load_mesh(Path::new("model.fbx"));
        assert!(matches!(result, Err(MeshLoadError::UnsupportedFormat(ext)) if ext == "fbx"));
    }

    #[test]
    fn bundled_cube_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("res").join("cube.obj");
        let (meshes, materials) = load_mesh(&path).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(materials.len(), 2);
        let triangles: usize = meshes.iter().map(|m| m.indices.len() / 3).sum();
        assert_eq!(triangles, 12);
    }
}
