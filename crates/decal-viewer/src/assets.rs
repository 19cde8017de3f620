//! Mesh and decal-image loading.

use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec2, Vec3};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use texspace_decals::{DecalImage, Mesh, SubMesh, Vertex};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "bmp"];

/// Loads every model of an OBJ file as one mesh, one submesh per model.
/// Normals are rebuilt from faces when the file carries none.
pub fn load_mesh(path: &Path) -> Result<Mesh> {
    let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("Failed to read OBJ '{}'", path.display()))?;
    if models.is_empty() {
        bail!("OBJ '{}' contains no models", path.display());
    }

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut submeshes = Vec::with_capacity(models.len());
    let mut missing_normals = false;

    for model in &models {
        let m = &model.mesh;
        let count = m.positions.len() / 3;
        if m.texcoords.len() / 2 != count {
            bail!(
                "Model '{}' in '{}' has no per-vertex UVs; texture-space decals need them",
                model.name,
                path.display()
            );
        }
        missing_normals |= m.normals.len() / 3 != count;

        submeshes.push(SubMesh {
            base_index: indices.len() as u32,
            index_count: m.indices.len() as u32,
            base_vertex: vertices.len() as u32,
        });

        for i in 0..count {
            let p = Vec3::new(m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]);
            let n = if m.normals.len() / 3 == count {
                Vec3::new(m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2])
            } else {
                Vec3::ZERO
            };
            let uv = Vec2::new(m.texcoords[2 * i], m.texcoords[2 * i + 1]);
            vertices.push(Vertex::new(p, n, uv));
        }
        indices.extend_from_slice(&m.indices);
    }

    let mut mesh = Mesh::new(vertices, indices, submeshes)
        .with_context(|| format!("Invalid mesh in '{}'", path.display()))?;
    if missing_normals {
        log::debug!("'{}' has no normals; computing face-weighted normals", path.display());
        mesh.recompute_normals();
    }

    log::info!(
        "Loaded mesh '{}': {} vertices, {} triangles, {} submeshes",
        path.display(),
        mesh.vertices().len(),
        mesh.triangle_count(),
        mesh.submeshes().len()
    );
    Ok(mesh)
}

pub fn load_decal(path: &Path) -> Result<DecalImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open decal image '{}'", path.display()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    DecalImage::from_rgba8(w, h, img.as_raw())
        .with_context(|| format!("Invalid decal image '{}'", path.display()))
}

/// Image files under `root`, sorted so catalog indices are stable.
pub fn scan_decal_dir(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Loads the decal catalog: the explicit list if given, otherwise every image
/// found under `dir`. Unreadable files are skipped with a warning.
pub fn load_catalog(explicit: &[PathBuf], dir: &Path) -> Result<Vec<(String, DecalImage)>> {
    let paths = if explicit.is_empty() {
        scan_decal_dir(dir)
    } else {
        explicit.to_vec()
    };
    if paths.is_empty() {
        return Err(anyhow!("No decal images found in '{}'", dir.display()));
    }

    log::info!("Loading {} decal images...", paths.len());
    let loaded: Vec<_> = paths
        .par_iter()
        .map(|p| (p, load_decal(p)))
        .collect();

    let mut catalog = Vec::with_capacity(loaded.len());
    for (path, result) in loaded {
        match result {
            Ok(img) => {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("decal")
                    .to_string();
                log::debug!("Decal '{}': {}x{}", name, img.width(), img.height());
                catalog.push((name, img));
            }
            Err(e) => log::warn!("{:#}", e),
        }
    }

    if catalog.is_empty() {
        bail!("None of the {} decal images could be loaded", paths.len());
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("decal_viewer_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn obj_quad_loads_with_uvs_and_normals() {
        let dir = scratch_dir("obj");
        let path = dir.join("quad.obj");
        fs::write(
            &path,
            "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             f 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        for v in mesh.vertices() {
            assert!((Vec3::from_array(v.normal) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn obj_without_uvs_is_rejected() {
        let dir = scratch_dir("nouv");
        let path = dir.join("tri.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert!(load_mesh(&path).is_err());
    }

    #[test]
    fn catalog_scans_images_in_order() {
        let dir = scratch_dir("catalog");
        for (name, w, h) in [("b", 2, 4), ("a", 3, 3)] {
            image::RgbaImage::from_pixel(w, h, image::Rgba([255, 0, 0, 255]))
                .save(dir.join(format!("{name}.png")))
                .unwrap();
        }
        fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let catalog = load_catalog(&[], &dir).unwrap();
        let names: Vec<_> = catalog.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(catalog[1].1.aspect(), 2.0);
    }
}
