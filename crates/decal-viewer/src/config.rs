use clap::Parser;
use std::path::PathBuf;
use texspace_decals::DecalConfig;

/// `decal_viewer` - paints texture-space decals onto a mesh.
///
/// Left click stamps a decal where the cursor hits the mesh. Hold the right
/// mouse button (or Space) to look around, WASD to fly, G to toggle the panel.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Wavefront OBJ mesh to paint. Every vertex needs a UV in [0, 1].
    #[arg(long, env = "DECAL_MESH", default_value = "assets/mesh/teapot_smooth.obj")]
    pub mesh: PathBuf,

    /// Decal images. When empty, every image under `--decal-dir` is used.
    #[arg(long = "decal", env = "DECAL_IMAGES", value_delimiter = ',')]
    pub decals: Vec<PathBuf>,

    /// Directory scanned for decal images (png, jpg, tga).
    #[arg(long, env = "DECAL_DIR", default_value = "assets/texture")]
    pub decal_dir: PathBuf,

    /// Albedo canvas resolution; must be a power of two.
    #[arg(long, env = "DECAL_CANVAS_SIZE", default_value_t = texspace_decals::config::DEFAULT_CANVAS_SIZE)]
    pub canvas_size: u32,

    /// Projector occlusion-map resolution.
    #[arg(long, env = "DECAL_OCCLUSION_SIZE", default_value_t = texspace_decals::config::DEFAULT_OCCLUSION_SIZE)]
    pub occlusion_size: u32,

    /// Seed for randomized decal parameters; entropy when unset.
    #[arg(long, env = "DECAL_SEED")]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

impl Config {
    pub fn decal_config(&self) -> DecalConfig {
        DecalConfig {
            canvas_size: self.canvas_size,
            occlusion_size: self.occlusion_size,
            ..DecalConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cfg = Config::parse_from(["decal_viewer"]);
        assert_eq!(cfg.canvas_size, 4096);
        assert_eq!(cfg.occlusion_size, 512);
        assert!(cfg.decals.is_empty());
        assert!(cfg.decal_config().validate().is_ok());
    }

    #[test]
    fn decal_list_splits_on_commas() {
        let cfg = Config::parse_from(["decal_viewer", "--decal", "a.png,b.png", "--seed", "9"]);
        assert_eq!(cfg.decals, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(cfg.seed, Some(9));
    }
}
