use std::path::PathBuf;

use clap::Parser;
use lightmap_pass::{Vec3, ViewerConfig, run_viewer};

/// Shows a lightmapped POL model spinning in front of the camera.
#[derive(Parser, Debug)]
#[command(name = "lightmap-viewer", version, about)]
struct Args {
    /// Model file to show
    model: PathBuf,

    /// Window width
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Window height
    #[arg(long, default_value_t = 768)]
    height: u32,

    /// Spin speed in radians per second
    #[arg(long)]
    spin: Option<f32>,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 45.0)]
    fov: f32,

    /// Initial model translation as x,y,z
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<Vec3>,
}

fn parse_offset(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z, got {:?}", s));
    }

    let mut xyz = [0.0f32; 3];
    for (slot, part) in xyz.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid component {:?}: {}", part, e))?;
    }
    Ok(Vec3::from_array(xyz))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ViewerConfig::new()
        .title(format!("Lightmap Viewer - {}", args.model.display()))
        .size(args.width, args.height)
        .fov(args.fov);
    if let Some(spin) = args.spin {
        config = config.spin_speed(spin);
    }
    if let Some(offset) = args.offset {
        config = config.model_offset(offset);
    }

    if let Err(e) = run_viewer(config, &args.model) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
