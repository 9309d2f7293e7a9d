use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Copy config and template data next to the executable
    copy_config();
    copy_templates();
    println!("cargo:rerun-if-changed=build.rs");
}

/// Resolves target/<profile> from OUT_DIR (target/<profile>/build/au-marks-xxx/out).
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies config.json to the target directory.
fn copy_config() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let config_src = Path::new("config.json");
    if config_src.exists() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
        println!("cargo:rerun-if-changed=config.json");
    }
}

/// Copies the template library so deployments can extend it in place.
fn copy_templates() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let templates_src = Path::new("resources/templates.json");
    if templates_src.exists() {
        let dst_dir = target_dir.join("resources");
        let _ = fs::create_dir_all(&dst_dir);
        let _ = fs::copy(templates_src, dst_dir.join("templates.json"));
        println!("cargo:rerun-if-changed=resources/templates.json");
    }
}
