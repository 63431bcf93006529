//! Check system capabilities.

use dispviz_common::config::{config_file_path, AppConfig};
use dispviz_render_engine::{FfmpegBackend, RenderBackend, FFMPEG_ENV};

pub fn run(write_config: bool, config: &AppConfig) -> anyhow::Result<()> {
    println!("dispviz System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = FfmpegBackend::new();
    let ffmpeg_ok = ffmpeg.is_available();
    if ffmpeg_ok {
        println!("[OK] Encoder: {}", ffmpeg.binary());
    } else {
        println!(
            "[MISSING] Encoder: {} (install ffmpeg or set {FFMPEG_ENV})",
            ffmpeg.binary()
        );
    }
    println!("[OK] Raw RGB24 output (--raw)");

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else if write_config {
        config.save()?;
        println!("[OK] Config: {} (written)", config_path.display());
    } else {
        println!("[INFO] Config: {} (not found, using defaults)", config_path.display());
    }

    println!();
    if ffmpeg_ok {
        println!("All required capabilities are available. dispviz is ready.");
    } else {
        println!("Video encoding is unavailable. Only --raw renders will work.");
    }

    Ok(())
}
