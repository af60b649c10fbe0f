//! Build command - generates the static site

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use color_eyre::eyre::{Result, WrapErr};
use numark_generator::{BuildMode, BuildStats, Builder};

use super::load_config;

/// Run the build command.
///
/// `output` overrides the configured output directory and, when relative,
/// is taken from the working directory. `drafts` builds in development mode
/// so drafts are rendered.
pub fn run(config_path: &Path, output: Option<&Path>, drafts: bool) -> Result<BuildStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, drafts, "Starting build");

    let mut config = load_config(config_path)?;

    if let Some(output) = output {
        let cwd = std::env::current_dir().wrap_err("Failed to read the working directory")?;
        config.output_dir = resolve_output(output, &cwd).to_string_lossy().into_owned();
    }
    let output_dir = config.output_path();

    let mut builder = Builder::new(config);
    if drafts {
        builder = builder.with_mode(BuildMode::Development);
    }

    let stats = builder.build().wrap_err("Build failed")?;
    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Pages:        {}", stats.pages);
    println!("  Index pages:  {}", stats.index_pages);
    println!("  Assets:       {}", stats.assets);
    if stats.render_errors > 0 {
        println!("  Errors:       {} (see error pages)", stats.render_errors);
    }
    println!();
    println!("  Duration:     {:.2}s", duration.as_secs_f64());
    println!("  Output:       {}", output_dir.display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}

/// An `--output` path as typed on the command line, made absolute.
fn resolve_output(output: &Path, cwd: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        cwd.join(output)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_build_with_output_override() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("numark.toml");
        fs::write(&config_path, "title = \"Site\"\noptimize_images = false\n").unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("content/hello.md"), "---\ntitle: Hello\n---\nHi\n").unwrap();
        fs::write(
            dir.path().join("content/draft.md"),
            "---\ntitle: Draft\ndraft: true\n---\nLater\n",
        )
        .unwrap();

        let stats = run(&config_path, Some(&dir.path().join("out")), false).unwrap();
        assert_eq!(stats.pages, 1);
        assert!(dir.path().join("out/hello/index.html").exists());
        assert!(!dir.path().join("dist").exists());

        let stats = run(&config_path, Some(&dir.path().join("out")), true).unwrap();
        assert_eq!(stats.pages, 2);
        assert!(dir.path().join("out/draft/index.html").exists());
    }

    #[test]
    fn test_relative_output_is_taken_from_working_directory() {
        let cwd = Path::new("/home/user/work");
        assert_eq!(
            resolve_output(Path::new("public"), cwd),
            PathBuf::from("/home/user/work/public")
        );
        assert_eq!(resolve_output(Path::new("/srv/www"), cwd), PathBuf::from("/srv/www"));
    }
}
