//! New command - create new content from a template

use std::{fs, path::{Path, PathBuf}};

use chrono::Utc;
use clap::ValueEnum;
use color_eyre::eyre::{Result, WrapErr, bail};
use numark_core::slugify;

use super::load_config;

/// Kind of content to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    Post,
    Page,
}

impl ContentKind {
    /// Directory under the input directory.
    fn dir(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Page => "pages",
        }
    }
}

/// Run the new command. Returns the path of the created file.
///
/// Posts start as drafts; pages do not.
pub fn run(config_path: &Path, kind: ContentKind, name: &str) -> Result<PathBuf> {
    tracing::info!(?kind, name, "Creating new content");

    let slug = slugify(name);
    if slug.is_empty() {
        bail!("Cannot derive a file name from {name:?}");
    }

    let config = load_config(config_path)?;
    let path = config
        .input_path()
        .join(kind.dir())
        .join(format!("{slug}.md"));

    if path.exists() {
        bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err("Failed to create directories")?;
    }
    fs::write(&path, frontmatter(kind, name)).wrap_err("Failed to write file")?;

    tracing::info!(path = %path.display(), "Created new content file");
    println!("Created: {}", path.display());

    Ok(path)
}

fn frontmatter(kind: ContentKind, title: &str) -> String {
    let title = title.replace('"', "\\\"");
    let date = Utc::now().format("%Y-%m-%d");

    match kind {
        ContentKind::Post => format!(
            r#"---
title: "{title}"
date: {date}
draft: true
tags: []
categories: []
---

Write your post here.
"#
        ),
        ContentKind::Page => format!(
            r#"---
title: "{title}"
---

Write your page here.
"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use numark_parser::MarkdownProcessor;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_new_post() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("numark.toml");

        let path = run(&config_path, ContentKind::Post, "My First \"Post\"").unwrap();
        assert_eq!(path, dir.path().join("content/posts/my-first-post.md"));

        let raw = fs::read_to_string(&path).unwrap();
        let parsed = MarkdownProcessor::default().parse(&raw);
        assert_eq!(parsed.frontmatter.title.as_deref(), Some("My First \"Post\""));
        assert!(parsed.frontmatter.draft);
        assert!(parsed.frontmatter.parsed_date().is_some());
    }

    #[test]
    fn test_new_page_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("numark.toml");

        let path = run(&config_path, ContentKind::Page, "About").unwrap();
        assert_eq!(path, dir.path().join("content/pages/about.md"));
        assert!(run(&config_path, ContentKind::Page, "About").is_err());
    }

    #[test]
    fn test_unusable_name() {
        let dir = TempDir::new().unwrap();
        assert!(run(&dir.path().join("numark.toml"), ContentKind::Post, "!!!").is_err());
    }
}
