//! NuMark CLI
//!
//! Markdown static site generator with a live-reloading dev server.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;
use numark::cmd::{dev::DevOptions, new::ContentKind};

/// Command-line interface for NuMark.
#[derive(Parser)]
#[command(
    name = "numark",
    version,
    about = "A Markdown static site generator"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "numark.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the static site for production
    Build {
        /// Output directory, relative to the working directory (overrides the configuration)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
        /// Include draft content
        #[arg(long)]
        drafts: bool,
    },
    /// Start development server with live reload
    Dev {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Open browser automatically
        #[arg(long)]
        open: bool,
        /// Disable live reload
        #[arg(long)]
        no_livereload: bool,
    },
    /// Remove the output directory
    Clean,
    /// Create new content
    New {
        /// Kind of content
        #[arg(value_enum)]
        kind: ContentKind,
        /// Title of the new content
        name: String,
    },
    /// Validate configuration and content
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    numark::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output, drafts } => {
            numark::cmd::build::run(&cli.config, output.as_deref(), drafts)?;
        }
        Commands::Dev {
            port,
            host,
            open,
            no_livereload,
        } => {
            let options = DevOptions {
                port,
                host,
                open,
                no_livereload,
            };
            numark::cmd::dev::run(&cli.config, options).await?;
        }
        Commands::Clean => {
            numark::cmd::clean::run(&cli.config)?;
        }
        Commands::New { kind, name } => {
            numark::cmd::new::run(&cli.config, kind, &name)?;
        }
        Commands::Check { strict } => {
            numark::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["numark", "build", "--output", "public"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, std::path::PathBuf::from("numark.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build { output, drafts } => {
                assert_eq!(output, Some(std::path::PathBuf::from("public")));
                assert!(!drafts);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_defaults() {
        let cli = Cli::parse_from(["numark", "build", "--drafts"]);

        match cli.command {
            Commands::Build { output, drafts } => {
                assert!(output.is_none());
                assert!(drafts);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_dev_command_parsing() {
        let args = [
            "numark",
            "dev",
            "--port",
            "8080",
            "--host",
            "0.0.0.0",
            "--open",
            "--no-livereload",
        ];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Dev {
                port,
                host,
                open,
                no_livereload,
            } => {
                assert_eq!(port, Some(8080));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert!(open);
                assert!(no_livereload);
            }
            _ => panic!("Expected Dev command"),
        }
    }

    #[test]
    fn test_cli_clean_command_parsing() {
        let cli = Cli::parse_from(["numark", "clean"]);
        assert!(matches!(cli.command, Commands::Clean));
    }

    #[test]
    fn test_cli_new_command_parsing() {
        let args = ["numark", "new", "post", "Hello World"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::New { kind, name } => {
                assert_eq!(kind, ContentKind::Post);
                assert_eq!(name, "Hello World");
            }
            _ => panic!("Expected New command"),
        }
    }

    #[test]
    fn test_cli_new_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["numark", "new", "video", "x"]).is_err());
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["numark", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => {
                assert!(strict);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["numark", "-vvv", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_path() {
        let args = ["numark", "--config", "site.yaml", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, std::path::PathBuf::from("site.yaml"));
    }
}
