//! Command-line surface.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! `--version` and `--watch` are handled before clap sees the arguments: a
//! parent process may pass `--version` alongside arguments we would reject,
//! and `--watch=forever` is an alias some launchers use.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, OutputMode, Style};

/// What to do after the first look at the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preprocessed {
    /// Print the version and exit
    Version,
    Run {
        /// Arguments for clap, with watch aliases normalized
        args: Vec<String>,
        /// Watch mode was requested; stdin should be drained
        watch: bool,
    },
}

/// Scan raw arguments (without the program name).
pub fn preprocess_args<I>(args: I) -> Preprocessed
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut watch = false;
    for arg in args {
        match arg.as_str() {
            "--version" => return Preprocessed::Version,
            "--watch" | "--watch=forever" => {
                if !watch {
                    out.push("--watch".to_string());
                }
                watch = true;
            }
            _ => out.push(arg),
        }
    }
    Preprocessed::Run { args: out, watch }
}

#[derive(Parser, Debug)]
#[command(name = "stylebuild")]
#[command(about = "Compile Sass and utility-class CSS", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Stylesheets to build (.scss, .sass, .css)
    #[arg(required = true)]
    pub entry_points: Vec<PathBuf>,

    /// Write one <stem>.css per entry point to DIR
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Write the output to FILE (single entry point only)
    #[arg(long, value_name = "FILE", conflicts_with = "outdir")]
    pub outfile: Option<PathBuf>,

    /// Rebuild when an input changes; exits when stdin closes
    #[arg(long)]
    pub watch: bool,

    /// Configuration file (defaults to ./stylebuild.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where compiled Sass goes
    #[arg(long, value_enum)]
    pub mode: Option<OutputMode>,

    /// CSS output style
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Dart Sass executable
    #[arg(long, value_name = "PATH")]
    pub sass: Option<PathBuf>,

    /// Never run the utility-class tool
    #[arg(long)]
    pub no_tailwind: bool,

    /// Log filter, e.g. "debug" or "stylebuild=trace"
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Override configuration values with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(style) = self.style {
            config.style = style;
        }
        if let Some(sass) = &self.sass {
            config.sass = Some(sass.clone());
        }
        if self.no_tailwind {
            config.tailwind.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_version_wins_anywhere() {
        assert_eq!(
            preprocess_args(strings(&["main.scss", "--bogus", "--version"])),
            Preprocessed::Version
        );
    }

    #[test]
    fn test_watch_forever_is_normalized() {
        assert_eq!(
            preprocess_args(strings(&["--watch=forever", "main.scss", "--watch"])),
            Preprocessed::Run {
                args: strings(&["--watch", "main.scss"]),
                watch: true,
            }
        );
        assert_eq!(
            preprocess_args(strings(&["main.scss"])),
            Preprocessed::Run {
                args: strings(&["main.scss"]),
                watch: false,
            }
        );
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "stylebuild",
            "main.scss",
            "--mode",
            "sibling",
            "--style",
            "expanded",
            "--no-tailwind",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(cli.entry_points, vec![PathBuf::from("main.scss")]);
        assert_eq!(config.mode, OutputMode::Sibling);
        assert_eq!(config.style, Style::Expanded);
        assert!(!config.tailwind.enabled);
        assert_eq!(config.sass, None);
    }

    #[test]
    fn test_outdir_conflicts_with_outfile() {
        let err = Cli::try_parse_from([
            "stylebuild",
            "a.scss",
            "--outdir",
            "dist",
            "--outfile",
            "a.css",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_entry_point_required() {
        assert!(Cli::try_parse_from(["stylebuild", "--watch"]).is_err());
    }
}
