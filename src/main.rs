//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: solvra_load CLI entry point
// Objective: Resolve or load library names from the command line using the
//            load service, reporting every unit that reaches the loader
//=====================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use solvra_load::logging::{init_tracing, level_for};
use solvra_load::{
    LoadError, LoadService, LoadServiceConfig, LoadUnit, Loader, LoaderError, RequireOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "solvra_load", about = "Resolve and load SolvraScript libraries")]
pub struct Args {
    /// Library names to require (or load with --load).
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Prepend a directory to the load path. Repeatable.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<String>,

    /// TOML configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serialize every require through one lock.
    #[arg(long = "global-lock")]
    pub global_lock: bool,

    /// Warn about circular requires.
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Trace every search probe.
    #[arg(long = "debug-search")]
    pub debug_search: bool,

    /// Log load timings.
    #[arg(long = "timing")]
    pub timing: bool,

    /// Print what each name resolves to instead of loading it.
    #[arg(long = "resolve", conflicts_with = "load")]
    pub resolve: bool,

    /// Use load semantics: no dedup, unrecognized extensions are exact names.
    #[arg(long = "load")]
    pub load: bool,
}

/// Reports each unit and follows `require "name"` lines in script sources.
struct ReportingLoader;

impl ReportingLoader {
    fn nested_requires(source: &str) -> impl Iterator<Item = &str> {
        source.lines().filter_map(|line| {
            let rest = line.trim().strip_prefix("require")?.trim();
            let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
            let rest = &rest[1..];
            rest.find(quote).map(|end| &rest[..end])
        })
    }

    fn exit_status(source: &str) -> Option<i32> {
        source.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("exit")?.trim();
            if rest.is_empty() {
                Some(0)
            } else {
                rest.parse().ok()
            }
        })
    }
}

impl Loader for ReportingLoader {
    fn load(&self, service: &LoadService, unit: LoadUnit, wrap: bool) -> Result<(), LoaderError> {
        println!("{:?} {}{}", unit.kind(), unit.canonical_name(), if wrap { " (wrapped)" } else { "" });
        let script = match &unit {
            LoadUnit::SourceScript { resource, .. } | LoadUnit::ClasspathResource { resource, .. } => resource,
            _ => return Ok(()),
        };
        let source = script.read_to_string()?;
        for name in Self::nested_requires(&source) {
            service.require(name)?;
        }
        match Self::exit_status(&source) {
            Some(status) => Err(LoaderError::Exit { status }),
            None => Ok(()),
        }
    }
}

fn build_config(args: &Args) -> Result<LoadServiceConfig> {
    let mut config = match &args.config {
        Some(path) => LoadServiceConfig::load_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => LoadServiceConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    config.global_require_lock |= args.global_lock;
    config.verbose |= args.verbose;
    config.debug_search |= args.debug_search;
    config.debug_timing |= args.timing;
    Ok(config)
}

fn run(args: Args) -> Result<ExitCode> {
    let config = build_config(&args)?;
    init_tracing(level_for(config.debug_search, config.debug_timing, config.verbose));

    let service = LoadService::builder(Arc::new(ReportingLoader))
        .config(config)
        .build()
        .context("starting load service")?;
    service.init(&args.include);

    for name in &args.names {
        if args.resolve {
            match service.find_file_for_require(name)? {
                Some(unit) => println!("{name} -> {:?} {}", unit.kind(), unit.canonical_name()),
                None => println!("{name} -> not found"),
            }
            continue;
        }

        let result = if args.load {
            service.load(name, false).map(|()| RequireOutcome::Loaded)
        } else {
            service.require(name)
        };
        match result {
            Ok(RequireOutcome::Loaded) => {}
            Ok(RequireOutcome::AlreadyLoaded) => println!("{name}: already loaded"),
            Ok(RequireOutcome::Circular) => println!("{name}: circular require skipped"),
            Err(LoadError::Exit { status }) => return Ok(ExitCode::from(status.clamp(0, 255) as u8)),
            Err(err) => return Err(err).with_context(|| format!("requiring {name}")),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_requires() {
        let source = "require 'json'\n  require \"net/http\"\nputs 1\nrequire_relative 'x'\n";
        let names: Vec<&str> = ReportingLoader::nested_requires(source).collect();
        assert_eq!(names, vec!["json", "net/http"]);
    }

    #[test]
    fn parses_exit_lines() {
        assert_eq!(ReportingLoader::exit_status("puts 1\nexit 3\n"), Some(3));
        assert_eq!(ReportingLoader::exit_status("exit\n"), Some(0));
        assert_eq!(ReportingLoader::exit_status("puts 1\n"), None);
    }

    #[test]
    fn cli_flags_parse() {
        let args = Args::parse_from(["solvra_load", "-I", "lib", "--resolve", "greet"]);
        assert_eq!(args.include, vec!["lib"]);
        assert!(args.resolve);
        assert_eq!(args.names, vec!["greet"]);
    }
}

//=====================================================
// End of file
//=====================================================
