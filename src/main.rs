//! sqlexpr - compile a JSON query description into parameterized SQL

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use serde::Deserialize;
use sqlexpr::catalog::Catalog;
use sqlexpr::compiler::{Backend, SqlCompiler};
use sqlexpr::request::QueryRequest;
use std::fs;
use std::path::{Path, PathBuf};

/// sqlexpr - compile expression trees into SQL for a backend
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog file (JSON)
    #[arg(short, long)]
    catalog: PathBuf,

    /// Query description file (JSON)
    #[arg(short, long)]
    query: PathBuf,

    /// Target backend: postgres, sqlite or mysql
    #[arg(short, long, default_value = "postgres")]
    backend: Backend,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let catalog: Catalog = read_json(&args.catalog)?;
    catalog.validate().context("Invalid catalog")?;
    let request: QueryRequest = read_json(&args.query)?;

    let query = request.build(&catalog)?;
    let compiler = SqlCompiler::new(args.backend);
    let fragment = query
        .compile(&compiler)
        .with_context(|| format!("Failed to compile for {}", args.backend))?
        .numbered(args.backend);

    println!("{}", fragment.sql);
    println!(
        "{}",
        serde_json::to_string(&fragment.params).context("Failed to encode parameters")?
    );

    Ok(())
}
