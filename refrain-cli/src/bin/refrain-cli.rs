// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use refrain::SpecializerOptions;
use refrain_interpreter::{Interpreter, InterpreterOptions};
use tracing::info;

use refrain_cli::{render, specialize_source, Format};

/// Closure specializer for wave-generating programs
#[derive(Parser)]
struct Args {
    /// Program to evaluate
    entry_point: PathBuf,
    /// Top-level binding to specialize
    #[clap(long, default_value = "wave")]
    target: String,
    /// Evaluate the program without the sound-synthesis prelude
    #[clap(long)]
    no_prelude: bool,
    /// Output format
    #[clap(long, default_value = "javascript")]
    format: Format,
    /// Maximum number of nested inlined calls
    #[clap(long)]
    max_inline_depth: Option<usize>,
    /// Log specialization progress to stderr
    #[clap(long)]
    log: bool,
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.log {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();
    let interpreter_options = if args.log {
        InterpreterOptions::debug()
    } else {
        InterpreterOptions::default()
    };
    let defaults = SpecializerOptions::default();
    let specializer_options = SpecializerOptions {
        max_inline_depth: args.max_inline_depth.unwrap_or(defaults.max_inline_depth),
        ..defaults
    };
    let source = read_file(&args.entry_point)?;
    let result = specialize_source(
        &source,
        Some(args.entry_point.as_path()),
        &args.target,
        !args.no_prelude,
        &Interpreter::new(interpreter_options),
        &specializer_options,
    )
    .with_context(|| format!("Failed to process {}", args.entry_point.display()))?;
    info!(target_name = %args.target, "Specialized target");
    println!("{}", render(&result, args.format)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read path {}", path.display()))
}
