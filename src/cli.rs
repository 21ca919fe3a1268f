//! The `xtools` command.

use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use xtools_core::{IdentityStage, TransformError, Transformer, TransformerBuilder};
use xtools_dom::Document;

#[derive(Parser, Debug)]
#[command(version, about = "Resolve xt: directives and tag: attributes in an XML document")]
pub struct Args {
    /// The document to process
    pub input: PathBuf,

    /// JSON settings: namespaces, snippet_width, duplicate_tags, destyle
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra prefix binding for queries, e.g. -n ak=http://ki.ujep.cz/ns/akreditace
    #[arg(short = 'n', long = "namespace", value_name = "PREFIX=URI", value_parser = parse_binding)]
    pub namespaces: Vec<(String, String)>,

    /// Write the result here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Remove <style> elements and style attributes from the result
    #[arg(long)]
    pub destyle: bool,

    /// Do not register aname and the other built-in functions
    #[arg(long)]
    pub no_builtins: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_binding(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((prefix, uri)) if !prefix.is_empty() && !uri.is_empty() => {
            Ok((prefix.to_string(), uri.to_string()))
        }
        _ => Err(format!("expected PREFIX=URI, got '{}'", s)),
    }
}

/// The log filter used when `RUST_LOG` is not set.
pub fn default_log_filter(args: &Args) -> &'static str {
    if args.quiet { "warn" } else { "info" }
}

pub fn build_transformer(args: &Args) -> Result<Transformer, TransformError> {
    let mut builder = TransformerBuilder::new();
    if let Some(config) = &args.config {
        builder = builder.with_config_file(config)?;
    }
    for (prefix, uri) in &args.namespaces {
        builder = builder.with_namespace(prefix, uri);
    }
    if args.destyle {
        builder = builder.with_destyle(true);
    }
    if !args.no_builtins {
        builder = builder.with_builtin_functions();
    }
    builder.build()
}

/// Loads the input, resolves it and writes the result.
pub fn run(args: &Args) -> Result<(), TransformError> {
    let transformer = build_transformer(args)?;
    info!("Loading {}", args.input.display());
    let doc = Document::parse_file(&args.input)?;
    let resolved = transformer.process(doc, &IdentityStage)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                TransformError::Io(io::Error::new(
                    e.kind(),
                    format!("Failed to create '{}': {}", path.display(), e),
                ))
            })?;
            let mut writer = BufWriter::new(file);
            resolved.write_xml(&mut writer)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            resolved.write_xml(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}
