//! Nimbus CLI library
//!
//! This module contains the command logic of the `nimbus` binary. Output is
//! written to a caller-supplied writer so commands can be exercised in tests.

pub mod error_adapter;
pub mod render;

mod args;
mod config;

pub use args::{Args, Command};
pub use error_adapter::{Reportable, to_reportables};

use std::io::{self, Write};

use log::info;

use nimbus::{NimbusError, TemplateProcessor, diff::DiffMode, node::Node, path::Path};

/// Run the Nimbus CLI application, writing results to stdout.
///
/// # Errors
///
/// Returns `NimbusError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors
/// - Path errors from `get` and `set`
/// - Unresolved references and cycles from `graph`
pub fn run(args: &Args) -> Result<(), NimbusError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(args, &mut out)
}

/// Run the Nimbus CLI application, writing results to `out`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_output(args: &Args, out: &mut impl Write) -> Result<(), NimbusError> {
    let mut app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Diff { from, to, long } => {
            info!(from, to; "Comparing templates");
            if *long {
                app_config.set_diff_mode(DiffMode::Verbose);
            }
            let mode = app_config.diff().mode();
            let processor = TemplateProcessor::new(app_config);

            let from = processor.load(from)?;
            let to = processor.load(to)?;
            let diff = processor.diff(&from, &to);
            out.write_all(render::render_diff(&diff, mode).as_bytes())?;
        }
        Command::Graph { template } => {
            info!(template; "Ordering template elements");
            let processor = TemplateProcessor::new(app_config);

            let template = processor.load(template)?;
            let graph = processor.graph(&template)?;
            let text = render::render_graph(&graph)?;
            out.write_all(text.as_bytes())?;
        }
        Command::Get { template, path } => {
            info!(template, path; "Reading value");
            let processor = TemplateProcessor::new(app_config);

            let template = processor.load(template)?;
            let node = template.get(&parse_path(path))?;
            out.write_all(render::render_node(node)?.as_bytes())?;
        }
        Command::Set {
            template,
            path,
            value,
        } => {
            info!(template, path; "Setting value");
            let processor = TemplateProcessor::new(app_config);

            let mut template = processor.load(template)?;
            let value = parse_value(value)?;
            template.set(&parse_path(path), value)?;
            out.write_all(template.to_yaml()?.as_bytes())?;
        }
    }

    out.flush()?;
    Ok(())
}

fn parse_path(text: &str) -> Path {
    text.parse().unwrap_or_default()
}

/// Parses a command-line value as YAML so `[a, b]` or `!Ref Name` become
/// trees rather than strings.
fn parse_value(text: &str) -> Result<Node, NimbusError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|err| NimbusError::new_parse_error(err, text))?;
    Ok(Node::try_from(value)?)
}
