//! Patch command - write patched manifests

use console::style;
use schemapatch_core::{CancellationToken, DirectoryOutput, OutputRule, StdoutOutput};
use std::path::{Path, PathBuf};

use super::Settings;
use crate::InputArgs;
use crate::display::summary_line;
use crate::error::Result;
use crate::exit_codes;

pub fn run(
    config: Option<&Path>,
    input: &InputArgs,
    output_dir: Option<PathBuf>,
    stdout: bool,
    cancel: CancellationToken,
) -> Result<i32> {
    let settings = Settings::resolve(config, input, output_dir)?;
    let source = settings.schema_bundle()?;

    let output: Box<dyn OutputRule> = if stdout {
        Box::new(StdoutOutput::new())
    } else {
        let dir = settings.output_dir.as_ref().unwrap_or(&settings.manifests);
        Box::new(DirectoryOutput::new(dir))
    };
    let patched = settings
        .generator(cancel)
        .generate(&settings.manifests, &source, output.as_ref())?;

    // keep stdout for the manifests themselves
    let report = |line: String| {
        if stdout {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };
    if patched.is_empty() {
        report(format!(
            "{} No CRD in {} matched the supplied schemata",
            style("⚠").yellow(),
            settings.manifests.display()
        ));
        return Ok(exit_codes::SUCCESS);
    }

    report(format!("{} Patched {} CRD(s)", style("→").blue(), patched.len()));
    for crd in &patched {
        report(summary_line(crd));
    }
    Ok(exit_codes::SUCCESS)
}
