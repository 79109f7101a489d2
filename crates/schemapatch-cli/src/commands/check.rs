//! Check command - report manifests that `patch` would change

use console::style;
use schemapatch_core::CancellationToken;
use std::path::Path;

use super::Settings;
use crate::InputArgs;
use crate::display::unified_diff;
use crate::error::Result;
use crate::exit_codes;

pub fn run(config: Option<&Path>, input: &InputArgs, cancel: CancellationToken) -> Result<i32> {
    let settings = Settings::resolve(config, input, None)?;
    let source = settings.schema_bundle()?;
    let patched = settings.generator(cancel).plan(&settings.manifests, &source)?;

    let drifted: Vec<_> = patched.iter().filter(|crd| crd.is_changed()).collect();
    for crd in &drifted {
        print!("{}", unified_diff(crd));
    }

    if drifted.is_empty() {
        println!("{} {} CRD(s) up to date", style("✓").green(), patched.len());
        Ok(exit_codes::SUCCESS)
    } else {
        eprintln!(
            "{} {} of {} CRD(s) out of date, run `schemapatch patch`",
            style("✗").red(),
            drifted.len(),
            patched.len()
        );
        Ok(exit_codes::DRIFT)
    }
}
