//! `convert` command implementation.

use crate::bundle::Bundle;
use crate::cli::args::ConvertArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::convert::Converter;
use crate::error::Result;
use chrono::{DateTime, Utc};

pub fn run(config: &Config, args: &ConvertArgs, now: Option<DateTime<Utc>>, output: &Output) -> Result<()> {
    let bundle = Bundle::load(&args.bundle)?;
    let registries = bundle.registries();
    let mut converter = Converter::new(config, &registries);
    if let Some(now) = now {
        converter = converter.with_now(now);
    }

    let report = converter.convert_all(&bundle.objects, &args.out)?;
    output.info(&format!(
        "Wrote {} documents and {} query files to {}",
        report.documents,
        report.queries,
        args.out.display()
    ));
    output.print(&report)
}
