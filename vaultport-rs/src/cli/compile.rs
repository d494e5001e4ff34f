//! `compile` command implementation.

use crate::bundle::Bundle;
use crate::cli::args::CompileArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::convert::Converter;
use crate::error::Result;
use crate::query::base::BaseFile;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub fn run(config: &Config, args: &CompileArgs, now: Option<DateTime<Utc>>, output: &Output) -> Result<()> {
    let bundle = Bundle::load(&args.bundle)?;
    let registries = bundle.registries();
    let mut converter = Converter::new(config, &registries);
    if let Some(now) = now {
        converter = converter.with_now(now);
    }

    if let Some(id) = &args.object {
        let object = bundle.object(id)?;
        if args.raw {
            output.print_raw(&converter.render_base(object)?);
            return Ok(());
        }
        return output.print(&converter.base_file(object));
    }

    let all: BTreeMap<&str, BaseFile> = bundle
        .objects
        .iter()
        .filter(|object| object.is_query())
        .map(|object| (object.id.as_str(), converter.base_file(object)))
        .collect();
    output.print(&all)
}
