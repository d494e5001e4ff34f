//! `frontmatter` command implementation.

use crate::bundle::Bundle;
use crate::cli::args::FrontmatterArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::convert::Converter;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub fn run(config: &Config, args: &FrontmatterArgs, now: Option<DateTime<Utc>>, output: &Output) -> Result<()> {
    let bundle = Bundle::load(&args.bundle)?;
    let registries = bundle.registries();
    let mut converter = Converter::new(config, &registries);
    if let Some(now) = now {
        converter = converter.with_now(now);
    }

    let to_map = |entries: Vec<(String, Value)>| -> Value {
        Value::Object(entries.into_iter().collect::<Map<_, _>>())
    };

    if let Some(id) = &args.object {
        let object = bundle.object(id)?;
        return output.print(&to_map(converter.frontmatter(object)));
    }

    let all: Map<String, Value> = bundle
        .objects
        .iter()
        .map(|object| (object.id.clone(), to_map(converter.frontmatter(object))))
        .collect();
    output.print(&all)
}
