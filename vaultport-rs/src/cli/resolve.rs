//! `resolve` command implementation.

use crate::bundle::Bundle;
use crate::cli::args::ResolveArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{Result, VaultportError};
use crate::resolve::path::resolve_external_name;
use crate::resolve::value::ValueResolver;
use crate::value::is_list;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub name: String,
    pub value: Value,
}

pub fn run(config: &Config, args: &ResolveArgs, output: &Output) -> Result<()> {
    let bundle = Bundle::load(&args.bundle)?;
    let registries = bundle.registries();
    let raw: Value = serde_json::from_str(&args.value)
        .map_err(|e| VaultportError::Other(format!("--value is not valid JSON: {}", e)))?;

    let resolver = ValueResolver::new(&registries, &config.resolver);
    let relation = registries.relation(&args.key);
    let response = ResolveResponse {
        name: resolve_external_name(&args.key, relation),
        value: resolver
            .resolve_value(&args.key, &raw, args.list || is_list(&raw))
            .into_value(),
    };
    output.print(&response)
}
