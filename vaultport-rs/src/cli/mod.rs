//! CLI command implementations.

pub mod args;
pub mod output;

pub mod compile;
pub mod convert;
pub mod frontmatter;
pub mod resolve;

pub use args::{Cli, Commands};
pub use output::Output;
