//! Vaultport - convert knowledge-base exports into Obsidian-style vaults.
//!
//! # Overview
//!
//! Vaultport turns typed objects from an export bundle into:
//! - notes whose front matter carries resolved property values (labels,
//!   links, dates, file paths) under human-readable names
//! - `.base` query files compiled from saved views (filters, sorts,
//!   grouping, columns)
//!
//! Both halves share one relation model and one set of property naming
//! rules, so a compiled filter normally addresses the same name and literal
//! the front matter was written with. Two cases differ:
//! - builtin keys such as `createdDate` stay under their raw key in front
//!   matter but are addressed as `file.ctime` and friends in filters
//! - when two properties resolve to the same display name, front matter
//!   falls back to the raw key for the later one while filters still
//!   address the display name
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use vaultport::{Bundle, Config, Converter};
//!
//! let bundle = Bundle::load(Path::new("export.json")).unwrap();
//! let registries = bundle.registries();
//! let config = Config::default();
//! let converter = Converter::new(&config, &registries);
//!
//! for object in &bundle.objects {
//!     if object.is_query() {
//!         println!("{}", converter.render_base(object).unwrap());
//!     } else {
//!         println!("{}", converter.render_document(object).unwrap());
//!     }
//! }
//! ```

pub mod bundle;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod frontmatter;
pub mod link;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod value;

// Re-export main types at crate root
pub use bundle::{Bundle, ObjectRecord};
pub use config::{Config, LinkStyle, QueryConfig, ResolverConfig};
pub use convert::Converter;
pub use error::{Degradation, Result, VaultportError};
pub use frontmatter::{serialize_frontmatter, FrontmatterBuilder};
pub use query::{BaseFile, QueryCompiler};
pub use registry::{LinkTarget, RelationDefinition, Registries, ValueFormat};
pub use resolve::{DisplayValue, ValueResolver};
