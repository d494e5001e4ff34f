//! View parsing and compilation into query-file filters.

pub mod base;
pub mod compiler;
pub mod parser;
pub mod types;
pub mod window;

pub use base::{BaseFile, BaseSort, BaseView};
pub use compiler::QueryCompiler;
pub use parser::parse_view;
pub use types::{
    CompiledGroup, CompiledSort, CompiledView, Condition, Expr, FilterLeaf, FilterNode,
    QuickOption, SortDirection, SortTerm, ViewKind, ViewOwner, ViewSpec,
};
pub use window::{quick_window, DateWindow};
