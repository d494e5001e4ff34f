//! Property naming and value resolution.

pub mod date;
pub mod path;
pub mod value;

pub use path::{
    resolve_external_name, resolve_filter_address, BuiltinField, NameAllocator, PropertyAddress,
};
pub use value::{DisplayValue, ValueResolver};
