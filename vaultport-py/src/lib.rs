//! Python bindings for Vaultport.
//!
//! Exposes front matter resolution and query compilation over an export
//! bundle passed in as JSON text.

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use ::vaultport::bundle::Bundle;
use ::vaultport::config::Config;
use ::vaultport::convert::Converter;
use ::vaultport::registry::Registries;
use ::vaultport::resolve::path::resolve_external_name;
use ::vaultport::resolve::value::ValueResolver;
use ::vaultport::value::is_list;
use serde_json::{Map, Value};

fn runtime_error(e: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

// ============================================================================
// Bundle
// ============================================================================

/// A parsed export bundle with its registries built once.
#[pyclass(name = "Bundle")]
pub struct PyBundle {
    bundle: Bundle,
    registries: Registries,
    config: Config,
}

impl PyBundle {
    fn parse(bundle_json: &str, config_toml: Option<&str>) -> PyResult<Self> {
        let bundle = Bundle::from_json(bundle_json).map_err(runtime_error)?;
        let config = match config_toml {
            Some(text) => Config::from_toml(text).map_err(runtime_error)?,
            None => Config::default(),
        };
        let registries = bundle.registries();
        Ok(Self {
            bundle,
            registries,
            config,
        })
    }

    fn converter(&self) -> Converter<'_> {
        Converter::new(&self.config, &self.registries)
    }
}

#[pymethods]
impl PyBundle {
    /// Parse a bundle.
    ///
    /// Args:
    ///     bundle_json: The export bundle as JSON text.
    ///     config_toml: Optional configuration as TOML text.
    ///
    /// Raises:
    ///     RuntimeError: If the bundle or config cannot be parsed.
    #[new]
    #[pyo3(signature = (bundle_json, config_toml=None))]
    pub fn new(bundle_json: &str, config_toml: Option<&str>) -> PyResult<Self> {
        Self::parse(bundle_json, config_toml)
    }

    /// Ids of every object in the bundle.
    pub fn object_ids(&self) -> Vec<String> {
        self.bundle.objects.iter().map(|o| o.id.clone()).collect()
    }

    /// Resolved front matter of an object, as JSON text.
    pub fn frontmatter(&self, object_id: &str) -> PyResult<String> {
        let object = self.bundle.object(object_id).map_err(runtime_error)?;
        let map: Map<String, Value> = self.converter().frontmatter(object).into_iter().collect();
        serde_json::to_string(&map).map_err(runtime_error)
    }

    /// Full document text (front matter and title) of an object.
    pub fn document(&self, object_id: &str) -> PyResult<String> {
        let object = self.bundle.object(object_id).map_err(runtime_error)?;
        self.converter().render_document(object).map_err(runtime_error)
    }

    /// The compiled `.base` file of an object, as YAML text.
    pub fn compile_base(&self, object_id: &str) -> PyResult<String> {
        let object = self.bundle.object(object_id).map_err(runtime_error)?;
        self.converter().render_base(object).map_err(runtime_error)
    }

    /// Resolve one raw value. Returns `{"name": ..., "value": ...}` as JSON.
    #[pyo3(signature = (key, value_json, is_list_hint=false))]
    pub fn resolve_value(&self, key: &str, value_json: &str, is_list_hint: bool) -> PyResult<String> {
        let raw: Value = serde_json::from_str(value_json).map_err(runtime_error)?;
        let resolver = ValueResolver::new(&self.registries, &self.config.resolver);
        let value = resolver
            .resolve_value(key, &raw, is_list_hint || is_list(&raw))
            .into_value();
        let name = resolve_external_name(key, self.registries.relation(key));
        serde_json::to_string(&serde_json::json!({ "name": name, "value": value })).map_err(runtime_error)
    }

    fn __repr__(&self) -> String {
        format!("Bundle(objects={})", self.bundle.objects.len())
    }
}

// ============================================================================
// One-shot functions
// ============================================================================

/// Resolve an object's front matter.
///
/// Returns:
///     The front matter as JSON text.
#[pyfunction]
pub fn resolve_frontmatter(bundle_json: &str, object_id: &str) -> PyResult<String> {
    PyBundle::parse(bundle_json, None)?.frontmatter(object_id)
}

/// Compile an object's views into `.base` YAML.
#[pyfunction]
pub fn compile_base(bundle_json: &str, object_id: &str) -> PyResult<String> {
    PyBundle::parse(bundle_json, None)?.compile_base(object_id)
}

/// Resolve one raw value against a bundle's registries.
#[pyfunction]
#[pyo3(signature = (bundle_json, key, value_json, is_list_hint=false))]
pub fn resolve_value(bundle_json: &str, key: &str, value_json: &str, is_list_hint: bool) -> PyResult<String> {
    PyBundle::parse(bundle_json, None)?.resolve_value(key, value_json, is_list_hint)
}

// ============================================================================
// Module Definition
// ============================================================================

/// Vaultport Python module.
#[pymodule]
fn vaultport_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBundle>()?;
    m.add_function(wrap_pyfunction!(resolve_frontmatter, m)?)?;
    m.add_function(wrap_pyfunction!(compile_base, m)?)?;
    m.add_function(wrap_pyfunction!(resolve_value, m)?)?;
    Ok(())
}
