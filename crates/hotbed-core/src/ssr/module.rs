//! Evaluated module namespaces.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Export name to value, in the order the module defined them.
pub type Exports = IndexMap<String, Value>;

#[derive(Debug)]
struct Namespace {
    url: String,
    exports: Exports,
    placeholder: bool,
}

/// The frozen export namespace of a module evaluated on the server.
///
/// There is no way to mutate exports once a module is built; clones share
/// the same namespace.
#[derive(Debug, Clone)]
pub struct SsrModule(Arc<Namespace>);

impl SsrModule {
    pub fn new(url: impl Into<String>, exports: Exports) -> Self {
        Self(Arc::new(Namespace {
            url: url.into(),
            exports,
            placeholder: false,
        }))
    }

    /// Empty stand-in handed out when a circular import is detected.
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self(Arc::new(Namespace {
            url: url.into(),
            exports: Exports::new(),
            placeholder: true,
        }))
    }

    pub fn url(&self) -> &str {
        &self.0.url
    }

    pub fn exports(&self) -> &Exports {
        &self.0.exports
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.exports.get(name)
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.placeholder
    }

    /// Whether both handles point at the same evaluated namespace.
    pub fn ptr_eq(&self, other: &SsrModule) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A module provided by the host runtime, adapted to ES-module shape.
///
/// Modules flagged as ES modules expose their own `default` export. For
/// anything else the whole namespace object doubles as the default export,
/// matching how CommonJS modules are imported.
#[derive(Debug, Clone)]
pub struct ForeignModule {
    specifier: String,
    namespace: Exports,
    default: Value,
}

impl ForeignModule {
    pub fn new(specifier: impl Into<String>, namespace: Exports, es_module: bool) -> Self {
        let default = if es_module {
            namespace.get("default").cloned().unwrap_or(Value::Null)
        } else {
            Value::Object(
                namespace
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        };
        Self {
            specifier: specifier.into(),
            namespace,
            default,
        }
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == "default" {
            Some(&self.default)
        } else {
            self.namespace.get(name)
        }
    }

    /// Named exports, without `default`.
    pub fn named(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.namespace.iter().filter(|(k, _)| k.as_str() != "default")
    }
}

/// What an import inside an evaluated module yields.
#[derive(Debug, Clone)]
pub enum ImportedModule {
    Local(SsrModule),
    Foreign(Arc<ForeignModule>),
}

impl ImportedModule {
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            ImportedModule::Local(module) => module.get(name),
            ImportedModule::Foreign(module) => module.get(name),
        }
    }

    /// Named exports a `export * from` re-export picks up.
    pub fn named_exports(&self) -> Vec<(String, Value)> {
        match self {
            ImportedModule::Local(module) => module
                .exports()
                .iter()
                .filter(|(k, _)| k.as_str() != "default")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ImportedModule::Foreign(module) => module
                .named()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exports(pairs: &[(&str, Value)]) -> Exports {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn commonjs_default_is_whole_namespace() {
        let module = ForeignModule::new("lib", exports(&[("a", json!(1))]), false);
        assert_eq!(module.get("default"), Some(&json!({"a": 1})));
        assert_eq!(module.get("a"), Some(&json!(1)));
    }

    #[test]
    fn es_module_default_is_its_own() {
        let module = ForeignModule::new(
            "lib",
            exports(&[("default", json!("d")), ("a", json!(1))]),
            true,
        );
        assert_eq!(module.get("default"), Some(&json!("d")));
        let named: Vec<_> = module.named().map(|(k, _)| k.clone()).collect();
        assert_eq!(named, vec!["a"]);
    }

    #[test]
    fn export_all_skips_default() {
        let module = ImportedModule::Local(SsrModule::new(
            "/a.ts",
            exports(&[("default", json!(0)), ("x", json!(1)), ("y", json!(2))]),
        ));
        assert_eq!(
            module.named_exports(),
            vec![("x".to_string(), json!(1)), ("y".to_string(), json!(2))]
        );
    }
}
