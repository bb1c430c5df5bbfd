//! Reserved `import.meta` property names per runtime and bundler.
//!
//! A binding key that equals a reserved name would shadow what the runtime or
//! bundler puts on `import.meta`, so it is rejected at setup time. Only whole
//! keys are compared: `env.MODE` does not collide with Vite's `env`.

use serde::{Deserialize, Serialize};

use crate::bindings::BindingTable;
use crate::error::{ReservedProperty, ReservedPropertyErrors};

/// WinterTC `import.meta` registry (url, resolve, and the Node/Deno/Bun path helpers).
static WINTER_TC: &[&str] = &[
    "url", "resolve", "main", "dirname", "filename", "dir", "file", "path",
];
static VITE: &[&str] = &["hot", "env", "glob"];
static FARM: &[&str] = &["hot", "env", "glob"];
static ROLLDOWN: &[&str] = &["browserBuild"];
static RSPACK: &[&str] = &["webpack", "webpackHot", "webpackContext"];
static WEBPACK: &[&str] = &["webpack", "webpackHot", "webpackContext"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundlerTarget {
    WinterTc,
    Vite,
    Farm,
    Rolldown,
    Rollup,
    Rspack,
    Webpack,
    Esbuild,
}

impl BundlerTarget {
    pub fn environment(&self) -> &'static str {
        match self {
            BundlerTarget::WinterTc => "WinterTC",
            BundlerTarget::Vite => "Vite",
            BundlerTarget::Farm => "Farm",
            BundlerTarget::Rolldown => "Rolldown",
            BundlerTarget::Rollup => "Rollup",
            BundlerTarget::Rspack => "RsPack",
            BundlerTarget::Webpack => "Webpack",
            BundlerTarget::Esbuild => "esbuild",
        }
    }

    /// Rollup and esbuild reserve nothing beyond the WinterTC registry.
    pub fn reserved(&self) -> &'static [&'static str] {
        match self {
            BundlerTarget::WinterTc => WINTER_TC,
            BundlerTarget::Vite => VITE,
            BundlerTarget::Farm => FARM,
            BundlerTarget::Rolldown => ROLLDOWN,
            BundlerTarget::Rspack => RSPACK,
            BundlerTarget::Webpack => WEBPACK,
            BundlerTarget::Rollup | BundlerTarget::Esbuild => &[],
        }
    }
}

pub fn assert_not_reserved<'k>(
    target: BundlerTarget,
    keys: impl IntoIterator<Item = &'k str>,
) -> Result<(), ReservedPropertyErrors> {
    let registry = target.reserved();
    let violations: Vec<ReservedProperty> = keys
        .into_iter()
        .filter(|key| registry.contains(key))
        .map(|key| ReservedProperty {
            environment: target.environment(),
            property: key.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ReservedPropertyErrors { violations })
    }
}

pub fn check_table(table: &BindingTable, target: BundlerTarget) -> Result<(), ReservedPropertyErrors> {
    assert_not_reserved(target, table.keys())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingObject;

    #[test]
    fn test_wintertc_rejects_url() {
        let err = assert_not_reserved(BundlerTarget::WinterTc, ["url", "foo"]).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(
            err.violations[0].to_string(),
            "The property name \"import.meta.url\" is reserved by WinterTC and cannot be used."
        );
    }

    #[test]
    fn test_all_violations_aggregated() {
        let err = assert_not_reserved(BundlerTarget::Webpack, ["webpack", "webpackHot", "x"]).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        let message = err.to_string();
        assert!(message.starts_with("Reserved property names found."));
        assert!(message.contains("import.meta.webpackHot"));
    }

    #[test]
    fn test_nested_keys_do_not_collide() {
        let table = BindingTable::build(
            &BindingObject::new().with("env", BindingObject::new().with("MODE", "production")),
        )
        .unwrap();
        assert!(check_table(&table, BundlerTarget::Vite).is_ok());

        let flat = BindingTable::build(&BindingObject::new().with("env", "x")).unwrap();
        assert!(check_table(&flat, BundlerTarget::Vite).is_err());
        assert!(check_table(&flat, BundlerTarget::Farm).is_err());
    }

    #[test]
    fn test_permissive_targets() {
        for target in [BundlerTarget::Rollup, BundlerTarget::Esbuild] {
            assert!(assert_not_reserved(target, ["hot", "webpack", "browserBuild"]).is_ok());
        }
        assert!(assert_not_reserved(BundlerTarget::Rolldown, ["browserBuild"]).is_err());
        assert!(assert_not_reserved(BundlerTarget::Rspack, ["webpackContext"]).is_err());
    }
}
