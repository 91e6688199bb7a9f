use super::diagnostic;
use loadpath_core::{ImportConfig, Importer, Module, Value};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unit description for output.
#[derive(Serialize)]
struct UnitReport {
    name: String,
    is_package: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loader: Option<&'static str>,
    attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct ImportReport {
    unit: UnitReport,
    registry: Vec<String>,
}

impl UnitReport {
    fn from_module(module: &Module) -> Self {
        Self {
            name: module.name().to_string(),
            is_package: module.is_package(),
            origin: module.origin(),
            cached: module.cached().map(|p| p.display().to_string()),
            package: module.package(),
            search_path: module.search_path(),
            loader: module.loader().map(|l| l.kind().as_str()),
            attributes: module
                .namespace()
                .into_iter()
                .map(|(k, v)| (k, value_json(&v)))
                .collect(),
        }
    }
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Module(m) => serde_json::Value::String(format!("<unit {}>", m.name())),
    }
}

/// Run the import command.
///
/// With no `--from` names the dotted leaf is reported; with names the
/// request goes through fromlist handling the way `from NAME import ...`
/// would.
pub fn run(config: &ImportConfig, name: &str, from: &[String], json: bool) -> Result<()> {
    let importer = Importer::new(config);

    let module: Arc<Module> = if from.is_empty() {
        importer.import_module(name, None).map_err(diagnostic)?
    } else {
        let fromlist: Vec<&str> = from.iter().map(String::as_str).collect();
        importer.import(name, None, &fromlist, 0).map_err(diagnostic)?
    };

    let mut registry = importer.registry().names();
    registry.sort();
    let report = ImportReport {
        unit: UnitReport::from_module(&module),
        registry,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else {
        print_human(&report);
    }
    Ok(())
}

fn print_human(report: &ImportReport) {
    let unit = &report.unit;
    let kind = if unit.is_package { "package" } else { "module" };
    println!("{} ({kind})", unit.name);
    if let Some(origin) = &unit.origin {
        println!("  origin:   {origin}");
    }
    if let Some(cached) = &unit.cached {
        println!("  cached:   {cached}");
    }
    if let Some(loader) = unit.loader {
        println!("  loader:   {loader}");
    }
    if let Some(search_path) = &unit.search_path {
        println!("  path:     {}", search_path.join(", "));
    }
    if !unit.attributes.is_empty() {
        println!("  attributes:");
        for (key, value) in &unit.attributes {
            println!("    {key} = {value}");
        }
    }
    println!("registry: {}", report.registry.join(" "));
}
