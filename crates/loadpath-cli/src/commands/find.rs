use super::diagnostic;
use loadpath_core::name::parent_name;
use loadpath_core::{ImportConfig, ImportError, Importer};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

#[derive(Serialize)]
struct FindReport {
    name: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_package: Option<bool>,
}

/// Run the find command.
///
/// Parents of a dotted name are imported so their search path is known;
/// the named unit itself is only located.
pub fn run(config: &ImportConfig, name: &str, json: bool) -> Result<()> {
    let importer = Importer::new(config);

    let path = match parent_name(name) {
        Some(parent) => {
            let package = importer.import_module(parent, None).map_err(diagnostic)?;
            let Some(search_path) = package.search_path() else {
                return Err(diagnostic(ImportError::NotAPackage {
                    name: name.to_string(),
                    parent: parent.to_string(),
                }));
            };
            Some(search_path)
        }
        None => None,
    };

    let loader = importer.find_loader(name, path.as_deref());
    let report = FindReport {
        name: name.to_string(),
        found: loader.is_some(),
        kind: loader.as_ref().map(|l| l.kind().as_str()),
        filename: loader
            .as_ref()
            .and_then(|l| l.get_filename(name))
            .map(|p| p.display().to_string()),
        is_package: loader.as_ref().map(|l| l.is_package(name)),
    };

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else if report.found {
        let kind = report.kind.unwrap_or("custom");
        match &report.filename {
            Some(filename) => println!("{name}: {kind} {filename}"),
            None => println!("{name}: {kind}"),
        }
    }

    if report.found {
        Ok(())
    } else if json {
        std::process::exit(1);
    } else {
        Err(diagnostic(ImportError::not_found(name)))
    }
}
