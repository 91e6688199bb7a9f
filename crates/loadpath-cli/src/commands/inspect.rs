use super::diagnostic;
use loadpath_core::artifact::{self, Validation, HEADER_LEN};
use loadpath_util::fs::mtime_secs;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

#[derive(Serialize)]
struct InspectReport {
    path: String,
    size: usize,
    tag: String,
    current_format: bool,
    source_mtime: u32,
    payload_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    statements: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    /// "fresh", "stale: <reason>" or "no source".
    freshness: String,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Run the inspect command.
pub fn run(path: &Path, json: bool) -> Result<()> {
    let data = std::fs::read(path).into_diagnostic()?;
    let Some(header) = artifact::read_header(&data) else {
        return Err(miette::miette!(
            "{} is not an artifact: {} bytes, header needs {HEADER_LEN}",
            path.display(),
            data.len()
        ));
    };

    let statements = if header.is_current_format() {
        artifact::decode_payload(&data[HEADER_LEN..], path)
            .map(|code| code.body.len())
            .ok()
    } else {
        None
    };

    let source = artifact::source_path_for(path).filter(|p| p.is_file());
    let freshness = match &source {
        Some(source) => {
            let mtime = mtime_secs(source).into_diagnostic()?;
            match artifact::validate(&data, mtime, path).map_err(diagnostic)? {
                Validation::Fresh(_) => "fresh".to_string(),
                Validation::Stale(reason) => format!("stale: {}", reason.as_str()),
            }
        }
        None => "no source".to_string(),
    };

    let report = InspectReport {
        path: path.display().to_string(),
        size: data.len(),
        tag: hex(&header.tag),
        current_format: header.is_current_format(),
        source_mtime: header.source_mtime,
        payload_len: data.len() - HEADER_LEN,
        statements,
        source: source.map(|p| p.display().to_string()),
        freshness,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else {
        println!("{}", report.path);
        let format = if report.current_format { "current" } else { "foreign" };
        println!("  tag:          {} ({format})", report.tag);
        println!("  source mtime: {}", report.source_mtime);
        println!("  payload:      {} bytes", report.payload_len);
        if let Some(statements) = report.statements {
            println!("  statements:   {statements}");
        }
        if let Some(source) = &report.source {
            println!("  source:       {source}");
        }
        println!("  freshness:    {}", report.freshness);
    }
    Ok(())
}
