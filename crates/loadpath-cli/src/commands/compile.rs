use loadpath_core::artifact::{CACHE_DIR, SOURCE_SUFFIX};
use loadpath_core::loader::{CodeOrigin, LoaderEnv, PACKAGE_INIT_STEM};
use loadpath_core::{
    ImportConfig, ImportFlags, ImportResult, LineCompiler, SourceFileLoader,
    SourceLoader,
};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Compiled,
    UpToDate,
    Unwritten,
    Failed,
}

#[derive(Serialize)]
struct FileResult {
    path: String,
    name: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, Default)]
struct CompileReport {
    compiled: usize,
    up_to_date: usize,
    unwritten: usize,
    failed: usize,
    files: Vec<FileResult>,
}

impl CompileReport {
    fn record(&mut self, result: FileResult) {
        match result.status {
            Status::Compiled => self.compiled += 1,
            Status::UpToDate => self.up_to_date += 1,
            Status::Unwritten => self.unwritten += 1,
            Status::Failed => self.failed += 1,
        }
        self.files.push(result);
    }
}

/// Run the compile command.
///
/// Artifacts are written even when `--no-write-artifacts` or
/// `LOADPATH_DONTWRITEARTIFACTS` is set; writing them is the point.
pub fn run(config: &ImportConfig, dir: &Path, force: bool, json: bool) -> Result<()> {
    if !dir.is_dir() {
        return Err(miette::miette!("{} is not a directory", dir.display()));
    }

    let flags = ImportFlags::from_config(&config.clone().with_dont_write_artifacts(false));
    let env = LoaderEnv::new(Arc::new(LineCompiler::new()), Arc::new(flags));
    let mut report = CompileReport::default();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != CACHE_DIR);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let is_source = entry.file_name().to_string_lossy().ends_with(SOURCE_SUFFIX);
        if !entry.file_type().is_file() || !is_source {
            continue;
        }

        let name = unit_name(dir, path);
        let loader = SourceFileLoader::new(name.clone(), path, env.clone());
        let (status, error) = match compile_one(&loader, &env, force) {
            Ok(status) => (status, None),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "compile failed");
                (Status::Failed, Some(e.to_string()))
            }
        };
        report.record(FileResult {
            path: path.display().to_string(),
            name,
            status,
            error,
        });
    }

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else {
        print_human(&report);
    }

    if report.failed > 0 {
        return Err(miette::miette!("{} file(s) failed to compile", report.failed));
    }
    Ok(())
}

fn compile_one(loader: &SourceFileLoader, env: &LoaderEnv, force: bool) -> ImportResult<Status> {
    if !force {
        return Ok(match loader.get_code_with_status()?.1 {
            CodeOrigin::Artifact => Status::UpToDate,
            CodeOrigin::Compiled { persisted: true } => Status::Compiled,
            CodeOrigin::Compiled { persisted: false } => Status::Unwritten,
        });
    }

    let mtime = loader.path_mtime(loader.path())?;
    let text = loader.source_text()?;
    let code = env
        .compiler
        .compile(&text, &loader.path().display().to_string())?;
    if loader.persist(&code, mtime) {
        Ok(Status::Compiled)
    } else {
        Ok(Status::Unwritten)
    }
}

/// Dotted name a source file would be imported under with `root` on the search path.
fn unit_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(SOURCE_SUFFIX) {
            *last = stem.to_string();
        }
    }
    if parts.len() > 1 && parts.last().is_some_and(|p| p == PACKAGE_INIT_STEM) {
        parts.pop();
    }
    parts.join(".")
}

fn print_human(report: &CompileReport) {
    for file in &report.files {
        let label = match file.status {
            Status::Compiled => "compiled",
            Status::UpToDate => "current ",
            Status::Unwritten => "unsaved ",
            Status::Failed => "FAILED  ",
        };
        match &file.error {
            Some(error) => println!("{label} {} ({error})", file.name),
            None => println!("{label} {}", file.name),
        }
    }
    println!(
        "{} compiled, {} up to date, {} not written, {} failed",
        report.compiled, report.up_to_date, report.unwritten, report.failed
    );
}
