//! Executes a [`CodeObject`] in a unit's namespace.
//!
//! Import statements go back through the [`Importer`], so executing one
//! unit may load others.

use super::{CodeObject, Expr, ImportedName, StmtKind};
use crate::error::{ImportError, ImportResult};
use crate::importer::Importer;
use crate::module::{Module, Value};
use crate::name::CallerContext;
use std::sync::Arc;

/// Run `code` against `module`.
///
/// Execution stops at the first failing statement; attributes bound by
/// earlier statements stay in place.
pub fn execute(code: &CodeObject, module: &Arc<Module>, importer: &Importer) -> ImportResult<()> {
    for stmt in &code.body {
        let fail = |message: String| {
            ImportError::runtime(module.name(), format!("{message} (line {})", stmt.line))
        };

        match &stmt.kind {
            StmtKind::Pass => {}
            StmtKind::Assign { target, expr } => {
                let value = evaluate(expr, module).map_err(fail)?;
                module.set_attr(target.clone(), value);
            }
            StmtKind::Import { module: name, alias } => {
                let caller = CallerContext::for_module(module);
                let top = importer.import(name, Some(&caller), &[], 0)?;
                match alias {
                    Some(alias) => {
                        let target = importer
                            .registry()
                            .get_module(name)
                            .ok_or_else(|| ImportError::not_found(name.clone()))?;
                        module.set_attr(alias.clone(), Value::Module(target));
                    }
                    None => {
                        let binding = name.split('.').next().unwrap_or(name);
                        module.set_attr(binding, Value::Module(top));
                    }
                }
            }
            StmtKind::ImportFrom {
                module: name,
                level,
                names,
            } => {
                let caller = CallerContext::for_module(module);
                let fromlist: Vec<&str> = if names.is_empty() {
                    vec!["*"]
                } else {
                    names.iter().map(|n| n.name.as_str()).collect()
                };
                let source = importer.import(name, Some(&caller), &fromlist, *level)?;
                if names.is_empty() {
                    bind_public(&source, module);
                } else {
                    bind_names(&source, names, module).map_err(fail)?;
                }
            }
            StmtKind::Raise { message } => return Err(fail(message.clone())),
        }
    }
    Ok(())
}

fn evaluate(expr: &Expr, module: &Module) -> Result<Value, String> {
    match expr {
        Expr::None => Ok(Value::None),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Name(dotted) => {
            let mut segments = dotted.split('.');
            let first = segments.next().unwrap_or(dotted);
            let mut value = module
                .get_attr(first)
                .ok_or_else(|| format!("name {first:?} is not defined"))?;
            for segment in segments {
                let owner = value
                    .as_module()
                    .ok_or_else(|| format!("{value} has no attribute {segment:?}"))?;
                let next = owner.get_attr(segment).ok_or_else(|| {
                    format!("module {:?} has no attribute {segment:?}", owner.name())
                })?;
                value = next;
            }
            Ok(value)
        }
    }
}

fn bind_names(source: &Module, names: &[ImportedName], target: &Module) -> Result<(), String> {
    for imported in names {
        let value = source.get_attr(&imported.name).ok_or_else(|| {
            format!(
                "cannot import name {:?} from {:?}",
                imported.name,
                source.name()
            )
        })?;
        target.set_attr(imported.binding(), value);
    }
    Ok(())
}

fn bind_public(source: &Module, target: &Module) {
    for (name, value) in source.namespace() {
        if !name.starts_with('_') {
            target.set_attr(name, value);
        }
    }
}

