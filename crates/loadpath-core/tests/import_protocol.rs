//! Finder chain, registry and package resolution behaviour.

mod common;

use common::{int_attr, str_attr, MockFinder, Tree};
use loadpath_core::finder::Finder;
use loadpath_core::{CallerContext, Compiler, ImportError, Importer, LoaderKind, Module, Value};
use std::sync::Arc;

#[test]
fn test_first_meta_finder_wins() {
    let importer = Importer::default();
    let first = MockFinder::new("first", &["X"], &[]);
    let second = MockFinder::new("second", &["X"], &[]);
    importer.set_meta_path(vec![first.clone() as Arc<dyn Finder>, second.clone()]);

    let module = importer.import("X", None, &[], 0).unwrap();
    assert_eq!(str_attr(&module, "tag").as_deref(), Some("first"));
    assert_eq!(second.query_count(), 0);
}

#[test]
fn test_falls_through_to_later_finder() {
    let importer = Importer::default();
    let first = MockFinder::new("first", &[], &[]);
    let second = MockFinder::new("second", &["X"], &[]);
    importer.set_meta_path(vec![first.clone() as Arc<dyn Finder>, second.clone()]);

    let module = importer.import("X", None, &[], 0).unwrap();
    assert_eq!(str_attr(&module, "tag").as_deref(), Some("second"));
    assert_eq!(first.query_count(), 1);
}

#[test]
fn test_inserted_meta_finder_shadows_builtins_and_files() {
    let tree = Tree::new();
    tree.write("m.src", "tag = 'file'\n");
    let importer = tree.importer();
    importer.builtins().register("sys", |_m: &Module| Ok(()));
    let front = MockFinder::new("front", &["m", "sys"], &[]);
    importer.insert_meta_finder(front.clone());

    let sys = importer.import("sys", None, &[], 0).unwrap();
    assert_eq!(str_attr(&sys, "tag").as_deref(), Some("front"));
    let m = importer.import("m", None, &[], 0).unwrap();
    assert_eq!(str_attr(&m, "tag").as_deref(), Some("front"));
    assert_eq!(importer.meta_path().len(), 3);
}

#[test]
fn test_pushed_meta_finder_runs_after_builtins_before_files() {
    let tree = Tree::new();
    tree.write("m.src", "tag = 'file'\n");
    let importer = tree.importer();
    importer.builtins().register("sys", |_m: &Module| Ok(()));
    let back = MockFinder::new("back", &["m", "sys"], &[]);
    importer.push_meta_finder(back.clone());

    let sys = importer.import("sys", None, &[], 0).unwrap();
    assert_eq!(str_attr(&sys, "tag"), None);
    assert_eq!(back.query_count(), 0);

    let m = importer.import("m", None, &[], 0).unwrap();
    assert_eq!(str_attr(&m, "tag").as_deref(), Some("back"));
}

#[test]
fn test_meta_finder_receives_parent_path() {
    let importer = Importer::default();
    let finder = MockFinder::new("mock", &["pkg.mod"], &["pkg"]);
    importer.set_meta_path(vec![finder.clone() as Arc<dyn Finder>]);

    importer.import("pkg.mod", None, &[], 0).unwrap();
    let queries = finder.queries.lock().unwrap().clone();
    assert_eq!(queries[0], ("pkg".to_string(), None));
    assert_eq!(queries[1], ("pkg.mod".to_string(), Some(Vec::new())));
}

#[test]
fn test_not_found() {
    let tree = Tree::new();
    let err = tree.importer().import("nothing_here", None, &[], 0).unwrap_err();
    assert!(err.is_not_found_for("nothing_here"));
    assert_eq!(err.code(), loadpath_core::codes::IMPORT_NOT_FOUND);
}

#[test]
fn test_empty_name() {
    let err = Importer::default().import("", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::EmptyName));
}

#[test]
fn test_idempotent_load() {
    let tree = Tree::new();
    tree.write("top.src", "a = 1\n");
    let importer = tree.importer();

    let first = importer.import("top", None, &[], 0).unwrap();
    let second = importer.import("top", None, &[], 0).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(int_attr(&first, "a"), Some(1));
}

#[test]
fn test_registry_short_circuits_finders() {
    let importer = Importer::default();
    let finder = MockFinder::new("mock", &["X"], &[]);
    importer.set_meta_path(vec![finder.clone() as Arc<dyn Finder>]);

    let preset = Module::new("X");
    importer.registry().insert("X", preset.clone());
    let module = importer.import("X", None, &[], 0).unwrap();
    assert!(Arc::ptr_eq(&module, &preset));
    assert_eq!(finder.query_count(), 0);
}

#[test]
fn test_failure_marker_halts() {
    let importer = Importer::default();
    let finder = MockFinder::new("mock", &["X"], &[]);
    importer.set_meta_path(vec![finder.clone() as Arc<dyn Finder>]);
    importer.registry().mark_failed("X");

    let err = importer.import("X", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::Halted { .. }));
    assert_eq!(finder.query_count(), 0);
}

#[test]
fn test_package_and_submodule() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "name = 'pkg'\n");
    tree.write("pkg/mod.src", "name = 'mod'\n");
    let importer = tree.importer();

    let module = importer.import("pkg.mod", None, &["name"], 0).unwrap();
    assert_eq!(module.name(), "pkg.mod");

    let pkg = importer.registry().get_module("pkg").unwrap();
    assert!(pkg.is_package());
    assert_eq!(
        pkg.search_path(),
        Some(vec![tree.root().join("pkg").to_string_lossy().into_owned()])
    );
    assert_eq!(pkg.get_attr("mod"), Some(Value::Module(module.clone())));
    assert_eq!(pkg.package().as_deref(), Some("pkg"));
    assert_eq!(module.package().as_deref(), Some("pkg"));
    assert_eq!(module.loader().unwrap().kind(), LoaderKind::Source);
    assert!(importer.registry().contains("pkg.mod"));
}

#[test]
fn test_dotted_import_returns_top_level() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/sub/__init__.src", "pass\n");
    tree.write("pkg/sub/leaf.src", "pass\n");
    let importer = tree.importer();

    let top = importer.import("pkg.sub.leaf", None, &[], 0).unwrap();
    assert_eq!(top.name(), "pkg");

    let leaf = importer.import("pkg.sub.leaf", None, &["x"], 0).unwrap();
    assert_eq!(leaf.name(), "pkg.sub.leaf");
}

#[test]
fn test_submodule_of_non_package() {
    let tree = Tree::new();
    tree.write("plain.src", "pass\n");
    let importer = tree.importer();

    let err = importer.import("plain.child", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::NotAPackage { ref parent, .. } if parent == "plain"));
}

#[test]
fn test_failed_first_load_is_unregistered() {
    let tree = Tree::new();
    tree.write("broken.src", "a = 1\nraise 'boom'\n");
    let importer = tree.importer();

    let err = importer.import("broken", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::Runtime { .. }));
    assert!(err.to_string().contains("boom"));
    assert!(!importer.registry().contains("broken"));
}

#[test]
fn test_syntax_error_surfaces_unchanged() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/bad.src", "pass\nthis is not valid\n");
    let importer = tree.importer();

    let err = importer.import("pkg.bad", None, &[], 0).unwrap_err();
    match err {
        ImportError::Syntax(e) => {
            assert_eq!(e.line, Some(2));
            assert!(e.origin.ends_with("bad.src"));
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert!(importer.registry().contains("pkg"));
    assert!(!importer.registry().contains("pkg.bad"));
}

#[test]
fn test_fromlist_imports_submodules() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/a.src", "v = 1\n");
    tree.write("pkg/b.src", "v = 2\n");
    let importer = tree.importer();

    let pkg = importer.import("pkg", None, &["a", "b", "missing"], 0).unwrap();
    assert_eq!(pkg.name(), "pkg");
    assert!(pkg.has_attr("a"));
    assert!(pkg.has_attr("b"));
    assert!(!pkg.has_attr("missing"));
    assert!(importer.registry().contains("pkg.a"));
}

#[test]
fn test_fromlist_skips_existing_attribute() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "a = 42\n");
    tree.write("pkg/a.src", "pass\n");
    let importer = tree.importer();

    let pkg = importer.import("pkg", None, &["a"], 0).unwrap();
    assert_eq!(int_attr(&pkg, "a"), Some(42));
    assert!(!importer.registry().contains("pkg.a"));
}

#[test]
fn test_fromlist_binds_registered_submodule() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    let importer = tree.importer();
    let pkg = importer.import("pkg", None, &[], 0).unwrap();

    let injected = Module::new("pkg.injected");
    importer.registry().insert("pkg.injected", injected.clone());
    importer.import("pkg", None, &["injected"], 0).unwrap();
    assert_eq!(pkg.get_attr("injected"), Some(Value::Module(injected)));
}

#[test]
fn test_fromlist_propagates_real_errors() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/bad.src", "raise 'nope'\n");
    let importer = tree.importer();

    let err = importer.import("pkg", None, &["bad"], 0).unwrap_err();
    assert!(matches!(err, ImportError::Runtime { .. }));
}

#[test]
fn test_fromlist_on_module_is_ignored() {
    let tree = Tree::new();
    tree.write("plain.src", "pass\n");
    let importer = tree.importer();

    let module = importer.import("plain", None, &["anything"], 0).unwrap();
    assert_eq!(module.name(), "plain");
}

#[test]
fn test_parent_binding_on_nested_import() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "import pkg.child\n");
    tree.write("pkg/child.src", "value = 'child'\n");
    let importer = tree.importer();

    let pkg = importer.import("pkg", None, &[], 0).unwrap();
    let child = pkg.get_attr("child").and_then(|v| v.as_module().cloned()).unwrap();
    assert_eq!(str_attr(&child, "value").as_deref(), Some("child"));
}

#[test]
fn test_execution_binds_imports() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/util.src", "answer = 42\n");
    tree.write(
        "main.src",
        concat!(
            "import pkg.util\n",
            "import pkg.util as u\n",
            "from pkg.util import answer as a\n",
            "x = pkg.util.answer\n",
        ),
    );
    let importer = tree.importer();

    let main = importer.import("main", None, &[], 0).unwrap();
    assert_eq!(main.get_attr("pkg").unwrap().as_module().unwrap().name(), "pkg");
    assert_eq!(main.get_attr("u").unwrap().as_module().unwrap().name(), "pkg.util");
    assert_eq!(int_attr(&main, "a"), Some(42));
    assert_eq!(int_attr(&main, "x"), Some(42));
}

#[test]
fn test_cannot_import_name() {
    let tree = Tree::new();
    tree.write("lib.src", "present = 1\n");
    tree.write("user.src", "from lib import absent\n");
    let importer = tree.importer();

    let err = importer.import("user", None, &[], 0).unwrap_err();
    assert!(err.to_string().contains("cannot import name"));
}

#[test]
fn test_star_import_binds_public_names() {
    let tree = Tree::new();
    tree.write("lib.src", "public = 1\n_private = 2\n");
    tree.write("user.src", "from lib import *\n");
    let importer = tree.importer();

    let user = importer.import("user", None, &[], 0).unwrap();
    assert_eq!(int_attr(&user, "public"), Some(1));
    assert!(!user.has_attr("_private"));
}

#[test]
fn test_cyclic_import_sees_partial_unit() {
    let tree = Tree::new();
    tree.write("a.src", "first = 1\nimport b\nlast = 2\n");
    tree.write("b.src", "import a\nseen = a.first\n");
    let importer = tree.importer();

    let a = importer.import("a", None, &[], 0).unwrap();
    let b = a.get_attr("b").and_then(|v| v.as_module().cloned()).unwrap();
    assert_eq!(int_attr(&b, "seen"), Some(1));
    assert_eq!(int_attr(&a, "last"), Some(2));
}

#[test]
fn test_builtin_and_frozen() {
    let importer = Importer::default();
    importer.builtins().register("sys", |m: &Module| {
        m.set_attr("platform", Value::Str("test".into()));
        Ok(())
    });
    let code = importer
        .compiler()
        .compile("greeting = 'hello'\n", "<frozen>")
        .unwrap();
    importer.frozen().register("__phello__", code, true);

    let sys = importer.import("sys", None, &[], 0).unwrap();
    assert!(sys.origin().is_none());
    assert_eq!(sys.loader().unwrap().kind(), LoaderKind::Builtin);
    assert_eq!(sys.package().as_deref(), Some(""));

    let frozen = importer.import("__phello__", None, &[], 0).unwrap();
    assert_eq!(frozen.origin().as_deref(), Some("<frozen>"));
    assert_eq!(frozen.search_path(), Some(vec!["__phello__".to_string()]));
    assert_eq!(str_attr(&frozen, "greeting").as_deref(), Some("hello"));
}

#[test]
fn test_extension_loader() {
    let tree = Tree::new();
    let suffix = loadpath_core::loader::EXTENSION_SUFFIXES[0];
    tree.write(&format!("fast{suffix}"), b"\x7fELF");
    tree.write(&format!("missing_init{suffix}"), b"\x7fELF");
    let importer = tree.importer();
    importer.natives().register("fast", |m: &Module| {
        m.set_attr("speed", Value::Int(9));
        Ok(())
    });

    let fast = importer.import("fast", None, &[], 0).unwrap();
    assert_eq!(int_attr(&fast, "speed"), Some(9));
    assert_eq!(fast.loader().unwrap().kind(), LoaderKind::Extension);

    let err = importer.import("missing_init", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::Extension { .. }));
    assert!(!importer.registry().contains("missing_init"));
}

#[test]
fn test_find_loader_reports_kind() {
    let tree = Tree::new();
    tree.write("m.src", "pass\n");
    let importer = tree.importer();

    let loader = importer.find_loader("m", None).unwrap();
    assert_eq!(loader.kind(), LoaderKind::Source);
    assert_eq!(loader.get_filename("m"), Some(tree.root().join("m.src")));
    assert!(importer.find_loader("nope", None).is_none());
    assert!(!importer.registry().contains("m"));
}

#[test]
fn test_invalidate_caches_sees_new_files() {
    let tree = Tree::new();
    let importer = tree.importer();
    assert!(importer.import("late", None, &[], 0).is_err());

    tree.write("late.src", "pass\n");
    importer.invalidate_caches();
    assert!(importer.import("late", None, &[], 0).is_ok());
}

#[test]
fn test_caller_context_for_loaded_module() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/mod.src", "pass\n");
    let importer = tree.importer();

    let module = importer.import("pkg.mod", None, &["x"], 0).unwrap();
    let ctx = CallerContext::for_module(&module);
    assert_eq!(ctx.package_name().unwrap(), "pkg");
}

#[test]
fn test_concurrent_first_loads_share_one_unit() {
    let tree = Tree::new();
    tree.write("shared.src", "a = 1\n");
    let importer = tree.importer();

    let loaded: Vec<Arc<Module>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| importer.import("shared", None, &[], 0).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(loaded.iter().all(|m| Arc::ptr_eq(m, &loaded[0])));
}
