//! Relative addressing through `import`, `import_module` and executing units.

mod common;

use common::{int_attr, Tree};
use loadpath_core::{CallerContext, ImportError, Importer, Module};

fn package_tree() -> Tree {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "pass\n");
    tree.write("pkg/mod1.src", "value = 1\n");
    tree.write("pkg/sub/__init__.src", "pass\n");
    tree.write("pkg/sub/mod2.src", "value = 2\n");
    tree
}

#[test]
fn test_sibling_from_module() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg.mod1", None, &["x"], 0).unwrap();

    let caller = CallerContext::with_name("pkg.mod1", false);
    let pkg = importer.import("", Some(&caller), &["sub"], 1).unwrap();
    assert_eq!(pkg.name(), "pkg");
    assert!(pkg.has_attr("sub"));
}

#[test]
fn test_from_package_uses_own_name() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg.sub", None, &["x"], 0).unwrap();

    let caller = CallerContext::with_name("pkg.sub", true);
    let module = importer.import("mod2", Some(&caller), &["value"], 1).unwrap();
    assert_eq!(module.name(), "pkg.sub.mod2");
}

#[test]
fn test_parent_level() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg.sub.mod2", None, &["x"], 0).unwrap();

    let caller = CallerContext::with_name("pkg.sub.mod2", false);
    let module = importer.import("mod1", Some(&caller), &["value"], 2).unwrap();
    assert_eq!(module.name(), "pkg.mod1");
}

#[test]
fn test_relative_without_fromlist_returns_first_segment() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg", None, &[], 0).unwrap();

    let caller = CallerContext::with_package("pkg");
    let module = importer.import("sub.mod2", Some(&caller), &[], 1).unwrap();
    assert_eq!(module.name(), "pkg.sub");
}

#[test]
fn test_relative_dotted_return_uses_resolved_name() {
    let importer = Importer::default();
    let pkg = Module::new("pkg");
    pkg.set_search_path(Some(Vec::new()));
    let sub = Module::new("pkg.sub");
    sub.set_search_path(Some(Vec::new()));
    importer.registry().insert("pkg", pkg);
    importer.registry().insert("pkg.sub", sub);
    importer.registry().insert("pkg.sub.x", Module::new("y"));

    let caller = CallerContext::with_package("pkg");
    let module = importer.import("sub.x", Some(&caller), &[], 1).unwrap();
    assert_eq!(module.name(), "pkg.sub");
}

#[test]
fn test_beyond_top_level() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg", None, &[], 0).unwrap();

    let caller = CallerContext::with_package("pkg");
    let err = importer.import("top_level", Some(&caller), &[], 2).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRelativeAddress { .. }));
}

#[test]
fn test_parent_not_loaded() {
    let tree = package_tree();
    let importer = tree.importer();

    let caller = CallerContext::with_package("pkg");
    let err = importer.import("mod1", Some(&caller), &[], 1).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRelativeAddress { .. }));
}

#[test]
fn test_relative_without_context() {
    let err = package_tree().importer().import("mod1", None, &[], 1).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRelativeAddress { .. }));
}

#[test]
fn test_import_module_relative() {
    let tree = package_tree();
    let importer = tree.importer();
    importer.import("pkg.sub", None, &["x"], 0).unwrap();

    let module = importer.import_module("..mod1", Some("pkg.sub")).unwrap();
    assert_eq!(module.name(), "pkg.mod1");

    let module = importer.import_module(".mod2", Some("pkg.sub")).unwrap();
    assert_eq!(module.name(), "pkg.sub.mod2");
}

#[test]
fn test_import_module_absolute_returns_leaf() {
    let tree = package_tree();
    let module = tree.importer().import_module("pkg.sub.mod2", None).unwrap();
    assert_eq!(module.name(), "pkg.sub.mod2");
}

#[test]
fn test_import_module_relative_needs_package() {
    let err = package_tree().importer().import_module(".mod1", None).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRelativeAddress { .. }));
}

#[test]
fn test_relative_statements_in_source() {
    let tree = package_tree();
    tree.write(
        "pkg/sub/user.src",
        concat!(
            "from . import mod2\n",
            "from ..mod1 import value as one\n",
            "from .mod2 import value\n",
            "two = mod2.value\n",
        ),
    );
    let importer = tree.importer();

    let user = importer.import_module("pkg.sub.user", None).unwrap();
    assert_eq!(int_attr(&user, "one"), Some(1));
    assert_eq!(int_attr(&user, "value"), Some(2));
    assert_eq!(int_attr(&user, "two"), Some(2));
    assert_eq!(user.package().as_deref(), Some("pkg.sub"));
}

#[test]
fn test_relative_statement_in_package_init() {
    let tree = Tree::new();
    tree.write("pkg/__init__.src", "from .helper import flag\n");
    tree.write("pkg/helper.src", "flag = True\n");
    let importer = tree.importer();

    let pkg = importer.import("pkg", None, &[], 0).unwrap();
    assert_eq!(pkg.get_attr("flag"), Some(loadpath_core::Value::Bool(true)));
    assert!(pkg.has_attr("helper"));
}

#[test]
fn test_relative_statement_in_top_level_module_fails() {
    let tree = Tree::new();
    tree.write("loose.src", "from . import anything\n");

    let err = tree.importer().import("loose", None, &[], 0).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRelativeAddress { .. }));
}
