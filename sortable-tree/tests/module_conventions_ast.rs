use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use syn::{Attribute, ImplItem, Item, UseTree, Visibility};

const CONTROLLER_FILES: [&str; 4] = ["command", "event", "reducer", "state"];

#[test]
fn given_crate_root_when_validating_layout_then_every_module_is_declared() {
    let src_dir = source_dir();
    let lib_rs = src_dir.join("lib.rs");
    let file = parse(&lib_rs);

    let mut violations: Vec<String> = Vec::new();
    let mut declared_modules = BTreeSet::new();
    for item in &file.items {
        let Item::Mod(item_mod) = item else {
            continue;
        };
        if item_mod.content.is_some() {
            violations.push(format!(
                "{}: inline module '{}' is forbidden at crate root",
                lib_rs.display(),
                item_mod.ident
            ));
        }
        if !matches!(item_mod.vis, Visibility::Inherited) {
            violations.push(format!(
                "{}: module '{}' must stay private and be re-exported",
                lib_rs.display(),
                item_mod.ident
            ));
        }
        declared_modules.insert(item_mod.ident.to_string());
    }

    let fs_modules = module_names(&src_dir, "lib.rs");
    if declared_modules != fs_modules {
        violations.push(format!(
            "{}: declared modules {:?} do not match file modules {:?}",
            lib_rs.display(),
            declared_modules,
            fs_modules
        ));
    }

    assert!(
        violations.is_empty(),
        "layout violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn given_controller_when_validating_layout_then_reducer_split_is_kept() {
    let controller_dir = source_dir().join("controller");
    let mod_rs = controller_dir.join("mod.rs");
    let file = parse(&mod_rs);

    let declared: BTreeSet<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Mod(item_mod) if item_mod.content.is_none() => {
                Some(item_mod.ident.to_string())
            },
            _ => None,
        })
        .collect();
    let expected: BTreeSet<String> =
        CONTROLLER_FILES.iter().map(|name| name.to_string()).collect();

    assert_eq!(declared, expected);
    assert_eq!(module_names(&controller_dir, "mod.rs"), expected);
}

#[test]
fn given_state_when_validating_visibility_then_writers_are_not_public() {
    let state_rs = source_dir().join("controller/state.rs");
    let file = parse(&state_rs);

    let mut violations: Vec<String> = Vec::new();
    for item in &file.items {
        let Item::Impl(item_impl) = item else {
            continue;
        };
        for impl_item in &item_impl.items {
            let ImplItem::Fn(method) = impl_item else {
                continue;
            };
            let name = method.sig.ident.to_string();
            let is_writer = name.starts_with("set_")
                || name.starts_with("take_")
                || name.ends_with("_mut");
            if is_writer && matches!(method.vis, Visibility::Public(_)) {
                violations.push(format!(
                    "{}: writer '{name}' must be pub(super)",
                    state_rs.display()
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "state visibility violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn given_sources_when_validating_imports_then_globs_only_appear_in_tests() {
    let mut violations: Vec<String> = Vec::new();
    for path in source_files(&source_dir()) {
        let file = parse(&path);
        for item in &file.items {
            match item {
                Item::Use(item_use) if use_tree_has_glob(&item_use.tree) => {
                    violations.push(format!(
                        "{}: wildcard use/import is forbidden",
                        path.display()
                    ));
                },
                Item::Mod(item_mod) if !is_cfg_test(&item_mod.attrs) => {
                    let nested = item_mod
                        .content
                        .iter()
                        .flat_map(|(_, items)| items.iter());
                    for nested_item in nested {
                        if let Item::Use(item_use) = nested_item {
                            if use_tree_has_glob(&item_use.tree) {
                                violations.push(format!(
                                    "{}: wildcard use/import in module '{}'",
                                    path.display(),
                                    item_mod.ident
                                ));
                            }
                        }
                    }
                },
                _ => {},
            }
        }
    }

    assert!(
        violations.is_empty(),
        "import violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn given_sources_when_validating_library_code_then_it_never_unwraps() {
    let mut violations: Vec<String> = Vec::new();
    for path in source_files(&source_dir()) {
        if path.file_stem().is_some_and(|stem| stem == "fixtures") {
            continue;
        }
        let source = read(&path);
        let library = match source.find("#[cfg(test)]\nmod tests") {
            Some(end) => &source[..end],
            None => source.as_str(),
        };
        for forbidden in [".unwrap()", ".expect(", "panic!(", "todo!("] {
            if library.contains(forbidden) {
                violations.push(format!(
                    "{}: {forbidden} outside of tests",
                    path.display()
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "error handling violations:\n{}",
        violations.join("\n")
    );
}

fn source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()))
}

fn parse(path: &Path) -> syn::File {
    syn::parse_file(&read(path)).unwrap_or_else(|err| {
        panic!("failed to parse {}: {err}", path.display())
    })
}

/// Module names backed by a file or directory inside `dir`.
fn module_names(dir: &Path, root_file: &str) -> BTreeSet<String> {
    let entries = fs::read_dir(dir).unwrap_or_else(|err| {
        panic!("failed to read dir {}: {err}", dir.display())
    });

    let mut modules = BTreeSet::new();
    for entry in entries {
        let entry = entry
            .unwrap_or_else(|err| panic!("failed to read dir entry: {err}"));
        let path = entry.path();
        if path.is_dir() {
            if path.join("mod.rs").exists() {
                modules.insert(file_name(&path));
            }
            continue;
        }
        if path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        if file_name(&path) == root_file {
            continue;
        }
        let stem = path
            .file_stem()
            .unwrap_or_else(|| panic!("missing stem for {}", path.display()))
            .to_string_lossy()
            .to_string();
        modules.insert(stem);
    }
    modules
}

fn source_files(dir: &Path) -> Vec<PathBuf> {
    let entries = fs::read_dir(dir).unwrap_or_else(|err| {
        panic!("failed to read dir {}: {err}", dir.display())
    });

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .unwrap_or_else(|err| panic!("failed to read dir entry: {err}"));
        let path = entry.path();
        if path.is_dir() {
            files.extend(source_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_else(|| panic!("missing file name for {}", path.display()))
        .to_string_lossy()
        .to_string()
}

fn is_cfg_test(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|ident| ident == "test")
    })
}

fn use_tree_has_glob(tree: &UseTree) -> bool {
    match tree {
        UseTree::Glob(_) => true,
        UseTree::Group(group) => group.items.iter().any(use_tree_has_glob),
        UseTree::Path(path) => use_tree_has_glob(&path.tree),
        UseTree::Name(_) | UseTree::Rename(_) => false,
    }
}
