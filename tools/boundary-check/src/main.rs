use cargo_metadata::{DependencyKind, MetadataCommand, Package};
use std::collections::{BTreeMap, BTreeSet};

/// Crates from the bottom of the stack up. A crate may depend only on
/// crates listed before it.
const LAYERS: [&str; 5] = [
    "ordercheck-core",
    "ordercheck-io",
    "ordercheck-score",
    "ordercheck-eval",
    "ordercheck-cli",
];

const EXEMPT: [&str; 1] = ["boundary-check"];

fn main() {
    let metadata = match MetadataCommand::new().exec() {
        Ok(metadata) => metadata,
        Err(err) => {
            eprintln!("boundary-check: failed to read cargo metadata: {err}");
            std::process::exit(2);
        }
    };

    let members: BTreeSet<_> = metadata.workspace_members.iter().cloned().collect();
    let packages: BTreeMap<String, Package> = metadata
        .packages
        .into_iter()
        .filter(|pkg| members.contains(&pkg.id))
        .map(|pkg| (pkg.name.clone(), pkg))
        .collect();

    let violations = check(&packages);
    if violations.is_empty() {
        println!("boundary-check: ok ({} crates)", packages.len());
    } else {
        eprintln!("boundary-check: layering violations detected:");
        for item in violations {
            eprintln!("  {item}");
        }
        std::process::exit(1);
    }
}

fn check(packages: &BTreeMap<String, Package>) -> Vec<String> {
    let mut violations = Vec::new();
    for (name, pkg) in packages {
        if EXEMPT.contains(&name.as_str()) {
            continue;
        }
        let Some(layer) = layer_of(name) else {
            violations.push(format!("{name} is not assigned a layer"));
            continue;
        };
        for dep in &pkg.dependencies {
            if dep.kind == DependencyKind::Development || !packages.contains_key(&dep.name) {
                continue;
            }
            match layer_of(&dep.name) {
                Some(dep_layer) if dep_layer < layer => {}
                _ => violations.push(format!("{name} -> {}", dep.name)),
            }
        }
    }
    violations
}

fn layer_of(name: &str) -> Option<usize> {
    LAYERS.iter().position(|layer| *layer == name)
}
