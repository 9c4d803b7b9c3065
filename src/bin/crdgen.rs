// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from the Rust types in src/crd.rs, so
//! the manifests in deploy/crds/ never drift from the code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! One file per kind the operator owns, named `<plural>.crd.yaml`.

use capp_operator::crd::registry::owned_kinds;
use capp_operator::crd::{Capp, CappRevision};
use kube::{CustomResourceExt, Resource};
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("deploy/crds");

    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    let generated = [
        generate_crd::<Capp>(output_dir)?,
        generate_crd::<CappRevision>(output_dir)?,
    ];

    // Every owned kind in the registry must have a manifest.
    for kind in owned_kinds() {
        if !generated.contains(&kind.plural) {
            return Err(format!("no CRD generated for owned kind {}", kind.kind).into());
        }
    }

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

/// Write the CRD of `T` and return its plural.
fn generate_crd<T>(output_dir: &Path) -> Result<String, Box<dyn std::error::Error>>
where
    T: CustomResourceExt + Resource<DynamicType = ()>,
{
    let plural = T::plural(&()).to_string();
    let filename = format!("{plural}.crd.yaml");

    let yaml = serde_yaml::to_string(&T::crd())?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    fs::write(output_dir.join(&filename), content)?;
    println!("  ✓ Generated {filename}");

    Ok(plural)
}
