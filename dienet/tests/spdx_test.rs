// SPDX-License-Identifier: Apache-2.0

//! Every Rust source of the workspace starts with the license identifier.

use std::path::{Path, PathBuf};

const EXPECTED: &str = "// SPDX-License-Identifier: Apache-2.0";
const EXCLUDE_DIR_NAMES: &[&str] = &["target", ".git", "examples"];

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap();
        if path.is_dir() {
            if !EXCLUDE_DIR_NAMES.contains(&name) {
                collect_sources(&path, out);
            }
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn every_source_has_an_spdx_identifier() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
    let mut sources = Vec::new();
    collect_sources(root, &mut sources);
    assert!(!sources.is_empty());

    let missing: Vec<_> = sources
        .iter()
        .filter(|path| {
            let text = std::fs::read_to_string(path).unwrap();
            !text.lines().next().is_some_and(|l| l.starts_with(EXPECTED))
        })
        .collect();
    assert!(missing.is_empty(), "missing SPDX identifier: {:?}", missing);
}
