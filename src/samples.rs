use crate::guard::TrustedRoot;
use std::fs;

/// Fixed demo files, keyed by their name relative to the root.
pub const SAMPLES: &[(&str, &str)] = &[
    ("hello.txt", "Hello from safe file!\n"),
    ("notes/readme.md", "# Readme\nSample readme file"),
];

/// Writes [`SAMPLES`] under `root`, overwriting existing copies.
pub fn write_samples(root: &TrustedRoot) -> std::io::Result<usize> {
    for (name, content) in SAMPLES {
        let path = root.as_path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
    }
    Ok(SAMPLES.len())
}
