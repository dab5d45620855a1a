//! CLI command for dumping the logical scene graph

use std::path::Path;

use crate::import::{ImportOptions, JtImporter};

pub fn execute(
    file: &Path,
    options: &ImportOptions,
    attributes: bool,
    properties: bool,
) -> anyhow::Result<()> {
    // The tree is complete without tessellation
    let options = options.clone().with_skip_geometry(true);
    let document = JtImporter::new(options).import_file(file)?;

    print!("{}", document.scene.describe(attributes, properties));
    for info in document.warnings() {
        eprintln!("{info}");
    }
    Ok(())
}
