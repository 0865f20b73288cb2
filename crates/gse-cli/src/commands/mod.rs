pub mod estimate;
pub mod validate;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Stdout, or a freshly created file when `out` is given.
pub(crate) fn open_output(out: Option<&Path>) -> Result<Box<dyn Write>> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
