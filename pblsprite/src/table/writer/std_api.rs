use crate::table::{PackError, SpriteTableWriter};
use snafu::{ResultExt, Snafu};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Snafu)]
pub enum WriteTableError {
    #[snafu(display("Sprite table rejected the write"))]
    Pack { source: PackError },
    #[snafu(display("Failed to write sprite table `{}`", path.display()))]
    WriteIo {
        path: PathBuf,
        source: std::io::Error,
    },
    WriteStreamIo {
        source: std::io::Error,
    },
}

impl SpriteTableWriter {
    /// Writes header, records and payload to `w`.
    pub fn finalize_to<W: Write>(&mut self, mut w: W) -> Result<(), WriteTableError> {
        let mut buf = Vec::with_capacity(self.file_size());
        self.finalize_to_vec(&mut buf).context(PackSnafu)?;

        w.write_all(&buf).context(WriteStreamIoSnafu)?;
        w.flush().context(WriteStreamIoSnafu)
    }

    /// Writes the container to `path`. A file left behind by a failed write is removed again.
    pub fn finalize(&mut self, path: &Path) -> Result<(), WriteTableError> {
        let mut buf = Vec::with_capacity(self.file_size());
        self.finalize_to_vec(&mut buf).context(PackSnafu)?;

        let result = File::create(path).and_then(|file| {
            let mut w = BufWriter::new(file);
            w.write_all(&buf)?;
            w.flush()
        });

        if result.is_err() && path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("Failed to remove partial `{}`: {e}", path.display());
            }
        }
        result.context(WriteIoSnafu { path })
    }
}
