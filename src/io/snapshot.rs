//! Per-iteration boundary-field snapshots.
//!
//! One `;`-delimited file per partition and iteration, named
//! `<mesh>-<participant>.dt<iteration>_<rank>.csv`:
//!
//! ```text
//! PosX;PosY;Temperature;Heat-Flux
//! 0;0;310;12.5
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::algs::register::InterfaceMesh;
use crate::coupling_error::CouplingError;
use crate::data::field::CouplingField;

const AXES: [&str; 3] = ["PosX", "PosY", "PosZ"];

/// Writes snapshot files into one directory.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    prefix: String,
}

impl SnapshotWriter {
    /// Snapshots for `mesh` of `participant`, created under `dir`.
    pub fn new(dir: impl Into<PathBuf>, mesh: &str, participant: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: format!("{mesh}-{participant}"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `iteration` on `rank`.
    pub fn path(&self, iteration: usize, rank: usize) -> PathBuf {
        self.dir
            .join(format!("{}.dt{iteration}_{rank}.csv", self.prefix))
    }

    /// Write one snapshot; returns `None` for a partition without vertices.
    pub fn write(
        &self,
        mesh: &InterfaceMesh,
        iteration: usize,
        fields: &[&CouplingField],
    ) -> Result<Option<PathBuf>, CouplingError> {
        if mesh.is_degenerate() {
            return Ok(None);
        }
        let path = self.path(iteration, mesh.partition().rank());
        let wrap = |source: std::io::Error| CouplingError::Snapshot {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(wrap)?;
        let mut out = BufWriter::new(File::create(&path).map_err(wrap)?);

        let header = AXES
            .iter()
            .take(mesh.dimension())
            .copied()
            .chain(fields.iter().map(|f| f.name()))
            .join(";");
        writeln!(out, "{header}").map_err(wrap)?;
        for (i, v) in mesh.vertices().iter().enumerate() {
            let row = v
                .coords()
                .iter()
                .copied()
                .chain(fields.iter().map(|f| f.values()[i]))
                .join(";");
            writeln!(out, "{row}").map_err(wrap)?;
        }
        out.flush().map_err(wrap)?;
        log::debug!("snapshot {}", path.display());
        Ok(Some(path))
    }
}
