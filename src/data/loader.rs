//! Edge-list loading through polars

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use polars::prelude::*;

use crate::matrix::{algorithms, MatrixBuilder, SparseMatrix};

/// Adjacency matrix together with the label of every node
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub matrix: SparseMatrix,

    /// Node labels as read from the input, in node-index order
    pub labels: Vec<String>,
}

impl LoadedGraph {
    /// Replace the matrix by `(A + A^T) / 2`.
    ///
    /// A reciprocal pair of equal edges keeps its weight; a one-way edge is
    /// split evenly between both directions.
    pub fn symmetrized(self) -> Self {
        Self {
            matrix: algorithms::symmetrize(&self.matrix),
            labels: self.labels,
        }
    }
}

/// Load a weighted edge list from a Parquet or CSV file.
///
/// The file needs `src` and `dst` columns and may have a `weight` column;
/// missing weights default to 1. Labels are interned in first-seen order.
/// An edge `src -> dst` is stored at `(dst, src)`; repeated edges are summed.
pub fn load_edge_list(path: &str) -> Result<LoadedGraph> {
    log::info!("Reading edge list: {}", path);

    if !Path::new(path).exists() {
        return Err(anyhow!("File not found: {}", path));
    }

    let frame = match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("parquet") => LazyFrame::scan_parquet(path, Default::default())?,
        Some("csv") => LazyCsvReader::new(path).with_has_header(true).finish()?,
        Some("tsv") => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(b'\t')
            .finish()?,
        _ => bail!("Unsupported edge list format (expected .parquet, .csv or .tsv): {}", path),
    };
    let df = frame.collect()?;

    log::info!("File schema: {:?}", df.schema());
    log::info!("Loaded {} edges", df.height());

    let src_col = df
        .column("src")
        .context("edge list has no `src` column")?
        .cast(&DataType::String)?;
    let dst_col = df
        .column("dst")
        .context("edge list has no `dst` column")?
        .cast(&DataType::String)?;
    let weight_col = match df.column("weight") {
        Ok(column) => Some(column.cast(&DataType::Float64)?),
        Err(_) => None,
    };

    let src = src_col.str()?;
    let dst = dst_col.str()?;
    let weights = weight_col.as_ref().map(|column| column.f64()).transpose()?;

    let mut builder = MatrixBuilder::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(s), Some(d)) = (src.get(i), dst.get(i)) else {
            bail!("Edge {} has a missing endpoint", i);
        };
        let weight = match &weights {
            Some(weights) => weights
                .get(i)
                .ok_or_else(|| anyhow!("Edge {} has a missing weight", i))?,
            None => 1.0,
        };
        if !weight.is_finite() || weight < 0.0 {
            bail!("Edge {} ({} -> {}) has invalid weight {}", i, s, d, weight);
        }
        if weight == 0.0 {
            continue;
        }
        builder.add_edge(s, d, weight);
    }

    let (matrix, labels) = builder.build();
    matrix.validate()?;

    log::info!(
        "Built {}x{} adjacency matrix with {} entries",
        matrix.rows(),
        matrix.cols(),
        matrix.nnz()
    );

    Ok(LoadedGraph { matrix, labels })
}
