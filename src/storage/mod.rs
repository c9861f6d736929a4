//! Results persistence module

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde_json::{json, to_string_pretty};

use crate::cluster::metrics::ClusterSummary;
use crate::cluster::{Clustering, OptimizeSummary};
use crate::config::NmfParams;
use crate::matrix::SparseMatrix;

/// Everything produced by one optimizer run
pub struct RunReport<'a> {
    pub params: &'a NmfParams,
    pub graph: &'a SparseMatrix,
    pub labels: &'a [String],
    pub clustering: &'a Clustering,
    pub summary: &'a OptimizeSummary,
    pub clusters: &'a [ClusterSummary],
}

/// Save run results to the specified directory
pub fn save_results(report: &RunReport<'_>, output_dir: &str) -> Result<()> {
    log::info!("Saving {} clusters to {}", report.clusters.len(), output_dir);

    fs::create_dir_all(output_dir)?;

    save_summary(report, output_dir)?;
    save_clustering(report, output_dir)?;
    save_clusters(report, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

/// Save parameters, graph statistics and optimizer outcome
fn save_summary(report: &RunReport<'_>, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join("summary.json");
    let mut file = File::create(path)?;

    let graph = report.graph;
    let clustering = report.clustering;
    let summary = json!({
        "params": report.params,
        "graph_stats": {
            "node_count": graph.cols(),
            "entry_count": graph.nnz(),
            "total_weight": graph.total_weight(),
            "avg_degree": if graph.cols() == 0 { 0.0 } else { graph.nnz() as f64 / graph.cols() as f64 },
        },
        "optimizer": report.summary,
        "clustering_stats": {
            "cluster_count": clustering.num_nonempty_clusters(),
            "memberships": clustering.nnz(),
            "zeros": clustering.number_of_zeros(),
            "largest_cluster_size": report.clusters.first().map_or(0, |c| c.size),
            "smallest_cluster_size": report.clusters.last().map_or(0, |c| c.size),
        }
    });

    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}

/// Save every `(node, cluster, weight)` triple of the exported clustering
fn save_clustering(report: &RunReport<'_>, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join("clustering.json");
    let mut file = File::create(path)?;

    let exported = report.clustering.to_sparse_matrix();
    let memberships: Vec<_> = (0..exported.cols())
        .flat_map(|node| {
            let label = report
                .labels
                .get(node)
                .cloned()
                .unwrap_or_else(|| node.to_string());
            exported.column(node).map(move |(cluster, weight)| {
                json!({
                    "node": node,
                    "label": label,
                    "cluster": cluster,
                    "weight": weight,
                })
            })
        })
        .collect();

    let clustering_json = json!({
        "num_clusters": exported.rows(),
        "num_nodes": exported.cols(),
        "memberships": memberships,
    });

    file.write_all(to_string_pretty(&clustering_json)?.as_bytes())?;

    Ok(())
}

/// Save per-cluster metrics
fn save_clusters(report: &RunReport<'_>, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join("clusters.json");
    let mut file = File::create(path)?;

    let clusters_json = json!({ "clusters": report.clusters });
    file.write_all(to_string_pretty(&clusters_json)?.as_bytes())?;

    Ok(())
}
