use anyhow::{bail, Result};
use clap::Parser;

use nmf_cluster::cluster::metrics::summarize_clusters;
use nmf_cluster::config::{NmfParams, ObjectiveParams, SupportPrior};
use nmf_cluster::data::{self, Fixture, LoadedGraph};
use nmf_cluster::storage::{self, RunReport};
use nmf_cluster::NmfOptimizer;

#[derive(Parser, Debug)]
#[clap(
    name = "nmf-cluster",
    about = "Overlapping graph clustering by local-search non-negative matrix factorization"
)]
struct Cli {
    /// Edge list (.parquet, .csv or .tsv) with `src`, `dst` and optional `weight` columns
    input: Option<String>,

    /// Use a built-in graph instead of a file (two-triangles, identity, all-ones, triangle)
    #[clap(long, conflicts_with = "input")]
    fixture: Option<Fixture>,

    /// Replace the adjacency matrix A by (A + A^T) / 2 before clustering
    #[clap(long)]
    symmetric: bool,

    /// Maximum number of passes over all nodes
    #[clap(long, default_value = "16")]
    num_iter: usize,

    /// 0 = warnings, 1 = info, 2 = debug, 3 = trace
    #[clap(long, short, default_value = "1")]
    verbosity: u8,

    /// Weight of the squared-membership regularizer
    #[clap(long, default_value = "0.01")]
    weight_beta: f64,

    /// Prior on the number of clusters per node: one or poisson
    #[clap(long, default_value = "poisson")]
    support_prior: SupportPrior,

    /// Mean of the Poisson support prior
    #[clap(long, default_value = "1.0")]
    support_lambda: f64,

    /// Maximum number of clusters a node may belong to
    #[clap(long)]
    max_cluster_per_node: Option<usize>,

    /// Seed for the node visiting order
    #[clap(long, default_value = "1234567")]
    seed: u64,

    /// Write JSON results to this directory
    #[clap(long)]
    output_dir: Option<String>,
}

impl Cli {
    fn params(&self) -> NmfParams {
        NmfParams {
            num_iter: self.num_iter,
            verbosity: self.verbosity,
            objective: ObjectiveParams {
                weight_beta: self.weight_beta,
                support_prior: self.support_prior,
                support_lambda: self.support_lambda,
            },
            max_cluster_per_node: self.max_cluster_per_node,
            seed: self.seed,
        }
    }

    fn load_graph(&self) -> Result<LoadedGraph> {
        let graph = match (&self.input, self.fixture) {
            (Some(path), _) => data::load_edge_list(path)?,
            (None, Some(fixture)) => {
                log::info!("Using built-in fixture {}", fixture);
                LoadedGraph {
                    matrix: fixture.matrix(),
                    labels: fixture.labels(),
                }
            }
            (None, None) => bail!("Either an input file or --fixture is required"),
        };

        Ok(if self.symmetric {
            graph.symmetrized()
        } else {
            graph
        })
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let params = args.params();

    env_logger::Builder::new()
        .filter_level(params.log_level())
        .format_timestamp_millis()
        .init();

    params.validate()?;

    let graph = args.load_graph()?;
    log::info!(
        "Loaded graph with {} nodes and {} entries",
        graph.matrix.cols(),
        graph.matrix.nnz()
    );

    let mut optimizer = NmfOptimizer::new(&graph.matrix, params.clone())?;
    let summary = optimizer.run()?;
    let clustering = optimizer.into_clustering();

    print!("{}", clustering);

    if let Some(output_dir) = &args.output_dir {
        let clusters = summarize_clusters(&graph.matrix, &clustering.to_sparse_matrix());
        let report = RunReport {
            params: &params,
            graph: &graph.matrix,
            labels: &graph.labels,
            clustering: &clustering,
            summary: &summary,
            clusters: &clusters,
        };
        storage::save_results(&report, output_dir)?;
    }

    log::info!("Clustering complete");

    Ok(())
}
