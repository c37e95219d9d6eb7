use crate::data::encoding::LabelEncoder;
use crate::data::shuffle::shuffle_columns;
use crate::data::FeatureTable;
use crate::error::{PipelineError, Result};
use crate::experiment::{ExperimentConfig, ExperimentSummary, ImportanceAccumulator};
use crate::projection::{self, Generation, ProjectionReport};
use crate::store::queries::{self, COUNT_COLUMNS};
use crate::store::Store;
use crate::tree::lineage::extract_lineages;
use crate::tree::TreeInducer;
use crate::utils::random::seeded_rng;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a committed iteration hands back to the run
struct IterationOutcome {
    tree_id: i64,
    /// Gene order the tree was fitted on
    genes: Vec<String>,
    importances: Vec<f64>,
    rows: ProjectionReport,
}

/// Repeated shuffle / fit / project loop over one feature table
pub struct Experiment<I: TreeInducer> {
    config: ExperimentConfig,
    inducer: I,
    show_progress: bool,
}

impl<I: TreeInducer> Experiment<I> {
    pub fn new(config: ExperimentConfig, inducer: I) -> Self {
        Self {
            config,
            inducer,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run every iteration against `store`.
    ///
    /// Iterations failing with an iteration-local error are rolled back and
    /// skipped; any other error aborts the run after rolling back the current
    /// tree generation. Generations committed before the failure stay.
    pub fn run(&self, store: &mut Store, table: &FeatureTable) -> Result<ExperimentSummary> {
        self.config.validate()?;
        info!("Starting experiment with configuration: {:?}", self.config);
        let start_time = Instant::now();

        let (labels, y) = LabelEncoder::fit_transform(table.conditions())?;
        if labels.n_classes() > COUNT_COLUMNS {
            return Err(PipelineError::Encoding(format!(
                "{} distinct conditions, at most {} are supported",
                labels.n_classes(),
                COUNT_COLUMNS
            )));
        }
        info!(
            "Encoded {} samples into {} conditions: {:?}",
            y.len(),
            labels.n_classes(),
            labels.labels()
        );

        let experiment_id = store.create_experiment(&self.config.description, labels.labels())?;
        info!(experiment_id, "Created experiment");

        let mut rng = match self.config.seed {
            Some(seed) => seeded_rng(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut importances = ImportanceAccumulator::new(table.genes());
        let mut rows = ProjectionReport::default();
        let mut completed = 0;
        let mut failed = 0;

        let pb = self.progress_bar();
        for iteration in 0..self.config.iterations {
            match self.run_iteration(store, table, &labels, &y, experiment_id, &mut rng) {
                Ok(outcome) => {
                    importances.merge(&outcome.genes, &outcome.importances)?;
                    rows += outcome.rows;
                    completed += 1;
                    debug!(
                        iteration,
                        tree_id = outcome.tree_id,
                        rows = outcome.rows.total_rows(),
                        "committed tree generation"
                    );
                }
                Err(e) if e.is_iteration_local() => {
                    failed += 1;
                    warn!("Iteration {} skipped: {}", iteration + 1, e);
                }
                Err(e) => {
                    pb.abandon_with_message("aborted");
                    return Err(e);
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("done");

        let duration_secs = start_time.elapsed().as_secs_f64();
        info!(
            "Experiment {} finished: {} trees committed, {} skipped",
            experiment_id, completed, failed
        );

        Ok(ExperimentSummary {
            experiment_id,
            completed,
            failed,
            rows,
            importances,
            duration_secs,
        })
    }

    fn run_iteration(
        &self,
        store: &mut Store,
        table: &FeatureTable,
        labels: &LabelEncoder,
        y: &[usize],
        experiment_id: i64,
        rng: &mut ChaCha8Rng,
    ) -> Result<IterationOutcome> {
        let genes = shuffle_columns(table.genes(), self.config.swaps, rng);
        let x = table.project(&genes)?;

        let deadline = self
            .config
            .iteration_timeout_secs
            .filter(|&secs| secs > 0)
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let model = self.inducer.fit(&x, y, labels.n_classes(), deadline)?;
        if model.importances.len() != genes.len() {
            return Err(PipelineError::TreeStructure(format!(
                "inducer returned {} importances for {} genes",
                model.importances.len(),
                genes.len()
            )));
        }

        let lineages = extract_lineages(&model.tree, &genes)?;

        let (tree_id, rows) = store.with_transaction(|tx| {
            let tree_id = queries::insert_tree(tx, experiment_id)?;
            let rows = projection::project(
                tx,
                Generation {
                    experiment_id,
                    tree_id,
                },
                &lineages,
                labels,
            )?;
            Ok((tree_id, rows))
        })?;

        Ok(IterationOutcome {
            tree_id,
            genes,
            importances: model.importances,
            rows,
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.config.iterations as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trees ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb
    }
}
