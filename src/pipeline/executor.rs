use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::PipelineError;
use super::builder::Pipeline;
use super::stage::{Artifact, ArtifactKind};
use crate::data::Dataset;
use crate::ml::LogisticRegression;

/// Timing of a single executed stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    /// Dependency level the stage ran in.
    pub level: usize,
    pub duration: Duration,
}

/// Artifacts exposed by a finished run, plus per-stage timings.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub artifacts: BTreeMap<String, Arc<Artifact>>,
    pub reports: Vec<StageReport>,
    pub duration: Duration,
}

impl RunOutputs {
    pub fn get(&self, label: &str) -> Option<&Artifact> {
        self.artifacts.get(label).map(|a| a.as_ref())
    }

    pub fn dataset(&self, label: &str) -> Option<&Dataset> {
        self.get(label).and_then(Artifact::as_dataset)
    }

    pub fn model(&self, label: &str) -> Option<&LogisticRegression> {
        self.get(label).and_then(Artifact::as_model)
    }

    pub fn metric(&self, label: &str) -> Option<f64> {
        self.get(label).and_then(Artifact::as_metric)
    }

    /// Number of stages that ran.
    pub fn stage_count(&self) -> usize {
        self.reports.len()
    }
}

type Produced = Vec<Option<Vec<Arc<Artifact>>>>;
type StageRun = (usize, Duration, Result<Vec<Arc<Artifact>>, PipelineError>);

impl Pipeline {
    /// Execute the graph level by level. Stages within one level only
    /// depend on earlier levels, so they run in parallel on the rayon pool.
    ///
    /// The first failing stage (in level order) aborts the run.
    pub fn run(&self) -> Result<RunOutputs, PipelineError> {
        let start = Instant::now();
        let mut produced: Produced = vec![None; self.stages.len()];
        let mut reports = Vec::with_capacity(self.stages.len());

        for (level, members) in self.levels.iter().enumerate() {
            let results: Vec<StageRun> = members
                .par_iter()
                .map(|&idx| {
                    let started = Instant::now();
                    let result = self.run_stage(idx, &produced);
                    (idx, started.elapsed(), result)
                })
                .collect();

            for (idx, duration, result) in results {
                let outputs = result?;
                let stage = self.stages[idx].name();
                log::info!("Stage '{stage}' finished in {:.1?}", duration);
                reports.push(StageReport {
                    stage: stage.to_string(),
                    level,
                    duration,
                });
                produced[idx] = Some(outputs);
            }
        }

        let mut artifacts = BTreeMap::new();
        for (label, out) in &self.exposed {
            let artifact = fetch(&produced, out.stage.0, out.port)
                .ok_or_else(|| PipelineError::MissingOutput(label.clone()))?;
            artifacts.insert(label.clone(), artifact);
        }

        let duration = start.elapsed();
        log::info!(
            "Pipeline completed: {} stages in {:.1?}",
            reports.len(),
            duration
        );

        Ok(RunOutputs {
            artifacts,
            reports,
            duration,
        })
    }

    fn run_stage(
        &self,
        idx: usize,
        produced: &Produced,
    ) -> Result<Vec<Arc<Artifact>>, PipelineError> {
        let stage = &self.stages[idx];
        let name = stage.name();

        let inputs = self.bindings[idx]
            .iter()
            .enumerate()
            .map(|(port, out)| {
                fetch(produced, out.stage.0, out.port).ok_or_else(|| {
                    PipelineError::MissingInput {
                        stage: name.to_string(),
                        port,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Running stage '{name}'");
        let outputs = stage
            .run(&inputs)
            .map_err(|source| PipelineError::StageFailed {
                stage: name.to_string(),
                source,
            })?;

        let actual: Vec<ArtifactKind> = outputs.iter().map(Artifact::kind).collect();
        let expected = &self.signatures[idx].outputs;
        if &actual != expected {
            return Err(PipelineError::BadOutputs {
                stage: name.to_string(),
                expected: expected.clone(),
                actual,
            });
        }

        Ok(outputs.into_iter().map(Arc::new).collect())
    }
}

fn fetch(produced: &Produced, stage: usize, port: usize) -> Option<Arc<Artifact>> {
    produced
        .get(stage)?
        .as_ref()?
        .get(port)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineBuilder, Stage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant(&'static str, f64);

    impl Stage for Constant {
        fn name(&self) -> &str {
            self.0
        }
        fn inputs(&self) -> Vec<ArtifactKind> {
            vec![]
        }
        fn outputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric]
        }
        fn run(&self, _: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
            Ok(vec![Artifact::Metric(self.1)])
        }
    }

    /// Sums its two metric inputs and counts its invocations.
    struct Sum {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Stage for Sum {
        fn name(&self) -> &str {
            self.name
        }
        fn inputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric, ArtifactKind::Metric]
        }
        fn outputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric]
        }
        fn run(&self, inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let total: f64 = inputs.iter().filter_map(|a| a.as_metric()).sum();
            Ok(vec![Artifact::Metric(total)])
        }
    }

    struct Failing;

    impl Stage for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn inputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric]
        }
        fn outputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric]
        }
        fn run(&self, _: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
            anyhow::bail!("boom")
        }
    }

    /// Declares a metric output but returns nothing.
    struct Liar;

    impl Stage for Liar {
        fn name(&self) -> &str {
            "liar"
        }
        fn inputs(&self) -> Vec<ArtifactKind> {
            vec![]
        }
        fn outputs(&self) -> Vec<ArtifactKind> {
            vec![ArtifactKind::Metric]
        }
        fn run(&self, _: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_run_passes_values_along_edges() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut b = PipelineBuilder::new();
        let one = b.add_stage(Constant("one", 1.0));
        let two = b.add_stage(Constant("two", 2.0));
        let sum = b.add_stage(Sum {
            name: "sum",
            calls: calls.clone(),
        });
        let again = b.add_stage(Sum {
            name: "again",
            calls: calls.clone(),
        });
        b.connect(one.output(0), sum.input(0))
            .connect(two.output(0), sum.input(1))
            .connect(sum.output(0), again.input(0))
            .connect(two.output(0), again.input(1))
            .expose("sum", sum.output(0))
            .expose("again", again.output(0));

        let out = b.build().unwrap().run().unwrap();
        assert_eq!(out.metric("sum"), Some(3.0));
        assert_eq!(out.metric("again"), Some(5.0));
        assert_eq!(out.model("sum").map(|m| m.to_string()), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.stage_count(), 4);

        let levels: Vec<usize> = out.reports.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_stage_failure_aborts_run() {
        let mut b = PipelineBuilder::new();
        let one = b.add_stage(Constant("one", 1.0));
        let fail = b.add_stage(Failing);
        b.connect(one.output(0), fail.input(0));
        b.expose("never", fail.output(0));

        match b.build().unwrap().run() {
            Err(PipelineError::StageFailed { stage, source }) => {
                assert_eq!(stage, "failing");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected stage failure, got {:?}", other.map(|o| o.reports)),
        }
    }

    #[test]
    fn test_declared_outputs_enforced() {
        let mut b = PipelineBuilder::new();
        b.add_stage(Liar);
        assert!(matches!(
            b.build().unwrap().run(),
            Err(PipelineError::BadOutputs { .. })
        ));
    }

    #[test]
    fn test_unproduced_output_is_reported_by_label() {
        let mut b = PipelineBuilder::new();
        let one = b.add_stage(Constant("one", 1.0));
        b.expose("total", one.output(0));
        let mut pipeline = b.build().unwrap();
        // point the label past the stage's only output
        pipeline.exposed[0].1.port = 1;

        match pipeline.run() {
            Err(PipelineError::MissingOutput(label)) => assert_eq!(label, "total"),
            other => panic!("expected missing output, got {:?}", other.map(|o| o.reports)),
        }
    }
}
