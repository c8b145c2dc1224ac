use std::collections::{BTreeMap, HashSet};

use super::PipelineError;
use super::stage::{ArtifactKind, Stage};

/// Handle to a stage registered with a [`PipelineBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub(crate) usize);

impl StageId {
    pub fn output(self, port: usize) -> Output {
        Output { stage: self, port }
    }

    pub fn input(self, port: usize) -> Input {
        Input { stage: self, port }
    }
}

/// An output port: the `port`-th value a stage returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Output {
    pub stage: StageId,
    pub port: usize,
}

/// An input port: the `port`-th value a stage receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Input {
    pub stage: StageId,
    pub port: usize,
}

/// Collects stages and the edges between them, then validates the graph.
///
/// ```text
///   let mut b = PipelineBuilder::new();
///   let load = b.add_stage(LoadData { path });
///   let split = b.add_stage(SplitData { test_size: 0.2, random_state: 42 });
///   b.connect(load.output(0), split.input(0));
///   b.expose("train", split.output(0));
///   let pipeline = b.build()?;
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
    edges: Vec<(Output, Input)>,
    exposed: Vec<(String, Output)>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: impl Stage + 'static) -> StageId {
        self.stages.push(Box::new(stage));
        StageId(self.stages.len() - 1)
    }

    /// Feed `from` into `to`. Checked in [`PipelineBuilder::build`].
    pub fn connect(&mut self, from: Output, to: Input) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Publish `output` as a pipeline result under `label`.
    pub fn expose(&mut self, label: impl Into<String>, output: Output) -> &mut Self {
        self.exposed.push((label.into(), output));
        self
    }

    /// Validate the graph and order the stages into dependency levels.
    ///
    /// Rejects duplicate stage names, dangling stage or port references,
    /// kind mismatches along an edge, inputs wired zero or several times,
    /// duplicate result labels, and cycles.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let mut names = HashSet::new();
        for stage in &self.stages {
            if !names.insert(stage.name().to_string()) {
                return Err(PipelineError::DuplicateStage(stage.name().to_string()));
            }
        }

        let signatures: Vec<Signature> = self
            .stages
            .iter()
            .map(|s| Signature {
                inputs: s.inputs(),
                outputs: s.outputs(),
            })
            .collect();

        let mut bindings: Vec<Vec<Option<Output>>> = signatures
            .iter()
            .map(|sig| vec![None; sig.inputs.len()])
            .collect();

        for &(from, to) in &self.edges {
            let from_kind = self.output_kind(&signatures, from)?;
            let to_kind = self.input_kind(&signatures, to)?;
            if from_kind != to_kind {
                return Err(PipelineError::KindMismatch {
                    from_stage: self.stage_name(from.stage),
                    from_port: from.port,
                    from_kind,
                    to_stage: self.stage_name(to.stage),
                    to_port: to.port,
                    to_kind,
                });
            }
            let slot = &mut bindings[to.stage.0][to.port];
            if slot.is_some() {
                return Err(PipelineError::InputWiredTwice {
                    stage: self.stage_name(to.stage),
                    port: to.port,
                });
            }
            *slot = Some(from);
        }

        let bindings = bindings
            .into_iter()
            .enumerate()
            .map(|(idx, ports)| {
                ports
                    .into_iter()
                    .enumerate()
                    .map(|(port, bound)| {
                        bound.ok_or_else(|| PipelineError::UnboundInput {
                            stage: self.stages[idx].name().to_string(),
                            port,
                            kind: signatures[idx].inputs[port],
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut labels = HashSet::new();
        for (label, output) in &self.exposed {
            self.output_kind(&signatures, *output)?;
            if !labels.insert(label.as_str()) {
                return Err(PipelineError::DuplicateOutput(label.clone()));
            }
        }

        let levels = self.levels(&bindings)?;

        Ok(Pipeline {
            stages: self.stages,
            signatures,
            bindings,
            levels,
            exposed: self.exposed,
        })
    }

    fn stage_name(&self, id: StageId) -> String {
        self.stages
            .get(id.0)
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn output_kind(&self, sigs: &[Signature], out: Output) -> Result<ArtifactKind, PipelineError> {
        let sig = sigs.get(out.stage.0).ok_or(PipelineError::UnknownStage(out.stage.0))?;
        sig.outputs
            .get(out.port)
            .copied()
            .ok_or_else(|| PipelineError::UnknownPort {
                stage: self.stage_name(out.stage),
                port: out.port,
                direction: "output",
            })
    }

    fn input_kind(&self, sigs: &[Signature], input: Input) -> Result<ArtifactKind, PipelineError> {
        let sig = sigs.get(input.stage.0).ok_or(PipelineError::UnknownStage(input.stage.0))?;
        sig.inputs
            .get(input.port)
            .copied()
            .ok_or_else(|| PipelineError::UnknownPort {
                stage: self.stage_name(input.stage),
                port: input.port,
                direction: "input",
            })
    }

    /// Kahn's algorithm, one frontier at a time: a stage lands in the first
    /// level after all of its upstream stages.
    fn levels(&self, bindings: &[Vec<Output>]) -> Result<Vec<Vec<usize>>, PipelineError> {
        let n = self.stages.len();
        let mut indegree = vec![0usize; n];
        let mut downstream: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, ports) in bindings.iter().enumerate() {
            for out in ports {
                indegree[idx] += 1;
                downstream.entry(out.stage.0).or_default().push(idx);
            }
        }

        let mut levels = Vec::new();
        let mut frontier: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut placed = 0;

        while !frontier.is_empty() {
            placed += frontier.len();
            let mut next = Vec::new();
            for &idx in &frontier {
                for &child in downstream.get(&idx).into_iter().flatten() {
                    indegree[child] -= 1;
                    if indegree[child] == 0 {
                        next.push(child);
                    }
                }
            }
            next.sort_unstable();
            levels.push(frontier);
            frontier = next;
        }

        if placed < n {
            let cycle = trace_cycle(bindings, &indegree)
                .into_iter()
                .map(|i| self.stages[i].name().to_string())
                .collect();
            return Err(PipelineError::Cycle(cycle));
        }
        Ok(levels)
    }
}

/// Every stage left with a nonzero in-degree after Kahn's pass waits on
/// another such stage, so walking upstream through them must revisit one.
/// Returns the revisited loop in data-flow order, starting from its lowest id.
fn trace_cycle(bindings: &[Vec<Output>], indegree: &[usize]) -> Vec<usize> {
    let Some(start) = (0..indegree.len()).find(|&i| indegree[i] > 0) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(prev) = bindings[current]
            .iter()
            .map(|out| out.stage.0)
            .find(|&up| indegree[up] > 0)
        else {
            return path;
        };
        if let Some(pos) = path.iter().position(|&i| i == prev) {
            let mut cycle = path.split_off(pos);
            cycle.reverse();
            let lowest = cycle
                .iter()
                .enumerate()
                .min_by_key(|&(_, &i)| i)
                .map_or(0, |(k, _)| k);
            cycle.rotate_left(lowest);
            return cycle;
        }
        path.push(prev);
        current = prev;
    }
}

pub(crate) struct Signature {
    pub inputs: Vec<ArtifactKind>,
    pub outputs: Vec<ArtifactKind>,
}

/// A validated, executable stage graph. Built by [`PipelineBuilder::build`].
pub struct Pipeline {
    pub(crate) stages: Vec<Box<dyn Stage>>,
    pub(crate) signatures: Vec<Signature>,
    /// For each stage, the upstream output feeding each input port.
    pub(crate) bindings: Vec<Vec<Output>>,
    /// Stage indices grouped by dependency depth.
    pub(crate) levels: Vec<Vec<usize>>,
    pub(crate) exposed: Vec<(String, Output)>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names per dependency level; stages sharing a level are
    /// independent of each other.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&i| self.stages[i].name()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::Artifact;
    use std::sync::Arc;

    /// Stage with configurable ports that emits zeros / empty datasets.
    struct Probe {
        name: String,
        inputs: Vec<ArtifactKind>,
        outputs: Vec<ArtifactKind>,
    }

    fn probe(name: &str, inputs: &[ArtifactKind], outputs: &[ArtifactKind]) -> Probe {
        Probe {
            name: name.to_string(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    impl Stage for Probe {
        fn name(&self) -> &str {
            &self.name
        }
        fn inputs(&self) -> Vec<ArtifactKind> {
            self.inputs.clone()
        }
        fn outputs(&self) -> Vec<ArtifactKind> {
            self.outputs.clone()
        }
        fn run(&self, _inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
            Ok(self
                .outputs
                .iter()
                .map(|k| match k {
                    ArtifactKind::Metric => Artifact::Metric(0.0),
                    _ => Artifact::Dataset(Default::default()),
                })
                .collect())
        }
    }

    use ArtifactKind::{Dataset as D, Metric as M, Model as Mo};

    #[test]
    fn test_diamond_levels() {
        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[D, D]));
        let left = b.add_stage(probe("left", &[D], &[M]));
        let right = b.add_stage(probe("right", &[D], &[M]));
        let sink = b.add_stage(probe("sink", &[M, M], &[M]));
        b.connect(src.output(0), left.input(0))
            .connect(src.output(1), right.input(0))
            .connect(left.output(0), sink.input(0))
            .connect(right.output(0), sink.input(1));

        let p = b.build().unwrap();
        assert_eq!(p.len(), 4);
        assert_eq!(
            p.levels(),
            vec![vec!["src"], vec!["left", "right"], vec!["sink"]]
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[M]));
        let dst = b.add_stage(probe("dst", &[Mo], &[]));
        b.connect(src.output(0), dst.input(0));
        assert!(matches!(
            b.build(),
            Err(PipelineError::KindMismatch { from_kind: M, to_kind: Mo, .. })
        ));
    }

    #[test]
    fn test_unbound_and_double_wired_inputs() {
        let mut b = PipelineBuilder::new();
        b.add_stage(probe("src", &[], &[D]));
        b.add_stage(probe("dst", &[D], &[]));
        assert!(matches!(
            b.build(),
            Err(PipelineError::UnboundInput { port: 0, kind: D, .. })
        ));

        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[D, D]));
        let dst = b.add_stage(probe("dst", &[D], &[]));
        b.connect(src.output(0), dst.input(0));
        b.connect(src.output(1), dst.input(0));
        assert!(matches!(b.build(), Err(PipelineError::InputWiredTwice { .. })));
    }

    #[test]
    fn test_cycle_detected() {
        let mut b = PipelineBuilder::new();
        let root = b.add_stage(probe("root", &[], &[D]));
        let a = b.add_stage(probe("a", &[D, D], &[D]));
        let c = b.add_stage(probe("c", &[D], &[D]));
        b.connect(root.output(0), a.input(0));
        b.connect(c.output(0), a.input(1));
        b.connect(a.output(0), c.input(0));
        match b.build() {
            Err(PipelineError::Cycle(stages)) => assert_eq!(stages, vec!["a", "c"]),
            other => panic!("expected cycle, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_cycle_excludes_downstream_stages() {
        let mut b = PipelineBuilder::new();
        let root = b.add_stage(probe("root", &[], &[D]));
        let a = b.add_stage(probe("a", &[D, D], &[D]));
        let c = b.add_stage(probe("c", &[D], &[D]));
        let d = b.add_stage(probe("d", &[D], &[D]));
        let sink = b.add_stage(probe("sink", &[D], &[]));
        b.connect(root.output(0), a.input(0));
        b.connect(d.output(0), a.input(1));
        b.connect(a.output(0), c.input(0));
        b.connect(c.output(0), d.input(0));
        b.connect(c.output(0), sink.input(0));
        match b.build() {
            Err(PipelineError::Cycle(stages)) => assert_eq!(stages, vec!["a", "c", "d"]),
            other => panic!("expected cycle, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut b = PipelineBuilder::new();
        let a = b.add_stage(probe("a", &[D], &[D]));
        b.connect(a.output(0), a.input(0));
        match b.build() {
            Err(PipelineError::Cycle(stages)) => assert_eq!(stages, vec!["a"]),
            other => panic!("expected cycle, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_dangling_references() {
        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[D]));
        b.connect(src.output(3), StageId(9).input(0));
        assert!(matches!(
            b.build(),
            Err(PipelineError::UnknownPort { direction: "output", port: 3, .. })
        ));

        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[D]));
        b.connect(src.output(0), StageId(9).input(0));
        assert!(matches!(b.build(), Err(PipelineError::UnknownStage(9))));
    }

    #[test]
    fn test_duplicate_names_and_labels() {
        let mut b = PipelineBuilder::new();
        b.add_stage(probe("same", &[], &[D]));
        b.add_stage(probe("same", &[], &[D]));
        assert!(matches!(b.build(), Err(PipelineError::DuplicateStage(_))));

        let mut b = PipelineBuilder::new();
        let src = b.add_stage(probe("src", &[], &[D, D]));
        b.expose("out", src.output(0)).expose("out", src.output(1));
        assert!(matches!(b.build(), Err(PipelineError::DuplicateOutput(_))));
    }
}
