//! Test data builders for creating pipeline trees

use sgpipeline_rs::pipeline::add_cascaded;
use sgpipeline_rs::pipeline::schema::INTERMEDIATE_STEP;
use sgpipeline_rs::{PipelineConfig, PipelineKind, SharedPipeline};

/// Builder for cascade trees
pub struct PipelineTreeBuilder {
    kind: PipelineKind,
    intermediate: bool,
    children: Vec<PipelineTreeBuilder>,
}

impl PipelineTreeBuilder {
    pub fn new(kind: PipelineKind) -> Self {
        Self {
            kind,
            intermediate: false,
            children: Vec::new(),
        }
    }

    /// Mark the node as an intermediate step that emits no output
    pub fn intermediate(mut self) -> Self {
        self.intermediate = true;
        self
    }

    pub fn child(mut self, child: PipelineTreeBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn build(self) -> SharedPipeline {
        let node = PipelineConfig::new(self.kind).into_shared();
        if self.intermediate {
            node.borrow_mut()
                .set_setting(INTERMEDIATE_STEP, true)
                .expect("intermediate step setting");
        }
        for child in self.children {
            add_cascaded(&node, child.build()).expect("cascade child");
        }
        node
    }
}

/// `P` with two cascaded children `C1`, `C2`
pub fn two_child_tree(root_intermediate: bool) -> SharedPipeline {
    let root = PipelineTreeBuilder::new(PipelineKind::Reduction);
    let root = if root_intermediate { root.intermediate() } else { root };
    root.child(PipelineTreeBuilder::new(PipelineKind::Reduction))
        .child(PipelineTreeBuilder::new(PipelineKind::Aggregation))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builder() {
        let tree = PipelineTreeBuilder::new(PipelineKind::Passthrough)
            .intermediate()
            .child(PipelineTreeBuilder::new(PipelineKind::Reduction))
            .build();

        assert!(tree.borrow().is_intermediate_step());
        assert_eq!(tree.borrow().total_pipeline_count(), 2);
    }
}
