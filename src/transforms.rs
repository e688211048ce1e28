//! Tree rewrites that run after parsing.
//!
//! A [`Pipeline`] holds transforms ordered by priority. `pending` nodes left
//! by directives schedule extra work at their own priority; they are picked
//! up as the pipeline runs, so a transform may leave new pending nodes for a
//! later stage.

pub mod footnotes;
pub mod frontmatter;
pub mod misc;
pub mod parts;
pub mod references;
pub mod substitutions;
pub mod universal;

use crate::error::Result;
use crate::nodes::{Document, NodeId, PendingTransform};
use crate::parser::inline_parser::problematic;

pub trait Transform {
    fn name(&self) -> &'static str;
    /// Lower runs first.
    fn priority(&self) -> u16;
    fn apply(&self, doc: &mut Document) -> Result<()>;
}

/// The transforms to run over a document.
pub struct Pipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    /// An empty pipeline. Pending nodes still run.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Every standard transform. Each one checks the document settings
    /// itself, so disabled features cost a quick early return.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(substitutions::Substitutions));
        pipeline.register(Box::new(frontmatter::DocTitle));
        pipeline.register(Box::new(frontmatter::DocInfo));
        pipeline.register(Box::new(frontmatter::SectionSubTitle));
        pipeline.register(Box::new(universal::StripClassesAndElements));
        pipeline.register(Box::new(references::ChainedTargets));
        pipeline.register(Box::new(references::AnonymousHyperlinks));
        pipeline.register(Box::new(references::IndirectHyperlinks));
        pipeline.register(Box::new(references::PropagateTargets));
        pipeline.register(Box::new(footnotes::Footnotes));
        pipeline.register(Box::new(references::ExternalTargets));
        pipeline.register(Box::new(references::InternalTargets));
        pipeline.register(Box::new(universal::StripComments));
        pipeline.register(Box::new(universal::Decorations));
        pipeline.register(Box::new(misc::Transitions));
        pipeline.register(Box::new(universal::ExposeInternals));
        pipeline.register(Box::new(references::DanglingReferences));
        pipeline.register(Box::new(universal::Messages));
        pipeline.register(Box::new(universal::FilterMessages));
        pipeline
    }

    pub fn register(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Registered(usize),
    Pending(NodeId),
}

/// Run `pipeline` and every scheduled `pending` node over `doc`.
///
/// Messages emitted meanwhile are collected in `doc.transform_messages`.
pub fn transform(doc: &mut Document, pipeline: &Pipeline) -> Result<()> {
    doc.in_transform = true;
    let result = run(doc, pipeline);
    doc.in_transform = false;
    result
}

fn run(doc: &mut Document, pipeline: &Pipeline) -> Result<()> {
    // (priority, insertion order, job)
    let mut queue: Vec<(u16, usize, Job)> = pipeline
        .transforms
        .iter()
        .enumerate()
        .map(|(i, t)| (t.priority(), i, Job::Registered(i)))
        .collect();
    let mut sequence = queue.len();
    let mut scheduled = 0;

    loop {
        for &node in &doc.pending[scheduled..] {
            if let Some(pending) = doc.pending_details.get(&node) {
                queue.push((pending.transform.priority(), sequence, Job::Pending(node)));
                sequence += 1;
            }
        }
        scheduled = doc.pending.len();

        let Some(next) = queue
            .iter()
            .enumerate()
            .min_by_key(|(_, (priority, order, _))| (*priority, *order))
            .map(|(index, _)| index)
        else {
            break;
        };
        let (priority, _, job) = queue.remove(next);
        match job {
            Job::Registered(index) => {
                let transform = &pipeline.transforms[index];
                log::debug!("Applying {} ({priority})", transform.name());
                transform.apply(doc)?;
            }
            Job::Pending(node) => apply_pending(doc, node)?,
        }
    }
    Ok(())
}

fn apply_pending(doc: &mut Document, node: NodeId) -> Result<()> {
    if !doc.is_attached(node) {
        log::debug!("Skipping detached pending node {node:?}");
        return Ok(());
    }
    let Some(pending) = doc.pending_details.get(&node).cloned() else {
        return Ok(());
    };
    log::debug!("Applying pending {}", pending.transform.name());
    match pending.transform {
        PendingTransform::ClassAttribute => misc::class_attribute(doc, node, &pending.details),
        PendingTransform::TargetNotes => references::target_notes(doc, node, &pending.details),
        PendingTransform::SectNum => parts::sectnum(doc, node, &pending.details),
        PendingTransform::Contents => parts::contents(doc, node, &pending.details),
    }
}

/// Put a `problematic` built from the source text of `node` in its place,
/// linked to the message `msg`.
pub(crate) fn replace_with_problematic(
    doc: &mut Document,
    node: NodeId,
    msg: NodeId,
) -> Result<NodeId> {
    let parent = doc.parent(node).unwrap_or(doc.root());
    let raw = doc.rawsource(node).to_string();
    let prb = problematic(doc, parent, &raw, &raw, msg)?;
    doc.replace_with(node, vec![prb]);
    Ok(prb)
}
