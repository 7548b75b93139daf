use crate::enrichment::domain::{ComponentPath, SbomDocument};

/// Flattens a document's component tree into handles.
pub struct ComponentDiscovery;

impl ComponentDiscovery {
    /// Returns every component exactly once, depth-first with each parent
    /// ahead of its children and roots in document order.
    ///
    /// The walk uses an explicit stack, so nesting depth is bounded only by
    /// memory. A document that refers to itself will not terminate; the
    /// codecs only build trees.
    pub fn discover(document: &dyn SbomDocument) -> Vec<ComponentPath> {
        let mut ordered = Vec::new();
        let mut stack: Vec<ComponentPath> = (0..document.root_count())
            .rev()
            .map(ComponentPath::root)
            .collect();

        while let Some(path) = stack.pop() {
            let children = document.child_count(&path);
            stack.extend((0..children).rev().map(|i| path.child(i)));
            ordered.push(path);
        }

        ordered
    }
}
