use glam::Mat4;

use crate::error::{ReferenceKind, RenderError};
use crate::gltf::{Document, Node};

/// A node reached by [`traverse`], with its transform accumulated from the
/// scene root.
#[derive(Debug, Clone, Copy)]
pub struct NodeVisit<'a> {
    pub index: usize,
    pub node: &'a Node,
    pub world: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

enum Step {
    Enter { index: usize, parent: Mat4 },
    Exit { index: usize },
}

/// Walks the active scene depth first, roots and children in declared
/// order, calling `visit` once per reachable node. Returns how many nodes
/// were visited.
///
/// Uses an explicit stack, so deep hierarchies can't overflow the call
/// stack. A node that is its own ancestor fails with [`RenderError::Cycle`];
/// a node reachable through two parents is only visited the first time.
pub fn traverse<'a, F>(document: &'a Document, root: Mat4, mut visit: F) -> Result<usize, RenderError>
where
    F: FnMut(NodeVisit<'a>) -> Result<(), RenderError>,
{
    let Some(scene) = document.active_scene()? else {
        log::warn!("document has no active scene");
        return Ok(0);
    };

    let mut states = vec![VisitState::Unvisited; document.nodes.len()];
    let mut stack = scene
        .nodes
        .iter()
        .rev()
        .map(|&index| Step::Enter { index, parent: root })
        .collect::<Vec<_>>();
    let mut visited = 0;

    while let Some(step) = stack.pop() {
        let (index, parent) = match step {
            Step::Exit { index } => {
                states[index] = VisitState::Done;
                continue;
            }
            Step::Enter { index, parent } => (index, parent),
        };
        let state = states.get(index).copied().ok_or(RenderError::Reference {
            kind: ReferenceKind::Node,
            index,
            len: document.nodes.len(),
        })?;
        match state {
            VisitState::InProgress => return Err(RenderError::Cycle(index)),
            VisitState::Done => {
                log::warn!("node {index} has more than one parent, drawing it once");
                continue;
            }
            VisitState::Unvisited => {}
        }

        let node = &document.nodes[index];
        let world = parent * node.transform;
        states[index] = VisitState::InProgress;
        visit(NodeVisit { index, node, world })?;
        visited += 1;

        stack.push(Step::Exit { index });
        for &child in node.children.iter().rev() {
            stack.push(Step::Enter {
                index: child,
                parent: world,
            });
        }
    }
    Ok(visited)
}
