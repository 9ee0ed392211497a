use crate::cache::{MessageTreeCache, TreeNode};
use crate::model::MessageId;

/// A node as it appears in the rendered list
#[derive(Debug, Clone, Copy)]
pub struct FlatRow<'a> {
    pub node: &'a TreeNode,
    /// 0 for root messages
    pub depth: usize,
}

/// Flatten the visible part of the tree in display order.
///
/// Pre-order walk over the root listing; only expanded nodes with resident
/// replies contribute their children. Uses an explicit stack so depth is
/// unbounded, and skips a node already on its own ancestor path.
pub fn flatten_visible(cache: &MessageTreeCache) -> Vec<FlatRow<'_>> {
    let mut rows = Vec::new();
    // (node id, depth); pushed in reverse so pops come out in order
    let mut stack: Vec<(MessageId, usize)> =
        cache.root_ids().iter().rev().map(|id| (*id, 0)).collect();
    let mut path: Vec<MessageId> = Vec::new();

    while let Some((id, depth)) = stack.pop() {
        path.truncate(depth);
        if path.contains(&id) {
            continue;
        }
        let Some(node) = cache.get(id) else {
            continue;
        };

        rows.push(FlatRow { node, depth });
        path.push(id);

        if node.is_expanded() {
            if let Some(children) = node.children().ids() {
                stack.extend(children.iter().rev().map(|child| (*child, depth + 1)));
            }
        }
    }

    rows
}
