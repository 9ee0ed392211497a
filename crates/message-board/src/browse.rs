use message_tree::{MessageId, MessageService, ServiceError, ToggleOutcome, TreeController};
use tracing::{debug, warn};

use crate::render::{render_board, render_thread};

/// Rendered output of a board command plus anything that went wrong on
/// the way without stopping it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub rendered: String,
    pub notices: Vec<String>,
}

/// Make sure the replies of `id` are shown.
///
/// A failure is reported as a notice and leaves the rest of the tree as it
/// was, so one unreachable thread does not hide the others.
pub async fn show_replies<S: MessageService>(
    controller: &TreeController<S>,
    id: MessageId,
) -> Option<String> {
    let outcome = match controller.toggle_replies(id).await {
        Ok(ToggleOutcome::Collapsed) => controller.toggle_replies(id).await,
        other => other,
    };

    match outcome {
        Ok(ToggleOutcome::Unknown) => Some(format!("Message #{} is not shown on the board", id)),
        Ok(ToggleOutcome::Emptied) => Some(format!("Message #{} no longer exists", id)),
        Ok(outcome) => {
            debug!(%id, ?outcome, "Replies shown");
            None
        }
        Err(e) => {
            warn!(%id, error = %e, "Could not show replies");
            Some(format!("Could not load the replies of #{}: {}", id, e.user_message()))
        }
    }
}

/// Show the replies of each id in order, e.g. a chain of ancestors
pub async fn show_path<S: MessageService>(
    controller: &TreeController<S>,
    ids: &[MessageId],
) -> Vec<String> {
    let mut notices = Vec::new();
    for id in ids {
        notices.extend(show_replies(controller, *id).await);
    }
    notices
}

/// Load the board, expand `expand` in order and render what is visible
pub async fn board_view<S: MessageService>(
    controller: &TreeController<S>,
    expand: &[MessageId],
) -> Result<BoardView, ServiceError> {
    controller.load_root_messages().await?;
    let notices = show_path(controller, expand).await;

    Ok(BoardView {
        rendered: render_board(&*controller.read().await),
        notices,
    })
}

/// Load the board, open `via` (the ancestors of `id`, outermost first), then
/// load `depth` levels of replies below `id` and render that thread
pub async fn thread_view<S: MessageService>(
    controller: &TreeController<S>,
    via: &[MessageId],
    id: MessageId,
    depth: usize,
) -> Result<BoardView, ServiceError> {
    controller.load_root_messages().await?;
    let mut notices = show_path(controller, via).await;

    if !controller.read().await.contains(id) {
        return Err(ServiceError::NotFound(format!(
            "message {} is not on the board; pass its ancestors with --via",
            id
        )));
    }

    // Breadth-first, one level of replies per round
    let mut frontier = vec![id];
    for _ in 0..depth {
        let mut next = Vec::new();
        for node in frontier {
            notices.extend(show_replies(controller, node).await);
            next.extend(controller.child_ids(node).await.unwrap_or_default());
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    let rendered = render_thread(&*controller.read().await, id).unwrap_or_default();
    Ok(BoardView { rendered, notices })
}

/// Post a reply under `parent`, opening `via` first so a nested parent is
/// resident and the reply shows up in its thread
pub async fn reply_view<S: MessageService>(
    controller: &TreeController<S>,
    via: &[MessageId],
    parent: MessageId,
    content: &str,
) -> Result<(MessageId, BoardView), ServiceError> {
    let mut notices = Vec::new();
    match controller.load_root_messages().await {
        Ok(_) => notices.extend(show_path(controller, via).await),
        Err(e) => {
            warn!(error = %e, "Could not load the board before replying");
            notices.push(format!("Could not load the board: {}", e.user_message()));
        }
    }

    let reply = controller.submit_reply(parent, content).await?;

    let rendered = match render_thread(&*controller.read().await, parent) {
        Some(thread) => thread,
        None => {
            notices.push(format!(
                "Message #{} is not loaded; pass its ancestors with --via to see the thread",
                parent
            ));
            String::new()
        }
    };
    Ok((reply.id, BoardView { rendered, notices }))
}
