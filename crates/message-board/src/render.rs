use chrono::Local;
use colored::*;
use message_tree::{flatten_visible, FlatRow, MessageId, MessageTreeCache};

pub const EMPTY_BOARD: &str = "No messages yet. Be the first to post!";

// Replies deeper than this stop shifting right
const MAX_INDENT_DEPTH: usize = 4;
const INDENT_WIDTH: usize = 4;

/// Render every visible message of the board, one block per message
pub fn render_board(cache: &MessageTreeCache) -> String {
    let rows = flatten_visible(cache);
    if rows.is_empty() {
        return EMPTY_BOARD.dimmed().to_string();
    }

    rows.iter()
        .map(render_row)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render `id` and its visible descendants, `None` when `id` is not shown
pub fn render_thread(cache: &MessageTreeCache, id: MessageId) -> Option<String> {
    let rows = flatten_visible(cache);
    let start = rows.iter().position(|row| row.node.id() == id)?;
    let base = rows[start].depth;

    let thread: Vec<String> = rows[start..]
        .iter()
        .enumerate()
        .take_while(|(i, row)| *i == 0 || row.depth > base)
        .map(|(_, row)| {
            render_row(&FlatRow {
                node: row.node,
                depth: row.depth - base,
            })
        })
        .collect();

    Some(thread.join("\n"))
}

/// Header line plus indented content for a single message
pub fn render_row(row: &FlatRow<'_>) -> String {
    let node = row.node;
    let message = node.message();
    let indent = " ".repeat(row.depth.min(MAX_INDENT_DEPTH) * INDENT_WIDTH);

    let marker = if node.is_expanded() { "▾" } else { "▸" };
    let replies = match node.reply_count().value() {
        1 => "1 reply".to_string(),
        n => format!("{} replies", n),
    };
    let loading = if node.is_pending_fetch() { " (loading)" } else { "" };
    let posted = message.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");

    let mut out = format!(
        "{}{} {} {} {} {}{}",
        indent,
        marker.cyan(),
        format!("#{}", message.id).dimmed(),
        message.author.bold(),
        posted.to_string().dimmed(),
        replies.yellow(),
        loading.dimmed(),
    );
    for line in message.content.lines() {
        out.push('\n');
        out.push_str(&indent);
        out.push_str("  ");
        out.push_str(line);
    }
    out
}
