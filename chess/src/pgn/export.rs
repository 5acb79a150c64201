use std::fmt::Write;

use crate::game::{Game, StartPosition};

/// Render a game as PGN: tag pairs, a blank line, then numbered movetext.
/// A game over gets its result token appended. An empty game from the
/// standard position with no tags renders as the empty string.
pub fn write_pgn(game: &Game) -> String {
    let mut out = String::new();

    let mut tags: Vec<(&str, &str)> = game
        .tags()
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();
    if let StartPosition::Fen(fen) = game.start_position() {
        if !tags.iter().any(|(n, _)| *n == "SetUp") {
            tags.push(("SetUp", "1"));
        }
        if !tags.iter().any(|(n, _)| *n == "FEN") {
            tags.push(("FEN", fen));
        }
    }

    for (name, value) in &tags {
        let _ = writeln!(out, "[{} \"{}\"]", name, escape(value));
    }

    let mut movetext = game.move_list().labels().join(" ");
    if let Some(result) = game.result() {
        if !movetext.is_empty() {
            movetext.push(' ');
        }
        movetext.push_str(result.token());
    }

    if !tags.is_empty() && !movetext.is_empty() {
        out.push('\n');
    }
    out.push_str(&movetext);
    out
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
