//! Staged recovery of a move list from arbitrary, possibly malformed PGN text.

use std::sync::LazyLock;

use regex::Regex;

use crate::game::{Game, MoveList};
use crate::rules::RulesEngine;

static TAG_PAIRS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]\s*").unwrap());

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"1-0|0-1|1/2-1/2|\*|\$\d+|\d+\.{1,3}\s*").unwrap()
});

/// Which fallback stage produced the recovered game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    /// The text loaded as-is.
    Strict,
    /// The text loaded after removing its tag pairs.
    Headerless,
    /// Every remaining token was applied one ply at a time.
    TokenReplay,
}

#[derive(Debug, Clone)]
pub struct Recovered<R = Game> {
    pub stage: RecoveryStage,
    pub game: R,
}

impl<R: RulesEngine> Recovered<R> {
    pub fn move_list(&self) -> MoveList {
        self.game.move_list()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("no PGN text given")]
    EmptyInput,
    #[error("illegal token {token:?} at ply {ply}: {reason}")]
    IllegalToken {
        ply: usize,
        token: String,
        reason: String,
    },
}

impl ParseFailure {
    /// Message suitable for showing to the person who pasted the text.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please paste a PGN string.".to_string(),
            Self::IllegalToken { ply, token, .. } => {
                format!("Move {} (\"{}\") is not legal in that position.", ply, token)
            }
        }
    }
}

/// Recover a legal game from `raw`, trying each stage in order.
///
/// A game is returned only when every ply in it was accepted by the rules
/// engine; no stage ever skips an unplayable token.
pub fn recover<R: RulesEngine>(raw: &str) -> Result<Recovered<R>, ParseFailure> {
    if raw.trim().is_empty() {
        return Err(ParseFailure::EmptyInput);
    }

    match R::load_pgn(raw) {
        Ok(game) => {
            tracing::debug!("PGN loaded strictly");
            return Ok(Recovered {
                stage: RecoveryStage::Strict,
                game,
            });
        }
        Err(e) => tracing::debug!("Strict PGN load failed: {}", e),
    }

    let headerless = TAG_PAIRS.replace_all(raw, " ");
    if headerless != raw {
        match R::load_pgn(&headerless) {
            Ok(game) => {
                tracing::debug!("PGN loaded after stripping tags");
                return Ok(Recovered {
                    stage: RecoveryStage::Headerless,
                    game,
                });
            }
            Err(e) => tracing::debug!("Headerless PGN load failed: {}", e),
        }
    } else {
        tracing::trace!("No tag pairs present, skipping headerless retry");
    }

    // Text that is all noise replays to an empty game.
    let tokens = normalize(&headerless);
    let mut game = R::new_game();
    for (i, token) in tokens.iter().enumerate() {
        if let Err(e) = game.play(token) {
            tracing::debug!(ply = i + 1, token = %token, "Token replay rejected move: {}", e);
            return Err(ParseFailure::IllegalToken {
                ply: i + 1,
                token: token.clone(),
                reason: e.to_string(),
            });
        }
    }

    tracing::debug!(plies = tokens.len(), "PGN recovered by token replay");
    Ok(Recovered {
        stage: RecoveryStage::TokenReplay,
        game,
    })
}

/// Reduce movetext to bare move tokens: comments, variations, NAGs, result
/// tokens and move numbers are removed.
fn normalize(text: &str) -> Vec<String> {
    let without_groups = strip_groups(&TAG_PAIRS.replace_all(text, " "));
    NOISE
        .replace_all(&without_groups, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Drop `{...}` comments, `;` line comments and `(...)` variations, honouring
/// nesting. Unbalanced openers swallow the rest of the text.
fn strip_groups(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut in_comment = false;
    let mut in_line_comment = false;

    for ch in text.chars() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                out.push(' ');
            }
            continue;
        }
        if in_comment {
            if ch == '}' {
                in_comment = false;
                out.push(' ');
            }
            continue;
        }
        match ch {
            '{' => in_comment = true,
            ';' if depth == 0 => in_line_comment = true,
            '(' => depth += 1,
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(' ');
                }
            }
            _ if depth > 0 => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Failure to import pasted PGN text, with the message the user sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Please paste a PGN string.")]
    Empty,
    #[error("Could not load the PGN. Please check the format and moves.")]
    Unreadable(#[source] ParseFailure),
}

/// Import pasted text for analysis.
pub fn import_pgn(raw: &str) -> Result<Recovered<Game>, ImportError> {
    match recover::<Game>(raw) {
        Ok(recovered) => Ok(recovered),
        Err(ParseFailure::EmptyInput) => Err(ImportError::Empty),
        Err(failure) => Err(ImportError::Unreadable(failure)),
    }
}
