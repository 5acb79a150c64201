//! Strict PGN loader.
//!
//! Accepts a single game: an optional tag section followed by movetext in
//! which every White move carries its move number. Comments, variations,
//! NAGs and annotation glyphs are read and ignored.

use crate::game::{Game, GameError, StartPosition};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Tag { name: String, value: String },
    MoveNumber(u32),
    San(&'a str),
    Result(&'a str),
}

/// Load a full PGN transcript, validating every move.
pub fn load_pgn(text: &str) -> Result<Game, PgnError> {
    let tokens = tokenize(text)?;
    let mut tokens = tokens.into_iter().peekable();

    let mut tags = Vec::new();
    while let Some(Token::Tag { .. }) = tokens.peek() {
        if let Some(Token::Tag { name, value }) = tokens.next() {
            tags.push((name, value));
        }
    }

    let start = tags
        .iter()
        .find(|(name, _)| name == "FEN")
        .map(|(_, fen)| StartPosition::Fen(fen.clone()))
        .unwrap_or(StartPosition::Standard);
    let mut game = Game::from_start(start)?;
    for (name, value) in &tags {
        game.set_tag(name, value);
    }

    let mut numbered = false;
    let mut finished = false;
    for token in tokens {
        if finished {
            return Err(PgnError::TrailingText(describe(&token)));
        }
        let ply = game.history().len() + 1;
        match token {
            Token::Tag { name, .. } => {
                return Err(PgnError::UnexpectedToken(format!("[{} ...]", name)));
            }
            Token::MoveNumber(found) => {
                if numbered {
                    return Err(PgnError::UnexpectedToken(format!("{}.", found)));
                }
                let expected = game.position().fullmove_number() as u32;
                if found != expected {
                    return Err(PgnError::MoveNumberMismatch { expected, found });
                }
                numbered = true;
            }
            Token::San(san) => {
                if game.position().side_to_move() == cozy_chess::Color::White && !numbered {
                    return Err(PgnError::MissingMoveNumber { ply });
                }
                game.play_san(san).map_err(|source| PgnError::InvalidMove {
                    ply,
                    san: san.to_string(),
                    source,
                })?;
                numbered = false;
            }
            Token::Result(_) => {
                if numbered {
                    return Err(PgnError::UnexpectedToken("dangling move number".to_string()));
                }
                finished = true;
            }
        }
    }

    if numbered {
        return Err(PgnError::UnexpectedToken("dangling move number".to_string()));
    }
    Ok(game)
}

fn describe(token: &Token<'_>) -> String {
    match token {
        Token::Tag { name, .. } => format!("[{} ...]", name),
        Token::MoveNumber(n) => format!("{}.", n),
        Token::San(s) | Token::Result(s) => s.to_string(),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, PgnError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            c if c.is_ascii_whitespace() => i += 1,
            b'[' => {
                let (tag, next) = read_tag(text, i)?;
                tokens.push(tag);
                i = next;
            }
            b'{' => {
                i = skip_comment(bytes, i)?;
            }
            b';' => {
                i = skip_line(bytes, i);
            }
            // Escape lines
            b'%' if i == 0 || bytes[i - 1] == b'\n' => {
                i = skip_line(bytes, i);
            }
            b'(' => {
                i = skip_variation(bytes, i)?;
            }
            b')' => return Err(PgnError::UnexpectedToken(")".to_string())),
            b'$' => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            _ => {
                let start = i;
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                push_symbol(&text[start..i], &mut tokens);
            }
        }
    }

    Ok(tokens)
}

fn is_delimiter(c: u8) -> bool {
    c.is_ascii_whitespace() || matches!(c, b'[' | b']' | b'{' | b'}' | b'(' | b')' | b';' | b'$')
}

fn push_symbol<'a>(symbol: &'a str, tokens: &mut Vec<Token<'a>>) {
    if matches!(symbol, "1-0" | "0-1" | "1/2-1/2" | "*") {
        tokens.push(Token::Result(symbol));
        return;
    }
    if symbol.bytes().all(|c| matches!(c, b'!' | b'?')) {
        return;
    }

    let digits = symbol.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && symbol.as_bytes().get(digits) == Some(&b'.') {
        if let Ok(number) = symbol[..digits].parse() {
            tokens.push(Token::MoveNumber(number));
            let rest = symbol[digits..].trim_start_matches('.');
            if !rest.is_empty() {
                push_symbol(rest, tokens);
            }
            return;
        }
    }

    tokens.push(Token::San(symbol));
}

fn read_tag(text: &str, open: usize) -> Result<(Token<'static>, usize), PgnError> {
    let bytes = text.as_bytes();
    let line_end = text[open..]
        .find('\n')
        .map(|n| open + n)
        .unwrap_or(text.len());
    let invalid = || PgnError::InvalidTag(text[open..line_end].trim().to_string());

    let mut i = open + 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == name_start {
        return Err(invalid());
    }
    let name = text[name_start..i].to_string();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'"') {
        return Err(invalid());
    }
    i += 1;

    let mut value = String::new();
    loop {
        match bytes.get(i) {
            None => return Err(invalid()),
            Some(b'\\') if matches!(bytes.get(i + 1), Some(b'"') | Some(b'\\')) => {
                value.push(bytes[i + 1] as char);
                i += 2;
            }
            Some(b'"') => {
                i += 1;
                break;
            }
            Some(_) => {
                let ch = text[i..].chars().next().ok_or_else(invalid)?;
                value.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b']') {
        return Err(invalid());
    }

    Ok((Token::Tag { name, value }, i + 1))
}

fn skip_comment(bytes: &[u8], open: usize) -> Result<usize, PgnError> {
    bytes[open..]
        .iter()
        .position(|&c| c == b'}')
        .map(|n| open + n + 1)
        .ok_or(PgnError::UnterminatedComment)
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&c| c == b'\n')
        .map(|n| start + n + 1)
        .unwrap_or(bytes.len())
}

fn skip_variation(bytes: &[u8], open: usize) -> Result<usize, PgnError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            b'{' => {
                i = skip_comment(bytes, i)?;
                continue;
            }
            b';' => {
                i = skip_line(bytes, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    Err(PgnError::UnterminatedVariation)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Unterminated variation")]
    UnterminatedVariation,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Missing move number before ply {ply}")]
    MissingMoveNumber { ply: usize },
    #[error("Move number {found} does not match expected {expected}")]
    MoveNumberMismatch { expected: u32, found: u32 },
    #[error("Text after game result: {0}")]
    TrailingText(String),
    #[error("Invalid move {san} at ply {ply}: {source}")]
    InvalidMove {
        ply: usize,
        san: String,
        source: GameError,
    },
    #[error(transparent)]
    Game(#[from] GameError),
}
