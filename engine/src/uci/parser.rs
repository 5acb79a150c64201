use chess::parse_uci_move;
use cozy_chess::Move;

use crate::GoParams;

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    UciOk,
    ReadyOk,
    /// `mv` is `None` when the engine reports `bestmove (none)`.
    /// Castling arrives in UCI king-two-squares form.
    BestMove { mv: Option<Move> },
}

/// Parse a UCI message line. Lines the session has no use for (`id`, `info`,
/// `option`) are reported as unknown.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"bestmove") => {
            let Some(&best) = tokens.get(1) else {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            };
            let mv = match best {
                "(none)" | "0000" => None,
                s => Some(
                    parse_uci_move(s).ok_or_else(|| crate::UciError::InvalidMove(s.to_string()))?,
                ),
            };
            Ok(UciMessage::BestMove { mv })
        }

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Render a `go` command line, newline included.
pub fn format_go(params: &GoParams) -> String {
    let mut go_cmd = "go".to_string();
    if let Some(movetime) = params.movetime {
        go_cmd.push_str(&format!(" movetime {}", movetime));
    } else if let Some(depth) = params.depth {
        go_cmd.push_str(&format!(" depth {}", depth));
    } else {
        go_cmd.push_str(" movetime 1000"); // Default 1 second
    }
    go_cmd.push('\n');
    go_cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::format_uci_move;

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        match msg {
            UciMessage::BestMove { mv } => {
                assert_eq!(format_uci_move(mv.unwrap()), "e2e4");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_bestmove_none() {
        assert_eq!(
            parse_uci_message("bestmove (none)").unwrap(),
            UciMessage::BestMove { mv: None }
        );
        assert!(parse_uci_message("bestmove").is_err());
        assert!(parse_uci_message("bestmove z9z9").is_err());
    }

    #[test]
    fn test_parse_handshake() {
        assert_eq!(parse_uci_message("uciok").unwrap(), UciMessage::UciOk);
        assert_eq!(parse_uci_message("readyok").unwrap(), UciMessage::ReadyOk);
        assert!(matches!(
            parse_uci_message("info depth 12 score cp 35"),
            Err(crate::UciError::UnknownMessage(_))
        ));
        assert!(parse_uci_message("copyprotection ok").is_err());
    }

    #[test]
    fn test_format_go() {
        assert_eq!(format_go(&GoParams::for_skill(0)), "go depth 4\n");
        assert_eq!(format_go(&GoParams::for_skill(20)), "go movetime 2000\n");
        assert_eq!(format_go(&GoParams::default()), "go movetime 1000\n");
    }
}
