//! `justchess recover`: run pasted or saved PGN through the recovery parser.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chess::{import_pgn, Game, ImportError, MoveList, Recovered, RecoveryStage};
use serde::Serialize;

#[derive(Serialize)]
struct RecoverReport<'a> {
    stage: RecoveryStage,
    plies: usize,
    labels: Vec<String>,
    moves: &'a MoveList,
    final_fen: String,
    pgn: String,
}

/// Read PGN text from `path`, or from stdin when the path is absent or `-`.
pub fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read PGN from stdin")?;
            Ok(text)
        }
    }
}

/// Recover `text`, turning a failure into the message a user should see.
pub fn recover_text(text: &str) -> anyhow::Result<Recovered<Game>> {
    import_pgn(text).map_err(|e| match &e {
        ImportError::Unreadable(failure) => {
            anyhow::anyhow!("{} {}", e, failure.user_message())
        }
        ImportError::Empty => anyhow::anyhow!("{}", e),
    })
}

pub fn render(recovered: &Recovered<Game>, json: bool) -> anyhow::Result<String> {
    let moves = recovered.move_list();
    if json {
        let report = RecoverReport {
            stage: recovered.stage,
            plies: moves.len(),
            labels: moves.labels(),
            moves: &moves,
            final_fen: moves.final_fen(),
            pgn: recovered.game.to_pgn(),
        };
        return serde_json::to_string_pretty(&report).context("failed to serialize report");
    }

    let stage = match recovered.stage {
        RecoveryStage::Strict => "strict",
        RecoveryStage::Headerless => "headerless",
        RecoveryStage::TokenReplay => "token replay",
    };
    let mut out = format!("Recovered {} plies ({})\n", moves.len(), stage);
    if moves.is_empty() {
        out.push_str("No moves yet.\n");
    } else {
        out.push_str(&moves.labels().join(" "));
        out.push('\n');
    }
    if let Some(outcome) = recovered.game.outcome() {
        out.push_str(&outcome.message());
        out.push('\n');
    }
    out.push_str(&format!("FEN: {}\n", moves.final_fen()));
    Ok(out)
}

pub fn run(path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = read_input(path)?;
    let recovered = recover_text(&text)?;
    tracing::info!(stage = ?recovered.stage, plies = recovered.move_list().len(), "PGN recovered");
    print!("{}", render(&recovered, json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_file_and_renders_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[Event \"x\"]\n1.e4 e5 {{good}} 2.Nf3").unwrap();

        let text = read_input(Some(file.path())).unwrap();
        let recovered = recover_text(&text).unwrap();
        let out = render(&recovered, false).unwrap();
        assert!(out.starts_with("Recovered 3 plies"));
        assert!(out.contains("1. e4 e5 2. Nf3"));
        assert!(out.contains("FEN: rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"));
    }

    #[test]
    fn test_json_report() {
        let recovered = recover_text("e4 e5 Nf3 Nc6 Bb5").unwrap();
        let out = render(&recovered, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["stage"], "token_replay");
        assert_eq!(value["plies"], 5);
        assert_eq!(value["labels"][4], "3. Bb5");
        assert_eq!(value["moves"]["moves"][0]["san"], "e4");
    }

    #[test]
    fn test_failure_messages() {
        let err = recover_text("").unwrap_err();
        assert_eq!(err.to_string(), "Please paste a PGN string.");

        let err = recover_text("e4 e5 Qh4").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Could not load the PGN. Please check the format and moves."));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_input(Some(&dir.path().join("missing.pgn"))).is_err());
    }
}
