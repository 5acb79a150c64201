//! `justchess replay`: step through a recovered game from the terminal.

use std::path::Path;

use session::{spawn_replay, KeyInput, ReplayNav, ReplayView};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::recover::{read_input, recover_text};

const HELP: &str = "n/right: next  p/left: previous  f: first  l: last  j N: ply N (0 = start)  q: quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayInput {
    Nav(ReplayNav),
    Key(KeyInput),
    Quit,
}

fn parse_input(line: &str) -> Option<ReplayInput> {
    let mut parts = line.split_whitespace();
    let input = match parts.next()? {
        "n" | "next" => ReplayInput::Nav(ReplayNav::Next),
        "p" | "prev" => ReplayInput::Nav(ReplayNav::Prev),
        "f" | "first" => ReplayInput::Nav(ReplayNav::First),
        "l" | "last" => ReplayInput::Nav(ReplayNav::Last),
        "right" => ReplayInput::Key(KeyInput::ArrowRight),
        "left" => ReplayInput::Key(KeyInput::ArrowLeft),
        "j" | "jump" => {
            let ply: isize = parts.next()?.parse().ok()?;
            ReplayInput::Nav(ReplayNav::JumpTo(ply.saturating_sub(1)))
        }
        "q" | "quit" => ReplayInput::Quit,
        _ => return None,
    };
    Some(input)
}

fn render(view: &ReplayView) -> String {
    let position = match &view.current {
        Some(_) => {
            let label = usize::try_from(view.cursor)
                .ok()
                .and_then(|i| view.labels.get(i))
                .map(String::as_str)
                .unwrap_or("");
            format!("Ply {}/{}: {}", view.cursor + 1, view.labels.len(), label)
        }
        None => format!("Start position (0/{})", view.labels.len()),
    };
    format!("{}\nFEN: {}", position, view.fen)
}

pub async fn run(path: &Path) -> anyhow::Result<()> {
    let text = read_input(Some(path))?;
    let recovered = recover_text(&text)?;
    let moves = recovered.move_list();
    if !moves.is_empty() {
        println!("{}", moves.labels().join(" "));
    }

    let replay = spawn_replay(moves)?;
    println!("{}", HELP);
    println!("{}", render(&replay.view().await?));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let view = match parse_input(&line) {
            Some(ReplayInput::Quit) => break,
            Some(ReplayInput::Nav(nav)) => replay.navigate(nav).await?,
            Some(ReplayInput::Key(key)) => replay.key(key).await?,
            None => {
                println!("{}", HELP);
                continue;
            }
        };
        println!("{}", render(&view));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("n"), Some(ReplayInput::Nav(ReplayNav::Next)));
        assert_eq!(parse_input(" left "), Some(ReplayInput::Key(KeyInput::ArrowLeft)));
        assert_eq!(parse_input("j 3"), Some(ReplayInput::Nav(ReplayNav::JumpTo(2))));
        assert_eq!(parse_input("j 0"), Some(ReplayInput::Nav(ReplayNav::JumpTo(-1))));
        assert_eq!(parse_input("j x"), None);
        assert_eq!(
            parse_input("j -9223372036854775808"),
            Some(ReplayInput::Nav(ReplayNav::JumpTo(isize::MIN)))
        );
        assert_eq!(parse_input("q"), Some(ReplayInput::Quit));
        assert_eq!(parse_input(""), None);
    }

    #[tokio::test]
    async fn test_render_views() {
        let recovered = recover_text("1. e4 e5 2. Nf3").unwrap();
        let replay = spawn_replay(recovered.move_list()).unwrap();

        let view = replay.view().await.unwrap();
        assert!(render(&view).starts_with("Ply 3/3: 2. Nf3"));

        let view = replay.navigate(ReplayNav::First).await.unwrap();
        assert!(render(&view).starts_with("Start position (0/3)"));
    }
}
