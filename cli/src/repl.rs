use anyhow::Result;
use recall_core::TurnOrchestrator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const BANNER: &str = "Type 'quit' to exit.";
pub const PROMPT: &str = "> ";

pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("quit")
}

/// Reads lines until `quit` or end of input. A failed turn is reported and
/// the loop keeps going.
pub async fn run<R, W>(
    orchestrator: &mut TurnOrchestrator,
    user_id: &str,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(format!("{BANNER}\n").as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        if is_quit(&line) {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let reply = match orchestrator.handle_turn(text, user_id).await {
            Ok(outcome) => outcome.answer,
            Err(e) => {
                tracing::debug!(error = %e, "turn failed");
                format!("error: {e}")
            }
        };
        output.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}
