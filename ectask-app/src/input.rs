use ectask_timing::{InputBus, InputEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Key tokens for one line of typed input. Named keys (`backspace`) pass
/// through whole; anything else is split into single characters. Every
/// line ends with `enter`.
pub fn line_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in line.split_whitespace() {
        if word.eq_ignore_ascii_case("backspace") {
            tokens.push("backspace".to_string());
        } else {
            tokens.extend(word.chars().map(String::from));
        }
    }
    tokens.push("enter".to_string());
    tokens
}

/// Forwards stdin to the input bus until stdin closes or the task is aborted.
pub fn spawn_stdin_reader(bus: InputBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    for token in line_tokens(&line) {
                        if !bus.publish(InputEvent::press(&token)) {
                            debug!(%token, "key pressed while no response was expected");
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
    })
}
