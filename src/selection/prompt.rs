// src/selection/prompt.rs

//! Interactive choice between tied recipes

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::{self, BufRead, IsTerminal, Write};

/// Attempts before an unrecognized answer becomes an error
const MAX_ATTEMPTS: usize = 3;

/// Asks a person to pick one of several options
///
/// The last option is always the skip sentinel. Implementations return the
/// chosen option text verbatim.
#[async_trait]
pub trait Selector: Send + Sync {
    async fn choose(&self, prompt: &str, options: &[String]) -> Result<String>;
}

/// Selector prompting on the controlling terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSelector;

impl TerminalSelector {
    pub fn new() -> Self {
        Self
    }

    /// Terminal selector if both stdin and stdout are terminals
    pub fn detect() -> Option<Self> {
        (io::stdin().is_terminal() && io::stdout().is_terminal()).then_some(Self)
    }
}

#[async_trait]
impl Selector for TerminalSelector {
    async fn choose(&self, prompt: &str, options: &[String]) -> Result<String> {
        let prompt = prompt.to_string();
        let options = options.to_vec();

        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            prompt_choice(&mut stdin.lock(), &mut stdout, &prompt, &options)
        })
        .await
        .map_err(|e| Error::SelectorError(format!("prompt task failed: {e}")))?
    }
}

/// Render a numbered menu and read the answer
///
/// Accepts the option number or the exact option text. End of input picks
/// the last option.
pub fn prompt_choice(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    prompt: &str,
    options: &[String],
) -> Result<String> {
    let Some(last) = options.last() else {
        return Err(Error::SelectorError("no options to choose from".to_string()));
    };

    writeln!(writer)?;
    writeln!(writer, "{}", prompt)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(writer, "  [{}] {}", i + 1, option)?;
    }

    for _ in 0..MAX_ATTEMPTS {
        write!(writer, "Choice [1-{}]: ", options.len())?;
        writer.flush()?;

        let mut input = String::new();
        if reader.read_line(&mut input)? == 0 {
            writeln!(writer)?;
            return Ok(last.clone());
        }

        let answer = input.trim();
        if let Ok(n) = answer.parse::<usize>()
            && (1..=options.len()).contains(&n)
        {
            return Ok(options[n - 1].clone());
        }
        if let Some(option) = options.iter().find(|o| o.as_str() == answer) {
            return Ok(option.clone());
        }
        writeln!(writer, "Unknown option. Please try again.")?;
    }

    Err(Error::SelectorError(format!(
        "no valid choice after {} attempts",
        MAX_ATTEMPTS
    )))
}
