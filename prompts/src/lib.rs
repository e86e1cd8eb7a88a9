//! File-backed prompt queue.
//!
//! Two newline-delimited text files act as an unused/used pair: prompts are
//! drawn at random from the unused bank and never handed out twice within a
//! load; each draw is persisted by removing the line from the unused file
//! (case-insensitively) and appending it to the used file.

use std::io;
use std::path::PathBuf;

use rand::Rng;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Handed out when the bank runs dry rather than stalling the round.
pub const FALLBACK_PROMPT: &str = "Draw something cool";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt file i/o: {0}")]
    Io(#[from] io::Error),
}

pub struct PromptBank {
    paths: Option<(PathBuf, PathBuf)>,
    bank: Vec<String>,
}

impl PromptBank {
    /// Loads the unused prompt file. A missing file is tolerated: it is
    /// created empty and the bank starts out exhausted.
    pub async fn load(
        unused: impl Into<PathBuf>,
        used: impl Into<PathBuf>,
    ) -> Result<Self, PromptError> {
        let unused = unused.into();
        let used = used.into();
        let bank = match fs::read_to_string(&unused).await {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %unused.display(), "prompt file missing, creating it empty");
                fs::write(&unused, "").await?;
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            paths: Some((unused, used)),
            bank,
        })
    }

    /// An in-memory bank with no backing files. Draws are not persisted.
    pub fn fixed(prompts: Vec<String>) -> Self {
        Self {
            paths: None,
            bank: prompts,
        }
    }

    pub fn len(&self) -> usize {
        self.bank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bank.is_empty()
    }

    /// Draws a uniformly random prompt, removing it (and any case-variant
    /// duplicates) from the bank so it cannot recur, then persists the
    /// unused-to-used move. Persistence failures are logged, not fatal.
    pub async fn draw(&mut self) -> String {
        if self.bank.is_empty() {
            warn!("prompt bank exhausted, using the fallback prompt");
            return FALLBACK_PROMPT.to_string();
        }
        let idx = rand::thread_rng().gen_range(0..self.bank.len());
        let prompt = self.bank[idx].clone();
        let folded = prompt.to_lowercase();
        self.bank.retain(|p| p.to_lowercase() != folded);

        if let Err(err) = self.persist_move(&prompt).await {
            warn!(%err, prompt, "failed to persist prompt rotation");
        }
        prompt
    }

    async fn persist_move(&self, prompt: &str) -> Result<(), PromptError> {
        let Some((unused, used)) = &self.paths else {
            return Ok(());
        };

        let mut remaining = String::new();
        for p in &self.bank {
            remaining.push_str(p);
            remaining.push('\n');
        }
        fs::write(unused, remaining).await?;

        let mut used_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(used)
            .await?;
        used_file.write_all(format!("{prompt}\n").as_bytes()).await?;
        Ok(())
    }
}
