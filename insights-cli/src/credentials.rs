//! OpenAI API key resolution for the CLI.
//!
//! Order: `--api-key` / `OPENAI_API_KEY`, then the key file, then an
//! interactive prompt whose answer is written back to the key file.
//! `--regenerate-key` skips straight to the prompt.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use shellexpand::tilde;

pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// `~` in `key_file` expands to the home directory.
    pub fn new(key_file: &str) -> Self {
        Self {
            path: PathBuf::from(tilde(key_file).into_owned()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key, or `None` when the file is missing or blank.
    pub fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let key = contents.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    pub fn write(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&self.path, key.trim())
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "Saved OpenAI API key");
        Ok(())
    }
}

pub fn resolve_api_key<P>(
    explicit: Option<String>,
    store: &KeyStore,
    regenerate: bool,
    prompt: P,
) -> Result<String>
where
    P: FnOnce() -> Result<String>,
{
    if !regenerate {
        if let Some(key) = explicit.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            return Ok(key);
        }
        if let Some(key) = store.read()? {
            tracing::debug!(path = %store.path().display(), "Using stored OpenAI API key");
            return Ok(key);
        }
        tracing::info!("No OpenAI API key found");
    }

    let key = prompt()?.trim().to_string();
    if key.is_empty() {
        bail!("API key cannot be empty");
    }
    store.write(&key)?;
    Ok(key)
}

pub fn prompt_for_key() -> Result<String> {
    let key = dialoguer::Password::new()
        .with_prompt("Please enter your OpenAI API key")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("API key cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact()
        .context("reading API key from terminal")?;
    Ok(key)
}
