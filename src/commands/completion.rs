//! Completion command
//!
//! Generate shell completion scripts

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

/// Generate shell completion scripts
///
/// # Examples
///
/// ```bash
/// portext completion bash > /usr/local/share/bash-completion/completions/portext
/// portext completion zsh > /usr/local/share/zsh/site-functions/_portext
/// portext completion fish > ~/.config/fish/completions/portext.fish
/// ```
#[allow(
    clippy::unnecessary_wraps,
    reason = "Result type maintained for consistency with command signature pattern"
)]
pub(crate) fn run(shell: Shell) -> Result<()> {
    let mut cmd = crate::Cli::command();

    generate(shell, &mut cmd, "portext", &mut io::stdout());

    Ok(())
}
