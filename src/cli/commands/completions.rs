//! `tolstack completions` command - Shell completion scripts
//!
//! ```bash
//! source <(tolstack completions bash)
//! tolstack completions fish --dir ~/.config/fish/completions
//! ```

use clap::CommandFactory;
use clap_complete::{generate, generate_to, Shell};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;

use crate::cli::Cli;

const BIN_NAME: &str = "tolstack";

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory instead of stdout
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    match args.dir {
        None => generate(args.shell, &mut cmd, BIN_NAME, &mut io::stdout()),
        Some(dir) => {
            let path = generate_to(args.shell, &mut cmd, BIN_NAME, &dir).into_diagnostic()?;
            println!(
                "{} Wrote {} completions to {}",
                style("✓").green(),
                args.shell,
                style(path.display()).dim()
            );
        }
    }
    Ok(())
}
