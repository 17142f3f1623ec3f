//! `tolstack validate` command - Check stack files

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::core::Config;
use crate::entities::stack::StackDefinition;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Stack files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let policy = Config::load().truncation_policy();
    let mut failed = 0usize;

    for path in &args.files {
        let result = StackDefinition::load(path).and_then(|stack| {
            let chain = stack.validate(&policy)?;
            Ok((stack, chain))
        });
        match result {
            Ok((stack, chain)) => println!(
                "{} {} ({} {} contributor(s))",
                style("✓").green(),
                path.display(),
                chain.len(),
                stack.kind
            ),
            Err(e) => {
                failed += 1;
                tracing::debug!(path = %path.display(), error = ?e, "validation failed");
                println!("{} {}: {}", style("✗").red(), path.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} stack file(s) failed validation",
            failed,
            args.files.len()
        ));
    }
    Ok(())
}
