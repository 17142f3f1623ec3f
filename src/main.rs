use clap::Parser;
use miette::Result;
use tolstack::cli::{commands, Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    reset_sigpipe();

    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(&cli.global);

    let global = &cli.global;
    match cli.command {
        Commands::New(args) => commands::new::run(args, global),
        Commands::Add(args) => commands::add::run(args, global),
        Commands::Rm(args) => commands::rm::run(args, global),
        Commands::Show(args) => commands::show::run(args, global),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Run(args) => commands::run::run(args, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the flags
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "tolstack=debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Die quietly on a closed pipe (`tolstack run x -f yaml | head`)
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}
