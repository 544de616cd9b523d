use clap::Parser;
use tracing_subscriber::EnvFilter;

use passgen::cli::commands::{add::AddArgs, config::ConfigArgs, edit::EditArgs, generate::GenerateArgs};
use passgen::cli::{commands, output, Cli, Commands};

/// Environment variable holding a `tracing` filter, e.g. `passgen=debug`.
const LOG_ENV: &str = "PASSGEN_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::List { ref query, copy } => {
            commands::list::execute(&cli, query.as_deref(), copy)
        }
        Commands::Search { ref query, copy } => commands::search::execute(&cli, query, copy),
        Commands::Add {
            ref site,
            ref username,
            generate,
            length,
            password_stdin,
            ref tags,
            ref notes,
            copy,
        } => commands::add::execute(
            &cli,
            AddArgs {
                site: site.as_deref(),
                username: username.as_deref(),
                generate,
                length,
                password_stdin,
                tags: tags.as_deref(),
                notes: notes.as_deref(),
                copy,
            },
        ),
        Commands::Edit {
            position,
            ref site,
            ref username,
            generate,
            length,
            password_stdin,
            prompt_password,
            ref tags,
            ref notes,
        } => commands::edit::execute(
            &cli,
            EditArgs {
                position,
                site: site.as_deref(),
                username: username.as_deref(),
                generate,
                length,
                password_stdin,
                prompt_password,
                tags: tags.as_deref(),
                notes: notes.as_deref(),
            },
        ),
        Commands::Delete { position, force } => commands::delete::execute(&cli, position, force),
        Commands::Status => commands::status::execute(&cli),
        Commands::Config {
            show: _,
            reset,
            session_timeout,
            clipboard_timeout,
            password_length,
            ref symbols,
            ref exclude,
        } => commands::config::execute(
            &cli,
            ConfigArgs {
                reset,
                session_timeout,
                clipboard_timeout,
                password_length,
                symbols: symbols.as_deref(),
                exclude: exclude.as_deref(),
            },
        ),
        Commands::Reset { config_only, force } => {
            commands::reset::execute(&cli, config_only, force)
        }
        Commands::Passwd => commands::passwd::execute(&cli),
        Commands::Lock => commands::lock::execute(&cli),
        Commands::Generate {
            length,
            no_uppercase,
            no_lowercase,
            no_digits,
            no_symbols,
            ref symbols,
            ref exclude,
            count,
            copy,
        } => commands::generate::execute(
            &cli,
            GenerateArgs {
                length,
                no_uppercase,
                no_lowercase,
                no_digits,
                no_symbols,
                symbols: symbols.as_deref(),
                exclude: exclude.as_deref(),
                count,
                copy,
            },
        ),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::ClearClipboard { after } => commands::clear_clipboard::execute(after),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

/// Send `tracing` output to stderr.  `--verbose` wins over `PASSGEN_LOG`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("passgen=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
