//! `passgen status`: show vault and session state.

use comfy_table::{ContentArrangement, Table};

use crate::cli::output;
use crate::cli::{build_service, Cli};
use crate::errors::Result;
use crate::session::SessionPhase;

/// Execute the `status` command.  Never prompts for a password.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut service = build_service(cli)?;
    let status = service.status()?;
    let settings = service.settings();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Property", "Value"]);

    table.add_row(vec!["Vault".to_string(), status.vault_path.display().to_string()]);
    table.add_row(vec![
        "Exists".to_string(),
        if status.vault_exists { "yes" } else { "no" }.to_string(),
    ]);

    if let Some(count) = status.entry_count {
        table.add_row(vec!["Entries".to_string(), count.to_string()]);
    }
    if let Some(iterations) = status.kdf_iterations {
        table.add_row(vec!["KDF iterations".to_string(), iterations.to_string()]);
    }
    if let Some(created) = status.created_at {
        table.add_row(vec![
            "Created".to_string(),
            created.format("%Y-%m-%d %H:%M UTC").to_string(),
        ]);
    }

    let session = &status.session;
    let phase = match session.phase {
        SessionPhase::Locked => "locked".to_string(),
        SessionPhase::Unlocking => "unlocking".to_string(),
        SessionPhase::Unlocked => match session.method {
            Some(method) => format!("unlocked ({method})"),
            None => "unlocked".to_string(),
        },
    };
    table.add_row(vec!["Session".to_string(), phase]);

    if let Some(remaining) = session.remaining_seconds {
        table.add_row(vec!["Expires in".to_string(), format!("{remaining}s")]);
    }

    table.add_row(vec![
        "Session timeout".to_string(),
        format!("{}s", settings.session_timeout_seconds),
    ]);
    table.add_row(vec![
        "Biometric".to_string(),
        if session.biometric_available { "available" } else { "unavailable" }.to_string(),
    ]);
    table.add_row(vec![
        "Escrow fallback".to_string(),
        if settings.escrow_fallback { "on" } else { "off" }.to_string(),
    ]);

    println!("{table}");

    if !status.vault_exists {
        output::tip("Run `passgen init` to create a vault.");
    }

    Ok(())
}
