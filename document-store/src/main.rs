use clap::{Parser, Subcommand};
use document_store::config::DocumentConfig;
use document_store::models::FileUpload;
use document_store::panel::{DocumentRow, DocumentsPanel, RowAction};
use document_store::startup::Application;
use service_core::observability::init_tracing;
use std::io::Write;
use std::path::PathBuf;

/// Manage the file attachments of an instrument.
#[derive(Debug, Parser)]
#[command(name = "document-store", version)]
struct Cli {
    /// Instrument symbol the documents belong to.
    #[arg(long, short)]
    scope: String,

    /// Uploading user; also filters the listing.
    #[arg(long, short)]
    owner: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the documents grid.
    List,
    /// Upload a file.
    Upload {
        path: PathBuf,
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Save a document into a directory.
    Download {
        id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Print a previewable document to stdout.
    View { id: String },
    /// Delete a document.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = DocumentConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    init_tracing("document-store", &config.common.log_level);

    let app = Application::build(config).await?;
    let mut panel = app.panel(&cli.scope, &cli.owner);
    panel.mount().await;

    if let Some(error) = panel.store().state().last_error {
        anyhow::bail!(error);
    }

    match cli.command {
        Command::List => print_grid(&panel.rows()),
        Command::Upload { path, description } => {
            let file = FileUpload::from_path(&path).await?;
            panel.open_upload();
            panel.select_file(file);
            if let Some(description) = description {
                panel.set_description(description);
            }
            match panel.submit_upload().await {
                Some(record) => {
                    println!("Uploaded {} as {}", record.file_name, record.id);
                    print_grid(&panel.rows());
                }
                None => {
                    let error = panel
                        .upload_dialog()
                        .error
                        .clone()
                        .unwrap_or_else(|| "Upload failed".to_string());
                    anyhow::bail!(error);
                }
            }
        }
        Command::Download { id, out } => match panel.download_to(&id, &out).await? {
            Some(path) => println!("Saved {}", path.display()),
            None => anyhow::bail!(last_error(&panel)),
        },
        Command::View { id } => view(&panel, &id).await?,
        Command::Delete { id, yes } => {
            panel.request_delete(id.clone())?;
            if !yes && !confirm(&format!("Delete document {}?", id))? {
                panel.cancel_delete();
                println!("Cancelled");
                return Ok(());
            }
            panel.confirm_delete().await?;
            print_grid(&panel.rows());
        }
    }

    Ok(())
}

async fn view(panel: &DocumentsPanel, id: &str) -> anyhow::Result<()> {
    let Some(file) = panel.view(id).await else {
        let reason = panel
            .store()
            .state()
            .last_error
            .unwrap_or_else(|| format!("Document {} cannot be previewed", id));
        anyhow::bail!(reason);
    };

    if file.mime_type.starts_with("text/") {
        std::io::stdout().write_all(&file.bytes)?;
    } else {
        println!(
            "{} ({}, {} bytes)",
            file.file_name,
            file.mime_type,
            file.bytes.len()
        );
    }
    Ok(())
}

fn last_error(panel: &DocumentsPanel) -> String {
    panel
        .store()
        .state()
        .last_error
        .unwrap_or_else(|| "Download failed".to_string())
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_grid(rows: &[DocumentRow]) {
    if rows.is_empty() {
        println!("No documents");
        return;
    }

    let id_w = column_width("ID", rows.iter().map(|r| r.id.chars().count()));
    let name_w = column_width("NAME", rows.iter().map(|r| r.file_name.chars().count()));
    let size_w = column_width("SIZE", rows.iter().map(|r| r.size.chars().count()));
    let date_w = column_width("UPLOADED", rows.iter().map(|r| r.uploaded_at.chars().count()));

    println!(
        "{:id_w$}  {:name_w$}  {:>size_w$}  {:date_w$}  ACTIONS  DESCRIPTION",
        "ID", "NAME", "SIZE", "UPLOADED"
    );
    for row in rows {
        let actions: String = row
            .actions
            .iter()
            .map(|a| match a {
                RowAction::View => 'v',
                RowAction::Download => 'd',
                RowAction::Delete => 'x',
            })
            .collect();
        println!(
            "{:id_w$}  {:name_w$}  {:>size_w$}  {:date_w$}  {:7}  {}",
            row.id, row.file_name, row.size, row.uploaded_at, actions, row.description
        );
    }
}

fn column_width(header: &str, widths: impl Iterator<Item = usize>) -> usize {
    widths.max().unwrap_or(0).max(header.len())
}
