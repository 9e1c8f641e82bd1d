use anyhow::{Context, Result};
use attendo_core::transport::encode_image_payload;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "attendo", about = "Face recognition attendance CLI")]
struct Cli {
    /// Talk to a daemon on the session bus instead of the system bus
    #[arg(long, global = true)]
    session: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the face in an image and record attendance
    Recognize {
        /// Image file (JPEG or PNG)
        file: PathBuf,
    },
    /// Enroll a new identity from an image with exactly one face
    Enroll {
        /// Display name, e.g. "Jane Doe"
        #[arg(short, long)]
        name: String,
        /// Image file (JPEG or PNG)
        file: PathBuf,
    },
    /// Rebuild the gallery from the reference image directory
    Reload,
    /// List enrolled identities
    List,
    /// Remove an enrolled identity
    Remove {
        /// Identity name
        name: String,
    },
    /// Show today's attendance
    Today,
    /// Show the full attendance history
    History,
    /// Delete an attendance record
    DeleteRecord {
        /// Record ID
        id: String,
    },
    /// Show daemon status
    Status,
}

#[zbus::proxy(
    interface = "org.attendo.Attendance1",
    default_service = "org.attendo.Attendance1",
    default_path = "/org/attendo/Attendance1"
)]
trait Attendance {
    async fn recognize(&self, image: &str) -> zbus::Result<String>;
    async fn enroll(&self, name: &str, image: &str) -> zbus::Result<String>;
    async fn reload_gallery(&self) -> zbus::Result<u32>;
    async fn list_identities(&self) -> zbus::Result<String>;
    async fn remove_identity(&self, name: &str) -> zbus::Result<bool>;
    async fn today_log(&self) -> zbus::Result<String>;
    async fn history(&self) -> zbus::Result<String>;
    async fn delete_record(&self, id: &str) -> zbus::Result<bool>;
    async fn status(&self) -> zbus::Result<String>;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = if cli.session {
        zbus::Connection::session().await
    } else {
        zbus::Connection::system().await
    };
    let conn = conn.context("failed to connect to D-Bus")?;
    let proxy = AttendanceProxy::new(&conn)
        .await
        .context("attendod is not reachable")?;

    match cli.command {
        Commands::Recognize { file } => {
            let image = read_image_payload(&file)?;
            print_json(&proxy.recognize(&image).await?)?;
        }
        Commands::Enroll { name, file } => {
            let image = read_image_payload(&file)?;
            print_json(&proxy.enroll(&name, &image).await?)?;
        }
        Commands::Reload => {
            let count = proxy.reload_gallery().await?;
            println!("Gallery reloaded: {count} identities");
        }
        Commands::List => {
            let names: Vec<String> = serde_json::from_str(&proxy.list_identities().await?)?;
            if names.is_empty() {
                println!("No identities enrolled");
            }
            for name in names {
                println!("{name}");
            }
        }
        Commands::Remove { name } => {
            if proxy.remove_identity(&name).await? {
                println!("Removed {name}");
            } else {
                println!("No identity named {name}");
            }
        }
        Commands::Today => print_json(&proxy.today_log().await?)?,
        Commands::History => print_json(&proxy.history().await?)?,
        Commands::DeleteRecord { id } => {
            if proxy.delete_record(&id).await? {
                println!("Deleted record {id}");
            } else {
                println!("No record with id {id}");
            }
        }
        Commands::Status => print_json(&proxy.status().await?)?,
    }

    Ok(())
}

/// Read an image file and wrap it as a data-URI payload.
fn read_image_payload(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "image loaded");
    Ok(encode_image_payload(&bytes, mime_for(path)))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn print_json(raw: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
