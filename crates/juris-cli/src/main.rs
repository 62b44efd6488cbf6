//! Juris CLI - Command-line interface for the matter workbench.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use ulid::Ulid;

use juris_core::{JurisConfig, MatterUpdate, SharePermission};
use juris_llm::AnthropicCompleter;
use juris_service::{
    AnalyseParams, CreateMatterParams, IngestParams, MatterService, ShareParams, ToolParams,
};

type Service = MatterService<AnthropicCompleter>;

/// Juris - Matter-centric litigation analysis workbench
#[derive(Parser)]
#[command(name = "juris")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (default: ~/.juris/db.sqlite)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Acting user id
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage matters
    Matter {
        #[command(subcommand)]
        action: MatterAction,
    },

    /// Manage documents
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Ingest a text file into a matter
    Ingest {
        /// Matter id
        matter: Ulid,

        /// Path to the file to ingest
        file: PathBuf,

        /// Document name (default: the file name)
        #[arg(long)]
        name: Option<String>,

        /// Document kind tag (e.g. "Pleading", "Case Law")
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Ask a question grounded in a matter's documents
    Ask {
        /// Matter id
        matter: Ulid,

        /// The question
        question: String,

        /// Analysis type
        #[arg(long)]
        query_type: Option<String>,

        /// Focus area (repeatable)
        #[arg(long)]
        focus: Vec<String>,
    },

    /// Run a whole-matter tool
    Tool {
        /// Matter id
        matter: Ulid,

        /// Tool name: chronology, persons, issues, citations,
        /// inconsistency, proposition, briefing or draft
        tool: String,

        /// Tool instructions (the proposition text, extra guidance)
        #[arg(short, long)]
        instructions: Option<String>,

        /// Anchor document name for the inconsistency tool (repeatable)
        #[arg(long = "anchor")]
        anchors: Vec<String>,
    },

    /// Show question history for a matter
    History {
        /// Matter id
        matter: Ulid,

        /// Clear the history instead of showing it
        #[arg(long)]
        clear: bool,
    },

    /// Show statistics
    Stats {
        /// Matter to get stats for (all if not specified)
        #[arg(long)]
        matter: Option<Ulid>,
    },
}

#[derive(Subcommand)]
enum MatterAction {
    /// Create a new matter
    Create {
        /// Matter name
        name: String,

        /// Governing jurisdiction
        #[arg(short, long)]
        jurisdiction: Option<String>,

        /// Nature of the dispute
        #[arg(long)]
        nature: Option<String>,

        /// Key issues
        #[arg(long)]
        issues: Option<String>,
    },

    /// List your matters
    List,

    /// Update a matter's details
    Update {
        /// Matter id
        matter: Ulid,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New nature of the dispute
        #[arg(long)]
        nature: Option<String>,

        /// New key issues
        #[arg(long)]
        issues: Option<String>,
    },

    /// Delete a matter and everything under it
    Delete {
        /// Matter id
        matter: Ulid,
    },

    /// Share a matter with another user
    Share {
        /// Matter id
        matter: Ulid,

        /// Grantee user id
        grantee: String,

        /// Granted permission (read or edit)
        #[arg(short, long, default_value = "read")]
        permission: SharePermission,
    },

    /// List a matter's shares
    Shares {
        /// Matter id
        matter: Ulid,
    },

    /// Remove a user's share
    Unshare {
        /// Matter id
        matter: Ulid,

        /// Grantee user id
        grantee: String,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List a matter's documents
    List {
        /// Matter id
        matter: Ulid,
    },

    /// Delete a document
    Delete {
        /// Document id
        document: Ulid,
    },
}

fn get_db_path(db: Option<PathBuf>) -> PathBuf {
    if let Some(path) = db {
        return path;
    }

    // Default to ~/.juris/db.sqlite
    let home = dirs::home_dir().expect("Could not determine home directory");
    home.join(".juris").join("db.sqlite")
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let db_path = get_db_path(cli.database);
    let user = cli.user;

    match cli.command {
        Commands::Init => {
            init_database(&db_path)?;
        }
        Commands::Matter { action } => {
            let service = get_service(&db_path)?;
            match action {
                MatterAction::Create {
                    name,
                    jurisdiction,
                    nature,
                    issues,
                } => {
                    create_matter(&service, &user, name, jurisdiction, nature, issues).await;
                }
                MatterAction::List => {
                    list_matters(&service, &user).await;
                }
                MatterAction::Update {
                    matter,
                    name,
                    nature,
                    issues,
                } => {
                    update_matter(&service, &user, matter, name, nature, issues).await;
                }
                MatterAction::Delete { matter } => {
                    delete_matter(&service, &user, matter).await;
                }
                MatterAction::Share {
                    matter,
                    grantee,
                    permission,
                } => {
                    share_matter(&service, &user, matter, grantee, permission).await;
                }
                MatterAction::Shares { matter } => {
                    list_shares(&service, &user, matter).await;
                }
                MatterAction::Unshare { matter, grantee } => {
                    unshare_matter(&service, &user, matter, &grantee).await;
                }
            }
        }
        Commands::Docs { action } => {
            let service = get_service(&db_path)?;
            match action {
                DocsAction::List { matter } => {
                    list_documents(&service, &user, matter).await;
                }
                DocsAction::Delete { document } => {
                    delete_document(&service, &user, document).await;
                }
            }
        }
        Commands::Ingest {
            matter,
            file,
            name,
            kind,
        } => {
            let service = get_service(&db_path)?;
            ingest(&service, &user, matter, &file, name, kind).await?;
        }
        Commands::Ask {
            matter,
            question,
            query_type,
            focus,
        } => {
            let service = get_service(&db_path)?;
            ask(&service, &user, matter, question, query_type, focus).await;
        }
        Commands::Tool {
            matter,
            tool,
            instructions,
            anchors,
        } => {
            let service = get_service(&db_path)?;
            run_tool(&service, &user, matter, tool, instructions, anchors).await;
        }
        Commands::History { matter, clear } => {
            let service = get_service(&db_path)?;
            history(&service, &user, matter, clear).await;
        }
        Commands::Stats { matter } => {
            let service = get_service(&db_path)?;
            stats(&service, matter).await;
        }
    }

    Ok(())
}

fn init_database(db_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    // Create parent directory if needed
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Create the database by opening the service
    let config = JurisConfig::load_default()?;
    let completer = Arc::new(AnthropicCompleter::new(&config.completion)?);
    let _service = MatterService::new(db_path, completer, config)?;
    println!("Initialized database at: {}", db_path.display());
    Ok(())
}

fn get_service(db_path: &PathBuf) -> Result<Service, Box<dyn std::error::Error>> {
    // Check if database directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            eprintln!(
                "Database directory does not exist. Run 'juris init' first, or specify a path with -d."
            );
            std::process::exit(1);
        }
    }

    let config = JurisConfig::load_default()?;
    let completer = Arc::new(AnthropicCompleter::new(&config.completion)?);
    Ok(MatterService::new(db_path, completer, config)?)
}

async fn create_matter(
    service: &Service,
    user: &str,
    name: String,
    jurisdiction: Option<String>,
    nature: Option<String>,
    issues: Option<String>,
) {
    let params = CreateMatterParams {
        name,
        jurisdiction,
        nature,
        issues,
    };

    let result = service.create_matter(user, params).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn list_matters(service: &Service, user: &str) {
    let result = service.list_matters(user).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn update_matter(
    service: &Service,
    user: &str,
    matter: Ulid,
    name: Option<String>,
    nature: Option<String>,
    issues: Option<String>,
) {
    let update = MatterUpdate {
        name,
        nature,
        issues,
    };

    let result = service.update_matter(user, matter, update).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn delete_matter(service: &Service, user: &str, matter: Ulid) {
    let result = service.delete_matter(user, matter).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn share_matter(
    service: &Service,
    user: &str,
    matter: Ulid,
    grantee: String,
    permission: SharePermission,
) {
    let params = ShareParams {
        matter_id: matter,
        user_id: grantee,
        permission,
    };

    let result = service.share_matter(user, params).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn list_shares(service: &Service, user: &str, matter: Ulid) {
    let result = service.list_shares(user, matter).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn unshare_matter(service: &Service, user: &str, matter: Ulid, grantee: &str) {
    let result = service.revoke_share(user, matter, grantee).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn list_documents(service: &Service, user: &str, matter: Ulid) {
    let result = service.list_documents(user, matter).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn delete_document(service: &Service, user: &str, document: Ulid) {
    let result = service.delete_document(user, document).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn ingest(
    service: &Service,
    user: &str,
    matter: Ulid,
    file: &PathBuf,
    name: Option<String>,
    kind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)?;

    let document_name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string()),
    };

    let params = IngestParams {
        matter_id: matter,
        document_name,
        kind,
        content,
    };

    let result = service.ingest(user, params).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }

    Ok(())
}

async fn ask(
    service: &Service,
    user: &str,
    matter: Ulid,
    question: String,
    query_type: Option<String>,
    focus: Vec<String>,
) {
    let params = AnalyseParams {
        matter_id: matter,
        question,
        query_type,
        focus_areas: focus,
    };

    let result = service.analyse(user, params).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn run_tool(
    service: &Service,
    user: &str,
    matter: Ulid,
    tool: String,
    instructions: Option<String>,
    anchors: Vec<String>,
) {
    let params = ToolParams {
        matter_id: matter,
        tool,
        instructions,
        anchor_names: anchors,
    };

    let result = service.run_tool(user, params).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn history(service: &Service, user: &str, matter: Ulid, clear: bool) {
    let result = if clear {
        service.clear_history(user, matter).await
    } else {
        service.history(user, matter).await
    };

    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

async fn stats(service: &Service, matter: Option<Ulid>) {
    let result = service.stats(matter).await;
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}
