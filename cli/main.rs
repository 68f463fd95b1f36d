use clap::{Parser, Subcommand};
use shelf::{
    config::{self, DatabaseSettings, LogSettings},
    prelude::*,
    telemetry,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Personal book catalog CLI", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub database: DatabaseSettings,

    #[command(flatten)]
    pub log: LogSettings,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a book to the catalog
    Add {
        #[arg(long, help = "Book title")]
        title: String,

        #[arg(long, help = "Book author")]
        author: String,

        #[arg(short, long, help = "Tags (comma separated)")]
        tags: Option<String>,

        #[arg(long, help = "Cover image URL", conflicts_with = "cover_file")]
        cover: Option<String>,

        #[arg(long, help = "Cover image file, embedded as a data URI")]
        cover_file: Option<PathBuf>,
    },

    /// List books, optionally filtered and sorted
    List {
        #[arg(short, long, help = "Case-insensitive title search")]
        search: Option<String>,

        #[arg(short, long, help = "Only books carrying this tag")]
        tag: Option<String>,

        #[arg(long, default_value = "asc", help = "Title order: asc or desc")]
        sort: SortOrder,
    },

    /// Print every tag in use
    Tags,

    /// Show one book
    Show { id: String },

    /// Delete a book
    Remove { id: String },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("failed to open database: {0}")]
    Open(#[from] sqlx::Error),

    #[error("failed to read cover file {path}: {source}")]
    ReadCover {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cover file: {0}")]
    Cover(#[from] CoverError),
}

fn print_book(book: &Book) {
    println!("{}  {} by {}", book.id, book.title, book.author);
    if !book.tags.is_empty() {
        println!("    tags: {}", join_tags(&book.tags));
    }
}

async fn run(cli: Cli, db: &Database) -> Result<(), CliError> {
    match cli.command {
        Commands::Add {
            title,
            author,
            tags,
            cover,
            cover_file,
        } => {
            let cover_image = match cover_file {
                Some(path) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .map_err(|source| CliError::ReadCover { path, source })?;
                    Some(encode_data_uri(&bytes)?)
                }
                None => cover,
            };

            let mut draft = BookDraft::new(title, author)
                .with_tags(split_tags(tags.as_deref().unwrap_or_default()));
            if let Some(cover_image) = cover_image {
                draft = draft.with_cover_image(cover_image);
            }

            let book = create_book(db, draft).await?;

            println!("Added book:");
            print_book(&book);
        }
        Commands::List { search, tag, sort } => {
            let query = BookQuery {
                search,
                tag,
                sort,
            };

            let books = query_books(db, &query).await?;
            if books.is_empty() {
                println!("No books found");
            }
            for book in &books {
                print_book(book);
            }
        }
        Commands::Tags => {
            for tag in tag_index(db).await? {
                println!("{tag}");
            }
        }
        Commands::Show { id } => {
            let book = find_book(db, &id).await?;
            print_book(&book);
            if let Some(cover) = &book.cover_image {
                let shown: String = cover.chars().take(60).collect();
                println!("    cover: {shown}");
            }
            println!("    created: {}", book.created_at.to_rfc3339());
            println!("    updated: {}", book.updated_at.to_rfc3339());
        }
        Commands::Remove { id } => {
            remove_book(db, &id).await?;
            println!("Removed book {id}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    config::load_dotenv();
    let cli = Cli::parse();
    telemetry::init(&cli.log);

    let db = Database::open(&cli.database.url).await?;
    let result = run(cli, &db).await;
    db.close().await;

    result
}
