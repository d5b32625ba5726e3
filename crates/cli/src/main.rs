use std::time::Duration;

use anyhow::{bail, Context};
use bookshelf_client::{BookListViewModel, BooksApi, ClientError, HttpBooksApi};
use bookshelf_db::{Book, BookId};
use bookshelf_kernel::settings::{Settings, TelemetrySettings};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookshelf", version, about = "Manage a catalog of books")]
struct Cli {
    /// Server origin for client commands (defaults to `client.base_url`)
    #[arg(long, global = true, env = "BOOKSHELF_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// List every book
    List,
    /// Show one book
    Show { id: BookId },
    /// Add a book
    Add(NewBook),
    /// Change fields of an existing book
    Edit {
        id: BookId,
        #[command(flatten)]
        changes: BookChanges,
    },
    /// Delete a book
    Remove { id: BookId },
}

#[derive(Args)]
struct NewBook {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    description: String,
}

#[derive(Args)]
struct BookChanges {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

type ViewModel = BookListViewModel<HttpBooksApi>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf serve starting");
            bookshelf_app::serve(settings).await
        }
        command => {
            // Client commands keep stdout for results.
            bookshelf_telemetry::init(&TelemetrySettings {
                filter: "warn".to_string(),
                ..settings.telemetry.clone()
            })?;

            let base_url = cli
                .base_url
                .unwrap_or_else(|| settings.client.base_url.clone());
            let api = HttpBooksApi::new(&base_url, &settings.server.api_prefix)
                .with_context(|| format!("invalid base url '{base_url}'"))?;
            let vm = BookListViewModel::new(api, Duration::from_millis(settings.client.notice_ttl_ms));

            run_client(vm, command).await
        }
    }
}

async fn run_client(mut vm: ViewModel, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve => bail!("serve is not a client command"),
        Command::List => {
            let result = vm.load().await;
            checked(&vm, result)?;
            if vm.books().is_empty() {
                println!("No books available.");
            }
            for book in vm.books().books() {
                print_book(book);
            }
        }
        Command::Show { id } => {
            let book = vm.api().get(id).await?;
            print_book(&book);
        }
        Command::Add(new) => {
            let form = vm.form_mut();
            form.title = new.title;
            form.author = new.author;
            form.description = new.description;
            let result = vm.submit().await;
            print_book(&checked(&vm, result)?);
        }
        Command::Edit { id, changes } => {
            let result = vm.load().await;
            checked(&vm, result)?;
            if !vm.begin_edit(id) {
                bail!("Book {id} was not found.");
            }
            let form = vm.form_mut();
            if let Some(title) = changes.title {
                form.title = title;
            }
            if let Some(author) = changes.author {
                form.author = author;
            }
            if let Some(description) = changes.description {
                form.description = description;
            }
            let result = vm.submit().await;
            print_book(&checked(&vm, result)?);
        }
        Command::Remove { id } => {
            let result = vm.delete(id).await;
            checked(&vm, result)?;
        }
    }
    Ok(())
}

/// Prints the view-model's notice and turns failures into the notice text.
fn checked<T>(vm: &ViewModel, result: Result<T, ClientError>) -> anyhow::Result<T> {
    let notice = vm.notice().map(|notice| notice.text);
    match result {
        Ok(value) => {
            if let Some(text) = notice {
                println!("{text}");
            }
            Ok(value)
        }
        Err(err) => match notice {
            Some(text) => Err(anyhow::Error::new(err).context(text)),
            None => Err(err.into()),
        },
    }
}

fn print_book(book: &Book) {
    println!("#{} {} by {}", book.id, book.title, book.author);
    if !book.description.is_empty() {
        println!("    {}", book.description);
    }
}
