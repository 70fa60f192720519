//! One-shot commands. Each one calls a single backend operation and prints
//! the outcome; failures go through `DisplayError` exactly like in the TUI.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::*;
use std::path::PathBuf;

use laya_core::{
    ApiClient, ChatController, ChatReply, DisplayError, IngestFile, LoadStatus, NewProject, Project, ProjectList,
    ProjectStatus, Rating, SearchHit,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Semantic search over the indexed documents
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Ask a single question with no conversation history
    Ask {
        question: String,
        /// Number of passages the backend retrieves
        #[arg(long)]
        top_k: Option<u32>,
    },
    /// Send one chat message, continuing the saved transcript
    Chat {
        message: String,
        /// Intent hint such as qa or summarize; detected by the backend when omitted
        #[arg(long)]
        intent: Option<String>,
    },
    /// Rate an answer
    Feedback {
        /// -1, 0 or 1
        #[arg(long, allow_hyphen_values = true)]
        rating: i8,
        #[arg(long)]
        message_id: Option<i64>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Upload documents for indexing
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Manage portfolio projects
    Projects {
        #[command(subcommand)]
        action: ProjectCommand,
    },
    /// List technologies, optionally for one project
    Technologies {
        #[arg(long)]
        project: Option<String>,
    },
    /// List domains
    Domains,
    /// List the contributors of a project
    Contributors {
        #[arg(long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    List,
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        domain_id: Option<String>,
        /// draft, published or archived
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        repo_url: Option<String>,
        #[arg(long)]
        live_url: Option<String>,
        #[arg(long)]
        logo_url: Option<String>,
    },
    Delete {
        id: String,
    },
}

/// Shared inputs for every command.
pub struct Context {
    pub api: ApiClient,
    pub chat: ChatController,
    pub search_limit: usize,
    pub store: Option<laya_core::LocalStore>,
}

pub async fn run(ctx: Context, command: Commands) -> Result<()> {
    let Context {
        api,
        chat,
        search_limit,
        store,
    } = ctx;

    match command {
        Commands::Search { query, limit } => {
            search(&api, &query, limit.unwrap_or(search_limit)).await
        }
        Commands::Ask { question, top_k } => {
            let top_k = top_k.or(chat.top_k);
            println!("{} {}\n", "?".bold().cyan(), question.bold());
            let reply = api.ask(&question, top_k).await.map_err(shown)?;
            print_reply(&reply);
            Ok(())
        }
        Commands::Chat { message, intent } => chat_once(&api, chat, store, &message, intent.as_deref()).await,
        Commands::Feedback {
            rating,
            message_id,
            comment,
        } => {
            let rating = Rating::try_from(rating).map_err(|e| anyhow!(e))?;
            let ack = api
                .feedback(message_id, rating, comment.as_deref())
                .await
                .map_err(shown)?;
            println!("{} {}", "Feedback:".bold().green(), ack.status);
            Ok(())
        }
        Commands::Ingest { files } => ingest(&api, &files).await,
        Commands::Projects { action } => projects(&api, action).await,
        Commands::Technologies { project } => {
            let techs = api.list_technologies(project.as_deref()).await.map_err(shown)?;
            if techs.is_empty() {
                println!("{}", "No technologies".dimmed());
            }
            for tech in techs {
                let name = tech.name.as_deref().unwrap_or("(unnamed)");
                let version = tech.version.as_deref().unwrap_or("");
                println!("{} {} {}", name.bold(), version.yellow(), tech.project_id.dimmed());
            }
            Ok(())
        }
        Commands::Domains => {
            let domains = api.list_domains().await.map_err(shown)?;
            if domains.is_empty() {
                println!("{}", "No domains".dimmed());
            }
            for domain in domains {
                println!("{} {}", domain.name.bold(), format!("({})", domain.slug).dimmed());
                if let Some(desc) = domain.description {
                    println!("   {}", desc);
                }
            }
            Ok(())
        }
        Commands::Contributors { project } => {
            let people = api.list_contributors(&project).await.map_err(shown)?;
            if people.is_empty() {
                println!("{}", "No contributors".dimmed());
            }
            for person in &people {
                let role = person.role.as_deref().unwrap_or("");
                println!("{} {}", person.display_name().bold(), role.yellow());
                if let Some(github) = &person.github {
                    println!("   {}", github.dimmed());
                }
            }
            Ok(())
        }
    }
}

/// Convert a client error into the user-facing form before it leaves the command.
fn shown(err: laya_core::ClientError) -> anyhow::Error {
    let display = DisplayError::from(err);
    match display.cause {
        Some(cause) => anyhow!("{} ({})", display.message, cause),
        None => anyhow!(display.message),
    }
}

async fn search(api: &ApiClient, query: &str, limit: usize) -> Result<()> {
    println!("Searching for: {}", query.bold().cyan());

    let hits = api.search(query, limit).await.map_err(shown)?;
    if hits.is_empty() {
        println!("{}", "No results found".red());
        return Ok(());
    }

    println!("\n{} results found:\n", hits.len().to_string().bold().green());
    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    Ok(())
}

fn print_hit(n: usize, hit: &SearchHit) {
    let source = hit.source().map(|s| s.into_owned()).unwrap_or_default();
    println!(
        "{}. {} {} {}",
        n.to_string().bold().blue(),
        hit.label().bold().yellow(),
        format!("{:.3}", hit.score).dimmed(),
        source.dimmed()
    );
    if let Some(text) = hit.text() {
        let preview: String = text.chars().take(240).collect();
        println!("   {}\n", preview);
    }
}

fn print_reply(reply: &ChatReply) {
    println!("{}", reply.answer);
    if let Some(note) = &reply.rag_error {
        println!("\n{} {}", "Retrieval warning:".yellow(), note);
    }
    if !reply.citations.is_empty() {
        println!("\n{}", "Sources:".bold().blue());
        for (i, hit) in reply.citations.iter().enumerate() {
            println!("  [{}] {}", i + 1, hit.label().yellow());
        }
    }
}

async fn chat_once(
    api: &ApiClient,
    mut chat: ChatController,
    store: Option<laya_core::LocalStore>,
    message: &str,
    intent: Option<&str>,
) -> Result<()> {
    if let Some(store) = &store {
        chat.restore(store.transcript());
    }

    chat.intent = intent.map(str::to_string);
    let turn = chat
        .run(api, message)
        .await
        .cloned()
        .ok_or_else(|| anyhow!("Message is empty"))?;

    if let Some(store) = &store {
        store.set_transcript(chat.turns());
    }

    if turn.failed {
        return Err(anyhow!(turn.text));
    }
    println!("{}", "LAYA:".bold().yellow());
    println!("{}", turn.text);
    if !turn.citations.is_empty() {
        println!("\n{}", "Sources:".bold().blue());
        for (i, hit) in turn.citations.iter().enumerate() {
            println!("  [{}] {}", i + 1, hit.label().yellow());
        }
    }
    Ok(())
}

async fn ingest(api: &ApiClient, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = IngestFile::from_path(path).await.map_err(shown)?;
        files.push(file);
    }

    println!("Uploading {} file(s)...", files.len().to_string().bold());
    let status = api.ingest(files).await.map_err(shown)?;
    match status {
        Some(text) => println!("{} {}", "Done:".bold().green(), text),
        None => println!("{}", "Nothing to upload".dimmed()),
    }
    Ok(())
}

async fn projects(api: &ApiClient, action: ProjectCommand) -> Result<()> {
    match action {
        ProjectCommand::List => {
            let mut list = ProjectList::default();
            if list.refresh(api).await == LoadStatus::Errored {
                let err = list.error().map(ToString::to_string).unwrap_or_default();
                return Err(anyhow!(err));
            }
            if list.projects().is_empty() {
                println!("{}", "No projects".dimmed());
            }
            for project in list.projects() {
                println!(
                    "{} {} {}",
                    project.name.bold(),
                    format!("({})", project.slug).dimmed(),
                    project.status.as_deref().unwrap_or("").yellow()
                );
            }
        }
        ProjectCommand::Show { id } => {
            let project = api.get_project(&id).await.map_err(shown)?;
            print_project(&project);
        }
        ProjectCommand::Create {
            name,
            slug,
            title,
            description,
            domain_id,
            status,
            repo_url,
            live_url,
            logo_url,
        } => {
            let status = status
                .map(|s| s.parse::<ProjectStatus>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            let payload = NewProject {
                title,
                description,
                domain_id,
                status,
                repo_url,
                live_url,
                logo_url,
                ..NewProject::new(name, slug)
            };
            let project = api.create_project(&payload).await.map_err(shown)?;
            println!("{} {}", "Created".bold().green(), project.id);
            print_project(&project);
        }
        ProjectCommand::Delete { id } => {
            let project = api.delete_project(&id).await.map_err(shown)?;
            println!("{} {}", "Deleted".bold().red(), project.name);
        }
    }
    Ok(())
}

fn print_project(project: &Project) {
    println!("{}", project.name.bold().yellow());
    println!("  {} {}", "id:".dimmed(), project.id);
    println!("  {} {}", "slug:".dimmed(), project.slug);
    let optional = [
        ("title", &project.title),
        ("status", &project.status),
        ("domain", &project.domain_id),
        ("repo", &project.repo_url),
        ("live", &project.live_url),
        ("logo", &project.logo_url),
        ("created", &project.created_at),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("  {} {}", format!("{}:", label).dimmed(), value);
        }
    }
    if let Some(desc) = &project.description {
        println!("\n  {}", desc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_negative_rating_parses() {
        let cli = TestCli::try_parse_from(["laya", "feedback", "--rating", "-1"]).unwrap();
        match cli.command {
            Commands::Feedback { rating, .. } => assert_eq!(rating, -1),
            _ => panic!("expected feedback"),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(TestCli::try_parse_from(["laya", "ingest"]).is_err());
    }

    #[test]
    fn test_project_create_flags() {
        let cli = TestCli::try_parse_from([
            "laya", "projects", "create", "--name", "Laya", "--slug", "laya", "--status", "draft",
        ])
        .unwrap();
        match cli.command {
            Commands::Projects {
                action: ProjectCommand::Create { name, slug, status, .. },
            } => {
                assert_eq!(name, "Laya");
                assert_eq!(slug, "laya");
                assert_eq!(status.as_deref(), Some("draft"));
            }
            _ => panic!("expected projects create"),
        }
    }

    #[test]
    fn test_contributors_require_project() {
        assert!(TestCli::try_parse_from(["laya", "contributors"]).is_err());
        let cli = TestCli::try_parse_from(["laya", "contributors", "--project", "p1"]).unwrap();
        assert!(matches!(cli.command, Commands::Contributors { ref project } if project == "p1"));
    }

    #[test]
    fn test_shown_keeps_http_body() {
        let err = shown(laya_core::ClientError::Http {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.to_string(), "HTTP 500 - boom");
    }
}
