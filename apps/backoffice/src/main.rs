use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings_from, load_settings, ClientError, OrderedRecord, ReorderEngine,
    ReorderOutcome, StudioClient, SubmitOutcome, TracingNotifier,
};
use shared::{
    domain::{DeveloperId, ProjectId, RequestPriority, ServiceRequestId, ServiceRequestStatus},
    protocol::{
        ContactRequest, Developer, Pagination, PhotoBatch, PhotoFile, ProjectFilter,
        ServiceRequestFilter, ServiceRequestUpdate,
    },
};
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; defaults to `backoffice.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    /// Re-read the list after a successful reorder.
    #[arg(long)]
    confirm: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the developer roster in display order.
    Developers,
    /// Move the developer at `from` to `to` and persist the new priorities.
    Reorder {
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Send the public contact form.
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        project_type: String,
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        timeline: Option<String>,
        #[arg(long)]
        description: String,
    },
    /// Upload photos to a project.
    Photos {
        #[arg(long)]
        project_id: i64,
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove an uploaded photo from a project.
    DeletePhoto {
        #[arg(long)]
        project_id: i64,
        #[arg(long)]
        url: String,
    },
    /// List incoming service requests, newest first.
    Requests {
        #[arg(long)]
        status: Option<ServiceRequestStatus>,
        #[arg(long)]
        priority: Option<RequestPriority>,
        #[arg(long)]
        project_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 25)]
        per_page: u32,
    },
    /// Update the status, priority, assignee or notes of a service request.
    Triage {
        id: i64,
        #[arg(long)]
        status: Option<ServiceRequestStatus>,
        #[arg(long)]
        priority: Option<RequestPriority>,
        #[arg(long)]
        developer_id: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Print service request counts by status and priority.
    RequestStats,
    /// List public technologies.
    Technologies,
    /// List public projects.
    Projects {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        project_type: Option<String>,
        #[arg(long)]
        featured: Option<bool>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a public developer profile by slug, with their projects.
    Developer { slug: String },
    /// Print public site statistics as JSON.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    if let Some(token) = cli.token {
        settings.admin_token = Some(token);
    }
    settings.confirm_reorder_with_refetch |= cli.confirm;
    info!(api = %settings.api_base_url, "using api");

    let client = StudioClient::new(settings, Arc::new(TracingNotifier)).context("building client")?;

    match cli.command {
        Command::Developers => {
            let engine = client.developer_ordering();
            print_developers(&engine.load().await?);
        }
        Command::Reorder { from, to } => {
            let engine = client.developer_ordering();
            reorder(&engine, from, to).await?;
            print_developers(&engine.items());
        }
        Command::Contact {
            name,
            email,
            phone,
            company,
            project_type,
            budget,
            timeline,
            description,
        } => {
            let form = client.contact_form();
            form.open(ContactRequest {
                client_name: name,
                client_email: email,
                client_phone: phone,
                company_name: company,
                project_type,
                budget_range: budget,
                timeline,
                description,
                requirements: None,
            })
            .await;
            let receipt = finish(form.submit().await)?;
            println!("request #{} {}: {}", receipt.id, receipt.status, receipt.message);
        }
        Command::Photos { project_id, files } => {
            let mut batch = PhotoBatch {
                project_id: ProjectId(project_id),
                files: Vec::with_capacity(files.len()),
            };
            for path in &files {
                batch.files.push(read_photo(path).await?);
            }
            let uploader = client.photo_uploader();
            uploader.open(batch).await;
            let receipt = finish(uploader.submit().await)?;
            println!("{} ({} images on project)", receipt.message, receipt.total_images);
            for url in receipt.uploaded_urls {
                println!("  {url}");
            }
        }
        Command::DeletePhoto { project_id, url } => {
            let receipt = client
                .project_photos()
                .delete(ProjectId(project_id), &url)
                .await?;
            println!("{} ({} images left)", receipt.message, receipt.remaining_images);
        }
        Command::Requests {
            status,
            priority,
            project_type,
            page,
            per_page,
        } => {
            let filter = ServiceRequestFilter {
                status,
                priority,
                project_type,
            };
            let listed = client
                .service_requests()
                .list(&filter, Pagination { page, per_page })
                .await?;
            for request in &listed.data {
                println!(
                    "{:>5}  {:<12} {:<7} {:<24} {}",
                    request.id,
                    request.status.as_str(),
                    request.priority.as_str(),
                    request.client_name,
                    request.project_type
                );
            }
            println!("{} of {} requests", listed.data.len(), listed.total);
        }
        Command::Triage {
            id,
            status,
            priority,
            developer_id,
            notes,
        } => {
            let updated = client
                .service_requests()
                .update(
                    ServiceRequestId(id),
                    &ServiceRequestUpdate {
                        status,
                        priority,
                        developer_id: developer_id.map(DeveloperId),
                        notes,
                    },
                )
                .await?;
            println!(
                "request #{} is {} ({})",
                updated.id,
                updated.status.as_str(),
                updated.priority.as_str()
            );
        }
        Command::RequestStats => {
            let stats = client.service_requests().stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Technologies => {
            for tech in client.public().list_technologies().await? {
                println!(
                    "{:>5}  {:<24} {}",
                    tech.id,
                    tech.name,
                    tech.category.as_deref().unwrap_or("")
                );
            }
        }
        Command::Projects {
            category,
            project_type,
            featured,
            limit,
        } => {
            let projects = client
                .public()
                .list_projects(&ProjectFilter {
                    category,
                    project_type,
                    featured,
                    limit,
                })
                .await?;
            for project in projects {
                println!(
                    "{:>5}  {:<32} {}",
                    project.id,
                    project.title,
                    project.category.unwrap_or_default()
                );
            }
        }
        Command::Developer { slug } => {
            let public = client.public();
            let developer = public.developer_by_slug(&slug).await?;
            println!(
                "{} ({} years, {})",
                developer.name,
                developer.years_experience,
                developer.specialization.as_deref().unwrap_or("generalist")
            );
            let DeveloperId(id) = developer.id;
            for project in public.developer_projects(developer.id).await? {
                println!("  #{} {}", project.id, project.title);
            }
            info!(developer_id = id, "profile printed");
        }
        Command::Stats => {
            let stats = client.public().stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

async fn reorder<T: OrderedRecord>(engine: &ReorderEngine<T>, from: usize, to: usize) -> Result<()> {
    engine.load().await?;
    match engine.move_item(from, to).await? {
        ReorderOutcome::NoOp => println!("nothing to move"),
        ReorderOutcome::Persisted { updated, confirmed } => {
            println!("saved {updated} priorities{}", if confirmed { " (confirmed)" } else { "" });
        }
        ReorderOutcome::Reconciled { failure, refetched } => {
            if !refetched {
                eprintln!("list could not be reloaded; showing the previous order");
            }
            return Err(failure).context("reorder was not saved");
        }
    }
    Ok(())
}

fn finish<R>(outcome: SubmitOutcome<R>) -> Result<R> {
    match outcome {
        SubmitOutcome::Succeeded(receipt) => Ok(receipt),
        SubmitOutcome::Rejected(reason) => bail!("submission rejected: {reason:?}"),
        SubmitOutcome::Failed(err) => {
            for field in err.field_errors() {
                eprintln!("  {}: {}", field.field, field.message);
            }
            bail!("{}", err.user_message())
        }
    }
}

async fn read_photo(path: &Path) -> Result<PhotoFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Config(format!("not a file path: {}", path.display())))?;
    Ok(PhotoFile {
        mime_type: guess_mime(path),
        filename,
        bytes,
    })
}

fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

fn print_developers(rows: &[Developer]) {
    for dev in rows {
        let state = if dev.is_active { "" } else { " (inactive)" };
        println!("{:>4}  {:>5}  {}{}", dev.priority, dev.id, dev.name, state);
    }
}
