// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Podlink CLI - mirror posts to a diaspora* pod from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Publish to everyone
//! podlink post "Hello fediverse"
//!
//! # Publish to two aspects and relay to a connected service
//! podlink post "Family news" -a 1 -a 2 -s twitter
//!
//! # Delete a post
//! podlink delete post 42
//!
//! # List aspects / connected services
//! podlink aspects
//! podlink services --refresh
//!
//! # Verify the profile can log in
//! podlink check
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Map};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podlink_client::PodClient;

use config::Profile;

// ============================================================================
// CLI Definition
// ============================================================================

/// Podlink CLI - post to a diaspora* pod.
#[derive(Parser)]
#[command(name = "podlink")]
#[command(about = "Mirror posts to a diaspora* pod")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML profile (defaults to ~/.config/podlink/config.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pod domain, overriding the profile.
    #[arg(long, global = true)]
    pub pod: Option<String>,

    /// Username, overriding the profile.
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Publish a status message.
    Post {
        /// Already-rendered message text.
        text: String,

        /// Aspect ids to share with (defaults to public).
        #[arg(long = "aspect", short = 'a')]
        aspects: Vec<String>,

        /// Connected services to relay the post to.
        #[arg(long = "service", short = 's')]
        services: Vec<String>,
    },

    /// Delete a post or comment.
    Delete {
        /// What to delete: "post" or "comment".
        kind: String,
        /// Server-assigned id.
        id: String,
    },

    /// List the aspects the account can share with.
    Aspects {
        /// Bypass the cached list.
        #[arg(long)]
        refresh: bool,
    },

    /// List the services connected to the account.
    Services {
        /// Bypass the cached list.
        #[arg(long)]
        refresh: bool,
    },

    /// Verify the profile can log in.
    Check,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut profile = Profile::load(cli.config.as_deref())?;
    if let Some(pod) = cli.pod {
        profile.pod = pod;
    }
    if let Some(user) = cli.user {
        profile.username = user;
    }

    let mut client = connect(&profile).await?;

    match cli.command {
        Commands::Post {
            text,
            aspects,
            services,
        } => {
            let mut extra = Map::new();
            if !services.is_empty() {
                extra.insert("services".to_string(), json!(services));
            }
            let aspect_refs: Vec<&str> = aspects.iter().map(String::as_str).collect();
            let post = client.post(&text, &aspect_refs, extra).await?;
            println!("published: {}", post.permalink);
        }
        Commands::Delete { kind, id } => {
            client.delete(&kind, &id).await?;
            println!("deleted {kind} {id}");
        }
        Commands::Aspects { refresh } => {
            let aspects = client.aspects(refresh).await?;
            for (id, name) in &aspects {
                println!("{id}\t{name}");
            }
        }
        Commands::Services { refresh } => {
            let services = client.services(refresh).await?;
            if services.is_empty() {
                println!("no connected services");
            }
            for (id, name) in &services {
                println!("{id}\t{name}");
            }
        }
        Commands::Check => {
            println!(
                "logged in to {} as {}",
                client.pod_url(""),
                profile.username
            );
        }
    }

    Ok(())
}

/// Initializes and logs in a client from the profile.
async fn connect(profile: &Profile) -> Result<PodClient> {
    debug!(pod = %profile.pod, "Connecting");
    let mut client = PodClient::with_options(&profile.pod, profile.secure, profile.client_options())?;
    client.init().await?;
    client
        .login(&profile.username, &profile.password()?, false)
        .await?;
    Ok(client)
}

/// Installs the stderr tracing subscriber.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("podlink=debug,info")
    } else {
        EnvFilter::new("podlink=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
