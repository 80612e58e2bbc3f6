use clap::{Parser, Subcommand};
use kaiscraper::{setting_items, AniKai, Result, Settings};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Browse AnimeKai and resolve episodes into playable streams
#[derive(Parser)]
#[command(name = "kaiscraper")]
#[command(about = "AnimeKai catalog and stream resolver", long_about = None)]
struct Cli {
    /// Preferred server slot (0 = auto, 1, 2)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Preferred language type (0 = auto, 1 = sub, 2 = softsub, 3 = dub)
    #[arg(long = "type", global = true)]
    language: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Home page shelves
    Home,
    /// Details page of one anime, e.g. /watch/frieren-abc
    Details { url: String },
    /// Episode list for an anime id
    Episodes { anime_id: String },
    /// Delivery servers for an episode token, after preference filtering
    Servers { token: String },
    /// Resolve an episode token into a playable source
    Resolve {
        token: String,
        /// Fall through to the next server when one fails
        #[arg(long)]
        any: bool,
    },
    /// Print the available settings
    Settings,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "could not serialize output"),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Settings = cli.command {
        return print_json(&setting_items());
    }

    let mut settings = Settings::from_env()?;
    if let Some(server) = &cli.server {
        settings.set("preferred_server", server)?;
    }
    if let Some(language) = &cli.language {
        settings.set("preferred_type", language)?;
    }
    let preference = settings.preference();

    let kai = AniKai::with_settings(settings).await?.anime_kai;

    match cli.command {
        Commands::Search { query, page } => print_json(&kai.search_feed(&query, page).await),
        Commands::Home => print_json(&kai.home_feed().await),
        Commands::Details { url } => {
            let details = kai.anime_details(&url).await;
            let related = kai.related_feed(&url).await;
            print_json(&serde_json::json!({ "details": details, "related": related }))
        }
        Commands::Episodes { anime_id } => print_json(&kai.episodes(&anime_id).await),
        Commands::Servers { token } => {
            print_json(&kai.list_delivery_servers(&token, &preference).await?)
        }
        Commands::Resolve { token, any } => {
            let source = if any {
                kai.resolve_any(&token, &preference).await?
            } else {
                kai.resolve_episode(&token, &preference).await?
            };
            print_json(&source)
        }
        Commands::Settings => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, terminal = e.is_terminal(), "kaiscraper failed");
        std::process::exit(1);
    }
}
