use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{debug, info};
use sliver_core::{
    BlockAware, PathTemplateView, Renderer, SliverConfig, TemplateContext, TemplateNames,
    TemplateSet,
};
use sliver_web::SliverServer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template, or a single block of it
    Render {
        /// Template directory (defaults to SLIVER_TEMPLATE_DIR or ./templates)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Template name; repeat to give fallback candidates
        #[arg(short, long, required = true)]
        template: Vec<String>,

        /// Render only this block
        #[arg(short, long)]
        block: Option<String>,

        /// Context file (.json, .yaml or .yml)
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Output file path (optional, prints to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the blocks of a resolved template
    Blocks {
        /// Template directory (defaults to SLIVER_TEMPLATE_DIR or ./templates)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Template name
        #[arg(short, long)]
        template: String,
    },

    /// Serve a template directory, mapping URL paths to templates
    Serve {
        /// Template directory (defaults to SLIVER_TEMPLATE_DIR or ./templates)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Port to listen on (defaults to SLIVER_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory served under /static
        #[arg(long = "static")]
        static_dir: Option<PathBuf>,

        /// Context file shared by every page
        #[arg(short, long)]
        context: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let config = SliverConfig::from_env();
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Render { dir, template, block, context, output } => {
            let renderer = load_renderer(&config, dir.as_deref()).await?;
            let data = match context {
                Some(path) => load_context(&path).await?,
                None => TemplateContext::new(),
            };

            let names = TemplateNames::from(template);
            let result = renderer
                .render(&names, block.as_deref(), &data)
                .context("Rendering failed")?;

            if let Some(out_path) = output {
                tokio::fs::write(&out_path, &result)
                    .await
                    .context("Failed to write output file")?;
                info!("Success! Output written to {:?}", out_path);
            } else {
                println!("{}", result);
            }
        }
        Commands::Blocks { dir, template } => {
            let renderer = load_renderer(&config, dir.as_deref()).await?;
            let resolved = renderer
                .resolve_template(&TemplateNames::from(template))
                .context("Failed to resolve template")?;
            for name in resolved.block_names() {
                println!("{}", name);
            }
        }
        Commands::Serve { dir, port, static_dir, context } => {
            let renderer = Arc::new(load_renderer(&config, dir.as_deref()).await?);
            let mut view = PathTemplateView::new();
            if let Some(path) = context {
                view = view.with_context(load_context(&path).await?);
            }

            let mut server = SliverServer::new(renderer).fallback_view(BlockAware(view));
            if let Some(static_dir) = static_dir {
                server = server.with_static_dir(static_dir);
            }

            let port = port.unwrap_or(config.port);
            info!("Serving templates on port {}", port);
            server.start(port).await.context("Server failed")?;
        }
    }

    Ok(())
}

async fn load_renderer(config: &SliverConfig, dir: Option<&Path>) -> Result<Renderer> {
    let dir = dir.unwrap_or(&config.template_dir);
    info!("Loading templates from {:?}", dir);

    let set = TemplateSet::from_dir(dir)
        .await
        .with_context(|| format!("Failed to load templates from {:?}", dir))?;
    debug!("Templates: {:?}", set.names());

    Ok(Renderer::from_config(set, config))
}

async fn load_context(path: &Path) -> Result<TemplateContext> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read context file {:?}", path))?;
    parse_context(path, &raw)
}

fn parse_context(path: &Path, raw: &str) -> Result<TemplateContext> {
    let value: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(raw).context("Invalid JSON context")?,
        Some("yaml") | Some("yml") => serde_yaml_ng::from_str(raw).context("Invalid YAML context")?,
        _ => bail!("Unsupported context file {:?}; use .json, .yaml or .yml", path),
    };
    Ok(TemplateContext::from_value(value)?)
}
