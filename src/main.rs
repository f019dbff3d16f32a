use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use genolab_client::controllers::{AnalysisSession, SessionState, StrainAnalysesView};
use genolab_client::models::{
    NewOrganism, NewStrain, OrganismUpdate, TaskHandle, UploadFile, UploadRequest,
};
use genolab_client::render::{render, svg, RenderedView};
use genolab_client::services::{ApiClient, CepariumService};
use genolab_client::{Config, GenolabError};

/// Command-line client for the GenoLab platform
#[derive(Parser, Debug)]
#[command(name = "genolab")]
#[command(version)]
#[command(about = "Upload sequence files to GenoLab, follow their analyses and show the results")]
struct Cli {
    /// Configuration file, without extension
    #[arg(long, global = true, default_value = "config/default")]
    config: String,

    /// Backend base URL, overrides the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file and follow its analysis until it finishes
    Upload {
        file: PathBuf,

        /// Strain the file belongs to
        #[arg(long)]
        strain: i64,

        /// Analysis to run (fasta_count, fasta_gc_content, fastq_stats, genbank_stats, gff_stats, raw)
        #[arg(long = "type", default_value = "fasta_count")]
        analysis_type: String,

        /// Write the result chart as SVG
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Show the current status of a task once
    Status {
        task_id: String,

        /// Analysis type, used to render a finished result
        #[arg(long = "type", default_value = "")]
        analysis_type: String,
    },

    /// List the analyses stored for a strain
    Analyses { strain_id: i64 },

    /// Download the results of an analysis, or its original file
    Download {
        analysis_id: i64,

        #[arg(long)]
        original: bool,

        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Organism catalogue
    Organisms {
        #[command(subcommand)]
        action: Option<OrganismCommand>,
    },

    /// Strain catalogue
    Strains {
        #[command(subcommand)]
        action: Option<StrainCommand>,
    },
}

#[derive(Subcommand, Debug)]
enum OrganismCommand {
    List,
    /// Show one organism with its strains
    Show { id: i64 },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        genus: String,
        #[arg(long)]
        species: String,
    },
    /// Change some fields of an organism
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        genus: Option<String>,
        #[arg(long)]
        species: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum StrainCommand {
    List {
        /// Only strains of this organism
        #[arg(long)]
        organism: Option<i64>,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        organism: i64,
        #[arg(long)]
        source: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "genolab=info,genolab_client=info",
        1 => "genolab=debug,genolab_client=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Library errors carry a ready-made text for people; use it as the process error.
fn user_facing(err: impl Into<GenolabError>) -> anyhow::Error {
    anyhow!(err.into().user_message())
}

fn print_state(state: &SessionState) {
    match state {
        SessionState::Uploading => println!("Subiendo archivo..."),
        SessionState::Polling { task, snapshot: None } => println!("Tarea {} en cola", task),
        SessionState::Polling {
            snapshot: Some(status),
            ..
        } => match status.progress {
            Some(progress) => println!("[{}] {} ({:.0}%)", status.state, status.status, progress),
            None => println!("[{}] {}", status.state, status.status),
        },
        _ => {}
    }
}

async fn export_chart(view: &RenderedView, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    match view.as_chart() {
        Some(chart) => svg::write_chart(chart, &path).await.map_err(user_facing),
        None => {
            tracing::warn!("This result has no chart, {} was not written", path.display());
            Ok(())
        }
    }
}

async fn run_upload(
    client: ApiClient,
    config: &Config,
    file: PathBuf,
    strain: i64,
    analysis_type: String,
    chart: Option<PathBuf>,
) -> Result<()> {
    let file = UploadFile::from_path(&file)
        .await
        .with_context(|| format!("No se pudo leer {}", file.display()))?;
    let request = UploadRequest::new(file, strain, analysis_type);

    let mut session = AnalysisSession::new(client, config).on_change(print_state);
    session.upload(&request).await;

    match session.wait().await {
        SessionState::Stored {
            file_url,
            analysis_id,
            message,
        } => {
            println!("{}", message.as_deref().unwrap_or("Archivo almacenado"));
            println!("URL: {}", file_url.as_deref().unwrap_or("n/a"));
            if let Some(id) = analysis_id {
                println!("Análisis: {}", id);
            }
            Ok(())
        }
        SessionState::Completed { view, .. } => {
            println!("{}", view);
            export_chart(&view, chart).await
        }
        SessionState::Failed { task, message } => bail!("La tarea {} falló: {}", task, message),
        SessionState::Error(message) => bail!(message),
        other => bail!("La sesión terminó en un estado inesperado: {:?}", other),
    }
}

async fn run_status(client: ApiClient, task_id: String, analysis_type: String) -> Result<()> {
    let status = client
        .task_status(&TaskHandle::new(task_id))
        .await
        .map_err(user_facing)?;

    println!("[{}] {}", status.state, status.status);
    if let Some(progress) = status.progress {
        println!("Progreso: {:.0}%", progress);
    }
    if let Some(result) = status.result() {
        println!("{}", render(&analysis_type, result));
    }
    if let Some(error) = status.error() {
        println!("Error: {}", error);
    }
    Ok(())
}

async fn run_analyses(client: ApiClient, strain_id: i64) -> Result<()> {
    let view = StrainAnalysesView::new(client);
    let strain = view.strain(strain_id).await.map_err(user_facing)?;
    println!("Cepa {} ({})", strain.strain_name, strain.id);

    let entries = view.load(strain_id).await.map_err(user_facing)?;
    if entries.is_empty() {
        println!("No hay análisis para esta cepa.");
    }
    for entry in entries {
        println!(
            "\n#{} {} {}",
            entry.record.id,
            entry.record.analysis_type,
            entry.record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        print!("{}", entry.view);
    }
    Ok(())
}

async fn run_organisms(service: CepariumService, action: Option<OrganismCommand>) -> Result<()> {
    match action.unwrap_or(OrganismCommand::List) {
        OrganismCommand::List => {
            for organism in service.list_organisms().await.map_err(user_facing)? {
                println!(
                    "{:>4}  {}  ({} {})",
                    organism.id, organism.name, organism.genus, organism.species
                );
            }
        }
        OrganismCommand::Create {
            name,
            genus,
            species,
        } => {
            let organism = service
                .create_organism(&NewOrganism {
                    name,
                    genus,
                    species,
                })
                .await
                .map_err(user_facing)?;
            println!("Organismo {} creado ({})", organism.id, organism.name);
        }
        OrganismCommand::Show { id } => {
            let organism = service.get_organism(id).await.map_err(user_facing)?;
            println!(
                "{}  {} ({} {})",
                organism.id, organism.name, organism.genus, organism.species
            );
            if organism.strains.is_empty() {
                println!("Sin cepas registradas.");
            }
            for strain in organism.strains {
                println!("{:>4}  {}", strain.id, strain.strain_name);
            }
        }
        OrganismCommand::Update {
            id,
            name,
            genus,
            species,
        } => {
            let changes = OrganismUpdate {
                name,
                genus,
                species,
            };
            if changes.is_empty() {
                bail!("Nada que actualizar, indica --name, --genus o --species");
            }
            let organism = service
                .update_organism(id, &changes)
                .await
                .map_err(user_facing)?;
            println!("Organismo {} actualizado ({})", organism.id, organism.name);
        }
        OrganismCommand::Delete { id } => {
            let organism = service.delete_organism(id).await.map_err(user_facing)?;
            println!("Organismo {} eliminado ({})", organism.id, organism.name);
        }
    }
    Ok(())
}

async fn run_strains(service: CepariumService, action: Option<StrainCommand>) -> Result<()> {
    match action.unwrap_or(StrainCommand::List { organism: None }) {
        StrainCommand::List { organism } => {
            let strains = match organism {
                Some(id) => service.strains_of(id).await,
                None => service.list_strains().await,
            }
            .map_err(user_facing)?;
            for strain in strains {
                let organism = strain
                    .organism
                    .as_ref()
                    .map(|o| o.name.as_str())
                    .unwrap_or("n/a");
                println!("{:>4}  {}  [{}]", strain.id, strain.strain_name, organism);
            }
        }
        StrainCommand::Create {
            name,
            organism,
            source,
        } => {
            let strain = service
                .create_strain(&NewStrain {
                    strain_name: name,
                    source,
                    organism_id: organism,
                })
                .await
                .map_err(user_facing)?;
            println!("Cepa {} creada ({})", strain.id, strain.strain_name);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load_from(&cli.config).context("No se pudo cargar la configuración")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    tracing::debug!("Using backend at {}", config.api.base_url);

    let client = ApiClient::new(&config.api).map_err(user_facing)?;

    match cli.command {
        Commands::Upload {
            file,
            strain,
            analysis_type,
            chart,
            interval_ms,
        } => {
            if let Some(interval_ms) = interval_ms {
                config.polling.interval_ms = interval_ms;
            }
            run_upload(client, &config, file, strain, analysis_type, chart).await
        }
        Commands::Status {
            task_id,
            analysis_type,
        } => run_status(client, task_id, analysis_type).await,
        Commands::Analyses { strain_id } => run_analyses(client, strain_id).await,
        Commands::Download {
            analysis_id,
            original,
            dir,
        } => {
            let view = StrainAnalysesView::new(client);
            let path = if original {
                view.download_original(analysis_id, &dir).await
            } else {
                view.download_results(analysis_id, &dir).await
            }
            .map_err(user_facing)?;
            println!("Guardado en {}", path.display());
            Ok(())
        }
        Commands::Organisms { action } => run_organisms(CepariumService::new(client), action).await,
        Commands::Strains { action } => run_strains(CepariumService::new(client), action).await,
    }
}
