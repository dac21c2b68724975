use clap::{Args, Parser, Subcommand};
use healthmorph::auth::{login, DemoVerifier, LoginRequest, LoginType, SessionStore};
use healthmorph::results::render_report;
use healthmorph::{
    AnalysisInputs, AnalysisResult, AttachmentPaths, ExportFormat, HealthMorphClient, Result,
    ResultsView, SensorReadings, ServiceConfig,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "healthmorph", version, about = "Multimodal health-risk analysis client")]
struct Cli {
    /// Analysis service base URL (overrides HEALTHMORPH_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Directory for exported files (overrides HEALTHMORPH_EXPORT_DIR)
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    /// Per-request timeout in seconds (overrides HEALTHMORPH_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Demo login; any non-blank credentials are accepted
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Log in as a doctor (admin role)
        #[arg(long)]
        doctor: bool,
    },
    /// Forget the stored login
    Logout,
    /// Show the stored login
    Whoami,
    /// Submit inputs for analysis and show the results
    Analyze(AnalyzeArgs),
    /// Show a previously saved result
    Results {
        /// Result saved with `analyze --save`
        #[arg(long)]
        from: Option<PathBuf>,
        #[command(flatten)]
        actions: ResultActions,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Face image (JPG, PNG, HEIC)
    #[arg(long)]
    image: Option<PathBuf>,
    /// Symptom description
    #[arg(long, default_value = "")]
    symptoms: String,
    /// Medical history, medications, allergies
    #[arg(long, default_value = "")]
    questionnaire: String,
    /// Voice clip (WAV)
    #[arg(long)]
    voice: Option<PathBuf>,
    /// Video clip (MP4)
    #[arg(long)]
    video: Option<PathBuf>,
    #[arg(long, default_value = "")]
    heart_rate: String,
    #[arg(long, default_value = "")]
    systolic_bp: String,
    #[arg(long, default_value = "")]
    diastolic_bp: String,
    #[arg(long, default_value = "")]
    temperature: String,
    #[arg(long, default_value = "")]
    spo2: String,
    /// Write the returned result to this file
    #[arg(long)]
    save: Option<PathBuf>,
    #[command(flatten)]
    actions: ResultActions,
}

#[derive(Args)]
struct ResultActions {
    /// Run SHAP, LIME and counterfactual explainability
    #[arg(long)]
    explain: bool,
    /// Export formats: csv, json, fhir
    #[arg(long, value_delimiter = ',')]
    export: Vec<ExportFormat>,
}

async fn analyze(client: &HealthMorphClient, args: AnalyzeArgs) -> Result<()> {
    let paths = AttachmentPaths {
        image: args.image,
        voice: args.voice,
        video: args.video,
    };
    let sensors = SensorReadings {
        heart_rate: args.heart_rate,
        systolic_bp: args.systolic_bp,
        diastolic_bp: args.diastolic_bp,
        temperature: args.temperature,
        spo2: args.spo2,
    };
    let inputs =
        AnalysisInputs::from_files(&paths, args.symptoms, args.questionnaire, sensors).await?;

    eprintln!("Analyzing...");
    let view = client.analyze(&inputs).await?;

    if let (Some(path), Some(session)) = (args.save.as_deref(), view.session()) {
        std::fs::write(path, serde_json::to_vec_pretty(session.result())?)?;
        eprintln!("Result saved to {}", path.display());
    }

    show_results(client, view, &args.actions).await
}

fn open_saved(path: Option<&Path>) -> Result<ResultsView> {
    let handoff = match path {
        Some(path) if path.exists() => {
            let bytes = std::fs::read(path)?;
            Some(serde_json::from_slice::<AnalysisResult>(&bytes)?)
        }
        _ => None,
    };
    Ok(ResultsView::open(handoff))
}

async fn show_results(
    client: &HealthMorphClient,
    mut view: ResultsView,
    actions: &ResultActions,
) -> Result<()> {
    if let Some(hint) = view.recovery_hint() {
        println!("{}", hint);
        println!("Start one with: healthmorph analyze --image <face.jpg> --symptoms \"...\"");
        return Ok(());
    }
    let session = view.session_mut()?;

    if actions.explain {
        eprintln!("Generating explainability...");
        // Partial results stay in the session and are shown in the report
        if let Err(e) = client.results().explain(session).await {
            tracing::warn!(error = %e, "Explainability incomplete");
        }
    }

    println!("{}", render_report(session, client.config()));

    let mut failed = false;
    for format in &actions.export {
        match client.results().export(session, *format).await {
            Ok(artifact) => {
                let path = artifact.save(&client.config().export_dir)?;
                println!("Exported {}", path.display());
            }
            Err(e) => {
                eprintln!("Export failed: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        return Err(healthmorph::ClientError::Export(
            "One or more exports failed".to_string(),
        ));
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(base) = cli.api_base.as_deref() {
        config = config.with_api_base(base)?;
    }
    if let Some(dir) = cli.export_dir.clone() {
        config = config.with_export_dir(dir);
    }
    if let Some(secs) = cli.timeout.filter(|s| *s > 0) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let store = SessionStore::new(config.session_dir.clone());

    match cli.command {
        Command::Login {
            email,
            password,
            doctor,
        } => {
            let request = LoginRequest {
                email,
                password,
                login_type: if doctor { LoginType::Doctor } else { LoginType::User },
            };
            let session = login(&DemoVerifier, &store, &request).await?;
            println!("Logged in as {}", session.user_type.as_str());
        }
        Command::Logout => {
            store.clear()?;
            println!("Logged out");
        }
        Command::Whoami => match store.load()? {
            Some(session) => println!("{} ({})", session.user_type.as_str(), session.auth_token),
            None => println!("Not logged in"),
        },
        Command::Analyze(args) => {
            let client = HealthMorphClient::new(config)?;
            analyze(&client, args).await?;
        }
        Command::Results { from, actions } => {
            let client = HealthMorphClient::new(config)?;
            let view = open_saved(from.as_deref())?;
            show_results(&client, view, &actions).await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    healthmorph::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
