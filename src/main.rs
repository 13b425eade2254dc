use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use std::fs;
use std::path::PathBuf;

use healthgate::request::{
    format_bmi, Alcohol, Diet, Exercise, Gender, HealthForm, PredictionRequest, Smoker,
};
use healthgate::PredictClient;

#[derive(Parser)]
#[command(
    name = "healthgate",
    about = "Prediction gateway for chronic-disease risk assessment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP prediction gateway
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: String,

        /// Prediction backend base URL (overrides API_URL / NEXT_PUBLIC_API_URL)
        #[arg(long)]
        backend: Option<String>,

        /// Path for JSONL access log
        #[arg(long, default_value = "healthgate-access.jsonl")]
        access_log: String,
    },

    /// Request a prediction from a running gateway
    Predict {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        gateway: String,

        /// JSON request file; replaces the attribute flags below
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        age: u32,
        #[arg(long, value_enum, default_value = "other")]
        gender: Gender,
        /// Height in centimetres
        #[arg(long, default_value_t = 0.0)]
        height: f64,
        /// Weight in kilograms
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long, value_enum, default_value = "no")]
        smoker: Smoker,
        #[arg(long, value_enum, default_value = "none")]
        alcohol: Alcohol,
        #[arg(long, value_enum, default_value = "none")]
        exercise: Exercise,
        #[arg(long, value_enum, default_value = "good")]
        diet: Diet,
        #[arg(long, default_value_t = 7.0)]
        sleep_hours: f64,
        #[arg(long, default_value_t = 5)]
        stress_level: u8,

        /// Output format: json or summary
        #[arg(long, default_value = "summary")]
        format: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_serve(bind: String, backend: Option<String>, access_log: String) -> Result<()> {
    use healthgate::server::{run_server, ServerConfig};

    let bind_addr = bind
        .parse()
        .wrap_err_with(|| format!("Invalid bind address: {}", bind))?;

    let env_config = ServerConfig::from_env();
    let config = ServerConfig {
        bind_addr,
        backend_url: backend.or(env_config.backend_url),
        access_log_path: access_log,
        ..env_config
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_server(config))?;

    Ok(())
}

fn cmd_predict(gateway: String, input: Option<PathBuf>, form: HealthForm, format: String) -> Result<()> {
    let request: PredictionRequest = match input {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .wrap_err_with(|| format!("Invalid request JSON in {}", path.display()))?
        }
        None => PredictionRequest::from_form(&form),
    };
    request.validate()?;

    let client = PredictClient::with_base_url(&gateway);
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(client.predict(&request))?;

    match format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "request": request,
                "result": result,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Health Risk Assessment");
            println!("======================");
            println!("BMI:            {}", format_bmi(request.height(), request.weight()));
            println!();
            println!(
                "Chronic risk:   {}",
                if result.at_risk { "At Risk" } else { "Healthy" }
            );
            println!("Risk level:     {}", result.risk_level);
            println!("Confidence:     {:.2}%", result.confidence);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            bind,
            backend,
            access_log,
        } => cmd_serve(bind, backend, access_log),
        Commands::Predict {
            gateway,
            input,
            age,
            gender,
            height,
            weight,
            smoker,
            alcohol,
            exercise,
            diet,
            sleep_hours,
            stress_level,
            format,
        } => {
            let form = HealthForm {
                age,
                gender,
                height_cm: height,
                weight_kg: weight,
                smoker,
                alcohol,
                exercise,
                diet,
                sleep_hours,
                stress_level,
            };
            cmd_predict(gateway, input, form, format)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
