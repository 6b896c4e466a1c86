use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nutai_app::{logging, AppConfig, AppError, FoodDiary, NutritionService, ReqwestTransport};
use nutai_core::{ImageUpload, LoginRequest, MealAnalysisRequest, MealTime, RegisterRequest};
use tracing::debug;

#[derive(Parser)]
#[command(name = "nutai", version, about = "Command-line client for the nutrition API")]
struct Cli {
    /// Overrides NUTAI_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account.
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and store the token.
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List food logs for a day with totals.
    Logs {
        /// YYYY-MM-DD; today when omitted.
        #[arg(long)]
        date: Option<String>,
        /// Maximum entries to fetch; the server default (50) when omitted.
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Analyze a meal description, optionally saving it to today's log.
    Analyze {
        text: String,
        #[arg(long)]
        image_url: Option<String>,
        /// breakfast, lunch, dinner or snack.
        #[arg(long)]
        save: Option<MealTime>,
    },
    /// Upload a meal photo.
    Upload { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?.with_default_token_file();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    debug!(api_url = %config.api_url, token_file = ?config.token_file, "configured");
    let service = NutritionService::new(config.client()?, ReqwestTransport::new(config.timeout)?);

    match cli.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let user = service
                .register(&RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("registered {} (id {})", user.username, user.id);
        }
        Command::Login { username, password } => {
            service.login(&LoginRequest { username, password }).await?;
            println!("logged in");
        }
        Command::Logout => {
            service.logout()?;
            println!("logged out");
        }
        Command::Whoami => {
            let user = service.current_user().await?;
            println!("{} <{}>", user.username, user.email);
        }
        Command::Logs { date, limit } => {
            let user = service.current_user().await?;
            let date = date.unwrap_or_else(today);
            let mut diary = FoodDiary::new(&user.username, &date);
            if let Some(limit) = limit {
                diary = diary.with_limit(limit);
            }
            diary.refresh(&service).await?;
            diary.entries().iter().for_each(print_entry);
            let summary = diary.summary();
            println!(
                "{date}: {} entries, {:.0} kcal (protein {:.1} g, carbs {:.1} g, fat {:.1} g)",
                summary.entry_count(),
                summary.total_calories,
                summary.protein_g,
                summary.carbs_g,
                summary.fat_g
            );
        }
        Command::Analyze {
            text,
            image_url,
            save,
        } => {
            let analysis = service
                .analyze_meal(&MealAnalysisRequest {
                    image_url,
                    user_input: text,
                    corrections: None,
                })
                .await?;
            println!("{} ({} kcal)", analysis.meal_name, analysis.total_calories);
            for food in &analysis.foods {
                println!("  {:<24} {:>5} kcal", food.name, food.calories);
            }
            if let Some(meal_time) = save {
                let user = service.current_user().await?;
                let log = analysis.to_food_log(&user.username, &today(), meal_time);
                let saved = service.save_food_log(&log).await?;
                println!("saved as {}", saved.log_id);
                for achievement in saved.achievements {
                    println!("achievement unlocked: {} (+{})", achievement.name, achievement.points);
                }
            }
        }
        Command::Upload { path } => {
            let bytes = std::fs::read(&path).map_err(|source| AppError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| AppError::Usage(format!("{} has no file name", path.display())))?
                .to_string();
            let upload = ImageUpload::meal_photo(filename, image_content_type(&path), bytes);
            let uploaded = service.upload_user_image(&upload).await?;
            println!("{}", uploaded.url);
        }
    }
    Ok(())
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn print_entry(entry: &nutai_core::FoodLogEntry) {
    let names: Vec<&str> = entry.foods.iter().map(|f| f.name.as_str()).collect();
    println!(
        "{:<10} {:>6.0} kcal  {}",
        entry.meal_time.as_str(),
        entry.total_calories,
        names.join(", ")
    );
}

fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
