/// Preview — resolve a stored heroic request and print the breakdown.
///
/// Usage: heroic_preview --request <path> [--config <path>] [--seed <n>]
///                       [--available <n>] [--ron]
///
/// Set RUST_LOG=heroic_dice=debug to follow allocation decisions.

use async_trait::async_trait;
use heroic_dice::core::pipeline::{HeroicCounter, HeroicEngine};
use heroic_dice::core::random::{DiceAnimator, DiceServiceError};
use heroic_dice::schema::request::HeroicRequest;
use std::path::Path;

/// Echoes every batch of rolled values to stdout.
struct PrintAnimator;

#[async_trait]
impl DiceAnimator for PrintAnimator {
    async fn show(&mut self, values: &[u32]) -> Result<(), DiceServiceError> {
        println!("rolled {:?}", values);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut request_path = None;
    let mut config_path = None;
    let mut seed: u64 = 42;
    let mut available = None;
    let mut as_ron = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--request" if i + 1 < args.len() => {
                i += 1;
                request_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--available" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse() {
                    Ok(n) => available = Some(n),
                    Err(_) => {
                        eprintln!("Invalid count: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--ron" => as_ron = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(request_path) = request_path else {
        eprintln!("Missing --request");
        print_usage();
        std::process::exit(1);
    };
    let request = load_request(Path::new(&request_path));

    let mut builder = HeroicEngine::builder()
        .seed(seed)
        .with_animator(PrintAnimator);
    if let Some(ref path) = config_path {
        builder = builder.config_path(path);
    }
    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let mut counter = HeroicCounter::new(available.unwrap_or(request.quantity));
    if request.quantity > counter.available() {
        eprintln!(
            "Requested {} heroic dice but only {} available",
            request.quantity,
            counter.available()
        );
        std::process::exit(1);
    }

    println!("Roll: {}", request.roll);
    println!("Seed: {}", seed);

    let resolution = match engine.resolve(&request, &mut counter).await {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let summary = resolution.summary();
    if as_ron {
        match ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::default()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("\n{}", summary);
    }
    println!("\nHeroic dice left: {}", counter.available());
}

fn load_request(path: &Path) -> HeroicRequest {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match ron::from_str(&contents) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Failed to parse {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: heroic_preview --request <path> [options]");
    println!();
    println!("Options:");
    println!("  --request <path>   RON file holding a heroic request");
    println!("  --config <path>    RON engine config (defaults otherwise)");
    println!("  --seed <n>         Seed for the dice roller (default: 42)");
    println!("  --available <n>    Heroic dice on hand (default: the request quantity)");
    println!("  --ron              Print the summary as RON");
}
