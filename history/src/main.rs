use clap::{Arg, Command};
use std::process;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

#[tokio::main]
async fn main() {
    let matches = Command::new("Availability History")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stores probe runs and serves their history")
        .subcommand(
            Command::new("ingest")
                .about("Load a finished run into the history store")
                .arg(config_arg())
                .arg(
                    Arg::new("data-dir")
                        .short('d')
                        .long("data-dir")
                        .value_name("DIR")
                        .help("Directory holding test_info.json and the availability CSV"),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the history API")
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("ingest", ingest_matches)) => {
            let config_path = ingest_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/history.toml");
            let data_dir = ingest_matches.get_one::<String>("data-dir").map(|s| s.as_str());
            println!("Ingesting run with config: {}", config_path);

            match history::run_ingest(config_path, data_dir).await {
                Ok(run_id) => println!("Stored run {}", run_id),
                Err(e) => {
                    eprintln!("Ingest error: {}", e);
                    process::exit(1);
                }
            }
        }

        Some(("serve", serve_matches)) => {
            let config_path = serve_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/history.toml");
            println!("Starting history API with config: {}", config_path);

            if let Err(e) = history::run_history_api(config_path).await {
                eprintln!("History API error: {}", e);
                process::exit(1);
            }
        }

        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
