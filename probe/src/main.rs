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
    let matches = Command::new("Dataset Availability Prober")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Checks which catalog datasets can actually be queried")
        .subcommand(
            Command::new("run")
                .about("Probe every dataset and write the availability report")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("metadata-check")
                .about("Only fetch each dataset's metadata")
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let config_path = run_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/probe.toml");
            println!("Starting availability run with config: {}", config_path);

            match probe::run_availability_check(config_path).await {
                Ok(report) => println!(
                    "Probed {} datasets, {} available",
                    report.rows().len(),
                    report.available_count()
                ),
                Err(e) => {
                    eprintln!("Availability run error: {}", e);
                    process::exit(1);
                }
            }
        }

        Some(("metadata-check", check_matches)) => {
            let config_path = check_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/probe.toml");
            println!("Starting metadata check with config: {}", config_path);

            match probe::run_metadata_check(config_path).await {
                Ok(count) => println!("Checked metadata of {} datasets", count),
                Err(e) => {
                    eprintln!("Metadata check error: {}", e);
                    process::exit(1);
                }
            }
        }

        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
