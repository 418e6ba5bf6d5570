use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notchlife::app_logic;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Configuration file (YAML or TOML)")
        .required(true)
}

fn cli() -> Command {
    Command::new("notchlife")
        .version("0.1.0")
        .about("Fatigue life of notched specimens from initiation and propagation")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(Command::new("table").about("Build the initiation table of the configured metric and shape").arg(config_arg()))
        .subcommand(
            Command::new("estimate")
                .about("Estimate lives of the configured experiments")
                .arg(config_arg())
                .arg(
                    Arg::new("experiment")
                        .short('e')
                        .long("experiment")
                        .help("Experiment id; repeat for several, defaults to all discovered")
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("json").long("json").help("Print estimates as JSON").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("stats")
                .about("Compare estimated and experimental lives")
                .arg(config_arg())
                .arg(
                    Arg::new("lives")
                        .short('x')
                        .long("lives")
                        .help("CSV file of experimental lives: exp_id,life_1[,life_2...]")
                        .required(true),
                )
                .arg(Arg::new("json").long("json").help("Print statistics as JSON").action(ArgAction::SetTrue)),
        )
        .after_help(
            "Tables are written to <table.path>/<shape>/MAT_<metric>.dat and must exist \
             before estimating. RUST_LOG overrides the log level.",
        )
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("table", sub)) => app_logic::run_table(required(sub, "config")),
        Some(("estimate", sub)) => {
            let experiments: Vec<String> =
                sub.get_many::<String>("experiment").map(|v| v.cloned().collect()).unwrap_or_default();
            app_logic::run_estimate(required(sub, "config"), &experiments, sub.get_flag("json")).map(|_| ())
        }
        Some(("stats", sub)) => {
            app_logic::run_stats(required(sub, "config"), required(sub, "lives"), sub.get_flag("json")).map(|_| ())
        }
        _ => unreachable!("a subcommand is required"),
    }
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches.get_one::<String>(id).map(String::as_str).unwrap_or_default()
}

fn main() {
    let matches = cli().get_matches();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if matches.get_flag("verbose") {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(&matches) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
