use clap::Parser;
use match_tracks::ConsolidationConfig;
use match_tracks::config::ConfigOverrides;
use match_tracks::io::{load_project, object_from_json, write_report, write_tracks};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct MtrsCli {
    /// path to project folder (camera.json, images/*.json)
    path: PathBuf,

    /// consolidation config json, explicit flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// where to write the tracks, defaults to <path>/tracks.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// where to write the run report, defaults to <path>/report.json
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

impl MtrsCli {
    fn consolidation_config(&self) -> Result<ConsolidationConfig, match_tracks::Error> {
        let mut config = match &self.config {
            Some(path) => object_from_json(path)?,
            None => ConsolidationConfig::default(),
        };
        self.overrides.apply(&mut config);
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = MtrsCli::parse();
    let config = cli.consolidation_config()?;
    log::debug!("{:?}", config);

    let now = Instant::now();
    let mut project = load_project(&cli.path)?;
    let (tracks, report) = match_tracks::run(&mut project, &config, None)?;
    let duration_sec = now.elapsed().as_secs_f64();
    log::info!("consolidation took {:.3} sec", duration_sec);

    let output = cli.output.unwrap_or_else(|| cli.path.join("tracks.json"));
    write_tracks(&output, &tracks)?;
    let report_path = cli.report.unwrap_or_else(|| cli.path.join("report.json"));
    write_report(&report_path, &report)?;
    log::info!(
        "wrote {} tracks to {} and the report to {}",
        tracks.len(),
        output.display(),
        report_path.display()
    );
    Ok(())
}
