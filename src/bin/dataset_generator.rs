use clap::{Parser, Subcommand};
use match_tracks::io::{object_to_json, save_project};
use match_tracks::synthetic::{SyntheticConfig, generate};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic project with known ground points
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Number of images along the strip
        #[arg(short, long, default_value = "6")]
        num_images: usize,

        /// Number of ground points
        #[arg(short = 'p', long, default_value = "200")]
        num_points: usize,

        /// Distance between cameras [m]
        #[arg(long, default_value = "20.0")]
        spacing: f64,

        /// Camera altitude [m]
        #[arg(long, default_value = "100.0")]
        altitude: f64,

        /// Ground elevation [m]
        #[arg(long, default_value = "10.0")]
        ground: f64,

        /// Chance of a duplicated keypoint detection, in [0, 1]
        #[arg(long, default_value = "0.1")]
        duplicate_ratio: f64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            num_images,
            num_points,
            spacing,
            altitude,
            ground,
            duplicate_ratio,
            seed,
        } => {
            if !(0.0..=1.0).contains(&duplicate_ratio) {
                return Err(format!("duplicate ratio {} is not in [0, 1]", duplicate_ratio).into());
            }
            let config = SyntheticConfig {
                num_images,
                num_points,
                spacing_m: spacing,
                altitude_m: altitude,
                ground_m: ground,
                duplicate_ratio,
                seed,
            };
            let synthetic = generate(&config);
            save_project(&output, &synthetic.project)?;
            let output_dir = std::path::Path::new(&output);
            object_to_json(output_dir.join("truth.json"), &synthetic.points)?;
            object_to_json(output_dir.join("synthetic.json"), &config)?;
            println!(
                "Generated {} images and {} points in {}",
                num_images, num_points, output
            );
        }
    }

    Ok(())
}
