use std::error::Error;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use rand::distributions::{Distribution, Uniform};
use sizedist::SizeDistribution;
use tracing::{info, warn};

/// Accumulate fragment sizes and report their distribution
#[derive(Parser, Debug)]
#[command(name = "sizedist")]
#[command(version, about = "Accumulate fragment sizes and report their distribution")]
struct Args {
    /// File with one size per line (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Add this many uniformly distributed sizes instead of reading input
    #[arg(long, conflicts_with = "input")]
    random: Option<usize>,

    /// Seed the distribution from a binary archive before adding sizes
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the distribution to a binary archive
    #[arg(long)]
    save: Option<PathBuf>,

    /// Comma separated probabilities to report quantiles for
    #[arg(short, long, value_delimiter = ',', default_values_t = [0.01, 0.5, 0.99])]
    quantiles: Vec<f32>,

    /// Print every observed size with its count and cumulative probability
    #[arg(long)]
    dump: bool,

    /// Print the persisted form as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sizedist=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut sd = match &args.load {
        Some(path) => SizeDistribution::wire_decode(&fs::read(path)?)?,
        None => SizeDistribution::new(),
    };

    if let Some(n) = args.random {
        let mut rng = rand::thread_rng();
        let between = Uniform::from(0..1000);
        sd.extend(between.sample_iter(&mut rng).take(n));
    } else {
        match &args.input {
            Some(path) => read_sizes(BufReader::new(fs::File::open(path)?), &mut sd)?,
            None => read_sizes(io::stdin().lock(), &mut sd)?,
        }
    }

    info!(total = sd.total_observations(), "accumulated sizes");

    if args.dump {
        print!("{}", sd);
    }

    if sd.total_observations() > 0 {
        for p in &args.quantiles {
            println!("quantile({}) is {}", p, sd.quantile(*p));
        }
    } else {
        warn!("no sizes observed, skipping quantiles");
    }

    if args.json {
        println!("{}", sd.to_json()?);
    }

    if let Some(path) = &args.save {
        fs::write(path, sd.wire_encode()?)?;
        info!(path = %path.display(), "saved size distribution");
    }

    Ok(())
}

// Lines that are blank or start with '#' are ignored; anything else that does
// not parse as a size is reported and skipped.
fn read_sizes<R: BufRead>(reader: R, sd: &mut SizeDistribution) -> io::Result<()> {
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<i32>() {
            Ok(size) => sd.add_observation(size),
            Err(err) => warn!(line = lineno + 1, "skipping {:?}: {}", line, err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn random_and_input_are_exclusive() {
        let result = Args::try_parse_from(["sizedist", "--random", "10", "--input", "sizes.txt"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );

        let args = Args::try_parse_from(["sizedist", "--random", "10"]).unwrap();
        assert_eq!(args.random, Some(10));
        assert!(args.input.is_none());
        assert_eq!(args.quantiles, vec![0.01, 0.5, 0.99]);
    }
}
