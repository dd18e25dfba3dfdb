mod args;
mod progress;

use std::error::Error;
use std::fs::File;
use std::process;
use std::time::Instant;

use args::Args;
use clap::Parser;
use dataset::Dataset;
use device::{Device, DeviceInfo};
use log::LevelFilter;
use network::{Initializer, Layout, ParameterStore, Topology, Trainer};
use progress::TrainingProgressBar;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        process::exit(1);
    }

    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(log_file) = &args.log_file {
        loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            Config::default(),
            File::create(log_file)?,
        ));
    }
    CombinedLogger::init(loggers)?;

    Ok(args)
}

/// Splits off the evaluation set. It never overlaps the training set.
fn load(args: &Args) -> Result<(Dataset, Dataset), Box<dyn Error>> {
    let start = Instant::now();
    let data = Dataset::load(&args.data, &args.load_options(args.samples))?;

    let (eval, train) = match &args.eval_data {
        Some(path) => {
            let eval = Dataset::load(path, &args.load_options(args.eval_samples))?;
            (eval, data)
        }
        None => data.split_at(args.eval_samples),
    };
    log::info!("Loaded data in {:.2?}", start.elapsed());

    train.log_stats("Training set");
    eval.log_stats("Eval set");
    Ok((train, eval))
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let (train, eval) = load(args)?;

    let device = Device::new(args.device_config())?;
    DeviceInfo::query(&device).log();

    let topology = Topology::classifier(args.input_dim, args.hidden1, args.hidden2, args.classes)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("Initializing weights with seed {}", seed);

    let mut params = ParameterStore::new(&device, Layout::new(&topology))?;
    Initializer::new(seed).initialize(&mut params)?;

    let start = Instant::now();
    let mut trainer = Trainer::new(&device, args.train_config(), params, &train, &eval)?;
    log::info!("Transferred data to device in {:.2?}", start.elapsed());
    trainer.log_summary();

    let start = Instant::now();
    let mut progress = TrainingProgressBar::new(args.epochs)?;
    let history = trainer.fit(&mut progress)?;
    log::info!("Trained {} epochs in {:.2?}", history.len(), start.elapsed());

    if let Some(best) = history
        .iter()
        .max_by(|a, b| a.accuracy().total_cmp(&b.accuracy()))
    {
        log::info!(
            "Best accuracy {:.4} at epoch {}",
            best.accuracy(),
            best.epoch
        );
    }

    let start = Instant::now();
    drop(trainer);
    drop(device);
    log::info!("Released device memory in {:.2?}", start.elapsed());

    Ok(())
}
