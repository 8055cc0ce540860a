// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// The --device flag picks the Burn backend here and nowhere
// else:
//   cpu  → NdArray
//   wgpu → Wgpu
// Training commands wrap it in Autodiff.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{
    CompareArgs, Commands, DeviceChoice, InspectArgs, PredictArgs, TestArgs, TrainArgs,
};

use crate::application::{
    compare_use_case::{CompareUseCase, ComparisonFailure},
    evaluate_use_case::{EvaluateUseCase, EvaluationReport},
    inspect_use_case::InspectUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};
use crate::domain::metrics::RunResult;

type CpuBackend = NdArray;
type GpuBackend = Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "pet-compare",
    version = "0.1.0",
    about = "Train and compare a MobileNet classifier and a DETR detector on cat/dog images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Compare(args)        => run_compare(args),
            Commands::Train(args)          => run_train(args),
            Commands::Test(args)           => run_test(args),
            Commands::InspectDataset(args) => run_inspect(args),
            Commands::Predict(args)        => run_predict(args),
        }
    }
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let device   = args.device;
    let use_case = CompareUseCase::new(args.into());

    let outcome = match device {
        DeviceChoice::Cpu  => use_case.execute::<Autodiff<CpuBackend>>(&NdArrayDevice::default()),
        DeviceChoice::Wgpu => use_case.execute::<Autodiff<GpuBackend>>(&WgpuDevice::default()),
    };

    let report = match outcome {
        Ok(report) => report,
        Err(err) => {
            // A failed run does not discard the one that finished before it
            if let Some(failure) = err.downcast_ref::<ComparisonFailure>() {
                if failure.error.is_training_failure() && !failure.completed.is_empty() {
                    println!("\nCompleted before the failure:");
                    print_final_metrics(&failure.completed);
                }
            }
            return Err(err);
        }
    };

    println!();
    print_final_metrics(&report.runs);
    println!("Comparison chart: {}", report.plot.display());
    Ok(())
}

fn print_final_metrics(runs: &[RunResult]) {
    for run in runs {
        if let Some(last) = run.final_metric() {
            println!(
                "{:<10} final loss {:.4}, final accuracy {:.2}%",
                run.model_name, last.mean_loss, last.accuracy
            );
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let device   = args.device;
    let use_case = TrainUseCase::new(args.into());

    let result = match device {
        DeviceChoice::Cpu  => use_case.execute::<Autodiff<CpuBackend>>(&NdArrayDevice::default())?,
        DeviceChoice::Wgpu => use_case.execute::<Autodiff<GpuBackend>>(&WgpuDevice::default())?,
    };

    println!("{} training complete. Checkpoint saved.", result.model_name);
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    let device   = args.device;
    let use_case = EvaluateUseCase::new(args.into());

    let report = match device {
        DeviceChoice::Cpu  => use_case.execute::<CpuBackend>(&NdArrayDevice::default())?,
        DeviceChoice::Wgpu => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
    };

    print_evaluation(&report);
    Ok(())
}

fn print_evaluation(report: &EvaluationReport) {
    for (i, (predicted, actual)) in report.predicted.iter().zip(&report.actual).enumerate() {
        let mark = if predicted == actual { "ok" } else { "MISS" };
        println!(
            "Image {:>2}: predicted {:<3}  true {:<3}  {}",
            i + 1,
            predicted.to_string(),
            actual.to_string(),
            mark
        );
    }
    println!("Batch accuracy: {:.2}%", report.accuracy());
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let device   = args.device;
    let use_case = InspectUseCase::new(args.into());

    let summary = match device {
        DeviceChoice::Cpu  => use_case.execute::<CpuBackend>(&NdArrayDevice::default())?,
        DeviceChoice::Wgpu => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
    };

    println!(
        "{} images ({} cats, {} dogs), {} batches per epoch",
        summary.files, summary.cats, summary.dogs, summary.batches
    );
    println!("Batch image shape: {:?}", summary.image_shape);
    let labels: Vec<String> = summary.labels.iter().map(|l| l.to_string()).collect();
    println!("Batch labels: [{}]", labels.join(", "));
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let name = args.model;
    let label = match args.device {
        DeviceChoice::Cpu => {
            PredictUseCase::<CpuBackend>::new(name, &args.checkpoint_dir, NdArrayDevice::default())?
                .classify(&args.image)?
        }
        DeviceChoice::Wgpu => {
            PredictUseCase::<GpuBackend>::new(name, &args.checkpoint_dir, WgpuDevice::default())?
                .classify(&args.image)?
        }
    };

    println!("\nPrediction ({}): {}", name, label);
    Ok(())
}
