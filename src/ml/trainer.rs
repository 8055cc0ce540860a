// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Trains one adapter-wrapped model for a fixed number of epochs
// and reports per-epoch metrics. No file I/O happens here; the
// caller decides what to persist.
//
// State machine:
//
//   Idle ──run()──▶ Running{1} ─▶ … ─▶ Running{N} ──▶ Completed
//                        │                 │
//                        └──── error ──────┴──▶ Failed{epoch}
//
// Per batch:
//   forward (adapter) → cross-entropy → backward → Adam step
//   running loss += batch loss; correct += argmax hits
//
// Per epoch:
//   mean loss = running loss / batches
//   accuracy  = 100 × correct / samples seen
//
// Any error or panic inside a step, or a loss that is NaN or
// infinite, ends the run as TrainingFailure. Metrics of the
// unfinished run are dropped.
//
// Adam (Kingma & Ba, 2015):
//   m = β1*m + (1-β1)*g
//   v = β2*v + (1-β2)*g²
//   θ = θ - lr * m / (√v + ε)      ε = 1e-8
//
// Reference: Burn Book §5 (Training)

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use crate::data::batch_source::BatchSource;
use crate::data::batcher::PetBatch;
use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::metrics::{EpochMetric, RunResult};
use crate::domain::traits::SampleSource;
use crate::ml::adapter::{ImageModel, ModelAdapter};

pub const ADAM_EPSILON: f64 = 1e-8;

/// Knobs for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,

    /// Overrides the adapter kind's default when set
    pub learning_rate: Option<f64>,

    pub adam_epsilon: f64,
}

impl TrainingConfig {
    pub fn new(epochs: usize) -> Self {
        Self { epochs, learning_rate: None, adam_epsilon: ADAM_EPSILON }
    }

    pub fn with_learning_rate(mut self, learning_rate: Option<f64>) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Idle,
    Running { epoch: usize },
    Completed,
    Failed { epoch: usize },
}

impl TrainingState {
    /// Epoch the loop is in, or stopped in.
    pub fn epoch(self) -> Option<usize> {
        match self {
            TrainingState::Running { epoch } | TrainingState::Failed { epoch } => Some(epoch),
            TrainingState::Idle | TrainingState::Completed => None,
        }
    }
}

/// The trained model handed back together with its metrics.
pub struct TrainedModel<B: Backend, M> {
    pub adapter: ModelAdapter<B, M>,
    pub result:  RunResult,
}

struct StepStats {
    loss:    f64,
    correct: usize,
    seen:    usize,
}

pub struct TrainingLoop {
    config: TrainingConfig,
    state:  TrainingState,
}

impl TrainingLoop {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config, state: TrainingState::Idle }
    }

    #[cfg(test)]
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Train `adapter` for the configured number of epochs.
    ///
    /// The model is moved in and handed back inside [`TrainedModel`]; on
    /// failure it is dropped together with the partial metrics.
    pub fn run<B, M, S>(
        &mut self,
        adapter: ModelAdapter<B, M>,
        batches: &mut BatchSource<'_, S, B>,
    ) -> HarnessResult<TrainedModel<B, M>>
    where
        B: AutodiffBackend,
        M: ImageModel<B> + AutodiffModule<B>,
        S: SampleSource,
    {
        if self.state != TrainingState::Idle {
            return Err(HarnessError::InvalidConfig(
                "a training loop runs once; build a new one per run".into(),
            ));
        }
        let epochs = self.config.epochs;
        if epochs == 0 {
            return Err(HarnessError::InvalidConfig("epochs must be at least 1".into()));
        }

        let name = adapter.name().to_string();
        let lr   = self
            .config
            .learning_rate
            .unwrap_or_else(|| adapter.kind().default_learning_rate());
        let mut optim = AdamConfig::new()
            .with_epsilon(self.config.adam_epsilon as f32)
            .init::<B, M>();

        tracing::info!(
            "Training {} ({}) for {} epochs: lr={}, {} batches of up to {} per epoch",
            name,
            adapter.kind(),
            epochs,
            lr,
            batches.batches_per_epoch(),
            batches.batch_size()
        );

        let started     = Instant::now();
        let mut adapter = adapter;
        let mut history = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            self.state = TrainingState::Running { epoch };
            let epoch_started = Instant::now();

            let mut loss_sum  = 0.0f64;
            let mut n_batches = 0usize;
            let mut correct   = 0usize;
            let mut seen      = 0usize;

            for batch in batches.epoch() {
                let batch = match batch {
                    Ok(batch) => batch,
                    Err(e) => {
                        // Dataset errors go to the caller as they are
                        let epoch = self.mark_failed();
                        tracing::error!("{} stopped during epoch {}: {}", name, epoch, e);
                        return Err(e);
                    }
                };

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    train_step(adapter, &mut optim, lr, batch)
                }));
                let (next, stats) = match outcome {
                    Ok(Ok(step))  => step,
                    Ok(Err(e))   => return Err(self.fail(&name, e)),
                    Err(payload) => return Err(self.fail(&name, panic_message(payload.as_ref()))),
                };
                adapter = next;

                loss_sum  += stats.loss;
                n_batches += 1;
                correct   += stats.correct;
                seen      += stats.seen;
                tracing::debug!(
                    "{} epoch {} batch {}: loss={:.4} ({}/{} correct)",
                    name, epoch, n_batches, stats.loss, stats.correct, stats.seen
                );
            }

            let metric = EpochMetric::from_counters(
                epoch, loss_sum, n_batches, correct, seen, epoch_started.elapsed(),
            );
            println!(
                "{} - Epoch [{}/{}], Loss: {:.4}, Accuracy: {:.2}%, Time: {:.2} sec",
                name,
                epoch,
                epochs,
                metric.mean_loss,
                metric.accuracy,
                metric.duration.as_secs_f64()
            );
            history.push(metric);
        }

        self.state = TrainingState::Completed;
        let result = RunResult::new(name, history, started.elapsed());
        println!(
            "Total Training Time: {:.2} seconds",
            result.total_duration.as_secs_f64()
        );
        println!(
            "Average Time per Epoch: {:.2} seconds",
            result.average_epoch_duration().as_secs_f64()
        );
        tracing::info!("{} training complete", result.model_name);

        Ok(TrainedModel { adapter, result })
    }

    /// Move from Running to Failed, keeping the epoch.
    fn mark_failed(&mut self) -> usize {
        let epoch  = self.state.epoch().unwrap_or_default();
        self.state = TrainingState::Failed { epoch };
        epoch
    }

    fn fail(&mut self, model: &str, reason: impl ToString) -> HarnessError {
        let epoch = self.mark_failed();
        let err   = HarnessError::training_failure(model, epoch, reason);
        tracing::error!("{}", err);
        err
    }
}

/// One optimisation step. Returns the updated adapter, or the reason
/// the step could not complete.
fn train_step<B, M, O>(
    adapter: ModelAdapter<B, M>,
    optim:   &mut O,
    lr:      f64,
    batch:   PetBatch<B>,
) -> Result<(ModelAdapter<B, M>, StepStats), String>
where
    B: AutodiffBackend,
    M: ImageModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let seen   = batch.len();
    let logits = adapter.forward(batch.images).map_err(|e| e.to_string())?;

    let ce   = CrossEntropyLossConfig::new().init(&logits.device());
    let loss = ce.forward(logits.clone(), batch.labels.clone());

    let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();
    if !loss_value.is_finite() {
        return Err(format!("loss is {loss_value}"));
    }

    // argmax(1) is [batch, 1]; flatten to [batch] before comparing
    let correct: i64 = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(batch.labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();

    // Gradients are rebuilt from scratch on every backward pass
    let grads   = loss.backward();
    let grads   = GradientsParams::from_grads(grads, adapter.model());
    let adapter = adapter.map_model(|model| optim.step(lr, model, grads));

    Ok((adapter, StepStats { loss: loss_value, correct: correct as usize, seen }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic during forward/backward".to_string()
    }
}
