// ============================================================
// Layer 6 — Comparison Plot
// ============================================================
// Renders the side-by-side training curves of several runs
// into one PNG:
//
//   ┌───────────────────────────┬───────────────────────────┐
//   │ Training Loss over Epochs │ Training Accuracy over    │
//   │                           │ Epochs                    │
//   │  one line per model       │  one line per model       │
//   │  x: Epochs   y: Loss      │  x: Epochs  y: Accuracy(%)│
//   └───────────────────────────┴───────────────────────────┘
//
// The file is overwritten if it exists; its directory is
// created on demand. Text uses the DejaVu Sans face compiled
// into the binary, registered as "sans-serif" on first use.

use plotters::{coord::Shift, prelude::*, style::register_font};
use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::metrics::RunResult;

pub const PLOT_SIZE: (u32, u32) = (1400, 560);

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

static FONT: OnceLock<Result<(), String>> = OnceLock::new();

fn register_bundled_font() -> Result<(), String> {
    FONT.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).map_err(|_| "invalid font".to_string())
    })
    .clone()
}

/// Render loss and accuracy curves of `runs` into `path`.
pub fn render_comparison(runs: &[RunResult], path: &Path) -> HarnessResult<PathBuf> {
    let plot_err = |e: &dyn std::fmt::Display| HarnessError::Plot {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    };

    if runs.is_empty() {
        return Err(plot_err(&"no runs to plot"));
    }
    register_bundled_font().map_err(|e| plot_err(&e))?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| HarnessError::persistence(dir, e))?;
    }

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;
    let panels = root.split_evenly((1, 2));

    let losses: Vec<(&str, Vec<f64>)> = runs
        .iter()
        .map(|r| (r.model_name.as_str(), r.losses()))
        .collect();
    let accuracies: Vec<(&str, Vec<f64>)> = runs
        .iter()
        .map(|r| (r.model_name.as_str(), r.accuracies()))
        .collect();

    let loss_range = value_range(losses.iter().flat_map(|(_, v)| v.iter().copied()));
    draw_panel(&panels[0], "Training Loss over Epochs", "Loss", &losses, loss_range)
        .map_err(|e| plot_err(&e))?;
    draw_panel(
        &panels[1],
        "Training Accuracy over Epochs",
        "Accuracy (%)",
        &accuracies,
        0.0..100.0,
    )
    .map_err(|e| plot_err(&e))?;

    root.present().map_err(|e| plot_err(&e))?;
    tracing::info!("Comparison plot saved to '{}'", path.display());
    Ok(path.to_path_buf())
}

fn draw_panel(
    area:    &DrawingArea<BitMapBackend<'_>, Shift>,
    title:   &str,
    y_desc:  &str,
    series:  &[(&str, Vec<f64>)],
    y_range: Range<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let epochs = series.iter().map(|(_, v)| v.len()).max().unwrap_or(1);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, (FONT_FAMILY, 22))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(epoch_range(epochs), y_range)?;

    chart
        .configure_mesh()
        .x_desc("Epochs")
        .y_desc(y_desc)
        .draw()?;

    for (i, (name, values)) in series.iter().enumerate() {
        let color  = Palette99::pick(i).to_rgba();
        let points = series_points(values);

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// (epoch, value) pairs with epochs counted from 1.
pub fn series_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| ((i + 1) as f64, v))
        .collect()
}

/// X axis covering epochs 1..=n, never zero-width.
pub fn epoch_range(epochs: usize) -> Range<f64> {
    1.0..(epochs.max(2) as f64)
}

/// Y axis covering every finite value with 5% headroom each side.
pub fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}
