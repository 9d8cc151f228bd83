//! Simple text-based dashboard

use crate::reclaim::{CleanupReport, StepReport};
use crate::telemetry::{axis_bounds_default, time_bounds, Sample};

const BAR_WIDTH: usize = 40;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Aggregates over the retained window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowStats {
    pub sample_count: usize,
    pub avg_ram_available_gb: f64,
    pub min_ram_available_gb: f64,
    pub max_cpu_percent: f32,
    pub avg_cpu_percent: f64,
}

impl WindowStats {
    pub fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let count = samples.len() as f64;
        let ram: Vec<f64> = samples.iter().map(Sample::ram_available_gb).collect();
        Self {
            sample_count: samples.len(),
            avg_ram_available_gb: ram.iter().sum::<f64>() / count,
            min_ram_available_gb: ram.iter().copied().fold(f64::INFINITY, f64::min),
            max_cpu_percent: samples.iter().map(|s| s.cpu_percent).fold(0.0, f32::max),
            avg_cpu_percent: samples.iter().map(|s| s.cpu_percent as f64).sum::<f64>() / count,
        }
    }
}

fn bar(percent: f32) -> String {
    let filled = ((percent.clamp(0.0, 100.0) as usize) * BAR_WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn temperature(sample: &Sample) -> String {
    match sample.temperature_celsius {
        Some(celsius) => format!("{:.1}°C", celsius),
        None => "---".to_string(),
    }
}

pub fn render_dashboard(samples: &[Sample]) -> String {
    let (Some(latest), Some((start, end))) = (samples.last(), time_bounds(samples)) else {
        return "Waiting for the first sample...\n".to_string();
    };

    let ram: Vec<f64> = samples.iter().map(Sample::ram_available_gb).collect();
    let disk: Vec<f64> = samples.iter().map(Sample::disk_free_gb).collect();
    let (ram_lo, ram_hi) = axis_bounds_default(&ram);
    let (disk_lo, disk_hi) = axis_bounds_default(&disk);
    let stats = WindowStats::from_samples(samples);

    format!(
r#"
===================== memsweep monitor =====================

Time:           {}
Window:         {} - {} ({} samples)

RAM available:  {:>8.2} GB   axis {:.1} - {:.1} GB
Disk free:      {:>8.2} GB   axis {:.1} - {:.1} GB
CPU:            {} {:>5.1}%
Temperature:    {}

------------------------ Window stats ----------------------
Avg RAM available: {:>8.2} GB
Min RAM available: {:>8.2} GB
Avg CPU:           {:>8.1} %
Peak CPU:          {:>8.1} %
============================================================
"#,
        latest.timestamp.format("%H:%M:%S"),
        start.format("%H:%M:%S"),
        end.format("%H:%M:%S"),
        stats.sample_count,
        latest.ram_available_gb(),
        ram_lo,
        ram_hi,
        latest.disk_free_gb(),
        disk_lo,
        disk_hi,
        bar(latest.cpu_percent),
        latest.cpu_percent,
        temperature(latest),
        stats.avg_ram_available_gb,
        stats.min_ram_available_gb,
        stats.avg_cpu_percent,
        stats.max_cpu_percent,
    )
}

pub fn render_step(report: &StepReport) -> String {
    let mut text = format!("{} [{} items, {} ms]", report.summary(), report.items_affected, report.duration_ms);
    for failure in &report.failures {
        text.push_str(&format!("\n    ! {}: {}", failure.target, failure.reason));
    }
    for entry in &report.startup_entries {
        text.push_str(&format!("\n    > [{}] {} = {}", entry.location, entry.name, entry.command));
    }
    text
}

pub fn render_cleanup_report(report: &CleanupReport) -> String {
    let mut text = format!(
        "Reclamation pass started {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    for step in &report.steps {
        text.push_str(&render_step(step));
        text.push('\n');
    }
    if let (Some(before), Some(after)) = (report.memory_before, report.memory_after) {
        text.push_str(&format!(
            "Available memory: {:.0} MB -> {:.0} MB ({:+.0} MB)\n",
            before.available_bytes as f64 / BYTES_PER_MB,
            after.available_bytes as f64 / BYTES_PER_MB,
            (after.available_bytes as f64 - before.available_bytes as f64) / BYTES_PER_MB,
        ));
    }
    text
}

/// One-paragraph summary of the samples taken over a reclamation pass.
pub fn render_window_summary(samples: &[Sample]) -> String {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return "No samples taken during the pass\n".to_string();
    };
    let stats = WindowStats::from_samples(samples);
    format!(
        "Sampled during pass: {} samples {} - {}\n\
         RAM available: {:.2} GB -> {:.2} GB (min {:.2} GB)\n\
         CPU: avg {:.1}%, peak {:.1}%\n",
        stats.sample_count,
        first.timestamp.format("%H:%M:%S"),
        last.timestamp.format("%H:%M:%S"),
        first.ram_available_gb(),
        last.ram_available_gb(),
        stats.min_ram_available_gb,
        stats.avg_cpu_percent,
        stats.max_cpu_percent,
    )
}
