use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use vital_trace::config::Args;
use vital_trace::data_loading::collect_traces;
use vital_trace::output::{self, Report};
use vital_trace::replay::replay;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();
    let profile = args.resolve_profile().context("Failed to load profile")?;
    info!("Using {} profile at {} Hz", profile.name, profile.sample_rate_hz);

    let traces = collect_traces(&args.input_path)?;
    let reports: Vec<Report> = traces
        .iter()
        .map(|trace| replay(trace, &profile, args.replay_options()))
        .collect();

    for report in &reports {
        match (&report.result, report.failure) {
            (Some(result), _) => println!(
                "{}: rate {} variability {:?} confidence {:.2} ({} samples)",
                report.source,
                result.rate,
                result.variability,
                result.confidence,
                result.sample_count
            ),
            (None, Some(kind)) => match &report.detail {
                Some(detail) => println!("{}: {} ({})", report.source, kind, detail),
                None => println!("{}: {}", report.source, kind),
            },
            (None, None) => println!("{}: no result", report.source),
        }
        if let Some(request) = &report.calibration {
            println!(
                "{}: trend {:.2} ambient {:.2} contact {:.1} s",
                report.source, request.trend_value, request.ambient_value, request.contact_time_s
            );
        }
    }

    if let Some(path) = &args.csv_output {
        output::write_reports_to_csv(path, &reports)?;
    }
    if let Some(path) = &args.json_output {
        output::write_reports_to_json(path, &reports)?;
    }

    Ok(())
}
