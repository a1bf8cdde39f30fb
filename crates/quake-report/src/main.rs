mod bootstrap;
mod export;
mod settings;

use anyhow::{Context, Result};
use quake_charts::{
    render_bar_chart, render_event_table, render_pie_chart, render_stats_table, render_table,
};
use quake_core::formatting::{format_depth_km, format_number, format_optional};
use quake_data::aggregator::{GroupStats, SummaryStats};
use quake_data::analysis::{analyze_source, AnalysisResult, ReportOptions, ReportSnapshot};
use quake_data::reader::{preview_lines, Ingestor};

use settings::Settings;

/// Rejection diagnostics echoed to stdout after the ingestion summary.
const SHOWN_REJECTIONS: usize = 3;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_ref())?;

    tracing::info!("quake-report v{} starting", env!("CARGO_PKG_VERSION"));

    let input = match settings.input.clone() {
        Some(path) => path,
        None => bootstrap::discover_data_path().with_context(|| {
            format!(
                "no --input given and no {} found in the working directory or {}",
                bootstrap::DEFAULT_FILE_NAME,
                bootstrap::app_dir().display()
            )
        })?,
    };
    tracing::info!("Reading {}", input.display());

    if let Some(n) = settings.preview {
        let lines = preview_lines(&input, n, settings.delimiter)
            .with_context(|| format!("cannot preview {}", input.display()))?;
        for line in lines {
            println!("{:>4}: {}", line.number, line.raw);
            println!("      {} field(s): {:?}", line.fields.len(), line.fields);
        }
        return Ok(());
    }

    let ingestor = Ingestor::new(settings.delimiter).with_header(!settings.no_header);
    let result = analyze_source(&input, ingestor)
        .with_context(|| format!("cannot load {}", input.display()))?;

    let options = ReportOptions {
        top_n: settings.top as usize,
        strong_threshold: settings.strong_threshold,
        year: settings.year,
        include_empty_buckets: settings.include_empty_buckets,
    };

    print_ingestion(&result);
    if result.aggregator.is_empty() {
        println!("\nNo events to report.");
    } else {
        print_report(&result, &options);
    }

    if let Some(path) = &settings.export_json {
        let snapshot = ReportSnapshot::build(&result, &options);
        export::write_json_atomic(path, &snapshot)
            .with_context(|| format!("cannot write {}", path.display()))?;
        println!("\nReport written to {}", path.display());
        tracing::info!("Exported JSON report to {}", path.display());
    }

    Ok(())
}

fn print_ingestion(result: &AnalysisResult) {
    let stats = &result.stats;
    let rows = vec![
        ("Source".to_string(), result.metadata.source.clone()),
        ("Files read".to_string(), result.metadata.files_read.to_string()),
        ("Data lines".to_string(), stats.total_lines.to_string()),
        ("Accepted".to_string(), stats.accepted.to_string()),
        ("Rejected".to_string(), stats.rejected.to_string()),
        (
            "Success rate".to_string(),
            format!("{}%", format_number(stats.success_rate(), 2)),
        ),
        (
            "Field fallbacks".to_string(),
            result.fallbacks().count().to_string(),
        ),
    ];
    print!("{}", render_stats_table("Ingestion", &rows));

    let rejections: Vec<_> = result.rejections().collect();
    for d in rejections.iter().take(SHOWN_REJECTIONS) {
        println!("  skipped {d}");
    }
    if rejections.len() > SHOWN_REJECTIONS {
        println!("  ... and {} more", rejections.len() - SHOWN_REJECTIONS);
    }
}

fn print_report(result: &AnalysisResult, options: &ReportOptions) {
    let agg = &result.aggregator;

    print!("{}", render_stats_table("Summary", &summary_rows(&result.summary)));

    print!(
        "{}",
        render_bar_chart(
            "Magnitude distribution",
            &agg.magnitude_distribution(options.include_empty_buckets)
                .to_chart_rows(),
            "Magnitude",
            "Events",
        )
    );
    print!(
        "{}",
        render_pie_chart(
            "Depth distribution",
            &agg.depth_distribution(options.include_empty_buckets)
                .to_chart_rows(),
        )
    );
    print!(
        "{}",
        render_bar_chart(
            "Regions with more than 5 events",
            &agg.region_distribution().to_chart_rows(),
            "Region",
            "Events",
        )
    );
    print!(
        "{}",
        render_bar_chart(
            "Events per year",
            &agg.year_distribution().to_chart_rows(),
            "Year",
            "Events",
        )
    );
    if let Some(year) = options.year {
        print!(
            "{}",
            render_bar_chart(
                &format!("Events per month in {year}"),
                &agg.month_distribution(year).to_chart_rows(),
                "Month",
                "Events",
            )
        );
    }

    print!(
        "{}",
        render_event_table(
            &format!("Top {} by magnitude", options.top_n),
            &agg.top_by_magnitude(options.top_n),
        )
    );
    print!(
        "{}",
        render_event_table(
            &format!("Top {} by depth", options.top_n),
            &agg.top_by_depth(options.top_n),
        )
    );
    print!(
        "{}",
        render_event_table(
            &format!(
                "Strong events (magnitude > {})",
                format_number(options.strong_threshold, 1)
            ),
            &agg.strong_events(options.strong_threshold),
        )
    );

    print!(
        "{}",
        group_table("Magnitude by type", "Type", &agg.magnitude_type_statistics())
    );
    print!(
        "{}",
        group_table("Magnitude by year", "Year", &agg.yearly_statistics())
    );
}

fn summary_rows(s: &SummaryStats) -> Vec<(String, String)> {
    let depth = |v: Option<f64>| v.map(format_depth_km).unwrap_or_else(|| "n/a".to_string());
    let year_range = match (s.min_year, s.max_year) {
        (Some(a), Some(b)) if a == b => a.to_string(),
        (Some(a), Some(b)) => format!("{a} - {b}"),
        _ => "n/a".to_string(),
    };

    vec![
        ("Total events".to_string(), s.count.to_string()),
        ("Average magnitude".to_string(), format_optional(s.avg_magnitude, 2)),
        ("Minimum magnitude".to_string(), format_optional(s.min_magnitude, 2)),
        ("Maximum magnitude".to_string(), format_optional(s.max_magnitude, 2)),
        ("Average depth".to_string(), depth(s.avg_depth)),
        ("Minimum depth".to_string(), depth(s.min_depth)),
        ("Maximum depth".to_string(), depth(s.max_depth)),
        ("Events with time".to_string(), s.with_time.to_string()),
        ("Events without time".to_string(), s.without_time.to_string()),
        ("Unique regions".to_string(), s.unique_regions.to_string()),
        (
            "Most frequent region".to_string(),
            s.most_frequent_region
                .clone()
                .unwrap_or_else(|| "n/a".to_string()),
        ),
        ("Years covered".to_string(), year_range),
    ]
}

fn group_table(title: &str, key_header: &str, groups: &[GroupStats]) -> String {
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.label.clone(),
                g.count.to_string(),
                format_number(g.avg_magnitude, 2),
                format_number(g.min_magnitude, 2),
                format_number(g.max_magnitude, 2),
            ]
        })
        .collect();
    render_table(
        title,
        &[key_header, "Events", "Avg", "Min", "Max"],
        &rows,
    )
}
