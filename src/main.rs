use anyhow::{Context, Result};
use clap::Parser;
use rowlens::config::EngineConfig;
use rowlens::runtime;
use rowlens::selection::{PointerEvent, ScreenPoint, SelectionMode, SelectionRange};
use rowlens::table::TablePage;
use rowlens::AnalysisSession;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rowlens")]
#[command(about = "Filter, sort, page and chart delimited data from the command line", long_about = None)]
struct Args {
    /// Query pipeline (e.g., 'range(price, 10, 20) | sort(price, desc) | scatter(x: price, y: qty)')
    query: Option<String>,

    /// Input file (.csv or .json); stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page of the result to print, starting at 1
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Write the filtered rows as delimited text to FILE, or to stdout with '-'
    #[arg(short, long, value_name = "FILE")]
    export: Option<String>,

    /// Render the chart stage to FILE
    #[arg(long, value_name = "FILE")]
    chart: Option<PathBuf>,

    /// Brush a pixel rectangle on the chart and keep the points inside
    #[arg(long, value_name = "X0,Y0,X1,Y1", value_parser = parse_rect)]
    select: Option<[f64; 4]>,

    /// With --select, drop the selected points instead of keeping them
    #[arg(long, requires = "select")]
    exclude: bool,

    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

fn parse_rect(s: &str) -> std::result::Result<[f64; 4], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|_| "expected four comma-separated numbers".to_string())
}

#[derive(Serialize)]
struct Output<'a> {
    file: Option<&'a str>,
    filters: Vec<String>,
    rejected_rows: usize,
    selection: Option<SelectionRange>,
    page: TablePage,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).context("Failed to load config")?,
        None => EngineConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut session = AnalysisSession::new(std::process::id().to_string(), config);
    load_input(&mut session, args.input.as_deref())?;

    if let Some(query) = &args.query {
        let query = runtime::parse(query)?;
        runtime::run_query(&mut session, &query).context("Failed to run query")?;
    }

    if let Some(path) = &args.chart {
        match session.render_chart().context("Failed to render chart")? {
            Some(chart) => fs::write(path, &chart.bytes)
                .with_context(|| format!("Failed to write chart to {}", path.display()))?,
            None => eprintln!("Warning: no chart stage with x and y bound, nothing rendered"),
        }
    }

    let mut selection = None;
    if let Some(rect) = args.select {
        if session.scales().is_none() {
            session.render_chart().context("Failed to lay out chart for selection")?;
        }
        selection = brush(&mut session, rect);
        let mode = if args.exclude { SelectionMode::Exclude } else { SelectionMode::Keep };
        if selection.is_none() || session.apply_selection(mode).is_none() {
            eprintln!("Warning: selection did not match any plotted points");
        }
    }

    if let Some(target) = &args.export {
        let text = session.export().context("Failed to export rows")?;
        if target == "-" {
            write_stdout(text.as_bytes())?;
            return Ok(());
        }
        fs::write(target, text).with_context(|| format!("Failed to write export to {}", target))?;
    }

    let page = session.page(args.page);
    if args.json {
        let output = Output {
            file: session.file_name(),
            filters: session.filter_descriptions(),
            rejected_rows: session.dataset().rejected().len(),
            selection,
            page,
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize page")?;
        write_stdout(format!("{}\n", json).as_bytes())?;
    } else {
        for description in session.filter_descriptions() {
            println!("filter: {}", description);
        }
        write_stdout(page.render_text().as_bytes())?;
    }

    Ok(())
}

fn load_input(session: &mut AnalysisSession, input: Option<&Path>) -> Result<()> {
    let (name, text) = match input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (path.display().to_string(), text)
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read data from stdin")?;
            ("stdin".to_string(), text)
        }
    };

    let is_json = input
        .and_then(|p| p.extension())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let loaded = if is_json {
        let value: serde_json::Value = serde_json::from_str(&text).context("Failed to parse JSON input")?;
        session.load_json(&name, &value)
    } else {
        session.load_text(&name, &text)
    };
    loaded.with_context(|| format!("Failed to load {}", name))
}

/// Replay a rectangle as a press, drag and release on the rendered chart
fn brush(session: &mut AnalysisSession, [x0, y0, x1, y1]: [f64; 4]) -> Option<SelectionRange> {
    session.handle_pointer(PointerEvent::Down(ScreenPoint::new(x0, y0)));
    session.handle_pointer(PointerEvent::Move(ScreenPoint::new(x1, y1)));
    session.handle_pointer(PointerEvent::Up(ScreenPoint::new(x1, y1)))
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(bytes).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
