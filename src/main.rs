// Entry point and interactive CLI flow.
//
// - Option [1] loads and normalizes the count sheet, printing diagnostics.
// - Option [2] generates the four reports and a JSON summary for the
//   current selection.
// - Option [3] narrows the selection (location, cost center, status,
//   subfamily, date range).
// After generating reports the user can go back to the menu or exit.
use anyhow::{Context, Result};
use clap::Parser;
use inventory_report::config::AppConfig;
use inventory_report::filter::{
    distinct_cost_centers, distinct_locations, distinct_subfamilies, DateGranularity, ItemFilter,
};
use inventory_report::types::{InventoryStatus, ProcessedItem};
use inventory_report::{aggregate, loader, logging, output, processor, reports, util};
use once_cell::sync::Lazy;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "inventory_report",
    version,
    about = "Reliability, chargeback and deviation reports for physical inventory counts"
)]
struct Cli {
    /// Count sheet to load (.xlsx, .xls, .xlsm, .ods, .csv or .json).
    #[arg(short, long, default_value = "conteo_inventario.xlsx")]
    file: PathBuf,

    /// Optional TOML file with pipeline and report settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the report files are written to.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

// Loaded once per import, then filtered and reported on as many times as
// the user likes. A new load replaces the whole item set.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        data: None,
        filter: ItemFilter::default(),
    })
});

struct AppState {
    data: Option<Vec<ProcessedItem>>,
    filter: ItemFilter,
}

fn lock_state() -> std::sync::MutexGuard<'static, AppState> {
    // A panic while holding the lock leaves plain data behind; keep using it.
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Print `prompt` and read one trimmed line; `None` once input is closed.
fn read_line_from<R: BufRead>(input: &mut R, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_input(prompt: &str) -> Option<String> {
    read_line_from(&mut io::stdin().lock(), prompt)
}

fn read_line(prompt: &str) -> String {
    read_input(prompt).unwrap_or_default()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// closed the input.
fn back_to_menu_from<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(resp) = read_line_from(input, "Back to Report Selection (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_back_to_menu() -> bool {
    back_to_menu_from(&mut io::stdin().lock())
}

/// Handle option [1]: load and normalize the count sheet.
fn handle_load(cli: &Cli, config: &AppConfig) -> Result<()> {
    let (rows, load_report) = loader::load_rows(&cli.file)
        .with_context(|| format!("failed to load {}", cli.file.display()))?;
    let (items, process_report) = processor::process_batch(&rows, &config.pipeline);

    println!(
        "Processing count sheet... ({} rows loaded, {} blank rows skipped)",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.skipped_blank_rows)
    );
    if let Some(sheet) = &load_report.sheet {
        println!("Sheet: {}", sheet);
    }
    if process_report.defaulted_locations > 0 || process_report.defaulted_articles > 0 {
        println!(
            "Note: {} rows without location, {} rows without article (defaults applied).",
            util::format_int(process_report.defaulted_locations),
            util::format_int(process_report.defaulted_articles)
        );
    }
    if process_report.undated_rows > 0 {
        println!(
            "Note: {} rows have no readable date and are excluded by date filters.",
            util::format_int(process_report.undated_rows)
        );
    }
    if process_report.variance_mismatches > 0 {
        println!(
            "Warning: {} rows carry a variance that disagrees with their stocks (kept as given).",
            util::format_int(process_report.variance_mismatches)
        );
    }

    let locations = distinct_locations(&items);
    let mut state = lock_state();
    // A single-location sheet starts pre-filtered to that location.
    state.filter = ItemFilter {
        location: match locations.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        },
        ..ItemFilter::default()
    };
    state.data = Some(items);
    println!("Locations: {}\n", locations.join(", "));
    Ok(())
}

/// Handle option [2]: generate all reports and the JSON summary.
///
/// Writes four CSV files and a JSON summary to the output directory and
/// prints Markdown previews of each report.
fn handle_generate_reports(cli: &Cli, config: &AppConfig) -> Result<()> {
    let (data, filter) = {
        let state = lock_state();
        (state.data.clone(), state.filter.clone())
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the count sheet first (option 1).\n");
        return Ok(());
    };

    let selection = filter.apply(&data);
    info!(selected = selection.len(), total = data.len(), "generating reports");
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("cannot create {}", cli.out_dir.display()))?;
    let pipeline = &config.pipeline;
    let preview = config.reports.preview_rows;

    println!("Generating reports...");
    if !filter.is_empty() {
        println!("(Selection: {} of {} items)", selection.len(), data.len());
    }
    println!();

    let metrics = aggregate::aggregate_sede_metrics(&selection, pipeline);

    let r1 = reports::sede_summary_rows(&metrics);
    let file1 = cli.out_dir.join("report1_sede_reliability.csv");
    output::write_csv(&file1, &r1)?;
    println!("Report 1: Reliability by Location\n");
    output::preview_table_rows(&r1, preview);
    println!("(Full table exported to {})\n", file1.display());

    let r2 = reports::cost_center_rows(&metrics);
    let file2 = cli.out_dir.join("report2_cost_centers.csv");
    output::write_csv(&file2, &r2)?;
    println!("Report 2: Reliability by Cost Center\n");
    output::preview_table_rows(&r2, preview);
    println!("(Full table exported to {})\n", file2.display());

    let r3 = reports::chargeback_report(&selection, pipeline.charge_sign_convention);
    let file3 = cli.out_dir.join("report3_cobros.csv");
    output::write_csv(&file3, &r3.rows)?;
    println!("Report 3: Chargeback (Cobros)\n");
    output::preview_table_rows(&r3.rows, preview);
    println!("Total Cobro: {}", util::format_number(r3.total, 0));
    println!("(Full table exported to {})\n", file3.display());

    let by_charge = reports::rank_by_charge(&selection);
    let r4 = reports::critical_rows(&by_charge, config.reports.top_critical);
    let file4 = cli.out_dir.join("report4_critical_items.csv");
    output::write_csv(&file4, &r4)?;
    println!("Report 4: Critical Items");
    println!("(Top {} by charge, then variance)\n", config.reports.top_critical);
    output::preview_table_rows(&r4, preview);
    let by_variance = reports::rank_by_variance(&selection);
    println!("Largest physical deviations:\n");
    output::preview_table_rows(&reports::critical_rows(&by_variance, config.reports.top_critical), preview);
    println!("(Full table exported to {})\n", file4.display());

    let summary = aggregate::summarize(&selection, pipeline);
    let summary_path = cli.out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "{{\"global_reliability\": {}, \"total_charge_amount\": {}, \"total_adjustment_cost\": {}}}\n",
        util::format_number(summary.global_reliability, 2),
        util::format_number(summary.total_charge_amount, 2),
        util::format_number(summary.total_adjustment_cost, 2)
    );
    Ok(())
}

/// Pick one value from a list or keep "all" on an empty answer.
fn prompt_option(label: &str, options: &[String]) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    println!("{}:", label);
    println!("[0] Todos");
    for (idx, opt) in options.iter().enumerate() {
        println!("[{}] {}", idx + 1, opt);
    }
    let answer = read_choice();
    match answer.parse::<usize>() {
        Ok(n) if n >= 1 && n <= options.len() => Some(options[n - 1].clone()),
        _ => None,
    }
}

fn prompt_date(label: &str) -> Option<String> {
    let raw = read_line(&format!("{} (blank for none): ", label));
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Handle option [3]: build a new selection filter.
fn handle_filters() {
    let data = lock_state().data.clone();
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the count sheet first (option 1).\n");
        return;
    };

    let location = prompt_option("Sede", &distinct_locations(&data));
    let cost_center = prompt_option("Centro de Costos", &distinct_cost_centers(&data));
    let statuses: Vec<String> = InventoryStatus::ALL
        .iter()
        .map(|s| s.label().to_string())
        .collect();
    let status = prompt_option("Estado", &statuses).and_then(|s| s.parse().ok());
    let subfamily = prompt_option("Subfamilia", &distinct_subfamilies(&data));
    let granularity = match read_line("Date granularity [D]ay/[M]onth: ").to_uppercase().as_str() {
        "M" => DateGranularity::Month,
        _ => DateGranularity::Day,
    };
    let start_date = prompt_date("From (YYYY-MM-DD or YYYY-MM)");
    let end_date = prompt_date("To (YYYY-MM-DD or YYYY-MM)");

    let filter = ItemFilter {
        location,
        cost_center,
        status,
        subfamily,
        start_date,
        end_date,
        granularity,
    };
    let selected = data.iter().filter(|i| filter.matches(i)).count();
    println!(
        "Filter set: {} of {} items selected.\n",
        util::format_int(selected),
        util::format_int(data.len())
    );
    lock_state().filter = filter;
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => AppConfig::default(),
    };
    info!(?config, "starting");

    loop {
        println!("Inventory Count Reports:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Set Filters\n");
        let Some(choice) = read_input("Enter choice: ") else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(&cli, &config) {
                    error!("{:#}", e);
                    eprintln!("Failed to load file: {:#}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&cli, &config) {
                    error!("{:#}", e);
                    eprintln!("Write error: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_filters(),
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
    Ok(())
}
