use std::error::Error;
use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use geonav::core::action::Action;
use geonav::core::config::{self, CliOverrides, ResolvedConfig};
use geonav::core::geo::{Geometry, Point};
use geonav::core::geometry;
use geonav::core::history::{FileStore, KeyValueStore, MemoryStore};
use geonav::core::state::{App, NoticeKind};
use geonav::core::transform::{to_global_frame, to_regional_frame};
use geonav::runtime::Navigator;
use geonav::search::{PlaceSearchProvider, SearchProvider, SearchQuery};
use geonav::surface::LoggingSurface;

#[derive(Parser)]
#[command(name = "geonav", about = "Map camera navigation and place search engine")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base URL of the place search endpoint
    #[arg(long, global = true)]
    search_url: Option<String>,

    /// City that searches are scoped to
    #[arg(long, global = true)]
    city: Option<String>,

    /// Keep search history in memory only
    #[arg(long, global = true)]
    no_persist: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a WGS-84 point to GCJ-02 (or back with --inverse)
    Transform {
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(long)]
        inverse: bool,
    },
    /// Print the camera target for a GeoJSON geometry (file path or `-`)
    Frame { path: String },
    /// Run one place search and print the results
    Search { text: String },
    /// Drive the navigator from stdin, printing surface commands (default)
    Repl,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to geonav.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Ok(log_file) = File::create("geonav.log") {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    let file_config = config::load_config()?;
    let config = config::resolve(
        &file_config,
        &CliOverrides {
            search_url: args.search_url.clone(),
            city: args.city.clone(),
            no_persist: args.no_persist,
        },
    );
    info!("geonav starting up with config: {:?}", config);

    match args.command.unwrap_or(Command::Repl) {
        Command::Transform { lon, lat, inverse } => {
            let p = Point::new(lon, lat);
            let out = if inverse {
                to_global_frame(p)
            } else {
                to_regional_frame(p)
            };
            println!("{:.8} {:.8}", out.lon, out.lat);
            Ok(())
        }
        Command::Frame { path } => frame(&path, &config),
        Command::Search { text } => search(&text, &config).await,
        Command::Repl => repl(&config).await,
    }
}

fn frame(path: &str, config: &ResolvedConfig) -> Result<(), Box<dyn Error>> {
    let mut raw = String::new();
    if path == "-" {
        io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path)?;
    }
    let geometry: Geometry = serde_json::from_str(&raw)?;
    let target = geometry::frame(&geometry);
    let display = config.geometry_frame.to_display(target.center);
    println!("centroid {:.8} {:.8}", target.center.lon, target.center.lat);
    println!("zoom {}", target.zoom);
    println!("display {:.8} {:.8}", display.lon, display.lat);
    Ok(())
}

fn build_provider(config: &ResolvedConfig) -> Arc<dyn SearchProvider> {
    Arc::new(PlaceSearchProvider::new(
        config.search_base_url.clone(),
        config.search_api_key.clone(),
    ))
}

async fn search(text: &str, config: &ResolvedConfig) -> Result<(), Box<dyn Error>> {
    let provider = build_provider(config);
    let query = SearchQuery {
        query: text.to_string(),
        city: config.city.clone(),
        restrict_to_city: config.city_limit,
    };
    let results = provider.search(query, CancellationToken::new()).await?;
    if results.is_empty() {
        println!("No matching places found");
    }
    for r in results {
        println!("{:.6} {:.6}  {}  ({})", r.point.lon, r.point.lat, r.name, r.address);
    }
    Ok(())
}

// ============================================================================
// REPL
// ============================================================================

const HELP: &str = "\
commands:
  query <text>           edit the search box (empty text clears it)
  submit                 search now
  select <n>             pick suggestion n
  pick-history <n>       search history entry n
  history                list history
  clear-history          forget all history
  clear                  clear the search box
  layer <geojson|none>   set or clear the layer request
  table <geojson|none>   set or clear the table row request
  address <lon> <lat>    set the address request (or `address none`)
  ready [on|off]         surface readiness
  quit";

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Dispatch(Action),
    ShowHistory,
    Help,
}

fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let action = match word {
        "query" => Action::QueryChanged(rest.to_string()),
        "submit" => Action::Submit,
        "select" => Action::SelectSuggestion(parse_index(rest)?),
        "pick-history" => Action::SelectHistoryEntry(parse_index(rest)?),
        "history" => return Ok(ReplCommand::ShowHistory),
        "clear-history" => Action::ClearHistory,
        "clear" => Action::ClearInput,
        "layer" => Action::SetLayerRequest(parse_geometry(rest)?),
        "table" => Action::SetTableRequest(parse_geometry(rest)?),
        "address" => Action::SetAddressRequest(parse_point(rest)?),
        "ready" => match rest {
            "" | "on" => Action::SurfaceReady(true),
            "off" => Action::SurfaceReady(false),
            other => return Err(format!("expected on|off, got '{other}'")),
        },
        "quit" | "exit" => Action::Quit,
        "help" | "" => return Ok(ReplCommand::Help),
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(ReplCommand::Dispatch(action))
}

fn parse_index(s: &str) -> Result<usize, String> {
    s.parse().map_err(|_| format!("expected an index, got '{s}'"))
}

fn parse_geometry(s: &str) -> Result<Option<Geometry>, String> {
    if s == "none" {
        return Ok(None);
    }
    serde_json::from_str(s)
        .map(Some)
        .map_err(|e| format!("invalid geometry: {e}"))
}

fn parse_point(s: &str) -> Result<Option<Point>, String> {
    if s == "none" {
        return Ok(None);
    }
    let mut parts = s.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(lon)), Some(Ok(lat)), None) => Ok(Some(Point::new(lon, lat))),
        _ => Err(format!("expected '<lon> <lat>', got '{s}'")),
    }
}

/// Human-readable search box state, printed whenever it changes.
fn render_search(app: &App) -> String {
    let search = &app.search;
    let mut out = format!("> {}", search.query);
    if search.is_loading() {
        out.push_str("  (searching...)");
    }
    if let Some(notice) = &search.notice {
        let tag = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Error => "error",
        };
        out.push_str(&format!("\n  [{tag}] {}", notice.text));
    }
    if search.show_history {
        for (i, entry) in search.history.entries().iter().enumerate() {
            out.push_str(&format!("\n  h{i}: {}", entry.text));
        }
    } else {
        for (i, s) in search.suggestions.iter().enumerate() {
            out.push_str(&format!("\n  {i}: {}  {}", s.name, s.address));
        }
    }
    out
}

fn open_store(config: &ResolvedConfig) -> Box<dyn KeyValueStore> {
    if !config.persist_history {
        return Box::new(MemoryStore::new());
    }
    match FileStore::in_home() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("History store unavailable, keeping history in memory: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}

async fn repl(config: &ResolvedConfig) -> Result<(), Box<dyn Error>> {
    let mut navigator = Navigator::new(
        App::from_config(config),
        LoggingSurface::new(io::stdout()),
        build_provider(config),
        open_store(config),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_view = String::new();
    eprintln!("{HELP}");

    loop {
        let input = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => parse_command(&line),
                None => break,
            },
            Some(action) = navigator.recv() => Ok(ReplCommand::Dispatch(action)),
        };

        let action = match input {
            Ok(ReplCommand::Dispatch(action)) => action,
            Ok(ReplCommand::ShowHistory) => {
                for (i, entry) in navigator.app().search.history.entries().iter().enumerate() {
                    eprintln!("h{i}: {}", entry.text);
                }
                continue;
            }
            Ok(ReplCommand::Help) => {
                eprintln!("{HELP}");
                continue;
            }
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        if !navigator.dispatch(action) {
            break;
        }
        let view = render_search(navigator.app());
        if view != last_view {
            eprintln!("{view}");
            last_view = view;
        }
    }
    info!("geonav shutting down");
    Ok(())
}
