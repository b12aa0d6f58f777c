use crate::{
    config::Config,
    grading::{GradePreset, GradeTable, ReportVariant},
    model::Inspection,
    report::{HtmlSummaryRenderer, JsonRenderer, Language, ReportRenderer, compute_inspection_grade, render_inspection},
    stats::Summary,
    store::{DirBackend, FallbackBackend, PersistenceBackend},
    util::{ensure_dir, normalize_text, now_rfc3339, short_id, today_iso},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inspect-grade")]
#[command(about = "Property inspection grading and summary statistics")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./inspect-grade.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty inspection with one default area.
    New {
        #[arg(long)]
        client: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        property_type: String,
        #[arg(long, default_value = "")]
        inspector: String,
        /// YYYY-MM-DD, defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    Grade {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum)]
        table: Option<GradePreset>,
        #[arg(long, value_enum)]
        variant: Option<ReportVariant>,
    },
    /// Classify raw item counts or percentages without an inspection file.
    Classify {
        #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["pass_percentage", "fail_percentage"])]
        pass: Option<i64>,
        #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["pass_percentage", "fail_percentage"])]
        fail: Option<i64>,
        #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["pass_percentage", "fail_percentage"])]
        snags: Option<i64>,
        #[arg(long, allow_negative_numbers = true, requires = "fail_percentage")]
        pass_percentage: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "pass_percentage")]
        fail_percentage: Option<f64>,
        #[arg(long, value_enum)]
        table: Option<GradePreset>,
    },
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderFormat::Html)]
        format: RenderFormat,
        #[arg(long, value_enum)]
        lang: Option<Language>,
        #[arg(long, value_enum)]
        table: Option<GradePreset>,
        #[arg(long, value_enum)]
        variant: Option<ReportVariant>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Store {
        #[command(subcommand)]
        cmd: StoreCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    Save {
        #[arg(long)]
        input: PathBuf,
    },
    List {},
    Show {
        #[arg(long)]
        id: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    Grade {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        table: Option<GradePreset>,
        #[arg(long, value_enum)]
        variant: Option<ReportVariant>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Html,
    Json,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => match Config::load(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                // still report through the default subscriber
                let _ = init_logging(&args, &Config::default());
                return Err(err);
            }
        },
        None => Config::default(),
    };
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::New {
            client,
            location,
            property_type,
            inspector,
            date,
            out,
        } => new_inspection(client, location, property_type, inspector, date.as_deref(), out.as_deref()),
        Command::Validate { input } => {
            let insp = read_inspection(input)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "input": input,
                    "id": insp.id,
                    "areas": insp.areas.len(),
                    "items": insp.items().count(),
                    "status": "ok",
                }))?
            );
            Ok(())
        }
        Command::Grade { input, table, variant } => {
            let insp = read_inspection(input)?;
            let table = cfg.grade_table(*table, *variant);
            print_report(&cfg, &insp, &table)
        }
        Command::Classify {
            pass,
            fail,
            snags,
            pass_percentage,
            fail_percentage,
            table,
        } => classify(
            &cfg.grade_table(*table, None),
            (*pass, *fail, *snags),
            (*pass_percentage, *fail_percentage),
        ),
        Command::Render {
            input,
            format,
            lang,
            table,
            variant,
            out,
        } => {
            let insp = read_inspection(input)?;
            let table = cfg.grade_table(*table, *variant);
            let renderer: Box<dyn ReportRenderer> = match format {
                RenderFormat::Html => Box::new(HtmlSummaryRenderer::new(
                    lang.unwrap_or(cfg.report.language),
                    Some(cfg.report.title.clone()),
                )?),
                RenderFormat::Json => Box::new(JsonRenderer {
                    pretty: cfg.output.pretty_json,
                }),
            };
            let doc = render_inspection(renderer.as_ref(), &insp, &table)?;
            write_output(out.as_deref(), &doc)
        }
        Command::Store { cmd } => store(&cfg, cmd),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config not found: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    for candidate in ["inspect-grade.toml", "inspect-grade.example.toml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Ok(Some(p));
        }
    }
    Ok(None)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file {
        let path = if cfg.logging.file_path.is_empty() {
            PathBuf::from("inspect-grade.log")
        } else {
            PathBuf::from(&cfg.logging.file_path)
        };
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn read_inspection(path: &Path) -> Result<Inspection> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading inspection: {}", path.display()))?;
    let insp: Inspection = serde_json::from_str(&raw)
        .with_context(|| format!("parsing inspection JSON: {}", path.display()))?;
    insp.validate()
        .with_context(|| format!("validating inspection: {}", path.display()))?;
    Ok(insp)
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
            Ok(())
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

fn new_inspection(
    client: &str,
    location: &str,
    property_type: &str,
    inspector: &str,
    date: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let client = normalize_text(client);
    let date = date.map(str::to_string).unwrap_or_else(today_iso);
    let created = now_rfc3339();
    let id = short_id(&[client.as_str(), location, date.as_str(), created.as_str()]);

    let mut insp = Inspection::new(id, client, date);
    insp.property_location = normalize_text(location);
    insp.property_type = normalize_text(property_type);
    insp.inspector_name = normalize_text(inspector);
    insp.validate()?;

    info!("new inspection id={} client={}", insp.id, insp.client_name);
    write_output(out, &serde_json::to_string_pretty(&insp)?)
}

fn print_report(cfg: &Config, insp: &Inspection, table: &GradeTable) -> Result<()> {
    let report = compute_inspection_grade(insp, table)?;
    let out = if cfg.output.pretty_json {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}

fn classify(
    table: &GradeTable,
    counts: (Option<i64>, Option<i64>, Option<i64>),
    percentages: (Option<f64>, Option<f64>),
) -> Result<()> {
    table.validate()?;

    let (summary, pass_pct, fail_pct) = match percentages {
        (Some(p), Some(f)) => (None, p, f),
        _ => {
            let (pass, fail, snags) = counts;
            if pass.is_none() && fail.is_none() && snags.is_none() {
                return Err(anyhow!(
                    "classify needs --pass/--fail/--snags or --pass-percentage/--fail-percentage"
                ));
            }
            let s = Summary::try_from_counts(pass.unwrap_or(0), fail.unwrap_or(0), snags.unwrap_or(0))?;
            if s.total == 0 {
                warn!("no items counted; grading as 0% pass");
            }
            (Some(s), s.pass_percentage()?.value(), s.fail_percentage()?.value())
        }
    };

    let grade = table.classify_raw(pass_pct, fail_pct)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "summary": summary,
            "passPercentage": pass_pct,
            "failPercentage": fail_pct,
            "grade": grade.label,
            "gradeRank": grade.rank,
            "table": table.name,
        }))?
    );
    Ok(())
}

fn open_store(cfg: &Config) -> Box<dyn PersistenceBackend> {
    let primary = DirBackend::new("primary", &cfg.storage.primary_dir);
    if cfg.storage.fallback_enabled {
        Box::new(FallbackBackend::new(
            Box::new(primary),
            Box::new(DirBackend::new("fallback", &cfg.storage.fallback_dir)),
        ))
    } else {
        Box::new(primary)
    }
}

fn store(cfg: &Config, cmd: &StoreCommand) -> Result<()> {
    let backend = open_store(cfg);

    match cmd {
        StoreCommand::Save { input } => {
            let insp = read_inspection(input)?;
            backend.save(&insp)?;
            info!("saved inspection {} to {}", insp.id, backend.name());
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "id": insp.id,
                    "backend": backend.name(),
                    "status": "ok",
                }))?
            );
        }
        StoreCommand::List {} => {
            let table = cfg.grade_table(None, None);
            let mut rows = Vec::new();
            for insp in backend.list()? {
                let report = compute_inspection_grade(&insp, &table)?;
                rows.push(serde_json::json!({
                    "id": insp.id,
                    "clientName": insp.client_name,
                    "inspectionDate": insp.inspection_date,
                    "total": report.summary.total,
                    "grade": report.grade,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        StoreCommand::Show { id } => {
            let insp = backend.load(id)?;
            println!("{}", serde_json::to_string_pretty(&insp)?);
        }
        StoreCommand::Delete { id } => {
            backend.delete(id)?;
            info!("deleted inspection {id} from {}", backend.name());
        }
        StoreCommand::Grade { id, table, variant } => {
            let insp = backend.load(id)?;
            let table = cfg.grade_table(*table, *variant);
            print_report(cfg, &insp, &table)?;
        }
    }
    Ok(())
}
