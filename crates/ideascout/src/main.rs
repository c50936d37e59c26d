use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ideascout::api::{build_router, AppState};
use ideascout::config::{Configured, PipelineArgs, StoreArgs, StoreKind, DEFAULT_BIND};
use ideascout::core::ResearchRecord;
use ideascout::local::convex::ConvexStore;
use ideascout::local::textprep::plain_text_summary;
use ideascout::{persist, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ideascout")]
#[command(about = "Startup idea research: search, scrape, summarize", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve `POST /api/research` over HTTP.
    Serve(ServeCmd),
    /// Research one idea and print the report.
    Research(ResearchCmd),
    /// Diagnose configuration issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Socket address to listen on.
    #[arg(long, env = "IDEASCOUT_BIND", default_value = DEFAULT_BIND)]
    bind: String,
    #[command(flatten)]
    pipeline: PipelineArgs,
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(clap::Args, Debug)]
struct ResearchCmd {
    /// Idea to research, e.g. "AI note-taking apps".
    query: String,
    /// Strip markdown from the summary.
    #[arg(long)]
    plain: bool,
    /// Persist the report to the configured store.
    #[arg(long)]
    save: bool,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    #[command(flatten)]
    pipeline: PipelineArgs,
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Opt-in `KEY=VALUE` file named by `IDEASCOUT_ENV_FILE`. Never overrides the process
/// environment and never logs values.
fn load_env_file() {
    let Ok(p) = std::env::var("IDEASCOUT_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if !k.is_empty() && std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn serve(args: ServeCmd) -> Result<()> {
    let client = ideascout::local::http_client()?;
    let pipeline = args.pipeline.build(client.clone())?;
    let store = args.store.build(client)?;
    info!(
        store = store.as_ref().map(|s| s.name()).unwrap_or("off"),
        model = %args.pipeline.model,
        "pipeline ready"
    );

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(AppState::new(pipeline, store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn research(args: ResearchCmd) -> Result<()> {
    let client = ideascout::local::http_client()?;
    let pipeline = args.pipeline.build(client.clone())?;
    let report = pipeline.run(&args.query).await?;

    if args.save {
        if let Some(store) = args.store.build(client)? {
            let record = ResearchRecord::new(
                args.query.trim(),
                &report,
                chrono::Utc::now().timestamp_millis(),
            );
            persist::save_best_effort(store.as_ref(), &record).await;
        }
    }

    let summary = if args.plain {
        plain_text_summary(&report.summary)
    } else {
        report.summary.clone()
    };
    match args.output.to_ascii_lowercase().as_str() {
        "json" => println!(
            "{}",
            serde_json::json!({ "keywords": report.keywords, "summary": summary })
        ),
        _ => {
            println!("keywords: {}", report.keywords);
            println!();
            println!("{summary}");
        }
    }
    Ok(())
}

/// Parent dir of the JSONL store is creatable and a probe file can be written there.
fn store_path_writable(path: &std::path::Path) -> bool {
    let Some(dir) = path.parent() else {
        return false;
    };
    (|| -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let probe = dir.join(format!(
            "ideascout-doctor-{}.probe",
            chrono::Utc::now().timestamp_millis()
        ));
        std::fs::write(&probe, b"ok")?;
        let _ = std::fs::remove_file(&probe);
        Ok(())
    })()
    .is_ok()
}

fn doctor(args: DoctorCmd) {
    let configured = Configured::from_env();
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let providers_ok = configured.ready();
    checks.push(serde_json::json!({
        "name": "providers_configured",
        "ok": providers_ok,
        "hint": if providers_ok { "" } else { "Set IDEASCOUT_FIRECRAWL_API_KEY and IDEASCOUT_OPENAI_API_KEY." },
    }));

    let store_kind = match args.store.kind {
        StoreKind::Auto if ConvexStore::configured() => StoreKind::Convex,
        StoreKind::Auto => StoreKind::Jsonl,
        k => k,
    };
    let store_path = args.store.resolved_path();
    match store_kind {
        StoreKind::Jsonl => {
            let ok = store_path.as_deref().is_some_and(store_path_writable);
            checks.push(serde_json::json!({
                "name": "store_path_writable",
                "ok": ok,
                "hint": if ok { "" } else { "Set IDEASCOUT_STORE_PATH to a writable file path." },
            }));
        }
        StoreKind::Convex => {
            checks.push(serde_json::json!({
                "name": "convex_configured",
                "ok": configured.convex,
                "hint": if configured.convex { "" } else { "Set IDEASCOUT_CONVEX_URL." },
            }));
        }
        StoreKind::Off | StoreKind::Auto => {
            checks.push(serde_json::json!({ "name": "store", "ok": true, "skipped": true }));
        }
    }

    let ok = checks
        .iter()
        .all(|c| c["ok"].as_bool().unwrap_or(false));
    let store_name = match store_kind {
        StoreKind::Convex => "convex",
        StoreKind::Jsonl => "jsonl",
        StoreKind::Off | StoreKind::Auto => "off",
    };
    let payload = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "ideascout",
        "version": env!("CARGO_PKG_VERSION"),
        "configured": {
            "providers": {
                "firecrawl": configured.firecrawl,
                "openai": configured.openai,
                "openai_base_url": configured.openai_base_url,
            },
            "store": store_name,
            "store_path": store_path.map(|p| p.to_string_lossy().to_string()),
        },
        "checks": checks,
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            println!("ideascout {} (ok={})", env!("CARGO_PKG_VERSION"), ok);
            println!(
                "providers: firecrawl={} openai={} openai_base_url={}",
                configured.firecrawl, configured.openai, configured.openai_base_url
            );
            println!("store: {store_name}");
            println!("checks:");
            for c in &checks {
                let name = c["name"].as_str().unwrap_or("?");
                if c["skipped"].as_bool().unwrap_or(false) {
                    println!("- {name}: skipped");
                } else {
                    let ok = c["ok"].as_bool().unwrap_or(false);
                    println!("- {}: {}", name, if ok { "ok" } else { "fail" });
                }
            }
        }
        _ => println!("{payload}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    telemetry::init();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Research(args) => research(args).await?,
        Commands::Doctor(args) => doctor(args),
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "ideascout",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("ideascout {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
