mod output;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cloudlog_core::config::{AuthType, Config};
use cloudlog_core::query::{DataQuery, QueryDataRequest, QueryModel, TimeRange};
use cloudlog_core::time::parse_time_or_relative;
use cloudlog_provider::locator::{MetadataProjectLocator, StaticProjectLocator};
use cloudlog_provider::rest::RestClient;
use cloudlog_provider::{LogFetcher, LogProvider, ProjectLocator, RequestContext, discovery};
use cloudlog_server::Datasource;

use crate::output::{print_frames_human, print_list_human};
use crate::telemetry::{LogFormat, init_cli_tracing, init_server_tracing};

#[derive(Parser, Debug)]
#[command(name = "cloudlog")]
#[command(about = "Cloud Logging query bridge for log visualization tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the query and resource API over HTTP")]
    Serve {
        #[arg(long)]
        listen_addr: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    #[command(about = "Run one log query and print the resulting frames")]
    Query {
        #[arg(default_value = "")]
        filter: String,
        #[arg(long)]
        project: String,
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        view: Option<String>,
        #[arg(long, default_value = "1h")]
        since: String,
        #[arg(long)]
        until: Option<String>,
        #[arg(long, default_value_t = 0, help = "Maximum entries (0 uses the configured default)")]
        limit: i64,
    },
    #[command(about = "List projects visible to the credentials")]
    Projects,
    #[command(about = "List log buckets in a project")]
    Buckets {
        #[arg(long)]
        project: String,
    },
    #[command(about = "List views in a log bucket")]
    Views {
        #[arg(long)]
        project: String,
        #[arg(long)]
        bucket: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load().context("load config")?;

    match cli.command {
        Commands::Serve {
            listen_addr,
            project,
        } => run_server(cfg, listen_addr, project).await,
        Commands::Query {
            filter,
            project,
            bucket,
            view,
            since,
            until,
            limit,
        } => {
            init_cli_tracing();
            let provider = build_provider(&cfg)?;
            let datasource = Datasource::new(
                provider.clone(),
                build_locator(&cfg, None),
                LogFetcher::new(cfg.default_max_results, cfg.max_page_size),
            );

            let model = QueryModel {
                query_text: filter,
                project_id: project,
                bucket_id: bucket,
                view_id: view,
            };
            let time_range = parse_range(&since, until.as_deref())?;
            let req = QueryDataRequest {
                queries: vec![
                    DataQuery::new("A", time_range, serde_json::to_value(&model)?)
                        .with_max_data_points(limit),
                ],
            };

            let ctx = RequestContext::with_timeout(cfg.request_timeout);
            let mut resp = datasource.query_data(&ctx, &req).await;
            provider.close().await.ok();

            let result = resp.results.remove("A").unwrap_or_default();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_frames_human(&result);
            }
            if let Some(err) = result.error {
                anyhow::bail!(err);
            }
            Ok(())
        }
        Commands::Projects => {
            init_cli_tracing();
            let provider = build_provider(&cfg)?;
            let ctx = RequestContext::with_timeout(cfg.request_timeout);
            let list = discovery::list_projects(provider.as_ref(), &ctx).await;
            provider.close().await.ok();
            print_list(list?, cli.json)
        }
        Commands::Buckets { project } => {
            init_cli_tracing();
            let provider = build_provider(&cfg)?;
            let ctx = RequestContext::with_timeout(cfg.request_timeout);
            let list = discovery::list_buckets(provider.as_ref(), &ctx, &project).await;
            provider.close().await.ok();
            print_list(list?, cli.json)
        }
        Commands::Views { project, bucket } => {
            init_cli_tracing();
            let provider = build_provider(&cfg)?;
            let ctx = RequestContext::with_timeout(cfg.request_timeout);
            let list = discovery::list_views(provider.as_ref(), &ctx, &project, &bucket).await;
            provider.close().await.ok();
            print_list(list?, cli.json)
        }
    }
}

async fn run_server(
    mut cfg: Config,
    listen_addr: Option<String>,
    project: Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = listen_addr {
        cfg.listen_addr = v;
    }
    if let Some(v) = project {
        cfg.default_project = Some(v);
    }
    init_server_tracing(LogFormat::from_env());

    let addr: SocketAddr = cfg
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", cfg.listen_addr))?;
    let provider = build_provider(&cfg)?;
    let datasource = Datasource::new(
        provider.clone(),
        build_locator(&cfg, Some(provider.as_ref())),
        LogFetcher::new(cfg.default_max_results, cfg.max_page_size),
    );

    eprintln!("cloudlog serve");
    eprintln!("  listen: {addr}");
    eprintln!("  logging endpoint: {}", cfg.logging_endpoint);
    eprintln!("  auth: {:?}", cfg.auth_type);

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
        }
    };
    let served =
        cloudlog_server::run_http_server(datasource, addr, cfg.request_timeout, shutdown).await;

    if let Err(err) = provider.close().await {
        tracing::warn!(error = %err, "closing provider client failed");
    }
    served.context("query server")
}

fn build_provider(cfg: &Config) -> anyhow::Result<Arc<RestClient>> {
    let client = RestClient::from_config(cfg).context("build Cloud Logging client")?;
    Ok(Arc::new(client))
}

fn build_locator(cfg: &Config, client: Option<&RestClient>) -> Arc<dyn ProjectLocator> {
    if let Some(project) = cfg.default_project.as_deref().filter(|p| !p.is_empty()) {
        return Arc::new(StaticProjectLocator::new(project));
    }
    match (cfg.auth_type, client) {
        (AuthType::Gce, Some(client)) => Arc::new(MetadataProjectLocator::new(
            client.http().clone(),
            client.endpoints().metadata.clone(),
        )),
        _ => Arc::new(StaticProjectLocator::new("")),
    }
}

fn parse_range(since: &str, until: Option<&str>) -> anyhow::Result<TimeRange> {
    let from = parse_time_or_relative(since).with_context(|| format!("invalid --since {since}"))?;
    let to = match until {
        Some(v) => parse_time_or_relative(v).with_context(|| format!("invalid --until {v}"))?,
        None => Utc::now(),
    };
    Ok(TimeRange { from, to })
}

fn print_list(items: Vec<String>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_list_human(&items);
    }
    Ok(())
}
