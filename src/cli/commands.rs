use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::router::{HttpMethod, RouteError, RouteRegistrar, Router};
use crate::server::HttpServer;
use crate::status::Status;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "routectx", version)]
#[command(about = "Regex route matching and request context demo service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the demo routes
    Serve {
        /// YAML server config; defaults apply when omitted
        #[arg(short, long, env = "ROUTECTX_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address, overrides the config file
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the compiled route table
    Routes {
        #[arg(short, long, env = "ROUTECTX_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Form accepted by `POST /user/profile/{profileID}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: i64,
}

/// Routes served by `routectx serve`.
///
/// # Errors
///
/// Only on an invalid template, which would be a bug here.
pub fn demo_router() -> Result<Router, RouteError> {
    let mut builder = Router::builder();

    builder.get("/sample", |ctx| {
        let body = serde_json::json!({ "apple": "apple" });
        ctx.output_json(&Status::ok(), &body);
    })?;
    builder.get("/text", |ctx| ctx.output_text(&Status::ok(), "Sample test!"))?;
    builder.post("/status", |ctx| match ctx.bind_json::<Status>() {
        Ok(status) => ctx.output_json(&Status::ok(), &status),
        Err(e) => {
            let status = Status::bad_request().with_error_description(e.to_string());
            ctx.output_status(&status);
        }
    })?;

    builder.group_route("/user/profile", |profile| {
        profile.get("", |ctx| {
            let params = ctx.query_params().cloned().unwrap_or_default();
            ctx.output_json(&Status::ok(), &params);
        })?;
        profile.get("/{profileID}", |ctx| {
            let body = serde_json::json!({ "profileID": ctx.path_param("profileID") });
            ctx.output_json(&Status::ok(), &body);
        })?;
        profile.post("/{profileID}", |ctx| match ctx.bind_form::<ProfileForm>() {
            Ok(form) => ctx.output_json(&Status::created(), &form),
            Err(e) => {
                let status = Status::bad_request().with_error_description(e.to_string());
                ctx.output_status(&status);
            }
        })?;
        Ok(())
    })?;

    Ok(builder.build())
}

/// Route table as served under `config`.
///
/// Methods outside the allow-list are listed separately since the
/// dispatcher answers them with 405. The static prefix is listed when a
/// static directory is configured.
#[must_use]
pub fn route_table(router: &Router, config: &ServerConfig) -> Vec<String> {
    let mut lines = Vec::with_capacity(router.len() + 1);
    for route in router.routes() {
        let (allowed, blocked): (Vec<HttpMethod>, Vec<HttpMethod>) = route
            .methods()
            .partition(|m| config.allow_methods.contains(m));
        let allowed: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
        let mut line = format!("{:<24} {}", allowed.join(","), route.pattern_source());
        if !blocked.is_empty() {
            let blocked: Vec<&str> = blocked.iter().map(|m| m.as_str()).collect();
            line.push_str(&format!("  (405: {})", blocked.join(",")));
        }
        lines.push(line);
    }
    if let (Some(dir), false) = (&config.static_dir, config.static_prefix.is_empty()) {
        lines.push(format!(
            "{:<24} {}/* -> {}",
            "GET,HEAD",
            config.static_prefix.trim_end_matches('/'),
            dir.display()
        ));
    }
    lines
}

fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(p) => ServerConfig::load(p)?,
        None => ServerConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

/// Parse arguments and run the selected command.
///
/// # Errors
///
/// Config, registration, bind or signal setup failures.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Routes { config } => {
            let config = load_config(config.as_deref())?;
            let router = demo_router()?;
            router.dump_routes();
            for line in route_table(&router, &config) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Serve { config, addr } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(addr) = addr {
                config.addr = addr;
            }
            serve(&config)
        }
    }
}

fn serve(config: &ServerConfig) -> Result<()> {
    may::config().set_stack_size(config.stack_size);
    info!(stack_size = config.stack_size, "Coroutine stack size configured");

    let dispatcher = Arc::new(Dispatcher::from_config(demo_router()?, config));
    let handle = HttpServer::for_dispatcher(dispatcher)
        .start(config.addr.as_str())
        .with_context(|| format!("failed to bind {}", config.addr))?;
    handle.wait_ready().context("server did not become ready")?;

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal = signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
