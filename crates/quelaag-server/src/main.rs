//! Quelaag demo server.
//!
//! Serves a small dispatcher over HTTP so the middleware, routing and
//! telemetry stack can be exercised end to end:
//!
//! - `GET /` greets and echoes the parsed cookies
//! - `GET /health` answers `ok`
//! - `/api/...` is delegated to a sub-router whose middleware reads the
//!   root inventory (`GET /api/echo?msg=hi`)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use http::header::COOKIE;
use http::StatusCode;
use quelaag_config::{ConfigLoader, QuelaagConfig};
use quelaag_core::{
    subquelaag, BoxError, MiddlewareError, MiddlewareSpec, ParentInventory, Quelaag,
};
use quelaag_router::{
    Completion, DispatchError, DispatchOptions, Dispatcher, Endpoint, Observer, SharedInventory, SubRoute,
};
use quelaag_server::predicates::{has_path_prefix, is_get, is_path};
use quelaag_server::{HttpDispatcher, HttpRequest, Responder, Server, ServerConfig};
use quelaag_telemetry::init_telemetry;

type Pairs = BTreeMap<String, String>;

struct Args {
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => config = args.next().map(PathBuf::from),
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("quelaag-demo {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Quelaag demo server

USAGE:
    quelaag-demo [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Configuration file (TOML or JSON), default ./quelaag.toml if present
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    QUELAAG__SERVER__HTTP_ADDR                 Bind address (default: 0.0.0.0:8080)
    QUELAAG__DISPATCH__ON_PREDICATE_FAILURE    stop | continue
    QUELAAG__TELEMETRY__LOGGING__LEVEL         Log filter directive
    QUELAAG__TELEMETRY__LOGGING__FORMAT        json | pretty
"
    );
}

fn load_config(path: Option<PathBuf>) -> Result<QuelaagConfig, quelaag_config::ConfigError> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_file(path)?,
        None => ConfigLoader::new().with_optional_file("quelaag.toml")?,
    };
    loader.with_dotenv().with_env_prefix("QUELAAG").load()
}

fn pairs(source: &str, separator: char) -> Pairs {
    source
        .split(separator)
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn root_quelaag() -> Quelaag<HttpRequest> {
    Quelaag::new(
        MiddlewareSpec::<HttpRequest>::new()
            .value("path", |inv| inv.request().uri().path().to_string())
            .value("query", |inv| pairs(inv.request().uri().query().unwrap_or(""), '&'))
            .value("cookies", |inv| {
                let header = inv
                    .request()
                    .headers()
                    .get(COOKIE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("");
                pairs(header, ';')
            })
            .future("session", |inv| {
                let cookies = inv.get::<Pairs>("cookies");
                async move {
                    // Stands in for a session store lookup.
                    tokio::task::yield_now().await;
                    let cookies = cookies?;
                    Ok::<_, MiddlewareError>(cookies.get("session").cloned())
                }
            }),
    )
}

fn api_router(
    root: &Quelaag<HttpRequest>,
) -> Dispatcher<HttpRequest, Responder, ParentInventory<HttpRequest, ()>> {
    let quelaag = subquelaag(
        root,
        MiddlewareSpec::<HttpRequest, ParentInventory<HttpRequest, ()>>::new().try_value(
            "api_path",
            |inv| {
                let path = inv.context().get::<String>("path")?;
                Ok::<_, MiddlewareError>(path.trim_start_matches("/api").to_string())
            },
        ),
    );

    let mut api = Dispatcher::new(quelaag);
    api.add_endpoint(Endpoint::new(
        |req: &HttpRequest, inv| {
            let api_path = inv.get::<String>("api_path")?;
            Ok::<_, MiddlewareError>(is_get(req) && api_path.as_str() == "/echo")
        },
        |_req, res: Responder, inv: &SharedInventory<HttpRequest, ParentInventory<HttpRequest, ()>>| {
            let query = inv.context().get::<Pairs>("query")?;
            let message = query.get("msg").cloned().unwrap_or_default();
            res.json(StatusCode::OK, &serde_json::json!({ "echo": message }))?;
            Ok::<_, BoxError>(())
        },
    ));
    api
}

fn demo_dispatcher(options: DispatchOptions) -> HttpDispatcher {
    let root = root_quelaag();
    let api = Arc::new(api_router(&root));

    let mut dispatcher = HttpDispatcher::with_catcher(root, |err: &DispatchError| {
        tracing::warn!(error = %err, "request failed");
    });
    dispatcher.set_options(options);

    dispatcher.add_observer(Observer::new(
        |_req: &HttpRequest, _inv| true,
        |req, inv| {
            let path = inv.get::<String>("path")?;
            tracing::info!(method = %req.method(), path = %path, "request received");
            Ok::<_, MiddlewareError>(())
        },
    ));

    dispatcher.add_endpoint(Endpoint::new(
        |req: &HttpRequest, _inv| is_get(req) && is_path(req, "/health"),
        |_req, res: Responder, _inv| res.text(StatusCode::OK, "ok"),
    ));

    dispatcher.add_endpoint(Endpoint::new(
        |req: &HttpRequest, _inv| is_get(req) && is_path(req, "/"),
        |_req, res: Responder, inv| {
            let inv = Arc::clone(inv);
            Completion::pending(async move {
                let session = inv.resolve::<Option<String>>("session").await?;
                let cookies = inv.get::<Pairs>("cookies")?;
                res.json(
                    StatusCode::OK,
                    &serde_json::json!({
                        "hello": "world",
                        "session": session.as_deref(),
                        "cookies": &*cookies,
                    }),
                )?;
                Ok::<_, BoxError>(())
            })
        },
    ));

    dispatcher.add_sub_router(SubRoute::to(
        |req: &HttpRequest, _inv| has_path_prefix(req, "/api/"),
        api,
    ));

    dispatcher
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config).context("failed to load configuration")?;

    init_telemetry(&config.telemetry.to_telemetry_config()).context("failed to initialize telemetry")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.http_addr,
        "Starting Quelaag demo"
    );

    let server = Server::new(ServerConfig::from(&config), demo_dispatcher(config.dispatch.to_options()));
    server.run().await.context("server failed")?;
    Ok(())
}
