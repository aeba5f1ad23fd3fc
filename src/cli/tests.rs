//! Unit tests for CLI commands

use crate::cli::{demo_router, route_table, Cli, Commands};
use crate::config::ServerConfig;
use crate::router::HttpMethod;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_command_with_flags() {
    let cli = Cli::try_parse_from([
        "routectx",
        "serve",
        "--config",
        "server.yaml",
        "--addr",
        "0.0.0.0:9000",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config.unwrap().to_string_lossy(), "server.yaml");
            assert_eq!(addr.as_deref(), Some("0.0.0.0:9000"));
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_routes_command_exists() {
    let cli = Cli::try_parse_from(["routectx", "routes"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes { .. }));
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["routectx", "generate"]).is_err());
}

#[test]
fn test_demo_router_shares_profile_route() {
    let router = demo_router().unwrap();
    let sources: Vec<&str> = router.routes().iter().map(|r| r.pattern_source()).collect();
    assert_eq!(
        sources,
        vec![
            "^/sample/?$",
            "^/text/?$",
            "^/status/?$",
            "^/user/profile/?$",
            "^/user/profile/(?P<profileID>[^/#?]+)/?$",
        ]
    );
}

#[test]
fn test_route_table_follows_config() {
    let router = demo_router().unwrap();
    let config = ServerConfig {
        allow_methods: vec![HttpMethod::Get],
        static_dir: Some(PathBuf::from("public")),
        ..ServerConfig::default()
    };
    let table = route_table(&router, &config);

    assert_eq!(table.len(), router.len() + 1);
    assert!(table[0].starts_with("GET "));
    assert!(table[0].ends_with("^/sample/?$"));
    assert!(table[2].ends_with("^/status/?$  (405: POST)"));
    assert!(table[4].contains("(?P<profileID>[^/#?]+)"));
    assert!(table[4].ends_with("  (405: POST)"));
    assert!(table[5].ends_with("/resources/* -> public"));
}

#[test]
fn test_route_table_without_static_dir() {
    let router = demo_router().unwrap();
    let table = route_table(&router, &ServerConfig::default());
    assert_eq!(table.len(), router.len());
    assert!(table.iter().all(|line| !line.contains("405")));
}
