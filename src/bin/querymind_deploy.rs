

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use querymind::QueryMindConfig;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    // QUERYMIND_HELIX_HOST / QUERYMIND_HELIX_PORT and the config file seed the defaults
    let config = QueryMindConfig::load().unwrap_or_default();
    let mut host = config.helix_host.clone();
    let mut port = config.helix_port;
    let mut schema_only = false;
    let mut queries_only = false;
    let mut schema_dir = PathBuf::from("schema");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    host = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1]
                        .parse()
                        .with_context(|| format!("invalid port: {}", args[i + 1]))?;
                    i += 1;
                }
            }
            "--schema-only" => schema_only = true,
            "--queries-only" => queries_only = true,
            "--schema-dir" | "-d" => {
                if i + 1 < args.len() {
                    schema_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            other => eprintln!("⚠️  Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    if schema_only && queries_only {
        anyhow::bail!("--schema-only and --queries-only are mutually exclusive");
    }

    println!("🚀 QueryMind Schema Deployment");
    println!("   Target: {}:{}", host, port);

    let schema_dir = resolve_schema_dir(schema_dir)?;
    println!("   Schema dir: {}", schema_dir.display());
    println!();

    let base_url = format!("http://{}:{}", host, port);
    let client = reqwest::blocking::Client::new();

    if !queries_only {
        deploy_file(&client, &base_url, &schema_dir, "schema.hx", "schema")?;
    }
    if !schema_only {
        deploy_file(&client, &base_url, &schema_dir, "queries.hx", "queries")?;
    }

    println!();
    println!("🎉 Deployment complete!");

    Ok(())
}

fn resolve_schema_dir(schema_dir: PathBuf) -> anyhow::Result<PathBuf> {
    if schema_dir.exists() {
        return Ok(schema_dir);
    }

    let exe = env::current_exe()?;
    if let Some(alt) = exe.parent().map(|dir| dir.join("schema")).filter(|dir| dir.exists()) {
        return Ok(alt);
    }

    anyhow::bail!(
        "schema directory not found: {} (try --schema-dir /path/to/schema)",
        schema_dir.display()
    )
}

fn deploy_file(
    client: &reqwest::blocking::Client,
    base_url: &str,
    schema_dir: &Path,
    file_name: &str,
    endpoint: &str,
) -> anyhow::Result<()> {
    let path = schema_dir.join(file_name);
    if !path.exists() {
        eprintln!("   ⚠️  {} not found, skipping", file_name);
        return Ok(());
    }

    println!("📦 Deploying {}...", endpoint);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    post_text(client, &format!("{}/{}", base_url, endpoint), &content)
        .with_context(|| format!("{} deployment failed", endpoint))?;
    println!("   ✅ {} deployed", file_name);
    Ok(())
}

fn post_text(client: &reqwest::blocking::Client, url: &str, content: &str) -> anyhow::Result<()> {
    let response = client
        .post(url)
        .header("Content-Type", "text/plain")
        .body(content.to_string())
        .send()?;

    if response.status().is_success() {
        Ok(())
    } else {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(anyhow::anyhow!("HTTP {}: {}", status, body))
    }
}

fn print_help() {
    println!(r#"
QueryMind Schema Deployment CLI

USAGE:
    querymind-deploy [OPTIONS]

OPTIONS:
    -h, --host <HOST>       HelixDB host (default: localhost)
    -p, --port <PORT>       HelixDB port (default: 6969)
    -d, --schema-dir <DIR>  Schema directory (default: ./schema)
    --schema-only           Deploy only schema.hx
    --queries-only          Deploy only queries.hx
    --help                  Print this help

EXAMPLES:
    # Deploy to local HelixDB
    querymind-deploy

    # Deploy only queries (schema already exists)
    querymind-deploy --host myserver.com --queries-only

ENVIRONMENT:
    QUERYMIND_HELIX_HOST    Override default host
    QUERYMIND_HELIX_PORT    Override default port
    QUERYMIND_CONFIG        Config file name (default: querymind)
"#);
}
