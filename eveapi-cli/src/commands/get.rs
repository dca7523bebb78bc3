//! Get command - cached GET against any ESI endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crate::app::{App, credential, interruptible_context};
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode};

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Endpoint relative to the ESI base, e.g. `universe/systems/30000142/`.
    pub endpoint: String,

    /// Query parameter as key=value (repeatable).
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Cache lifetime in hours for a fresh response.
    #[arg(long)]
    pub ttl_hours: Option<u64>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Runs the get command.
pub async fn run(args: &GetArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::from_cli(cli)?;
    let ctx = interruptible_context();
    let cred = credential(cli);

    let params: Vec<(&str, &str)> = args
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let ttl = args
        .ttl_hours
        .map(|h| Duration::from_secs(h.saturating_mul(3600)));

    let body = app
        .executor
        .get_bytes_with_ttl(&ctx, &args.endpoint, cred.as_ref(), &params, ttl)
        .await
        .with_context(|| format!("GET {} failed", args.endpoint))?;

    debug!(bytes = body.len(), metrics = ?app.executor.metrics(), "Request finished");
    println!("{}", render_body(&body, cli.pretty)?);

    Ok(ExitCode::Success)
}

fn render_body(body: &[u8], pretty: bool) -> Result<String> {
    if pretty {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            return JsonFormatter::new(true).format(&value);
        }
    }
    Ok(String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("categories=character").unwrap(),
            ("categories".to_string(), "character".to_string())
        );
        assert_eq!(
            parse_param("search=a=b").unwrap(),
            ("search".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_param("strict=").unwrap().1, "");
        assert!(parse_param("=value").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_render_body() {
        let body = br#"{"name":"Jita","system_id":30000142}"#;
        assert_eq!(render_body(body, false).unwrap(), String::from_utf8_lossy(body));
        assert!(render_body(body, true).unwrap().contains("\n  \"name\": \"Jita\""));
        assert_eq!(render_body(b"not json", true).unwrap(), "not json");
    }
}
