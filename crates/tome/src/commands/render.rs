//! `tome render` command implementation.

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tome_resolver::{Body, CookieValue, Request, ResolveOptions, ResponseDescriptor};

use super::{SiteArgs, build_resolver};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Request path (e.g. /products/item1).
    path: String,

    /// Query parameter, repeatable.
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    query: Vec<(String, String)>,

    /// Request cookie, repeatable.
    #[arg(long = "cookie", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    cookies: Vec<(String, String)>,

    /// Template global, repeatable. JSON values are parsed, anything else is a string.
    #[arg(short, long = "global", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    globals: Vec<(String, String)>,

    /// Replace a node file for this request with the contents of FILE, repeatable.
    #[arg(long = "override", value_name = "NAME=FILE", value_parser = parse_override)]
    overrides: Vec<(String, PathBuf)>,

    /// Resolve this path instead of the request path.
    #[arg(long = "as", value_name = "PATH")]
    custom_path: Option<String>,

    /// Print only the body.
    #[arg(long)]
    quiet: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, an override file cannot be
    /// read or the path belongs to the static prefix.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config()?;
        let resolver = build_resolver(&config).await?;

        let request = self.request();
        let mut options = ResolveOptions {
            custom_path: self.custom_path.clone(),
            ..ResolveOptions::default()
        };
        for (name, file) in &self.overrides {
            let content = tokio::fs::read_to_string(file).await.map_err(|e| {
                CliError::Validation(format!("Failed to read override {}: {e}", file.display()))
            })?;
            options.overrides.insert(name.clone(), content);
        }

        let Some(response) = resolver.resolve(&request, &options).await else {
            return Err(CliError::Validation(format!(
                "{} is served by the transport (static prefix)",
                request.path
            )));
        };

        if !self.quiet {
            print_head(&output, &response);
        }
        write_body(response.body).await?;
        Ok(())
    }

    fn request(&self) -> Request {
        let mut request = Request::new(self.path.clone());
        request.query.extend(self.query.iter().cloned());
        request.cookies.extend(self.cookies.iter().cloned());
        for (key, raw) in &self.globals {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            request.globals.insert(key.clone(), value);
        }
        request
    }
}

/// Print status, redirect, cookies and headers.
fn print_head(output: &Output, response: &ResponseDescriptor) {
    output.status(
        response.status,
        &format!("{} {}", response.status, response.content_type),
    );
    if let Some(redirect) = &response.redirect {
        let kind = if redirect.permanent { "permanent" } else { "temporary" };
        output.info(&format!("Location: {} ({kind})", redirect.location));
    }
    for (name, value) in &response.cookies {
        match value {
            CookieValue::Set(value) => output.info(&format!("Set-Cookie: {name}={value}")),
            CookieValue::Delete => output.info(&format!("Set-Cookie: {name}= (expired)")),
        }
    }
    for (name, value) in &response.headers {
        output.info(&format!("{name}: {value}"));
    }
    if matches!(response.body, Body::Stream(_)) {
        output.detail("(streamed body)");
    }
}

/// Copy the body to stdout.
async fn write_body(body: Body) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    match body {
        Body::Empty => {}
        Body::Text(text) => stdout.write_all(text.as_bytes()).await?,
        Body::Stream(mut stream) => {
            tokio::io::copy(&mut stream, &mut stdout).await?;
        }
    }
    stdout.flush().await
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {arg:?}"))
}

fn parse_override(arg: &str) -> Result<(String, PathBuf), String> {
    let (name, file) = parse_key_value(arg)?;
    Ok((name, PathBuf::from(file)))
}
