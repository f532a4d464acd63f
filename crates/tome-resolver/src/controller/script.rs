//! Declarative `controller.toml` scripts.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use minijinja::{AutoEscape, Environment, Value as TemplateValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Capabilities, Controller, ControllerError, ControllerOutcome, ControllerResult, RawResponse};
use crate::request::Request;
use crate::response::{Body, ContentStream, CookieValue};

/// Error loading a script controller.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid controller {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid controller {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// A compiled and validated `controller.toml`.
#[derive(Debug)]
pub struct ScriptController {
    path: PathBuf,
    rules: Vec<Rule>,
    fallback: Rule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Rule {
    when: Option<String>,
    redirect: Option<String>,
    redirect_permanent: Option<String>,
    #[serde(default)]
    soft_not_found: bool,
    raw: Option<RawSpec>,
    view_data: Option<Map<String, Value>>,
    #[serde(default)]
    cookie: BTreeMap<String, CookieSpec>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    status: Option<u16>,
    #[serde(rename = "type")]
    content_type: Option<String>,
    content: Option<String>,
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CookieSpec {
    Value(String),
    Flag(bool),
}

/// Names visible to script expressions and templates.
#[derive(Serialize)]
struct ScriptContext<'a> {
    request: &'a Request,
    path: &'a str,
    query: &'a BTreeMap<String, String>,
    cookies: &'a BTreeMap<String, String>,
    globals: &'a Map<String, Value>,
    controller_path: &'a str,
    page_root: Cow<'a, str>,
}

/// Rule evaluated against one request; a raw file still has to be opened.
struct Evaluation {
    result: ControllerResult,
    stream: Option<PathBuf>,
}

impl ScriptController {
    /// Read and compile the script at `path`.
    pub async fn load(path: &Path) -> Result<Self, LoadError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &source)
    }

    /// Compile `source`; `path` is used in error messages.
    pub fn parse(path: &Path, source: &str) -> Result<Self, LoadError> {
        let parse_error = |source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let mut table: toml::Table = toml::from_str(source).map_err(parse_error)?;
        let rules = match table.remove("rule") {
            Some(value) => Vec::<Rule>::deserialize(value).map_err(parse_error)?,
            None => Vec::new(),
        };
        let fallback = Rule::deserialize(toml::Value::Table(table)).map_err(parse_error)?;

        let script = Self {
            path: path.to_path_buf(),
            rules,
            fallback,
        };
        script.validate().map_err(|message| LoadError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(script)
    }

    /// Path the script was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn validate(&self) -> Result<(), String> {
        if self.fallback.when.is_some() {
            return Err("`when` is only allowed inside [[rule]] tables".to_owned());
        }
        let env = script_environment();
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate(&env)
                .map_err(|message| format!("rule {}: {message}", index + 1))?;
        }
        self.fallback
            .validate(&env)
            .map_err(|message| format!("top-level rule: {message}"))
    }

    /// Evaluate the script for `request` and open any raw file it names.
    pub(crate) async fn run(
        &self,
        request: &Request,
        controller_path: &str,
        page_root: &Path,
    ) -> Result<ControllerResult, ControllerError> {
        let Evaluation { mut result, stream } = self.evaluate(request, controller_path, page_root)?;

        if let Some(path) = stream {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|source| ControllerError::Io { path, source })?;
            if let ControllerOutcome::Raw(raw) = &mut result.outcome {
                raw.body = Body::Stream(ContentStream::new(file));
            }
        }
        Ok(result)
    }

    fn evaluate(
        &self,
        request: &Request,
        controller_path: &str,
        page_root: &Path,
    ) -> Result<Evaluation, ControllerError> {
        let env = script_environment();
        let ctx = TemplateValue::from_serialize(ScriptContext {
            request,
            path: &request.path,
            query: &request.query,
            cookies: &request.cookies,
            globals: &request.globals,
            controller_path,
            page_root: page_root.to_string_lossy(),
        });

        let rule = self.select(&env, &ctx)?;
        rule.evaluate(&env, &ctx, page_root)
    }

    fn select<'a>(
        &'a self,
        env: &Environment<'a>,
        ctx: &TemplateValue,
    ) -> Result<&'a Rule, ControllerError> {
        for rule in &self.rules {
            let Some(when) = &rule.when else {
                return Ok(rule);
            };
            let matched = env
                .compile_expression(when)
                .and_then(|expr| expr.eval(ctx))
                .map_err(|source| ControllerError::Expression {
                    expression: when.clone(),
                    source,
                })?;
            if matched.is_true() {
                return Ok(rule);
            }
        }
        Ok(&self.fallback)
    }
}

#[async_trait]
impl Controller for ScriptController {
    async fn handle(
        &self,
        request: &Request,
        caps: &Capabilities<'_>,
    ) -> Result<ControllerResult, ControllerError> {
        self.run(request, caps.controller_path, caps.page_root).await
    }
}

impl Rule {
    fn validate<'a>(&'a self, env: &Environment<'a>) -> Result<(), String> {
        let terminals = [
            self.redirect.is_some(),
            self.redirect_permanent.is_some(),
            self.soft_not_found,
            self.raw.is_some(),
        ];
        if terminals.into_iter().filter(|set| *set).count() > 1 {
            return Err(
                "only one of redirect, redirect_permanent, soft_not_found and raw may be set"
                    .to_owned(),
            );
        }

        if let Some(when) = &self.when {
            env.compile_expression(when)
                .map_err(|e| format!("invalid `when` expression {when:?}: {e}"))?;
        }

        let mut templates: Vec<&'a str> = Vec::new();
        templates.extend(self.redirect.as_deref());
        templates.extend(self.redirect_permanent.as_deref());
        if let Some(raw) = &self.raw {
            match (&raw.content, &raw.file) {
                (Some(content), None) => templates.push(content),
                (None, Some(file)) => templates.push(file),
                _ => return Err("raw needs exactly one of `content` and `file`".to_owned()),
            }
            templates.extend(raw.content_type.as_deref());
        }
        for (name, cookie) in &self.cookie {
            match cookie {
                CookieSpec::Value(value) => templates.push(value),
                CookieSpec::Flag(false) => {}
                CookieSpec::Flag(true) => {
                    return Err(format!("cookie {name:?} must be a string or false"));
                }
            }
        }
        templates.extend(self.headers.values().map(String::as_str));
        if let Some(view_data) = &self.view_data {
            collect_strings(view_data.values(), &mut templates);
        }

        for source in templates {
            env.template_from_str(source)
                .map_err(|e| format!("invalid template {source:?}: {e}"))?;
        }
        Ok(())
    }

    fn evaluate(
        &self,
        env: &Environment<'_>,
        ctx: &TemplateValue,
        page_root: &Path,
    ) -> Result<Evaluation, ControllerError> {
        let mut stream = None;
        let outcome = if let Some(location) = &self.redirect {
            ControllerOutcome::Redirect(render(env, ctx, location)?)
        } else if let Some(location) = &self.redirect_permanent {
            ControllerOutcome::RedirectPermanent(render(env, ctx, location)?)
        } else if self.soft_not_found {
            ControllerOutcome::SoftNotFound
        } else if let Some(raw) = &self.raw {
            let mut response = RawResponse::text(String::new());
            if let Some(status) = raw.status {
                response.status = status;
            }
            if let Some(content_type) = &raw.content_type {
                response.content_type = render(env, ctx, content_type)?;
            }
            if let Some(content) = &raw.content {
                response.body = Body::Text(render(env, ctx, content)?);
            } else if let Some(file) = &raw.file {
                stream = Some(node_file(page_root, &render(env, ctx, file)?)?);
            }
            ControllerOutcome::Raw(response)
        } else {
            let view_data = match &self.view_data {
                Some(data) => render_map(env, ctx, data)?,
                None => Map::new(),
            };
            ControllerOutcome::Augment(view_data)
        };

        let mut cookies = BTreeMap::new();
        for (name, cookie) in &self.cookie {
            let value = match cookie {
                CookieSpec::Value(value) => CookieValue::Set(render(env, ctx, value)?),
                CookieSpec::Flag(_) => CookieValue::Delete,
            };
            cookies.insert(name.clone(), value);
        }
        let mut headers = BTreeMap::new();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), render(env, ctx, value)?);
        }

        Ok(Evaluation {
            result: ControllerResult {
                outcome,
                cookies,
                headers,
            },
            stream,
        })
    }
}

fn script_environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_debug(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

fn render(env: &Environment<'_>, ctx: &TemplateValue, source: &str) -> Result<String, ControllerError> {
    env.render_str(source, ctx)
        .map_err(|source_error| ControllerError::Expression {
            expression: source.to_owned(),
            source: source_error,
        })
}

fn render_map(
    env: &Environment<'_>,
    ctx: &TemplateValue,
    map: &Map<String, Value>,
) -> Result<Map<String, Value>, ControllerError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), render_value(env, ctx, value)?)))
        .collect()
}

fn render_value(
    env: &Environment<'_>,
    ctx: &TemplateValue,
    value: &Value,
) -> Result<Value, ControllerError> {
    Ok(match value {
        Value::String(source) => Value::String(render(env, ctx, source)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(env, ctx, item))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(render_map(env, ctx, map)?),
        other => other.clone(),
    })
}

fn collect_strings<'a>(values: impl Iterator<Item = &'a Value>, out: &mut Vec<&'a str>) {
    for value in values {
        match value {
            Value::String(source) => out.push(source),
            Value::Array(items) => collect_strings(items.iter(), out),
            Value::Object(map) => collect_strings(map.values(), out),
            _ => {}
        }
    }
}

/// Resolve a `raw.file` value inside the node directory.
fn node_file(page_root: &Path, relative: &str) -> Result<PathBuf, ControllerError> {
    let relative = Path::new(relative);
    let contained = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !contained || relative.as_os_str().is_empty() {
        return Err(ControllerError::msg(format!(
            "raw file {} must name a file inside the node directory",
            relative.display()
        )));
    }
    Ok(page_root.join(relative))
}
