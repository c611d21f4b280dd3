//! `${service.field}` references between services.
//!
//! Later services usually need the concrete address of an earlier one (the
//! backend needs the local model's URL, which needs llama-server's). Spec
//! strings may therefore reference an earlier service by name:
//!
//! | Placeholder            | Value                              |
//! |------------------------|------------------------------------|
//! | `${name.base_url}`     | `scheme://host:port` of its probe  |
//! | `${name.host}`         | host of its readiness URL          |
//! | `${name.port}`         | port (explicit or scheme default)  |
//!
//! `$$` produces a literal `$`. A `$` not followed by `{` or `$` is kept as is.

use std::collections::HashMap;

use url::Url;

use crate::error::TemplateError;

/// Fields a placeholder may read from a [`ServiceAddress`].
pub const FIELDS: &[&str] = &["base_url", "url", "host", "port"];

/// Address of a started service, derived from its readiness URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

impl ServiceAddress {
    /// Derive the address from a parsed readiness URL.
    ///
    /// Returns `None` for URLs without a host or a known port.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        let base_url = format!("{}://{}:{}", url.scheme(), host, port);
        Some(Self {
            host,
            port,
            base_url,
        })
    }

    fn field(&self, field: &str) -> Option<String> {
        match field {
            "base_url" | "url" => Some(self.base_url.clone()),
            "host" => Some(self.host.clone()),
            "port" => Some(self.port.to_string()),
            _ => None,
        }
    }
}

enum Piece<'a> {
    Literal(&'a str),
    Reference { service: &'a str, field: &'a str },
}

fn parse(input: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = input;

    while let Some(idx) = rest.find('$') {
        let (before, after) = rest.split_at(idx);
        if !before.is_empty() {
            pieces.push(Piece::Literal(before));
        }

        if let Some(tail) = after.strip_prefix("$$") {
            pieces.push(Piece::Literal("$"));
            rest = tail;
        } else if let Some(tail) = after.strip_prefix("${") {
            let end = tail.find('}').ok_or_else(|| TemplateError::Unterminated {
                input: input.to_string(),
            })?;
            let expr = &tail[..end];
            let (service, field) = expr
                .rsplit_once('.')
                .filter(|(s, f)| !s.is_empty() && !f.is_empty())
                .ok_or_else(|| TemplateError::Malformed {
                    expr: expr.to_string(),
                })?;
            pieces.push(Piece::Reference { service, field });
            rest = &tail[end + 1..];
        } else {
            pieces.push(Piece::Literal("$"));
            rest = &after[1..];
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    Ok(pieces)
}

/// Whether `input` contains at least one `${...}` reference.
pub fn has_placeholders(input: &str) -> bool {
    references(input).is_ok_and(|refs| !refs.is_empty())
}

/// List the `(service, field)` pairs referenced by `input`.
pub fn references(input: &str) -> Result<Vec<(String, String)>, TemplateError> {
    Ok(parse(input)?
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Reference { service, field } => Some((service.to_string(), field.to_string())),
            Piece::Literal(_) => None,
        })
        .collect())
}

/// Substitute every reference in `input` from `known`.
pub fn render(
    input: &str,
    known: &HashMap<String, ServiceAddress>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    for piece in parse(input)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Reference { service, field } => {
                let address = known
                    .get(service)
                    .ok_or_else(|| TemplateError::UnknownService {
                        service: service.to_string(),
                    })?;
                let value = address
                    .field(field)
                    .ok_or_else(|| TemplateError::UnknownField {
                        service: service.to_string(),
                        field: field.to_string(),
                    })?;
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}
