//! Field getter grammar: dotted `{request|response}.FIELD[.SUB]` paths
//! resolved against a [`Pair`] (§4.6).
//!
//! Grounded on original `rules/getters.go`'s `buildGetter`/
//! `buildTwoPartGetter`/`buildURLPartGetter` dispatch tables. One bug in
//! the original is corrected here rather than carried forward: its
//! `buildGetter` re-splits the *original* field string (not the remainder
//! after stripping the entity prefix) when dispatching a two-part getter,
//! so `request.url.path` always resolves `field="request"` again instead
//! of `field="url"` — every nested getter in the table fails to build.
//! `getters_test.go`'s own `TestURLPartGetters` expects the nested forms
//! to work, so this is treated as a defect to fix, not behavior to imitate.

use std::sync::Arc;

use crate::connection::pair::Pair;
use crate::error::RuleBuildError;

/// A compiled accessor from a pair to an optional string value. `None`
/// means the field genuinely has no value for this pair (header absent,
/// URL unparsable); the evaluator layer treats that as a non-match rather
/// than an error (§7).
#[derive(Clone)]
pub struct FieldGetter(Arc<dyn Fn(&Pair) -> Option<String> + Send + Sync>);

impl FieldGetter {
    pub fn get(&self, pair: &Pair) -> Option<String> {
        (self.0)(pair)
    }
}

pub(crate) fn getter(f: impl Fn(&Pair) -> Option<String> + Send + Sync + 'static) -> FieldGetter {
    FieldGetter(Arc::new(f))
}

/// Builds a getter for `field` (the `Rule.Field` value), e.g.
/// `"request.url.path"` or `"response.header.Content-Type"`.
pub fn build_getter(field: &str) -> Result<FieldGetter, RuleBuildError> {
    if field.is_empty() {
        return Err(RuleBuildError::EmptyField);
    }
    let mut top = field.splitn(2, '.');
    let entity = top.next().unwrap();
    let remains = top
        .next()
        .ok_or_else(|| RuleBuildError::UnknownField(field.to_string()))?;

    match entity {
        "request" => build_request_getter(remains),
        "response" => build_response_getter(remains),
        other => Err(RuleBuildError::UnknownEntity(other.to_string())),
    }
}

fn build_request_getter(remains: &str) -> Result<FieldGetter, RuleBuildError> {
    let mut parts = remains.splitn(2, '.');
    let field = parts.next().unwrap_or_default();
    let attribute = parts.next();

    match (field, attribute) {
        ("url", None) => Ok(getter(|pair| {
            Some(
                pair.request
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| pair.request.uri.clone()),
            )
        })),
        ("url", Some(sub)) => build_url_part_getter(sub, "request", |pair| pair.request.url()),
        ("method", None) => Ok(getter(|pair| Some(pair.request.method.clone()))),
        ("host", None) => Ok(getter(|pair| Some(pair.request.host()))),
        ("body", None) => Ok(getter(|pair| {
            Some(String::from_utf8_lossy(&pair.request_body).into_owned())
        })),
        ("header", Some(name)) => {
            let name = name.to_string();
            Ok(getter(move |pair| {
                Some(pair.request.headers.get_joined(&name).unwrap_or_default())
            }))
        }
        _ => Err(RuleBuildError::UnknownField(format!("request.{remains}"))),
    }
}

fn build_response_getter(remains: &str) -> Result<FieldGetter, RuleBuildError> {
    let mut parts = remains.splitn(2, '.');
    let field = parts.next().unwrap_or_default();
    let attribute = parts.next();

    match (field, attribute) {
        ("body", None) => Ok(getter(|pair| {
            Some(String::from_utf8_lossy(&pair.response_body).into_owned())
        })),
        ("code", None) => Ok(getter(|pair| Some(pair.response.status_code.to_string()))),
        ("status", None) => Ok(getter(|pair| Some(pair.response.status_line()))),
        ("header", Some(name)) => {
            let name = name.to_string();
            Ok(getter(move |pair| {
                Some(pair.response.headers.get_joined(&name).unwrap_or_default())
            }))
        }
        _ => Err(RuleBuildError::UnknownField(format!("response.{remains}"))),
    }
}

fn build_url_part_getter(
    sub: &str,
    entity: &str,
    extract: impl Fn(&Pair) -> Option<url::Url> + Send + Sync + 'static,
) -> Result<FieldGetter, RuleBuildError> {
    if !matches!(sub, "scheme" | "host" | "path" | "query" | "fragment") {
        return Err(RuleBuildError::UnknownField(format!(
            "{entity}.url.{sub}"
        )));
    }
    let sub = sub.to_string();
    Ok(getter(move |pair| {
        let url = extract(pair)?;
        url_part(&url, &sub)
    }))
}

fn url_part(url: &url::Url, part: &str) -> Option<String> {
    match part {
        "scheme" => Some(url.scheme().to_string()),
        "host" => url.host_str().map(str::to_string),
        "path" => Some(url.path().to_string()),
        "query" => Some(url.query().unwrap_or_default().to_string()),
        "fragment" => Some(url.fragment().unwrap_or_default().to_string()),
        _ => None,
    }
}
