use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::json;

use super::*;
use crate::harness::SuiteRegistry;

fn exchange(status: u16, body: serde_json::Value, headers: HeaderMap) -> Result<Exchange, String> {
    let url = Url::parse("https://media.example.test/doc").map_err(|err| err.to_string())?;
    let status = StatusCode::from_u16(status).map_err(|err| err.to_string())?;
    let body = serde_json::to_vec(&body).map_err(|err| err.to_string())?;
    Ok(Exchange::from_parts(
        Method::GET,
        url,
        status,
        headers,
        Duration::from_millis(3),
        body,
        true,
    ))
}

#[test]
fn registers_every_bundled_suite() -> Result<(), String> {
    let mut registry = SuiteRegistry::new();
    register_builtins(&mut registry).map_err(|err| err.to_string())?;
    let expected = vec![
        "client",
        "doc",
        "file",
        "filter",
        "pool",
        "prod-varnish-get",
        "search",
        "stage-fail",
        "stage-varnish-cache-header-purge",
    ];
    if registry.names() != expected {
        return Err(format!("Unexpected suites {:?}", registry.names()));
    }
    if register_builtins(&mut registry).is_ok() {
        return Err("Registering twice should fail".to_owned());
    }
    Ok(())
}

#[test]
fn error_helpers_read_body_error() -> Result<(), String> {
    let failed = exchange(
        404,
        json!({ "data": null, "error": "Invalid file ID '12345'" }),
        HeaderMap::new(),
    )?;
    has_error("missing")(&failed).map_err(|err| err.to_string())?;
    error_contains("Invalid file ID '12345'".to_owned())(&failed).map_err(|err| err.to_string())?;
    no_data(&failed).map_err(|err| err.to_string())?;
    if error_contains("Missing ID".to_owned())(&failed).is_ok() {
        return Err("Unrelated error text should not match".to_owned());
    }

    let ok = exchange(200, json!({ "data": [1], "error": null }), HeaderMap::new())?;
    if has_error("any")(&ok).is_ok() {
        return Err("Null error should count as absent".to_owned());
    }
    non_empty_data(&ok).map_err(|err| err.to_string())?;
    if no_data(&ok).is_ok() {
        return Err("Data was present".to_owned());
    }
    Ok(())
}

#[test]
fn empty_array_is_not_enough_data() -> Result<(), String> {
    let empty = exchange(200, json!({ "data": [] }), HeaderMap::new())?;
    match non_empty_data(&empty) {
        Err(_) => Ok(()),
        Ok(()) => Err("Empty data array accepted".to_owned()),
    }
}

#[test]
fn data_field_accepts_numbers_and_strings() -> Result<(), String> {
    let numeric = exchange(201, json!({ "data": { "id": 42, "url": "" } }), HeaderMap::new())?;
    if data_field(&numeric, "id").as_deref() != Some("42") {
        return Err("Numeric id not rendered".to_owned());
    }
    if data_field(&numeric, "url").is_some() {
        return Err("Empty string should be treated as missing".to_owned());
    }
    let text = exchange(201, json!({ "data": { "id": "abc" } }), HeaderMap::new())?;
    if data_field(&text, "id").as_deref() != Some("abc") {
        return Err("String id not returned".to_owned());
    }
    Ok(())
}

#[test]
fn image_and_length_helpers_use_headers() -> Result<(), String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/gif"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("5917"));
    let image = exchange(200, json!({}), headers)?;
    image_content_type(&image).map_err(|err| err.to_string())?;
    if length_note(&image) != "| length: 5917" {
        return Err(format!("Unexpected note {}", length_note(&image)));
    }

    let json_only = exchange(200, json!({}), HeaderMap::new())?;
    if image_content_type(&json_only).is_ok() {
        return Err("Missing content type accepted as image".to_owned());
    }
    if length_note(&json_only) != "| length: -" {
        return Err(format!("Unexpected note {}", length_note(&json_only)));
    }
    Ok(())
}
