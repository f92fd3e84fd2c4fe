use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, Request, StatusCode, Url};

use super::*;
use crate::config::Settings;
use crate::error::{CheckError, HttpError};
use crate::report::{MemorySink, PlainFormatter, Reporter};

const TEST_SECRET: &str = "test-secret";

fn fixture_settings(verbose: bool) -> Result<Settings, String> {
    Settings::new("https://media.example.test/", "default-key")
        .map(|settings| {
            settings
                .with_client_token("hive", "hive-token")
                .with_client_token("utah", "")
                .with_client_id("14")
                .with_verbose(verbose)
        })
        .map_err(|err| err.to_string())
}

fn memory_reporter() -> (Reporter, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    (Reporter::new(Arc::new(PlainFormatter), sink.clone()), sink)
}

fn builder(verbose: bool) -> Result<(RequestBuilder, Arc<MemorySink>), String> {
    let (reporter, sink) = memory_reporter();
    let settings = fixture_settings(verbose)?;
    let builder = RequestBuilder::new(&settings, reporter).map_err(|err| err.to_string())?;
    Ok((builder, sink))
}

fn header<'req>(request: &'req Request, name: &str) -> Option<&'req str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

fn recorded_exchange(status: u16, body: &str) -> Result<Exchange, String> {
    let url = Url::parse("https://media.example.test/client").map_err(|err| err.to_string())?;
    let status = StatusCode::from_u16(status).map_err(|err| err.to_string())?;
    Ok(Exchange::from_parts(
        Method::GET,
        url,
        status,
        HeaderMap::new(),
        Duration::from_millis(5),
        body.as_bytes().to_vec(),
        true,
    ))
}

#[test]
fn sign_matches_pinned_fixture() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let signed = signer.sign("resize=width:25", "14");
    if signed != "resize=width:25&c=14&a=e29060c2" {
        return Err(format!("Signature drifted: {}", signed));
    }
    Ok(())
}

#[test]
fn sign_is_deterministic() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let fragment = "crop=top:0|left:0|width:100|height:100";
    let first = signer.sign(fragment, "14");
    let second = UrlSigner::new(TEST_SECRET).sign(fragment, "14");
    if first != second {
        return Err(format!("{} != {}", first, second));
    }
    if first != format!("{}&c=14&a=eb83cb6d", fragment) {
        return Err(format!("Unexpected signature: {}", first));
    }
    Ok(())
}

#[test]
fn signature_is_eight_lowercase_hex_chars() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    for fragment in ["resize=width:25", "grayscale=true", "quality=10", "a"] {
        let signature = signer.signature(fragment);
        let valid = signature.len() == 8
            && signature
                .chars()
                .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch));
        if !valid {
            return Err(format!("Bad signature '{}' for '{}'", signature, fragment));
        }
    }
    Ok(())
}

#[test]
fn sign_preserves_path_prefix() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let signed = signer.sign("/file/21ec527041?resize=width:25", "14");
    if signed != "/file/21ec527041?resize=width:25&c=14&a=e29060c2" {
        return Err(format!("Prefix not preserved: {}", signed));
    }
    Ok(())
}

#[test]
fn sign_splits_on_first_question_mark() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let signed = signer.sign("/file/x?a=1?b=2", "7");
    let expected = format!("/file/x?a=1?b=2&c=7&a={}", signer.signature("a=1?b=2"));
    if signed != expected {
        return Err(format!("{} != {}", signed, expected));
    }
    Ok(())
}

#[test]
fn sign_empty_fragment_has_no_leading_parameter() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let signed = signer.sign("", "14");
    if signed != "&c=14&a=4b28dcf9" {
        return Err(format!("Unexpected empty signature: {}", signed));
    }
    Ok(())
}

#[test]
fn signed_query_display_matches_sign() -> Result<(), String> {
    let signer = UrlSigner::new(TEST_SECRET);
    let parts = signer.sign_fragment("resize=width:25", "14");
    if parts.to_string() != signer.sign("resize=width:25", "14") {
        return Err(format!("Display mismatch: {}", parts));
    }
    Ok(())
}

#[test]
fn resolver_prefers_explicit_tokens() -> Result<(), String> {
    let mut tokens = BTreeMap::new();
    tokens.insert("hive".to_owned(), "hive-token".to_owned());
    tokens.insert("utah".to_owned(), String::new());
    let resolver = CredentialResolver::new(tokens, "default-key").map_err(|err| err.to_string())?;

    if resolver.resolve("hive") != "hive-token" {
        return Err("Expected explicit hive token".to_owned());
    }
    if resolver.resolve("utah") != "default-key" {
        return Err("Empty mapping should fall back to default".to_owned());
    }
    if resolver.resolve("unknown") != "default-key" {
        return Err("Unknown client should fall back to default".to_owned());
    }
    let identity = resolver.identity("dc");
    if identity.name != "dc" || identity.token != "default-key" {
        return Err(format!("Unexpected identity: {:?}", identity));
    }
    Ok(())
}

#[test]
fn resolver_requires_default_token() -> Result<(), String> {
    if CredentialResolver::new(BTreeMap::new(), "").is_ok() {
        return Err("Expected missing key error".to_owned());
    }
    Ok(())
}

#[test]
fn start_attaches_identity_headers() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start("hive")
        .get("/client")
        .build()
        .map_err(|err| err.to_string())?;

    if request.url().as_str() != "https://media.example.test/client" {
        return Err(format!("Unexpected url: {}", request.url()));
    }
    let expected = [
        ("user-agent", TOOL_USER_AGENT),
        ("client-access-token", "hive-token"),
        ("x-requesting-for", "hive"),
        ("accept", ACCEPT_JSON),
        ("accept-encoding", ACCEPT_COMPRESSED),
    ];
    for (name, value) in expected {
        if header(&request, name) != Some(value) {
            return Err(format!("Header {} = {:?}", name, header(&request, name)));
        }
    }
    if request.headers().get("content-type").is_some() {
        return Err("Content-Type must not be set for a plain GET".to_owned());
    }
    if request.headers().get_all("client-access-token").iter().count() != 1 {
        return Err("Expected exactly one access token".to_owned());
    }
    Ok(())
}

#[test]
fn unknown_client_uses_default_token_but_keeps_its_name() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start("deseret")
        .get("/pool")
        .build()
        .map_err(|err| err.to_string())?;
    if header(&request, "client-access-token") != Some("default-key") {
        return Err("Expected default token".to_owned());
    }
    if header(&request, "x-requesting-for") != Some("deseret") {
        return Err("Expected literal client name".to_owned());
    }
    Ok(())
}

#[test]
fn multipart_flag_controls_content_type() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let multipart = builder
        .start_with("hive", None, true, true)
        .post("/doc")
        .build()
        .map_err(|err| err.to_string())?;
    if header(&multipart, "content-type") != Some(MULTIPART_FORM_DATA) {
        return Err(format!(
            "Unexpected content type: {:?}",
            header(&multipart, "content-type")
        ));
    }

    let plain = builder
        .start_with("hive", None, false, true)
        .post("/doc")
        .build()
        .map_err(|err| err.to_string())?;
    if plain.headers().get("content-type").is_some() {
        return Err("Non-multipart handle must not set Content-Type".to_owned());
    }
    Ok(())
}

#[test]
fn multipart_form_keeps_boundary() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let form = reqwest::multipart::Form::new().text("name", "flowers.jpg");
    let request = builder
        .start_with("hive", None, true, true)
        .post("/doc")
        .form(form)
        .build()
        .map_err(|err| err.to_string())?;
    let content_type = header(&request, "content-type").unwrap_or_default();
    if !content_type.starts_with("multipart/form-data; boundary=") {
        return Err(format!("Boundary lost: {}", content_type));
    }
    Ok(())
}

#[test]
fn non_json_handle_accepts_media() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start_with("hive", Some(""), false, false)
        .get("/file/21ec527041")
        .build()
        .map_err(|err| err.to_string())?;
    if header(&request, "accept") != Some(ACCEPT_MEDIA) {
        return Err("Expected media accept header".to_owned());
    }
    if request.url().as_str() != "https://media.example.test/file/21ec527041" {
        return Err(format!("Empty override should use default base: {}", request.url()));
    }
    Ok(())
}

#[test]
fn base_override_and_query_are_applied() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start_with("hive", Some("http://varnish01.example.test/"), false, true)
        .get("/search")
        .query("q", "*:*")
        .query("limit", "40")
        .build()
        .map_err(|err| err.to_string())?;
    if request.url().host_str() != Some("varnish01.example.test") {
        return Err(format!("Override ignored: {}", request.url()));
    }
    if request.url().query() != Some("q=*%3A*&limit=40") {
        return Err(format!("Unexpected query: {:?}", request.url().query()));
    }
    Ok(())
}

#[test]
fn absolute_targets_bypass_the_base() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start("hive")
        .get("http://other.example.test/file/1?resize=width:25&c=14&a=e29060c2")
        .build()
        .map_err(|err| err.to_string())?;
    if request.url().host_str() != Some("other.example.test") {
        return Err(format!("Unexpected host: {}", request.url()));
    }
    if request.url().query() != Some("resize=width:25&c=14&a=e29060c2") {
        return Err(format!("Signed query altered: {:?}", request.url().query()));
    }
    Ok(())
}

#[test]
fn explicit_headers_survive_decoration() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start("hive")
        .get("/file/2343384831")
        .header("Cache-Control", "no-cache")
        .build()
        .map_err(|err| err.to_string())?;
    if header(&request, "cache-control") != Some("no-cache") {
        return Err("Custom header dropped".to_owned());
    }
    Ok(())
}

struct RecordingDecorator {
    seen: Arc<std::sync::Mutex<Vec<String>>>,
}

impl RequestDecorator for RecordingDecorator {
    fn decorate(
        &self,
        request: &mut Request,
        _config: &RequestConfiguration,
    ) -> Result<(), HttpError> {
        let token = request
            .headers()
            .get("client-access-token")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("<missing>")
            .to_owned();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(token);
        }
        Ok(())
    }
}

#[test]
fn decorators_run_in_registration_order() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let builder = builder.with_decorator(RecordingDecorator { seen: seen.clone() });
    builder
        .start("hive")
        .delete("/pool/1")
        .build()
        .map_err(|err| err.to_string())?;
    let seen = seen.lock().map_err(|err| err.to_string())?.clone();
    if seen != vec!["hive-token".to_owned()] {
        return Err(format!("Decorator saw {:?}", seen));
    }
    Ok(())
}

#[test]
fn preview_only_prints_when_verbose() -> Result<(), String> {
    let (quiet, quiet_sink) = builder(false)?;
    quiet
        .start("hive")
        .get("/client")
        .build()
        .map_err(|err| err.to_string())?;
    if !quiet_sink.lines().is_empty() {
        return Err(format!("Unexpected preview: {:?}", quiet_sink.lines()));
    }

    let (loud, loud_sink) = builder(true)?;
    loud.start("hive")
        .get("/client")
        .build()
        .map_err(|err| err.to_string())?;
    let lines = loud_sink.lines();
    let line = lines.first().ok_or("Expected a preview line")?;
    if !line.contains("GET") || !line.contains("/client") || !line.ends_with("for hive") {
        return Err(format!("Unexpected preview: {}", line));
    }
    Ok(())
}

#[test]
fn custom_methods_are_accepted() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let request = builder
        .start("hive")
        .method("PURGE", "/file/a937415581/hive/apthumbnail/image")
        .map_err(|err| err.to_string())?
        .build()
        .map_err(|err| err.to_string())?;
    if request.method().as_str() != "PURGE" {
        return Err(format!("Unexpected method: {}", request.method()));
    }
    if builder.start("hive").method("BAD METHOD", "/").is_ok() {
        return Err("Expected invalid method error".to_owned());
    }
    Ok(())
}

#[test]
fn soft_expectation_failure_is_logged_and_later_checks_run() -> Result<(), String> {
    let (builder, sink) = builder(false)?;
    let exchange = recorded_exchange(200, r#"{"data":[],"error":null}"#)?;
    let later_ran = AtomicBool::new(false);

    builder
        .start("hive")
        .get("/client")
        .soft_expect(|_exchange: &Exchange| Err(CheckError::message("data was empty")))
        .expect(|_exchange: &Exchange| {
            later_ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .expect_status(200)
        .verify(&exchange)
        .map_err(|err| format!("Soft failure escalated: {}", err))?;

    if !later_ran.load(Ordering::SeqCst) {
        return Err("Checks after a soft failure were skipped".to_owned());
    }
    let lines = sink.lines();
    if !lines
        .iter()
        .any(|line| line.contains("FAIL") && line.contains("data was empty"))
    {
        return Err(format!("Soft failure not reported: {:?}", lines));
    }
    Ok(())
}

#[test]
fn hard_expectation_failure_stops_the_exchange() -> Result<(), String> {
    let (builder, _sink) = builder(false)?;
    let exchange = recorded_exchange(500, r#"{"error":"boom"}"#)?;
    let later_ran = AtomicBool::new(false);

    let result = builder
        .start("hive")
        .get("/client")
        .expect_status(200)
        .expect(|_exchange: &Exchange| {
            later_ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .verify(&exchange);

    if result.is_ok() {
        return Err("A 500 passed a hard status expectation".to_owned());
    }
    if later_ran.load(Ordering::SeqCst) {
        return Err("Checks ran after the first hard failure".to_owned());
    }
    Ok(())
}

#[test]
fn custom_hard_expectation_failure_is_returned() -> Result<(), String> {
    let (builder, sink) = builder(false)?;
    let exchange = recorded_exchange(200, r#"{"data":[],"error":null}"#)?;

    let result = builder
        .start("hive")
        .get("/client")
        .expect(|_exchange: &Exchange| Err(CheckError::message("data was empty")))
        .verify(&exchange);

    match result {
        Err(err) if err.to_string().contains("data was empty") => {}
        other => return Err(format!("Unexpected result {:?}", other)),
    }
    if !sink.lines().is_empty() {
        return Err(format!("Hard failure printed by the request: {:?}", sink.lines()));
    }
    Ok(())
}
