//! HTTP service for the busboard e-paper display.
//!
//! Fetches the arrivals payload from the configured upstream, renders it
//! through the board engine, and serves the 1-bit PNG plus health and debug
//! surfaces. The TRMNL device polls `/redirect` for the next image URL and
//! wake interval, then fetches `/image.png`.

use std::env;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use busboard::{ArrivalPayload, StopCodes, UpstreamClient};
use busboard_embedded_graphics::{plan_board_preview, render_board, BoardOptions};
use chrono::Local;
use log::{info, warn};

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_STOP_A: &str = "45379";
const DEFAULT_STOP_B: &str = "45489";
const DEFAULT_STOP_C: &str = "45371";
/// How often the device should wake and re-fetch, in seconds.
const REFRESH_RATE_SECS: u64 = 60;

struct ServerConfig {
    upstream: Option<String>,
    default_codes: StopCodes,
    port: u16,
}

impl ServerConfig {
    /// Environment-driven configuration.
    ///
    /// `BUSBOARD_UPSTREAM` accepts a full `/exec` URL or a bare deployment
    /// id. Without it the server still runs and serves fallback boards,
    /// which keeps the device alive while the upstream is being set up.
    fn from_env() -> Result<Self, String> {
        let upstream = env::var("BUSBOARD_UPSTREAM").ok().filter(|v| !v.is_empty());
        let port = match env::var("BUSBOARD_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("invalid BUSBOARD_PORT: {}", raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let default_codes = StopCodes::new(
            env::var("BUSBOARD_STOP_A").unwrap_or_else(|_| DEFAULT_STOP_A.to_string()),
            env::var("BUSBOARD_STOP_B").unwrap_or_else(|_| DEFAULT_STOP_B.to_string()),
            env::var("BUSBOARD_STOP_C").unwrap_or_else(|_| DEFAULT_STOP_C.to_string()),
        );
        Ok(Self {
            upstream,
            default_codes,
            port,
        })
    }
}

struct AppState {
    client: Option<UpstreamClient>,
    default_codes: StopCodes,
    options: BoardOptions,
    port: u16,
}

impl AppState {
    fn fetch_payload(&self, codes: &StopCodes) -> ArrivalPayload {
        match &self.client {
            Some(client) => client.fetch(codes),
            None => ArrivalPayload::fallback(codes),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let cfg = ServerConfig::from_env()?;
    let client = match &cfg.upstream {
        Some(upstream) => Some(
            UpstreamClient::new(upstream, busboard::upstream::DEFAULT_TIMEOUT)
                .map_err(|e| e.to_string())?,
        ),
        None => {
            warn!("BUSBOARD_UPSTREAM not set; serving fallback boards only");
            None
        }
    };
    let state = AppState {
        client,
        default_codes: cfg.default_codes,
        options: BoardOptions::default(),
        port: cfg.port,
    };

    let listener = TcpListener::bind(("0.0.0.0", cfg.port)).map_err(|e| e.to_string())?;
    info!("busboard serving on port {}", cfg.port);

    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(err) => {
                warn!("accept error: {}", err);
                continue;
            }
        };
        if let Err(err) = stream.set_read_timeout(Some(Duration::from_secs(15))) {
            warn!("set timeout failed: {}", err);
        }
        if let Err(err) = handle_connection(&mut stream, &state) {
            warn!("request error: {}", err);
        }
    }
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    host: Option<String>,
}

fn handle_connection(stream: &mut TcpStream, state: &AppState) -> Result<(), String> {
    let req = read_http_request(stream)?;
    if req.method != "GET" {
        return write_http_response(
            stream,
            "405 Method Not Allowed",
            "application/json",
            br#"{"error":"method_not_allowed"}"#,
        );
    }

    let codes = codes_from_query(&req.query, &state.default_codes);
    match req.path.as_str() {
        "/" => write_http_response(stream, "200 OK", "text/plain; charset=utf-8", b"OK"),
        "/healthz" => write_http_response(
            stream,
            "200 OK",
            "application/json",
            br#"{"status":"ok"}"#,
        ),
        "/debug" => {
            let payload = state.fetch_payload(&codes);
            let body = serde_json::to_vec(&payload).map_err(|e| e.to_string())?;
            write_http_response(stream, "200 OK", "application/json", &body)
        }
        "/probe" => match &state.client {
            Some(client) => match client.probe(&codes) {
                Ok(report) => {
                    let body = serde_json::to_vec(&report).map_err(|e| e.to_string())?;
                    write_http_response(stream, "200 OK", "application/json", &body)
                }
                Err(err) => {
                    let body = serde_json::to_vec(&serde_json::json!({
                        "error": err.to_string(),
                    }))
                    .map_err(|e| e.to_string())?;
                    write_http_response(stream, "500 Internal Server Error", "application/json", &body)
                }
            },
            None => write_http_response(
                stream,
                "503 Service Unavailable",
                "application/json",
                br#"{"error":"upstream_not_configured"}"#,
            ),
        },
        "/plan.json" => {
            let payload = state.fetch_payload(&codes);
            let (plan, fit) = plan_board_preview(&payload, &header_text(), &state.options);
            let body = serde_json::to_vec(&serde_json::json!({
                "fit": fit,
                "plan": plan,
            }))
            .map_err(|e| e.to_string())?;
            write_http_response(stream, "200 OK", "application/json", &body)
        }
        "/image.png" => {
            let payload = state.fetch_payload(&codes);
            let board = render_board(&payload, &header_text(), &state.options)
                .map_err(|e| e.to_string())?;
            if board.using_fallback_font() {
                warn!("render used fallback fonts ({} runs)", board.text_fallbacks.total());
            }
            write_http_response(stream, "200 OK", "image/png", &board.png)
        }
        "/redirect" => {
            let body = serde_json::to_vec(&redirect_body(state, &req, &codes))
                .map_err(|e| e.to_string())?;
            write_http_response(stream, "200 OK", "application/json", &body)
        }
        "/preview" => {
            let payload = state.fetch_payload(&codes);
            let board = render_board(&payload, &header_text(), &state.options)
                .map_err(|e| e.to_string())?;
            let html = preview_html(&BASE64.encode(&board.png));
            write_http_response(stream, "200 OK", "text/html; charset=utf-8", html.as_bytes())
        }
        _ => write_http_response(
            stream,
            "404 Not Found",
            "application/json",
            br#"{"error":"not_found"}"#,
        ),
    }
}

/// Header text for the top-right corner of the board.
fn header_text() -> String {
    format!("Updated {}", Local::now().format("%H:%M"))
}

/// Fast JSON telling the TRMNL what image to fetch next and when to wake.
///
/// The filename changes once per minute so the panel does not re-flash for
/// identical renders within the same minute.
fn redirect_body(state: &AppState, req: &HttpRequest, codes: &StopCodes) -> serde_json::Value {
    let minute_bucket = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / 60)
        .unwrap_or(0);
    let host = req
        .host
        .clone()
        .unwrap_or_else(|| format!("localhost:{}", state.port));
    let url = format!(
        "http://{}/image.png?stop_a={}&stop_b={}&stop_c={}&t={}",
        host, codes.a, codes.b, codes.c, minute_bucket
    );
    serde_json::json!({
        "filename": format!("bus-{}", minute_bucket),
        "url": url,
        "refresh_rate": REFRESH_RATE_SECS,
    })
}

fn preview_html(png_base64: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><title>busboard preview</title></head>\n\
         <body style=\"background:#ddd;text-align:center\">\n\
         <img alt=\"busboard\" style=\"border:1px solid #555;margin-top:2em\" \
         src=\"data:image/png;base64,{}\">\n</body></html>\n",
        png_base64
    )
}

fn read_http_request(stream: &mut TcpStream) -> Result<HttpRequest, String> {
    let mut buf = Vec::with_capacity(2048);
    let mut chunk = [0u8; 1024];
    let mut header_end = None;

    while header_end.is_none() {
        let n = stream.read(&mut chunk).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        header_end = find_header_end(&buf);
        if buf.len() > 64 * 1024 {
            return Err("request header too large".to_string());
        }
    }
    let header_end = header_end.ok_or_else(|| "incomplete http request".to_string())?;

    let header_text = String::from_utf8_lossy(&buf[..header_end]);
    let mut lines = header_text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| "missing request line".to_string())?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| "missing method".to_string())?
        .to_string();
    let target = parts.next().ok_or_else(|| "missing path".to_string())?;

    let mut host = None;
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("host") {
                host = Some(value.trim().to_string());
            }
        }
    }

    let (path, query) = split_target(target);
    Ok(HttpRequest {
        method,
        path,
        query,
        host,
    })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, raw_query)) => (path.to_string(), parse_query(raw_query)),
        None => (target.to_string(), Vec::new()),
    }
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn codes_from_query(query: &[(String, String)], defaults: &StopCodes) -> StopCodes {
    StopCodes::new(
        query_value(query, "stop_a").unwrap_or(&defaults.a),
        query_value(query, "stop_b").unwrap_or(&defaults.b),
        query_value(query, "stop_c").unwrap_or(&defaults.c),
    )
}

fn write_http_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), String> {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream
        .write_all(header.as_bytes())
        .map_err(|e| e.to_string())?;
    stream.write_all(body).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_overrides_default_codes() {
        let defaults = StopCodes::new("1", "2", "3");
        let query = parse_query("stop_a=100&stop_c=300&noise");
        let codes = codes_from_query(&query, &defaults);
        assert_eq!(codes.a, "100");
        assert_eq!(codes.b, "2");
        assert_eq!(codes.c, "300");
    }

    #[test]
    fn blank_query_values_fall_back() {
        let defaults = StopCodes::new("1", "2", "3");
        let query = parse_query("stop_a=&stop_b=%20");
        let codes = codes_from_query(&query, &defaults);
        assert_eq!(codes.a, "1");
        // Percent-encoding is not expanded; a literal non-empty value wins.
        assert_eq!(codes.b, "%20");
    }

    #[test]
    fn split_target_separates_path_and_query() {
        let (path, query) = split_target("/image.png?stop_a=5&t=12");
        assert_eq!(path, "/image.png");
        assert_eq!(query.len(), 2);
        assert_eq!(query_value(&query, "t"), Some("12"));
    }

    #[test]
    fn header_end_detection() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\n"), Some(14));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n"), None);
    }

    #[test]
    fn redirect_contract_names_a_minute_bucketed_image() {
        let state = AppState {
            client: None,
            default_codes: StopCodes::new("45379", "45489", "45371"),
            options: BoardOptions::default(),
            port: 10000,
        };
        let req = HttpRequest {
            method: "GET".to_string(),
            path: "/redirect".to_string(),
            query: Vec::new(),
            host: Some("board.example:10000".to_string()),
        };
        let codes = state.default_codes.clone();
        let body = redirect_body(&state, &req, &codes);

        let filename = body["filename"].as_str().expect("filename");
        assert!(filename.starts_with("bus-"));
        let url = body["url"].as_str().expect("url");
        assert!(url.starts_with("http://board.example:10000/image.png?"));
        assert!(url.contains("stop_a=45379"));
        assert!(url.contains("stop_c=45371"));
        assert_eq!(body["refresh_rate"].as_u64(), Some(REFRESH_RATE_SECS));
    }
}
