use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// One request as seen by the stub server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Canned reply the stub sends for every request.
#[derive(Debug, Clone, Copy)]
pub struct StubResponse {
    pub status: u16,
    pub reason: &'static str,
    pub body: &'static str,
}

impl StubResponse {
    pub const OK: Self = Self {
        status: 200,
        reason: "OK",
        body: r#"{"data":[{"id":1}],"error":null}"#,
    };
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    recorded: Recorded,
}

impl ServerHandle {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        match self.recorded.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a stub API that records every request and answers with a small
/// JSON payload (`{"data":[{"id":1}],"error":null}`).
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server() -> Result<(String, ServerHandle), String> {
    spawn_http_server_with(StubResponse::OK)
}

/// Spawn a stub API that answers every request with `response`.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server_with(
    response: StubResponse,
) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let sink = Arc::clone(&sink);
                    thread::spawn(move || handle_client(stream, &sink, response));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            recorded,
        },
    ))
}

/// Like [`spawn_http_server`], but skips in sandboxes that forbid sockets.
///
/// # Errors
///
/// Returns any failure other than a permission error.
pub fn spawn_http_server_or_skip() -> Result<Option<(String, ServerHandle)>, String> {
    spawn_http_server_with_or_skip(StubResponse::OK)
}

/// Like [`spawn_http_server_with`], but skips in sandboxes that forbid sockets.
///
/// # Errors
///
/// Returns any failure other than a permission error.
pub fn spawn_http_server_with_or_skip(
    response: StubResponse,
) -> Result<Option<(String, ServerHandle)>, String> {
    match spawn_http_server_with(response) {
        Ok(result) => Ok(Some(result)),
        Err(err) if err.contains("Operation not permitted") => {
            eprintln!("Skipping e2e test: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn handle_client(mut stream: TcpStream, sink: &Recorded, response: StubResponse) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    match sink.lock() {
        Ok(mut requests) => requests.push(request),
        Err(poisoned) => poisoned.into_inner().push(request),
    }

    let body = response.body.as_bytes();
    let head = format!(
        concat!(
            "HTTP/1.1 {} {}\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: {}\r\n",
            "Connection: close\r\n\r\n"
        ),
        response.status,
        response.reason,
        body.len()
    );
    if stream.write_all(head.as_bytes()).is_err() || stream.write_all(body).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            return None;
        }
        raw.extend_from_slice(chunk.get(..read)?);
        if let Some(position) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break position;
        }
    };

    let head = String::from_utf8_lossy(raw.get(..header_end)?).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_owned();
    let target = request_line.next()?.to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body_read = raw.len().saturating_sub(header_end.saturating_add(4));
    while body_read < content_length {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            break;
        }
        body_read = body_read.saturating_add(read);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
    })
}

/// Run the `media-e2e` binary in `dir` with `stdin` piped in.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_media_e2e<I, S>(
    dir: &Path,
    args: I,
    envs: &[(&str, &str)],
    stdin: &str,
) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = media_e2e_bin()?;
    let mut command = Command::new(bin);
    command
        .args(args)
        .current_dir(dir)
        .env_remove("BASE")
        .env_remove("KEY")
        .env_remove("VERBOSE")
        .env("RUST_LOG", "error")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        command.env(key, value);
    }
    let mut child = command
        .spawn()
        .map_err(|err| format!("run media-e2e failed: {}", err))?;
    if let Some(mut input) = child.stdin.take() {
        input
            .write_all(stdin.as_bytes())
            .map_err(|err| format!("write stdin failed: {}", err))?;
    }
    child
        .wait_with_output()
        .map_err(|err| format!("wait for media-e2e failed: {}", err))
}

fn media_e2e_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_media-e2e").map_or_else(
        || Err("CARGO_BIN_EXE_media-e2e missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
