//! Live-reload development server.
//!
//! Serves the generated site over HTTP. HTML pages get a small client script
//! injected before `</body>` that listens on a server-sent event stream and
//! reloads the page when [`LiveServer::reload`] is called.

use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use warp::path::Tail;
use warp::{Filter, Rejection, Reply};

/// Path of the server-sent event stream used by the reload client.
pub const LIVERELOAD_PATH: &str = "__livereload";

const RELOAD_CLIENT: &str = "<script>new EventSource('/__livereload')\
.addEventListener('reload',function(){location.reload()});</script>";

/// Error starting the server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid listen address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("listen address '{0}' did not resolve")]
    Unresolved(String),
    #[error("failed to start server runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

/// A running live-reload server.
///
/// The server runs on its own tokio runtime and stops when dropped.
pub struct LiveServer {
    addr: SocketAddr,
    reload: broadcast::Sender<()>,
    _runtime: Runtime,
}

impl LiveServer {
    /// Serve `root` on `host:port`. Port 0 picks a free port.
    pub fn start(root: &Path, host: &str, port: u16) -> Result<Self, ServeError> {
        let address = format!("{}:{}", host, port);
        let requested = (host, port)
            .to_socket_addrs()
            .map_err(|source| ServeError::Address { address: address.clone(), source })?
            .next()
            .ok_or(ServeError::Unresolved(address))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("sitekit-serve")
            .enable_all()
            .build()
            .map_err(ServeError::Runtime)?;

        let (reload, _) = broadcast::channel(16);
        let filter = routes(root.to_path_buf(), reload.clone());

        let addr = {
            let _guard = runtime.enter();
            let (addr, server) = warp::serve(filter)
                .try_bind_ephemeral(requested)
                .map_err(|source| ServeError::Bind { addr: requested, source })?;
            runtime.spawn(server);
            addr
        };
        log::info!("serving {} at http://{}", root.display(), addr);

        Ok(Self { addr, reload, _runtime: runtime })
    }

    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Tell connected browsers to reload. Returns how many were listening.
    pub fn reload(&self) -> usize {
        self.reload.send(()).unwrap_or(0)
    }
}

fn routes(
    root: PathBuf,
    reload: broadcast::Sender<()>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let events = warp::path(LIVERELOAD_PATH).and(warp::path::end()).and(warp::get()).map(
        move || {
            let stream = BroadcastStream::new(reload.subscribe()).filter_map(|message| {
                message.ok().map(|()| {
                    Ok::<_, Infallible>(warp::sse::Event::default().event("reload").data("reload"))
                })
            });
            warp::sse::reply(warp::sse::keep_alive().stream(stream))
        },
    );

    let page_root = root.clone();
    let pages = warp::get()
        .and(warp::path::tail())
        .and_then(move |tail: Tail| serve_page(page_root.clone(), tail));

    events.or(pages).or(warp::fs::dir(root))
}

async fn serve_page(root: PathBuf, tail: Tail) -> Result<warp::reply::Html<String>, Rejection> {
    let path = resolve_page(&root, tail.as_str()).ok_or_else(warp::reject::not_found)?;
    let html = tokio::fs::read_to_string(&path).await.map_err(|_| warp::reject::not_found())?;
    Ok(warp::reply::html(inject_reload_client(&html)))
}

/// Map a request path to the HTML file that answers it, if there is one.
///
/// The tail is percent-decoded first. Directories resolve to their
/// `index.html` and extensionless paths to `<path>.html`.
fn resolve_page(root: &Path, tail: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(tail).decode_utf8().ok()?;
    let tail: &str = &decoded;
    if !Path::new(tail).components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }

    let mut path = root.join(tail);
    if tail.is_empty() || tail.ends_with('/') || path.is_dir() {
        path.push("index.html");
    } else if path.extension().is_none() {
        path.set_extension("html");
    }

    let is_html = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    (is_html && path.is_file()).then_some(path)
}

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_reload_client(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + RELOAD_CLIENT.len());
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => {
            out.push_str(&html[..index]);
            out.push_str(RELOAD_CLIENT);
            out.push_str(&html[index..]);
        }
        None => {
            out.push_str(html);
            out.push_str(RELOAD_CLIENT);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("2019/post")).unwrap();
        fs::write(temp.path().join("index.html"), "<html><body><h1>Home</h1></body></html>")
            .unwrap();
        fs::write(temp.path().join("about.html"), "<p>About</p>").unwrap();
        fs::write(temp.path().join("2019/post/index.html"), "<body>post</body>").unwrap();
        fs::write(temp.path().join("app.min.css"), "body{margin:0}").unwrap();
        temp
    }

    fn get(server: &LiveServer, path: &str) -> String {
        let mut stream = TcpStream::connect(server.addr()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path)
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_inject_reload_client() {
        let html = inject_reload_client("<html><BODY>x</BODY></html>");
        assert!(html.starts_with("<html><BODY>x<script>"));
        assert!(html.ends_with("</script></BODY></html>"));

        let fragment = inject_reload_client("<p>x</p>");
        assert!(fragment.starts_with("<p>x</p><script>"));
    }

    #[test]
    fn test_resolve_page() {
        let temp = site();
        let root = temp.path();
        assert_eq!(resolve_page(root, ""), Some(root.join("index.html")));
        assert_eq!(resolve_page(root, "about"), Some(root.join("about.html")));
        assert_eq!(resolve_page(root, "2019/post/"), Some(root.join("2019/post/index.html")));
        assert_eq!(resolve_page(root, "2019/post"), Some(root.join("2019/post/index.html")));
        assert_eq!(resolve_page(root, "app.min.css"), None);
        assert_eq!(resolve_page(root, "missing.html"), None);
        assert_eq!(resolve_page(root, "../index.html"), None);
    }

    #[test]
    fn test_resolve_page_decodes_escapes() {
        let temp = site();
        let root = temp.path();
        fs::write(root.join("中文.html"), "<p>中文</p>").unwrap();
        fs::write(root.join("hello world.html"), "<p>hi</p>").unwrap();

        assert_eq!(resolve_page(root, "%E4%B8%AD%E6%96%87.html"), Some(root.join("中文.html")));
        assert_eq!(resolve_page(root, "%E4%B8%AD%E6%96%87"), Some(root.join("中文.html")));
        assert_eq!(resolve_page(root, "hello%20world"), Some(root.join("hello world.html")));
        assert_eq!(resolve_page(root, "%2E%2E/index.html"), None);
        assert_eq!(resolve_page(root, "%2Fetc%2Fpasswd"), None);
        assert_eq!(resolve_page(root, "%FF.html"), None);
    }

    #[test]
    fn test_serves_escaped_pages_with_reload_client() {
        let temp = site();
        fs::write(temp.path().join("中文.html"), "<body><p>中文</p></body>").unwrap();
        let server = LiveServer::start(temp.path(), "127.0.0.1", 0).unwrap();

        let response = get(&server, "/%E4%B8%AD%E6%96%87.html");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("</p><script>new EventSource('/__livereload')"));
    }

    #[test]
    fn test_serves_pages_with_reload_client() {
        let temp = site();
        let server = LiveServer::start(temp.path(), "127.0.0.1", 0).unwrap();
        assert_ne!(server.addr().port(), 0);

        let response = get(&server, "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>Home</h1><script>new EventSource('/__livereload')"));

        let response = get(&server, "/about");
        assert!(response.contains("<p>About</p><script>"));
    }

    #[test]
    fn test_serves_assets_untouched() {
        let temp = site();
        let server = LiveServer::start(temp.path(), "127.0.0.1", 0).unwrap();

        let response = get(&server, "/app.min.css");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("body{margin:0}"));

        let response = get(&server, "/nope.png");
        assert!(response.starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn test_reload_reaches_event_stream() {
        let temp = site();
        let server = LiveServer::start(temp.path(), "127.0.0.1", 0).unwrap();

        let mut stream = TcpStream::connect(server.addr()).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
        write!(stream, "GET /__livereload HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while Instant::now() < deadline {
            server.reload();
            if let Ok(n) = stream.read(&mut buf) {
                received.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&received);
            if text.contains("event:reload") || text.contains("event: reload") {
                break;
            }
        }

        let text = String::from_utf8_lossy(&received);
        assert!(text.contains("text/event-stream"), "{}", text);
        assert!(text.contains("reload"), "{}", text);
    }

    #[test]
    fn test_reload_without_clients() {
        let temp = site();
        let server = LiveServer::start(temp.path(), "127.0.0.1", 0).unwrap();
        assert_eq!(server.reload(), 0);
        assert!(server.url().starts_with("http://127.0.0.1:"));
    }
}
