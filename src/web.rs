//! REST façade for the linker.
//!
//! POST bodies are UTF-8 text; responses are JSON arrays of mention
//! records. All errors surface as plain-text 500s.

use std::io::{Cursor, Read};

use linker::{LinkError, Semanticizer};
use log::error;
use storage::Settings;
use tiny_http::{Header, Method, Request, Response, Server};

/// Which linker operation an endpoint serves. Dispatching on this at the
/// handler boundary keeps a single request path for both endpoints.
#[derive(Clone, Copy, Debug)]
enum ServeMode {
    All,
    ExactMatch,
}

fn mention_json(sem: &Semanticizer, mode: ServeMode, body: &str) -> Result<String, LinkError> {
    let cands = match mode {
        ServeMode::All => sem.all(body)?,
        ServeMode::ExactMatch => sem.exact_match(body)?,
    };
    // An empty Vec renders as [], never null. Non-finite probabilities
    // render as null, which serde_json handles without failing.
    Ok(serde_json::to_string(&cands).unwrap_or_else(|_| "[]".to_owned()))
}

fn info_html(settings: &Settings) -> String {
    format!(
        "<html>\n<head><title>wikilinker</title></head>\n  <body>\n    <h1>wikilinker</h1>\n    <p>\n      Serving <code>{}</code>\n      with maximum n-gram length {}.\n    </p>\n    <p>Endpoints take text via POST requests and produce JSON:\n      <ul>\n        <li><code>/all</code> gives all candidate entities</li>\n        <li><code>/exactmatch</code> gives entities whose anchor is the whole input</li>\n      </ul>\n    </p>\n  </body>\n</html>\n",
        settings.dump_name, settings.max_ngram
    )
}

fn header(field: &[u8], value: &[u8]) -> Header {
    // Infallible for the static names and values used below.
    Header::from_bytes(field, value).unwrap_or_else(|_| unreachable!())
}

fn plain_error(message: String) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(message).with_status_code(500)
}

fn entities_response(
    request: &mut Request,
    sem: &Semanticizer,
    mode: ServeMode,
) -> Response<Cursor<Vec<u8>>> {
    let mut body = String::new();
    if let Err(err) = request.as_reader().read_to_string(&mut body) {
        return plain_error(err.to_string());
    }
    if body.is_empty() {
        return plain_error("received no data".to_owned());
    }
    match mention_json(sem, mode, &body) {
        Ok(json) => Response::from_string(json)
            .with_header(header(b"Content-Type", b"application/json")),
        Err(err) => plain_error(err.to_string()),
    }
}

fn route(
    request: &mut Request,
    sem: &Semanticizer,
    settings: &Settings,
) -> Response<Cursor<Vec<u8>>> {
    match (request.method(), request.url()) {
        (&Method::Post, "/all") => entities_response(request, sem, ServeMode::All),
        (&Method::Post, "/exactmatch") => entities_response(request, sem, ServeMode::ExactMatch),
        (_, "/") => Response::from_string(info_html(settings))
            .with_header(header(b"Content-Type", b"text/html; charset=utf-8")),
        _ => Response::from_string("not found\n").with_status_code(404),
    }
}

/// Serve linker requests until the process is terminated.
pub fn serve(server: &Server, sem: &Semanticizer, settings: &Settings) {
    for mut request in server.incoming_requests() {
        let response = route(&mut request, sem, settings);
        if let Err(err) = request.respond(response) {
            error!("failed to send response: {}", err);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_info_html_reports_settings() {
        let settings = Settings {
            dump_name: "nlwiki-latest".to_owned(),
            max_ngram: 7,
        };
        let html = info_html(&settings);
        assert!(html.contains("nlwiki-latest"));
        assert!(html.contains("maximum n-gram length 7"));
    }
}
