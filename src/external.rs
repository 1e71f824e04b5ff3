//! Best-effort reachability checks for http(s) links.
//!
//! Off by default. Every distinct URL is requested once, with at most
//! `concurrency` requests in flight and a per-request timeout. A response
//! status of 400 or above is a `broken-external` issue; a request that never
//! got a response is `external-unreachable`.

use crate::config::ExternalConfig;
use crate::corpus::CorpusIndex;
use crate::parser::LinkTarget;
use crate::pool::map_ordered;
use crate::report::{IssueKind, ValidationIssue};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Result of requesting one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Ok,
    Status(u16),
    Unreachable(String),
}

/// Where a URL was linked from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub file: PathBuf,
    pub line: usize,
}

/// Distinct http(s) URLs in the corpus with every place they appear.
///
/// Fragments are dropped, so `a#x` and `a#y` are one request.
pub fn collect_urls(index: &CorpusIndex) -> BTreeMap<String, Vec<Occurrence>> {
    let mut urls: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();
    for doc in index.documents() {
        for link in &doc.links {
            let LinkTarget::External(url) = &link.target else {
                continue;
            };
            if !is_http(url) {
                continue;
            }
            let url = url.split_once('#').map_or(url.as_str(), |(base, _)| base);
            urls.entry(url.to_string()).or_default().push(Occurrence {
                file: doc.path.clone(),
                line: link.line,
            });
        }
    }
    urls
}

fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Request every URL over HTTP and report the failures.
pub fn check_external(index: &CorpusIndex, config: &ExternalConfig) -> Vec<ValidationIssue> {
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirects(5)
        .user_agent(concat!("mdlinkcheck/", env!("CARGO_PKG_VERSION")))
        .build();
    check_with(index, config.concurrency, |url| probe_http(&agent, url))
}

/// Run `probe` over every distinct URL and turn failures into issues.
pub fn check_with<P>(index: &CorpusIndex, concurrency: usize, probe: P) -> Vec<ValidationIssue>
where
    P: Fn(&str) -> Probe + Sync,
{
    let urls: Vec<(String, Vec<Occurrence>)> = collect_urls(index).into_iter().collect();
    debug!(urls = urls.len(), concurrency, "checking external links");
    let probes = map_ordered(&urls, concurrency, |(url, _)| probe(url.as_str()));

    let mut issues = Vec::new();
    for ((url, occurrences), result) in urls.iter().zip(probes) {
        let (kind, detail) = match result {
            Probe::Ok => continue,
            Probe::Status(code) => (
                IssueKind::BrokenExternal,
                format!("link to `{url}` returned HTTP {code}"),
            ),
            Probe::Unreachable(reason) => (
                IssueKind::ExternalUnreachable,
                format!("link to `{url}` could not be reached: {reason}"),
            ),
        };
        for occurrence in occurrences {
            issues.push(ValidationIssue::new(
                kind,
                &occurrence.file,
                occurrence.line,
                detail.clone(),
            ));
        }
    }
    issues
}

/// `HEAD` first; servers that refuse it get a `GET`.
pub fn probe_http(agent: &ureq::Agent, url: &str) -> Probe {
    match agent.head(url).call() {
        Ok(_) => Probe::Ok,
        Err(ureq::Error::Status(405 | 501, _)) => match agent.get(url).call() {
            Ok(_) => Probe::Ok,
            Err(err) => classify(err),
        },
        Err(err) => classify(err),
    }
}

fn classify(err: ureq::Error) -> Probe {
    match err {
        ureq::Error::Status(code, _) => Probe::Status(code),
        ureq::Error::Transport(transport) => Probe::Unreachable(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::Path;

    fn corpus() -> CorpusIndex {
        CorpusIndex::from_sources(
            Path::new("/corpus"),
            &[
                (
                    "a.md",
                    "# A\n[ok](https://ok.test/)\n[gone](https://gone.test/page#x)\n[mail](mailto:a@b.c)\n",
                ),
                ("b.md", "# B\n\n[gone again](https://gone.test/page#y)\n[down](http://down.test)\n"),
            ],
            &[],
        )
    }

    #[test]
    fn test_collect_dedups_and_skips_non_http() {
        let urls = collect_urls(&corpus());
        let keys: Vec<_> = urls.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["http://down.test", "https://gone.test/page", "https://ok.test/"]
        );
        assert_eq!(urls["https://gone.test/page"].len(), 2);
    }

    #[test]
    fn test_failures_reported_at_every_occurrence() {
        let issues = check_with(&corpus(), 2, |url| match url {
            "https://gone.test/page" => Probe::Status(404),
            "http://down.test" => Probe::Unreachable("connection refused".to_string()),
            _ => Probe::Ok,
        });
        let summary: Vec<_> = issues
            .iter()
            .map(|i| (i.kind, i.file.file_name().unwrap().to_str().unwrap(), i.line))
            .collect();
        assert_eq!(
            summary,
            vec![
                (IssueKind::ExternalUnreachable, "b.md", 4),
                (IssueKind::BrokenExternal, "a.md", 3),
                (IssueKind::BrokenExternal, "b.md", 3),
            ]
        );
        assert_eq!(issues[1].detail, "link to `https://gone.test/page` returned HTTP 404");
    }

    #[test]
    fn test_probe_http_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        let result = probe_http(&agent, &format!("http://{addr}/missing"));
        server.join().unwrap();
        assert_eq!(result, Probe::Status(404));
    }

    #[test]
    fn test_refused_connection_is_unreachable() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        assert!(matches!(
            probe_http(&agent, &format!("http://{addr}/")),
            Probe::Unreachable(_)
        ));
    }
}
