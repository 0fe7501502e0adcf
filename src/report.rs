//! Aggregation of per-endpoint results into the final session report

use serde::Serialize;
use std::fmt;

use crate::checksum::Digest;
use crate::client::EndpointResult;
use crate::counter::{FrequencyTable, WordCount};
use crate::endpoint::Endpoint;

#[derive(Debug)]
pub struct SessionReport {
    /// Sum of every successful endpoint's table
    pub global: FrequencyTable,
    pub top: Vec<WordCount>,
    /// One entry per configured endpoint, in configuration order
    pub endpoints: Vec<EndpointResult>,
}

/// The single merge point. Successful and degraded endpoints contribute;
/// failed ones keep whatever partial table they carry for reporting only.
pub fn aggregate(results: Vec<EndpointResult>, top_k: usize) -> SessionReport {
    let mut global = FrequencyTable::new();
    for table in results.iter().filter_map(EndpointResult::contributing_table) {
        global.merge(table);
    }
    let top = global.top_k(top_k);
    SessionReport {
        global,
        top,
        endpoints: results,
    }
}

impl SessionReport {
    pub fn all_succeeded(&self) -> bool {
        self.endpoints.iter().all(EndpointResult::is_success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &EndpointResult> {
        self.endpoints.iter().filter(|r| r.is_success())
    }

    pub fn degraded(&self) -> impl Iterator<Item = &EndpointResult> {
        self.endpoints.iter().filter(|r| r.is_degraded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EndpointResult> {
        self.endpoints.iter().filter(|r| r.is_failure())
    }

    /// No endpoint failed outright; degraded ones are tolerated
    pub fn no_failures(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn endpoint(&self, endpoint: &Endpoint) -> Option<&EndpointResult> {
        self.endpoints.iter().find(|r| &r.endpoint == endpoint)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ReportView::from(self))
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    top: &'a [WordCount],
    global: &'a FrequencyTable,
    endpoints: Vec<EndpointView<'a>>,
}

#[derive(Serialize)]
struct EndpointView<'a> {
    endpoint: &'a Endpoint,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_received: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<&'a Digest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches_expected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<&'a FrequencyTable>,
}

impl<'a> From<&'a SessionReport> for ReportView<'a> {
    fn from(report: &'a SessionReport) -> Self {
        let endpoints = report
            .endpoints
            .iter()
            .map(|r| {
                let transfer = match &r.outcome {
                    Ok(t) => Some(t),
                    Err(e) => e.partial(),
                };
                EndpointView {
                    endpoint: &r.endpoint,
                    status: if r.is_degraded() {
                        "degraded"
                    } else {
                        r.error().map(|e| e.kind()).unwrap_or("ok")
                    },
                    error: r.error().map(|e| e.to_string()),
                    elapsed_ms: r.elapsed.as_millis() as u64,
                    bytes_received: transfer.map(|t| t.bytes_received),
                    checksum: transfer.map(|t| &t.computed_checksum),
                    matches_expected: transfer.map(|t| t.matches_expected),
                    table: transfer.map(|t| &t.table),
                }
            })
            .collect();
        ReportView {
            top: &report.top,
            global: &report.global,
            endpoints,
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counted = self.succeeded().count() + self.degraded().count();
        writeln!(
            f,
            "Top {} words across {} of {} endpoints ({} words total):",
            self.top.len(),
            counted,
            self.endpoints.len(),
            self.global.total()
        )?;
        for wc in &self.top {
            writeln!(f, "  {}: {}", wc.word, wc.count)?;
        }

        writeln!(f, "Endpoints:")?;
        for r in &self.endpoints {
            match &r.outcome {
                Ok(t) => writeln!(
                    f,
                    "  {}  ok  {} bytes  {} {}  {} words in {:.1}s",
                    r.endpoint,
                    t.bytes_received,
                    t.algorithm,
                    t.computed_checksum,
                    t.table.total(),
                    r.elapsed.as_secs_f64()
                )?,
                Err(e) if r.is_degraded() => {
                    writeln!(f, "  {}  degraded  {}", r.endpoint, e)?;
                    if let Some(t) = e.partial() {
                        writeln!(
                            f,
                            "      counted: {} bytes, {} words up to the bad bytes",
                            t.bytes_received,
                            t.table.total()
                        )?;
                    }
                }
                Err(e) => {
                    writeln!(f, "  {}  FAILED ({})  {}", r.endpoint, e.kind(), e)?;
                    if let Some(t) = e.partial() {
                        writeln!(
                            f,
                            "      partial: {} bytes, {} words (excluded from totals)",
                            t.bytes_received,
                            t.table.total()
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}
