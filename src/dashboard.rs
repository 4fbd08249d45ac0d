//! The literal `/stats` and `/dashboard` bodies this crate is responsible
//! for (§1: richer dashboards are a consumer's concern, but this server
//! still owns the baseline formatter).

use crate::stats::StatsSnapshot;

/// Minimal JSON rendering of a [`StatsSnapshot`]. Hand-written rather than
/// pulled through `serde_json` since the field set is small and fixed;
/// consumers wanting a typed client can still parse this JSON freely.
pub fn stats_json(snapshot: &StatsSnapshot) -> String {
    format!(
        "{{\"total_requests\":{},\"completed_requests\":{},\"bytes_transferred\":{},\
\"total_response_time_seconds\":{},\"status_200\":{},\"status_206\":{},\"status_400\":{},\
\"status_403\":{},\"status_404\":{},\"status_416\":{},\"status_500\":{},\"status_501\":{},\
\"status_503\":{},\"active_connections\":{},\"uptime_seconds\":{}}}",
        snapshot.total_requests,
        snapshot.completed_requests,
        snapshot.bytes_transferred,
        snapshot.total_response_time_seconds,
        snapshot.status_200,
        snapshot.status_206,
        snapshot.status_400,
        snapshot.status_403,
        snapshot.status_404,
        snapshot.status_416,
        snapshot.status_500,
        snapshot.status_501,
        snapshot.status_503,
        snapshot.active_connections,
        snapshot.uptime_seconds,
    )
}

pub const DASHBOARD_HTML: &str = "<html><head><title>Server Dashboard</title></head>\
<body><h1>Server Dashboard</h1><p>Live counters are available at <a href=\"/stats\">/stats</a>.</p>\
</body></html>";
