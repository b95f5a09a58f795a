//! Live/replay show listing for the home page.
//!
//! Pure view-model over the Mux listing endpoints: filter to watchable
//! entries, derive titles and thumbnails, format durations. Remote problems
//! degrade to an empty list; the page renders "no shows" instead of an error.

use chrono::{DateTime, Datelike, Utc};
use tracing::warn;

use crate::api::types::{AssetInfo, LiveStreamInfo};
use crate::api::ApiClient;

const THUMBNAIL_FALLBACK: &str =
    "https://res.cloudinary.com/haymzm4wp/image/upload/v1760105848/bi5ej2hgh0cc2uowu5xr.jpg";

/// How many replays the home page shows.
const REPLAY_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveShow {
    pub id: String,
    pub title: String,
    pub playback_id: String,
    pub thumbnail: String,
    pub stream_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayShow {
    pub id: String,
    pub title: String,
    pub playback_id: String,
    pub thumbnail: String,
    pub replay_url: String,
    /// `M:SS`, or `N/A` when the asset carries no duration.
    pub duration: String,
    pub recorded_at: DateTime<Utc>,
}

/// Listing fetcher; typically driven by a [`Poller`](crate::poller::Poller)
/// on the home page's refresh interval.
#[derive(Clone)]
pub struct ShowListing {
    api: ApiClient,
}

impl ShowListing {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Currently watchable live shows: `active` streams with an encoder
    /// connected and a playback id.
    pub async fn live_shows(&self) -> Vec<LiveShow> {
        self.live_shows_at(Utc::now()).await
    }

    /// Clock-injected form of [`live_shows`](Self::live_shows); `now` only
    /// feeds the derived show title.
    pub async fn live_shows_at(&self, now: DateTime<Utc>) -> Vec<LiveShow> {
        let response = match self.api.live_streams().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "live stream listing failed");
                return Vec::new();
            }
        };
        if !response.success {
            warn!(message = response.message.as_deref(), "live stream listing rejected");
            return Vec::new();
        }

        response
            .data
            .map(|page| page.data)
            .unwrap_or_default()
            .into_iter()
            .filter(|stream| stream.status == "active" && stream.connected)
            .filter_map(|stream| live_show_from(stream, now))
            .collect()
    }

    /// Finished replays, newest first, capped at six.
    pub async fn replay_shows(&self) -> Vec<ReplayShow> {
        let response = match self.api.assets().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "replay listing failed");
                return Vec::new();
            }
        };
        if !response.success {
            warn!(message = response.message.as_deref(), "replay listing rejected");
            return Vec::new();
        }

        let mut replays: Vec<ReplayShow> = response
            .data
            .map(|page| page.data)
            .unwrap_or_default()
            .into_iter()
            .filter(|asset| asset.status == "ready")
            .filter_map(replay_show_from)
            .collect();

        replays.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        replays.truncate(REPLAY_LIMIT);
        replays
    }
}

fn live_show_from(stream: LiveStreamInfo, now: DateTime<Utc>) -> Option<LiveShow> {
    let playback_id = stream.playback_ids.first()?.id.clone();
    Some(LiveShow {
        id: stream.id,
        title: format!("Show {}", short_date(now)),
        thumbnail: thumbnail_for(&playback_id),
        stream_url: format!("/live/{playback_id}"),
        playback_id,
    })
}

fn replay_show_from(asset: AssetInfo) -> Option<ReplayShow> {
    let playback_id = asset.playback_ids.first()?.id.clone();

    let recorded_raw = asset
        .recording_times
        .first()
        .and_then(|times| times.started_at.clone())
        .or_else(|| asset.created_at.clone())?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()?;

    let duration_seconds = asset
        .recording_times
        .first()
        .and_then(|times| times.duration)
        .or(asset.duration);

    Some(ReplayShow {
        id: asset.id,
        title: format!("Replay {}", short_date(recorded_at)),
        thumbnail: thumbnail_for(&playback_id),
        replay_url: format!("/replay/{playback_id}"),
        duration: format_duration(duration_seconds),
        recorded_at,
        playback_id,
    })
}

/// `DD-MM-YY`, the storefront's show-title date format.
fn short_date(date: DateTime<Utc>) -> String {
    format!(
        "{:02}-{:02}-{:02}",
        date.day(),
        date.month(),
        date.year() % 100
    )
}

fn thumbnail_for(playback_id: &str) -> String {
    if playback_id.is_empty() {
        THUMBNAIL_FALLBACK.to_string()
    } else {
        format!("https://image.mux.com/{playback_id}/thumbnail.jpg?time=0")
    }
}

fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            let total = seconds as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use anyhow::Result;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_for(server: &MockServer) -> Result<ShowListing> {
        let config = Config::new()
            .with_api_base(server.uri())
            .with_verify_base(server.uri());
        Ok(ShowListing::new(ApiClient::new(config)?))
    }

    #[test]
    fn test_short_date() {
        let date = Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap();
        assert_eq!(short_date(date), "05-08-26");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(754.9)), "12:34");
        assert_eq!(format_duration(Some(59.0)), "0:59");
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(-1.0)), "N/A");
    }

    #[tokio::test]
    async fn test_live_shows_filter_and_map() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mux/live-streams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "data": [
                    {
                        "id": "ls1",
                        "status": "active",
                        "connected": true,
                        "playback_ids": [ { "id": "pb1" } ]
                    },
                    {
                        "id": "ls2",
                        "status": "active",
                        "connected": false,
                        "playback_ids": [ { "id": "pb2" } ]
                    },
                    {
                        "id": "ls3",
                        "status": "idle",
                        "connected": true,
                        "playback_ids": [ { "id": "pb3" } ]
                    },
                    {
                        "id": "ls4",
                        "status": "active",
                        "connected": true,
                        "playback_ids": []
                    }
                ] }
            })))
            .mount(&server)
            .await;

        let listing = listing_for(&server)?;
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 19, 0, 0).unwrap();
        let shows = listing.live_shows_at(now).await;

        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].id, "ls1");
        assert_eq!(shows[0].title, "Show 30-08-26");
        assert_eq!(shows[0].stream_url, "/live/pb1");
        assert_eq!(
            shows[0].thumbnail,
            "https://image.mux.com/pb1/thumbnail.jpg?time=0"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_replay_shows_sorted_and_capped() -> Result<()> {
        let server = MockServer::start().await;
        let mut assets = Vec::new();
        for index in 0..8 {
            assets.push(json!({
                "id": format!("asset{index}"),
                "status": "ready",
                "playback_ids": [ { "id": format!("pb{index}") } ],
                "created_at": format!("2026-08-{:02}T12:00:00Z", index + 1),
                "recording_times": [
                    { "started_at": format!("2026-08-{:02}T12:00:00Z", index + 1), "duration": 90.0 }
                ]
            }));
        }
        assets.push(json!({
            "id": "skipped",
            "status": "preparing",
            "playback_ids": [ { "id": "pbX" } ],
            "created_at": "2026-08-20T12:00:00Z"
        }));

        Mock::given(method("GET"))
            .and(path("/api/mux/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "data": assets }
            })))
            .mount(&server)
            .await;

        let listing = listing_for(&server)?;
        let replays = listing.replay_shows().await;

        assert_eq!(replays.len(), 6);
        assert_eq!(replays[0].id, "asset7");
        assert_eq!(replays[5].id, "asset2");
        assert_eq!(replays[0].title, "Replay 08-08-26");
        assert_eq!(replays[0].duration, "1:30");
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_failure_degrades_to_empty() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mux/live-streams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "upstream unavailable"
            })))
            .mount(&server)
            .await;
        // /api/mux/assets not mounted: transport-level failure

        let listing = listing_for(&server)?;
        assert!(listing.live_shows().await.is_empty());
        assert!(listing.replay_shows().await.is_empty());
        Ok(())
    }
}
