//! Fixed media configuration shared by every room.
//!
//! Nothing here varies per room. Values can be overridden through the `profile`
//! config section, otherwise the defaults below are used.

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub transcode: TranscodeProfile,
    pub packaging: PackagingProfile,
    pub cache: CacheProfile,
}

/// Single H.264 video track plus a single AAC audio track.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    pub output_name: String,
    pub width: i32,
    pub height: i32,
    pub framerate_numerator: i32,
    pub framerate_denominator: i32,
    /// GOP size in frames.
    pub gop_size: f64,
    pub gop_num_b_frames: i32,
    pub video_bitrate: i32,
    pub sharpness: i32,
    pub audio_bitrate: f64,
    pub audio_sample_rate: f64,
    pub audio_selector_name: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            output_name: "1080p30".to_owned(),
            width: 1920,
            height: 1080,
            framerate_numerator: 30,
            framerate_denominator: 1,
            gop_size: 90.0,
            gop_num_b_frames: 2,
            video_bitrate: 5_000_000,
            sharpness: 50,
            audio_bitrate: 192_000.0,
            audio_sample_rate: 48_000.0,
            audio_selector_name: "default".to_owned(),
        }
    }
}

/// HLS packaging of the origin endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PackagingProfile {
    pub segment_duration_seconds: i32,
    pub playlist_window_seconds: i32,
    pub startover_window_seconds: i32,
}

impl Default for PackagingProfile {
    fn default() -> Self {
        Self {
            segment_duration_seconds: 6,
            playlist_window_seconds: 60,
            startover_window_seconds: 300,
        }
    }
}

/// CDN cache behavior in front of the origin endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheProfile {
    /// Query keys forwarded to the origin. The packager uses them for time-shifted playback.
    pub query_string_cache_keys: Vec<String>,
    pub min_ttl: i64,
    pub default_ttl: i64,
    pub max_ttl: i64,
    pub price_class: String,
}

impl Default for CacheProfile {
    fn default() -> Self {
        Self {
            query_string_cache_keys: vec!["end".to_owned(), "m".to_owned(), "start".to_owned()],
            min_ttl: 0,
            default_ttl: 86_400,
            max_ttl: 31_536_000,
            price_class: "PriceClass_100".to_owned(),
        }
    }
}
