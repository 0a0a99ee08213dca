//! Metrics for the group message pipeline
//!
//! Thin helpers over the `metrics` facade. Nothing is recorded unless the
//! embedding application installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const MESSAGES_SENT: &str = "group.messages.sent";
pub const MESSAGES_SEND_FAILED: &str = "group.messages.send_failed";
pub const MESSAGES_LISTED: &str = "group.messages.listed";
pub const MESSAGES_SKIPPED: &str = "group.messages.skipped";
pub const STREAM_DELIVERED: &str = "group.stream.delivered";
pub const STREAM_DROPPED: &str = "group.stream.dropped";
pub const CONSENT_CACHE_HITS: &str = "consent.cache.hits";
pub const CONSENT_CACHE_MISSES: &str = "consent.cache.misses";
pub const CODEC_ENCODE_DURATION: &str = "codec.encode.duration_ms";

/// Register metric descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(MESSAGES_SENT, "Messages published through Group::send");
    describe_counter!(MESSAGES_SEND_FAILED, "Sends aborted by encode, consent or engine failure");
    describe_counter!(MESSAGES_LISTED, "Messages returned from history queries");
    describe_counter!(MESSAGES_SKIPPED, "History entries skipped because they could not be transcoded");
    describe_counter!(STREAM_DELIVERED, "Messages delivered to live stream consumers");
    describe_counter!(STREAM_DROPPED, "Live messages dropped because they could not be transcoded");
    describe_counter!(CONSENT_CACHE_HITS, "Consent lookups answered from the cache");
    describe_counter!(CONSENT_CACHE_MISSES, "Consent lookups that queried the backend");
    describe_histogram!(CODEC_ENCODE_DURATION, "Time spent encoding and compressing content");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a histogram metric
pub fn record_histogram(name: &'static str, value: f64) {
    histogram!(name).record(value);
}

/// Measures an operation and records it in milliseconds on `stop`
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    pub fn stop(self) {
        record_histogram(self.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}
