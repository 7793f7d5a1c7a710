// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! Without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all Courier metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!("courier_sessions_active", "Live client sessions");
    describe_counter!("courier_sessions_total", "Client sessions ever registered");
    describe_counter!(
        "courier_hub_dropped_total",
        "Fan-out frames dropped because a session queue was full or closed"
    );
    describe_counter!(
        "courier_reply_dropped_total",
        "Session replies (pong, error) dropped because the session's own queue was full"
    );
    describe_counter!("courier_messages_sent_total", "Messages committed by the sequencer");
    describe_counter!("courier_signaling_relayed_total", "Signaling payloads relayed");
    describe_counter!(
        "courier_signaling_denied_total",
        "Signaling payloads rejected because the sender is not a call participant"
    );
    describe_counter!(
        "courier_side_effects_failed_total",
        "Dialog updates abandoned after exhausting retries"
    );
}

/// A session registered with the hub.
pub fn record_session_opened() {
    metrics::counter!("courier_sessions_total").increment(1);
    metrics::gauge!("courier_sessions_active").increment(1.0);
}

/// A session left the hub.
pub fn record_session_closed() {
    metrics::gauge!("courier_sessions_active").decrement(1.0);
}

/// A fan-out copy was dropped because a session's queue was full.
pub fn record_hub_drop() {
    metrics::counter!("courier_hub_dropped_total").increment(1);
}

/// A session's reply to its own client was dropped on a full queue.
pub fn record_reply_drop() {
    metrics::counter!("courier_reply_dropped_total").increment(1);
}

pub fn record_message_sent(peer_type: &str) {
    metrics::counter!("courier_messages_sent_total", "peer_type" => peer_type.to_string())
        .increment(1);
}

pub fn record_signaling_relayed() {
    metrics::counter!("courier_signaling_relayed_total").increment(1);
}

pub fn record_signaling_denied() {
    metrics::counter!("courier_signaling_denied_total").increment(1);
}

pub fn record_side_effects_failed() {
    metrics::counter!("courier_side_effects_failed_total").increment(1);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;

    #[test]
    fn recorded_metrics_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_session_opened();
            record_session_opened();
            record_session_closed();
            record_hub_drop();
            record_reply_drop();
            record_reply_drop();
            record_message_sent("user");
            record_signaling_denied();
        });

        let text = handle.render();
        assert!(text.contains("courier_sessions_total 2"));
        assert!(text.contains("courier_sessions_active 1"));
        assert!(text.contains("courier_hub_dropped_total 1"));
        assert!(text.contains("courier_reply_dropped_total 2"));
        assert!(text.contains(r#"courier_messages_sent_total{peer_type="user"} 1"#));
        assert!(text.contains("courier_signaling_denied_total 1"));
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_signaling_relayed();
        record_side_effects_failed();
    }
}
