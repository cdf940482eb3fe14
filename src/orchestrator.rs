//! Coordinates parallel detectors with deduplication and post-processing
//! (§4.9), the public `detect` entry point.

use crate::coref::resolve_coreferences;
use crate::detectors::registry::build_detectors;
use crate::detectors::Detector;
use crate::policy::engine::PolicyEngine;
use crate::policy::schema::EntityMatch;
use crate::span_resolver::{resolve_spans, OverlapStrategy};
use crate::types::{normalize_entity_type, DetectionResult, Span};
use crate::{confidence, DetectionConfig};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Per-detector wall-clock timeout (§4.9 step 2, §5).
const DEFAULT_DETECTOR_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs one detector to completion, catching panics so a single bad
/// detector never takes down the pipeline (§5 fault isolation).
fn run_detector_isolated(detector: &dyn Detector, text: &str) -> Vec<Span> {
    if !detector.is_available() {
        tracing::warn!(detector = detector.name(), "detector not available, skipping");
        return Vec::new();
    }
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(text))) {
        Ok(spans) => spans,
        Err(_) => {
            tracing::error!(detector = detector.name(), "detector panicked, treating as empty");
            Vec::new()
        }
    }
}

/// Fan out every detector onto a bounded worker pool, honoring a
/// per-detector timeout. A detector that doesn't report back in time is
/// treated as having produced no spans; the thread running it is left to
/// finish on its own (Rust has no portable thread cancellation).
fn run_detectors(detectors: &[Box<dyn Detector>], text: &str, max_workers: usize) -> (Vec<Span>, Vec<String>) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .expect("thread pool construction with a positive thread count cannot fail");

    let mut all_spans = Vec::new();
    let mut detectors_used = Vec::new();

    // `thread::scope` lets the spawned driver thread (and, through it,
    // rayon's pool) borrow `text` and the detector trait objects without
    // requiring `'static`: the scope cannot return until that thread does.
    std::thread::scope(|scope| {
        let mut pending: Vec<(String, mpsc::Receiver<Vec<Span>>)> = Vec::with_capacity(detectors.len());
        let mut senders = Vec::with_capacity(detectors.len());
        for detector in detectors {
            let (tx, rx) = mpsc::channel();
            pending.push((detector.name().to_string(), rx));
            senders.push(tx);
        }

        scope.spawn(|| {
            pool.scope(|s| {
                for (detector, tx) in detectors.iter().zip(senders) {
                    let detector_ref: &dyn Detector = detector.as_ref();
                    s.spawn(move |_| {
                        let spans = run_detector_isolated(detector_ref, text);
                        let _ = tx.send(spans);
                    });
                }
            });
        });

        // Poll every receiver rather than blocking on them in registration
        // order, so one slow detector can't delay collecting results
        // already produced by faster ones.
        let deadline = Instant::now() + DEFAULT_DETECTOR_TIMEOUT;
        while !pending.is_empty() && Instant::now() < deadline {
            let mut still_pending = Vec::with_capacity(pending.len());
            for (name, rx) in pending {
                match rx.try_recv() {
                    Ok(spans) => {
                        if !spans.is_empty() {
                            detectors_used.push(name);
                        }
                        all_spans.extend(spans);
                    }
                    Err(mpsc::TryRecvError::Empty) => still_pending.push((name, rx)),
                    Err(mpsc::TryRecvError::Disconnected) => {
                        tracing::error!(detector = %name, "detector thread dropped without a result");
                    }
                }
            }
            pending = still_pending;
            if !pending.is_empty() {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        for (name, _) in pending {
            tracing::error!(detector = %name, timeout_s = DEFAULT_DETECTOR_TIMEOUT.as_secs(), "detector timed out");
        }
    });

    (all_spans, detectors_used)
}

fn entity_counts(spans: &[Span]) -> HashMap<String, i32> {
    let mut counts = HashMap::new();
    for span in spans {
        let normalized = normalize_entity_type(&span.entity_type);
        *counts.entry(normalized).or_insert(0) += 1;
    }
    counts
}

/// Detect sensitive spans in `text` under `config` (§4.9, the single
/// public entry point for the detection half of the pipeline).
pub fn detect(text: &str, config: &DetectionConfig) -> DetectionResult {
    if text.trim().is_empty() {
        return DetectionResult::empty(0);
    }

    let start = Instant::now();
    let detectors = build_detectors(config);
    let (raw_spans, detectors_used) = run_detectors(&detectors, text, config.max_workers);

    let calibrated = confidence::calibrate_spans(raw_spans);
    let mut spans = resolve_spans(text, calibrated, config.confidence_threshold, OverlapStrategy::default());

    if config.enable_coref && !spans.is_empty() {
        spans = resolve_coreferences(text, spans);
    }

    // Context enhancement (hotword-based confidence adjustment) is out of
    // scope for this core: no detector or data file for it exists here.

    let policy_result = if config.enable_policy && !spans.is_empty() {
        let entities: Vec<EntityMatch> = spans.iter().map(EntityMatch::from).collect();
        Some(PolicyEngine::with_builtin_policies().evaluate(&entities, config.confidence_threshold))
    } else {
        None
    };

    let counts = entity_counts(&spans);
    let detectors_used: std::collections::HashSet<String> = detectors_used.into_iter().collect();

    DetectionResult {
        spans,
        entity_counts: counts,
        detectors_used,
        processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        text_length: text.len(),
        policy_result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static TRACING_INIT: Once = Once::new();

    /// Surfaces the `tracing::warn!`/`error!` calls this module emits (a
    /// timed-out or panicking detector) as test output instead of nowhere.
    fn init_test_tracing() {
        TRACING_INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }

    #[test]
    fn empty_text_short_circuits() {
        init_test_tracing();
        let result = detect("", &DetectionConfig::default());
        assert!(result.spans.is_empty());
        assert_eq!(result.text_length, 0);
    }

    #[test]
    fn whitespace_only_short_circuits() {
        let result = detect("   \n\t  ", &DetectionConfig::default());
        assert!(result.spans.is_empty());
    }

    #[test]
    fn detects_ssn_with_default_config() {
        let result = detect("Patient SSN is 078-05-1120.", &DetectionConfig::default());
        assert!(result.spans.iter().any(|s| s.entity_type == "SSN"));
        assert!(result.detectors_used.contains("checksum"));
        assert_eq!(result.text_length, "Patient SSN is 078-05-1120.".len());
    }

    #[test]
    fn policy_result_flags_ssn_as_sensitive() {
        let mut config = DetectionConfig::default();
        config.enable_policy = true;
        let result = detect("Patient SSN is 078-05-1120.", &config);
        let policy = result.policy_result.expect("policy evaluation runs when enabled");
        assert!(policy.is_sensitive());
    }

    #[test]
    fn no_policy_result_when_disabled() {
        let mut config = DetectionConfig::default();
        config.enable_policy = false;
        let result = detect("Patient SSN is 078-05-1120.", &config);
        assert!(result.policy_result.is_none());
    }

    #[test]
    fn entity_counts_match_span_count_per_type() {
        let result = detect("Contact us at a@example.com or b@example.com.", &DetectionConfig::default());
        let email_spans = result.spans.iter().filter(|s| s.entity_type == "EMAIL").count();
        assert_eq!(result.entity_counts.get("EMAIL").copied().unwrap_or(0) as usize, email_spans);
    }
}
