
// End-to-end capture runs against a scripted instrument: the full command
// sequence, the degraded paths, and the resulting records.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use dcax::clock::{Clock, ManualClock};
use dcax::devices::n1000a::{N1000A, ARM_SETTLE, RESET_SETTLE, STATUS_FALLBACK_WAIT};
use dcax::error::CaptureError;
use dcax::scpi::scripted::ScriptedTransport;
use dcax::waveform::FALLBACK_SAMPLE_COUNT;
use dcax::waveform::WaveformMetadata;

const IDN:&str = "ACME,N1000A,SN123,1.0";

fn scope_over(transport: ScriptedTransport) -> (N1000A<ScriptedTransport>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let scope = N1000A::over(transport, Box::new(clock.clone())).unwrap();
    (scope, clock)
}

#[test]
fn happy_path_produces_a_live_record() {
    let transport = ScriptedTransport::new()
        .reply(IDN)        // *IDN?
        .reply("STOP")     // :ACQ:STAT?
        .reply("1e-12")    // :WAV:XINC?
        .reply("0")        // :WAV:XOR?
        .reply("1e-3")     // :WAV:YINC?
        .reply("0")        // :WAV:YOR?
        .reply("0")        // :WAV:YREF?
        .reply("0.1,0.2,0.3"); // :WAV:DATA?
    let sent = transport.sent_log();

    let (mut scope, _clock) = scope_over(transport);
    assert_eq!(scope.identity_string(), IDN);

    let record = scope.capture("CHAN1A", 3);
    scope.disconnect().unwrap();

    assert_eq!(record.instrument_id, IDN);
    assert_eq!(record.channel, "CHAN1A");
    assert!(!record.samples_are_fallback);
    assert!(!record.metadata_is_fallback);

    let times: Vec<f64> = record.points.iter().map(|(t, _)| *t).collect();
    let volts: Vec<f64> = record.points.iter().map(|(_, v)| *v).collect();
    assert_eq!(times, vec![0.0, 1e-12, 2e-12]);
    assert_eq!(volts, vec![0.1, 0.2, 0.3]);

    // The protocol sequence, in order
    let sent = sent.lock().unwrap();
    let expected: Vec<&str> = vec![
        "*IDN?",
        "*RST", "*CLS",
        ":CHAN1A:DISP ON", ":ACQ:RUN",
        ":SING",
        ":ACQ:STAT?",
        ":WAV:SOUR CHAN1A", ":WAV:FORM ASCII", ":WAV:MODE RAW", ":WAV:POIN:MODE RAW", ":WAV:POIN 3",
        ":WAV:XINC?", ":WAV:XOR?", ":WAV:YINC?", ":WAV:YOR?", ":WAV:YREF?",
        ":WAV:DATA?",
    ];
    assert_eq!(*sent, expected);
}

#[test]
fn settle_intervals_elapse_before_polling() {
    let transport = ScriptedTransport::new()
        .reply(IDN)
        .reply("STOP")
        .reply_forever("0");

    let (mut scope, clock) = scope_over(transport);
    scope.capture("CHAN1A", 16);

    // Reset and arm settles; the first poll answered STOP without waiting
    assert_eq!(clock.now(), RESET_SETTLE + ARM_SETTLE);
}

#[test]
fn fetch_failure_yields_flagged_placeholder_record() {
    let transport = ScriptedTransport::new()
        .reply(IDN)
        .reply("STOP")
        .reply("1e-12")
        .reply("0")
        .reply("1e-3")
        .reply("0")
        .reply("0");
        // queue exhausted: :WAV:DATA? fails at the channel level

    let (mut scope, _clock) = scope_over(transport);
    let record = scope.capture("CHAN1A", 100);

    assert!(record.samples_are_fallback);
    assert!(!record.metadata_is_fallback);
    assert_eq!(record.len(), FALLBACK_SAMPLE_COUNT);
}

#[test]
fn dead_status_query_costs_the_fallback_wait_only() {
    let transport = ScriptedTransport::new()
        .reply(IDN)
        .reply_error()     // :ACQ:STAT? fails on the first poll
        .reply("1e-12")
        .reply("0")
        .reply("1e-3")
        .reply("0")
        .reply("0")
        .reply("0.5,0.6");

    let (mut scope, clock) = scope_over(transport);
    let record = scope.capture("CHAN1A", 2);

    assert!(!record.samples_are_fallback);
    assert_eq!(record.len(), 2);
    assert_eq!(clock.now(), RESET_SETTLE + ARM_SETTLE + STATUS_FALLBACK_WAIT);
}

#[test]
fn unresponsive_instrument_still_yields_a_record() {
    // Every exchange after identification fails, including writes
    let transport = ScriptedTransport::new().reply(IDN).failing_writes();
    let closes = transport.close_count();

    let (mut scope, _clock) = scope_over(transport);
    let record = scope.capture("CHAN1A", 1000);

    assert!(record.samples_are_fallback);
    assert!(record.metadata_is_fallback);
    assert_eq!(record.metadata, WaveformMetadata::fallback());
    assert_eq!(record.len(), FALLBACK_SAMPLE_COUNT);
    assert_eq!(record.instrument_id, IDN);

    scope.disconnect().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn connection_failure_aborts_before_any_record() {
    let transport = ScriptedTransport::new(); // identification query fails
    match N1000A::over(transport, Box::new(ManualClock::new())) {
        Err(CaptureError::Connection(_)) => (),
        other => panic!("expected connection error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn capture_records_serialize_for_downstream_consumers() {
    let transport = ScriptedTransport::new()
        .reply(IDN)
        .reply("STOP")
        .reply("1e-12")
        .reply("0")
        .reply("1e-3")
        .reply("0")
        .reply("0")
        .reply("0.25");

    let (mut scope, _clock) = scope_over(transport);
    let record = scope.capture("CHAN2A", 1);

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"channel\":\"CHAN2A\""));
    assert!(json.contains("\"samples_are_fallback\":false"));
}
