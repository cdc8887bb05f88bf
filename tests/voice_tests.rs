// Host-side tests for the live voice bridge: PCM framing, playback
// scheduling, wire messages and the session state machine.

use nexus_core::pcm;
use nexus_core::playback::PlaybackCursor;
use nexus_core::voice::*;
use serde_json::Value;

#[test]
fn chunks_arriving_together_play_back_to_back() {
    let mut cursor = PlaybackCursor::new(None);
    let durations = [0.25, 0.1, 0.4, 0.05];
    let now = 10.0;
    let starts: Vec<f64> = durations
        .iter()
        .map(|d| cursor.schedule(now, *d))
        .collect();
    assert!(starts[0] >= now);
    for i in 1..starts.len() {
        assert!(starts[i] >= starts[i - 1] + durations[i - 1] - 1e-12);
    }
    assert!((cursor.next_start() - 10.8).abs() < 1e-9);
}

#[test]
fn idle_gap_restarts_at_now() {
    let mut cursor = PlaybackCursor::new(None);
    assert_eq!(cursor.schedule(1.0, 0.5), 1.0);
    // Playback drained; the next chunk must not be scheduled in the past
    assert_eq!(cursor.schedule(5.0, 0.5), 5.0);
    assert!((cursor.backlog(5.2) - 0.3).abs() < 1e-9);
    cursor.reset();
    assert_eq!(cursor.next_start(), 0.0);
}

#[test]
fn backlog_cap_drops_chunks() {
    let mut uncapped = PlaybackCursor::new(None);
    for _ in 0..100 {
        assert!(uncapped.try_schedule(0.0, 1.0).is_some());
    }

    let mut capped = PlaybackCursor::new(Some(2.0));
    assert_eq!(capped.try_schedule(0.0, 1.0), Some(0.0));
    assert_eq!(capped.try_schedule(0.0, 1.0), Some(1.0));
    assert_eq!(capped.try_schedule(0.0, 1.0), Some(2.0));
    assert_eq!(capped.try_schedule(0.0, 1.0), None);
    // Once the clock catches up chunks are accepted again
    assert_eq!(capped.try_schedule(2.5, 1.0), Some(3.0));
}

#[test]
fn pcm_frame_is_base64_le_int16() {
    let frame = pcm::encode_frame(&[0.0, 0.5, -1.0]);
    assert_eq!(frame, "AAAAQACA");
    let back = pcm::decode_frame(&frame).expect("decode");
    assert_eq!(back, vec![0.0, 0.5, -1.0]);
    assert_eq!(pcm::mime_type(16_000), "audio/pcm;rate=16000");
    assert!((pcm::duration_sec(4096, 16_000) - 0.256).abs() < 1e-12);
    assert_eq!(pcm::duration_sec(10, 0), 0.0);
}

#[test]
fn quantization_error_is_bounded() {
    for i in -100..=100 {
        let s = i as f32 / 100.0;
        let q = pcm::i16_to_f32(pcm::f32_to_i16(s));
        assert!((q - s).abs() <= 1.0 / 32768.0 + 1e-6, "{} -> {}", s, q);
    }
}

#[test]
fn realtime_input_message_shape() {
    let json = ClientMessage::audio(&[0.0; 4], 16_000)
        .to_json()
        .expect("serialize");
    let v: Value = serde_json::from_str(&json).expect("json");
    assert_eq!(v["realtimeInput"]["media"]["mimeType"], "audio/pcm;rate=16000");
    assert_eq!(v["realtimeInput"]["media"]["data"], "AAAAAAAAAAA=");
}

#[test]
fn setup_message_requests_audio_and_transcription() {
    let cfg = VoiceConfig::with_endpoint("wss://example.invalid/live");
    let v: Value =
        serde_json::from_str(&ClientMessage::setup(&cfg).to_json().expect("serialize"))
            .expect("json");
    let setup = &v["setup"];
    assert_eq!(setup["model"], DEFAULT_MODEL);
    assert_eq!(setup["generationConfig"]["responseModalities"][0], "AUDIO");
    assert_eq!(
        setup["systemInstruction"]["parts"][0]["text"],
        DEFAULT_SYSTEM_INSTRUCTION
    );
    assert!(setup["outputAudioTranscription"].is_object());
}

#[test]
fn server_message_yields_transcript_and_audio() {
    let text = r#"{
        "serverContent": {
            "outputTranscription": {"text": "hello"},
            "modelTurn": {"parts": [
                {"inlineData": {"data": "AEA=", "mimeType": "audio/pcm;rate=24000"}},
                {"inlineData": {"data": "AMA="}}
            ]},
            "turnComplete": true
        },
        "usageMetadata": {"totalTokenCount": 3}
    }"#;
    let frame = parse_server_message(text).expect("parse");
    assert_eq!(frame.transcript.as_deref(), Some("hello"));
    // Only the first part is played
    assert_eq!(frame.audio, Some(vec![0.5]));
    assert!(frame.turn_complete);
    assert!(!frame.setup_complete);
}

#[test]
fn setup_complete_and_malformed_messages() {
    let frame = parse_server_message(r#"{"setupComplete":{}}"#).expect("parse");
    assert!(frame.setup_complete);
    assert!(frame.audio.is_none() && frame.transcript.is_none());

    assert!(parse_server_message("not json").is_err());
    let bad_audio = r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"data":"AAAA"}}]}}}"#;
    assert!(parse_server_message(bad_audio).is_err());

    let empty = parse_server_message(r#"{"serverContent":{"outputTranscription":{"text":""}}}"#)
        .expect("parse");
    assert!(empty.transcript.is_none());
}

#[test]
fn session_lifecycle() {
    use SessionAction as A;
    use SessionEvent as E;
    use SessionState as S;

    assert_eq!(S::Idle.on(E::StartRequested), (S::Connecting, A::Connect));
    assert_eq!(S::Connecting.on(E::Opened), (S::Active, A::Activated));
    assert_eq!(S::Active.on(E::StopRequested), (S::Idle, A::Teardown));
    assert_eq!(S::Active.on(E::RemoteClosed), (S::Idle, A::Teardown));
    assert_eq!(S::Connecting.on(E::RemoteError), (S::Idle, A::Teardown));
    assert_eq!(S::Connecting.on(E::CaptureFailed), (S::Idle, A::Teardown));
}

#[test]
fn redundant_events_are_ignored() {
    use SessionAction as A;
    use SessionEvent as E;
    use SessionState as S;

    assert_eq!(S::Idle.on(E::StopRequested), (S::Idle, A::None));
    assert_eq!(S::Idle.on(E::RemoteClosed), (S::Idle, A::None));
    assert_eq!(S::Connecting.on(E::StartRequested), (S::Connecting, A::None));
    assert_eq!(S::Active.on(E::StartRequested), (S::Active, A::None));
    assert_eq!(S::Active.on(E::Opened), (S::Active, A::None));
    // No reconnect after a remote close
    assert_eq!(S::Idle.on(E::Opened), (S::Idle, A::None));
    assert!(S::Active.is_active() && !S::Connecting.is_active());
}

#[test]
fn transcript_prefixes_speaker() {
    let mut t = Transcript::default();
    assert!(t.is_empty());
    t.push_fragment("Salaam");
    t.push_fragment("again");
    assert_eq!(t.lines(), ["Oracle: Salaam", "Oracle: again"]);
}

#[test]
fn default_config_rates() {
    let cfg = VoiceConfig::default();
    assert_eq!(cfg.capture_rate, 16_000);
    assert_eq!(cfg.playback_rate, 24_000);
    assert_eq!(cfg.capture_block, 4096);
    assert!(cfg.max_backlog_sec.is_none());
    assert!(cfg.endpoint.is_empty());
}
