//! Integration Tests
//!
//! End-to-end behaviour of the mixer as a host would drive it.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::tempdir;

use strata::engine::buffer::{AudioBuffer, ChannelLayout};
use strata::engine::io::{export_wav, ExportFormat};
use strata::engine::mixer::LayerMixer;
use strata::engine::notes::NoteEvent;
use strata::layers::{LayerKind, SampleLoader};
use strata::params::{ParamId, ParameterStore};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK: usize = 256;

fn mixer_with(overrides: &[(&str, Value)], max_block: usize) -> (LayerMixer, SampleLoader, Arc<ParameterStore>) {
    let params = Arc::new(ParameterStore::new());
    // instant envelope so levels are easy to predict
    params.set_param("envAttack", &json!(0.0)).unwrap();
    params.set_param("envDecay", &json!(0.0)).unwrap();
    params.set_param("envSustain", &json!(1.0)).unwrap();
    params.set_param("envRelease", &json!(0.0)).unwrap();
    for (name, value) in overrides {
        params.set_param(name, value).unwrap();
    }

    let (mut mixer, loader) = LayerMixer::new(Arc::clone(&params));
    mixer.prepare(SAMPLE_RATE, max_block).unwrap();
    (mixer, loader, params)
}

fn only(layer: &str) -> Vec<(&'static str, Value)> {
    let mut overrides = vec![
        ("osc1Enable", json!(false)),
        ("subEnable", json!(false)),
        ("noiseEnable", json!(false)),
        ("samplerEnable", json!(false)),
    ];
    for entry in overrides.iter_mut() {
        if entry.0.starts_with(layer) {
            entry.1 = json!(true);
        }
    }
    overrides
}

fn note_on(note: u8) -> NoteEvent {
    NoteEvent::NoteOn { note, velocity: 1.0 }
}

// === Silence ===

#[test]
fn test_no_note_is_silent() {
    let (mut mixer, _loader, _params) = mixer_with(&[], BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    for _ in 0..8 {
        mixer.process(&mut out, &[]);
        assert!(out.is_silent());
    }
}

#[test]
fn test_four_silent_layers_mix_to_exact_silence() {
    let (mut mixer, _loader, _params) = mixer_with(
        &[
            ("osc1Level", json!(0.0)),
            ("subLevel", json!(0.0)),
            ("noiseLevel", json!(0.0)),
            ("samplerLevel", json!(0.0)),
        ],
        BLOCK,
    );
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    for _ in 0..10 {
        assert!(out.samples.iter().flatten().all(|&s| s == 0.0));
        mixer.process(&mut out, &[]);
    }
}

#[test]
fn test_all_layers_disabled_is_silent() {
    let (mut mixer, _loader, _params) = mixer_with(&only("none"), BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    assert!(out.is_silent());
    for kind in LayerKind::ALL {
        assert!(!mixer.is_enabled(kind));
    }
}

#[test]
fn test_note_off_releases_to_silence() {
    let (mut mixer, _loader, _params) = mixer_with(&[("envRelease", json!(0.01))], BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(50)]);
    assert!(!out.is_silent());

    mixer.process(&mut out, &[NoteEvent::NoteOff { note: 50 }]);
    // 10 ms release is 480 samples; give it a few blocks
    for _ in 0..3 {
        mixer.process(&mut out, &[]);
    }
    assert!(out.is_silent());
}

#[test]
fn test_layer_released_while_disabled_stays_silent_when_enabled() {
    let mut overrides = only("sub");
    overrides.push(("envRelease", json!(0.1)));
    let (mut mixer, _loader, params) = mixer_with(&overrides, BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);

    mixer.process(&mut out, &[note_on(40)]);
    assert!(!out.is_silent());

    params.set(ParamId::SubEnable, 0.0);
    mixer.process(&mut out, &[NoteEvent::NoteOff { note: 40 }]);
    assert!(out.is_silent());
    // 0.1 s release is under 20 blocks
    for _ in 0..40 {
        mixer.process(&mut out, &[]);
    }

    params.set(ParamId::SubEnable, 1.0);
    for _ in 0..4 {
        mixer.process(&mut out, &[]);
        assert!(out.is_silent());
    }
    assert!(!mixer.layer(LayerKind::Sub).is_active());
}

#[test]
fn test_layer_disabled_mid_note_resumes_sustain() {
    let (mut mixer, _loader, params) = mixer_with(&only("sub"), BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(40)]);

    params.set(ParamId::SubEnable, 0.0);
    mixer.process(&mut out, &[]);
    assert!(out.is_silent());

    params.set(ParamId::SubEnable, 1.0);
    mixer.process(&mut out, &[]);
    assert!(!out.is_silent());
}

// === Mixing ===

#[test]
fn test_pan_hard_left_and_right() {
    let mut overrides = only("osc1");
    overrides.push(("osc1Pan", json!(-1.0)));
    let (mut mixer, _loader, params) = mixer_with(&overrides, BLOCK);

    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(69)]);
    assert!(out.channel(0).iter().any(|&s| s != 0.0));
    assert!(out.channel(1).iter().all(|&s| s == 0.0));

    params.set(ParamId::Osc1Pan, 1.0);
    mixer.process(&mut out, &[]);
    assert!(out.channel(0).iter().all(|&s| s == 0.0));
    assert!(out.channel(1).iter().any(|&s| s != 0.0));
}

#[test]
fn test_centre_pan_channels_equal() {
    let (mut mixer, _loader, _params) = mixer_with(&only("sub"), BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(36)]);
    assert_eq!(out.channel(0), out.channel(1));
    assert!(!out.is_silent());
}

#[test]
fn test_level_applied_by_layer_and_mixer() {
    let render = |level: f64| {
        let mut overrides = only("osc1");
        overrides.push(("osc1Level", json!(level)));
        let (mut mixer, _loader, _params) = mixer_with(&overrides, BLOCK);
        let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
        mixer.process(&mut out, &[note_on(69)]);
        out
    };

    let full = render(1.0);
    let half = render(0.5);
    for (a, b) in full.channel(0).iter().zip(half.channel(0)) {
        assert!((a * 0.25 - b).abs() < 1e-6, "{a} * 0.25 != {b}");
    }
}

#[test]
fn test_large_block_processed_in_chunks() {
    let mut overrides = only("osc1");
    overrides.extend(only("sub").into_iter().filter(|(_, v)| v == &json!(true)));

    let (mut small, _l1, _p1) = mixer_with(&overrides, 64);
    let (mut large, _l2, _p2) = mixer_with(&overrides, 4096);

    let mut a = AudioBuffer::new(1000, ChannelLayout::Stereo);
    let mut b = AudioBuffer::new(1000, ChannelLayout::Stereo);
    small.process(&mut a, &[note_on(45)]);
    large.process(&mut b, &[note_on(45)]);

    assert_eq!(a.samples, b.samples);
    assert!(!a.is_silent());
}

#[test]
fn test_mono_output_writes_channel_zero() {
    let (mut stereo_mixer, _l1, _p1) = mixer_with(&only("osc1"), BLOCK);
    let (mut mono_mixer, _l2, _p2) = mixer_with(&only("osc1"), BLOCK);

    let mut stereo = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    let mut mono = AudioBuffer::new(BLOCK, ChannelLayout::Mono);
    stereo_mixer.process(&mut stereo, &[note_on(64)]);
    mono_mixer.process(&mut mono, &[note_on(64)]);

    assert_eq!(mono.channels(), 1);
    assert_eq!(mono.channel(0), stereo.channel(0));
}

#[test]
fn test_noise_layer_output_finite_and_bounded() {
    let (mut mixer, _loader, _params) = mixer_with(&only("noise"), BLOCK);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    for _ in 0..100 {
        mixer.process(&mut out, &[]);
        assert!(out.is_finite());
        assert!(out.samples.iter().flatten().all(|s| s.abs() < 1.0));
    }
}

// === Sampler ===

#[test]
fn test_sampler_plays_loaded_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let mut tone = AudioBuffer::new(4800, ChannelLayout::Mono).with_sample_rate(48000);
    tone.channel_mut(0).fill(0.5);
    export_wav(&tone, &path, ExportFormat::new(32)).unwrap();

    let mut overrides = only("sampler");
    overrides.push(("samplerLevel", json!(1.0)));
    let (mut mixer, mut loader, _params) = mixer_with(&overrides, BLOCK);
    loader.load_file(&path).unwrap();

    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    for ch in 0..2 {
        assert!(out.channel(ch).iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    // 4800 frames = 18.75 blocks, then silence
    for _ in 0..20 {
        mixer.process(&mut out, &[]);
    }
    assert!(out.is_silent());
}

#[test]
fn test_sampler_level_applied_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unity.wav");
    let mut unity = AudioBuffer::new(4800, ChannelLayout::Mono).with_sample_rate(48000);
    unity.channel_mut(0).fill(1.0);
    export_wav(&unity, &path, ExportFormat::new(32)).unwrap();

    let mut overrides = only("sampler");
    overrides.push(("samplerLevel", json!(0.5)));
    let (mut mixer, mut loader, _params) = mixer_with(&overrides, BLOCK);
    loader.load_file(&path).unwrap();

    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    for ch in 0..2 {
        assert!(
            out.channel(ch).iter().all(|&s| (s - 0.5).abs() < 1e-6),
            "channel {ch}: {}",
            out.channel(ch)[10]
        );
    }
}

#[test]
fn test_sampler_load_failure_leaves_engine_playable() {
    let (mut mixer, mut loader, _params) = mixer_with(&only("sampler"), BLOCK);
    let err = loader
        .load_file(std::path::Path::new("/nowhere/missing.wav"))
        .unwrap_err();
    assert!(err.is_recoverable());

    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[note_on(60)]);
    assert!(out.is_silent());
}

// === Threads ===

#[test]
fn test_audio_thread_with_control_thread_writes() {
    let (mixer, mut loader, params) = mixer_with(&only("osc1"), BLOCK);

    let audio = thread::spawn(move || {
        let mut mixer = mixer;
        let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
        mixer.process(&mut out, &[note_on(57)]);
        for _ in 0..200 {
            mixer.process(&mut out, &[]);
            assert!(out.is_finite());
        }
        mixer
    });

    for i in 0..200 {
        params.set(ParamId::Osc1Detune, (i % 100) as f32 - 50.0);
        params.set(ParamId::Osc1Waveform, (i % 4) as f32);
        let mut sample = AudioBuffer::new(64, ChannelLayout::Mono);
        sample.channel_mut(0).fill(0.1);
        // the queue may be full while the audio thread catches up
        let _ = loader.submit(sample);
    }

    let mut mixer = audio.join().unwrap();
    params.set(ParamId::Osc1Pan, -1.0);
    let mut out = AudioBuffer::new(BLOCK, ChannelLayout::Stereo);
    mixer.process(&mut out, &[]);
    assert!(out.channel(1).iter().all(|&s| s == 0.0));
    loader.collect_garbage();
}
