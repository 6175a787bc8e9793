// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use crate::harness::{assert_equivalent_wave, sound_program, specialized_source};

#[test]
fn make_sound_identity() {
    let program = sound_program("make_sound((x) => (x), 1)");
    assert_eq!(specialized_source(&program, "duration"), "1");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return t >= 1 ? 0 : t;\n}"
    );
}

#[test]
fn make_sound_square() {
    let program = sound_program("make_sound((x) => (x * x), 1)");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return t >= 1 ? 0 : t * t;\n}"
    );
}

#[test]
fn silence_sound() {
    let program = sound_program("silence_sound(1)");
    assert_eq!(specialized_source(&program, "duration"), "1");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return 0;\n}"
    );
}

#[test]
fn noise_sound() {
    let program = sound_program("noise_sound(1)");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return t >= 1 ? 0 : Math.random() * 2 - 1;\n}"
    );
}

#[test]
fn sine_sound() {
    let program = sound_program("sine_sound(500, 1)");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return t >= 1 ? 0 : Math.sin(3141.592653589793 * t);\n}"
    );
    assert_equivalent_wave("sine_sound(500, 1)", 64);
}

#[test]
fn fourier_series_sounds() {
    for sound in [
        "square_sound(500, 1)",
        "triangle_sound(500, 1)",
        "sawtooth_sound(500, 1)",
    ] {
        let wave = specialized_source(&sound_program(sound), "wave");
        assert!(!wave.contains("for"), "{}", wave);
        assert_eq!(wave.matches("Math.sin(").count(), 5, "{}", wave);
        assert_equivalent_wave(sound, 64);
    }
}

#[test]
fn linear_decay() {
    assert_eq!(
        specialized_source("const func = linear_decay(3);", "func"),
        "function func(t) {\n  return t > 3 ? 0 : 1 - t / 3;\n}"
    );
}

#[test]
fn adsr_of_silence_is_silent() {
    let program = sound_program("adsr(0.3236, 0.6, 0, 0.1)(silence_sound(1))");
    assert_eq!(specialized_source(&program, "duration"), "1");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return 0;\n}"
    );
}

#[test]
fn adsr_envelopes() {
    for sound in [
        "adsr(0.3236, 0.6, 0, 0.1)(sine_sound(500, 1))",
        "adsr(0.3236, 0.6, 0, 0.1)(square_sound(500, 1))",
        "adsr(0.3236, 0.6, 0, 0.1)(triangle_sound(500, 1))",
        "adsr(0.3236, 0.6, 0, 0.1)(sawtooth_sound(500, 1))",
        "adsr(0.2, 0.1, 0.5, 0.1)(sine_sound(220, 2))",
    ] {
        assert_equivalent_wave(sound, 128);
    }
}

#[test]
fn consecutively_switches_on_the_first_duration() {
    let program = sound_program(
        "consecutively(list(make_sound((x) => (x), 1), make_sound((x) => (x * x), 1)))",
    );
    assert_eq!(specialized_source(&program, "duration"), "2");
    assert_eq!(
        specialized_source(&program, "wave"),
        "function wave(t) {\n  return t < 1 ? t >= 1 ? 0 : t : t < 2 ? t >= 2 ? 0 : (t - 1) * (t - 1) : 0;\n}"
    );
}

#[test]
fn consecutively() {
    let sound = "consecutively(list(sawtooth_sound(500, 0.8), sine_sound(1000, 0.2)))";
    assert_eq!(specialized_source(&sound_program(sound), "duration"), "1");
    assert_equivalent_wave(sound, 128);
}

#[test]
fn simultaneously() {
    let sound = "simultaneously(list(sawtooth_sound(500, 1), sine_sound(1000, 0.2)))";
    let program = sound_program(sound);
    assert_eq!(specialized_source(&program, "duration"), "1");
    let wave = specialized_source(&program, "wave");
    assert!(wave.ends_with(") / 2;\n}"), "{}", wave);
    assert_equivalent_wave(sound, 128);
}
