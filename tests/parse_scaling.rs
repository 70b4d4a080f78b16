// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Parse time must grow linearly with input made of unclosed or
//! almost-closed delimiters.

use std::hint::black_box;
use std::time::{Duration, Instant};

use chatmark::parser;

const REPS: usize = 20_000;
const RUNS: usize = 5;
const MAX_RATIO: f64 = 3.0;

fn best_parse_time(text: &str) -> Duration {
    (0..RUNS)
        .map(|_| {
            let start = Instant::now();
            black_box(parser::parse(black_box(text), usize::MAX));
            start.elapsed()
        })
        .min()
        .unwrap_or_default()
}

fn assert_linear(unit: &str) {
    let small = best_parse_time(&unit.repeat(REPS));
    let large = best_parse_time(&unit.repeat(REPS * 2));
    let ratio = large.as_secs_f64() / small.as_secs_f64().max(1e-6);
    assert!(
        ratio < MAX_RATIO,
        "{unit:?}: {small:?} for {REPS} repetitions, {large:?} for twice that ({ratio:.2}x)"
    );
}

#[test]
fn delimiter_runs_scale_linearly() {
    assert_linear("*");
    assert_linear("_");
}

#[test]
fn italic_underscore_scales_linearly() {
    assert_linear("_a");
}

#[test]
fn italic_asterisk_scales_linearly() {
    assert_linear("*a ");
}

#[test]
fn bold_scales_linearly() {
    assert_linear("**a*");
}

#[test]
fn underline_scales_linearly() {
    assert_linear("__a_");
}

#[test]
fn italic_wrappers_scale_linearly() {
    assert_linear("***a**");
    assert_linear("___a__");
}

#[test]
fn strikethrough_and_spoiler_scale_linearly() {
    assert_linear("~~a");
    assert_linear("||a");
}

#[test]
fn code_scales_linearly() {
    assert_linear("`a");
    assert_linear("```a``");
}

#[test]
fn quotes_scale_linearly() {
    assert_linear("> ");
    assert_linear("> a\n");
}

#[test]
fn masked_links_scale_linearly() {
    assert_linear("[");
    assert_linear("[a](");
}
