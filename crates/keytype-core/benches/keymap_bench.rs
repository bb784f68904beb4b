//! Criterion benchmarks for character resolution.
//!
//! The typing loop resolves one character of lookahead per keystroke, so
//! resolution sits on the hot path between key events.
//!
//! Run with:
//! ```bash
//! cargo bench --package keytype-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keytype_core::keymap::{linux_x11, macos_cg, us_ansi, windows_vk};
use keytype_core::{
    resolve, FixedKey, HidKeyCode, KeyId, KeyTranslator, LayoutHandle, ModifierMask,
    UnmappedCharacter,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

struct MacTranslator;

impl KeyTranslator for MacTranslator {
    fn fixed_key(&self, key: FixedKey) -> KeyId {
        match key {
            FixedKey::Return => KeyId(macos_cg::KVK_RETURN),
            FixedKey::Tab => KeyId(macos_cg::KVK_TAB),
            FixedKey::Space => KeyId(macos_cg::KVK_SPACE),
        }
    }

    fn translate_char(
        &self,
        ch: char,
        _layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter> {
        let (hid, mods) = us_ansi::lookup(ch).ok_or(UnmappedCharacter { ch })?;
        Ok((KeyId(macos_cg::hid_to_cgkeycode(hid)), mods))
    }
}

const SAMPLE: &str = "The quick brown fox jumps over the lazy dog.\n\tfn main() { println!(\"{}\", 42); }\r\n";

const BENCH_HID_CODES: &[HidKeyCode] = &[
    HidKeyCode::KeyA,
    HidKeyCode::KeyZ,
    HidKeyCode::Digit1,
    HidKeyCode::Enter,
    HidKeyCode::Tab,
    HidKeyCode::Space,
    HidKeyCode::Slash,
    HidKeyCode::ShiftLeft,
    HidKeyCode::AltLeft,
];

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_us_ansi_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("us_ansi");

    for ch in ['a', 'Z', '?', '\u{2020}'] {
        group.bench_with_input(BenchmarkId::new("lookup", ch.escape_unicode()), &ch, |b, &ch| {
            b.iter(|| us_ansi::lookup(black_box(ch)))
        });
    }

    group.finish();
}

fn bench_native_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("native_tables");

    group.bench_function("windows_batch", |b| {
        b.iter(|| {
            BENCH_HID_CODES
                .iter()
                .map(|&hid| windows_vk::hid_to_windows(black_box(hid)))
                .collect::<Vec<_>>()
        })
    });
    group.bench_function("macos_batch", |b| {
        b.iter(|| {
            BENCH_HID_CODES
                .iter()
                .map(|&hid| macos_cg::hid_to_cgkeycode(black_box(hid)))
                .collect::<Vec<_>>()
        })
    });
    group.bench_function("x11_keysyms", |b| {
        b.iter(|| {
            black_box(SAMPLE)
                .chars()
                .filter_map(linux_x11::char_to_keysym)
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

fn bench_resolve_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    group.bench_function("sample_text", |b| {
        b.iter(|| {
            black_box(SAMPLE)
                .chars()
                .map(|ch| resolve(&MacTranslator, ch, LayoutHandle::DEFAULT))
                .filter(Result::is_ok)
                .count()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_us_ansi_lookup, bench_native_tables, bench_resolve_text);
criterion_main!(benches);
