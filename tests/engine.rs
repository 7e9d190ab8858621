use image::Rgba;
use pollster::block_on;

use retouch::io::{decode_sync, encode_sync};
use retouch::{
    DecodeError, EngineSettings, ExportFormat, FilterParams, ImageEngine, LoadOutcome, PixelBuffer,
};

fn png_bytes(buf: &PixelBuffer) -> Vec<u8> {
    encode_sync(buf, ExportFormat::Png, 90).unwrap()
}

fn loaded(buf: &PixelBuffer) -> ImageEngine {
    let mut engine = ImageEngine::default();
    let outcome = block_on(engine.load(png_bytes(buf))).unwrap();
    assert_eq!(outcome, LoadOutcome::Applied);
    engine
}

fn checker(w: u32, h: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = if (x + y) % 2 == 0 { 220 } else { 30 };
            buf.put_pixel(x, y, Rgba([v, 255 - v, v / 2, 255]));
        }
    }
    buf
}

#[test]
fn load_seeds_single_open_entry() {
    let src = checker(8, 6);
    let engine = loaded(&src);
    assert!(engine.is_loaded());
    assert_eq!(engine.working(), Some(&src));
    assert_eq!(engine.history().descriptions(), vec!["Open"]);
    assert!(!engine.can_undo());
    assert!(!engine.can_redo());
}

#[test]
fn failed_load_keeps_previous_image() {
    let src = checker(5, 5);
    let mut engine = loaded(&src);
    engine.apply_crop(0, 0, 3, 3);

    let err = block_on(engine.load(b"definitely not an image".to_vec())).unwrap_err();
    assert!(matches!(err, DecodeError::Image(_)));
    assert!(matches!(block_on(engine.load(Vec::new())), Err(DecodeError::Empty)));

    assert_eq!(engine.dimensions(), Some((3, 3)));
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn superseded_load_is_dropped() {
    let mut engine = ImageEngine::default();
    let first = engine.begin_load(png_bytes(&checker(4, 4)));
    let second = engine.begin_load(png_bytes(&checker(9, 2)));

    assert_eq!(block_on(engine.complete_load(first)).unwrap(), LoadOutcome::Superseded);
    assert!(!engine.is_loaded());
    assert_eq!(block_on(engine.complete_load(second)).unwrap(), LoadOutcome::Applied);
    assert_eq!(engine.dimensions(), Some((9, 2)));
}

#[test]
fn exposure_floor_on_red_image() {
    let mut engine = loaded(&PixelBuffer::filled(4, 4, [255, 0, 0, 255]));
    assert!(engine.apply_filters(FilterParams { exposure: -255.0, ..Default::default() }));
    assert_eq!(engine.working(), Some(&PixelBuffer::filled(4, 4, [0, 0, 0, 255])));
    // Source is untouched; zeroing the knobs restores it exactly.
    engine.reset_filters();
    assert_eq!(engine.working(), Some(&PixelBuffer::filled(4, 4, [255, 0, 0, 255])));
}

#[test]
fn zero_effects_are_identity() {
    let src = checker(12, 9);
    let mut engine = loaded(&src);
    engine.apply_blur(0.0);
    assert_eq!(engine.working(), Some(&src));
    engine.apply_sharpness(0.0);
    assert_eq!(engine.working(), Some(&src));
    engine.apply_blur(f32::NAN);
    assert_eq!(engine.working(), Some(&src));
}

#[test]
fn blur_softens_and_is_not_cumulative() {
    let src = checker(16, 16);
    let mut engine = loaded(&src);
    engine.apply_blur(20.0);
    let once = engine.working().unwrap().clone();
    assert_ne!(once, src);
    engine.apply_blur(20.0);
    assert_eq!(engine.working(), Some(&once));
    assert_eq!(engine.source(), Some(&src));
}

#[test]
fn crop_beyond_bounds_is_clamped() {
    let mut engine = loaded(&checker(10, 10));
    assert!(engine.apply_crop(6, -3, 100, 5));
    assert_eq!(engine.dimensions(), Some((4, 2)));
    let top_left = engine.working().unwrap().get_pixel(0, 0);
    assert_eq!(top_left, checker(10, 10).get_pixel(6, 0));
}

#[test]
fn full_crop_is_identity() {
    let src = checker(7, 5);
    let mut engine = loaded(&src);
    engine.apply_crop(0, 0, 7, 5);
    assert_eq!(engine.working(), Some(&src));
}

#[test]
fn new_edit_after_undo_drops_redo() {
    let mut engine = loaded(&checker(20, 20));
    engine.apply_crop(0, 0, 15, 15);
    engine.apply_crop(0, 0, 10, 10);
    assert!(engine.undo());
    assert!(engine.can_redo());

    engine.start_erasing();
    engine.erase(5.0, 5.0);
    assert!(engine.stop_erasing());

    assert!(!engine.can_redo());
    assert_eq!(engine.history().descriptions(), vec!["Open", "Crop", "Erase"]);
    assert_eq!(engine.dimensions(), Some((15, 15)));
}

#[test]
fn undo_redo_walk_the_whole_history() {
    let mut engine = loaded(&checker(20, 20));
    engine.apply_crop(0, 0, 15, 15);
    engine.apply_crop(0, 0, 10, 10);

    assert!(engine.undo());
    assert!(engine.undo());
    assert!(!engine.undo());
    assert_eq!(engine.dimensions(), Some((20, 20)));

    assert!(engine.redo());
    assert!(engine.redo());
    assert!(!engine.redo());
    assert_eq!(engine.dimensions(), Some((10, 10)));
}

#[test]
fn undo_ends_an_active_stroke() {
    let mut engine = loaded(&checker(20, 20));
    engine.start_erasing();
    engine.erase(10.0, 10.0);
    // The stroke is committed first, so undo steps back over it.
    assert!(engine.undo());
    assert_eq!(engine.working().unwrap().get_pixel(10, 10).unwrap()[3], 255);
    assert!(engine.can_redo());
    assert!(!engine.erase(3.0, 3.0));
}

#[test]
fn history_respects_configured_limit() {
    let settings = EngineSettings { max_undo_steps: 3, ..Default::default() };
    let mut engine = ImageEngine::new(settings);
    block_on(engine.load(png_bytes(&checker(30, 30)))).unwrap();
    for i in 1..=5 {
        engine.apply_crop(0, 0, 30 - i, 30 - i);
    }
    assert_eq!(engine.history().len(), 3);
    assert!(engine.undo());
    assert!(engine.undo());
    assert!(!engine.undo());
    assert_eq!(engine.dimensions(), Some((27, 27)));
}

#[test]
fn export_round_trips_through_decode() {
    let mut engine = loaded(&checker(6, 4));
    engine.start_erasing();
    engine.erase(0.0, 0.0);
    engine.stop_erasing();
    engine.apply_filters(FilterParams { temperature: 15.0, ..Default::default() });

    let bytes = block_on(engine.export(ExportFormat::Png, 90)).unwrap();
    assert_eq!(&decode_sync(&bytes).unwrap(), engine.working().unwrap());

    let jpeg = block_on(engine.export(ExportFormat::Jpeg, 75)).unwrap();
    assert_eq!(decode_sync(&jpeg).unwrap().dimensions(), (6, 4));
}

#[test]
fn settings_feed_a_fresh_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retouch_settings.cfg");
    std::fs::write(&path, "erase_radius=3\nexport_format=bmp\nmax_undo_steps=4\n").unwrap();

    let settings = EngineSettings::load_from(&path);
    let engine = ImageEngine::new(settings);
    assert_eq!(engine.erase_radius(), 3.0);
    assert_eq!(engine.settings().export_format, ExportFormat::Bmp);
    assert_eq!(engine.settings().max_undo_steps, 4);
}

#[test]
fn memory_cap_never_removes_the_last_undo() {
    let settings = EngineSettings { max_history_mb: 1, ..Default::default() };
    let mut engine = ImageEngine::new(settings);
    block_on(engine.load(png_bytes(&checker(600, 600)))).unwrap();

    assert!(engine.apply_crop(0, 0, 500, 500));
    assert!(engine.can_undo());
    assert_eq!(engine.history().descriptions(), vec!["Open", "Crop"]);
    assert!(engine.undo());
    assert_eq!(engine.dimensions(), Some((600, 600)));
}
