//! Loading resources the way a host application hands them over.

use std::fs;
use std::path::PathBuf;

use tg_core::{interpolate, DensityMap, Position, Scene};
use tg_formats::{load_density_map, read_scene, write_density_map, write_scene, FormatError};

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tg-formats-{}-{}", std::process::id(), name))
}

#[test]
fn density_map_from_disk() {
    let path = scratch_file("map.bin");
    fs::write(&path, write_density_map(&DensityMap::builtin())).unwrap();
    let data = fs::read(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let map = load_density_map(&data).unwrap();
    let builtin = DensityMap::builtin();
    for x in (0..=255u8).step_by(17) {
        for y in (0..=255u8).step_by(23) {
            for offset in [0, 31, 32, 95] {
                let position = Position::new(x, y);
                assert_eq!(map.level(position, offset), builtin.level(position, offset));
            }
        }
    }
}

#[test]
fn stored_scenes_feed_the_morph() {
    let mut a = Scene::default();
    a.engines[0].position = Position::new(0, 40);
    let mut b = Scene::default();
    b.engines[0].position = Position::new(200, 40);
    b.engines[1].randomness = 100;

    let a = read_scene(&write_scene(&a).unwrap()).unwrap();
    let b = read_scene(&write_scene(&b).unwrap()).unwrap();
    let mid = interpolate(&a, &b, 0.25);
    assert_eq!(mid.engines[0].position, Position::new(50, 40));
    assert_eq!(mid.engines[1].randomness, 25);
}

#[test]
fn errors_are_displayable() {
    let err = read_scene(b"NOPE").unwrap_err();
    assert_eq!(err, FormatError::InvalidHeader);
    assert_eq!(err.to_string(), "invalid header");

    let err = load_density_map(&[1, 2, 3]).unwrap_err();
    assert_eq!(err.to_string(), "expected 2400 bytes, found 3");
}
