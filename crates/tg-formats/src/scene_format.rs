//! Scene snapshot record.
//!
//! Layout (16 bytes): magic `TGSC`, then for each engine
//! `x, y, density[3], randomness`.

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use tg_core::{EngineScene, Position, Scene, NUM_PARTS};

use crate::FormatError;

pub const SCENE_MAGIC: [u8; 4] = *b"TGSC";

pub const SCENE_RECORD_LEN: usize = 16;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EngineRecord {
    x: u8,
    y: u8,
    density: [u8; NUM_PARTS],
    randomness: u8,
}

#[binrw]
#[brw(little, magic = b"TGSC")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SceneRecord {
    engines: [EngineRecord; 2],
}

impl From<&EngineScene> for EngineRecord {
    fn from(scene: &EngineScene) -> Self {
        Self {
            x: scene.position.x,
            y: scene.position.y,
            density: scene.density,
            randomness: scene.randomness,
        }
    }
}

impl From<EngineRecord> for EngineScene {
    fn from(record: EngineRecord) -> Self {
        EngineScene {
            position: Position::new(record.x, record.y),
            density: record.density,
            randomness: record.randomness,
        }
    }
}

/// Decode a scene record. Trailing bytes are an error.
pub fn read_scene(data: &[u8]) -> Result<Scene, FormatError> {
    let mut cursor = Cursor::new(data);
    let record = SceneRecord::read(&mut cursor)?;
    if cursor.position() as usize != data.len() {
        return Err(FormatError::InvalidLength { expected: SCENE_RECORD_LEN, found: data.len() });
    }
    Ok(Scene {
        engines: record.engines.map(EngineScene::from),
    })
}

pub fn write_scene(scene: &Scene) -> Result<Vec<u8>, FormatError> {
    let record = SceneRecord {
        engines: [EngineRecord::from(&scene.engines[0]), EngineRecord::from(&scene.engines[1])],
    };
    let mut cursor = Cursor::new(Vec::with_capacity(SCENE_RECORD_LEN));
    record.write(&mut cursor)?;
    Ok(cursor.into_inner())
}
