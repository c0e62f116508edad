//! 为本地音乐文件匹配歌词。

pub mod batch;
pub mod collaborators;
pub mod engine;

pub use self::{
    batch::{BatchProgress, BatchReport, BatchRunner},
    collaborators::{
        DeviceInfo, DeviceTier, SidecarFileWriter, SystemDeviceInfo, TagWriteOutcome, TagWriter,
        WriteMode,
    },
    engine::{MatchEngine, MatchOptions},
};
