//! 库中共享的数据模型。

pub mod lyrics;
pub mod matching;
pub mod session;
pub mod song;
