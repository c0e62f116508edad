//! 候选歌曲与本地文件的相似度评分。

use crate::model::{matching::LocalTrack, song::SongInfo};

const TITLE_WEIGHT: f64 = 0.5;
const ARTIST_WEIGHT: f64 = 0.3;
const ALBUM_WEIGHT: f64 = 0.2;

/// 归一化的编辑距离相似度：`1 - levenshtein(a, b) / max(len)`。
///
/// 比较前去掉首尾空白并转为小写。两个空字符串的相似度为 1。
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    strsim::normalized_levenshtein(&a, &b)
}

/// 本地文件与候选歌曲的匹配置信度，范围 [0, 1]。
///
/// 标题、艺术家、专辑按 0.5 / 0.3 / 0.2 加权，只统计两边都有值的字段，
/// 权重按这些字段重新归一化。本地文件没有标题时用文件名代替。
/// 没有任何可比较的字段时置信度为 0。
#[must_use]
pub fn confidence(track: &LocalTrack, song: &SongInfo) -> f64 {
    let local_title = track
        .title()
        .map_or_else(|| track.search_keyword(), str::to_string);

    let fields = [
        (
            TITLE_WEIGHT,
            non_empty(&local_title).map(|title| similarity(title, &song.title)),
        ),
        (
            ARTIST_WEIGHT,
            track
                .artist()
                .filter(|_| !song.artists.is_empty())
                .map(|artist| artist_similarity(artist, &song.artists)),
        ),
        (
            ALBUM_WEIGHT,
            track
                .album()
                .zip(song.album.as_deref().and_then(non_empty))
                .map(|(local, remote)| similarity(local, remote)),
        ),
    ];

    let (weighted, total_weight) = fields
        .iter()
        .filter_map(|&(weight, score)| score.map(|s| (weight * s, weight)))
        .fold((0.0, 0.0), |(sum, total), (ws, w)| (sum + ws, total + w));

    if total_weight > 0.0 {
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 与完整的艺术家串或其中任一位艺术家比较，取较高者。
fn artist_similarity(local: &str, remote: &[String]) -> f64 {
    let joined = similarity(local, &remote.join("/"));
    remote
        .iter()
        .map(|artist| similarity(local, artist))
        .fold(joined, f64::max)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::song::Platform;

    fn song(title: &str, artists: &[&str], album: Option<&str>) -> SongInfo {
        SongInfo {
            id: "1".to_string(),
            title: title.to_string(),
            artists: artists.iter().map(ToString::to_string).collect(),
            album: album.map(ToString::to_string),
            duration_ms: None,
            platform: Platform::QqMusic,
            extra: BTreeMap::new(),
        }
    }

    fn track(title: Option<&str>, artist: Option<&str>, album: Option<&str>) -> LocalTrack {
        LocalTrack {
            path: "/music/a.flac".into(),
            title: title.map(ToString::to_string),
            artist: artist.map(ToString::to_string),
            album: album.map(ToString::to_string),
            duration_ms: None,
        }
    }

    #[test]
    fn test_similarity_properties() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("Hello", "hello ") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("abc", "xyz")).abs() < f64::EPSILON);
        assert!((similarity("kitten", "sitting") - similarity("sitting", "kitten")).abs() < 1e-12);
        let s = similarity("晴天", "晴天 (Live)");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_identical_metadata_is_full_confidence() {
        let local = track(Some("晴天"), Some("周杰伦"), Some("叶惠美"));
        let remote = song("晴天", &["周杰伦"], Some("叶惠美"));
        assert!((confidence(&local, &remote) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_renormalize_over_present_fields() {
        let local = track(Some("abcd"), Some("周杰伦"), None);
        let remote = song("abce", &["周杰伦"], Some("叶惠美"));
        // 标题 0.75 * 0.5 + 艺术家 1.0 * 0.3，除以 0.8
        let expected = 0.75f64.mul_add(0.5, 0.3) / 0.8;
        assert!((confidence(&local, &remote) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_one_of_many_artists() {
        let local = track(Some("x"), Some("B"), None);
        let remote = song("x", &["A", "B"], None);
        assert!((confidence(&local, &remote) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_file_stem_stands_in_for_title() {
        let local = LocalTrack::from_path("/music/晴天.mp3");
        let remote = song("晴天", &["周杰伦"], None);
        assert!((confidence(&local, &remote) - 1.0).abs() < 1e-12);
    }
}
