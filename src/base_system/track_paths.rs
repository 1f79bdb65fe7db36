use std::path::{Path, PathBuf};

use crate::base_system::context::safe_fs_name;
use crate::catalog::TrackMetadata;

pub fn artist_folder_name(meta: &TrackMetadata) -> String {
    safe_fs_name(meta.primary_artist(), "_", 120)
}

pub fn track_file_name(meta: &TrackMetadata, extension: &str) -> String {
    let stem = safe_fs_name(&format!("{} - {}", meta.artist_line(), meta.title), "_", 180);
    let ext = safe_fs_name(extension.trim().trim_start_matches('.'), "_", 16).to_ascii_lowercase();
    format!("{stem}.{ext}")
}

/// `<base>/<主歌手>/<歌手 - 歌名>.<ext>`，只依赖歌曲元数据与扩展名。
pub fn track_file_path(base: &Path, meta: &TrackMetadata, extension: &str) -> PathBuf {
    base.join(artist_folder_name(meta))
        .join(track_file_name(meta, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackId;

    fn meta(artists: &[&str], title: &str) -> TrackMetadata {
        TrackMetadata {
            id: TrackId(1),
            title: title.to_string(),
            artists: artists.iter().map(|s| s.to_string()).collect(),
            album: "album".into(),
            cover_url: None,
            lyrics: None,
        }
    }

    #[test]
    fn path_uses_primary_artist_folder_and_joined_artists() {
        let m = meta(&["A/B", "C"], "Song: One");
        let path = track_file_path(Path::new("MyMusic"), &m, "FLAC");
        assert_eq!(
            path,
            PathBuf::from("MyMusic").join("A_B").join("A_B & C - Song_ One.flac")
        );
    }

    #[test]
    fn path_is_deterministic() {
        let m = meta(&["X"], "Y");
        assert_eq!(
            track_file_path(Path::new("b"), &m, "mp3"),
            track_file_path(Path::new("b"), &m, "mp3")
        );
    }
}
