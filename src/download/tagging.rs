//! 下载完成后的标签写入（标题 / 歌手 / 专辑 / 歌词 / 封面）。

use std::path::Path;
use std::time::Duration;

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::file::FileType;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use thiserror::Error;
use tracing::{debug, warn};

use super::transport::fetch_bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMetadata {
    pub title: String,
    /// 多个歌手已用 " & " 拼接。
    pub artist: String,
    pub album: String,
    pub cover_url: Option<String>,
    pub lyrics: Option<String>,
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("不支持的文件类型: {0}")]
    Unsupported(String),
    #[error("{0}")]
    Lofty(#[from] LoftyError),
    #[error("文件没有可写入的标签")]
    NoTag,
}

pub trait TagWriter: Send + Sync {
    fn embed_tags(&self, path: &Path, meta: &TagMetadata) -> Result<(), TagError>;

    /// 为 `false` 时调用方不必去取歌词。
    fn wants_lyrics(&self) -> bool {
        true
    }
}

pub struct LoftyTagWriter {
    pub cover_timeout: Duration,
    pub embed_cover: bool,
    pub embed_lyrics: bool,
}

impl Default for LoftyTagWriter {
    fn default() -> Self {
        Self {
            cover_timeout: Duration::from_secs(15),
            embed_cover: true,
            embed_lyrics: true,
        }
    }
}

impl LoftyTagWriter {
    fn cover_picture(&self, url: &str) -> Option<Picture> {
        let Some(bytes) = fetch_bytes(url, self.cover_timeout) else {
            warn!(target: "tag", url, "封面下载失败，跳过封面");
            return None;
        };
        let mime = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };
        Some(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            None,
            bytes,
        ))
    }
}

impl TagWriter for LoftyTagWriter {
    fn wants_lyrics(&self) -> bool {
        self.embed_lyrics
    }

    fn embed_tags(&self, path: &Path, meta: &TagMetadata) -> Result<(), TagError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if FileType::from_ext(ext).is_none() {
            return Err(TagError::Unsupported(ext.to_string()));
        }

        let mut tagged = Probe::open(path)?.read()?;
        if tagged.primary_tag().is_none() {
            let tag_type = tagged.primary_tag_type();
            tagged.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged.primary_tag_mut().ok_or(TagError::NoTag)?;

        tag.set_title(meta.title.clone());
        tag.set_artist(meta.artist.clone());
        tag.set_album(meta.album.clone());

        if self.embed_lyrics
            && let Some(lyrics) = meta.lyrics.as_deref().filter(|l| !l.trim().is_empty())
        {
            tag.insert_text(ItemKey::Lyrics, lyrics.to_string());
        }

        if self.embed_cover
            && let Some(url) = meta.cover_url.as_deref()
            && let Some(picture) = self.cover_picture(url)
        {
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(picture);
        }

        tagged.save_to_path(path, WriteOptions::default())?;
        debug!(target: "tag", path = %path.display(), "标签写入完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TagMetadata {
        TagMetadata {
            title: "t".into(),
            artist: "a".into(),
            album: "b".into(),
            cover_url: None,
            lyrics: None,
        }
    }

    #[test]
    fn lyrics_wanted_only_when_embedding() {
        assert!(LoftyTagWriter::default().wants_lyrics());
        let writer = LoftyTagWriter {
            embed_lyrics: false,
            ..LoftyTagWriter::default()
        };
        assert!(!writer.wants_lyrics());
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.xyz");
        std::fs::write(&path, b"data").unwrap();
        let err = LoftyTagWriter::default()
            .embed_tags(&path, &meta())
            .unwrap_err();
        assert!(matches!(err, TagError::Unsupported(ext) if ext == "xyz"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.flac");
        assert!(LoftyTagWriter::default().embed_tags(&path, &meta()).is_err());
    }
}
