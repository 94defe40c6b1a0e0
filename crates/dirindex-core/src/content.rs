//! Extension-based content type tagging.

use std::path::Path;

use compact_str::{CompactString, format_compact};

/// Broad content categories used as the first half of a type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Code,
    Config,
    Executable,
    Font,
    Database,
    DiskImage,
    Other,
}

impl ContentCategory {
    /// Lowercase label used in type tags.
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Code => "code",
            Self::Config => "config",
            Self::Executable => "executable",
            Self::Font => "font",
            Self::Database => "database",
            Self::DiskImage => "disk-image",
            Self::Other => "other",
        }
    }
}

/// Classify a lowercase file extension.
pub fn categorize_extension(ext: &str) -> ContentCategory {
    match ext {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "psd" | "raw" | "cr2" | "nef" | "heic" | "heif" | "avif" => ContentCategory::Image,

        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg"
        | "3gp" => ContentCategory::Video,

        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "opus" | "mid" | "midi" => {
            ContentCategory::Audio
        }

        "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx"
        | "csv" | "md" | "epub" | "pages" | "numbers" | "key" => ContentCategory::Document,

        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "tgz" | "lz4" => {
            ContentCategory::Archive
        }

        "rs" | "py" | "js" | "ts" | "tsx" | "jsx" | "c" | "h" | "cpp" | "hpp" | "cc" | "java"
        | "kt" | "go" | "rb" | "php" | "swift" | "m" | "cs" | "html" | "css" | "scss" | "sh"
        | "zsh" | "lua" | "sql" => ContentCategory::Code,

        "toml" | "yaml" | "yml" | "json" | "xml" | "ini" | "cfg" | "conf" | "plist" | "lock" => {
            ContentCategory::Config
        }

        "exe" | "dll" | "so" | "dylib" | "bin" | "msi" | "deb" | "rpm" | "appimage" => {
            ContentCategory::Executable
        }

        "ttf" | "otf" | "woff" | "woff2" => ContentCategory::Font,

        "db" | "sqlite" | "sqlite3" | "mdb" => ContentCategory::Database,

        "iso" | "img" | "dmg" | "vhd" | "vhdx" | "vmdk" | "qcow2" => ContentCategory::DiskImage,

        _ => ContentCategory::Other,
    }
}

/// Derive a `category/extension` tag for a file path.
///
/// Returns `None` for paths without a UTF-8 extension.
pub fn type_tag_for(path: &Path) -> Option<CompactString> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }
    let category = categorize_extension(&ext);
    Some(format_compact!("{}/{}", category.label(), ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(categorize_extension("png"), ContentCategory::Image);
        assert_eq!(categorize_extension("rs"), ContentCategory::Code);
        assert_eq!(categorize_extension("toml"), ContentCategory::Config);
        assert_eq!(categorize_extension("dmg"), ContentCategory::DiskImage);
    }

    #[test]
    fn test_type_tag_lowercases() {
        let tag = type_tag_for(Path::new("/music/Track.FLAC"));
        assert_eq!(tag.as_deref(), Some("audio/flac"));
    }

    #[test]
    fn test_unknown_extension_is_other() {
        let tag = type_tag_for(Path::new("/tmp/blob.xyz"));
        assert_eq!(tag.as_deref(), Some("other/xyz"));
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(type_tag_for(Path::new("/usr/bin/make")), None);
        assert_eq!(type_tag_for(Path::new("/home/user/.bashrc")), None);
    }
}
