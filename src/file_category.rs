/// File categorization by extension.
///
/// This module maps file extensions to broad categories (e.g. "Images",
/// "Music", "Spreadsheets"). The mapping is total: anything unknown,
/// including files without an extension, lands in [`Category::Other`].
///
/// # Examples
///
/// ```
/// use tidyren::file_category::{Category, classify};
///
/// assert_eq!(classify("png"), Category::Images);
/// assert_eq!(classify(".MP3"), Category::Music);
/// assert_eq!(classify("xyz"), Category::Other);
/// assert_eq!(classify(""), Category::Other);
/// ```
use serde::Serialize;
use std::collections::HashMap;

/// Represents a broad file category.
///
/// The category name doubles as the name of the folder files are organized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Images,
    Videos,
    Music,
    Documents,
    Spreadsheets,
    Presentations,
    Archives,
    Programs,
    System,
    Code,
    Web,
    Data,
    Database,
    Design,
    Fonts,
    /// Unknown or uncategorized files
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 16] = [
        Category::Images,
        Category::Videos,
        Category::Music,
        Category::Documents,
        Category::Spreadsheets,
        Category::Presentations,
        Category::Archives,
        Category::Programs,
        Category::System,
        Category::Code,
        Category::Web,
        Category::Data,
        Category::Database,
        Category::Design,
        Category::Fonts,
        Category::Other,
    ];

    /// Returns the category name, also used as its folder name.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyren::file_category::Category;
    ///
    /// assert_eq!(Category::Images.name(), "Images");
    /// assert_eq!(Category::Other.name(), "Other");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Music => "Music",
            Category::Documents => "Documents",
            Category::Spreadsheets => "Spreadsheets",
            Category::Presentations => "Presentations",
            Category::Archives => "Archives",
            Category::Programs => "Programs",
            Category::System => "System",
            Category::Code => "Code",
            Category::Web => "Web",
            Category::Data => "Data",
            Category::Database => "Database",
            Category::Design => "Design",
            Category::Fonts => "Fonts",
            Category::Other => "Other",
        }
    }

    /// Returns a human-readable description of this category.
    pub fn description(&self) -> &'static str {
        match self {
            Category::Images => "Image files",
            Category::Videos => "Video files",
            Category::Music => "Audio files",
            Category::Documents => "Document files",
            Category::Spreadsheets => "Spreadsheet files",
            Category::Presentations => "Presentation files",
            Category::Archives => "Archive files",
            Category::Programs => "Executables and installers",
            Category::System => "System and configuration files",
            Category::Code => "Source code files",
            Category::Web => "Web pages and stylesheets",
            Category::Data => "Structured data files",
            Category::Database => "Database files",
            Category::Design => "Design and CAD files",
            Category::Fonts => "Font files",
            Category::Other => "Other files",
        }
    }

    /// Looks a category up by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static extension table. Extensions are lowercase and dot-less.
pub const EXTENSION_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Images,
        &[
            "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "svg", "ico", "heic",
            "heif", "raw", "cr2", "nef", "arw", "dng",
        ],
    ),
    (
        Category::Videos,
        &[
            "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "3gp",
        ],
    ),
    (
        Category::Music,
        &[
            "mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "opus", "aiff", "mid", "midi",
        ],
    ),
    (
        Category::Documents,
        &["pdf", "doc", "docx", "txt", "rtf", "odt", "md", "tex", "epub"],
    ),
    (
        Category::Spreadsheets,
        &["xls", "xlsx", "xlsm", "ods", "csv", "tsv"],
    ),
    (Category::Presentations, &["ppt", "pptx", "odp", "key"]),
    (
        Category::Archives,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz", "iso", "cab"],
    ),
    (
        Category::Programs,
        &[
            "exe", "msi", "dmg", "pkg", "deb", "rpm", "appimage", "apk", "bat", "cmd", "com",
        ],
    ),
    (
        Category::System,
        &["dll", "sys", "ini", "cfg", "inf", "reg", "log", "tmp", "drv", "lnk"],
    ),
    (
        Category::Code,
        &[
            "rs", "py", "js", "ts", "c", "cpp", "h", "hpp", "cs", "java", "go", "rb", "php",
            "swift", "kt", "sh", "ps1", "lua",
        ],
    ),
    (
        Category::Web,
        &["html", "htm", "css", "scss", "sass", "less", "jsx", "tsx", "vue"],
    ),
    (Category::Data, &["json", "xml", "yaml", "yml", "toml"]),
    (
        Category::Database,
        &["db", "sqlite", "sqlite3", "mdb", "accdb", "sql", "dbf"],
    ),
    (
        Category::Design,
        &["psd", "ai", "xd", "fig", "sketch", "indd", "eps", "dwg", "blend"],
    ),
    (Category::Fonts, &["ttf", "otf", "woff", "woff2", "fon", "eot"]),
];

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Maps an extension to its category using the static table.
///
/// Case-insensitive and tolerant of a leading dot. Never fails: unknown and
/// empty extensions map to [`Category::Other`].
pub fn classify(ext: &str) -> Category {
    let ext = normalize(ext);
    EXTENSION_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Maps file extensions to categories, with room for custom mappings.
///
/// Starts from [`EXTENSION_TABLE`]; mappings added later override it.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let extension_map = EXTENSION_TABLE
            .iter()
            .flat_map(|(category, exts)| exts.iter().map(|ext| (ext.to_string(), *category)))
            .collect();
        Self { extension_map }
    }

    /// Adds (or overrides) a file extension to category mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map.insert(normalize(ext), category);
    }

    /// Maps a file extension to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyren::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Documents));
    /// assert_eq!(mapper.extension_to_category("PNG"), Some(Category::Images));
    /// assert_eq!(mapper.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&normalize(ext)).copied()
    }

    /// Determines the category for a file.
    ///
    /// The function uses the following strategy:
    /// 1. Match the file's own extension
    /// 2. Fall back to the extension detected from the file content, if any
    /// 3. Return `Category::Other` if neither matches
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyren::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.categorize(Some("png"), Some("pdf")), Category::Images);
    /// assert_eq!(mapper.categorize(None, Some("pdf")), Category::Documents);
    /// assert_eq!(mapper.categorize(None, None), Category::Other);
    /// ```
    pub fn categorize(&self, ext: Option<&str>, detected_ext: Option<&str>) -> Category {
        ext.and_then(|e| self.extension_to_category(e))
            .or_else(|| detected_ext.and_then(|e| self.extension_to_category(e)))
            .unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Images.name(), "Images");
        assert_eq!(Category::Music.name(), "Music");
        assert_eq!(Category::Database.name(), "Database");
        assert_eq!(Category::Other.to_string(), "Other");
    }

    #[test]
    fn test_category_serializes_as_folder_name() {
        let json = serde_json::to_string(&Category::Images).unwrap();
        assert_eq!(json, "\"Images\"");

        let json = serde_json::to_string(&Category::Spreadsheets).unwrap();
        assert_eq!(json, format!("\"{}\"", Category::Spreadsheets.name()));
    }

    #[test]
    fn test_from_name_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.name()), Some(category));
        }
        assert_eq!(Category::from_name(" images "), Some(Category::Images));
        assert_eq!(Category::from_name("Nonsense"), None);
    }

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(classify("jpg"), Category::Images);
        assert_eq!(classify("mkv"), Category::Videos);
        assert_eq!(classify("flac"), Category::Music);
        assert_eq!(classify("docx"), Category::Documents);
        assert_eq!(classify("xlsx"), Category::Spreadsheets);
        assert_eq!(classify("pptx"), Category::Presentations);
        assert_eq!(classify("7z"), Category::Archives);
        assert_eq!(classify("exe"), Category::Programs);
        assert_eq!(classify("dll"), Category::System);
        assert_eq!(classify("rs"), Category::Code);
        assert_eq!(classify("html"), Category::Web);
        assert_eq!(classify("json"), Category::Data);
        assert_eq!(classify("sqlite"), Category::Database);
        assert_eq!(classify("psd"), Category::Design);
        assert_eq!(classify("woff2"), Category::Fonts);
    }

    #[test]
    fn test_classify_is_total() {
        for ext in ["", ".", "xyz", "  ", "tar.gz", "ünïcødé"] {
            // Never panics, always yields some category
            let _ = classify(ext);
        }
        assert_eq!(classify(""), Category::Other);
        assert_eq!(classify("unknownext"), Category::Other);
    }

    #[test]
    fn test_classify_case_and_dot_insensitive() {
        assert_eq!(classify("PDF"), Category::Documents);
        assert_eq!(classify(".Mp3"), Category::Music);
        assert_eq!(classify(" .PNG "), Category::Images);
    }

    #[test]
    fn test_extension_table_has_no_duplicates() {
        let mut seen = HashSet::new();
        for (_, exts) in EXTENSION_TABLE {
            for ext in *exts {
                assert!(seen.insert(*ext), "duplicate extension {}", ext);
                assert_eq!(*ext, ext.to_lowercase());
            }
        }
    }

    #[test]
    fn test_mapper_agrees_with_classify() {
        let mapper = FileMapper::default();
        for (category, exts) in EXTENSION_TABLE {
            for ext in *exts {
                assert_eq!(mapper.extension_to_category(ext), Some(*category));
                assert_eq!(classify(ext), *category);
            }
        }
    }

    #[test]
    fn test_custom_mapping_overrides_table() {
        let mut mapper = FileMapper::default();
        mapper.add_extension_mapping(".LOG", Category::Documents);
        mapper.add_extension_mapping("custom", Category::Code);

        assert_eq!(mapper.extension_to_category("log"), Some(Category::Documents));
        assert_eq!(mapper.extension_to_category("custom"), Some(Category::Code));
    }

    #[test]
    fn test_categorize_prefers_own_extension() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.categorize(Some("csv"), Some("zip")), Category::Spreadsheets);
        assert_eq!(mapper.categorize(Some("weird"), Some("zip")), Category::Archives);
        assert_eq!(mapper.categorize(Some("weird"), None), Category::Other);
    }
}
