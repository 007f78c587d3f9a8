//! File signature ("magic bytes") identification
//!
//! A [`SignatureTable`] maps byte patterns at fixed offsets to the [`FileType`]
//! they identify. Lookups only need the first few hundred bytes of a file.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default number of leading bytes read for identification.
/// Large enough to reach the `ustar` marker of tar archives at offset 257.
pub const DEFAULT_PREFIX_LEN: usize = 512;

/// Known file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Ico,
    Psd,
    Zip,
    OfficeOpenXml,
    OpenDocument,
    Jar,
    Apk,
    Epub,
    Ole,
    Gzip,
    Bzip2,
    Xz,
    SevenZip,
    Rar,
    Tar,
    Mp3,
    Flac,
    Ogg,
    Wav,
    Avi,
    IsoMedia,
    QuickTime,
    Matroska,
    Midi,
    WindowsExecutable,
    Elf,
    JavaClass,
    Sqlite,
    Rtf,
    Wasm,
}

impl FileType {
    /// Extensions a file of this type is expected to carry
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Gif => &["gif"],
            Self::Bmp => &["bmp"],
            Self::Tiff => &["tif", "tiff"],
            Self::Webp => &["webp"],
            Self::Ico => &["ico"],
            Self::Psd => &["psd"],
            Self::Zip => &["zip"],
            Self::OfficeOpenXml => &["docx", "xlsx", "pptx"],
            Self::OpenDocument => &["odt", "ods", "odp"],
            Self::Jar => &["jar"],
            Self::Apk => &["apk"],
            Self::Epub => &["epub"],
            Self::Ole => &["doc", "xls", "ppt", "msg"],
            Self::Gzip => &["gz", "tgz"],
            Self::Bzip2 => &["bz2"],
            Self::Xz => &["xz"],
            Self::SevenZip => &["7z"],
            Self::Rar => &["rar"],
            Self::Tar => &["tar"],
            Self::Mp3 => &["mp3"],
            Self::Flac => &["flac"],
            Self::Ogg => &["ogg", "oga", "ogv"],
            Self::Wav => &["wav"],
            Self::Avi => &["avi"],
            Self::IsoMedia => &["mp4", "m4a", "m4v", "mov", "3gp", "heic", "avif"],
            Self::QuickTime => &["mov"],
            Self::Matroska => &["mkv", "webm"],
            Self::Midi => &["mid", "midi"],
            Self::WindowsExecutable => &["exe", "dll"],
            Self::Elf => &["elf", "so"],
            Self::JavaClass => &["class"],
            Self::Sqlite => &["sqlite", "db"],
            Self::Rtf => &["rtf"],
            Self::Wasm => &["wasm"],
        }
    }

    /// Check if `extension` (normalized, without dot) belongs to this type
    pub fn accepts(self, extension: &str) -> bool {
        self.extensions().contains(&extension)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A byte pattern expected at a fixed offset, with optional alternates
#[derive(Debug, Clone)]
pub struct Signature {
    pub file_type: FileType,
    pub offset: usize,
    pub magic: &'static [u8],
    pub alternates: &'static [&'static [u8]],
}

impl Signature {
    pub const fn new(file_type: FileType, offset: usize, magic: &'static [u8]) -> Self {
        Self {
            file_type,
            offset,
            magic,
            alternates: &[],
        }
    }

    pub const fn with_alternates(
        file_type: FileType,
        offset: usize,
        magic: &'static [u8],
        alternates: &'static [&'static [u8]],
    ) -> Self {
        Self {
            file_type,
            offset,
            magic,
            alternates,
        }
    }

    /// Exact byte comparison at `offset`. A prefix too short to cover a
    /// pattern simply does not match it.
    pub fn matches(&self, prefix: &[u8]) -> bool {
        std::iter::once(self.magic)
            .chain(self.alternates.iter().copied())
            .any(|pattern| {
                prefix
                    .get(self.offset..self.offset + pattern.len())
                    .map_or(false, |window| window == pattern)
            })
    }

    /// Bytes of prefix needed to evaluate every pattern of this signature
    pub fn required_len(&self) -> usize {
        std::iter::once(self.magic)
            .chain(self.alternates.iter().copied())
            .map(|pattern| self.offset + pattern.len())
            .max()
            .unwrap_or(self.offset)
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_ALTERNATES: &[&[u8]] = &[b"PK\x05\x06", b"PK\x07\x08"];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const BUILTIN_SIGNATURES: &[Signature] = &[
    Signature::new(FileType::Pdf, 0, b"%PDF-"),
    Signature::new(FileType::Jpeg, 0, &[0xFF, 0xD8, 0xFF]),
    Signature::new(FileType::Png, 0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
    Signature::with_alternates(FileType::Gif, 0, b"GIF87a", &[b"GIF89a"]),
    Signature::new(FileType::Bmp, 0, b"BM"),
    Signature::with_alternates(FileType::Tiff, 0, b"II*\x00", &[b"MM\x00*"]),
    Signature::new(FileType::Webp, 8, b"WEBP"),
    Signature::new(FileType::Ico, 0, &[0x00, 0x00, 0x01, 0x00]),
    Signature::new(FileType::Psd, 0, b"8BPS"),
    // Zip containers share the local file header
    Signature::with_alternates(FileType::Zip, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::with_alternates(FileType::OfficeOpenXml, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::with_alternates(FileType::OpenDocument, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::with_alternates(FileType::Jar, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::with_alternates(FileType::Apk, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::with_alternates(FileType::Epub, 0, ZIP_MAGIC, ZIP_ALTERNATES),
    Signature::new(FileType::Ole, 0, OLE_MAGIC),
    Signature::new(FileType::Gzip, 0, &[0x1F, 0x8B]),
    // Block size digit included so plain text starting with "BZh" is not taken for bzip2
    Signature::with_alternates(
        FileType::Bzip2,
        0,
        b"BZh1",
        &[b"BZh2", b"BZh3", b"BZh4", b"BZh5", b"BZh6", b"BZh7", b"BZh8", b"BZh9"],
    ),
    Signature::new(FileType::Xz, 0, &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]),
    Signature::new(FileType::SevenZip, 0, &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]),
    Signature::with_alternates(
        FileType::Rar,
        0,
        b"Rar!\x1A\x07\x00",
        &[b"Rar!\x1A\x07\x01\x00"],
    ),
    Signature::new(FileType::Tar, 257, b"ustar"),
    // ID3v2.2 to v2.4 tags, or a bare MPEG-1 Layer III frame sync
    Signature::with_alternates(
        FileType::Mp3,
        0,
        b"ID3\x04",
        &[b"ID3\x03", b"ID3\x02", &[0xFF, 0xFB]],
    ),
    Signature::new(FileType::Flac, 0, b"fLaC"),
    Signature::new(FileType::Ogg, 0, b"OggS"),
    Signature::new(FileType::Wav, 8, b"WAVE"),
    Signature::new(FileType::Avi, 8, b"AVI "),
    Signature::new(FileType::IsoMedia, 4, b"ftyp"),
    Signature::with_alternates(FileType::QuickTime, 4, b"moov", &[b"mdat", b"wide"]),
    Signature::new(FileType::Matroska, 0, &[0x1A, 0x45, 0xDF, 0xA3]),
    Signature::new(FileType::Midi, 0, b"MThd"),
    Signature::new(FileType::WindowsExecutable, 0, b"MZ"),
    Signature::new(FileType::Elf, 0, b"\x7FELF"),
    Signature::new(FileType::JavaClass, 0, &[0xCA, 0xFE, 0xBA, 0xBE]),
    Signature::new(FileType::Sqlite, 0, b"SQLite format 3\x00"),
    Signature::new(FileType::Rtf, 0, b"{\\rtf1"),
    Signature::new(FileType::Wasm, 0, b"\x00asm"),
];

/// Result of matching a prefix against the signature table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    /// No registered signature matched
    Unknown,
    /// One or more formats matched (containers often share patterns)
    Matched(BTreeSet<FileType>),
}

impl Identification {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// All extensions of all matched types; empty for `Unknown`
    pub fn extensions(&self) -> BTreeSet<&'static str> {
        match self {
            Self::Unknown => BTreeSet::new(),
            Self::Matched(types) => types
                .iter()
                .flat_map(|t| t.extensions().iter().copied())
                .collect(),
        }
    }

    /// True only when content was recognized and the claimed extension is
    /// not among the recognized formats. Unknown content never contradicts.
    pub fn contradicts(&self, claimed: &str) -> bool {
        match self {
            Self::Unknown => false,
            Self::Matched(types) => !types.iter().any(|t| t.accepts(claimed)),
        }
    }
}

/// Immutable lookup table of known signatures
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SignatureTable {
    /// Table with the built-in set of signatures
    pub fn builtin() -> Self {
        Self {
            signatures: BUILTIN_SIGNATURES.to_vec(),
        }
    }

    /// Table with an explicit set of signatures
    pub fn from_signatures(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Identify the formats whose signatures match `prefix`
    pub fn identify(&self, prefix: &[u8]) -> Identification {
        let types: BTreeSet<FileType> = self
            .signatures
            .iter()
            .filter(|sig| sig.matches(prefix))
            .map(|sig| sig.file_type)
            .collect();

        if types.is_empty() {
            Identification::Unknown
        } else {
            Identification::Matched(types)
        }
    }

    /// Every extension some signature in the table vouches for
    pub fn known_extensions(&self) -> BTreeSet<&'static str> {
        self.signatures
            .iter()
            .flat_map(|sig| sig.file_type.extensions().iter().copied())
            .collect()
    }

    /// Check if `extension` can be confirmed by content at all
    pub fn knows_extension(&self, extension: &str) -> bool {
        self.signatures.iter().any(|sig| sig.file_type.accepts(extension))
    }

    /// Longest prefix any signature in the table can use
    pub fn max_required_len(&self) -> usize {
        self.signatures
            .iter()
            .map(Signature::required_len)
            .max()
            .unwrap_or(0)
    }
}

/// Read up to `len` leading bytes of a file; shorter files yield all their bytes
pub fn read_prefix(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}
