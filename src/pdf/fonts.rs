//! Font discovery, measurement and embedding.
//!
//! A `FontResolver` walks an ordered chain of `FontSearch` strategies and
//! loads the first candidate that parses as a font face. The loaded face
//! measures text for layout and is embedded as an Identity-H Type0 font.

use anyhow::Result;
use fontdb::Database;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ttf_parser::{Face, GlyphId};

use super::content::compress_data;
use crate::layout::TextMeasure;

/// Absolute paths of Unicode-capable fonts, tried in order.
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "C:\\Windows\\Fonts\\arialuni.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
];

/// Family names queried in the system font database.
pub const DEFAULT_FONT_FAMILIES: &[&str] = &[
    "Arial Unicode MS",
    "PingFang SC",
    "Hiragino Sans GB",
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "Microsoft YaHei",
    "WenQuanYi Micro Hei",
    "Noto Sans",
    "DejaVu Sans",
];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("no usable font found; searched {}", .searched.join("; "))]
    NotFound { searched: Vec<String> },
    #[error("failed to read font file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font file {path:?} (face {index})")]
    Parse { path: PathBuf, index: u32 },
    #[error("font file {path:?} has no TrueType outlines")]
    Unsupported { path: PathBuf },
}

/// A font file on disk and the face index inside it (non-zero for some
/// TrueType collections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontLocation {
    pub path: PathBuf,
    pub index: u32,
}

/// One way of finding font files.
pub trait FontSearch {
    /// Human readable description for logs and the not-found error.
    fn describe(&self) -> String;
    /// Candidate fonts in preference order.
    fn candidates(&self) -> Vec<FontLocation>;
}

/// Fixed list of absolute paths; only existing files are candidates.
pub struct FixedPaths {
    paths: Vec<PathBuf>,
}

impl FixedPaths {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_FONT_PATHS.iter().copied())
    }
}

impl FontSearch for FixedPaths {
    fn describe(&self) -> String {
        let paths: Vec<_> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("paths [{}]", paths.join(", "))
    }

    fn candidates(&self) -> Vec<FontLocation> {
        self.paths
            .iter()
            .filter(|path| path.is_file())
            .map(|path| FontLocation { path: path.clone(), index: 0 })
            .collect()
    }
}

/// Query the system font database for the given family names.
pub struct SystemFamilies {
    families: Vec<String>,
}

impl SystemFamilies {
    pub fn new<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { families: families.into_iter().map(Into::into).collect() }
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_FONT_FAMILIES.iter().copied())
    }
}

impl FontSearch for SystemFamilies {
    fn describe(&self) -> String {
        format!("system families [{}]", self.families.join(", "))
    }

    fn candidates(&self) -> Vec<FontLocation> {
        if self.families.is_empty() {
            return Vec::new();
        }

        let mut db = Database::new();
        db.load_system_fonts();

        let mut found = Vec::new();
        for family in &self.families {
            let query = fontdb::Query {
                families: &[fontdb::Family::Name(family)],
                ..Default::default()
            };

            let Some(id) = db.query(&query) else {
                continue;
            };
            // In-memory faces have no file to embed.
            if let Some((fontdb::Source::File(path), index)) = db.face_source(id) {
                let location = FontLocation { path, index };
                if !found.contains(&location) {
                    found.push(location);
                }
            }
        }
        found
    }
}

/// Ordered chain of font search strategies.
#[derive(Default)]
pub struct FontResolver {
    strategies: Vec<Box<dyn FontSearch>>,
}

impl FontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy; earlier strategies win.
    pub fn with(mut self, strategy: impl FontSearch + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Explicit paths and families first, then the built-in lists.
    pub fn with_defaults(self, paths: &[PathBuf], families: &[String]) -> Self {
        let mut resolver = self;
        if !paths.is_empty() {
            resolver = resolver.with(FixedPaths::new(paths.iter().cloned()));
        }
        if !families.is_empty() {
            resolver = resolver.with(SystemFamilies::new(families.iter().cloned()));
        }
        resolver.with(FixedPaths::defaults()).with(SystemFamilies::defaults())
    }

    /// Load the first candidate that parses, or report every strategy tried.
    pub fn resolve(&self) -> Result<LoadedFont, FontError> {
        for strategy in &self.strategies {
            for location in strategy.candidates() {
                match LoadedFont::load(&location) {
                    Ok(font) => {
                        info!(font = %font.name, path = ?location.path, strategy = %strategy.describe(), "using font");
                        return Ok(font);
                    }
                    Err(e) => warn!(error = %e, "skipping font candidate"),
                }
            }
        }
        Err(FontError::NotFound {
            searched: self.strategies.iter().map(|s| s.describe()).collect(),
        })
    }
}

/// Font program bytes plus the name it is embedded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontProgram {
    pub name: String,
    pub data: Vec<u8>,
    pub index: u32,
}

/// A parsed font face used for measurement and embedding.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub name: String,
    pub path: PathBuf,
    data: Vec<u8>,
    index: u32,
}

impl LoadedFont {
    pub fn load(location: &FontLocation) -> Result<Self, FontError> {
        let parse_error = || FontError::Parse {
            path: location.path.clone(),
            index: location.index,
        };
        let data = fs::read(&location.path).map_err(|source| FontError::Read {
            path: location.path.clone(),
            source,
        })?;
        // FontFile2 holds exactly one font, so a collection face is pulled out.
        let (data, index) = if ttf_parser::fonts_in_collection(&data).is_some() {
            (extract_collection_face(&data, location.index).ok_or_else(parse_error)?, 0)
        } else {
            (data, location.index)
        };
        let face = Face::parse(&data, index).map_err(|_| parse_error())?;
        if face.tables().glyf.is_none() {
            return Err(FontError::Unsupported { path: location.path.clone() });
        }

        let name = postscript_name(&face).unwrap_or_else(|| file_stem_name(&location.path));
        Ok(Self {
            name,
            path: location.path.clone(),
            data,
            index,
        })
    }

    pub fn program(&self) -> FontProgram {
        FontProgram {
            name: self.name.clone(),
            data: self.data.clone(),
            index: self.index,
        }
    }
}

impl TextMeasure for LoadedFont {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        // Already parsed once in `load`.
        let Ok(face) = Face::parse(&self.data, self.index) else {
            return 0.0;
        };
        let units_per_em = f64::from(face.units_per_em());
        let units: f64 = text.chars().map(|c| f64::from(char_advance(&face, c))).sum();
        units / units_per_em * font_size
    }
}

/// Advance of the glyph drawn for `c`, in font units.
///
/// Characters outside the BMP are drawn as CID 0, so they take the
/// .notdef advance.
fn char_advance(face: &Face, c: char) -> u16 {
    let glyph = if u32::from(c) > 0xFFFF {
        GlyphId(0)
    } else {
        face.glyph_index(c).unwrap_or(GlyphId(0))
    };
    face.glyph_hor_advance(glyph).unwrap_or(0)
}

/// Rebuild one face of a TrueType collection as a standalone font file.
///
/// The face's tables are copied into a fresh sfnt with its own directory,
/// sorted by tag and 4-byte aligned, and `head.checkSumAdjustment` is
/// recomputed for the new file.
fn extract_collection_face(data: &[u8], index: u32) -> Option<Vec<u8>> {
    const HEAD: u32 = u32::from_be_bytes(*b"head");
    const CFF: u32 = u32::from_be_bytes(*b"CFF ");

    let raw = ttf_parser::RawFace::parse(data, index).ok()?;
    let mut tables = Vec::with_capacity(usize::from(raw.table_records.len()));
    for record in raw.table_records {
        let start = usize::try_from(record.offset).ok()?;
        let end = start.checked_add(usize::try_from(record.length).ok()?)?;
        tables.push((record, data.get(start..end)?));
    }
    tables.sort_by_key(|(record, _)| record.tag.0);

    let num_tables = u16::try_from(tables.len()).ok().filter(|n| *n > 0)?;
    let entry_selector = 15 - num_tables.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector).checked_mul(16)?;
    let range_shift = num_tables.checked_mul(16)?.checked_sub(search_range)?;
    let version: u32 = if tables.iter().any(|(record, _)| record.tag.0 == CFF) {
        u32::from_be_bytes(*b"OTTO")
    } else {
        0x0001_0000
    };

    let mut font = Vec::new();
    font.extend(version.to_be_bytes());
    font.extend(num_tables.to_be_bytes());
    font.extend(search_range.to_be_bytes());
    font.extend(entry_selector.to_be_bytes());
    font.extend(range_shift.to_be_bytes());

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = None;
    for (record, table) in &tables {
        if record.tag.0 == HEAD {
            head_offset = Some(offset);
        }
        font.extend(record.tag.0.to_be_bytes());
        font.extend(record.check_sum.to_be_bytes());
        font.extend(u32::try_from(offset).ok()?.to_be_bytes());
        font.extend(record.length.to_be_bytes());
        offset += table.len().next_multiple_of(4);
    }
    for (_, table) in &tables {
        font.extend_from_slice(table);
        font.resize(font.len().next_multiple_of(4), 0);
    }

    if let Some(adjustment) = head_offset.map(|head| head + 8..head + 12) {
        if font.len() >= adjustment.end {
            font[adjustment.clone()].fill(0);
            let total = sfnt_checksum(&font);
            font[adjustment].copy_from_slice(&0xB1B0_AFBAu32.wrapping_sub(total).to_be_bytes());
        }
    }
    Some(font)
}

fn sfnt_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn postscript_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|name| name.to_string())
        .map(|name| sanitize_font_name(&name))
        .filter(|name| !name.is_empty())
}

fn file_stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_font_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "LabelFont".to_string())
}

/// PDF names in BaseFont must not contain whitespace or delimiters.
fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect()
}

/// Build a CIDToGIDMap stream from font's cmap table
///
/// CIDs are Unicode BMP code points (Identity-H), so each CID maps to the
/// glyph the cmap assigns to that code point.
fn build_cidtogid_map(face: &Face) -> Vec<u8> {
    const MAX_CID: u32 = 0xFFFF;
    let mut gid_map: Vec<u8> = Vec::with_capacity((MAX_CID as usize + 1) * 2);

    for cid in 0..=MAX_CID {
        let gid = char::from_u32(cid)
            .and_then(|ch| face.glyph_index(ch))
            .map_or(0, |g| g.0);
        gid_map.extend_from_slice(&gid.to_be_bytes());
    }

    gid_map
}

/// `/W` entries for the characters actually drawn: `cid [width]` pairs in
/// glyph space (1000 units per em).
fn build_widths(face: &Face, used: &BTreeSet<char>) -> Vec<Object> {
    let scale = 1000.0 / f64::from(face.units_per_em());
    let mut widths = Vec::new();
    for &ch in used {
        let Ok(cid) = u16::try_from(u32::from(ch)) else {
            continue;
        };
        let advance = f64::from(char_advance(face, ch));
        widths.push(Object::Integer(i64::from(cid)));
        widths.push(Object::Array(vec![Object::Integer((advance * scale).round() as i64)]));
    }
    widths
}

fn scaled(value: i16, scale: f64) -> Object {
    Object::Integer((f64::from(value) * scale).round() as i64)
}

fn font_descriptor(face: Option<&Face>, font_name: &str) -> Dictionary {
    let mut font_descriptor = Dictionary::new();
    font_descriptor.set("Type", "FontDescriptor");
    font_descriptor.set("FontName", font_name);
    font_descriptor.set("Flags", 4i64); // Symbolic
    font_descriptor.set("ItalicAngle", 0i64);
    font_descriptor.set("StemV", 80i64);

    match face {
        Some(face) => {
            let scale = 1000.0 / f64::from(face.units_per_em());
            let bbox = face.global_bounding_box();
            font_descriptor.set(
                "FontBBox",
                vec![
                    scaled(bbox.x_min, scale),
                    scaled(bbox.y_min, scale),
                    scaled(bbox.x_max, scale),
                    scaled(bbox.y_max, scale),
                ],
            );
            font_descriptor.set("Ascent", scaled(face.ascender(), scale));
            font_descriptor.set("Descent", scaled(face.descender(), scale));
            font_descriptor.set("CapHeight", scaled(face.capital_height().unwrap_or(face.ascender()), scale));
        }
        None => {
            font_descriptor.set("FontBBox", vec![0i64, 0, 1000, 1000].into_iter().map(Object::Integer).collect::<Vec<_>>());
            font_descriptor.set("Ascent", 1000i64);
            font_descriptor.set("Descent", -200i64);
            font_descriptor.set("CapHeight", 700i64);
        }
    }
    font_descriptor
}

fn add_compressed_stream(doc: &mut Document, mut dict: Dictionary, data: &[u8]) -> Result<ObjectId> {
    dict.set("Filter", "FlateDecode");
    let stream = Stream::new(dict, compress_data(data)?);
    Ok(doc.add_object(stream))
}

/// Embed a CID-keyed font covering the characters in `used`
///
/// Creates a Type0 font with a CIDFontType2 descendant, Identity-H encoding,
/// a CIDToGIDMap built from the cmap and `/W` widths for every used
/// character. A program that does not parse is still embedded with default
/// metrics and an Identity map.
pub fn embed_cid_font(doc: &mut Document, program: &FontProgram, used: &BTreeSet<char>) -> Result<ObjectId> {
    let face = Face::parse(&program.data, program.index).ok();
    let font_name = program.name.as_str();

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", "Font");
    cid_font.set("Subtype", "CIDFontType2");
    cid_font.set("BaseFont", font_name);
    cid_font.set("CIDSystemInfo", {
        let mut cid_system = Dictionary::new();
        cid_system.set("Registry", Object::String("Adobe".into(), StringFormat::Literal));
        cid_system.set("Ordering", Object::String("Identity".into(), StringFormat::Literal));
        cid_system.set("Supplement", 0i64);
        Object::Dictionary(cid_system)
    });
    cid_font.set("DW", 1000i64);

    match &face {
        Some(face) => {
            let cidtogid_id = add_compressed_stream(doc, Dictionary::new(), &build_cidtogid_map(face))?;
            cid_font.set("CIDToGIDMap", Object::Reference(cidtogid_id));
            let widths = build_widths(face, used);
            if !widths.is_empty() {
                cid_font.set("W", widths);
            }
        }
        None => {
            warn!(font = font_name, "font program did not parse; embedding with default metrics");
            cid_font.set("CIDToGIDMap", "Identity");
        }
    }

    let descriptor_id = doc.add_object(Object::Dictionary(font_descriptor(face.as_ref(), font_name)));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));

    // Embed the font program
    let mut font_stream_dict = Dictionary::new();
    font_stream_dict.set("Length1", program.data.len() as i64);
    let font_stream_id = add_compressed_stream(doc, font_stream_dict, &program.data)?;

    if let Ok(descriptor) = doc.get_dictionary_mut(descriptor_id) {
        descriptor.set("FontFile2", Object::Reference(font_stream_id));
    }

    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let mut type0_font = Dictionary::new();
    type0_font.set("Type", "Font");
    type0_font.set("Subtype", "Type0");
    type0_font.set("BaseFont", font_name);
    type0_font.set("Encoding", "Identity-H");
    type0_font.set("DescendantFonts", vec![Object::Reference(cid_font_id)]);

    Ok(doc.add_object(Object::Dictionary(type0_font)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml")
    }

    #[test]
    fn test_fixed_paths_only_yields_existing_files() {
        let search = FixedPaths::new(["/definitely/not/here.ttf".into(), manifest()]);
        assert_eq!(search.candidates(), vec![FontLocation { path: manifest(), index: 0 }]);
        assert!(search.describe().contains("/definitely/not/here.ttf"));
    }

    #[test]
    fn test_load_rejects_non_font_file() {
        let err = LoadedFont::load(&FontLocation { path: manifest(), index: 0 }).unwrap_err();
        assert!(matches!(err, FontError::Parse { .. }));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let location = FontLocation { path: PathBuf::from("/definitely/not/here.ttf"), index: 0 };
        let err = LoadedFont::load(&location).unwrap_err();
        assert!(matches!(err, FontError::Read { .. }));
    }

    #[test]
    fn test_resolver_not_found_lists_every_strategy() {
        let resolver = FontResolver::new()
            .with(FixedPaths::new(["/definitely/not/here.ttf"]))
            .with(FixedPaths::new([manifest()]))
            .with(SystemFamilies::new(Vec::<String>::new()));

        let err = resolver.resolve().unwrap_err();
        match &err {
            FontError::NotFound { searched } => assert_eq!(searched.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("/definitely/not/here.ttf"));
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("Arial Unicode MS"), "ArialUnicodeMS");
        assert_eq!(sanitize_font_name("PingFang(SC)/Regular"), "PingFangSCRegular");
    }

    #[test]
    fn test_embed_unparseable_program_uses_identity_map() {
        let mut doc = Document::with_version("1.5");
        let program = FontProgram { name: "StubFont".into(), data: b"not a font".to_vec(), index: 0 };
        let used: BTreeSet<char> = "Acme".chars().collect();

        let font_id = embed_cid_font(&mut doc, &program, &used).unwrap();

        let type0 = doc.get_dictionary(font_id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid_font = doc.get_dictionary(descendants[0].as_reference().unwrap()).unwrap();
        assert_eq!(cid_font.get(b"CIDToGIDMap").unwrap().as_name().unwrap(), b"Identity");
        assert!(cid_font.get(b"W").is_err());
    }

    /// Build a `ttcf` collection whose faces hold the given tables.
    fn sample_collection(faces: &[Vec<([u8; 4], Vec<u8>)>]) -> Vec<u8> {
        let header_len = 12 + 4 * faces.len();
        let data_start = header_len + faces.iter().map(|tables| 12 + 16 * tables.len()).sum::<usize>();

        let mut face_offsets = Vec::new();
        let mut directories = Vec::new();
        let mut body = Vec::new();
        for tables in faces {
            face_offsets.push((header_len + directories.len()) as u32);
            directories.extend(0x0001_0000u32.to_be_bytes());
            directories.extend((tables.len() as u16).to_be_bytes());
            directories.extend([0u8; 6]);
            for (tag, table) in tables {
                directories.extend(tag);
                directories.extend(0u32.to_be_bytes());
                directories.extend(((data_start + body.len()) as u32).to_be_bytes());
                directories.extend((table.len() as u32).to_be_bytes());
                body.extend(table);
                body.resize(body.len().next_multiple_of(4), 0);
            }
        }

        let mut collection = b"ttcf".to_vec();
        collection.extend(0x0001_0000u32.to_be_bytes());
        collection.extend((faces.len() as u32).to_be_bytes());
        for offset in face_offsets {
            collection.extend(offset.to_be_bytes());
        }
        collection.extend(directories);
        collection.extend(body);
        collection
    }

    #[test]
    fn test_collection_face_is_rebuilt_as_standalone_font() {
        let collection = sample_collection(&[
            vec![(*b"cmap", b"zero cmap".to_vec()), (*b"name", b"zero".to_vec())],
            vec![
                (*b"name", b"one name".to_vec()),
                (*b"head", vec![7u8; 54]),
                (*b"cmap", b"one cmap!".to_vec()),
            ],
        ]);
        assert_eq!(ttf_parser::fonts_in_collection(&collection), Some(2));

        let font = extract_collection_face(&collection, 1).unwrap();
        assert_eq!(&font[..4], &[0, 1, 0, 0]);
        assert_eq!(ttf_parser::fonts_in_collection(&font), None);
        assert_eq!(font.len() % 4, 0);

        let raw = ttf_parser::RawFace::parse(&font, 0).unwrap();
        assert_eq!(raw.table_records.len(), 3);
        let tags: Vec<_> = raw.table_records.into_iter().map(|record| record.tag.0.to_be_bytes()).collect();
        assert_eq!(tags, vec![*b"cmap", *b"head", *b"name"]);
        for record in raw.table_records {
            assert_eq!(record.offset % 4, 0);
        }
        assert_eq!(raw.table(ttf_parser::Tag::from_bytes(b"name")), Some(&b"one name"[..]));
        assert_eq!(raw.table(ttf_parser::Tag::from_bytes(b"cmap")), Some(&b"one cmap!"[..]));

        // The whole file sums to the sfnt magic once the adjustment is set.
        assert_eq!(sfnt_checksum(&font), 0xB1B0_AFBA);
    }

    #[test]
    fn test_collection_face_out_of_range() {
        let collection = sample_collection(&[vec![(*b"name", b"only".to_vec())]]);
        assert!(extract_collection_face(&collection, 1).is_none());
    }

    /// Resolve a font installed on this machine, if there is one.
    fn system_font() -> Option<LoadedFont> {
        FontResolver::new().with_defaults(&[], &[]).resolve().ok()
    }

    #[test]
    fn test_real_font_embedding_matches_measurement() {
        let Some(font) = system_font() else {
            return;
        };
        let used: BTreeSet<char> = "Acme/Steel PartA".chars().collect();
        let mut doc = Document::with_version("1.5");

        let font_id = embed_cid_font(&mut doc, &font.program(), &used).unwrap();

        let type0 = doc.get_dictionary(font_id).unwrap();
        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid_font = doc.get_dictionary(descendants[0].as_reference().unwrap()).unwrap();

        let map_id = cid_font.get(b"CIDToGIDMap").unwrap().as_reference().unwrap();
        let map = doc.get_object(map_id).unwrap().as_stream().unwrap();
        assert_eq!(map.decompressed_content().unwrap().len(), 0x10000 * 2);

        let widths = cid_font.get(b"W").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), used.len() * 2);
        for (entry, ch) in widths.chunks(2).zip(&used) {
            assert_eq!(entry[0].as_i64().unwrap(), i64::from(u32::from(*ch)));
            let width = entry[1].as_array().unwrap()[0].as_i64().unwrap() as f64;
            let measured = font.text_width(&ch.to_string(), 1000.0);
            assert!((width - measured).abs() <= 0.5 + 1e-9, "{ch}: /W {width} vs measured {measured}");
        }

        let descriptor_id = cid_font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        assert!(descriptor.get(b"Ascent").unwrap().as_i64().unwrap() > 0);
        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let program = doc.get_object(file_id).unwrap().as_stream().unwrap().decompressed_content().unwrap();
        assert_eq!(ttf_parser::fonts_in_collection(&program), None);
        assert!(Face::parse(&program, 0).is_ok());
    }

    #[test]
    fn test_characters_outside_bmp_measure_as_notdef() {
        let Some(font) = system_font() else {
            return;
        };
        let face = Face::parse(&font.data, font.index).unwrap();
        let notdef = f64::from(face.glyph_hor_advance(GlyphId(0)).unwrap_or(0));
        let expected = notdef / f64::from(face.units_per_em()) * 10.0;

        assert!((font.text_width("\u{1F600}", 10.0) - expected).abs() < 1e-9);
        assert_eq!(char_advance(&face, '\u{1F600}'), face.glyph_hor_advance(GlyphId(0)).unwrap_or(0));
    }
}
