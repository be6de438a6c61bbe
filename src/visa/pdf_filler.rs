//! AcroForm filling over `lopdf`.
//!
//! The template is loaded once per fill and every widget annotation is
//! indexed by field name. Values are written together with a fresh
//! appearance stream, and the document is saved through a temporary file so
//! a failed save never leaves a truncated PDF behind.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use super::diagnostics::{self, Diagnostic};
use super::mapper::MappedApplicants;
use super::mapping_config::FieldMappingConfig;
use super::FillError;

const DEFAULT_APPEARANCE: &str = "/Helv 0 Tf 0 g";
const MAX_PARENT_DEPTH: usize = 32;

/// Non-embedded Japanese font for text outside Latin-1. Viewers substitute
/// an installed Adobe-Japan1 font.
const CJK_FONT_RESOURCE: &str = "HeiKakuGo";
const CJK_BASE_FONT: &str = "HeiseiKakuGo-W5";
const CJK_ENCODING: &str = "UniJIS-UCS2-H";

/// The field objects sharing one name and the widgets that display them.
#[derive(Debug, Clone, Default)]
struct FieldHandle {
    fields: Vec<ObjectId>,
    widgets: Vec<ObjectId>,
}

impl FieldHandle {
    fn add(&mut self, field_id: ObjectId, widget_id: ObjectId) {
        if !self.fields.contains(&field_id) {
            self.fields.push(field_id);
        }
        self.widgets.push(widget_id);
    }
}

/// Template fields by qualified name, plus partial names that identify a
/// single field. Partial names shared by several fields are kept aside.
#[derive(Debug, Default)]
struct FieldIndex {
    handles: HashMap<String, FieldHandle>,
    ambiguous: HashSet<String>,
}

/// Outcome of a successful fill.
#[derive(Debug, Clone)]
pub struct FillReport {
    pub output: PathBuf,
    pub fields_filled: usize,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct PdfFormFiller {
    config: Arc<FieldMappingConfig>,
}

impl PdfFormFiller {
    pub fn new(config: Arc<FieldMappingConfig>) -> Self {
        Self { config }
    }

    /// Fill `template` with every applicant's values and save to `output`.
    ///
    /// Only an unreadable template or a failed save are errors; anything
    /// that cannot be placed is skipped and reported in the returned
    /// diagnostics.
    pub fn fill(
        &self,
        template: &Path,
        applicants: &MappedApplicants,
        output: &Path,
    ) -> Result<FillReport, FillError> {
        let mut doc = Document::load(template).map_err(|source| FillError::TemplateUnreadable {
            path: template.to_path_buf(),
            source,
        })?;

        let index = collect_fields(&doc);
        log::info!(
            "Found {} fillable field names in {}",
            index.handles.len(),
            template.display()
        );

        let resources = default_resources(&doc);
        let form_da = acro_form(&doc)
            .and_then(|form| text_string(&doc, form.get(b"DA").ok()?))
            .unwrap_or_else(|| DEFAULT_APPEARANCE.to_string());

        let mut fonts = AppearanceFonts::default();
        let mut diagnostics = Vec::new();
        let mut fields_filled = 0;
        let mut needs_viewer_appearance = false;

        for (role, values) in applicants {
            let Some(mapping) = self.config.for_role(*role) else {
                diagnostics::record(&mut diagnostics, Diagnostic::RoleNotConfigured { role: *role });
                continue;
            };

            for (field, value) in values {
                let Some(pdf_field) = mapping.get(field) else {
                    diagnostics::record(
                        &mut diagnostics,
                        Diagnostic::FieldNotConfigured {
                            role: *role,
                            field: field.clone(),
                        },
                    );
                    continue;
                };

                let Some(handle) = index.handles.get(pdf_field) else {
                    let diagnostic = if index.ambiguous.contains(pdf_field) {
                        Diagnostic::AmbiguousFieldName {
                            role: *role,
                            field: field.clone(),
                            pdf_field: pdf_field.clone(),
                        }
                    } else {
                        Diagnostic::FieldNotFoundInTemplate {
                            role: *role,
                            field: field.clone(),
                            pdf_field: pdf_field.clone(),
                        }
                    };
                    diagnostics::record(&mut diagnostics, diagnostic);
                    continue;
                };

                match write_field(&mut doc, handle, value, &form_da, resources.as_ref(), &mut fonts) {
                    Ok(rendered) => {
                        fields_filled += 1;
                        needs_viewer_appearance |= !rendered;
                        log::debug!("Filled PDF field {} for {} with {}", pdf_field, role, value);
                    }
                    Err(e) => diagnostics::record(
                        &mut diagnostics,
                        Diagnostic::FieldWriteFailed {
                            role: *role,
                            field: field.clone(),
                            pdf_field: pdf_field.clone(),
                            error: e.to_string(),
                        },
                    ),
                }
            }
        }

        if needs_viewer_appearance {
            set_need_appearances(&mut doc);
        }
        persist(&mut doc, output)?;

        log::info!(
            "Wrote {} ({} fields filled, {} skipped)",
            output.display(),
            fields_filled,
            diagnostics.len()
        );

        Ok(FillReport {
            output: output.to_path_buf(),
            fields_filled,
            diagnostics,
        })
    }
}

/// Read back the `/V` value of every named field in a PDF.
pub fn read_field_values(path: &Path) -> Result<BTreeMap<String, String>, FillError> {
    let doc = Document::load(path).map_err(|source| FillError::TemplateUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut values = BTreeMap::new();
    for (name, handle) in collect_fields(&doc).handles {
        let value = handle
            .fields
            .first()
            .and_then(|id| doc.get_dictionary(*id).ok())
            .and_then(|field| text_string(&doc, field.get(b"V").ok()?));
        if let Some(value) = value {
            values.insert(name, value);
        }
    }
    Ok(values)
}

fn collect_fields(doc: &Document) -> FieldIndex {
    let mut handles: HashMap<String, FieldHandle> = HashMap::new();
    // Partial name to the qualified name it stands for, `None` once two
    // different fields share it.
    let mut partial_names: HashMap<String, Option<String>> = HashMap::new();

    for (page_number, page_id) in doc.get_pages() {
        for widget_id in page_annotations(doc, page_id) {
            let Ok(widget) = doc.get_dictionary(widget_id) else {
                continue;
            };
            if let Ok(Object::Name(subtype)) = widget.get(b"Subtype") {
                if subtype.as_slice() != b"Widget" {
                    continue;
                }
            }

            let Some(names) = field_names(doc, widget_id, widget) else {
                log::debug!("Skipping unnamed widget {:?} on page {}", widget_id, page_number);
                continue;
            };

            handles
                .entry(names.qualified.clone())
                .or_default()
                .add(names.field_id, widget_id);

            if names.partial != names.qualified {
                partial_names
                    .entry(names.partial)
                    .and_modify(|owner| {
                        if owner.as_deref() != Some(names.qualified.as_str()) {
                            *owner = None;
                        }
                    })
                    .or_insert(Some(names.qualified));
            }
        }
    }

    let mut ambiguous = HashSet::new();
    for (partial, owner) in partial_names {
        if handles.contains_key(&partial) {
            continue;
        }
        match owner.and_then(|qualified| handles.get(&qualified).cloned()) {
            Some(handle) => {
                handles.insert(partial, handle);
            }
            None => {
                log::warn!("PDF field name '{}' is shared by several fields", partial);
                ambiguous.insert(partial);
            }
        }
    }

    FieldIndex { handles, ambiguous }
}

fn page_annotations(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let annots = match doc.get_dictionary(page_id).and_then(|page| page.get(b"Annots")) {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok(),
        Ok(other) => Some(other),
        Err(_) => None,
    };

    match annots {
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Reference(id) => Some(*id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

struct FieldNames {
    field_id: ObjectId,
    partial: String,
    qualified: String,
}

/// The field object a widget belongs to, with its partial `/T` name and its
/// fully qualified dotted name.
fn field_names(doc: &Document, widget_id: ObjectId, widget: &Dictionary) -> Option<FieldNames> {
    let (field_id, partial) = match widget.get(b"T").ok().and_then(|t| text_string(doc, t)) {
        Some(name) => (widget_id, name),
        None => {
            let parent_id = match widget.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return None,
            };
            let parent = doc.get_dictionary(parent_id).ok()?;
            (parent_id, text_string(doc, parent.get(b"T").ok()?)?)
        }
    };

    let mut segments = vec![partial.clone()];
    let mut current = doc.get_dictionary(field_id).ok();
    for _ in 0..MAX_PARENT_DEPTH {
        let Some(Ok(Object::Reference(parent_id))) = current.map(|dict| dict.get(b"Parent")) else {
            break;
        };
        let Ok(parent) = doc.get_dictionary(*parent_id) else {
            break;
        };
        if let Some(name) = parent.get(b"T").ok().and_then(|t| text_string(doc, t)) {
            segments.push(name);
        }
        current = Some(parent);
    }
    segments.reverse();

    Some(FieldNames {
        field_id,
        partial,
        qualified: segments.join("."),
    })
}

/// Write `/V` and a fresh appearance for every widget of the field.
///
/// Every dictionary is resolved before anything is modified, so an error
/// leaves the field untouched. Returns `false` when some widget was left
/// without an appearance for the viewer to regenerate.
fn write_field(
    doc: &mut Document,
    handle: &FieldHandle,
    value: &str,
    form_da: &str,
    resources: Option<&Object>,
    fonts: &mut AppearanceFonts,
) -> lopdf::Result<bool> {
    let widgets = {
        let reader: &Document = doc;
        let mut field_da = None;
        for field_id in &handle.fields {
            let field = reader.get_dictionary(*field_id)?;
            if field_da.is_none() {
                field_da = field.get(b"DA").ok().and_then(|da| text_string(reader, da));
            }
        }

        handle
            .widgets
            .iter()
            .map(|widget_id| {
                let widget = reader.get_dictionary(*widget_id)?;
                let da = widget
                    .get(b"DA")
                    .ok()
                    .and_then(|da| text_string(reader, da))
                    .or_else(|| field_da.clone())
                    .unwrap_or_else(|| form_da.to_string());
                Ok((*widget_id, widget_rect(widget), DefaultAppearance::parse(&da)))
            })
            .collect::<lopdf::Result<Vec<_>>>()?
    };

    let text = AppearanceText::encode(value);
    let cjk_face = match &text {
        Some(AppearanceText::Cjk(_)) => Some(cjk_resources(fonts.cjk(doc))),
        _ => None,
    };

    for field_id in &handle.fields {
        doc.get_object_mut(*field_id)?
            .as_dict_mut()?
            .set("V", encode_text_string(value));
    }

    let mut rendered = true;
    for (widget_id, rect, appearance) in widgets {
        let stream = match (&text, rect) {
            (Some(text), Some((width, height))) => {
                let (font, font_resources) = match &cjk_face {
                    Some(resources) => (CJK_FONT_RESOURCE.to_string(), resources.clone()),
                    None => (
                        appearance.font.clone(),
                        resources
                            .cloned()
                            .unwrap_or_else(|| helvetica_resources(&appearance.font)),
                    ),
                };
                Some(appearance_stream(
                    width,
                    height,
                    &appearance,
                    &font,
                    text.operand(),
                    font_resources,
                ))
            }
            _ => None,
        };

        match stream {
            Some(stream) => {
                let stream_id = doc.add_object(stream);
                doc.get_object_mut(widget_id)?
                    .as_dict_mut()?
                    .set("AP", dictionary! { "N" => stream_id });
            }
            None => {
                // A stale appearance would show the template's old value.
                rendered = false;
                doc.get_object_mut(widget_id)?.as_dict_mut()?.remove(b"AP");
            }
        }
    }

    Ok(rendered)
}

/// Width and height of a widget's `/Rect`.
fn widget_rect(widget: &Dictionary) -> Option<(f64, f64)> {
    let Ok(Object::Array(rect)) = widget.get(b"Rect") else {
        return None;
    };
    let coords: Vec<f64> = rect.iter().filter_map(number).collect();
    if coords.len() != 4 {
        return None;
    }
    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    (width > 0.0 && height > 0.0).then_some((width, height))
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// A value encoded as the string operand of `Tj` for a font that can show it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AppearanceText {
    /// `( ... )` literal for the field's single-byte font.
    Latin1(Vec<u8>),
    /// `< ... >` UCS-2 hex string for the Japanese CID font.
    Cjk(Vec<u8>),
}

impl AppearanceText {
    /// `None` for text neither font can show (outside the BMP).
    fn encode(value: &str) -> Option<Self> {
        latin1_literal(value)
            .map(Self::Latin1)
            .or_else(|| ucs2_hex(value).map(Self::Cjk))
    }

    fn operand(&self) -> &[u8] {
        match self {
            Self::Latin1(bytes) | Self::Cjk(bytes) => bytes,
        }
    }
}

/// Fonts added to the document for generated appearances, created on first
/// use and shared by every widget.
#[derive(Debug, Default)]
struct AppearanceFonts {
    cjk: Option<ObjectId>,
}

impl AppearanceFonts {
    fn cjk(&mut self, doc: &mut Document) -> ObjectId {
        *self.cjk.get_or_insert_with(|| add_cjk_font(doc))
    }
}

fn add_cjk_font(doc: &mut Document) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => CJK_BASE_FONT,
        "Flags" => Object::Integer(4),
        "FontBBox" => vec![
            Object::Integer(-92),
            Object::Integer(-250),
            Object::Integer(1010),
            Object::Integer(922),
        ],
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Integer(880),
        "Descent" => Object::Integer(-120),
        "CapHeight" => Object::Integer(737),
        "StemV" => Object::Integer(93),
    });
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => CJK_BASE_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Japan1"),
            "Supplement" => Object::Integer(2),
        },
        "FontDescriptor" => descriptor_id,
        "DW" => Object::Integer(1000),
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => CJK_BASE_FONT,
        "Encoding" => CJK_ENCODING,
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
    })
}

fn cjk_resources(font_id: ObjectId) -> Object {
    Object::Dictionary(dictionary! {
        "Font" => dictionary! { CJK_FONT_RESOURCE => font_id },
    })
}

fn helvetica_resources(font: &str) -> Object {
    Object::Dictionary(dictionary! {
        "Font" => dictionary! {
            font => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
        },
    })
}

/// Build a `/Tx` form XObject showing the `Tj` operand `text` in `font`.
fn appearance_stream(
    width: f64,
    height: f64,
    appearance: &DefaultAppearance,
    font: &str,
    text: &[u8],
    resources: Object,
) -> Stream {
    let font_size = if appearance.size > 0.0 {
        appearance.size
    } else {
        ((height - 4.0) * 0.7).clamp(4.0, 12.0)
    };
    let baseline = ((height - font_size) / 2.0 + font_size * 0.22).max(1.0);

    let mut content = format!(
        "/Tx BMC\nq\n1 1 {w:.2} {h:.2} re W n\nBT\n/{font} {size:.2} Tf {color}\n2 {baseline:.2} Td\n",
        w = (width - 2.0).max(0.0),
        h = (height - 2.0).max(0.0),
        size = font_size,
        color = appearance.color,
    )
    .into_bytes();
    content.extend_from_slice(text);
    content.extend_from_slice(b" Tj\nET\nQ\nEMC\n");

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width as _),
            Object::Real(height as _),
        ],
        "Resources" => resources,
    };
    Stream::new(dict, content)
}

/// Font, size and colour operators from a `/DA` string such as `/Helv 0 Tf 0 g`.
#[derive(Debug, Clone, PartialEq)]
struct DefaultAppearance {
    font: String,
    size: f64,
    color: String,
}

impl DefaultAppearance {
    fn parse(da: &str) -> Self {
        let tokens: Vec<&str> = da.split_whitespace().collect();
        let tf = tokens.iter().position(|token| *token == "Tf");

        let (font, size) = match tf {
            Some(i) if i >= 2 => (
                tokens[i - 2].trim_start_matches('/').to_string(),
                tokens[i - 1].parse().unwrap_or(0.0),
            ),
            _ => ("Helv".to_string(), 0.0),
        };

        let color = match tf {
            Some(i) if i >= 2 => tokens[..i - 2]
                .iter()
                .chain(&tokens[i + 1..])
                .copied()
                .collect::<Vec<_>>()
                .join(" "),
            _ => "0 g".to_string(),
        };

        Self { font, size, color }
    }
}

/// Escaped `( ... )` literal in Latin-1, or `None` if any character is outside it.
fn latin1_literal(value: &str) -> Option<Vec<u8>> {
    let mut out = vec![b'('];
    for ch in value.chars() {
        let code = u32::from(ch);
        if code > 0xFF {
            return None;
        }
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(code as u8);
            }
            _ => out.push(code as u8),
        }
    }
    out.push(b')');
    Some(out)
}

/// `< ... >` of big-endian UCS-2 code units, or `None` outside the BMP.
fn ucs2_hex(value: &str) -> Option<Vec<u8>> {
    let mut out = String::from("<");
    for ch in value.chars() {
        let unit = u16::try_from(u32::from(ch)).ok()?;
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    Some(out.into_bytes())
}

/// PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn text_string(doc: &Document, object: &Object) -> Option<String> {
    let object = match object {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match object {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let units: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            } else {
                match std::str::from_utf8(bytes) {
                    Ok(s) => Some(s.to_string()),
                    Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
                }
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn catalog_id(doc: &Document) -> Option<ObjectId> {
    match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}

fn acro_form(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(catalog_id(doc)?).ok()?;
    match catalog.get(b"AcroForm").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// The form's `/DR` resources, reused by generated appearance streams.
fn default_resources(doc: &Document) -> Option<Object> {
    acro_form(doc)?.get(b"DR").ok().cloned()
}

/// Ask viewers to rebuild appearances for text our streams could not show.
fn set_need_appearances(doc: &mut Document) {
    let Some(root_id) = catalog_id(doc) else {
        return;
    };
    let form_ref = match doc.get_dictionary(root_id).and_then(|catalog| catalog.get(b"AcroForm")) {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return,
    };

    let form = match form_ref {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        None => doc
            .get_object_mut(root_id)
            .and_then(Object::as_dict_mut)
            .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            .and_then(Object::as_dict_mut),
    };

    match form {
        Ok(form) => form.set("NeedAppearances", true),
        Err(e) => log::warn!("Could not set NeedAppearances on AcroForm: {}", e),
    }
}

/// Save via a sibling temporary file, renamed over `output` only once fully written.
fn persist(doc: &mut Document, output: &Path) -> Result<(), FillError> {
    let failed = |source: io::Error| FillError::PersistenceFailed {
        path: output.to_path_buf(),
        source,
    };

    let dir = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(failed)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        doc.save_to(&mut writer)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            .map_err(failed)?;
        writer.flush().map_err(failed)?;
    }
    temp.as_file().sync_all().map_err(failed)?;
    temp.persist(output).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_appearance() {
        let da = DefaultAppearance::parse("/Helv 0 Tf 0 g");
        assert_eq!(da.font, "Helv");
        assert_eq!(da.size, 0.0);
        assert_eq!(da.color, "0 g");

        let da = DefaultAppearance::parse("0 0 1 rg /F1 9.5 Tf");
        assert_eq!(da.font, "F1");
        assert_eq!(da.size, 9.5);
        assert_eq!(da.color, "0 0 1 rg");

        let da = DefaultAppearance::parse("");
        assert_eq!(da.font, "Helv");
    }

    #[test]
    fn test_latin1_literal_escapes() {
        assert_eq!(latin1_literal("A(1)\\").unwrap(), b"(A\\(1\\)\\\\)".to_vec());
        assert_eq!(latin1_literal("MÜLLER").unwrap(), b"(M\xDCLLER)".to_vec());
        assert!(latin1_literal("1990年05月15日").is_none());
    }

    #[test]
    fn test_appearance_text_picks_font() {
        assert_eq!(
            AppearanceText::encode("JOHN"),
            Some(AppearanceText::Latin1(b"(JOHN)".to_vec()))
        );
        assert_eq!(
            AppearanceText::encode("日本"),
            Some(AppearanceText::Cjk(b"<65E5672C>".to_vec()))
        );
        assert_eq!(
            AppearanceText::encode("A 日"),
            Some(AppearanceText::Cjk(b"<0041002065E5>".to_vec()))
        );
        assert_eq!(AppearanceText::encode("🙂"), None);
    }

    #[test]
    fn test_text_string_round_trip() {
        let doc = Document::with_version("1.5");
        for value in ["A12345678", "アメリカ合衆国"] {
            assert_eq!(text_string(&doc, &encode_text_string(value)).as_deref(), Some(value));
        }
    }

    #[test]
    fn test_appearance_stream_keeps_latin1_bytes() {
        let appearance = DefaultAppearance::parse(DEFAULT_APPEARANCE);
        let text = AppearanceText::encode("MÜLLER").unwrap();
        let stream = appearance_stream(
            100.0,
            20.0,
            &appearance,
            &appearance.font,
            text.operand(),
            helvetica_resources(&appearance.font),
        );

        assert!(stream.content.contains(&0xDC));
        assert!(stream.content.ends_with(b"(M\xDCLLER) Tj\nET\nQ\nEMC\n"));
        let prefix = String::from_utf8_lossy(&stream.content);
        assert!(prefix.contains("/Helv "));
    }

    #[test]
    fn test_cjk_font_is_added_once() {
        let mut doc = Document::with_version("1.5");
        let mut fonts = AppearanceFonts::default();
        let first = fonts.cjk(&mut doc);
        let second = fonts.cjk(&mut doc);
        assert_eq!(first, second);

        let font = doc.get_dictionary(first).unwrap();
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), CJK_ENCODING.as_bytes());
    }

    #[test]
    fn test_broken_widget_leaves_field_untouched() {
        let mut doc = Document::with_version("1.5");
        let field_id = doc.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("Name"),
        });
        let handle = FieldHandle {
            fields: vec![field_id],
            widgets: vec![(9999, 0)],
        };
        let mut fonts = AppearanceFonts::default();

        let result = write_field(&mut doc, &handle, "日本", DEFAULT_APPEARANCE, None, &mut fonts);

        assert!(result.is_err());
        assert!(doc.get_dictionary(field_id).unwrap().get(b"V").is_err());
        assert!(fonts.cjk.is_none());
    }

    #[test]
    fn test_missing_template_is_unreadable() {
        let filler = PdfFormFiller::new(Arc::new(FieldMappingConfig::default()));
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");

        let result = filler.fill(Path::new("/nonexistent/template.pdf"), &MappedApplicants::new(), &output);
        assert!(matches!(result, Err(FillError::TemplateUnreadable { .. })));
        assert!(!output.exists());
    }
}
