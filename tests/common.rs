#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use visa_form_server::visa::FieldMappingConfig;

pub const TEMPLATE_NAME: &str = "visa_request_form.pdf";

/// Top-level text fields in the fixture template.
pub const TEMPLATE_FIELDS: &[&str] = &[
    "Name",
    "PassportNo",
    "BirthDate",
    "Nationality",
    "Family1Name",
    "Family1Passport",
    "Family3Name",
];

/// Field whose only widget is a kid of a named parent.
pub const PARENT_FIELD: &str = "Family3Passport";

/// Write a one-page PDF with an AcroForm text field per `TEMPLATE_FIELDS`
/// plus `PARENT_FIELD`, whose widget carries no `/T` of its own.
pub fn write_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut fields: Vec<Object> = Vec::new();
    let mut annots: Vec<Object> = Vec::new();

    for (index, name) in TEMPLATE_FIELDS.iter().enumerate() {
        let top = 800 - 30 * index as i64;
        let widget_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal(*name),
            "Rect" => rect(top),
            "F" => Object::Integer(4),
            "P" => Object::Reference(page_id),
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
        });
        fields.push(Object::Reference(widget_id));
        annots.push(Object::Reference(widget_id));
    }

    let parent_id = doc.new_object_id();
    let kid_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => Object::Reference(parent_id),
        "Rect" => rect(500),
        "F" => Object::Integer(4),
        "P" => Object::Reference(page_id),
    });
    doc.objects.insert(
        parent_id,
        Object::Dictionary(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal(PARENT_FIELD),
            "Kids" => vec![Object::Reference(kid_id)],
        }),
    );
    fields.push(Object::Reference(parent_id));
    annots.push(Object::Reference(kid_id));

    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Contents" => Object::Reference(content_id),
            "Annots" => annots,
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let acro_form_id = doc.add_object(dictionary! {
        "Fields" => fields,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! {
            "Font" => dictionary! { "Helv" => Object::Reference(font_id) },
        },
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acro_form_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("failed to write fixture template");
}

fn rect(top: i64) -> Vec<Object> {
    vec![
        Object::Integer(50),
        Object::Integer(top - 20),
        Object::Integer(300),
        Object::Integer(top),
    ]
}

/// Mapping that covers most of the fixture, one field the template lacks
/// (`issuing_authority`) and no slice for `accompanying2`.
pub const MAPPING_JSON: &str = r#"{
    "pdf_name": "visa_request_form.pdf",
    "primary_applicant": {
        "full_name_japanese_order": "Name",
        "passport_number": "PassportNo",
        "date_of_birth": "BirthDate",
        "nationality": "Nationality",
        "issuing_authority": "IssuedBy"
    },
    "accompanying1": {
        "full_name_japanese_order": "Family1Name",
        "passport_number": "Family1Passport"
    },
    "accompanying3": {
        "full_name_japanese_order": "Family3Name",
        "passport_number": "Family3Passport"
    }
}"#;

pub fn mapping_config() -> Arc<FieldMappingConfig> {
    Arc::new(FieldMappingConfig::from_json_str(MAPPING_JSON).expect("fixture mapping must parse"))
}

/// Primary applicant from the worked example, with an ASCII-only nationality.
pub fn primary_record() -> Value {
    json!({
        "surname": "SMITH",
        "given_names": "JOHN",
        "passport_number": "123456789",
        "date_of_birth": "1990-05-15",
        "nationality": "UNITED STATES",
        "issuing_authority": "United States Department of State"
    })
}

pub fn accompanying_record() -> Value {
    json!({
        "surname": "SMITH",
        "given_names": "JANE",
        "passport_number": "987654321",
        "date_of_birth": "1992-08-01",
        "nationality": "CANADA"
    })
}

pub fn members(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Content of the `/AP /N` stream of the first-page widget whose qualified
/// field name is `field`.
pub fn appearance_content(path: &Path, field: &str) -> Option<Vec<u8>> {
    let doc = Document::load(path).expect("failed to load filled PDF");
    let (_, page_id) = doc.get_pages().into_iter().next()?;
    let annots = match doc.get_dictionary(page_id).and_then(|page| page.get(b"Annots")) {
        Ok(Object::Array(items)) => items.clone(),
        _ => return None,
    };

    annots
        .iter()
        .filter_map(|item| item.as_reference().ok())
        .find(|id| qualified_name(&doc, *id).as_deref() == Some(field))
        .and_then(|id| {
            let widget = doc.get_dictionary(id).ok()?;
            let normal = widget.get(b"AP").ok()?.as_dict().ok()?.get(b"N").ok()?;
            let stream = doc.get_object(normal.as_reference().ok()?).ok()?.as_stream().ok()?;
            Some(stream.content.clone())
        })
}

pub fn widget_has_appearance(path: &Path, field: &str) -> bool {
    appearance_content(path, field).is_some()
}

/// Dotted name built from the widget's own `/T` (if any) and its parents'.
fn qualified_name(doc: &Document, id: ObjectId) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = doc.get_dictionary(id).ok()?;
    loop {
        if let Ok(Object::String(bytes, _)) = current.get(b"T") {
            segments.push(String::from_utf8(bytes.clone()).ok()?);
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = doc.get_dictionary(*parent).ok()?,
            _ => break,
        }
    }
    segments.reverse();
    (!segments.is_empty()).then(|| segments.join("."))
}

/// Write a one-page PDF with parents `page1` and `page2`, each holding a
/// text field whose partial name is `Name`.
pub fn write_shared_name_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut fields: Vec<Object> = Vec::new();
    let mut annots: Vec<Object> = Vec::new();
    for (index, parent_name) in ["page1", "page2"].iter().enumerate() {
        let parent_id = doc.new_object_id();
        let kid_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("Name"),
            "Parent" => Object::Reference(parent_id),
            "Rect" => rect(800 - 40 * index as i64),
            "F" => Object::Integer(4),
            "P" => Object::Reference(page_id),
        });
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal(*parent_name),
                "Kids" => vec![Object::Reference(kid_id)],
            }),
        );
        fields.push(Object::Reference(parent_id));
        annots.push(Object::Reference(kid_id));
    }

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Annots" => annots,
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let acro_form_id = doc.add_object(dictionary! {
        "Fields" => fields,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! {
            "Font" => dictionary! { "Helv" => Object::Reference(font_id) },
        },
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acro_form_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("failed to write fixture template");
}

pub fn single_field_mapping(role_key: &str, field: &str, pdf_field: &str) -> Arc<FieldMappingConfig> {
    let mut slice = Map::new();
    slice.insert(field.to_string(), Value::String(pdf_field.to_string()));
    let mut raw = Map::new();
    raw.insert(role_key.to_string(), Value::Object(slice));
    let raw = Value::Object(raw).to_string();
    Arc::new(FieldMappingConfig::from_json_str(&raw).expect("fixture mapping must parse"))
}

pub fn need_appearances(path: &Path) -> bool {
    let doc = Document::load(path).expect("failed to load filled PDF");
    let form = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .and_then(|catalog| catalog.get(b"AcroForm"))
        .and_then(|form| match form {
            Object::Reference(id) => doc.get_dictionary(*id),
            other => other.as_dict(),
        });
    matches!(
        form.and_then(|form| form.get(b"NeedAppearances")),
        Ok(Object::Boolean(true))
    )
}
