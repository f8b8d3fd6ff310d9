//! Small in-memory PDFs for tests.
//!
//! Pages have no content streams; they only carry what the annotation code
//! looks at (page tree, `MediaBox`, `Annots`).

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

/// Blank US Letter document with `page_count` pages.
pub fn blank_pdf(page_count: usize) -> Vec<u8> {
    pdf_with_page_size(612.0, 792.0, page_count)
}

pub fn pdf_with_page_size(width: f32, height: f32, page_count: usize) -> Vec<u8> {
    pdf_with_annotations(width, height, vec![Vec::new(); page_count])
}

/// One page per entry of `pages`, each holding the given annotation
/// dictionaries as indirect objects in an inline `/Annots` array.
pub fn pdf_with_annotations(width: f32, height: f32, pages: Vec<Vec<Dictionary>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for annotations in pages {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
        };
        if !annotations.is_empty() {
            let refs: Vec<Object> = annotations
                .into_iter()
                .map(|annotation| Object::Reference(doc.add_object(annotation)))
                .collect();
            page.set("Annots", refs);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    finish(doc, pages_id, kids, dictionary! {})
}

/// Single page inheriting its `MediaBox` from the page tree root.
pub fn pdf_with_inherited_media_box(width: f32, height: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });

    finish(
        doc,
        pages_id,
        vec![page_id.into()],
        dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
        },
    )
}

/// Single page with no `MediaBox` anywhere in the tree.
pub fn pdf_without_media_box() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });

    finish(doc, pages_id, vec![page_id.into()], dictionary! {})
}

/// Single page whose `/Annots` is an indirect array object.
pub fn pdf_with_indirect_annots(annotations: Vec<Dictionary>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let refs: Vec<Object> = annotations
        .into_iter()
        .map(|annotation| Object::Reference(doc.add_object(annotation)))
        .collect();
    let annots_id = doc.add_object(Object::Array(refs));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => annots_id,
    });

    finish(doc, pages_id, vec![page_id.into()], dictionary! {})
}

/// Single page whose `/Annots` is a reference to one annotation dictionary
/// instead of an array.
pub fn pdf_with_lone_annot(annotation: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let annot_id = doc.add_object(annotation);
    single_page_with_annots(doc, Object::Reference(annot_id))
}

/// Single page whose `/Annots` entry is `value`, whatever it is.
pub fn pdf_with_annots_value(value: Object) -> Vec<u8> {
    single_page_with_annots(Document::with_version("1.7"), value)
}

fn single_page_with_annots(mut doc: Document, annots: Object) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => annots,
    });

    finish(doc, pages_id, vec![page_id.into()], dictionary! {})
}

/// Single page with one ink annotation whose stroke array is indirect.
pub fn pdf_with_indirect_ink_list() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let stroke_id = doc.add_object(Object::Array(vec![
        10.into(),
        10.into(),
        20.into(),
        20.into(),
    ]));
    let ink_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Ink",
        "Rect" => vec![0.into(), 0.into(), 30.into(), 30.into()],
        "InkList" => vec![Object::Reference(stroke_id)],
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => vec![Object::Reference(ink_id)],
    });

    finish(doc, pages_id, vec![page_id.into()], dictionary! {})
}

fn finish(
    mut doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    mut inherited: Dictionary,
) -> Vec<u8> {
    let count = kids.len() as i64;
    inherited.set("Type", "Pages");
    inherited.set("Kids", kids);
    inherited.set("Count", count);
    doc.objects.insert(pages_id, Object::Dictionary(inherited));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}
