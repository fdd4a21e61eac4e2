//! Test documents and inspection helpers shared by the unit tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, Stream};

/// Build a PDF with `num_pages` pages, each showing `{prefix}-Page-{n}`.
pub fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for page_num in 0..num_pages {
        let page_id = doc.new_object_id();
        let content_id = doc.new_object_id();

        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
            content_prefix,
            page_num + 1
        );
        doc.objects.insert(
            content_id,
            Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())),
        );

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );

        doc.objects.insert(page_id, Object::Dictionary(page_dict));
        page_ids.push(Object::Reference(page_id));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(num_pages as i64));
    pages_dict.set("Kids", Object::Array(page_ids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Encode an image in the given container format.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// The text shown by each page, in page order.
pub fn page_texts(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let content = String::from_utf8_lossy(&content);
            let start = content.find('(').map(|i| i + 1).unwrap_or(0);
            let end = content.rfind(')').unwrap_or(content.len());
            content[start..end].to_string()
        })
        .collect()
}

/// Width, height and decoded samples of the image drawn on page `page_number`.
pub fn image_samples_on_page(doc: &Document, page_number: u32) -> (i64, i64, Vec<u8>) {
    let page_id = doc.get_pages()[&page_number];
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = resolve(doc, page.get(b"Resources").unwrap()).as_dict().unwrap();
    let xobjects = resolve(doc, resources.get(b"XObject").unwrap())
        .as_dict()
        .unwrap();
    let (_, image_ref) = xobjects.iter().next().unwrap();
    let stream = resolve(doc, image_ref).as_stream().unwrap();

    let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap();
    let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap();
    let samples = stream.decompressed_content().unwrap();
    (width, height, samples)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}
