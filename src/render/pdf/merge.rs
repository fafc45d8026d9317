//! Appends the pages of one document to another by deep-copying every object
//! the pages reach.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }
        // Reserve the id first so reference cycles resolve to it.
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let object = self.source.get_object(source_id)?.clone();
        let remapped = self.remap(object)?;
        self.target.objects.insert(new_id, remapped);
        Ok(new_id)
    }

    /// Copies a page without its source page tree and hangs it under
    /// `parent` in the target.
    fn copy_page(&mut self, page_id: ObjectId, parent: ObjectId) -> Result<ObjectId, lopdf::Error> {
        let mut page = self.source.get_dictionary(page_id)?.clone();
        inherit_attributes(self.source, &mut page)?;
        page.remove(b"Parent");

        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(page_id, new_id);
        let mut remapped = self.remap_dictionary(page)?;
        remapped.set("Parent", Object::Reference(parent));
        self.target
            .objects
            .insert(new_id, Object::Dictionary(remapped));
        Ok(new_id)
    }

    fn remap(&mut self, object: Object) -> Result<Object, lopdf::Error> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .into_iter()
                    .map(|item| self.remap(item))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.remap_dictionary(dict)?)),
            Object::Stream(mut stream) => {
                stream.dict = self.remap_dictionary(stream.dict)?;
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }

    fn remap_dictionary(&mut self, mut dict: Dictionary) -> Result<Dictionary, lopdf::Error> {
        for (_, value) in dict.iter_mut() {
            *value = self.remap(std::mem::replace(value, Object::Null))?;
        }
        Ok(dict)
    }
}

fn inherit_attributes(source: &Document, page: &mut Dictionary) -> Result<(), lopdf::Error> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = parent {
        let node = source.get_dictionary(node_id)?;
        for key in INHERITABLE {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(())
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, lopdf::Error> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_dictionary(root_id)?.get(b"Pages")?.as_reference()
}

/// Appends every page of `source` to the end of `target`. Returns the
/// number of pages added.
pub fn append_pages(target: &mut Document, source: &Document) -> Result<usize, lopdf::Error> {
    let source_pages = source.get_pages();
    if source_pages.is_empty() {
        return Ok(0);
    }
    let pages_id = root_pages_id(target)?;

    let new_pages = {
        let mut copier = ObjectCopier::new(source, target);
        source_pages
            .values()
            .map(|page_id| copier.copy_page(*page_id, pages_id))
            .collect::<Result<Vec<_>, _>>()?
    };

    let pages = target.get_object_mut(pages_id)?.as_dict_mut()?;
    let mut kids = pages.get(b"Kids")?.as_array()?.clone();
    let count = pages.get(b"Count")?.as_i64()?;
    kids.extend(new_pages.iter().map(|id| Object::Reference(*id)));
    pages.set("Kids", kids);
    pages.set("Count", count + new_pages.len() as i64);
    Ok(new_pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, dictionary};

    fn document(pages: usize, label: &str) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids = Vec::new();
        for index in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("{label} {index}"))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn appends_after_existing_pages() {
        let mut target = document(2, "old");
        let source = document(3, "new");
        let added = append_pages(&mut target, &source).expect("append");
        assert_eq!(added, 3);

        let mut bytes = Vec::new();
        target.save_to(&mut bytes).expect("save");
        let reloaded = Document::load_mem(&bytes).expect("reload");
        let pages = reloaded.get_pages();
        assert_eq!(pages.len(), 5);
        let last = reloaded.extract_text(&[5]).expect("text");
        assert!(last.contains("new 2"), "{last:?}");
        let first = reloaded.extract_text(&[1]).expect("text");
        assert!(first.contains("old 0"), "{first:?}");
    }

    #[test]
    fn copied_pages_carry_inherited_attributes() {
        let mut target = document(1, "old");
        let source = document(1, "new");
        append_pages(&mut target, &source).expect("append");
        let pages = target.get_pages();
        let copied = target.get_dictionary(pages[&2]).expect("page");
        assert!(copied.has(b"MediaBox"));
        assert!(copied.has(b"Resources"));
        let parent = copied
            .get(b"Parent")
            .and_then(Object::as_reference)
            .expect("parent");
        assert_eq!(parent, root_pages_id(&target).expect("pages"));
    }

    #[test]
    fn empty_source_adds_nothing() {
        let mut target = document(1, "old");
        let source = document(0, "none");
        assert_eq!(append_pages(&mut target, &source).expect("append"), 0);
        assert_eq!(target.get_pages().len(), 1);
    }
}
