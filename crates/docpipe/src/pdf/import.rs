//! Page import.
//!
//! [`DocumentBuilder`] assembles a fresh document out of pages taken from
//! one or more source documents. Each page keeps its own MediaBox, so mixed
//! page sizes and orientations survive. Attributes a page inherits from its
//! page tree (MediaBox, CropBox, Resources, Rotate) are copied onto the page
//! itself, since the source tree is not carried over.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DocError, Result};

/// Page attributes that may be inherited from ancestor `Pages` nodes.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// A4 in points, used when a page declares no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

/// Guard against cyclic `Parent` chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// Page orientation as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Height at least width.
    Portrait,
    /// Width greater than height.
    Landscape,
}

/// Displayed size of a page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
    /// Derived from width and height.
    pub orientation: Orientation,
}

impl PageGeometry {
    /// Geometry for a `width` x `height` page.
    pub fn new(width: f32, height: f32) -> Self {
        let orientation = if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Self {
            width,
            height,
            orientation,
        }
    }

    /// Geometry of a page dictionary, honouring `/Rotate`.
    ///
    /// `doc` is used to resolve indirect MediaBox entries.
    pub fn of_page(doc: &Document, page: &Dictionary) -> Self {
        let [x0, y0, x1, y1] = media_box(doc, page).unwrap_or(DEFAULT_MEDIA_BOX);
        let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());

        let rotate = page
            .get(b"Rotate")
            .ok()
            .and_then(|r| resolve(doc, r).as_i64().ok())
            .unwrap_or(0);

        if rotate.rem_euclid(180) == 90 {
            Self::new(height, width)
        } else {
            Self::new(width, height)
        }
    }
}

/// Geometry of every page of `doc`, in page order.
pub fn document_geometry(doc: &Document) -> Vec<PageGeometry> {
    doc.get_pages()
        .values()
        .map(|&id| match doc.get_dictionary(id) {
            Ok(page) => {
                let page = with_inherited_attributes(doc, page);
                PageGeometry::of_page(doc, &page)
            }
            Err(_) => PageGeometry::new(DEFAULT_MEDIA_BOX[2], DEFAULT_MEDIA_BOX[3]),
        })
        .collect()
}

/// Builds a new document page by page.
///
/// # Examples
///
/// ```no_run
/// use docpipe::pdf::DocumentBuilder;
/// use lopdf::Document;
///
/// # fn example(source: &Document) -> docpipe::Result<()> {
/// let mut builder = DocumentBuilder::new();
/// builder.import_pages(source, &[1, 3])?;
/// let document = builder.finish();
/// assert_eq!(document.get_pages().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    geometry: Vec<PageGeometry>,
}

impl DocumentBuilder {
    /// Start an empty PDF 1.5 document.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });

        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            geometry: Vec::new(),
        }
    }

    /// Append pages of `source` (1-based numbers) in the given order.
    ///
    /// Returns the geometry of the imported pages.
    ///
    /// # Errors
    ///
    /// Returns an error if a page number does not exist in `source` or a page
    /// object is not a dictionary.
    pub fn import_pages(&mut self, source: &Document, pages: &[u32]) -> Result<Vec<PageGeometry>> {
        let mut source = source.clone();
        source.renumber_objects_with(self.doc.max_id + 1);
        let page_ids: BTreeMap<u32, ObjectId> = source.get_pages();

        // Resolve everything before touching the target, so a bad page number
        // leaves the builder unchanged.
        let selected = pages
            .iter()
            .map(|&number| {
                let page_id = *page_ids.get(&number).ok_or_else(|| {
                    DocError::other(format!(
                        "Page {number} does not exist (document has {} page(s))",
                        page_ids.len()
                    ))
                })?;
                let page = with_inherited_attributes(&source, source.get_dictionary(page_id)?);
                Ok((page_id, page))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut imported = Vec::with_capacity(selected.len());
        for (page_id, mut page) in selected {
            if !page.has(b"MediaBox") {
                page.set(
                    "MediaBox",
                    DEFAULT_MEDIA_BOX.iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
                );
            }
            page.set("Parent", self.pages_id);

            let geometry = PageGeometry::of_page(&source, &page);
            let page = Object::Dictionary(page);

            // Insert first so self-references (annotation /P) resolve to it.
            self.doc.objects.insert(page_id, page.clone());
            copy_references(&mut self.doc, &source, &page);

            self.kids.push(page_id);
            self.geometry.push(geometry);
            imported.push(geometry);
        }

        self.doc.max_id = self
            .doc
            .objects
            .keys()
            .map(|&(id, _)| id)
            .max()
            .unwrap_or(0)
            .max(self.doc.max_id);

        Ok(imported)
    }

    /// Add a standalone object (image, content stream) to the document.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Append a page built in place rather than imported.
    ///
    /// The page's `Parent` is set to the builder's page tree.
    pub fn push_page(&mut self, mut page: Dictionary) -> PageGeometry {
        page.set("Parent", self.pages_id);
        let geometry = PageGeometry::of_page(&self.doc, &page);
        let page_id = self.doc.add_object(page);

        self.kids.push(page_id);
        self.geometry.push(geometry);
        geometry
    }

    /// Number of pages imported so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Geometry of all imported pages, in output order.
    pub fn geometry(&self) -> &[PageGeometry] {
        &self.geometry
    }

    /// Close the page tree and return the document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `page` with inheritable attributes pulled down from its ancestors.
fn with_inherited_attributes(doc: &Document, page: &Dictionary) -> Dictionary {
    let mut page = page.clone();
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(doc, &page, key) {
            page.set(key, value);
        }
    }
    page
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(id) = parent {
        if depth == MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn media_box(doc: &Document, page: &Dictionary) -> Option<[f32; 4]> {
    let array = resolve(doc, page.get(b"MediaBox").ok()?).as_array().ok()?;
    if array.len() < 4 {
        return None;
    }

    let mut rect = [0.0; 4];
    for (slot, value) in rect.iter_mut().zip(array) {
        *slot = resolve(doc, value).as_float().ok()?;
    }
    Some(rect)
}

/// Copy every object reachable from `root` that `target` does not have yet.
///
/// `Parent` links of page tree nodes are not followed, so importing one page
/// does not drag in the rest of the source document.
fn copy_references(target: &mut Document, source: &Document, root: &Object) {
    let mut pending = Vec::new();
    collect_references(root, &mut pending);

    while let Some(id) = pending.pop() {
        if target.objects.contains_key(&id) {
            continue;
        }
        let Ok(object) = source.get_object(id) else {
            continue;
        };

        let object = detach_from_page_tree(object.clone());
        collect_references(&object, &mut pending);
        target.objects.insert(id, object);
    }
}

fn collect_references(obj: &Object, out: &mut Vec<ObjectId>) {
    match obj {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}

fn detach_from_page_tree(object: Object) -> Object {
    match object {
        Object::Dictionary(mut dict) if is_page_tree_node(&dict) => {
            dict.remove(b"Parent");
            Object::Dictionary(dict)
        }
        other => other,
    }
}

fn is_page_tree_node(dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page") | Ok(b"Pages")
    )
}
