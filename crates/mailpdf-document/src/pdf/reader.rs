// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF merger: append the pages of attachment PDFs to the rendered message
// using the `lopdf` crate.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use mailpdf_core::error::{ConversionError, Result};
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Number of pages in a serialised PDF.
pub fn page_count(data: &[u8]) -> Result<usize> {
    let document = Document::load_mem(data)
        .map_err(|err| ConversionError::Merge(format!("failed to load PDF: {err}")))?;
    Ok(document.get_pages().len())
}

/// Append every page of each attachment PDF, in order, after the pages of
/// `main`.
///
/// With no attachments the main bytes come back unchanged. An attachment that
/// cannot be loaded or copied is logged and left out, and none of its pages
/// appear. Only a main document that cannot be loaded or a result that
/// cannot be written is an error.
#[instrument(skip_all, fields(main_len = main.len(), attachments = attachment_pdfs.len()))]
pub fn merge(main: &[u8], attachment_pdfs: &[Vec<u8>]) -> Result<Vec<u8>> {
    if attachment_pdfs.is_empty() {
        debug!("Nothing to merge, returning main PDF as is");
        return Ok(main.to_vec());
    }

    let mut merged = Document::load_mem(main)
        .map_err(|err| ConversionError::Merge(format!("failed to load main PDF: {err}")))?;
    let pages_root = pages_root(&merged)?;
    let base_pages = merged.get_pages().len();

    let mut appended = 0usize;
    for (index, bytes) in attachment_pdfs.iter().enumerate() {
        let source = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(index, %err, "Skipping attachment PDF that does not load");
                continue;
            }
        };
        match import_pages(&source, &mut merged, pages_root) {
            Ok(count) => {
                debug!(index, pages = count, "Attachment pages appended");
                appended += count;
            }
            Err(err) => warn!(index, %err, "Skipping attachment PDF that could not be copied"),
        }
    }

    let mut output = Vec::new();
    merged
        .save_to(&mut output)
        .map_err(|err| ConversionError::Merge(format!("failed to serialise merged PDF: {err}")))?;

    info!(base_pages, appended, output_bytes = output.len(), "Merge complete");
    Ok(output)
}

/// Object id of the root /Pages node of `document`.
fn pages_root(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|err| ConversionError::Merge(format!("main PDF has no page tree: {err}")))
}

/// Copy all pages of `source` under `pages_root` in `target`, returning how
/// many were added.
///
/// Objects are staged first and only written into `target` once every page
/// has been copied, so a failure adds no objects to `target`.
fn import_pages(source: &Document, target: &mut Document, pages_root: ObjectId) -> Result<usize> {
    let pages = source.get_pages();
    if pages.is_empty() {
        return Err(ConversionError::Merge("attachment PDF has no pages".into()));
    }

    let mut copier = ObjectCopier::new(source, target);
    // Pre-assign page ids so links between pages land on the copies.
    let page_ids: Vec<(ObjectId, ObjectId)> = pages
        .values()
        .map(|&old| (old, copier.reserve(old)))
        .collect();

    for &(old, new) in &page_ids {
        let mut page = source
            .get_dictionary(old)
            .map_err(|err| ConversionError::Merge(format!("unreadable page {old:?}: {err}")))?
            .clone();
        inherit_attributes(source, &mut page);
        page.remove(b"Parent");

        let mut copied = copier.copy_dictionary(&page)?;
        copied.set("Parent", Object::Reference(pages_root));
        copier.staged.insert(new, Object::Dictionary(copied));
    }

    let staged = copier.staged;
    target.objects.extend(staged);

    let root = target
        .get_object_mut(pages_root)
        .and_then(Object::as_dict_mut)
        .map_err(|err| ConversionError::Merge(format!("page tree root unusable: {err}")))?;
    if let Ok(Object::Array(kids)) = root.get_mut(b"Kids") {
        kids.extend(page_ids.iter().map(|&(_, new)| Object::Reference(new)));
    } else {
        root.set(
            "Kids",
            page_ids
                .iter()
                .map(|&(_, new)| Object::Reference(new))
                .collect::<Vec<_>>(),
        );
    }
    let count = root
        .get(b"Count")
        .and_then(Object::as_i64)
        .unwrap_or(0);
    root.set("Count", count + page_ids.len() as i64);

    Ok(page_ids.len())
}

/// Fill in attributes `page` inherits from its ancestors but does not carry
/// itself, so the copy renders the same once detached from its old tree.
fn inherit_attributes(source: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut hops = 0;
    while let Some(id) = parent {
        let Ok(node) = source.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        hops += 1;
        if hops > 64 {
            warn!("Page tree deeper than expected, stopped walking ancestors");
            break;
        }
    }
}

/// Copies an object graph from one document into another.
///
/// Every source id is mapped to exactly one target id, so shared objects are
/// copied once and reference cycles terminate.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    ids: HashMap<ObjectId, ObjectId>,
    staged: BTreeMap<ObjectId, Object>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            ids: HashMap::new(),
            staged: BTreeMap::new(),
        }
    }

    fn reserve(&mut self, old: ObjectId) -> ObjectId {
        let new = self.target.new_object_id();
        self.ids.insert(old, new);
        new
    }

    fn copy_reference(&mut self, old: ObjectId) -> Result<Object> {
        if let Some(&new) = self.ids.get(&old) {
            return Ok(Object::Reference(new));
        }
        let referenced = match self.source.get_object(old) {
            Ok(object) => object,
            Err(err) => {
                warn!(?old, %err, "Cannot resolve reference, using Null");
                return Ok(Object::Null);
            }
        };
        let new = self.reserve(old);
        let copied = self.copy(referenced)?;
        self.staged.insert(new, copied);
        Ok(Object::Reference(new))
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Result<Dictionary> {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            // Pages reached through links keep their place out of the old tree.
            if key == b"Parent" && is_page_node(dict) {
                continue;
            }
            copied.set(key.clone(), self.copy(value)?);
        }
        Ok(copied)
    }

    fn copy(&mut self, object: &Object) -> Result<Object> {
        Ok(match object {
            Object::Reference(id) => self.copy_reference(*id)?,
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)?),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(&stream.dict)?;
                let mut copied = Stream::new(dict, stream.content.clone());
                copied.allows_compression = stream.allows_compression;
                Object::Stream(copied)
            }
            other => other.clone(),
        })
    }
}

fn is_page_node(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Type").and_then(Object::as_name), Ok(b"Page" | b"Pages"))
}
