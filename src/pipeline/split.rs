//! Page splitting: turn the input PDFs into one single-page PDF per page.
//!
//! Every later stage works on [`PageUnit`]s. Splitting up front gives the
//! drawing tool a file that contains exactly the page to draw, and fixes the
//! authoritative page order (input order, then page order within each file)
//! before anything is rendered.
//!
//! Splitting uses `lopdf` rather than pdfium so the default drawing pipeline
//! does not need the pdfium shared library at all.

use crate::error::NotebookError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One page of one input document, extracted to its own PDF file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageUnit {
    /// Global 1-based page number, contiguous across all inputs.
    pub index: usize,
    /// Input document the page came from.
    pub source: PathBuf,
    /// 1-based page number inside `source`.
    pub source_page: u32,
    /// The single-page PDF on disk.
    pub path: PathBuf,
}

/// File name of the split PDF for global page `index`.
pub fn page_file_name(index: usize) -> String {
    format!("page_{index}.pdf")
}

/// Check that `path` is an existing regular file starting with `%PDF`.
pub fn validate_source(path: &Path) -> Result<(), NotebookError> {
    if !path.is_file() {
        return Err(NotebookError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = std::fs::File::open(path).map_err(|_| NotebookError::InputNotFound {
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(NotebookError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Load a source document, mapping parse errors to [`NotebookError::CorruptPdf`].
fn load_document(path: &Path) -> Result<Document, NotebookError> {
    Document::load(path).map_err(|e| NotebookError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Number of pages in a PDF file.
pub fn page_count(path: &Path) -> Result<usize, NotebookError> {
    validate_source(path)?;
    Ok(load_document(path)?.get_pages().len())
}

/// Split every page of every source into `scratch_dir/page_{n}.pdf`.
///
/// All sources are validated before anything is written, so a missing file
/// anywhere in the list aborts the run with no output at all. The returned
/// vector is in input order, then page order, and `index` runs 1..=N
/// without gaps.
pub fn split_pages<P: AsRef<Path>>(
    sources: &[P],
    scratch_dir: &Path,
) -> Result<Vec<PageUnit>, NotebookError> {
    if sources.is_empty() {
        return Err(NotebookError::NoInput);
    }
    for source in sources {
        validate_source(source.as_ref())?;
    }

    std::fs::create_dir_all(scratch_dir).map_err(|e| NotebookError::BundleWriteFailed {
        path: scratch_dir.to_path_buf(),
        source: e,
    })?;

    let mut units = Vec::new();
    for source in sources {
        let source = source.as_ref();
        info!("Working on file: {}", source.display());

        let document = load_document(source)?;

        for (page_number, page_id) in document.get_pages() {
            let index = units.len() + 1;
            let path = scratch_dir.join(page_file_name(index));
            extract_page(&document, page_id, &path).map_err(|e| match e {
                ExtractError::Pdf(e) => NotebookError::CorruptPdf {
                    path: source.to_path_buf(),
                    detail: format!("cannot extract page {page_number}: {e}"),
                },
                ExtractError::Io(e) => NotebookError::BundleWriteFailed {
                    path: path.clone(),
                    source: e,
                },
            })?;
            debug!("Created: {}", path.display());

            units.push(PageUnit {
                index,
                source: source.to_path_buf(),
                source_page: page_number,
                path,
            });
        }
    }

    if units.is_empty() {
        return Err(NotebookError::NoPages);
    }

    info!("Split {} input file(s) into {} pages", sources.len(), units.len());
    Ok(units)
}

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

enum ExtractError {
    Pdf(lopdf::Error),
    Io(std::io::Error),
}

impl From<lopdf::Error> for ExtractError {
    fn from(e: lopdf::Error) -> Self {
        ExtractError::Pdf(e)
    }
}

/// Write a new document holding only `page_id` and the objects it reaches.
///
/// The page tree is not followed upwards (`Parent` links are skipped), so
/// the cost is bounded by the page's own resources rather than by the size
/// of the whole document. Inherited attributes are copied onto the page.
fn extract_page(document: &Document, page_id: ObjectId, dest: &Path) -> Result<(), ExtractError> {
    let mut page = document.get_dictionary(page_id)?.clone();

    let mut visited = BTreeSet::new();
    let mut ancestor = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = ancestor {
        if !visited.insert(node_id) {
            break;
        }
        let node = document.get_dictionary(node_id)?;
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        ancestor = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    page.remove(b"Parent");

    let mut single = Document::with_version(document.version.clone());
    single.max_id = document.max_id;

    let mut pending = Vec::new();
    collect_references(&Object::Dictionary(page.clone()), &mut pending);
    let mut copied = BTreeSet::from([page_id]);
    while let Some(id) = pending.pop() {
        if !copied.insert(id) {
            continue;
        }
        // Dangling references are legal PDF; they read as null.
        let Ok(object) = document.get_object(id) else {
            continue;
        };
        collect_references(object, &mut pending);
        single.objects.insert(id, object.clone());
    }

    let pages_id = single.new_object_id();
    page.set("Parent", pages_id);
    single.objects.insert(page_id, Object::Dictionary(page));
    single.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = single.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    single.trailer.set("Root", catalog_id);

    single.save(dest).map_err(ExtractError::Io)?;
    Ok(())
}

/// Push every object id referenced from `object`, skipping `Parent` links.
fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => collect_dictionary_references(dict, out),
        Object::Stream(stream) => collect_dictionary_references(&stream.dict, out),
        _ => {}
    }
}

fn collect_dictionary_references(dict: &Dictionary, out: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if key.as_slice() != b"Parent" {
            collect_references(value, out);
        }
    }
}
