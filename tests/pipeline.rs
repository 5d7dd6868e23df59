//! End-to-end tests for the conversion pipeline.
//!
//! The drawing tool is replaced by small shell scripts that copy the stdin
//! script into the requested output file, so every rendered page carries
//! the name of the split PDF it came from. That makes page order visible
//! inside the finished archive without needing drawj2d installed.
//!
//! The raster and thumbnail tests need a pdfium library and are skipped
//! without one.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

#![cfg(unix)]

use lopdf::{dictionary, Document, Object, Stream};
use pdf2notebook::pipeline::metadata::{ordering_tag, ContentIndex, DocumentMetadata};
use pdf2notebook::pipeline::render::bind_pdfium;
use pdf2notebook::{
    convert, inspect, ArchiveFormat, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, NotebookError, PageError, PageFailurePolicy, PageFormat,
    SizeVerdict,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Write a PDF with `pages` blank 200×100pt pages.
fn write_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Write an executable `/bin/sh` script that stands in for drawj2d.
///
/// The body runs after `$out` has been set from the `-o` argument.
fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let script = format!(
        "#!/bin/sh\n\
         out=\"\"\n\
         while [ $# -gt 0 ]; do\n\
           case \"$1\" in\n\
             -o) shift; out=\"$1\" ;;\n\
           esac\n\
           shift\n\
         done\n\
         {body}\n"
    );
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A tool that copies its stdin script into the output file.
fn echo_tool(dir: &Path) -> PathBuf {
    fake_tool(dir, "fake-drawj2d", "cat > \"$out\"")
}

fn base_config(tool: &Path, output: &Path, scratch: &Path) -> ConversionConfig {
    ConversionConfig::builder()
        .drawing_tool(tool)
        .output_path(output)
        .scratch_root(scratch)
        .thumbnails(false)
        .display_name("Test Notebook")
        .build()
        .unwrap()
}

/// Read every file entry of a zip archive into memory.
fn read_zip(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        entries.insert(entry.name().to_string(), data);
    }
    entries
}

/// Read every file entry of a tar archive into memory.
fn read_tar(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(file);
    let mut entries = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        entries.insert(name, data);
    }
    entries
}

fn content_index(entries: &BTreeMap<String, Vec<u8>>, output: &ConversionOutput) -> ContentIndex {
    let raw = &entries[&format!("{}.content", output.bundle_id)];
    serde_json::from_slice(raw).unwrap()
}

/// The split PDF name the fake tool recorded for each page, in index order.
fn rendered_page_names(
    entries: &BTreeMap<String, Vec<u8>>,
    output: &ConversionOutput,
) -> Vec<String> {
    let index = content_index(entries, output);
    index
        .c_pages
        .pages
        .iter()
        .map(|page| {
            let key = format!("{}/{}.rm", output.bundle_id, page.id);
            let script = String::from_utf8(entries[&key].clone()).unwrap();
            let start = script.find("page_").unwrap();
            let end = script.find(".pdf}").unwrap();
            script[start..end].to_string()
        })
        .collect()
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn converts_multiple_pdfs_in_order() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    let b = write_pdf(tmp.path(), "b.pdf", 3);
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.zip");
    let scratch = tmp.path().join("scratch");

    let config = base_config(&tool, &output_path, &scratch);
    let output = convert(&[a.clone(), b.clone()], &config).await.unwrap();

    assert_eq!(output.archive_path, output_path);
    assert_eq!(output.stats.total_pages, 5);
    assert_eq!(output.stats.rendered_pages, 5);
    assert_eq!(output.stats.skipped_pages, 0);
    assert_eq!(output.size.verdict, SizeVerdict::Ok);

    let sources: Vec<_> = output.pages.iter().map(|p| (p.source.clone(), p.source_page)).collect();
    assert_eq!(
        sources,
        vec![(a.clone(), 1), (a, 2), (b.clone(), 1), (b.clone(), 2), (b, 3)]
    );

    let entries = read_zip(&output_path);
    assert_eq!(
        rendered_page_names(&entries, &output),
        vec!["page_1", "page_2", "page_3", "page_4", "page_5"]
    );

    let index = content_index(&entries, &output);
    assert_eq!(index.page_count, 5);
    assert_eq!(index.file_type, "notebook");
    let tags: Vec<_> = index.c_pages.pages.iter().map(|p| p.idx.value.clone()).collect();
    assert_eq!(tags, vec!["ba", "bb", "bc", "bd", "be"]);

    let meta: DocumentMetadata =
        serde_json::from_slice(&entries[&format!("{}.metadata", output.bundle_id)]).unwrap();
    assert_eq!(meta.visible_name, "Test Notebook");
    assert!(entries.contains_key(&format!("{}.local", output.bundle_id)));

    // Scratch space is gone once the run is over.
    assert!(is_empty_dir(&scratch));
}

#[tokio::test]
async fn content_size_matches_page_files() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 3);
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.rmdoc");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.archive_format = ArchiveFormat::Rmdoc;
    let output = convert(&[a], &config).await.unwrap();

    let entries = read_zip(&output_path);
    let page_bytes: u64 = entries
        .iter()
        .filter(|(name, _)| name.ends_with(".rm"))
        .map(|(_, data)| data.len() as u64)
        .sum();
    let index = content_index(&entries, &output);
    assert_eq!(index.size_in_bytes, page_bytes.to_string());
    assert_eq!(output.stats.pages_bytes, page_bytes);
}

#[tokio::test]
async fn rmn_archive_is_tar() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.rmn");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.archive_format = ArchiveFormat::Rmn;
    let output = convert(&[a], &config).await.unwrap();

    let entries = read_tar(&output_path);
    assert_eq!(rendered_page_names(&entries, &output), vec!["page_1", "page_2"]);
}

#[tokio::test]
async fn scale_is_passed_to_the_drawing_tool() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 1);
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.zip");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.scale = 1.25;
    let output = convert(&[a], &config).await.unwrap();

    let entries = read_zip(&output_path);
    let page_id = output.pages[0].page_id.unwrap();
    let script = String::from_utf8(entries[&format!("{}/{}.rm", output.bundle_id, page_id)].clone())
        .unwrap();
    assert!(script.starts_with("image {"), "got: {script}");
    assert!(script.ends_with("} 0 0 0 1.25\n"), "got: {script}");
}

#[tokio::test]
async fn braces_in_scratch_path_stay_out_of_the_script() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.zip");
    let scratch = tmp.path().join("odd}dir {x");

    let config = base_config(&tool, &output_path, &scratch);
    let output = convert(&[a], &config).await.unwrap();

    let entries = read_zip(&output_path);
    for (i, record) in output.pages.iter().enumerate() {
        let key = format!("{}/{}.rm", output.bundle_id, record.page_id.unwrap());
        let script = String::from_utf8(entries[&key].clone()).unwrap();
        assert_eq!(script, format!("image {{page_{}.pdf}} 0 0 0 0.75\n", i + 1));
        assert_eq!(script.matches('{').count(), script.matches('}').count());
    }
}

#[tokio::test]
async fn progress_callbacks_fire_in_order() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, total_pages: usize) {
            self.0.lock().unwrap().push(format!("start {total_pages}"));
        }
        fn on_page_complete(&self, page_num: usize, _total: usize, _bytes: u64) {
            self.0.lock().unwrap().push(format!("page {page_num}"));
        }
        fn on_conversion_complete(&self, total_pages: usize, rendered: usize) {
            self.0.lock().unwrap().push(format!("done {rendered}/{total_pages}"));
        }
    }

    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    let tool = echo_tool(tmp.path());
    let recorder = Arc::new(Recorder::default());

    let config = ConversionConfig::builder()
        .drawing_tool(&tool)
        .output_path(tmp.path().join("out.zip"))
        .scratch_root(tmp.path().join("scratch"))
        .thumbnails(false)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    convert(&[a], &config).await.unwrap();

    let events = recorder.0.lock().unwrap().clone();
    assert_eq!(events, vec!["start 2", "page 1", "page 2", "done 2/2"]);
}

#[test]
fn inspect_counts_pages_across_inputs() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 4);
    let b = write_pdf(tmp.path(), "b.pdf", 1);
    assert_eq!(inspect(&[a, b]).unwrap(), 5);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 1);
    let missing = tmp.path().join("missing.pdf");
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.zip");
    let scratch = tmp.path().join("scratch");

    let config = base_config(&tool, &output_path, &scratch);
    let err = convert(&[a, missing.clone()], &config).await.unwrap_err();

    match err {
        NotebookError::InputNotFound { ref path } => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert!(!output_path.exists());
    assert!(is_empty_dir(&scratch));
}

#[tokio::test]
async fn non_pdf_input_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let fake = tmp.path().join("notes.pdf");
    std::fs::write(&fake, b"hello, not a pdf").unwrap();
    let tool = echo_tool(tmp.path());
    let output_path = tmp.path().join("out.zip");

    let config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    let err = convert(&[fake], &config).await.unwrap_err();
    assert!(matches!(err, NotebookError::NotAPdf { .. }), "got: {err}");
    assert!(!output_path.exists());
}

#[tokio::test]
async fn failing_page_aborts_without_archive() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 3);
    let tool = fake_tool(
        tmp.path(),
        "broken-drawj2d",
        "script=$(cat)\n\
         case \"$script\" in\n\
           *page_2.pdf*) echo \"cannot parse page\" >&2; exit 3 ;;\n\
         esac\n\
         printf '%s\\n' \"$script\" > \"$out\"",
    );
    let output_path = tmp.path().join("out.zip");

    let config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    let err = convert(&[a], &config).await.unwrap_err();

    match err {
        NotebookError::RenderFailure { page, ref detail } => {
            assert_eq!(page, 2);
            assert!(detail.contains("cannot parse page"), "got: {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert!(!output_path.exists());
}

#[tokio::test]
async fn failing_page_is_left_out_under_skip_policy() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 3);
    let tool = fake_tool(
        tmp.path(),
        "broken-drawj2d",
        "script=$(cat)\n\
         case \"$script\" in\n\
           *page_2.pdf*) echo \"cannot parse page\" >&2; exit 3 ;;\n\
         esac\n\
         printf '%s\\n' \"$script\" > \"$out\"",
    );
    let output_path = tmp.path().join("out.zip");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.failure_policy = PageFailurePolicy::Skip;
    let output = convert(&[a], &config).await.unwrap();

    assert_eq!(output.stats.rendered_pages, 2);
    assert_eq!(output.stats.skipped_pages, 1);
    assert!(output.pages[1].page_id.is_none());
    assert!(output.pages[1].error.is_some());

    let entries = read_zip(&output_path);
    assert_eq!(rendered_page_names(&entries, &output), vec!["page_1", "page_3"]);
    let index = content_index(&entries, &output);
    let tags: Vec<_> = index.c_pages.pages.iter().map(|p| p.idx.value.clone()).collect();
    assert_eq!(tags, vec![ordering_tag(0), ordering_tag(1)]);
}

#[tokio::test]
async fn all_pages_failing_is_fatal_even_when_skipping() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    let tool = fake_tool(tmp.path(), "dead-drawj2d", "echo nope >&2\nexit 1");
    let output_path = tmp.path().join("out.zip");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.failure_policy = PageFailurePolicy::Skip;
    let err = convert(&[a], &config).await.unwrap_err();

    assert!(matches!(err, NotebookError::AllPagesFailed { total: 2, .. }), "got: {err}");
    assert!(!output_path.exists());
}

#[tokio::test]
async fn hung_tool_is_killed_after_timeout() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 1);
    let tool = fake_tool(tmp.path(), "slow-drawj2d", "exec sleep 30");
    let output_path = tmp.path().join("out.zip");

    let mut config = base_config(&tool, &output_path, &tmp.path().join("scratch"));
    config.tool_timeout_secs = 1;
    let err = convert(&[a], &config).await.unwrap_err();

    match err {
        NotebookError::RenderFailure { page, ref detail } => {
            assert_eq!(page, 1);
            assert!(detail.contains("did not finish"), "got: {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output_path.exists());
}

#[tokio::test]
async fn missing_drawing_tool_is_a_render_failure() {
    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 1);
    let output_path = tmp.path().join("out.zip");

    let config = base_config(
        &tmp.path().join("no-such-drawj2d"),
        &output_path,
        &tmp.path().join("scratch"),
    );
    let err = convert(&[a], &config).await.unwrap_err();
    assert!(matches!(err, NotebookError::RenderFailure { page: 1, .. }), "got: {err}");
}

// ── Raster back-end (needs pdfium) ───────────────────────────────────────────

#[tokio::test]
async fn raster_width_follows_scale() {
    if bind_pdfium().is_err() {
        println!("SKIP — pdfium library not available; set PDFIUM_LIB_PATH");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 1);

    let mut widths = Vec::new();
    for (scale, name) in [(0.5, "half.zip"), (1.0, "full.zip")] {
        let output_path = tmp.path().join(name);
        let config = ConversionConfig::builder()
            .page_format(PageFormat::Raster)
            .scale(scale)
            .output_path(&output_path)
            .scratch_root(tmp.path().join("scratch"))
            .build()
            .unwrap();
        let output = convert(&[a.clone()], &config).await.unwrap();

        let entries = read_zip(&output_path);
        let page_id = output.pages[0].page_id.unwrap();
        let png = &entries[&format!("{}/{}.png", output.bundle_id, page_id)];
        let img = image::load_from_memory(png).unwrap();
        widths.push(img.width());

        assert!(output.pages[0].thumbnail);
        assert!(entries.contains_key(&format!("{}.thumbnails/{}.png", output.bundle_id, page_id)));
    }

    assert!(widths[0] < widths[1], "widths: {widths:?}");
    assert!((widths[1] as i64 - 2 * widths[0] as i64).abs() <= 2, "widths: {widths:?}");
}

#[tokio::test]
async fn thumbnail_failure_keeps_the_page() {
    if bind_pdfium().is_err() {
        println!("SKIP — pdfium library not available; set PDFIUM_LIB_PATH");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let a = write_pdf(tmp.path(), "a.pdf", 2);
    // Replace the thumbnail directory with a plain file so no PNG can be saved.
    let tool = fake_tool(
        tmp.path(),
        "thumb-breaking-drawj2d",
        "dir=$(dirname \"$out\")\n\
         rm -rf \"$dir.thumbnails\"\n\
         : > \"$dir.thumbnails\"\n\
         cat > \"$out\"",
    );
    let output_path = tmp.path().join("out.zip");

    let config = ConversionConfig::builder()
        .drawing_tool(&tool)
        .output_path(&output_path)
        .scratch_root(tmp.path().join("scratch"))
        .build()
        .unwrap();
    let output = convert(&[a], &config).await.unwrap();

    assert_eq!(output.stats.rendered_pages, 2);
    assert_eq!(output.stats.thumbnails, 0);
    for record in &output.pages {
        assert!(record.page_id.is_some());
        assert!(!record.thumbnail);
        assert!(
            matches!(record.error, Some(PageError::Thumbnail { page, .. }) if page == record.page_num),
            "got: {:?}",
            record.error
        );
    }

    let entries = read_zip(&output_path);
    let thumb_prefix = format!("{}.thumbnails/", output.bundle_id);
    assert!(!entries.keys().any(|name| name.starts_with(&thumb_prefix)));
    assert_eq!(rendered_page_names(&entries, &output), vec!["page_1", "page_2"]);
}
