//! Face gallery: known identities and their reference embeddings.
//!
//! Backed by a directory holding one reference image per identity, named after
//! the identity with spaces stored as underscores (`Jane_Doe.png` is "Jane Doe").
//! Readers take an `Arc` snapshot; reload builds a complete replacement before
//! swapping it in, and append is copy-on-write.

use crate::extractor::{detect_with_retry, ExtractorError, FaceExtractor};
use crate::transport::{ContrastGain, PREPARE_GAIN};
use crate::types::Embedding;
use image::{ImageFormat, RgbImage};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// File extensions accepted as reference images.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extension used for newly written reference images (lossless, so a reload
/// reproduces the appended embedding exactly).
const REFERENCE_EXTENSION: &str = "png";
const MAX_IDENTITY_LEN: usize = 128;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode reference image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("invalid identity name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> GalleryError + '_ {
    move |source| GalleryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One known identity.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub identity: String,
    pub embedding: Embedding,
}

/// Extraction settings used when rebuilding from disk.
#[derive(Debug, Clone, Copy)]
pub struct ReloadOptions {
    pub upsample: u32,
    /// Applied to every reference image before detection.
    pub gain: ContrastGain,
    /// Second detection pass for images where the first finds nothing.
    pub retry_gain: Option<ContrastGain>,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            upsample: 1,
            gain: PREPARE_GAIN,
            retry_gain: None,
        }
    }
}

/// In-memory gallery kept consistent with its backing directory.
pub struct FaceGallery {
    dir: PathBuf,
    entries: RwLock<Arc<[GalleryEntry]>>,
    /// Serializes reload, append, enroll and remove so a reload never drops a
    /// concurrent update.
    mutation: Mutex<()>,
}

impl FaceGallery {
    /// Open the gallery directory, creating it if missing. Starts empty; call
    /// [`reload`](Self::reload) to populate.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GalleryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self {
            dir,
            entries: RwLock::new(Arc::from(Vec::new())),
            mutation: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current entries. The snapshot never changes after it is taken.
    pub fn snapshot(&self) -> Arc<[GalleryEntry]> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.identity.clone()).collect()
    }

    /// Rescan the directory and atomically replace the gallery.
    ///
    /// Unreadable files and files without a usable face are skipped with a
    /// warning. On a directory error or a model failure the previous gallery
    /// stays active.
    pub fn reload(
        &self,
        extractor: &mut dyn FaceExtractor,
        options: ReloadOptions,
    ) -> Result<usize, GalleryError> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(dir = %self.dir.display(), "reloading face gallery");

        let mut fresh: Vec<GalleryEntry> = Vec::new();
        for path in self.reference_files()? {
            let Some(identity) = identity_for_path(&path) else {
                continue;
            };
            if fresh.iter().any(|e| e.identity == identity) {
                tracing::warn!(
                    path = %path.display(),
                    identity,
                    "duplicate reference image for identity, skipping"
                );
                continue;
            }

            let image = match image::open(&path) {
                Ok(img) => options.gain.apply(&img.to_rgb8()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load reference image, skipping");
                    continue;
                }
            };

            let faces =
                detect_with_retry(extractor, &image, options.upsample, options.retry_gain)?;
            let mut embedding = None;
            for face in &faces {
                if let Some(found) = extractor.encode(&image, face)? {
                    embedding = Some(found);
                    break;
                }
            }
            let Some(embedding) = embedding else {
                tracing::warn!(
                    path = %path.display(),
                    detected = faces.len(),
                    "no usable face in reference image, skipping"
                );
                continue;
            };
            fresh.push(GalleryEntry {
                identity,
                embedding,
            });
        }

        let count = fresh.len();
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::from(fresh);
        tracing::info!(count, "face gallery ready");
        Ok(count)
    }

    /// Add or replace one entry without rescanning; visible to the next snapshot.
    pub fn append(&self, identity: &str, embedding: Embedding) {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.replace_entry(identity, embedding);
    }

    /// Copy-on-write update of one entry. Callers hold `mutation`.
    fn replace_entry(&self, identity: &str, embedding: Embedding) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<GalleryEntry> = entries.iter().cloned().collect();
        match next.iter_mut().find(|e| e.identity == identity) {
            Some(existing) => {
                tracing::info!(identity, "replacing gallery entry");
                existing.embedding = embedding;
            }
            None => next.push(GalleryEntry {
                identity: identity.to_string(),
                embedding,
            }),
        }
        *entries = Arc::from(next);
    }

    /// Durably write the reference image for `name`, then append its embedding.
    ///
    /// A crash between the two leaves an orphan file that the next reload
    /// picks up; it never leaves an entry without a file.
    pub fn enroll(
        &self,
        name: &str,
        image: &RgbImage,
        embedding: Embedding,
    ) -> Result<PathBuf, GalleryError> {
        let identity = normalize_identity(name)?;
        let stem = file_stem_for_identity(&identity);

        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.dir.join(format!("{stem}.{REFERENCE_EXTENSION}"));
        write_durably(&self.dir, &path, image)?;

        for stale in self.files_for_identity(&identity)? {
            if stale != path {
                tracing::info!(path = %stale.display(), "removing superseded reference image");
                fs::remove_file(&stale).map_err(io_err(&stale))?;
            }
        }

        self.replace_entry(&identity, embedding);
        tracing::info!(identity, path = %path.display(), "identity enrolled");
        Ok(path)
    }

    /// Delete every reference image mapping to the identity, then its entry.
    ///
    /// Returns false if the identity was unknown both on disk and in memory.
    pub fn remove(&self, name: &str) -> Result<bool, GalleryError> {
        let identity = normalize_identity(name)?;

        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        let files = self.files_for_identity(&identity)?;
        for path in &files {
            fs::remove_file(path).map_err(io_err(path))?;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        let next: Vec<GalleryEntry> = entries
            .iter()
            .filter(|e| e.identity != identity)
            .cloned()
            .collect();
        let dropped = next.len() != before;
        *entries = Arc::from(next);

        if dropped || !files.is_empty() {
            tracing::info!(identity, files = files.len(), "identity removed");
        }
        Ok(dropped || !files.is_empty())
    }

    /// Supported image files in the directory, sorted by file name.
    fn reference_files(&self) -> Result<Vec<PathBuf>, GalleryError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err(&self.dir))? {
            let entry = entry.map_err(io_err(&self.dir))?;
            let path = entry.path();
            if path.is_file() && has_supported_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every reference file that reload would map to `identity`, whatever
    /// its spacing or extension (`Jane Doe.jpg`, `Jane__Doe.png`).
    fn files_for_identity(&self, identity: &str) -> Result<Vec<PathBuf>, GalleryError> {
        Ok(self
            .reference_files()?
            .into_iter()
            .filter(|p| identity_for_path(p).as_deref() == Some(identity))
            .collect())
    }
}

/// Encode to PNG, write to a hidden temp file, fsync, then rename into place.
fn write_durably(dir: &Path, path: &Path, image: &RgbImage) -> Result<(), GalleryError> {
    let mut encoded = Cursor::new(Vec::new());
    image.write_to(&mut encoded, ImageFormat::Png)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{file_name}.tmp"));

    let mut file = File::create(&tmp).map_err(io_err(&tmp))?;
    file.write_all(encoded.get_ref()).map_err(io_err(&tmp))?;
    file.sync_all().map_err(io_err(&tmp))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path)(e));
    }

    // Persist the rename itself; not every platform supports syncing a directory.
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync skipped");
    }
    Ok(())
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Identity for a reference image path, or `None` for hidden or unnamed files.
fn identity_for_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    let identity = identity_from_file_stem(stem);
    (!identity.is_empty()).then_some(identity)
}

/// Display name for a file stem: underscores become spaces, runs collapse.
pub fn identity_from_file_stem(stem: &str) -> String {
    stem.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// File stem for an identity: spaces become underscores.
pub fn file_stem_for_identity(identity: &str) -> String {
    identity.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Canonical identity for a requested name, or why it cannot be stored.
///
/// The result round-trips: `identity_from_file_stem(file_stem_for_identity(x)) == x`.
pub fn normalize_identity(name: &str) -> Result<String, GalleryError> {
    let invalid = |reason| GalleryError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.chars().any(char::is_control) {
        return Err(invalid("contains control characters"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("contains a path separator"));
    }

    let identity = identity_from_file_stem(name);
    if identity.is_empty() {
        return Err(invalid("empty"));
    }
    if identity.starts_with('.') {
        return Err(invalid("starts with '.'"));
    }
    if identity.chars().count() > MAX_IDENTITY_LEN {
        return Err(invalid("too long"));
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::ScriptedExtractor;
    use image::Rgb;

    /// Uniform 8×4 image: one scripted face with embedding (g, b).
    fn face_image(g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(8, 4, Rgb([200, g, b]))
    }

    fn write_png(dir: &Path, name: &str, img: &RgbImage) {
        img.save_with_format(dir.join(name), ImageFormat::Png).unwrap();
    }

    fn extractor() -> ScriptedExtractor {
        let mut e = ScriptedExtractor::new();
        e.min_red = 100;
        e
    }

    fn sorted_entries(gallery: &FaceGallery) -> Vec<GalleryEntry> {
        let mut entries = gallery.snapshot().to_vec();
        entries.sort_by(|a, b| a.identity.cmp(&b.identity));
        entries
    }

    #[test]
    fn test_open_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("known_faces");
        let gallery = FaceGallery::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_reload_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        let count = gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reload_derives_names_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "person_one.png", &face_image(10, 20));
        face_image(30, 40)
            .save_with_format(dir.path().join("person_two.JPG"), ImageFormat::Jpeg)
            .unwrap();
        fs::write(dir.path().join("ignore.txt"), b"not an image").unwrap();

        let gallery = FaceGallery::open(dir.path()).unwrap();
        let count = gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap();

        assert_eq!(count, 2);
        let mut names = gallery.names();
        names.sort();
        assert_eq!(names, vec!["person one", "person two"]);
    }

    #[test]
    fn test_reload_skips_corrupt_and_faceless_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Alice.png", &face_image(10, 20));
        fs::write(dir.path().join("Broken.jpg"), b"\xff\xd8garbage").unwrap();
        write_png(dir.path(), "Empty.png", &RgbImage::new(8, 4));

        let gallery = FaceGallery::open(dir.path()).unwrap();
        let count = gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap();

        assert_eq!(count, 1);
        assert_eq!(gallery.names(), vec!["Alice"]);
    }

    #[test]
    fn test_reload_keeps_first_embedding_of_multi_face_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = RgbImage::new(8, 1);
        img.put_pixel(0, 0, Rgb([200, 10, 10]));
        img.put_pixel(4, 0, Rgb([200, 90, 90]));
        write_png(dir.path(), "Group.png", &img);

        let gallery = FaceGallery::open(dir.path()).unwrap();
        gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap();

        let expected = PREPARE_GAIN.apply(&img).get_pixel(0, 0).0[1];
        let entry = &gallery.snapshot()[0];
        assert_eq!(entry.embedding.values[0], f32::from(expected) / 100.0);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Alice.png", &face_image(10, 20));
        write_png(dir.path(), "Bob_Smith.png", &face_image(30, 40));

        let gallery = FaceGallery::open(dir.path()).unwrap();
        let mut ex = extractor();
        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        let first = sorted_entries(&gallery);
        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        let second = sorted_entries(&gallery);

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reload_failure_keeps_previous_gallery() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("faces");
        let gallery = FaceGallery::open(&dir).unwrap();
        write_png(&dir, "Alice.png", &face_image(10, 20));
        gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap();

        fs::remove_dir_all(&dir).unwrap();
        let err = gallery.reload(&mut extractor(), ReloadOptions::default()).unwrap_err();

        assert!(matches!(err, GalleryError::Io { .. }));
        assert_eq!(gallery.names(), vec!["Alice"]);
    }

    #[test]
    fn test_append_visible_and_snapshots_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        let before = gallery.snapshot();

        gallery.append("Bob", Embedding::new(vec![0.1, 0.2]));

        assert!(before.is_empty());
        assert_eq!(gallery.names(), vec!["Bob"]);
    }

    #[test]
    fn test_append_replaces_existing_identity() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        gallery.append("Bob", Embedding::new(vec![0.1]));
        gallery.append("Bob", Embedding::new(vec![0.9]));

        let entries = gallery.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].embedding.values, vec![0.9]);
    }

    #[test]
    fn test_enroll_round_trips_through_reload() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        let mut ex = extractor();

        let img = face_image(10, 20);
        let prepared = PREPARE_GAIN.apply(&img);
        let (_, embedding) = ex.detect_and_encode(&prepared, 1).unwrap().remove(0);

        let path = gallery.enroll("Jane Doe", &img, embedding.clone()).unwrap();
        assert_eq!(path, dir.path().join("Jane_Doe.png"));
        assert!(path.is_file());
        assert_eq!(gallery.names(), vec!["Jane Doe"]);

        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        let entries = gallery.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identity, "Jane Doe");
        assert_eq!(entries[0].embedding, embedding);
    }

    #[test]
    fn test_enroll_normalizes_name_and_replaces_sibling() {
        let dir = tempfile::tempdir().unwrap();
        face_image(1, 1)
            .save_with_format(dir.path().join("Jane_Doe.jpg"), ImageFormat::Jpeg)
            .unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();

        gallery
            .enroll("  Jane__Doe ", &face_image(10, 20), Embedding::new(vec![0.1]))
            .unwrap();

        assert!(!dir.path().join("Jane_Doe.jpg").exists());
        assert!(dir.path().join("Jane_Doe.png").exists());
        assert_eq!(gallery.names(), vec!["Jane Doe"]);
        // No temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_remove_deletes_file_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        gallery
            .enroll("Bob", &face_image(10, 20), Embedding::new(vec![0.1]))
            .unwrap();

        assert!(gallery.remove("Bob").unwrap());
        assert!(gallery.is_empty());
        assert!(!dir.path().join("Bob.png").exists());
        assert!(!gallery.remove("Bob").unwrap());
    }

    #[test]
    fn test_remove_deletes_every_file_mapping_to_identity() {
        let dir = tempfile::tempdir().unwrap();
        face_image(10, 20)
            .save_with_format(dir.path().join("Jane Doe.jpg"), ImageFormat::Jpeg)
            .unwrap();
        write_png(dir.path(), "Jane__Doe.png", &face_image(30, 40));
        write_png(dir.path(), "Bob.png", &face_image(50, 60));

        let gallery = FaceGallery::open(dir.path()).unwrap();
        let mut ex = extractor();
        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        let mut names = gallery.names();
        names.sort();
        assert_eq!(names, vec!["Bob", "Jane Doe"]);

        assert!(gallery.remove("Jane Doe").unwrap());
        assert!(!dir.path().join("Jane Doe.jpg").exists());
        assert!(!dir.path().join("Jane__Doe.png").exists());
        assert!(dir.path().join("Bob.png").exists());

        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        assert_eq!(gallery.names(), vec!["Bob"]);
    }

    #[test]
    fn test_reenroll_replaces_spaced_file_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Jane Doe.png", &face_image(10, 20));

        let gallery = FaceGallery::open(dir.path()).unwrap();
        let mut ex = extractor();
        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();

        let img = face_image(90, 90);
        let (_, embedding) = ex
            .detect_and_encode(&PREPARE_GAIN.apply(&img), 1)
            .unwrap()
            .remove(0);
        gallery.enroll("Jane Doe", &img, embedding.clone()).unwrap();

        let mut files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["Jane_Doe.png"]);

        gallery.reload(&mut ex, ReloadOptions::default()).unwrap();
        let entries = gallery.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identity, "Jane Doe");
        assert_eq!(entries[0].embedding, embedding);
    }

    #[test]
    fn test_append_waits_for_running_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();

        std::thread::scope(|s| {
            let guard = gallery.mutation.lock().unwrap();
            let writer = s.spawn(|| gallery.append("Bob", Embedding::new(vec![0.1])));
            std::thread::sleep(std::time::Duration::from_millis(50));
            // A reload holding the lock would swap in its own snapshot here.
            assert!(gallery.is_empty());
            drop(guard);
            writer.join().unwrap();
        });

        assert_eq!(gallery.names(), vec!["Bob"]);
    }

    #[test]
    fn test_append_after_enroll_of_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FaceGallery::open(dir.path()).unwrap();
        gallery
            .enroll("Bob", &face_image(10, 20), Embedding::new(vec![0.1]))
            .unwrap();
        gallery.append("Bob", Embedding::new(vec![0.2]));

        let entries = gallery.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].embedding.values, vec![0.2]);
    }

    #[test]
    fn test_normalize_identity_rules() {
        assert_eq!(normalize_identity("Jane Doe").unwrap(), "Jane Doe");
        assert_eq!(normalize_identity("jane_doe").unwrap(), "jane doe");
        assert_eq!(normalize_identity(" Ana  Maria ").unwrap(), "Ana Maria");

        for bad in ["", "   ", "__", "../etc", "a/b", "a\\b", ".hidden", "tab\tname"] {
            assert!(
                matches!(normalize_identity(bad), Err(GalleryError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(normalize_identity(&"x".repeat(MAX_IDENTITY_LEN + 1)).is_err());
    }

    #[test]
    fn test_stem_round_trip() {
        for name in ["Jane Doe", "Ana Maria Silva", "Bob", "O'Neil Jr."] {
            let identity = normalize_identity(name).unwrap();
            assert_eq!(identity_from_file_stem(&file_stem_for_identity(&identity)), identity);
        }
    }

    #[test]
    fn test_hidden_files_are_not_identities() {
        assert_eq!(identity_for_path(Path::new("/x/.Jane_Doe.png")), None);
        assert_eq!(
            identity_for_path(Path::new("/x/Jane_Doe.png")).as_deref(),
            Some("Jane Doe")
        );
    }
}
