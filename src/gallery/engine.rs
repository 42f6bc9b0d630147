use crate::error::GalleryError;
use crate::gallery::model::{
    generate_id, repair_dangling_album_refs, Album, AspectClass, DeletionLogEntry, Photo,
};
use crate::gallery::views;
use crate::media::upload::MediaUploader;
use crate::metadata::exif::{extract_metadata, PhotoMetadata};
use crate::metadata::geocode::ReverseGeocoder;
use crate::store::document::Fields;
use crate::store::gateway::{ChunkRef, DocumentGateway, RemoteSnapshot};
use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Files per concurrently-processed batch-upload group. Groups run
/// sequentially, so peak in-flight network activity stays bounded.
const BATCH_GROUP_SIZE: usize = 3;

/// One file handed over by the browser: its name and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadFile {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Default photo title: the filename with its extension stripped.
    pub fn default_title(&self) -> String {
        std::path::Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
            .to_string()
    }
}

/// Partial edit of a photo's user-editable fields.
#[derive(Debug, Clone, Default)]
pub struct PhotoEdit {
    pub title: Option<String>,
    pub album_id: Option<String>,
}

impl PhotoEdit {
    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(title) = &self.title {
            fields.insert("title".into(), json!(title));
        }
        if let Some(album_id) = &self.album_id {
            fields.insert("albumId".into(), json!(album_id));
        }
        fields
    }
}

/// Partial edit of an album's user-editable fields.
#[derive(Debug, Clone, Default)]
pub struct AlbumEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub cover_photo_id: Option<String>,
}

impl AlbumEdit {
    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), json!(name));
        }
        if let Some(description) = &self.description {
            fields.insert("description".into(), json!(description));
        }
        if let Some(theme) = &self.theme {
            fields.insert("theme".into(), json!(theme));
        }
        if let Some(cover) = &self.cover_photo_id {
            fields.insert("coverPhotoId".into(), json!(cover));
        }
        fields
    }
}

/// The in-memory gallery model and every mutation over it.
///
/// All operations commit to the remote store first and only then rebuild
/// the local collections, so a failed operation leaves state untouched.
/// Collections are replaced wholesale on every change (never mutated in
/// place) for cheap change detection in a reactive consumer.
pub struct GalleryEngine {
    gateway: DocumentGateway,
    media: Arc<dyn MediaUploader>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    photos: Vec<Photo>,
    albums: Vec<Album>,
    /// Which chunk physically holds each photo. A storage artifact kept
    /// beside the model, never inside it.
    locations: HashMap<String, ChunkRef>,
    loading: bool,
    last_error: Option<GalleryError>,
}

impl GalleryEngine {
    pub fn new(
        gateway: DocumentGateway,
        media: Arc<dyn MediaUploader>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
    ) -> Self {
        GalleryEngine {
            gateway,
            media,
            geocoder,
            photos: Vec::new(),
            albums: Vec::new(),
            locations: HashMap::new(),
            loading: true,
            last_error: None,
        }
    }

    // ── State accessors ───────────────────────────────────────────────────────

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// The current in-memory aggregate, as one value.
    pub fn snapshot(&self) -> crate::gallery::model::GallerySnapshot {
        crate::gallery::model::GallerySnapshot {
            photos: self.photos.clone(),
            albums: self.albums.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&GalleryError> {
        self.last_error.as_ref()
    }

    /// Photos of one album, or uncategorized photos for an empty id.
    pub fn photos_in_album(&self, album_id: &str) -> Vec<Photo> {
        self.photos
            .iter()
            .filter(|p| p.album_id == album_id)
            .cloned()
            .collect()
    }

    pub fn albums_with_stats(&self) -> Vec<views::AlbumWithStats> {
        views::albums_with_stats(&self.photos, &self.albums)
    }

    pub fn theme_groups(&self) -> Vec<views::ThemeGroup> {
        views::theme_groups(self.albums_with_stats())
    }

    pub fn search(&self, query: &str) -> Vec<Photo> {
        views::filter_photos(&self.photos, &self.albums, query)
    }

    fn record_failure(&mut self, err: GalleryError) -> GalleryError {
        self.last_error = Some(err.clone());
        err
    }

    fn chunk_of(&self, photo_id: &str) -> Result<ChunkRef, GalleryError> {
        self.locations
            .get(photo_id)
            .cloned()
            .ok_or_else(|| GalleryError::not_found(format!("photo {}", photo_id)))
    }

    // ── load ──────────────────────────────────────────────────────────────────

    /// Fetch the full snapshot and replace local state with it. On failure
    /// the error is recorded and state is left empty. Concurrent calls
    /// race; the last one to finish wins, which is idempotent in result.
    pub async fn load(&mut self) -> Result<(), GalleryError> {
        self.loading = true;
        match self.gateway.fetch_snapshot().await {
            Ok(snapshot) => {
                self.install_snapshot(snapshot);
                self.loading = false;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("load failed: {}", err);
                self.photos = Vec::new();
                self.albums = Vec::new();
                self.locations = HashMap::new();
                self.loading = false;
                Err(self.record_failure(err))
            }
        }
    }

    /// Replace local state from a remote snapshot, repairing dangling album
    /// references before anything downstream can observe them.
    fn install_snapshot(&mut self, snapshot: RemoteSnapshot) {
        let mut photos = Vec::with_capacity(snapshot.photos.len());
        let mut locations = HashMap::with_capacity(snapshot.photos.len());
        for stored in snapshot.photos {
            locations.insert(stored.photo.id.clone(), stored.chunk);
            photos.push(stored.photo);
        }
        let repaired = repair_dangling_album_refs(&mut photos, &snapshot.albums);
        if repaired > 0 {
            tracing::info!("load: repaired {} dangling album reference(s)", repaired);
        }
        self.photos = photos;
        self.albums = snapshot.albums;
        self.locations = locations;
        self.last_error = None;
    }

    // ── Photo upload ──────────────────────────────────────────────────────────

    /// Upload one photo. Metadata extraction and reverse geocoding are
    /// non-fatal; the media upload and the record persist are not. On
    /// success the new photo is inserted at the front of the local list.
    pub async fn upload_photo(
        &mut self,
        file: &UploadFile,
        title: &str,
        album_id: &str,
        precomputed_metadata: Option<PhotoMetadata>,
    ) -> Result<Photo, GalleryError> {
        match self
            .prepare_upload(file, title, album_id, precomputed_metadata)
            .await
        {
            Ok((photo, chunk)) => {
                self.apply_created(photo.clone(), chunk);
                Ok(photo)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// The commit half of an upload: everything up to and including the
    /// remote persist, with no local mutation. Shared by single and batch
    /// uploads so a batch group can run three of these concurrently.
    async fn prepare_upload(
        &self,
        file: &UploadFile,
        title: &str,
        album_id: &str,
        precomputed_metadata: Option<PhotoMetadata>,
    ) -> Result<(Photo, ChunkRef), GalleryError> {
        // 1. Metadata: extraction never fails the upload.
        let mut metadata =
            precomputed_metadata.unwrap_or_else(|| extract_metadata(&file.bytes));

        // 2. Resolve a place name when GPS is present and none was supplied.
        if metadata.location_name.is_none() {
            if let (Some(coord), Some(geocoder)) =
                (metadata.gps_coordinate.as_ref(), self.geocoder.as_ref())
            {
                match geocoder.place_name(coord).await {
                    Ok(place) => metadata.location_name = place,
                    Err(err) => {
                        tracing::warn!("reverse geocoding failed (ignored): {}", err)
                    }
                }
            }
        }

        // 3. Ship the bytes. This is the first essential step.
        let url = self.media.upload(&file.file_name, file.bytes.clone()).await?;

        // 4. Pixel dimensions and aspect class.
        let (width, height) = decode_dimensions(&file.bytes);
        let aspect_ratio_class = AspectClass::from_dimensions(width, height);

        // 5. Build the record. Absent optionals are stripped at the wire.
        let photo = Photo {
            id: generate_id(),
            url,
            upload_date: Utc::now(),
            title: title.to_string(),
            album_id: album_id.to_string(),
            captured_at: metadata.captured_at,
            camera_make: metadata.camera_make,
            camera_model: metadata.camera_model,
            f_number: metadata.f_number,
            exposure_time_seconds: metadata.exposure_time_seconds,
            iso: metadata.iso,
            gps_coordinate: metadata.gps_coordinate,
            location_name: metadata.location_name,
            width,
            height,
            aspect_ratio_class,
        };

        // 6. Persist; the gateway reports which chunk took the record.
        let chunk = self.gateway.create_photo(&photo).await?;
        tracing::info!("uploaded photo {} ({})", photo.id, file.file_name);
        Ok((photo, chunk))
    }

    /// The apply half of an upload: optimistic insert at the front, no
    /// refetch.
    fn apply_created(&mut self, photo: Photo, chunk: ChunkRef) {
        self.locations.insert(photo.id.clone(), chunk);
        let mut photos = Vec::with_capacity(self.photos.len() + 1);
        photos.push(photo);
        photos.extend(self.photos.iter().cloned());
        self.photos = photos;
    }

    /// Upload many files in groups of [`BATCH_GROUP_SIZE`]: uploads within
    /// a group run concurrently, groups run sequentially. `on_progress`
    /// fires after each group with a monotonically increasing count.
    ///
    /// A failure anywhere fails the whole batch; groups that already
    /// completed stay uploaded. That partial state is accepted, not hidden.
    pub async fn batch_upload_photos<F>(
        &mut self,
        files: Vec<UploadFile>,
        album_id: &str,
        mut on_progress: F,
    ) -> Result<Vec<Photo>, GalleryError>
    where
        F: FnMut(usize, usize),
    {
        let total = files.len();
        let mut completed = 0usize;
        let mut uploaded = Vec::with_capacity(total);

        for group in files.chunks(BATCH_GROUP_SIZE) {
            let this: &Self = self;
            let prepared = try_join_all(group.iter().map(|file| async move {
                let title = file.default_title();
                this.prepare_upload(file, &title, album_id, None).await
            }))
            .await;

            let prepared = match prepared {
                Ok(prepared) => prepared,
                Err(err) => {
                    tracing::warn!(
                        "batch upload failed after {}/{} file(s): {}",
                        completed,
                        total,
                        err
                    );
                    return Err(self.record_failure(err));
                }
            };

            for (photo, chunk) in prepared {
                uploaded.push(photo.clone());
                self.apply_created(photo, chunk);
            }
            completed += group.len();
            on_progress(completed, total);
        }

        Ok(uploaded)
    }

    // ── Photo edit / delete ───────────────────────────────────────────────────

    /// Persist a partial edit to the photo's chunk, then merge it locally.
    /// The photo must already exist in local state. A new `album_id` is not
    /// validated against the album list; that is the caller's job.
    pub async fn update_photo_details(
        &mut self,
        photo_id: &str,
        edit: PhotoEdit,
    ) -> Result<(), GalleryError> {
        if !self.photos.iter().any(|p| p.id == photo_id) {
            return Err(self.record_failure(GalleryError::not_found(format!(
                "photo {}",
                photo_id
            ))));
        }
        let chunk = match self.chunk_of(photo_id) {
            Ok(chunk) => chunk,
            Err(err) => return Err(self.record_failure(err)),
        };

        let fields = edit.to_fields();
        if fields.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.gateway.update_photo(photo_id, &chunk, fields).await {
            return Err(self.record_failure(err));
        }

        self.photos = self
            .photos
            .iter()
            .cloned()
            .map(|mut photo| {
                if photo.id == photo_id {
                    if let Some(title) = &edit.title {
                        photo.title = title.clone();
                    }
                    if let Some(album_id) = &edit.album_id {
                        photo.album_id = album_id.clone();
                    }
                }
                photo
            })
            .collect();
        Ok(())
    }

    /// Delete a photo: best-effort deletion-log entry, remote chunk delete,
    /// then an authoritative refetch that doubles as the orphaned-album
    /// check. An album emptied by this deletion is removed as part of the
    /// same operation.
    pub async fn delete_photo_item(&mut self, photo_id: &str) -> Result<(), GalleryError> {
        let photo = match self.photos.iter().find(|p| p.id == photo_id) {
            Some(photo) => photo.clone(),
            None => {
                return Err(self.record_failure(GalleryError::not_found(format!(
                    "photo {}",
                    photo_id
                ))))
            }
        };
        let chunk = match self.chunk_of(photo_id) {
            Ok(chunk) => chunk,
            Err(err) => return Err(self.record_failure(err)),
        };

        // Best-effort: losing the cleanup record never blocks the deletion.
        let entry = DeletionLogEntry {
            photo_id: photo.id.clone(),
            url: photo.url.clone(),
            album_id: photo.album_id.clone(),
            deleted_at: Utc::now(),
        };
        if let Err(err) = self.gateway.append_deletion_log(&entry).await {
            tracing::warn!("deletion log write failed (ignored): {}", err);
        }

        if let Err(err) = self.gateway.delete_photo(photo_id, &chunk).await {
            return Err(self.record_failure(err));
        }

        // Orphan check against a fresh read, not the pre-delete in-memory
        // list: chunked storage can disagree with a stale local view.
        let mut snapshot = match self.gateway.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.record_failure(err)),
        };
        if !photo.album_id.is_empty() {
            let emptied = !snapshot
                .photos
                .iter()
                .any(|s| s.photo.album_id == photo.album_id);
            let still_listed = snapshot.albums.iter().any(|a| a.id == photo.album_id);
            if emptied && still_listed {
                if let Err(err) = self.gateway.delete_album(&photo.album_id).await {
                    return Err(self.record_failure(err));
                }
                snapshot.albums.retain(|a| a.id != photo.album_id);
                tracing::info!(
                    "album {} emptied by deleting photo {}; removed",
                    photo.album_id,
                    photo_id
                );
            }
        }
        self.install_snapshot(snapshot);
        Ok(())
    }

    // ── Albums ────────────────────────────────────────────────────────────────

    pub async fn create_album(
        &mut self,
        name: &str,
        description: &str,
        theme: &str,
    ) -> Result<Album, GalleryError> {
        if name.trim().is_empty() {
            return Err(self.record_failure(GalleryError::ValidationFailed(
                "album name must not be empty".into(),
            )));
        }
        let album = Album {
            id: generate_id(),
            name: name.to_string(),
            description: description.to_string(),
            theme: theme.to_string(),
            created_at: Utc::now(),
            cover_photo_id: None,
        };
        if let Err(err) = self.gateway.create_album(&album).await {
            return Err(self.record_failure(err));
        }

        let mut albums = self.albums.clone();
        albums.push(album.clone());
        self.albums = albums;
        Ok(album)
    }

    /// Apply a partial album edit. When the theme changes, every other
    /// album on `old_theme` is re-pointed to the new theme first (one
    /// remote update per affected album, issued concurrently and jointly
    /// awaited): a theme rename is a cascade, never a single-record edit.
    pub async fn update_album(
        &mut self,
        album_id: &str,
        edit: AlbumEdit,
        old_theme: Option<&str>,
    ) -> Result<(), GalleryError> {
        if !self.albums.iter().any(|a| a.id == album_id) {
            return Err(self.record_failure(GalleryError::not_found(format!(
                "album {}",
                album_id
            ))));
        }

        let mut renamed_ids: Vec<String> = Vec::new();
        if let (Some(new_theme), Some(old_theme)) = (edit.theme.as_deref(), old_theme) {
            if new_theme != old_theme {
                renamed_ids = self
                    .albums
                    .iter()
                    .filter(|a| a.id != album_id && a.theme == old_theme)
                    .map(|a| a.id.clone())
                    .collect();

                let gateway = &self.gateway;
                let fanout = try_join_all(renamed_ids.iter().map(|id| {
                    let mut fields = Fields::new();
                    fields.insert("theme".into(), json!(new_theme));
                    async move { gateway.update_album(id, fields).await }
                }))
                .await;
                if let Err(err) = fanout {
                    return Err(self.record_failure(err));
                }
                tracing::info!(
                    "theme rename: {} -> {} cascaded to {} album(s)",
                    old_theme,
                    new_theme,
                    renamed_ids.len()
                );
            }
        }

        let fields = edit.to_fields();
        if !fields.is_empty() {
            if let Err(err) = self.gateway.update_album(album_id, fields).await {
                return Err(self.record_failure(err));
            }
        }

        self.albums = self
            .albums
            .iter()
            .cloned()
            .map(|mut album| {
                if album.id == album_id {
                    if let Some(name) = &edit.name {
                        album.name = name.clone();
                    }
                    if let Some(description) = &edit.description {
                        album.description = description.clone();
                    }
                    if let Some(theme) = &edit.theme {
                        album.theme = theme.clone();
                    }
                    if let Some(cover) = &edit.cover_photo_id {
                        album.cover_photo_id = Some(cover.clone());
                    }
                } else if let Some(theme) = &edit.theme {
                    if renamed_ids.contains(&album.id) {
                        album.theme = theme.clone();
                    }
                }
                album
            })
            .collect();
        Ok(())
    }

    /// Delete an album: its photos are decoupled first (one batched
    /// reassignment to uncategorized) so the dangling-reference invariant
    /// holds, then the album record goes, then local state is patched.
    pub async fn delete_album_item(&mut self, album_id: &str) -> Result<(), GalleryError> {
        if !self.albums.iter().any(|a| a.id == album_id) {
            return Err(self.record_failure(GalleryError::not_found(format!(
                "album {}",
                album_id
            ))));
        }

        let pairs = self.location_pairs_for_album(album_id);
        if let Err(err) = self.gateway.bulk_reassign_album(&pairs, "").await {
            return Err(self.record_failure(err));
        }
        if let Err(err) = self.gateway.delete_album(album_id).await {
            return Err(self.record_failure(err));
        }

        self.albums = self
            .albums
            .iter()
            .filter(|a| a.id != album_id)
            .cloned()
            .collect();
        self.photos = self
            .photos
            .iter()
            .cloned()
            .map(|mut photo| {
                if photo.album_id == album_id {
                    photo.album_id = String::new();
                }
                photo
            })
            .collect();
        Ok(())
    }

    /// Move every photo of `source_album_id` to `target_album_id` as one
    /// bulk write, optionally delete the emptied source, then resynchronize
    /// with a full reload: the bulk write touches an unbounded number of
    /// chunks, so local patching cannot be trusted here.
    pub async fn transfer_album_photos(
        &mut self,
        source_album_id: &str,
        target_album_id: &str,
        delete_source_after: bool,
    ) -> Result<(), GalleryError> {
        let pairs = self.location_pairs_for_album(source_album_id);
        if let Err(err) = self
            .gateway
            .bulk_reassign_album(&pairs, target_album_id)
            .await
        {
            return Err(self.record_failure(err));
        }
        if delete_source_after {
            if let Err(err) = self.gateway.delete_album(source_album_id).await {
                return Err(self.record_failure(err));
            }
        }
        tracing::info!(
            "transferred {} photo(s) from album {} to {}",
            pairs.len(),
            source_album_id,
            target_album_id
        );
        self.load().await
    }

    /// (photo id, owning chunk) pairs for every photo in an album.
    fn location_pairs_for_album(&self, album_id: &str) -> Vec<(String, ChunkRef)> {
        self.photos
            .iter()
            .filter(|p| p.album_id == album_id)
            .filter_map(|p| {
                self.locations
                    .get(&p.id)
                    .map(|chunk| (p.id.clone(), chunk.clone()))
            })
            .collect()
    }
}

fn decode_dimensions(bytes: &[u8]) -> (Option<u32>, Option<u32>) {
    match image::load_from_memory(bytes) {
        Ok(decoded) => (Some(decoded.width()), Some(decoded.height())),
        Err(err) => {
            tracing::warn!("could not decode uploaded image (ignored): {}", err);
            (None, None)
        }
    }
}
