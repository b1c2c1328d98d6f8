//! In-memory repositories and collaborators for driving the services
//! without Postgres.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use plaqueboard::application::collaborators::{
    BlobStore, CollaboratorError, Notifier, SearchDocument, SearchIndex, SearchQuery, StoredBlob,
};
use plaqueboard::application::diagnostics::DiagnosticsService;
use plaqueboard::application::export::ExportService;
use plaqueboard::application::moderation::{
    Actor, ImageUpload, ModerationDeps, ModerationOptions, ModerationService, PlaqueFields,
    SubmitPlaqueCommand,
};
use plaqueboard::application::pagination::{CursorPage, PageRequest, PlaqueCursor};
use plaqueboard::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePlaqueParams, DeletedPlaque, FeaturedRepo,
    PlaqueQueryFilter, PlaqueScope, PlaquesRepo, PlaquesWriteRepo, RepoError, UpdatePlaqueParams,
};
use plaqueboard::application::selection::{SelectionOptions, SelectionService};
use plaqueboard::application::syndication::{FeedOptions, SyndicationService};
use plaqueboard::cache::{CacheConfig, DerivedCache};
use plaqueboard::domain::entities::{CommentRecord, FeaturedPlaqueRecord, GeoPoint, PlaqueRecord};
use plaqueboard::domain::plaques::next_write_timestamp;

pub const PLAQUESET: &str = "public";

fn newest_first(plaques: &mut [PlaqueRecord]) {
    plaques.sort_by(|a, b| (b.created_on, b.id).cmp(&(a.created_on, a.id)));
}

fn oldest_first(plaques: &mut [PlaqueRecord]) {
    plaques.sort_by(|a, b| (a.created_on, a.id).cmp(&(b.created_on, b.id)));
}

#[derive(Default)]
pub struct MemoryStore {
    pub plaques: Mutex<Vec<PlaqueRecord>>,
    pub comments: Mutex<Vec<CommentRecord>>,
    pub featured: Mutex<Vec<FeaturedPlaqueRecord>>,
    /// Makes every plaque write fail as if the transaction aborted.
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    fn check_writable(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("transaction aborted"));
        }
        Ok(())
    }

    async fn filtered(&self, keep: impl Fn(&PlaqueRecord) -> bool) -> Vec<PlaqueRecord> {
        self.plaques
            .lock()
            .await
            .iter()
            .filter(|plaque| keep(plaque))
            .cloned()
            .collect()
    }

    /// Insert a record as-is, bypassing the write path.
    pub async fn seed(&self, plaque: PlaqueRecord) {
        self.plaques.lock().await.push(plaque);
    }
}

#[async_trait]
impl PlaquesRepo for MemoryStore {
    async fn list_plaques(
        &self,
        scope: PlaqueScope,
        filter: &PlaqueQueryFilter,
        page: PageRequest<PlaqueCursor>,
    ) -> Result<CursorPage<PlaqueRecord>, RepoError> {
        let limit = page.limit.clamp(1, 100) as usize;
        let mut rows = self
            .filtered(|plaque| {
                (plaque.approved || scope.includes_pending())
                    && filter
                        .tag
                        .as_ref()
                        .is_none_or(|tag| plaque.tags.contains(tag))
                    && page
                        .cursor
                        .as_ref()
                        .is_none_or(|cursor| cursor.precedes(plaque.created_on, plaque.id))
            })
            .await;
        newest_first(&mut rows);
        rows.truncate(limit + 1);

        let has_more = rows.len() > limit;
        if has_more {
            rows.pop();
        }
        let next_cursor = match rows.last() {
            Some(last) if has_more => Some(PlaqueCursor::new(last.created_on, last.id).encode()),
            _ => None,
        };
        Ok(CursorPage::new(rows, next_cursor))
    }

    async fn count_plaques(&self, scope: PlaqueScope) -> Result<u64, RepoError> {
        Ok(self
            .filtered(|plaque| plaque.approved || scope.includes_pending())
            .await
            .len() as u64)
    }

    async fn count_pending(&self) -> Result<u64, RepoError> {
        Ok(self.filtered(|plaque| !plaque.approved).await.len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlaqueRecord>, RepoError> {
        Ok(self.filtered(|plaque| plaque.id == id).await.pop())
    }

    async fn find_by_title_url(&self, title_url: &str) -> Result<Option<PlaqueRecord>, RepoError> {
        Ok(self
            .filtered(|plaque| plaque.title_url.as_deref() == Some(title_url))
            .await
            .pop())
    }

    async fn find_by_old_site_id(
        &self,
        old_site_id: i64,
    ) -> Result<Option<PlaqueRecord>, RepoError> {
        Ok(self
            .filtered(|plaque| plaque.old_site_id == Some(old_site_id))
            .await
            .pop())
    }

    async fn find_by_comment(&self, comment_id: Uuid) -> Result<Option<PlaqueRecord>, RepoError> {
        let owner = self
            .comments
            .lock()
            .await
            .iter()
            .find(|comment| comment.id == comment_id)
            .map(|comment| comment.plaque_id);
        match owner {
            Some(plaque_id) => self.find_by_id(plaque_id).await,
            None => Ok(None),
        }
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PlaqueRecord>, RepoError> {
        Ok(self.filtered(|plaque| ids.contains(&plaque.id)).await)
    }

    async fn approved_time_bounds(
        &self,
    ) -> Result<Option<(OffsetDateTime, OffsetDateTime)>, RepoError> {
        let approved = self.filtered(|plaque| plaque.approved).await;
        let earliest = approved.iter().map(|plaque| plaque.created_on).min();
        let latest = approved.iter().map(|plaque| plaque.created_on).max();
        Ok(earliest.zip(latest))
    }

    async fn first_approved_after(
        &self,
        instant: OffsetDateTime,
    ) -> Result<Option<PlaqueRecord>, RepoError> {
        let mut rows = self
            .filtered(|plaque| plaque.approved && plaque.created_on > instant)
            .await;
        oldest_first(&mut rows);
        Ok(rows.into_iter().next())
    }

    async fn earliest_approved(&self) -> Result<Option<PlaqueRecord>, RepoError> {
        let mut rows = self.filtered(|plaque| plaque.approved).await;
        oldest_first(&mut rows);
        Ok(rows.into_iter().next())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut rows = self.filtered(|plaque| !plaque.approved).await;
        oldest_first(&mut rows);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_approved_block(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut rows = self.filtered(|plaque| plaque.approved).await;
        newest_first(&mut rows);
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_approved_created_after(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut rows = self
            .filtered(|plaque| plaque.approved && plaque.created_on > since)
            .await;
        newest_first(&mut rows);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_all_block(&self, offset: u64, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut rows = self.filtered(|_| true).await;
        oldest_first(&mut rows);
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_missing_title_url(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut rows = self.filtered(|plaque| plaque.title_url.is_none()).await;
        oldest_first(&mut rows);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_pics(&self) -> Result<Vec<String>, RepoError> {
        Ok(self
            .filtered(|plaque| plaque.pic.is_some())
            .await
            .into_iter()
            .filter_map(|plaque| plaque.pic)
            .collect())
    }

    async fn title_url_taken(
        &self,
        title_url: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        Ok(!self
            .filtered(|plaque| {
                plaque.title_url.as_deref() == Some(title_url) && Some(plaque.id) != exclude
            })
            .await
            .is_empty())
    }
}

/// Same rule as the Postgres store, applied while the plaque list is locked.
fn approval_timestamp(plaques: &[PlaqueRecord], now: OffsetDateTime) -> OffsetDateTime {
    let latest = plaques
        .iter()
        .filter(|plaque| plaque.approved)
        .map(|plaque| plaque.created_on)
        .max();
    next_write_timestamp(now, latest)
}

#[async_trait]
impl PlaquesWriteRepo for MemoryStore {
    async fn create_plaque(&self, params: CreatePlaqueParams) -> Result<PlaqueRecord, RepoError> {
        self.check_writable()?;
        let mut plaques = self.plaques.lock().await;
        if plaques
            .iter()
            .any(|plaque| plaque.title_url.as_deref() == Some(params.title_url.as_str()))
        {
            return Err(RepoError::Duplicate {
                constraint: "plaques_title_url_key".to_string(),
            });
        }

        let created_on = if params.approved {
            approval_timestamp(&plaques, params.created_on)
        } else {
            params.created_on
        };
        let record = PlaqueRecord {
            id: params.id,
            plaqueset: PLAQUESET.to_string(),
            title_url: Some(params.title_url),
            old_site_id: params.old_site_id,
            title: params.title,
            description: params.description,
            location: params.location,
            tags: params.tags,
            pic: params.pic,
            img_url: params.img_url,
            img_rot: 0,
            approved: params.approved,
            created_on,
            updated_on: Some(created_on),
            created_by: params.created_by.clone(),
            updated_by: params.created_by,
        };
        plaques.push(record.clone());
        Ok(record)
    }

    async fn update_plaque(&self, params: UpdatePlaqueParams) -> Result<PlaqueRecord, RepoError> {
        self.check_writable()?;
        let mut plaques = self.plaques.lock().await;
        if let Some(title_url) = params.title_url.as_deref()
            && plaques.iter().any(|plaque| {
                plaque.id != params.id && plaque.title_url.as_deref() == Some(title_url)
            })
        {
            return Err(RepoError::Duplicate {
                constraint: "plaques_title_url_key".to_string(),
            });
        }
        let plaque = plaques
            .iter_mut()
            .find(|plaque| plaque.id == params.id)
            .ok_or(RepoError::NotFound)?;

        if let Some(title_url) = params.title_url {
            plaque.title_url = Some(title_url);
        }
        plaque.title = params.title;
        plaque.description = params.description;
        plaque.location = params.location;
        plaque.tags = params.tags;
        if let Some(image) = params.image {
            plaque.pic = Some(image.pic);
            plaque.img_url = Some(image.img_url);
        }
        if let Some(img_rot) = params.img_rot {
            plaque.img_rot = img_rot;
        }
        plaque.old_site_id = params.old_site_id;
        plaque.updated_on = Some(params.updated_on);
        plaque.updated_by = params.updated_by;
        Ok(plaque.clone())
    }

    async fn set_approval(
        &self,
        id: Uuid,
        approved: bool,
        now: OffsetDateTime,
    ) -> Result<PlaqueRecord, RepoError> {
        self.check_writable()?;
        let mut plaques = self.plaques.lock().await;
        let at = approval_timestamp(&plaques, now);
        let plaque = plaques
            .iter_mut()
            .find(|plaque| plaque.id == id)
            .ok_or(RepoError::NotFound)?;
        plaque.approved = approved;
        if approved {
            plaque.created_on = at;
        }
        Ok(plaque.clone())
    }

    async fn approve_pending(
        &self,
        limit: u32,
        now: OffsetDateTime,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        self.check_writable()?;
        let mut pending = self.list_pending(limit).await?;
        let ids: Vec<Uuid> = pending.iter().map(|plaque| plaque.id).collect();

        let mut plaques = self.plaques.lock().await;
        let at = approval_timestamp(&plaques, now);
        for plaque in plaques.iter_mut().filter(|plaque| ids.contains(&plaque.id)) {
            plaque.approved = true;
            plaque.created_on = at;
        }
        for plaque in &mut pending {
            plaque.approved = true;
            plaque.created_on = at;
        }
        Ok(pending)
    }

    async fn delete_plaque(&self, id: Uuid) -> Result<DeletedPlaque, RepoError> {
        self.check_writable()?;
        let mut plaques = self.plaques.lock().await;
        let position = plaques
            .iter()
            .position(|plaque| plaque.id == id)
            .ok_or(RepoError::NotFound)?;

        let mut comments = self.comments.lock().await;
        let before = comments.len();
        comments.retain(|comment| comment.plaque_id != id);
        let comments_removed = (before - comments.len()) as u64;

        Ok(DeletedPlaque {
            plaque: plaques.remove(position),
            comments_removed,
        })
    }

    async fn backfill_updated_on(&self) -> Result<u64, RepoError> {
        let mut plaques = self.plaques.lock().await;
        let mut touched = 0;
        for plaque in plaques.iter_mut().filter(|plaque| plaque.updated_on.is_none()) {
            plaque.updated_on = Some(plaque.created_on);
            touched += 1;
        }
        Ok(touched)
    }

    async fn set_title_url(&self, id: Uuid, title_url: &str) -> Result<(), RepoError> {
        let mut plaques = self.plaques.lock().await;
        let plaque = plaques
            .iter_mut()
            .find(|plaque| plaque.id == id)
            .ok_or(RepoError::NotFound)?;
        plaque.title_url = Some(title_url.to_string());
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn add_comment(&self, params: CreateCommentParams) -> Result<CommentRecord, RepoError> {
        if self.find_by_id(params.plaque_id).await?.is_none() {
            return Err(RepoError::NotFound);
        }
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            plaque_id: params.plaque_id,
            text: params.text,
            approved: params.approved,
            created_on: params.created_on,
            created_by: params.created_by,
        };
        self.comments.lock().await.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_plaque(&self, plaque_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| comment.plaque_id == plaque_id)
            .cloned()
            .collect())
    }

    async fn latest_approved(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError> {
        let approved_plaques: Vec<Uuid> = self
            .filtered(|plaque| plaque.approved)
            .await
            .into_iter()
            .map(|plaque| plaque.id)
            .collect();
        let mut comments: Vec<CommentRecord> = self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| comment.approved && approved_plaques.contains(&comment.plaque_id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        comments.truncate(limit as usize);
        Ok(comments)
    }

    async fn count_comments(&self) -> Result<u64, RepoError> {
        Ok(self.comments.lock().await.len() as u64)
    }
}

#[async_trait]
impl FeaturedRepo for MemoryStore {
    async fn append_featured(
        &self,
        plaque_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<FeaturedPlaqueRecord, RepoError> {
        let record = FeaturedPlaqueRecord {
            id: Uuid::new_v4(),
            plaque_id,
            created_on: at,
        };
        self.featured.lock().await.push(record.clone());
        Ok(record)
    }

    async fn latest_featured(&self) -> Result<Option<FeaturedPlaqueRecord>, RepoError> {
        Ok(self.featured.lock().await.last().cloned())
    }
}

#[derive(Default)]
pub struct MemorySearch {
    pub documents: Mutex<Vec<SearchDocument>>,
    pub unavailable: AtomicBool,
}

impl MemorySearch {
    fn check_available(&self) -> Result<(), CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Search("index offline".to_string()));
        }
        Ok(())
    }

    pub async fn contains(&self, doc_id: Uuid) -> bool {
        self.documents
            .lock()
            .await
            .iter()
            .any(|document| document.doc_id == doc_id)
    }
}

#[async_trait]
impl SearchIndex for MemorySearch {
    async fn put(&self, document: SearchDocument) -> Result<(), CollaboratorError> {
        self.check_available()?;
        let mut documents = self.documents.lock().await;
        documents.retain(|existing| existing.doc_id != document.doc_id);
        documents.push(document);
        Ok(())
    }

    async fn delete(&self, doc_id: Uuid) -> Result<(), CollaboratorError> {
        self.check_available()?;
        self.documents
            .lock()
            .await
            .retain(|document| document.doc_id != doc_id);
        Ok(())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Uuid>, CollaboratorError> {
        self.check_available()?;
        let query = SearchQuery::parse(query)?;
        let documents = self.documents.lock().await;

        let ids = match query {
            SearchQuery::Phrase(phrase) => {
                let phrase = phrase.to_lowercase();
                documents
                    .iter()
                    .filter(|document| {
                        document.title.to_lowercase().contains(&phrase)
                            || document.description.to_lowercase().contains(&phrase)
                            || document.tags.iter().any(|tag| tag.contains(&phrase))
                    })
                    .map(|document| document.doc_id)
                    .collect::<Vec<_>>()
            }
            SearchQuery::Within {
                center,
                radius_meters,
            } => {
                let mut hits: Vec<(f64, Uuid)> = documents
                    .iter()
                    .map(|document| (center.distance_meters(&document.location), document.doc_id))
                    .filter(|(distance, _)| *distance < radius_meters)
                    .collect();
                hits.sort_by(|a, b| a.0.total_cmp(&b.0));
                hits.into_iter().map(|(_, id)| id).collect()
            }
        };
        Ok(ids.into_iter().take(limit as usize).collect())
    }

    async fn clear(&self) -> Result<u64, CollaboratorError> {
        self.check_available()?;
        let mut documents = self.documents.lock().await;
        let cleared = documents.len() as u64;
        documents.clear();
        Ok(cleared)
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    pub blobs: Mutex<BTreeMap<String, Bytes>>,
    pub fail_deletes: AtomicBool,
}

impl MemoryBlobs {
    pub async fn paths(&self) -> Vec<String> {
        self.blobs.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn write(
        &self,
        path: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<StoredBlob, CollaboratorError> {
        let size_bytes = bytes.len() as u64;
        self.blobs.lock().await.insert(path.to_string(), bytes);
        Ok(StoredBlob {
            path: path.to_string(),
            url: format!("/images/{path}"),
            checksum: String::new(),
            size_bytes,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), CollaboratorError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Blob("bucket offline".to_string()));
        }
        self.blobs.lock().await.remove(path);
        Ok(())
    }

    async fn list_paths(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.paths().await)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), CollaboratorError> {
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Services wired over one shared in-memory store.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub search: Arc<MemorySearch>,
    pub blobs: Arc<MemoryBlobs>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: DerivedCache,
    pub selection: SelectionService,
    pub moderation: ModerationService,
    pub export: ExportService,
    pub syndication: SyndicationService,
    pub diagnostics: DiagnosticsService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache(CacheConfig::default())
    }

    pub fn with_cache(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let search = Arc::new(MemorySearch::default());
        let blobs = Arc::new(MemoryBlobs::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let cache = DerivedCache::new(config);

        let selection = SelectionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            search.clone(),
            cache.clone(),
            SelectionOptions::default(),
        );
        let moderation = ModerationService::new(
            ModerationDeps {
                reader: store.clone(),
                writer: store.clone(),
                comments: store.clone(),
                featured: store.clone(),
                search: search.clone(),
                blobs: blobs.clone(),
                notifier: notifier.clone(),
                cache: cache.trigger(),
            },
            ModerationOptions {
                admin_recipient: Some("moderators@example.org".to_string()),
                public_base_url: "https://plaques.example.org/".to_string(),
            },
        );
        let export = ExportService::new(store.clone(), cache.clone());
        let syndication = SyndicationService::new(
            store.clone(),
            cache.clone(),
            FeedOptions {
                site_title: "Plaques".to_string(),
                public_base_url: "https://plaques.example.org/".to_string(),
                feed_size: 10,
            },
        );
        let diagnostics = DiagnosticsService::new(store.clone(), store.clone(), blobs.clone());

        Self {
            store,
            search,
            blobs,
            notifier,
            cache,
            selection,
            moderation,
            export,
            syndication,
            diagnostics,
        }
    }

    /// Submit a plaque as `actor` with a small image attached.
    pub async fn submit(&self, actor: &Actor, title: &str, tags: &str) -> PlaqueRecord {
        self.moderation
            .submit(actor, SubmitPlaqueCommand {
                fields: fields(title, "51.5074", "-0.1278", tags),
            })
            .await
            .expect("submit plaque")
    }
}

pub fn fields(title: &str, lat: &str, lng: &str, tags: &str) -> PlaqueFields {
    PlaqueFields {
        title: title.to_string(),
        description: format!("{title} was here"),
        lat: Some(lat.to_string()),
        lng: Some(lng.to_string()),
        tags: tags.to_string(),
        old_site_id: None,
        image: Some(image("front.jpg")),
    }
}

pub fn image(file_name: &str) -> ImageUpload {
    ImageUpload {
        file_name: file_name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: Bytes::from_static(b"\xff\xd8\xff\xe0 plaque"),
    }
}

/// A stored plaque with every optional field filled, ready for [`MemoryStore::seed`].
pub fn stored_plaque(
    title: &str,
    approved: bool,
    created_on: OffsetDateTime,
    location: GeoPoint,
    tags: &[&str],
) -> PlaqueRecord {
    let id = Uuid::new_v4();
    PlaqueRecord {
        id,
        plaqueset: PLAQUESET.to_string(),
        title_url: Some(title.to_lowercase().replace(' ', "-")),
        old_site_id: None,
        title: title.to_string(),
        description: format!("{title} was here"),
        location,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        pic: Some(format!("seed/{id}.jpg")),
        img_url: Some(format!("/images/seed/{id}.jpg")),
        img_rot: 0,
        approved,
        created_on,
        updated_on: Some(created_on),
        created_by: None,
        updated_by: None,
    }
}

/// Index a seeded plaque the way a write would.
pub async fn index(search: &MemorySearch, plaque: &PlaqueRecord) {
    search
        .put(SearchDocument::from(plaque))
        .await
        .expect("index seeded plaque");
}
