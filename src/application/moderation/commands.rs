use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::collaborators::StoredBlob;
use crate::application::repos::{
    CreateCommentParams, CreatePlaqueParams, DeletedPlaque, PlaqueImage, UpdatePlaqueParams,
};
use crate::domain::entities::{CommentRecord, GeoPoint, PlaqueRecord};
use crate::domain::error::DomainError;
use crate::domain::plaques::{
    image_blob_path, next_write_timestamp, normalize_tags, parse_old_site_id, truncate_title,
};
use crate::domain::slug::{SlugAsyncError, SlugError, unique_title_url};

use super::service::ModerationService;
use super::types::{
    APPROVE_ALL_LIMIT, Actor, AddCommentCommand, EditPlaqueCommand, ImageUpload,
    ModerationError, PlaqueFields, SubmitPlaqueCommand,
};

/// Validated content shared by submit and edit.
struct PlaqueContent {
    title: String,
    description: String,
    location: GeoPoint,
    tags: Vec<String>,
    old_site_id: Option<i64>,
}

impl PlaqueContent {
    fn from_fields(fields: &PlaqueFields) -> Result<Self, DomainError> {
        let location = GeoPoint::parse(fields.lat.as_deref(), fields.lng.as_deref())?;

        let title = truncate_title(&fields.title);
        if title.is_empty() {
            return Err(DomainError::validation("title is required"));
        }

        let old_site_id = parse_old_site_id(fields.old_site_id.as_deref());
        if let Some(raw) = fields.old_site_id.as_deref().map(str::trim)
            && !raw.is_empty()
            && old_site_id.is_none()
        {
            warn!(
                target: "plaqueboard::moderation",
                old_site_id = raw,
                "Ignoring malformed legacy site id"
            );
        }

        Ok(Self {
            title,
            description: fields.description.trim().to_string(),
            location,
            tags: normalize_tags(&fields.tags),
            old_site_id,
        })
    }
}

impl ModerationService {
    /// Create a plaque. Anonymous submissions start pending, admin ones approved.
    pub async fn submit(
        &self,
        actor: &Actor,
        command: SubmitPlaqueCommand,
    ) -> Result<PlaqueRecord, ModerationError> {
        let content = PlaqueContent::from_fields(&command.fields)?;
        let image = command
            .fields
            .image
            .filter(|image| !image.bytes.is_empty())
            .ok_or(DomainError::MissingImage)?;

        let id = Uuid::new_v4();
        let title_url = self.title_url_or_fallback(&content.title, id, None).await?;
        let approved = actor.is_admin();
        let created_on = next_write_timestamp(OffsetDateTime::now_utc(), None);

        let stored = self.store_image(created_on, image).await?;

        let params = CreatePlaqueParams {
            id,
            title_url,
            old_site_id: content.old_site_id,
            title: content.title,
            description: content.description,
            location: content.location,
            tags: content.tags,
            pic: Some(stored.path.clone()),
            img_url: Some(stored.url.clone()),
            approved,
            created_on,
            created_by: actor.identity.clone(),
        };

        let plaque = match self.writer.create_plaque(params).await {
            Ok(plaque) => plaque,
            Err(err) => {
                self.discard_blob(&stored.path).await;
                return Err(err.into());
            }
        };

        info!(
            target: "plaqueboard::moderation",
            plaque_id = %plaque.id,
            approved = plaque.approved,
            submitted_by = actor.name(),
            "Plaque submitted"
        );

        self.cache.plaque_submitted(plaque.id).await;
        self.index_plaque(&plaque).await;
        if !plaque.approved {
            let body = format!("{}\n\n{}", plaque.title, self.plaque_link(&plaque));
            self.notify_admin("New plaque submitted", &body).await;
        }

        Ok(plaque)
    }

    /// Replace a plaque's content. The approval state is untouched.
    pub async fn edit(
        &self,
        actor: &Actor,
        command: EditPlaqueCommand,
    ) -> Result<PlaqueRecord, ModerationError> {
        let EditPlaqueCommand {
            id,
            fields,
            img_rot,
        } = command;

        let current = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(ModerationError::NotFound { id })?;
        let content = PlaqueContent::from_fields(&fields)?;
        let title_url = if content.title != current.title || current.title_url.is_none() {
            Some(
                self.title_url_or_fallback(&content.title, id, Some(id))
                    .await?,
            )
        } else {
            None
        };

        let now = OffsetDateTime::now_utc();
        let stored = match fields.image.filter(|image| !image.bytes.is_empty()) {
            Some(image) => Some(self.store_image(now, image).await?),
            None => None,
        };

        let params = UpdatePlaqueParams {
            id,
            title_url,
            title: content.title,
            description: content.description,
            location: content.location,
            tags: content.tags,
            image: stored.as_ref().map(|blob| PlaqueImage {
                pic: blob.path.clone(),
                img_url: blob.url.clone(),
            }),
            img_rot: (img_rot != 0).then_some(img_rot),
            old_site_id: content.old_site_id,
            updated_on: next_write_timestamp(now, current.updated_on),
            updated_by: actor.identity.clone(),
        };

        let plaque = match self.writer.update_plaque(params).await {
            Ok(plaque) => plaque,
            Err(err) => {
                if let Some(blob) = stored.as_ref() {
                    self.discard_blob(&blob.path).await;
                }
                return Err(ModerationError::for_plaque(id)(err));
            }
        };

        info!(
            target: "plaqueboard::moderation",
            plaque_id = %plaque.id,
            edited_by = actor.name(),
            new_image = stored.is_some(),
            "Plaque edited"
        );

        self.cache.plaque_edited(plaque.id).await;
        self.index_plaque(&plaque).await;
        Ok(plaque)
    }

    /// Approve a plaque, resetting `created_on` so it sorts first.
    pub async fn approve(&self, id: Uuid) -> Result<PlaqueRecord, ModerationError> {
        let plaque = self
            .writer
            .set_approval(id, true, OffsetDateTime::now_utc())
            .await
            .map_err(ModerationError::for_plaque(id))?;

        info!(target: "plaqueboard::moderation", plaque_id = %id, "Plaque approved");
        self.cache.plaque_approved(id).await;
        self.index_plaque(&plaque).await;
        Ok(plaque)
    }

    pub async fn disapprove(&self, id: Uuid) -> Result<PlaqueRecord, ModerationError> {
        let plaque = self
            .writer
            .set_approval(id, false, OffsetDateTime::now_utc())
            .await
            .map_err(ModerationError::for_plaque(id))?;

        info!(target: "plaqueboard::moderation", plaque_id = %id, "Plaque disapproved");
        self.cache.plaque_disapproved(id).await;
        self.index_plaque(&plaque).await;
        Ok(plaque)
    }

    /// Remove a plaque and its comments, then clean up its image and search
    /// document on a best-effort basis.
    pub async fn delete(&self, id: Uuid) -> Result<DeletedPlaque, ModerationError> {
        let deleted = self
            .writer
            .delete_plaque(id)
            .await
            .map_err(ModerationError::for_plaque(id))?;

        info!(
            target: "plaqueboard::moderation",
            plaque_id = %id,
            comments_removed = deleted.comments_removed,
            "Plaque deleted"
        );

        self.cache.plaque_deleted(id).await;
        if let Some(pic) = deleted.plaque.pic.as_deref() {
            self.discard_blob(pic).await;
        }
        self.unindex_plaque(id).await;
        Ok(deleted)
    }

    /// Append a featuring event for the plaque.
    pub async fn feature(&self, id: Uuid) -> Result<PlaqueRecord, ModerationError> {
        let plaque = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(ModerationError::NotFound { id })?;

        self.featured
            .append_featured(id, OffsetDateTime::now_utc())
            .await
            .map_err(ModerationError::for_plaque(id))?;

        info!(target: "plaqueboard::moderation", plaque_id = %id, "Plaque featured");
        self.cache.plaque_featured(id).await;
        Ok(plaque)
    }

    /// Approve up to [`APPROVE_ALL_LIMIT`] pending plaques, oldest first.
    pub async fn approve_all_pending(&self) -> Result<Vec<PlaqueRecord>, ModerationError> {
        let approved = self
            .writer
            .approve_pending(APPROVE_ALL_LIMIT, OffsetDateTime::now_utc())
            .await?;

        info!(
            target: "plaqueboard::moderation",
            approved = approved.len(),
            "Approved pending plaques"
        );

        if approved.is_empty() {
            return Ok(approved);
        }

        self.cache.pending_approved(approved.len()).await;
        for plaque in &approved {
            self.index_plaque(plaque).await;
        }
        Ok(approved)
    }

    /// Attach a comment. Admin comments are approved immediately.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        command: AddCommentCommand,
    ) -> Result<CommentRecord, ModerationError> {
        let text = command.text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("comment text is required").into());
        }

        let plaque_id = command.plaque_id;
        let plaque = self
            .reader
            .find_by_id(plaque_id)
            .await?
            .filter(|plaque| plaque.is_visible_to(actor.role))
            .ok_or(ModerationError::NotFound { id: plaque_id })?;

        let comment = self
            .comments
            .add_comment(CreateCommentParams {
                plaque_id,
                text: text.to_string(),
                approved: actor.is_admin(),
                created_on: next_write_timestamp(OffsetDateTime::now_utc(), None),
                created_by: actor.identity.clone(),
            })
            .await
            .map_err(ModerationError::for_plaque(plaque_id))?;

        info!(
            target: "plaqueboard::moderation",
            plaque_id = %plaque_id,
            comment_id = %comment.id,
            "Comment added"
        );

        self.cache.comment_added(plaque_id).await;
        if !actor.is_admin() {
            let body = format!("{}\n\n{}", comment.text, self.plaque_link(&plaque));
            self.notify_admin("New comment", &body).await;
        }
        Ok(comment)
    }

    /// A unique `title_url` for `title`, ignoring the plaque being renamed.
    pub(crate) async fn assign_title_url(
        &self,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<String, ModerationError> {
        let reader = &self.reader;
        unique_title_url(title, |candidate| {
            let candidate = candidate.to_string();
            async move {
                reader
                    .title_url_taken(&candidate, exclude)
                    .await
                    .map(|taken| !taken)
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => ModerationError::TitleUrl(err),
            SlugAsyncError::Predicate(err) => ModerationError::Repo(err),
        })
    }

    /// A `title_url` that never rejects a usable title: with no URL form, or
    /// with every suffix taken, the plaque id stands in.
    pub(crate) async fn title_url_or_fallback(
        &self,
        title: &str,
        id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<String, ModerationError> {
        match self.assign_title_url(title, exclude).await {
            Err(ModerationError::TitleUrl(err)) => {
                let fallback = match &err {
                    SlugError::Exhausted { base } => format!("{base}-{}", id.simple()),
                    SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
                        format!("plaque-{}", id.simple())
                    }
                };
                debug!(
                    target: "plaqueboard::moderation",
                    plaque_id = %id,
                    error = %err,
                    title_url = %fallback,
                    "Falling back to an id based title url"
                );
                Ok(fallback)
            }
            other => other,
        }
    }

    async fn store_image(
        &self,
        at: OffsetDateTime,
        image: ImageUpload,
    ) -> Result<StoredBlob, ModerationError> {
        let path = image_blob_path(at, Uuid::new_v4(), &image.file_name)?;
        let stored = self
            .blobs
            .write(&path, image.bytes, &image.content_type)
            .await?;
        Ok(stored)
    }
}
