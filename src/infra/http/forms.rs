//! Multipart plaque form parsing.

use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::application::error::HttpError;
use crate::application::moderation::{ImageUpload, PlaqueFields};

const SOURCE: &str = "infra::http::forms";

/// Fields of a submit or edit form, plus the rotation only edits use.
#[derive(Debug, Default)]
pub(super) struct PlaqueForm {
    pub(super) fields: PlaqueFields,
    pub(super) img_rot: i32,
}

pub(super) async fn read_plaque_form(multipart: &mut Multipart) -> Result<PlaqueForm, HttpError> {
    let mut form = PlaqueForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        HttpError::new(
            SOURCE,
            err.status(),
            "Invalid form data",
            err.body_text(),
        )
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "plaque_image_file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| {
                    mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string()
                });
            let bytes = field.bytes().await.map_err(|err| {
                HttpError::new(SOURCE, err.status(), "Failed to read image", err.body_text())
            })?;
            if !bytes.is_empty() {
                form.fields.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(|err| {
            HttpError::new(SOURCE, err.status(), "Invalid form data", err.body_text())
        })?;
        match name.as_str() {
            "title" => form.fields.title = value,
            "description" => form.fields.description = value,
            "lat" => form.fields.lat = non_blank(value),
            "lng" => form.fields.lng = non_blank(value),
            "tags" => form.fields.tags = value,
            "old_site_id" => form.fields.old_site_id = non_blank(value),
            "img_rot" if !value.trim().is_empty() => {
                form.img_rot = value.trim().parse().map_err(|_| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Invalid rotation",
                        format!("`{value}` is not an integer rotation"),
                    )
                })?;
            }
            _ => {}
        }
    }

    Ok(form)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
