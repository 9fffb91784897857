use std::collections::HashMap;

use axum::extract::Multipart;

use super::repo_types::{Category, PetAttributes};
use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::images::services::{ext_from_mime, UploadItem};

const REQUIRED: &str = "This field is required.";
const MAX_NAME_LEN: usize = 100;
const MAX_BREED_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

/// Raw pet form as submitted: text fields plus an optional image file.
#[derive(Debug, Default)]
pub struct PetForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadItem>,
}

impl PetForm {
    pub async fn from_multipart(mut mp: Multipart) -> AppResult<Self> {
        let mut form = PetForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::field("form", e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::field("image", e.to_string()))?;
                // An empty file input means "keep the current image".
                if !body.is_empty() {
                    form.image = Some(UploadItem { body, content_type });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::field(&name, e.to_string()))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn text(&self, key: &str) -> &str {
        self.fields.get(key).map(|s| s.trim()).unwrap_or_default()
    }

    /// Checks every field and reports all failures at once.
    pub fn validate(self, image_required: bool) -> AppResult<(PetAttributes, Option<UploadItem>)> {
        let mut errors = FieldErrors::new();
        let mut fail = |field: &str, msg: String| {
            errors.entry(field.to_string()).or_default().push(msg);
        };

        let name = self.text("name").to_string();
        if name.is_empty() {
            fail("name", REQUIRED.into());
        } else if name.chars().count() > MAX_NAME_LEN {
            fail("name", format!("Ensure this value has at most {} characters.", MAX_NAME_LEN));
        }

        let category = match self.text("category") {
            "" => {
                fail("category", REQUIRED.into());
                None
            }
            raw => match raw.parse::<Category>() {
                Ok(c) => Some(c),
                Err(_) => {
                    fail(
                        "category",
                        format!("Select a valid choice. {} is not one of the available choices.", raw),
                    );
                    None
                }
            },
        };

        let age = match self.text("age") {
            "" => {
                fail("age", REQUIRED.into());
                None
            }
            raw => match raw.parse::<i64>() {
                Ok(a) if a < 0 => {
                    fail("age", "Ensure this value is greater than or equal to 0.".into());
                    None
                }
                Ok(a) => Some(a),
                Err(_) => {
                    fail("age", "Enter a whole number.".into());
                    None
                }
            },
        };

        let breed = self.text("breed").to_string();
        if breed.is_empty() {
            fail("breed", REQUIRED.into());
        } else if breed.chars().count() > MAX_BREED_LEN {
            fail("breed", format!("Ensure this value has at most {} characters.", MAX_BREED_LEN));
        }

        let description = self.text("description").to_string();
        if description.is_empty() {
            fail("description", REQUIRED.into());
        }

        let contact_email = match self.text("contact_email") {
            "" => None,
            raw if raw.len() > MAX_EMAIL_LEN || !is_valid_email(raw) => {
                fail("contact_email", "Enter a valid email address.".into());
                None
            }
            raw => Some(raw.to_lowercase()),
        };

        match &self.image {
            None if image_required => fail("image", REQUIRED.into()),
            Some(img) if ext_from_mime(&img.content_type).is_none() => fail(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                    .into(),
            ),
            _ => {}
        }

        match (category, age) {
            (Some(category), Some(age)) if errors.is_empty() => Ok((
                PetAttributes {
                    name,
                    category,
                    age,
                    breed,
                    description,
                    contact_email,
                },
                self.image,
            )),
            _ => Err(AppError::Validation(errors)),
        }
    }
}
