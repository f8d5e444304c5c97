//! Request payloads and response views for the books module.

use atlas_db::{Author, AuthorId, Book};
use atlas_http::serializer::{
    ApiVersion, FieldDef, Normalize, ObjectWriter, SerializationContext,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

/// Serialization group shared by every book response.
pub const GET_BOOKS: &str = "getBooks";

const BOOK_ID: FieldDef = FieldDef::new("id", &[GET_BOOKS]);
const BOOK_TITLE: FieldDef = FieldDef::new("title", &[GET_BOOKS]);
const BOOK_COVER_TEXT: FieldDef = FieldDef::new("coverText", &[GET_BOOKS]);
const BOOK_COMMENT: FieldDef =
    FieldDef::new("comment", &[GET_BOOKS]).since(ApiVersion::new(2, 0));
const BOOK_AUTHOR: FieldDef = FieldDef::new("author", &[GET_BOOKS]);

const AUTHOR_ID: FieldDef = FieldDef::new("id", &[GET_BOOKS]);
const AUTHOR_FIRST_NAME: FieldDef = FieldDef::new("firstName", &[GET_BOOKS]);
const AUTHOR_LAST_NAME: FieldDef = FieldDef::new("lastName", &[GET_BOOKS]);

/// Body of `POST /api/books` and `PUT /api/books/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[validate(
        required(code = "not_blank", message = "The title of the book is required."),
        length(
            min = 1,
            max = 255,
            code = "length",
            message = "The title must be between 1 and 255 characters long."
        )
    )]
    pub title: Option<String>,

    #[validate(
        required(code = "not_blank", message = "The cover text of the book is required."),
        length(
            min = 1,
            code = "length",
            message = "The cover text must not be empty."
        )
    )]
    pub cover_text: Option<String>,

    pub comment: Option<String>,

    /// Accepted as a number or a numeric string; anything else means "no author".
    pub id_author: Option<Value>,
}

impl BookPayload {
    /// Author id the client asked for, if it is a usable id.
    pub fn author_id(&self) -> Option<AuthorId> {
        match self.id_author.as_ref()? {
            Value::Number(number) => number.as_u64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Flattens validator output into `{propertyPath, message, code}` entries,
/// ordered by property.
pub fn violations(errors: &ValidationErrors) -> Vec<Value> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            let property_path = camel_case(&field);
            errors.iter().map(move |error| {
                json!({
                    "propertyPath": property_path,
                    "message": error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{property_path} is invalid")),
                    "code": error.code,
                })
            })
        })
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A book with its author resolved, ready for serialization.
#[derive(Debug, Clone)]
pub struct BookView {
    pub book: Book,
    pub author: Option<Author>,
}

impl Normalize for BookView {
    fn normalize(&self, ctx: &SerializationContext) -> Value {
        ObjectWriter::new(ctx)
            .field(&BOOK_ID, self.book.id)
            .field(&BOOK_TITLE, self.book.title.as_str())
            .field(&BOOK_COVER_TEXT, self.book.cover_text.as_str())
            .field(&BOOK_COMMENT, self.book.comment.clone())
            .field_with(&BOOK_AUTHOR, || {
                self.author
                    .as_ref()
                    .map_or(Value::Null, |author| normalize_author(author, ctx))
            })
            .finish()
    }
}

fn normalize_author(author: &Author, ctx: &SerializationContext) -> Value {
    ObjectWriter::new(ctx)
        .field(&AUTHOR_ID, author.id)
        .field(&AUTHOR_FIRST_NAME, author.first_name.as_str())
        .field(&AUTHOR_LAST_NAME, author.last_name.as_str())
        .finish()
}
