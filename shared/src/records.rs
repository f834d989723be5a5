//! Stored record shapes and their mapping to and from DynamoDB items.
//!
//! The table holds three kinds of items, told apart by the `EntityType`
//! attribute. [`Record`] is the closed set of them; decoding always goes
//! through [`Record::from_item`] so an unexpected discriminant surfaces as
//! an error instead of being read as the wrong shape.
//!
//! Request -> record adds server fields (`CreatedAt`, `SearchText`, the
//! password hash). Record -> response drops anything private, so the two
//! directions are not inverses.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::keys;
use crate::types::{CreatePostRequest, CreateUserRequest, Location, Post, Principal, UserProfile};

pub type Item = HashMap<String, AttributeValue>;

// Attribute names. These are the storage contract; renaming any of them
// orphans existing data.
const EMAIL: &str = "Email";
const PASSWORD_HASH: &str = "PasswordHash";
const FIRST_NAME: &str = "FirstName";
const LAST_NAME: &str = "LastName";
const PHONE: &str = "Phone";
const POST_ID: &str = "PostId";
const AUTHOR_NAME: &str = "AuthorName";
const ITEM_NAME: &str = "ItemName";
const DESCRIPTION: &str = "Description";
const TRANSPORT_DETAILS: &str = "TransportDetails";
const LOCATION_LAT: &str = "LocationLat";
const LOCATION_LNG: &str = "LocationLng";
const SEARCH_TEXT: &str = "SearchText";
const COVER_URL: &str = "CoverUrl";
const IMAGE_URLS: &str = "ImageUrls";

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing attribute {0}")]
    MissingAttribute(&'static str),

    #[error("attribute {0} has the wrong type")]
    WrongType(&'static str),

    #[error("attribute {attribute} is not a number: {value}")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },

    #[error("unknown entity type {0}")]
    UnknownEntityType(String),

    #[error("expected a {expected} record, found {found}")]
    UnexpectedEntity {
        expected: EntityType,
        found: EntityType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    UserAuth,
    UserProfile,
    Post,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::UserAuth => "AUTH",
            EntityType::UserProfile => "PROFILE",
            EntityType::Post => "POST",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTH" => Ok(EntityType::UserAuth),
            "PROFILE" => Ok(EntityType::UserProfile),
            "POST" => Ok(EntityType::Post),
            other => Err(RecordError::UnknownEntityType(other.to_string())),
        }
    }
}

// ========== RECORDS ==========

/// Credential item. Written once at registration, read only by login.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAuthRecord {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfileRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub post_id: String,
    pub author_email: String,
    pub author_name: String,
    pub item_name: String,
    pub description: String,
    pub transport_details: String,
    pub location: Location,
    pub cover_url: Option<String>,
    pub image_urls: Vec<String>,
    pub search_text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    UserAuth(UserAuthRecord),
    UserProfile(UserProfileRecord),
    Post(PostRecord),
}

impl Record {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Record::UserAuth(_) => EntityType::UserAuth,
            Record::UserProfile(_) => EntityType::UserProfile,
            Record::Post(_) => EntityType::Post,
        }
    }

    /// `(PK, SK)` of the item this record is stored as.
    pub fn key(&self) -> (String, String) {
        match self {
            Record::UserAuth(r) => (keys::user_pk(&r.email), keys::user_auth_sk(&r.email)),
            Record::UserProfile(r) => (keys::user_pk(&r.email), keys::user_profile_sk(&r.email)),
            Record::Post(r) => (keys::post_pk(&r.post_id), keys::post_pk(&r.post_id)),
        }
    }

    pub fn to_item(&self) -> Item {
        let mut item = HashMap::new();
        let (pk, sk) = self.key();
        item.insert(keys::PK.to_string(), AttributeValue::S(pk));
        item.insert(keys::SK.to_string(), AttributeValue::S(sk));
        item.insert(
            keys::ENTITY_TYPE.to_string(),
            AttributeValue::S(self.entity_type().as_str().to_string()),
        );

        match self {
            Record::UserAuth(r) => {
                put_s(&mut item, EMAIL, &r.email);
                put_s(&mut item, PASSWORD_HASH, &r.password_hash);
            }
            Record::UserProfile(r) => {
                put_s(&mut item, EMAIL, &r.email);
                put_s(&mut item, FIRST_NAME, &r.first_name);
                put_s(&mut item, LAST_NAME, &r.last_name);
                put_s(&mut item, PHONE, &r.phone);
                put_s(&mut item, keys::CREATED_AT, &r.created_at);
            }
            Record::Post(r) => {
                put_s(&mut item, keys::AUTHOR_INDEX_PK, &keys::post_author_pk(&r.author_email));
                put_s(&mut item, keys::AUTHOR_INDEX_SK, &keys::post_author_sk(&r.created_at));
                put_s(&mut item, POST_ID, &r.post_id);
                put_s(&mut item, AUTHOR_NAME, &r.author_name);
                put_s(&mut item, ITEM_NAME, &r.item_name);
                put_s(&mut item, DESCRIPTION, &r.description);
                put_s(&mut item, TRANSPORT_DETAILS, &r.transport_details);
                item.insert(
                    LOCATION_LAT.to_string(),
                    AttributeValue::N(r.location.lat.to_string()),
                );
                item.insert(
                    LOCATION_LNG.to_string(),
                    AttributeValue::N(r.location.long.to_string()),
                );
                if let Some(cover) = &r.cover_url {
                    put_s(&mut item, COVER_URL, cover);
                }
                item.insert(
                    IMAGE_URLS.to_string(),
                    AttributeValue::L(
                        r.image_urls
                            .iter()
                            .map(|url| AttributeValue::S(url.clone()))
                            .collect(),
                    ),
                );
                put_s(&mut item, SEARCH_TEXT, &r.search_text);
                put_s(&mut item, keys::CREATED_AT, &r.created_at);
            }
        }

        item
    }

    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let entity_type: EntityType = get_string(item, keys::ENTITY_TYPE)?.parse()?;

        match entity_type {
            EntityType::UserAuth => Ok(Record::UserAuth(UserAuthRecord {
                email: get_string(item, EMAIL)?,
                password_hash: get_string(item, PASSWORD_HASH)?,
            })),
            EntityType::UserProfile => Ok(Record::UserProfile(UserProfileRecord {
                email: get_string(item, EMAIL)?,
                first_name: get_string(item, FIRST_NAME)?,
                last_name: get_string(item, LAST_NAME)?,
                phone: get_string(item, PHONE)?,
                created_at: get_string(item, keys::CREATED_AT)?,
            })),
            EntityType::Post => {
                let author_key = get_string(item, keys::AUTHOR_INDEX_PK)?;
                let author_email = keys::email_from_author_pk(&author_key)
                    .ok_or(RecordError::WrongType(keys::AUTHOR_INDEX_PK))?
                    .to_string();

                Ok(Record::Post(PostRecord {
                    post_id: get_string(item, POST_ID)?,
                    author_email,
                    author_name: get_string(item, AUTHOR_NAME)?,
                    item_name: get_string(item, ITEM_NAME)?,
                    description: get_string(item, DESCRIPTION)?,
                    transport_details: get_string(item, TRANSPORT_DETAILS)?,
                    location: Location {
                        lat: get_number(item, LOCATION_LAT)?,
                        long: get_number(item, LOCATION_LNG)?,
                    },
                    cover_url: get_optional_string(item, COVER_URL),
                    image_urls: get_string_list(item, IMAGE_URLS)?,
                    search_text: get_optional_string(item, SEARCH_TEXT).unwrap_or_default(),
                    created_at: get_string(item, keys::CREATED_AT)?,
                }))
            }
        }
    }

    pub fn into_post(self) -> Result<PostRecord, RecordError> {
        match self {
            Record::Post(post) => Ok(post),
            other => Err(RecordError::UnexpectedEntity {
                expected: EntityType::Post,
                found: other.entity_type(),
            }),
        }
    }
}

// ========== REQUEST -> RECORD ==========

impl UserProfileRecord {
    pub fn from_request(req: &CreateUserRequest, now: DateTime<Utc>) -> Self {
        Self {
            email: req.email.clone(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            phone: req.phone.clone(),
            created_at: keys::timestamp(now),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl UserAuthRecord {
    pub fn from_request(req: &CreateUserRequest, password_hash: String) -> Self {
        Self {
            email: req.email.clone(),
            password_hash,
        }
    }
}

impl PostRecord {
    /// Authorship comes from the principal only; the request type has no
    /// author fields to trust.
    pub fn from_request(
        req: &CreatePostRequest,
        author: &Principal,
        post_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        let mut urls = req.image_urls.iter().cloned();
        let cover_url = urls.next();

        Self {
            post_id,
            author_email: author.email.clone(),
            author_name: author.full_name.clone(),
            item_name: req.name.clone(),
            description: req.description.clone(),
            transport_details: req.transport_details.clone(),
            location: req.location,
            cover_url,
            image_urls: urls.collect(),
            search_text: search_text(&req.name, &req.description),
            created_at: keys::timestamp(now),
        }
    }

    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.search_text.contains(&keyword.to_lowercase())
    }
}

pub fn search_text(name: &str, description: &str) -> String {
    format!("{name}{description}").to_lowercase()
}

// ========== RECORD -> RESPONSE ==========

impl From<&UserProfileRecord> for UserProfile {
    fn from(r: &UserProfileRecord) -> Self {
        Self {
            email: r.email.clone(),
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            phone: r.phone.clone(),
        }
    }
}

impl From<PostRecord> for Post {
    fn from(r: PostRecord) -> Self {
        Self {
            post_id: r.post_id,
            name: r.item_name,
            author_name: r.author_name,
            created_at: r.created_at,
            description: r.description,
            transport_details: r.transport_details,
            location: r.location,
            cover_url: r.cover_url,
            image_urls: r.image_urls,
        }
    }
}

// ========== ATTRIBUTE HELPERS ==========

fn put_s(item: &mut Item, name: &str, value: &str) {
    item.insert(name.to_string(), AttributeValue::S(value.to_string()));
}

fn get_string(item: &Item, name: &'static str) -> Result<String, RecordError> {
    item.get(name)
        .ok_or(RecordError::MissingAttribute(name))?
        .as_s()
        .map(|s| s.to_string())
        .map_err(|_| RecordError::WrongType(name))
}

fn get_optional_string(item: &Item, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn get_number(item: &Item, name: &'static str) -> Result<f64, RecordError> {
    let raw = item
        .get(name)
        .ok_or(RecordError::MissingAttribute(name))?
        .as_n()
        .map_err(|_| RecordError::WrongType(name))?;
    raw.parse().map_err(|_| RecordError::InvalidNumber {
        attribute: name,
        value: raw.to_string(),
    })
}

fn get_string_list(item: &Item, name: &'static str) -> Result<Vec<String>, RecordError> {
    let list = match item.get(name) {
        Some(value) => value.as_l().map_err(|_| RecordError::WrongType(name))?,
        None => return Ok(Vec::new()),
    };
    list.iter()
        .map(|v| {
            v.as_s()
                .map(|s| s.to_string())
                .map_err(|_| RecordError::WrongType(name))
        })
        .collect()
}
