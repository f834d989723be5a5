use chrono::Utc;
use lambda_http::{Body, Response};

use crate::auth::parse_body;
use crate::error::ApiError;
use crate::keys;
use crate::records::{EntityType, Item, PostRecord, Record};
use crate::response;
use crate::types::{CreatePostRequest, CreatedPost, Location, Post, PostWithComments, Principal};
use crate::AppState;

/// Optional narrowing and ordering for the post listing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostFilter {
    /// Case-insensitive substring of name + description.
    pub keyword: Option<String>,
    /// Order results by distance from here, nearest first.
    pub near: Option<Location>,
}

impl PostFilter {
    /// Build from raw query parameters. Location ordering needs both `lat`
    /// and `long`; either one alone is ignored.
    pub fn from_query(
        keyword: Option<&str>,
        lat: Option<&str>,
        long: Option<&str>,
    ) -> Result<Self, ApiError> {
        // Matched as a raw substring; surrounding spaces are significant.
        let keyword = keyword.filter(|k| !k.is_empty()).map(|k| k.to_string());

        let near = match (lat, long) {
            (Some(lat), Some(long)) => Some(Location {
                lat: parse_coordinate("lat", lat)?,
                long: parse_coordinate("long", long)?,
            }),
            _ => None,
        };

        Ok(Self { keyword, near })
    }

    /// Apply the keyword filter and distance ordering. Input order (newest
    /// first) is kept among posts at equal distance.
    pub fn apply(&self, mut posts: Vec<PostRecord>) -> Vec<PostRecord> {
        if let Some(keyword) = &self.keyword {
            posts.retain(|post| post.matches_keyword(keyword));
        }

        if let Some(origin) = &self.near {
            posts.sort_by(|a, b| {
                origin
                    .distance_to(&a.location)
                    .total_cmp(&origin.distance_to(&b.location))
            });
        }

        posts
    }
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64, ApiError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ApiError::InvalidQuery(format!("{name} must be a number"))),
    }
}

/// Coordinates must be a real place. Anything else would also not fit a
/// DynamoDB number once written out in decimal.
fn check_location(location: &Location) -> Result<(), ApiError> {
    let valid = |value: f64, limit: f64| {
        value.is_finite() && value.abs() <= limit && (value == 0.0 || value.abs() >= 1e-100)
    };

    if !valid(location.lat, 90.0) {
        return Err(ApiError::InvalidBody(
            "location.lat must be between -90 and 90".to_string(),
        ));
    }
    if !valid(location.long, 180.0) {
        return Err(ApiError::InvalidBody(
            "location.long must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

/// Create a post authored by the caller.
pub async fn create_post(
    state: &AppState,
    principal: &Principal,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;
    let req: CreatePostRequest = parse_body(body)?;
    check_location(&req.location)?;

    let post_id = uuid::Uuid::new_v4().simple().to_string();
    let record = PostRecord::from_request(&req, principal, post_id, Utc::now());

    table.put(Record::Post(record.clone()).to_item()).await?;

    tracing::info!("Post {} created by {}", record.post_id, principal.email);

    response::created(&CreatedPost {
        request: req,
        post_id: record.post_id,
        created_at: record.created_at,
        author_name: record.author_name,
        cover_url: record.cover_url,
    })
}

/// Single post, with its (currently always empty) comments.
pub async fn get_post(state: &AppState, post_id: &str) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;
    let pk = keys::post_pk(post_id);

    let item = table
        .get(&pk, &pk)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    let post = Record::from_item(&item)?.into_post()?;

    response::ok(&PostWithComments {
        post: post.into(),
        comments: Vec::new(),
    })
}

/// All posts, newest first, optionally filtered and ordered by `filter`.
pub async fn list_posts(state: &AppState, filter: &PostFilter) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;

    let items = table
        .query_by_entity_type(EntityType::Post.as_str())
        .await?;
    let records = decode_posts(&items)?;
    let total = records.len();

    let posts: Vec<Post> = filter.apply(records).into_iter().map(Post::from).collect();

    tracing::info!("Listing {} of {} posts", posts.len(), total);
    response::ok(&posts)
}

/// Posts authored by the caller, newest first.
pub async fn list_author_posts(
    state: &AppState,
    principal: &Principal,
) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;

    let items = table
        .query_by_author(&keys::post_author_pk(&principal.email))
        .await?;
    let posts: Vec<Post> = decode_posts(&items)?.into_iter().map(Post::from).collect();

    response::ok(&posts)
}

fn decode_posts(items: &[Item]) -> Result<Vec<PostRecord>, ApiError> {
    let posts = items
        .iter()
        .map(|item| Record::from_item(item).and_then(Record::into_post))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{MemoryTable, Table};
    use crate::testing;
    use chrono::TimeZone;
    use lambda_http::http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn body(name: &str, description: &str, lat: f64, long: f64) -> Vec<u8> {
        json!({
            "name": name,
            "description": description,
            "location": {"lat": lat, "long": long},
            "imageUrls": ["https://img/cover.jpg", "https://img/2.jpg"],
            "transportDetails": "Pickup in the evening"
        })
        .to_string()
        .into_bytes()
    }

    fn json_of(resp: &Response<Body>) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    /// Store a post with a fixed creation time so ordering is deterministic.
    async fn seed(table: &MemoryTable, id: &str, name: &str, location: Location, minute: u32) {
        let req = CreatePostRequest {
            name: name.to_string(),
            description: "Good condition".to_string(),
            location,
            image_urls: vec![],
            transport_details: "courier".to_string(),
        };
        let at = Utc.with_ymd_and_hms(2022, 5, 14, 10, minute, 0).unwrap();
        let author = testing::principal(&format!("{id}@example.com"), "Seller");
        let record = PostRecord::from_request(&req, &author, id.to_string(), at);
        table.put(Record::Post(record).to_item()).await.unwrap();
    }

    fn ids(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["postId"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn create_stamps_author_from_principal() {
        let state = testing::state();
        let principal = testing::principal("ana@example.com", "Ana Pop");
        let payload = json!({
            "name": "Chair",
            "description": "Wooden",
            "location": {"lat": 45.75, "long": 21.22},
            "imageUrls": [],
            "transportDetails": "pickup",
            "authorEmail": "mallory@example.com",
            "authorName": "Mallory"
        })
        .to_string();

        let resp = create_post(&state, &principal, payload.as_bytes()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_of(&resp);
        assert_eq!(created["authorName"], "Ana Pop");

        let mine = list_author_posts(&state, &principal).await.unwrap();
        let created_id = created["postId"].as_str().unwrap();
        assert_eq!(ids(&json_of(&mine)), [created_id]);

        let mallory = testing::principal("mallory@example.com", "Mallory");
        let theirs = list_author_posts(&state, &mallory).await.unwrap();
        assert!(json_of(&theirs).as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_post_round_trips() {
        let state = testing::state();
        let principal = testing::principal("ana@example.com", "Ana Pop");

        let resp = create_post(&state, &principal, &body("Lamp", "Desk lamp", 45.1, 21.3))
            .await
            .unwrap();
        let created = json_of(&resp);
        assert_eq!(created["coverUrl"], "https://img/cover.jpg");

        let post_id = created["postId"].as_str().unwrap();
        let fetched = json_of(&get_post(&state, post_id).await.unwrap());

        for field in ["postId", "name", "description", "location", "transportDetails", "createdAt", "coverUrl", "authorName"] {
            assert_eq!(fetched[field], created[field], "field {field}");
        }
        assert_eq!(fetched["imageUrls"], json!(["https://img/2.jpg"]));
        assert_eq!(fetched["comments"], json!([]));
    }

    #[tokio::test]
    async fn create_rejects_malformed_body() {
        let state = testing::state();
        let principal = testing::principal("ana@example.com", "Ana Pop");
        let err = create_post(&state, &principal, br#"{"name": "Chair"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_impossible_coordinates() {
        let table = Arc::new(MemoryTable::new());
        let state = testing::state_with(table.clone());
        let principal = testing::principal("ana@example.com", "Ana Pop");

        for (lat, long) in [(1e300, 0.0), (0.0, -1e300), (91.0, 0.0), (0.0, 180.5), (1e-200, 0.0)] {
            let err = create_post(&state, &principal, &body("Chair", "Oak", lat, long))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "({lat}, {long})");
        }
        assert!(table.is_empty());

        let resp = create_post(&state, &principal, &body("Chair", "Oak", -90.0, 180.0))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn unknown_post_is_404() {
        let state = testing::state();
        let err = get_post(&state, "does-not-exist").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let table = Arc::new(MemoryTable::new());
        seed(&table, "a", "Sofa", Location { lat: 0.0, long: 0.0 }, 1).await;
        seed(&table, "b", "Desk", Location { lat: 0.0, long: 0.0 }, 3).await;
        seed(&table, "c", "Bike", Location { lat: 0.0, long: 0.0 }, 2).await;
        let state = testing::state_with(table);

        let resp = list_posts(&state, &PostFilter::default()).await.unwrap();
        assert_eq!(ids(&json_of(&resp)), ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn keyword_filters_case_insensitively() {
        let table = Arc::new(MemoryTable::new());
        seed(&table, "a", "Office Chair", Location { lat: 0.0, long: 0.0 }, 1).await;
        seed(&table, "b", "Armchair", Location { lat: 0.0, long: 0.0 }, 2).await;
        seed(&table, "c", "Table", Location { lat: 0.0, long: 0.0 }, 3).await;
        let state = testing::state_with(table);

        let filter = PostFilter::from_query(Some("chair"), None, None).unwrap();
        let resp = list_posts(&state, &filter).await.unwrap();
        let listed = json_of(&resp);
        assert_eq!(ids(&listed), ["b", "a"]);
        assert!(listed[0].get("searchText").is_none());

        let filter = PostFilter::from_query(Some("CHAIR"), None, None).unwrap();
        let resp = list_posts(&state, &filter).await.unwrap();
        assert_eq!(ids(&json_of(&resp)), ["b", "a"]);

        // Leading space is part of the substring: "armchair" has none.
        let filter = PostFilter::from_query(Some(" chair"), None, None).unwrap();
        let resp = list_posts(&state, &filter).await.unwrap();
        assert_eq!(ids(&json_of(&resp)), ["a"]);
    }

    #[tokio::test]
    async fn location_orders_by_distance() {
        let table = Arc::new(MemoryTable::new());
        seed(&table, "far", "Sofa", Location { lat: 10.0, long: 10.0 }, 1).await;
        seed(&table, "near", "Desk", Location { lat: 1.0, long: 1.0 }, 2).await;
        seed(&table, "mid", "Bike", Location { lat: 3.0, long: -3.0 }, 3).await;
        seed(&table, "near2", "Lamp", Location { lat: -1.0, long: 1.0 }, 4).await;
        let state = testing::state_with(table);

        let filter = PostFilter::from_query(None, Some("0"), Some("0")).unwrap();
        let resp = list_posts(&state, &filter).await.unwrap();
        let listed = json_of(&resp);

        // near2 and near tie; newest-first order is kept between them.
        assert_eq!(ids(&listed), ["near2", "near", "mid", "far"]);

        let origin = Location { lat: 0.0, long: 0.0 };
        let distances: Vec<f64> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|p| {
                let loc: Location = serde_json::from_value(p["location"].clone()).unwrap();
                origin.distance_to(&loc)
            })
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(
            PostFilter::from_query(None, Some("1.5"), None).unwrap(),
            PostFilter::default()
        );
        assert_eq!(
            PostFilter::from_query(Some(""), None, None).unwrap(),
            PostFilter::default()
        );
        assert_eq!(
            PostFilter::from_query(Some("  "), None, None).unwrap().keyword.as_deref(),
            Some("  ")
        );
        assert_eq!(
            PostFilter::from_query(None, Some("45.75"), Some("21.2")).unwrap().near,
            Some(Location { lat: 45.75, long: 21.2 })
        );
        assert!(PostFilter::from_query(None, Some("north"), Some("1")).is_err());
        assert!(PostFilter::from_query(None, Some("NaN"), Some("1")).is_err());
    }

    #[tokio::test]
    async fn posts_created_later_list_first() {
        let state = testing::state();
        let principal = testing::principal("ana@example.com", "Ana Pop");
        let first = create_post(&state, &principal, &body("One", "first", 0.0, 0.0))
            .await
            .unwrap();
        // Creation timestamps have millisecond precision.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = create_post(&state, &principal, &body("Two", "second", 0.0, 0.0))
            .await
            .unwrap();

        let (first, second) = (json_of(&first), json_of(&second));
        let listed = json_of(&list_author_posts(&state, &principal).await.unwrap());
        assert_eq!(
            ids(&listed),
            [
                second["postId"].as_str().unwrap(),
                first["postId"].as_str().unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_table_is_500() {
        let state = testing::unconfigured_state();
        let principal = testing::principal("ana@example.com", "Ana Pop");
        let err = list_posts(&state, &PostFilter::default()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = create_post(&state, &principal, &body("x", "y", 0.0, 0.0)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
