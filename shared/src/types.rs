use serde::{Deserialize, Serialize};

// ========== PRINCIPAL ==========
/// Authenticated caller, as verified by the authorizer and handed to the
/// API through the gateway's authorizer context.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub email: String,
    pub full_name: String,
}

// ========== USER ==========
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Public profile. Never carries credential material.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

// ========== LOGIN ==========
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

// ========== POST ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

impl Location {
    /// Straight-line distance in degree space. Good enough for ranking
    /// nearby listings; not a geodesic.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let dlat = self.lat - other.lat;
        let dlong = self.long - other.long;
        (dlat * dlat + dlong * dlong).sqrt()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub name: String,
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub transport_details: String,
}

/// Creation response: the submitted payload plus the fields the server
/// assigned.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPost {
    #[serde(flatten)]
    pub request: CreatePostRequest,
    pub post_id: String,
    pub created_at: String,
    pub author_name: String,
    pub cover_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,
    pub name: String,
    pub author_name: String,
    pub created_at: String,
    pub description: String,
    pub transport_details: String,
    pub location: Location,
    pub cover_url: Option<String>,
    pub image_urls: Vec<String>,
}

// ========== COMMENT ==========
/// Comments are not stored yet; single-post responses always carry an
/// empty list so clients can rely on the field.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_name: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

// ========== ERROR ==========
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_post_ignores_client_author_fields() {
        let req: CreatePostRequest = serde_json::from_value(serde_json::json!({
            "name": "Chair",
            "description": "Wooden",
            "location": {"lat": 45.75, "long": 21.22},
            "imageUrls": ["https://img/1.jpg"],
            "transportDetails": "pickup",
            "authorEmail": "mallory@example.com",
            "authorName": "Mallory"
        }))
        .unwrap();

        let echoed = serde_json::to_value(&req).unwrap();
        assert!(echoed.get("authorEmail").is_none());
        assert!(echoed.get("authorName").is_none());
    }

    #[test]
    fn post_with_comments_flattens() {
        let value = serde_json::to_value(PostWithComments {
            post: Post {
                post_id: "p1".to_string(),
                name: "Lamp".to_string(),
                author_name: "Ana Pop".to_string(),
                created_at: "2022-05-14T10:00:00.000Z".to_string(),
                description: "Desk lamp".to_string(),
                transport_details: "courier".to_string(),
                location: Location { lat: 1.0, long: 2.0 },
                cover_url: None,
                image_urls: vec![],
            },
            comments: vec![],
        })
        .unwrap();

        assert_eq!(value["postId"], "p1");
        assert_eq!(value["coverUrl"], serde_json::Value::Null);
        assert_eq!(value["location"]["long"], 2.0);
        assert_eq!(value["comments"], serde_json::json!([]));
    }

    #[test]
    fn distance_is_euclidean() {
        let origin = Location { lat: 0.0, long: 0.0 };
        let p = Location { lat: 3.0, long: 4.0 };
        assert_eq!(origin.distance_to(&p), 5.0);
        assert_eq!(p.distance_to(&origin), 5.0);
    }
}
