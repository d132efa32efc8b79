use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PlaceId);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: PlaceId,
    pub title: String,
    pub description: String,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub creator: UserId,
}

/// Backends report a user's places either as a count or as the list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserPlaces {
    Count(u32),
    Ids(Vec<PlaceId>),
}

impl UserPlaces {
    pub fn count(&self) -> usize {
        match self {
            Self::Count(count) => *count as usize,
            Self::Ids(ids) => ids.len(),
        }
    }
}

impl Default for UserPlaces {
    fn default() -> Self {
        Self::Count(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub places: UserPlaces,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_accepts_both_image_keys() {
        let with_url: Place = serde_json::from_str(
            r#"{"id":"p1","title":"Empire State Building","description":"Sky scraper",
                "imageUrl":"https://img/e.jpg","address":"20 W 34th St",
                "location":{"lat":40.7484405,"lng":-73.9878531},"creator":"u1"}"#,
        )
        .expect("imageUrl place");
        let with_image: Place = serde_json::from_str(
            r#"{"id":"p1","title":"Empire State Building","description":"Sky scraper",
                "image":"https://img/e.jpg","address":"20 W 34th St","creator":"u1"}"#,
        )
        .expect("image place");

        assert_eq!(with_url.image_url, with_image.image_url);
        assert_eq!(with_url.creator, UserId::new("u1"));
        assert!(with_image.location.is_none());
    }

    #[test]
    fn user_places_counts_ids_or_number() {
        let by_count: User =
            serde_json::from_str(r#"{"id":"u1","name":"Javier","places":3}"#).expect("count");
        let by_ids: User =
            serde_json::from_str(r#"{"id":"u2","name":"Ana","places":["p1","p2"]}"#).expect("ids");
        let missing: User = serde_json::from_str(r#"{"id":"u3","name":"Lee"}"#).expect("none");

        assert_eq!(by_count.places.count(), 3);
        assert_eq!(by_ids.places.count(), 2);
        assert_eq!(missing.places.count(), 0);
    }
}
