use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

use super::repo::{Listing, ListingType};

/// Most images a single listing may carry.
pub const MAX_IMAGES: usize = 6;

/// Body for create and update. Update replaces every mutable field, so the
/// same payload serves both.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub parking: bool,
    #[serde(rename = "type")]
    pub kind: ListingType,
    #[serde(default)]
    pub offer: bool,
    pub regular_price: i64,
    #[serde(default)]
    pub discount_price: Option<i64>,
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub is_upcoming: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub launch_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub hype_description: Option<String>,
}

impl ListingPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::validation("Description is required"));
        }
        if self.address.trim().is_empty() {
            return Err(ApiError::validation("Address is required"));
        }
        if self.city.trim().is_empty() {
            return Err(ApiError::validation("City is required"));
        }
        if self.bedrooms < 1 {
            return Err(ApiError::validation("Bedrooms must be at least 1"));
        }
        if self.bathrooms < 1 {
            return Err(ApiError::validation("Bathrooms must be at least 1"));
        }
        if self.regular_price <= 0 {
            return Err(ApiError::validation("Regular price must be greater than zero"));
        }
        if self.image_urls.is_empty() {
            return Err(ApiError::validation("A listing needs at least one image"));
        }
        if self.image_urls.len() > MAX_IMAGES {
            return Err(ApiError::validation("A listing can have at most 6 images"));
        }
        if self.offer {
            match self.discount_price {
                None => {
                    return Err(ApiError::validation(
                        "Listings on offer need a discount price",
                    ))
                }
                Some(d) if d <= 0 => {
                    return Err(ApiError::validation(
                        "Discount price must be greater than zero",
                    ))
                }
                Some(d) if d >= self.regular_price => {
                    return Err(ApiError::validation(
                        "Discount price must be lower than regular price",
                    ))
                }
                Some(_) => {}
            }
        }
        if self.is_upcoming {
            match self.launch_date {
                None => {
                    return Err(ApiError::validation(
                        "Upcoming listings need a launch date",
                    ))
                }
                Some(d) if d <= OffsetDateTime::now_utc() => {
                    return Err(ApiError::validation("Launch date must be in the future"))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Drops fields whose gate flag is off, so a listing taken off offer
    /// never keeps a stale discount and a launched listing sheds its promo
    /// copy.
    pub fn normalized(mut self) -> Self {
        if !self.offer {
            self.discount_price = None;
        }
        if !self.is_upcoming {
            self.launch_date = None;
            self.hype_description = None;
        }
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub neighborhood: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub furnished: bool,
    pub parking: bool,
    #[serde(rename = "type")]
    pub kind: ListingType,
    pub offer: bool,
    pub regular_price: i64,
    pub discount_price: Option<i64>,
    pub image_urls: Vec<String>,
    pub owner_id: Uuid,
    pub is_upcoming: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub launch_date: Option<OffsetDateTime>,
    pub hype_description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Listing> for ListingResponse {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            name: l.name,
            description: l.description,
            address: l.address,
            city: l.city,
            neighborhood: l.neighborhood,
            bedrooms: l.bedrooms,
            bathrooms: l.bathrooms,
            furnished: l.furnished,
            parking: l.parking,
            kind: l.kind,
            offer: l.offer,
            regular_price: l.regular_price,
            discount_price: l.discount_price,
            image_urls: l.image_urls,
            owner_id: l.owner_id,
            is_upcoming: l.is_upcoming,
            launch_date: l.launch_date,
            hype_description: l.hype_description,
            created_at: l.created_at,
        }
    }
}

/// Browse-page payload: one page of listings plus the pre-pagination match
/// count the client derives page numbers from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub listings: Vec<ListingResponse>,
    pub total_listings: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn payload() -> ListingPayload {
        ListingPayload {
            name: "Sunny 2BHK".into(),
            description: "Bright flat near the park".into(),
            address: "12 Hill Road".into(),
            city: "Mumbai".into(),
            neighborhood: Some("Bandra".into()),
            bedrooms: 2,
            bathrooms: 1,
            furnished: true,
            parking: false,
            kind: ListingType::Rent,
            offer: false,
            discount_price: None,
            regular_price: 25_000,
            image_urls: vec!["https://img.test/1.jpg".into()],
            is_upcoming: false,
            launch_date: None,
            hype_description: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_blank_required_text() {
        let mut p = payload();
        p.name = "   ".into();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.city = String::new();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_nonpositive_rooms_and_price() {
        let mut p = payload();
        p.bedrooms = 0;
        assert!(p.validate().is_err());

        let mut p = payload();
        p.bathrooms = -1;
        assert!(p.validate().is_err());

        let mut p = payload();
        p.regular_price = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn bounds_the_image_gallery() {
        let mut p = payload();
        p.image_urls.clear();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.image_urls = (0..7).map(|i| format!("https://img.test/{i}.jpg")).collect();
        assert!(p.validate().is_err());
    }

    #[test]
    fn offer_requires_a_real_discount() {
        let mut p = payload();
        p.offer = true;
        p.discount_price = None;
        assert!(p.validate().is_err());

        p.discount_price = Some(30_000);
        assert!(p.validate().is_err());

        p.discount_price = Some(25_000);
        assert!(p.validate().is_err());

        p.discount_price = Some(20_000);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn upcoming_requires_a_future_launch_date() {
        let mut p = payload();
        p.is_upcoming = true;
        p.launch_date = None;
        assert!(p.validate().is_err());

        p.launch_date = Some(OffsetDateTime::now_utc() - Duration::days(1));
        assert!(p.validate().is_err());

        p.launch_date = Some(OffsetDateTime::now_utc() + Duration::days(30));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn normalization_clears_gated_fields() {
        let mut p = payload();
        p.offer = false;
        p.discount_price = Some(20_000);
        p.is_upcoming = false;
        p.launch_date = Some(OffsetDateTime::now_utc() + Duration::days(3));
        p.hype_description = Some("Coming soon!".into());

        let p = p.normalized();
        assert_eq!(p.discount_price, None);
        assert_eq!(p.launch_date, None);
        assert_eq!(p.hype_description, None);
    }

    #[test]
    fn normalization_keeps_gated_fields_when_flags_are_set() {
        let mut p = payload();
        p.offer = true;
        p.discount_price = Some(20_000);

        let p = p.normalized();
        assert_eq!(p.discount_price, Some(20_000));
    }
}
