use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::ListingPayload;
use super::query::{self, SearchCriteria};

/// Market segment of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "listing_type", rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

/// Listing record as stored. `kind` maps the `type` column; a listing is
/// Standard when `is_upcoming` is false and Upcoming when it is true.
#[derive(Debug, Clone, FromRow)]
pub struct Listing {
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
    #[sqlx(rename = "type")]
    pub kind: ListingType,
    pub offer: bool,
    pub regular_price: i64,
    pub discount_price: Option<i64>,
    pub image_urls: Vec<String>,
    pub owner_id: Uuid,
    pub is_upcoming: bool,
    pub launch_date: Option<OffsetDateTime>,
    pub hype_description: Option<String>,
    pub created_at: OffsetDateTime,
}

pub(crate) const LISTING_COLUMNS: &str = "id, name, description, address, city, neighborhood, \
     bedrooms, bathrooms, furnished, parking, type, offer, regular_price, discount_price, \
     image_urls, owner_id, is_upcoming, launch_date, hype_description, created_at";

impl Listing {
    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        p: &ListingPayload,
    ) -> Result<Listing, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO listings (name, description, address, city, neighborhood,
                bedrooms, bathrooms, furnished, parking, type, offer,
                regular_price, discount_price, image_urls, owner_id,
                is_upcoming, launch_date, hype_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {LISTING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Listing>(&sql)
            .bind(&p.name)
            .bind(&p.description)
            .bind(&p.address)
            .bind(&p.city)
            .bind(&p.neighborhood)
            .bind(p.bedrooms)
            .bind(p.bathrooms)
            .bind(p.furnished)
            .bind(p.parking)
            .bind(p.kind)
            .bind(p.offer)
            .bind(p.regular_price)
            .bind(p.discount_price)
            .bind(&p.image_urls)
            .bind(owner_id)
            .bind(p.is_upcoming)
            .bind(p.launch_date)
            .bind(&p.hype_description)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
        let sql = format!(r#"SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"#);
        sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Full replace of the mutable fields; owner and creation time never
    /// change after create.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        p: &ListingPayload,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE listings
            SET name = $2, description = $3, address = $4, city = $5, neighborhood = $6,
                bedrooms = $7, bathrooms = $8, furnished = $9, parking = $10, type = $11,
                offer = $12, regular_price = $13, discount_price = $14, image_urls = $15,
                is_upcoming = $16, launch_date = $17, hype_description = $18
            WHERE id = $1
            RETURNING {LISTING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .bind(&p.name)
            .bind(&p.description)
            .bind(&p.address)
            .bind(&p.city)
            .bind(&p.neighborhood)
            .bind(p.bedrooms)
            .bind(p.bathrooms)
            .bind(p.furnished)
            .bind(p.parking)
            .bind(p.kind)
            .bind(p.offer)
            .bind(p.regular_price)
            .bind(p.discount_price)
            .bind(&p.image_urls)
            .bind(p.is_upcoming)
            .bind(p.launch_date)
            .bind(&p.hype_description)
            .fetch_optional(db)
            .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM listings WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> Result<Vec<Listing>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {LISTING_COLUMNS} FROM listings
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        );
        sqlx::query_as::<_, Listing>(&sql)
            .bind(owner_id)
            .fetch_all(db)
            .await
    }

    /// Runs the search twice over the same filter set: once for the total
    /// match count (pre-pagination, for page math) and once for the page.
    pub async fn search(
        db: &PgPool,
        criteria: &SearchCriteria,
    ) -> Result<(Vec<Listing>, i64), sqlx::Error> {
        let mut count = query::count_query(criteria);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut page = query::select_query(criteria);
        let listings = page.build_query_as::<Listing>().fetch_all(db).await?;
        Ok((listings, total))
    }

    /// Promotional queue: upcoming listings only, soonest launch first.
    pub async fn upcoming(db: &PgPool) -> Result<Vec<Listing>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {LISTING_COLUMNS} FROM listings
            WHERE is_upcoming = TRUE
            ORDER BY launch_date ASC, id ASC
            "#
        );
        sqlx::query_as::<_, Listing>(&sql).fetch_all(db).await
    }
}
