//! Storefront search: turns the browse-page query string into SQL.
//!
//! Every textual dimension deserializes into a closed enum, so column names
//! and sort directions reaching the SQL text are always program literals;
//! user input only ever travels through bind parameters.

use serde::{Deserialize, Deserializer};
use sqlx::{Postgres, QueryBuilder};

use super::repo::{ListingType, LISTING_COLUMNS};

/// Page size when the client does not ask for one.
pub const DEFAULT_LIMIT: i64 = 9;
/// Hard ceiling on page size.
pub const MAX_LIMIT: i64 = 50;

/// Bedroom counts above this collapse into a single "or more" bucket.
const BEDROOMS_CAP: i32 = 4;

/// Cities the marketplace operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum City {
    Mumbai,
    Bangalore,
    Pune,
    Delhi,
    Chennai,
    Hyderabad,
}

pub const CITY_NAMES: &[&str] = &[
    "Mumbai",
    "Bangalore",
    "Pune",
    "Delhi",
    "Chennai",
    "Hyderabad",
];

impl City {
    pub fn as_str(self) -> &'static str {
        match self {
            City::Mumbai => "Mumbai",
            City::Bangalore => "Bangalore",
            City::Pune => "Pune",
            City::Delhi => "Delhi",
            City::Chennai => "Chennai",
            City::Hyderabad => "Hyderabad",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Mumbai" => Some(City::Mumbai),
            "Bangalore" => Some(City::Bangalore),
            "Pune" => Some(City::Pune),
            "Delhi" => Some(City::Delhi),
            "Chennai" => Some(City::Chennai),
            "Hyderabad" => Some(City::Hyderabad),
            _ => None,
        }
    }
}

/// Sale/rent dimension; `all` switches the filter off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Sale,
    Rent,
}

impl TypeFilter {
    fn as_type(self) -> Option<ListingType> {
        match self {
            TypeFilter::All => None,
            TypeFilter::Sale => Some(ListingType::Sale),
            TypeFilter::Rent => Some(ListingType::Rent),
        }
    }
}

/// City dimension; `all` switches the filter off, anything that is not a
/// known city name is rejected at deserialization time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CityFilter {
    #[default]
    All,
    Only(City),
}

impl<'de> Deserialize<'de> for CityFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == "all" {
            return Ok(CityFilter::All);
        }
        City::from_name(&raw)
            .map(CityFilter::Only)
            .ok_or_else(|| serde::de::Error::unknown_variant(&raw, CITY_NAMES))
    }
}

/// Bedroom-count dimension. The UI offers 1..=3 as exact matches and "4"
/// as a four-or-more bucket; `all` switches the filter off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BedroomsFilter {
    #[default]
    Any,
    Exactly(i32),
    AtLeast(i32),
}

impl<'de> Deserialize<'de> for BedroomsFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == "all" {
            return Ok(BedroomsFilter::Any);
        }
        let n: i32 = raw
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid bedrooms `{raw}`")))?;
        if n < 1 {
            return Err(serde::de::Error::custom(format!("invalid bedrooms `{raw}`")));
        }
        if n >= BEDROOMS_CAP {
            Ok(BedroomsFilter::AtLeast(BEDROOMS_CAP))
        } else {
            Ok(BedroomsFilter::Exactly(n))
        }
    }
}

/// Columns the client may sort by. Closed set; the decoded variant is the
/// only thing that ever reaches the ORDER BY text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortField {
    #[serde(rename = "regularPrice")]
    RegularPrice,
    #[default]
    #[serde(rename = "createdAt", alias = "created_at")]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Everything the browse page can ask for. Absent parameters fall back to
/// the same defaults the UI renders, so a bare `/api/listing/get` is the
/// newest-first front page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    pub search_term: String,
    #[serde(rename = "type")]
    pub kind: TypeFilter,
    pub city: CityFilter,
    pub bedrooms: BedroomsFilter,
    pub parking: bool,
    pub furnished: bool,
    pub offer: bool,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: i64,
    pub start_index: i64,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            kind: TypeFilter::default(),
            city: CityFilter::default(),
            bedrooms: BedroomsFilter::default(),
            parking: false,
            furnished: false,
            offer: false,
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            start_index: 0,
        }
    }
}

impl SearchCriteria {
    /// Effective page size, clamped into `1..=MAX_LIMIT`.
    pub fn page_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// Effective row offset; negative offsets read as zero.
    pub fn page_offset(&self) -> i64 {
        self.start_index.max(0)
    }
}

/// `%term%` with LIKE metacharacters in the user's text neutralized, so a
/// search for "50%_off" matches those characters literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// WHERE clause shared by the page query and the count query. Upcoming
/// listings never surface here; the boolean amenity filters constrain only
/// when set (false means "don't care", not "must lack").
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, c: &SearchCriteria) {
    qb.push(" WHERE is_upcoming = FALSE");
    if !c.search_term.is_empty() {
        qb.push(" AND name ILIKE ").push_bind(like_pattern(&c.search_term));
    }
    if let Some(kind) = c.kind.as_type() {
        qb.push(" AND type = ").push_bind(kind);
    }
    if let CityFilter::Only(city) = c.city {
        qb.push(" AND city = ").push_bind(city.as_str());
    }
    match c.bedrooms {
        BedroomsFilter::Any => {}
        BedroomsFilter::Exactly(n) => {
            qb.push(" AND bedrooms = ").push_bind(n);
        }
        BedroomsFilter::AtLeast(n) => {
            qb.push(" AND bedrooms >= ").push_bind(n);
        }
    }
    if c.parking {
        qb.push(" AND parking = TRUE");
    }
    if c.furnished {
        qb.push(" AND furnished = TRUE");
    }
    if c.offer {
        qb.push(" AND offer = TRUE");
    }
}

/// ORDER BY text for a whitelisted sort. Ties always break on
/// `created_at DESC, id DESC` so pages never overlap or skip rows when
/// many listings share a sort key.
fn order_clause(sort: SortField, order: SortOrder) -> String {
    match sort {
        SortField::CreatedAt => format!("created_at {}, id DESC", order.sql()),
        SortField::RegularPrice => {
            format!("regular_price {}, created_at DESC, id DESC", order.sql())
        }
    }
}

/// One page of matches.
pub fn select_query(c: &SearchCriteria) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {LISTING_COLUMNS} FROM listings"));
    push_filters(&mut qb, c);
    qb.push(format!(" ORDER BY {}", order_clause(c.sort, c.order)));
    qb.push(" LIMIT ").push_bind(c.page_limit());
    qb.push(" OFFSET ").push_bind(c.page_offset());
    qb
}

/// Total match count over the same filters, before pagination.
pub fn count_query(c: &SearchCriteria) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM listings");
    push_filters(&mut qb, c);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_clause(criteria: &SearchCriteria) -> String {
        let mut qb = QueryBuilder::new("");
        push_filters(&mut qb, criteria);
        qb.sql().to_string()
    }

    #[test]
    fn default_criteria_only_excludes_upcoming() {
        let sql = where_clause(&SearchCriteria::default());
        assert_eq!(sql, " WHERE is_upcoming = FALSE");
    }

    #[test]
    fn upcoming_exclusion_is_always_first() {
        let criteria = SearchCriteria {
            search_term: "villa".into(),
            offer: true,
            ..Default::default()
        };
        assert!(where_clause(&criteria).starts_with(" WHERE is_upcoming = FALSE AND "));
    }

    #[test]
    fn boolean_filters_constrain_only_when_set() {
        let on = SearchCriteria {
            parking: true,
            furnished: true,
            offer: true,
            ..Default::default()
        };
        let sql = where_clause(&on);
        assert!(sql.contains("parking = TRUE"));
        assert!(sql.contains("furnished = TRUE"));
        assert!(sql.contains("offer = TRUE"));

        let off = SearchCriteria::default();
        let sql = where_clause(&off);
        assert!(!sql.contains("parking"));
        assert!(!sql.contains("furnished"));
        assert!(!sql.contains("offer"));
    }

    #[test]
    fn search_term_binds_instead_of_splicing() {
        let criteria = SearchCriteria {
            search_term: "'; DROP TABLE listings; --".into(),
            ..Default::default()
        };
        let sql = where_clause(&criteria);
        assert!(sql.contains("name ILIKE $1"));
        assert!(!sql.contains("DROP TABLE"));
    }

    #[test]
    fn full_criteria_produce_expected_sql() {
        let criteria = SearchCriteria {
            search_term: "sea view".into(),
            kind: TypeFilter::Sale,
            city: CityFilter::Only(City::Mumbai),
            bedrooms: BedroomsFilter::AtLeast(4),
            parking: true,
            furnished: true,
            offer: true,
            sort: SortField::RegularPrice,
            order: SortOrder::Asc,
            limit: 9,
            start_index: 18,
        };
        let sql = select_query(&criteria).sql().to_string();
        assert!(sql.starts_with(&format!("SELECT {LISTING_COLUMNS} FROM listings")));
        assert!(sql.contains(
            "WHERE is_upcoming = FALSE AND name ILIKE $1 AND type = $2 AND city = $3 \
             AND bedrooms >= $4 AND parking = TRUE AND furnished = TRUE AND offer = TRUE"
        ));
        assert!(sql.ends_with(
            "ORDER BY regular_price ASC, created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ));
    }

    #[test]
    fn count_query_shares_filters_without_pagination() {
        let criteria = SearchCriteria {
            kind: TypeFilter::Rent,
            ..Default::default()
        };
        let sql = count_query(&criteria).sql().to_string();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM listings WHERE is_upcoming = FALSE AND type = $1"
        );
    }

    #[test]
    fn created_at_sort_breaks_ties_on_id_only() {
        assert_eq!(
            order_clause(SortField::CreatedAt, SortOrder::Desc),
            "created_at DESC, id DESC"
        );
        assert_eq!(
            order_clause(SortField::CreatedAt, SortOrder::Asc),
            "created_at ASC, id DESC"
        );
        assert_eq!(
            order_clause(SortField::RegularPrice, SortOrder::Desc),
            "regular_price DESC, created_at DESC, id DESC"
        );
    }

    #[test]
    fn page_limit_clamps_into_allowed_range() {
        let mut criteria = SearchCriteria::default();
        assert_eq!(criteria.page_limit(), DEFAULT_LIMIT);

        criteria.limit = 0;
        assert_eq!(criteria.page_limit(), 1);
        criteria.limit = -7;
        assert_eq!(criteria.page_limit(), 1);
        criteria.limit = 500;
        assert_eq!(criteria.page_limit(), MAX_LIMIT);
        criteria.limit = 50;
        assert_eq!(criteria.page_limit(), 50);
    }

    #[test]
    fn negative_start_index_reads_as_zero() {
        let criteria = SearchCriteria {
            start_index: -10,
            ..Default::default()
        };
        assert_eq!(criteria.page_offset(), 0);
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("flat"), "%flat%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn deserializes_the_browse_page_query_string() {
        let criteria: SearchCriteria = serde_urlencoded::from_str(
            "searchTerm=beach&type=rent&parking=true&furnished=false&offer=false\
             &sort=regularPrice&order=asc&bedrooms=4&city=Mumbai&limit=9&startIndex=18",
        )
        .unwrap();
        assert_eq!(criteria.search_term, "beach");
        assert_eq!(criteria.kind, TypeFilter::Rent);
        assert_eq!(criteria.city, CityFilter::Only(City::Mumbai));
        assert_eq!(criteria.bedrooms, BedroomsFilter::AtLeast(4));
        assert!(criteria.parking);
        assert!(!criteria.furnished);
        assert!(!criteria.offer);
        assert_eq!(criteria.sort, SortField::RegularPrice);
        assert_eq!(criteria.order, SortOrder::Asc);
        assert_eq!(criteria.limit, 9);
        assert_eq!(criteria.start_index, 18);
    }

    #[test]
    fn empty_query_string_is_the_front_page() {
        let criteria: SearchCriteria = serde_urlencoded::from_str("").unwrap();
        assert_eq!(criteria.search_term, "");
        assert_eq!(criteria.kind, TypeFilter::All);
        assert_eq!(criteria.city, CityFilter::All);
        assert_eq!(criteria.bedrooms, BedroomsFilter::Any);
        assert_eq!(criteria.sort, SortField::CreatedAt);
        assert_eq!(criteria.order, SortOrder::Desc);
        assert_eq!(criteria.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn all_sentinels_disable_their_filters() {
        let criteria: SearchCriteria =
            serde_urlencoded::from_str("type=all&city=all&bedrooms=all").unwrap();
        assert_eq!(criteria.kind, TypeFilter::All);
        assert_eq!(criteria.city, CityFilter::All);
        assert_eq!(criteria.bedrooms, BedroomsFilter::Any);
    }

    #[test]
    fn exact_bedroom_counts_stay_exact_below_the_cap() {
        let criteria: SearchCriteria = serde_urlencoded::from_str("bedrooms=2").unwrap();
        assert_eq!(criteria.bedrooms, BedroomsFilter::Exactly(2));

        let criteria: SearchCriteria = serde_urlencoded::from_str("bedrooms=7").unwrap();
        assert_eq!(criteria.bedrooms, BedroomsFilter::AtLeast(4));
    }

    #[test]
    fn unknown_city_is_rejected() {
        let result = serde_urlencoded::from_str::<SearchCriteria>("city=Atlantis");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let result = serde_urlencoded::from_str::<SearchCriteria>("sort=password_hash");
        assert!(result.is_err());
    }

    #[test]
    fn legacy_snake_case_sort_alias_still_works() {
        let criteria: SearchCriteria = serde_urlencoded::from_str("sort=created_at").unwrap();
        assert_eq!(criteria.sort, SortField::CreatedAt);
    }
}
