//! Developer: the catalog item. Schema, validation, slug and derived fields.

use crate::error::AppError;
use crate::model::dates;
use crate::model::schema::{ColumnDef, ColumnKind, EntitySchema};
use crate::service::validation::Violations;
use crate::sql::FieldValue;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub static DEVELOPER_SCHEMA: EntitySchema = EntitySchema {
    table: "developers",
    columns: &[
        ColumnDef::new("id", ColumnKind::Uuid),
        ColumnDef::new("name", ColumnKind::Text),
        ColumnDef::new("slug", ColumnKind::Text),
        ColumnDef::new("yearsOfExperience", ColumnKind::Float),
        ColumnDef::new("maxTeamSize", ColumnKind::Int),
        ColumnDef::new("experienceLevel", ColumnKind::Text),
        ColumnDef::new("ratingsAverage", ColumnKind::Float),
        ColumnDef::new("ratingsQuantity", ColumnKind::Int),
        ColumnDef::new("hourlyRate", ColumnKind::Float),
        ColumnDef::new("priceDiscount", ColumnKind::Float),
        ColumnDef::new("summary", ColumnKind::Text),
        ColumnDef::new("description", ColumnKind::Text),
        ColumnDef::new("profilePhoto", ColumnKind::Text),
        ColumnDef::new("images", ColumnKind::TextArray),
        ColumnDef::new("createdAt", ColumnKind::Timestamp),
        ColumnDef::new("startDates", ColumnKind::TimestampArray),
        ColumnDef::new("secret", ColumnKind::Bool),
    ],
    visibility: Some("secret IS NOT TRUE"),
    default_sort: Some("createdAt"),
};

pub const DEFAULT_RATING: f64 = 4.5;
pub const NAME_MIN: usize = 5;
pub const NAME_MAX: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Novice,
    Proficient,
    Expert,
}

impl ExperienceLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Novice" => Some(ExperienceLevel::Novice),
            "Proficient" => Some(ExperienceLevel::Proficient),
            "Expert" => Some(ExperienceLevel::Expert),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Novice => "Novice",
            ExperienceLevel::Proficient => "Proficient",
            ExperienceLevel::Expert => "Expert",
        }
    }
}

/// Create body as sent by the client; everything optional until validated.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeveloper {
    pub name: Option<String>,
    pub years_of_experience: Option<f64>,
    pub max_team_size: Option<i32>,
    pub experience_level: Option<String>,
    pub ratings_average: Option<f64>,
    pub ratings_quantity: Option<i32>,
    pub hourly_rate: Option<f64>,
    pub price_discount: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "dates::deserialize_list")]
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret: Option<bool>,
}

/// A validated developer ready to insert.
#[derive(Clone, Debug, PartialEq)]
pub struct DeveloperRecord {
    pub name: String,
    pub slug: String,
    pub years_of_experience: f64,
    pub max_team_size: i32,
    pub experience_level: ExperienceLevel,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub hourly_rate: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub profile_photo: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret: bool,
}

fn check_name(v: &mut Violations, name: &str) {
    v.length(
        "name",
        name,
        NAME_MIN,
        NAME_MAX,
        "A Developer name must have more or equal than 5 characters",
        "A Developer name must have less or equal than 40 characters",
    );
}

fn check_level(v: &mut Violations, raw: &str) -> Option<ExperienceLevel> {
    let level = ExperienceLevel::parse(raw);
    if level.is_none() {
        v.push("experienceLevel", "Experience level is either: Novice, Proficient, or Expert");
    }
    level
}

fn check_rating(v: &mut Violations, rating: f64) {
    v.range("ratingsAverage", rating, 1.0, 5.0, "Rating must be above 1.0", "Rating must be below 5.0");
}

fn check_discount(v: &mut Violations, discount: f64, hourly_rate: Option<f64>) {
    let below = hourly_rate.is_some_and(|rate| discount < rate);
    if !below {
        v.push(
            "priceDiscount",
            format!("Discount price {} should be below regular price", discount),
        );
    }
}

impl NewDeveloper {
    /// Check every constraint, fill defaults and derive the slug.
    pub fn validate(self) -> Result<DeveloperRecord, AppError> {
        let mut v = Violations::new();
        let name = v.require_text("name", self.name.as_deref(), "A Developer must have a name");
        if let Some(name) = &name {
            check_name(&mut v, name);
        }
        let years = v.require(
            "yearsOfExperience",
            self.years_of_experience,
            "A Developer must have years of experience listed",
        );
        let team = v.require("maxTeamSize", self.max_team_size, "Developer must have a team size");
        let level = v
            .require_text("experienceLevel", self.experience_level.as_deref(), "Experience level is required")
            .and_then(|raw| check_level(&mut v, &raw));
        let rating = self.ratings_average.unwrap_or(DEFAULT_RATING);
        check_rating(&mut v, rating);
        let rate = v.require("hourlyRate", self.hourly_rate, "A Developer must have an hourly rate");
        if let Some(discount) = self.price_discount {
            check_discount(&mut v, discount, rate);
        }
        let summary = v.require_text("summary", self.summary.as_deref(), "Developer must have a summary");
        let photo = v.require_text(
            "profilePhoto",
            self.profile_photo.as_deref(),
            "A developer must have a profile photo",
        );

        match (name, years, team, level, rate, summary, photo) {
            (Some(name), Some(years), Some(team), Some(level), Some(rate), Some(summary), Some(photo))
                if v.is_empty() =>
            {
                Ok(DeveloperRecord {
                    slug: slugify(&name),
                    name,
                    years_of_experience: years,
                    max_team_size: team,
                    experience_level: level,
                    ratings_average: rating,
                    ratings_quantity: self.ratings_quantity.unwrap_or(0),
                    hourly_rate: rate,
                    price_discount: self.price_discount,
                    summary,
                    description: trimmed(self.description),
                    profile_photo: photo,
                    images: self.images,
                    start_dates: self.start_dates,
                    secret: self.secret.unwrap_or(false),
                })
            }
            _ => {
                v.finish()?;
                Err(AppError::Internal("validated developer is incomplete".into()))
            }
        }
    }
}

impl DeveloperRecord {
    /// Column values in insert order, keyed by API field name.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", FieldValue::Text(self.name.clone())),
            ("slug", FieldValue::Text(self.slug.clone())),
            ("yearsOfExperience", FieldValue::Float(self.years_of_experience)),
            ("maxTeamSize", FieldValue::Int(self.max_team_size.into())),
            ("experienceLevel", FieldValue::Text(self.experience_level.as_str().into())),
            ("ratingsAverage", FieldValue::Float(self.ratings_average)),
            ("ratingsQuantity", FieldValue::Int(self.ratings_quantity.into())),
            ("hourlyRate", FieldValue::Float(self.hourly_rate)),
            ("priceDiscount", self.price_discount.into()),
            ("summary", FieldValue::Text(self.summary.clone())),
            ("description", self.description.clone().into()),
            ("profilePhoto", FieldValue::Text(self.profile_photo.clone())),
            ("images", FieldValue::TextList(self.images.clone())),
            ("startDates", FieldValue::TimestampList(self.start_dates.clone())),
            ("secret", FieldValue::Bool(self.secret)),
        ]
    }
}

/// Partial update body. Absent fields are left untouched; the slug is not re-derived.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperPatch {
    pub name: Option<String>,
    pub years_of_experience: Option<f64>,
    pub max_team_size: Option<i32>,
    pub experience_level: Option<String>,
    pub ratings_average: Option<f64>,
    pub ratings_quantity: Option<i32>,
    pub hourly_rate: Option<f64>,
    pub price_discount: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub profile_photo: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_list")]
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub secret: Option<bool>,
}

impl DeveloperPatch {
    /// Validate the fields present. `current_rate` is the stored hourly rate,
    /// used for the discount check when the patch does not change it.
    pub fn validate(mut self, current_rate: Option<f64>) -> Result<Self, AppError> {
        let mut v = Violations::new();
        if let Some(raw) = self.name.take() {
            let name = raw.trim().to_string();
            check_name(&mut v, &name);
            self.name = Some(name);
        }
        if let Some(raw) = &self.experience_level {
            check_level(&mut v, raw);
        }
        if let Some(rating) = self.ratings_average {
            check_rating(&mut v, rating);
        }
        if let Some(discount) = self.price_discount {
            check_discount(&mut v, discount, self.hourly_rate.or(current_rate));
        }
        if let Some(raw) = self.summary.take() {
            self.summary = v.require_text("summary", Some(raw.as_str()), "Developer must have a summary");
        }
        if let Some(raw) = self.profile_photo.take() {
            self.profile_photo = v.require_text("profilePhoto", Some(raw.as_str()), "A developer must have a profile photo");
        }
        self.description = trimmed(self.description);
        v.finish()?;
        Ok(self)
    }

    /// Present fields only, keyed by API field name.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut out = Vec::new();
        if let Some(s) = &self.name {
            out.push(("name", FieldValue::Text(s.clone())));
        }
        if let Some(n) = self.years_of_experience {
            out.push(("yearsOfExperience", FieldValue::Float(n)));
        }
        if let Some(n) = self.max_team_size {
            out.push(("maxTeamSize", FieldValue::Int(n.into())));
        }
        if let Some(s) = &self.experience_level {
            out.push(("experienceLevel", FieldValue::Text(s.clone())));
        }
        if let Some(n) = self.ratings_average {
            out.push(("ratingsAverage", FieldValue::Float(n)));
        }
        if let Some(n) = self.ratings_quantity {
            out.push(("ratingsQuantity", FieldValue::Int(n.into())));
        }
        if let Some(n) = self.hourly_rate {
            out.push(("hourlyRate", FieldValue::Float(n)));
        }
        if let Some(n) = self.price_discount {
            out.push(("priceDiscount", FieldValue::Float(n)));
        }
        if let Some(s) = &self.summary {
            out.push(("summary", FieldValue::Text(s.clone())));
        }
        if let Some(s) = &self.description {
            out.push(("description", FieldValue::Text(s.clone())));
        }
        if let Some(s) = &self.profile_photo {
            out.push(("profilePhoto", FieldValue::Text(s.clone())));
        }
        if let Some(v) = &self.images {
            out.push(("images", FieldValue::TextList(v.clone())));
        }
        if let Some(v) = &self.start_dates {
            out.push(("startDates", FieldValue::TimestampList(v.clone())));
        }
        if let Some(b) = self.secret {
            out.push(("secret", FieldValue::Bool(b)));
        }
        out
    }
}

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Lowercase, alphanumerics kept, every other run collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Add `durationWeeks` (years of experience / 7) when the document carries the source field.
pub fn add_derived_fields(doc: &mut Map<String, Value>) {
    let weeks = doc
        .get("yearsOfExperience")
        .and_then(Value::as_f64)
        .and_then(|years| serde_json::Number::from_f64(years / 7.0));
    if let Some(weeks) = weeks {
        doc.insert("durationWeeks".into(), Value::Number(weeks));
    }
}

/// One row of the grouped statistics report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    /// Upper-cased experience level.
    pub level: String,
    pub num_developers: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// One month of the yearly plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub month: i32,
    pub num_developer_starts: i64,
    pub developers: Vec<String>,
}

/// Ratings at or above this are included in the statistics report.
pub const STATS_MIN_RATING: f64 = 4.5;
/// The plan never has more groups than months in a year.
pub const PLAN_MAX_GROUPS: i64 = 12;

/// `[Jan 1 of year, Jan 1 of year + 1)` in UTC.
pub fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn complete() -> NewDeveloper {
        NewDeveloper {
            name: Some("  Ada Lovelace  ".into()),
            years_of_experience: Some(14.0),
            max_team_size: Some(8),
            experience_level: Some("Expert".into()),
            hourly_rate: Some(120.0),
            summary: Some(" Analytical engines ".into()),
            profile_photo: Some("ada.jpg".into()),
            ..Default::default()
        }
    }

    fn messages(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.message).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn fills_defaults_and_slug() {
        let record = complete().validate().unwrap();
        assert_eq!(record.name, "Ada Lovelace");
        assert_eq!(record.slug, "ada-lovelace");
        assert_eq!(record.summary, "Analytical engines");
        assert_eq!(record.ratings_average, DEFAULT_RATING);
        assert_eq!(record.ratings_quantity, 0);
        assert!(!record.secret);
    }

    #[test]
    fn reports_every_missing_field() {
        let msgs = messages(NewDeveloper::default().validate().unwrap_err());
        assert!(msgs.contains(&"A Developer must have a name".to_string()));
        assert!(msgs.contains(&"A Developer must have an hourly rate".to_string()));
        assert!(msgs.contains(&"A developer must have a profile photo".to_string()));
        assert_eq!(msgs.len(), 7);
    }

    #[rstest]
    #[case("Ada", "A Developer name must have more or equal than 5 characters")]
    #[case(&"x".repeat(41), "A Developer name must have less or equal than 40 characters")]
    fn enforces_name_length(#[case] name: &str, #[case] message: &str) {
        let dev = NewDeveloper {
            name: Some(name.into()),
            ..complete()
        };
        assert_eq!(messages(dev.validate().unwrap_err()), vec![message.to_string()]);
    }

    #[test]
    fn rejects_unknown_level_and_bad_rating() {
        let dev = NewDeveloper {
            experience_level: Some("Wizard".into()),
            ratings_average: Some(5.5),
            ..complete()
        };
        assert_eq!(
            messages(dev.validate().unwrap_err()),
            vec![
                "Experience level is either: Novice, Proficient, or Expert".to_string(),
                "Rating must be below 5.0".to_string(),
            ]
        );
    }

    #[test]
    fn discount_must_be_below_rate() {
        let ok = NewDeveloper {
            price_discount: Some(100.0),
            ..complete()
        };
        assert!(ok.validate().is_ok());

        let bad = NewDeveloper {
            price_discount: Some(150.0),
            ..complete()
        };
        assert_eq!(
            messages(bad.validate().unwrap_err()),
            vec!["Discount price 150 should be below regular price".to_string()]
        );
    }

    #[test]
    fn patch_checks_discount_against_stored_rate() {
        let patch = DeveloperPatch {
            price_discount: Some(90.0),
            ..Default::default()
        };
        assert!(patch.clone().validate(Some(100.0)).is_ok());
        assert!(patch.validate(Some(80.0)).is_err());
    }

    #[test]
    fn patch_lists_only_present_fields() {
        let patch = DeveloperPatch {
            hourly_rate: Some(99.0),
            secret: Some(true),
            ..Default::default()
        };
        let names: Vec<_> = patch.fields().into_iter().map(|(f, _)| f).collect();
        assert_eq!(names, vec!["hourlyRate", "secret"]);
    }

    #[rstest]
    #[case("Ada Lovelace", "ada-lovelace")]
    #[case("  The Rust -- Whisperer! ", "the-rust-whisperer")]
    #[case("Grace Hopper 2", "grace-hopper-2")]
    fn slugifies(#[case] name: &str, #[case] slug: &str) {
        assert_eq!(slugify(name), slug);
    }

    #[test]
    fn derives_duration_weeks() {
        let mut doc = Map::new();
        doc.insert("yearsOfExperience".into(), Value::from(14.0));
        add_derived_fields(&mut doc);
        assert_eq!(doc["durationWeeks"], Value::from(2.0));

        let mut projected = Map::new();
        add_derived_fields(&mut projected);
        assert!(!projected.contains_key("durationWeeks"));
    }

    #[test]
    fn year_bounds_cover_the_whole_year() {
        let (start, end) = year_bounds(2024).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert!(year_bounds(i32::MAX).is_none());
    }

    #[test]
    fn parses_start_dates_from_body() {
        let dev: NewDeveloper = serde_json::from_value(serde_json::json!({
            "name": "Linus Builder",
            "startDates": ["2024-03-21,10:00", "2024-07-01"]
        }))
        .unwrap();
        assert_eq!(dev.start_dates.len(), 2);
    }
}
