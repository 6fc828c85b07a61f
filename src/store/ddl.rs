//! Table DDL and database bootstrap.

use crate::error::{AppError, ConfigError};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

const DEVELOPERS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS developers (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL UNIQUE,
        slug TEXT,
        years_of_experience DOUBLE PRECISION NOT NULL,
        max_team_size INTEGER NOT NULL,
        experience_level TEXT NOT NULL,
        ratings_average DOUBLE PRECISION NOT NULL DEFAULT 4.5,
        ratings_quantity INTEGER NOT NULL DEFAULT 0,
        hourly_rate DOUBLE PRECISION NOT NULL,
        price_discount DOUBLE PRECISION,
        summary TEXT NOT NULL,
        description TEXT,
        profile_photo TEXT NOT NULL,
        images TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        start_dates TIMESTAMPTZ[] NOT NULL DEFAULT '{}',
        secret BOOLEAN NOT NULL DEFAULT FALSE,
        version BIGINT NOT NULL DEFAULT 0
    )
"#;

const USERS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username TEXT,
        email TEXT NOT NULL UNIQUE,
        photo TEXT,
        password TEXT NOT NULL,
        version BIGINT NOT NULL DEFAULT 0
    )
"#;

/// Create the `developers` and `users` tables if they do not exist.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(DEVELOPERS_DDL).execute(pool).await?;
    sqlx::query(USERS_DDL).execute(pool).await?;
    // Older databases predate the revision counter.
    for table in ["developers", "users"] {
        let alter = format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS version BIGINT NOT NULL DEFAULT 0",
            table
        );
        sqlx::query(&alter).execute(pool).await?;
    }
    sqlx::query("ALTER TABLE users ALTER COLUMN username DROP NOT NULL")
        .execute(pool)
        .await?;
    tracing::debug!("tables ensured");
    Ok(())
}

/// If the database in `database_url` does not exist, create it by connecting to the
/// `postgres` maintenance database on the same server.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|_| ConfigError::Invalid {
        var: "DATABASE_URL",
        value: redact(database_url),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

/// Split a connection URL into (maintenance URL, database name).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let slash = url[scheme_end..]
        .find('/')
        .map(|i| i + scheme_end)
        .ok_or_else(|| ConfigError::Invalid {
            var: "DATABASE_URL",
            value: redact(url),
        })?;
    let path_and_query = &url[slash + 1..];
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let mut admin_url = format!("{}postgres", &url[..slash + 1]);
    if let Some(q) = query {
        admin_url.push('?');
        admin_url.push_str(q);
    }
    Ok((admin_url, db_name.to_string()))
}

/// Drop credentials from a URL before it reaches logs or errors.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}***{}", &url[..scheme + 3], &url[at..]),
        _ => url.to_string(),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntitySchema, NewDeveloper, NewUser, DEVELOPER_SCHEMA, USER_SCHEMA};
    use crate::sql::FieldValue;
    use serde_json::json;

    /// Column name -> definition, one per line of a `CREATE TABLE`.
    fn column_defs(ddl: &str) -> Vec<(&str, &str)> {
        ddl.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("CREATE") && !l.starts_with(')'))
            .filter_map(|l| l.split_once(' '))
            .collect()
    }

    fn assert_nulls_accepted(ddl: &str, schema: &EntitySchema, fields: &[(&'static str, FieldValue)]) {
        let defs = column_defs(ddl);
        for col in schema.columns {
            assert!(
                defs.iter().any(|(name, _)| *name == col.column()),
                "{} missing from {}",
                col.column(),
                schema.table
            );
        }
        for (field, value) in fields {
            let column = schema.any_field(field).unwrap().column();
            let (_, def) = defs.iter().find(|(name, _)| *name == column).unwrap();
            if *value == FieldValue::Null {
                assert!(!def.contains("NOT NULL"), "{}.{} rejects NULL", schema.table, column);
            }
        }
    }

    #[test]
    fn users_table_accepts_minimal_signup() {
        let record = serde_json::from_value::<NewUser>(json!({
            "email": "a@b.com",
            "password": "12345678",
            "passwordConfirmation": "12345678"
        }))
        .unwrap()
        .validate()
        .unwrap();
        let fields = record.fields("hash");
        assert!(fields.contains(&("username", FieldValue::Null)));
        assert_nulls_accepted(USERS_DDL, &USER_SCHEMA, &fields);
    }

    #[test]
    fn developers_table_accepts_minimal_developer() {
        let record = serde_json::from_value::<NewDeveloper>(json!({
            "name": "Minimal Dev",
            "yearsOfExperience": 1,
            "maxTeamSize": 1,
            "experienceLevel": "Novice",
            "hourlyRate": 10,
            "summary": "s",
            "profilePhoto": "p.jpg"
        }))
        .unwrap()
        .validate()
        .unwrap();
        assert_nulls_accepted(DEVELOPERS_DDL, &DEVELOPER_SCHEMA, &record.fields());
    }

    #[rstest::rstest]
    #[case(DEVELOPERS_DDL, "max_team_size")]
    #[case(DEVELOPERS_DDL, "ratings_quantity")]
    fn int_columns_are_int4(#[case] ddl: &str, #[case] column: &str) {
        let (_, def) = column_defs(ddl).into_iter().find(|(name, _)| *name == column).unwrap();
        assert!(def.starts_with("INTEGER"));
    }

    #[test]
    fn splits_database_name_and_keeps_query() {
        let (admin, name) = parse_db_name_from_url("postgres://app:pw@db:5432/devcatalog?sslmode=disable").unwrap();
        assert_eq!(name, "devcatalog");
        assert_eq!(admin, "postgres://app:pw@db:5432/postgres?sslmode=disable");
    }

    #[test]
    fn url_without_path_is_invalid() {
        assert!(parse_db_name_from_url("postgres://localhost").is_err());
    }

    #[test]
    fn redacts_credentials() {
        assert_eq!(redact("postgres://app:pw@db/devcatalog"), "postgres://***@db/devcatalog");
        assert_eq!(redact("postgres://localhost/devcatalog"), "postgres://localhost/devcatalog");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("dev\"catalog"), "\"dev\"\"catalog\"");
    }
}
