//! Field names are camelCase on the wire and snake_case in PostgreSQL.

/// `ratings_average` -> `ratingsAverage`
pub fn to_camel_case(column: &str) -> String {
    let mut parts = column.split('_').filter(|p| !p.is_empty());
    let mut out: String = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `ratingsAverage` -> `ratings_average`
pub fn to_snake_case(field: &str) -> String {
    field.chars().fold(String::with_capacity(field.len() + 4), |mut out, c| {
        if c.is_uppercase() && !out.is_empty() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        out
    })
}
