//! Handle and location-code derivation
//!
//! Pure functions over the positional attributes of a group (zone, aisle,
//! group/bay, shelf). Nothing here touches the store.
//!
//! | zone | aisle | group | shelf | handle        | location code |
//! |------|-------|-------|-------|---------------|---------------|
//! | `A`  | 3     | 5     | 2     | `a-03-05-2`   | `A03-05-2`    |
//! | `A`  | 3     | -     | 2     | `a-03-2`      | `A03-2`       |
//! | `B`  | -     | 12    | -     | `b-12`        | `B-12`        |
//! | -    | 4     | -     | -     | `04`          | -             |

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Handle used when neither positional fields nor a type are available
pub const DEFAULT_HANDLE: &str = "group";

// Fixed-width location code: zone, 2-digit aisle, `-`2-digit group, `-`shelf
const LOCATION_CODE_PATTERN: &str =
    r"^(?P<zone>[^-]+?)(?P<aisle>\d{2})?(?:-(?P<group>\d{2}))?(?:-(?P<shelf>\d+))?$";

/// Components recovered from a location code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLocationCode {
    pub zone_code: Option<String>,
    pub aisle_number: Option<u32>,
    pub group_number: Option<u32>,
    pub shelf_number: Option<u32>,
}

/// Lower-case, URL-safe slug: alphanumeric runs joined by single `-`
///
/// ```
/// # use stocktree_core::utils::slugify;
/// assert_eq!(slugify("Cold Storage / Bay 2"), "cold-storage-bay-2");
/// assert_eq!(slugify("  --  "), "");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Derive a handle from positional attributes
///
/// Present fields are joined with `-`: zone lower-cased, aisle and group
/// zero-padded to two digits, shelf as-is. Falls back to the slugified type,
/// then to `"group"`. Never fails.
///
/// ```
/// # use stocktree_core::utils::generate_handle;
/// assert_eq!(generate_handle(Some("shelf"), Some("A"), Some(3), None, Some(2)), "a-03-2");
/// assert_eq!(generate_handle(None, None, None, None, None), "group");
/// ```
pub fn generate_handle(
    group_type: Option<&str>,
    zone_code: Option<&str>,
    aisle_number: Option<u32>,
    group_number: Option<u32>,
    shelf_number: Option<u32>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    if let Some(zone) = non_blank(zone_code) {
        let zone = slugify(zone);
        if !zone.is_empty() {
            parts.push(zone);
        }
    }
    if let Some(aisle) = aisle_number {
        parts.push(format!("{:02}", aisle));
    }
    if let Some(group) = group_number {
        parts.push(format!("{:02}", group));
    }
    if let Some(shelf) = shelf_number {
        parts.push(shelf.to_string());
    }

    if !parts.is_empty() {
        return parts.join("-");
    }

    match non_blank(group_type).map(slugify) {
        Some(slug) if !slug.is_empty() => slug,
        _ => DEFAULT_HANDLE.to_string(),
    }
}

/// Whether any positional attribute is present
pub fn has_position(
    zone_code: Option<&str>,
    aisle_number: Option<u32>,
    group_number: Option<u32>,
    shelf_number: Option<u32>,
) -> bool {
    non_blank(zone_code).is_some()
        || aisle_number.is_some()
        || group_number.is_some()
        || shelf_number.is_some()
}

/// Build the human-readable location code
///
/// Returns `None` without a zone. Otherwise `ZONE` + `AA`, then `-GG`, then
/// `-S`, skipping absent segments. The code is not guaranteed unique.
///
/// ```
/// # use stocktree_core::utils::generate_location_code;
/// assert_eq!(generate_location_code(Some("A"), Some(3), Some(5), Some(2)).as_deref(), Some("A03-05-2"));
/// assert_eq!(generate_location_code(Some("B"), None, Some(12), None).as_deref(), Some("B-12"));
/// assert_eq!(generate_location_code(None, Some(3), None, None), None);
/// ```
pub fn generate_location_code(
    zone_code: Option<&str>,
    aisle_number: Option<u32>,
    group_number: Option<u32>,
    shelf_number: Option<u32>,
) -> Option<String> {
    let zone = non_blank(zone_code)?;

    let mut code = zone.to_string();
    if let Some(aisle) = aisle_number {
        code.push_str(&format!("{:02}", aisle));
    }
    if let Some(group) = group_number {
        code.push_str(&format!("-{:02}", group));
    }
    if let Some(shelf) = shelf_number {
        code.push_str(&format!("-{}", shelf));
    }

    Some(code)
}

/// Best-effort inverse of [`generate_location_code`]
///
/// Uses fixed-width positional matching: the two digits directly after the
/// zone are the aisle, a two-digit dash segment is the group, and the last
/// dash segment is the shelf. Anything it cannot confidently extract comes
/// back as `None`. Never fails.
///
/// Round-trips exactly when the zone is non-blank and dash-free and aisle and
/// group are below 100.
pub fn parse_location_code(code: &str) -> ParsedLocationCode {
    let code = code.trim();
    if code.is_empty() {
        return ParsedLocationCode::default();
    }

    static LOCATION_CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    let pattern =
        LOCATION_CODE_REGEX.get_or_init(|| Regex::new(LOCATION_CODE_PATTERN).unwrap());

    let Some(caps) = pattern.captures(code) else {
        // Unrecognized tail: keep only the leading zone segment
        let zone = code.split('-').next().map(str::trim).unwrap_or_default();
        return ParsedLocationCode {
            zone_code: (!zone.is_empty()).then(|| zone.to_string()),
            ..Default::default()
        };
    };

    let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());

    ParsedLocationCode {
        zone_code: caps.name("zone").map(|m| m.as_str().to_string()),
        aisle_number: number("aisle"),
        group_number: number("group"),
        shelf_number: number("shelf"),
    }
}
