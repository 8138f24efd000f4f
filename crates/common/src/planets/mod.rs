//! Planet domain rules
//!
//! Pure validation and update logic. Nothing in here talks to the store or
//! to the enrichment upstream, so it can be exercised without either.

use serde_json::{Map, Value};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

pub use crate::db::models::Planet;
use crate::errors::{AppError, FieldError, Result, ValidationFailure};

/// Fields a client may change through an update
pub const UPDATABLE_FIELDS: [&str; 3] = ["name", "climate", "terrain"];

/// Page size used when the client does not pass `limit`
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Largest `limit`/`skip` a SQL store can bind (a signed 64-bit parameter)
pub const MAX_PAGE_COUNT: u64 = i64::MAX as u64;

/// Case and accent insensitive key used for uniqueness and name lookups
pub fn fold_name(name: &str) -> String {
    fold_fragment(name.trim())
}

/// Fold a search fragment without trimming; its whitespace takes part in the match
pub fn fold_fragment(fragment: &str) -> String {
    fragment
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Parse a client supplied planet id. Malformed ids yield `None`.
pub fn parse_planet_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Read a body value as trimmed text. Scalars are coerced, containers are rejected.
fn read_text(value: Option<&Value>) -> std::result::Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::Bool(flag)) => Ok(flag.to_string()),
        Some(other) => Err(other.to_string()),
    }
}

/// Candidate field values for a planet, trimmed but not yet known to be valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct PlanetDraft {
    #[validate(length(min = 1, code = "required", message = "Path `name` is required."))]
    pub name: String,

    #[validate(length(min = 1, code = "required", message = "Path `climate` is required."))]
    pub climate: String,

    #[validate(length(min = 1, code = "required", message = "Path `terrain` is required."))]
    pub terrain: String,

    cast_errors: Vec<FieldError>,
}

impl PlanetDraft {
    pub fn new(name: &str, climate: &str, terrain: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            climate: climate.trim().to_string(),
            terrain: terrain.trim().to_string(),
            cast_errors: Vec::new(),
        }
    }

    /// Build a draft from a JSON body. Keys other than the planet fields are ignored.
    pub fn from_body(body: &Map<String, Value>) -> Self {
        let mut draft = Self::default();
        for field in UPDATABLE_FIELDS {
            let text = match read_text(body.get(field)) {
                Ok(text) => text,
                Err(raw) => {
                    draft.cast_errors.push(FieldError::cast(field, raw));
                    String::new()
                }
            };
            match field {
                "name" => draft.name = text,
                "climate" => draft.climate = text,
                _ => draft.terrain = text,
            }
        }
        draft
    }

    /// Every field-level problem with this draft
    pub fn check(&self) -> ValidationFailure {
        let mut failure = ValidationFailure::new();
        for error in &self.cast_errors {
            failure.push(error.clone());
        }
        if let Err(errors) = self.validate() {
            failure.merge(from_validator(&errors));
        }
        failure
    }

    /// Whether persisting this draft over `current` changes the name
    pub fn renames(&self, current: &Planet) -> bool {
        self.name != current.name
    }

    pub fn name_key(&self) -> String {
        fold_name(&self.name)
    }
}

fn from_validator(errors: &ValidationErrors) -> ValidationFailure {
    let mut failure = ValidationFailure::new();
    for (field, field_errors) in errors.field_errors() {
        let path = field.to_string();
        for error in field_errors.iter() {
            if error.code == "required" {
                failure.push(FieldError::required(&path));
            } else {
                failure.push(FieldError {
                    kind: error.code.to_string(),
                    path: path.clone(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Validator failed for path `{}`", path)),
                    value: None,
                });
            }
        }
    }
    failure
}

/// Partial update restricted to [`UPDATABLE_FIELDS`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanetPatch {
    name: Option<Value>,
    climate: Option<Value>,
    terrain: Option<Value>,
}

impl PlanetPatch {
    /// Accept the body only if every key is updatable; nothing is applied otherwise.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self> {
        if !body.keys().all(|key| UPDATABLE_FIELDS.contains(&key.as_str())) {
            return Err(AppError::InvalidUpdates);
        }

        Ok(Self {
            name: body.get("name").cloned(),
            climate: body.get("climate").cloned(),
            terrain: body.get("terrain").cloned(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.climate.is_none() && self.terrain.is_none()
    }

    /// Merge the patch over the stored record
    pub fn apply(&self, current: &Planet) -> PlanetDraft {
        let pick = |patched: &Option<Value>, stored: &str| {
            patched
                .clone()
                .unwrap_or_else(|| Value::String(stored.to_string()))
        };

        let mut body = Map::new();
        body.insert("name".to_string(), pick(&self.name, &current.name));
        body.insert("climate".to_string(), pick(&self.climate, &current.climate));
        body.insert("terrain".to_string(), pick(&self.terrain, &current.terrain));
        PlanetDraft::from_body(&body)
    }
}

/// `skip`/`limit` window over the natural store order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    /// `None` means no upper bound
    pub limit: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Some(DEFAULT_PAGE_LIMIT),
        }
    }
}

impl Pagination {
    /// Parse raw query values. `limit=0` lifts the bound, like a driver-level limit of zero.
    pub fn from_query(limit: Option<&str>, skip: Option<&str>) -> Result<Self> {
        let limit = match parse_count("limit", limit)? {
            None => Some(DEFAULT_PAGE_LIMIT),
            Some(0) => None,
            Some(n) => Some(n),
        };
        let skip = parse_count("skip", skip)?.unwrap_or(0);

        Ok(Self { skip, limit })
    }

    /// Apply the window to an already ordered sequence
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let take = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        items.iter().skip(skip).take(take).cloned().collect()
    }
}

fn parse_count(param: &str, raw: Option<&str>) -> Result<Option<u64>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|count| *count <= MAX_PAGE_COUNT)
            .map(Some)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!(
                    "`{}` must be an integer between 0 and {}, got `{}`",
                    param, MAX_PAGE_COUNT, value
                ),
            }),
    }
}
