use serde::{Deserialize, Serialize};

/// One entry of the member dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub language: String,
    pub ethnicity: String,
    pub race: String,
    #[serde(default)]
    pub medical_history: Vec<String>,
}

impl MemberRecord {
    const ID_LEN: (usize, usize) = (1, 10);
    const NAME_LEN: (usize, usize) = (1, 100);
    const DESCRIPTOR_LEN: (usize, usize) = (1, 50);

    /// Check the per-field length bounds. Lengths are counted in chars.
    pub fn validate(&self) -> Result<(), String> {
        check_len("id", &self.id, Self::ID_LEN)?;
        check_len("name", &self.name, Self::NAME_LEN)?;
        check_len("language", &self.language, Self::DESCRIPTOR_LEN)?;
        check_len("ethnicity", &self.ethnicity, Self::DESCRIPTOR_LEN)?;
        check_len("race", &self.race, Self::DESCRIPTOR_LEN)?;
        Ok(())
    }
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        ));
    }
    Ok(())
}

/// Outcome of a single member lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(MemberRecord),
    NotFound(String),
    Invalid(String),
}

impl LookupResult {
    #[allow(dead_code)]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Flatten into the envelope handed across the tool-call boundary.
    pub fn into_response(self) -> UserInfoResponse {
        match self {
            Self::Found(record) => UserInfoResponse {
                success: true,
                data: Some(record),
                error: None,
            },
            Self::NotFound(reason) | Self::Invalid(reason) => UserInfoResponse {
                success: false,
                data: None,
                error: Some(reason),
            },
        }
    }
}

/// Flat success/data/error envelope returned by `get_user_info`.
///
/// `data` is populated iff `success` is true; `error` iff it is false.
/// Both keys are always serialized, as `null` when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub success: bool,
    pub data: Option<MemberRecord>,
    pub error: Option<String>,
}

impl From<LookupResult> for UserInfoResponse {
    fn from(result: LookupResult) -> Self {
        result.into_response()
    }
}
