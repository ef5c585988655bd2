use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::AppError;

/// 프로젝트 설정 맵 (JSON 객체)
pub type Settings = Map<String, Value>;

/// DB의 `projects` 테이블 한 행. settings는 JSON 텍스트로 저장됩니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub settings: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub settings: Settings,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = serde_json::Error;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            settings: serde_json::from_str(&row.settings)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    /// 기본 설정 위에 덮어쓸 값들
    pub settings: Option<Settings>,
}

/// 프로젝트 이름의 최대 길이 (문자 수)
pub const MAX_PROJECT_NAME_CHARS: usize = 200;

/// 프로젝트 설명의 최대 길이 (문자 수)
pub const MAX_PROJECT_DESCRIPTION_CHARS: usize = 2000;

impl CreateProjectRequest {
    /// 이름은 공백이 아닌 1–200자, 설명은 2000자 이하여야 합니다.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Project name cannot be empty".to_string()));
        }
        if self.name.chars().count() > MAX_PROJECT_NAME_CHARS {
            return Err(AppError::Validation(format!(
                "Project name must be at most {} characters",
                MAX_PROJECT_NAME_CHARS
            )));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_PROJECT_DESCRIPTION_CHARS {
                return Err(AppError::Validation(format!(
                    "Project description must be at most {} characters",
                    MAX_PROJECT_DESCRIPTION_CHARS
                )));
            }
        }
        Ok(())
    }
}

/// 새 프로젝트에 적용되는 기본 설정
pub fn default_settings() -> Settings {
    let value = json!({
        "ai_output_language": "中文",
        "task_format_template": "standard",
        "auto_generate_tasks": true,
        "default_priority": "medium",
        "enable_notifications": true,
        "custom_fields": {}
    });

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 설정 맵을 얕게(shallow) 병합합니다.
///
/// `patch`에 있는 키는 덮어쓰고, 없는 키는 `current` 값을 유지합니다.
/// 중첩 객체는 통째로 교체됩니다. 입력은 변경하지 않습니다.
pub fn merge_settings(current: &Settings, patch: &Settings) -> Settings {
    let mut merged = current.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> Settings {
        value.as_object().cloned().unwrap()
    }

    fn project_request(name: &str, description: Option<String>) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description,
            settings: None,
        }
    }

    #[test]
    fn project_name_and_description_limits_count_characters() {
        let at_limit = "가".repeat(MAX_PROJECT_NAME_CHARS);
        assert!(project_request(&at_limit, None).validate().is_ok());
        assert!(project_request(
            "p",
            Some("설".repeat(MAX_PROJECT_DESCRIPTION_CHARS))
        )
        .validate()
        .is_ok());

        for req in [
            project_request("   ", None),
            project_request(&"n".repeat(MAX_PROJECT_NAME_CHARS + 1), None),
            project_request("p", Some("d".repeat(MAX_PROJECT_DESCRIPTION_CHARS + 1))),
        ] {
            assert!(matches!(req.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn merge_overwrites_patch_keys_and_keeps_the_rest() {
        let current = map(json!({ "default_priority": "medium", "auto_generate_tasks": true }));
        let patch = map(json!({ "default_priority": "high" }));

        let merged = merge_settings(&current, &patch);

        assert_eq!(merged["default_priority"], json!("high"));
        assert_eq!(merged["auto_generate_tasks"], json!(true));
        // 원본은 그대로
        assert_eq!(current["default_priority"], json!("medium"));
    }

    #[test]
    fn merge_replaces_nested_objects_wholesale() {
        let current = map(json!({ "custom_fields": { "a": 1, "b": 2 } }));
        let patch = map(json!({ "custom_fields": { "c": 3 } }));

        let merged = merge_settings(&current, &patch);

        assert_eq!(merged["custom_fields"], json!({ "c": 3 }));
    }

    #[test]
    fn merge_adds_unknown_keys() {
        let merged = merge_settings(&default_settings(), &map(json!({ "theme": "dark" })));
        assert_eq!(merged["theme"], json!("dark"));
        assert_eq!(merged.len(), default_settings().len() + 1);
    }

    #[test]
    fn row_with_invalid_settings_json_fails_conversion() {
        let row = ProjectRow {
            id: "p".into(),
            user_id: "u".into(),
            name: "n".into(),
            description: None,
            settings: "not json".into(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(Project::try_from(row).is_err());
    }
}
